//! Offline evaluation over recorded order books.

pub mod replay;

pub use replay::{replay_file, replay_lines, ReplayReport};
