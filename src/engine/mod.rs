//! Core engine: the scan, evaluate, execute loop.

pub mod coordinator;
pub mod rate_gate;
pub mod scanner;

pub use coordinator::{CoordinatorConfig, PairedExecutionCoordinator};
pub use rate_gate::RateGate;
pub use scanner::{Engine, ScanConfig};
