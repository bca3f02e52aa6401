//! UNDERROUND: paired-fill arbitrage engine for binary markets.
//!
//! Library crate exposing all modules for use by integration tests
//! and the binary entry point.

pub mod config;
pub mod types;
pub mod platforms;
pub mod strategy;
pub mod engine;
pub mod backtest;
