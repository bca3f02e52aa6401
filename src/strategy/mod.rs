//! Strategy layer: underround detection, paired sizing, and the risk budget.
//!
//! Everything here is synchronous and free of I/O. The engine drives these
//! pieces once per market per scan cycle.

pub mod edge;
pub mod risk;
pub mod sizing;

pub use edge::{evaluate, EdgeEvaluator, MISSING_BEST_ASK};
pub use risk::{BudgetReservation, BudgetReset, RiskBudget};
pub use sizing::{size_pair, PairSize};
