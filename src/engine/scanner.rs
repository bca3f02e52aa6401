//! Scan loop.
//!
//! Walks the monitored markets once per cycle: fetch a fresh book, evaluate
//! it for an underround, and hand trade-worthy books to the paired
//! coordinator. A failure on one market is logged and the scan moves on;
//! the loop itself only stops when cancelled.

use anyhow::{Context, Result};
use chrono::Utc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::engine::coordinator::PairedExecutionCoordinator;
use crate::engine::rate_gate::RateGate;
use crate::platforms::PublicClient;
use crate::strategy::edge::EdgeEvaluator;
use crate::strategy::risk::RiskBudget;
use crate::types::{CycleReport, ExecutionAttempt, SkipReason};

/// Scan cadence and breadth.
#[derive(Debug, Clone)]
pub struct ScanConfig {
    pub poll_interval: Duration,
    pub max_markets_monitored: usize,
}

pub struct Engine {
    public: Arc<dyn PublicClient>,
    evaluator: EdgeEvaluator,
    coordinator: PairedExecutionCoordinator,
    budget: Arc<RiskBudget>,
    rate_gate: RateGate,
    config: ScanConfig,
    /// Set once budget exhaustion has been reported in the current period.
    budget_warned: AtomicBool,
}

impl Engine {
    pub fn new(
        public: Arc<dyn PublicClient>,
        evaluator: EdgeEvaluator,
        coordinator: PairedExecutionCoordinator,
        budget: Arc<RiskBudget>,
        rate_gate: RateGate,
        config: ScanConfig,
    ) -> Self {
        Self {
            public,
            evaluator,
            coordinator,
            budget,
            rate_gate,
            config,
            budget_warned: AtomicBool::new(false),
        }
    }

    pub fn budget(&self) -> &RiskBudget {
        &self.budget
    }

    /// One pass over the monitored markets.
    ///
    /// Returns an error only when the market list itself cannot be fetched.
    /// The scan stops at the first market the remaining budget cannot
    /// cover; exhaustion is logged at warn once per budget period.
    pub async fn run_once(&self) -> Result<CycleReport> {
        if self.budget.roll_period(Utc::now()) {
            self.budget_warned.store(false, Ordering::Relaxed);
        }

        self.rate_gate.acquire().await;
        let markets = self
            .public
            .list_markets()
            .await
            .context("Failed to list markets")?;

        let mut report = CycleReport::default();

        for market in markets.iter().take(self.config.max_markets_monitored) {
            if self.budget.is_exhausted() {
                self.note_exhausted("Daily cap reached, skipping remaining markets");
                report.budget_exhausted = true;
                break;
            }
            report.markets_scanned += 1;

            self.rate_gate.acquire().await;
            let book = match self.public.get_order_book(&market.id).await {
                Ok(book) => book,
                Err(e) => {
                    warn!(market_id = %market.id, error = %e, "Order book fetch failed");
                    report.errors += 1;
                    continue;
                }
            };
            report.books_evaluated += 1;

            let decision = self.evaluator.evaluate(&book);
            if !decision.should_trade {
                debug!(market_id = %market.id, reason = %decision.reason, "Skip");
                continue;
            }
            report.trade_signals += 1;

            match self.coordinator.execute(&book, &decision).await {
                Ok(attempt) => {
                    report.record(&attempt);
                    match &attempt {
                        ExecutionAttempt::Skipped(SkipReason::BudgetExhausted { .. }) => {
                            self.note_exhausted("Remaining budget too small, skipping remaining markets");
                            report.budget_exhausted = true;
                            break;
                        }
                        ExecutionAttempt::Skipped(reason) => {
                            info!(market_id = %market.id, reason = %reason, "Attempt skipped");
                        }
                        ExecutionAttempt::Paired(_) => {}
                    }
                }
                Err(e) => {
                    error!(market_id = %market.id, error = %e, "Paired execution failed");
                    report.errors += 1;
                }
            }
        }

        report.spent_after = self.budget.spent();
        Ok(report)
    }

    fn note_exhausted(&self, message: &str) {
        let spent = format!("${:.2}", self.budget.spent());
        let cap = format!("${:.2}", self.budget.cap());
        if self.budget_warned.swap(true, Ordering::Relaxed) {
            debug!(spent, cap, "{message}");
        } else {
            warn!(spent, cap, "{message}");
        }
    }

    /// Run cycles until `cancel` fires. Cancellation is observed between
    /// cycles only; an in-flight cycle always completes.
    pub async fn run_loop(&self, cancel: CancellationToken) {
        info!(
            poll_ms = self.config.poll_interval.as_millis() as u64,
            max_markets = self.config.max_markets_monitored,
            "Engine loop start"
        );

        let mut cycle: u64 = 0;
        while !cancel.is_cancelled() {
            cycle += 1;
            match self.run_once().await {
                Ok(report) => log_cycle_report(cycle, &report),
                Err(e) => error!(cycle, error = %e, "Engine iteration error"),
            }

            tokio::select! {
                _ = cancel.cancelled() => {}
                _ = tokio::time::sleep(self.config.poll_interval) => {}
            }
        }

        info!(cycles = cycle, spent = format!("${:.2}", self.budget.spent()), "Engine loop stopped");
    }
}

/// Log a human-readable cycle summary.
fn log_cycle_report(cycle: u64, report: &CycleReport) {
    if report.one_leg_filled > 0 {
        warn!(cycle, unhedged = report.one_leg_filled, "Cycle left unhedged exposure");
    }
    info!(
        cycle,
        scanned = report.markets_scanned,
        signals = report.trade_signals,
        paired = report.both_filled,
        unhedged = report.one_leg_filled,
        none = report.none_filled,
        timed_out = report.timed_out,
        skipped = report.skipped,
        errors = report.errors,
        committed = format!("${:.2}", report.committed),
        spent = format!("${:.2}", report.spent_after),
        "Cycle complete"
    );
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
