//! Paired execution.
//!
//! Turns a trade-worthy decision into two simultaneous leg orders, races
//! them against the fill timeout, and reconciles the legs into a single
//! [`PairResult`] that is charged to the risk budget.
//!
//! A timed-out attempt is treated as if both legs were cancelled: nothing is
//! committed. This assumes the venue honors cancellation when the caller
//! abandons an order; a venue that can fill after abandonment needs a
//! reconciliation query before this assumption holds.

use futures::future::join;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::config::{ExecutionSettings, RiskSettings};
use crate::platforms::ExecutionClient;
use crate::strategy::risk::RiskBudget;
use crate::strategy::sizing::{size_pair, PairSize};
use crate::types::{
    ArbError, Decision, ExecutionAttempt, ExecutionPolicy, LegOutcome, LegRequest,
    OrderBookSnapshot, Outcome, PairResult, SkipReason,
};

/// Sizing and placement policy for the coordinator.
#[derive(Debug, Clone)]
pub struct CoordinatorConfig {
    /// Per-leg notional cap (already reduced by the hard ceiling).
    pub per_leg_cap: Decimal,
    pub policy: ExecutionPolicy,
    pub fill_timeout: Duration,
}

impl CoordinatorConfig {
    pub fn from_settings(risk: &RiskSettings, execution: &ExecutionSettings) -> Self {
        Self {
            per_leg_cap: risk.per_leg_cap(),
            policy: execution.policy(),
            fill_timeout: execution.fill_timeout(),
        }
    }
}

pub struct PairedExecutionCoordinator {
    client: Arc<dyn ExecutionClient>,
    budget: Arc<RiskBudget>,
    config: CoordinatorConfig,
}

impl PairedExecutionCoordinator {
    pub fn new(
        client: Arc<dyn ExecutionClient>,
        budget: Arc<RiskBudget>,
        config: CoordinatorConfig,
    ) -> Self {
        Self {
            client,
            budget,
            config,
        }
    }

    pub fn config(&self) -> &CoordinatorConfig {
        &self.config
    }

    /// Size, gate, place and reconcile one paired attempt.
    ///
    /// Leg failures never surface here; they become unfilled legs. Errors
    /// are returned only for sizing invariant violations.
    pub async fn execute(
        &self,
        book: &OrderBookSnapshot,
        decision: &Decision,
    ) -> Result<ExecutionAttempt, ArbError> {
        let market_id = book.market_id.as_str();
        let (yes, no) = match (book.ask(Outcome::Yes), book.ask(Outcome::No)) {
            (Some(yes), Some(no)) if decision.should_trade => (yes, no),
            _ => {
                return Err(ArbError::Invariant {
                    market_id: market_id.to_string(),
                    message: "execute called without a tradeable two-sided book".to_string(),
                })
            }
        };

        let size = size_pair(market_id, yes, no, self.config.per_leg_cap)?;
        if size.is_empty() {
            info!(market_id, "Sizing resulted in zero contracts, skip");
            return Ok(ExecutionAttempt::Skipped(SkipReason::ZeroContracts));
        }

        let estimated = self.worst_case_notional(&size);
        let Some(reservation) = self.budget.try_reserve(estimated) else {
            let available = self.budget.available();
            debug!(
                market_id,
                estimated = format!("${:.2}", estimated),
                available = format!("${:.2}", available),
                spent = format!("${:.2}", self.budget.spent()),
                cap = format!("${:.2}", self.budget.cap()),
                "Risk budget exhausted, skip"
            );
            return Ok(ExecutionAttempt::Skipped(SkipReason::BudgetExhausted {
                estimated,
                available,
            }));
        };

        let attempt_id = Uuid::new_v4();
        info!(
            %attempt_id,
            market_id,
            contracts = %size.contracts,
            yes_price = %size.yes_price,
            no_price = %size.no_price,
            yes_usd = format!("${:.2}", size.yes_notional()),
            no_usd = format!("${:.2}", size.no_notional()),
            reason = %decision.reason,
            "Placing paired buys"
        );

        let yes_leg = self.leg_request(market_id, Outcome::Yes, size.yes_price, size.yes_notional(), yes.size);
        let no_leg = self.leg_request(market_id, Outcome::No, size.no_price, size.no_notional(), no.size);
        let result = self.place_pair(attempt_id, yes_leg, no_leg).await;

        let committed = result.committed_notional();
        reservation.settle(committed);
        self.report(attempt_id, market_id, &result);

        Ok(ExecutionAttempt::Paired(result))
    }

    /// Notional the attempt could spend if both legs fill at the slippage
    /// ceiling.
    fn worst_case_notional(&self, size: &PairSize) -> Decimal {
        size.total_notional() * (Decimal::ONE + self.config.policy.slippage_pct / dec!(100))
    }

    fn leg_request(
        &self,
        market_id: &str,
        outcome: Outcome,
        price: Decimal,
        notional: Decimal,
        liquidity: Decimal,
    ) -> LegRequest {
        LegRequest {
            market_id: market_id.to_string(),
            outcome,
            limit_price: price,
            notional,
            policy: self.config.policy,
            simulated_liquidity: Some(liquidity),
        }
    }

    fn spawn_leg(&self, request: LegRequest) -> JoinHandle<LegOutcome> {
        let client = Arc::clone(&self.client);
        tokio::spawn(async move {
            let market_id = request.market_id.clone();
            let outcome = request.outcome;
            match client.place_buy(request).await {
                Ok(result) => result,
                Err(e) => {
                    warn!(market_id = %market_id, outcome = %outcome, error = %e, "Leg placement failed");
                    LegOutcome::unfilled(format!("placement error: {e}"))
                }
            }
        })
    }

    /// Dispatch both legs, then wait for both or the deadline.
    async fn place_pair(&self, attempt_id: Uuid, yes: LegRequest, no: LegRequest) -> PairResult {
        let yes_task = self.spawn_leg(yes);
        let no_task = self.spawn_leg(no);
        let aborts = [yes_task.abort_handle(), no_task.abort_handle()];

        let settled = tokio::time::timeout(self.config.fill_timeout, join(yes_task, no_task)).await;

        let (yes_joined, no_joined) = match settled {
            Ok(legs) => legs,
            Err(_) => {
                for handle in &aborts {
                    handle.abort();
                }
                warn!(
                    %attempt_id,
                    timeout_ms = self.config.fill_timeout.as_millis() as u64,
                    "Paired fill timeout reached, treating as cancel"
                );
                return PairResult::TimedOut;
            }
        };

        let settle = |joined: Result<LegOutcome, tokio::task::JoinError>, outcome: Outcome| {
            joined.unwrap_or_else(|e| {
                error!(%attempt_id, outcome = %outcome, error = %e, "Leg task failed");
                LegOutcome::unfilled(format!("leg task failed: {e}"))
            })
        };
        let yes_outcome = settle(yes_joined, Outcome::Yes);
        let no_outcome = settle(no_joined, Outcome::No);

        debug!(%attempt_id, yes = %yes_outcome, no = %no_outcome, "Legs settled");
        for (outcome, leg) in [(Outcome::Yes, &yes_outcome), (Outcome::No, &no_outcome)] {
            if let LegOutcome::PartiallyFilled {
                cancelled_remainder: false,
                ..
            } = leg
            {
                warn!(%attempt_id, outcome = %outcome, "Partial fill remainder left resting");
            }
        }

        PairResult::from_legs(&yes_outcome, &no_outcome)
    }

    fn report(&self, attempt_id: Uuid, market_id: &str, result: &PairResult) {
        let spent = format!("${:.2}", self.budget.spent());
        match result {
            PairResult::BothFilled { yes, no } => {
                if yes.contracts != no.contracts {
                    warn!(
                        %attempt_id,
                        market_id,
                        yes_contracts = %yes.contracts,
                        no_contracts = %no.contracts,
                        "Paired fill with contract imbalance"
                    );
                }
                info!(
                    %attempt_id,
                    market_id,
                    yes_usd = format!("${:.2}", yes.notional),
                    no_usd = format!("${:.2}", no.notional),
                    spent,
                    "Paired filled"
                );
            }
            PairResult::OneLegFilled {
                leg,
                contracts,
                notional,
            } => {
                error!(
                    %attempt_id,
                    market_id,
                    leg = %leg,
                    contracts = %contracts,
                    exposed = format!("${:.2}", notional),
                    spent,
                    "UNHEDGED EXPOSURE: only one leg filled"
                );
            }
            PairResult::NoneFilled => info!(%attempt_id, market_id, "No fills executed"),
            PairResult::TimedOut => info!(%attempt_id, market_id, "Attempt timed out, nothing committed"),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
