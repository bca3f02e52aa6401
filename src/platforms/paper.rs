//! Paper execution venue.
//!
//! Fills each leg against its own simulated liquidity ceiling and honors the
//! leg's time-in-force, partial-cancel and slippage policy. No real orders
//! are placed.

use anyhow::Result;
use async_trait::async_trait;
use rust_decimal::{Decimal, RoundingStrategy};
use rust_decimal_macros::dec;
use std::time::Duration;
use tracing::info;

use crate::platforms::ExecutionClient;
use crate::strategy::sizing::CONTRACT_DP;
use crate::types::{LegOutcome, LegRequest, TimeInForce};

/// Simulated venue.
#[derive(Debug, Clone, Default)]
pub struct PaperExecutionClient {
    /// Adverse price move applied to every fill, in percent of the limit.
    price_drift_pct: Decimal,
    /// Artificial acknowledgement latency.
    latency: Option<Duration>,
}

impl PaperExecutionClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_price_drift(mut self, pct: Decimal) -> Self {
        self.price_drift_pct = pct;
        self
    }

    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    /// Decide a leg's fate. Pure; `place_buy` adds latency and logging.
    pub fn simulate(&self, request: &LegRequest) -> LegOutcome {
        if request.notional <= Decimal::ZERO || request.limit_price <= Decimal::ZERO {
            return LegOutcome::unfilled("nothing to buy");
        }

        let fill_price = request.limit_price * (Decimal::ONE + self.price_drift_pct / dec!(100));
        if fill_price > request.policy.price_ceiling(request.limit_price) {
            return LegOutcome::unfilled(format!("price {fill_price:.4} beyond slippage ceiling"));
        }

        let requested = (request.notional / request.limit_price)
            .round_dp_with_strategy(CONTRACT_DP, RoundingStrategy::ToZero);
        let fillable = request
            .simulated_liquidity
            .map_or(requested, |liquidity| requested.min(liquidity.max(Decimal::ZERO)))
            .round_dp_with_strategy(CONTRACT_DP, RoundingStrategy::ToZero);

        if fillable <= Decimal::ZERO {
            return LegOutcome::unfilled("no liquidity");
        }

        if fillable >= requested {
            return LegOutcome::Filled {
                contracts: fillable,
                price: fill_price,
                notional: fillable * fill_price,
            };
        }

        match request.policy.time_in_force {
            TimeInForce::Fok => LegOutcome::unfilled("fill-or-kill could not fill completely"),
            TimeInForce::Ioc => LegOutcome::PartiallyFilled {
                contracts: fillable,
                price: fill_price,
                notional: fillable * fill_price,
                cancelled_remainder: request.policy.cancel_if_partial,
            },
        }
    }
}

#[async_trait]
impl ExecutionClient for PaperExecutionClient {
    async fn place_buy(&self, request: LegRequest) -> Result<LegOutcome> {
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }

        let outcome = self.simulate(&request);
        info!(
            market_id = %request.market_id,
            outcome = %request.outcome,
            limit = %request.limit_price,
            notional = format!("${:.2}", request.notional),
            tif = %request.policy.time_in_force,
            result = %outcome,
            "Paper fill"
        );
        Ok(outcome)
    }
}
