//! In-memory doubles for integration testing.
//!
//! `ScriptedMarketData` serves fixed books per market and `ScriptedVenue`
//! answers leg orders according to a per-outcome script. Both record what
//! they were asked so tests can assert on traffic.

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use chrono::Utc;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use underround::platforms::{ExecutionClient, PublicClient};
use underround::types::{
    BookLevel, LegOutcome, LegRequest, Market, OrderBookSnapshot, Outcome, OutcomeLevels,
};

/// Book with both asks at the given prices and 100 contracts of depth.
pub fn book(market_id: &str, yes: Decimal, no: Decimal) -> OrderBookSnapshot {
    OrderBookSnapshot {
        market_id: market_id.to_string(),
        best_ask: OutcomeLevels {
            yes: Some(BookLevel::new(yes, dec!(100))),
            no: Some(BookLevel::new(no, dec!(100))),
        },
        best_bid: OutcomeLevels::default(),
        captured_at: Utc::now(),
    }
}

// ---------------------------------------------------------------------------
// Market data
// ---------------------------------------------------------------------------

pub struct ScriptedMarketData {
    markets: Vec<Market>,
    books: HashMap<String, (Decimal, Decimal)>,
    fetches: Arc<Mutex<Vec<String>>>,
}

impl ScriptedMarketData {
    /// Markets listed in the given order, each quoting (yes ask, no ask).
    pub fn new(quotes: &[(&str, Decimal, Decimal)]) -> Self {
        Self {
            markets: quotes
                .iter()
                .map(|(id, _, _)| Market::binary(*id, format!("Scripted {id}")))
                .collect(),
            books: quotes
                .iter()
                .map(|(id, yes, no)| (id.to_string(), (*yes, *no)))
                .collect(),
            fetches: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Shared handle on the ids fetched so far.
    pub fn fetch_log(&self) -> Arc<Mutex<Vec<String>>> {
        Arc::clone(&self.fetches)
    }
}

#[async_trait]
impl PublicClient for ScriptedMarketData {
    async fn list_markets(&self) -> Result<Vec<Market>> {
        Ok(self.markets.clone())
    }

    async fn get_order_book(&self, market_id: &str) -> Result<OrderBookSnapshot> {
        self.fetches.lock().unwrap().push(market_id.to_string());
        let (yes, no) = self
            .books
            .get(market_id)
            .ok_or_else(|| anyhow!("unknown market {market_id}"))?;
        Ok(book(market_id, *yes, *no))
    }
}

// ---------------------------------------------------------------------------
// Venue
// ---------------------------------------------------------------------------

/// What the venue does with a leg.
#[derive(Debug, Clone, Copy)]
pub enum LegScript {
    /// Fill everything at the limit price.
    Fill,
    /// Fill this fraction of the requested contracts and cancel the rest.
    Partial(Decimal),
    /// Accept nothing.
    Reject,
    /// Transport failure.
    Fail,
}

pub struct ScriptedVenue {
    yes: LegScript,
    no: LegScript,
    latency: Duration,
    requests: Arc<Mutex<Vec<LegRequest>>>,
}

impl ScriptedVenue {
    pub fn new(yes: LegScript, no: LegScript) -> Self {
        Self {
            yes,
            no,
            latency: Duration::ZERO,
            requests: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn filling() -> Self {
        Self::new(LegScript::Fill, LegScript::Fill)
    }

    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    pub fn request_log(&self) -> Arc<Mutex<Vec<LegRequest>>> {
        Arc::clone(&self.requests)
    }
}

#[async_trait]
impl ExecutionClient for ScriptedVenue {
    async fn place_buy(&self, request: LegRequest) -> Result<LegOutcome> {
        self.requests.lock().unwrap().push(request.clone());
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }

        let script = match request.outcome {
            Outcome::Yes => self.yes,
            Outcome::No => self.no,
        };
        let contracts = request.notional / request.limit_price;
        match script {
            LegScript::Fill => Ok(LegOutcome::Filled {
                contracts,
                price: request.limit_price,
                notional: request.notional,
            }),
            LegScript::Partial(fraction) => Ok(LegOutcome::PartiallyFilled {
                contracts: contracts * fraction,
                price: request.limit_price,
                notional: request.notional * fraction,
                cancelled_remainder: true,
            }),
            LegScript::Reject => Ok(LegOutcome::unfilled("no liquidity")),
            LegScript::Fail => Err(anyhow!("connection reset")),
        }
    }
}
