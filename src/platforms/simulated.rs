//! Simulated market data.
//!
//! Serves a fixed list of YES/NO markets and generates a fresh randomized
//! top-of-book on every request. YES asks wander around the middle of the
//! range and NO asks sit near the complement, so most books price close to
//! fair and only occasionally open an underround.

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use chrono::Utc;
use rand::Rng;
use rust_decimal::Decimal;
use tracing::debug;

use crate::platforms::PublicClient;
use crate::types::{ArbError, BookLevel, Market, OrderBookSnapshot, OutcomeLevels};

// Prices are generated in basis points of probability.
const MIN_ASK_BPS: i64 = 500;
const MAX_ASK_BPS: i64 = 9_500;
const MIN_BID_BPS: i64 = 100;
const MIN_SIZE: i64 = 100;
const MAX_SIZE: i64 = 150;

fn bps(value: i64) -> Decimal {
    Decimal::new(value, 4)
}

/// Randomized in-process market data source.
pub struct SimulatedPublicClient {
    markets: Vec<Market>,
}

impl SimulatedPublicClient {
    pub fn new(market_ids: &[String]) -> Self {
        let markets = market_ids
            .iter()
            .enumerate()
            .map(|(idx, id)| Market::binary(id.clone(), format!("Mock Market {} ({id})", idx + 1)))
            .collect();
        Self { markets }
    }

    fn generate_book(&self, market_id: &str) -> OrderBookSnapshot {
        let mut rng = rand::thread_rng();

        // YES ask: 0.30..0.70 base with +/- 3c noise
        let base = rng.gen_range(0..=4_000);
        let noise = rng.gen_range(-300..=300);
        let yes_ask = (3_000 + base + noise).clamp(MIN_ASK_BPS, MAX_ASK_BPS);

        // NO ask: complement +/- 1c
        let no_ask = (10_000 - yes_ask + rng.gen_range(-100..=100)).clamp(MIN_ASK_BPS, MAX_ASK_BPS);

        // Bids 1c..5c under the ask, at least 1c, and always at least 1c inside the ask
        let mut bid_below = |ask: i64| {
            let spread = rng.gen_range(100..=500);
            (ask - spread).clamp(MIN_BID_BPS, ask - 100)
        };
        let yes_bid = bid_below(yes_ask);
        let no_bid = bid_below(no_ask);

        let mut level = |price: i64| {
            Some(BookLevel::new(
                bps(price),
                Decimal::from(rng.gen_range(MIN_SIZE..MAX_SIZE)),
            ))
        };

        OrderBookSnapshot {
            market_id: market_id.to_string(),
            best_ask: OutcomeLevels {
                yes: level(yes_ask),
                no: level(no_ask),
            },
            best_bid: OutcomeLevels {
                yes: level(yes_bid),
                no: level(no_bid),
            },
            captured_at: Utc::now(),
        }
    }
}

#[async_trait]
impl PublicClient for SimulatedPublicClient {
    async fn list_markets(&self) -> Result<Vec<Market>> {
        Ok(self.markets.clone())
    }

    async fn get_order_book(&self, market_id: &str) -> Result<OrderBookSnapshot> {
        if !self.markets.iter().any(|m| m.id == market_id) {
            return Err(anyhow!(ArbError::MarketData {
                market_id: market_id.to_string(),
                message: "unknown market".to_string(),
            }));
        }
        let book = self.generate_book(market_id);
        debug!(book = %book, "Simulated book");
        Ok(book)
    }
}
