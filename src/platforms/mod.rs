//! Venue integrations.
//!
//! Defines the two collaborator traits the engine consumes and the
//! implementations shipped with the crate:
//! - `simulated`: in-process market data with randomized top-of-book
//! - `paper`: paper venue that fills legs against simulated liquidity
//! - `live`: live-venue guard (signing checks, no order routing)

pub mod live;
pub mod paper;
pub mod simulated;

use anyhow::Result;
use async_trait::async_trait;

use crate::types::{LegOutcome, LegRequest, Market, OrderBookSnapshot};

/// Read-only market data source.
///
/// Calls are latency-bearing and fallible. Retries, if any, belong to the
/// implementation.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PublicClient: Send + Sync {
    /// All markets the source currently lists.
    async fn list_markets(&self) -> Result<Vec<Market>>;

    /// Fresh top-of-book snapshot for one market.
    async fn get_order_book(&self, market_id: &str) -> Result<OrderBookSnapshot>;
}

/// Places buy orders for single legs.
///
/// Ordinary no-liquidity conditions come back as `LegOutcome::Unfilled`;
/// errors are reserved for transport or protocol failures.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ExecutionClient: Send + Sync {
    async fn place_buy(&self, request: LegRequest) -> Result<LegOutcome>;
}
