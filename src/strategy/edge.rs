//! Underround detection.
//!
//! Compares the combined best asks of a binary market against 1 minus fees
//! and flags books whose net edge clears the required margin.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use tracing::debug;

use crate::config::RiskSettings;
use crate::types::{Decision, OrderBookSnapshot, Outcome};

/// Reason attached to books that cannot be read on both sides.
pub const MISSING_BEST_ASK: &str = "missing best ask";

/// Evaluate a book for an underround.
///
/// Fails closed when either best ask is absent. Trades only when the net
/// edge is strictly greater than `required_edge_fraction`.
pub fn evaluate(
    book: &OrderBookSnapshot,
    fee_fraction: Decimal,
    required_edge_fraction: Decimal,
) -> Decision {
    let (yes_ask, no_ask) = match (book.ask(Outcome::Yes), book.ask(Outcome::No)) {
        (Some(yes), Some(no)) => (yes.price, no.price),
        _ => return Decision::reject(MISSING_BEST_ASK),
    };

    let sum_ask = yes_ask + no_ask;
    let net_edge = (Decimal::ONE - sum_ask) - fee_fraction;
    let should_trade = net_edge > required_edge_fraction;

    let pct = (net_edge * dec!(100)).round_dp(2);
    let reason = if should_trade {
        format!("edge {pct:.2}%")
    } else {
        format!("no edge (net {pct:.2}%)")
    };

    Decision {
        should_trade,
        reason,
        yes_ask: Some(yes_ask),
        no_ask: Some(no_ask),
        sum_ask: Some(sum_ask),
        net_edge: Some(net_edge),
    }
}

/// Evaluator bound to a fee and edge requirement.
#[derive(Debug, Clone, Copy)]
pub struct EdgeEvaluator {
    fee_fraction: Decimal,
    required_edge_fraction: Decimal,
}

impl EdgeEvaluator {
    pub fn new(fee_fraction: Decimal, required_edge_fraction: Decimal) -> Self {
        Self {
            fee_fraction,
            required_edge_fraction,
        }
    }

    pub fn from_settings(risk: &RiskSettings) -> Self {
        Self::new(risk.fee_fraction(), risk.edge_fraction())
    }

    pub fn fee_fraction(&self) -> Decimal {
        self.fee_fraction
    }

    pub fn required_edge_fraction(&self) -> Decimal {
        self.required_edge_fraction
    }

    pub fn evaluate(&self, book: &OrderBookSnapshot) -> Decision {
        let decision = evaluate(book, self.fee_fraction, self.required_edge_fraction);
        debug!(market_id = %book.market_id, decision = %decision, "Evaluated");
        decision
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
