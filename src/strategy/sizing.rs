//! Paired position sizing.
//!
//! Both legs of an underround must be bought in the same contract count for
//! the hedge to be exact. The count is bound by whichever is tighter: the
//! per-leg notional cap at each ask price, or the depth at each best ask.

use rust_decimal::{Decimal, RoundingStrategy};

use crate::types::{ArbError, BookLevel};

/// Decimal places kept on contract counts. Rounded toward zero so sizing
/// never exceeds a cap.
pub const CONTRACT_DP: u32 = 4;

/// Sized pair of legs at the current best asks.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PairSize {
    pub contracts: Decimal,
    pub yes_price: Decimal,
    pub no_price: Decimal,
}

impl PairSize {
    pub fn yes_notional(&self) -> Decimal {
        self.contracts * self.yes_price
    }

    pub fn no_notional(&self) -> Decimal {
        self.contracts * self.no_price
    }

    /// Combined notional at the quoted prices.
    pub fn total_notional(&self) -> Decimal {
        self.yes_notional() + self.no_notional()
    }

    pub fn is_empty(&self) -> bool {
        self.contracts <= Decimal::ZERO
    }
}

/// Size a pair from the two best asks under a per-leg notional cap.
///
/// Pure function of its inputs. Returns an invariant error for a
/// non-positive ask price, a price too small to divide by, or negative depth; a zero result is a valid
/// "nothing to buy" answer, not an error.
pub fn size_pair(
    market_id: &str,
    yes: BookLevel,
    no: BookLevel,
    per_leg_cap: Decimal,
) -> Result<PairSize, ArbError> {
    let invariant = |message: String| ArbError::Invariant {
        market_id: market_id.to_string(),
        message,
    };

    for (label, level) in [("YES", yes), ("NO", no)] {
        if level.price <= Decimal::ZERO {
            return Err(invariant(format!("{label} ask price {} is not positive", level.price)));
        }
        if level.size < Decimal::ZERO {
            return Err(invariant(format!("{label} ask size {} is negative", level.size)));
        }
    }

    let by_budget = |label: &str, price: Decimal| {
        per_leg_cap
            .checked_div(price)
            .ok_or_else(|| invariant(format!("{label} ask price {price} overflows sizing")))
    };
    let by_yes_budget = by_budget("YES", yes.price)?;
    let by_no_budget = by_budget("NO", no.price)?;

    let contracts = by_yes_budget
        .min(by_no_budget)
        .min(yes.size)
        .min(no.size)
        .max(Decimal::ZERO)
        .round_dp_with_strategy(CONTRACT_DP, RoundingStrategy::ToZero);

    Ok(PairSize {
        contracts,
        yes_price: yes.price,
        no_price: no.price,
    })
}
