//! Shared types for the UNDERROUND engine.
//!
//! These types form the data model used across all modules. Order books,
//! decisions and leg results are plain values produced and consumed within
//! a single scan iteration; nothing here carries mutable shared state.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::fmt;

// ---------------------------------------------------------------------------
// Market
// ---------------------------------------------------------------------------

/// One of the two complementary outcomes of a binary market.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Outcome {
    #[serde(rename = "YES")]
    Yes,
    #[serde(rename = "NO")]
    No,
}

impl Outcome {
    /// Both outcomes, YES first.
    pub const BOTH: [Outcome; 2] = [Outcome::Yes, Outcome::No];
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Outcome::Yes => write!(f, "YES"),
            Outcome::No => write!(f, "NO"),
        }
    }
}

/// A binary market as listed by the public data client.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Market {
    pub id: String,
    pub question: String,
    pub outcomes: Vec<Outcome>,
}

impl Market {
    /// A YES/NO market with the given id and question.
    pub fn binary(id: impl Into<String>, question: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            question: question.into(),
            outcomes: Outcome::BOTH.to_vec(),
        }
    }
}

impl fmt::Display for Market {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.id, self.question)
    }
}

// ---------------------------------------------------------------------------
// Order book
// ---------------------------------------------------------------------------

/// A single price level: price as a probability in (0, 1), size in contracts.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BookLevel {
    pub price: Decimal,
    pub size: Decimal,
}

impl BookLevel {
    pub fn new(price: Decimal, size: Decimal) -> Self {
        Self { price, size }
    }
}

/// Best level per outcome. Either side may be absent.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct OutcomeLevels {
    #[serde(rename = "YES")]
    pub yes: Option<BookLevel>,
    #[serde(rename = "NO")]
    pub no: Option<BookLevel>,
}

impl OutcomeLevels {
    pub fn get(&self, outcome: Outcome) -> Option<BookLevel> {
        match outcome {
            Outcome::Yes => self.yes,
            Outcome::No => self.no,
        }
    }
}

/// Top-of-book snapshot for one market. Immutable once produced; every
/// scan cycle fetches a fresh one.
///
/// The serialized form matches the recorded snapshot logs consumed by
/// [`crate::backtest::replay`]: camelCase keys, `YES`/`NO` outcome keys and
/// an epoch-millisecond `ts`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderBookSnapshot {
    pub market_id: String,
    pub best_ask: OutcomeLevels,
    #[serde(default)]
    pub best_bid: OutcomeLevels,
    #[serde(rename = "ts", with = "chrono::serde::ts_milliseconds")]
    pub captured_at: DateTime<Utc>,
}

impl OrderBookSnapshot {
    /// Best ask for the given outcome, if quoted.
    pub fn ask(&self, outcome: Outcome) -> Option<BookLevel> {
        self.best_ask.get(outcome)
    }

    /// Best bid for the given outcome, if quoted.
    pub fn bid(&self, outcome: Outcome) -> Option<BookLevel> {
        self.best_bid.get(outcome)
    }
}

impl fmt::Display for OrderBookSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let show = |l: Option<BookLevel>| match l {
            Some(l) => format!("{:.4}x{}", l.price, l.size),
            None => "-".to_string(),
        };
        write!(
            f,
            "{} ask YES {} NO {} | bid YES {} NO {}",
            self.market_id,
            show(self.ask(Outcome::Yes)),
            show(self.ask(Outcome::No)),
            show(self.bid(Outcome::Yes)),
            show(self.bid(Outcome::No)),
        )
    }
}

// ---------------------------------------------------------------------------
// Decision
// ---------------------------------------------------------------------------

/// Result of evaluating one order book for an underround.
///
/// `reason` is diagnostic text for logs; nothing branches on it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Decision {
    pub should_trade: bool,
    pub reason: String,
    pub yes_ask: Option<Decimal>,
    pub no_ask: Option<Decimal>,
    pub sum_ask: Option<Decimal>,
    pub net_edge: Option<Decimal>,
}

impl Decision {
    /// A no-trade decision with no computed prices.
    pub fn reject(reason: impl Into<String>) -> Self {
        Self {
            should_trade: false,
            reason: reason.into(),
            yes_ask: None,
            no_ask: None,
            sum_ask: None,
            net_edge: None,
        }
    }
}

impl fmt::Display for Decision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let verdict = if self.should_trade { "TRADE" } else { "SKIP" };
        match (self.sum_ask, self.net_edge) {
            (Some(sum), Some(edge)) => write!(
                f,
                "{verdict}: {} (sum_ask={:.4} net_edge={:.4})",
                self.reason, sum, edge
            ),
            _ => write!(f, "{verdict}: {}", self.reason),
        }
    }
}

// ---------------------------------------------------------------------------
// Execution policy & legs
// ---------------------------------------------------------------------------

/// Order time-in-force.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TimeInForce {
    /// Immediate-or-cancel: take what is available, cancel the rest.
    #[serde(rename = "IOC", alias = "ioc")]
    Ioc,
    /// Fill-or-kill: fill completely or not at all.
    #[serde(rename = "FOK", alias = "fok")]
    Fok,
}

impl fmt::Display for TimeInForce {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TimeInForce::Ioc => write!(f, "IOC"),
            TimeInForce::Fok => write!(f, "FOK"),
        }
    }
}

/// How each leg is placed.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ExecutionPolicy {
    pub time_in_force: TimeInForce,
    pub cancel_if_partial: bool,
    /// Maximum accepted adverse price move, in percent of the limit price.
    pub slippage_pct: Decimal,
}

impl ExecutionPolicy {
    /// Highest price the venue may fill at for a given limit.
    pub fn price_ceiling(&self, limit_price: Decimal) -> Decimal {
        limit_price * (Decimal::ONE + self.slippage_pct / dec!(100))
    }
}

impl Default for ExecutionPolicy {
    fn default() -> Self {
        Self {
            time_in_force: TimeInForce::Ioc,
            cancel_if_partial: true,
            slippage_pct: dec!(1),
        }
    }
}

/// One buy order of a paired attempt.
#[derive(Debug, Clone, PartialEq)]
pub struct LegRequest {
    pub market_id: String,
    pub outcome: Outcome,
    /// Price ceiling the leg is willing to pay (before slippage allowance).
    pub limit_price: Decimal,
    /// Currency amount to spend on this leg.
    pub notional: Decimal,
    pub policy: ExecutionPolicy,
    /// Contracts available to fill against in simulation. `None` = unbounded.
    pub simulated_liquidity: Option<Decimal>,
}

/// Terminal state of a single leg. Every placement resolves to exactly one
/// of these; there is no "null" result.
#[derive(Debug, Clone, PartialEq)]
pub enum LegOutcome {
    Filled {
        contracts: Decimal,
        price: Decimal,
        notional: Decimal,
    },
    PartiallyFilled {
        contracts: Decimal,
        price: Decimal,
        notional: Decimal,
        /// Whether the unfilled remainder was cancelled at the venue.
        cancelled_remainder: bool,
    },
    Unfilled {
        reason: String,
    },
}

impl LegOutcome {
    pub fn unfilled(reason: impl Into<String>) -> Self {
        LegOutcome::Unfilled {
            reason: reason.into(),
        }
    }

    /// Notional actually spent on this leg.
    pub fn filled_notional(&self) -> Decimal {
        match self {
            LegOutcome::Filled { notional, .. } | LegOutcome::PartiallyFilled { notional, .. } => {
                *notional
            }
            LegOutcome::Unfilled { .. } => Decimal::ZERO,
        }
    }

    /// Contracts actually acquired on this leg.
    pub fn filled_contracts(&self) -> Decimal {
        match self {
            LegOutcome::Filled { contracts, .. }
            | LegOutcome::PartiallyFilled { contracts, .. } => *contracts,
            LegOutcome::Unfilled { .. } => Decimal::ZERO,
        }
    }

    pub fn has_fill(&self) -> bool {
        self.filled_notional() > Decimal::ZERO
    }
}

impl fmt::Display for LegOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LegOutcome::Filled {
                contracts,
                price,
                notional,
            } => write!(f, "filled {contracts} @ {price:.4} (${notional:.2})"),
            LegOutcome::PartiallyFilled {
                contracts,
                price,
                notional,
                cancelled_remainder,
            } => write!(
                f,
                "partial {contracts} @ {price:.4} (${notional:.2}, remainder {})",
                if *cancelled_remainder { "cancelled" } else { "resting" }
            ),
            LegOutcome::Unfilled { reason } => write!(f, "unfilled ({reason})"),
        }
    }
}

// ---------------------------------------------------------------------------
// Paired result
// ---------------------------------------------------------------------------

/// Filled side of a completed pair.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LegFill {
    pub contracts: Decimal,
    pub notional: Decimal,
}

/// Joint result of the two legs of one attempt.
///
/// Only `BothFilled` preserves the hedge. `OneLegFilled` is unhedged
/// directional exposure and must never be folded into the other variants.
#[derive(Debug, Clone, PartialEq)]
pub enum PairResult {
    BothFilled { yes: LegFill, no: LegFill },
    OneLegFilled {
        leg: Outcome,
        contracts: Decimal,
        notional: Decimal,
    },
    NoneFilled,
    TimedOut,
}

impl PairResult {
    /// Combine two settled legs. Nonzero notional on both sides is the only
    /// path to `BothFilled`.
    pub fn from_legs(yes: &LegOutcome, no: &LegOutcome) -> Self {
        match (yes.has_fill(), no.has_fill()) {
            (true, true) => PairResult::BothFilled {
                yes: LegFill {
                    contracts: yes.filled_contracts(),
                    notional: yes.filled_notional(),
                },
                no: LegFill {
                    contracts: no.filled_contracts(),
                    notional: no.filled_notional(),
                },
            },
            (true, false) => PairResult::OneLegFilled {
                leg: Outcome::Yes,
                contracts: yes.filled_contracts(),
                notional: yes.filled_notional(),
            },
            (false, true) => PairResult::OneLegFilled {
                leg: Outcome::No,
                contracts: no.filled_contracts(),
                notional: no.filled_notional(),
            },
            (false, false) => PairResult::NoneFilled,
        }
    }

    /// Notional to charge against the risk budget.
    pub fn committed_notional(&self) -> Decimal {
        match self {
            PairResult::BothFilled { yes, no } => yes.notional + no.notional,
            PairResult::OneLegFilled { notional, .. } => *notional,
            PairResult::NoneFilled | PairResult::TimedOut => Decimal::ZERO,
        }
    }

    pub fn is_hedged(&self) -> bool {
        matches!(self, PairResult::BothFilled { .. })
    }
}

impl fmt::Display for PairResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PairResult::BothFilled { yes, no } => write!(
                f,
                "BOTH FILLED (YES {} / ${:.2}, NO {} / ${:.2})",
                yes.contracts, yes.notional, no.contracts, no.notional
            ),
            PairResult::OneLegFilled {
                leg,
                contracts,
                notional,
            } => write!(f, "ONE LEG FILLED ({leg} {contracts} / ${notional:.2})"),
            PairResult::NoneFilled => write!(f, "NONE FILLED"),
            PairResult::TimedOut => write!(f, "TIMED OUT"),
        }
    }
}

/// Why an attempt was skipped before any placement.
#[derive(Debug, Clone, PartialEq)]
pub enum SkipReason {
    /// Price budget or book depth left nothing to buy.
    ZeroContracts,
    /// The estimated notional does not fit under the cap.
    BudgetExhausted { estimated: Decimal, available: Decimal },
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::ZeroContracts => write!(f, "sizing resulted in zero contracts"),
            SkipReason::BudgetExhausted {
                estimated,
                available,
            } => write!(
                f,
                "budget exhausted (need ${estimated:.2}, available ${available:.2})"
            ),
        }
    }
}

/// What the coordinator did with a trade-worthy decision.
#[derive(Debug, Clone, PartialEq)]
pub enum ExecutionAttempt {
    Skipped(SkipReason),
    Paired(PairResult),
}

// ---------------------------------------------------------------------------
// Cycle report
// ---------------------------------------------------------------------------

/// Counters for a single `run_once` pass.
#[derive(Debug, Clone, Default, Serialize)]
pub struct CycleReport {
    pub markets_scanned: usize,
    pub books_evaluated: usize,
    pub trade_signals: usize,
    pub both_filled: usize,
    pub one_leg_filled: usize,
    pub none_filled: usize,
    pub timed_out: usize,
    pub skipped: usize,
    pub errors: usize,
    pub committed: Decimal,
    pub spent_after: Decimal,
    /// Set when the scan stopped early because the budget was exhausted.
    pub budget_exhausted: bool,
}

impl CycleReport {
    /// Record the result of one coordinator call.
    pub fn record(&mut self, attempt: &ExecutionAttempt) {
        match attempt {
            ExecutionAttempt::Skipped(_) => self.skipped += 1,
            ExecutionAttempt::Paired(result) => {
                self.committed += result.committed_notional();
                match result {
                    PairResult::BothFilled { .. } => self.both_filled += 1,
                    PairResult::OneLegFilled { .. } => self.one_leg_filled += 1,
                    PairResult::NoneFilled => self.none_filled += 1,
                    PairResult::TimedOut => self.timed_out += 1,
                }
            }
        }
    }
}

impl fmt::Display for CycleReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "scanned={} evaluated={} signals={} paired={} unhedged={} none={} timeout={} skipped={} errors={} committed=${:.2} spent=${:.2}",
            self.markets_scanned,
            self.books_evaluated,
            self.trade_signals,
            self.both_filled,
            self.one_leg_filled,
            self.none_filled,
            self.timed_out,
            self.skipped,
            self.errors,
            self.committed,
            self.spent_after,
        )
    }
}

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Domain-specific error types for UNDERROUND.
#[derive(Debug, thiserror::Error)]
pub enum ArbError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Market data error ({market_id}): {message}")]
    MarketData { market_id: String, message: String },

    #[error("Venue error ({venue}): {message}")]
    Venue { venue: String, message: String },

    #[error("Invariant violated for {market_id}: {message}")]
    Invariant { market_id: String, message: String },

    #[error("Replay error: {0}")]
    Replay(String),
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
