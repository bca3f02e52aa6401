//! Risk budget.
//!
//! Tracks notional spent in the current period against a hard cap. The
//! check before an attempt and the commit after it form one critical
//! section: an attempt reserves its worst-case notional up front, so two
//! attempts running at once can never both pass the gate and overspend.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::Deserialize;
use std::sync::{Mutex, MutexGuard};
use tracing::{info, warn};

/// When the spent total returns to zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BudgetReset {
    /// The cap applies for the lifetime of the process.
    Never,
    /// Spent resets when the UTC date changes.
    DailyUtc,
}

#[derive(Debug)]
struct BudgetState {
    spent: Decimal,
    reserved: Decimal,
    period: NaiveDate,
}

impl BudgetState {
    fn available(&self, cap: Decimal) -> Decimal {
        (cap - self.spent - self.reserved).max(Decimal::ZERO)
    }
}

/// Running spend against a period cap. Shared between the scan loop and the
/// coordinator behind an `Arc`.
#[derive(Debug)]
pub struct RiskBudget {
    cap: Decimal,
    reset: BudgetReset,
    state: Mutex<BudgetState>,
}

impl RiskBudget {
    pub fn new(cap: Decimal, reset: BudgetReset) -> Self {
        Self::starting_at(cap, reset, Utc::now())
    }

    /// Budget whose first period is the one containing `now`.
    pub fn starting_at(cap: Decimal, reset: BudgetReset, now: DateTime<Utc>) -> Self {
        Self {
            cap,
            reset,
            state: Mutex::new(BudgetState {
                spent: Decimal::ZERO,
                reserved: Decimal::ZERO,
                period: now.date_naive(),
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, BudgetState> {
        // Updates are single field writes, so a poisoned lock still holds consistent state.
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn cap(&self) -> Decimal {
        self.cap
    }

    pub fn spent(&self) -> Decimal {
        self.lock().spent
    }

    /// Notional still available, net of in-flight reservations.
    pub fn available(&self) -> Decimal {
        self.lock().available(self.cap)
    }

    pub fn is_exhausted(&self) -> bool {
        self.lock().spent >= self.cap
    }

    /// Whether `amount` more would stay within the cap.
    pub fn check_available(&self, amount: Decimal) -> bool {
        let state = self.lock();
        state.spent + state.reserved + amount <= self.cap
    }

    /// Add filled notional to the period total.
    pub fn commit(&self, amount: Decimal) {
        if amount <= Decimal::ZERO {
            return;
        }
        let mut state = self.lock();
        state.spent += amount;
        if state.spent > self.cap {
            warn!(spent = %state.spent, cap = %self.cap, "Risk budget committed past cap");
        }
    }

    /// Atomically check and hold `amount` for an attempt in flight.
    ///
    /// Returns `None` when the amount does not fit. The reservation is
    /// released when settled or dropped.
    pub fn try_reserve(&self, amount: Decimal) -> Option<BudgetReservation<'_>> {
        let mut state = self.lock();
        if state.spent + state.reserved + amount > self.cap {
            return None;
        }
        state.reserved += amount;
        Some(BudgetReservation {
            budget: self,
            amount,
            released: false,
        })
    }

    fn release(&self, reserved: Decimal, committed: Decimal) {
        let mut state = self.lock();
        state.reserved = (state.reserved - reserved).max(Decimal::ZERO);
        if committed > Decimal::ZERO {
            state.spent += committed;
        }
    }

    /// Start a new period if the reset policy says the current one is over.
    /// Returns true when a reset happened.
    pub fn roll_period(&self, now: DateTime<Utc>) -> bool {
        if self.reset == BudgetReset::Never {
            return false;
        }
        let today = now.date_naive();
        let mut state = self.lock();
        if today <= state.period {
            return false;
        }
        info!(
            previous_period = %state.period,
            period = %today,
            spent = %state.spent,
            "Risk budget period rolled"
        );
        state.period = today;
        state.spent = Decimal::ZERO;
        true
    }
}

/// Notional held for one in-flight attempt.
#[derive(Debug)]
#[must_use = "a reservation holds budget until settled or dropped"]
pub struct BudgetReservation<'a> {
    budget: &'a RiskBudget,
    amount: Decimal,
    released: bool,
}

impl BudgetReservation<'_> {
    /// Release the hold and commit what was actually filled.
    pub fn settle(mut self, committed: Decimal) {
        self.budget.release(self.amount, committed);
        self.released = true;
    }
}

impl Drop for BudgetReservation<'_> {
    fn drop(&mut self) {
        if !self.released {
            self.budget.release(self.amount, Decimal::ZERO);
        }
    }
}
