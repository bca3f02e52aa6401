//! End-to-end scan cycles: market data through edge rule, coordinator and
//! risk budget, with scripted venues.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::sync::Arc;
use std::time::Duration;

use underround::engine::{CoordinatorConfig, Engine, PairedExecutionCoordinator, RateGate, ScanConfig};
use underround::platforms::paper::PaperExecutionClient;
use underround::platforms::simulated::SimulatedPublicClient;
use underround::platforms::{ExecutionClient, PublicClient};
use underround::strategy::{BudgetReset, EdgeEvaluator, RiskBudget};
use underround::types::{
    Decision, ExecutionAttempt, ExecutionPolicy, Outcome, PairResult, SkipReason,
};

use crate::mock_venue::{book, LegScript, ScriptedMarketData, ScriptedVenue};

fn coordinator_config(timeout: Duration) -> CoordinatorConfig {
    CoordinatorConfig {
        per_leg_cap: dec!(1),
        policy: ExecutionPolicy {
            slippage_pct: Decimal::ZERO,
            ..ExecutionPolicy::default()
        },
        fill_timeout: timeout,
    }
}

fn build_engine(
    public: impl PublicClient + 'static,
    venue: impl ExecutionClient + 'static,
    cap: Decimal,
) -> Engine {
    let budget = Arc::new(RiskBudget::new(cap, BudgetReset::Never));
    let coordinator = PairedExecutionCoordinator::new(
        Arc::new(venue),
        Arc::clone(&budget),
        coordinator_config(Duration::from_secs(1)),
    );
    Engine::new(
        Arc::new(public),
        EdgeEvaluator::new(dec!(0.02), dec!(0.01)),
        coordinator,
        budget,
        RateGate::per_minute(10_000).unwrap(),
        ScanConfig {
            poll_interval: Duration::from_millis(10),
            max_markets_monitored: 50,
        },
    )
}

fn trade_decision() -> Decision {
    EdgeEvaluator::new(dec!(0.02), dec!(0.01)).evaluate(&book("m", dec!(0.40), dec!(0.40)))
}

#[tokio::test]
async fn test_budget_never_exceeds_cap_across_cycles() {
    let public = ScriptedMarketData::new(&[
        ("a", dec!(0.40), dec!(0.40)),
        ("b", dec!(0.40), dec!(0.40)),
        ("c", dec!(0.40), dec!(0.40)),
    ]);
    let engine = build_engine(public, ScriptedVenue::filling(), dec!(5));

    let first = engine.run_once().await.unwrap();
    assert_eq!(first.both_filled, 2);
    assert_eq!(first.skipped, 1);
    assert_eq!(first.spent_after, dec!(4));

    let mut last = first.spent_after;
    for _ in 0..3 {
        let report = engine.run_once().await.unwrap();
        assert_eq!(report.both_filled, 0);
        assert!(report.spent_after >= last);
        assert!(report.spent_after <= dec!(5));
        last = report.spent_after;
    }
}

#[tokio::test]
async fn test_exhausted_budget_stops_fetching() {
    let public = ScriptedMarketData::new(&[
        ("a", dec!(0.40), dec!(0.40)),
        ("b", dec!(0.40), dec!(0.40)),
    ]);
    let fetches = public.fetch_log();
    let engine = build_engine(public, ScriptedVenue::filling(), dec!(2));

    let report = engine.run_once().await.unwrap();
    assert_eq!(report.both_filled, 1);
    assert!(report.budget_exhausted);
    assert_eq!(*fetches.lock().unwrap(), vec!["a".to_string()]);

    let again = engine.run_once().await.unwrap();
    assert_eq!(again.markets_scanned, 0);
    assert_eq!(again.spent_after, dec!(2));
}

#[tokio::test]
async fn test_one_leg_fill_is_reported_every_cycle() {
    let public = ScriptedMarketData::new(&[("a", dec!(0.40), dec!(0.40))]);
    let venue = ScriptedVenue::new(LegScript::Fill, LegScript::Fail);
    let engine = build_engine(public, venue, dec!(10));

    for cycle in 1..=2 {
        let report = engine.run_once().await.unwrap();
        assert_eq!(report.one_leg_filled, 1);
        assert_eq!(report.both_filled, 0);
        assert_eq!(report.committed, dec!(1));
        assert_eq!(report.spent_after, Decimal::from(cycle));
    }
}

#[tokio::test]
async fn test_partial_legs_charge_only_filled_notional() {
    let public = ScriptedMarketData::new(&[("a", dec!(0.40), dec!(0.40))]);
    let venue = ScriptedVenue::new(LegScript::Partial(dec!(0.5)), LegScript::Fill);
    let engine = build_engine(public, venue, dec!(10));

    let report = engine.run_once().await.unwrap();
    assert_eq!(report.both_filled, 1);
    assert_eq!(report.spent_after, dec!(1.5));
}

#[tokio::test]
async fn test_rejected_legs_spend_nothing() {
    let public = ScriptedMarketData::new(&[("a", dec!(0.40), dec!(0.40))]);
    let venue = ScriptedVenue::new(LegScript::Reject, LegScript::Reject);
    let requests = venue.request_log();
    let engine = build_engine(public, venue, dec!(10));

    let report = engine.run_once().await.unwrap();
    assert_eq!(report.none_filled, 1);
    assert_eq!(report.spent_after, Decimal::ZERO);

    let requests = requests.lock().unwrap();
    assert_eq!(requests.len(), 2);
    assert_eq!(requests[0].market_id, "a");
    assert_eq!(requests[0].notional, requests[1].notional);
}

#[tokio::test]
async fn test_concurrent_attempts_cannot_overspend() {
    let budget = Arc::new(RiskBudget::new(dec!(3), BudgetReset::Never));
    let coordinator = |venue: ScriptedVenue| {
        PairedExecutionCoordinator::new(
            Arc::new(venue),
            Arc::clone(&budget),
            coordinator_config(Duration::from_secs(2)),
        )
    };
    let first = coordinator(ScriptedVenue::filling().with_latency(Duration::from_millis(100)));
    let second = coordinator(ScriptedVenue::filling().with_latency(Duration::from_millis(100)));

    let snapshot = book("m", dec!(0.40), dec!(0.40));
    let decision = trade_decision();
    let (a, b) = tokio::join!(
        first.execute(&snapshot, &decision),
        second.execute(&snapshot, &decision)
    );

    let attempts = [a.unwrap(), b.unwrap()];
    let paired = attempts
        .iter()
        .filter(|a| matches!(a, ExecutionAttempt::Paired(PairResult::BothFilled { .. })))
        .count();
    let skipped = attempts
        .iter()
        .filter(|a| matches!(a, ExecutionAttempt::Skipped(SkipReason::BudgetExhausted { .. })))
        .count();
    assert_eq!(paired, 1);
    assert_eq!(skipped, 1);
    assert_eq!(budget.spent(), dec!(2));
}

#[tokio::test]
async fn test_timeout_commits_nothing() {
    let budget = Arc::new(RiskBudget::new(dec!(10), BudgetReset::Never));
    let coordinator = PairedExecutionCoordinator::new(
        Arc::new(ScriptedVenue::filling().with_latency(Duration::from_secs(5))),
        Arc::clone(&budget),
        coordinator_config(Duration::from_millis(50)),
    );

    let attempt = coordinator
        .execute(&book("m", dec!(0.40), dec!(0.40)), &trade_decision())
        .await
        .unwrap();
    assert_eq!(attempt, ExecutionAttempt::Paired(PairResult::TimedOut));
    assert_eq!(budget.spent(), Decimal::ZERO);
    assert_eq!(budget.available(), dec!(10));
}

#[tokio::test]
async fn test_one_leg_result_names_filled_side() {
    let budget = Arc::new(RiskBudget::new(dec!(10), BudgetReset::Never));
    let coordinator = PairedExecutionCoordinator::new(
        Arc::new(ScriptedVenue::new(LegScript::Reject, LegScript::Fill)),
        Arc::clone(&budget),
        coordinator_config(Duration::from_secs(1)),
    );

    let attempt = coordinator
        .execute(&book("m", dec!(0.40), dec!(0.40)), &trade_decision())
        .await
        .unwrap();
    match attempt {
        ExecutionAttempt::Paired(PairResult::OneLegFilled { leg, notional, .. }) => {
            assert_eq!(leg, Outcome::No);
            assert_eq!(notional, dec!(1));
        }
        other => panic!("expected one-leg fill, got {other:?}"),
    }
}

#[test]
fn test_simulated_venue_respects_cap() {
    let ids = vec!["sim-1".to_string(), "sim-2".to_string(), "sim-3".to_string()];
    let engine = build_engine(
        SimulatedPublicClient::new(&ids),
        PaperExecutionClient::new(),
        dec!(3),
    );

    tokio_test::block_on(async {
        for _ in 0..20 {
            let report = engine.run_once().await.unwrap();
            assert!(report.books_evaluated <= ids.len());
            assert!(
                report.both_filled + report.one_leg_filled + report.none_filled + report.timed_out
                    + report.skipped
                    <= report.trade_signals
            );
            assert!(report.spent_after <= dec!(3));
        }
    });
}
