//! Snapshot replay.
//!
//! Feeds recorded order books (one JSON `OrderBookSnapshot` per line)
//! through the same edge rule and sizing the live engine uses, and tallies
//! the paired trades it would have taken. Fills are assumed at the quoted
//! asks; there is no budget, latency or venue model here.

use anyhow::{Context, Result};
use rust_decimal::Decimal;
use serde::Serialize;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;
use tracing::{debug, info, warn};

use crate::strategy::edge::EdgeEvaluator;
use crate::strategy::sizing::size_pair;
use crate::types::{ArbError, OrderBookSnapshot, Outcome};

// ---------------------------------------------------------------------------
// Report
// ---------------------------------------------------------------------------

/// Aggregate result of a replay run.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ReplayReport {
    /// Snapshots that parsed and were evaluated.
    pub snapshots: usize,
    /// Snapshots that would have produced a paired trade.
    pub trades: usize,
    pub total_contracts: Decimal,
    /// Sum of `contracts * net_edge` over all trades.
    pub gross_pnl: Decimal,
    /// Lines that could not be parsed or sized.
    pub skipped_lines: usize,
}

impl std::fmt::Display for ReplayReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "snapshots={} trades={} contracts={} gross_pnl=${:.4} skipped_lines={}",
            self.snapshots, self.trades, self.total_contracts, self.gross_pnl, self.skipped_lines
        )
    }
}

// ---------------------------------------------------------------------------
// Replay
// ---------------------------------------------------------------------------

/// Replay a JSONL snapshot file.
pub fn replay_file(
    path: impl AsRef<Path>,
    evaluator: &EdgeEvaluator,
    per_leg_cap: Decimal,
) -> Result<ReplayReport> {
    let path = path.as_ref();
    let file = File::open(path)
        .with_context(|| format!("Failed to open snapshot log {}", path.display()))?;
    let report = replay_lines(BufReader::new(file), evaluator, per_leg_cap)?;

    info!(
        path = %path.display(),
        snapshots = report.snapshots,
        trades = report.trades,
        contracts = %report.total_contracts,
        gross_pnl = format!("${:.4}", report.gross_pnl),
        skipped = report.skipped_lines,
        "Replay complete"
    );
    Ok(report)
}

/// Replay snapshots from any line reader.
///
/// Blank lines are ignored. A line that fails to parse or size is logged
/// and counted in `skipped_lines`; only an I/O failure aborts the run.
pub fn replay_lines(
    reader: impl BufRead,
    evaluator: &EdgeEvaluator,
    per_leg_cap: Decimal,
) -> Result<ReplayReport> {
    let mut report = ReplayReport::default();

    for (idx, line) in reader.lines().enumerate() {
        let line_no = idx + 1;
        let line = line.map_err(|e| ArbError::Replay(format!("read failed at line {line_no}: {e}")))?;
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let snapshot: OrderBookSnapshot = match serde_json::from_str(line) {
            Ok(s) => s,
            Err(e) => {
                warn!(line = line_no, error = %e, "Malformed snapshot line");
                report.skipped_lines += 1;
                continue;
            }
        };
        report.snapshots += 1;

        let decision = evaluator.evaluate(&snapshot);
        if !decision.should_trade {
            continue;
        }
        let (Some(yes), Some(no), Some(net_edge)) = (
            snapshot.ask(Outcome::Yes),
            snapshot.ask(Outcome::No),
            decision.net_edge,
        ) else {
            continue;
        };

        let size = match size_pair(&snapshot.market_id, yes, no, per_leg_cap) {
            Ok(size) => size,
            Err(e) => {
                warn!(line = line_no, error = %e, "Unsizable snapshot");
                report.skipped_lines += 1;
                continue;
            }
        };
        if size.is_empty() {
            debug!(line = line_no, market_id = %snapshot.market_id, "Edge with no depth");
            continue;
        }

        report.trades += 1;
        report.total_contracts += size.contracts;
        report.gross_pnl += size.contracts * net_edge;
    }

    Ok(report)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
