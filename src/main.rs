//! UNDERROUND: paired-fill binary market arbitrage
//!
//! Entry point. Loads configuration, initialises structured logging,
//! wires the market data source, execution venue and risk budget into the
//! engine, and runs the scan loop until SIGINT/SIGTERM. The `replay`
//! subcommand evaluates a recorded snapshot log offline instead.

use anyhow::Result;
use clap::{Parser, Subcommand};
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use underround::backtest::replay_file;
use underround::config::AppConfig;
use underround::engine::{CoordinatorConfig, Engine, PairedExecutionCoordinator, RateGate, ScanConfig};
use underround::platforms::live::LiveExecutionClient;
use underround::platforms::paper::PaperExecutionClient;
use underround::platforms::simulated::SimulatedPublicClient;
use underround::platforms::ExecutionClient;
use underround::strategy::{EdgeEvaluator, RiskBudget};

#[derive(Parser)]
#[command(name = "underround", version, about = "Paired-fill underround arbitrage engine")]
struct Cli {
    /// Path to the TOML configuration file.
    #[arg(long, default_value = "config.toml")]
    config: String,

    /// Run a single scan cycle and exit.
    #[arg(long)]
    once: bool,

    /// Print the `--once` or `replay` report as JSON.
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Replay a JSONL order book log through the edge rule and sizing.
    Replay { path: PathBuf },
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (non-fatal if missing)
    let _ = dotenv::dotenv();

    let cli = Cli::parse();
    let cfg = AppConfig::load(&cli.config)?;

    init_logging(&cfg);

    let evaluator = EdgeEvaluator::from_settings(&cfg.risk);

    if let Some(Command::Replay { path }) = cli.command {
        let report = replay_file(&path, &evaluator, cfg.risk.per_leg_cap())?;
        print_report(&report, cli.json)?;
        return Ok(());
    }

    info!(
        paper_mode = cfg.execution.paper_mode,
        markets = cfg.markets.mock_market_ids.len(),
        poll_ms = cfg.engine.poll_interval_ms,
        per_leg_cap = format!("${:.2}", cfg.risk.per_leg_cap()),
        daily_cap = format!("${:.2}", cfg.risk.daily_cap_usd),
        fee_bps = cfg.risk.total_fee_bps,
        edge_bps = cfg.risk.edge_bps,
        tif = %cfg.execution.time_in_force,
        fill_timeout_ms = cfg.execution.fill_timeout_ms,
        "UNDERROUND starting up"
    );

    // -- Initialise components -------------------------------------------

    let execution: Arc<dyn ExecutionClient> = if cfg.execution.paper_mode {
        Arc::new(PaperExecutionClient::new())
    } else {
        warn!("Live mode selected");
        Arc::new(LiveExecutionClient::from_settings(&cfg.execution)?)
    };

    let public = Arc::new(SimulatedPublicClient::new(&cfg.markets.mock_market_ids));
    let budget = Arc::new(RiskBudget::new(cfg.risk.daily_cap_usd, cfg.risk.budget_reset));
    let coordinator = PairedExecutionCoordinator::new(
        execution,
        Arc::clone(&budget),
        CoordinatorConfig::from_settings(&cfg.risk, &cfg.execution),
    );
    let engine = Engine::new(
        public,
        evaluator,
        coordinator,
        budget,
        RateGate::per_minute(cfg.engine.requests_per_minute)?,
        ScanConfig {
            poll_interval: cfg.engine.poll_interval(),
            max_markets_monitored: cfg.engine.max_markets_monitored,
        },
    );

    if cli.once {
        let report = engine.run_once().await?;
        print_report(&report, cli.json)?;
        return Ok(());
    }

    // -- Main loop -------------------------------------------------------

    let cancel = CancellationToken::new();
    tokio::spawn(shutdown_on_signal(cancel.clone()));

    info!("Entering main loop. Press Ctrl+C to stop.");
    engine.run_loop(cancel).await;

    info!(
        spent = format!("${:.2}", engine.budget().spent()),
        "UNDERROUND shut down cleanly."
    );
    Ok(())
}

fn print_report<T: Serialize + std::fmt::Display>(report: &T, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(report)?);
    } else {
        println!("{report}");
    }
    Ok(())
}

/// Cancel `token` on SIGINT or SIGTERM.
async fn shutdown_on_signal(token: CancellationToken) {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut term) => {
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => {}
                    _ = term.recv() => {}
                }
            }
            Err(e) => {
                error!(error = %e, "Failed to install SIGTERM handler");
                let _ = tokio::signal::ctrl_c().await;
            }
        }
    }
    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }

    info!("Shutdown signal received.");
    token.cancel();
}

/// Initialise the `tracing` subscriber.
fn init_logging(cfg: &AppConfig) {
    use tracing_subscriber::{fmt, EnvFilter};

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("underround={}", cfg.logging.level)));

    if cfg.logging.json {
        fmt()
            .json()
            .with_env_filter(env_filter)
            .with_target(true)
            .with_thread_ids(true)
            .init();
    } else {
        fmt()
            .with_env_filter(env_filter)
            .with_target(true)
            .init();
    }
}
