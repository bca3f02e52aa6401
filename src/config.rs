//! Configuration loading from TOML with environment variable resolution.
//!
//! Reads `config.toml` and deserializes into strongly-typed structs. Every
//! field has a default, so a missing section falls back to the stock
//! settings. Secrets (the signing key) are referenced by env-var name and
//! resolved at runtime.

use anyhow::{Context, Result};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::Deserialize;
use std::fs;
use std::time::Duration;

use crate::strategy::risk::BudgetReset;
use crate::types::{ArbError, ExecutionPolicy, TimeInForce};

/// Top-level application configuration.
#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct AppConfig {
    pub engine: EngineSettings,
    pub risk: RiskSettings,
    pub execution: ExecutionSettings,
    pub markets: MarketsSettings,
    pub logging: LoggingSettings,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct EngineSettings {
    pub poll_interval_ms: u64,
    pub max_markets_monitored: usize,
    pub requests_per_minute: u32,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            poll_interval_ms: 1000,
            max_markets_monitored: 50,
            requests_per_minute: 120,
        }
    }
}

impl EngineSettings {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct RiskSettings {
    /// Configured maximum notional per leg.
    pub max_trade_usd: Decimal,
    /// Hard secondary ceiling per leg, applied on top of `max_trade_usd`.
    pub per_leg_ceiling_usd: Decimal,
    pub daily_cap_usd: Decimal,
    pub total_fee_bps: u32,
    pub edge_bps: u32,
    pub budget_reset: BudgetReset,
}

impl Default for RiskSettings {
    fn default() -> Self {
        Self {
            max_trade_usd: dec!(1),
            per_leg_ceiling_usd: dec!(10),
            daily_cap_usd: dec!(10),
            total_fee_bps: 200,
            edge_bps: 100,
            budget_reset: BudgetReset::DailyUtc,
        }
    }
}

impl RiskSettings {
    /// Total fee as a fraction of notional.
    pub fn fee_fraction(&self) -> Decimal {
        bps_to_fraction(self.total_fee_bps)
    }

    /// Required net edge as a fraction.
    pub fn edge_fraction(&self) -> Decimal {
        bps_to_fraction(self.edge_bps)
    }

    /// Per-leg notional cap: the smaller of the configured maximum and the
    /// hard ceiling.
    pub fn per_leg_cap(&self) -> Decimal {
        self.max_trade_usd.min(self.per_leg_ceiling_usd)
    }
}

/// How live orders would be signed.
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SignMode {
    EnvKey,
    ExternalSigner,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ExecutionSettings {
    /// Route legs to the simulated paper venue.
    pub paper_mode: bool,
    pub time_in_force: TimeInForce,
    pub fill_timeout_ms: u64,
    pub cancel_if_partial: bool,
    pub max_slippage_pct: Decimal,
    pub sign_mode: SignMode,
    /// Name of the env var holding the private key (`env_key` mode only).
    pub private_key_env: String,
    pub allow_env_key_in_prod: bool,
}

impl Default for ExecutionSettings {
    fn default() -> Self {
        Self {
            paper_mode: true,
            time_in_force: TimeInForce::Ioc,
            fill_timeout_ms: 2000,
            cancel_if_partial: true,
            max_slippage_pct: dec!(1),
            sign_mode: SignMode::ExternalSigner,
            private_key_env: "ENV_PRIVATE_KEY".to_string(),
            allow_env_key_in_prod: false,
        }
    }
}

impl ExecutionSettings {
    pub fn fill_timeout(&self) -> Duration {
        Duration::from_millis(self.fill_timeout_ms)
    }

    pub fn policy(&self) -> ExecutionPolicy {
        ExecutionPolicy {
            time_in_force: self.time_in_force,
            cancel_if_partial: self.cancel_if_partial,
            slippage_pct: self.max_slippage_pct,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct MarketsSettings {
    /// Market ids served by the simulated public client.
    pub mock_market_ids: Vec<String>,
}

impl Default for MarketsSettings {
    fn default() -> Self {
        Self {
            mock_market_ids: vec!["nfl-yes-no-1".to_string(), "nfl-yes-no-2".to_string()],
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct LoggingSettings {
    pub level: String,
    pub json: bool,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}

fn bps_to_fraction(bps: u32) -> Decimal {
    Decimal::from(bps) / dec!(10000)
}

impl AppConfig {
    /// Load configuration from a TOML file and validate it.
    pub fn load(path: &str) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {path}"))?;
        let config = Self::from_toml(&contents)
            .with_context(|| format!("Failed to parse config file: {path}"))?;
        Ok(config)
    }

    /// Parse and validate configuration from a TOML string.
    pub fn from_toml(contents: &str) -> Result<Self> {
        let config: AppConfig = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject settings the engine cannot run with.
    pub fn validate(&self) -> Result<(), ArbError> {
        let fail = |msg: &str| Err(ArbError::Config(msg.to_string()));

        if self.engine.poll_interval_ms == 0 {
            return fail("engine.poll_interval_ms must be positive");
        }
        if self.engine.max_markets_monitored == 0 {
            return fail("engine.max_markets_monitored must be positive");
        }
        if self.engine.requests_per_minute == 0 {
            return fail("engine.requests_per_minute must be positive");
        }
        if self.risk.max_trade_usd <= Decimal::ZERO {
            return fail("risk.max_trade_usd must be positive");
        }
        if self.risk.per_leg_ceiling_usd <= Decimal::ZERO {
            return fail("risk.per_leg_ceiling_usd must be positive");
        }
        if self.risk.daily_cap_usd <= Decimal::ZERO {
            return fail("risk.daily_cap_usd must be positive");
        }
        if self.execution.fill_timeout_ms == 0 {
            return fail("execution.fill_timeout_ms must be positive");
        }
        if self.execution.max_slippage_pct < Decimal::ZERO {
            return fail("execution.max_slippage_pct must not be negative");
        }
        Ok(())
    }

    /// Resolve an environment variable name to its value.
    pub fn resolve_env(env_name: &str) -> Result<String> {
        std::env::var(env_name)
            .with_context(|| format!("Environment variable not set: {env_name}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_config_uses_defaults() {
        let cfg = AppConfig::from_toml("").unwrap();
        assert_eq!(cfg.engine.poll_interval_ms, 1000);
        assert_eq!(cfg.engine.max_markets_monitored, 50);
        assert_eq!(cfg.risk.daily_cap_usd, dec!(10));
        assert_eq!(cfg.execution.time_in_force, TimeInForce::Ioc);
        assert!(cfg.execution.paper_mode);
        assert_eq!(cfg.markets.mock_market_ids.len(), 2);
        assert_eq!(cfg.risk.budget_reset, BudgetReset::DailyUtc);
    }

    #[test]
    fn test_bps_fractions() {
        let cfg = AppConfig::default();
        assert_eq!(cfg.risk.fee_fraction(), dec!(0.02));
        assert_eq!(cfg.risk.edge_fraction(), dec!(0.01));
    }

    #[test]
    fn test_per_leg_cap_takes_smaller() {
        let mut risk = RiskSettings::default();
        risk.max_trade_usd = dec!(25);
        assert_eq!(risk.per_leg_cap(), dec!(10));
        risk.max_trade_usd = dec!(3);
        assert_eq!(risk.per_leg_cap(), dec!(3));
    }

    #[test]
    fn test_parse_sections() {
        let toml = r#"
            [engine]
            poll_interval_ms = 250
            max_markets_monitored = 5

            [risk]
            max_trade_usd = 2.5
            daily_cap_usd = 50.0
            total_fee_bps = 150
            budget_reset = "never"

            [execution]
            time_in_force = "FOK"
            fill_timeout_ms = 500
            cancel_if_partial = false
            sign_mode = "env_key"

            [markets]
            mock_market_ids = ["a", "b", "c"]

            [logging]
            level = "debug"
            json = true
        "#;
        let cfg = AppConfig::from_toml(toml).unwrap();
        assert_eq!(cfg.engine.poll_interval(), Duration::from_millis(250));
        assert_eq!(cfg.engine.requests_per_minute, 120);
        assert_eq!(cfg.risk.max_trade_usd, dec!(2.5));
        assert_eq!(cfg.risk.fee_fraction(), dec!(0.015));
        assert_eq!(cfg.risk.budget_reset, BudgetReset::Never);
        assert_eq!(cfg.execution.time_in_force, TimeInForce::Fok);
        assert_eq!(cfg.execution.sign_mode, SignMode::EnvKey);
        assert!(!cfg.execution.policy().cancel_if_partial);
        assert_eq!(cfg.markets.mock_market_ids, vec!["a", "b", "c"]);
        assert!(cfg.logging.json);
    }

    #[test]
    fn test_validate_rejects_zero_cap() {
        let err = AppConfig::from_toml("[risk]\ndaily_cap_usd = 0.0\n").unwrap_err();
        assert!(err.to_string().contains("daily_cap_usd"));
    }

    #[test]
    fn test_validate_rejects_zero_rate() {
        let err = AppConfig::from_toml("[engine]\nrequests_per_minute = 0\n").unwrap_err();
        assert!(err.to_string().contains("requests_per_minute"));
    }

    #[test]
    fn test_shipped_config_loads() {
        let cfg = AppConfig::load("config.toml").unwrap();
        assert!(cfg.execution.paper_mode);
        assert_eq!(cfg.risk.per_leg_cap(), dec!(1));
        assert_eq!(cfg.execution.policy().slippage_pct, dec!(1));
    }

    #[test]
    fn test_load_missing_file() {
        let result = AppConfig::load("definitely-not-here.toml");
        assert!(result.is_err());
    }
}
