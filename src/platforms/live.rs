//! Live venue guard.
//!
//! Validates the signing setup a live deployment would use and refuses to
//! route orders. Selected when `execution.paper_mode = false`; every leg it
//! receives comes back as a venue error, which the coordinator records as
//! an unfilled leg.

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use tracing::{info, warn};

use crate::config::{AppConfig, ExecutionSettings, SignMode};
use crate::platforms::ExecutionClient;
use crate::types::{ArbError, LegOutcome, LegRequest};

const VENUE: &str = "live";

pub struct LiveExecutionClient {
    sign_mode: SignMode,
    private_key: Option<SecretString>,
}

impl LiveExecutionClient {
    /// Build from settings, reading the private key from the configured
    /// env var when signing with an env key.
    pub fn from_settings(settings: &ExecutionSettings) -> Result<Self, ArbError> {
        let key = match settings.sign_mode {
            SignMode::EnvKey => AppConfig::resolve_env(&settings.private_key_env).ok(),
            SignMode::ExternalSigner => None,
        };
        Self::from_parts(settings, key)
    }

    fn from_parts(settings: &ExecutionSettings, key: Option<String>) -> Result<Self, ArbError> {
        let private_key = match settings.sign_mode {
            SignMode::ExternalSigner => {
                info!("Using external signer");
                None
            }
            SignMode::EnvKey => {
                let key = key
                    .map(SecretString::new)
                    .filter(|k| !k.expose_secret().is_empty())
                    .ok_or_else(|| {
                        ArbError::Config(format!("{} missing", settings.private_key_env))
                    })?;
                if !settings.allow_env_key_in_prod {
                    return Err(ArbError::Config(
                        "env_key signing requires execution.allow_env_key_in_prod = true"
                            .to_string(),
                    ));
                }
                warn!("Using env key signing (not recommended)");
                Some(key)
            }
        };

        Ok(Self {
            sign_mode: settings.sign_mode,
            private_key,
        })
    }

    pub fn sign_mode(&self) -> SignMode {
        self.sign_mode
    }

    pub fn has_private_key(&self) -> bool {
        self.private_key.is_some()
    }
}

#[async_trait]
impl ExecutionClient for LiveExecutionClient {
    async fn place_buy(&self, request: LegRequest) -> Result<LegOutcome> {
        warn!(
            market_id = %request.market_id,
            outcome = %request.outcome,
            "Live order routing unavailable, leg not placed"
        );
        Err(anyhow!(ArbError::Venue {
            venue: VENUE.to_string(),
            message: "order routing not available; run with execution.paper_mode = true"
                .to_string(),
        }))
    }
}
