//! Outbound request pacing.
//!
//! Token bucket sized to `requests_per_minute`, with the full minute's
//! allowance available as burst. Shared across scan cycles; the limiter's
//! state is atomic so concurrent fetches draw from the same bucket.

use governor::{DefaultDirectRateLimiter, Quota, RateLimiter};
use std::num::NonZeroU32;
use std::sync::Arc;

use crate::types::ArbError;

#[derive(Debug, Clone)]
pub struct RateGate {
    limiter: Arc<DefaultDirectRateLimiter>,
    per_minute: u32,
}

impl RateGate {
    pub fn per_minute(requests: u32) -> Result<Self, ArbError> {
        let n = NonZeroU32::new(requests)
            .ok_or_else(|| ArbError::Config("requests_per_minute must be positive".to_string()))?;
        Ok(Self {
            limiter: Arc::new(RateLimiter::direct(Quota::per_minute(n))),
            per_minute: requests,
        })
    }

    pub fn requests_per_minute(&self) -> u32 {
        self.per_minute
    }

    /// Wait until a request slot is available, then take it.
    pub async fn acquire(&self) {
        self.limiter.until_ready().await;
    }

    /// Take a slot if one is available right now.
    pub fn try_acquire(&self) -> bool {
        self.limiter.check().is_ok()
    }
}
