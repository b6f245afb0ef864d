// ABOUTME: Exponential backoff retry for rate-limit and transport failures with jitter
// ABOUTME: Configuration loads from environment with defaults; auth and API failures are never retried
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

use std::env;
use std::future::Future;
use std::str::FromStr;
use std::time::Duration;

use rand::Rng;
use tokio::time::sleep;
use tracing::{info, warn};

use crate::constants::env_config::{
    RETRY_BASE_DELAY_MS, RETRY_JITTER_FACTOR, RETRY_MAX_ATTEMPTS, RETRY_MAX_DELAY_MS,
};
use crate::constants::tuning::{
    DEFAULT_RETRY_BASE_DELAY_MS, DEFAULT_RETRY_JITTER_FACTOR, DEFAULT_RETRY_MAX_ATTEMPTS,
    DEFAULT_RETRY_MAX_DELAY_MS,
};
use crate::errors::{PlatformError, PlatformResult};
use crate::models::Platform;
use crate::rate_limiter::RateLimiter;

/// Backoff settings shared by every adapter
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetryBackoffConfig {
    /// Total attempts, including the first
    pub max_attempts: u32,
    /// Delay before the second attempt
    pub base_delay_ms: u64,
    /// Upper bound for any single delay
    pub max_delay_ms: u64,
    /// Random spread applied to each delay, `0.0..=1.0`
    pub jitter_factor: f64,
}

impl Default for RetryBackoffConfig {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_RETRY_MAX_ATTEMPTS,
            base_delay_ms: DEFAULT_RETRY_BASE_DELAY_MS,
            max_delay_ms: DEFAULT_RETRY_MAX_DELAY_MS,
            jitter_factor: DEFAULT_RETRY_JITTER_FACTOR,
        }
    }
}

impl RetryBackoffConfig {
    /// Read `TULEN_RETRY_*` variables, falling back to defaults for missing or bad values
    #[must_use]
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            max_attempts: env_parse(RETRY_MAX_ATTEMPTS).unwrap_or(defaults.max_attempts).max(1),
            base_delay_ms: env_parse(RETRY_BASE_DELAY_MS).unwrap_or(defaults.base_delay_ms),
            max_delay_ms: env_parse(RETRY_MAX_DELAY_MS).unwrap_or(defaults.max_delay_ms),
            jitter_factor: env_parse::<f64>(RETRY_JITTER_FACTOR)
                .unwrap_or(defaults.jitter_factor)
                .clamp(0.0, 1.0),
        }
    }

    /// Fast settings for tests: no jitter, tiny delays
    #[must_use]
    pub const fn immediate(max_attempts: u32, base_delay_ms: u64) -> Self {
        Self {
            max_attempts,
            base_delay_ms,
            max_delay_ms: base_delay_ms * 64,
            jitter_factor: 0.0,
        }
    }

    /// Backoff before retrying after failed attempt number `attempt` (1-based)
    ///
    /// `base * 2^(attempt - 1)`, capped at `max_delay_ms`, then spread by
    /// `±jitter_factor`.
    #[must_use]
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(20);
        let raw = self.base_delay_ms.saturating_mul(1_u64 << exponent);
        let capped = raw.min(self.max_delay_ms) as f64;
        let jittered = if self.jitter_factor > 0.0 {
            let spread = capped * self.jitter_factor;
            capped + rand::thread_rng().gen_range(-spread..=spread)
        } else {
            capped
        };
        Duration::from_millis(jittered.max(0.0) as u64)
    }
}

fn env_parse<T: FromStr>(key: &str) -> Option<T> {
    env::var(key).ok().and_then(|value| value.trim().parse().ok())
}

/// Run `operation` with pacing and exponential backoff
///
/// Every attempt first waits for a slot from `limiter`. Retryable failures
/// (`RateLimited`, `Network`) are retried until `config.max_attempts` is
/// spent; a `Retry-After` hint, capped at `config.max_delay_ms`, lengthens
/// the delay and penalizes the platform's limiter. Any other error is
/// returned immediately.
///
/// # Errors
///
/// The last error once attempts are exhausted, with `RateLimited.attempts`
/// set to the number of attempts made, or the first non-retryable error.
pub async fn with_retry<T, F, Fut>(
    platform: Platform,
    config: &RetryBackoffConfig,
    limiter: &RateLimiter,
    mut operation: F,
) -> PlatformResult<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = PlatformResult<T>>,
{
    let max_attempts = config.max_attempts.max(1);
    let mut attempt = 0;
    loop {
        attempt += 1;
        limiter.acquire(platform).await;

        let error = match operation().await {
            Ok(value) => {
                if attempt > 1 {
                    info!(platform = %platform, attempt, "request succeeded after retry");
                }
                return Ok(value);
            }
            Err(error) if error.is_retryable() => error,
            Err(error) => return Err(error),
        };

        if attempt >= max_attempts {
            warn!(platform = %platform, attempts = attempt, error = %error, "retries exhausted");
            return Err(match error {
                PlatformError::RateLimited {
                    platform,
                    retry_after_secs,
                    ..
                } => PlatformError::RateLimited {
                    platform,
                    retry_after_secs,
                    attempts: attempt,
                },
                other => other,
            });
        }

        let mut delay = config.delay_for_attempt(attempt);
        if let PlatformError::RateLimited {
            retry_after_secs: Some(secs),
            ..
        } = &error
        {
            // Hints beyond the backoff cap are not honored
            let hinted = Duration::from_secs(*secs).min(Duration::from_millis(config.max_delay_ms));
            limiter.penalize(platform, hinted).await;
            delay = delay.max(hinted);
        }

        warn!(
            platform = %platform,
            attempt,
            max_attempts,
            delay_ms = delay.as_millis() as u64,
            error = %error,
            "retrying after backoff"
        );
        sleep(delay).await;
    }
}
