// ABOUTME: Per-platform request pacing shared by every concurrent caller of a platform
// ABOUTME: Staggers requests to a requests-per-second ceiling and honors Retry-After penalties
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

use std::collections::HashMap;
use std::time::Duration;

use tokio::sync::Mutex;
use tokio::time::{sleep_until, Instant};
use tracing::{debug, warn};

use crate::constants::tuning::{
    FACEBOOK_MAX_RPS, GOHIGHLEVEL_MAX_RPS, GOOGLE_ADS_MAX_RPS, GOOGLE_SHEETS_MAX_RPS,
};
use crate::models::Platform;

/// Pacing state for one platform
#[derive(Debug)]
struct Pacer {
    interval: Duration,
    next_slot: Mutex<Instant>,
}

/// Per-platform request pacer
///
/// Each platform owns its own lock, so waiting on one platform never delays
/// another. The lock is held only while a slot is reserved, never across the
/// wait itself.
#[derive(Debug)]
pub struct RateLimiter {
    pacers: HashMap<Platform, Pacer>,
}

impl RateLimiter {
    /// Limiter with the given requests-per-second ceilings
    ///
    /// Platforms absent from `ceilings`, or with a non-positive ceiling, are
    /// not paced.
    #[must_use]
    pub fn new(ceilings: &[(Platform, f64)]) -> Self {
        let now = Instant::now();
        let pacers = ceilings
            .iter()
            .filter(|(_, rps)| *rps > 0.0 && rps.is_finite())
            .map(|(platform, rps)| {
                (
                    *platform,
                    Pacer {
                        interval: Duration::from_secs_f64(1.0 / rps),
                        next_slot: Mutex::new(now),
                    },
                )
            })
            .collect();
        Self { pacers }
    }

    /// Limiter that never waits
    #[must_use]
    pub fn unlimited() -> Self {
        Self {
            pacers: HashMap::new(),
        }
    }

    /// Minimum spacing between requests to `platform`
    #[must_use]
    pub fn interval(&self, platform: Platform) -> Option<Duration> {
        self.pacers.get(&platform).map(|pacer| pacer.interval)
    }

    /// Wait for the next request slot for `platform`
    pub async fn acquire(&self, platform: Platform) {
        let Some(pacer) = self.pacers.get(&platform) else {
            return;
        };
        let slot = {
            let mut next_slot = pacer.next_slot.lock().await;
            let now = Instant::now();
            let slot = (*next_slot).max(now);
            *next_slot = slot + pacer.interval;
            slot
        };
        if slot > Instant::now() {
            debug!(platform = %platform, wait_ms = (slot - Instant::now()).as_millis() as u64, "rate limiter wait");
            sleep_until(slot).await;
        }
    }

    /// Push the platform's next slot at least `delay` into the future
    ///
    /// Used when a platform answers with `Retry-After`, so every concurrent
    /// caller of that platform backs off together.
    pub async fn penalize(&self, platform: Platform, delay: Duration) {
        let Some(pacer) = self.pacers.get(&platform) else {
            return;
        };
        let Some(until) = Instant::now().checked_add(delay) else {
            warn!(platform = %platform, delay_secs = delay.as_secs(), "ignoring unrepresentable rate limit penalty");
            return;
        };
        let mut next_slot = pacer.next_slot.lock().await;
        if until > *next_slot {
            *next_slot = until;
        }
    }
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::new(&[
            (Platform::Facebook, FACEBOOK_MAX_RPS),
            (Platform::GoogleAds, GOOGLE_ADS_MAX_RPS),
            (Platform::GoHighLevel, GOHIGHLEVEL_MAX_RPS),
            (Platform::GoogleSheets, GOOGLE_SHEETS_MAX_RPS),
        ])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[tokio::test]
    async fn staggers_requests_for_one_platform() {
        let limiter = RateLimiter::new(&[(Platform::Facebook, 20.0)]);
        let start = Instant::now();
        for _ in 0..4 {
            limiter.acquire(Platform::Facebook).await;
        }
        // first slot is immediate, the next three are 50ms apart
        assert!(start.elapsed() >= Duration::from_millis(140));
    }

    #[tokio::test]
    async fn other_platforms_are_not_delayed() {
        let limiter = Arc::new(RateLimiter::new(&[
            (Platform::Facebook, 1.0),
            (Platform::GoogleAds, 1000.0),
        ]));
        limiter.acquire(Platform::Facebook).await;
        limiter.penalize(Platform::Facebook, Duration::from_secs(5)).await;

        let start = Instant::now();
        limiter.acquire(Platform::GoogleAds).await;
        limiter.acquire(Platform::GoHighLevel).await;
        assert!(start.elapsed() < Duration::from_millis(100));
    }

    #[tokio::test]
    async fn penalty_delays_the_next_slot() {
        let limiter = RateLimiter::new(&[(Platform::GoHighLevel, 1000.0)]);
        limiter.penalize(Platform::GoHighLevel, Duration::from_millis(150)).await;

        let start = Instant::now();
        limiter.acquire(Platform::GoHighLevel).await;
        assert!(start.elapsed() >= Duration::from_millis(140));
    }

    #[tokio::test]
    async fn unrepresentable_penalty_is_ignored() {
        let limiter = RateLimiter::new(&[(Platform::GoHighLevel, 1000.0)]);
        limiter.penalize(Platform::GoHighLevel, Duration::from_secs(u64::MAX)).await;

        let start = Instant::now();
        limiter.acquire(Platform::GoHighLevel).await;
        assert!(start.elapsed() < Duration::from_millis(100));
    }

    #[test]
    fn unpaced_platforms_have_no_interval() {
        let limiter = RateLimiter::new(&[(Platform::GoogleSheets, 0.0)]);
        assert_eq!(limiter.interval(Platform::GoogleSheets), None);
        assert_eq!(
            RateLimiter::default().interval(Platform::Facebook),
            Some(Duration::from_millis(200))
        );
    }
}
