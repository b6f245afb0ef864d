// ABOUTME: Shared helpers for adapter integration tests against wiremock servers
// ABOUTME: Builds adapter contexts with an unpaced limiter and millisecond backoff
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
#![allow(dead_code)]

use std::sync::Arc;

use tulen_adapters::{AdapterContext, RateLimiter, RetryBackoffConfig};
use tulen_core::models::DateRange;

/// Base delay used by [`fast_context`]
pub const BASE_DELAY_MS: u64 = 20;

/// Context with no pacing and a 3-attempt, 20 ms backoff
pub fn fast_context() -> AdapterContext {
    AdapterContext::new(
        reqwest::Client::new(),
        Arc::new(RateLimiter::unlimited()),
        RetryBackoffConfig::immediate(3, BASE_DELAY_MS),
    )
}

/// Context with production pacing, so `Retry-After` penalties reach the limiter
pub fn paced_context() -> AdapterContext {
    AdapterContext::new(
        reqwest::Client::new(),
        Arc::new(RateLimiter::default()),
        RetryBackoffConfig::immediate(3, BASE_DELAY_MS),
    )
}

/// March 2024
pub fn march() -> DateRange {
    DateRange::parse("2024-03-01", "2024-03-31").unwrap()
}
