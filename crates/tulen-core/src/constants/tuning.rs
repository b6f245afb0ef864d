// ABOUTME: Request tuning defaults for timeouts, retries, rate ceilings and caching
// ABOUTME: Per-platform request-per-second ceilings reflect each API's documented quotas
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

/// Per-platform fetch timeout enforced by the orchestrator
pub const DEFAULT_FETCH_TIMEOUT_SECS: u64 = 30;

/// Shared HTTP client request timeout
pub const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 30;

/// Shared HTTP client connect timeout
pub const DEFAULT_HTTP_CONNECT_TIMEOUT_SECS: u64 = 10;

/// Attempt cap for rate-limit and network retries inside an adapter
pub const DEFAULT_RETRY_MAX_ATTEMPTS: u32 = 3;

/// First backoff delay
pub const DEFAULT_RETRY_BASE_DELAY_MS: u64 = 500;

/// Backoff ceiling
pub const DEFAULT_RETRY_MAX_DELAY_MS: u64 = 30_000;

/// Random jitter applied to each backoff delay (fraction of the delay)
pub const DEFAULT_RETRY_JITTER_FACTOR: f64 = 0.1;

/// Facebook Marketing API request ceiling
pub const FACEBOOK_MAX_RPS: f64 = 5.0;

/// Google Ads API request ceiling
pub const GOOGLE_ADS_MAX_RPS: f64 = 10.0;

/// LeadConnector burst limit is 100 requests per 10 seconds
pub const GOHIGHLEVEL_MAX_RPS: f64 = 10.0;

/// Sheets allows 300 read requests per minute per project
pub const GOOGLE_SHEETS_MAX_RPS: f64 = 5.0;

/// Page size requested from paginated endpoints
pub const DEFAULT_PAGE_SIZE: u32 = 100;

/// Hard stop for page draining so a misbehaving cursor cannot loop forever
pub const MAX_PAGES: usize = 500;

/// Orchestrator envelope cache TTL
pub const DEFAULT_CACHE_TTL_SECS: u64 = 300;

/// Orchestrator envelope cache capacity
pub const DEFAULT_CACHE_MAX_ENTRIES: usize = 1000;
