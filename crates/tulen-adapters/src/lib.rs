// ABOUTME: Marketing platform adapters for Facebook Ads, Google Ads, GoHighLevel and Google Sheets
// ABOUTME: Adapter contract, shared HTTP client, per-platform rate limiting, retry and page draining
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

//! Platform adapters and the plumbing they share.
//!
//! Every adapter receives an access token that the caller obtained from the
//! token lifecycle manager; adapters never read or write token records.

// Re-export tulen-core modules so adapters can keep `use crate::errors::*` etc.
pub use tulen_core::constants;
pub use tulen_core::errors;
pub use tulen_core::models;

/// Adapter trait and the context every adapter is built from
pub mod core;
/// Shared HTTP client and single-request execution
pub mod http_client;
/// Unit and key normalization helpers
pub mod normalize;
/// Ordered page draining over cursor-paginated endpoints
pub mod pagination;
/// Per-platform request pacing
pub mod rate_limiter;
/// Exponential backoff retry for throttling and transport failures
pub mod retry;

/// Facebook Marketing API insights adapter
pub mod facebook;
/// GoHighLevel contacts and opportunities adapter
pub mod gohighlevel;
/// Google Ads `searchStream` adapter
pub mod google_ads;
/// Google Sheets `values:batchGet` adapter
pub mod google_sheets;

pub use crate::core::{fetch_envelope, AdapterContext, AdapterRegistry, PlatformAdapter};
pub use facebook::FacebookAdsAdapter;
pub use gohighlevel::GoHighLevelAdapter;
pub use google_ads::GoogleAdsAdapter;
pub use google_sheets::GoogleSheetsAdapter;
pub use http_client::{initialize_shared_client, shared_client};
pub use pagination::{drain_pages, Page, PageStream};
pub use rate_limiter::RateLimiter;
pub use retry::{with_retry, RetryBackoffConfig};
