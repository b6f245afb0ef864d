// ABOUTME: Environment variable names read by the configuration layer
// ABOUTME: Centralized so the CLI help text and config loader never drift apart
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

/// Token store database URL
pub const DATABASE_URL: &str = "DATABASE_URL";
/// Refresh threshold override in seconds
pub const REFRESH_THRESHOLD_SECS: &str = "TULEN_REFRESH_THRESHOLD_SECS";
/// Per-platform fetch timeout in seconds
pub const FETCH_TIMEOUT_SECS: &str = "TULEN_FETCH_TIMEOUT_SECS";
/// Shared HTTP client request timeout
pub const HTTP_TIMEOUT_SECS: &str = "TULEN_HTTP_TIMEOUT_SECS";
/// Shared HTTP client connect timeout
pub const HTTP_CONNECT_TIMEOUT_SECS: &str = "TULEN_HTTP_CONNECT_TIMEOUT_SECS";
/// Envelope cache TTL
pub const CACHE_TTL_SECS: &str = "TULEN_CACHE_TTL_SECS";
/// Envelope cache capacity
pub const CACHE_MAX_ENTRIES: &str = "TULEN_CACHE_MAX_ENTRIES";
/// Retry attempt cap
pub const RETRY_MAX_ATTEMPTS: &str = "TULEN_RETRY_MAX_ATTEMPTS";
/// Retry base delay
pub const RETRY_BASE_DELAY_MS: &str = "TULEN_RETRY_BASE_DELAY_MS";
/// Retry delay ceiling
pub const RETRY_MAX_DELAY_MS: &str = "TULEN_RETRY_MAX_DELAY_MS";
/// Retry jitter factor
pub const RETRY_JITTER_FACTOR: &str = "TULEN_RETRY_JITTER_FACTOR";
/// Client bindings JSON file
pub const CLIENTS_FILE: &str = "TULEN_CLIENTS_FILE";
/// OAuth redirect URI registered with every platform
pub const OAUTH_REDIRECT_URI: &str = "OAUTH_REDIRECT_URI";

/// Facebook app id
pub const FACEBOOK_APP_ID: &str = "FACEBOOK_APP_ID";
/// Facebook app secret
pub const FACEBOOK_APP_SECRET: &str = "FACEBOOK_APP_SECRET";
/// Google OAuth client id
pub const GOOGLE_CLIENT_ID: &str = "GOOGLE_CLIENT_ID";
/// Google OAuth client secret
pub const GOOGLE_CLIENT_SECRET: &str = "GOOGLE_CLIENT_SECRET";
/// Google Ads developer token
pub const GOOGLE_ADS_DEVELOPER_TOKEN: &str = "GOOGLE_ADS_DEVELOPER_TOKEN";
/// Google Ads manager (MCC) customer id
pub const GOOGLE_ADS_LOGIN_CUSTOMER_ID: &str = "GOOGLE_ADS_LOGIN_CUSTOMER_ID";
/// GoHighLevel client id
pub const GHL_CLIENT_ID: &str = "GHL_CLIENT_ID";
/// GoHighLevel client secret
pub const GHL_CLIENT_SECRET: &str = "GHL_CLIENT_SECRET";

/// Facebook request ceiling override (requests per second)
pub const FACEBOOK_MAX_RPS: &str = "TULEN_FACEBOOK_MAX_RPS";
/// Google Ads request ceiling override
pub const GOOGLE_ADS_MAX_RPS: &str = "TULEN_GOOGLE_ADS_MAX_RPS";
/// GoHighLevel request ceiling override
pub const GOHIGHLEVEL_MAX_RPS: &str = "TULEN_GOHIGHLEVEL_MAX_RPS";
/// Google Sheets request ceiling override
pub const GOOGLE_SHEETS_MAX_RPS: &str = "TULEN_GOOGLE_SHEETS_MAX_RPS";
