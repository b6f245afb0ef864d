// ABOUTME: OAuth lifecycle defaults for token refresh, state validation and PKCE
// ABOUTME: Values chosen conservatively and overridable through configuration
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

/// Refresh a token this many seconds before it expires
pub const DEFAULT_REFRESH_THRESHOLD_SECS: u64 = 300;

/// Lifetime assumed when a token response carries no `expires_in`
pub const DEFAULT_TOKEN_EXPIRY_SECS: i64 = 3600;

/// Facebook long-lived tokens last roughly 60 days
pub const FACEBOOK_LONG_LIVED_EXPIRY_SECS: i64 = 60 * 24 * 3600;

/// Pending authorization states expire after 10 minutes
pub const STATE_TTL_SECS: i64 = 600;

/// PKCE code verifier length (RFC 7636 allows 43-128)
pub const CODE_VERIFIER_LENGTH: usize = 64;

/// Default token type when the endpoint omits it
pub const DEFAULT_TOKEN_TYPE: &str = "Bearer";
