// ABOUTME: Structured per-platform error taxonomy for adapters, token manager and orchestrator
// ABOUTME: Carries the platform, a serializable error kind and retry classification
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

use std::fmt::{self, Display, Formatter};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::models::Platform;

/// Why an authentication attempt failed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthFailure {
    /// No token record, or nothing usable to refresh with
    NotConnected,
    /// Access token expired and could not be renewed
    Expired,
    /// Platform rejected the token (HTTP 401 or platform auth error code)
    Rejected,
    /// Refresh exchange failed for a transient reason
    RefreshFailed,
    /// Refresh token revoked or invalid (`invalid_grant`)
    Revoked,
    /// OAuth `state` unknown, expired, reused or issued for another platform
    InvalidState,
}

impl AuthFailure {
    /// Stable snake-case code
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::NotConnected => "not_connected",
            Self::Expired => "expired",
            Self::Rejected => "rejected",
            Self::RefreshFailed => "refresh_failed",
            Self::Revoked => "revoked",
            Self::InvalidState => "invalid_state",
        }
    }
}

impl Display for AuthFailure {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Serializable discriminant reported in `CompositeResult.errors`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Token missing, expired, rejected or revoked
    Auth,
    /// Platform throttling after retries were exhausted
    RateLimit,
    /// Timeout or connection failure after retries were exhausted
    Network,
    /// Non-auth, non-throttling platform failure
    Api,
    /// Missing binding, bad date range or missing platform configuration
    Config,
    /// Caller cancelled the request
    Cancelled,
    /// Token store read or write failed
    Storage,
}

/// Error raised while talking to one platform
///
/// Every variant that concerns a specific platform carries it, so the
/// orchestrator can attribute a failure without extra bookkeeping.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum PlatformError {
    /// Authentication failure
    #[error("{platform} authentication failed ({reason}): {detail}")]
    Auth {
        /// Platform that rejected authentication
        platform: Platform,
        /// Failure reason code
        reason: AuthFailure,
        /// Human-readable detail
        detail: String,
    },

    /// Rate limit exceeded after the retry budget was spent
    #[error("{platform} rate limit exceeded after {attempts} attempt(s)")]
    RateLimited {
        /// Throttled platform
        platform: Platform,
        /// Server-suggested wait, when provided
        retry_after_secs: Option<u64>,
        /// Attempts made before giving up
        attempts: u32,
    },

    /// Transport failure or timeout
    #[error("{platform} network error: {message}")]
    Network {
        /// Unreachable platform
        platform: Platform,
        /// Transport error description
        message: String,
    },

    /// Platform returned a failure with a message
    #[error("{platform} API error: {message}")]
    Api {
        /// Failing platform
        platform: Platform,
        /// HTTP status, when the failure came from a response
        status_code: Option<u16>,
        /// Platform-provided message
        message: String,
    },

    /// Configuration problem (no binding, invalid input, unregistered platform)
    #[error("configuration error: {message}")]
    Config {
        /// Platform concerned, if any
        platform: Option<Platform>,
        /// Description
        message: String,
    },

    /// Caller cancelled the request
    #[error("request cancelled")]
    Cancelled,

    /// Token store failure
    #[error("token store error: {message}")]
    Storage {
        /// Description
        message: String,
    },
}

impl PlatformError {
    /// Authentication failure with a reason code
    #[must_use]
    pub fn auth(platform: Platform, reason: AuthFailure, detail: impl Into<String>) -> Self {
        Self::Auth {
            platform,
            reason,
            detail: detail.into(),
        }
    }

    /// `AuthError("not_connected")`
    #[must_use]
    pub fn not_connected(platform: Platform) -> Self {
        Self::auth(
            platform,
            AuthFailure::NotConnected,
            format!("{} is not connected", platform.display_name()),
        )
    }

    /// Configuration error not tied to a platform
    #[must_use]
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            platform: None,
            message: message.into(),
        }
    }

    /// Configuration error for one platform
    #[must_use]
    pub fn config_for(platform: Platform, message: impl Into<String>) -> Self {
        Self::Config {
            platform: Some(platform),
            message: message.into(),
        }
    }

    /// Network error
    #[must_use]
    pub fn network(platform: Platform, message: impl Into<String>) -> Self {
        Self::Network {
            platform,
            message: message.into(),
        }
    }

    /// API error
    #[must_use]
    pub fn api(platform: Platform, status_code: Option<u16>, message: impl Into<String>) -> Self {
        Self::Api {
            platform,
            status_code,
            message: message.into(),
        }
    }

    /// Storage error
    #[must_use]
    pub fn storage(message: impl Into<String>) -> Self {
        Self::Storage {
            message: message.into(),
        }
    }

    /// Serializable kind
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::Auth { .. } => ErrorKind::Auth,
            Self::RateLimited { .. } => ErrorKind::RateLimit,
            Self::Network { .. } => ErrorKind::Network,
            Self::Api { .. } => ErrorKind::Api,
            Self::Config { .. } => ErrorKind::Config,
            Self::Cancelled => ErrorKind::Cancelled,
            Self::Storage { .. } => ErrorKind::Storage,
        }
    }

    /// Platform the error is attributed to
    #[must_use]
    pub const fn platform(&self) -> Option<Platform> {
        match self {
            Self::Auth { platform, .. }
            | Self::RateLimited { platform, .. }
            | Self::Network { platform, .. }
            | Self::Api { platform, .. } => Some(*platform),
            Self::Config { platform, .. } => *platform,
            Self::Cancelled | Self::Storage { .. } => None,
        }
    }

    /// Rate-limit and network failures are retried with backoff; nothing else is
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::RateLimited { .. } | Self::Network { .. })
    }

    /// Auth failure reason, if this is an auth error
    #[must_use]
    pub const fn auth_reason(&self) -> Option<AuthFailure> {
        match self {
            Self::Auth { reason, .. } => Some(*reason),
            _ => None,
        }
    }
}

/// Result alias for per-platform operations
pub type PlatformResult<T> = Result<T, PlatformError>;
