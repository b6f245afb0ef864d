// ABOUTME: Unified error handling with standard error codes for the integration core
// ABOUTME: AppError for configuration/persistence/CLI paths, PlatformError for per-platform failures
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

//! # Unified Error Handling System
//!
//! Two layers of errors live here:
//!
//! - [`PlatformError`]: what an adapter, the token manager or the orchestrator
//!   reports for one platform. Its [`ErrorKind`] is what callers see in
//!   `CompositeResult.errors`.
//! - [`AppError`]: the crate-wide error for configuration loading, token
//!   persistence and the CLI. Any `PlatformError` converts into one.

/// Per-platform error taxonomy
pub mod platform;

pub use platform::{AuthFailure, ErrorKind, PlatformError, PlatformResult};

use std::error::Error as StdError;
use std::fmt::{self, Display, Formatter};
use std::io;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Standard error codes used throughout the application
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrorCode {
    // Authentication (1000-1999)
    /// Platform is not connected
    #[serde(rename = "AUTH_REQUIRED")]
    AuthRequired = 1000,
    /// Credentials rejected
    #[serde(rename = "AUTH_INVALID")]
    AuthInvalid = 1001,
    /// Credentials expired or revoked
    #[serde(rename = "AUTH_EXPIRED")]
    AuthExpired = 1002,

    // Rate Limiting (2000-2999)
    /// Platform throttled the request
    #[serde(rename = "RATE_LIMIT_EXCEEDED")]
    RateLimitExceeded = 2000,

    // Validation (3000-3999)
    /// Caller input rejected
    #[serde(rename = "INVALID_INPUT")]
    InvalidInput = 3000,

    // External Services (5000-5999)
    /// Platform returned a failure
    #[serde(rename = "EXTERNAL_SERVICE_ERROR")]
    ExternalServiceError = 5000,
    /// Platform unreachable
    #[serde(rename = "EXTERNAL_SERVICE_UNAVAILABLE")]
    ExternalServiceUnavailable = 5001,

    // Configuration (6000-6999)
    /// Missing or unusable setting
    #[serde(rename = "CONFIG_ERROR")]
    ConfigError = 6000,

    // Lifecycle (7000-7999)
    /// Caller cancelled the operation
    #[serde(rename = "OPERATION_CANCELLED")]
    OperationCancelled = 7000,

    // Internal Errors (9000-9999)
    /// Unexpected internal failure
    #[serde(rename = "INTERNAL_ERROR")]
    InternalError = 9000,
    /// Token store failure
    #[serde(rename = "DATABASE_ERROR")]
    DatabaseError = 9001,
    /// JSON encode/decode failure
    #[serde(rename = "SERIALIZATION_ERROR")]
    SerializationError = 9003,
}

impl ErrorCode {
    /// User-facing description
    #[must_use]
    pub const fn description(self) -> &'static str {
        match self {
            Self::AuthRequired => "The platform is not connected",
            Self::AuthInvalid => "The platform rejected the stored credentials",
            Self::AuthExpired => "The platform credentials expired or were revoked",
            Self::RateLimitExceeded => "The platform rate limit was exceeded",
            Self::InvalidInput => "The provided input is invalid",
            Self::ExternalServiceError => "An external platform returned an error",
            Self::ExternalServiceUnavailable => "An external platform is unreachable",
            Self::ConfigError => "Configuration error encountered",
            Self::OperationCancelled => "The operation was cancelled",
            Self::InternalError => "An internal error occurred",
            Self::DatabaseError => "Token store operation failed",
            Self::SerializationError => "Data serialization/deserialization failed",
        }
    }
}

/// Unified error type for configuration, persistence and CLI paths
#[derive(Debug, Error)]
pub struct AppError {
    /// Error code
    pub code: ErrorCode,
    /// Human-readable error message
    pub message: String,
    /// Source error for error chaining
    #[source]
    pub source: Option<Box<dyn StdError + Send + Sync>>,
}

impl AppError {
    /// Create a new error with the given code and message
    #[must_use]
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            source: None,
        }
    }

    /// Attach a source error
    #[must_use]
    pub fn with_source(mut self, source: impl StdError + Send + Sync + 'static) -> Self {
        self.source = Some(Box::new(source));
        self
    }

    /// Invalid input
    #[must_use]
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InvalidInput, message)
    }

    /// Configuration error
    #[must_use]
    pub fn config(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::ConfigError, message)
    }

}

impl Display for AppError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.code.description(), self.message)
    }
}

/// Result type alias for convenience
pub type AppResult<T> = Result<T, AppError>;

impl From<PlatformError> for AppError {
    fn from(error: PlatformError) -> Self {
        let code = match &error {
            PlatformError::Auth { reason, .. } => match reason {
                AuthFailure::NotConnected => ErrorCode::AuthRequired,
                AuthFailure::Expired | AuthFailure::Revoked => ErrorCode::AuthExpired,
                AuthFailure::Rejected | AuthFailure::RefreshFailed | AuthFailure::InvalidState => {
                    ErrorCode::AuthInvalid
                }
            },
            PlatformError::RateLimited { .. } => ErrorCode::RateLimitExceeded,
            PlatformError::Network { .. } => ErrorCode::ExternalServiceUnavailable,
            PlatformError::Api { .. } => ErrorCode::ExternalServiceError,
            PlatformError::Config { .. } => ErrorCode::ConfigError,
            PlatformError::Cancelled => ErrorCode::OperationCancelled,
            PlatformError::Storage { .. } => ErrorCode::DatabaseError,
        };
        let message = error.to_string();
        Self::new(code, message).with_source(error)
    }
}

impl From<serde_json::Error> for AppError {
    fn from(error: serde_json::Error) -> Self {
        Self::new(ErrorCode::SerializationError, error.to_string()).with_source(error)
    }
}

impl From<io::Error> for AppError {
    fn from(error: io::Error) -> Self {
        Self::new(ErrorCode::InternalError, error.to_string()).with_source(error)
    }
}

#[cfg(feature = "database-errors")]
impl From<sqlx::Error> for AppError {
    fn from(error: sqlx::Error) -> Self {
        Self::new(ErrorCode::DatabaseError, error.to_string()).with_source(error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Platform;

    #[test]
    fn test_platform_error_maps_to_code() {
        let app: AppError = PlatformError::not_connected(Platform::Facebook).into();
        assert_eq!(app.code, ErrorCode::AuthRequired);

        let app: AppError = PlatformError::Cancelled.into();
        assert_eq!(app.code, ErrorCode::OperationCancelled);

        let app: AppError = PlatformError::config("start date after end date").into();
        assert_eq!(app.code, ErrorCode::ConfigError);
    }

    #[test]
    fn test_error_code_serialization() {
        let error = AppError::invalid_input("bad date");
        let json = serde_json::to_string(&error.code).unwrap();
        assert_eq!(json, "\"INVALID_INPUT\"");
        assert_eq!(
            error.to_string(),
            "The provided input is invalid: bad date"
        );
    }
}
