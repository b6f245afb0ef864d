// ABOUTME: Logging configuration and structured tracing subscriber setup
// ABOUTME: Reads format and level from the environment and quiets HTTP and SQL client noise
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

//! Structured logging. Token values never reach a log line; events carry a
//! `platform` field plus presence and expiry information only.

use std::env;
use std::io;

use anyhow::{anyhow, Result};
use chrono::{DateTime, Utc};
use serde_json::json;
use tracing::{info, warn};
use tracing_subscriber::fmt::{self, format::FmtSpan};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

use crate::models::Platform;

/// Default service name attached to startup events
pub const DEFAULT_SERVICE_NAME: &str = "tulen-reporting";

/// Logging configuration
#[derive(Debug, Clone)]
pub struct LoggingConfig {
    /// Base filter directive (trace, debug, info, warn, error or a full `EnvFilter` string)
    pub level: String,
    /// Output format
    pub format: LogFormat,
    /// Include source file and line numbers
    pub include_location: bool,
    /// Include span open/close events
    pub include_spans: bool,
    /// Service name for structured logging
    pub service_name: String,
    /// Service version
    pub service_version: String,
    /// Environment (development, staging, production)
    pub environment: String,
}

/// Log output format options
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    /// JSON lines for production log shipping
    Json,
    /// Multi-line human readable output
    Pretty,
    /// Single-line output for terminals
    Compact,
}

impl LogFormat {
    /// Parse `LOG_FORMAT`, defaulting to pretty
    #[must_use]
    pub fn from_str_or_default(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "json" => Self::Json,
            "compact" => Self::Compact,
            _ => Self::Pretty,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".into(),
            format: LogFormat::Pretty,
            include_location: false,
            include_spans: false,
            service_name: DEFAULT_SERVICE_NAME.into(),
            service_version: env!("CARGO_PKG_VERSION").to_owned(),
            environment: "development".into(),
        }
    }
}

impl LoggingConfig {
    /// Create logging configuration from environment variables
    #[must_use]
    pub fn from_env() -> Self {
        let environment = env::var("ENVIRONMENT").unwrap_or_else(|_| "development".into());
        let is_production = environment == "production";

        Self {
            level: env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
            format: env::var("LOG_FORMAT").map_or_else(
                |_| {
                    if is_production {
                        LogFormat::Json
                    } else {
                        LogFormat::Pretty
                    }
                },
                |raw| LogFormat::from_str_or_default(&raw),
            ),
            include_location: is_production || env::var("LOG_INCLUDE_LOCATION").is_ok(),
            include_spans: env::var("LOG_INCLUDE_SPANS").is_ok(),
            service_name: env::var("SERVICE_NAME").unwrap_or_else(|_| DEFAULT_SERVICE_NAME.into()),
            service_version: env!("CARGO_PKG_VERSION").to_owned(),
            environment,
        }
    }

    /// Filter built from `level` with HTTP and SQL client noise reduced
    #[must_use]
    pub fn env_filter(&self) -> EnvFilter {
        let quiet = [
            ("hyper", "warn"),
            ("hyper_util", "warn"),
            ("reqwest", "warn"),
            ("rustls", "warn"),
            ("sqlx", "warn"),
        ];
        let mut filter = EnvFilter::try_new(&self.level).unwrap_or_else(|_| EnvFilter::new("info"));
        for (target, level) in quiet {
            if let Ok(directive) = format!("{target}={level}").parse() {
                filter = filter.add_directive(directive);
            }
        }
        filter
    }

    /// Install the global tracing subscriber
    ///
    /// # Errors
    ///
    /// Returns an error if a global subscriber is already installed
    pub fn init(&self) -> Result<()> {
        let span_events = if self.include_spans {
            FmtSpan::NEW | FmtSpan::CLOSE
        } else {
            FmtSpan::NONE
        };
        let registry = tracing_subscriber::registry().with(self.env_filter());

        let installed = match self.format {
            LogFormat::Json => registry
                .with(
                    fmt::layer()
                        .json()
                        .with_file(self.include_location)
                        .with_line_number(self.include_location)
                        .with_target(true)
                        .with_writer(io::stderr)
                        .with_span_events(span_events),
                )
                .try_init(),
            LogFormat::Pretty => registry
                .with(
                    fmt::layer()
                        .with_file(self.include_location)
                        .with_line_number(self.include_location)
                        .with_target(true)
                        .with_writer(io::stderr)
                        .with_span_events(span_events),
                )
                .try_init(),
            LogFormat::Compact => registry
                .with(
                    fmt::layer()
                        .compact()
                        .with_target(false)
                        .with_writer(io::stderr)
                        .with_span_events(FmtSpan::NONE),
                )
                .try_init(),
        };
        installed.map_err(|e| anyhow!("failed to install tracing subscriber: {e}"))?;

        self.log_startup_info();
        Ok(())
    }

    fn log_startup_info(&self) {
        let summary = json!({
            "service": {
                "name": self.service_name,
                "version": self.service_version,
                "environment": self.environment,
            },
            "logging": {
                "level": self.level,
                "format": format!("{:?}", self.format),
                "location": self.include_location,
                "spans": self.include_spans,
            }
        });
        info!(
            service.name = %self.service_name,
            service.version = %self.service_version,
            environment = %self.environment,
            config = %summary,
            "logging initialized"
        );
    }
}

/// Initialize logging from environment
///
/// # Errors
///
/// Returns an error if logging initialization fails
pub fn init_from_env() -> Result<()> {
    LoggingConfig::from_env().init()
}

/// Structured events for the credential lifecycle
///
/// Only token presence and expiry are recorded, never token values.
pub struct AppLogger;

impl AppLogger {
    /// Connect, exchange, refresh and disconnect outcomes
    pub fn log_oauth_event(platform: Platform, event: &str, success: bool, detail: Option<&str>) {
        if success {
            info!(
                platform = %platform,
                oauth.event = %event,
                oauth.success = success,
                oauth.detail = detail.unwrap_or(""),
                "OAuth event"
            );
        } else {
            warn!(
                platform = %platform,
                oauth.event = %event,
                oauth.success = success,
                oauth.detail = detail.unwrap_or(""),
                "OAuth event"
            );
        }
    }

    /// A token write, described without its secrets
    pub fn log_token_write(
        platform: Platform,
        connected: bool,
        has_refresh_token: bool,
        expires_at: DateTime<Utc>,
    ) {
        info!(
            platform = %platform,
            token.connected = connected,
            token.has_refresh = has_refresh_token,
            token.expires_at = %expires_at.to_rfc3339(),
            "token record written"
        );
    }

    /// Outcome of one platform fetch inside a dashboard request
    pub fn log_platform_fetch(
        platform: Platform,
        client_id: &str,
        success: bool,
        duration_ms: u64,
        cached: bool,
    ) {
        info!(
            platform = %platform,
            client.id = %client_id,
            fetch.success = success,
            fetch.duration_ms = duration_ms,
            fetch.cached = cached,
            "platform fetch finished"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn log_format_parses_known_values() {
        assert_eq!(LogFormat::from_str_or_default("JSON"), LogFormat::Json);
        assert_eq!(LogFormat::from_str_or_default("compact"), LogFormat::Compact);
        assert_eq!(LogFormat::from_str_or_default("fancy"), LogFormat::Pretty);
    }

    #[test]
    fn filter_keeps_noise_reduction_with_custom_level() {
        let config = LoggingConfig {
            level: "debug,tulen_reporting=trace".into(),
            ..LoggingConfig::default()
        };
        let rendered = config.env_filter().to_string().to_ascii_lowercase();
        assert!(rendered.contains("reqwest=warn"));
        assert!(rendered.contains("sqlx=warn"));
        assert!(rendered.contains("tulen_reporting=trace"));
    }
}
