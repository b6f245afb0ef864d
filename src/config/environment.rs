// ABOUTME: Environment-driven server configuration with typed defaults
// ABOUTME: Loads database, timeout, cache, retry, rate ceiling and platform credential settings
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

//! Environment-based configuration. There are no config files; every value
//! has a default except platform credentials, whose absence simply leaves the
//! platform unregistered.

use std::collections::BTreeMap;
use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use tracing::{info, warn};
use tulen_adapters::{
    initialize_shared_client, shared_client, AdapterContext, AdapterRegistry,
    FacebookAdsAdapter, GoHighLevelAdapter, GoogleAdsAdapter, GoogleSheetsAdapter, RateLimiter,
    RetryBackoffConfig,
};

use super::credentials::{OAuthClientConfig, PlatformCredentials};
use crate::constants::env_config;
use crate::constants::oauth::DEFAULT_REFRESH_THRESHOLD_SECS;
use crate::constants::tuning::{
    DEFAULT_CACHE_MAX_ENTRIES, DEFAULT_CACHE_TTL_SECS, DEFAULT_FETCH_TIMEOUT_SECS,
    DEFAULT_HTTP_CONNECT_TIMEOUT_SECS, DEFAULT_HTTP_TIMEOUT_SECS, FACEBOOK_MAX_RPS,
    GOHIGHLEVEL_MAX_RPS, GOOGLE_ADS_MAX_RPS, GOOGLE_SHEETS_MAX_RPS,
};
use crate::errors::{AppError, AppResult};
use crate::models::Platform;

/// Token store used when `DATABASE_URL` is unset
pub const DEFAULT_DATABASE_URL: &str = "sqlite:./data/tulen.db";

/// Redirect URI used when `OAUTH_REDIRECT_URI` is unset
pub const DEFAULT_REDIRECT_URI: &str = "http://localhost:8080/oauth/callback";

/// Response cache settings
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheConfig {
    /// Lifetime of a cached envelope
    pub ttl: Duration,
    /// Maximum cached envelopes before LRU eviction
    pub max_entries: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl: Duration::from_secs(DEFAULT_CACHE_TTL_SECS),
            max_entries: DEFAULT_CACHE_MAX_ENTRIES,
        }
    }
}

/// HTTP client timeouts applied to the shared client
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HttpConfig {
    /// Whole-request timeout in seconds
    pub timeout_secs: u64,
    /// Connect timeout in seconds
    pub connect_timeout_secs: u64,
}

/// Complete runtime configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Token store URL
    pub database_url: String,
    /// Refresh tokens expiring within this window
    pub refresh_threshold: Duration,
    /// Upper bound for one platform fetch, refresh included
    pub fetch_timeout: Duration,
    /// Shared HTTP client timeouts
    pub http: HttpConfig,
    /// Envelope cache settings
    pub cache: CacheConfig,
    /// Adapter backoff settings
    pub retry: RetryBackoffConfig,
    /// Requests-per-second ceiling per platform
    pub rate_limits: Vec<(Platform, f64)>,
    /// Redirect URI registered with every platform
    pub oauth_redirect_uri: String,
    /// Credentials for every configured platform
    pub credentials: BTreeMap<Platform, PlatformCredentials>,
    /// JSON file of client account bindings
    pub clients_file: Option<PathBuf>,
}

impl ServerConfig {
    /// Load configuration from environment variables
    ///
    /// # Errors
    ///
    /// Returns a configuration error when a variable is present but cannot be
    /// parsed; missing variables fall back to defaults.
    pub fn from_env() -> AppResult<Self> {
        let retry_defaults = RetryBackoffConfig::default();
        let retry = RetryBackoffConfig {
            max_attempts: env_or(env_config::RETRY_MAX_ATTEMPTS, retry_defaults.max_attempts)?
                .max(1),
            base_delay_ms: env_or(env_config::RETRY_BASE_DELAY_MS, retry_defaults.base_delay_ms)?,
            max_delay_ms: env_or(env_config::RETRY_MAX_DELAY_MS, retry_defaults.max_delay_ms)?,
            jitter_factor: env_or(env_config::RETRY_JITTER_FACTOR, retry_defaults.jitter_factor)?
                .clamp(0.0, 1.0),
        };

        let rate_limits = vec![
            (Platform::Facebook, env_or(env_config::FACEBOOK_MAX_RPS, FACEBOOK_MAX_RPS)?),
            (Platform::GoogleAds, env_or(env_config::GOOGLE_ADS_MAX_RPS, GOOGLE_ADS_MAX_RPS)?),
            (Platform::GoHighLevel, env_or(env_config::GOHIGHLEVEL_MAX_RPS, GOHIGHLEVEL_MAX_RPS)?),
            (Platform::GoogleSheets, env_or(env_config::GOOGLE_SHEETS_MAX_RPS, GOOGLE_SHEETS_MAX_RPS)?),
        ];

        let credentials = Platform::ALL
            .into_iter()
            .filter_map(|platform| {
                PlatformCredentials::from_env(platform).map(|creds| (platform, creds))
            })
            .collect();

        let config = Self {
            database_url: env::var(env_config::DATABASE_URL)
                .unwrap_or_else(|_| DEFAULT_DATABASE_URL.to_owned()),
            refresh_threshold: Duration::from_secs(env_or(
                env_config::REFRESH_THRESHOLD_SECS,
                DEFAULT_REFRESH_THRESHOLD_SECS,
            )?),
            fetch_timeout: Duration::from_secs(env_or(
                env_config::FETCH_TIMEOUT_SECS,
                DEFAULT_FETCH_TIMEOUT_SECS,
            )?),
            http: HttpConfig {
                timeout_secs: env_or(env_config::HTTP_TIMEOUT_SECS, DEFAULT_HTTP_TIMEOUT_SECS)?,
                connect_timeout_secs: env_or(
                    env_config::HTTP_CONNECT_TIMEOUT_SECS,
                    DEFAULT_HTTP_CONNECT_TIMEOUT_SECS,
                )?,
            },
            cache: CacheConfig {
                ttl: Duration::from_secs(env_or(env_config::CACHE_TTL_SECS, DEFAULT_CACHE_TTL_SECS)?),
                max_entries: env_or(env_config::CACHE_MAX_ENTRIES, DEFAULT_CACHE_MAX_ENTRIES)?,
            },
            retry,
            rate_limits,
            oauth_redirect_uri: env::var(env_config::OAUTH_REDIRECT_URI)
                .unwrap_or_else(|_| DEFAULT_REDIRECT_URI.to_owned()),
            credentials,
            clients_file: env::var(env_config::CLIENTS_FILE).ok().map(PathBuf::from),
        };
        config.log_summary();
        Ok(config)
    }

    /// Credentials for `platform`, when configured
    #[must_use]
    pub fn credentials_for(&self, platform: Platform) -> Option<&PlatformCredentials> {
        self.credentials.get(&platform)
    }

    /// OAuth endpoint settings for every configured platform
    #[must_use]
    pub fn oauth_clients(&self) -> Vec<OAuthClientConfig> {
        self.credentials
            .values()
            .map(|creds| OAuthClientConfig::new(creds.clone(), self.oauth_redirect_uri.clone()))
            .collect()
    }

    /// Adapter context over the shared HTTP client with the configured ceilings
    #[must_use]
    pub fn adapter_context(&self) -> AdapterContext {
        initialize_shared_client(self.http.timeout_secs, self.http.connect_timeout_secs);
        AdapterContext::new(
            shared_client().clone(),
            Arc::new(RateLimiter::new(&self.rate_limits)),
            self.retry,
        )
    }

    /// Register an adapter for every platform that has credentials
    #[must_use]
    pub fn adapter_registry(&self, context: &AdapterContext) -> AdapterRegistry {
        let mut registry = AdapterRegistry::new();
        for credentials in self.credentials.values() {
            match credentials {
                PlatformCredentials::Facebook { .. } => {
                    registry.register(Arc::new(FacebookAdsAdapter::new(context.clone())));
                }
                PlatformCredentials::GoogleAds {
                    developer_token,
                    login_customer_id,
                    ..
                } => registry.register(Arc::new(GoogleAdsAdapter::new(
                    context.clone(),
                    developer_token.clone(),
                    login_customer_id.clone(),
                ))),
                PlatformCredentials::GoHighLevel { .. } => {
                    registry.register(Arc::new(GoHighLevelAdapter::new(context.clone())));
                }
                PlatformCredentials::GoogleSheets { .. } => {
                    registry.register(Arc::new(GoogleSheetsAdapter::new(context.clone())));
                }
            }
        }
        registry
    }

    fn log_summary(&self) {
        let configured: Vec<&str> = self.credentials.keys().map(|p| p.platform_key()).collect();
        info!(
            database_url = %redact_database_url(&self.database_url),
            refresh_threshold_secs = self.refresh_threshold.as_secs(),
            fetch_timeout_secs = self.fetch_timeout.as_secs(),
            cache_ttl_secs = self.cache.ttl.as_secs(),
            retry_max_attempts = self.retry.max_attempts,
            platforms = ?configured,
            "configuration loaded"
        );
        for platform in Platform::ALL {
            match self.credentials.get(&platform) {
                Some(creds) => info!(
                    platform = %platform,
                    secret_fingerprint = %creds.secret_fingerprint(),
                    "platform credentials present"
                ),
                None => warn!(platform = %platform, "platform credentials missing, platform disabled"),
            }
        }
    }
}

/// Parse `key`, falling back to `default` when unset
fn env_or<T: FromStr>(key: &str, default: T) -> AppResult<T> {
    match env::var(key) {
        Ok(raw) if !raw.trim().is_empty() => raw
            .trim()
            .parse()
            .map_err(|_| AppError::config(format!("{key} has an invalid value: {raw}"))),
        _ => Ok(default),
    }
}

/// Strip credentials from a database URL before logging it
fn redact_database_url(url: &str) -> String {
    match (url.find("://"), url.rfind('@')) {
        (Some(scheme_end), Some(at)) if at > scheme_end => {
            format!("{}://***{}", &url[..scheme_end], &url[at..])
        }
        _ => url.to_owned(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn database_url_credentials_are_redacted() {
        assert_eq!(
            redact_database_url("postgres://user:pw@db:5432/tulen"),
            "postgres://***@db:5432/tulen"
        );
        assert_eq!(redact_database_url("sqlite:./data/tulen.db"), "sqlite:./data/tulen.db");
    }
}
