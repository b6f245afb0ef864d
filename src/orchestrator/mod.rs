// ABOUTME: Analytics orchestrator fanning a dashboard request out to every bound platform
// ABOUTME: Isolates per-platform failures, retries once after a token refresh and honors cancellation
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

//! # Analytics Orchestrator
//!
//! `get_dashboard_data` resolves a client's account bindings, fetches every
//! bound platform concurrently and merges the settled outcomes into a
//! [`CompositeResult`]. One platform failing never fails the call: it becomes
//! an entry in `errors` while the other platforms still contribute.
//!
//! Each platform fetch is bounded by the configured timeout and raced
//! against the caller's [`CancellationToken`]. A cancelled request fails as a
//! whole with `Cancelled` and writes nothing to the cache.

/// Envelope cache
pub mod cache;

use std::sync::Arc;
use std::time::{Duration, Instant};

use futures_util::future::join_all;
use tokio::time::timeout;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::adapters::{fetch_envelope, AdapterRegistry, PlatformAdapter};
use crate::clients::ClientDirectory;
use crate::config::{CacheConfig, ServerConfig};
use crate::errors::{ErrorKind, PlatformError, PlatformResult};
use crate::logging::AppLogger;
use crate::models::{
    ClientAccountBinding, CompositeResult, DateRange, FetchOptions, MetricsEnvelope, Platform,
};
use crate::oauth::TokenManager;

pub use cache::{CacheKey, EnvelopeCache};

/// Coordinates token retrieval, adapter calls and result merging
pub struct AnalyticsOrchestrator {
    tokens: Arc<TokenManager>,
    adapters: AdapterRegistry,
    clients: Arc<dyn ClientDirectory>,
    cache: EnvelopeCache,
    fetch_timeout: Duration,
}

impl AnalyticsOrchestrator {
    /// Orchestrator over explicit parts
    #[must_use]
    pub fn new(
        tokens: Arc<TokenManager>,
        adapters: AdapterRegistry,
        clients: Arc<dyn ClientDirectory>,
        cache: &CacheConfig,
        fetch_timeout: Duration,
    ) -> Self {
        Self {
            tokens,
            adapters,
            clients,
            cache: EnvelopeCache::new(cache),
            fetch_timeout,
        }
    }

    /// Orchestrator using the cache and timeout settings of `config`
    #[must_use]
    pub fn from_config(
        config: &ServerConfig,
        tokens: Arc<TokenManager>,
        adapters: AdapterRegistry,
        clients: Arc<dyn ClientDirectory>,
    ) -> Self {
        Self::new(tokens, adapters, clients, &config.cache, config.fetch_timeout)
    }

    /// Token manager shared with the adapters' callers
    #[must_use]
    pub fn tokens(&self) -> &Arc<TokenManager> {
        &self.tokens
    }

    /// Metrics from every platform bound to `client_id`
    ///
    /// # Errors
    ///
    /// `Config` for an unknown client, `Cancelled` when `cancel` fires
    /// before the result is assembled. Per-platform failures are reported
    /// inside the result.
    pub async fn get_dashboard_data(
        &self,
        client_id: &str,
        date_range: &DateRange,
        options: &FetchOptions,
        cancel: &CancellationToken,
    ) -> PlatformResult<CompositeResult> {
        if cancel.is_cancelled() {
            return Err(PlatformError::Cancelled);
        }
        let binding = self.resolve_client(client_id).await?;
        let platforms = binding.bound_platforms();
        info!(
            client_id,
            range = %date_range,
            platforms = ?platforms,
            "dashboard request started"
        );

        let binding = &binding;
        let outcomes = join_all(platforms.into_iter().map(|platform| async move {
            let outcome = self
                .fetch_platform(binding, platform, date_range, options, cancel)
                .await;
            (platform, outcome)
        }))
        .await;

        if cancel.is_cancelled() {
            info!(client_id, "dashboard request cancelled, discarding results");
            return Err(PlatformError::Cancelled);
        }

        let result = CompositeResult::assemble(binding.client_id.clone(), *date_range, outcomes);
        info!(
            client_id,
            failed = result.errors().len(),
            partial = result.is_partial(),
            "dashboard request finished"
        );
        Ok(result)
    }

    /// Metrics from one platform for `client_id`
    ///
    /// # Errors
    ///
    /// `Config` for an unknown client or an unbound platform, `Cancelled`
    /// when `cancel` fires, otherwise the platform's own failure
    pub async fn get_platform_data_only(
        &self,
        client_id: &str,
        date_range: &DateRange,
        platform: Platform,
        options: &FetchOptions,
        cancel: &CancellationToken,
    ) -> PlatformResult<MetricsEnvelope> {
        if cancel.is_cancelled() {
            return Err(PlatformError::Cancelled);
        }
        let binding = self.resolve_client(client_id).await?;
        let outcome = self
            .fetch_platform(&binding, platform, date_range, options, cancel)
            .await;
        if cancel.is_cancelled() {
            return Err(PlatformError::Cancelled);
        }
        outcome
    }

    /// Forget cached envelopes for `client_id`
    pub async fn invalidate_client(&self, client_id: &str) -> usize {
        self.cache.invalidate_client(client_id).await
    }

    /// Number of cached envelopes
    pub async fn cached_entries(&self) -> usize {
        self.cache.len().await
    }

    async fn resolve_client(&self, client_id: &str) -> PlatformResult<ClientAccountBinding> {
        if client_id.trim().is_empty() {
            return Err(PlatformError::config("client id is empty"));
        }
        self.clients
            .binding(client_id)
            .await?
            .ok_or_else(|| PlatformError::config(format!("unknown client: {client_id}")))
    }

    async fn fetch_platform(
        &self,
        binding: &ClientAccountBinding,
        platform: Platform,
        date_range: &DateRange,
        options: &FetchOptions,
        cancel: &CancellationToken,
    ) -> PlatformResult<MetricsEnvelope> {
        let account_id = binding.account_for(platform).ok_or_else(|| {
            PlatformError::config_for(
                platform,
                format!("client {} has no {} account bound", binding.client_id, platform.display_name()),
            )
        })?;
        let adapter = self.adapters.get(platform).ok_or_else(|| {
            PlatformError::config_for(
                platform,
                format!("{} is not configured", platform.display_name()),
            )
        })?;

        let mut options = options.clone();
        if platform == Platform::GoogleSheets && options.sheet_ranges.is_empty() {
            options.sheet_ranges.clone_from(&binding.google_sheets_ranges);
        }

        let key = CacheKey::new(binding.client_id.clone(), platform, *date_range, &options);
        if let Some(envelope) = self.cache.get(&key).await {
            AppLogger::log_platform_fetch(platform, &binding.client_id, true, 0, true);
            return Ok(envelope);
        }

        let started = Instant::now();
        let outcome = tokio::select! {
            biased;
            () = cancel.cancelled() => Err(PlatformError::Cancelled),
            result = timeout(
                self.fetch_timeout,
                self.fetch_with_reauth(adapter.as_ref(), &account_id, date_range, &options),
            ) => result.unwrap_or_else(|_| {
                Err(PlatformError::network(
                    platform,
                    format!("fetch timed out after {}ms", self.fetch_timeout.as_millis()),
                ))
            }),
        };
        AppLogger::log_platform_fetch(
            platform,
            &binding.client_id,
            outcome.is_ok(),
            started.elapsed().as_millis() as u64,
            false,
        );

        match &outcome {
            Ok(envelope) if !cancel.is_cancelled() => {
                self.cache.put(key, envelope.clone()).await;
            }
            Ok(_) => debug!(platform = %platform, "fetch finished after cancellation, not cached"),
            Err(e) => debug!(platform = %platform, error = %e, "platform fetch failed"),
        }
        outcome
    }

    /// One adapter call, plus a single refresh-and-retry on an auth rejection
    ///
    /// A second rejection is terminal: the platform's tokens are cleared.
    async fn fetch_with_reauth(
        &self,
        adapter: &dyn PlatformAdapter,
        account_id: &str,
        date_range: &DateRange,
        options: &FetchOptions,
    ) -> PlatformResult<MetricsEnvelope> {
        let platform = adapter.platform();
        let token = self.tokens.get_access_token(platform).await?;
        let error = match fetch_envelope(adapter, &token, account_id, date_range, options).await {
            Err(error) if error.kind() == ErrorKind::Auth => error,
            other => return other,
        };

        warn!(platform = %platform, error = %error, "token rejected, refreshing once");
        let token = self.tokens.refresh_tokens(platform).await?;
        let second = fetch_envelope(adapter, &token, account_id, date_range, options).await;
        if let Err(error) = &second {
            if error.kind() == ErrorKind::Auth {
                warn!(platform = %platform, "token rejected after refresh, disconnecting");
                if let Err(e) = self.tokens.clear_tokens(platform).await {
                    warn!(platform = %platform, error = %e, "could not clear rejected tokens");
                }
            }
        }
        second
    }
}
