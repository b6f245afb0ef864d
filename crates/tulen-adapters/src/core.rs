// ABOUTME: Platform adapter contract, shared adapter context and adapter registry
// ABOUTME: Every adapter normalizes one platform's metrics into a complete MetricsEnvelope
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

//! # Platform Adapter Contract
//!
//! An adapter turns `(access token, account id, date range, options)` into a
//! [`MetricsEnvelope`]. The contract every implementation honors:
//!
//! - multi-page and multi-batch responses are drained completely before an
//!   envelope is built;
//! - platform units and keys are normalized (micro-currency, breakdown keys);
//! - requests are paced through the shared [`RateLimiter`] and throttling or
//!   transport failures are retried with backoff up to a fixed attempt cap;
//! - an auth rejection is returned as `PlatformError::Auth` without retrying;
//!   refreshing is the caller's job.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use futures_util::future::try_join;
use reqwest::{Client, RequestBuilder};
use serde::de::DeserializeOwned;

use crate::errors::PlatformResult;
use crate::http_client::{execute_json, shared_client, ErrorClassifier};
use crate::models::{DateRange, FetchOptions, MetricsEnvelope, Platform};
use crate::rate_limiter::RateLimiter;
use crate::retry::{with_retry, RetryBackoffConfig};

/// Common interface satisfied by each platform adapter
#[async_trait]
pub trait PlatformAdapter: Send + Sync {
    /// Platform served by this adapter
    fn platform(&self) -> Platform;

    /// Fetch and normalize metrics for one account and period
    ///
    /// `options.include_previous_period` is handled by [`fetch_envelope`];
    /// implementations fetch exactly `date_range`.
    ///
    /// # Errors
    ///
    /// `Auth` on rejected tokens, `RateLimited`/`Network` after retries are
    /// exhausted, `Api` for any other platform failure.
    async fn fetch_metrics(
        &self,
        access_token: &str,
        account_id: &str,
        date_range: &DateRange,
        options: &FetchOptions,
    ) -> PlatformResult<MetricsEnvelope>;
}

/// Fetch an envelope, adding the preceding period when requested
///
/// Both periods are fetched concurrently; the envelope exists only if both
/// succeed.
///
/// # Errors
///
/// The first error from either period
pub async fn fetch_envelope(
    adapter: &dyn PlatformAdapter,
    access_token: &str,
    account_id: &str,
    date_range: &DateRange,
    options: &FetchOptions,
) -> PlatformResult<MetricsEnvelope> {
    if !options.include_previous_period {
        return adapter
            .fetch_metrics(access_token, account_id, date_range, options)
            .await;
    }

    let previous_range = date_range.previous_period();
    let previous_options = FetchOptions {
        include_previous_period: false,
        breakdowns: Vec::new(),
        sheet_ranges: options.sheet_ranges.clone(),
    };
    let (current, previous) = try_join(
        adapter.fetch_metrics(access_token, account_id, date_range, options),
        adapter.fetch_metrics(access_token, account_id, &previous_range, &previous_options),
    )
    .await?;
    Ok(current.with_previous_period(previous))
}

/// Shared plumbing handed to every adapter
#[derive(Debug, Clone)]
pub struct AdapterContext {
    /// HTTP client (normally the shared pooled client)
    pub client: Client,
    /// Per-platform pacing shared by all adapters
    pub limiter: Arc<RateLimiter>,
    /// Backoff settings
    pub retry: RetryBackoffConfig,
}

impl AdapterContext {
    /// Context from explicit parts
    #[must_use]
    pub const fn new(client: Client, limiter: Arc<RateLimiter>, retry: RetryBackoffConfig) -> Self {
        Self {
            client,
            limiter,
            retry,
        }
    }

    /// Shared client, default ceilings and environment retry settings
    #[must_use]
    pub fn from_env() -> Self {
        Self::new(
            shared_client().clone(),
            Arc::new(RateLimiter::default()),
            RetryBackoffConfig::from_env(),
        )
    }

    /// Issue a request with pacing and retries and decode the JSON body
    ///
    /// `build` is called once per attempt since a request body cannot be
    /// replayed.
    ///
    /// # Errors
    ///
    /// See [`with_retry`] and [`execute_json`]
    pub async fn request_json<T, B>(
        &self,
        platform: Platform,
        classify: ErrorClassifier,
        build: B,
    ) -> PlatformResult<T>
    where
        T: DeserializeOwned + Send,
        B: Fn(&Client) -> RequestBuilder + Send + Sync,
    {
        with_retry(platform, &self.retry, &self.limiter, || {
            let request = build(&self.client);
            execute_json(platform, request, classify)
        })
        .await
    }
}

impl Default for AdapterContext {
    fn default() -> Self {
        Self::from_env()
    }
}

/// Adapters keyed by platform
///
/// Platforms without credentials are simply never registered.
#[derive(Clone, Default)]
pub struct AdapterRegistry {
    adapters: HashMap<Platform, Arc<dyn PlatformAdapter>>,
}

impl AdapterRegistry {
    /// Empty registry
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an adapter under its own platform, replacing any previous one
    pub fn register(&mut self, adapter: Arc<dyn PlatformAdapter>) {
        self.adapters.insert(adapter.platform(), adapter);
    }

    /// Builder form of [`Self::register`]
    #[must_use]
    pub fn with(mut self, adapter: Arc<dyn PlatformAdapter>) -> Self {
        self.register(adapter);
        self
    }

    /// Adapter for `platform`
    #[must_use]
    pub fn get(&self, platform: Platform) -> Option<Arc<dyn PlatformAdapter>> {
        self.adapters.get(&platform).cloned()
    }

    /// Registered platforms, in display order
    #[must_use]
    pub fn platforms(&self) -> Vec<Platform> {
        Platform::ALL
            .into_iter()
            .filter(|platform| self.adapters.contains_key(platform))
            .collect()
    }
}
