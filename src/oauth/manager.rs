// ABOUTME: Token lifecycle manager owning every read and write of OAuth token records
// ABOUTME: Single-flights refreshes per platform and drives the authorization code flow
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

//! # Token Lifecycle
//!
//! Per platform the manager moves a record through
//! `disconnected -> connected -> refreshing -> connected | error -> disconnected`.
//!
//! Refreshes are serialized by a per-platform mutex. A caller that waited on
//! the mutex re-reads the record before doing anything: if another caller
//! refreshed (or failed to) while it waited, it takes that outcome instead of
//! issuing a second exchange. Different platforms never share a lock.
//!
//! Each refresh runs on its own task. A caller that is cancelled or times out
//! stops waiting, but the exchange still finishes and its outcome is recorded,
//! so the platform is never left in `refreshing` and a rotated refresh token
//! is never lost.

use std::collections::{BTreeMap, HashMap};
use std::fmt::{self, Display, Formatter};
use std::sync::Arc;
use std::time::Duration as StdDuration;

use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::{debug, info, instrument, warn};
use url::{form_urlencoded, Url};

use super::client::{HttpTokenEndpoint, PkceParams, RefreshGrant, TokenEndpoint};
use super::state::StateRegistry;
use crate::config::{OAuthClientConfig, ServerConfig};
use crate::errors::{AuthFailure, PlatformError, PlatformResult};
use crate::logging::AppLogger;
use crate::models::{AccountInfo, OAuthTokenRecord, Platform, TokenSet};
use crate::store::TokenStore;

/// Connection state of one platform
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionState {
    /// No usable token
    Disconnected,
    /// Token stored
    Connected,
    /// A refresh exchange is in flight
    Refreshing,
    /// The last refresh failed transiently; the record is kept
    Error,
}

impl Display for ConnectionState {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Disconnected => "disconnected",
            Self::Connected => "connected",
            Self::Refreshing => "refreshing",
            Self::Error => "error",
        })
    }
}

/// Where to send the user to grant access
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthorizationRequest {
    /// Platform being connected
    pub platform: Platform,
    /// Full authorization URL
    pub url: String,
    /// Encoded state the redirect must hand back
    pub state: String,
}

/// Query parameters of an OAuth redirect
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct CallbackParams {
    /// Authorization code
    pub code: Option<String>,
    /// State issued by [`TokenManager::begin_authorization`]
    pub state: Option<String>,
    /// Error code when the user or platform declined (`access_denied`)
    pub error: Option<String>,
    /// Human readable error
    pub error_description: Option<String>,
}

impl CallbackParams {
    /// Parse a full redirect URL or a bare query string
    #[must_use]
    pub fn from_redirect_url(raw: &str) -> Self {
        let raw = raw.trim();
        let query = Url::parse(raw).map_or_else(
            |_| raw.trim_start_matches('?').to_owned(),
            |url| url.query().unwrap_or_default().to_owned(),
        );
        let mut params = Self::default();
        for (key, value) in form_urlencoded::parse(query.as_bytes()) {
            let value = Some(value.into_owned());
            match key.as_ref() {
                "code" => params.code = value,
                "state" => params.state = value,
                "error" => params.error = value,
                "error_description" => params.error_description = value,
                _ => {}
            }
        }
        params
    }
}

#[derive(Debug, Clone)]
struct RefreshFailure {
    at: DateTime<Utc>,
    error: PlatformError,
}

/// Records, exchanges and per-platform refresh bookkeeping
///
/// Shared with the detached refresh tasks, so it outlives any one caller.
struct TokenLifecycle {
    store: Arc<dyn TokenStore>,
    endpoint: Arc<dyn TokenEndpoint>,
    refresh_locks: DashMap<Platform, Arc<Mutex<()>>>,
    transient: DashMap<Platform, ConnectionState>,
    last_failure: DashMap<Platform, RefreshFailure>,
    refresh_threshold: Duration,
}

/// Owner of the token store and the OAuth exchanges
pub struct TokenManager {
    lifecycle: Arc<TokenLifecycle>,
    clients: HashMap<Platform, OAuthClientConfig>,
    states: StateRegistry,
}

impl TokenManager {
    /// Manager over explicit parts
    #[must_use]
    pub fn new(
        store: Arc<dyn TokenStore>,
        endpoint: Arc<dyn TokenEndpoint>,
        clients: impl IntoIterator<Item = OAuthClientConfig>,
        refresh_threshold: StdDuration,
    ) -> Self {
        Self {
            lifecycle: Arc::new(TokenLifecycle {
                store,
                endpoint,
                refresh_locks: DashMap::new(),
                transient: DashMap::new(),
                last_failure: DashMap::new(),
                refresh_threshold: Duration::from_std(refresh_threshold)
                    .unwrap_or_else(|_| Duration::minutes(5)),
            }),
            clients: clients
                .into_iter()
                .map(|config| (config.platform(), config))
                .collect(),
            states: StateRegistry::new(),
        }
    }

    /// Manager for the configured platforms, exchanging tokens over `client`
    #[must_use]
    pub fn from_config(config: &ServerConfig, store: Arc<dyn TokenStore>, client: Client) -> Self {
        let clients = config.oauth_clients();
        let endpoint = Arc::new(HttpTokenEndpoint::new(client, clients.clone()));
        Self::new(store, endpoint, clients, config.refresh_threshold)
    }

    /// Replace the pending-state registry (custom lifetimes in tests)
    #[must_use]
    pub fn with_state_registry(mut self, states: StateRegistry) -> Self {
        self.states = states;
        self
    }

    /// Platforms with OAuth client credentials
    #[must_use]
    pub fn configured_platforms(&self) -> Vec<Platform> {
        Platform::ALL
            .into_iter()
            .filter(|platform| self.clients.contains_key(platform))
            .collect()
    }

    /// A currently valid access token for `platform`
    ///
    /// Refreshes first when the token expires within the refresh threshold.
    /// Concurrent callers needing a refresh share a single exchange.
    ///
    /// # Errors
    ///
    /// `Auth(not_connected)` without a usable record, `Auth(revoked)` or
    /// `Auth(refresh_failed)` when the refresh fails, `Storage` on store failure
    pub async fn get_access_token(&self, platform: Platform) -> PlatformResult<String> {
        let record = self.lifecycle.load_connected(platform).await?;
        if !record.needs_refresh_at(Utc::now(), self.lifecycle.refresh_threshold) {
            if let Some(token) = record.access_token() {
                return Ok(token.to_owned());
            }
        }
        debug!(platform = %platform, expires_at = %record.expires_at(), "token within refresh threshold");
        self.refresh_detached(platform, false).await
    }

    /// Refresh now, whatever the current expiry
    ///
    /// Used after a platform rejected a token that looked valid.
    ///
    /// # Errors
    ///
    /// As [`Self::get_access_token`]
    pub async fn refresh_tokens(&self, platform: Platform) -> PlatformResult<String> {
        self.refresh_detached(platform, true).await
    }

    /// Store tokens and account metadata in one atomic write
    ///
    /// # Errors
    ///
    /// `Config` for an empty access token or account metadata belonging to
    /// another platform, `Storage` on store failure
    pub async fn store_tokens(
        &self,
        platform: Platform,
        tokens: TokenSet,
        account_info: Option<AccountInfo>,
    ) -> PlatformResult<OAuthTokenRecord> {
        if tokens.access_token.trim().is_empty() {
            return Err(PlatformError::config_for(
                platform,
                "refusing to store an empty access token",
            ));
        }
        if let Some(info) = &account_info {
            if info.platform() != platform {
                return Err(PlatformError::config_for(
                    platform,
                    format!("account info for {} cannot be stored under {platform}", info.platform()),
                ));
            }
        }

        let record = OAuthTokenRecord::connected(platform, tokens, account_info);
        self.lifecycle.write(&record).await?;
        self.lifecycle.transient.remove(&platform);
        self.lifecycle.last_failure.remove(&platform);
        Ok(record)
    }

    /// Whether `platform` holds an access token
    ///
    /// A store failure reads as disconnected.
    pub async fn is_connected(&self, platform: Platform) -> bool {
        match self.lifecycle.store.get(platform).await {
            Ok(record) => record.as_ref().is_some_and(OAuthTokenRecord::is_connected),
            Err(e) => {
                warn!(platform = %platform, error = %e, "token store unreadable, reporting disconnected");
                false
            }
        }
    }

    /// Remove every credential for `platform`
    ///
    /// # Errors
    ///
    /// `Storage` on store failure
    pub async fn clear_tokens(&self, platform: Platform) -> PlatformResult<()> {
        self.lifecycle
            .write(&OAuthTokenRecord::disconnected(platform))
            .await?;
        self.lifecycle.transient.remove(&platform);
        AppLogger::log_oauth_event(platform, "disconnect", true, None);
        Ok(())
    }

    /// Connection state of every platform
    ///
    /// # Errors
    ///
    /// `Storage` when the records cannot be listed
    pub async fn connection_status(&self) -> PlatformResult<BTreeMap<Platform, ConnectionState>> {
        let records = self.lifecycle.store.list().await?;
        Ok(Platform::ALL
            .into_iter()
            .map(|platform| {
                let stored = records
                    .iter()
                    .find(|record| record.platform() == platform)
                    .is_some_and(OAuthTokenRecord::is_connected);
                let state = self.lifecycle.transient.get(&platform).map_or(
                    if stored {
                        ConnectionState::Connected
                    } else {
                        ConnectionState::Disconnected
                    },
                    |entry| *entry.value(),
                );
                (platform, state)
            })
            .collect())
    }

    /// Start the authorization code flow for `platform`
    ///
    /// # Errors
    ///
    /// `Config` when the platform has no client credentials or a malformed
    /// authorization URL
    pub fn begin_authorization(&self, platform: Platform) -> PlatformResult<AuthorizationRequest> {
        let config = self.client_config(platform)?;
        let mut url = Url::parse(&config.auth_url).map_err(|e| {
            PlatformError::config_for(platform, format!("invalid authorization URL: {e}"))
        })?;

        let pkce = config.use_pkce.then(PkceParams::generate);
        let state = self.states.issue(platform, pkce.clone());
        {
            let mut query = url.query_pairs_mut();
            query
                .append_pair("client_id", config.credentials.client_id())
                .append_pair("redirect_uri", &config.redirect_uri)
                .append_pair("response_type", "code")
                .append_pair("scope", &config.scopes.join(" "))
                .append_pair("state", &state);
            if platform.is_google() {
                query
                    .append_pair("access_type", "offline")
                    .append_pair("prompt", "consent");
            }
            if let Some(pkce) = &pkce {
                query
                    .append_pair("code_challenge", &pkce.code_challenge)
                    .append_pair("code_challenge_method", &pkce.code_challenge_method);
            }
        }

        AppLogger::log_oauth_event(platform, "authorization_started", true, None);
        Ok(AuthorizationRequest {
            platform,
            url: url.into(),
            state,
        })
    }

    /// Exchange an authorization code and store the resulting tokens
    ///
    /// The state is validated and consumed before any network call.
    ///
    /// # Errors
    ///
    /// `Auth(invalid_state)` for a bad state or empty code; otherwise the
    /// exchange or storage error
    #[instrument(skip_all, fields(platform = %platform))]
    pub async fn exchange_code_for_tokens(
        &self,
        platform: Platform,
        code: &str,
        state: &str,
    ) -> PlatformResult<OAuthTokenRecord> {
        let pkce = self.states.consume(platform, state)?;
        if code.trim().is_empty() {
            AppLogger::log_oauth_event(platform, "code_exchange", false, Some("empty code"));
            return Err(PlatformError::auth(
                platform,
                AuthFailure::InvalidState,
                "authorization code is empty",
            ));
        }

        let grant = match self.lifecycle.endpoint.exchange_code(platform, code.trim(), pkce.as_ref()).await {
            Ok(grant) => grant,
            Err(e) => {
                AppLogger::log_oauth_event(platform, "code_exchange", false, Some(&e.to_string()));
                return Err(e);
            }
        };
        let record = self
            .store_tokens(platform, grant.tokens, grant.account_info)
            .await?;
        AppLogger::log_oauth_event(platform, "code_exchange", true, None);
        Ok(record)
    }

    /// Finish an authorization from the redirect's query parameters
    ///
    /// # Errors
    ///
    /// `Auth(rejected)` when the redirect carries an `error`,
    /// `Auth(invalid_state)` when code or state is missing, and the errors of
    /// [`Self::exchange_code_for_tokens`]
    pub async fn complete_authorization(
        &self,
        platform: Platform,
        params: &CallbackParams,
    ) -> PlatformResult<OAuthTokenRecord> {
        if let Some(error) = params.error.as_deref() {
            if let Some(state) = params.state.as_deref() {
                // Drop the pending entry; the result is irrelevant here
                let _ = self.states.consume(platform, state);
            }
            let detail = params
                .error_description
                .as_deref()
                .map_or_else(|| error.to_owned(), |description| format!("{error}: {description}"));
            AppLogger::log_oauth_event(platform, "authorization_denied", false, Some(&detail));
            return Err(PlatformError::auth(platform, AuthFailure::Rejected, detail));
        }

        let state = params.state.as_deref().ok_or_else(|| {
            PlatformError::auth(platform, AuthFailure::InvalidState, "redirect carried no state")
        })?;
        let code = params.code.as_deref().unwrap_or_default();
        self.exchange_code_for_tokens(platform, code, state).await
    }

    fn client_config(&self, platform: Platform) -> PlatformResult<&OAuthClientConfig> {
        self.clients.get(&platform).ok_or_else(|| {
            PlatformError::config_for(
                platform,
                format!("no OAuth credentials configured for {}", platform.display_name()),
            )
        })
    }

    /// Run the single-flight refresh on its own task
    ///
    /// Dropping the caller (cancellation, timeout) only stops the wait; the
    /// exchange, the write and the state bookkeeping still complete.
    async fn refresh_detached(&self, platform: Platform, force: bool) -> PlatformResult<String> {
        let lifecycle = Arc::clone(&self.lifecycle);
        let task = tokio::spawn(async move { lifecycle.refresh_single_flight(platform, force).await });
        task.await.unwrap_or_else(|e| {
            Err(PlatformError::auth(
                platform,
                AuthFailure::RefreshFailed,
                format!("refresh task aborted: {e}"),
            ))
        })
    }
}

impl TokenLifecycle {
    async fn load_connected(&self, platform: Platform) -> PlatformResult<OAuthTokenRecord> {
        match self.store.get(platform).await? {
            Some(record) if record.is_connected() => Ok(record),
            _ => Err(PlatformError::not_connected(platform)),
        }
    }

    async fn write(&self, record: &OAuthTokenRecord) -> PlatformResult<()> {
        self.store.upsert(record).await?;
        AppLogger::log_token_write(
            record.platform(),
            record.is_connected(),
            record.refresh_token().is_some(),
            record.expires_at(),
        );
        Ok(())
    }

    fn refresh_lock(&self, platform: Platform) -> Arc<Mutex<()>> {
        self.refresh_locks.entry(platform).or_default().clone()
    }

    async fn refresh_single_flight(&self, platform: Platform, force: bool) -> PlatformResult<String> {
        let requested_at = Utc::now();
        let lock = self.refresh_lock(platform);
        let _guard = lock.lock().await;

        let shared_failure = self
            .last_failure
            .get(&platform)
            .filter(|failure| failure.at >= requested_at)
            .map(|failure| failure.error.clone());
        if let Some(error) = shared_failure {
            debug!(platform = %platform, "sharing refresh failure from concurrent caller");
            return Err(error);
        }

        let record = self.load_connected(platform).await?;
        let refreshed_meanwhile = record.updated_at() >= requested_at;
        let still_fresh = !force && !record.needs_refresh_at(Utc::now(), self.refresh_threshold);
        if refreshed_meanwhile || still_fresh {
            if let Some(token) = record.access_token() {
                debug!(platform = %platform, "token refreshed by concurrent caller");
                return Ok(token.to_owned());
            }
        }

        self.transient.insert(platform, ConnectionState::Refreshing);
        match self.perform_refresh(&record).await {
            Ok(updated) => {
                self.transient.remove(&platform);
                self.last_failure.remove(&platform);
                AppLogger::log_oauth_event(platform, "refresh", true, None);
                updated
                    .access_token()
                    .map(str::to_owned)
                    .ok_or_else(|| PlatformError::not_connected(platform))
            }
            Err(error) => {
                self.record_refresh_failure(platform, &error).await;
                Err(error)
            }
        }
    }

    async fn perform_refresh(&self, record: &OAuthTokenRecord) -> PlatformResult<OAuthTokenRecord> {
        let platform = record.platform();
        let grant = if platform == Platform::Facebook {
            // Long-lived tokens can only be renewed while still valid
            if record.is_expired_at(Utc::now()) {
                return Err(PlatformError::auth(
                    platform,
                    AuthFailure::NotConnected,
                    "Facebook token expired and cannot be renewed; reconnect required",
                ));
            }
            RefreshGrant::FacebookExchange(record.access_token().unwrap_or_default().to_owned())
        } else {
            let Some(refresh_token) = record.refresh_token() else {
                return Err(PlatformError::auth(
                    platform,
                    AuthFailure::NotConnected,
                    "no refresh token stored; reconnect required",
                ));
            };
            RefreshGrant::RefreshToken(refresh_token.to_owned())
        };

        info!(platform = %platform, "refreshing access token");
        let tokens = self.endpoint.refresh(platform, &grant).await?;
        let updated = record.refreshed(tokens);
        self.write(&updated).await?;
        Ok(updated)
    }

    async fn record_refresh_failure(&self, platform: Platform, error: &PlatformError) {
        AppLogger::log_oauth_event(platform, "refresh", false, Some(&error.to_string()));
        self.last_failure.insert(
            platform,
            RefreshFailure {
                at: Utc::now(),
                error: error.clone(),
            },
        );

        match error.auth_reason() {
            Some(AuthFailure::Revoked | AuthFailure::NotConnected) => {
                if let Err(e) = self.write(&OAuthTokenRecord::disconnected(platform)).await {
                    warn!(platform = %platform, error = %e, "could not clear unusable token record");
                }
                self.transient.remove(&platform);
            }
            _ => {
                self.transient.insert(platform, ConnectionState::Error);
            }
        }
    }
}
