// ABOUTME: Shared helpers for token lifecycle and orchestrator integration tests
// ABOUTME: Counting token endpoint, scripted platform adapters and manager builders
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio::time::sleep;
use tulen_reporting::adapters::{AdapterRegistry, PlatformAdapter};
use tulen_reporting::clients::InMemoryClientDirectory;
use tulen_reporting::config::{CacheConfig, OAuthClientConfig, PlatformCredentials};
use tulen_reporting::errors::{PlatformError, PlatformResult};
use tulen_reporting::models::{
    AccountInfo, ClientAccountBinding, DateRange, FetchOptions, MetricTotals, MetricsEnvelope,
    OAuthTokenRecord, Platform, TokenSet,
};
use tulen_reporting::oauth::{PkceParams, RefreshGrant, TokenEndpoint, TokenGrant, TokenManager};
use tulen_reporting::orchestrator::AnalyticsOrchestrator;
use tulen_reporting::store::{InMemoryTokenStore, TokenStore};

pub const REDIRECT_URI: &str = "http://localhost:8080/oauth/callback";

/// Five minutes, the default refresh threshold
pub const THRESHOLD: Duration = Duration::from_secs(300);

/// OAuth client configs for every platform with throwaway credentials
pub fn oauth_clients() -> Vec<OAuthClientConfig> {
    let credentials = [
        PlatformCredentials::Facebook {
            app_id: "fb-app".to_owned(),
            app_secret: "fb-secret".to_owned(),
        },
        PlatformCredentials::GoogleAds {
            client_id: "google-client".to_owned(),
            client_secret: "google-secret".to_owned(),
            developer_token: "dev-token".to_owned(),
            login_customer_id: None,
        },
        PlatformCredentials::GoHighLevel {
            client_id: "ghl-client".to_owned(),
            client_secret: "ghl-secret".to_owned(),
        },
        PlatformCredentials::GoogleSheets {
            client_id: "google-client".to_owned(),
            client_secret: "google-secret".to_owned(),
        },
    ];
    credentials
        .into_iter()
        .map(|credentials| OAuthClientConfig::new(credentials, REDIRECT_URI))
        .collect()
}

/// How the fake endpoint answers refreshes
#[derive(Debug, Clone)]
pub enum RefreshScript {
    /// Issue `refreshed-<n>` valid for an hour, without a new refresh token
    Succeed,
    /// Fail every refresh with this error
    Fail(PlatformError),
}

/// Token endpoint double counting every exchange
pub struct CountingEndpoint {
    pub refresh_calls: AtomicUsize,
    pub exchange_calls: AtomicUsize,
    pub delay: Duration,
    pub script: Mutex<RefreshScript>,
    pub grants_seen: Mutex<Vec<(Platform, RefreshGrant)>>,
    pub verifiers_seen: Mutex<Vec<Option<String>>>,
    pub exchange_account: Mutex<Option<AccountInfo>>,
}

impl CountingEndpoint {
    pub fn new() -> Self {
        Self::with_delay(Duration::ZERO)
    }

    pub fn with_delay(delay: Duration) -> Self {
        Self {
            refresh_calls: AtomicUsize::new(0),
            exchange_calls: AtomicUsize::new(0),
            delay,
            script: Mutex::new(RefreshScript::Succeed),
            grants_seen: Mutex::new(Vec::new()),
            verifiers_seen: Mutex::new(Vec::new()),
            exchange_account: Mutex::new(None),
        }
    }

    pub fn failing(error: PlatformError) -> Self {
        let endpoint = Self::new();
        *endpoint.script.lock().unwrap() = RefreshScript::Fail(error);
        endpoint
    }

    pub fn refreshes(&self) -> usize {
        self.refresh_calls.load(Ordering::SeqCst)
    }

    pub fn exchanges(&self) -> usize {
        self.exchange_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TokenEndpoint for CountingEndpoint {
    async fn exchange_code(
        &self,
        _platform: Platform,
        code: &str,
        pkce: Option<&PkceParams>,
    ) -> PlatformResult<TokenGrant> {
        self.exchange_calls.fetch_add(1, Ordering::SeqCst);
        self.verifiers_seen
            .lock()
            .unwrap()
            .push(pkce.map(|pkce| pkce.code_verifier.clone()));
        Ok(TokenGrant {
            tokens: TokenSet::bearer(format!("access-for-{code}"), Some("refresh-1".to_owned()), 3600),
            account_info: self.exchange_account.lock().unwrap().clone(),
        })
    }

    async fn refresh(&self, platform: Platform, grant: &RefreshGrant) -> PlatformResult<TokenSet> {
        let call = self.refresh_calls.fetch_add(1, Ordering::SeqCst) + 1;
        self.grants_seen.lock().unwrap().push((platform, grant.clone()));
        if !self.delay.is_zero() {
            sleep(self.delay).await;
        }
        let script = self.script.lock().unwrap().clone();
        match script {
            RefreshScript::Succeed => Ok(TokenSet::bearer(format!("refreshed-{call}"), None, 3600)),
            RefreshScript::Fail(error) => Err(error),
        }
    }
}

/// Manager over `store` and `endpoint` with every platform configured
pub fn manager(store: Arc<InMemoryTokenStore>, endpoint: Arc<CountingEndpoint>) -> TokenManager {
    TokenManager::new(store, endpoint, oauth_clients(), THRESHOLD)
}

/// Seed a connected record expiring `expires_in_secs` from now
pub async fn seed_token(
    store: &InMemoryTokenStore,
    platform: Platform,
    access_token: &str,
    refresh_token: Option<&str>,
    expires_in_secs: i64,
) {
    let tokens = TokenSet::bearer(access_token, refresh_token.map(str::to_owned), expires_in_secs);
    let record = OAuthTokenRecord::connected(platform, tokens, None);
    store.upsert(&record).await.unwrap();
}

/// One scripted adapter response
#[derive(Debug, Clone)]
pub enum Step {
    /// Envelope with this many leads
    Leads(u64),
    /// Fail with this error
    Fail(PlatformError),
    /// Sleep, then return this many leads
    Slow(Duration, u64),
}

/// Adapter double replaying scripted steps; the last step repeats
pub struct ScriptedAdapter {
    platform: Platform,
    steps: Mutex<VecDeque<Step>>,
    last: Mutex<Option<Step>>,
    pub calls: AtomicUsize,
    pub tokens_seen: Mutex<Vec<String>>,
}

impl ScriptedAdapter {
    pub fn new(platform: Platform, steps: Vec<Step>) -> Self {
        Self {
            platform,
            steps: Mutex::new(steps.into()),
            last: Mutex::new(None),
            calls: AtomicUsize::new(0),
            tokens_seen: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn next_step(&self) -> Step {
        let next = self.steps.lock().unwrap().pop_front();
        let mut last = self.last.lock().unwrap();
        if let Some(step) = next {
            *last = Some(step.clone());
            step
        } else {
            last.clone().unwrap_or(Step::Leads(0))
        }
    }
}

#[async_trait]
impl PlatformAdapter for ScriptedAdapter {
    fn platform(&self) -> Platform {
        self.platform
    }

    async fn fetch_metrics(
        &self,
        access_token: &str,
        account_id: &str,
        date_range: &DateRange,
        _options: &FetchOptions,
    ) -> PlatformResult<MetricsEnvelope> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.tokens_seen.lock().unwrap().push(access_token.to_owned());
        let leads = match self.next_step() {
            Step::Leads(leads) => leads,
            Step::Fail(error) => return Err(error),
            Step::Slow(delay, leads) => {
                sleep(delay).await;
                leads
            }
        };
        let totals = MetricTotals {
            leads,
            spend: 100.0,
            ..MetricTotals::default()
        };
        Ok(MetricsEnvelope::new(self.platform, account_id, *date_range, totals))
    }
}

/// Binding for every platform
pub fn full_binding(client_id: &str) -> ClientAccountBinding {
    ClientAccountBinding::new(client_id)
        .with_account(Platform::Facebook, "111")
        .with_account(Platform::GoogleAds, "222-333-4444")
        .with_account(Platform::GoHighLevel, "loc-1")
        .with_account(Platform::GoogleSheets, "sheet-1")
}

/// Orchestrator over scripted adapters with a one-minute cache
pub fn orchestrator(
    tokens: Arc<TokenManager>,
    adapters: Vec<Arc<ScriptedAdapter>>,
    bindings: Vec<ClientAccountBinding>,
    fetch_timeout: Duration,
) -> AnalyticsOrchestrator {
    let mut registry = AdapterRegistry::new();
    for adapter in adapters {
        registry.register(adapter);
    }
    let clients = Arc::new(InMemoryClientDirectory::from_bindings(bindings));
    let cache = CacheConfig {
        ttl: Duration::from_secs(60),
        max_entries: 100,
    };
    AnalyticsOrchestrator::new(tokens, registry, clients, &cache, fetch_timeout)
}

/// Store and manager with valid tokens for every platform
pub async fn connected_manager(endpoint: Arc<CountingEndpoint>) -> (Arc<InMemoryTokenStore>, Arc<TokenManager>) {
    let store = Arc::new(InMemoryTokenStore::new());
    for platform in Platform::ALL {
        seed_token(&store, platform, &format!("{platform}-token"), Some("refresh"), 3600).await;
    }
    let tokens = Arc::new(manager(store.clone(), endpoint));
    (store, tokens)
}

/// March 2024
pub fn march() -> DateRange {
    DateRange::parse("2024-03-01", "2024-03-31").unwrap()
}
