// ABOUTME: LRU cache with TTL for successful per-platform metric envelopes
// ABOUTME: Keyed by client, platform, date range and fetch options
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

use std::num::NonZeroUsize;
use std::time::{Duration, Instant};

use lru::LruCache;
use tokio::sync::RwLock;
use tracing::debug;

use crate::config::CacheConfig;
use crate::models::{DateRange, FetchOptions, MetricsEnvelope, Platform};

/// Identity of one cached platform fetch
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    /// Client the envelope was fetched for
    pub client_id: String,
    /// Source platform
    pub platform: Platform,
    /// Requested period
    pub date_range: DateRange,
    /// [`FetchOptions::cache_fragment`] of the request
    pub options: String,
}

impl CacheKey {
    /// Key for one platform fetch
    #[must_use]
    pub fn new(
        client_id: impl Into<String>,
        platform: Platform,
        date_range: DateRange,
        options: &FetchOptions,
    ) -> Self {
        Self {
            client_id: client_id.into(),
            platform,
            date_range,
            options: options.cache_fragment(),
        }
    }
}

#[derive(Debug, Clone)]
struct CacheEntry {
    envelope: MetricsEnvelope,
    expires_at: Instant,
}

impl CacheEntry {
    fn is_expired(&self) -> bool {
        Instant::now() >= self.expires_at
    }
}

/// Envelope cache with LRU eviction and per-entry TTL
#[derive(Debug)]
pub struct EnvelopeCache {
    store: RwLock<LruCache<CacheKey, CacheEntry>>,
    ttl: Duration,
}

impl EnvelopeCache {
    /// Capacity used when the configuration asks for zero entries
    const DEFAULT_CAPACITY: NonZeroUsize = match NonZeroUsize::new(1000) {
        Some(n) => n,
        None => unreachable!(),
    };

    /// Cache sized and timed by `config`
    #[must_use]
    pub fn new(config: &CacheConfig) -> Self {
        let capacity = NonZeroUsize::new(config.max_entries).unwrap_or(Self::DEFAULT_CAPACITY);
        Self {
            store: RwLock::new(LruCache::new(capacity)),
            ttl: config.ttl,
        }
    }

    /// Cached envelope, if present and not expired
    pub async fn get(&self, key: &CacheKey) -> Option<MetricsEnvelope> {
        // LruCache::get updates recency, so even reads take the write lock
        let mut store = self.store.write().await;
        let entry = store.get(key)?;
        if entry.is_expired() {
            store.pop(key);
            return None;
        }
        Some(entry.envelope.clone())
    }

    /// Store a successful envelope
    pub async fn put(&self, key: CacheKey, envelope: MetricsEnvelope) {
        if self.ttl.is_zero() {
            return;
        }
        let entry = CacheEntry {
            envelope,
            expires_at: Instant::now() + self.ttl,
        };
        self.store.write().await.push(key, entry);
    }

    /// Drop every entry for `client_id`, returning how many were removed
    pub async fn invalidate_client(&self, client_id: &str) -> usize {
        let mut store = self.store.write().await;
        let keys: Vec<CacheKey> = store
            .iter()
            .filter(|(key, _)| key.client_id == client_id)
            .map(|(key, _)| key.clone())
            .collect();
        for key in &keys {
            store.pop(key);
        }
        drop(store);
        debug!(client_id, removed = keys.len(), "client cache entries invalidated");
        keys.len()
    }

    /// Entries currently held, expired ones included until next touched
    pub async fn len(&self) -> usize {
        self.store.read().await.len()
    }

    /// Whether the cache holds nothing
    pub async fn is_empty(&self) -> bool {
        self.store.read().await.is_empty()
    }

    /// Remove everything
    pub async fn clear(&self) {
        self.store.write().await.clear();
    }
}
