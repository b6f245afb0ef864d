// ABOUTME: In-memory token store holding one record per platform behind an async lock
// ABOUTME: Used by tests and runs that do not need persistence
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::TokenStore;
use crate::errors::PlatformResult;
use crate::models::{OAuthTokenRecord, Platform};

/// Token store kept in process memory
#[derive(Debug, Default)]
pub struct InMemoryTokenStore {
    records: RwLock<BTreeMap<Platform, OAuthTokenRecord>>,
    writes: AtomicUsize,
}

impl InMemoryTokenStore {
    /// Empty store
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of `upsert` calls served so far
    #[must_use]
    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TokenStore for InMemoryTokenStore {
    async fn get(&self, platform: Platform) -> PlatformResult<Option<OAuthTokenRecord>> {
        Ok(self.records.read().await.get(&platform).cloned())
    }

    async fn upsert(&self, record: &OAuthTokenRecord) -> PlatformResult<()> {
        self.records
            .write()
            .await
            .insert(record.platform(), record.clone());
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn list(&self) -> PlatformResult<Vec<OAuthTokenRecord>> {
        Ok(self.records.read().await.values().cloned().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::TokenSet;

    #[tokio::test]
    async fn upsert_replaces_the_platform_record() {
        let store = InMemoryTokenStore::new();
        let first = OAuthTokenRecord::connected(
            Platform::GoogleAds,
            TokenSet::bearer("a1", Some("r1".to_owned()), 3600),
            None,
        );
        store.upsert(&first).await.unwrap();
        store
            .upsert(&OAuthTokenRecord::disconnected(Platform::GoogleAds))
            .await
            .unwrap();

        let stored = store.get(Platform::GoogleAds).await.unwrap().unwrap();
        assert!(!stored.is_connected());
        assert_eq!(stored.access_token(), None);
        assert_eq!(store.list().await.unwrap().len(), 1);
        assert_eq!(store.write_count(), 2);
    }
}
