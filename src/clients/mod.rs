// ABOUTME: Client directory resolving a client id to its per-platform account binding
// ABOUTME: In-memory implementation loadable from a JSON array of bindings
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::{info, warn};

use crate::errors::{AppError, AppResult, PlatformResult};
use crate::models::ClientAccountBinding;

/// Lookup of client account bindings
#[async_trait]
pub trait ClientDirectory: Send + Sync {
    /// Binding for `client_id`, `None` for an unknown client
    ///
    /// # Errors
    ///
    /// `Storage` when the backing source cannot be read
    async fn binding(&self, client_id: &str) -> PlatformResult<Option<ClientAccountBinding>>;
}

/// Bindings held in memory
#[derive(Debug, Default)]
pub struct InMemoryClientDirectory {
    bindings: RwLock<HashMap<String, ClientAccountBinding>>,
}

impl InMemoryClientDirectory {
    /// Empty directory
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Directory holding `bindings`; entries with a blank client id are skipped
    #[must_use]
    pub fn from_bindings(bindings: impl IntoIterator<Item = ClientAccountBinding>) -> Self {
        let map = bindings
            .into_iter()
            .filter_map(|binding| {
                let client_id = binding.client_id.trim().to_owned();
                if client_id.is_empty() {
                    warn!("skipping client binding with a blank client id");
                    None
                } else {
                    Some((client_id, binding))
                }
            })
            .collect();
        Self {
            bindings: RwLock::new(map),
        }
    }

    /// Parse a JSON array of bindings
    ///
    /// # Errors
    ///
    /// `InvalidInput` when the document is not an array of bindings
    pub fn from_json_str(json: &str) -> AppResult<Self> {
        let bindings: Vec<ClientAccountBinding> = serde_json::from_str(json)
            .map_err(|e| AppError::invalid_input(format!("invalid client bindings: {e}")))?;
        Ok(Self::from_bindings(bindings))
    }

    /// Load a JSON array of bindings from `path`
    ///
    /// # Errors
    ///
    /// `Config` when the file cannot be read, `InvalidInput` when it does not parse
    pub fn from_json_file(path: &Path) -> AppResult<Self> {
        let json = fs::read_to_string(path).map_err(|e| {
            AppError::config(format!("cannot read clients file {}: {e}", path.display()))
        })?;
        let directory = Self::from_json_str(&json)?;
        info!(path = %path.display(), "client bindings loaded");
        Ok(directory)
    }

    /// Add or replace a binding
    pub async fn insert(&self, binding: ClientAccountBinding) {
        let client_id = binding.client_id.trim().to_owned();
        if client_id.is_empty() {
            warn!("ignoring client binding with a blank client id");
            return;
        }
        self.bindings.write().await.insert(client_id, binding);
    }

    /// Number of known clients
    pub async fn len(&self) -> usize {
        self.bindings.read().await.len()
    }

    /// Whether no client is known
    pub async fn is_empty(&self) -> bool {
        self.bindings.read().await.is_empty()
    }
}

#[async_trait]
impl ClientDirectory for InMemoryClientDirectory {
    async fn binding(&self, client_id: &str) -> PlatformResult<Option<ClientAccountBinding>> {
        Ok(self.bindings.read().await.get(client_id.trim()).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Platform;

    #[tokio::test]
    async fn loads_bindings_and_skips_blank_ids() {
        let directory = InMemoryClientDirectory::from_json_str(
            r#"[
                {"clientId": "venue-1", "googleAdsCustomerId": "123-456-7890", "facebookAdAccountId": "  "},
                {"clientId": "   ", "gohighlevelLocationId": "loc"}
            ]"#,
        )
        .unwrap();

        assert_eq!(directory.len().await, 1);
        let binding = directory.binding("venue-1").await.unwrap().unwrap();
        assert_eq!(binding.bound_platforms(), vec![Platform::GoogleAds]);
        assert_eq!(binding.account_for(Platform::GoogleAds).as_deref(), Some("1234567890"));
        assert!(directory.binding("venue-2").await.unwrap().is_none());
    }

    #[test]
    fn rejects_non_array_documents() {
        let err = InMemoryClientDirectory::from_json_str(r#"{"clientId": "x"}"#).unwrap_err();
        assert!(err.to_string().contains("invalid client bindings"));
    }
}
