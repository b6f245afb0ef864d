// ABOUTME: Token store abstraction keyed by platform with in-memory and SQLite backends
// ABOUTME: Only the token lifecycle manager writes through this trait
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

//! # Token Store
//!
//! Keyed persistence for [`OAuthTokenRecord`]s, one record per platform.
//! Implementations must make `upsert` a single atomic write: a reader never
//! observes a record whose tokens and `connected` flag come from different
//! writes.

use async_trait::async_trait;

use crate::errors::PlatformResult;
use crate::models::{OAuthTokenRecord, Platform};

/// In-memory store for tests and ephemeral runs
pub mod memory;
/// SQLite store backed by `sqlx`
pub mod sqlite;

pub use memory::InMemoryTokenStore;
pub use sqlite::SqliteTokenStore;

/// Keyed record store for OAuth tokens
#[async_trait]
pub trait TokenStore: Send + Sync {
    /// Record for `platform`, if one was ever written
    ///
    /// # Errors
    ///
    /// `Storage` when the backend cannot be read
    async fn get(&self, platform: Platform) -> PlatformResult<Option<OAuthTokenRecord>>;

    /// Insert or replace the record for `record.platform()` atomically
    ///
    /// # Errors
    ///
    /// `Storage` when the backend rejects the write
    async fn upsert(&self, record: &OAuthTokenRecord) -> PlatformResult<()>;

    /// Every stored record
    ///
    /// # Errors
    ///
    /// `Storage` when the backend cannot be read
    async fn list(&self) -> PlatformResult<Vec<OAuthTokenRecord>>;
}
