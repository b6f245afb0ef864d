// ABOUTME: SQLite token store using sqlx with one row per platform key
// ABOUTME: Upserts in a single statement and enforces the connected/token invariant with a CHECK
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

use std::fs;
use std::path::Path;
use std::str::FromStr;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions, SqliteRow};
use sqlx::{Row, SqlitePool};
use tracing::{debug, info};

use super::TokenStore;
use crate::errors::{AppResult, PlatformError, PlatformResult};
use crate::models::{AccountInfo, OAuthTokenRecord, Platform, StoredTokenRecord};

/// Token store persisted in SQLite
#[derive(Debug, Clone)]
pub struct SqliteTokenStore {
    pool: SqlitePool,
}

impl SqliteTokenStore {
    /// Open (creating if needed) the database at `database_url` and migrate it
    ///
    /// `sqlite::memory:` URLs get a single long-lived connection so every
    /// query sees the same database.
    ///
    /// # Errors
    ///
    /// Returns an error if the URL is invalid, the file cannot be created or
    /// the migration fails
    pub async fn connect(database_url: &str) -> AppResult<Self> {
        let is_memory = database_url.contains(":memory:");
        if !is_memory {
            ensure_parent_dir(database_url)?;
        }
        let options = SqliteConnectOptions::from_str(database_url)?.create_if_missing(true);
        let pool = if is_memory {
            SqlitePoolOptions::new()
                .max_connections(1)
                .idle_timeout(None)
                .max_lifetime(None)
                .connect_with(options)
                .await?
        } else {
            SqlitePoolOptions::new()
                .max_connections(5)
                .connect_with(options)
                .await?
        };
        Self::from_pool(pool).await
    }

    /// Wrap an existing pool and migrate it
    ///
    /// # Errors
    ///
    /// Returns an error if the migration fails
    pub async fn from_pool(pool: SqlitePool) -> AppResult<Self> {
        let store = Self { pool };
        store.migrate().await?;
        Ok(store)
    }

    /// Underlying pool
    #[must_use]
    pub const fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Create the `oauth_tokens` table
    ///
    /// # Errors
    ///
    /// Returns an error if table creation fails
    pub async fn migrate(&self) -> AppResult<()> {
        sqlx::query(
            r"
            CREATE TABLE IF NOT EXISTS oauth_tokens (
                platform TEXT PRIMARY KEY,
                access_token TEXT NOT NULL DEFAULT '',
                refresh_token TEXT,
                expires_at TEXT NOT NULL,
                token_type TEXT NOT NULL DEFAULT 'Bearer',
                scope TEXT,
                account_info TEXT,
                connected INTEGER NOT NULL CHECK (connected = (access_token <> '')),
                updated_at TEXT NOT NULL
            )
            ",
        )
        .execute(&self.pool)
        .await?;
        info!("token store migrated");
        Ok(())
    }

    fn row_to_record(row: &SqliteRow) -> PlatformResult<OAuthTokenRecord> {
        let platform_key: String = row.try_get("platform").map_err(storage_error)?;
        let platform = Platform::from_str(&platform_key)
            .map_err(|_| PlatformError::storage(format!("unknown platform key in store: {platform_key}")))?;
        let account_info = row
            .try_get::<Option<String>, _>("account_info")
            .map_err(storage_error)?
            .map(|raw| serde_json::from_str::<AccountInfo>(&raw))
            .transpose()
            .map_err(|e| PlatformError::storage(format!("corrupt account_info for {platform}: {e}")))?;

        let stored = StoredTokenRecord {
            platform,
            access_token: row.try_get("access_token").map_err(storage_error)?,
            refresh_token: row.try_get("refresh_token").map_err(storage_error)?,
            expires_at: row.try_get::<DateTime<Utc>, _>("expires_at").map_err(storage_error)?,
            token_type: row.try_get("token_type").map_err(storage_error)?,
            scope: row.try_get("scope").map_err(storage_error)?,
            account_info,
            connected: row.try_get("connected").map_err(storage_error)?,
            updated_at: row.try_get::<DateTime<Utc>, _>("updated_at").map_err(storage_error)?,
        };
        Ok(stored.into())
    }
}

#[async_trait]
impl TokenStore for SqliteTokenStore {
    async fn get(&self, platform: Platform) -> PlatformResult<Option<OAuthTokenRecord>> {
        let row = sqlx::query(
            r"
            SELECT platform, access_token, refresh_token, expires_at, token_type,
                   scope, account_info, connected, updated_at
            FROM oauth_tokens
            WHERE platform = $1
            ",
        )
        .bind(platform.platform_key())
        .fetch_optional(&self.pool)
        .await
        .map_err(storage_error)?;

        row.as_ref().map(Self::row_to_record).transpose()
    }

    async fn upsert(&self, record: &OAuthTokenRecord) -> PlatformResult<()> {
        let account_info = record
            .account_info()
            .map(serde_json::to_string)
            .transpose()
            .map_err(|e| PlatformError::storage(format!("cannot encode account_info: {e}")))?;
        let stored = StoredTokenRecord::from(record.clone());

        sqlx::query(
            r"
            INSERT INTO oauth_tokens (
                platform, access_token, refresh_token, expires_at, token_type,
                scope, account_info, connected, updated_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            ON CONFLICT (platform)
            DO UPDATE SET
                access_token = EXCLUDED.access_token,
                refresh_token = EXCLUDED.refresh_token,
                expires_at = EXCLUDED.expires_at,
                token_type = EXCLUDED.token_type,
                scope = EXCLUDED.scope,
                account_info = EXCLUDED.account_info,
                connected = EXCLUDED.connected,
                updated_at = EXCLUDED.updated_at
            ",
        )
        .bind(stored.platform.platform_key())
        .bind(&stored.access_token)
        .bind(&stored.refresh_token)
        .bind(stored.expires_at)
        .bind(&stored.token_type)
        .bind(&stored.scope)
        .bind(account_info)
        .bind(stored.connected)
        .bind(stored.updated_at)
        .execute(&self.pool)
        .await
        .map_err(storage_error)?;

        debug!(platform = %stored.platform, connected = stored.connected, "token row upserted");
        Ok(())
    }

    async fn list(&self) -> PlatformResult<Vec<OAuthTokenRecord>> {
        let rows = sqlx::query(
            r"
            SELECT platform, access_token, refresh_token, expires_at, token_type,
                   scope, account_info, connected, updated_at
            FROM oauth_tokens
            ORDER BY platform
            ",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(storage_error)?;

        rows.iter().map(Self::row_to_record).collect()
    }
}

fn storage_error(error: sqlx::Error) -> PlatformError {
    PlatformError::storage(error.to_string())
}

/// Create the directory holding a file-backed database
fn ensure_parent_dir(database_url: &str) -> AppResult<()> {
    let path = database_url
        .trim_start_matches("sqlite://")
        .trim_start_matches("sqlite:");
    let path = path.split('?').next().unwrap_or(path);
    if let Some(parent) = Path::new(path).parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    Ok(())
}
