// ABOUTME: OAuth token record persisted per platform plus the token set returned by exchanges
// ABOUTME: The connected flag is derived from the access token and can never disagree with it
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

use std::fmt::{self, Debug, Formatter};

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use super::Platform;

/// Tokens returned by an authorization-code exchange or a refresh
#[derive(Clone, PartialEq, Eq)]
pub struct TokenSet {
    /// Bearer access token
    pub access_token: String,
    /// Refresh token, when the platform issues one
    pub refresh_token: Option<String>,
    /// Absolute expiry instant
    pub expires_at: DateTime<Utc>,
    /// Token type (normally `Bearer`)
    pub token_type: String,
    /// Granted scopes, space separated
    pub scope: Option<String>,
}

impl TokenSet {
    /// Bearer token set expiring `expires_in_secs` from now
    #[must_use]
    pub fn bearer(
        access_token: impl Into<String>,
        refresh_token: Option<String>,
        expires_in_secs: i64,
    ) -> Self {
        Self {
            access_token: access_token.into(),
            refresh_token,
            expires_at: Utc::now() + Duration::seconds(expires_in_secs),
            token_type: "Bearer".to_owned(),
            scope: None,
        }
    }

    /// Attach granted scopes
    #[must_use]
    pub fn with_scope(mut self, scope: impl Into<String>) -> Self {
        self.scope = Some(scope.into());
        self
    }
}

impl Debug for TokenSet {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenSet")
            .field("access_token", &"[REDACTED]")
            .field("has_refresh_token", &self.refresh_token.is_some())
            .field("expires_at", &self.expires_at)
            .field("token_type", &self.token_type)
            .field("scope", &self.scope)
            .finish()
    }
}

/// Platform-specific account metadata captured at connect time
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "platform", rename_all = "snake_case")]
pub enum AccountInfo {
    /// Facebook user and the ad accounts it can read
    Facebook {
        /// Graph user id
        user_id: Option<String>,
        /// Display name
        name: Option<String>,
        /// Accessible ad accounts (`act_<id>`)
        #[serde(default)]
        ad_account_ids: Vec<String>,
    },
    /// Google Ads login
    GoogleAds {
        /// Google account email
        email: Option<String>,
        /// Accessible customer ids (no dashes)
        #[serde(default)]
        customer_ids: Vec<String>,
    },
    /// GoHighLevel installation
    #[serde(rename = "gohighlevel")]
    GoHighLevel {
        /// Sub-account location id
        location_id: Option<String>,
        /// Agency company id
        company_id: Option<String>,
        /// `Location` or `Company`
        user_type: Option<String>,
    },
    /// Google Sheets login
    GoogleSheets {
        /// Google account email
        email: Option<String>,
    },
}

impl AccountInfo {
    /// Platform this metadata belongs to
    #[must_use]
    pub const fn platform(&self) -> Platform {
        match self {
            Self::Facebook { .. } => Platform::Facebook,
            Self::GoogleAds { .. } => Platform::GoogleAds,
            Self::GoHighLevel { .. } => Platform::GoHighLevel,
            Self::GoogleSheets { .. } => Platform::GoogleSheets,
        }
    }
}

/// Persisted OAuth state for one platform key
///
/// Fields are private: the only ways to build a record are [`Self::connected`],
/// [`Self::disconnected`] and [`Self::refreshed`], each of which sets the
/// `connected` flag from the access token it stores. Deserialization goes
/// through [`StoredTokenRecord`] and recomputes the flag as well.
#[derive(Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "StoredTokenRecord", into = "StoredTokenRecord")]
pub struct OAuthTokenRecord {
    platform: Platform,
    access_token: String,
    refresh_token: Option<String>,
    expires_at: DateTime<Utc>,
    token_type: String,
    scope: Option<String>,
    account_info: Option<AccountInfo>,
    connected: bool,
    updated_at: DateTime<Utc>,
}

impl OAuthTokenRecord {
    /// Record holding a fresh token set
    #[must_use]
    pub fn connected(platform: Platform, tokens: TokenSet, account_info: Option<AccountInfo>) -> Self {
        let connected = !tokens.access_token.is_empty();
        Self {
            platform,
            access_token: tokens.access_token,
            refresh_token: tokens.refresh_token.filter(|token| !token.is_empty()),
            expires_at: tokens.expires_at,
            token_type: tokens.token_type,
            scope: tokens.scope,
            account_info,
            connected,
            updated_at: Utc::now(),
        }
    }

    /// Record with every credential removed
    #[must_use]
    pub fn disconnected(platform: Platform) -> Self {
        Self {
            platform,
            access_token: String::new(),
            refresh_token: None,
            expires_at: DateTime::<Utc>::UNIX_EPOCH,
            token_type: String::new(),
            scope: None,
            account_info: None,
            connected: false,
            updated_at: Utc::now(),
        }
    }

    /// New record after a refresh
    ///
    /// Platforms may omit the refresh token (or scope) on refresh; the
    /// previous values are kept in that case. Account info always carries over.
    #[must_use]
    pub fn refreshed(&self, tokens: TokenSet) -> Self {
        let refresh_token = tokens
            .refresh_token
            .filter(|token| !token.is_empty())
            .or_else(|| self.refresh_token.clone());
        let scope = tokens.scope.or_else(|| self.scope.clone());
        Self::connected(
            self.platform,
            TokenSet {
                refresh_token,
                scope,
                ..tokens
            },
            self.account_info.clone(),
        )
    }

    /// Owning platform
    #[must_use]
    pub const fn platform(&self) -> Platform {
        self.platform
    }

    /// Access token, `None` when disconnected
    #[must_use]
    pub fn access_token(&self) -> Option<&str> {
        if self.access_token.is_empty() {
            None
        } else {
            Some(&self.access_token)
        }
    }

    /// Refresh token, when one was issued
    #[must_use]
    pub fn refresh_token(&self) -> Option<&str> {
        self.refresh_token.as_deref()
    }

    /// Expiry instant
    #[must_use]
    pub const fn expires_at(&self) -> DateTime<Utc> {
        self.expires_at
    }

    /// Token type
    #[must_use]
    pub fn token_type(&self) -> &str {
        &self.token_type
    }

    /// Granted scopes
    #[must_use]
    pub fn scope(&self) -> Option<&str> {
        self.scope.as_deref()
    }

    /// Account metadata captured at connect time
    #[must_use]
    pub const fn account_info(&self) -> Option<&AccountInfo> {
        self.account_info.as_ref()
    }

    /// `true` exactly when an access token is present
    #[must_use]
    pub const fn is_connected(&self) -> bool {
        self.connected
    }

    /// Last write time
    #[must_use]
    pub const fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    /// Whether the token is past its expiry at `now`
    #[must_use]
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }

    /// Whether the token expires within `threshold` of `now`
    #[must_use]
    pub fn needs_refresh_at(&self, now: DateTime<Utc>, threshold: Duration) -> bool {
        self.expires_at <= now + threshold
    }
}

impl Debug for OAuthTokenRecord {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("OAuthTokenRecord")
            .field("platform", &self.platform)
            .field("connected", &self.connected)
            .field("has_refresh_token", &self.refresh_token.is_some())
            .field("expires_at", &self.expires_at)
            .field("token_type", &self.token_type)
            .field("scope", &self.scope)
            .field("account_info", &self.account_info)
            .field("updated_at", &self.updated_at)
            .finish_non_exhaustive()
    }
}

/// Serialized form of [`OAuthTokenRecord`]
///
/// Row shape used by token stores. `connected` is written for readers of the
/// raw document but ignored on load.
#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredTokenRecord {
    /// Platform key
    pub platform: Platform,
    /// Access token, empty when disconnected
    #[serde(default)]
    pub access_token: String,
    /// Refresh token
    pub refresh_token: Option<String>,
    /// Expiry instant
    pub expires_at: DateTime<Utc>,
    /// Token type
    #[serde(default)]
    pub token_type: String,
    /// Granted scopes
    pub scope: Option<String>,
    /// Account metadata
    pub account_info: Option<AccountInfo>,
    /// Stored flag, recomputed on load
    #[serde(default)]
    pub connected: bool,
    /// Last write time
    pub updated_at: DateTime<Utc>,
}

impl From<StoredTokenRecord> for OAuthTokenRecord {
    fn from(stored: StoredTokenRecord) -> Self {
        let connected = !stored.access_token.is_empty();
        Self {
            platform: stored.platform,
            access_token: stored.access_token,
            refresh_token: stored.refresh_token,
            expires_at: stored.expires_at,
            token_type: stored.token_type,
            scope: stored.scope,
            account_info: stored.account_info,
            connected,
            updated_at: stored.updated_at,
        }
    }
}

impl From<OAuthTokenRecord> for StoredTokenRecord {
    fn from(record: OAuthTokenRecord) -> Self {
        Self {
            platform: record.platform,
            access_token: record.access_token,
            refresh_token: record.refresh_token,
            expires_at: record.expires_at,
            token_type: record.token_type,
            scope: record.scope,
            account_info: record.account_info,
            connected: record.connected,
            updated_at: record.updated_at,
        }
    }
}
