// ABOUTME: Per-platform OAuth application credentials as an explicit tagged union
// ABOUTME: Builds the authorization and token endpoint settings each platform needs
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

use std::env;
use std::fmt::{self, Debug, Formatter};

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::constants::env_config;
use crate::constants::platforms::{
    FACEBOOK_AUTH_URL, FACEBOOK_SCOPES, FACEBOOK_TOKEN_URL, GOHIGHLEVEL_AUTH_URL,
    GOHIGHLEVEL_SCOPES, GOHIGHLEVEL_TOKEN_URL, GOOGLE_ADS_SCOPES, GOOGLE_AUTH_URL,
    GOOGLE_SHEETS_SCOPES, GOOGLE_TOKEN_URL,
};
use crate::models::Platform;

/// OAuth application credentials, one variant per platform
///
/// Each variant carries exactly the fields its platform requires, so a
/// half-configured platform cannot be represented.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "platform", rename_all = "snake_case")]
pub enum PlatformCredentials {
    /// Facebook app
    Facebook {
        /// App id
        app_id: String,
        /// App secret
        app_secret: String,
    },
    /// Google OAuth client plus Google Ads API access
    GoogleAds {
        /// OAuth client id
        client_id: String,
        /// OAuth client secret
        client_secret: String,
        /// Google Ads developer token sent on every API call
        developer_token: String,
        /// Manager account used as `login-customer-id`
        #[serde(default)]
        login_customer_id: Option<String>,
    },
    /// GoHighLevel marketplace app
    #[serde(rename = "gohighlevel")]
    GoHighLevel {
        /// Marketplace client id
        client_id: String,
        /// Marketplace client secret
        client_secret: String,
    },
    /// Google OAuth client used for Sheets
    GoogleSheets {
        /// OAuth client id
        client_id: String,
        /// OAuth client secret
        client_secret: String,
    },
}

impl PlatformCredentials {
    /// Load credentials for `platform` from the environment
    ///
    /// Returns `None` when any required variable is missing or blank.
    #[must_use]
    pub fn from_env(platform: Platform) -> Option<Self> {
        match platform {
            Platform::Facebook => Some(Self::Facebook {
                app_id: non_empty_env(env_config::FACEBOOK_APP_ID)?,
                app_secret: non_empty_env(env_config::FACEBOOK_APP_SECRET)?,
            }),
            Platform::GoogleAds => Some(Self::GoogleAds {
                client_id: non_empty_env(env_config::GOOGLE_CLIENT_ID)?,
                client_secret: non_empty_env(env_config::GOOGLE_CLIENT_SECRET)?,
                developer_token: non_empty_env(env_config::GOOGLE_ADS_DEVELOPER_TOKEN)?,
                login_customer_id: non_empty_env(env_config::GOOGLE_ADS_LOGIN_CUSTOMER_ID),
            }),
            Platform::GoHighLevel => Some(Self::GoHighLevel {
                client_id: non_empty_env(env_config::GHL_CLIENT_ID)?,
                client_secret: non_empty_env(env_config::GHL_CLIENT_SECRET)?,
            }),
            Platform::GoogleSheets => Some(Self::GoogleSheets {
                client_id: non_empty_env(env_config::GOOGLE_CLIENT_ID)?,
                client_secret: non_empty_env(env_config::GOOGLE_CLIENT_SECRET)?,
            }),
        }
    }

    /// Platform these credentials belong to
    #[must_use]
    pub const fn platform(&self) -> Platform {
        match self {
            Self::Facebook { .. } => Platform::Facebook,
            Self::GoogleAds { .. } => Platform::GoogleAds,
            Self::GoHighLevel { .. } => Platform::GoHighLevel,
            Self::GoogleSheets { .. } => Platform::GoogleSheets,
        }
    }

    /// OAuth client id (Facebook app id)
    #[must_use]
    pub fn client_id(&self) -> &str {
        match self {
            Self::Facebook { app_id, .. } => app_id,
            Self::GoogleAds { client_id, .. }
            | Self::GoHighLevel { client_id, .. }
            | Self::GoogleSheets { client_id, .. } => client_id,
        }
    }

    /// OAuth client secret (Facebook app secret)
    #[must_use]
    pub fn client_secret(&self) -> &str {
        match self {
            Self::Facebook { app_secret, .. } => app_secret,
            Self::GoogleAds { client_secret, .. }
            | Self::GoHighLevel { client_secret, .. }
            | Self::GoogleSheets { client_secret, .. } => client_secret,
        }
    }

    /// First 8 hex chars of the secret's SHA-256, for comparing configs without logging secrets
    #[must_use]
    pub fn secret_fingerprint(&self) -> String {
        let digest = Sha256::digest(self.client_secret().as_bytes());
        format!("{digest:x}").chars().take(8).collect()
    }
}

impl Debug for PlatformCredentials {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("PlatformCredentials")
            .field("platform", &self.platform())
            .field("client_id", &self.client_id())
            .field("secret_fingerprint", &self.secret_fingerprint())
            .finish_non_exhaustive()
    }
}

fn non_empty_env(key: &str) -> Option<String> {
    env::var(key)
        .ok()
        .map(|value| value.trim().to_owned())
        .filter(|value| !value.is_empty())
}

/// Authorization and token endpoint settings for one platform
#[derive(Clone)]
pub struct OAuthClientConfig {
    /// Application credentials
    pub credentials: PlatformCredentials,
    /// Authorization endpoint
    pub auth_url: String,
    /// Token endpoint
    pub token_url: String,
    /// Redirect URI registered with the platform
    pub redirect_uri: String,
    /// Scopes requested at authorization time
    pub scopes: Vec<String>,
    /// Whether the authorization request carries a PKCE challenge
    pub use_pkce: bool,
}

impl OAuthClientConfig {
    /// Production endpoints and scopes for the credentials' platform
    #[must_use]
    pub fn new(credentials: PlatformCredentials, redirect_uri: impl Into<String>) -> Self {
        let platform = credentials.platform();
        let (auth_url, token_url, scopes): (&str, &str, &[&str]) = match platform {
            Platform::Facebook => (FACEBOOK_AUTH_URL, FACEBOOK_TOKEN_URL, FACEBOOK_SCOPES),
            Platform::GoogleAds => (GOOGLE_AUTH_URL, GOOGLE_TOKEN_URL, GOOGLE_ADS_SCOPES),
            Platform::GoHighLevel => (GOHIGHLEVEL_AUTH_URL, GOHIGHLEVEL_TOKEN_URL, GOHIGHLEVEL_SCOPES),
            Platform::GoogleSheets => (GOOGLE_AUTH_URL, GOOGLE_TOKEN_URL, GOOGLE_SHEETS_SCOPES),
        };
        Self {
            credentials,
            auth_url: auth_url.to_owned(),
            token_url: token_url.to_owned(),
            redirect_uri: redirect_uri.into(),
            scopes: scopes.iter().map(|scope| (*scope).to_owned()).collect(),
            use_pkce: platform.is_google(),
        }
    }

    /// Platform served by this configuration
    #[must_use]
    pub const fn platform(&self) -> Platform {
        self.credentials.platform()
    }

    /// Override the token endpoint (tests, proxies)
    #[must_use]
    pub fn with_token_url(mut self, token_url: impl Into<String>) -> Self {
        self.token_url = token_url.into();
        self
    }

    /// Override the authorization endpoint
    #[must_use]
    pub fn with_auth_url(mut self, auth_url: impl Into<String>) -> Self {
        self.auth_url = auth_url.into();
        self
    }
}

impl Debug for OAuthClientConfig {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("OAuthClientConfig")
            .field("credentials", &self.credentials)
            .field("auth_url", &self.auth_url)
            .field("token_url", &self.token_url)
            .field("redirect_uri", &self.redirect_uri)
            .field("scopes", &self.scopes)
            .field("use_pkce", &self.use_pkce)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ghl() -> PlatformCredentials {
        PlatformCredentials::GoHighLevel {
            client_id: "ghl-client".to_owned(),
            client_secret: "super-secret-value".to_owned(),
        }
    }

    #[test]
    fn debug_never_prints_secret() {
        let rendered = format!("{:?}", ghl());
        assert!(rendered.contains("ghl-client"));
        assert!(!rendered.contains("super-secret-value"));
        assert_eq!(ghl().secret_fingerprint().len(), 8);
    }

    #[test]
    fn tagged_union_round_trips_with_platform_tag() {
        let json = serde_json::to_value(ghl()).unwrap();
        assert_eq!(json["platform"], "gohighlevel");
        let parsed: PlatformCredentials = serde_json::from_value(json).unwrap();
        assert_eq!(parsed, ghl());
    }

    #[test]
    fn google_platforms_use_pkce_and_offline_scopes() {
        let config = OAuthClientConfig::new(
            PlatformCredentials::GoogleSheets {
                client_id: "id".to_owned(),
                client_secret: "secret".to_owned(),
            },
            "http://localhost/callback",
        );
        assert!(config.use_pkce);
        assert_eq!(config.token_url, GOOGLE_TOKEN_URL);
        assert!(!OAuthClientConfig::new(ghl(), "http://localhost/callback").use_pkce);
    }
}
