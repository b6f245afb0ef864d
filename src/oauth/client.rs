// ABOUTME: OAuth token endpoint client for code exchange and refresh across all platforms
// ABOUTME: Generates PKCE parameters and maps token endpoint failures to auth reasons
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

use std::collections::HashMap;
use std::fmt::{self, Debug, Formatter};

use async_trait::async_trait;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine as _;
use chrono::{Duration, Utc};
use rand::Rng;
use reqwest::{Client, RequestBuilder, StatusCode};
use serde::Deserialize;
use serde_json::Value;
use sha2::{Digest, Sha256};
use tracing::{debug, warn};

use crate::config::OAuthClientConfig;
use crate::constants::oauth::{
    CODE_VERIFIER_LENGTH, DEFAULT_TOKEN_EXPIRY_SECS, DEFAULT_TOKEN_TYPE,
    FACEBOOK_LONG_LIVED_EXPIRY_SECS,
};
use crate::errors::{AuthFailure, PlatformError, PlatformResult};
use crate::models::{AccountInfo, Platform, TokenSet};

/// PKCE (Proof Key for Code Exchange) parameters
#[derive(Clone, PartialEq, Eq)]
pub struct PkceParams {
    /// Random code verifier (43-128 characters)
    pub code_verifier: String,
    /// Base64url SHA-256 of the verifier
    pub code_challenge: String,
    /// Always `S256`
    pub code_challenge_method: String,
}

impl PkceParams {
    /// Generate parameters with the `S256` challenge method
    #[must_use]
    pub fn generate() -> Self {
        const CHARS: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789-._~";
        let mut rng = rand::thread_rng();
        let code_verifier: String = (0..CODE_VERIFIER_LENGTH)
            .map(|_| char::from(CHARS[rng.gen_range(0..CHARS.len())]))
            .collect();
        Self::from_verifier(code_verifier)
    }

    /// Derive the challenge for a known verifier
    #[must_use]
    pub fn from_verifier(code_verifier: String) -> Self {
        let code_challenge = URL_SAFE_NO_PAD.encode(Sha256::digest(code_verifier.as_bytes()));
        Self {
            code_verifier,
            code_challenge,
            code_challenge_method: "S256".into(),
        }
    }
}

impl Debug for PkceParams {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("PkceParams")
            .field("code_challenge", &self.code_challenge)
            .field("code_challenge_method", &self.code_challenge_method)
            .finish_non_exhaustive()
    }
}

/// Tokens plus whatever account metadata the token response carried
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenGrant {
    /// Issued tokens
    pub tokens: TokenSet,
    /// Account metadata, when the platform returns it with the tokens
    pub account_info: Option<AccountInfo>,
}

/// What a refresh exchange is performed with
#[derive(Clone, PartialEq, Eq)]
pub enum RefreshGrant {
    /// `grant_type=refresh_token` (Google, GoHighLevel)
    RefreshToken(String),
    /// `grant_type=fb_exchange_token` with the current long-lived token (Facebook)
    FacebookExchange(String),
}

impl Debug for RefreshGrant {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::RefreshToken(_) => f.write_str("RefreshToken([REDACTED])"),
            Self::FacebookExchange(_) => f.write_str("FacebookExchange([REDACTED])"),
        }
    }
}

/// Network side of the OAuth lifecycle
///
/// Implemented over HTTP by [`HttpTokenEndpoint`]; tests substitute counting
/// doubles.
#[async_trait]
pub trait TokenEndpoint: Send + Sync {
    /// Exchange an authorization code
    ///
    /// # Errors
    ///
    /// `Auth(rejected)` when the platform refuses the code, `Network` on
    /// transport failure, `Config` when the platform is not configured
    async fn exchange_code(
        &self,
        platform: Platform,
        code: &str,
        pkce: Option<&PkceParams>,
    ) -> PlatformResult<TokenGrant>;

    /// Obtain fresh tokens
    ///
    /// # Errors
    ///
    /// `Auth(revoked)` when the grant is no longer valid, `Auth(refresh_failed)`
    /// on transport or server failure
    async fn refresh(&self, platform: Platform, grant: &RefreshGrant) -> PlatformResult<TokenSet>;
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TokenResponse {
    #[serde(rename = "access_token")]
    access_token: String,
    #[serde(rename = "token_type", default)]
    token_type: Option<String>,
    #[serde(rename = "expires_in", default)]
    expires_in: Option<i64>,
    #[serde(rename = "refresh_token", default)]
    refresh_token: Option<String>,
    #[serde(default)]
    scope: Option<String>,
    #[serde(default)]
    location_id: Option<String>,
    #[serde(default)]
    company_id: Option<String>,
    #[serde(default)]
    user_type: Option<String>,
}

impl TokenResponse {
    fn into_token_set(self, default_expiry_secs: i64) -> TokenSet {
        TokenSet {
            access_token: self.access_token,
            refresh_token: self.refresh_token.filter(|token| !token.is_empty()),
            expires_at: Utc::now()
                + Duration::seconds(self.expires_in.unwrap_or(default_expiry_secs)),
            token_type: self
                .token_type
                .filter(|kind| !kind.is_empty())
                .unwrap_or_else(|| DEFAULT_TOKEN_TYPE.to_owned()),
            scope: self.scope,
        }
    }

    fn account_info(&self, platform: Platform) -> Option<AccountInfo> {
        match platform {
            Platform::GoHighLevel if self.location_id.is_some() || self.company_id.is_some() => {
                Some(AccountInfo::GoHighLevel {
                    location_id: self.location_id.clone(),
                    company_id: self.company_id.clone(),
                    user_type: self.user_type.clone(),
                })
            }
            _ => None,
        }
    }
}

/// Which exchange a token endpoint failure came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Exchange {
    Code,
    Refresh,
}

/// Token endpoint client over HTTP for every configured platform
pub struct HttpTokenEndpoint {
    client: Client,
    configs: HashMap<Platform, OAuthClientConfig>,
}

impl HttpTokenEndpoint {
    /// Endpoint client for the given platform configurations
    #[must_use]
    pub fn new(client: Client, configs: impl IntoIterator<Item = OAuthClientConfig>) -> Self {
        Self {
            client,
            configs: configs
                .into_iter()
                .map(|config| (config.platform(), config))
                .collect(),
        }
    }

    fn config(&self, platform: Platform) -> PlatformResult<&OAuthClientConfig> {
        self.configs.get(&platform).ok_or_else(|| {
            PlatformError::config_for(platform, format!("no OAuth credentials configured for {platform}"))
        })
    }

    async fn send(
        platform: Platform,
        exchange: Exchange,
        request: RequestBuilder,
    ) -> PlatformResult<TokenResponse> {
        let response = request.send().await.map_err(|e| {
            warn!(platform = %platform, error = %e, "token endpoint unreachable");
            match exchange {
                Exchange::Code => PlatformError::network(platform, e.to_string()),
                Exchange::Refresh => PlatformError::auth(platform, AuthFailure::RefreshFailed, e.to_string()),
            }
        })?;

        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        debug!(platform = %platform, status = status.as_u16(), "token endpoint responded");
        if !status.is_success() {
            return Err(classify_token_failure(platform, exchange, status, &body));
        }
        serde_json::from_str(&body).map_err(|e| match exchange {
            Exchange::Code => PlatformError::api(
                platform,
                Some(status.as_u16()),
                format!("malformed token response: {e}"),
            ),
            Exchange::Refresh => PlatformError::auth(
                platform,
                AuthFailure::RefreshFailed,
                format!("malformed token response: {e}"),
            ),
        })
    }

    async fn facebook_long_lived(
        &self,
        config: &OAuthClientConfig,
        short_lived: &str,
        exchange: Exchange,
    ) -> PlatformResult<TokenSet> {
        let request = self.client.get(&config.token_url).query(&[
            ("grant_type", "fb_exchange_token"),
            ("client_id", config.credentials.client_id()),
            ("client_secret", config.credentials.client_secret()),
            ("fb_exchange_token", short_lived),
        ]);
        let response = Self::send(Platform::Facebook, exchange, request).await?;
        Ok(response.into_token_set(FACEBOOK_LONG_LIVED_EXPIRY_SECS))
    }
}

impl Debug for HttpTokenEndpoint {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("HttpTokenEndpoint")
            .field("platforms", &self.configs.keys().collect::<Vec<_>>())
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl TokenEndpoint for HttpTokenEndpoint {
    async fn exchange_code(
        &self,
        platform: Platform,
        code: &str,
        pkce: Option<&PkceParams>,
    ) -> PlatformResult<TokenGrant> {
        let config = self.config(platform)?;
        let credentials = &config.credentials;

        if platform == Platform::Facebook {
            let request = self.client.get(&config.token_url).query(&[
                ("client_id", credentials.client_id()),
                ("client_secret", credentials.client_secret()),
                ("redirect_uri", config.redirect_uri.as_str()),
                ("code", code),
            ]);
            let short_lived = Self::send(platform, Exchange::Code, request).await?;
            let tokens = self
                .facebook_long_lived(config, &short_lived.access_token, Exchange::Code)
                .await?;
            return Ok(TokenGrant {
                tokens,
                account_info: None,
            });
        }

        let mut params = vec![
            ("client_id", credentials.client_id()),
            ("client_secret", credentials.client_secret()),
            ("code", code),
            ("grant_type", "authorization_code"),
            ("redirect_uri", config.redirect_uri.as_str()),
        ];
        if let Some(pkce) = pkce {
            params.push(("code_verifier", pkce.code_verifier.as_str()));
        }
        let response =
            Self::send(platform, Exchange::Code, self.client.post(&config.token_url).form(&params))
                .await?;
        let account_info = response.account_info(platform);
        Ok(TokenGrant {
            tokens: response.into_token_set(DEFAULT_TOKEN_EXPIRY_SECS),
            account_info,
        })
    }

    async fn refresh(&self, platform: Platform, grant: &RefreshGrant) -> PlatformResult<TokenSet> {
        let config = self.config(platform)?;
        match grant {
            RefreshGrant::FacebookExchange(current) => {
                self.facebook_long_lived(config, current, Exchange::Refresh).await
            }
            RefreshGrant::RefreshToken(refresh_token) => {
                let params = [
                    ("client_id", config.credentials.client_id()),
                    ("client_secret", config.credentials.client_secret()),
                    ("refresh_token", refresh_token.as_str()),
                    ("grant_type", "refresh_token"),
                ];
                let request = self.client.post(&config.token_url).form(&params);
                let response = Self::send(platform, Exchange::Refresh, request).await?;
                Ok(response.into_token_set(DEFAULT_TOKEN_EXPIRY_SECS))
            }
        }
    }
}

/// Human readable error from an OAuth error body
///
/// Google and GoHighLevel return `{"error": "...", "error_description": "..."}`,
/// Facebook returns `{"error": {"message": "...", "code": 190}}`.
fn oauth_error_text(body: &str) -> (Option<String>, String) {
    let Ok(value) = serde_json::from_str::<Value>(body) else {
        return (None, body.chars().take(200).collect());
    };
    match value.get("error") {
        Some(Value::String(code)) => {
            let description = value
                .get("error_description")
                .and_then(Value::as_str)
                .unwrap_or_default();
            (Some(code.clone()), format!("{code}: {description}"))
        }
        Some(Value::Object(error)) => {
            let message = error
                .get("message")
                .and_then(Value::as_str)
                .unwrap_or("token endpoint error")
                .to_owned();
            (None, message)
        }
        _ => (None, body.chars().take(200).collect()),
    }
}

fn classify_token_failure(
    platform: Platform,
    exchange: Exchange,
    status: StatusCode,
    body: &str,
) -> PlatformError {
    let (code, message) = oauth_error_text(body);
    let rejected = code.as_deref() == Some("invalid_grant")
        || status == StatusCode::BAD_REQUEST
        || status == StatusCode::UNAUTHORIZED;
    match (exchange, rejected) {
        (Exchange::Refresh, true) => PlatformError::auth(platform, AuthFailure::Revoked, message),
        (Exchange::Refresh, false) => PlatformError::auth(
            platform,
            AuthFailure::RefreshFailed,
            format!("token endpoint returned {status}: {message}"),
        ),
        (Exchange::Code, true) => PlatformError::auth(platform, AuthFailure::Rejected, message),
        (Exchange::Code, false) => PlatformError::api(platform, Some(status.as_u16()), message),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pkce_challenge_matches_rfc_7636_example() {
        let pkce = PkceParams::from_verifier("dBjftJeZ4CVP-mB92K27uhbUJU1p1r_wW1gFWFOEjXk".to_owned());
        assert_eq!(pkce.code_challenge, "E9Melhoa2OwvFrEMTJguCHaoeK1t8URWbuGRSdrE2V8");
        assert_eq!(pkce.code_challenge_method, "S256");
    }

    #[test]
    fn generated_verifier_has_configured_length() {
        let pkce = PkceParams::generate();
        assert_eq!(pkce.code_verifier.len(), CODE_VERIFIER_LENGTH);
        assert!(!format!("{pkce:?}").contains(&pkce.code_verifier));
    }

    #[test]
    fn invalid_grant_on_refresh_is_revocation() {
        let err = classify_token_failure(
            Platform::GoogleAds,
            Exchange::Refresh,
            StatusCode::BAD_REQUEST,
            r#"{"error":"invalid_grant","error_description":"Token has been expired or revoked."}"#,
        );
        assert_eq!(err.auth_reason(), Some(AuthFailure::Revoked));
        assert!(err.to_string().contains("invalid_grant"));
    }

    #[test]
    fn server_errors_on_refresh_are_transient() {
        let err = classify_token_failure(
            Platform::GoHighLevel,
            Exchange::Refresh,
            StatusCode::BAD_GATEWAY,
            "upstream down",
        );
        assert_eq!(err.auth_reason(), Some(AuthFailure::RefreshFailed));
    }

    #[test]
    fn facebook_error_objects_are_readable() {
        let (code, message) =
            oauth_error_text(r#"{"error":{"message":"Invalid verification code format.","code":100}}"#);
        assert_eq!(code, None);
        assert_eq!(message, "Invalid verification code format.");
    }

    #[test]
    fn gohighlevel_token_response_carries_location() {
        let response: TokenResponse = serde_json::from_value(serde_json::json!({
            "access_token": "a",
            "token_type": "Bearer",
            "expires_in": 86399,
            "refresh_token": "r",
            "scope": "contacts.readonly",
            "userType": "Location",
            "locationId": "loc-9",
            "companyId": "co-1"
        }))
        .unwrap();
        assert_eq!(
            response.account_info(Platform::GoHighLevel),
            Some(AccountInfo::GoHighLevel {
                location_id: Some("loc-9".to_owned()),
                company_id: Some("co-1".to_owned()),
                user_type: Some("Location".to_owned()),
            })
        );
        let tokens = response.into_token_set(DEFAULT_TOKEN_EXPIRY_SECS);
        assert_eq!(tokens.refresh_token.as_deref(), Some("r"));
    }
}
