// ABOUTME: OAuth state parameter encoding and the registry of pending authorizations
// ABOUTME: A state is bound to one platform, expires after ten minutes and is consumed once
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

use base64::engine::general_purpose::{STANDARD_NO_PAD, URL_SAFE_NO_PAD};
use base64::Engine as _;
use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use uuid::Uuid;

use super::client::PkceParams;
use crate::constants::oauth::STATE_TTL_SECS;
use crate::errors::{AuthFailure, PlatformError, PlatformResult};
use crate::models::Platform;

/// Decoded content of the `state` query parameter
///
/// Google Ads and Google Sheets share `platform = "google"` and are told
/// apart by `integration_platform`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatePayload {
    /// Authorization server family
    pub platform: String,
    /// Integration the tokens will be stored under
    pub integration_platform: String,
    /// Issue time, milliseconds since the epoch
    pub timestamp: i64,
    /// Random nonce
    pub nonce: String,
}

impl StatePayload {
    /// Fresh payload for `platform`
    #[must_use]
    pub fn new(platform: Platform) -> Self {
        let family = if platform.is_google() {
            "google"
        } else {
            platform.platform_key()
        };
        Self {
            platform: family.to_owned(),
            integration_platform: platform.integration_name().to_owned(),
            timestamp: Utc::now().timestamp_millis(),
            nonce: Uuid::new_v4().simple().to_string(),
        }
    }

    /// Base64url JSON form sent as `state`
    ///
    /// The URL-safe alphabet keeps `+` out of the value, which a redirect
    /// that echoes the state unescaped would turn into a space.
    #[must_use]
    pub fn encode(&self) -> String {
        // Serializing a struct of strings and integers cannot fail
        let json = serde_json::to_vec(self).unwrap_or_default();
        URL_SAFE_NO_PAD.encode(json)
    }

    /// Parse a `state` value handed back by the redirect
    ///
    /// # Errors
    ///
    /// `Auth(invalid_state)` for anything that is not a payload this module issued
    ///
    /// Both base64 alphabets are accepted, padded or not, so states minted by
    /// web clients using standard base64 decode too.
    pub fn decode(platform: Platform, state: &str) -> PlatformResult<Self> {
        let unpadded = state.trim().trim_end_matches('=');
        let bytes = URL_SAFE_NO_PAD
            .decode(unpadded)
            .or_else(|_| STANDARD_NO_PAD.decode(unpadded))
            .map_err(|_| invalid_state(platform, "state is not base64"))?;
        serde_json::from_slice(&bytes).map_err(|_| invalid_state(platform, "state is not a valid payload"))
    }

    /// Platform the payload was issued for
    #[must_use]
    pub fn target(&self) -> Option<Platform> {
        Platform::ALL
            .into_iter()
            .find(|platform| platform.integration_name() == self.integration_platform)
    }
}

fn invalid_state(platform: Platform, detail: impl Into<String>) -> PlatformError {
    PlatformError::auth(platform, AuthFailure::InvalidState, detail)
}

#[derive(Debug, Clone)]
struct PendingAuthorization {
    platform: Platform,
    pkce: Option<PkceParams>,
    issued_at: DateTime<Utc>,
}

/// Authorizations started but not yet completed, keyed by encoded state
#[derive(Debug)]
pub struct StateRegistry {
    pending: DashMap<String, PendingAuthorization>,
    ttl: Duration,
}

impl Default for StateRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl StateRegistry {
    /// Registry with the standard ten minute lifetime
    #[must_use]
    pub fn new() -> Self {
        Self::with_ttl(Duration::seconds(STATE_TTL_SECS))
    }

    /// Registry with a custom lifetime
    #[must_use]
    pub fn with_ttl(ttl: Duration) -> Self {
        Self {
            pending: DashMap::new(),
            ttl,
        }
    }

    /// Issue a state for `platform`, remembering its PKCE parameters
    pub fn issue(&self, platform: Platform, pkce: Option<PkceParams>) -> String {
        self.purge_expired();
        let state = StatePayload::new(platform).encode();
        self.pending.insert(
            state.clone(),
            PendingAuthorization {
                platform,
                pkce,
                issued_at: Utc::now(),
            },
        );
        debug!(platform = %platform, pending = self.pending.len(), "authorization state issued");
        state
    }

    /// Consume `state` for an exchange on `platform`
    ///
    /// The entry is removed before it is checked, so a state can never be
    /// used twice even when the check fails.
    ///
    /// # Errors
    ///
    /// `Auth(invalid_state)` when the state is unknown, already used,
    /// expired or was issued for another platform
    pub fn consume(&self, platform: Platform, state: &str) -> PlatformResult<Option<PkceParams>> {
        let Some((_, pending)) = self.pending.remove(state) else {
            warn!(platform = %platform, "unknown or already consumed OAuth state");
            return Err(invalid_state(platform, "unknown or already used state"));
        };
        if Utc::now() - pending.issued_at > self.ttl {
            warn!(platform = %platform, "expired OAuth state");
            return Err(invalid_state(platform, "state expired"));
        }
        if pending.platform != platform {
            warn!(
                platform = %platform,
                issued_for = %pending.platform,
                "OAuth state issued for another platform"
            );
            return Err(invalid_state(
                platform,
                format!("state was issued for {}", pending.platform.display_name()),
            ));
        }
        let payload = StatePayload::decode(platform, state)?;
        if payload.target() != Some(platform) {
            return Err(invalid_state(platform, "state payload names another integration"));
        }
        Ok(pending.pkce)
    }

    /// Pending authorizations
    #[must_use]
    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    fn purge_expired(&self) {
        let cutoff = Utc::now() - self.ttl;
        self.pending.retain(|_, pending| pending.issued_at >= cutoff);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use base64::engine::general_purpose::STANDARD;

    #[test]
    fn google_payloads_share_family() {
        let ads = StatePayload::new(Platform::GoogleAds);
        let sheets = StatePayload::new(Platform::GoogleSheets);
        assert_eq!(ads.platform, "google");
        assert_eq!(sheets.platform, "google");
        assert_eq!(ads.integration_platform, "googleAds");
        assert_eq!(sheets.target(), Some(Platform::GoogleSheets));
    }

    #[test]
    fn payload_survives_encoding() {
        let payload = StatePayload::new(Platform::GoHighLevel);
        let decoded = StatePayload::decode(Platform::GoHighLevel, &payload.encode()).unwrap();
        assert_eq!(decoded, payload);
        assert!(StatePayload::decode(Platform::GoHighLevel, "%%%").is_err());
    }

    #[test]
    fn standard_padded_states_decode() {
        let state = "eyJwbGF0Zm9ybSI6Imdvb2dsZSIsInRpbWVzdGFtcCI6MTc1OTc1NDkxOTg0Niwibm9uY2UiOiJ4YWR2a3FpaGIwcSIsImludGVncmF0aW9uUGxhdGZvcm0iOiJnb29nbGVBZHMifQ==";
        let decoded = StatePayload::decode(Platform::GoogleAds, state).unwrap();
        assert_eq!(decoded.platform, "google");
        assert_eq!(decoded.nonce, "xadvkqihb0q");
        assert_eq!(decoded.timestamp, 1_759_754_919_846);
        assert_eq!(decoded.target(), Some(Platform::GoogleAds));

        let payload = StatePayload {
            nonce: "~~~~~~~~~".to_owned(),
            ..StatePayload::new(Platform::Facebook)
        };
        let standard = STANDARD.encode(serde_json::to_vec(&payload).unwrap());
        assert!(standard.contains('+'));
        assert_eq!(StatePayload::decode(Platform::Facebook, &standard).unwrap(), payload);

        let issued = StatePayload::new(Platform::Facebook).encode();
        assert!(!issued.contains(['+', '/', '=']));
    }

    #[test]
    fn state_is_single_use() {
        let registry = StateRegistry::new();
        let state = registry.issue(Platform::GoogleAds, Some(PkceParams::generate()));
        assert!(registry.consume(Platform::GoogleAds, &state).unwrap().is_some());
        let err = registry.consume(Platform::GoogleAds, &state).unwrap_err();
        assert_eq!(err.auth_reason(), Some(AuthFailure::InvalidState));
    }

    #[test]
    fn expired_state_is_rejected() {
        let registry = StateRegistry::with_ttl(Duration::seconds(-1));
        let state = registry.issue(Platform::Facebook, None);
        let err = registry.consume(Platform::Facebook, &state).unwrap_err();
        assert_eq!(err.auth_reason(), Some(AuthFailure::InvalidState));
        assert_eq!(registry.pending_count(), 0);
    }
}
