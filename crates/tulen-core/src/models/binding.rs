// ABOUTME: Client to per-platform external account binding used to scope dashboard fetches
// ABOUTME: Normalizes ad account and customer identifiers and treats blanks as unbound
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

use serde::{Deserialize, Serialize};

use super::Platform;

/// External account identifiers bound to one client (venue)
///
/// Read-only input to the orchestrator. A platform is bound when its
/// identifier is present and non-blank.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientAccountBinding {
    /// Client identity
    pub client_id: String,
    /// Display name
    #[serde(default)]
    pub client_name: Option<String>,
    /// Facebook ad account id, with or without the `act_` prefix
    #[serde(default)]
    pub facebook_ad_account_id: Option<String>,
    /// Google Ads customer id, dashes allowed
    #[serde(default)]
    pub google_ads_customer_id: Option<String>,
    /// GoHighLevel location id
    #[serde(default)]
    pub gohighlevel_location_id: Option<String>,
    /// Google Sheets spreadsheet id
    #[serde(default)]
    pub google_sheets_spreadsheet_id: Option<String>,
    /// A1 ranges to read from the spreadsheet; empty means the first sheet
    #[serde(default)]
    pub google_sheets_ranges: Vec<String>,
}

impl ClientAccountBinding {
    /// Binding with no accounts
    #[must_use]
    pub fn new(client_id: impl Into<String>) -> Self {
        Self {
            client_id: client_id.into(),
            ..Self::default()
        }
    }

    /// Builder: bind an account id for `platform`
    #[must_use]
    pub fn with_account(mut self, platform: Platform, account_id: impl Into<String>) -> Self {
        let account_id = Some(account_id.into());
        match platform {
            Platform::Facebook => self.facebook_ad_account_id = account_id,
            Platform::GoogleAds => self.google_ads_customer_id = account_id,
            Platform::GoHighLevel => self.gohighlevel_location_id = account_id,
            Platform::GoogleSheets => self.google_sheets_spreadsheet_id = account_id,
        }
        self
    }

    /// Normalized account id for `platform`, `None` when unbound
    #[must_use]
    pub fn account_for(&self, platform: Platform) -> Option<String> {
        let raw = match platform {
            Platform::Facebook => self.facebook_ad_account_id.as_deref(),
            Platform::GoogleAds => self.google_ads_customer_id.as_deref(),
            Platform::GoHighLevel => self.gohighlevel_location_id.as_deref(),
            Platform::GoogleSheets => self.google_sheets_spreadsheet_id.as_deref(),
        }?;
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return None;
        }
        Some(match platform {
            Platform::Facebook => normalize_facebook_account(trimmed),
            Platform::GoogleAds => normalize_google_customer(trimmed),
            Platform::GoHighLevel | Platform::GoogleSheets => trimmed.to_owned(),
        })
    }

    /// Platforms this client is bound to, in display order
    #[must_use]
    pub fn bound_platforms(&self) -> Vec<Platform> {
        Platform::ALL
            .into_iter()
            .filter(|platform| self.account_for(*platform).is_some())
            .collect()
    }
}

/// `1234` and `act_1234` both become `act_1234`
#[must_use]
pub fn normalize_facebook_account(account_id: &str) -> String {
    let bare = account_id.trim().trim_start_matches("act_");
    format!("act_{bare}")
}

/// `123-456-7890` becomes `1234567890`
#[must_use]
pub fn normalize_google_customer(customer_id: &str) -> String {
    customer_id
        .chars()
        .filter(|c| !c.is_whitespace() && *c != '-')
        .collect()
}
