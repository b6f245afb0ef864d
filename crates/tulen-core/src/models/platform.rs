// ABOUTME: Platform identity enum for the four external marketing data sources
// ABOUTME: Stable string keys used for token records, cache keys and log fields
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

use std::fmt::{self, Display, Formatter};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::constants::platforms;
use crate::errors::PlatformError;

/// External platform an adapter talks to
///
/// The string form (`platform_key`) is the primary key of a token record, so
/// it must never change once data has been persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Platform {
    /// Facebook / Meta Marketing API
    Facebook,
    /// Google Ads API
    GoogleAds,
    /// GoHighLevel CRM (LeadConnector API)
    #[serde(rename = "gohighlevel")]
    GoHighLevel,
    /// Google Sheets values API
    GoogleSheets,
}

impl Platform {
    /// Every platform, in display order
    pub const ALL: [Self; 4] = [
        Self::Facebook,
        Self::GoogleAds,
        Self::GoHighLevel,
        Self::GoogleSheets,
    ];

    /// Stable persistence key
    #[must_use]
    pub const fn platform_key(self) -> &'static str {
        match self {
            Self::Facebook => platforms::FACEBOOK,
            Self::GoogleAds => platforms::GOOGLE_ADS,
            Self::GoHighLevel => platforms::GOHIGHLEVEL,
            Self::GoogleSheets => platforms::GOOGLE_SHEETS,
        }
    }

    /// Human readable name for log lines and CLI output
    #[must_use]
    pub const fn display_name(self) -> &'static str {
        match self {
            Self::Facebook => "Facebook Ads",
            Self::GoogleAds => "Google Ads",
            Self::GoHighLevel => "GoHighLevel",
            Self::GoogleSheets => "Google Sheets",
        }
    }

    /// Camel-cased integration name carried in the OAuth `state` payload
    #[must_use]
    pub const fn integration_name(self) -> &'static str {
        match self {
            Self::Facebook => "facebookAds",
            Self::GoogleAds => "googleAds",
            Self::GoHighLevel => "goHighLevel",
            Self::GoogleSheets => "googleSheets",
        }
    }

    /// Whether this platform authenticates through the shared Google OAuth app
    #[must_use]
    pub const fn is_google(self) -> bool {
        matches!(self, Self::GoogleAds | Self::GoogleSheets)
    }
}

impl Display for Platform {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.platform_key())
    }
}

impl FromStr for Platform {
    type Err = PlatformError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase().replace('-', "_");
        match normalized.as_str() {
            "facebook" | "facebook_ads" | "meta" | "facebookads" => Ok(Self::Facebook),
            "google_ads" | "googleads" | "google" => Ok(Self::GoogleAds),
            "gohighlevel" | "go_high_level" | "ghl" | "crm" => Ok(Self::GoHighLevel),
            "google_sheets" | "googlesheets" | "sheets" => Ok(Self::GoogleSheets),
            _ => Err(PlatformError::config(format!("unknown platform: {s}"))),
        }
    }
}
