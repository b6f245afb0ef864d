// ABOUTME: Platform identifiers, OAuth endpoints, API base URLs and required scopes
// ABOUTME: Single source of truth for every external URL the integration core calls
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

/// Facebook platform key
pub const FACEBOOK: &str = "facebook";
/// Google Ads platform key
pub const GOOGLE_ADS: &str = "google_ads";
/// GoHighLevel platform key
pub const GOHIGHLEVEL: &str = "gohighlevel";
/// Google Sheets platform key
pub const GOOGLE_SHEETS: &str = "google_sheets";

// Facebook / Meta

/// Graph API version pinned for insights queries
pub const FACEBOOK_GRAPH_VERSION: &str = "v18.0";
/// Graph API base URL
pub const FACEBOOK_API_BASE_URL: &str = "https://graph.facebook.com/v18.0";
/// Facebook OAuth dialog
pub const FACEBOOK_AUTH_URL: &str = "https://www.facebook.com/v18.0/dialog/oauth";
/// Facebook token endpoint (code exchange and long-lived token exchange)
pub const FACEBOOK_TOKEN_URL: &str = "https://graph.facebook.com/v18.0/oauth/access_token";
/// Facebook scopes required for insights
pub const FACEBOOK_SCOPES: &[&str] = &["ads_read", "ads_management", "business_management"];

// Google (shared by Ads and Sheets)

/// Google OAuth consent endpoint
pub const GOOGLE_AUTH_URL: &str = "https://accounts.google.com/o/oauth2/v2/auth";
/// Google token endpoint
pub const GOOGLE_TOKEN_URL: &str = "https://oauth2.googleapis.com/token";
/// Google Ads API base URL
pub const GOOGLE_ADS_API_BASE_URL: &str = "https://googleads.googleapis.com/v16";
/// Google Ads scope
pub const GOOGLE_ADS_SCOPES: &[&str] = &["https://www.googleapis.com/auth/adwords"];
/// Google Sheets API base URL
pub const GOOGLE_SHEETS_API_BASE_URL: &str = "https://sheets.googleapis.com/v4";
/// Google Sheets scopes
pub const GOOGLE_SHEETS_SCOPES: &[&str] = &[
    "https://www.googleapis.com/auth/spreadsheets.readonly",
    "https://www.googleapis.com/auth/drive.readonly",
];
/// Static developer credential header required by Google Ads
pub const GOOGLE_ADS_DEVELOPER_TOKEN_HEADER: &str = "developer-token";
/// Manager account header used when accessing client accounts through an MCC
pub const GOOGLE_ADS_LOGIN_CUSTOMER_HEADER: &str = "login-customer-id";

// GoHighLevel / LeadConnector

/// LeadConnector API base URL
pub const GOHIGHLEVEL_API_BASE_URL: &str = "https://services.leadconnectorhq.com";
/// GoHighLevel location chooser (authorization endpoint)
pub const GOHIGHLEVEL_AUTH_URL: &str = "https://marketplace.gohighlevel.com/oauth/chooselocation";
/// GoHighLevel token endpoint
pub const GOHIGHLEVEL_TOKEN_URL: &str = "https://services.leadconnectorhq.com/oauth/token";
/// GoHighLevel scopes
pub const GOHIGHLEVEL_SCOPES: &[&str] = &[
    "contacts.readonly",
    "opportunities.readonly",
    "locations.readonly",
];
/// API version header required on every LeadConnector call
pub const GOHIGHLEVEL_VERSION_HEADER: &str = "Version";
/// Pinned LeadConnector API version
pub const GOHIGHLEVEL_API_VERSION: &str = "2021-07-28";
