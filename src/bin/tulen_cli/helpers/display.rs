// ABOUTME: Output formatting helpers for tulen-cli
// ABOUTME: Consistent display of authorization prompts and connection state
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

use std::collections::BTreeMap;

use tulen_reporting::models::{OAuthTokenRecord, Platform};
use tulen_reporting::oauth::{AuthorizationRequest, ConnectionState};

/// Show the consent URL and how to hand back the redirect
pub fn display_authorization_prompt(request: &AuthorizationRequest) {
    println!("\nConnect {}", request.platform.display_name());
    println!("{}", "=".repeat(60));
    println!("1. Open this URL in a browser and grant access:\n");
    println!("{}\n", request.url);
    println!("2. Paste the full URL you were redirected to, then press Enter:");
}

/// Summarize a freshly stored record without its secrets
pub fn display_connected(record: &OAuthTokenRecord) {
    println!("\n{} connected", record.platform().display_name());
    println!("   Expires: {}", record.expires_at().format("%Y-%m-%d %H:%M UTC"));
    println!(
        "   Refresh token: {}",
        if record.refresh_token().is_some() { "stored" } else { "none" }
    );
    if let Some(scope) = record.scope() {
        println!("   Scope: {scope}");
    }
}

/// One line per platform
pub fn display_status(states: &BTreeMap<Platform, ConnectionState>, configured: &[Platform]) {
    println!("{:<16} {:<14} CREDENTIALS", "PLATFORM", "STATE");
    for (platform, state) in states {
        let credentials = if configured.contains(platform) { "configured" } else { "missing" };
        let state = state.to_string();
        println!("{:<16} {state:<14} {credentials}", platform.platform_key());
    }
}
