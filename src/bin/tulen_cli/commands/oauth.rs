// ABOUTME: OAuth commands for tulen-cli
// ABOUTME: Handles connect, status and disconnect for each platform
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

use anyhow::{bail, Result};
use tokio::io::{self, AsyncBufReadExt, BufReader};
use tracing::info;
use tulen_reporting::models::Platform;
use tulen_reporting::oauth::{CallbackParams, TokenManager};

use crate::helpers::display::{display_authorization_prompt, display_connected, display_status};

/// Authorize `platform` interactively
pub async fn connect(tokens: &TokenManager, platform: Platform) -> Result<()> {
    let request = tokens.begin_authorization(platform)?;
    display_authorization_prompt(&request);

    let mut line = String::new();
    BufReader::new(io::stdin()).read_line(&mut line).await?;
    if line.trim().is_empty() {
        bail!("no redirect URL entered");
    }

    let params = CallbackParams::from_redirect_url(&line);
    let record = tokens.complete_authorization(platform, &params).await?;
    info!(platform = %platform, "platform connected");
    display_connected(&record);
    Ok(())
}

/// Print every platform's connection state
pub async fn status(tokens: &TokenManager) -> Result<()> {
    let states = tokens.connection_status().await?;
    display_status(&states, &tokens.configured_platforms());
    Ok(())
}

/// Forget `platform`'s tokens
pub async fn disconnect(tokens: &TokenManager, platform: Platform) -> Result<()> {
    tokens.clear_tokens(platform).await?;
    println!("{} disconnected", platform.display_name());
    Ok(())
}
