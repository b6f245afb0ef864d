// ABOUTME: Tulen CLI - connect platforms, inspect credentials and pull dashboard metrics
// ABOUTME: Thin command layer over the TokenManager and AnalyticsOrchestrator
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence
//!
//! Usage:
//! ```bash
//! # Connect Google Ads (prints the consent URL, then reads the redirect URL from stdin)
//! tulen-cli connect --platform google_ads
//!
//! # Show every platform's connection state
//! tulen-cli status
//!
//! # Forget a platform's tokens
//! tulen-cli disconnect --platform facebook
//!
//! # Merged metrics for one client, with the previous period for comparison
//! tulen-cli dashboard --client venue-1 --start 2024-03-01 --end 2024-03-31 --compare
//! ```

mod commands;
mod helpers;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing::info;
use tulen_reporting::config::ServerConfig;
use tulen_reporting::logging::LoggingConfig;
use tulen_reporting::models::{Breakdown, Platform};
use tulen_reporting::oauth::TokenManager;
use tulen_reporting::store::SqliteTokenStore;

use commands::dashboard::DashboardArgs;

#[derive(Parser)]
#[command(
    name = "tulen-cli",
    about = "Tulen Reporting CLI",
    long_about = "Connect marketing platforms over OAuth and pull merged dashboard metrics."
)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Database URL override
    #[arg(long, global = true)]
    database_url: Option<String>,

    /// Client bindings file override (JSON array)
    #[arg(long, global = true)]
    clients_file: Option<PathBuf>,

    /// Enable debug logging
    #[arg(long, short = 'v', global = true)]
    verbose: bool,
}

#[non_exhaustive]
#[derive(Subcommand)]
enum Command {
    /// Run the OAuth authorization flow for a platform
    Connect {
        /// Platform key (facebook, google_ads, gohighlevel, google_sheets)
        #[arg(long)]
        platform: Platform,
    },

    /// Print every platform's connection state
    Status,

    /// Remove a platform's stored tokens
    Disconnect {
        /// Platform key
        #[arg(long)]
        platform: Platform,
    },

    /// Fetch merged metrics for a client
    Dashboard {
        /// Client id from the bindings file
        #[arg(long)]
        client: String,

        /// First day (YYYY-MM-DD or MM/DD/YYYY)
        #[arg(long)]
        start: String,

        /// Last day, inclusive
        #[arg(long)]
        end: String,

        /// Only this platform
        #[arg(long)]
        platform: Option<Platform>,

        /// Include the preceding period of equal length
        #[arg(long)]
        compare: bool,

        /// Breakdown dimensions (age, gender, campaign_type, source)
        #[arg(long, value_delimiter = ',')]
        breakdown: Vec<Breakdown>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut logging = LoggingConfig::from_env();
    if cli.verbose {
        "debug".clone_into(&mut logging.level);
    }
    logging.init()?;

    let mut config = ServerConfig::from_env()?;
    if let Some(database_url) = cli.database_url {
        config.database_url = database_url;
    }
    if cli.clients_file.is_some() {
        config.clients_file = cli.clients_file;
    }

    let context = config.adapter_context();
    let store = Arc::new(SqliteTokenStore::connect(&config.database_url).await?);
    let tokens = Arc::new(TokenManager::from_config(&config, store, context.client.clone()));
    info!(platforms = ?tokens.configured_platforms(), "token manager ready");

    match cli.command {
        Command::Connect { platform } => commands::oauth::connect(&tokens, platform).await?,
        Command::Status => commands::oauth::status(&tokens).await?,
        Command::Disconnect { platform } => commands::oauth::disconnect(&tokens, platform).await?,
        Command::Dashboard {
            client,
            start,
            end,
            platform,
            compare,
            breakdown,
        } => {
            let args = DashboardArgs {
                client,
                start,
                end,
                platform,
                compare,
                breakdowns: breakdown,
            };
            commands::dashboard::run(&config, &context, tokens, args).await?;
        }
    }

    Ok(())
}
