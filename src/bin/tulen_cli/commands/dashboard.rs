// ABOUTME: Dashboard command for tulen-cli
// ABOUTME: Fetches merged or single-platform metrics as JSON, cancellable with Ctrl-C
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

use std::sync::Arc;

use anyhow::{anyhow, Result};
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing::warn;
use tulen_reporting::adapters::AdapterContext;
use tulen_reporting::clients::InMemoryClientDirectory;
use tulen_reporting::config::ServerConfig;
use tulen_reporting::models::{Breakdown, DateRange, FetchOptions, Platform};
use tulen_reporting::oauth::TokenManager;
use tulen_reporting::orchestrator::AnalyticsOrchestrator;

/// Parsed `dashboard` arguments
pub struct DashboardArgs {
    pub client: String,
    pub start: String,
    pub end: String,
    pub platform: Option<Platform>,
    pub compare: bool,
    pub breakdowns: Vec<Breakdown>,
}

/// Fetch and print dashboard metrics
pub async fn run(
    config: &ServerConfig,
    context: &AdapterContext,
    tokens: Arc<TokenManager>,
    args: DashboardArgs,
) -> Result<()> {
    let date_range = DateRange::parse(&args.start, &args.end)?;
    let clients_file = config.clients_file.as_deref().ok_or_else(|| {
        anyhow!("no client bindings configured; set TULEN_CLIENTS_FILE or pass --clients-file")
    })?;
    let clients = Arc::new(InMemoryClientDirectory::from_json_file(clients_file)?);
    let orchestrator =
        AnalyticsOrchestrator::from_config(config, tokens, config.adapter_registry(context), clients);

    let options = FetchOptions {
        include_previous_period: args.compare,
        breakdowns: args.breakdowns,
        ..FetchOptions::default()
    };

    let cancel = CancellationToken::new();
    let watcher = cancel.clone();
    tokio::spawn(async move {
        if signal::ctrl_c().await.is_ok() {
            warn!("interrupt received, cancelling dashboard request");
            watcher.cancel();
        }
    });

    let output = match args.platform {
        Some(platform) => {
            let envelope = orchestrator
                .get_platform_data_only(&args.client, &date_range, platform, &options, &cancel)
                .await?;
            serde_json::to_string_pretty(&envelope)?
        }
        None => {
            let result = orchestrator
                .get_dashboard_data(&args.client, &date_range, &options, &cancel)
                .await?;
            serde_json::to_string_pretty(&result)?
        }
    };
    println!("{output}");
    Ok(())
}
