// ABOUTME: Main library entry point for the Tulen Reporting integration core
// ABOUTME: OAuth credential lifecycle plus multi-platform analytics orchestration
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

#![deny(unsafe_code)]

//! # Tulen Reporting
//!
//! Integration core behind a venue marketing dashboard. It keeps OAuth
//! credentials for Facebook Ads, Google Ads, GoHighLevel and Google Sheets
//! valid, and turns a `(client, date range)` request into one merged
//! metrics view across every platform the client is bound to.
//!
//! ## Architecture
//!
//! - **`oauth`**: authorization flow, code exchange and single-flight refresh
//!   through the [`oauth::TokenManager`], the only writer of token records
//! - **`store`**: token persistence (`SQLite` or in-memory)
//! - **`adapters`**: one adapter per platform, normalizing to a
//!   [`models::MetricsEnvelope`]
//! - **`orchestrator`**: concurrent fan-out, failure isolation, caching and
//!   cancellation
//! - **`clients`**: client to account binding lookup
//!
//! ## Example Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use tokio_util::sync::CancellationToken;
//! use tulen_reporting::clients::InMemoryClientDirectory;
//! use tulen_reporting::config::ServerConfig;
//! use tulen_reporting::models::{DateRange, FetchOptions};
//! use tulen_reporting::oauth::TokenManager;
//! use tulen_reporting::orchestrator::AnalyticsOrchestrator;
//! use tulen_reporting::store::SqliteTokenStore;
//!
//! # async fn run() -> anyhow::Result<()> {
//! let config = ServerConfig::from_env()?;
//! let context = config.adapter_context();
//! let store = Arc::new(SqliteTokenStore::connect(&config.database_url).await?);
//! let tokens = Arc::new(TokenManager::from_config(&config, store, context.client.clone()));
//! let clients = Arc::new(InMemoryClientDirectory::from_json_str(r#"[{"clientId": "venue-1"}]"#)?);
//! let orchestrator =
//!     AnalyticsOrchestrator::from_config(&config, tokens, config.adapter_registry(&context), clients);
//!
//! let range = DateRange::parse("2024-03-01", "2024-03-31")?;
//! let result = orchestrator
//!     .get_dashboard_data("venue-1", &range, &FetchOptions::default(), &CancellationToken::new())
//!     .await?;
//! println!("{}", serde_json::to_string_pretty(&result)?);
//! # Ok(())
//! # }
//! ```

pub use tulen_adapters as adapters;
pub use tulen_core::{constants, errors, models};

/// Client to account binding lookup
pub mod clients;

/// Environment-driven configuration and platform credentials
pub mod config;

/// Structured logging setup
pub mod logging;

/// OAuth token lifecycle
pub mod oauth;

/// Dashboard fan-out and merging
pub mod orchestrator;

/// Token persistence
pub mod store;
