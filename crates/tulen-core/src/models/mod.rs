// ABOUTME: Core data models shared by the token manager, adapters and orchestrator
// ABOUTME: Platform identities, date ranges, token records, bindings and metric envelopes
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

/// Platform identity enum
pub mod platform;

/// Validated calendar date ranges
pub mod date_range;

/// OAuth token records and per-platform account info
pub mod token;

/// Client to external account bindings
pub mod binding;

/// Normalized metric envelopes and zero-guarded derived metrics
pub mod metrics;

/// Multi-platform composite results
pub mod composite;

pub use binding::ClientAccountBinding;
pub use composite::{AggregateMetrics, CompositeResult, PlatformFailure};
pub use date_range::DateRange;
pub use metrics::{
    Breakdown, BreakdownRow, DerivedMetrics, FetchOptions, MetricTotals, MetricsEnvelope,
    PeriodChange,
};
pub use platform::Platform;
pub use token::{AccountInfo, OAuthTokenRecord, StoredTokenRecord, TokenSet};
