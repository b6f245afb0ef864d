// ABOUTME: Normalized per-platform metrics envelope with zero-guarded derived ratios
// ABOUTME: Fetch options, breakdown rows and period-over-period change helpers
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

use std::collections::BTreeMap;
use std::ops::AddAssign;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{DateRange, Platform};
use crate::errors::PlatformError;

/// Ratio with an explicit zero guard
///
/// A zero (or non-finite) denominator yields `0.0`; so does a non-finite result.
#[must_use]
pub fn safe_ratio(numerator: f64, denominator: f64) -> f64 {
    if denominator == 0.0 || !denominator.is_finite() {
        return 0.0;
    }
    let ratio = numerator / denominator;
    if ratio.is_finite() {
        ratio
    } else {
        0.0
    }
}

/// Click-through rate in percent
#[must_use]
pub fn ctr(clicks: u64, impressions: u64) -> f64 {
    safe_ratio(clicks as f64, impressions as f64) * 100.0
}

/// Cost per click
#[must_use]
pub fn cpc(spend: f64, clicks: u64) -> f64 {
    safe_ratio(spend, clicks as f64)
}

/// Cost per thousand impressions
#[must_use]
pub fn cpm(spend: f64, impressions: u64) -> f64 {
    safe_ratio(spend, impressions as f64) * 1000.0
}

/// Spend divided by leads
#[must_use]
pub fn cost_per_lead(spend: f64, leads: u64) -> f64 {
    safe_ratio(spend, leads as f64)
}

/// Conversions per lead in percent
#[must_use]
pub fn conversion_rate(conversions: u64, leads: u64) -> f64 {
    safe_ratio(conversions as f64, leads as f64) * 100.0
}

/// Percent change from `previous` to `current`, `0.0` when `previous` is zero
#[must_use]
pub fn percent_change(current: f64, previous: f64) -> f64 {
    safe_ratio(current - previous, previous) * 100.0
}

/// Raw additive counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricTotals {
    /// Ad impressions
    pub impressions: u64,
    /// Ad clicks
    pub clicks: u64,
    /// Spend in account currency units
    pub spend: f64,
    /// Leads captured
    pub leads: u64,
    /// Conversions (won deals, purchases)
    pub conversions: u64,
}

impl AddAssign for MetricTotals {
    fn add_assign(&mut self, other: Self) {
        self.impressions += other.impressions;
        self.clicks += other.clicks;
        self.spend += other.spend;
        self.leads += other.leads;
        self.conversions += other.conversions;
    }
}

impl MetricTotals {
    /// Zero-guarded ratios over these totals
    #[must_use]
    pub fn derive(&self) -> DerivedMetrics {
        DerivedMetrics {
            ctr: ctr(self.clicks, self.impressions),
            cpc: cpc(self.spend, self.clicks),
            cpm: cpm(self.spend, self.impressions),
            cost_per_lead: cost_per_lead(self.spend, self.leads),
            conversion_rate: conversion_rate(self.conversions, self.leads),
        }
    }
}

/// Ratios computed from [`MetricTotals`]; never `NaN` or infinite
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DerivedMetrics {
    /// Click-through rate, percent
    pub ctr: f64,
    /// Cost per click
    pub cpc: f64,
    /// Cost per thousand impressions
    pub cpm: f64,
    /// Cost per lead
    pub cost_per_lead: f64,
    /// Conversions per lead, percent
    pub conversion_rate: f64,
}

/// Period-over-period percent changes
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PeriodChange {
    /// Impressions change, percent
    pub impressions: f64,
    /// Clicks change, percent
    pub clicks: f64,
    /// Spend change, percent
    pub spend: f64,
    /// Leads change, percent
    pub leads: f64,
    /// Conversions change, percent
    pub conversions: f64,
    /// Cost per lead change, percent
    pub cost_per_lead: f64,
}

impl PeriodChange {
    /// Compare `current` against `previous`
    #[must_use]
    pub fn between(current: &MetricTotals, previous: &MetricTotals) -> Self {
        Self {
            impressions: percent_change(current.impressions as f64, previous.impressions as f64),
            clicks: percent_change(current.clicks as f64, previous.clicks as f64),
            spend: percent_change(current.spend, previous.spend),
            leads: percent_change(current.leads as f64, previous.leads as f64),
            conversions: percent_change(current.conversions as f64, previous.conversions as f64),
            cost_per_lead: percent_change(
                cost_per_lead(current.spend, current.leads),
                cost_per_lead(previous.spend, previous.leads),
            ),
        }
    }
}

/// Dimension an adapter can segment metrics by
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Breakdown {
    /// Audience age bucket (Facebook)
    Age,
    /// Audience gender (Facebook)
    Gender,
    /// Advertising channel type (Google Ads)
    CampaignType,
    /// Lead source (GoHighLevel)
    Source,
}

impl Breakdown {
    /// Stable key used in envelopes and cache keys
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Age => "age",
            Self::Gender => "gender",
            Self::CampaignType => "campaign_type",
            Self::Source => "source",
        }
    }
}

impl FromStr for Breakdown {
    type Err = PlatformError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "age" => Ok(Self::Age),
            "gender" => Ok(Self::Gender),
            "campaign_type" | "channel" => Ok(Self::CampaignType),
            "source" => Ok(Self::Source),
            other => Err(PlatformError::config(format!("unknown breakdown: {other}"))),
        }
    }
}

/// One segment of a breakdown
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BreakdownRow {
    /// Normalized snake-case dimension value
    pub key: String,
    /// Counters for this segment
    #[serde(flatten)]
    pub totals: MetricTotals,
    /// Ratios for this segment
    pub derived: DerivedMetrics,
}

impl BreakdownRow {
    /// Row with derived ratios computed from `totals`
    #[must_use]
    pub fn new(key: impl Into<String>, totals: MetricTotals) -> Self {
        Self {
            key: key.into(),
            derived: totals.derive(),
            totals,
        }
    }
}

/// Per-request knobs passed to every adapter
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FetchOptions {
    /// Also fetch the preceding period of equal length
    #[serde(default)]
    pub include_previous_period: bool,
    /// Requested dimensions; adapters ignore the ones they cannot serve
    #[serde(default)]
    pub breakdowns: Vec<Breakdown>,
    /// Spreadsheet ranges (Google Sheets only)
    #[serde(default)]
    pub sheet_ranges: Vec<String>,
}

impl FetchOptions {
    /// Options with previous-period comparison enabled
    #[must_use]
    pub fn with_previous_period(mut self) -> Self {
        self.include_previous_period = true;
        self
    }

    /// Add a breakdown dimension
    #[must_use]
    pub fn with_breakdown(mut self, breakdown: Breakdown) -> Self {
        if !self.breakdowns.contains(&breakdown) {
            self.breakdowns.push(breakdown);
        }
        self
    }

    /// Whether `breakdown` was requested
    #[must_use]
    pub fn wants(&self, breakdown: Breakdown) -> bool {
        self.breakdowns.contains(&breakdown)
    }

    /// Deterministic fragment for cache keys
    #[must_use]
    pub fn cache_fragment(&self) -> String {
        let mut dims: Vec<&str> = self.breakdowns.iter().map(|b| b.as_str()).collect();
        dims.sort_unstable();
        format!(
            "prev={}|dims={}|ranges={}",
            self.include_previous_period,
            dims.join(","),
            self.sheet_ranges.join(";")
        )
    }
}

/// Normalized output of one adapter call
///
/// Built through [`MetricsEnvelope::new`], which always computes the derived
/// ratios, so an envelope is complete or does not exist.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricsEnvelope {
    /// Source platform
    pub platform: Platform,
    /// Account the metrics were read from
    pub account_id: String,
    /// Period covered
    pub date_range: DateRange,
    /// Counters
    #[serde(flatten)]
    pub totals: MetricTotals,
    /// Ratios
    pub derived: DerivedMetrics,
    /// Breakdown rows keyed by dimension
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub breakdowns: BTreeMap<Breakdown, Vec<BreakdownRow>>,
    /// Same shape for the preceding period, when requested
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub previous_period: Option<Box<MetricsEnvelope>>,
    /// Change versus the preceding period
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub period_change: Option<PeriodChange>,
    /// When the adapter finished
    pub fetched_at: DateTime<Utc>,
}

impl MetricsEnvelope {
    /// Envelope with derived ratios computed from `totals`
    #[must_use]
    pub fn new(
        platform: Platform,
        account_id: impl Into<String>,
        date_range: DateRange,
        totals: MetricTotals,
    ) -> Self {
        Self {
            platform,
            account_id: account_id.into(),
            date_range,
            derived: totals.derive(),
            totals,
            breakdowns: BTreeMap::new(),
            previous_period: None,
            period_change: None,
            fetched_at: Utc::now(),
        }
    }

    /// Attach breakdown rows for one dimension
    #[must_use]
    pub fn with_breakdown(mut self, breakdown: Breakdown, rows: Vec<BreakdownRow>) -> Self {
        self.breakdowns.insert(breakdown, rows);
        self
    }

    /// Attach the preceding period and compute changes against it
    #[must_use]
    pub fn with_previous_period(mut self, previous: Self) -> Self {
        self.period_change = Some(PeriodChange::between(&self.totals, &previous.totals));
        self.previous_period = Some(Box::new(previous));
        self
    }
}
