// ABOUTME: Composite multi-platform result assembled from per-platform outcomes
// ABOUTME: Failed platforms carry a null envelope plus an error entry and are excluded from aggregates
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::metrics::{DerivedMetrics, MetricTotals, MetricsEnvelope};
use super::{DateRange, Platform};
use crate::errors::{AuthFailure, ErrorKind, PlatformError, PlatformResult};

/// Error entry for one platform
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlatformFailure {
    /// Failed platform
    pub platform: Platform,
    /// Error discriminant
    pub error_kind: ErrorKind,
    /// Auth reason code, for auth failures
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<AuthFailure>,
    /// Human-readable message
    pub message: String,
}

impl PlatformFailure {
    /// Entry for `error` attributed to `platform`
    #[must_use]
    pub fn from_error(platform: Platform, error: &PlatformError) -> Self {
        Self {
            platform,
            error_kind: error.kind(),
            reason: error.auth_reason(),
            message: error.to_string(),
        }
    }
}

/// Totals and ratios across the platforms that returned data
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AggregateMetrics {
    /// Summed counters
    #[serde(flatten)]
    pub totals: MetricTotals,
    /// Ratios over the summed counters
    pub derived: DerivedMetrics,
    /// Platforms whose envelopes contributed
    pub platforms: Vec<Platform>,
    /// Summed previous-period counters, when every contributor carried one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub previous_period: Option<MetricTotals>,
}

impl AggregateMetrics {
    /// Sum the given envelopes; absent platforms simply do not contribute
    #[must_use]
    pub fn from_envelopes<'a>(envelopes: impl IntoIterator<Item = &'a MetricsEnvelope>) -> Self {
        let mut totals = MetricTotals::default();
        let mut previous = Some(MetricTotals::default());
        let mut platforms = Vec::new();
        for envelope in envelopes {
            totals += envelope.totals;
            previous = match (previous, envelope.previous_period.as_deref()) {
                (Some(mut sum), Some(prev)) => {
                    sum += prev.totals;
                    Some(sum)
                }
                _ => None,
            };
            platforms.push(envelope.platform);
        }
        if platforms.is_empty() {
            previous = None;
        }
        Self {
            derived: totals.derive(),
            totals,
            platforms,
            previous_period: previous,
        }
    }
}

/// Merged response for one dashboard request
///
/// Constructed once by [`CompositeResult::assemble`] and read-only afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompositeResult {
    client_id: String,
    date_range: DateRange,
    per_platform: BTreeMap<Platform, Option<MetricsEnvelope>>,
    errors: Vec<PlatformFailure>,
    combined: AggregateMetrics,
    generated_at: DateTime<Utc>,
}

impl CompositeResult {
    /// Build from settled per-platform outcomes
    ///
    /// Every outcome gets a `per_platform` entry: the envelope on success,
    /// `None` plus an error entry on failure.
    #[must_use]
    pub fn assemble(
        client_id: impl Into<String>,
        date_range: DateRange,
        outcomes: Vec<(Platform, PlatformResult<MetricsEnvelope>)>,
    ) -> Self {
        let mut per_platform = BTreeMap::new();
        let mut errors = Vec::new();
        for (platform, outcome) in outcomes {
            match outcome {
                Ok(envelope) => {
                    per_platform.insert(platform, Some(envelope));
                }
                Err(error) => {
                    errors.push(PlatformFailure::from_error(platform, &error));
                    per_platform.insert(platform, None);
                }
            }
        }
        errors.sort_by_key(|failure| failure.platform);
        let combined = AggregateMetrics::from_envelopes(per_platform.values().flatten());
        Self {
            client_id: client_id.into(),
            date_range,
            per_platform,
            errors,
            combined,
            generated_at: Utc::now(),
        }
    }

    /// Client the result was built for
    #[must_use]
    pub fn client_id(&self) -> &str {
        &self.client_id
    }

    /// Requested range
    #[must_use]
    pub const fn date_range(&self) -> DateRange {
        self.date_range
    }

    /// Envelope or `None` for every attempted platform
    #[must_use]
    pub const fn per_platform(&self) -> &BTreeMap<Platform, Option<MetricsEnvelope>> {
        &self.per_platform
    }

    /// Envelope for `platform`, when it was fetched successfully
    #[must_use]
    pub fn envelope(&self, platform: Platform) -> Option<&MetricsEnvelope> {
        self.per_platform.get(&platform).and_then(Option::as_ref)
    }

    /// Per-platform error entries
    #[must_use]
    pub fn errors(&self) -> &[PlatformFailure] {
        &self.errors
    }

    /// Error entry for `platform`
    #[must_use]
    pub fn error_for(&self, platform: Platform) -> Option<&PlatformFailure> {
        self.errors.iter().find(|failure| failure.platform == platform)
    }

    /// Aggregate across successful platforms
    #[must_use]
    pub const fn combined(&self) -> &AggregateMetrics {
        &self.combined
    }

    /// Assembly time
    #[must_use]
    pub const fn generated_at(&self) -> DateTime<Utc> {
        self.generated_at
    }

    /// Whether at least one platform failed
    #[must_use]
    pub fn is_partial(&self) -> bool {
        !self.errors.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn envelope(platform: Platform, spend: f64, leads: u64) -> MetricsEnvelope {
        MetricsEnvelope::new(
            platform,
            "acct",
            DateRange::parse("2024-01-01", "2024-01-31").unwrap(),
            MetricTotals {
                impressions: 1000,
                clicks: 50,
                spend,
                leads,
                conversions: 1,
            },
        )
    }

    #[test]
    fn failed_platforms_are_excluded_from_aggregate() {
        let range = DateRange::parse("2024-01-01", "2024-01-31").unwrap();
        let result = CompositeResult::assemble(
            "venue-1",
            range,
            vec![
                (Platform::Facebook, Err(PlatformError::not_connected(Platform::Facebook))),
                (Platform::GoogleAds, Ok(envelope(Platform::GoogleAds, 100.0, 4))),
                (Platform::GoHighLevel, Ok(envelope(Platform::GoHighLevel, 0.0, 6))),
            ],
        );

        assert!(result.envelope(Platform::Facebook).is_none());
        assert!(result.per_platform().contains_key(&Platform::Facebook));
        assert_eq!(result.errors().len(), 1);
        assert_eq!(result.errors()[0].error_kind, ErrorKind::Auth);
        assert_eq!(result.errors()[0].reason, Some(AuthFailure::NotConnected));

        let combined = result.combined();
        assert_eq!(combined.totals.leads, 10);
        assert_eq!(combined.totals.impressions, 2000);
        assert!((combined.derived.cost_per_lead - 10.0).abs() < 1e-9);
        assert_eq!(combined.platforms, vec![Platform::GoogleAds, Platform::GoHighLevel]);
        assert!(result.is_partial());
    }

    #[test]
    fn empty_result_has_zero_ratios() {
        let range = DateRange::parse("2024-01-01", "2024-01-02").unwrap();
        let result = CompositeResult::assemble("venue-1", range, Vec::new());
        assert!((result.combined().derived.ctr - 0.0).abs() < f64::EPSILON);
        assert!(result.combined().previous_period.is_none());
    }

    #[test]
    fn serializes_null_for_failed_platform() {
        let range = DateRange::parse("2024-01-01", "2024-01-31").unwrap();
        let result = CompositeResult::assemble(
            "venue-1",
            range,
            vec![(
                Platform::GoogleSheets,
                Err(PlatformError::network(Platform::GoogleSheets, "timed out")),
            )],
        );
        let json = serde_json::to_value(&result).unwrap();
        assert!(json["perPlatform"]["google_sheets"].is_null());
        assert_eq!(json["errors"][0]["errorKind"], "network");
    }
}
