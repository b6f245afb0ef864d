// ABOUTME: Facebook Marketing API adapter reading ad account insights
// ABOUTME: Drains paging.next links, maps Graph error codes and extracts leads from action types
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

use std::collections::{BTreeMap, HashMap};

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{debug, info};

use crate::constants::platforms::FACEBOOK_API_BASE_URL;
use crate::constants::tuning::DEFAULT_PAGE_SIZE;
use crate::core::{AdapterContext, PlatformAdapter};
use crate::errors::{AuthFailure, PlatformError, PlatformResult};
use crate::http_client::classify_http_failure;
use crate::models::{
    Breakdown, BreakdownRow, DateRange, FetchOptions, MetricTotals, MetricsEnvelope, Platform,
};
use crate::normalize::{snake_key, value_as_count, value_as_f64};
use crate::pagination::{collect_all, drain_pages, Page};

/// Action types counted as leads, most specific aggregate first
const LEAD_ACTION_TYPES: [&str; 3] = [
    "lead",
    "onsite_conversion.lead_grouped",
    "offsite_conversion.fb_pixel_lead",
];

/// Action types counted as conversions, most specific aggregate first
const PURCHASE_ACTION_TYPES: [&str; 2] = ["purchase", "offsite_conversion.fb_pixel_purchase"];

/// Graph error codes signalling throttling
const RATE_LIMIT_CODES: [i64; 6] = [4, 17, 32, 613, 80_000, 80_004];

/// Graph error codes signalling an invalid or expired token
const AUTH_CODES: [i64; 2] = [102, 190];

/// Graph error codes for transient server trouble
const TRANSIENT_CODES: [i64; 2] = [1, 2];

const INSIGHT_FIELDS: &str = "impressions,clicks,spend,actions";

#[derive(Debug, Deserialize)]
struct InsightsPage {
    #[serde(default)]
    data: Vec<InsightRow>,
    paging: Option<Paging>,
}

#[derive(Debug, Deserialize)]
struct Paging {
    next: Option<String>,
}

#[derive(Debug, Deserialize)]
struct InsightRow {
    impressions: Option<Value>,
    clicks: Option<Value>,
    spend: Option<Value>,
    #[serde(default)]
    actions: Vec<ActionValue>,
    /// Breakdown columns (`age`, `gender`) and date echoes
    #[serde(flatten)]
    dimensions: HashMap<String, Value>,
}

#[derive(Debug, Deserialize)]
struct ActionValue {
    action_type: String,
    value: Option<Value>,
}

#[derive(Debug, Deserialize)]
struct GraphErrorBody {
    error: GraphError,
}

#[derive(Debug, Deserialize)]
struct GraphError {
    #[serde(default)]
    message: String,
    #[serde(default)]
    code: i64,
    error_subcode: Option<i64>,
}

/// Map a Graph API failure to the error taxonomy
///
/// Graph reports throttling and token problems through `error.code`, often
/// with HTTP 400, so the body is inspected before the status.
#[must_use]
pub fn classify_facebook_error(
    platform: Platform,
    status: StatusCode,
    body: &str,
    retry_after: Option<u64>,
) -> PlatformError {
    let Ok(parsed) = serde_json::from_str::<GraphErrorBody>(body) else {
        return classify_http_failure(platform, status, body, retry_after);
    };
    let GraphError {
        message,
        code,
        error_subcode,
    } = parsed.error;

    if RATE_LIMIT_CODES.contains(&code) {
        return PlatformError::RateLimited {
            platform,
            retry_after_secs: retry_after,
            attempts: 1,
        };
    }
    if AUTH_CODES.contains(&code) || status == StatusCode::UNAUTHORIZED {
        let detail = error_subcode.map_or_else(
            || message.clone(),
            |subcode| format!("{message} (subcode {subcode})"),
        );
        return PlatformError::auth(platform, AuthFailure::Rejected, detail);
    }
    if TRANSIENT_CODES.contains(&code) {
        return PlatformError::network(platform, message);
    }
    PlatformError::api(
        platform,
        Some(status.as_u16()),
        format!("Graph error {code}: {message}"),
    )
}

/// Facebook Ads insights adapter
#[derive(Debug, Clone)]
pub struct FacebookAdsAdapter {
    context: AdapterContext,
    base_url: String,
}

impl FacebookAdsAdapter {
    /// Adapter against the production Graph API
    #[must_use]
    pub fn new(context: AdapterContext) -> Self {
        Self {
            context,
            base_url: FACEBOOK_API_BASE_URL.to_owned(),
        }
    }

    /// Point at another Graph host (tests, proxies)
    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_owned();
        self
    }

    async fn fetch_rows(
        &self,
        access_token: &str,
        account_id: &str,
        date_range: &DateRange,
        breakdown: Option<Breakdown>,
    ) -> PlatformResult<Vec<InsightRow>> {
        let first_url = format!("{}/{account_id}/insights", self.base_url);
        let mut params = vec![
            ("fields", INSIGHT_FIELDS.to_owned()),
            ("level", "account".to_owned()),
            (
                "time_range",
                json!({"since": date_range.start_str(), "until": date_range.end_str()}).to_string(),
            ),
            ("limit", DEFAULT_PAGE_SIZE.to_string()),
        ];
        if let Some(dimension) = breakdown {
            params.push(("breakdowns", dimension.as_str().to_owned()));
        }

        let context = &self.context;
        let first_url = &first_url;
        let params = &params;
        let stream = drain_pages(Platform::Facebook, move |cursor: Option<String>| async move {
            // paging.next is a complete URL that already carries every parameter
            let is_first = cursor.is_none();
            let url = cursor.unwrap_or_else(|| first_url.clone());
            let page: InsightsPage = context
                .request_json(Platform::Facebook, classify_facebook_error, |client| {
                    let request = client.get(&url).bearer_auth(access_token);
                    if is_first {
                        request.query(params)
                    } else {
                        request
                    }
                })
                .await?;
            Ok(Page {
                items: page.data,
                next: page.paging.and_then(|paging| paging.next),
            })
        });
        collect_all(stream).await
    }
}

/// First matching action type wins, so aggregate and granular types are not double counted
fn action_count(actions: &[ActionValue], types: &[&str]) -> u64 {
    types
        .iter()
        .find_map(|wanted| {
            actions
                .iter()
                .find(|action| action.action_type == *wanted)
                .map(|action| value_as_count(action.value.as_ref()))
        })
        .unwrap_or(0)
}

fn row_totals(row: &InsightRow) -> MetricTotals {
    MetricTotals {
        impressions: value_as_count(row.impressions.as_ref()),
        clicks: value_as_count(row.clicks.as_ref()),
        spend: value_as_f64(row.spend.as_ref()),
        leads: action_count(&row.actions, &LEAD_ACTION_TYPES),
        conversions: action_count(&row.actions, &PURCHASE_ACTION_TYPES),
    }
}

fn breakdown_rows(rows: &[InsightRow], dimension: Breakdown) -> Vec<BreakdownRow> {
    let mut grouped: BTreeMap<String, MetricTotals> = BTreeMap::new();
    for row in rows {
        let key = row
            .dimensions
            .get(dimension.as_str())
            .and_then(Value::as_str)
            .map_or_else(|| "unknown".to_owned(), snake_key);
        *grouped.entry(key).or_default() += row_totals(row);
    }
    grouped
        .into_iter()
        .map(|(key, totals)| BreakdownRow::new(key, totals))
        .collect()
}

#[async_trait]
impl PlatformAdapter for FacebookAdsAdapter {
    fn platform(&self) -> Platform {
        Platform::Facebook
    }

    async fn fetch_metrics(
        &self,
        access_token: &str,
        account_id: &str,
        date_range: &DateRange,
        options: &FetchOptions,
    ) -> PlatformResult<MetricsEnvelope> {
        info!(platform = %Platform::Facebook, account_id, range = %date_range, "fetching insights");

        let rows = self
            .fetch_rows(access_token, account_id, date_range, None)
            .await?;
        let mut totals = MetricTotals::default();
        for row in &rows {
            totals += row_totals(row);
        }
        debug!(platform = %Platform::Facebook, rows = rows.len(), "insights drained");

        let mut envelope = MetricsEnvelope::new(Platform::Facebook, account_id, *date_range, totals);
        for dimension in [Breakdown::Age, Breakdown::Gender] {
            if options.wants(dimension) {
                let rows = self
                    .fetch_rows(access_token, account_id, date_range, Some(dimension))
                    .await?;
                envelope = envelope.with_breakdown(dimension, breakdown_rows(&rows, dimension));
            }
        }
        Ok(envelope)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::ErrorKind;

    #[test]
    fn graph_throttle_codes_map_to_rate_limit() {
        let body = r#"{"error":{"message":"User request limit reached","type":"OAuthException","code":17}}"#;
        let err = classify_facebook_error(Platform::Facebook, StatusCode::BAD_REQUEST, body, None);
        assert_eq!(err.kind(), ErrorKind::RateLimit);
    }

    #[test]
    fn graph_token_errors_map_to_auth() {
        let body = r#"{"error":{"message":"Session has expired","type":"OAuthException","code":190,"error_subcode":463}}"#;
        let err = classify_facebook_error(Platform::Facebook, StatusCode::BAD_REQUEST, body, None);
        assert_eq!(err.auth_reason(), Some(AuthFailure::Rejected));
        assert!(err.to_string().contains("463"));
    }

    #[test]
    fn unknown_graph_errors_are_api_errors() {
        let body = r#"{"error":{"message":"Unsupported get request","code":100}}"#;
        let err = classify_facebook_error(Platform::Facebook, StatusCode::BAD_REQUEST, body, None);
        assert_eq!(err.kind(), ErrorKind::Api);
    }

    #[test]
    fn lead_actions_are_not_double_counted() {
        let row: InsightRow = serde_json::from_value(json!({
            "impressions": "1000",
            "clicks": "40",
            "spend": "250.75",
            "actions": [
                {"action_type": "onsite_conversion.lead_grouped", "value": "4"},
                {"action_type": "lead", "value": "6"},
                {"action_type": "link_click", "value": "40"}
            ]
        }))
        .unwrap();
        let totals = row_totals(&row);
        assert_eq!(totals.leads, 6);
        assert_eq!(totals.impressions, 1000);
        assert!((totals.spend - 250.75).abs() < 1e-9);
        assert_eq!(totals.conversions, 0);
    }

    #[test]
    fn breakdown_rows_group_by_dimension() {
        let rows: Vec<InsightRow> = serde_json::from_value(json!([
            {"impressions": "10", "clicks": "1", "spend": "5", "age": "25-34"},
            {"impressions": "20", "clicks": "2", "spend": "5", "age": "35-44"},
            {"impressions": "5", "clicks": "0", "spend": "1", "age": "25-34"}
        ]))
        .unwrap();
        let grouped = breakdown_rows(&rows, Breakdown::Age);
        assert_eq!(grouped.len(), 2);
        assert_eq!(grouped[0].key, "25-34");
        assert_eq!(grouped[0].totals.impressions, 15);
    }
}
