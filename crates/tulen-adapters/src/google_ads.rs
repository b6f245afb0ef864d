// ABOUTME: Google Ads API adapter using googleAds:searchStream with GAQL queries
// ABOUTME: Sends developer-token and login-customer-id headers and converts costMicros to currency
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

use std::collections::BTreeMap;

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{debug, info};

use crate::constants::platforms::{
    GOOGLE_ADS_API_BASE_URL, GOOGLE_ADS_DEVELOPER_TOKEN_HEADER, GOOGLE_ADS_LOGIN_CUSTOMER_HEADER,
};
use crate::core::{AdapterContext, PlatformAdapter};
use crate::errors::{AuthFailure, PlatformError, PlatformResult};
use crate::http_client::classify_http_failure;
use crate::models::binding::normalize_google_customer;
use crate::models::{
    Breakdown, BreakdownRow, DateRange, FetchOptions, MetricTotals, MetricsEnvelope, Platform,
};
use crate::normalize::{micros_to_currency, snake_key, to_count, value_as_f64};

/// One `searchStream` batch
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StreamBatch {
    #[serde(default)]
    results: Vec<SearchRow>,
}

#[derive(Debug, Deserialize)]
struct SearchRow {
    #[serde(default)]
    metrics: Value,
    #[serde(default)]
    campaign: Value,
}

#[derive(Debug, Deserialize)]
struct GoogleErrorBody {
    error: GoogleError,
}

#[derive(Debug, Deserialize)]
struct GoogleError {
    #[serde(default)]
    message: String,
    #[serde(default)]
    status: String,
}

/// Map a Google API failure (Ads or Sheets) to the error taxonomy
///
/// `searchStream` wraps the error object in an array; both shapes are read.
#[must_use]
pub fn classify_google_error(
    platform: Platform,
    status: StatusCode,
    body: &str,
    retry_after: Option<u64>,
) -> PlatformError {
    let parsed = serde_json::from_str::<GoogleErrorBody>(body).ok().or_else(|| {
        serde_json::from_str::<Vec<GoogleErrorBody>>(body)
            .ok()
            .and_then(|errors| errors.into_iter().next())
    });
    let Some(GoogleErrorBody { error }) = parsed else {
        return classify_http_failure(platform, status, body, retry_after);
    };

    match error.status.as_str() {
        "RESOURCE_EXHAUSTED" => PlatformError::RateLimited {
            platform,
            retry_after_secs: retry_after,
            attempts: 1,
        },
        "UNAUTHENTICATED" => PlatformError::auth(platform, AuthFailure::Rejected, error.message),
        "UNAVAILABLE" | "DEADLINE_EXCEEDED" => PlatformError::network(platform, error.message),
        _ if status == StatusCode::UNAUTHORIZED || status == StatusCode::TOO_MANY_REQUESTS => {
            classify_http_failure(platform, status, body, retry_after)
        }
        other => PlatformError::api(
            platform,
            Some(status.as_u16()),
            format!("{other}: {}", error.message),
        ),
    }
}

/// Google Ads reporting adapter
#[derive(Debug, Clone)]
pub struct GoogleAdsAdapter {
    context: AdapterContext,
    base_url: String,
    developer_token: String,
    login_customer_id: Option<String>,
}

impl GoogleAdsAdapter {
    /// Adapter with the account's developer token and optional manager account
    #[must_use]
    pub fn new(
        context: AdapterContext,
        developer_token: impl Into<String>,
        login_customer_id: Option<String>,
    ) -> Self {
        Self {
            context,
            base_url: GOOGLE_ADS_API_BASE_URL.to_owned(),
            developer_token: developer_token.into(),
            login_customer_id: login_customer_id
                .map(|id| normalize_google_customer(&id))
                .filter(|id| !id.is_empty()),
        }
    }

    /// Point at another API host (tests, proxies)
    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_owned();
        self
    }

    async fn search_stream(
        &self,
        access_token: &str,
        customer_id: &str,
        query: String,
    ) -> PlatformResult<Vec<SearchRow>> {
        let url = format!(
            "{}/customers/{}/googleAds:searchStream",
            self.base_url,
            normalize_google_customer(customer_id)
        );
        let body = json!({ "query": query });

        let batches: Vec<StreamBatch> = self
            .context
            .request_json(Platform::GoogleAds, classify_google_error, |client| {
                let mut request = client
                    .post(&url)
                    .bearer_auth(access_token)
                    .header(GOOGLE_ADS_DEVELOPER_TOKEN_HEADER, &self.developer_token)
                    .json(&body);
                if let Some(login) = &self.login_customer_id {
                    request = request.header(GOOGLE_ADS_LOGIN_CUSTOMER_HEADER, login);
                }
                request
            })
            .await?;

        debug!(platform = %Platform::GoogleAds, batches = batches.len(), "search stream drained");
        Ok(batches.into_iter().flat_map(|batch| batch.results).collect())
    }
}

fn date_clause(date_range: &DateRange) -> String {
    format!(
        "segments.date BETWEEN '{}' AND '{}'",
        date_range.start_str(),
        date_range.end_str()
    )
}

fn account_query(date_range: &DateRange) -> String {
    format!(
        "SELECT metrics.impressions, metrics.clicks, metrics.cost_micros, metrics.conversions \
         FROM customer WHERE {}",
        date_clause(date_range)
    )
}

fn campaign_type_query(date_range: &DateRange) -> String {
    format!(
        "SELECT campaign.advertising_channel_type, metrics.impressions, metrics.clicks, \
         metrics.cost_micros, metrics.conversions FROM campaign WHERE {}",
        date_clause(date_range)
    )
}

/// Sums raw fields first so fractional conversions round once, at the end
#[derive(Debug, Default, Clone, Copy)]
struct RawSums {
    impressions: f64,
    clicks: f64,
    cost_micros: f64,
    conversions: f64,
}

impl RawSums {
    fn add(&mut self, metrics: &Value) {
        self.impressions += value_as_f64(metrics.get("impressions"));
        self.clicks += value_as_f64(metrics.get("clicks"));
        self.cost_micros += value_as_f64(metrics.get("costMicros"));
        self.conversions += value_as_f64(metrics.get("conversions"));
    }

    /// Google Ads conversions are the venue's lead actions
    fn totals(self) -> MetricTotals {
        MetricTotals {
            impressions: to_count(self.impressions),
            clicks: to_count(self.clicks),
            spend: micros_to_currency(self.cost_micros),
            leads: to_count(self.conversions),
            conversions: 0,
        }
    }
}

#[async_trait]
impl PlatformAdapter for GoogleAdsAdapter {
    fn platform(&self) -> Platform {
        Platform::GoogleAds
    }

    async fn fetch_metrics(
        &self,
        access_token: &str,
        account_id: &str,
        date_range: &DateRange,
        options: &FetchOptions,
    ) -> PlatformResult<MetricsEnvelope> {
        let customer_id = normalize_google_customer(account_id);
        info!(platform = %Platform::GoogleAds, customer_id = %customer_id, range = %date_range, "running searchStream");

        let rows = self
            .search_stream(access_token, &customer_id, account_query(date_range))
            .await?;
        let mut sums = RawSums::default();
        for row in &rows {
            sums.add(&row.metrics);
        }
        let mut envelope =
            MetricsEnvelope::new(Platform::GoogleAds, customer_id.clone(), *date_range, sums.totals());

        if options.wants(Breakdown::CampaignType) {
            let rows = self
                .search_stream(access_token, &customer_id, campaign_type_query(date_range))
                .await?;
            let mut grouped: BTreeMap<String, RawSums> = BTreeMap::new();
            for row in &rows {
                let key = row
                    .campaign
                    .get("advertisingChannelType")
                    .and_then(Value::as_str)
                    .map_or_else(|| "unknown".to_owned(), snake_key);
                grouped.entry(key).or_default().add(&row.metrics);
            }
            let breakdown = grouped
                .into_iter()
                .map(|(key, sums)| BreakdownRow::new(key, sums.totals()))
                .collect();
            envelope = envelope.with_breakdown(Breakdown::CampaignType, breakdown);
        }
        Ok(envelope)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::ErrorKind;

    #[test]
    fn resource_exhausted_is_rate_limit() {
        let body = r#"[{"error":{"code":429,"message":"Too many requests","status":"RESOURCE_EXHAUSTED"}}]"#;
        let err = classify_google_error(Platform::GoogleAds, StatusCode::TOO_MANY_REQUESTS, body, Some(3));
        assert_eq!(
            err,
            PlatformError::RateLimited {
                platform: Platform::GoogleAds,
                retry_after_secs: Some(3),
                attempts: 1
            }
        );
    }

    #[test]
    fn unauthenticated_is_auth_rejection() {
        let body = r#"{"error":{"code":401,"message":"Request had invalid authentication credentials.","status":"UNAUTHENTICATED"}}"#;
        let err = classify_google_error(Platform::GoogleAds, StatusCode::UNAUTHORIZED, body, None);
        assert_eq!(err.auth_reason(), Some(AuthFailure::Rejected));
    }

    #[test]
    fn permission_denied_is_api_error() {
        let body = r#"{"error":{"code":403,"message":"developer token not approved","status":"PERMISSION_DENIED"}}"#;
        let err = classify_google_error(Platform::GoogleAds, StatusCode::FORBIDDEN, body, None);
        assert_eq!(err.kind(), ErrorKind::Api);
        assert!(err.to_string().contains("PERMISSION_DENIED"));
    }

    #[test]
    fn sums_micros_before_converting() {
        let mut sums = RawSums::default();
        sums.add(&json!({"impressions": "100", "clicks": "7", "costMicros": "12500000", "conversions": 1.5}));
        sums.add(&json!({"impressions": "50", "clicks": "3", "costMicros": "2500000", "conversions": 1.0}));
        let totals = sums.totals();
        assert_eq!(totals.impressions, 150);
        assert!((totals.spend - 15.0).abs() < 1e-9);
        assert_eq!(totals.leads, 3);
    }

    #[test]
    fn query_uses_canonical_dates() {
        let range = DateRange::parse("01/02/2024", "01/09/2024").unwrap();
        let query = account_query(&range);
        assert!(query.contains("BETWEEN '2024-01-02' AND '2024-01-09'"));
    }
}
