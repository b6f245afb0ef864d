// ABOUTME: HTTP-level adapter tests against wiremock platform doubles
// ABOUTME: Covers pagination draining, headers, unit conversion, throttling and outage retries, auth mapping
#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
#![allow(missing_docs)]
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

mod helpers;

use std::time::{Duration, Instant};

use helpers::{fast_context, march, paced_context, BASE_DELAY_MS};
use serde_json::{json, Value};
use tulen_adapters::{
    FacebookAdsAdapter, GoHighLevelAdapter, GoogleAdsAdapter, GoogleSheetsAdapter, PlatformAdapter,
};
use tulen_core::errors::{AuthFailure, ErrorKind, PlatformError};
use tulen_core::models::{Breakdown, FetchOptions, Platform};
use wiremock::matchers::{body_partial_json, header, method, path, query_param, query_param_is_missing};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn insights_row(impressions: &str, clicks: &str, spend: &str, leads: &str) -> Value {
    json!({
        "impressions": impressions,
        "clicks": clicks,
        "spend": spend,
        "actions": [{"action_type": "lead", "value": leads}],
        "date_start": "2024-03-01",
        "date_stop": "2024-03-31"
    })
}

#[tokio::test]
async fn facebook_drains_every_insights_page() {
    let server = MockServer::start().await;
    let next = format!("{}/act_42/insights?after=CURSOR2", server.uri());

    Mock::given(method("GET"))
        .and(path("/act_42/insights"))
        .and(query_param_is_missing("after"))
        .and(query_param("level", "account"))
        .and(header("authorization", "Bearer fb-token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": [insights_row("1000", "50", "120.50", "4")],
            "paging": {"cursors": {"after": "CURSOR2"}, "next": next}
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/act_42/insights"))
        .and(query_param("after", "CURSOR2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": [insights_row("500", "25", "79.50", "6")],
            "paging": {"cursors": {"after": "CURSOR3"}}
        })))
        .expect(1)
        .mount(&server)
        .await;

    let adapter = FacebookAdsAdapter::new(fast_context()).with_base_url(server.uri());
    let envelope = adapter
        .fetch_metrics("fb-token", "act_42", &march(), &FetchOptions::default())
        .await
        .unwrap();

    assert_eq!(envelope.platform, Platform::Facebook);
    assert_eq!(envelope.totals.impressions, 1500);
    assert_eq!(envelope.totals.clicks, 75);
    assert_eq!(envelope.totals.leads, 10);
    assert!((envelope.totals.spend - 200.0).abs() < 1e-9);
    assert!((envelope.derived.ctr - 5.0).abs() < 1e-9);
}

#[tokio::test]
async fn throttled_requests_succeed_after_backoff() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/act_7/insights"))
        .respond_with(ResponseTemplate::new(429))
        .up_to_n_times(2)
        .expect(2)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/act_7/insights"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": [insights_row("10", "1", "2.00", "1")]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let adapter = FacebookAdsAdapter::new(fast_context()).with_base_url(server.uri());
    let started = Instant::now();
    let envelope = adapter
        .fetch_metrics("fb-token", "act_7", &march(), &FetchOptions::default())
        .await
        .unwrap();

    assert_eq!(envelope.totals.leads, 1);
    // two backoffs: base, then base * 2
    assert!(started.elapsed().as_millis() >= u128::from(BASE_DELAY_MS * 3));
}

#[tokio::test]
async fn throttling_past_the_attempt_cap_reports_attempts() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/act_7/insights"))
        .respond_with(ResponseTemplate::new(429))
        .expect(3)
        .mount(&server)
        .await;

    let adapter = FacebookAdsAdapter::new(fast_context()).with_base_url(server.uri());
    let err = adapter
        .fetch_metrics("fb-token", "act_7", &march(), &FetchOptions::default())
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        PlatformError::RateLimited {
            platform: Platform::Facebook,
            attempts: 3,
            ..
        }
    ));
}

#[tokio::test]
async fn outages_are_retried_with_backoff() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/spreadsheets/sheet-1/values:batchGet"))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(2)
        .expect(2)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/spreadsheets/sheet-1/values:batchGet"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "valueRanges": [{"range": "Sheet1!A1:B2", "values": [["Date", "Leads"], ["2024-03-04", "3"]]}]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let adapter = GoogleSheetsAdapter::new(fast_context()).with_base_url(server.uri());
    let started = Instant::now();
    let envelope = adapter
        .fetch_metrics("s-token", "sheet-1", &march(), &FetchOptions::default())
        .await
        .unwrap();

    assert_eq!(envelope.totals.leads, 3);
    // two backoffs: base, then base * 2
    assert!(started.elapsed().as_millis() >= u128::from(BASE_DELAY_MS * 3));
}

#[tokio::test]
async fn persistent_outage_surfaces_as_network_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/customers/1234567890/googleAds:searchStream"))
        .respond_with(ResponseTemplate::new(503).set_body_json(json!({
            "error": {"code": 503, "message": "The service is currently unavailable.", "status": "UNAVAILABLE"}
        })))
        .expect(3)
        .mount(&server)
        .await;

    let adapter = GoogleAdsAdapter::new(fast_context(), "dev-token", None).with_base_url(server.uri());
    let err = adapter
        .fetch_metrics("g-token", "123-456-7890", &march(), &FetchOptions::default())
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Network);
    assert_eq!(err.platform(), Some(Platform::GoogleAds));
    assert!(err.to_string().contains("currently unavailable"));
}

#[tokio::test]
async fn oversized_retry_after_is_capped_instead_of_overflowing() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/contacts/search"))
        .respond_with(ResponseTemplate::new(429).insert_header("retry-after", "18446744073709551615"))
        .up_to_n_times(1)
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/contacts/search"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"contacts": [], "total": 0})))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/opportunities/search"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"opportunities": []})))
        .expect(1)
        .mount(&server)
        .await;

    let adapter = GoHighLevelAdapter::new(paced_context()).with_base_url(server.uri());
    let started = Instant::now();
    let envelope = adapter
        .fetch_metrics("ghl-token", "loc-1", &march(), &FetchOptions::default())
        .await
        .unwrap();

    assert_eq!(envelope.totals.leads, 0);
    assert!(started.elapsed() < Duration::from_secs(5));
}

#[tokio::test]
async fn unauthorized_is_reported_without_retry() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/act_9/insights"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({
            "error": {"message": "Error validating access token", "type": "OAuthException", "code": 190}
        })))
        .expect(1)
        .mount(&server)
        .await;

    let adapter = FacebookAdsAdapter::new(fast_context()).with_base_url(server.uri());
    let err = adapter
        .fetch_metrics("stale", "act_9", &march(), &FetchOptions::default())
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Auth);
    assert_eq!(err.auth_reason(), Some(AuthFailure::Rejected));
}

#[tokio::test]
async fn google_ads_converts_micros_and_sends_account_headers() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/customers/1234567890/googleAds:searchStream"))
        .and(header("authorization", "Bearer g-token"))
        .and(header("developer-token", "dev-123"))
        .and(header("login-customer-id", "9876543210"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"results": [{"metrics": {"impressions": "800", "clicks": "40", "costMicros": "12500000", "conversions": 3.0}}]},
            {"results": [{"metrics": {"impressions": "200", "clicks": "10", "costMicros": "0", "conversions": 1.0}}]}
        ])))
        .expect(1)
        .mount(&server)
        .await;

    let adapter = GoogleAdsAdapter::new(fast_context(), "dev-123", Some("987-654-3210".to_owned()))
        .with_base_url(server.uri());
    let envelope = adapter
        .fetch_metrics("g-token", "123-456-7890", &march(), &FetchOptions::default())
        .await
        .unwrap();

    assert_eq!(envelope.account_id, "1234567890");
    assert!((envelope.totals.spend - 12.5).abs() < 1e-9);
    assert_eq!(envelope.totals.impressions, 1000);
    assert_eq!(envelope.totals.leads, 4);
}

#[tokio::test]
async fn google_ads_campaign_type_breakdown_uses_second_query() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/customers/111/googleAds:searchStream"))
        .and(body_partial_json(json!({"query": "SELECT metrics.impressions, metrics.clicks, metrics.cost_micros, metrics.conversions FROM customer WHERE segments.date BETWEEN '2024-03-01' AND '2024-03-31'"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"results": [{"metrics": {"impressions": "30", "clicks": "3", "costMicros": "3000000", "conversions": 2}}]}
        ])))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/customers/111/googleAds:searchStream"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"results": [
                {"campaign": {"advertisingChannelType": "SEARCH"}, "metrics": {"impressions": "10", "clicks": "1", "costMicros": "1000000", "conversions": 1}},
                {"campaign": {"advertisingChannelType": "DISPLAY"}, "metrics": {"impressions": "20", "clicks": "2", "costMicros": "2000000", "conversions": 1}}
            ]}
        ])))
        .mount(&server)
        .await;

    let adapter = GoogleAdsAdapter::new(fast_context(), "dev", None).with_base_url(server.uri());
    let options = FetchOptions::default().with_breakdown(Breakdown::CampaignType);
    let envelope = adapter
        .fetch_metrics("g-token", "111", &march(), &options)
        .await
        .unwrap();

    assert_eq!(envelope.totals.leads, 2);
    let rows = &envelope.breakdowns[&Breakdown::CampaignType];
    let keys: Vec<&str> = rows.iter().map(|row| row.key.as_str()).collect();
    assert_eq!(keys, vec!["display", "search"]);
}

fn contact(id: usize, added: &str) -> Value {
    json!({
        "id": format!("c{id}"),
        "dateAdded": added,
        "source": "Facebook Ads",
        "searchAfter": [id, format!("c{id}")]
    })
}

#[tokio::test]
async fn gohighlevel_searches_contacts_by_date_and_follows_search_after() {
    let server = MockServer::start().await;

    let mut first_page: Vec<Value> = (0..99).map(|i| contact(i, "2024-03-05T10:00:00.000Z")).collect();
    first_page.push(contact(99, "2024-03-31T23:30:00.000Z"));
    Mock::given(method("POST"))
        .and(path("/contacts/search"))
        .and(body_partial_json(json!({"searchAfter": [99, "c99"]})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "contacts": [contact(100, "2024-03-31T23:45:00.000Z"), contact(101, "2024-04-01T00:00:00.000Z")],
            "total": 102
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/contacts/search"))
        .and(header("version", "2021-07-28"))
        .and(body_partial_json(json!({
            "locationId": "loc-1",
            "pageLimit": 100,
            "filters": [{
                "field": "dateAdded",
                "operator": "range",
                "value": {"gte": "2024-03-01T00:00:00.000Z", "lte": "2024-03-31T23:59:59.999Z"}
            }]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "contacts": first_page,
            "total": 102
        })))
        .up_to_n_times(1)
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/opportunities/search"))
        .and(query_param("location_id", "loc-1"))
        .and(query_param("status", "won"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "opportunities": [
                {"status": "won", "source": "Facebook Ads", "lastStatusChangeAt": "2024-03-10T09:00:00.000Z"},
                {"status": "won", "source": "Referral", "lastStatusChangeAt": "2024-01-10T09:00:00.000Z"}
            ],
            "meta": {"total": 2}
        })))
        .expect(1)
        .mount(&server)
        .await;

    let adapter = GoHighLevelAdapter::new(fast_context()).with_base_url(server.uri());
    let options = FetchOptions::default().with_breakdown(Breakdown::Source);
    let envelope = adapter
        .fetch_metrics("ghl-token", "loc-1", &march(), &options)
        .await
        .unwrap();

    assert_eq!(envelope.totals.leads, 101);
    assert_eq!(envelope.totals.conversions, 1);
    assert!((envelope.derived.conversion_rate - 100.0 / 101.0).abs() < 1e-9);
    let sources = &envelope.breakdowns[&Breakdown::Source];
    assert_eq!(sources.len(), 1);
    assert_eq!(sources[0].key, "facebook_ads");
}

#[tokio::test]
async fn google_sheets_sums_every_requested_block() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/spreadsheets/sheet-1/values:batchGet"))
        .and(query_param("ranges", "Leads!A:C"))
        .and(query_param("ranges", "Spend!A:B"))
        .and(header("authorization", "Bearer s-token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "spreadsheetId": "sheet-1",
            "valueRanges": [
                {"range": "Leads!A1:C4", "majorDimension": "ROWS", "values": [
                    ["Date", "Leads", "Conversions"],
                    ["2024-03-02", "5", "1"],
                    ["2024-03-03", "7", "2"],
                    ["2024-04-01", "50", "20"]
                ]},
                {"range": "Spend!A1:B3", "majorDimension": "ROWS", "values": [
                    ["date", "Spend"],
                    ["03/02/2024", "$100.00"],
                    ["03/03/2024", "$50.25"]
                ]}
            ]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let adapter = GoogleSheetsAdapter::new(fast_context()).with_base_url(server.uri());
    let options = FetchOptions {
        sheet_ranges: vec!["Leads!A:C".to_owned(), "Spend!A:B".to_owned()],
        ..FetchOptions::default()
    };
    let envelope = adapter
        .fetch_metrics("s-token", "sheet-1", &march(), &options)
        .await
        .unwrap();

    assert_eq!(envelope.totals.leads, 12);
    assert_eq!(envelope.totals.conversions, 3);
    assert!((envelope.totals.spend - 150.25).abs() < 1e-9);
    assert!((envelope.derived.cost_per_lead - 150.25 / 12.0).abs() < 1e-9);
}

#[tokio::test]
async fn google_sheets_permission_errors_are_api_errors() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/spreadsheets/locked/values:batchGet"))
        .respond_with(ResponseTemplate::new(403).set_body_json(json!({
            "error": {"code": 403, "message": "The caller does not have permission", "status": "PERMISSION_DENIED"}
        })))
        .expect(1)
        .mount(&server)
        .await;

    let adapter = GoogleSheetsAdapter::new(fast_context()).with_base_url(server.uri());
    let err = adapter
        .fetch_metrics("s-token", "locked", &march(), &FetchOptions::default())
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        PlatformError::Api {
            platform: Platform::GoogleSheets,
            status_code: Some(403),
            ..
        }
    ));
}
