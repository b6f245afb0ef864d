// ABOUTME: Shared HTTP client with connection pooling for platform API calls
// ABOUTME: Single-attempt request execution mapping transport and HTTP failures to PlatformError
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

use std::sync::OnceLock;
use std::time::Duration;

use reqwest::header::{HeaderMap, RETRY_AFTER};
use reqwest::{Client, ClientBuilder, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use crate::constants::tuning::{DEFAULT_HTTP_CONNECT_TIMEOUT_SECS, DEFAULT_HTTP_TIMEOUT_SECS};
use crate::errors::{AuthFailure, PlatformError, PlatformResult};
use crate::models::Platform;

/// Configured timeout values for the shared client
static CLIENT_TIMEOUTS: OnceLock<(u64, u64)> = OnceLock::new();

/// Global shared HTTP client with configured timeouts
static SHARED_CLIENT: OnceLock<Client> = OnceLock::new();

/// Maps a non-success response to the platform's error taxonomy
///
/// Arguments are the platform, HTTP status, response body and the parsed
/// `Retry-After` header in seconds.
pub type ErrorClassifier = fn(Platform, StatusCode, &str, Option<u64>) -> PlatformError;

/// Initialize the shared HTTP client timeout configuration
///
/// Call once at startup before any adapter is built. Later calls are ignored.
pub fn initialize_shared_client(timeout_secs: u64, connect_timeout_secs: u64) {
    let _ = CLIENT_TIMEOUTS.set((timeout_secs, connect_timeout_secs));
}

/// Shared HTTP client for platform API calls and token endpoints
pub fn shared_client() -> &'static Client {
    SHARED_CLIENT.get_or_init(|| {
        let (timeout, connect_timeout) = CLIENT_TIMEOUTS
            .get()
            .copied()
            .unwrap_or((DEFAULT_HTTP_TIMEOUT_SECS, DEFAULT_HTTP_CONNECT_TIMEOUT_SECS));

        ClientBuilder::new()
            .timeout(Duration::from_secs(timeout))
            .connect_timeout(Duration::from_secs(connect_timeout))
            .user_agent(concat!("tulen-reporting/", env!("CARGO_PKG_VERSION")))
            .build()
            .unwrap_or_else(|_| Client::new())
    })
}

/// Parse `Retry-After` as delta-seconds
#[must_use]
pub fn retry_after_secs(headers: &HeaderMap) -> Option<u64> {
    headers
        .get(RETRY_AFTER)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.trim().parse::<u64>().ok())
}

/// Default mapping for platforms without a structured error body
///
/// 401 is an auth rejection, 429 is throttling, 502/503/504 are transient
/// transport failures, everything else is an API error carrying the body.
#[must_use]
pub fn classify_http_failure(
    platform: Platform,
    status: StatusCode,
    body: &str,
    retry_after: Option<u64>,
) -> PlatformError {
    match status {
        StatusCode::UNAUTHORIZED => PlatformError::auth(
            platform,
            AuthFailure::Rejected,
            "access token expired or invalid",
        ),
        StatusCode::TOO_MANY_REQUESTS => PlatformError::RateLimited {
            platform,
            retry_after_secs: retry_after,
            attempts: 1,
        },
        StatusCode::BAD_GATEWAY | StatusCode::SERVICE_UNAVAILABLE | StatusCode::GATEWAY_TIMEOUT => {
            PlatformError::network(platform, format!("upstream unavailable ({status})"))
        }
        _ => PlatformError::api(
            platform,
            Some(status.as_u16()),
            format!("request failed with status {status}: {}", truncate(body)),
        ),
    }
}

/// Send one request and decode the JSON body
///
/// # Errors
///
/// Transport failures become `Network`; non-success statuses go through
/// `classify`; an undecodable body is an `Api` error.
pub async fn execute_json<T: DeserializeOwned>(
    platform: Platform,
    request: RequestBuilder,
    classify: ErrorClassifier,
) -> PlatformResult<T> {
    let response = request.send().await.map_err(|e| {
        warn!(platform = %platform, error = %e, "request failed before a response");
        PlatformError::network(platform, e.to_string())
    })?;

    let status = response.status();
    debug!(platform = %platform, status = status.as_u16(), "received response");

    if !status.is_success() {
        let retry_after = retry_after_secs(response.headers());
        let body = response.text().await.unwrap_or_default();
        return Err(classify(platform, status, &body, retry_after));
    }

    let body = response
        .text()
        .await
        .map_err(|e| PlatformError::network(platform, format!("failed to read body: {e}")))?;
    serde_json::from_str(&body).map_err(|e| {
        PlatformError::api(
            platform,
            Some(status.as_u16()),
            format!("failed to parse response: {e}"),
        )
    })
}

fn truncate(body: &str) -> &str {
    const MAX: usize = 256;
    if body.len() <= MAX {
        return body;
    }
    let mut end = MAX;
    while !body.is_char_boundary(end) {
        end -= 1;
    }
    &body[..end]
}
