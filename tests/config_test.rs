// ABOUTME: Tests for environment-driven configuration loading
// ABOUTME: Serialized because they mutate process environment variables
#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
#![allow(missing_docs)]
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

use std::env;
use std::time::Duration;

use serial_test::serial;
use tulen_reporting::config::environment::DEFAULT_DATABASE_URL;
use tulen_reporting::config::{PlatformCredentials, ServerConfig};
use tulen_reporting::constants::env_config;
use tulen_reporting::errors::ErrorCode;
use tulen_reporting::models::Platform;

const MANAGED_VARS: [&str; 15] = [
    env_config::DATABASE_URL,
    env_config::REFRESH_THRESHOLD_SECS,
    env_config::FETCH_TIMEOUT_SECS,
    env_config::CACHE_TTL_SECS,
    env_config::CACHE_MAX_ENTRIES,
    env_config::RETRY_MAX_ATTEMPTS,
    env_config::RETRY_JITTER_FACTOR,
    env_config::CLIENTS_FILE,
    env_config::FACEBOOK_APP_ID,
    env_config::FACEBOOK_APP_SECRET,
    env_config::GOOGLE_CLIENT_ID,
    env_config::GOOGLE_CLIENT_SECRET,
    env_config::GOOGLE_ADS_DEVELOPER_TOKEN,
    env_config::GHL_CLIENT_ID,
    env_config::GHL_CLIENT_SECRET,
];

fn clear_env() {
    for key in MANAGED_VARS {
        env::remove_var(key);
    }
}

#[test]
#[serial]
fn defaults_apply_when_nothing_is_set() {
    clear_env();

    let config = ServerConfig::from_env().unwrap();

    assert_eq!(config.database_url, DEFAULT_DATABASE_URL);
    assert_eq!(config.refresh_threshold, Duration::from_secs(300));
    assert_eq!(config.fetch_timeout, Duration::from_secs(30));
    assert!(config.credentials.is_empty());
    assert!(config.oauth_clients().is_empty());
    assert!(config.clients_file.is_none());
}

#[test]
#[serial]
fn google_credentials_enable_sheets_without_a_developer_token() {
    clear_env();
    env::set_var(env_config::GOOGLE_CLIENT_ID, "google-client");
    env::set_var(env_config::GOOGLE_CLIENT_SECRET, "google-secret");

    let config = ServerConfig::from_env().unwrap();
    clear_env();

    assert!(config.credentials_for(Platform::GoogleSheets).is_some());
    assert!(config.credentials_for(Platform::GoogleAds).is_none());
    let registry = config.adapter_registry(&config.adapter_context());
    assert!(registry.get(Platform::GoogleSheets).is_some());
    assert!(registry.get(Platform::GoogleAds).is_none());
}

#[test]
#[serial]
fn full_credentials_configure_every_platform() {
    clear_env();
    env::set_var(env_config::FACEBOOK_APP_ID, "fb-app");
    env::set_var(env_config::FACEBOOK_APP_SECRET, "fb-secret");
    env::set_var(env_config::GOOGLE_CLIENT_ID, "google-client");
    env::set_var(env_config::GOOGLE_CLIENT_SECRET, "google-secret");
    env::set_var(env_config::GOOGLE_ADS_DEVELOPER_TOKEN, "dev-token");
    env::set_var(env_config::GHL_CLIENT_ID, " ghl-client ");
    env::set_var(env_config::GHL_CLIENT_SECRET, "ghl-secret");

    let config = ServerConfig::from_env().unwrap();
    clear_env();

    assert_eq!(config.oauth_clients().len(), 4);
    assert_eq!(
        config.credentials_for(Platform::GoHighLevel),
        Some(&PlatformCredentials::GoHighLevel {
            client_id: "ghl-client".to_owned(),
            client_secret: "ghl-secret".to_owned(),
        })
    );
}

#[test]
#[serial]
fn numeric_overrides_are_parsed() {
    clear_env();
    env::set_var(env_config::REFRESH_THRESHOLD_SECS, "600");
    env::set_var(env_config::FETCH_TIMEOUT_SECS, "5");
    env::set_var(env_config::CACHE_TTL_SECS, "0");
    env::set_var(env_config::RETRY_MAX_ATTEMPTS, "0");
    env::set_var(env_config::RETRY_JITTER_FACTOR, "3.5");

    let config = ServerConfig::from_env().unwrap();
    clear_env();

    assert_eq!(config.refresh_threshold, Duration::from_secs(600));
    assert_eq!(config.fetch_timeout, Duration::from_secs(5));
    assert_eq!(config.cache.ttl, Duration::ZERO);
    assert_eq!(config.retry.max_attempts, 1);
    assert!((config.retry.jitter_factor - 1.0).abs() < f64::EPSILON);
}

#[test]
#[serial]
fn unparseable_values_are_config_errors() {
    clear_env();
    env::set_var(env_config::FETCH_TIMEOUT_SECS, "soon");

    let err = ServerConfig::from_env().unwrap_err();
    clear_env();

    assert_eq!(err.code, ErrorCode::ConfigError);
    assert!(err.message.contains(env_config::FETCH_TIMEOUT_SECS));
}
