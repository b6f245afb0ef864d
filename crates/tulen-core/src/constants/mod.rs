// ABOUTME: Application constants organized by domain
// ABOUTME: Platform endpoints, OAuth defaults and request tuning values
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

/// Platform identifiers, endpoints, scopes and header names
pub mod platforms;

/// OAuth lifecycle defaults (refresh threshold, state TTL, PKCE)
pub mod oauth;

/// Request tuning defaults (timeouts, retries, rate ceilings, cache)
pub mod tuning;

/// Environment variable names read by the configuration layer
pub mod env_config;
