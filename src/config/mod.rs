// ABOUTME: Configuration module for environment settings and platform credentials
// ABOUTME: Re-exports ServerConfig and the PlatformCredentials tagged union
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

/// Platform OAuth credentials and endpoint settings
pub mod credentials;
/// Environment-driven server configuration
pub mod environment;

pub use credentials::{OAuthClientConfig, PlatformCredentials};
pub use environment::{CacheConfig, HttpConfig, ServerConfig};
