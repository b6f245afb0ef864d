// ABOUTME: OAuth credential lifecycle: authorization flow, token exchanges and refresh
// ABOUTME: The TokenManager is the only writer of token records
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

/// Token endpoint client and PKCE
pub mod client;
/// Token lifecycle manager
pub mod manager;
/// Authorization state registry
pub mod state;

pub use client::{HttpTokenEndpoint, PkceParams, RefreshGrant, TokenEndpoint, TokenGrant};
pub use manager::{AuthorizationRequest, CallbackParams, ConnectionState, TokenManager};
pub use state::{StatePayload, StateRegistry};
