// ABOUTME: Core types and constants for the Tulen Reporting integration layer
// ABOUTME: Foundation crate with error handling, platform identities, date ranges and metric shapes
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

#![deny(unsafe_code)]

//! # Tulen Core
//!
//! Foundation crate providing shared types for the token lifecycle manager,
//! the platform adapters and the analytics orchestrator. This crate is designed
//! to change infrequently, enabling incremental compilation benefits in the
//! workspace.
//!
//! ## Modules
//!
//! - **errors**: `PlatformError` taxonomy for per-platform failures plus the
//!   crate-wide `AppError`/`ErrorCode`
//! - **constants**: Platform endpoints, scopes and tuning defaults
//! - **models**: `Platform`, `DateRange`, `OAuthTokenRecord`, `MetricsEnvelope`,
//!   `CompositeResult` and friends

/// Unified error handling: per-platform errors and application errors
pub mod errors;

/// Application constants organized by domain
pub mod constants;

/// Core data models shared by every layer of the integration core
pub mod models;
