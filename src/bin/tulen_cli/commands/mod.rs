// ABOUTME: Command modules for tulen-cli
// ABOUTME: OAuth connection management and dashboard retrieval
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

pub mod dashboard;
pub mod oauth;
