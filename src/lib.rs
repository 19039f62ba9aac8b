// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 SwipesBlue

//! SwipesBlue - Partner Access Control Service
//!
//! Decides what a merchant's subscription tier entitles them to, which
//! partner platform may call which endpoint, and carries signed webhooks
//! between SwipesBlue and its partner platforms.
//!
//! ## Modules
//!
//! - `tiers` - Tier normalization, ranking and the entitlement matrix
//! - `auth` - API-key authentication, permission and platform gates, HMAC
//! - `storage` - API key store (in-memory or redb)
//! - `webhooks` - Outbound delivery with retries, inbound partner receiver
//! - `api` - HTTP API handlers (Axum)

pub mod api;
pub mod auth;
pub mod config;
pub mod error;
pub mod state;
pub mod storage;
pub mod telemetry;
pub mod tiers;
pub mod webhooks;
