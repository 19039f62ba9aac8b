// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 SwipesBlue

//! # Authentication Module
//!
//! API-key authentication and access control for the SwipesBlue partner API.
//!
//! ## Auth Flow
//!
//! 1. Partner platform sends its key as `Authorization: Bearer <key>`,
//!    `Authorization: ApiKey <key>`, a bare `Authorization: <key>`, or
//!    `?api_key=<key>`
//! 2. Server:
//!    - Looks the key up in the credential store (bounded by a timeout)
//!    - Rejects unknown (401) and deactivated (403) keys
//!    - Records `last_used_at` off the request path
//!    - Attaches an [`ApiKeyContext`] to the request
//! 3. Per-route gates check permissions, then platform
//!
//! ## Security
//!
//! - Keys are compared by exact match and never logged in full
//! - Internal failures return a uniform 500 body; detail stays in the logs
//! - Webhook payloads are signed with HMAC-SHA256 and verified in constant
//!   time

pub mod api_key;
pub mod authenticator;
pub mod credentials;
pub mod error;
pub mod extractor;
pub mod keygen;
pub mod middleware;
pub mod signature;

pub use api_key::{permissions, ApiKey, ApiKeyContext, INTERNAL_PLATFORM, WILDCARD_PERMISSION};
pub use authenticator::ApiKeyAuthenticator;
pub use error::AuthError;
pub use extractor::ApiKeyAuth;
pub use keygen::{generate_api_key, generate_api_secret, generate_webhook_secret};
pub use signature::{sign_payload, verify_signature};
