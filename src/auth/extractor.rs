// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 SwipesBlue

//! Axum extractor for the authenticated caller.
//!
//! ```rust,ignore
//! async fn my_handler(ApiKeyAuth(caller): ApiKeyAuth) -> impl IntoResponse {
//!     // caller is ApiKeyContext
//! }
//! ```

use axum::{extract::FromRequestParts, http::request::Parts};

use super::credentials::extract_api_key;
use super::{ApiKeyContext, AuthError};
use crate::state::AppState;

/// Caller context for handlers.
///
/// Reuses the context attached by
/// [`require_api_key`](super::middleware::require_api_key) when present,
/// otherwise authenticates the request itself.
pub struct ApiKeyAuth(pub ApiKeyContext);

impl FromRequestParts<AppState> for ApiKeyAuth {
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        if let Some(context) = parts.extensions.get::<ApiKeyContext>().cloned() {
            return Ok(ApiKeyAuth(context));
        }

        let context = state
            .authenticator
            .authenticate(extract_api_key(parts))
            .await?;
        parts.extensions.insert(context.clone());
        Ok(ApiKeyAuth(context))
    }
}
