// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 SwipesBlue

//! Access-control middleware for Axum.
//!
//! Independent gates, composed per route with `route_layer`:
//!
//! 1. [`require_api_key`] authenticates the caller and attaches an
//!    [`ApiKeyContext`] to the request extensions.
//! 2. [`require_permission`] checks the attached context for a permission.
//! 3. [`require_platform`] checks the attached context's platform.
//! 4. [`require_tier`] checks the merchant tier forwarded with the request.
//!
//! Layers added later wrap earlier ones, so register them in reverse
//! execution order:
//!
//! ```rust,ignore
//! Router::new()
//!     .route("/v1/api-keys", get(list_keys))
//!     .route_layer(middleware::from_fn(|req: Request, next: Next| {
//!         require_platform(INTERNAL_PLATFORM, req, next)
//!     }))
//!     .route_layer(middleware::from_fn(|req: Request, next: Next| {
//!         require_permission(permissions::MANAGE_API_KEYS, req, next)
//!     }))
//!     .route_layer(middleware::from_fn_with_state(state.clone(), require_api_key))
//! ```
//!
//! Every gate short-circuits with an error response on failure.

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::{IntoResponse, Response},
};
use tracing::warn;

use super::credentials::extract_api_key;
use super::{ApiKeyContext, AuthError};
use crate::state::AppState;
use crate::tiers::{MerchantTier, Tier};

/// Authenticate the request's API key and attach its context.
pub async fn require_api_key(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Response {
    let (mut parts, body) = request.into_parts();
    let credential = extract_api_key(&parts);

    match state.authenticator.authenticate(credential).await {
        Ok(context) => {
            parts.extensions.insert(context);
            next.run(Request::from_parts(parts, body)).await
        }
        Err(e) => e.into_response(),
    }
}

/// Reject callers whose key lacks `permission` (or `*`).
pub async fn require_permission(
    permission: &'static str,
    request: Request,
    next: Next,
) -> Response {
    let verdict = match request.extensions().get::<ApiKeyContext>() {
        None => Err(AuthError::MissingAuthContext),
        Some(context) => context.require_permission(permission).inspect_err(|_| {
            warn!(
                key_id = %context.id,
                platform = %context.platform,
                permission,
                "Permission denied"
            )
        }),
    };

    match verdict {
        Ok(()) => next.run(request).await,
        Err(e) => e.into_response(),
    }
}

/// Reject callers whose key belongs to neither `platform` nor `internal`.
pub async fn require_platform(platform: &'static str, request: Request, next: Next) -> Response {
    let verdict = match request.extensions().get::<ApiKeyContext>() {
        None => Err(AuthError::MissingAuthContext),
        Some(context) => context.require_platform(platform).inspect_err(|_| {
            warn!(
                key_id = %context.id,
                key_platform = %context.platform,
                required_platform = platform,
                "Platform not allowed"
            )
        }),
    };

    match verdict {
        Ok(()) => next.run(request).await,
        Err(e) => e.into_response(),
    }
}

/// Reject requests whose merchant tier is below `min_tier`.
///
/// Runs after the key gates; an absent `X-Merchant-Tier` header counts as
/// `Free`.
pub async fn require_tier(min_tier: Tier, request: Request, next: Next) -> Response {
    let merchant = MerchantTier::from_headers(request.headers());
    match merchant.require(min_tier) {
        Ok(()) => next.run(request).await,
        Err(e) => {
            warn!(
                key_id = request
                    .extensions()
                    .get::<ApiKeyContext>()
                    .map(|context| context.id.as_str())
                    .unwrap_or("-"),
                current_tier = %merchant.0,
                required_tier = %min_tier,
                "Upgrade required"
            );
            e.into_response()
        }
    }
}
