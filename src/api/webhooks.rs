// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 SwipesBlue

//! Outbound webhook endpoint management.
//!
//! Callers only see and manage endpoints of their own platform; `internal`
//! keys see every platform. Acting on another platform's endpoint is
//! forbidden.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use utoipa::ToSchema;

use crate::auth::{ApiKeyAuth, ApiKeyContext};
use crate::error::ApiError;
use crate::state::AppState;
use crate::webhooks::{RegisteredEndpoint, TestDeliveryResult, WebhookEndpoint, WebhookError};

#[derive(Debug, Deserialize, ToSchema)]
pub struct RegisterWebhookRequest {
    /// Platform the endpoint belongs to. Defaults to the caller's platform.
    #[serde(default)]
    pub platform: Option<String>,
    pub url: String,
    /// Event names such as `payment.success`.
    pub events: Vec<String>,
}

/// Look up an endpoint the caller may manage: 404 if unknown, 403 if it
/// belongs to another platform.
async fn owned_endpoint(
    state: &AppState,
    caller: &ApiKeyContext,
    endpoint_id: &str,
) -> Result<WebhookEndpoint, ApiError> {
    let endpoint = state
        .webhooks
        .repository()
        .endpoint(endpoint_id)
        .await
        .ok_or(WebhookError::EndpointNotFound)?;
    caller.require_platform(&endpoint.platform)?;
    Ok(endpoint)
}

/// List webhook endpoints visible to the caller
#[utoipa::path(
    get,
    path = "/v1/webhooks",
    tag = "Webhooks",
    responses(
        (status = 200, description = "Registered endpoints", body = Vec<WebhookEndpoint>),
        (status = 401, description = "Missing or invalid API key"),
        (status = 403, description = "Missing manage_webhooks permission")
    ),
    security(("api_key" = []))
)]
pub async fn list_webhooks(
    State(state): State<AppState>,
    ApiKeyAuth(caller): ApiKeyAuth,
) -> Json<Vec<WebhookEndpoint>> {
    let repository = state.webhooks.repository();
    let endpoints = if caller.is_internal() {
        repository.list_endpoints().await
    } else {
        repository.endpoints_for_platform(&caller.platform).await
    };
    Json(endpoints)
}

/// Register a webhook endpoint
///
/// The signing secret is returned once and cannot be retrieved later.
#[utoipa::path(
    post,
    path = "/v1/webhooks",
    tag = "Webhooks",
    request_body = RegisterWebhookRequest,
    responses(
        (status = 201, description = "Endpoint registered", body = RegisteredEndpoint),
        (status = 400, description = "Invalid URL or event types"),
        (status = 401, description = "Missing or invalid API key"),
        (status = 403, description = "Missing permission or platform not allowed")
    ),
    security(("api_key" = []))
)]
pub async fn register_webhook(
    State(state): State<AppState>,
    ApiKeyAuth(caller): ApiKeyAuth,
    Json(req): Json<RegisterWebhookRequest>,
) -> Result<(StatusCode, Json<RegisteredEndpoint>), ApiError> {
    let platform = req.platform.unwrap_or_else(|| caller.platform.clone());
    caller.require_platform(&platform)?;

    let registered = state
        .webhooks
        .register(&platform, &req.url, &req.events)
        .await?;
    Ok((StatusCode::CREATED, Json(registered)))
}

/// Send a test event to a webhook endpoint
#[utoipa::path(
    post,
    path = "/v1/webhooks/{endpoint_id}/test",
    tag = "Webhooks",
    params(("endpoint_id" = String, Path, description = "Endpoint id")),
    responses(
        (status = 200, description = "Test attempted; see `success`", body = TestDeliveryResult),
        (status = 403, description = "Endpoint belongs to another platform"),
        (status = 404, description = "Endpoint not found")
    ),
    security(("api_key" = []))
)]
pub async fn test_webhook(
    State(state): State<AppState>,
    ApiKeyAuth(caller): ApiKeyAuth,
    Path(endpoint_id): Path<String>,
) -> Result<Json<TestDeliveryResult>, ApiError> {
    let endpoint = owned_endpoint(&state, &caller, &endpoint_id).await?;
    let result = state.webhooks.test_endpoint(&endpoint.id).await?;
    Ok(Json(result))
}

/// Stop deliveries to a webhook endpoint
///
/// Pending retries for the endpoint fail on their next attempt.
#[utoipa::path(
    post,
    path = "/v1/webhooks/{endpoint_id}/deactivate",
    tag = "Webhooks",
    params(("endpoint_id" = String, Path, description = "Endpoint id")),
    responses(
        (status = 200, description = "Endpoint deactivated", body = WebhookEndpoint),
        (status = 403, description = "Endpoint belongs to another platform"),
        (status = 404, description = "Endpoint not found")
    ),
    security(("api_key" = []))
)]
pub async fn deactivate_webhook(
    State(state): State<AppState>,
    ApiKeyAuth(caller): ApiKeyAuth,
    Path(endpoint_id): Path<String>,
) -> Result<Json<WebhookEndpoint>, ApiError> {
    let endpoint = owned_endpoint(&state, &caller, &endpoint_id).await?;
    let updated = state
        .webhooks
        .repository()
        .set_endpoint_active(&endpoint.id, false)
        .await
        .ok_or(WebhookError::EndpointNotFound)?;

    tracing::info!(
        endpoint_id = %updated.id,
        platform = %updated.platform,
        "Webhook endpoint deactivated"
    );
    Ok(Json(updated))
}
