// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 SwipesBlue

//! API key provisioning for internal operators.
//!
//! Tokens and secrets are returned exactly once, by `POST /v1/api-keys`.
//! Listings and deactivation responses carry metadata only.

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{error, info};
use utoipa::ToSchema;

use crate::auth::{ApiKey, ApiKeyAuth};
use crate::error::ApiError;
use crate::state::AppState;
use crate::storage::{ApiKeyStore, StoreError};

/// Key metadata without credentials.
#[derive(Debug, Serialize, ToSchema)]
pub struct ApiKeySummary {
    pub id: String,
    pub platform: String,
    pub name: String,
    pub permissions: Vec<String>,
    pub is_active: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_used_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<&ApiKey> for ApiKeySummary {
    fn from(key: &ApiKey) -> Self {
        Self {
            id: key.id.clone(),
            platform: key.platform.clone(),
            name: key.name.clone(),
            permissions: key.permissions.iter().cloned().collect(),
            is_active: key.is_active,
            last_used_at: key.last_used_at,
            created_at: key.created_at,
            updated_at: key.updated_at,
        }
    }
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct ProvisionApiKeyRequest {
    pub platform: String,
    pub name: String,
    #[serde(default)]
    pub permissions: Vec<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ProvisionedApiKey {
    #[serde(flatten)]
    pub key: ApiKeySummary,
    /// Bearer token. Shown once.
    pub api_key: String,
    /// HMAC secret. Shown once.
    pub api_secret: Option<String>,
}

/// Run a store call on the blocking pool.
async fn with_store<T, F>(state: &AppState, f: F) -> Result<T, ApiError>
where
    T: Send + 'static,
    F: FnOnce(&dyn ApiKeyStore) -> Result<T, StoreError> + Send + 'static,
{
    let store: Arc<dyn ApiKeyStore> = state.api_keys.clone();
    match tokio::task::spawn_blocking(move || f(&*store)).await {
        Ok(result) => result.map_err(ApiError::from),
        Err(e) => {
            error!(error = %e, "API key store task failed");
            Err(ApiError::internal("Internal server error"))
        }
    }
}

/// List all API keys
#[utoipa::path(
    get,
    path = "/v1/api-keys",
    tag = "API Keys",
    responses(
        (status = 200, description = "All keys, oldest first", body = Vec<ApiKeySummary>),
        (status = 401, description = "Missing or invalid API key"),
        (status = 403, description = "Not an internal key with manage_api_keys")
    ),
    security(("api_key" = []))
)]
pub async fn list_api_keys(
    State(state): State<AppState>,
    ApiKeyAuth(_caller): ApiKeyAuth,
) -> Result<Json<Vec<ApiKeySummary>>, ApiError> {
    let keys = with_store(&state, |store| store.list()).await?;
    Ok(Json(keys.iter().map(ApiKeySummary::from).collect()))
}

/// Provision a new API key
#[utoipa::path(
    post,
    path = "/v1/api-keys",
    tag = "API Keys",
    request_body = ProvisionApiKeyRequest,
    responses(
        (status = 201, description = "Key provisioned", body = ProvisionedApiKey),
        (status = 400, description = "Missing platform or name"),
        (status = 401, description = "Missing or invalid API key"),
        (status = 403, description = "Not an internal key with manage_api_keys")
    ),
    security(("api_key" = []))
)]
pub async fn provision_api_key(
    State(state): State<AppState>,
    ApiKeyAuth(caller): ApiKeyAuth,
    Json(req): Json<ProvisionApiKeyRequest>,
) -> Result<(StatusCode, Json<ProvisionedApiKey>), ApiError> {
    let platform = req.platform.trim();
    let name = req.name.trim();
    if platform.is_empty() {
        return Err(ApiError::bad_request("platform is required"));
    }
    if name.is_empty() {
        return Err(ApiError::bad_request("name is required"));
    }

    let key = ApiKey::provision(platform, name, req.permissions)?;
    let stored = key.clone();
    with_store(&state, move |store| store.insert(stored)).await?;

    info!(
        key_id = %key.id,
        platform = %key.platform,
        provisioned_by = %caller.id,
        "API key provisioned"
    );

    Ok((
        StatusCode::CREATED,
        Json(ProvisionedApiKey {
            key: ApiKeySummary::from(&key),
            api_key: key.api_key,
            api_secret: key.api_secret,
        }),
    ))
}

/// Deactivate an API key
///
/// Keys are never deleted; a deactivated key is rejected with 403.
#[utoipa::path(
    post,
    path = "/v1/api-keys/{key_id}/deactivate",
    tag = "API Keys",
    params(("key_id" = String, Path, description = "Key id")),
    responses(
        (status = 200, description = "Key deactivated", body = ApiKeySummary),
        (status = 404, description = "Key not found")
    ),
    security(("api_key" = []))
)]
pub async fn deactivate_api_key(
    State(state): State<AppState>,
    ApiKeyAuth(caller): ApiKeyAuth,
    Path(key_id): Path<String>,
) -> Result<Json<ApiKeySummary>, ApiError> {
    let key = with_store(&state, move |store| store.set_active(&key_id, false)).await?;

    info!(
        key_id = %key.id,
        platform = %key.platform,
        deactivated_by = %caller.id,
        "API key deactivated"
    );
    Ok(Json(ApiKeySummary::from(&key)))
}
