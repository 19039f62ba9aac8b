// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 SwipesBlue

//! Read-only tier and entitlement lookups for partner platforms.

use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use crate::auth::ApiKeyAuth;
use crate::state::AppState;
use crate::tiers::{
    meets_min_tier, normalize_tier, EntitlementRecord, FeatureValue, MerchantTier, Tier,
    TierError, TierErrorBody,
};

#[derive(Debug, Serialize, ToSchema)]
pub struct TierSummary {
    pub tier: Tier,
    pub rank: u8,
    /// Maximum catalog size, `null` for unlimited.
    pub product_limit: Option<u32>,
}

impl From<Tier> for TierSummary {
    fn from(tier: Tier) -> Self {
        Self {
            tier,
            rank: tier.rank(),
            product_limit: tier.product_limit().as_option(),
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct TierDetail {
    #[serde(flatten)]
    pub summary: TierSummary,
    pub entitlements: Vec<EntitlementRecord>,
}

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct TierCheckQuery {
    /// Merchant's current tier, any spelling.
    #[serde(default)]
    pub current: String,
    /// Minimum tier the feature requires, any spelling.
    #[serde(default)]
    pub required: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct TierCheckResponse {
    pub current: Tier,
    pub required: Tier,
    pub allowed: bool,
}

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct CapacityQuery {
    /// Products already in the merchant's catalog.
    #[serde(default)]
    pub count: u32,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ProductCapacity {
    pub tier: Tier,
    /// Plan ceiling, `null` for unlimited.
    pub limit: Option<u32>,
    pub current_count: u32,
    /// Products that can still be added, `null` for unlimited.
    pub remaining: Option<u32>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct FeatureAccess {
    pub feature: String,
    pub tier: Tier,
    pub value: FeatureValue,
    pub limit: Option<u32>,
    /// Lowest tier the feature is enabled on.
    pub minimum_tier: Tier,
}

/// List all tiers in ascending rank order
#[utoipa::path(
    get,
    path = "/v1/tiers",
    tag = "Tiers",
    responses(
        (status = 200, description = "All tiers", body = Vec<TierSummary>),
        (status = 401, description = "Missing or invalid API key"),
        (status = 403, description = "Missing read_entitlements permission")
    ),
    security(("api_key" = []))
)]
pub async fn list_tiers(ApiKeyAuth(_caller): ApiKeyAuth) -> Json<Vec<TierSummary>> {
    Json(Tier::ALL.into_iter().map(TierSummary::from).collect())
}

/// Check whether a current tier meets a required minimum
#[utoipa::path(
    get,
    path = "/v1/tiers/check",
    tag = "Tiers",
    params(TierCheckQuery),
    responses(
        (status = 200, description = "Comparison result", body = TierCheckResponse),
        (status = 401, description = "Missing or invalid API key"),
        (status = 403, description = "Missing read_entitlements permission")
    ),
    security(("api_key" = []))
)]
pub async fn check_tier(
    ApiKeyAuth(_caller): ApiKeyAuth,
    Query(query): Query<TierCheckQuery>,
) -> Json<TierCheckResponse> {
    Json(TierCheckResponse {
        current: normalize_tier(&query.current),
        required: normalize_tier(&query.required),
        allowed: meets_min_tier(&query.current, &query.required),
    })
}

/// Get a tier's rank, product limit and entitlements
///
/// Legacy names resolve to their canonical tier; unknown names resolve to Free.
#[utoipa::path(
    get,
    path = "/v1/tiers/{tier}",
    tag = "Tiers",
    params(("tier" = String, Path, description = "Tier name, any spelling")),
    responses(
        (status = 200, description = "Tier detail", body = TierDetail),
        (status = 401, description = "Missing or invalid API key"),
        (status = 403, description = "Missing read_entitlements permission")
    ),
    security(("api_key" = []))
)]
pub async fn get_tier(
    State(state): State<AppState>,
    ApiKeyAuth(_caller): ApiKeyAuth,
    Path(tier): Path<String>,
) -> Json<TierDetail> {
    let tier = normalize_tier(&tier);
    Json(TierDetail {
        summary: TierSummary::from(tier),
        entitlements: state
            .entitlements
            .features_for(tier)
            .into_iter()
            .cloned()
            .collect(),
    })
}

/// Check whether the merchant may add another product
///
/// The merchant's tier is read from `X-Merchant-Tier`.
#[utoipa::path(
    get,
    path = "/v1/tiers/capacity",
    tag = "Tiers",
    params(
        CapacityQuery,
        ("X-Merchant-Tier" = Option<String>, Header, description = "Merchant tier, any spelling")
    ),
    responses(
        (status = 200, description = "Room for at least one more product", body = ProductCapacity),
        (status = 403, description = "Product limit reached", body = TierErrorBody)
    ),
    security(("api_key" = []))
)]
pub async fn product_capacity(
    ApiKeyAuth(_caller): ApiKeyAuth,
    merchant: MerchantTier,
    Query(query): Query<CapacityQuery>,
) -> Result<Json<ProductCapacity>, TierError> {
    merchant.ensure_product_capacity(query.count)?;
    let limit = merchant.0.product_limit().as_option();
    Ok(Json(ProductCapacity {
        tier: merchant.0,
        limit,
        current_count: query.count,
        remaining: limit.map(|max| max.saturating_sub(query.count)),
    }))
}

/// Check the merchant's access to a feature
///
/// Answers 403 "Upgrade Required" with the lowest qualifying tier when the
/// feature is off for the merchant's tier.
#[utoipa::path(
    get,
    path = "/v1/features/{feature}",
    tag = "Tiers",
    params(
        ("feature" = String, Path, description = "Feature key, e.g. `recurring_billing`"),
        ("X-Merchant-Tier" = Option<String>, Header, description = "Merchant tier, any spelling")
    ),
    responses(
        (status = 200, description = "Feature available", body = FeatureAccess),
        (status = 403, description = "Upgrade required", body = TierErrorBody),
        (status = 404, description = "Feature is not offered on any tier", body = TierErrorBody)
    ),
    security(("api_key" = []))
)]
pub async fn feature_access(
    State(state): State<AppState>,
    ApiKeyAuth(_caller): ApiKeyAuth,
    merchant: MerchantTier,
    Path(feature): Path<String>,
) -> Result<Json<FeatureAccess>, TierError> {
    let matrix = &state.entitlements;
    let minimum_tier = matrix
        .minimum_tier_for(&feature)
        .ok_or_else(|| TierError::UnknownFeature(feature.clone()))?;

    if !matrix.is_enabled(merchant.0, &feature) {
        return Err(TierError::UpgradeRequired {
            required: minimum_tier,
            current: merchant.0,
        });
    }

    let record = matrix
        .get(merchant.0, &feature)
        .ok_or_else(|| TierError::UnknownFeature(feature.clone()))?;
    Ok(Json(FeatureAccess {
        tier: merchant.0,
        value: record.feature_value.clone(),
        limit: record.limit,
        minimum_tier,
        feature,
    }))
}
