// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 SwipesBlue

//! Tier-based access decisions for a merchant.
//!
//! Partner platforms forward the merchant's plan in the `X-Merchant-Tier`
//! header. A missing or unrecognized value counts as `Free`.

use std::convert::Infallible;

use axum::{
    extract::FromRequestParts,
    http::{request::Parts, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use utoipa::ToSchema;

use super::tier::{normalize_tier, Tier};

/// Header carrying the merchant's subscription tier.
pub const MERCHANT_TIER_HEADER: &str = "x-merchant-tier";

/// Canonical tier of the merchant a request acts for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MerchantTier(pub Tier);

impl MerchantTier {
    pub fn from_headers(headers: &HeaderMap) -> Self {
        let raw = headers
            .get(MERCHANT_TIER_HEADER)
            .and_then(|value| value.to_str().ok())
            .unwrap_or_default();
        MerchantTier(normalize_tier(raw))
    }

    /// Reject with [`TierError::UpgradeRequired`] unless the merchant is at
    /// `required` or above.
    pub fn require(&self, required: Tier) -> Result<(), TierError> {
        if self.0.satisfies(required) {
            Ok(())
        } else {
            Err(TierError::UpgradeRequired {
                required,
                current: self.0,
            })
        }
    }

    /// Reject with [`TierError::ProductLimitReached`] if one more product
    /// would not fit on top of `current_count`.
    pub fn ensure_product_capacity(&self, current_count: u32) -> Result<(), TierError> {
        let limit = self.0.product_limit();
        if limit.allows(current_count.saturating_add(1)) {
            return Ok(());
        }
        Err(TierError::ProductLimitReached {
            tier: self.0,
            limit: limit.as_option().unwrap_or(u32::MAX),
            current_count,
        })
    }
}

impl<S: Send + Sync> FromRequestParts<S> for MerchantTier {
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(MerchantTier::from_headers(&parts.headers))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TierError {
    #[error("This feature requires {required} tier or higher")]
    UpgradeRequired { required: Tier, current: Tier },

    #[error("Your {tier} plan allows up to {limit} products. Upgrade to add more.")]
    ProductLimitReached {
        tier: Tier,
        limit: u32,
        current_count: u32,
    },

    #[error("Unknown feature: {0}")]
    UnknownFeature(String),
}

/// Body of a tier rejection.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TierErrorBody {
    pub error: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub required_tier: Option<Tier>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_tier: Option<Tier>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_count: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<u32>,
}

impl TierError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            TierError::UpgradeRequired { .. } | TierError::ProductLimitReached { .. } => {
                StatusCode::FORBIDDEN
            }
            TierError::UnknownFeature(_) => StatusCode::NOT_FOUND,
        }
    }

    pub fn body(&self) -> TierErrorBody {
        let mut body = TierErrorBody {
            error: String::new(),
            message: self.to_string(),
            required_tier: None,
            current_tier: None,
            current_count: None,
            limit: None,
        };
        match self {
            TierError::UpgradeRequired { required, current } => {
                body.error = "Upgrade Required".into();
                body.required_tier = Some(*required);
                body.current_tier = Some(*current);
            }
            TierError::ProductLimitReached {
                limit,
                current_count,
                ..
            } => {
                body.error = "Product limit reached".into();
                body.current_count = Some(*current_count);
                body.limit = Some(*limit);
            }
            TierError::UnknownFeature(_) => body.error = "Not Found".into(),
        }
        body
    }
}

impl IntoResponse for TierError {
    fn into_response(self) -> Response {
        (self.status_code(), Json(self.body())).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn headers(tier: Option<&str>) -> HeaderMap {
        let mut headers = HeaderMap::new();
        if let Some(tier) = tier {
            headers.insert(MERCHANT_TIER_HEADER, HeaderValue::from_str(tier).unwrap());
        }
        headers
    }

    #[test]
    fn header_is_normalized_and_defaults_to_free() {
        assert_eq!(MerchantTier::from_headers(&headers(Some("PRO"))).0, Tier::Scale);
        assert_eq!(MerchantTier::from_headers(&headers(Some("gold"))).0, Tier::Free);
        assert_eq!(MerchantTier::from_headers(&headers(None)).0, Tier::Free);
    }

    #[test]
    fn upgrade_required_below_minimum() {
        assert!(MerchantTier(Tier::Scale).require(Tier::Growth).is_ok());
        assert!(MerchantTier(Tier::Growth).require(Tier::Growth).is_ok());

        let err = MerchantTier(Tier::Free).require(Tier::Growth).unwrap_err();
        assert_eq!(err.status_code(), StatusCode::FORBIDDEN);
        let body = serde_json::to_value(err.body()).unwrap();
        assert_eq!(
            body,
            serde_json::json!({
                "error": "Upgrade Required",
                "message": "This feature requires Growth tier or higher",
                "requiredTier": "Growth",
                "currentTier": "Free"
            })
        );
    }

    #[test]
    fn product_capacity_follows_plan_ceiling() {
        assert!(MerchantTier(Tier::Free).ensure_product_capacity(24).is_ok());
        assert!(MerchantTier(Tier::Scale).ensure_product_capacity(100_000).is_ok());

        let err = MerchantTier(Tier::Free)
            .ensure_product_capacity(25)
            .unwrap_err();
        let body = serde_json::to_value(err.body()).unwrap();
        assert_eq!(body["error"], "Product limit reached");
        assert_eq!(
            body["message"],
            "Your Free plan allows up to 25 products. Upgrade to add more."
        );
        assert_eq!(body["currentCount"], 25);
        assert_eq!(body["limit"], 25);
    }
}
