// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 SwipesBlue

//! # Tier Model
//!
//! Pure, side-effect-free tier logic shared by every gating decision.
//!
//! - [`normalize_tier`] resolves legacy or case-varied names to a canonical
//!   [`Tier`], falling back to `Free` for anything unknown
//! - [`meets_min_tier`] compares two tier strings by rank
//! - [`EntitlementMatrix`] answers per-feature questions for a tier
//! - [`MerchantTier`] applies those answers to the merchant behind a request

pub mod entitlements;
pub mod gate;
pub mod tier;

pub use entitlements::{EntitlementLoadError, EntitlementMatrix, EntitlementRecord, FeatureValue};
pub use gate::{MerchantTier, TierError, TierErrorBody, MERCHANT_TIER_HEADER};
pub use tier::{meets_min_tier, normalize_tier, product_limit, tier_rank, ProductLimit, Tier};
