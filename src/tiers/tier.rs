// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 SwipesBlue

//! Canonical subscription tiers.
//!
//! Tier strings reach the service from old database rows, partner platforms
//! and hand-typed admin input. Every one of them resolves to exactly one
//! [`Tier`]; anything unrecognized resolves to [`Tier::Free`].

use std::convert::Infallible;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Merchant subscription tier.
///
/// ## Hierarchy
///
/// `Free < Growth < Scale < Enterprise`. The derived `Ord` follows the
/// declaration order, which matches [`tier_rank`].
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, ToSchema,
)]
#[serde(from = "String", into = "&'static str")]
pub enum Tier {
    Free,
    Growth,
    Scale,
    Enterprise,
}

/// Legacy and case-varied spellings mapped to canonical tiers.
///
/// "Starter" and "Pro" are the legacy product names still present in old rows.
const TIER_ALIASES: &[(&str, Tier)] = &[
    ("FREE", Tier::Free),
    ("Free", Tier::Free),
    ("free", Tier::Free),
    ("Starter", Tier::Growth),
    ("starter", Tier::Growth),
    ("STARTER", Tier::Growth),
    ("Growth", Tier::Growth),
    ("growth", Tier::Growth),
    ("GROWTH", Tier::Growth),
    ("Pro", Tier::Scale),
    ("pro", Tier::Scale),
    ("PRO", Tier::Scale),
    ("Scale", Tier::Scale),
    ("scale", Tier::Scale),
    ("SCALE", Tier::Scale),
    ("Enterprise", Tier::Enterprise),
    ("enterprise", Tier::Enterprise),
    ("ENTERPRISE", Tier::Enterprise),
];

impl Tier {
    /// All tiers in ascending rank order.
    pub const ALL: [Tier; 4] = [Tier::Free, Tier::Growth, Tier::Scale, Tier::Enterprise];

    /// Canonical display name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Tier::Free => "Free",
            Tier::Growth => "Growth",
            Tier::Scale => "Scale",
            Tier::Enterprise => "Enterprise",
        }
    }

    pub fn rank(&self) -> u8 {
        tier_rank(*self)
    }

    pub fn product_limit(&self) -> ProductLimit {
        product_limit(*self)
    }

    /// Whether this tier meets or exceeds `required`.
    pub fn satisfies(&self, required: Tier) -> bool {
        self.rank() >= required.rank()
    }
}

impl std::fmt::Display for Tier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Tier {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(normalize_tier(s))
    }
}

impl From<&str> for Tier {
    fn from(value: &str) -> Self {
        normalize_tier(value)
    }
}

impl From<String> for Tier {
    fn from(value: String) -> Self {
        normalize_tier(&value)
    }
}

impl From<Tier> for &'static str {
    fn from(value: Tier) -> Self {
        value.as_str()
    }
}

/// Upper bound on catalog size for a tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProductLimit {
    Capped(u32),
    Unlimited,
}

impl ProductLimit {
    /// Whether a catalog of `count` products fits under this ceiling.
    pub fn allows(&self, count: u32) -> bool {
        match self {
            ProductLimit::Capped(max) => count <= *max,
            ProductLimit::Unlimited => true,
        }
    }

    /// The ceiling as an optional number, `None` meaning unlimited.
    pub fn as_option(&self) -> Option<u32> {
        match self {
            ProductLimit::Capped(max) => Some(*max),
            ProductLimit::Unlimited => None,
        }
    }
}

/// Resolve any tier-like string to its canonical tier.
///
/// Lookup is case-sensitive against the alias table; unknown input falls
/// back to [`Tier::Free`].
pub fn normalize_tier(input: &str) -> Tier {
    TIER_ALIASES
        .iter()
        .find(|(alias, _)| *alias == input)
        .map(|(_, tier)| *tier)
        .unwrap_or(Tier::Free)
}

/// Returns true if `current` meets or exceeds `required` after normalization.
pub fn meets_min_tier(current: &str, required: &str) -> bool {
    normalize_tier(current).satisfies(normalize_tier(required))
}

pub fn tier_rank(tier: Tier) -> u8 {
    match tier {
        Tier::Free => 0,
        Tier::Growth => 1,
        Tier::Scale => 2,
        Tier::Enterprise => 3,
    }
}

pub fn product_limit(tier: Tier) -> ProductLimit {
    match tier {
        Tier::Free => ProductLimit::Capped(25),
        Tier::Growth => ProductLimit::Capped(500),
        Tier::Scale | Tier::Enterprise => ProductLimit::Unlimited,
    }
}
