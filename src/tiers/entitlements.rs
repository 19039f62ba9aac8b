// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 SwipesBlue

//! Tier entitlement matrix.
//!
//! Maps `(tier, feature_key)` to a [`FeatureValue`] and an optional numeric
//! limit. The matrix is assembled once at startup through upserts and is
//! read-only afterwards; the standard matrix lives in a process-wide static.

use std::collections::BTreeMap;
use std::io::Read;
use std::sync::LazyLock;

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::tier::Tier;

/// Availability of a feature on a tier.
///
/// Serialized untagged: `true`/`false` or a level string such as `"Basic"`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(untagged)]
pub enum FeatureValue {
    /// Plain on/off switch.
    Enabled(bool),
    /// Qualitative level ("Basic", "Advanced", "Custom", "CSV, PDF", ...).
    Level(String),
}

impl FeatureValue {
    /// A level counts as enabled; only `Enabled(false)` is off.
    pub fn is_enabled(&self) -> bool {
        match self {
            FeatureValue::Enabled(on) => *on,
            FeatureValue::Level(_) => true,
        }
    }

    pub fn level(&self) -> Option<&str> {
        match self {
            FeatureValue::Level(level) => Some(level),
            FeatureValue::Enabled(_) => None,
        }
    }
}

/// One row of the entitlement matrix.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct EntitlementRecord {
    pub tier: Tier,
    pub feature_key: String,
    pub feature_value: FeatureValue,
    /// Numeric ceiling paired with the feature. `None` means unlimited.
    #[serde(default)]
    pub limit: Option<u32>,
}

#[derive(Debug, thiserror::Error)]
pub enum EntitlementLoadError {
    #[error("failed to read entitlement file: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid entitlement JSON: {0}")]
    Json(#[from] serde_json::Error),
}

/// Read-only lookup of entitlements keyed by tier and feature.
#[derive(Debug, Clone, Default)]
pub struct EntitlementMatrix {
    records: BTreeMap<(Tier, String), EntitlementRecord>,
}

impl EntitlementMatrix {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a matrix from records. Later records for the same
    /// `(tier, feature_key)` replace earlier ones.
    pub fn from_records(records: impl IntoIterator<Item = EntitlementRecord>) -> Self {
        let mut matrix = Self::new();
        for record in records {
            matrix.upsert(record);
        }
        matrix
    }

    /// Load a matrix from a JSON array of [`EntitlementRecord`]s.
    pub fn from_json_reader(reader: impl Read) -> Result<Self, EntitlementLoadError> {
        let records: Vec<EntitlementRecord> = serde_json::from_reader(reader)?;
        Ok(Self::from_records(records))
    }

    /// The built-in matrix for all four tiers.
    pub fn standard() -> &'static EntitlementMatrix {
        &STANDARD_MATRIX
    }

    /// Insert or replace the record for `(record.tier, record.feature_key)`.
    ///
    /// Returns the record that was superseded, if any.
    pub fn upsert(&mut self, record: EntitlementRecord) -> Option<EntitlementRecord> {
        self.records
            .insert((record.tier, record.feature_key.clone()), record)
    }

    pub fn get(&self, tier: Tier, feature_key: &str) -> Option<&EntitlementRecord> {
        self.records.get(&(tier, feature_key.to_string()))
    }

    /// Whether `feature_key` is available on `tier`. Unknown features are off.
    pub fn is_enabled(&self, tier: Tier, feature_key: &str) -> bool {
        self.get(tier, feature_key)
            .map(|record| record.feature_value.is_enabled())
            .unwrap_or(false)
    }

    pub fn limit(&self, tier: Tier, feature_key: &str) -> Option<u32> {
        self.get(tier, feature_key).and_then(|record| record.limit)
    }

    /// All records for a tier, ordered by feature key.
    pub fn features_for(&self, tier: Tier) -> Vec<&EntitlementRecord> {
        self.records
            .range((tier, String::new())..)
            .take_while(|((t, _), _)| *t == tier)
            .map(|(_, record)| record)
            .collect()
    }

    /// Lowest tier on which `feature_key` is enabled.
    pub fn minimum_tier_for(&self, feature_key: &str) -> Option<Tier> {
        Tier::ALL
            .into_iter()
            .find(|tier| self.is_enabled(*tier, feature_key))
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

// =============================================================================
// Standard Matrix
// =============================================================================

#[derive(Clone, Copy)]
enum Cell {
    On(Option<u32>),
    Off,
    Level(&'static str),
}

const ON: Cell = Cell::On(None);
const OFF: Cell = Cell::Off;

const fn capped(limit: u32) -> Cell {
    Cell::On(Some(limit))
}

const fn level(name: &'static str) -> Cell {
    Cell::Level(name)
}

/// One feature per row, cells in `Tier::ALL` order.
const STANDARD_FEATURES: &[(&str, [Cell; 4])] = &[
    ("products", [capped(25), capped(500), ON, ON]),
    ("users", [capped(1), capped(3), capped(10), ON]),
    ("online_checkout", [ON, ON, ON, ON]),
    ("virtual_terminal", [OFF, OFF, ON, ON]),
    ("payment_links", [ON, ON, ON, ON]),
    ("invoicing", [level("Basic"), ON, ON, ON]),
    ("recurring_billing", [OFF, ON, ON, ON]),
    ("customer_vault", [OFF, OFF, ON, ON]),
    ("shopping_cart", [ON, ON, ON, ON]),
    ("abandoned_cart", [OFF, level("Basic"), level("Advanced"), level("Advanced")]),
    ("discount_codes", [OFF, ON, ON, ON]),
    ("brand_studio", [OFF, OFF, ON, ON]),
    ("basic_branding", [ON, ON, ON, ON]),
    ("basic_fraud_detection", [ON, ON, ON, ON]),
    ("advanced_fraud_rules", [OFF, OFF, ON, ON]),
    ("dispute_management", [OFF, OFF, ON, ON]),
    ("analytics", [OFF, level("Basic"), level("Advanced"), level("Advanced")]),
    ("reporting", [OFF, level("Basic"), level("Advanced"), level("Custom")]),
    ("data_export", [OFF, level("CSV"), level("CSV, PDF"), level("CSV, PDF, XLSX")]),
    ("api_access", [OFF, OFF, OFF, ON]),
    ("webhooks", [OFF, OFF, OFF, ON]),
    ("sandbox", [OFF, OFF, OFF, ON]),
    ("email_support", [ON, ON, ON, ON]),
    ("priority_support", [OFF, OFF, ON, ON]),
    ("dedicated_am", [OFF, OFF, OFF, ON]),
    ("sla", [OFF, OFF, OFF, ON]),
];

static STANDARD_MATRIX: LazyLock<EntitlementMatrix> = LazyLock::new(|| {
    EntitlementMatrix::from_records(STANDARD_FEATURES.iter().flat_map(|(key, cells)| {
        Tier::ALL.into_iter().zip(cells.iter()).map(move |(tier, cell)| {
            let (feature_value, limit) = match *cell {
                Cell::On(limit) => (FeatureValue::Enabled(true), limit),
                Cell::Off => (FeatureValue::Enabled(false), None),
                Cell::Level(name) => (FeatureValue::Level(name.to_string()), None),
            };
            EntitlementRecord {
                tier,
                feature_key: (*key).to_string(),
                feature_value,
                limit,
            }
        })
    }))
});
