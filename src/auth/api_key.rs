// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 SwipesBlue

//! API key records and the caller context attached to authenticated requests.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use super::keygen::{generate_api_key, generate_api_secret, API_KEY_PREFIX, API_SECRET_PREFIX};
use super::AuthError;

/// Permission that grants every other permission.
pub const WILDCARD_PERMISSION: &str = "*";

/// Platform value that bypasses all platform restrictions.
pub const INTERNAL_PLATFORM: &str = "internal";

/// Well-known permission names.
pub mod permissions {
    pub const PROCESS_PAYMENTS: &str = "process_payments";
    pub const READ_TRANSACTIONS: &str = "read_transactions";
    pub const READ_ENTITLEMENTS: &str = "read_entitlements";
    pub const MANAGE_WEBHOOKS: &str = "manage_webhooks";
    pub const MANAGE_API_KEYS: &str = "manage_api_keys";
}

/// A stored partner credential.
///
/// Keys are never deleted; deactivation flips `is_active`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiKey {
    pub id: String,
    /// Secret bearer token (`sb_live_...`)
    pub api_key: String,
    /// Optional HMAC secret issued alongside the key (`sb_secret_...`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_secret: Option<String>,
    /// Calling platform ("businessblueprint", "hostsblue", "swipesblue", "internal")
    pub platform: String,
    /// Friendly name
    pub name: String,
    pub permissions: BTreeSet<String>,
    pub is_active: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_used_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ApiKey {
    /// Provision a fresh, active key with a generated token and secret.
    pub fn provision<I, S>(
        platform: impl Into<String>,
        name: impl Into<String>,
        permissions: I,
    ) -> Result<Self, AuthError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let api_key = generate_api_key()?;
        let api_secret = generate_api_secret()?;
        Ok(Self::with_token(api_key, platform, name, permissions).with_secret(api_secret))
    }

    /// Build an active key around an existing token.
    pub fn with_token<I, S>(
        api_key: impl Into<String>,
        platform: impl Into<String>,
        name: impl Into<String>,
        permissions: I,
    ) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4().to_string(),
            api_key: api_key.into(),
            api_secret: None,
            platform: platform.into(),
            name: name.into(),
            permissions: permissions.into_iter().map(Into::into).collect(),
            is_active: true,
            last_used_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn with_secret(mut self, secret: impl Into<String>) -> Self {
        self.api_secret = Some(secret.into());
        self
    }

    pub fn deactivated(mut self) -> Self {
        self.is_active = false;
        self
    }

    /// Token prefix safe to write to logs.
    pub fn redacted(&self) -> String {
        redact(&self.api_key)
    }
}

/// Most characters of the token body ever shown by [`redact`].
const REDACTED_BODY_CHARS: usize = 4;

/// Keep only enough of a token to tell key classes apart in logs.
///
/// Shows the `sb_live_`/`sb_secret_` class prefix plus at most a quarter of
/// the remaining characters, so the output never reveals a whole token.
pub fn redact(token: &str) -> String {
    let prefix = [API_SECRET_PREFIX, API_KEY_PREFIX]
        .into_iter()
        .find(|prefix| token.len() > prefix.len() && token.starts_with(prefix))
        .unwrap_or("");
    let body = &token[prefix.len()..];
    let shown = (body.chars().count() / 4).min(REDACTED_BODY_CHARS);
    let visible: String = body.chars().take(shown).collect();
    format!("{prefix}{visible}…")
}

/// Identity and scope of the caller behind an authenticated request.
///
/// Inserted into request extensions by the API-key middleware and read by
/// the permission and platform gates.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct ApiKeyContext {
    pub id: String,
    pub platform: String,
    pub name: String,
    #[schema(value_type = Vec<String>)]
    pub permissions: BTreeSet<String>,
}

impl ApiKeyContext {
    pub fn has_permission(&self, permission: &str) -> bool {
        self.permissions.contains(WILDCARD_PERMISSION) || self.permissions.contains(permission)
    }

    pub fn require_permission(&self, permission: &str) -> Result<(), AuthError> {
        if self.has_permission(permission) {
            Ok(())
        } else {
            Err(AuthError::MissingPermission(permission.to_string()))
        }
    }

    pub fn is_internal(&self) -> bool {
        self.platform == INTERNAL_PLATFORM
    }

    pub fn can_access_platform(&self, platform: &str) -> bool {
        self.is_internal() || self.platform == platform
    }

    pub fn require_platform(&self, platform: &str) -> Result<(), AuthError> {
        if self.can_access_platform(platform) {
            Ok(())
        } else {
            Err(AuthError::PlatformNotAllowed(platform.to_string()))
        }
    }
}

impl From<&ApiKey> for ApiKeyContext {
    fn from(key: &ApiKey) -> Self {
        Self {
            id: key.id.clone(),
            platform: key.platform.clone(),
            name: key.name.clone(),
            permissions: key.permissions.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn context(platform: &str, permissions: &[&str]) -> ApiKeyContext {
        ApiKeyContext::from(&ApiKey::with_token(
            "sb_live_test",
            platform,
            "test key",
            permissions.iter().copied(),
        ))
    }

    #[test]
    fn exact_permission_is_required() {
        let ctx = context("hostsblue", &["read_transactions"]);
        assert!(ctx.require_permission("read_transactions").is_ok());
        assert_eq!(
            ctx.require_permission("process_payments"),
            Err(AuthError::MissingPermission("process_payments".into()))
        );
    }

    #[test]
    fn wildcard_grants_everything() {
        let ctx = context("hostsblue", &["*"]);
        assert!(ctx.has_permission("process_payments"));
        assert!(ctx.has_permission("anything_at_all"));
    }

    #[test]
    fn platform_scoping() {
        let ctx = context("hostsblue", &[]);
        assert!(ctx.require_platform("hostsblue").is_ok());
        assert_eq!(
            ctx.require_platform("businessblueprint"),
            Err(AuthError::PlatformNotAllowed("businessblueprint".into()))
        );

        let internal = context("internal", &[]);
        assert!(internal.require_platform("businessblueprint").is_ok());
        assert!(internal.require_platform("hostsblue").is_ok());
    }

    #[test]
    fn provisioned_keys_are_active_and_prefixed() {
        let key = ApiKey::provision("swipesblue", "storefront", ["process_payments"]).unwrap();
        assert!(key.is_active);
        assert!(key.api_key.starts_with("sb_live_"));
        assert!(key.api_secret.as_deref().unwrap().starts_with("sb_secret_"));
        assert!(key.last_used_at.is_none());
        assert!(key.permissions.contains("process_payments"));
    }

    #[test]
    fn redaction_keeps_only_prefix() {
        let key = ApiKey::with_token("sb_live_abcdefghijklmnop", "internal", "ops", ["*"]);
        assert_eq!(key.redacted(), "sb_live_abcd…");
        assert!(!key.redacted().contains("mnop"));

        assert_eq!(redact("sb_live_dup"), "sb_live_…");
        assert_eq!(redact("sb_live_"), "sb…");
        assert_eq!(redact("sb_secret_abcdefgh"), "sb_secret_ab…");
        assert_eq!(redact("changeme"), "ch…");
        assert_eq!(redact(""), "…");
        for token in ["x", "sb_live_x", "hunter2", "bootstrap-token"] {
            assert!(!redact(token).contains(token), "{token}");
        }
    }
}
