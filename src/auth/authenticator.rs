// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 SwipesBlue

//! API key validation against the credential store.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tracing::{debug, warn};

use super::api_key::{redact, ApiKeyContext};
use super::AuthError;
use crate::storage::ApiKeyStore;

/// Default bound on a single credential lookup.
pub const DEFAULT_LOOKUP_TIMEOUT: Duration = Duration::from_secs(5);

/// Validates candidate credentials and records key usage.
#[derive(Clone)]
pub struct ApiKeyAuthenticator {
    store: Arc<dyn ApiKeyStore>,
    lookup_timeout: Duration,
}

impl ApiKeyAuthenticator {
    pub fn new(store: Arc<dyn ApiKeyStore>) -> Self {
        Self {
            store,
            lookup_timeout: DEFAULT_LOOKUP_TIMEOUT,
        }
    }

    pub fn with_lookup_timeout(mut self, timeout: Duration) -> Self {
        self.lookup_timeout = timeout;
        self
    }

    pub fn store(&self) -> &Arc<dyn ApiKeyStore> {
        &self.store
    }

    /// Validate an extracted credential.
    ///
    /// - no credential → `MissingApiKey` (401)
    /// - unknown credential → `InvalidApiKey` (401)
    /// - inactive key → `ApiKeyDeactivated` (403)
    /// - store failure or timeout → `Internal` (500); validity is unknown,
    ///   not disproved
    ///
    /// On success the key's `last_used_at` is updated in a detached task.
    pub async fn authenticate(&self, credential: Option<String>) -> Result<ApiKeyContext, AuthError> {
        let candidate = credential.ok_or(AuthError::MissingApiKey)?;
        let redacted = redact(&candidate);

        let store = Arc::clone(&self.store);
        let lookup = tokio::task::spawn_blocking(move || store.find_by_key(&candidate));

        let key = match tokio::time::timeout(self.lookup_timeout, lookup).await {
            Err(_) => {
                return Err(AuthError::Internal(format!(
                    "credential lookup timed out after {:?}",
                    self.lookup_timeout
                )))
            }
            Ok(Err(join_error)) => {
                return Err(AuthError::Internal(format!(
                    "credential lookup task failed: {join_error}"
                )))
            }
            Ok(Ok(Err(store_error))) => {
                return Err(AuthError::Internal(format!(
                    "credential lookup failed: {store_error}"
                )))
            }
            Ok(Ok(Ok(None))) => {
                warn!(key = %redacted, reason = "not_found", "API key rejected");
                return Err(AuthError::InvalidApiKey);
            }
            Ok(Ok(Ok(Some(key)))) => key,
        };

        if !key.is_active {
            warn!(
                key_id = %key.id,
                platform = %key.platform,
                reason = "deactivated",
                "API key rejected"
            );
            return Err(AuthError::ApiKeyDeactivated);
        }

        self.record_last_used(key.id.clone());

        debug!(key_id = %key.id, platform = %key.platform, "API key authenticated");
        Ok(ApiKeyContext::from(&key))
    }

    /// Fire-and-forget `last_used_at` update. Failures are logged only.
    fn record_last_used(&self, key_id: String) {
        let store = Arc::clone(&self.store);
        tokio::spawn(async move {
            let id = key_id.clone();
            let result =
                tokio::task::spawn_blocking(move || store.touch_last_used(&id, Utc::now())).await;
            match result {
                Ok(Ok(())) => {}
                Ok(Err(e)) => {
                    warn!(key_id = %key_id, error = %e, "Failed to update API key last used")
                }
                Err(e) => {
                    warn!(key_id = %key_id, error = %e, "API key last-used task failed")
                }
            }
        });
    }
}
