// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 SwipesBlue

//! In-memory API key store.

use std::collections::HashMap;
use std::sync::RwLock;

use chrono::{DateTime, Utc};

use super::{ApiKeyStore, StoreError, StoreResult};
use crate::auth::ApiKey;

#[derive(Default)]
struct Inner {
    keys: HashMap<String, ApiKey>,
    /// token → id
    by_token: HashMap<String, String>,
}

#[derive(Default)]
pub struct InMemoryApiKeyStore {
    inner: RwLock<Inner>,
}

impl InMemoryApiKeyStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a store pre-populated with `keys`.
    pub fn with_keys(keys: impl IntoIterator<Item = ApiKey>) -> StoreResult<Self> {
        let store = Self::new();
        for key in keys {
            store.insert(key)?;
        }
        Ok(store)
    }
}

impl ApiKeyStore for InMemoryApiKeyStore {
    fn find_by_key(&self, api_key: &str) -> StoreResult<Option<ApiKey>> {
        let inner = self.inner.read().map_err(|_| StoreError::Poisoned)?;
        Ok(inner
            .by_token
            .get(api_key)
            .and_then(|id| inner.keys.get(id))
            .cloned())
    }

    fn get(&self, id: &str) -> StoreResult<Option<ApiKey>> {
        let inner = self.inner.read().map_err(|_| StoreError::Poisoned)?;
        Ok(inner.keys.get(id).cloned())
    }

    fn list(&self) -> StoreResult<Vec<ApiKey>> {
        let inner = self.inner.read().map_err(|_| StoreError::Poisoned)?;
        let mut keys: Vec<ApiKey> = inner.keys.values().cloned().collect();
        keys.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        Ok(keys)
    }

    fn insert(&self, key: ApiKey) -> StoreResult<()> {
        let mut inner = self.inner.write().map_err(|_| StoreError::Poisoned)?;
        if inner.keys.contains_key(&key.id) {
            return Err(StoreError::AlreadyExists(format!("API key {}", key.id)));
        }
        if inner.by_token.contains_key(&key.api_key) {
            return Err(StoreError::AlreadyExists(format!(
                "API key token {}",
                key.redacted()
            )));
        }
        inner.by_token.insert(key.api_key.clone(), key.id.clone());
        inner.keys.insert(key.id.clone(), key);
        Ok(())
    }

    fn touch_last_used(&self, id: &str, at: DateTime<Utc>) -> StoreResult<()> {
        let mut inner = self.inner.write().map_err(|_| StoreError::Poisoned)?;
        let key = inner
            .keys
            .get_mut(id)
            .ok_or_else(|| StoreError::NotFound(format!("API key {id}")))?;
        key.last_used_at = Some(at);
        Ok(())
    }

    fn set_active(&self, id: &str, active: bool) -> StoreResult<ApiKey> {
        let mut inner = self.inner.write().map_err(|_| StoreError::Poisoned)?;
        let key = inner
            .keys
            .get_mut(id)
            .ok_or_else(|| StoreError::NotFound(format!("API key {id}")))?;
        key.is_active = active;
        key.updated_at = Utc::now();
        Ok(key.clone())
    }
}
