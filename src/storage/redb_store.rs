// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 SwipesBlue

//! API key store backed by redb (pure Rust, ACID).
//!
//! ## Table Layout
//!
//! - `api_keys`: id → serialized ApiKey (JSON bytes)
//! - `api_key_index`: token → id

use std::path::Path;

use chrono::{DateTime, Utc};
use redb::{Database, ReadableDatabase, ReadableTable, TableDefinition};

use super::{ApiKeyStore, StoreError, StoreResult};
use crate::auth::ApiKey;

// =============================================================================
// Table Definitions
// =============================================================================

/// Primary table: id → serialized ApiKey (JSON bytes).
const API_KEYS: TableDefinition<&str, &[u8]> = TableDefinition::new("api_keys");

/// Index: secret token → id.
const API_KEY_INDEX: TableDefinition<&str, &str> = TableDefinition::new("api_key_index");

pub struct RedbApiKeyStore {
    db: Database,
}

impl RedbApiKeyStore {
    /// Open (or create) the database at the given path.
    pub fn open(path: &Path) -> StoreResult<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).ok();
        }
        let db = Database::create(path)?;

        // Pre-create tables so later read transactions don't fail
        let write_txn = db.begin_write()?;
        {
            let _ = write_txn.open_table(API_KEYS)?;
            let _ = write_txn.open_table(API_KEY_INDEX)?;
        }
        write_txn.commit()?;

        Ok(Self { db })
    }

    /// Read-modify-write a single key inside one write transaction.
    fn update<F>(&self, id: &str, mutate: F) -> StoreResult<ApiKey>
    where
        F: FnOnce(&mut ApiKey),
    {
        let write_txn = self.db.begin_write()?;
        let updated = {
            let mut table = write_txn.open_table(API_KEYS)?;

            let existing_bytes = {
                let existing = table
                    .get(id)?
                    .ok_or_else(|| StoreError::NotFound(format!("API key {id}")))?;
                existing.value().to_vec()
            };

            let mut key: ApiKey = serde_json::from_slice(&existing_bytes)?;
            mutate(&mut key);

            let json = serde_json::to_vec(&key)?;
            table.insert(id, json.as_slice())?;
            key
        };
        write_txn.commit()?;
        Ok(updated)
    }
}

impl ApiKeyStore for RedbApiKeyStore {
    fn find_by_key(&self, api_key: &str) -> StoreResult<Option<ApiKey>> {
        let read_txn = self.db.begin_read()?;
        let index = read_txn.open_table(API_KEY_INDEX)?;
        let id = match index.get(api_key)? {
            Some(id) => id.value().to_string(),
            None => return Ok(None),
        };

        let table = read_txn.open_table(API_KEYS)?;
        match table.get(id.as_str())? {
            Some(value) => Ok(Some(serde_json::from_slice(value.value())?)),
            None => Ok(None),
        }
    }

    fn get(&self, id: &str) -> StoreResult<Option<ApiKey>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(API_KEYS)?;
        match table.get(id)? {
            Some(value) => Ok(Some(serde_json::from_slice(value.value())?)),
            None => Ok(None),
        }
    }

    fn list(&self) -> StoreResult<Vec<ApiKey>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(API_KEYS)?;

        let mut keys = Vec::new();
        for entry in table.iter()? {
            let (_, value) = entry?;
            keys.push(serde_json::from_slice::<ApiKey>(value.value())?);
        }
        keys.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        Ok(keys)
    }

    fn insert(&self, key: ApiKey) -> StoreResult<()> {
        let json = serde_json::to_vec(&key)?;

        let write_txn = self.db.begin_write()?;
        {
            let mut table = write_txn.open_table(API_KEYS)?;
            let mut index = write_txn.open_table(API_KEY_INDEX)?;

            if table.get(key.id.as_str())?.is_some() {
                return Err(StoreError::AlreadyExists(format!("API key {}", key.id)));
            }
            if index.get(key.api_key.as_str())?.is_some() {
                return Err(StoreError::AlreadyExists(format!(
                    "API key token {}",
                    key.redacted()
                )));
            }

            table.insert(key.id.as_str(), json.as_slice())?;
            index.insert(key.api_key.as_str(), key.id.as_str())?;
        }
        write_txn.commit()?;
        Ok(())
    }

    fn touch_last_used(&self, id: &str, at: DateTime<Utc>) -> StoreResult<()> {
        self.update(id, |key| key.last_used_at = Some(at))
            .map(|_| ())
    }

    fn set_active(&self, id: &str, active: bool) -> StoreResult<ApiKey> {
        self.update(id, |key| {
            key.is_active = active;
            key.updated_at = Utc::now();
        })
    }
}
