// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 SwipesBlue

//! # Credential Store
//!
//! API keys are looked up by exact token on every authenticated request and
//! updated off the request path (`last_used_at`) or by provisioning
//! (`is_active`).
//!
//! Two backends implement [`ApiKeyStore`]:
//!
//! - [`InMemoryApiKeyStore`] for tests and ephemeral deployments
//! - [`RedbApiKeyStore`], an embedded ACID database selected by
//!   `API_KEY_DB_PATH`
//!
//! The trait is synchronous; async callers go through
//! `tokio::task::spawn_blocking`.

pub mod memory;
pub mod redb_store;

use chrono::{DateTime, Utc};

use crate::auth::ApiKey;

pub use memory::InMemoryApiKeyStore;
pub use redb_store::RedbApiKeyStore;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("already exists: {0}")]
    AlreadyExists(String),

    #[error("store lock poisoned")]
    Poisoned,

    #[error("redb database error: {0}")]
    RedbDatabase(#[from] redb::DatabaseError),

    #[error("redb transaction error: {0}")]
    RedbTransaction(#[from] redb::TransactionError),

    #[error("redb table error: {0}")]
    RedbTable(#[from] redb::TableError),

    #[error("redb storage error: {0}")]
    RedbStorage(#[from] redb::StorageError),

    #[error("redb commit error: {0}")]
    RedbCommit(#[from] redb::CommitError),

    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Backing store for partner API keys.
pub trait ApiKeyStore: Send + Sync + 'static {
    /// Exact-match lookup by secret token.
    fn find_by_key(&self, api_key: &str) -> StoreResult<Option<ApiKey>>;

    fn get(&self, id: &str) -> StoreResult<Option<ApiKey>>;

    /// All keys, oldest first.
    fn list(&self) -> StoreResult<Vec<ApiKey>>;

    /// Insert a new key. Duplicate ids or tokens are rejected.
    fn insert(&self, key: ApiKey) -> StoreResult<()>;

    fn touch_last_used(&self, id: &str, at: DateTime<Utc>) -> StoreResult<()>;

    /// Flip `is_active` and return the updated key.
    fn set_active(&self, id: &str, active: bool) -> StoreResult<ApiKey>;
}
