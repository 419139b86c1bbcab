//! Story Bible Storage Layer
//!
//! Persists Story Bible collections in a key-value store, one JSON document
//! per key.
//!
//! # Architecture
//!
//! - [`KeyValueStorage`](storybible_domain::traits::KeyValueStorage) backends:
//!   [`MemoryStorage`] (with an optional byte quota) and [`SqliteStorage`]
//! - [`BibleStore`]: in-memory collections kept in step with storage. Every
//!   mutation rewrites the whole affected collection before it returns, and
//!   the in-memory copy only advances once that write has succeeded.
//! - Project export/import and timestamped backups in [`export`]
//!
//! # Examples
//!
//! ```
//! use storybible_domain::EntityKind;
//! use storybible_store::{BibleStore, MemoryStorage};
//! use serde_json::json;
//!
//! let mut bible = BibleStore::open(MemoryStorage::new()).unwrap();
//! let alice = bible
//!     .add(EntityKind::Character, json!({"name": "Alice"}).as_object().unwrap())
//!     .unwrap();
//! assert_eq!(bible.list(EntityKind::Character).len(), 1);
//! assert_eq!(bible.get(EntityKind::Character, &alice.id).unwrap().label, "Alice");
//! ```

#![warn(missing_docs)]

pub mod bible;
pub mod export;
pub mod memory;
pub mod search;
pub mod sqlite;

use storybible_domain::{EntityError, EntityId, EntityKind, ValidationError};
use thiserror::Error;

pub use bible::{BibleStore, LoadSummary, UNREADABLE_SUFFIX};
pub use export::{
    BackupInfo, ExportMetadata, ImportSummary, ProjectExport, StorageMetadata, EXPORT_VERSION,
};
pub use memory::MemoryStorage;
pub use search::{DateRange, SearchQuery};
pub use sqlite::SqliteStorage;

/// Errors that can occur during storage operations
#[derive(Error, Debug)]
pub enum StoreError {
    /// Record failed validation; nothing was written
    #[error("Validation failed: {0}")]
    Validation(#[from] ValidationError),

    /// Database error
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// Write would exceed the storage quota
    #[error("Storage quota exceeded: {needed} bytes needed, {quota} allowed")]
    QuotaExceeded {
        /// Bytes the store would hold after the write
        needed: usize,
        /// Configured limit
        quota: usize,
    },

    /// JSON (de)serialization failed
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// An entity with this id already exists
    #[error("Duplicate entity id: {0}")]
    DuplicateId(EntityId),

    /// No entity with this id in the collection
    #[error("{kind} not found: {id}")]
    NotFound {
        /// Collection searched
        kind: EntityKind,
        /// Missing id
        id: EntityId,
    },

    /// No backup stored under this key
    #[error("Backup not found: {0}")]
    BackupNotFound(String),

    /// Import envelope was rejected
    #[error("Invalid import data: {0}")]
    InvalidImport(String),

    /// Invalid data format
    #[error("Invalid data: {0}")]
    InvalidData(String),
}

impl From<EntityError> for StoreError {
    fn from(e: EntityError) -> Self {
        match e {
            EntityError::Validation(v) => StoreError::Validation(v),
            other => StoreError::InvalidData(other.to_string()),
        }
    }
}
