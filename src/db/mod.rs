pub mod repository;
pub mod row;
pub mod snapshot;
pub mod sqlite;
pub mod store;

#[cfg(test)]
pub(crate) mod test_support;

pub use repository::*;
pub use row::Row;
pub use store::{SavePolicy, Store, StoreOptions};

use thiserror::Error;

use crate::storage::StorageError;
use snapshot::SnapshotError;

#[derive(Error, Debug)]
pub enum DatabaseError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// Engine could not be started or the saved snapshot is unusable.
    #[error("Database initialization failed: {0}")]
    Initialization(String),

    /// Malformed SQL or constraint violation.
    #[error("Query failed: {0}")]
    Query(#[source] rusqlite::Error),

    #[error("Database not initialized")]
    NotInitialized,

    #[error("Snapshot error: {0}")]
    Snapshot(#[from] SnapshotError),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Entity not found: {entity_type} with id {id}")]
    NotFound { entity_type: String, id: String },

    #[error("Invalid enum value for {field}: {value}")]
    InvalidEnum { field: String, value: String },

    #[error("Serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

impl DatabaseError {
    pub(crate) fn not_found(entity_type: &str, id: i64) -> Self {
        Self::NotFound {
            entity_type: entity_type.into(),
            id: id.to_string(),
        }
    }
}
