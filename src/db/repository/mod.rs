//! Repository Module
//!
//! Provides CRUD operations for the SurrealDB tables.

pub mod cart;
pub mod order;
pub mod payment;

pub use cart::CartRepository;
pub use order::{OrderFilter, OrderRepository};
pub use payment::PaymentRepository;

use surrealdb::engine::local::Db;
use surrealdb::{RecordId, Surreal};
use thiserror::Error;

/// Repository error types
#[derive(Debug, Error)]
pub enum RepoError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Duplicate: {0}")]
    Duplicate(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Validation error: {0}")]
    Validation(String),
}

impl From<surrealdb::Error> for RepoError {
    fn from(err: surrealdb::Error) -> Self {
        RepoError::Database(err.to_string())
    }
}

/// Result type for repository operations
pub type RepoResult<T> = Result<T, RepoError>;

/// Whether a SurrealDB error is a unique-index violation
pub(crate) fn is_unique_violation(err: &surrealdb::Error) -> bool {
    let msg = err.to_string().to_lowercase();
    msg.contains("unique") || msg.contains("already exists") || msg.contains("duplicate")
}

/// Build a RecordId from a raw key or a "table:id" string
pub(crate) fn record_id(table: &str, id: &str) -> RecordId {
    id.parse::<RecordId>()
        .unwrap_or_else(|_| RecordId::from_table_key(table, id))
}

/// Base repository with database reference
#[derive(Clone)]
pub struct BaseRepository {
    db: Surreal<Db>,
}

impl BaseRepository {
    pub fn new(db: Surreal<Db>) -> Self {
        Self { db }
    }

    pub fn db(&self) -> &Surreal<Db> {
        &self.db
    }
}
