//! SQLite storage bootstrap and schema migration entry points.
//!
//! # Responsibility
//! - Build the r2d2 connection pool that every store operation draws from.
//! - Apply schema migrations in deterministic order before the pool is handed out.
//!
//! # Invariants
//! - Migration version is tracked via `PRAGMA user_version`.
//! - No item data is read or written before migrations succeed.
//! - Pool exhaustion and checkout failures are ordinary backend errors.

use std::time::Duration;
use thiserror::Error;

pub mod migrations;
mod open;

pub use open::{open_store_pool, open_store_pool_in_memory, ItemPool, PooledConn};

pub type DbResult<T> = Result<T, DbError>;

/// Lower-level backend failure. Never decomposed further by the store.
#[derive(Debug, Error)]
pub enum DbError {
    #[error(transparent)]
    Sqlite(#[from] rusqlite::Error),
    #[error("connection pool: {0}")]
    Pool(#[from] r2d2::Error),
    /// The per-operation deadline fired and SQLite interrupted the statement.
    #[error("{operation} exceeded the {}ms operation timeout", limit.as_millis())]
    Timeout {
        operation: &'static str,
        limit: Duration,
    },
    #[error("database schema version {db_version} is newer than supported {latest_supported}")]
    UnsupportedSchemaVersion {
        db_version: u32,
        latest_supported: u32,
    },
}
