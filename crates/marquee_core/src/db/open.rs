//! Connection pool bootstrap for SQLite.
//!
//! # Responsibility
//! - Build file or in-memory r2d2 pools with per-connection pragmas.
//! - Trigger schema migrations before returning a usable pool.
//!
//! # Invariants
//! - Every pooled connection has `foreign_keys=ON` and a busy timeout equal to
//!   the configured operation timeout.
//! - Returned pools point at a fully migrated schema.

use super::migrations::apply_migrations;
use super::DbResult;
use crate::config::StoreConfig;
use log::{error, info};
use r2d2::{Pool, PooledConnection};
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::Connection;
use std::path::Path;
use std::time::{Duration, Instant};

/// Shared handle to the item database. Cheap to clone.
pub type ItemPool = Pool<SqliteConnectionManager>;

/// Connection checked out of an [`ItemPool`].
pub type PooledConn = PooledConnection<SqliteConnectionManager>;

/// Opens a pool over a SQLite database file and applies pending migrations.
///
/// # Side effects
/// - Creates the database file when missing and switches it to WAL mode.
/// - Emits `db_open` logging events with duration and status.
pub fn open_store_pool(path: impl AsRef<Path>, config: &StoreConfig) -> DbResult<ItemPool> {
    let started_at = Instant::now();
    info!("event=db_open module=db status=start mode=file");

    let busy_timeout = config.operation_timeout();
    let manager = SqliteConnectionManager::file(path.as_ref()).with_init(move |conn| {
        configure_connection(conn, busy_timeout)?;
        conn.pragma_update_and_check(None, "journal_mode", "WAL", |_| Ok(()))
    });

    let idle_floor = config.max_idle_conns.min(config.max_open_conns);
    let built = Pool::builder()
        .max_size(config.max_open_conns)
        .min_idle(Some(idle_floor))
        .idle_timeout(Some(config.max_idle_time()))
        .connection_timeout(config.operation_timeout())
        .build(manager);

    finish_open(built, "file", started_at)
}

/// Opens a single-connection pool over a private in-memory database.
///
/// The pool never reaps its only connection, since that would discard the
/// database with it.
pub fn open_store_pool_in_memory(config: &StoreConfig) -> DbResult<ItemPool> {
    let started_at = Instant::now();
    info!("event=db_open module=db status=start mode=memory");

    let busy_timeout = config.operation_timeout();
    let manager = SqliteConnectionManager::memory()
        .with_init(move |conn| configure_connection(conn, busy_timeout));

    let built = Pool::builder()
        .max_size(1)
        .min_idle(Some(1))
        .idle_timeout(None)
        .max_lifetime(None)
        .connection_timeout(config.operation_timeout())
        .build(manager);

    finish_open(built, "memory", started_at)
}

fn finish_open(
    built: Result<ItemPool, r2d2::Error>,
    mode: &'static str,
    started_at: Instant,
) -> DbResult<ItemPool> {
    let pool = match built {
        Ok(pool) => pool,
        Err(err) => {
            error!(
                "event=db_open module=db status=error mode={} duration_ms={} error_code=pool_build_failed error={}",
                mode,
                started_at.elapsed().as_millis(),
                err
            );
            return Err(err.into());
        }
    };

    match migrate_pool(&pool) {
        Ok(()) => {
            info!(
                "event=db_open module=db status=ok mode={} duration_ms={} max_size={}",
                mode,
                started_at.elapsed().as_millis(),
                pool.max_size()
            );
            Ok(pool)
        }
        Err(err) => {
            error!(
                "event=db_open module=db status=error mode={} duration_ms={} error_code=db_bootstrap_failed error={}",
                mode,
                started_at.elapsed().as_millis(),
                err
            );
            Err(err)
        }
    }
}

fn migrate_pool(pool: &ItemPool) -> DbResult<()> {
    let mut conn = pool.get()?;
    apply_migrations(&mut conn)
}

fn configure_connection(conn: &mut Connection, busy_timeout: Duration) -> rusqlite::Result<()> {
    conn.execute_batch("PRAGMA foreign_keys = ON;")?;
    conn.busy_timeout(busy_timeout)
}
