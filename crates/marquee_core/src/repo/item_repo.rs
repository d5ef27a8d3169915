//! Item repository contract and SQLite implementation.
//!
//! # Responsibility
//! - Provide insert/get/update/delete/list over the `items` table.
//! - Translate the backend "no rows" signal into domain error kinds.
//! - Bound every operation by a fixed per-operation deadline covering pool
//!   checkout, lock waits and execution.
//!
//! # Invariants
//! - Each operation issues exactly one data statement on one pooled
//!   connection.
//! - `update` is a single compare-and-swap on `(id, version)`; it never
//!   reads then writes.
//! - Zero matched rows maps to `NotFound` (get/delete) or `EditConflict`
//!   (update). Every other backend error passes through unchanged.
//! - A sort key is interpolated into SQL only through [`SortColumn`].
//!
//! [`SortColumn`]: crate::filters::SortColumn

use crate::config::StoreConfig;
use crate::db::{DbError, ItemPool};
use crate::filters::{calculate_metadata, Filters, Metadata};
use crate::model::item::{Item, ItemId};
use crate::search::fts::{title_match, TitleMatch};
use chrono::{DateTime, Utc};
use log::{debug, error, warn};
use rusqlite::types::{ToSqlOutput, Type, Value};
use rusqlite::{
    ffi, params, params_from_iter, Connection, ErrorCode, OptionalExtension, Row, ToSql,
};
use serde::Serialize;
use std::collections::BTreeSet;
use std::time::{Duration, Instant};
use thiserror::Error;

/// Number of SQLite VM instructions between deadline checks.
const DEADLINE_CHECK_INTERVAL_OPS: i32 = 1_000;

const ITEM_COLUMNS: &str = "id, created_at, title, year, runtime, tags, version";

pub type StoreResult<T> = Result<T, StoreError>;

/// Domain error kinds surfaced by the item store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// No row exists for the requested id.
    #[error("record not found")]
    NotFound,
    /// The version predicate matched nothing: either a concurrent writer
    /// advanced the version or the row was deleted. Re-fetch to tell which.
    #[error("edit conflict")]
    EditConflict,
    /// The sort key is not safelisted or names no sortable column.
    #[error("unsafe sort parameter `{0}`")]
    UnsafeSort(String),
    /// Any other backend failure, including timeouts and pool exhaustion.
    #[error(transparent)]
    Db(#[from] DbError),
}

impl From<rusqlite::Error> for StoreError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

impl From<r2d2::Error> for StoreError {
    fn from(value: r2d2::Error) -> Self {
        Self::Db(DbError::Pool(value))
    }
}

/// One page of list results.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ItemPage {
    pub items: Vec<Item>,
    pub metadata: Metadata,
}

/// Repository interface for item persistence.
pub trait ItemRepository {
    /// Inserts a new row and writes the assigned id, creation time and
    /// initial version back into `item`.
    fn insert(&self, item: &mut Item) -> StoreResult<()>;
    /// Reads one item by id.
    fn get(&self, id: ItemId) -> StoreResult<Item>;
    /// Persists the mutable fields if `item.version` is still current, then
    /// stores the bumped version back into `item`.
    fn update(&self, item: &mut Item) -> StoreResult<()>;
    /// Physically removes one item.
    fn delete(&self, id: ItemId) -> StoreResult<()>;
    /// Lists items matching a title search and tag superset filter.
    fn list(&self, search_text: &str, tag_filter: &[String], filters: &Filters)
        -> StoreResult<ItemPage>;
}

/// SQLite-backed item repository. Holds no state besides the pool handle.
#[derive(Clone)]
pub struct SqliteItemRepository {
    pool: ItemPool,
    operation_timeout: Duration,
}

impl SqliteItemRepository {
    pub fn new(pool: ItemPool, config: &StoreConfig) -> Self {
        Self::with_timeout(pool, config.operation_timeout())
    }

    pub fn with_timeout(pool: ItemPool, operation_timeout: Duration) -> Self {
        Self {
            pool,
            operation_timeout,
        }
    }

    pub fn pool(&self) -> &ItemPool {
        &self.pool
    }

    /// Runs `body` on one pooled connection under the operation deadline.
    ///
    /// The deadline covers pool checkout, lock waits and statement execution.
    fn run<T>(
        &self,
        operation: &'static str,
        body: impl FnOnce(&Connection) -> rusqlite::Result<T>,
    ) -> StoreResult<T> {
        let started_at = Instant::now();
        let deadline = started_at + self.operation_timeout;
        let pooled = match self.pool.get_timeout(self.operation_timeout) {
            Ok(pooled) => pooled,
            Err(err) => {
                error!(
                    "event={} module=repo status=error duration_ms={} error_code=pool_checkout_failed error={}",
                    operation,
                    started_at.elapsed().as_millis(),
                    err
                );
                return Err(err.into());
            }
        };

        if Instant::now() >= deadline {
            let err = DbError::Timeout {
                operation,
                limit: self.operation_timeout,
            };
            error!(
                "event={} module=repo status=error duration_ms={} error_code=deadline_spent_in_checkout error={}",
                operation,
                started_at.elapsed().as_millis(),
                err
            );
            return Err(err.into());
        }

        let conn: &Connection = &pooled;
        let result = OperationDeadline::arm(conn, deadline).and_then(|_deadline| body(conn));

        match result {
            Ok(value) => {
                debug!(
                    "event={} module=repo status=ok duration_ms={}",
                    operation,
                    started_at.elapsed().as_millis()
                );
                Ok(value)
            }
            Err(err) => {
                let err = classify_backend_error(err, operation, self.operation_timeout);
                error!(
                    "event={} module=repo status=error duration_ms={} error={}",
                    operation,
                    started_at.elapsed().as_millis(),
                    err
                );
                Err(err.into())
            }
        }
    }
}

impl ItemRepository for SqliteItemRepository {
    fn insert(&self, item: &mut Item) -> StoreResult<()> {
        let assigned: (ItemId, DateTime<Utc>, i32) = self.run("item_insert", |conn| {
            conn.query_row(
                "INSERT INTO items (title, year, runtime, tags)
                 VALUES (?1, ?2, ?3, ?4)
                 RETURNING id, created_at, version;",
                params![item.title, item.year, item.runtime, TagsJson(&item.tags)],
                |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
            )
        })?;

        let (id, created_at, version) = assigned;

        item.id = id;
        item.created_at = Some(created_at);
        item.version = version;
        Ok(())
    }

    fn get(&self, id: ItemId) -> StoreResult<Item> {
        if id < 1 {
            return Err(StoreError::NotFound);
        }

        self.run("item_get", |conn| {
            conn.query_row(
                &format!("SELECT {ITEM_COLUMNS} FROM items WHERE id = ?1;"),
                [id],
                parse_item_row,
            )
            .optional()
        })?
        .ok_or(StoreError::NotFound)
    }

    fn update(&self, item: &mut Item) -> StoreResult<()> {
        let new_version: Option<i32> = self.run("item_update", |conn| {
            conn.query_row(
                "UPDATE items
                 SET title = ?1, year = ?2, runtime = ?3, tags = ?4, version = version + 1
                 WHERE id = ?5 AND version = ?6
                 RETURNING version;",
                params![
                    item.title,
                    item.year,
                    item.runtime,
                    TagsJson(&item.tags),
                    item.id,
                    item.version,
                ],
                |row| row.get(0),
            )
            .optional()
        })?;

        match new_version {
            Some(version) => {
                item.version = version;
                Ok(())
            }
            None => {
                warn!(
                    "event=item_update module=repo status=conflict id={} expected_version={}",
                    item.id, item.version
                );
                Err(StoreError::EditConflict)
            }
        }
    }

    fn delete(&self, id: ItemId) -> StoreResult<()> {
        if id < 1 {
            return Err(StoreError::NotFound);
        }

        let removed = self.run("item_delete", |conn| {
            conn.execute("DELETE FROM items WHERE id = ?1;", [id])
        })?;

        if removed == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }

    fn list(
        &self,
        search_text: &str,
        tag_filter: &[String],
        filters: &Filters,
    ) -> StoreResult<ItemPage> {
        let (column, direction) = filters
            .sort_order()
            .ok_or_else(|| StoreError::UnsafeSort(filters.sort.clone()))?;

        let mut sql = format!(
            "SELECT COUNT(*) OVER() AS total_records, {ITEM_COLUMNS}
             FROM items
             WHERE 1 = 1"
        );
        let mut bind_values: Vec<Value> = Vec::new();

        match title_match(search_text) {
            TitleMatch::Any => {}
            TitleMatch::Nothing => sql.push_str(" AND 0"),
            TitleMatch::Terms(match_expr) => {
                sql.push_str(" AND id IN (SELECT rowid FROM items_fts WHERE items_fts MATCH ?)");
                bind_values.push(Value::Text(match_expr));
            }
        }

        let wanted: BTreeSet<&str> = tag_filter.iter().map(String::as_str).collect();
        if !wanted.is_empty() {
            sql.push_str(
                " AND id IN (
                    SELECT item_id
                    FROM item_tags
                    WHERE tag IN (SELECT value FROM json_each(?))
                    GROUP BY item_id
                    HAVING COUNT(*) = ?
                )",
            );
            bind_values.push(Value::Text(tags_to_json(&wanted)?));
            bind_values.push(Value::Integer(count_to_sql(wanted.len() as u64)));
        }

        sql.push_str(&format!(
            " ORDER BY {} {}, id ASC LIMIT ? OFFSET ?;",
            column.as_sql(),
            direction.as_sql()
        ));
        bind_values.push(Value::Integer(i64::from(filters.limit())));
        bind_values.push(Value::Integer(count_to_sql(filters.offset())));

        let (items, total_records) = self.run("item_list", |conn| {
            let mut stmt = conn.prepare(&sql)?;
            let mut rows = stmt.query(params_from_iter(bind_values))?;
            let mut items = Vec::new();
            let mut total_records: i64 = 0;
            while let Some(row) = rows.next()? {
                total_records = row.get("total_records")?;
                items.push(parse_item_row(row)?);
            }
            Ok((items, total_records))
        })?;

        let total_records = u64::try_from(total_records).unwrap_or(0);
        debug!(
            "event=item_list module=repo status=ok rows={} total_records={}",
            items.len(),
            total_records
        );
        Ok(ItemPage {
            items,
            metadata: calculate_metadata(total_records, filters.page, filters.page_size),
        })
    }
}

/// Bounds one operation by `deadline`: lock waits get only the time left,
/// and a progress handler interrupts a statement still running past it.
/// Both settings are restored on drop.
struct OperationDeadline<'conn> {
    conn: &'conn Connection,
    restore_busy_timeout: Duration,
}

impl<'conn> OperationDeadline<'conn> {
    fn arm(conn: &'conn Connection, deadline: Instant) -> rusqlite::Result<Self> {
        let busy_ms: i64 = conn.pragma_query_value(None, "busy_timeout", |row| row.get(0))?;
        let restore_busy_timeout = Duration::from_millis(u64::try_from(busy_ms).unwrap_or(0));

        conn.busy_timeout(deadline.saturating_duration_since(Instant::now()))?;
        conn.progress_handler(
            DEADLINE_CHECK_INTERVAL_OPS,
            Some(move || Instant::now() >= deadline),
        );
        Ok(Self {
            conn,
            restore_busy_timeout,
        })
    }
}

impl Drop for OperationDeadline<'_> {
    fn drop(&mut self) {
        self.conn.progress_handler(0, None::<fn() -> bool>);
        if let Err(err) = self.conn.busy_timeout(self.restore_busy_timeout) {
            warn!(
                "event=operation_deadline module=repo status=error error_code=busy_timeout_restore_failed error={}",
                err
            );
        }
    }
}

/// Interrupts and exhausted lock waits both mean the deadline fired.
fn classify_backend_error(
    err: rusqlite::Error,
    operation: &'static str,
    limit: Duration,
) -> DbError {
    match &err {
        rusqlite::Error::SqliteFailure(failure, _)
            if failure.code == ErrorCode::OperationInterrupted
                || failure.extended_code == ffi::SQLITE_BUSY =>
        {
            DbError::Timeout { operation, limit }
        }
        _ => DbError::Sqlite(err),
    }
}

/// Binds a tag list as a JSON array text value.
struct TagsJson<'a>(&'a [String]);

impl ToSql for TagsJson<'_> {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        tags_to_json(self.0).map(ToSqlOutput::from)
    }
}

fn tags_to_json<T: Serialize + ?Sized>(tags: &T) -> rusqlite::Result<String> {
    serde_json::to_string(tags).map_err(|err| rusqlite::Error::ToSqlConversionFailure(Box::new(err)))
}

fn count_to_sql(value: u64) -> i64 {
    i64::try_from(value).unwrap_or(i64::MAX)
}

fn parse_item_row(row: &Row<'_>) -> rusqlite::Result<Item> {
    let tags_idx = row.as_ref().column_index("tags")?;
    let tags_text: String = row.get(tags_idx)?;
    let tags = serde_json::from_str::<Vec<String>>(&tags_text).map_err(|err| {
        rusqlite::Error::FromSqlConversionFailure(tags_idx, Type::Text, Box::new(err))
    })?;

    Ok(Item {
        id: row.get("id")?,
        created_at: Some(row.get("created_at")?),
        title: row.get("title")?,
        year: row.get("year")?,
        runtime: row.get("runtime")?,
        tags,
        version: row.get("version")?,
    })
}
