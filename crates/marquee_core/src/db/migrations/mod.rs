//! Item schema migrations.
//!
//! Each step is an embedded SQL script tagged with the schema version it
//! produces. The applied version lives in `PRAGMA user_version`.
//!
//! # Invariants
//! - Step versions start at 1 and increase by exactly one.
//! - Pending steps run inside one transaction: a failed step leaves the
//!   database at its previous version.
//! - A database stamped with a version this binary does not know is refused.

use crate::db::{DbError, DbResult};
use log::{debug, info};
use rusqlite::Connection;

/// One schema step: `script` upgrades the database to `version`.
struct SchemaStep {
    version: u32,
    name: &'static str,
    script: &'static str,
}

static SCHEMA_STEPS: [SchemaStep; 2] = [
    SchemaStep {
        version: 1,
        name: "items",
        script: include_str!("0001_items.sql"),
    },
    SchemaStep {
        version: 2,
        name: "item_search",
        script: include_str!("0002_item_search.sql"),
    },
];

/// Schema version produced by the last known step.
pub fn latest_version() -> u32 {
    SCHEMA_STEPS.len() as u32
}

/// Brings the schema behind `conn` up to [`latest_version`].
pub fn apply_migrations(conn: &mut Connection) -> DbResult<()> {
    let stamped: u32 = conn.pragma_query_value(None, "user_version", |row| row.get(0))?;
    let target = latest_version();

    if stamped > target {
        return Err(DbError::UnsupportedSchemaVersion {
            db_version: stamped,
            latest_supported: target,
        });
    }

    let pending: Vec<&SchemaStep> = SCHEMA_STEPS
        .iter()
        .skip_while(|step| step.version <= stamped)
        .collect();
    if pending.is_empty() {
        debug!("event=db_migrate module=db status=up_to_date version={}", stamped);
        return Ok(());
    }

    let tx = conn.transaction()?;
    for step in &pending {
        tx.execute_batch(step.script)?;
        tx.pragma_update(None, "user_version", step.version)?;
        debug!(
            "event=db_migrate module=db status=step version={} name={}",
            step.version, step.name
        );
    }
    tx.commit()?;

    info!(
        "event=db_migrate module=db status=ok from_version={} to_version={} steps={}",
        stamped,
        target,
        pending.len()
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::{apply_migrations, latest_version, SCHEMA_STEPS};
    use rusqlite::Connection;

    #[test]
    fn step_versions_are_contiguous_from_one() {
        for (idx, step) in SCHEMA_STEPS.iter().enumerate() {
            assert_eq!(step.version as usize, idx + 1, "step {}", step.name);
        }
        assert_eq!(latest_version(), 2);
    }

    #[test]
    fn failed_step_keeps_previous_version() {
        let mut conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(SCHEMA_STEPS[0].script).unwrap();
        conn.execute_batch("CREATE TABLE items_fts (x); PRAGMA user_version = 1;")
            .unwrap();

        assert!(apply_migrations(&mut conn).is_err());
        let version: u32 = conn
            .pragma_query_value(None, "user_version", |row| row.get(0))
            .unwrap();
        assert_eq!(version, 1);
    }
}
