//! SQLite migration registry and executor.
//!
//! # Responsibility
//! - Register schema migrations in strictly increasing order.
//! - Apply pending migrations one step per transaction.
//!
//! # Invariants
//! - `version` values must remain monotonic.
//! - Every step is written with `IF NOT EXISTS` so re-running it is harmless.
//! - The step SQL and its `PRAGMA user_version` bump commit together, so the
//!   stored version always names the last fully applied step.

use crate::db::{DbError, DbResult};
use log::{error, info};
use rusqlite::Connection;

#[derive(Debug, Clone, Copy)]
struct Migration {
    version: u32,
    name: &'static str,
    sql: &'static str,
}

const MIGRATIONS: &[Migration] = &[
    Migration {
        version: 1,
        name: "collections",
        sql: include_str!("0001_collections.sql"),
    },
    Migration {
        version: 2,
        name: "updated_at_indexes",
        sql: include_str!("0002_updated_at_indexes.sql"),
    },
];

/// Returns the latest migration version known by this binary.
pub fn latest_version() -> u32 {
    MIGRATIONS.last().map_or(0, |migration| migration.version)
}

/// Reads the schema version stored in the database header.
pub fn current_version(conn: &Connection) -> DbResult<u32> {
    let version = conn.query_row("PRAGMA user_version;", [], |row| row.get::<_, u32>(0))?;
    Ok(version)
}

/// Brings the store to `target`, applying whatever steps are pending.
///
/// # Errors
/// - `InvalidTargetVersion` when `target` is not a registered version.
/// - `UnsupportedSchemaVersion` when the store is already past `target`.
/// - `MigrationFailed` when a step aborts.
pub fn migrate_to(conn: &mut Connection, target: u32) -> DbResult<()> {
    check_target(target)?;

    let current = current_version(conn)?;
    if current > target {
        return Err(DbError::UnsupportedSchemaVersion {
            db_version: current,
            latest_supported: target,
        });
    }
    if current == target {
        return Ok(());
    }

    upgrade(conn, current, target).map(|_| ())
}

/// Applies the ordered steps with `from < version <= to`.
///
/// `from` must match the version currently stored. Returns the version the
/// store ends up at.
pub fn upgrade(conn: &mut Connection, from: u32, to: u32) -> DbResult<u32> {
    check_target(to)?;

    let actual = current_version(conn)?;
    if actual != from {
        return Err(DbError::VersionMismatch {
            expected: from,
            actual,
        });
    }
    if from > to {
        return Err(DbError::UnsupportedSchemaVersion {
            db_version: from,
            latest_supported: to,
        });
    }

    run_steps(conn, MIGRATIONS, from, to)
}

fn check_target(target: u32) -> DbResult<()> {
    let latest = latest_version();
    if target == 0 || target > latest {
        return Err(DbError::InvalidTargetVersion {
            requested: target,
            latest_supported: latest,
        });
    }
    Ok(())
}

fn run_steps(conn: &mut Connection, registry: &[Migration], from: u32, to: u32) -> DbResult<u32> {
    let mut applied = from;

    for migration in registry {
        if migration.version <= from || migration.version > to {
            continue;
        }

        let step = migration.version;
        let fail = |source: rusqlite::Error| {
            error!(
                "event=migration_step module=db status=error step={} name={} error={}",
                step, migration.name, source
            );
            DbError::MigrationFailed { step, source }
        };

        // Dropping the transaction on an early return rolls the step back.
        let tx = conn.transaction().map_err(fail)?;
        tx.execute_batch(migration.sql).map_err(fail)?;
        tx.execute_batch(&format!("PRAGMA user_version = {step};"))
            .map_err(fail)?;
        tx.commit().map_err(fail)?;

        info!(
            "event=migration_step module=db status=ok step={} name={}",
            step, migration.name
        );
        applied = step;
    }

    Ok(applied)
}
