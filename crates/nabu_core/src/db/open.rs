//! Connection bootstrap utilities for SQLite.
//!
//! # Responsibility
//! - Open file or in-memory SQLite connections.
//! - Configure connection pragmas required by the note store.
//! - Migrate to the configured schema version before returning a connection.
//!
//! # Invariants
//! - Returned connections are writable and have `foreign_keys=ON`.
//! - Returned connections are at exactly the configured schema version.

use super::migrations::{current_version, migrate_to};
use super::{DbError, DbResult};
use crate::config::{StoreConfig, StoreLocation};
use log::{error, info};
use rusqlite::{Connection, DatabaseName, ErrorCode};
use std::path::Path;
use std::time::{Duration, Instant};

const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Opens a SQLite database file and applies all pending migrations.
pub fn open_db(path: impl AsRef<Path>) -> DbResult<Connection> {
    open_store(&StoreConfig::file(path))
}

/// Opens an in-memory SQLite database and applies all pending migrations.
pub fn open_db_in_memory() -> DbResult<Connection> {
    open_store(&StoreConfig::in_memory())
}

/// Opens or creates the store described by `config`.
///
/// # Errors
/// - `StorageUnavailable` when the location cannot be opened or is read-only.
/// - `MigrationFailed`, `UnsupportedSchemaVersion`, `InvalidTargetVersion`
///   from the migration executor.
///
/// # Side effects
/// - Emits `db_open` logging events with duration and status.
pub fn open_store(config: &StoreConfig) -> DbResult<Connection> {
    let started_at = Instant::now();
    let mode = match config.location {
        StoreLocation::File(_) => "file",
        StoreLocation::Memory => "memory",
    };
    info!(
        "event=db_open module=db status=start mode={} schema_version={}",
        mode, config.schema_version
    );

    let result = connect(&config.location).and_then(|mut conn| {
        bootstrap_connection(&mut conn, config.schema_version)?;
        Ok(conn)
    });

    match &result {
        Ok(_) => info!(
            "event=db_open module=db status=ok mode={} duration_ms={}",
            mode,
            started_at.elapsed().as_millis()
        ),
        Err(err) => error!(
            "event=db_open module=db status=error mode={} duration_ms={} error_code={} error={}",
            mode,
            started_at.elapsed().as_millis(),
            error_code(err),
            err
        ),
    }

    result
}

fn connect(location: &StoreLocation) -> DbResult<Connection> {
    let conn = match location {
        StoreLocation::File(path) => Connection::open(path),
        StoreLocation::Memory => Connection::open_in_memory(),
    }
    .map_err(|source| DbError::StorageUnavailable {
        location: location.to_string(),
        source,
    })?;

    // Opening is lazy; the first header read is what touches the file.
    if let Err(err) = current_version(&conn) {
        return Err(classify_storage_error(location, err));
    }

    let read_only = conn
        .is_readonly(DatabaseName::Main)
        .map_err(|source| DbError::StorageUnavailable {
            location: location.to_string(),
            source,
        })?;
    if read_only {
        return Err(DbError::StorageUnavailable {
            location: location.to_string(),
            source: rusqlite::Error::SqliteFailure(
                rusqlite::ffi::Error::new(rusqlite::ffi::SQLITE_READONLY),
                Some("store opened read-only".to_string()),
            ),
        });
    }

    Ok(conn)
}

fn bootstrap_connection(conn: &mut Connection, schema_version: u32) -> DbResult<()> {
    conn.execute_batch("PRAGMA foreign_keys = ON;")?;
    conn.busy_timeout(BUSY_TIMEOUT)?;
    migrate_to(conn, schema_version)?;
    Ok(())
}

fn classify_storage_error(location: &StoreLocation, err: DbError) -> DbError {
    match err {
        DbError::Sqlite(source)
            if matches!(
                source.sqlite_error_code(),
                Some(
                    ErrorCode::CannotOpen
                        | ErrorCode::ReadOnly
                        | ErrorCode::PermissionDenied
                        | ErrorCode::NotADatabase
                )
            ) =>
        {
            DbError::StorageUnavailable {
                location: location.to_string(),
                source,
            }
        }
        other => other,
    }
}

fn error_code(err: &DbError) -> &'static str {
    match err {
        DbError::StorageUnavailable { .. } => "storage_unavailable",
        DbError::MigrationFailed { .. } => "migration_failed",
        DbError::UnsupportedSchemaVersion { .. } => "unsupported_schema_version",
        DbError::InvalidTargetVersion { .. } => "invalid_target_version",
        DbError::VersionMismatch { .. } => "version_mismatch",
        DbError::Sqlite(_) => "db_bootstrap_failed",
    }
}

#[cfg(test)]
mod tests {
    use super::open_store;
    use crate::config::StoreConfig;
    use crate::db::migrations::{current_version, latest_version};
    use crate::db::DbError;

    #[test]
    fn in_memory_store_reaches_configured_version() {
        let conn = open_store(&StoreConfig::in_memory().with_schema_version(1)).unwrap();
        assert_eq!(current_version(&conn).unwrap(), 1);

        let conn = open_store(&StoreConfig::in_memory()).unwrap();
        assert_eq!(current_version(&conn).unwrap(), latest_version());
    }

    #[test]
    fn zero_schema_version_is_rejected() {
        let err = open_store(&StoreConfig::in_memory().with_schema_version(0)).unwrap_err();
        assert!(matches!(
            err,
            DbError::InvalidTargetVersion { requested: 0, .. }
        ));
    }
}
