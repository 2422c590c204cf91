//! SQLite storage bootstrap and schema migration entry points.
//!
//! # Responsibility
//! - Open and configure the SQLite connection backing the note store.
//! - Apply schema migrations in deterministic order.
//!
//! # Invariants
//! - Migration version is tracked via `PRAGMA user_version`.
//! - Callers must not read/write notes before migrations succeed.
//! - A failed migration step leaves the store at the last fully applied version.

use thiserror::Error;

pub mod migrations;
mod open;

pub use open::{open_db, open_db_in_memory, open_store};

pub type DbResult<T> = Result<T, DbError>;

/// Schema manager failures.
#[derive(Debug, Error)]
pub enum DbError {
    /// The configured location could not be opened or written.
    #[error("storage unavailable at `{location}`: {source}")]
    StorageUnavailable {
        location: String,
        #[source]
        source: rusqlite::Error,
    },
    /// A migration step aborted; the store stays at `step - 1` or earlier.
    #[error("migration step {step} failed: {source}")]
    MigrationFailed {
        step: u32,
        #[source]
        source: rusqlite::Error,
    },
    #[error("database schema version {db_version} is newer than supported {latest_supported}")]
    UnsupportedSchemaVersion {
        db_version: u32,
        latest_supported: u32,
    },
    #[error("schema version {requested} is outside supported range 1..={latest_supported}")]
    InvalidTargetVersion { requested: u32, latest_supported: u32 },
    #[error("upgrade expected stored schema version {expected}, found {actual}")]
    VersionMismatch { expected: u32, actual: u32 },
    #[error(transparent)]
    Sqlite(#[from] rusqlite::Error),
}
