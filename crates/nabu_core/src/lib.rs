//! Local note storage engine for Nabu.
//!
//! Notes live in one of three collections (active, trash, archive) backed by
//! SQLite tables, and move between them through transactional lifecycle
//! operations.

pub mod config;
pub mod db;
pub mod logging;
pub mod model;
pub mod repo;

pub use config::{StoreConfig, StoreLocation};
pub use db::{DbError, DbResult};
pub use logging::{init_logging, logging_status, LogConfig, LogLevel, LoggingError};
pub use model::note::{Collection, Note, NoteId, NoteKey, NoteValidationError, TimestampMs};
pub use repo::note_repo::{
    CollectionSnapshot, NoteRepository, SqliteNoteRepository, StoreError, StoreResult, Transition,
};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
