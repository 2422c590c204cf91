//! Store configuration.
//!
//! # Responsibility
//! - Describe where the backing store lives and which schema version the
//!   running code expects.
//!
//! # Invariants
//! - `schema_version` defaults to the latest registered migration.

use crate::db::migrations::latest_version;
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};
use std::path::{Path, PathBuf};

/// Location of the backing SQLite store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StoreLocation {
    /// Database file on disk; created when missing.
    File(PathBuf),
    /// Private in-memory database, discarded on close.
    Memory,
}

impl Display for StoreLocation {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::File(path) => write!(f, "{}", path.display()),
            Self::Memory => f.write_str(":memory:"),
        }
    }
}

/// Options accepted by `SqliteNoteRepository::open`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreConfig {
    pub location: StoreLocation,
    #[serde(default = "latest_version")]
    pub schema_version: u32,
}

impl StoreConfig {
    /// File-backed store at `path`, migrated to the latest schema.
    pub fn file(path: impl AsRef<Path>) -> Self {
        Self {
            location: StoreLocation::File(path.as_ref().to_path_buf()),
            schema_version: latest_version(),
        }
    }

    /// In-memory store, migrated to the latest schema.
    pub fn in_memory() -> Self {
        Self {
            location: StoreLocation::Memory,
            schema_version: latest_version(),
        }
    }

    /// Pins the schema version the store is migrated to.
    pub fn with_schema_version(mut self, schema_version: u32) -> Self {
        self.schema_version = schema_version;
        self
    }
}
