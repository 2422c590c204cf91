//! Note entity and collection identifiers.
//!
//! # Responsibility
//! - Define the canonical note record stored in every collection.
//! - Provide validation used by repository write paths.
//!
//! # Invariants
//! - A persisted note always carries a positive `id`.
//! - `updated_at` is never earlier than `created_at`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};
use thiserror::Error;

/// Row identifier, unique within the table currently holding the note.
pub type NoteId = i64;

/// Unix epoch milliseconds, UTC.
pub type TimestampMs = i64;

/// One of the three independent note collections.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Collection {
    /// Notes visible in normal browsing.
    Active,
    /// Soft-deleted notes awaiting restore or purge.
    Trash,
    /// Notes set aside outside normal browsing.
    Archive,
}

impl Collection {
    pub const ALL: [Collection; 3] = [Self::Active, Self::Trash, Self::Archive];

    /// Backing table name.
    pub fn table(self) -> &'static str {
        match self {
            Self::Active => "notes",
            Self::Trash => "trash",
            Self::Archive => "archive",
        }
    }
}

impl Display for Collection {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Active => "active",
            Self::Trash => "trash",
            Self::Archive => "archive",
        })
    }
}

/// Validation failures for note records.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NoteValidationError {
    #[error("note id must be positive, got {0}")]
    NonPositiveId(NoteId),
    #[error("note has no id")]
    MissingId,
    #[error("updated_at ({updated_at}) is earlier than created_at ({created_at})")]
    UpdatedBeforeCreated {
        created_at: TimestampMs,
        updated_at: TimestampMs,
    },
}

/// A note as stored in any collection.
///
/// Values are plain copies. Changing a field here has no effect on storage
/// until the note is handed back to the repository.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Note {
    /// `None` until the store assigns one.
    pub id: Option<NoteId>,
    pub title: String,
    pub content: String,
    pub created_at: TimestampMs,
    pub updated_at: TimestampMs,
}

impl Note {
    /// Creates an unsaved note stamped with the current time.
    pub fn new(title: impl Into<String>, content: impl Into<String>) -> Self {
        let now = now_millis();
        Self {
            id: None,
            title: title.into(),
            content: content.into(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Creates an unsaved note that asks the store for a specific id.
    pub fn with_id(id: NoteId, title: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            id: Some(id),
            ..Self::new(title, content)
        }
    }

    /// Reconstructs a note from an existing record, keeping its timestamps.
    pub fn from_parts(
        id: NoteId,
        title: impl Into<String>,
        content: impl Into<String>,
        created_at: TimestampMs,
        updated_at: TimestampMs,
    ) -> Self {
        Self {
            id: Some(id),
            title: title.into(),
            content: content.into(),
            created_at,
            updated_at,
        }
    }

    /// Checks the id and timestamp invariants.
    pub fn validate(&self) -> Result<(), NoteValidationError> {
        if let Some(id) = self.id {
            if id <= 0 {
                return Err(NoteValidationError::NonPositiveId(id));
            }
        }
        if self.updated_at < self.created_at {
            return Err(NoteValidationError::UpdatedBeforeCreated {
                created_at: self.created_at,
                updated_at: self.updated_at,
            });
        }
        Ok(())
    }

    pub fn created_at_utc(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp_millis(self.created_at)
    }

    pub fn updated_at_utc(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp_millis(self.updated_at)
    }
}

/// Anything that identifies a stored note: a bare id or a note carrying one.
pub trait NoteKey {
    fn note_id(&self) -> Result<NoteId, NoteValidationError>;
}

impl NoteKey for NoteId {
    fn note_id(&self) -> Result<NoteId, NoteValidationError> {
        if *self <= 0 {
            return Err(NoteValidationError::NonPositiveId(*self));
        }
        Ok(*self)
    }
}

impl NoteKey for Note {
    fn note_id(&self) -> Result<NoteId, NoteValidationError> {
        self.id.ok_or(NoteValidationError::MissingId)?.note_id()
    }
}

impl NoteKey for &Note {
    fn note_id(&self) -> Result<NoteId, NoteValidationError> {
        (*self).note_id()
    }
}

/// Current wall-clock time in epoch milliseconds.
pub fn now_millis() -> TimestampMs {
    Utc::now().timestamp_millis()
}
