//! Note repository contract and SQLite implementation.
//!
//! # Responsibility
//! - Provide create/read/update APIs over the active collection.
//! - Move notes between active, trash and archive without losing or
//!   duplicating them.
//! - Purge trash/archive and reset all collections.
//!
//! # Invariants
//! - A move reads the source row, inserts it verbatim into the destination and
//!   deletes the source inside one `IMMEDIATE` transaction.
//! - List operations return notes ordered by `id ASC`.
//! - `update_note` never inserts; `updated_at` never moves backwards.
//! - Titles and content are never written to logs.

use crate::config::StoreConfig;
use crate::db::migrations::current_version;
use crate::db::{open_store, DbError};
use crate::model::note::{
    now_millis, Collection, Note, NoteId, NoteKey, NoteValidationError, TimestampMs,
};
use log::{debug, error, info};
use rusqlite::{params, Connection, OptionalExtension, Row, TransactionBehavior};
use std::sync::{Mutex, MutexGuard, PoisonError};
use thiserror::Error;

const NOTE_COLUMNS: &str = "id, title, content, created_at, updated_at";

pub type StoreResult<T> = Result<T, StoreError>;

/// Repository error for note persistence and lifecycle operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Opening or migrating the store failed.
    #[error(transparent)]
    Db(#[from] DbError),
    #[error("note {id} not found in {collection}")]
    NotFound { id: NoteId, collection: Collection },
    /// The store rejected a write (constraint violation, disk full, ...).
    #[error("write rejected by store: {0}")]
    PersistenceFailed(#[source] rusqlite::Error),
    /// The destination row was written but the source row could not be
    /// removed. The transaction is rolled back, so the note is still in `from`.
    #[error("moving note {id} from {from} to {to} could not remove the source row")]
    MovePartiallyFailed {
        id: NoteId,
        from: Collection,
        to: Collection,
        #[source]
        source: Option<rusqlite::Error>,
    },
    #[error("note id {id} is already used in {collection}")]
    IdInUse { id: NoteId, collection: Collection },
    #[error(transparent)]
    Validation(#[from] NoteValidationError),
    #[error("invalid persisted note data: {0}")]
    InvalidData(String),
    #[error("connection is not migrated (user_version={actual_version})")]
    UninitializedConnection { actual_version: u32 },
    #[error("required table `{0}` is missing")]
    MissingRequiredTable(&'static str),
}

impl From<rusqlite::Error> for StoreError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

/// A lifecycle transition between two collections.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// active → trash
    Delete,
    /// trash → active
    Restore,
    /// active → archive
    Archive,
    /// archive → active
    Unarchive,
}

impl Transition {
    pub fn source(self) -> Collection {
        match self {
            Self::Delete | Self::Archive => Collection::Active,
            Self::Restore => Collection::Trash,
            Self::Unarchive => Collection::Archive,
        }
    }

    pub fn destination(self) -> Collection {
        match self {
            Self::Delete => Collection::Trash,
            Self::Archive => Collection::Archive,
            Self::Restore | Self::Unarchive => Collection::Active,
        }
    }
}

/// All three collections read at one point in time.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CollectionSnapshot {
    pub active: Vec<Note>,
    pub trash: Vec<Note>,
    pub archive: Vec<Note>,
}

/// Repository interface for note CRUD and lifecycle operations.
pub trait NoteRepository {
    /// Inserts a note into the active collection and returns its id.
    ///
    /// Both timestamps are stamped to now. A supplied id is kept as-is.
    fn add_note(&self, note: &Note) -> StoreResult<NoteId>;
    /// Gets one note from the given collection.
    fn get_note_from(&self, collection: Collection, id: NoteId) -> StoreResult<Note>;
    /// Lists one collection ordered by `id ASC`.
    fn list_notes(&self, collection: Collection) -> StoreResult<Vec<Note>>;
    /// Lists at most `limit` notes ordered by `updated_at DESC, id DESC`.
    fn recent_notes(&self, collection: Collection, limit: u32) -> StoreResult<Vec<Note>>;
    fn count_notes(&self, collection: Collection) -> StoreResult<u64>;
    /// Reads all collections in one transaction.
    fn snapshot(&self) -> StoreResult<CollectionSnapshot>;
    /// Overwrites title/content of an active note and returns the stored copy.
    fn update_note(&self, note: &Note) -> StoreResult<Note>;
    /// Moves one note along `transition` and returns it as stored.
    fn transfer(&self, id: NoteId, transition: Transition) -> StoreResult<Note>;
    /// Permanently removes one note from the trash.
    fn purge_note_by_id(&self, id: NoteId) -> StoreResult<()>;
    /// Permanently removes every note in `collection`; returns the count.
    fn purge_collection(&self, collection: Collection) -> StoreResult<usize>;
    /// Clears all three collections and restarts id assignment, keeping the schema.
    fn reset_data(&self) -> StoreResult<()>;

    fn get_note(&self, id: NoteId) -> StoreResult<Note> {
        self.get_note_from(Collection::Active, id)
    }

    fn get_all_notes(&self) -> StoreResult<Vec<Note>> {
        self.list_notes(Collection::Active)
    }

    fn get_all_notes_from_trash(&self) -> StoreResult<Vec<Note>> {
        self.list_notes(Collection::Trash)
    }

    fn get_all_notes_from_archive(&self) -> StoreResult<Vec<Note>> {
        self.list_notes(Collection::Archive)
    }

    fn delete_note<K: NoteKey>(&self, key: K) -> StoreResult<Note>
    where
        Self: Sized,
    {
        self.transfer(key.note_id()?, Transition::Delete)
    }

    fn restore_note<K: NoteKey>(&self, key: K) -> StoreResult<Note>
    where
        Self: Sized,
    {
        self.transfer(key.note_id()?, Transition::Restore)
    }

    /// Only notes in the active collection can be archived.
    fn archive_note<K: NoteKey>(&self, key: K) -> StoreResult<Note>
    where
        Self: Sized,
    {
        self.transfer(key.note_id()?, Transition::Archive)
    }

    fn unarchive_note<K: NoteKey>(&self, key: K) -> StoreResult<Note>
    where
        Self: Sized,
    {
        self.transfer(key.note_id()?, Transition::Unarchive)
    }

    fn purge_note<K: NoteKey>(&self, key: K) -> StoreResult<()>
    where
        Self: Sized,
    {
        self.purge_note_by_id(key.note_id()?)
    }

    fn empty_trash(&self) -> StoreResult<usize> {
        self.purge_collection(Collection::Trash)
    }

    fn empty_archive(&self) -> StoreResult<usize> {
        self.purge_collection(Collection::Archive)
    }
}

/// SQLite-backed note repository.
///
/// Owns its connection exclusively; every operation holds the connection lock
/// for its full duration.
pub struct SqliteNoteRepository {
    conn: Mutex<Connection>,
}

impl SqliteNoteRepository {
    /// Opens (creating if needed) and migrates the store described by `config`.
    pub fn open(config: &StoreConfig) -> StoreResult<Self> {
        let conn = open_store(config)?;
        Self::try_new(conn)
    }

    /// Wraps an already migrated connection.
    pub fn try_new(conn: Connection) -> StoreResult<Self> {
        ensure_connection_ready(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Releases the connection, reporting any error SQLite raises on close.
    pub fn close(self) -> StoreResult<()> {
        let conn = self
            .conn
            .into_inner()
            .unwrap_or_else(PoisonError::into_inner);
        conn.close().map_err(|(_, err)| StoreError::from(err))?;
        info!("event=db_close module=repo status=ok");
        Ok(())
    }

    fn lock(&self) -> MutexGuard<'_, Connection> {
        // A panic mid-operation drops its transaction, which rolls back.
        self.conn.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl NoteRepository for SqliteNoteRepository {
    fn add_note(&self, note: &Note) -> StoreResult<NoteId> {
        note.validate()?;
        let now = now_millis();

        let mut conn = self.lock();
        let tx = conn
            .transaction_with_behavior(TransactionBehavior::Immediate)
            .map_err(StoreError::PersistenceFailed)?;

        match note.id {
            Some(id) => {
                if let Some(collection) = find_holder(&tx, id)? {
                    return Err(StoreError::IdInUse { id, collection });
                }
                tx.execute(
                    "INSERT INTO notes (id, title, content, created_at, updated_at)
                     VALUES (?1, ?2, ?3, ?4, ?4);",
                    params![id, note.title, note.content, now],
                )
                .map_err(StoreError::PersistenceFailed)?;
            }
            None => {
                tx.execute(
                    "INSERT INTO notes (title, content, created_at, updated_at)
                     VALUES (?1, ?2, ?3, ?3);",
                    params![note.title, note.content, now],
                )
                .map_err(StoreError::PersistenceFailed)?;
            }
        }

        let id = tx.last_insert_rowid();
        tx.commit().map_err(StoreError::PersistenceFailed)?;

        debug!("event=note_add module=repo status=ok id={id}");
        Ok(id)
    }

    fn get_note_from(&self, collection: Collection, id: NoteId) -> StoreResult<Note> {
        let conn = self.lock();
        read_note(&conn, collection, id)?.ok_or(StoreError::NotFound { id, collection })
    }

    fn list_notes(&self, collection: Collection) -> StoreResult<Vec<Note>> {
        let conn = self.lock();
        read_collection(&conn, collection)
    }

    fn recent_notes(&self, collection: Collection, limit: u32) -> StoreResult<Vec<Note>> {
        let conn = self.lock();
        let mut stmt = conn.prepare(&format!(
            "SELECT {NOTE_COLUMNS}
             FROM {}
             ORDER BY updated_at DESC, id DESC
             LIMIT ?1;",
            collection.table()
        ))?;
        let rows = stmt.query_map([i64::from(limit)], note_from_row)?;
        collect_valid(rows, collection)
    }

    fn count_notes(&self, collection: Collection) -> StoreResult<u64> {
        let conn = self.lock();
        let count: i64 = conn.query_row(
            &format!("SELECT COUNT(*) FROM {};", collection.table()),
            [],
            |row| row.get(0),
        )?;
        u64::try_from(count)
            .map_err(|_| StoreError::InvalidData(format!("negative row count {count}")))
    }

    fn snapshot(&self) -> StoreResult<CollectionSnapshot> {
        let mut conn = self.lock();
        let tx = conn.transaction()?;
        let snapshot = CollectionSnapshot {
            active: read_collection(&tx, Collection::Active)?,
            trash: read_collection(&tx, Collection::Trash)?,
            archive: read_collection(&tx, Collection::Archive)?,
        };
        tx.commit()?;
        Ok(snapshot)
    }

    fn update_note(&self, note: &Note) -> StoreResult<Note> {
        let id = note.note_id()?;
        let now = now_millis();

        let conn = self.lock();
        let updated = conn
            .query_row(
                &format!(
                    "UPDATE notes
                     SET title = ?1, content = ?2, updated_at = MAX(?3, updated_at)
                     WHERE id = ?4
                     RETURNING {NOTE_COLUMNS};"
                ),
                params![note.title, note.content, now, id],
                note_from_row,
            )
            .optional()
            .map_err(StoreError::PersistenceFailed)?
            .ok_or(StoreError::NotFound {
                id,
                collection: Collection::Active,
            })?;

        debug!("event=note_update module=repo status=ok id={id}");
        Ok(updated)
    }

    fn transfer(&self, id: NoteId, transition: Transition) -> StoreResult<Note> {
        let from = transition.source();
        let to = transition.destination();

        let mut conn = self.lock();
        let tx = conn
            .transaction_with_behavior(TransactionBehavior::Immediate)
            .map_err(StoreError::PersistenceFailed)?;

        let note = read_note(&tx, from, id)?.ok_or(StoreError::NotFound {
            id,
            collection: from,
        })?;

        tx.execute(
            &format!(
                "INSERT INTO {} ({NOTE_COLUMNS}) VALUES (?1, ?2, ?3, ?4, ?5);",
                to.table()
            ),
            params![id, note.title, note.content, note.created_at, note.updated_at],
        )
        .map_err(StoreError::PersistenceFailed)?;

        // Returning early drops `tx`, which rolls the destination insert back.
        let removed = tx
            .execute(
                &format!("DELETE FROM {} WHERE id = ?1;", from.table()),
                [id],
            )
            .map_err(|source| partial_move(id, from, to, Some(source)))?;
        if removed != 1 {
            return Err(partial_move(id, from, to, None));
        }

        tx.commit().map_err(StoreError::PersistenceFailed)?;

        info!("event=note_move module=repo status=ok id={id} from={from} to={to}");
        Ok(note)
    }

    fn purge_note_by_id(&self, id: NoteId) -> StoreResult<()> {
        let conn = self.lock();
        let removed = conn
            .execute("DELETE FROM trash WHERE id = ?1;", [id])
            .map_err(StoreError::PersistenceFailed)?;
        if removed == 0 {
            return Err(StoreError::NotFound {
                id,
                collection: Collection::Trash,
            });
        }

        info!("event=note_purge module=repo status=ok id={id}");
        Ok(())
    }

    fn purge_collection(&self, collection: Collection) -> StoreResult<usize> {
        let conn = self.lock();
        let removed = conn
            .execute(&format!("DELETE FROM {};", collection.table()), [])
            .map_err(StoreError::PersistenceFailed)?;

        info!("event=collection_purge module=repo status=ok collection={collection} removed={removed}");
        Ok(removed)
    }

    fn reset_data(&self) -> StoreResult<()> {
        let mut conn = self.lock();
        let tx = conn
            .transaction_with_behavior(TransactionBehavior::Immediate)
            .map_err(StoreError::PersistenceFailed)?;
        for collection in Collection::ALL {
            tx.execute(&format!("DELETE FROM {};", collection.table()), [])
                .map_err(StoreError::PersistenceFailed)?;
        }
        // Restart id assignment so a reset store hands out ids from 1 again.
        tx.execute(
            "DELETE FROM sqlite_sequence WHERE name IN ('notes', 'trash', 'archive');",
            [],
        )
        .map_err(StoreError::PersistenceFailed)?;
        tx.commit().map_err(StoreError::PersistenceFailed)?;

        info!("event=data_reset module=repo status=ok");
        Ok(())
    }
}

fn partial_move(
    id: NoteId,
    from: Collection,
    to: Collection,
    source: Option<rusqlite::Error>,
) -> StoreError {
    error!(
        "event=note_move module=repo status=error id={id} from={from} to={to} error_code=move_partially_failed"
    );
    StoreError::MovePartiallyFailed {
        id,
        from,
        to,
        source,
    }
}

fn note_from_row(row: &Row<'_>) -> rusqlite::Result<Note> {
    Ok(Note {
        id: Some(row.get("id")?),
        title: row.get("title")?,
        content: row.get("content")?,
        created_at: row.get::<_, TimestampMs>("created_at")?,
        updated_at: row.get::<_, TimestampMs>("updated_at")?,
    })
}

fn checked(note: Note, collection: Collection) -> StoreResult<Note> {
    note.validate().map_err(|err| {
        StoreError::InvalidData(format!("{collection} row {:?}: {err}", note.id))
    })?;
    Ok(note)
}

fn collect_valid(
    rows: impl Iterator<Item = rusqlite::Result<Note>>,
    collection: Collection,
) -> StoreResult<Vec<Note>> {
    let mut notes = Vec::new();
    for row in rows {
        notes.push(checked(row?, collection)?);
    }
    Ok(notes)
}

fn read_note(conn: &Connection, collection: Collection, id: NoteId) -> StoreResult<Option<Note>> {
    let note = conn
        .query_row(
            &format!(
                "SELECT {NOTE_COLUMNS} FROM {} WHERE id = ?1;",
                collection.table()
            ),
            [id],
            note_from_row,
        )
        .optional()?;
    note.map(|note| checked(note, collection)).transpose()
}

fn read_collection(conn: &Connection, collection: Collection) -> StoreResult<Vec<Note>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {NOTE_COLUMNS} FROM {} ORDER BY id ASC;",
        collection.table()
    ))?;
    let rows = stmt.query_map([], note_from_row)?;
    collect_valid(rows, collection)
}

fn find_holder(conn: &Connection, id: NoteId) -> StoreResult<Option<Collection>> {
    for collection in Collection::ALL {
        let exists: i64 = conn.query_row(
            &format!(
                "SELECT EXISTS(SELECT 1 FROM {} WHERE id = ?1);",
                collection.table()
            ),
            [id],
            |row| row.get(0),
        )?;
        if exists == 1 {
            return Ok(Some(collection));
        }
    }
    Ok(None)
}

fn ensure_connection_ready(conn: &Connection) -> StoreResult<()> {
    let version = current_version(conn)?;
    if version == 0 {
        return Err(StoreError::UninitializedConnection {
            actual_version: version,
        });
    }

    for collection in Collection::ALL {
        let table = collection.table();
        let exists: i64 = conn.query_row(
            "SELECT EXISTS(
                SELECT 1
                FROM sqlite_master
                WHERE type = 'table' AND name = ?1
            );",
            [table],
            |row| row.get(0),
        )?;
        if exists != 1 {
            return Err(StoreError::MissingRequiredTable(table));
        }
    }

    Ok(())
}
