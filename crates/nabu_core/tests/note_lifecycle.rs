use nabu_core::{
    Collection, Note, NoteRepository, SqliteNoteRepository, StoreConfig, StoreError,
};
use rusqlite::Connection;
use std::path::Path;

fn repo() -> SqliteNoteRepository {
    SqliteNoteRepository::open(&StoreConfig::in_memory()).unwrap()
}

fn ids(notes: &[Note]) -> Vec<i64> {
    notes.iter().map(|note| note.id.unwrap()).collect()
}

#[test]
fn delete_moves_note_to_trash() {
    let repo = repo();
    let id = repo
        .add_note(&Note::new("Note 1 title", "Simple note for testing! Nr.1"))
        .unwrap();

    repo.delete_note(id).unwrap();

    assert!(repo.get_all_notes().unwrap().is_empty());
    assert!(!repo.get_all_notes_from_trash().unwrap().is_empty());
}

#[test]
fn delete_keeps_every_field_verbatim() {
    let repo = repo();
    let id = repo.add_note(&Note::new("keep", "all fields")).unwrap();
    let original = repo.get_note(id).unwrap();

    let moved = repo.delete_note(&original).unwrap();
    let trashed = repo.get_all_notes_from_trash().unwrap();

    assert_eq!(moved, original);
    assert_eq!(trashed, vec![original]);
    assert!(matches!(
        repo.get_note(id).unwrap_err(),
        StoreError::NotFound { .. }
    ));
}

#[test]
fn restore_after_delete_round_trips() {
    let repo = repo();
    let id = repo.add_note(&Note::new("round", "trip")).unwrap();
    let original = repo.get_note(id).unwrap();

    repo.delete_note(id).unwrap();
    repo.restore_note(id).unwrap();

    assert_eq!(repo.get_note(id).unwrap(), original);
    assert!(repo.get_all_notes_from_trash().unwrap().is_empty());
}

#[test]
fn archive_and_unarchive_round_trip() {
    let repo = repo();
    let keep = repo.add_note(&Note::new("stays", "active")).unwrap();
    let id = repo.add_note(&Note::new("set", "aside")).unwrap();
    let original = repo.get_note(id).unwrap();

    repo.archive_note(original.clone()).unwrap();
    assert_eq!(ids(&repo.get_all_notes().unwrap()), vec![keep]);
    assert_eq!(repo.get_all_notes_from_archive().unwrap(), vec![original.clone()]);

    repo.unarchive_note(id).unwrap();
    assert_eq!(ids(&repo.get_all_notes().unwrap()), vec![keep, id]);
    assert_eq!(repo.get_note(id).unwrap(), original);
    assert!(repo.get_all_notes_from_archive().unwrap().is_empty());
}

#[test]
fn moves_fail_with_not_found_when_source_lacks_note() {
    let repo = repo();
    let id = repo.add_note(&Note::new("t", "c")).unwrap();

    assert!(matches!(
        repo.restore_note(id).unwrap_err(),
        StoreError::NotFound {
            collection: Collection::Trash,
            ..
        }
    ));
    assert!(matches!(
        repo.unarchive_note(id).unwrap_err(),
        StoreError::NotFound {
            collection: Collection::Archive,
            ..
        }
    ));

    repo.delete_note(id).unwrap();
    assert!(matches!(
        repo.delete_note(id).unwrap_err(),
        StoreError::NotFound {
            collection: Collection::Active,
            ..
        }
    ));
}

#[test]
fn archive_accepts_active_notes_only() {
    let repo = repo();
    let id = repo.add_note(&Note::new("t", "c")).unwrap();
    repo.delete_note(id).unwrap();

    let err = repo.archive_note(id).unwrap_err();
    assert!(matches!(
        err,
        StoreError::NotFound {
            collection: Collection::Active,
            ..
        }
    ));
    assert_eq!(ids(&repo.get_all_notes_from_trash().unwrap()), vec![id]);
    assert!(repo.get_all_notes_from_archive().unwrap().is_empty());
}

#[test]
fn note_without_id_cannot_be_moved() {
    let repo = repo();

    let err = repo.delete_note(Note::new("unsaved", "")).unwrap_err();
    assert!(matches!(err, StoreError::Validation(_)));
}

#[test]
fn empty_trash_is_idempotent() {
    let repo = repo();
    for idx in 0..3 {
        let id = repo.add_note(&Note::new(format!("n{idx}"), "c")).unwrap();
        repo.delete_note(id).unwrap();
    }

    assert_eq!(repo.empty_trash().unwrap(), 3);
    assert!(repo.get_all_notes_from_trash().unwrap().is_empty());
    assert_eq!(repo.empty_trash().unwrap(), 0);
    assert!(repo.get_all_notes_from_trash().unwrap().is_empty());
}

#[test]
fn empty_archive_leaves_other_collections_alone() {
    let repo = repo();
    let active = repo.add_note(&Note::new("a", "a")).unwrap();
    let trashed = repo.add_note(&Note::new("t", "t")).unwrap();
    let archived = repo.add_note(&Note::new("r", "r")).unwrap();
    repo.delete_note(trashed).unwrap();
    repo.archive_note(archived).unwrap();

    assert_eq!(repo.empty_archive().unwrap(), 1);

    let snapshot = repo.snapshot().unwrap();
    assert_eq!(ids(&snapshot.active), vec![active]);
    assert_eq!(ids(&snapshot.trash), vec![trashed]);
    assert!(snapshot.archive.is_empty());
}

#[test]
fn purge_note_removes_one_trashed_note() {
    let repo = repo();
    let first = repo.add_note(&Note::new("1", "1")).unwrap();
    let second = repo.add_note(&Note::new("2", "2")).unwrap();
    repo.delete_note(first).unwrap();
    repo.delete_note(second).unwrap();

    repo.purge_note(first).unwrap();

    assert_eq!(ids(&repo.get_all_notes_from_trash().unwrap()), vec![second]);
    assert!(matches!(
        repo.purge_note(first).unwrap_err(),
        StoreError::NotFound {
            collection: Collection::Trash,
            ..
        }
    ));
}

#[test]
fn reset_data_clears_all_collections() {
    let repo = repo();
    let a = repo.add_note(&Note::new("a", "a")).unwrap();
    let b = repo.add_note(&Note::new("b", "b")).unwrap();
    repo.add_note(&Note::new("c", "c")).unwrap();
    repo.delete_note(a).unwrap();
    repo.archive_note(b).unwrap();

    repo.reset_data().unwrap();

    for collection in Collection::ALL {
        assert_eq!(repo.count_notes(collection).unwrap(), 0);
    }
    // Schema is untouched, so the store stays usable.
    let id = repo.add_note(&Note::new("after", "reset")).unwrap();
    assert_eq!(repo.get_note(id).unwrap().content, "after");
}

#[test]
fn reset_data_restarts_id_assignment() {
    let repo = repo();
    let stale = repo.add_note(&Note::new("before", "reset")).unwrap();
    repo.delete_note(stale).unwrap();

    repo.reset_data().unwrap();

    let first = repo
        .add_note(&Note::new("Note 1 title", "This is content of note nr.1"))
        .unwrap();
    let second = repo
        .add_note(&Note::with_id(
            2,
            "Note 2 title",
            "Simple note for testing! Nr.2",
        ))
        .unwrap();

    assert_eq!(first, 1);
    assert_eq!(second, 2);
    assert_eq!(ids(&repo.get_all_notes().unwrap()), vec![1, 2]);
}

#[test]
fn failed_source_delete_rolls_back_the_move() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("partial.db");
    let repo = SqliteNoteRepository::open(&StoreConfig::file(&path)).unwrap();
    let id = repo.add_note(&Note::new("fragile", "body")).unwrap();

    install_trigger(
        &path,
        "CREATE TRIGGER block_delete BEFORE DELETE ON notes
         BEGIN SELECT RAISE(ABORT, 'delete blocked'); END;",
    );

    let err = repo.delete_note(id).unwrap_err();
    match err {
        StoreError::MovePartiallyFailed {
            id: failed,
            from,
            to,
            source,
        } => {
            assert_eq!(failed, id);
            assert_eq!(from, Collection::Active);
            assert_eq!(to, Collection::Trash);
            assert!(source.is_some());
        }
        other => panic!("unexpected error: {other}"),
    }

    let snapshot = repo.snapshot().unwrap();
    assert_eq!(ids(&snapshot.active), vec![id]);
    assert!(snapshot.trash.is_empty());
}

#[test]
fn silently_skipped_source_delete_is_reported() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("ignored.db");
    let repo = SqliteNoteRepository::open(&StoreConfig::file(&path)).unwrap();
    let id = repo.add_note(&Note::new("t", "c")).unwrap();
    repo.archive_note(id).unwrap();

    install_trigger(
        &path,
        "CREATE TRIGGER skip_delete BEFORE DELETE ON archive
         BEGIN SELECT RAISE(IGNORE); END;",
    );

    let err = repo.unarchive_note(id).unwrap_err();
    assert!(matches!(
        err,
        StoreError::MovePartiallyFailed {
            from: Collection::Archive,
            to: Collection::Active,
            source: None,
            ..
        }
    ));

    let snapshot = repo.snapshot().unwrap();
    assert!(snapshot.active.is_empty());
    assert_eq!(ids(&snapshot.archive), vec![id]);
}

fn install_trigger(path: &Path, sql: &str) {
    let conn = Connection::open(path).unwrap();
    conn.execute_batch(sql).unwrap();
}
