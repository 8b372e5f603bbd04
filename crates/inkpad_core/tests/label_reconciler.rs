use inkpad_core::db::open_db_in_memory;
use inkpad_core::model::label::{LabelAssociation, DEFAULT_LABEL_COLOR};
use inkpad_core::{
    LabelReconciler, LabelRepository, NoteRecord, NoteRepository, RepoError,
    SqliteLabelRepository, SqliteNoteRepository,
};
use rusqlite::Connection;
use uuid::Uuid;

fn names(values: &[&str]) -> Vec<String> {
    values.iter().map(|value| value.to_string()).collect()
}

fn seed_note(conn: &Connection, owner_id: &str) -> NoteRecord {
    SqliteNoteRepository::try_new(conn)
        .unwrap()
        .create_note(owner_id, "Weekly planning", Some("Plan the sprint and review metrics."))
        .unwrap()
}

#[test]
fn reconciling_twice_keeps_one_label_and_link_per_name() {
    let conn = open_db_in_memory().unwrap();
    let note = seed_note(&conn, "owner-1");
    let reconciler = LabelReconciler::new(SqliteLabelRepository::try_new(&conn).unwrap());
    let input = names(&["planning", "work"]);

    let first = reconciler.reconcile("owner-1", note.id, &input).unwrap();
    let second = reconciler.reconcile("owner-1", note.id, &input).unwrap();

    assert_eq!(first, second);
    let repo = SqliteLabelRepository::try_new(&conn).unwrap();
    assert_eq!(repo.count_labels("owner-1").unwrap(), 2);
    assert_eq!(repo.count_associations(note.id).unwrap(), 2);
}

#[test]
fn duplicate_names_in_one_batch_collapse() {
    let conn = open_db_in_memory().unwrap();
    let note = seed_note(&conn, "owner-1");
    let reconciler = LabelReconciler::new(SqliteLabelRepository::try_new(&conn).unwrap());

    let labels = reconciler
        .reconcile("owner-1", note.id, &names(&["alpha", "beta", "beta"]))
        .unwrap();

    let stored: Vec<&str> = labels.iter().map(|label| label.name.as_str()).collect();
    assert_eq!(stored, vec!["alpha", "beta"]);
    let repo = SqliteLabelRepository::try_new(&conn).unwrap();
    assert_eq!(repo.count_labels("owner-1").unwrap(), 2);
    assert_eq!(repo.count_associations(note.id).unwrap(), 2);
}

#[test]
fn names_match_existing_labels_ignoring_case_and_keep_first_casing() {
    let conn = open_db_in_memory().unwrap();
    let note = seed_note(&conn, "owner-1");
    let reconciler = LabelReconciler::new(SqliteLabelRepository::try_new(&conn).unwrap());

    reconciler
        .reconcile("owner-1", note.id, &names(&["Rust"]))
        .unwrap();
    let labels = reconciler
        .reconcile("owner-1", note.id, &names(&["rust", " RUST "]))
        .unwrap();

    assert_eq!(labels.len(), 1);
    assert_eq!(labels[0].name, "Rust");
    assert_eq!(labels[0].color, DEFAULT_LABEL_COLOR);
}

#[test]
fn labels_are_scoped_per_owner() {
    let conn = open_db_in_memory().unwrap();
    let first = seed_note(&conn, "owner-1");
    let second = seed_note(&conn, "owner-2");
    let reconciler = LabelReconciler::new(SqliteLabelRepository::try_new(&conn).unwrap());

    let mine = reconciler
        .reconcile("owner-1", first.id, &names(&["shared"]))
        .unwrap();
    let theirs = reconciler
        .reconcile("owner-2", second.id, &names(&["shared"]))
        .unwrap();

    assert_ne!(mine[0].id, theirs[0].id);
}

#[test]
fn failure_stops_processing_and_keeps_earlier_names() {
    let conn = open_db_in_memory().unwrap();
    let note = seed_note(&conn, "owner-1");
    let reconciler = LabelReconciler::new(SqliteLabelRepository::try_new(&conn).unwrap());

    let err = reconciler
        .reconcile("owner-1", note.id, &names(&["alpha", "   ", "gamma"]))
        .unwrap_err();

    assert_eq!(err.reconciled, 1);
    assert_eq!(err.name, "   ");
    assert!(matches!(err.source, RepoError::InvalidData(_)));

    let linked = SqliteNoteRepository::try_new(&conn)
        .unwrap()
        .list_note_labels(note.id)
        .unwrap();
    let linked: Vec<&str> = linked.iter().map(|label| label.name.as_str()).collect();
    assert_eq!(linked, vec!["alpha"]);
}

#[test]
fn linking_to_a_missing_note_fails_after_label_upsert() {
    let conn = open_db_in_memory().unwrap();
    let reconciler = LabelReconciler::new(SqliteLabelRepository::try_new(&conn).unwrap());
    let missing = Uuid::new_v4();

    let err = reconciler
        .reconcile("owner-1", missing, &names(&["orphan"]))
        .unwrap_err();

    assert_eq!(err.reconciled, 0);
    assert!(matches!(err.source, RepoError::NotFound(id) if id == missing));
    let repo = SqliteLabelRepository::try_new(&conn).unwrap();
    assert_eq!(repo.count_labels("owner-1").unwrap(), 1);
}

#[test]
fn empty_name_list_is_a_no_op() {
    let conn = open_db_in_memory().unwrap();
    let note = seed_note(&conn, "owner-1");
    let reconciler = LabelReconciler::new(SqliteLabelRepository::try_new(&conn).unwrap());

    assert!(reconciler.reconcile("owner-1", note.id, &[]).unwrap().is_empty());
    let repo = SqliteLabelRepository::try_new(&conn).unwrap();
    assert_eq!(repo.count_associations(note.id).unwrap(), 0);
}

#[test]
fn repository_upserts_are_idempotent() {
    let conn = open_db_in_memory().unwrap();
    let note = seed_note(&conn, "owner-1");
    let repo = SqliteLabelRepository::try_new(&conn).unwrap();

    let first = repo.upsert_label("owner-1", "  Focus ").unwrap();
    let again = repo.upsert_label("owner-1", "focus").unwrap();
    assert_eq!(first, again);
    assert_eq!(first.name, "Focus");

    let link = repo.upsert_association(note.id, first.id).unwrap();
    assert_eq!(
        link,
        LabelAssociation {
            note_id: note.id,
            label_id: first.id
        }
    );
    assert_eq!(repo.upsert_association(note.id, first.id).unwrap(), link);
    assert_eq!(repo.count_associations(note.id).unwrap(), 1);
    assert!(repo.find_content_item(note.id, "owner-2").unwrap().is_none());
}
