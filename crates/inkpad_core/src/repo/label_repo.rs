//! Label persistence with idempotent create-or-reuse semantics.
//!
//! # Invariants
//! - `upsert_label` never creates a second label for the same
//!   `(owner, name)`; names compare trimmed and case-insensitively, and the
//!   first stored casing wins.
//! - `upsert_association` is a no-op when the link already exists.

use crate::model::label::{Label, LabelAssociation, LabelId, DEFAULT_LABEL_COLOR};
use crate::model::note::{NoteId, NoteRecord};
use crate::repo::note_repo::find_owned_note;
use crate::repo::{ensure_tables, parse_uuid, RepoError, RepoResult};
use rusqlite::{params, Connection};
use uuid::Uuid;

/// Persistence capability consumed by the label reconciler.
pub trait LabelRepository {
    /// Owner-scoped content item lookup.
    fn find_content_item(&self, item_id: NoteId, owner_id: &str) -> RepoResult<Option<NoteRecord>>;
    /// Creates the label when absent, otherwise returns the existing one unchanged.
    ///
    /// New labels take [`DEFAULT_LABEL_COLOR`].
    fn upsert_label(&self, owner_id: &str, name: &str) -> RepoResult<Label>;
    /// Links a label to a content item; re-linking is a no-op.
    fn upsert_association(
        &self,
        item_id: NoteId,
        label_id: LabelId,
    ) -> RepoResult<LabelAssociation>;
}

/// SQLite-backed label repository.
pub struct SqliteLabelRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteLabelRepository<'conn> {
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_tables(conn, &["notes", "labels", "note_labels"])?;
        Ok(Self { conn })
    }

    /// Number of labels stored for `owner_id`.
    pub fn count_labels(&self, owner_id: &str) -> RepoResult<usize> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM labels WHERE owner_id = ?1;",
            [owner_id],
            |row| row.get(0),
        )?;
        Ok(usize::try_from(count).unwrap_or_default())
    }

    /// Number of label links stored for `item_id`.
    pub fn count_associations(&self, item_id: NoteId) -> RepoResult<usize> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM note_labels WHERE note_id = ?1;",
            [item_id.to_string()],
            |row| row.get(0),
        )?;
        Ok(usize::try_from(count).unwrap_or_default())
    }
}

impl LabelRepository for SqliteLabelRepository<'_> {
    fn find_content_item(&self, item_id: NoteId, owner_id: &str) -> RepoResult<Option<NoteRecord>> {
        find_owned_note(self.conn, item_id, owner_id)
    }

    fn upsert_label(&self, owner_id: &str, name: &str) -> RepoResult<Label> {
        let name = name.trim();
        if name.is_empty() {
            return Err(RepoError::InvalidData("label name must not be empty".to_string()));
        }

        self.conn.execute(
            "INSERT OR IGNORE INTO labels (id, owner_id, name, color) VALUES (?1, ?2, ?3, ?4);",
            params![Uuid::new_v4().to_string(), owner_id, name, DEFAULT_LABEL_COLOR],
        )?;

        let (id_text, stored_name, color): (String, String, String) = self.conn.query_row(
            "SELECT id, name, color
             FROM labels
             WHERE owner_id = ?1 AND name = ?2 COLLATE NOCASE;",
            params![owner_id, name],
            |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
        )?;

        Ok(Label {
            id: parse_uuid(&id_text, "labels.id")?,
            owner_id: owner_id.to_string(),
            name: stored_name,
            color,
        })
    }

    fn upsert_association(
        &self,
        item_id: NoteId,
        label_id: LabelId,
    ) -> RepoResult<LabelAssociation> {
        let item_text = item_id.to_string();
        let note_exists: i64 = self.conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM notes WHERE id = ?1);",
            [item_text.as_str()],
            |row| row.get(0),
        )?;
        if note_exists != 1 {
            return Err(RepoError::NotFound(item_id));
        }

        self.conn.execute(
            "INSERT OR IGNORE INTO note_labels (note_id, label_id) VALUES (?1, ?2);",
            params![item_text, label_id.to_string()],
        )?;
        Ok(LabelAssociation {
            note_id: item_id,
            label_id,
        })
    }
}
