//! Owner-scoped note persistence.
//!
//! Only the operations the AI flows need: create (for seeding), owner-scoped
//! lookup, summary write-back and label listing.

use crate::model::label::Label;
use crate::model::note::{NoteId, NoteRecord};
use crate::repo::{ensure_tables, parse_uuid, RepoError, RepoResult};
use rusqlite::{params, Connection, Row};
use uuid::Uuid;

/// Data-access contract for notes.
pub trait NoteRepository {
    /// Inserts a note owned by `owner_id` and returns the stored record.
    fn create_note(
        &self,
        owner_id: &str,
        title: &str,
        content: Option<&str>,
    ) -> RepoResult<NoteRecord>;
    /// Finds a note only when it belongs to `owner_id`.
    fn find_note(&self, id: NoteId, owner_id: &str) -> RepoResult<Option<NoteRecord>>;
    /// Stores a generated summary on an existing note.
    fn set_summary(&self, id: NoteId, summary: &str) -> RepoResult<()>;
    /// Labels linked to a note, sorted by name.
    fn list_note_labels(&self, id: NoteId) -> RepoResult<Vec<Label>>;
}

/// SQLite-backed note repository.
pub struct SqliteNoteRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteNoteRepository<'conn> {
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_tables(conn, &["notes", "labels", "note_labels"])?;
        Ok(Self { conn })
    }
}

impl NoteRepository for SqliteNoteRepository<'_> {
    fn create_note(
        &self,
        owner_id: &str,
        title: &str,
        content: Option<&str>,
    ) -> RepoResult<NoteRecord> {
        if owner_id.trim().is_empty() {
            return Err(RepoError::InvalidData("owner_id must not be empty".to_string()));
        }
        let id = Uuid::new_v4();
        self.conn.execute(
            "INSERT INTO notes (id, owner_id, title, content) VALUES (?1, ?2, ?3, ?4);",
            params![id.to_string(), owner_id, title, content],
        )?;
        self.find_note(id, owner_id)?.ok_or(RepoError::NotFound(id))
    }

    fn find_note(&self, id: NoteId, owner_id: &str) -> RepoResult<Option<NoteRecord>> {
        find_owned_note(self.conn, id, owner_id)
    }

    fn set_summary(&self, id: NoteId, summary: &str) -> RepoResult<()> {
        let changed = self.conn.execute(
            "UPDATE notes
             SET summary = ?2,
                 updated_at = (strftime('%s', 'now') * 1000)
             WHERE id = ?1;",
            params![id.to_string(), summary],
        )?;
        if changed == 0 {
            return Err(RepoError::NotFound(id));
        }
        Ok(())
    }

    fn list_note_labels(&self, id: NoteId) -> RepoResult<Vec<Label>> {
        load_labels(self.conn, &id.to_string())
    }
}

pub(crate) fn find_owned_note(
    conn: &Connection,
    id: NoteId,
    owner_id: &str,
) -> RepoResult<Option<NoteRecord>> {
    let mut stmt = conn.prepare(
        "SELECT id, owner_id, title, content, summary, updated_at
         FROM notes
         WHERE id = ?1 AND owner_id = ?2;",
    )?;
    let mut rows = stmt.query(params![id.to_string(), owner_id])?;
    let Some(row) = rows.next()? else {
        return Ok(None);
    };

    let id_text: String = row.get("id")?;
    let labels = load_labels(conn, &id_text)?;
    Ok(Some(parse_note_row(row, &id_text, labels)?))
}

fn parse_note_row(row: &Row<'_>, id_text: &str, labels: Vec<Label>) -> RepoResult<NoteRecord> {
    Ok(NoteRecord {
        id: parse_uuid(id_text, "notes.id")?,
        owner_id: row.get("owner_id")?,
        title: row.get("title")?,
        content: row.get("content")?,
        summary: row.get("summary")?,
        updated_at: row.get("updated_at")?,
        labels,
    })
}

fn load_labels(conn: &Connection, note_id: &str) -> RepoResult<Vec<Label>> {
    let mut stmt = conn.prepare(
        "SELECT l.id, l.owner_id, l.name, l.color
         FROM note_labels nl
         INNER JOIN labels l ON l.id = nl.label_id
         WHERE nl.note_id = ?1
         ORDER BY l.name COLLATE NOCASE ASC;",
    )?;
    let mut rows = stmt.query([note_id])?;
    let mut labels = Vec::new();
    while let Some(row) = rows.next()? {
        let id_text: String = row.get("id")?;
        labels.push(Label {
            id: parse_uuid(&id_text, "labels.id")?,
            owner_id: row.get("owner_id")?,
            name: row.get("name")?,
            color: row.get("color")?,
        });
    }
    Ok(labels)
}
