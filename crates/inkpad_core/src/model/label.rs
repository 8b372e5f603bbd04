//! Label (tag) records.
//!
//! # Invariants
//! - A label is unique per `(owner_id, name)`, compared case-insensitively.
//! - An association is unique per `(note_id, label_id)`.

use crate::model::note::NoteId;
use serde::Serialize;
use uuid::Uuid;

/// Stable label identifier.
pub type LabelId = Uuid;

/// Default display color assigned to newly created labels.
pub const DEFAULT_LABEL_COLOR: &str = "#6b7280";

/// Persisted, owner-scoped classification string.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Label {
    pub id: LabelId,
    #[serde(skip_serializing)]
    pub owner_id: String,
    pub name: String,
    pub color: String,
}

/// Link between one note and one label.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LabelAssociation {
    pub note_id: NoteId,
    pub label_id: LabelId,
}
