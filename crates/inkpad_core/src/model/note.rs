//! Note record as seen by the AI flows.

use crate::model::label::Label;
use serde::Serialize;
use uuid::Uuid;

/// Stable note identifier.
pub type NoteId = Uuid;

/// Owner-scoped note read model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NoteRecord {
    pub id: NoteId,
    /// Opaque owner identity resolved by the auth layer.
    pub owner_id: String,
    pub title: String,
    pub content: Option<String>,
    /// Last generated summary, if any.
    pub summary: Option<String>,
    /// Update timestamp in epoch milliseconds.
    pub updated_at: i64,
    /// Labels linked to this note, sorted by name.
    pub labels: Vec<Label>,
}

impl NoteRecord {
    /// Title and body joined the way the tagging and chat prompts expect.
    pub fn prompt_source(&self) -> String {
        format!("{}\n\n{}", self.title, self.content.as_deref().unwrap_or(""))
    }
}
