//! Prompt templates for the assistant flows.

use crate::model::note::NoteRecord;

/// Health-check prompt; expects a short literal reply.
pub const PING_PROMPT: &str = "Reply with \"pong\".";

/// Preamble used when a chat message is not tied to a note.
pub const GENERAL_CHAT_CONTEXT: &str =
    "You are a helpful assistant for a note-taking app. Help the user with their questions.\n\n";

pub fn tags_prompt(text: &str) -> String {
    format!(
        "Analyze the following text and suggest 3-6 short, relevant tags (single words or short phrases). \
         Return ONLY a JSON array of strings, nothing else.\n\nText:\n{text}"
    )
}

pub fn summarize_prompt(text: &str, was_truncated: bool) -> String {
    let notice = if was_truncated {
        "(Note: this is the beginning of a longer document)"
    } else {
        ""
    };
    format!("Summarize the following text in 3-5 clear bullet points. {notice}\n\n{text}")
}

/// Chat context built from one note; `body` is the already-truncated note text.
pub fn note_chat_context(note: &NoteRecord, body: &str) -> String {
    let tags = note
        .labels
        .iter()
        .map(|label| label.name.as_str())
        .collect::<Vec<_>>()
        .join(", ");
    format!(
        "You are a helpful assistant with access to the user's note.\n\n\
         Note Title: {title}\n\
         Tags: {tags}\n\
         Summary: {summary}\n\n\
         Note Content (truncated if long):\n{body}\n\n---\n",
        title = note.title,
        tags = if tags.is_empty() { "none" } else { tags.as_str() },
        summary = note.summary.as_deref().unwrap_or("No summary available"),
    )
}

pub fn chat_prompt(context: &str, message: &str) -> String {
    format!("{context}User Question: {message}\n\nProvide a helpful, concise response:")
}
