//! AI assistant use-cases over notes.
//!
//! # Responsibility
//! - Run the per-request pipeline: normalize → governed completion →
//!   decode → reconcile (tagging), or write back (summaries).
//! - Translate persistence and completion failures into [`AssistantError`].
//!
//! # Invariants
//! - The connection mutex is only held inside synchronous blocks, never
//!   across a completion `.await`.
//! - Note lookups are always owner-scoped; foreign notes read as not found.

use crate::ai::completion::{CompletionError, CompletionProvider, RetryingCompletion, Sleeper};
use crate::ai::decoder::decode;
use crate::ai::normalizer::truncate;
use crate::ai::prompts::{
    chat_prompt, note_chat_context, summarize_prompt, tags_prompt, GENERAL_CHAT_CONTEXT,
    PING_PROMPT,
};
use crate::ai::TokioSleeper;
use crate::config::AssistantConfig;
use crate::model::label::Label;
use crate::model::note::{NoteId, NoteRecord};
use crate::repo::label_repo::{LabelRepository, SqliteLabelRepository};
use crate::repo::note_repo::{NoteRepository, SqliteNoteRepository};
use crate::repo::RepoError;
use crate::service::label_reconciler::{LabelReconciler, ReconcileError};
use chrono::{SecondsFormat, Utc};
use log::{info, warn};
use rusqlite::Connection;
use serde::Serialize;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::sync::{Arc, Mutex, PoisonError};

/// Assistant use-case failures.
#[derive(Debug)]
pub enum AssistantError {
    NoteNotFound(NoteId),
    /// Request is well-formed but unusable (empty note, blank message, ...).
    InvalidInput(&'static str),
    /// The completion decoded to zero usable labels.
    NoLabels,
    Completion(CompletionError),
    Reconcile(ReconcileError),
    Repo(RepoError),
}

impl AssistantError {
    /// HTTP-status-like code for this failure.
    pub fn status_code(&self) -> u16 {
        match self {
            Self::NoteNotFound(_) => 404,
            Self::InvalidInput(_) => 400,
            Self::NoLabels | Self::Completion(_) | Self::Reconcile(_) | Self::Repo(_) => 500,
        }
    }
}

impl Display for AssistantError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NoteNotFound(_) => write!(f, "Note not found"),
            Self::InvalidInput(message) => write!(f, "{message}"),
            Self::NoLabels => write!(f, "Could not generate tags"),
            Self::Completion(err) => write!(f, "{err}"),
            Self::Reconcile(err) => write!(f, "{err}"),
            Self::Repo(err) => write!(f, "{err}"),
        }
    }
}

impl Error for AssistantError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Completion(err) => Some(err),
            Self::Reconcile(err) => Some(err),
            Self::Repo(err) => Some(err),
            _ => None,
        }
    }
}

impl From<CompletionError> for AssistantError {
    fn from(value: CompletionError) -> Self {
        Self::Completion(value)
    }
}

impl From<ReconcileError> for AssistantError {
    fn from(value: ReconcileError) -> Self {
        Self::Reconcile(value)
    }
}

impl From<RepoError> for AssistantError {
    fn from(value: RepoError) -> Self {
        match value {
            RepoError::NotFound(id) => Self::NoteNotFound(id),
            other => Self::Repo(other),
        }
    }
}

/// Labels linked by one tagging run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TagsOutcome {
    pub tags: Vec<Label>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SummaryOutcome {
    pub summary: String,
    pub was_truncated: bool,
    pub original_length: usize,
    pub processed_length: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatOutcome {
    pub answer: String,
    pub note_id: Option<NoteId>,
    /// RFC 3339 UTC timestamp of the answer.
    pub timestamp: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PingOutcome {
    pub ok: bool,
    pub model: String,
    pub reply: String,
}

/// Assistant flows over a shared SQLite connection and a completion provider.
pub struct AssistantService<P, S = TokioSleeper> {
    conn: Arc<Mutex<Connection>>,
    completion: RetryingCompletion<P, S>,
    config: AssistantConfig,
}

impl<P: CompletionProvider, S: Sleeper> AssistantService<P, S> {
    pub fn new(
        conn: Arc<Mutex<Connection>>,
        completion: RetryingCompletion<P, S>,
        config: AssistantConfig,
    ) -> Self {
        Self {
            conn,
            completion,
            config,
        }
    }

    pub fn config(&self) -> &AssistantConfig {
        &self.config
    }

    /// Suggests labels for a note and links them idempotently.
    ///
    /// # Errors
    /// - `NoteNotFound` for missing or foreign notes.
    /// - `InvalidInput` when title + body is shorter than the configured minimum.
    /// - `Completion` after the retry ceiling, `NoLabels` when nothing decodes,
    ///   `Reconcile` when a label upsert fails part-way.
    pub async fn generate_tags(
        &self,
        owner_id: &str,
        note_id: NoteId,
    ) -> Result<TagsOutcome, AssistantError> {
        let note = self.owned_note(owner_id, note_id)?;
        let source = note.prompt_source();
        if source.trim().chars().count() < self.config.min_tag_source_chars {
            return Err(AssistantError::InvalidInput(
                "Note too short to generate tags",
            ));
        }

        let text = truncate(&source, self.config.tags.max_chars);
        let raw = self
            .completion
            .complete(&tags_prompt(&text.body), self.config.max_attempts)
            .await?;

        let names = decode(&raw);
        info!(
            "event=labels_decoded module=service note_id={} raw_chars={} labels={}",
            note.id,
            raw.chars().count(),
            names.len()
        );
        if names.is_empty() {
            warn!(
                "event=assistant_tags module=service status=empty note_id={}",
                note.id
            );
            return Err(AssistantError::NoLabels);
        }

        let tags = self.with_conn(|conn| {
            let reconciler = LabelReconciler::new(SqliteLabelRepository::try_new(conn)?);
            Ok(reconciler.reconcile(owner_id, note.id, &names)?)
        })?;

        info!(
            "event=assistant_tags module=service status=ok note_id={} labels={} truncated={}",
            note.id,
            tags.len(),
            text.was_truncated
        );
        Ok(TagsOutcome { tags })
    }

    /// Summarizes a note body and stores the summary on the note.
    pub async fn summarize(
        &self,
        owner_id: &str,
        note_id: NoteId,
    ) -> Result<SummaryOutcome, AssistantError> {
        let note = self.owned_note(owner_id, note_id)?;
        let content = note.content.as_deref().unwrap_or("");
        if content.trim().is_empty() {
            return Err(AssistantError::InvalidInput("Note content is empty"));
        }

        let text = truncate(content, self.config.summarize.max_chars);
        let summary = self
            .completion
            .complete(
                &summarize_prompt(&text.body, text.was_truncated),
                self.config.max_attempts,
            )
            .await?;

        self.with_conn(|conn| {
            SqliteNoteRepository::try_new(conn)?.set_summary(note.id, &summary)?;
            Ok(())
        })?;

        info!(
            "event=assistant_summarize module=service status=ok note_id={} original_length={} processed_length={}",
            note.id, text.original_length, text.processed_length
        );
        Ok(SummaryOutcome {
            summary,
            was_truncated: text.was_truncated,
            original_length: text.original_length,
            processed_length: text.processed_length,
        })
    }

    /// Answers a message, optionally grounded in one of the owner's notes.
    ///
    /// Without `note_id` the general assistant preamble is used; a `note_id`
    /// that does not resolve for `owner_id` gets no context at all.
    pub async fn chat(
        &self,
        owner_id: &str,
        message: &str,
        note_id: Option<NoteId>,
    ) -> Result<ChatOutcome, AssistantError> {
        let message = message.trim();
        if message.is_empty() {
            return Err(AssistantError::InvalidInput("Message is required"));
        }

        let note = match note_id {
            Some(id) => self.with_conn(|conn| {
                Ok(SqliteNoteRepository::try_new(conn)?.find_note(id, owner_id)?)
            })?,
            None => None,
        };
        // An unresolved note id sends the bare question, without the general preamble.
        let context = match (&note, note_id) {
            (Some(note), _) => {
                let body = truncate(&note.prompt_source(), self.config.chat.max_chars);
                note_chat_context(note, &body.body)
            }
            (None, Some(_)) => String::new(),
            (None, None) => GENERAL_CHAT_CONTEXT.to_string(),
        };

        let answer = self
            .completion
            .complete(&chat_prompt(&context, message), self.config.max_attempts)
            .await?;

        info!(
            "event=assistant_chat module=service status=ok grounded={} answer_chars={}",
            note.is_some(),
            answer.chars().count()
        );
        Ok(ChatOutcome {
            answer,
            note_id,
            timestamp: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
        })
    }

    /// Single unretried round-trip to the provider.
    pub async fn ping(&self) -> Result<PingOutcome, AssistantError> {
        let provider = self.completion.provider();
        let completion = provider.generate(PING_PROMPT).await?;
        Ok(PingOutcome {
            ok: true,
            model: provider.model().to_string(),
            reply: completion.text,
        })
    }

    fn owned_note(&self, owner_id: &str, note_id: NoteId) -> Result<NoteRecord, AssistantError> {
        self.with_conn(|conn| {
            Ok(SqliteLabelRepository::try_new(conn)?.find_content_item(note_id, owner_id)?)
        })?
        .ok_or(AssistantError::NoteNotFound(note_id))
    }

    fn with_conn<T>(
        &self,
        work: impl FnOnce(&Connection) -> Result<T, AssistantError>,
    ) -> Result<T, AssistantError> {
        let conn = self.conn.lock().unwrap_or_else(PoisonError::into_inner);
        work(&conn)
    }
}
