//! Core of the Inkpad AI assistant.
//!
//! Request governance (admission control and retried completions), prompt
//! budgeting, completion decoding and idempotent label persistence for a
//! note-taking application.

pub mod ai;
pub mod api;
pub mod config;
pub mod db;
pub mod governance;
pub mod logging;
pub mod model;
pub mod repo;
pub mod service;

pub use ai::{
    decode, truncate, Completion, CompletionError, CompletionProvider, NormalizedText,
    RetryingCompletion, Sleeper, TokioSleeper,
};
pub use api::{ApiRequest, ApiResponse, AssistantRoutes, RequestHandler};
pub use config::{AssistantConfig, ConfigError, FlowConfig, GovernancePolicy};
pub use db::{open_db, open_db_in_memory, DbError, DbResult};
pub use governance::{Clock, ManualClock, RateLimiter, RequestGovernor, SystemClock};
pub use logging::{default_log_level, init_logging, logging_status};
pub use model::label::{Label, LabelId};
pub use model::note::{NoteId, NoteRecord};
pub use repo::label_repo::{LabelRepository, SqliteLabelRepository};
pub use repo::note_repo::{NoteRepository, SqliteNoteRepository};
pub use repo::{RepoError, RepoResult};
pub use service::{AssistantError, AssistantService, LabelReconciler, ReconcileError};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
