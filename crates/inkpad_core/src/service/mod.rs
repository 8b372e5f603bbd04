//! Use-case services over repositories and the completion provider.
//!
//! # Responsibility
//! - `label_reconciler`: idempotent create-or-reuse-and-link of labels.
//! - `assistant_service`: tagging, summarizing, chat and health check flows.

pub mod assistant_service;
pub mod label_reconciler;

pub use assistant_service::{
    AssistantError, AssistantService, ChatOutcome, PingOutcome, SummaryOutcome, TagsOutcome,
};
pub use label_reconciler::{LabelReconciler, ReconcileError};
