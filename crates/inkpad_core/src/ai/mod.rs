//! AI orchestration primitives: prompt budgeting, governed completion calls
//! and completion decoding.

pub mod completion;
pub mod decoder;
pub mod normalizer;
pub mod prompts;

pub use completion::{
    Completion, CompletionError, CompletionProvider, RetryingCompletion, Sleeper, TokioSleeper,
};
pub use decoder::{decode, LabelCandidate, ParsedResponse};
pub use normalizer::{truncate, NormalizedText};
