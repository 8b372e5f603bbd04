//! External text-generation capability and its bounded retry wrapper.
//!
//! # Responsibility
//! - Define the black-box completion seam (`CompletionProvider`).
//! - Retry failed attempts with linear backoff (1s, 2s, ...), suspending only
//!   the calling task between attempts.
//!
//! # Invariants
//! - At most `max_attempts` provider calls per `complete`.
//! - The wait after attempt `i` (0-based) is `(i + 1) * 1000ms`; there is no
//!   wait after the final attempt.
//! - Success returns immediately and discards earlier errors.
//! - Exhaustion carries the last observed cause.

use async_trait::async_trait;
use log::{error, warn};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::time::Duration;

/// Backoff increment per attempt.
pub const BACKOFF_STEP: Duration = Duration::from_millis(1_000);

/// Raw completion returned by a provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Completion {
    pub text: String,
}

impl Completion {
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }
}

/// Completion failures.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CompletionError {
    /// One provider attempt failed.
    Transient(String),
    /// Every attempt failed. `cause` is `None` only when no attempt ran.
    Exhausted {
        attempts: u32,
        cause: Option<Box<CompletionError>>,
    },
}

impl CompletionError {
    pub fn transient(message: impl Into<String>) -> Self {
        Self::Transient(message.into())
    }

    /// The last per-attempt failure behind an exhaustion, or `self`.
    pub fn root_cause(&self) -> &CompletionError {
        match self {
            Self::Exhausted {
                cause: Some(cause), ..
            } => cause.root_cause(),
            other => other,
        }
    }
}

impl Display for CompletionError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Transient(message) => write!(f, "{message}"),
            Self::Exhausted {
                attempts,
                cause: Some(cause),
            } => write!(f, "completion failed after {attempts} attempts: {cause}"),
            Self::Exhausted { attempts, cause: None } => {
                write!(f, "completion exhausted attempts ({attempts})")
            }
        }
    }
}

impl Error for CompletionError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Exhausted {
                cause: Some(cause), ..
            } => Some(cause.as_ref()),
            _ => None,
        }
    }
}

/// Black-box text generation capability.
///
/// No determinism or schema adherence is expected from `text`.
#[async_trait]
pub trait CompletionProvider: Send + Sync {
    /// Model identifier reported by health checks.
    fn model(&self) -> &str;

    async fn generate(&self, prompt: &str) -> Result<Completion, CompletionError>;
}

/// Suspension primitive used between attempts.
#[async_trait]
pub trait Sleeper: Send + Sync {
    async fn sleep(&self, delay: Duration);
}

/// Timer-future sleeper; parks the task, never the worker thread.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioSleeper;

#[async_trait]
impl Sleeper for TokioSleeper {
    async fn sleep(&self, delay: Duration) {
        tokio::time::sleep(delay).await;
    }
}

/// Wait before retrying after the 0-based `attempt_index`.
pub fn backoff_delay(attempt_index: u32) -> Duration {
    BACKOFF_STEP.saturating_mul(attempt_index.saturating_add(1))
}

/// Retry-with-backoff wrapper around a completion provider.
pub struct RetryingCompletion<P, S = TokioSleeper> {
    provider: P,
    sleeper: S,
}

impl<P: CompletionProvider> RetryingCompletion<P, TokioSleeper> {
    pub fn new(provider: P) -> Self {
        Self::with_sleeper(provider, TokioSleeper)
    }
}

impl<P: CompletionProvider, S: Sleeper> RetryingCompletion<P, S> {
    pub fn with_sleeper(provider: P, sleeper: S) -> Self {
        Self { provider, sleeper }
    }

    pub fn provider(&self) -> &P {
        &self.provider
    }

    /// Runs `prompt` through the provider, retrying up to `max_attempts`.
    ///
    /// # Errors
    /// - [`CompletionError::Exhausted`] with the last cause when every
    ///   attempt failed, or without a cause when `max_attempts == 0`.
    pub async fn complete(&self, prompt: &str, max_attempts: u32) -> Result<String, CompletionError> {
        let mut last_error: Option<CompletionError> = None;

        for attempt_index in 0..max_attempts {
            match self.provider.generate(prompt).await {
                Ok(completion) => return Ok(completion.text),
                Err(err) => {
                    warn!(
                        "event=completion_attempt module=ai status=error model={} attempt={} max_attempts={} error={}",
                        self.provider.model(),
                        attempt_index + 1,
                        max_attempts,
                        err
                    );
                    last_error = Some(err);
                }
            }

            if attempt_index + 1 < max_attempts {
                self.sleeper.sleep(backoff_delay(attempt_index)).await;
            }
        }

        error!(
            "event=completion_exhausted module=ai status=error model={} attempts={}",
            self.provider.model(),
            max_attempts
        );
        Err(CompletionError::Exhausted {
            attempts: max_attempts,
            cause: last_error.map(Box::new),
        })
    }
}
