//! Governance and AI flow configuration.
//!
//! # Responsibility
//! - Describe per-flow admission policies and prompt budgets.
//! - Load configuration from JSON with per-field defaults.
//!
//! # Invariants
//! - A validated config never carries a zero rate, window, budget or attempt
//!   ceiling, and never an empty scope.

use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::Path;

/// Default attempt ceiling for governed completion calls.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;
/// Default admission window in milliseconds.
pub const DEFAULT_WINDOW_MS: u64 = 60_000;
/// Minimum trimmed note length accepted by the tagging flow.
pub const DEFAULT_MIN_TAG_SOURCE_CHARS: usize = 50;

/// Admission policy for one governed operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GovernancePolicy {
    /// Admission scope; partitions rate-limit keys per operation.
    pub scope: String,
    /// Admissions allowed per window.
    pub rate: u32,
    /// Window length in milliseconds.
    pub window_ms: u64,
}

impl GovernancePolicy {
    pub fn new(scope: impl Into<String>, rate: u32, window_ms: u64) -> Self {
        Self {
            scope: scope.into(),
            rate,
            window_ms,
        }
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.scope.trim().is_empty() {
            return Err(ConfigError::EmptyScope);
        }
        if self.rate == 0 {
            return Err(ConfigError::ZeroRate(self.scope.clone()));
        }
        if self.window_ms == 0 {
            return Err(ConfigError::ZeroWindow(self.scope.clone()));
        }
        Ok(())
    }
}

impl Default for GovernancePolicy {
    fn default() -> Self {
        Self::new("global", 60, DEFAULT_WINDOW_MS)
    }
}

/// Policy plus prompt budget for one AI flow.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlowConfig {
    pub policy: GovernancePolicy,
    /// Character budget handed to the text normalizer.
    pub max_chars: usize,
}

impl FlowConfig {
    pub fn new(scope: &str, rate: u32, max_chars: usize) -> Self {
        Self {
            policy: GovernancePolicy::new(scope, rate, DEFAULT_WINDOW_MS),
            max_chars,
        }
    }

    fn validate(&self) -> Result<(), ConfigError> {
        self.policy.validate()?;
        if self.max_chars == 0 {
            return Err(ConfigError::ZeroMaxChars(self.policy.scope.clone()));
        }
        Ok(())
    }
}

/// Full configuration consumed by the assistant routes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AssistantConfig {
    pub tags: FlowConfig,
    pub summarize: FlowConfig,
    pub chat: FlowConfig,
    pub ping: GovernancePolicy,
    pub max_attempts: u32,
    pub min_tag_source_chars: usize,
}

impl Default for AssistantConfig {
    fn default() -> Self {
        Self {
            tags: FlowConfig::new("ai:tags", 10, 5_000),
            summarize: FlowConfig::new("ai:summarize", 10, 6_000),
            chat: FlowConfig::new("ai:chat", 20, 3_000),
            ping: GovernancePolicy::new("ai:ping", 20, DEFAULT_WINDOW_MS),
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            min_tag_source_chars: DEFAULT_MIN_TAG_SOURCE_CHARS,
        }
    }
}

impl AssistantConfig {
    /// Parses and validates a JSON document. Missing fields take defaults.
    pub fn from_json_str(raw: &str) -> Result<Self, ConfigError> {
        let config: Self =
            serde_json::from_str(raw).map_err(|err| ConfigError::Parse(err.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Reads, parses and validates a JSON config file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .map_err(|err| ConfigError::Io(format!("{}: {err}", path.display())))?;
        Self::from_json_str(&raw)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.tags.validate()?;
        self.summarize.validate()?;
        self.chat.validate()?;
        self.ping.validate()?;
        if self.max_attempts == 0 {
            return Err(ConfigError::ZeroMaxAttempts);
        }
        Ok(())
    }
}

/// Configuration load/validation errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    Io(String),
    Parse(String),
    EmptyScope,
    ZeroRate(String),
    ZeroWindow(String),
    ZeroMaxChars(String),
    ZeroMaxAttempts,
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io(message) => write!(f, "cannot read config: {message}"),
            Self::Parse(message) => write!(f, "invalid config json: {message}"),
            Self::EmptyScope => write!(f, "governance scope must not be empty"),
            Self::ZeroRate(scope) => write!(f, "rate for `{scope}` must be > 0"),
            Self::ZeroWindow(scope) => write!(f, "window_ms for `{scope}` must be > 0"),
            Self::ZeroMaxChars(scope) => write!(f, "max_chars for `{scope}` must be > 0"),
            Self::ZeroMaxAttempts => write!(f, "max_attempts must be >= 1"),
        }
    }
}

impl Error for ConfigError {}
