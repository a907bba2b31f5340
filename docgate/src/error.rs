//! Error types for the refinement harness
//!
//! Only [`SessionError`] ever reaches the caller of a session. Every other
//! error here is recovered at the boundary where it occurs and logged:
//!
//! | Error              | Raised by                | Effect on the session       |
//! |--------------------|--------------------------|-----------------------------|
//! | `RuleCheckError`   | deterministic validators | source treated as no opinion|
//! | `JudgmentError`    | semantic adapter         | source treated as no opinion|
//! | `GenerationError`  | generator collaborator   | fatal, wrapped in session   |
//! | `PersistenceError` | snapshots, golden store  | logged, session continues   |

use std::path::PathBuf;

use thiserror::Error;

use crate::model::ValidationStage;
use crate::session::RefinementSession;

/// Result alias for deterministic rule checks
pub type RuleResult<T> = Result<T, RuleCheckError>;

/// Result alias for snapshot and golden store I/O
pub type PersistenceResult<T> = Result<T, PersistenceError>;

/// Result alias for a whole refinement session
pub type SessionResult<T> = Result<T, SessionError>;

/// Internal failure of a deterministic rule family
#[derive(Debug, Error)]
pub enum RuleCheckError {
    #[error("invalid rule pattern '{pattern}': {reason}")]
    InvalidPattern { pattern: String, reason: String },

    #[error("rule set misconfigured: {0}")]
    Misconfigured(String),
}

impl RuleCheckError {
    pub fn invalid_pattern(pattern: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidPattern {
            pattern: pattern.into(),
            reason: reason.into(),
        }
    }
}

/// Failure of the semantic judgment collaborator or of its response
#[derive(Debug, Error)]
pub enum JudgmentError {
    #[error("judgment transport failed: {0}")]
    Transport(String),

    #[error("judgment response is not valid JSON: {0}")]
    Parse(String),

    #[error("judgment response is missing required field '{0}'")]
    MissingField(String),
}

impl JudgmentError {
    pub fn transport(msg: impl Into<String>) -> Self {
        Self::Transport(msg.into())
    }

    pub fn parse(msg: impl Into<String>) -> Self {
        Self::Parse(msg.into())
    }
}

/// Failure reported by the document generator
#[derive(Debug, Error)]
#[error("generator failed: {message}")]
pub struct GenerationError {
    pub message: String,
}

impl GenerationError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Snapshot or golden baseline I/O failure
#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("lock poisoned")]
    LockPoisoned,
}

impl PersistenceError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

/// The single fatal error a session can return.
///
/// Cancellation and timeout carry the session as of the last fully merged
/// result so callers can still inspect how far the refinement got.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("regeneration failed at stage {stage}, iteration {iteration}: {source}")]
    Regeneration {
        stage: ValidationStage,
        iteration: u32,
        #[source]
        source: GenerationError,
    },

    #[error("session cancelled at stage {stage}, iteration {iteration}")]
    Cancelled {
        stage: ValidationStage,
        iteration: u32,
        partial: Box<RefinementSession>,
    },

    #[error("session timed out at stage {stage}, iteration {iteration}")]
    TimedOut {
        stage: ValidationStage,
        iteration: u32,
        partial: Box<RefinementSession>,
    },

    #[error("context store error: {0}")]
    Store(#[from] StoreError),
}

impl SessionError {
    /// Stage at which the session stopped, if known
    pub fn stage(&self) -> Option<ValidationStage> {
        match self {
            Self::Regeneration { stage, .. }
            | Self::Cancelled { stage, .. }
            | Self::TimedOut { stage, .. } => Some(*stage),
            Self::Store(_) => None,
        }
    }

    /// Partial session attached to a cancellation or timeout
    pub fn partial(&self) -> Option<&RefinementSession> {
        match self {
            Self::Cancelled { partial, .. } | Self::TimedOut { partial, .. } => Some(partial),
            _ => None,
        }
    }
}

/// Context store failure
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("lock poisoned")]
    LockPoisoned,

    #[error("value for key '{key}' has the wrong shape: {reason}")]
    Serialization { key: String, reason: String },
}

/// Result alias for context store operations
pub type StoreResult<T> = Result<T, StoreError>;

/// Configuration loading failure
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid config value for {key}: {reason}")]
    Invalid { key: String, reason: String },
}

impl ConfigError {
    pub fn invalid(key: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Invalid {
            key: key.into(),
            reason: reason.into(),
        }
    }
}
