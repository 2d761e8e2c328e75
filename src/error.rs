//! Error types for chain sessions.
//!
//! Nothing here is fatal. Validation errors leave the session untouched,
//! storage errors degrade to in-memory play, and export errors fall back to
//! the plain-text rendering.

use thiserror::Error;

use crate::game::session::Phase;

/// Main error type for session operations.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum FuseError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("storage unavailable: {0}")]
    StorageUnavailable(#[from] StorageError),

    #[error(transparent)]
    ExportUnavailable(#[from] ExportUnavailable),

    #[error("invalid configuration: {0}")]
    Config(String),
}

/// Rejected user input. The chain and phase are left unchanged.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Add a short prompt first.")]
    EmptyPrompt,

    #[error("Write a short line.")]
    EmptyLine,

    #[error("This chain is complete.")]
    ChainLocked,

    #[error("cannot {action} while in {phase:?}")]
    WrongPhase { phase: Phase, action: &'static str },
}

/// The persistence layer could not write (or read) a record.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StorageError {
    #[error("storage is disabled")]
    Disabled,

    #[error("quota exceeded: need {needed} bytes, {available} available")]
    QuotaExceeded { needed: usize, available: usize },

    #[error("could not encode chain record: {0}")]
    Encode(String),

    /// The page's own `localStorage` write threw after the mirror accepted it.
    #[error("browser storage refused the write: {0}")]
    Rejected(String),
}

impl From<serde_json::Error> for StorageError {
    fn from(e: serde_json::Error) -> Self {
        StorageError::Encode(e.to_string())
    }
}

/// The optional image rendering capability is missing or failed.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("image export unavailable: {reason}")]
pub struct ExportUnavailable {
    pub reason: String,
}

impl ExportUnavailable {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

/// Result type for session operations.
pub type Result<T> = std::result::Result<T, FuseError>;
