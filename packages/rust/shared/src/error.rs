//! Error types for companyscout.
//!
//! Library crates use [`ScoutError`] via `thiserror`.
//! The CLI wraps this with `color-eyre` for rich diagnostics.

use std::path::PathBuf;

/// Top-level error type for all companyscout operations.
#[derive(Debug, thiserror::Error)]
pub enum ScoutError {
    /// Configuration loading or validation error (including missing API keys).
    /// Fatal at construction, before any pipeline stage runs.
    #[error("config error: {message}")]
    Config { message: String },

    /// Completion-service failure on the query-generation or briefing path.
    /// Fatal: propagates and aborts the enclosing batch.
    #[error("completion error: {0}")]
    Completion(String),

    /// Search-service failure. Isolated per query by callers; the run
    /// continues with partial results.
    #[error("search error: {0}")]
    Search(String),

    /// The completion service returned empty output. Callers decide whether
    /// this is terminal (briefing) or recoverable (editor sweep).
    #[error("empty completion output during {context}")]
    EmptyCompletion { context: String },

    /// Data validation error (zero queries generated, nothing to compile).
    #[error("validation error: {message}")]
    Validation { message: String },

    /// Filesystem I/O error.
    #[error("I/O error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Convenience alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, ScoutError>;

impl ScoutError {
    /// Create a config error from any displayable message.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
        }
    }

    /// Create a completion-path error.
    pub fn completion(msg: impl Into<String>) -> Self {
        Self::Completion(msg.into())
    }

    /// Create a search-path error.
    pub fn search(msg: impl Into<String>) -> Self {
        Self::Search(msg.into())
    }

    /// Create an empty-completion error tagged with its pipeline context.
    pub fn empty_completion(context: impl Into<String>) -> Self {
        Self::EmptyCompletion {
            context: context.into(),
        }
    }

    /// Create a validation error from any displayable message.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation {
            message: msg.into(),
        }
    }

    /// Wrap a `std::io::Error` with a path for context.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}
