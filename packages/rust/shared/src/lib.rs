//! Shared types, error model, configuration, and the progress-event log for
//! companyscout.
//!
//! This crate is the foundation depended on by all other companyscout crates.
//! It provides:
//! - [`ScoutError`] — the unified error type
//! - Domain types ([`Document`], [`DocumentSet`], [`ResearchState`], [`JobId`])
//! - Configuration ([`AppConfig`], config loading, API-key validation)
//! - The shared [`ProgressLog`] every pipeline stage appends to

pub mod config;
pub mod error;
pub mod progress;
pub mod types;

// Re-export public API at crate root for ergonomic imports.
pub use config::{
    AppConfig, CompletionConfig, DefaultsConfig, SearchConfig, config_dir, config_file_path,
    init_config, load_config, load_config_from, resolve_api_key, validate_api_keys,
};
pub use error::{Result, ScoutError};
pub use progress::{JobStatus, ProgressEvent, ProgressLog};
pub use types::{
    Category, CategoryTable, DocSource, Document, DocumentSet, EditorState, Evaluation, JobId,
    ReferenceInfo, ResearchState,
};
