//! # specgrade-runtime
//!
//! Async pipeline around the pure scoring engine.
//!
//! This crate provides:
//! - A process-wide catalog registry with hot reload
//! - Document loading with line-ending normalization and hashing
//! - Concurrent upstream validators, each under its own deadline
//! - A collaborator failure policy (abort or degrade)
//! - Transactional persistence of graded runs
//! - Side-by-side legacy/coverage comparison
//!
//! ## Key Principle
//!
//! Everything here is plumbing. Scores come only from `specgrade_core::grade`;
//! the runtime decides what goes in and where the result goes.

pub mod config;
pub mod pipeline;
pub mod record;
pub mod registry;
pub mod store;
pub mod validator;

pub use config::{CollaboratorPolicy, ConfigError, RuntimeConfig, StoreConfig};
pub use pipeline::{GradingPipeline, ModeComparison};
pub use record::{CategoryRow, FindingRow, RunRecord};
pub use registry::CatalogRegistry;
pub use store::{JsonDirStore, MemoryStore, ResultStore, StoreError, StoredRun};
pub use validator::{DocumentValidator, RefValidator, ValidatorError};

use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

use specgrade_core::{CatalogError, DocumentError};

/// Errors from the grading pipeline.
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("Failed to read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Document error: {0}")]
    Document(#[from] DocumentError),

    #[error("Catalog error: {0}")]
    Catalog(#[from] CatalogError),

    #[error("Validator {name} failed: {source}")]
    Validator {
        name: String,
        #[source]
        source: ValidatorError,
    },

    #[error("Validator {name} timed out after {}", humantime::format_duration(*.timeout))]
    ValidatorTimeout { name: String, timeout: Duration },

    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Config error: {0}")]
    Config(#[from] ConfigError),
}
