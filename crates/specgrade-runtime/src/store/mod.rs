//! Persistence of graded runs.
//!
//! A store commits a run together with its category and finding rows, or
//! nothing at all.

mod json_dir;
mod memory;

pub use json_dir::JsonDirStore;
pub use memory::MemoryStore;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;

use crate::record::{CategoryRow, FindingRow, RunRecord};

/// Errors from a result store.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Store I/O failed at {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to serialize run: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Run {0} already exists")]
    DuplicateRun(String),

    #[error("Store rejected run: {0}")]
    Rejected(String),
}

/// A run with all of its rows, as committed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredRun {
    pub record: RunRecord,
    pub categories: Vec<CategoryRow>,
    pub findings: Vec<FindingRow>,
}

impl StoredRun {
    pub fn from_record(record: &RunRecord) -> Self {
        Self {
            record: record.clone(),
            categories: record.category_rows(),
            findings: record.finding_rows(),
        }
    }

    pub fn row_count(&self) -> usize {
        self.categories.len() + self.findings.len()
    }
}

/// Persistence collaborator.
#[async_trait]
pub trait ResultStore: Send + Sync {
    fn name(&self) -> &str;

    /// Commit a run and its rows as one unit.
    async fn persist(&self, record: &RunRecord) -> Result<(), StoreError>;

    async fn fetch(&self, run_id: &str) -> Result<Option<StoredRun>, StoreError>;

    /// Run ids graded from the given document hash, sorted.
    async fn runs_for_spec(&self, spec_hash: &str) -> Result<Vec<String>, StoreError>;
}
