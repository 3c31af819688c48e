//! Process-local store.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::BTreeMap;
use tracing::debug;

use super::{ResultStore, StoreError, StoredRun};
use crate::record::{CategoryRow, FindingRow, RunRecord};

#[derive(Debug, Default)]
struct Tables {
    runs: BTreeMap<String, RunRecord>,
    categories: Vec<CategoryRow>,
    findings: Vec<FindingRow>,
}

impl Tables {
    fn row_count(&self) -> usize {
        self.categories.len() + self.findings.len()
    }
}

/// In-memory tables behind a single lock.
///
/// Each commit is staged outside the lock, then checked and applied while
/// holding it, so readers never observe half a run.
#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
    row_limit: Option<usize>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reject commits that would push the category + finding row total
    /// past `limit`.
    pub fn with_row_limit(limit: usize) -> Self {
        Self {
            tables: Mutex::default(),
            row_limit: Some(limit),
        }
    }

    pub fn run_count(&self) -> usize {
        self.tables.lock().runs.len()
    }

    pub fn category_row_count(&self) -> usize {
        self.tables.lock().categories.len()
    }

    pub fn finding_row_count(&self) -> usize {
        self.tables.lock().findings.len()
    }
}

#[async_trait]
impl ResultStore for MemoryStore {
    fn name(&self) -> &str {
        "memory"
    }

    async fn persist(&self, record: &RunRecord) -> Result<(), StoreError> {
        let staged = StoredRun::from_record(record);

        let mut tables = self.tables.lock();
        if tables.runs.contains_key(&record.run_id) {
            return Err(StoreError::DuplicateRun(record.run_id.clone()));
        }
        if let Some(limit) = self.row_limit {
            let needed = tables.row_count() + staged.row_count();
            if needed > limit {
                return Err(StoreError::Rejected(format!(
                    "{} rows would exceed the limit of {}",
                    needed, limit
                )));
            }
        }

        let StoredRun {
            record,
            categories,
            findings,
        } = staged;
        debug!(
            run_id = %record.run_id,
            categories = categories.len(),
            findings = findings.len(),
            "Committing run"
        );
        tables.categories.extend(categories);
        tables.findings.extend(findings);
        tables.runs.insert(record.run_id.clone(), record);
        Ok(())
    }

    async fn fetch(&self, run_id: &str) -> Result<Option<StoredRun>, StoreError> {
        let tables = self.tables.lock();
        Ok(tables.runs.get(run_id).map(|record| StoredRun {
            record: record.clone(),
            categories: tables
                .categories
                .iter()
                .filter(|row| row.run_id == run_id)
                .cloned()
                .collect(),
            findings: tables
                .findings
                .iter()
                .filter(|row| row.run_id == run_id)
                .cloned()
                .collect(),
        }))
    }

    async fn runs_for_spec(&self, spec_hash: &str) -> Result<Vec<String>, StoreError> {
        Ok(self
            .tables
            .lock()
            .runs
            .values()
            .filter(|record| record.spec_hash == spec_hash)
            .map(|record| record.run_id.clone())
            .collect())
    }
}
