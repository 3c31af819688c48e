//! One JSON file per run.
//!
//! A run is written to a temp file in the target directory, synced, then
//! renamed into place, so a file either holds a complete run or does not
//! exist.

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::io::AsyncWriteExt;
use tracing::debug;

use super::{ResultStore, StoreError, StoredRun};
use crate::record::RunRecord;

static TMP_COUNTER: AtomicU64 = AtomicU64::new(0);

#[derive(Debug, Clone)]
pub struct JsonDirStore {
    root: PathBuf,
}

impl JsonDirStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn run_path(&self, run_id: &str) -> PathBuf {
        let file: String = run_id
            .chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() || c == '-' || c == '_' || c == '.' {
                    c
                } else {
                    '_'
                }
            })
            .collect();
        self.root.join(format!("{}.json", file))
    }

    async fn read_run(path: &Path) -> Result<StoredRun, StoreError> {
        let bytes = tokio::fs::read(path).await.map_err(|source| StoreError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(serde_json::from_slice(&bytes)?)
    }
}

fn io_error(path: &Path) -> impl FnOnce(std::io::Error) -> StoreError + '_ {
    move |source| StoreError::Io {
        path: path.to_path_buf(),
        source,
    }
}

async fn write_atomic(target: &Path, bytes: &[u8]) -> Result<(), StoreError> {
    let file_name = target
        .file_name()
        .and_then(|name| name.to_str())
        .unwrap_or("run.json");
    let tmp = target.with_file_name(format!(
        "{}.{}.{}.tmp",
        file_name,
        std::process::id(),
        TMP_COUNTER.fetch_add(1, Ordering::Relaxed)
    ));

    let result = async {
        let mut file = tokio::fs::File::create(&tmp).await.map_err(io_error(&tmp))?;
        file.write_all(bytes).await.map_err(io_error(&tmp))?;
        file.sync_all().await.map_err(io_error(&tmp))?;
        drop(file);
        tokio::fs::rename(&tmp, target).await.map_err(io_error(target))
    }
    .await;

    if result.is_err() {
        let _ = tokio::fs::remove_file(&tmp).await;
    }
    result
}

#[async_trait]
impl ResultStore for JsonDirStore {
    fn name(&self) -> &str {
        "json_dir"
    }

    async fn persist(&self, record: &RunRecord) -> Result<(), StoreError> {
        let staged = StoredRun::from_record(record);
        let bytes = serde_json::to_vec_pretty(&staged)?;

        tokio::fs::create_dir_all(&self.root)
            .await
            .map_err(io_error(&self.root))?;

        let target = self.run_path(&record.run_id);
        let exists = tokio::fs::try_exists(&target)
            .await
            .map_err(io_error(&target))?;
        if exists {
            return Err(StoreError::DuplicateRun(record.run_id.clone()));
        }

        write_atomic(&target, &bytes).await?;
        debug!(run_id = %record.run_id, path = %target.display(), "Committed run");
        Ok(())
    }

    async fn fetch(&self, run_id: &str) -> Result<Option<StoredRun>, StoreError> {
        let path = self.run_path(run_id);
        match tokio::fs::try_exists(&path).await.map_err(io_error(&path))? {
            true => Ok(Some(Self::read_run(&path).await?)),
            false => Ok(None),
        }
    }

    async fn runs_for_spec(&self, spec_hash: &str) -> Result<Vec<String>, StoreError> {
        let mut entries = match tokio::fs::read_dir(&self.root).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(source) => {
                return Err(StoreError::Io {
                    path: self.root.clone(),
                    source,
                })
            }
        };

        let mut run_ids = Vec::new();
        while let Some(entry) = entries.next_entry().await.map_err(io_error(&self.root))? {
            let path = entry.path();
            if path.extension().and_then(|ext| ext.to_str()) != Some("json") {
                continue;
            }
            let run = Self::read_run(&path).await?;
            if run.record.spec_hash == spec_hash {
                run_ids.push(run.record.run_id);
            }
        }
        run_ids.sort();
        Ok(run_ids)
    }
}
