//! The grading pipeline.
//!
//! The pipeline wraps the pure engine with everything that touches the
//! outside world:
//! - Reads and normalizes the document, hashing exactly the text it parses
//! - Fans out to upstream validators concurrently, each under a deadline
//! - Applies the collaborator policy to validator failures
//! - Grades with the registry's active catalog
//! - Commits the run to the configured store

use chrono::Utc;
use futures::future::join_all;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info, warn};

use specgrade_core::{
    grade, normalize_source, round_points, spec_hash, Finding, GradeReport, LetterGrade,
    RuleCatalog, ScoringMode, SpecDocument,
};

use crate::config::{CollaboratorPolicy, RuntimeConfig, StoreConfig};
use crate::record::RunRecord;
use crate::registry::CatalogRegistry;
use crate::store::{JsonDirStore, MemoryStore, ResultStore};
use crate::validator::DocumentValidator;
use crate::PipelineError;

/// Category of findings recorded for failed validators.
pub const UPSTREAM_CATEGORY: &str = "upstream";

/// Both scoring generations over one document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModeComparison {
    pub spec_hash: String,
    pub catalog_version: String,
    pub legacy: GradeReport,
    pub coverage: GradeReport,

    /// `coverage.total - legacy.total`
    pub score_delta: f64,
    pub grade_changed: bool,
}

impl ModeComparison {
    fn new(legacy: GradeReport, coverage: GradeReport) -> Self {
        Self {
            spec_hash: coverage.spec_hash.clone(),
            catalog_version: coverage.catalog_version.clone(),
            score_delta: round_points(coverage.total - legacy.total),
            grade_changed: legacy.letter != coverage.letter,
            legacy,
            coverage,
        }
    }

    pub fn letters(&self) -> (LetterGrade, LetterGrade) {
        (self.legacy.letter, self.coverage.letter)
    }
}

/// A parsed document ready for grading.
struct Prepared {
    doc: SpecDocument,
    hash: String,
}

pub struct GradingPipeline {
    registry: Arc<CatalogRegistry>,
    validators: Vec<Arc<dyn DocumentValidator>>,
    store: Option<Arc<dyn ResultStore>>,
    config: RuntimeConfig,
}

impl GradingPipeline {
    /// Create a pipeline without validators or a store.
    pub fn new(registry: Arc<CatalogRegistry>, config: RuntimeConfig) -> Self {
        Self {
            registry,
            validators: Vec::new(),
            store: None,
            config,
        }
    }

    /// Build a pipeline from configuration: catalog, then store.
    pub async fn from_config(config: RuntimeConfig) -> Result<Self, PipelineError> {
        config.validate()?;

        let registry = Arc::new(CatalogRegistry::with_builtin(config.catalog_cache_capacity)?);
        if let Some(path) = &config.catalog_path {
            registry.reload(path).await?;
        }

        let store: Option<Arc<dyn ResultStore>> = match &config.store {
            StoreConfig::None => None,
            StoreConfig::Memory => Some(Arc::new(MemoryStore::new())),
            StoreConfig::JsonDir { path } => Some(Arc::new(JsonDirStore::new(path))),
        };

        let mut pipeline = Self::new(registry, config);
        pipeline.store = store;
        Ok(pipeline)
    }

    pub fn register_validator(&mut self, validator: Arc<dyn DocumentValidator>) {
        self.validators.push(validator);
    }

    pub fn with_store(mut self, store: Arc<dyn ResultStore>) -> Self {
        self.store = Some(store);
        self
    }

    pub fn registry(&self) -> &CatalogRegistry {
        &self.registry
    }

    pub fn config(&self) -> &RuntimeConfig {
        &self.config
    }

    /// Grade a file; `mode` falls back to the configured default.
    pub async fn grade_file(
        &self,
        path: &Path,
        mode: Option<ScoringMode>,
    ) -> Result<RunRecord, PipelineError> {
        let source = read_source(path).await?;
        self.grade_source(&source, mode).await
    }

    /// Grade document text and persist the run.
    pub async fn grade_source(
        &self,
        source: &str,
        mode: Option<ScoringMode>,
    ) -> Result<RunRecord, PipelineError> {
        let mode = mode.unwrap_or(self.config.default_mode);
        let prepared = prepare(source)?;
        let upstream = self.run_validators(&prepared.doc).await?;
        let catalog = self.registry.active();

        let report = grade_report(&prepared, &catalog, mode, &upstream);
        let record = RunRecord::new(report, Utc::now());

        if let Some(store) = &self.store {
            store.persist(&record).await?;
            debug!(run_id = %record.run_id, store = store.name(), "Run persisted");
        }

        info!(
            run_id = %record.run_id,
            spec_hash = %record.spec_hash,
            mode = %mode,
            total = record.report.total,
            "Grading run complete"
        );
        Ok(record)
    }

    /// Grade a file under both scoring generations.
    pub async fn compare_file(&self, path: &Path) -> Result<ModeComparison, PipelineError> {
        let source = read_source(path).await?;
        self.compare(&source).await
    }

    /// Grade document text under both scoring generations.
    ///
    /// Both modes see the same document, catalog and upstream findings.
    /// Nothing is persisted.
    pub async fn compare(&self, source: &str) -> Result<ModeComparison, PipelineError> {
        let prepared = prepare(source)?;
        let upstream = self.run_validators(&prepared.doc).await?;
        let catalog = self.registry.active();

        let legacy = grade_report(&prepared, &catalog, ScoringMode::Legacy, &upstream);
        let coverage = grade_report(&prepared, &catalog, ScoringMode::CoverageBased, &upstream);
        let comparison = ModeComparison::new(legacy, coverage);

        info!(
            spec_hash = %comparison.spec_hash,
            legacy = comparison.legacy.total,
            coverage = comparison.coverage.total,
            delta = comparison.score_delta,
            "Mode comparison complete"
        );
        Ok(comparison)
    }

    /// Run every validator concurrently and collect their findings.
    ///
    /// Results are gathered in registration order regardless of which
    /// validator finishes first.
    async fn run_validators(&self, doc: &SpecDocument) -> Result<Vec<Finding>, PipelineError> {
        let default_timeout = self.config.validator_timeout;
        let runs = self.validators.iter().map(|validator| {
            let timeout = validator.timeout().unwrap_or(default_timeout);
            async move {
                let outcome = tokio::time::timeout(timeout, validator.validate(doc)).await;
                (validator, timeout, outcome)
            }
        });

        let mut findings = Vec::new();
        for (validator, timeout, outcome) in join_all(runs).await {
            let name = validator.name().to_string();
            let failure = match outcome {
                Ok(Ok(found)) => {
                    debug!(validator = %name, findings = found.len(), "Validator finished");
                    findings.extend(found);
                    continue;
                }
                Ok(Err(source)) => PipelineError::Validator { name, source },
                Err(_) => PipelineError::ValidatorTimeout { name, timeout },
            };

            match self.config.collaborator_policy {
                CollaboratorPolicy::Abort => return Err(failure),
                CollaboratorPolicy::Degrade => {
                    warn!(
                        validator = validator.name(),
                        error = %failure,
                        "Validator failed, grading without its findings"
                    );
                    findings.push(
                        Finding::warn(
                            format!("UPSTREAM-{}", validator.name()),
                            failure.to_string(),
                            "/",
                        )
                        .with_category(UPSTREAM_CATEGORY),
                    );
                }
            }
        }
        Ok(findings)
    }
}

async fn read_source(path: &Path) -> Result<String, PipelineError> {
    tokio::fs::read_to_string(path)
        .await
        .map_err(|source| PipelineError::Io {
            path: path.to_path_buf(),
            source,
        })
}

fn prepare(source: &str) -> Result<Prepared, PipelineError> {
    let normalized = normalize_source(source);
    let hash = spec_hash(&normalized);
    let doc = SpecDocument::parse(&normalized)?;
    Ok(Prepared { doc, hash })
}

fn grade_report(
    prepared: &Prepared,
    catalog: &RuleCatalog,
    mode: ScoringMode,
    upstream: &[Finding],
) -> GradeReport {
    let result = grade(&prepared.doc, catalog, mode, upstream);
    GradeReport::new(&result, prepared.hash.clone())
}
