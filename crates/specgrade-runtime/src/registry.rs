//! Process-wide catalog registry.
//!
//! Holds the active catalog behind an `RwLock<Arc<_>>` so readers take a
//! cheap clone and never wait on a reload. Catalogs loaded from disk are
//! kept in a bounded moka cache keyed by path.

use moka::future::Cache;
use parking_lot::RwLock;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;

use specgrade_core::{CatalogError, RuleCatalog};

use crate::PipelineError;

pub struct CatalogRegistry {
    active: RwLock<Arc<RuleCatalog>>,
    loaded: Cache<PathBuf, Arc<RuleCatalog>>,
}

impl CatalogRegistry {
    /// Create a registry with `catalog` active.
    pub fn new(catalog: RuleCatalog, cache_capacity: u64) -> Self {
        Self {
            active: RwLock::new(Arc::new(catalog)),
            loaded: Cache::builder().max_capacity(cache_capacity).build(),
        }
    }

    /// Create a registry with the built-in catalog active.
    pub fn with_builtin(cache_capacity: u64) -> Result<Self, CatalogError> {
        Ok(Self::new(RuleCatalog::builtin()?, cache_capacity))
    }

    /// The catalog new gradings should use.
    pub fn active(&self) -> Arc<RuleCatalog> {
        Arc::clone(&self.active.read())
    }

    /// Make `catalog` active. Gradings already holding the previous
    /// catalog finish with it.
    pub fn activate(&self, catalog: Arc<RuleCatalog>) -> Arc<RuleCatalog> {
        info!(
            catalog = catalog.name(),
            version = catalog.version(),
            content_hash = catalog.content_hash(),
            "Activating catalog"
        );
        std::mem::replace(&mut *self.active.write(), catalog)
    }

    /// Load a catalog file, served from cache after the first read.
    ///
    /// `.json` files are parsed as JSON, everything else as YAML.
    pub async fn load(&self, path: &Path) -> Result<Arc<RuleCatalog>, PipelineError> {
        let key = path.to_path_buf();
        if let Some(catalog) = self.loaded.get(&key).await {
            return Ok(catalog);
        }

        let contents = tokio::fs::read_to_string(path)
            .await
            .map_err(|source| PipelineError::Io {
                path: key.clone(),
                source,
            })?;

        let is_json = path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));
        let catalog = if is_json {
            RuleCatalog::from_json(&contents)?
        } else {
            RuleCatalog::from_yaml(&contents)?
        };

        info!(
            path = %path.display(),
            version = catalog.version(),
            rules = catalog.len(),
            "Loaded catalog"
        );

        let catalog = Arc::new(catalog);
        self.loaded.insert(key, Arc::clone(&catalog)).await;
        Ok(catalog)
    }

    /// Re-read a catalog file and make it active.
    ///
    /// A file that fails to load leaves the active catalog untouched.
    pub async fn reload(&self, path: &Path) -> Result<Arc<RuleCatalog>, PipelineError> {
        self.loaded.invalidate(path).await;
        let catalog = self.load(path).await?;
        self.activate(Arc::clone(&catalog));
        Ok(catalog)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    const SMALL_CATALOG: &str = r#"
catalog_version: "0.3.0"
name: small
format:
  name: OpenAPI
  required: "3.x"
rules:
  - id: DOC-001
    category: documentation
    max_points: 10
    check: operation_summary
    description: Operations have summaries
"#;

    #[tokio::test]
    async fn test_builtin_is_active_by_default() {
        let registry = CatalogRegistry::with_builtin(4).unwrap();
        assert_eq!(registry.active().version(), "2.1.0");
    }

    #[tokio::test]
    async fn test_load_caches_by_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("small.yaml");
        fs::write(&path, SMALL_CATALOG).unwrap();

        let registry = CatalogRegistry::with_builtin(4).unwrap();
        let first = registry.load(&path).await.unwrap();

        // Served from cache even after the file changes.
        fs::write(&path, "not: [valid").unwrap();
        let second = registry.load(&path).await.unwrap();
        assert!(Arc::ptr_eq(&first, &second));

        // Loading does not activate.
        assert_eq!(registry.active().version(), "2.1.0");
    }

    #[tokio::test]
    async fn test_reload_activates_new_version() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("small.yaml");
        fs::write(&path, SMALL_CATALOG).unwrap();

        let registry = CatalogRegistry::with_builtin(4).unwrap();
        let held = registry.active();
        registry.reload(&path).await.unwrap();

        assert_eq!(registry.active().version(), "0.3.0");
        assert_eq!(held.version(), "2.1.0");
    }

    #[tokio::test]
    async fn test_failed_reload_keeps_active_catalog() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.yaml");
        fs::write(&path, SMALL_CATALOG.replace("max_points: 10", "max_points: 0")).unwrap();

        let registry = CatalogRegistry::with_builtin(4).unwrap();
        let err = registry.reload(&path).await.unwrap_err();
        assert!(matches!(err, PipelineError::Catalog(_)));
        assert_eq!(registry.active().version(), "2.1.0");
    }

    #[tokio::test]
    async fn test_missing_file_is_io_error() {
        let registry = CatalogRegistry::with_builtin(4).unwrap();
        let err = registry
            .load(Path::new("/nonexistent/catalog.yaml"))
            .await
            .unwrap_err();
        assert!(matches!(err, PipelineError::Io { .. }));
    }
}
