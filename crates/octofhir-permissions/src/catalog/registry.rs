//! Per-language catalog cache.
//!
//! Catalogs are built lazily the first time a language is requested and then
//! shared as `Arc<PermissionCatalog>`. A process-wide registry backed by the
//! built-in catalog is available through [`CatalogRegistry::global`]; tests
//! and embedders with their own catalog construct a registry directly.

use std::sync::{Arc, LazyLock};

use dashmap::DashMap;

use super::builtin::{BuiltinCatalogSource, FALLBACK_LANGUAGE};
use super::source::CatalogSource;
use super::PermissionCatalog;
use crate::PermissionResult;

static GLOBAL: LazyLock<CatalogRegistry> = LazyLock::new(|| {
    CatalogRegistry::new(Arc::new(BuiltinCatalogSource), FALLBACK_LANGUAGE)
});

/// Lazily populated cache of catalogs keyed by language.
pub struct CatalogRegistry {
    source: Arc<dyn CatalogSource>,
    default_language: String,
    catalogs: DashMap<String, Arc<PermissionCatalog>>,
}

impl std::fmt::Debug for CatalogRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CatalogRegistry")
            .field("source", &self.source.name())
            .field("default_language", &self.default_language)
            .field("cached", &self.catalogs.len())
            .finish()
    }
}

impl CatalogRegistry {
    /// Creates a registry over `source`.
    #[must_use]
    pub fn new(source: Arc<dyn CatalogSource>, default_language: impl Into<String>) -> Self {
        Self {
            source,
            default_language: default_language.into(),
            catalogs: DashMap::new(),
        }
    }

    /// The process-wide registry backed by the built-in catalog.
    #[must_use]
    pub fn global() -> &'static CatalogRegistry {
        &GLOBAL
    }

    /// Language used for empty language requests.
    #[must_use]
    pub fn default_language(&self) -> &str {
        &self.default_language
    }

    /// Returns the catalog for `lang`, building and caching it on first use.
    ///
    /// # Errors
    ///
    /// Returns an error if the source fails or the catalog is invalid
    /// (duplicate codes, dependency cycle). Failures are not cached.
    pub fn get(&self, lang: &str) -> PermissionResult<Arc<PermissionCatalog>> {
        let key = self.key(lang);
        if let Some(catalog) = self.catalogs.get(&key) {
            return Ok(Arc::clone(catalog.value()));
        }

        let tree = self.source.permission_tree(&key)?;
        let catalog = Arc::new(PermissionCatalog::from_categories(key.clone(), tree)?);

        tracing::info!(
            language = %key,
            source = self.source.name(),
            permissions = catalog.len(),
            "Permission catalog loaded"
        );

        let entry = self.catalogs.entry(key).or_insert(catalog);
        Ok(Arc::clone(entry.value()))
    }

    /// Returns the catalog for the default language.
    ///
    /// # Errors
    ///
    /// As [`CatalogRegistry::get`].
    pub fn get_default(&self) -> PermissionResult<Arc<PermissionCatalog>> {
        self.get("")
    }

    /// Drops the cached catalog for `lang`.
    pub fn invalidate(&self, lang: &str) {
        let key = self.key(lang);
        if self.catalogs.remove(&key).is_some() {
            tracing::debug!(language = %key, "Permission catalog invalidated");
        }
    }

    /// Drops every cached catalog.
    pub fn reset(&self) {
        self.catalogs.clear();
        tracing::debug!("Permission catalog cache reset");
    }

    /// Languages currently cached, sorted.
    #[must_use]
    pub fn cached_languages(&self) -> Vec<String> {
        let mut languages: Vec<String> = self.catalogs.iter().map(|e| e.key().clone()).collect();
        languages.sort();
        languages
    }

    fn key(&self, lang: &str) -> String {
        let lang = lang.trim();
        if lang.is_empty() {
            self.default_language.to_ascii_lowercase()
        } else {
            lang.to_ascii_lowercase()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::tests::{category, perm};
    use crate::catalog::{AccessLevel, PermissionCategory};
    use crate::error::PermissionError;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingSource {
        calls: AtomicUsize,
        cyclic: bool,
    }

    impl CountingSource {
        fn new(cyclic: bool) -> Self {
            Self {
                calls: AtomicUsize::new(0),
                cyclic,
            }
        }
    }

    impl CatalogSource for CountingSource {
        fn permission_tree(&self, lang: &str) -> PermissionResult<Vec<PermissionCategory>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let dep: &[&str] = if self.cyclic { &["b"] } else { &[] };
            Ok(vec![category(
                lang,
                1,
                vec![
                    perm("a", None, AccessLevel::Read, dep),
                    perm("b", None, AccessLevel::Read, &["a"]),
                ],
            )])
        }

        fn name(&self) -> &str {
            "counting"
        }
    }

    #[test]
    fn test_catalog_cached_per_language() {
        let source = Arc::new(CountingSource::new(false));
        let registry = CatalogRegistry::new(source.clone(), "en");

        let first = registry.get("en").unwrap();
        let second = registry.get("EN").unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(source.calls.load(Ordering::SeqCst), 1);

        registry.get("es").unwrap();
        assert_eq!(source.calls.load(Ordering::SeqCst), 2);
        assert_eq!(registry.cached_languages(), vec!["en", "es"]);
    }

    #[test]
    fn test_empty_language_uses_default() {
        let registry = CatalogRegistry::new(Arc::new(CountingSource::new(false)), "es");
        let catalog = registry.get_default().unwrap();
        assert_eq!(catalog.language(), "es");
    }

    #[test]
    fn test_reset_and_invalidate_force_rebuild() {
        let source = Arc::new(CountingSource::new(false));
        let registry = CatalogRegistry::new(source.clone(), "en");

        let first = registry.get("en").unwrap();
        registry.invalidate("en");
        let second = registry.get("en").unwrap();
        assert!(!Arc::ptr_eq(&first, &second));

        registry.reset();
        assert!(registry.cached_languages().is_empty());
        registry.get("en").unwrap();
        assert_eq!(source.calls.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn test_cyclic_catalog_fails_fast_and_is_not_cached() {
        let registry = CatalogRegistry::new(Arc::new(CountingSource::new(true)), "en");
        let err = registry.get("en").unwrap_err();
        assert!(matches!(err, PermissionError::CyclicDependency { .. }));
        assert!(registry.cached_languages().is_empty());
    }

    #[test]
    fn test_global_registry_serves_builtin_catalog() {
        let catalog = CatalogRegistry::global().get("en").unwrap();
        assert!(catalog.contains("view-patient-list"));
        assert_eq!(
            catalog.dependencies_of("delete-patient"),
            &["view-patient-demographics".to_string()]
        );
    }
}
