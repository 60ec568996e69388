//! Catalog sources.
//!
//! A source supplies the raw category tree for a language. Sources must keep
//! the dependency graph identical across languages; only display strings may
//! differ.

use std::path::{Path, PathBuf};

use serde::Deserialize;

use super::PermissionCategory;
use crate::PermissionResult;
use crate::error::PermissionError;

/// Supplier of permission category trees.
pub trait CatalogSource: Send + Sync {
    /// Returns the category tree for `lang`.
    ///
    /// # Errors
    ///
    /// Returns `PermissionError::CatalogSource` if the tree cannot be produced.
    fn permission_tree(&self, lang: &str) -> PermissionResult<Vec<PermissionCategory>>;

    /// Short name used in logs.
    fn name(&self) -> &str;
}

#[derive(Debug, Deserialize)]
struct CatalogDocument {
    #[serde(default)]
    categories: Vec<PermissionCategory>,
}

/// A catalog read from a TOML document.
///
/// The document carries a single tree; every language receives the same
/// display strings.
///
/// ```toml
/// [[categories]]
/// code = "patients"
/// name = "Patients"
/// display_order = 1
///
/// [[categories.permissions]]
/// code = "view-patient-list"
/// name = "View patient list"
/// resource_type = "Patient"
/// access_level = "read"
/// ```
#[derive(Debug, Clone)]
pub struct TomlCatalogSource {
    origin: Option<PathBuf>,
    categories: Vec<PermissionCategory>,
}

impl TomlCatalogSource {
    /// Parses a catalog document.
    ///
    /// # Errors
    ///
    /// Returns `PermissionError::CatalogSource` if the document is malformed.
    pub fn from_toml_str(toml_str: &str) -> PermissionResult<Self> {
        let document: CatalogDocument = toml::from_str(toml_str)
            .map_err(|e| PermissionError::catalog_source(format!("TOML parse error: {e}")))?;
        Ok(Self {
            origin: None,
            categories: document.categories,
        })
    }

    /// Reads and parses a catalog file.
    ///
    /// # Errors
    ///
    /// Returns `PermissionError::CatalogSource` if the file cannot be read or
    /// parsed.
    pub fn from_file(path: impl AsRef<Path>) -> PermissionResult<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|e| {
            PermissionError::catalog_source(format!("Failed to read {}: {e}", path.display()))
        })?;
        let mut source = Self::from_toml_str(&contents)?;
        source.origin = Some(path.to_path_buf());
        Ok(source)
    }

    /// The file the catalog was read from, if any.
    #[must_use]
    pub fn origin(&self) -> Option<&Path> {
        self.origin.as_deref()
    }
}

impl CatalogSource for TomlCatalogSource {
    fn permission_tree(&self, _lang: &str) -> PermissionResult<Vec<PermissionCategory>> {
        Ok(self.categories.clone())
    }

    fn name(&self) -> &str {
        "toml"
    }
}
