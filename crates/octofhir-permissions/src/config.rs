//! Permission engine configuration.
//!
//! Configuration is read from the `[permissions]` table of a TOML file. Every
//! field has a default, so an empty file yields the built-in behaviour.
//!
//! # Example (TOML)
//!
//! ```toml
//! [permissions]
//! default_language = "es"
//!
//! [permissions.catalog]
//! path = "/etc/octofhir/catalog.toml"
//!
//! [permissions.scoping]
//! resource_types = ["Patient", "Encounter"]
//!
//! [permissions.conflicts]
//! administrative = ["admin"]
//! financial = ["billing"]
//!
//! [[permissions.conflicts.supersets]]
//! role = "superadmin"
//! subsumes = ["admin"]
//! ```

use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::catalog::{BuiltinCatalogSource, CatalogRegistry, CatalogSource, TomlCatalogSource};
use crate::conflicts::{ConflictDetector, ConflictRules};
use crate::error::PermissionError;
use crate::scoping::{DEFAULT_SCOPED_RESOURCE_TYPES, DepartmentScoping};

/// Root configuration of the permission engine.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct PermissionsConfig {
    /// Language used when a caller does not ask for one.
    pub default_language: String,

    /// Permission catalog source.
    pub catalog: CatalogConfig,

    /// Department scoping.
    pub scoping: ScopingConfig,

    /// Role conflict rule tables.
    pub conflicts: ConflictRules,
}

impl Default for PermissionsConfig {
    fn default() -> Self {
        Self {
            default_language: "en".to_string(),
            catalog: CatalogConfig::default(),
            scoping: ScopingConfig::default(),
            conflicts: ConflictRules::default(),
        }
    }
}

/// Catalog source configuration.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct CatalogConfig {
    /// TOML catalog file replacing the built-in catalog.
    pub path: Option<PathBuf>,
}

/// Department scoping configuration.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct ScopingConfig {
    /// Resource types that receive a department compartment criteria.
    pub resource_types: Vec<String>,
}

impl Default for ScopingConfig {
    fn default() -> Self {
        Self {
            resource_types: DEFAULT_SCOPED_RESOURCE_TYPES
                .iter()
                .map(|t| (*t).to_string())
                .collect(),
        }
    }
}

/// Configuration errors.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    /// An invalid configuration value was provided.
    #[error("Invalid configuration value: {0}")]
    InvalidValue(String),

    /// A required configuration value is missing.
    #[error("Missing required configuration: {0}")]
    Missing(String),

    /// The configuration document could not be parsed.
    #[error("Parse error: {0}")]
    Parse(String),

    /// The configuration file could not be read.
    #[error("Failed to read {path}: {message}")]
    Io {
        /// The file that failed.
        path: String,
        /// The underlying I/O error.
        message: String,
    },
}

#[derive(Debug, Default, Deserialize)]
struct ConfigFile {
    #[serde(default)]
    permissions: PermissionsConfig,
}

impl PermissionsConfig {
    /// Parses and validates a TOML document.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Parse` for malformed TOML and the validation
    /// error for invalid values.
    pub fn from_toml_str(toml_str: &str) -> Result<Self, ConfigError> {
        let file: ConfigFile = toml::from_str(toml_str)
            .map_err(|e| ConfigError::Parse(format!("TOML parse error: {e}")))?;
        file.permissions.validate()?;
        Ok(file.permissions)
    }

    /// Reads, parses and validates a TOML file.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Io` if the file cannot be read, otherwise as
    /// [`PermissionsConfig::from_toml_str`].
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        let config = Self::from_toml_str(&contents)?;
        tracing::info!(path = %path.display(), "Permissions configuration loaded");
        Ok(config)
    }

    /// Validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Missing` if the default language is empty and
    /// `ConfigError::InvalidValue` for empty resource type names or invalid
    /// conflict rule tables.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.default_language.trim().is_empty() {
            return Err(ConfigError::Missing("default_language".to_string()));
        }

        if let Some(path) = &self.catalog.path
            && path.as_os_str().is_empty()
        {
            return Err(ConfigError::InvalidValue(
                "catalog.path cannot be empty".to_string(),
            ));
        }

        if self
            .scoping
            .resource_types
            .iter()
            .any(|t| t.trim().is_empty())
        {
            return Err(ConfigError::InvalidValue(
                "scoping.resource_types cannot contain empty names".to_string(),
            ));
        }

        self.conflicts.validate()
    }

    /// Builds the catalog registry described by this configuration.
    ///
    /// # Errors
    ///
    /// Returns `PermissionError::Config` if the configuration is invalid and
    /// `PermissionError::CatalogSource` if the catalog file cannot be loaded.
    pub fn catalog_registry(&self) -> Result<CatalogRegistry, PermissionError> {
        self.validate()?;
        let source: Arc<dyn CatalogSource> = match &self.catalog.path {
            Some(path) => Arc::new(TomlCatalogSource::from_file(path)?),
            None => Arc::new(BuiltinCatalogSource),
        };
        Ok(CatalogRegistry::new(source, self.default_language.clone()))
    }

    /// Builds the department scoping rewriter.
    #[must_use]
    pub fn department_scoping(&self) -> DepartmentScoping {
        DepartmentScoping::new(self.scoping.resource_types.iter().cloned())
    }

    /// Builds the role conflict detector.
    #[must_use]
    pub fn conflict_detector(&self) -> ConflictDetector {
        ConflictDetector::new(self.conflicts.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_config_validates() {
        let config = PermissionsConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.default_language, "en");
        assert!(config.catalog.path.is_none());
        assert!(config.scoping.resource_types.contains(&"Patient".to_string()));
    }

    #[test]
    fn test_empty_document_yields_defaults() {
        let config = PermissionsConfig::from_toml_str("").unwrap();
        assert_eq!(config, PermissionsConfig::default());
    }

    #[test]
    fn test_partial_override() {
        let config = PermissionsConfig::from_toml_str(
            r#"
            [permissions]
            default_language = "es"

            [permissions.scoping]
            resource_types = ["Patient"]
            "#,
        )
        .unwrap();

        assert_eq!(config.default_language, "es");
        assert_eq!(config.scoping.resource_types, vec!["Patient".to_string()]);
        assert_eq!(config.conflicts, ConflictRules::default());
    }

    #[test]
    fn test_empty_language_fails_validation() {
        let err = PermissionsConfig::from_toml_str(
            r#"
            [permissions]
            default_language = ""
            "#,
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::Missing(_)));
    }

    #[test]
    fn test_empty_scoped_type_fails_validation() {
        let mut config = PermissionsConfig::default();
        config.scoping.resource_types.push("  ".to_string());
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("scoping.resource_types"));
    }

    #[test]
    fn test_malformed_toml() {
        let err = PermissionsConfig::from_toml_str("[permissions").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn test_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "[permissions.conflicts]\nadministrative = [\"root\"]"
        )
        .unwrap();

        let config = PermissionsConfig::from_file(file.path()).unwrap();
        assert_eq!(config.conflicts.administrative, vec!["root".to_string()]);
    }

    #[test]
    fn test_missing_file() {
        let err = PermissionsConfig::from_file("/definitely/not/here.toml").unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }

    #[test]
    fn test_builders_follow_config() {
        let mut config = PermissionsConfig::default();
        config.scoping.resource_types = vec!["Practitioner".to_string()];

        let scoping = config.department_scoping();
        assert!(scoping.is_scoped("Practitioner"));
        assert!(!scoping.is_scoped("Patient"));

        let registry = config.catalog_registry().unwrap();
        assert_eq!(registry.default_language(), "en");
    }

    #[test]
    fn test_invalid_config_rejected_by_registry_builder() {
        let mut config = PermissionsConfig::default();
        config.default_language = " ".to_string();

        let err = config.catalog_registry().unwrap_err();
        assert!(matches!(err, PermissionError::Config(ConfigError::Missing(_))));
    }
}
