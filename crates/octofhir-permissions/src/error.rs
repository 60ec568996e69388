//! Permission engine error types.

use crate::config::ConfigError;

/// Errors that can occur while building catalogs or resolving permissions.
#[derive(Debug, thiserror::Error)]
pub enum PermissionError {
    /// The catalog's dependency graph contains a cycle.
    #[error("Cyclic permission dependency: {}", cycle.join(" -> "))]
    CyclicDependency {
        /// The codes on the cycle, starting and ending with the same code.
        cycle: Vec<String>,
    },

    /// Two catalog entries share the same permission code.
    #[error("Duplicate permission code: {code}")]
    DuplicatePermission {
        /// The duplicated code.
        code: String,
    },

    /// A catalog source could not produce a permission tree.
    #[error("Catalog source error: {message}")]
    CatalogSource {
        /// Description of the failure.
        message: String,
    },

    /// Invalid configuration.
    #[error(transparent)]
    Config(#[from] ConfigError),
}

impl PermissionError {
    /// Creates a new `CyclicDependency` error.
    #[must_use]
    pub fn cyclic_dependency(cycle: Vec<String>) -> Self {
        Self::CyclicDependency { cycle }
    }

    /// Creates a new `DuplicatePermission` error.
    #[must_use]
    pub fn duplicate_permission(code: impl Into<String>) -> Self {
        Self::DuplicatePermission { code: code.into() }
    }

    /// Creates a new `CatalogSource` error.
    #[must_use]
    pub fn catalog_source(message: impl Into<String>) -> Self {
        Self::CatalogSource {
            message: message.into(),
        }
    }

    /// Returns `true` if the error reports a dependency cycle.
    #[must_use]
    pub fn is_cyclic_dependency(&self) -> bool {
        matches!(self, Self::CyclicDependency { .. })
    }
}
