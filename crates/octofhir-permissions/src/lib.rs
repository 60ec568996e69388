//! # octofhir-permissions
//!
//! Permission resolution engine for OctoFHIR role management.
//!
//! This crate provides:
//! - A permission catalog with localized display strings
//! - Dependency resolution over the catalog
//! - Conversion between permission codes and AccessPolicy resource rules
//! - A resource × interaction permission matrix backed by a policy store
//! - Multi-role combination, role conflict detection and department scoping
//!
//! ## Overview
//!
//! Roles are persisted as AccessPolicy resources through
//! [`octofhir_policy_store::PolicyStore`]. Callers edit a role either as a
//! list of permission codes ([`codec`]) or as a permission matrix
//! ([`matrix`]); both views decode and encode through the canonical
//! [`ResourceGrant`] model, so legacy `readonly` rules and `interaction`
//! arrays are read the same way.
//!
//! ## Modules
//!
//! - [`catalog`] - Permission catalog, sources and per-language registry
//! - [`resolver`] - Dependency closure over the catalog
//! - [`grant`] - Canonical per-resource interaction sets
//! - [`codec`] - Permission codes to and from AccessPolicy rules
//! - [`matrix`] - Permission matrix read, update and cell editing
//! - [`combine`] - Union of several roles' matrices
//! - [`conflicts`] - Role-name conflict detection
//! - [`scoping`] - Department compartment criteria
//! - [`config`] - Engine configuration

pub mod catalog;
pub mod codec;
pub mod combine;
pub mod config;
pub mod conflicts;
pub mod error;
pub mod grant;
pub mod matrix;
pub mod resolver;
pub mod scoping;

pub use catalog::{
    AccessLevel, BuiltinCatalogSource, CatalogRegistry, CatalogSource, Permission,
    PermissionCatalog, PermissionCategory, TomlCatalogSource,
};
pub use codec::{access_policy_to_permissions, permissions_to_access_policy, permissions_to_grants};
pub use combine::{combine_matrices, get_combined_permissions};
pub use config::{ConfigError, PermissionsConfig};
pub use conflicts::{
    ConflictDetector, ConflictRules, ConflictType, RoleConflict, Severity, SupersetRule,
    detect_role_conflicts,
};
pub use error::PermissionError;
pub use grant::{PolicyEncoding, ResourceGrant};
pub use matrix::{
    PERMISSION_RESOURCES, PermissionRow, empty_matrix, get_permission_matrix,
    implied_interactions, matrix_from_resources, resolve_permission_dependencies_for_operation,
    resources_from_matrix, toggle_permission, update_permission_matrix,
};
pub use resolver::{dependents_of, missing_dependencies, resolve_permission_dependencies};
pub use scoping::{DEFAULT_SCOPED_RESOURCE_TYPES, DepartmentScoping, add_department_scoping};

/// Type alias for permission engine results.
pub type PermissionResult<T> = Result<T, PermissionError>;

/// Prelude module for convenient imports.
///
/// ```ignore
/// use octofhir_permissions::prelude::*;
/// ```
pub mod prelude {
    pub use crate::PermissionResult;
    pub use crate::catalog::{AccessLevel, CatalogRegistry, Permission, PermissionCatalog};
    pub use crate::codec::{access_policy_to_permissions, permissions_to_access_policy};
    pub use crate::combine::get_combined_permissions;
    pub use crate::conflicts::{RoleConflict, detect_role_conflicts};
    pub use crate::error::PermissionError;
    pub use crate::grant::PolicyEncoding;
    pub use crate::matrix::{
        PermissionRow, get_permission_matrix, resolve_permission_dependencies_for_operation,
        update_permission_matrix,
    };
    pub use crate::resolver::resolve_permission_dependencies;
    pub use crate::scoping::add_department_scoping;
    pub use octofhir_policy_store::{AccessPolicy, AccessPolicyResource, Interaction, PolicyStore};
}
