//! Permission catalog.
//!
//! The catalog is the static definition of every fine-grained permission:
//! its code, the FHIR resource type it is bound to, its access level and the
//! codes it depends on. Categories only group permissions for display;
//! dependencies may cross categories.
//!
//! A [`PermissionCatalog`] is built once per language from a
//! [`CatalogSource`] and validated at construction:
//!
//! - permission codes are unique
//! - the dependency graph is acyclic
//!
//! Lookups are by code through a hash map; categories keep only the ordered
//! list of codes they contain.
//!
//! ```ignore
//! use octofhir_permissions::catalog::CatalogRegistry;
//!
//! let catalog = CatalogRegistry::global().get("en")?;
//! let deps = catalog.dependencies_of("edit-patient-demographics");
//! ```

mod builtin;
mod registry;
mod source;

use std::collections::HashMap;

use octofhir_policy_store::Interaction;
use serde::{Deserialize, Serialize};

use crate::PermissionResult;
use crate::error::PermissionError;

pub use builtin::{BuiltinCatalogSource, FALLBACK_LANGUAGE, SUPPORTED_LANGUAGES, normalize_language};
pub use registry::CatalogRegistry;
pub use source::{CatalogSource, TomlCatalogSource};

// =============================================================================
// Access Level
// =============================================================================

/// Coarse category of a permission, used to derive FHIR interactions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccessLevel {
    /// `read` + `search`.
    Read,
    /// `create` + `update`.
    Write,
    /// `delete`.
    Delete,
    /// Every interaction.
    Admin,
}

impl AccessLevel {
    /// Returns the interactions granted by this access level.
    #[must_use]
    pub fn interactions(&self) -> &'static [Interaction] {
        match self {
            Self::Read => &[Interaction::Read, Interaction::Search],
            Self::Write => &[Interaction::Create, Interaction::Update],
            Self::Delete => &[Interaction::Delete],
            Self::Admin => &Interaction::ALL,
        }
    }

    /// Returns the wire name of the access level.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Read => "read",
            Self::Write => "write",
            Self::Delete => "delete",
            Self::Admin => "admin",
        }
    }
}

// =============================================================================
// Permission / Category
// =============================================================================

/// A single fine-grained permission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Permission {
    /// Stable identifier, e.g. `view-patient-list`.
    pub code: String,

    /// Localized display name.
    pub name: String,

    /// Localized description.
    #[serde(default)]
    pub description: String,

    /// Code of the owning category. Filled from the enclosing category when
    /// left empty in a catalog file.
    #[serde(default)]
    pub category: String,

    /// FHIR resource type the permission is bound to.
    #[serde(default, alias = "resource_type", skip_serializing_if = "Option::is_none")]
    pub resource_type: Option<String>,

    /// Access level.
    #[serde(alias = "access_level")]
    pub access_level: AccessLevel,

    /// Codes of permissions this one requires.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub dependencies: Vec<String>,
}

/// A display group of permissions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PermissionCategory {
    /// Category code.
    pub code: String,

    /// Localized display name.
    pub name: String,

    /// Localized description.
    #[serde(default)]
    pub description: String,

    /// Sort key for display.
    #[serde(default, alias = "display_order")]
    pub display_order: u32,

    /// Permissions in this category.
    #[serde(default)]
    pub permissions: Vec<Permission>,
}

#[derive(Debug, Clone)]
struct CategoryEntry {
    code: String,
    name: String,
    description: String,
    display_order: u32,
    permission_codes: Vec<String>,
}

// =============================================================================
// Permission Catalog
// =============================================================================

/// A validated, immutable permission catalog for one language.
#[derive(Debug, Clone)]
pub struct PermissionCatalog {
    language: String,
    permissions: HashMap<String, Permission>,
    categories: Vec<CategoryEntry>,
    by_resource_type: HashMap<String, Vec<String>>,
}

impl PermissionCatalog {
    /// Builds a catalog from a category tree.
    ///
    /// # Errors
    ///
    /// Returns `PermissionError::DuplicatePermission` if a code appears twice
    /// and `PermissionError::CyclicDependency` if the dependency graph has a
    /// cycle.
    pub fn from_categories(
        language: impl Into<String>,
        categories: Vec<PermissionCategory>,
    ) -> PermissionResult<Self> {
        let mut permissions: HashMap<String, Permission> = HashMap::new();
        let mut entries = Vec::with_capacity(categories.len());
        let mut by_resource_type: HashMap<String, Vec<String>> = HashMap::new();

        for category in categories {
            let mut permission_codes = Vec::with_capacity(category.permissions.len());

            for mut permission in category.permissions {
                if permission.category.is_empty() {
                    permission.category = category.code.clone();
                }
                if permissions.contains_key(&permission.code) {
                    return Err(PermissionError::duplicate_permission(permission.code));
                }
                if let Some(resource_type) = &permission.resource_type {
                    by_resource_type
                        .entry(resource_type.clone())
                        .or_default()
                        .push(permission.code.clone());
                }
                permission_codes.push(permission.code.clone());
                permissions.insert(permission.code.clone(), permission);
            }

            entries.push(CategoryEntry {
                code: category.code,
                name: category.name,
                description: category.description,
                display_order: category.display_order,
                permission_codes,
            });
        }

        entries.sort_by_key(|c| c.display_order);
        for codes in by_resource_type.values_mut() {
            codes.sort();
        }

        for permission in permissions.values() {
            for dep in &permission.dependencies {
                if !permissions.contains_key(dep) {
                    tracing::warn!(
                        code = %permission.code,
                        dependency = %dep,
                        "Permission depends on an unknown code"
                    );
                }
            }
        }

        if let Some(cycle) = find_cycle(&permissions) {
            return Err(PermissionError::cyclic_dependency(cycle));
        }

        Ok(Self {
            language: language.into(),
            permissions,
            categories: entries,
            by_resource_type,
        })
    }

    /// Language of the display strings.
    #[must_use]
    pub fn language(&self) -> &str {
        &self.language
    }

    /// Looks up a permission by code.
    #[must_use]
    pub fn get(&self, code: &str) -> Option<&Permission> {
        self.permissions.get(code)
    }

    /// Returns `true` if the catalog defines `code`.
    #[must_use]
    pub fn contains(&self, code: &str) -> bool {
        self.permissions.contains_key(code)
    }

    /// Number of permissions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.permissions.len()
    }

    /// Returns `true` if the catalog defines no permissions.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.permissions.is_empty()
    }

    /// Declared dependencies of `code`; empty for unknown codes.
    #[must_use]
    pub fn dependencies_of(&self, code: &str) -> &[String] {
        self.permissions
            .get(code)
            .map(|p| p.dependencies.as_slice())
            .unwrap_or_default()
    }

    /// Permissions bound to `resource_type`, ordered by code.
    pub fn permissions_for_resource<'a>(
        &'a self,
        resource_type: &str,
    ) -> impl Iterator<Item = &'a Permission> + use<'a> {
        self.by_resource_type
            .get(resource_type)
            .into_iter()
            .flatten()
            .filter_map(|code| self.permissions.get(code))
    }

    /// All permission codes, sorted.
    #[must_use]
    pub fn codes(&self) -> Vec<&str> {
        let mut codes: Vec<&str> = self.permissions.keys().map(String::as_str).collect();
        codes.sort_unstable();
        codes
    }

    /// Resource types that at least one permission is bound to, sorted.
    #[must_use]
    pub fn resource_types(&self) -> Vec<&str> {
        let mut types: Vec<&str> = self.by_resource_type.keys().map(String::as_str).collect();
        types.sort_unstable();
        types
    }

    /// Reconstructs the category tree ordered by display order.
    #[must_use]
    pub fn permission_tree(&self) -> Vec<PermissionCategory> {
        self.categories
            .iter()
            .map(|c| PermissionCategory {
                code: c.code.clone(),
                name: c.name.clone(),
                description: c.description.clone(),
                display_order: c.display_order,
                permissions: c
                    .permission_codes
                    .iter()
                    .filter_map(|code| self.permissions.get(code).cloned())
                    .collect(),
            })
            .collect()
    }
}

/// Depth-first search for a dependency cycle.
///
/// Returns the cycle path (first code repeated at the end) if one exists.
/// Codes are visited in sorted order so the reported cycle is stable. The
/// walk keeps its own stack of `(code, next dependency index)` frames, so
/// chain depth is bounded by the heap rather than the thread stack.
fn find_cycle(permissions: &HashMap<String, Permission>) -> Option<Vec<String>> {
    #[derive(Clone, Copy, PartialEq, Eq)]
    enum Mark {
        InProgress,
        Done,
    }

    let mut roots: Vec<&str> = permissions.keys().map(String::as_str).collect();
    roots.sort_unstable();

    let mut marks: HashMap<&str, Mark> = HashMap::with_capacity(permissions.len());
    let mut path: Vec<(&str, usize)> = Vec::new();

    for root in roots {
        if marks.contains_key(root) {
            continue;
        }
        marks.insert(root, Mark::InProgress);
        path.push((root, 0));

        while let Some(frame) = path.last_mut() {
            let (code, index) = *frame;
            frame.1 += 1;

            let deps = permissions
                .get(code)
                .map(|p| p.dependencies.as_slice())
                .unwrap_or_default();
            let Some(dep) = deps.get(index) else {
                marks.insert(code, Mark::Done);
                path.pop();
                continue;
            };
            let dep = dep.as_str();
            if !permissions.contains_key(dep) {
                continue;
            }

            match marks.get(dep) {
                Some(Mark::Done) => {}
                Some(Mark::InProgress) => {
                    let start = path.iter().position(|(c, _)| *c == dep).unwrap_or_default();
                    let mut cycle: Vec<String> =
                        path[start..].iter().map(|(c, _)| (*c).to_string()).collect();
                    cycle.push(dep.to_string());
                    return Some(cycle);
                }
                None => {
                    marks.insert(dep, Mark::InProgress);
                    path.push((dep, 0));
                }
            }
        }
    }

    None
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) fn perm(
        code: &str,
        resource_type: Option<&str>,
        access_level: AccessLevel,
        dependencies: &[&str],
    ) -> Permission {
        Permission {
            code: code.to_string(),
            name: code.to_string(),
            description: String::new(),
            category: String::new(),
            resource_type: resource_type.map(str::to_string),
            access_level,
            dependencies: dependencies.iter().map(|d| (*d).to_string()).collect(),
        }
    }

    pub(crate) fn category(
        code: &str,
        order: u32,
        permissions: Vec<Permission>,
    ) -> PermissionCategory {
        PermissionCategory {
            code: code.to_string(),
            name: code.to_string(),
            description: String::new(),
            display_order: order,
            permissions,
        }
    }

    #[test]
    fn test_access_level_interactions() {
        assert_eq!(
            AccessLevel::Read.interactions(),
            &[Interaction::Read, Interaction::Search]
        );
        assert_eq!(AccessLevel::Admin.interactions().len(), 5);
        assert_eq!(AccessLevel::Delete.as_str(), "delete");
    }

    #[test]
    fn test_lookup_and_index() {
        let catalog = PermissionCatalog::from_categories(
            "en",
            vec![category(
                "patients",
                1,
                vec![
                    perm("view", Some("Patient"), AccessLevel::Read, &[]),
                    perm("edit", Some("Patient"), AccessLevel::Write, &["view"]),
                    perm("export", None, AccessLevel::Read, &[]),
                ],
            )],
        )
        .unwrap();

        assert_eq!(catalog.len(), 3);
        assert_eq!(catalog.get("edit").unwrap().category, "patients");
        assert_eq!(catalog.dependencies_of("edit"), &["view".to_string()]);
        assert!(catalog.dependencies_of("unknown").is_empty());

        let patient: Vec<&str> = catalog
            .permissions_for_resource("Patient")
            .map(|p| p.code.as_str())
            .collect();
        assert_eq!(patient, vec!["edit", "view"]);
        assert_eq!(catalog.permissions_for_resource("Encounter").count(), 0);
        assert_eq!(catalog.resource_types(), vec!["Patient"]);
    }

    #[test]
    fn test_permission_tree_sorted_by_display_order() {
        let catalog = PermissionCatalog::from_categories(
            "en",
            vec![
                category("second", 2, vec![perm("b", None, AccessLevel::Read, &[])]),
                category("first", 1, vec![perm("a", None, AccessLevel::Read, &["b"])]),
            ],
        )
        .unwrap();

        let tree = catalog.permission_tree();
        assert_eq!(tree[0].code, "first");
        assert_eq!(tree[1].code, "second");
        assert_eq!(tree[0].permissions[0].code, "a");
    }

    #[test]
    fn test_duplicate_code_rejected() {
        let err = PermissionCatalog::from_categories(
            "en",
            vec![
                category("one", 1, vec![perm("a", None, AccessLevel::Read, &[])]),
                category("two", 2, vec![perm("a", None, AccessLevel::Write, &[])]),
            ],
        )
        .unwrap_err();
        assert!(matches!(err, PermissionError::DuplicatePermission { code } if code == "a"));
    }

    #[test]
    fn test_cycle_rejected() {
        let err = PermissionCatalog::from_categories(
            "en",
            vec![category(
                "c",
                1,
                vec![
                    perm("a", None, AccessLevel::Read, &["b"]),
                    perm("b", None, AccessLevel::Read, &["c"]),
                    perm("c", None, AccessLevel::Read, &["a"]),
                ],
            )],
        )
        .unwrap_err();

        match err {
            PermissionError::CyclicDependency { cycle } => {
                assert_eq!(cycle, vec!["a", "b", "c", "a"]);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_self_dependency_rejected() {
        let err = PermissionCatalog::from_categories(
            "en",
            vec![category("c", 1, vec![perm("a", None, AccessLevel::Read, &["a"])])],
        )
        .unwrap_err();
        assert!(err.is_cyclic_dependency());
    }

    #[test]
    fn test_diamond_is_not_a_cycle() {
        let catalog = PermissionCatalog::from_categories(
            "en",
            vec![category(
                "c",
                1,
                vec![
                    perm("top", None, AccessLevel::Admin, &["left", "right"]),
                    perm("left", None, AccessLevel::Read, &["base"]),
                    perm("right", None, AccessLevel::Read, &["base"]),
                    perm("base", None, AccessLevel::Read, &[]),
                ],
            )],
        );
        assert!(catalog.is_ok());
    }

    fn chain(len: usize) -> Vec<Permission> {
        (0..len)
            .map(|i| {
                let code = format!("p{i:05}");
                let next = format!("p{:05}", i + 1);
                let deps: Vec<&str> = if i + 1 < len { vec![next.as_str()] } else { vec![] };
                perm(&code, None, AccessLevel::Read, &deps)
            })
            .collect()
    }

    #[test]
    fn test_deep_acyclic_chain_accepted() {
        let categories = vec![category("c", 1, chain(20_000))];
        let catalog =
            PermissionCatalog::from_categories("en", categories).expect("deep chain is acyclic");
        assert_eq!(catalog.dependencies_of("p00000"), &["p00001".to_string()]);
        assert!(catalog.dependencies_of("p19999").is_empty());
    }

    #[test]
    fn test_deep_chain_closed_into_cycle_rejected() {
        let mut permissions = chain(20_000);
        permissions[19_999].dependencies.push("p10000".to_string());

        let err = PermissionCatalog::from_categories("en", vec![category("c", 1, permissions)])
            .unwrap_err();

        match err {
            PermissionError::CyclicDependency { cycle } => {
                assert_eq!(cycle.len(), 10_001);
                assert_eq!(cycle.first().map(String::as_str), Some("p10000"));
                assert_eq!(cycle.last().map(String::as_str), Some("p10000"));
                assert_eq!(cycle[cycle.len() - 2], "p19999");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_unknown_dependency_tolerated() {
        let catalog = PermissionCatalog::from_categories(
            "en",
            vec![category("c", 1, vec![perm("a", None, AccessLevel::Read, &["ghost"])])],
        )
        .unwrap();
        assert_eq!(catalog.dependencies_of("a"), &["ghost".to_string()]);
    }

    #[test]
    fn test_permission_json_shape() {
        let p = perm("edit", Some("Patient"), AccessLevel::Write, &["view"]);
        let value = serde_json::to_value(&p).unwrap();
        assert_eq!(value["resourceType"], "Patient");
        assert_eq!(value["accessLevel"], "write");
        assert_eq!(value["dependencies"][0], "view");
    }
}
