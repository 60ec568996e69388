//! Dependency resolution over the permission catalog.
//!
//! Selecting a permission implies selecting everything it depends on,
//! transitively. Resolution is a worklist walk with a visited set, so it
//! terminates even on a graph that was never validated. Codes the catalog does
//! not know are kept as-is and contribute no dependencies.

use std::collections::{BTreeSet, HashSet, VecDeque};

use crate::catalog::PermissionCatalog;

/// Returns the smallest superset of `codes` closed under "depends on".
///
/// The result is sorted and free of duplicates, so it does not depend on
/// input order.
///
/// # Example
///
/// ```ignore
/// let resolved = resolve_permission_dependencies(&catalog, ["edit-patient-demographics"]);
/// assert!(resolved.contains(&"view-patient-demographics".to_string()));
/// ```
#[must_use]
pub fn resolve_permission_dependencies<I, S>(catalog: &PermissionCatalog, codes: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut resolved: BTreeSet<String> = BTreeSet::new();
    let mut queue: VecDeque<String> = VecDeque::new();

    for code in codes {
        let code = code.as_ref();
        if resolved.insert(code.to_string()) {
            queue.push_back(code.to_string());
        }
    }

    let selected = resolved.len();

    while let Some(code) = queue.pop_front() {
        for dep in catalog.dependencies_of(&code) {
            if resolved.insert(dep.clone()) {
                tracing::trace!(code = %code, dependency = %dep, "Adding permission dependency");
                queue.push_back(dep.clone());
            }
        }
    }

    if resolved.len() > selected {
        tracing::debug!(
            selected,
            resolved = resolved.len(),
            "Resolved permission dependencies"
        );
    }

    resolved.into_iter().collect()
}

/// Returns the dependencies the resolver would add to `codes`, sorted.
#[must_use]
pub fn missing_dependencies<I, S>(catalog: &PermissionCatalog, codes: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let selected: HashSet<String> = codes.into_iter().map(|c| c.as_ref().to_string()).collect();
    resolve_permission_dependencies(catalog, &selected)
        .into_iter()
        .filter(|c| !selected.contains(c))
        .collect()
}

/// Returns every code that requires `code`, directly or transitively, sorted.
///
/// Used to cascade a deselection: removing `code` from a closed selection
/// means removing its dependents too.
#[must_use]
pub fn dependents_of(catalog: &PermissionCatalog, code: &str) -> Vec<String> {
    let mut dependents: BTreeSet<String> = BTreeSet::new();
    let mut queue: VecDeque<String> = VecDeque::from([code.to_string()]);

    while let Some(target) = queue.pop_front() {
        for candidate in catalog.codes() {
            if candidate != code
                && catalog.dependencies_of(candidate).iter().any(|d| *d == target)
                && dependents.insert(candidate.to_string())
            {
                queue.push_back(candidate.to_string());
            }
        }
    }

    dependents.into_iter().collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::CatalogRegistry;
    use std::sync::Arc;

    fn catalog() -> Arc<PermissionCatalog> {
        CatalogRegistry::global().get("en").unwrap()
    }

    #[test]
    fn test_transitive_closure() {
        let resolved = resolve_permission_dependencies(&catalog(), ["edit-patient-demographics"]);
        assert_eq!(
            resolved,
            vec![
                "edit-patient-demographics",
                "view-patient-demographics",
                "view-patient-list"
            ]
        );
    }

    #[test]
    fn test_empty_selection() {
        let none: [&str; 0] = [];
        assert!(resolve_permission_dependencies(&catalog(), none).is_empty());
    }

    #[test]
    fn test_idempotent() {
        let catalog = catalog();
        let once = resolve_permission_dependencies(&catalog, ["submit-claims", "manage-roles"]);
        let twice = resolve_permission_dependencies(&catalog, &once);
        assert_eq!(once, twice);
    }

    #[test]
    fn test_monotonic_and_duplicates_tolerated() {
        let input = ["view-encounters", "prescribe-medications", "view-encounters"];
        let resolved = resolve_permission_dependencies(&catalog(), input);
        for code in input {
            assert!(resolved.iter().any(|c| c == code));
        }
        assert_eq!(
            resolved.iter().filter(|c| *c == "view-encounters").count(),
            1
        );
    }

    #[test]
    fn test_order_independent() {
        let catalog = catalog();
        let a = resolve_permission_dependencies(&catalog, ["manage-schedules", "edit-procedures"]);
        let b = resolve_permission_dependencies(&catalog, ["edit-procedures", "manage-schedules"]);
        assert_eq!(a, b);
    }

    #[test]
    fn test_closed_under_dependencies() {
        let catalog = catalog();
        let resolved = resolve_permission_dependencies(&catalog, catalog.codes());
        for code in &resolved {
            for dep in catalog.dependencies_of(code) {
                assert!(resolved.contains(dep));
            }
        }
    }

    #[test]
    fn test_unknown_code_passes_through() {
        let resolved = resolve_permission_dependencies(&catalog(), ["legacy-flag"]);
        assert_eq!(resolved, vec!["legacy-flag"]);
    }

    #[test]
    fn test_selection_already_closed() {
        use crate::catalog::tests::{category, perm};
        use crate::catalog::AccessLevel;

        let catalog = PermissionCatalog::from_categories(
            "en",
            vec![category(
                "c",
                1,
                vec![
                    perm("a", None, AccessLevel::Read, &["b"]),
                    perm("b", None, AccessLevel::Read, &[]),
                ],
            )],
        )
        .unwrap();
        assert_eq!(resolve_permission_dependencies(&catalog, ["a", "b", "a"]), vec!["a", "b"]);
    }

    #[test]
    fn test_missing_dependencies() {
        let missing = missing_dependencies(
            &catalog(),
            ["edit-patient-demographics", "view-patient-list"],
        );
        assert_eq!(missing, vec!["view-patient-demographics"]);
    }

    #[test]
    fn test_dependents_of() {
        let dependents = dependents_of(&catalog(), "view-patient-demographics");
        assert!(dependents.contains(&"edit-patient-demographics".to_string()));
        assert!(dependents.contains(&"delete-patient".to_string()));
        // transitive: edit-allergies -> view-allergies -> view-patient-demographics
        assert!(dependents.contains(&"edit-allergies".to_string()));
        assert!(!dependents.contains(&"view-patient-list".to_string()));
    }
}
