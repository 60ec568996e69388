//! Department scoping of resource rules.
//!
//! Scoping restricts a role to one department by attaching a compartment
//! search criteria to the rules of patient-data resource types:
//!
//! ```text
//! Patient?_compartment=Organization/dept-001
//! ```

use std::collections::HashSet;
use std::sync::LazyLock;

use octofhir_policy_store::AccessPolicyResource;

/// Resource types scoped by default.
pub const DEFAULT_SCOPED_RESOURCE_TYPES: &[&str] = &[
    "Patient",
    "Encounter",
    "Observation",
    "Condition",
    "Procedure",
    "MedicationRequest",
    "DiagnosticReport",
    "DocumentReference",
    "ServiceRequest",
    "AllergyIntolerance",
    "Immunization",
    "Appointment",
];

static DEFAULT_SCOPING: LazyLock<DepartmentScoping> = LazyLock::new(DepartmentScoping::default);

/// Rewrites resource rules of a fixed set of resource types.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DepartmentScoping {
    scoped: HashSet<String>,
}

impl Default for DepartmentScoping {
    fn default() -> Self {
        Self::new(DEFAULT_SCOPED_RESOURCE_TYPES.iter().map(|t| (*t).to_string()))
    }
}

impl DepartmentScoping {
    /// Creates a rewriter for the given resource types.
    #[must_use]
    pub fn new(resource_types: impl IntoIterator<Item = String>) -> Self {
        Self {
            scoped: resource_types.into_iter().collect(),
        }
    }

    /// Returns `true` if rules for `resource_type` receive a criteria.
    #[must_use]
    pub fn is_scoped(&self, resource_type: &str) -> bool {
        self.scoped.contains(resource_type)
    }

    /// Returns a copy of `resources` with scoped rules restricted to
    /// `department_id`.
    ///
    /// Scoped rules get `criteria` replaced and keep every other field. Other
    /// rules are cloned unchanged. Order is preserved.
    #[must_use]
    pub fn apply(
        &self,
        resources: &[AccessPolicyResource],
        department_id: &str,
    ) -> Vec<AccessPolicyResource> {
        let scoped: Vec<AccessPolicyResource> = resources
            .iter()
            .map(|rule| {
                if self.is_scoped(&rule.resource_type) {
                    AccessPolicyResource {
                        criteria: Some(compartment_criteria(&rule.resource_type, department_id)),
                        ..rule.clone()
                    }
                } else {
                    rule.clone()
                }
            })
            .collect();

        tracing::debug!(
            department_id = %department_id,
            rules = resources.len(),
            scoped = resources.iter().filter(|r| self.is_scoped(&r.resource_type)).count(),
            "Applied department scoping"
        );

        scoped
    }
}

/// Scopes `resources` to `department_id` using the default resource types.
#[must_use]
pub fn add_department_scoping(
    resources: &[AccessPolicyResource],
    department_id: &str,
) -> Vec<AccessPolicyResource> {
    DEFAULT_SCOPING.apply(resources, department_id)
}

fn compartment_criteria(resource_type: &str, department_id: &str) -> String {
    format!("{resource_type}?_compartment=Organization/{department_id}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use octofhir_policy_store::Interaction;

    #[test]
    fn test_criteria_format() {
        let scoped = add_department_scoping(
            &[AccessPolicyResource::readonly("Patient", true)],
            "dept-001",
        );
        assert_eq!(
            scoped[0].criteria.as_deref(),
            Some("Patient?_compartment=Organization/dept-001")
        );
        assert_eq!(scoped[0].readonly, Some(true));
    }

    #[test]
    fn test_unscoped_type_passes_through() {
        let input = vec![AccessPolicyResource::readonly("Practitioner", false)];
        assert_eq!(add_department_scoping(&input, "dept-1"), input);
    }

    #[test]
    fn test_input_untouched_and_order_preserved() {
        let input = vec![
            AccessPolicyResource::readonly("Organization", false),
            AccessPolicyResource::with_interactions("Encounter", [Interaction::Read]),
            AccessPolicyResource::readonly("Observation", true)
                .with_criteria("Observation?status=final"),
        ];
        let snapshot = input.clone();

        let scoped = add_department_scoping(&input, "icu");

        assert_eq!(input, snapshot);
        let types: Vec<&str> = scoped.iter().map(|r| r.resource_type.as_str()).collect();
        assert_eq!(types, vec!["Organization", "Encounter", "Observation"]);
        assert_eq!(scoped[0], input[0]);
        assert_eq!(scoped[1].interaction, Some(vec![Interaction::Read]));
        assert_eq!(
            scoped[2].criteria.as_deref(),
            Some("Observation?_compartment=Organization/icu")
        );
    }

    #[test]
    fn test_custom_scoped_set() {
        let scoping = DepartmentScoping::new(["Practitioner".to_string()]);
        assert!(scoping.is_scoped("Practitioner"));
        assert!(!scoping.is_scoped("Patient"));

        let scoped = scoping.apply(
            &[
                AccessPolicyResource::readonly("Practitioner", true),
                AccessPolicyResource::readonly("Patient", true),
            ],
            "dept-9",
        );
        assert!(scoped[0].criteria.is_some());
        assert!(scoped[1].criteria.is_none());
    }

    #[test]
    fn test_default_set() {
        let scoping = DepartmentScoping::default();
        for rt in DEFAULT_SCOPED_RESOURCE_TYPES {
            assert!(scoping.is_scoped(rt));
        }
        assert!(!scoping.is_scoped("AccessPolicy"));
    }

    #[test]
    fn test_shared_default_matches_fresh_default() {
        assert_eq!(*DEFAULT_SCOPING, DepartmentScoping::default());
        let input = vec![AccessPolicyResource::readonly("Immunization", true)];
        assert_eq!(
            add_department_scoping(&input, "peds"),
            DepartmentScoping::default().apply(&input, "peds")
        );
    }
}
