//! Permission matrix engine.
//!
//! A matrix is one [`PermissionRow`] per resource type of
//! [`PERMISSION_RESOURCES`], each row holding a boolean per interaction. The
//! matrix is the editing view of a role; it is read from and written back to
//! the role's AccessPolicy through the canonical [`ResourceGrant`] model.
//!
//! Within a row, `update`, `delete` and `search` imply `read`. The implied
//! cell is set automatically and never cleared when the triggering cell is.

use std::collections::BTreeMap;

use octofhir_policy_store::{
    AccessPolicy, AccessPolicyResource, Interaction, PolicyStore, StoreResult,
};
use serde::{Deserialize, Serialize};

use crate::grant::{PolicyEncoding, ResourceGrant, decode_rules};

/// Resource types shown in the permission matrix, in display order.
pub const PERMISSION_RESOURCES: &[&str] = &[
    "Patient",
    "AllergyIntolerance",
    "Immunization",
    "Encounter",
    "Observation",
    "Condition",
    "Procedure",
    "DocumentReference",
    "MedicationRequest",
    "ServiceRequest",
    "DiagnosticReport",
    "Appointment",
    "Schedule",
    "Invoice",
    "Claim",
    "Coverage",
    "Practitioner",
    "PractitionerRole",
    "Organization",
    "AccessPolicy",
    "AuditEvent",
];

// =============================================================================
// Permission Row
// =============================================================================

/// One resource type's interactions in the permission matrix.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PermissionRow {
    /// FHIR resource type.
    pub resource_type: String,
    #[serde(default)]
    pub create: bool,
    #[serde(default)]
    pub read: bool,
    #[serde(default)]
    pub update: bool,
    #[serde(default)]
    pub delete: bool,
    #[serde(default)]
    pub search: bool,
}

impl PermissionRow {
    /// Creates a row with every cell cleared.
    #[must_use]
    pub fn new(resource_type: impl Into<String>) -> Self {
        Self {
            resource_type: resource_type.into(),
            create: false,
            read: false,
            update: false,
            delete: false,
            search: false,
        }
    }

    /// Creates a row with every cell set.
    #[must_use]
    pub fn full(resource_type: impl Into<String>) -> Self {
        Self {
            resource_type: resource_type.into(),
            create: true,
            read: true,
            update: true,
            delete: true,
            search: true,
        }
    }

    /// Builds a row from a grant.
    #[must_use]
    pub fn from_grant(grant: &ResourceGrant) -> Self {
        let mut row = Self::new(grant.resource_type.clone());
        for interaction in &grant.interactions {
            row.set(*interaction, true);
        }
        row
    }

    /// Converts the row to a grant.
    #[must_use]
    pub fn to_grant(&self) -> ResourceGrant {
        ResourceGrant::with_interactions(self.resource_type.clone(), self.interactions())
    }

    /// Returns the cell for `interaction`.
    #[must_use]
    pub fn get(&self, interaction: Interaction) -> bool {
        match interaction {
            Interaction::Create => self.create,
            Interaction::Delete => self.delete,
            Interaction::Read => self.read,
            Interaction::Search => self.search,
            Interaction::Update => self.update,
        }
    }

    /// Sets the cell for `interaction`. No dependency rule is applied.
    pub fn set(&mut self, interaction: Interaction, value: bool) {
        let cell = match interaction {
            Interaction::Create => &mut self.create,
            Interaction::Delete => &mut self.delete,
            Interaction::Read => &mut self.read,
            Interaction::Search => &mut self.search,
            Interaction::Update => &mut self.update,
        };
        *cell = value;
    }

    /// Returns `true` if any cell is set.
    #[must_use]
    pub fn any(&self) -> bool {
        self.create || self.read || self.update || self.delete || self.search
    }

    /// Set interactions, sorted.
    pub fn interactions(&self) -> impl Iterator<Item = Interaction> + '_ {
        Interaction::ALL.into_iter().filter(|i| self.get(*i))
    }

    /// ORs `other` into this row, cell by cell.
    pub fn merge(&mut self, other: &PermissionRow) {
        self.create |= other.create;
        self.read |= other.read;
        self.update |= other.update;
        self.delete |= other.delete;
        self.search |= other.search;
    }

    fn apply_implied(&mut self, operation: Interaction) {
        for implied in implied_interactions(operation) {
            self.set(*implied, true);
        }
    }
}

/// Interactions that enabling `operation` turns on in the same row.
#[must_use]
pub fn implied_interactions(operation: Interaction) -> &'static [Interaction] {
    match operation {
        Interaction::Update | Interaction::Delete | Interaction::Search => &[Interaction::Read],
        Interaction::Create | Interaction::Read => &[],
    }
}

// =============================================================================
// Pure conversions
// =============================================================================

/// An all-false matrix over [`PERMISSION_RESOURCES`].
#[must_use]
pub fn empty_matrix() -> Vec<PermissionRow> {
    PERMISSION_RESOURCES
        .iter()
        .map(|rt| PermissionRow::new(*rt))
        .collect()
}

/// Builds the matrix for stored resource rules.
///
/// Rules for resource types outside [`PERMISSION_RESOURCES`] are ignored.
#[must_use]
pub fn matrix_from_resources(resources: &[AccessPolicyResource]) -> Vec<PermissionRow> {
    let grants = decode_rules(resources);
    PERMISSION_RESOURCES
        .iter()
        .map(|rt| match grants.get(*rt) {
            Some(grant) => PermissionRow::from_grant(grant),
            None => PermissionRow::new(*rt),
        })
        .collect()
}

/// Encodes matrix rows as resource rules.
///
/// Rows with no set cell are omitted. Each rule carries both the `readonly`
/// flag and the exact `interaction` array, in row order.
#[must_use]
pub fn resources_from_matrix(rows: &[PermissionRow]) -> Vec<AccessPolicyResource> {
    rows.iter()
        .filter(|row| row.any())
        .map(|row| row.to_grant().to_rule(PolicyEncoding::Both))
        .collect()
}

// =============================================================================
// Store-backed operations
// =============================================================================

/// Reads a policy and returns its permission matrix.
///
/// # Errors
///
/// Store errors are returned unchanged.
pub async fn get_permission_matrix<S>(
    store: &S,
    policy_id: &str,
) -> StoreResult<Vec<PermissionRow>>
where
    S: PolicyStore + ?Sized,
{
    let policy = store.read(policy_id).await?;
    let matrix = matrix_from_resources(&policy.resource);

    tracing::debug!(
        policy_id = %policy_id,
        rules = policy.resource.len(),
        granted = matrix.iter().filter(|r| r.any()).count(),
        "Loaded permission matrix"
    );

    Ok(matrix)
}

/// Replaces a policy's resource rules with the encoding of `rows`.
///
/// Only `resource` changes; name, description, meta and unknown fields are
/// kept. A rule's `criteria` survives when the new matrix still grants its
/// resource type.
///
/// # Errors
///
/// Store errors are returned unchanged. The policy is written back with the
/// `meta.versionId` it was read with, so a concurrent edit in between fails
/// with `StoreError::VersionConflict`.
pub async fn update_permission_matrix<S>(
    store: &S,
    policy_id: &str,
    rows: &[PermissionRow],
) -> StoreResult<AccessPolicy>
where
    S: PolicyStore + ?Sized,
{
    let mut policy = store.read(policy_id).await?;

    let criteria: BTreeMap<&str, &str> = policy
        .resource
        .iter()
        .filter_map(|r| r.criteria.as_deref().map(|c| (r.resource_type.as_str(), c)))
        .collect();

    let resources: Vec<AccessPolicyResource> = resources_from_matrix(rows)
        .into_iter()
        .map(|mut rule| {
            if let Some(c) = criteria.get(rule.resource_type.as_str()) {
                tracing::trace!(resource_type = %rule.resource_type, "Keeping rule criteria");
                rule.criteria = Some((*c).to_string());
            }
            rule
        })
        .collect();

    policy.resource = resources;
    let updated = store.update(&policy).await.inspect_err(|e| {
        tracing::warn!(
            policy_id = %policy_id,
            category = %e.category(),
            error = %e,
            "Permission matrix update rejected"
        );
    })?;

    tracing::info!(
        policy_id = %policy_id,
        rules = updated.resource.len(),
        "Permission matrix updated"
    );

    Ok(updated)
}

// =============================================================================
// Cell editing
// =============================================================================

/// Applies the per-operation dependency rule for one cell.
///
/// For `update`, `delete` and `search` the row matching `resource_type` gets
/// `read` set. Any other operation name, or a resource type with no row,
/// returns an unchanged copy. Only the matching row is touched.
#[must_use]
pub fn resolve_permission_dependencies_for_operation(
    resource_type: &str,
    operation: &str,
    rows: &[PermissionRow],
) -> Vec<PermissionRow> {
    let Ok(operation) = operation.parse::<Interaction>() else {
        return rows.to_vec();
    };

    rows.iter()
        .map(|row| {
            let mut row = row.clone();
            if row.resource_type == resource_type {
                row.apply_implied(operation);
            }
            row
        })
        .collect()
}

/// Sets one cell and applies the dependency rule.
///
/// Clearing a cell never clears the cells it implied.
#[must_use]
pub fn toggle_permission(
    rows: &[PermissionRow],
    resource_type: &str,
    operation: Interaction,
    value: bool,
) -> Vec<PermissionRow> {
    rows.iter()
        .map(|row| {
            let mut row = row.clone();
            if row.resource_type == resource_type {
                row.set(operation, value);
                if value {
                    row.apply_implied(operation);
                }
            }
            row
        })
        .collect()
}
