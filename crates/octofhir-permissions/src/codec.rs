//! Conversion between permission codes and AccessPolicy resource rules.
//!
//! Encoding resolves dependencies first, groups the resolved permissions by
//! their bound resource type and unions the interactions implied by each
//! permission's access level. Decoding is the inverse: a catalog permission
//! is granted when the stored rule covers every interaction its access level
//! implies.

use std::collections::{BTreeMap, BTreeSet};

use octofhir_policy_store::AccessPolicyResource;

use crate::catalog::PermissionCatalog;
use crate::grant::{PolicyEncoding, ResourceGrant, decode_rules};
use crate::resolver::resolve_permission_dependencies;

/// Builds canonical grants from selected permission codes.
///
/// Dependencies are resolved first. Unknown codes and permissions without a
/// resource type contribute nothing. Grants are ordered by resource type.
#[must_use]
pub fn permissions_to_grants<I, S>(
    catalog: &PermissionCatalog,
    codes: I,
) -> Vec<ResourceGrant>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut grants: BTreeMap<String, ResourceGrant> = BTreeMap::new();

    for code in resolve_permission_dependencies(catalog, codes) {
        let Some(permission) = catalog.get(&code) else {
            tracing::trace!(code = %code, "Skipping unknown permission code");
            continue;
        };
        let Some(resource_type) = &permission.resource_type else {
            tracing::trace!(code = %code, "Skipping permission without resource type");
            continue;
        };

        grants
            .entry(resource_type.clone())
            .or_insert_with(|| ResourceGrant::new(resource_type.clone()))
            .interactions
            .extend(permission.access_level.interactions().iter().copied());
    }

    grants.into_values().collect()
}

/// Encodes selected permission codes as AccessPolicy resource rules.
///
/// With [`PolicyEncoding::Readonly`] a rule is read-only only when every
/// permission mapped to its resource type has the `read` access level. With
/// [`PolicyEncoding::Interactions`] each rule lists the sorted union of the
/// interactions implied by its permissions.
///
/// # Example
///
/// ```ignore
/// let rules = permissions_to_access_policy(
///     &catalog,
///     ["view-patient-demographics", "view-encounters"],
///     PolicyEncoding::Readonly,
/// );
/// assert!(rules.iter().all(|r| r.readonly == Some(true)));
/// ```
#[must_use]
pub fn permissions_to_access_policy<I, S>(
    catalog: &PermissionCatalog,
    codes: I,
    encoding: PolicyEncoding,
) -> Vec<AccessPolicyResource>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let rules: Vec<AccessPolicyResource> = permissions_to_grants(catalog, codes)
        .iter()
        .map(|grant| grant.to_rule(encoding))
        .collect();

    tracing::debug!(
        rules = rules.len(),
        encoding = ?encoding,
        "Encoded permissions as AccessPolicy rules"
    );
    rules
}

/// Decodes AccessPolicy resource rules into the catalog permission codes they
/// grant, sorted.
///
/// For a legacy read-only rule only `read` permissions of that resource type
/// are returned; for a full-access rule all of them are.
#[must_use]
pub fn access_policy_to_permissions(
    catalog: &PermissionCatalog,
    resources: &[AccessPolicyResource],
) -> Vec<String> {
    let mut codes: BTreeSet<String> = BTreeSet::new();

    for grant in decode_rules(resources).values() {
        for permission in catalog.permissions_for_resource(&grant.resource_type) {
            if grant.covers(permission.access_level.interactions()) {
                codes.insert(permission.code.clone());
            }
        }
    }

    codes.into_iter().collect()
}
