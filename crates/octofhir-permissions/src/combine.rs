//! Multi-role permission combination.
//!
//! A user holding several roles gets the union of their matrices: a cell is
//! granted if any role grants it.

use std::collections::HashMap;

use futures_util::future::try_join_all;
use octofhir_policy_store::{PolicyStore, StoreResult};

use crate::matrix::{PERMISSION_RESOURCES, PermissionRow, empty_matrix, get_permission_matrix};

/// ORs matrices cell by cell over [`PERMISSION_RESOURCES`].
///
/// Rows for resource types outside the enumeration are ignored. The result
/// always has one row per enumerated resource type.
#[must_use]
pub fn combine_matrices(matrices: &[Vec<PermissionRow>]) -> Vec<PermissionRow> {
    let mut combined = empty_matrix();
    let index: HashMap<&str, usize> = PERMISSION_RESOURCES
        .iter()
        .enumerate()
        .map(|(i, rt)| (*rt, i))
        .collect();

    for row in matrices.iter().flatten() {
        if let Some(&i) = index.get(row.resource_type.as_str()) {
            combined[i].merge(row);
        }
    }

    combined
}

/// Fetches every policy's matrix concurrently and combines them.
///
/// An empty id list yields the all-false matrix.
///
/// # Errors
///
/// The first store error aborts the combination and is returned unchanged.
pub async fn get_combined_permissions<S, I>(
    store: &S,
    policy_ids: I,
) -> StoreResult<Vec<PermissionRow>>
where
    S: PolicyStore + ?Sized,
    I: IntoIterator,
    I::Item: AsRef<str>,
{
    let ids: Vec<I::Item> = policy_ids.into_iter().collect();
    if ids.is_empty() {
        return Ok(empty_matrix());
    }

    tracing::debug!(policies = ids.len(), "Combining role permissions");

    let matrices =
        try_join_all(ids.iter().map(|id| get_permission_matrix(store, id.as_ref()))).await?;

    Ok(combine_matrices(&matrices))
}
