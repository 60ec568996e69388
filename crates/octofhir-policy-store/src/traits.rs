//! Policy store trait.
//!
//! Defines the interface for AccessPolicy persistence. The permission engine
//! only ever talks to the store through this trait; retries, locking and
//! transport concerns belong to the implementation.

use async_trait::async_trait;

use crate::StoreResult;
use crate::resource::AccessPolicy;

/// Storage operations for AccessPolicy resources.
///
/// # Example
///
/// ```ignore
/// use octofhir_policy_store::PolicyStore;
///
/// async fn rename(store: &dyn PolicyStore, id: &str) -> StoreResult<AccessPolicy> {
///     let mut policy = store.read(id).await?;
///     policy.name = Some("Charge nurse".to_string());
///     store.update(&policy).await
/// }
/// ```
#[async_trait]
pub trait PolicyStore: Send + Sync {
    /// Read a policy by its id.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::NotFound` if the policy does not exist, or an
    /// infrastructure error if the backend fails.
    async fn read(&self, id: &str) -> StoreResult<AccessPolicy>;

    /// Create a new policy.
    ///
    /// An id is generated if the policy does not carry one.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::AlreadyExists` if a policy with the same id exists.
    async fn create(&self, policy: &AccessPolicy) -> StoreResult<AccessPolicy>;

    /// Replace an existing policy.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::InvalidResource` if the policy has no id,
    /// `StoreError::NotFound` if it does not exist and
    /// `StoreError::VersionConflict` if it carries a stale `meta.versionId`.
    async fn update(&self, policy: &AccessPolicy) -> StoreResult<AccessPolicy>;

    /// Delete a policy.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::NotFound` if the policy does not exist.
    async fn delete(&self, id: &str) -> StoreResult<()>;
}
