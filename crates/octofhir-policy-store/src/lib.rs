//! # octofhir-policy-store
//!
//! AccessPolicy resource model and storage abstraction for OctoFHIR role
//! management.
//!
//! This crate defines the contract between the permission engine and
//! whatever persists roles:
//!
//! - [`AccessPolicy`] / [`AccessPolicyResource`] - the FHIR-shaped resource
//! - [`PolicyStore`] - async read/create/update/delete
//! - [`StoreError`] - storage failures, propagated unchanged by callers
//! - [`InMemoryPolicyStore`] - a concurrent in-memory backend

mod error;
pub mod memory;
pub mod resource;
mod traits;

pub use error::{ErrorCategory, StoreError};
pub use memory::InMemoryPolicyStore;
pub use resource::{
    ACCESS_POLICY_TYPE, AccessPolicy, AccessPolicyResource, Interaction, UnknownInteraction,
};
pub use traits::PolicyStore;

/// Type alias for a store result.
pub type StoreResult<T> = Result<T, StoreError>;

/// Type alias for a shareable store trait object.
pub type DynPolicyStore = std::sync::Arc<dyn PolicyStore>;
