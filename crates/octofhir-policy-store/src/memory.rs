//! In-memory policy store.
//!
//! A [`PolicyStore`] backed by a concurrent map. Used by tests and by
//! embedders that do not need persistence.
//!
//! # Example
//!
//! ```ignore
//! use octofhir_policy_store::{AccessPolicy, InMemoryPolicyStore, PolicyStore};
//!
//! let store = InMemoryPolicyStore::new();
//! let created = store.create(&AccessPolicy::new("Nurse")).await?;
//! let loaded = store.read(created.id.as_deref().unwrap()).await?;
//! ```

use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use serde_json::{Map, Value};
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;
use uuid::Uuid;

use crate::error::StoreError;
use crate::resource::{ACCESS_POLICY_TYPE, AccessPolicy};
use crate::traits::PolicyStore;
use crate::StoreResult;

/// In-memory AccessPolicy storage.
///
/// Every write stamps `meta.versionId` from a store-wide counter and
/// `meta.lastUpdated` with the current UTC time; other `meta` keys are kept.
/// An update carrying a `meta.versionId` must match the stored version.
#[derive(Debug)]
pub struct InMemoryPolicyStore {
    policies: DashMap<String, AccessPolicy>,
    version_counter: AtomicU64,
}

impl Default for InMemoryPolicyStore {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryPolicyStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self {
            policies: DashMap::new(),
            version_counter: AtomicU64::new(1),
        }
    }

    /// Returns the number of stored policies.
    #[must_use]
    pub fn len(&self) -> usize {
        self.policies.len()
    }

    /// Returns `true` if the store holds no policies.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.policies.is_empty()
    }

    fn next_version(&self) -> String {
        self.version_counter
            .fetch_add(1, Ordering::SeqCst)
            .to_string()
    }

    fn stamp(&self, policy: &mut AccessPolicy) -> StoreResult<()> {
        let last_updated = OffsetDateTime::now_utc()
            .format(&Rfc3339)
            .map_err(|e| StoreError::internal(format!("Failed to format timestamp: {e}")))?;

        let mut meta = match policy.meta.take() {
            Some(Value::Object(map)) => map,
            _ => Map::new(),
        };
        meta.insert("versionId".to_string(), Value::String(self.next_version()));
        meta.insert("lastUpdated".to_string(), Value::String(last_updated));
        policy.meta = Some(Value::Object(meta));
        policy.resource_type = ACCESS_POLICY_TYPE.to_string();
        Ok(())
    }
}

#[async_trait]
impl PolicyStore for InMemoryPolicyStore {
    async fn read(&self, id: &str) -> StoreResult<AccessPolicy> {
        self.policies
            .get(id)
            .map(|entry| entry.value().clone())
            .ok_or_else(|| StoreError::not_found(ACCESS_POLICY_TYPE, id))
    }

    async fn create(&self, policy: &AccessPolicy) -> StoreResult<AccessPolicy> {
        let id = policy
            .id
            .clone()
            .unwrap_or_else(|| Uuid::new_v4().to_string());

        match self.policies.entry(id.clone()) {
            Entry::Occupied(_) => Err(StoreError::already_exists(ACCESS_POLICY_TYPE, id)),
            Entry::Vacant(slot) => {
                let mut stored = policy.clone();
                stored.id = Some(id.clone());
                self.stamp(&mut stored)?;
                slot.insert(stored.clone());
                tracing::debug!(policy_id = %id, "AccessPolicy created");
                Ok(stored)
            }
        }
    }

    async fn update(&self, policy: &AccessPolicy) -> StoreResult<AccessPolicy> {
        let id = policy
            .id
            .as_deref()
            .ok_or_else(|| StoreError::invalid_resource("AccessPolicy update requires an id"))?;

        let mut entry = self
            .policies
            .get_mut(id)
            .ok_or_else(|| StoreError::not_found(ACCESS_POLICY_TYPE, id))?;

        if let Some(expected) = policy.version_id() {
            let actual = entry.version_id().unwrap_or("1");
            if actual != expected {
                return Err(StoreError::version_conflict(expected, actual));
            }
        }

        let mut stored = policy.clone();
        self.stamp(&mut stored)?;
        *entry = stored.clone();
        tracing::debug!(policy_id = %id, rules = stored.resource.len(), "AccessPolicy updated");
        Ok(stored)
    }

    async fn delete(&self, id: &str) -> StoreResult<()> {
        self.policies
            .remove(id)
            .map(|_| ())
            .ok_or_else(|| StoreError::not_found(ACCESS_POLICY_TYPE, id))
    }
}
