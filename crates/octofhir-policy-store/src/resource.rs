//! AccessPolicy resource model.
//!
//! The FHIR-shaped `AccessPolicy` resource as persisted by the resource
//! store. Only the subset used by role management is typed; every other
//! field round-trips untouched through [`AccessPolicy::extra`].
//!
//! Two encodings of a resource rule coexist in stored data:
//!
//! - the legacy `readonly` flag (read-only vs. full access)
//! - the `interaction` array (`create`, `read`, `update`, `delete`, `search`)
//!
//! Both are accepted on read; see `octofhir-permissions` for the decoding
//! rules.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// FHIR resource type name of the policy resource.
pub const ACCESS_POLICY_TYPE: &str = "AccessPolicy";

// =============================================================================
// Interaction
// =============================================================================

/// A FHIR-style interaction granted on a resource type.
///
/// Variants are declared in alphabetical order so that the derived `Ord`
/// matches the sorted order of the serialized `interaction` array.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Interaction {
    /// Create a new resource.
    Create,
    /// Delete a resource.
    Delete,
    /// Read a resource by id.
    Read,
    /// Search resources of a type.
    Search,
    /// Update an existing resource.
    Update,
}

impl Interaction {
    /// All interactions, in serialization order.
    pub const ALL: [Interaction; 5] = [
        Interaction::Create,
        Interaction::Delete,
        Interaction::Read,
        Interaction::Search,
        Interaction::Update,
    ];

    /// Returns the wire name of the interaction.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Create => "create",
            Self::Delete => "delete",
            Self::Read => "read",
            Self::Search => "search",
            Self::Update => "update",
        }
    }

    /// Returns `true` for interactions that change stored data.
    #[must_use]
    pub fn is_mutating(&self) -> bool {
        matches!(self, Self::Create | Self::Update | Self::Delete)
    }
}

impl fmt::Display for Interaction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when parsing an unknown interaction name.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unknown interaction: {0}")]
pub struct UnknownInteraction(pub String);

impl FromStr for Interaction {
    type Err = UnknownInteraction;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "create" => Ok(Self::Create),
            "delete" => Ok(Self::Delete),
            "read" => Ok(Self::Read),
            "search" => Ok(Self::Search),
            "update" => Ok(Self::Update),
            other => Err(UnknownInteraction(other.to_string())),
        }
    }
}

// =============================================================================
// AccessPolicy Resource Rule
// =============================================================================

/// One resource-level rule inside an AccessPolicy.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccessPolicyResource {
    /// The FHIR resource type the rule applies to.
    pub resource_type: String,

    /// Legacy encoding: `true` grants read-only access, `false` full access.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub readonly: Option<bool>,

    /// Interaction encoding: the exact set of granted interactions.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub interaction: Option<Vec<Interaction>>,

    /// Search criteria restricting which resources the rule covers.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub criteria: Option<String>,
}

impl AccessPolicyResource {
    /// Creates a rule in the legacy readonly encoding.
    #[must_use]
    pub fn readonly(resource_type: impl Into<String>, readonly: bool) -> Self {
        Self {
            resource_type: resource_type.into(),
            readonly: Some(readonly),
            ..Default::default()
        }
    }

    /// Creates a rule in the interaction encoding.
    #[must_use]
    pub fn with_interactions(
        resource_type: impl Into<String>,
        interactions: impl IntoIterator<Item = Interaction>,
    ) -> Self {
        Self {
            resource_type: resource_type.into(),
            interaction: Some(interactions.into_iter().collect()),
            ..Default::default()
        }
    }

    /// Sets the criteria string.
    #[must_use]
    pub fn with_criteria(mut self, criteria: impl Into<String>) -> Self {
        self.criteria = Some(criteria.into());
        self
    }
}

// =============================================================================
// AccessPolicy
// =============================================================================

/// FHIR-shaped AccessPolicy resource representing one role.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccessPolicy {
    /// Always `"AccessPolicy"`.
    #[serde(default = "access_policy_type")]
    pub resource_type: String,

    /// Logical id, assigned by the store on create when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    /// Role name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    /// Role description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Resource metadata (versionId, lastUpdated, tags, ...).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meta: Option<Value>,

    /// Resource-level access rules.
    #[serde(default)]
    pub resource: Vec<AccessPolicyResource>,

    /// Any other fields present on the stored resource.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

fn access_policy_type() -> String {
    ACCESS_POLICY_TYPE.to_string()
}

impl Default for AccessPolicy {
    fn default() -> Self {
        Self {
            resource_type: access_policy_type(),
            id: None,
            name: None,
            description: None,
            meta: None,
            resource: Vec::new(),
            extra: Map::new(),
        }
    }
}

impl AccessPolicy {
    /// Creates an empty policy with the given role name.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            ..Default::default()
        }
    }

    /// Sets the id.
    #[must_use]
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    /// Sets the description.
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Replaces the resource rules.
    #[must_use]
    pub fn with_resources(mut self, resources: Vec<AccessPolicyResource>) -> Self {
        self.resource = resources;
        self
    }

    /// Returns `meta.versionId`, if present.
    #[must_use]
    pub fn version_id(&self) -> Option<&str> {
        self.meta.as_ref()?.get("versionId")?.as_str()
    }

    /// Finds the first rule for the given resource type.
    #[must_use]
    pub fn rule_for(&self, resource_type: &str) -> Option<&AccessPolicyResource> {
        self.resource.iter().find(|r| r.resource_type == resource_type)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_interaction_order_is_alphabetical() {
        let mut all = vec![
            Interaction::Update,
            Interaction::Search,
            Interaction::Read,
            Interaction::Delete,
            Interaction::Create,
        ];
        all.sort();
        let names: Vec<&str> = all.iter().map(Interaction::as_str).collect();
        assert_eq!(names, vec!["create", "delete", "read", "search", "update"]);
    }

    #[test]
    fn test_interaction_parse() {
        assert_eq!("search".parse::<Interaction>(), Ok(Interaction::Search));
        assert!("patch".parse::<Interaction>().is_err());
    }

    #[test]
    fn test_deserialize_legacy_and_interaction_rules() {
        let policy: AccessPolicy = serde_json::from_value(json!({
            "resourceType": "AccessPolicy",
            "id": "nurse",
            "name": "Nurse",
            "resource": [
                {"resourceType": "Patient", "readonly": true},
                {"resourceType": "Observation", "interaction": ["read", "create"]}
            ]
        }))
        .unwrap();

        assert_eq!(policy.resource.len(), 2);
        assert_eq!(policy.resource[0].readonly, Some(true));
        assert_eq!(
            policy.resource[1].interaction,
            Some(vec![Interaction::Read, Interaction::Create])
        );
    }

    #[test]
    fn test_unknown_fields_round_trip() {
        let input = json!({
            "resourceType": "AccessPolicy",
            "id": "p1",
            "compartment": {"reference": "Organization/o1"},
            "resource": []
        });
        let policy: AccessPolicy = serde_json::from_value(input.clone()).unwrap();
        assert!(policy.extra.contains_key("compartment"));
        assert_eq!(serde_json::to_value(&policy).unwrap(), input);
    }

    #[test]
    fn test_absent_fields_are_skipped() {
        let rule = AccessPolicyResource::readonly("Patient", false);
        assert_eq!(
            serde_json::to_value(&rule).unwrap(),
            json!({"resourceType": "Patient", "readonly": false})
        );
    }

    #[test]
    fn test_version_id() {
        let mut policy = AccessPolicy::new("Nurse");
        assert_eq!(policy.version_id(), None);

        policy.meta = Some(json!({"versionId": "7"}));
        assert_eq!(policy.version_id(), Some("7"));
    }
}
