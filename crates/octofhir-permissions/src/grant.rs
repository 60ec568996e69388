//! Canonical resource grants.
//!
//! Stored AccessPolicy rules come in two shapes: the legacy `readonly` flag
//! and the `interaction` array. Internally every rule is a
//! [`ResourceGrant`], a resource type plus the set of granted interactions.
//! Decoding and encoding both shapes goes through this one model.
//!
//! Decoding rules:
//!
//! | stored rule                      | granted interactions          |
//! |----------------------------------|-------------------------------|
//! | `interaction: [...]`             | exactly the listed ones       |
//! | `readonly: true`                 | `read`, `search`              |
//! | `readonly: false` or neither     | all five                      |
//!
//! When a rule carries both fields the interaction array wins.

use std::collections::{BTreeMap, BTreeSet};

use octofhir_policy_store::{AccessPolicyResource, Interaction};
use serde::{Deserialize, Serialize};

/// Which wire shape to emit for resource rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PolicyEncoding {
    /// `readonly` flag only.
    Readonly,
    /// `interaction` array only.
    Interactions,
    /// Both fields; legacy readers see the flag, newer readers the array.
    Both,
}

/// A resource type with the interactions granted on it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceGrant {
    /// FHIR resource type.
    pub resource_type: String,
    /// Granted interactions.
    pub interactions: BTreeSet<Interaction>,
}

impl ResourceGrant {
    /// Creates a grant with no interactions.
    #[must_use]
    pub fn new(resource_type: impl Into<String>) -> Self {
        Self {
            resource_type: resource_type.into(),
            interactions: BTreeSet::new(),
        }
    }

    /// Creates a grant with the given interactions.
    #[must_use]
    pub fn with_interactions(
        resource_type: impl Into<String>,
        interactions: impl IntoIterator<Item = Interaction>,
    ) -> Self {
        Self {
            resource_type: resource_type.into(),
            interactions: interactions.into_iter().collect(),
        }
    }

    /// Decodes a stored rule in either shape.
    #[must_use]
    pub fn from_rule(rule: &AccessPolicyResource) -> Self {
        let interactions = match (&rule.interaction, rule.readonly) {
            (Some(list), _) => list.iter().copied().collect(),
            (None, Some(true)) => [Interaction::Read, Interaction::Search].into_iter().collect(),
            (None, _) => Interaction::ALL.into_iter().collect(),
        };
        Self {
            resource_type: rule.resource_type.clone(),
            interactions,
        }
    }

    /// Returns `true` if no interaction is granted.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.interactions.is_empty()
    }

    /// Returns `true` if `interaction` is granted.
    #[must_use]
    pub fn allows(&self, interaction: Interaction) -> bool {
        self.interactions.contains(&interaction)
    }

    /// Returns `true` if every interaction in `required` is granted.
    #[must_use]
    pub fn covers(&self, required: &[Interaction]) -> bool {
        required.iter().all(|i| self.interactions.contains(i))
    }

    /// Legacy view: read-only unless a mutating interaction is granted.
    #[must_use]
    pub fn is_readonly(&self) -> bool {
        !self.interactions.iter().any(Interaction::is_mutating)
    }

    /// Encodes the grant as a stored rule.
    #[must_use]
    pub fn to_rule(&self, encoding: PolicyEncoding) -> AccessPolicyResource {
        let readonly = matches!(encoding, PolicyEncoding::Readonly | PolicyEncoding::Both)
            .then(|| self.is_readonly());
        let interaction = matches!(encoding, PolicyEncoding::Interactions | PolicyEncoding::Both)
            .then(|| self.interactions.iter().copied().collect());

        AccessPolicyResource {
            resource_type: self.resource_type.clone(),
            readonly,
            interaction,
            criteria: None,
        }
    }
}

/// Decodes stored rules into grants keyed by resource type.
///
/// Several rules for the same resource type are merged by union.
#[must_use]
pub fn decode_rules(rules: &[AccessPolicyResource]) -> BTreeMap<String, ResourceGrant> {
    let mut grants: BTreeMap<String, ResourceGrant> = BTreeMap::new();
    for rule in rules {
        let decoded = ResourceGrant::from_rule(rule);
        grants
            .entry(decoded.resource_type.clone())
            .and_modify(|g| g.interactions.extend(decoded.interactions.iter().copied()))
            .or_insert(decoded);
    }
    grants
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_legacy_shapes() {
        let ro = ResourceGrant::from_rule(&AccessPolicyResource::readonly("Patient", true));
        assert_eq!(
            ro.interactions,
            BTreeSet::from([Interaction::Read, Interaction::Search])
        );
        assert!(ro.is_readonly());

        let rw = ResourceGrant::from_rule(&AccessPolicyResource::readonly("Patient", false));
        assert_eq!(rw.interactions.len(), 5);
        assert!(!rw.is_readonly());

        let bare = ResourceGrant::from_rule(&AccessPolicyResource {
            resource_type: "Patient".to_string(),
            ..Default::default()
        });
        assert_eq!(bare.interactions.len(), 5);
    }

    #[test]
    fn test_interaction_array_wins_over_flag() {
        let rule = AccessPolicyResource {
            resource_type: "Observation".to_string(),
            readonly: Some(false),
            interaction: Some(vec![Interaction::Search, Interaction::Read]),
            criteria: None,
        };
        let grant = ResourceGrant::from_rule(&rule);
        assert!(grant.allows(Interaction::Read));
        assert!(!grant.allows(Interaction::Create));
    }

    #[test]
    fn test_encode_shapes() {
        let grant = ResourceGrant::with_interactions(
            "Patient",
            [Interaction::Update, Interaction::Read, Interaction::Create],
        );

        let legacy = grant.to_rule(PolicyEncoding::Readonly);
        assert_eq!(legacy.readonly, Some(false));
        assert!(legacy.interaction.is_none());

        let rich = grant.to_rule(PolicyEncoding::Interactions);
        assert!(rich.readonly.is_none());
        assert_eq!(
            rich.interaction,
            Some(vec![Interaction::Create, Interaction::Read, Interaction::Update])
        );

        let both = grant.to_rule(PolicyEncoding::Both);
        assert_eq!(both.readonly, Some(false));
        assert!(both.interaction.is_some());
    }

    #[test]
    fn test_search_only_is_readonly() {
        let grant = ResourceGrant::with_interactions("Encounter", [Interaction::Search]);
        assert!(grant.is_readonly());
        assert!(!grant.covers(&[Interaction::Read, Interaction::Search]));
    }

    #[test]
    fn test_decode_rules_merges_duplicates() {
        let grants = decode_rules(&[
            AccessPolicyResource::with_interactions("Patient", [Interaction::Read]),
            AccessPolicyResource::with_interactions("Patient", [Interaction::Update]),
            AccessPolicyResource::readonly("Encounter", true),
        ]);
        assert_eq!(grants.len(), 2);
        assert_eq!(
            grants["Patient"].interactions,
            BTreeSet::from([Interaction::Read, Interaction::Update])
        );
    }
}
