//! Role conflict detection.
//!
//! Conflicts are derived from role names, not from the permissions the roles
//! actually grant. Names are matched case-insensitively against rule tables:
//!
//! - separation of duties: an administrative role together with a financial
//!   role (`error`)
//! - redundant roles: a superset role together with a role it subsumes
//!   (`warning`)
//! - permission conflict: a read-only archetype together with a write
//!   archetype (`warning`)
//!
//! A custom role named e.g. `"ward-admin"` is not matched. Detection is a
//! total function: it never fails and returns an empty list when nothing
//! applies.

use std::collections::HashSet;
use std::fmt;
use std::sync::LazyLock;

use serde::{Deserialize, Serialize};

use crate::config::ConfigError;

static DEFAULT_DETECTOR: LazyLock<ConflictDetector> =
    LazyLock::new(|| ConflictDetector::new(ConflictRules::default()));

// =============================================================================
// Conflict Types
// =============================================================================

/// Kind of role conflict.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConflictType {
    /// Administrative and financial duties held together.
    SeparationOfDuties,
    /// A role already covered by another assigned role.
    RedundantRoles,
    /// Read-only and write archetypes held together.
    PermissionConflict,
}

impl ConflictType {
    /// Returns the wire name.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::SeparationOfDuties => "separation_of_duties",
            Self::RedundantRoles => "redundant_roles",
            Self::PermissionConflict => "permission_conflict",
        }
    }
}

impl fmt::Display for ConflictType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How serious a conflict is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    Warning,
}

/// A detected role conflict.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleConflict {
    /// Conflict kind.
    #[serde(rename = "type")]
    pub conflict_type: ConflictType,
    /// Severity.
    pub severity: Severity,
    /// The involved role names, lower-cased, in input order.
    pub roles: Vec<String>,
    /// Human-readable explanation.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

// =============================================================================
// Rule Tables
// =============================================================================

/// A role that subsumes other roles.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SupersetRule {
    /// The broader role.
    pub role: String,
    /// Roles whose grants `role` already includes.
    pub subsumes: Vec<String>,
}

/// Role-name tables driving conflict detection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConflictRules {
    /// Administrative roles.
    pub administrative: Vec<String>,
    /// Financial roles.
    pub financial: Vec<String>,
    /// Superset roles and what they subsume.
    pub supersets: Vec<SupersetRule>,
    /// Read-only archetypes.
    pub read_only: Vec<String>,
    /// Write archetypes.
    pub write: Vec<String>,
}

fn names(list: &[&str]) -> Vec<String> {
    list.iter().map(|s| (*s).to_string()).collect()
}

impl Default for ConflictRules {
    fn default() -> Self {
        Self {
            administrative: names(&["admin", "administrator", "system-admin"]),
            financial: names(&["billing", "finance", "accountant", "billing-manager"]),
            supersets: vec![SupersetRule {
                role: "superadmin".to_string(),
                subsumes: names(&["admin", "administrator", "system-admin"]),
            }],
            read_only: names(&["viewer", "read-only", "readonly"]),
            write: names(&["editor", "writer"]),
        }
    }
}

impl ConflictRules {
    /// Validates the rule tables.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidValue` for empty role names or a superset
    /// role that subsumes itself.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let tables = [
            ("administrative", &self.administrative),
            ("financial", &self.financial),
            ("read_only", &self.read_only),
            ("write", &self.write),
        ];
        for (table, roles) in tables {
            if roles.iter().any(|r| r.trim().is_empty()) {
                return Err(ConfigError::InvalidValue(format!(
                    "conflicts.{table} cannot contain empty role names"
                )));
            }
        }

        for rule in &self.supersets {
            let role = normalize(&rule.role);
            if role.is_empty() || rule.subsumes.iter().any(|r| r.trim().is_empty()) {
                return Err(ConfigError::InvalidValue(
                    "conflicts.supersets cannot contain empty role names".to_string(),
                ));
            }
            if rule.subsumes.iter().any(|r| normalize(r) == role) {
                return Err(ConfigError::InvalidValue(format!(
                    "conflicts.supersets: role '{role}' cannot subsume itself"
                )));
            }
        }

        Ok(())
    }
}

// =============================================================================
// Detector
// =============================================================================

/// Matches role-name lists against normalized [`ConflictRules`].
#[derive(Debug, Clone)]
pub struct ConflictDetector {
    administrative: HashSet<String>,
    financial: HashSet<String>,
    supersets: Vec<(String, HashSet<String>)>,
    read_only: HashSet<String>,
    write: HashSet<String>,
}

impl Default for ConflictDetector {
    fn default() -> Self {
        Self::new(ConflictRules::default())
    }
}

impl ConflictDetector {
    /// Creates a detector over `rules`.
    #[must_use]
    pub fn new(rules: ConflictRules) -> Self {
        Self {
            administrative: normalized_set(&rules.administrative),
            financial: normalized_set(&rules.financial),
            supersets: rules
                .supersets
                .iter()
                .map(|rule| (normalize(&rule.role), normalized_set(&rule.subsumes)))
                .collect(),
            read_only: normalized_set(&rules.read_only),
            write: normalized_set(&rules.write),
        }
    }

    /// Detects conflicts in a role assignment.
    ///
    /// At most one conflict per kind is reported, in the order separation of
    /// duties, redundant roles, permission conflict.
    #[must_use]
    pub fn detect<I, S>(&self, role_names: I) -> Vec<RoleConflict>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let roles = distinct_roles(role_names);
        if roles.len() < 2 {
            return Vec::new();
        }

        let mut conflicts = Vec::new();

        let has_admin = roles.iter().any(|r| self.administrative.contains(r));
        let has_financial = roles.iter().any(|r| self.financial.contains(r));
        if has_admin && has_financial {
            conflicts.push(RoleConflict {
                conflict_type: ConflictType::SeparationOfDuties,
                severity: Severity::Error,
                roles: pick(&roles, |r| {
                    self.administrative.contains(r) || self.financial.contains(r)
                }),
                message: Some(
                    "Administrative and financial roles should not be held by the same user"
                        .to_string(),
                ),
            });
        }

        let present: HashSet<&str> = roles.iter().map(String::as_str).collect();
        let mut redundant: HashSet<&str> = HashSet::new();
        for (superset, subsumed) in &self.supersets {
            if !present.contains(superset.as_str()) {
                continue;
            }
            let covered: Vec<&str> = subsumed
                .iter()
                .map(String::as_str)
                .filter(|r| present.contains(r))
                .collect();
            if !covered.is_empty() {
                redundant.insert(superset.as_str());
                redundant.extend(covered);
            }
        }
        if !redundant.is_empty() {
            conflicts.push(RoleConflict {
                conflict_type: ConflictType::RedundantRoles,
                severity: Severity::Warning,
                roles: pick(&roles, |r| redundant.contains(r)),
                message: Some(
                    "Some roles are already included in another assigned role".to_string(),
                ),
            });
        }

        let has_read_only = roles.iter().any(|r| self.read_only.contains(r));
        let has_write = roles.iter().any(|r| self.write.contains(r));
        if has_read_only && has_write {
            conflicts.push(RoleConflict {
                conflict_type: ConflictType::PermissionConflict,
                severity: Severity::Warning,
                roles: pick(&roles, |r| self.read_only.contains(r) || self.write.contains(r)),
                message: Some(
                    "A read-only role is combined with a role that grants write access"
                        .to_string(),
                ),
            });
        }

        if !conflicts.is_empty() {
            tracing::debug!(
                roles = roles.len(),
                conflicts = conflicts.len(),
                "Detected role conflicts"
            );
        }

        conflicts
    }
}

/// Detects conflicts using the built-in rule tables.
#[must_use]
pub fn detect_role_conflicts<I, S>(role_names: I) -> Vec<RoleConflict>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    DEFAULT_DETECTOR.detect(role_names)
}

fn normalize(name: &str) -> String {
    name.trim().to_lowercase()
}

fn normalized_set(list: &[String]) -> HashSet<String> {
    list.iter().map(|r| normalize(r)).filter(|r| !r.is_empty()).collect()
}

/// Normalized, non-empty, de-duplicated names in first-seen order.
fn distinct_roles<I, S>(role_names: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut seen = HashSet::new();
    role_names
        .into_iter()
        .map(|r| normalize(r.as_ref()))
        .filter(|r| !r.is_empty() && seen.insert(r.clone()))
        .collect()
}

fn pick(roles: &[String], keep: impl Fn(&str) -> bool) -> Vec<String> {
    roles.iter().filter(|r| keep(r.as_str())).cloned().collect()
}
