//! Permission declarations
//!
//! An operation declares its permissions as a single entry or a list of
//! entries. Each entry is either a static rule evaluated by the remote policy
//! engine or an opaque predicate evaluated locally against the call context.

use crate::effects::PermissionPredicate;
use crate::{GatehouseError, GatehouseResult};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Rule subject meaning "the caller must own the addressed entity"
pub const OWNER_SUBJECT: &str = "$owner";

/// Static permission rule: subject/action pair checked against a policy flavor.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PermissionRule {
    /// Principal class identifier, or [`OWNER_SUBJECT`]
    pub subject: String,
    /// Domain action name such as `read` or `update`
    pub action: String,
    /// Policy set the rule is evaluated against
    pub flavor: String,
}

impl PermissionRule {
    /// Create a rule
    pub fn new(
        subject: impl Into<String>,
        action: impl Into<String>,
        flavor: impl Into<String>,
    ) -> Self {
        Self {
            subject: subject.into(),
            action: action.into(),
            flavor: flavor.into(),
        }
    }

    /// Create a rule requiring the caller to own the addressed entity
    pub fn owner(action: impl Into<String>, flavor: impl Into<String>) -> Self {
        Self::new(OWNER_SUBJECT, action, flavor)
    }

    /// Whether this rule uses the owner sentinel
    pub fn is_owner_rule(&self) -> bool {
        self.subject == OWNER_SUBJECT
    }
}

/// One declared permission entry.
#[derive(Clone)]
pub enum PermissionEntry {
    /// Static rule evaluated by the remote policy engine
    Rule(PermissionRule),
    /// Predicate evaluated against the call context
    Predicate(Arc<dyn PermissionPredicate>),
}

impl fmt::Debug for PermissionEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PermissionEntry::Rule(rule) => f.debug_tuple("Rule").field(rule).finish(),
            PermissionEntry::Predicate(predicate) => {
                f.debug_tuple("Predicate").field(&predicate.name()).finish()
            }
        }
    }
}

impl From<PermissionRule> for PermissionEntry {
    fn from(rule: PermissionRule) -> Self {
        PermissionEntry::Rule(rule)
    }
}

impl From<Arc<dyn PermissionPredicate>> for PermissionEntry {
    fn from(predicate: Arc<dyn PermissionPredicate>) -> Self {
        PermissionEntry::Predicate(predicate)
    }
}

/// The `permissions` field of an operation declaration.
#[derive(Debug, Clone)]
pub enum PermissionSpec {
    /// A single entry
    Single(PermissionEntry),
    /// An ordered list of entries
    Many(Vec<PermissionEntry>),
}

impl PermissionSpec {
    /// Entries in declaration order
    pub fn entries(&self) -> &[PermissionEntry] {
        match self {
            PermissionSpec::Single(entry) => std::slice::from_ref(entry),
            PermissionSpec::Many(entries) => entries,
        }
    }

    /// Static rules in declaration order
    pub fn rules(&self) -> impl Iterator<Item = &PermissionRule> {
        self.entries().iter().filter_map(|entry| match entry {
            PermissionEntry::Rule(rule) => Some(rule),
            PermissionEntry::Predicate(_) => None,
        })
    }

    /// Whether the declaration contains no entries at all
    pub fn is_empty(&self) -> bool {
        self.entries().is_empty()
    }

    /// Parse a declaration loaded from a JSON (or TOML-converted) document.
    ///
    /// An object is a single rule and an array is a list of rules. Predicates
    /// cannot be expressed in data, so any other shape is malformed.
    pub fn from_json(value: &serde_json::Value) -> GatehouseResult<Self> {
        match value {
            serde_json::Value::Object(_) => Ok(PermissionSpec::Single(parse_rule(value, 0)?)),
            serde_json::Value::Array(items) => items
                .iter()
                .enumerate()
                .map(|(idx, item)| parse_rule(item, idx))
                .collect::<GatehouseResult<Vec<_>>>()
                .map(PermissionSpec::Many),
            other => Err(GatehouseError::invalid(format!(
                "permissions must be a rule object or a list of rule objects, got {other}"
            ))),
        }
    }
}

fn parse_rule(value: &serde_json::Value, idx: usize) -> GatehouseResult<PermissionEntry> {
    if !value.is_object() {
        return Err(GatehouseError::invalid(format!(
            "permission entry {idx} is neither a rule nor a predicate: {value}"
        )));
    }
    serde_json::from_value::<PermissionRule>(value.clone())
        .map(PermissionEntry::Rule)
        .map_err(|e| GatehouseError::invalid(format!("permission entry {idx}: {e}")))
}

impl From<PermissionEntry> for PermissionSpec {
    fn from(entry: PermissionEntry) -> Self {
        PermissionSpec::Single(entry)
    }
}

impl From<PermissionRule> for PermissionSpec {
    fn from(rule: PermissionRule) -> Self {
        PermissionSpec::Single(PermissionEntry::Rule(rule))
    }
}

impl From<Arc<dyn PermissionPredicate>> for PermissionSpec {
    fn from(predicate: Arc<dyn PermissionPredicate>) -> Self {
        PermissionSpec::Single(PermissionEntry::Predicate(predicate))
    }
}

impl From<Vec<PermissionEntry>> for PermissionSpec {
    fn from(entries: Vec<PermissionEntry>) -> Self {
        PermissionSpec::Many(entries)
    }
}

impl From<Vec<PermissionRule>> for PermissionSpec {
    fn from(rules: Vec<PermissionRule>) -> Self {
        PermissionSpec::Many(rules.into_iter().map(PermissionEntry::Rule).collect())
    }
}
