//! Wire types exchanged with the remote policy engine

use indexmap::IndexSet;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Body of a decision query.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AuthorizationRequest {
    /// Namespaced action identifier
    pub action: String,
    /// Namespaced subject identifier
    pub subject: String,
    /// Namespaced resource identifier
    pub resource: String,
}

/// Answer to a decision query.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthorizationDecision {
    /// Whether the request is allowed
    #[serde(default)]
    pub allowed: bool,
}

impl AuthorizationDecision {
    /// An allowing decision
    pub fn allow() -> Self {
        Self { allowed: true }
    }

    /// A denying decision
    pub fn deny() -> Self {
        Self { allowed: false }
    }
}

/// Effect of a policy record.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PolicyEffect {
    /// Grants the listed actions
    #[default]
    Allow,
    /// Denies the listed actions
    Deny,
}

/// Key of the policy record a caller holds for one service.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PolicyId(String);

impl PolicyId {
    /// `user:{caller}:{service}`
    pub fn for_caller(caller_id: &str, service_name: &str) -> Self {
        Self(format!("user:{caller_id}:{service_name}"))
    }

    /// Wrap an existing id
    pub fn from_raw(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Id as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PolicyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Access control policy record held by the remote engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Policy {
    /// Record key
    pub id: String,
    /// Human readable description
    #[serde(default)]
    pub description: String,
    /// Namespaced subjects the policy applies to
    #[serde(default)]
    pub subjects: IndexSet<String>,
    /// Allow or deny
    #[serde(default)]
    pub effect: PolicyEffect,
    /// Namespaced actions granted
    #[serde(default)]
    pub actions: IndexSet<String>,
    /// Namespaced resources covered
    #[serde(default)]
    pub resources: IndexSet<String>,
}

impl Policy {
    /// Empty allow policy for an id
    pub fn new(id: &PolicyId, description: impl Into<String>) -> Self {
        Self {
            id: id.as_str().to_string(),
            description: description.into(),
            subjects: IndexSet::new(),
            effect: PolicyEffect::Allow,
            actions: IndexSet::new(),
            resources: IndexSet::new(),
        }
    }

    /// Typed record key
    pub fn policy_id(&self) -> PolicyId {
        PolicyId::from_raw(self.id.clone())
    }
}
