//! Permission normalization
//!
//! Splits an operation's declared permissions into static rules, answered by
//! the remote policy engine, and predicates, evaluated locally. A rule whose
//! subject is the owner sentinel contributes to both sides: the rule is still
//! sent to the engine, and an owner predicate is appended so the service's
//! ownership capability gets a say as well.

use async_trait::async_trait;
use gatehouse_core::{
    CallContext, GatehouseError, GatehouseResult, PermissionEntry, PermissionPredicate,
    PermissionRule, PermissionSpec,
};
use std::fmt;
use std::sync::Arc;

/// Declared permissions partitioned by evaluation phase.
#[derive(Clone, Default)]
pub struct NormalizedPermissions {
    static_rules: Vec<PermissionRule>,
    predicates: Vec<Arc<dyn PermissionPredicate>>,
}

impl NormalizedPermissions {
    /// Static rules in declaration order
    pub fn static_rules(&self) -> &[PermissionRule] {
        &self.static_rules
    }

    /// Predicates in declaration order, owner predicates included
    pub fn predicates(&self) -> &[Arc<dyn PermissionPredicate>] {
        &self.predicates
    }

    /// No rule and no predicate: enforcement is off for the operation
    pub fn is_empty(&self) -> bool {
        self.static_rules.is_empty() && self.predicates.is_empty()
    }
}

impl fmt::Debug for NormalizedPermissions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<&str> = self.predicates.iter().map(|p| p.name()).collect();
        f.debug_struct("NormalizedPermissions")
            .field("static_rules", &self.static_rules)
            .field("predicates", &names)
            .finish()
    }
}

/// Partition the declaration of operation `action`.
///
/// `None` (nothing declared) and an empty list both normalize to an empty
/// result.
pub fn normalize_permissions(action: &str, spec: Option<&PermissionSpec>) -> NormalizedPermissions {
    let mut normalized = NormalizedPermissions::default();
    let Some(spec) = spec else {
        return normalized;
    };

    for entry in spec.entries() {
        match entry {
            PermissionEntry::Predicate(predicate) => {
                normalized.predicates.push(Arc::clone(predicate));
            }
            PermissionEntry::Rule(rule) => {
                if rule.is_owner_rule() {
                    normalized
                        .predicates
                        .push(Arc::new(OwnerPredicate::new(action)));
                }
                normalized.static_rules.push(rule.clone());
            }
        }
    }
    normalized
}

/// Parse and partition a declaration held as data.
pub fn normalize_declaration(
    action: &str,
    declaration: &serde_json::Value,
) -> GatehouseResult<NormalizedPermissions> {
    let spec = PermissionSpec::from_json(declaration)?;
    Ok(normalize_permissions(action, Some(&spec)))
}

/// Asks the owning service whether the caller owns the addressed entity.
#[derive(Debug, Clone)]
pub struct OwnerPredicate {
    action: String,
}

impl OwnerPredicate {
    /// Owner predicate for operation `action`
    pub fn new(action: impl Into<String>) -> Self {
        Self {
            action: action.into(),
        }
    }
}

#[async_trait]
impl PermissionPredicate for OwnerPredicate {
    fn name(&self) -> &str {
        "owner"
    }

    async fn check(&self, ctx: &CallContext) -> GatehouseResult<bool> {
        let owner_check = ctx
            .service()
            .owner_check()
            .ok_or_else(|| GatehouseError::capability_missing(&self.action))?;
        owner_check.is_entity_owner(ctx).await
    }
}
