//! Service descriptors: the declarations and capabilities a service exposes

use crate::effects::EntityOwnerCheck;
use crate::permission::PermissionSpec;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Declaration of one operation.
#[derive(Debug, Clone)]
pub struct ActionDeclaration {
    /// Local action name (without the service prefix)
    pub name: String,
    /// Declared permissions, `None` when the feature is off for the action
    pub permissions: Option<PermissionSpec>,
}

impl ActionDeclaration {
    /// Declaration without permissions
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            permissions: None,
        }
    }

    /// Attach a permission declaration
    pub fn with_permissions(mut self, permissions: impl Into<PermissionSpec>) -> Self {
        self.permissions = Some(permissions.into());
        self
    }
}

/// A resource-owning service as seen by the guards.
#[derive(Clone)]
pub struct ServiceDescriptor {
    name: String,
    actions: HashMap<String, ActionDeclaration>,
    owner_check: Option<Arc<dyn EntityOwnerCheck>>,
}

impl ServiceDescriptor {
    /// Service with no declared actions and no owner check
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            actions: HashMap::new(),
            owner_check: None,
        }
    }

    /// Register an action declaration
    pub fn with_action(mut self, declaration: ActionDeclaration) -> Self {
        self.actions.insert(declaration.name.clone(), declaration);
        self
    }

    /// Attach the owner check capability
    pub fn with_owner_check(mut self, owner_check: Arc<dyn EntityOwnerCheck>) -> Self {
        self.owner_check = Some(owner_check);
        self
    }

    /// Service name, part of every synchronized policy id
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Declaration for a local action name
    pub fn action(&self, local_name: &str) -> Option<&ActionDeclaration> {
        self.actions.get(local_name)
    }

    /// Iterate over every declared action
    pub fn actions(&self) -> impl Iterator<Item = &ActionDeclaration> {
        self.actions.values()
    }

    /// Owner check capability, if the service provides one
    pub fn owner_check(&self) -> Option<&Arc<dyn EntityOwnerCheck>> {
        self.owner_check.as_ref()
    }

    /// `{service}.{action}`
    pub fn qualified_name(&self, local_name: &str) -> String {
        format!("{}.{local_name}", self.name)
    }
}

impl fmt::Debug for ServiceDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceDescriptor")
            .field("name", &self.name)
            .field("actions", &self.actions.keys().collect::<Vec<_>>())
            .field("owner_check", &self.owner_check.is_some())
            .finish()
    }
}
