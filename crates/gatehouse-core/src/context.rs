//! Per-call context supplied by the host framework

use crate::service::ServiceDescriptor;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;

/// Authenticated principal invoking an operation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CallerIdentity {
    /// Principal id compared against entity owner fields
    pub id: String,
    /// Any further attributes the authentication layer attached
    #[serde(flatten)]
    pub attributes: serde_json::Map<String, Value>,
}

impl CallerIdentity {
    /// Identity with no extra attributes
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            attributes: serde_json::Map::new(),
        }
    }
}

/// Call metadata: who is calling and with which roles.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CallMeta {
    /// Caller identity, absent for anonymous calls
    pub user: Option<CallerIdentity>,
    /// Caller roles; absence skips enforcement for the call
    pub roles: Option<Vec<String>>,
}

/// Everything a guard may read about one invocation.
#[derive(Debug, Clone)]
pub struct CallContext {
    action: String,
    meta: CallMeta,
    params: Value,
    service: Arc<ServiceDescriptor>,
}

impl CallContext {
    /// Context for invoking `action` (a dotted `service.action` name) on `service`
    pub fn new(service: Arc<ServiceDescriptor>, action: impl Into<String>) -> Self {
        Self {
            action: action.into(),
            meta: CallMeta::default(),
            params: Value::Object(serde_json::Map::new()),
            service,
        }
    }

    /// Set the caller identity
    pub fn with_user(mut self, user: CallerIdentity) -> Self {
        self.meta.user = Some(user);
        self
    }

    /// Set the caller roles
    pub fn with_roles<I, S>(mut self, roles: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.meta.roles = Some(roles.into_iter().map(Into::into).collect());
        self
    }

    /// Set the call parameters
    pub fn with_params(mut self, params: Value) -> Self {
        self.params = params;
        self
    }

    /// Replace the call metadata wholesale
    pub fn with_meta(mut self, meta: CallMeta) -> Self {
        self.meta = meta;
        self
    }

    /// Fully qualified operation name
    pub fn action_name(&self) -> &str {
        &self.action
    }

    /// Last dotted segment of the operation name, used to find its declaration
    pub fn local_action_name(&self) -> &str {
        self.action.rsplit('.').next().unwrap_or(&self.action)
    }

    /// Resource class the operation addresses: the segment after the service prefix
    pub fn resource_class(&self) -> &str {
        self.action.split('.').nth(1).unwrap_or(&self.action)
    }

    /// Call metadata
    pub fn meta(&self) -> &CallMeta {
        &self.meta
    }

    /// Caller identity, if any
    pub fn user(&self) -> Option<&CallerIdentity> {
        self.meta.user.as_ref()
    }

    /// Caller roles, if any
    pub fn roles(&self) -> Option<&[String]> {
        self.meta.roles.as_deref()
    }

    /// Call parameters
    pub fn params(&self) -> &Value {
        &self.params
    }

    /// Direct `id` parameter, if the call addresses a specific entity
    pub fn param_id(&self) -> Option<String> {
        self.params.get("id").and_then(value_as_id)
    }

    /// Service hosting the operation
    pub fn service(&self) -> &Arc<ServiceDescriptor> {
        &self.service
    }
}

/// Render an id-like JSON value. Strings are taken as-is and numbers by their
/// decimal form; anything else is not an id.
pub fn value_as_id(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}
