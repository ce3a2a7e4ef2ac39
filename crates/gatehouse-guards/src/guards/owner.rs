//! Owner capability provider
//!
//! [`IsOwner`] is the ownership check a service installs on its descriptor so
//! that `$owner` rules can be decided locally: resolve the addressed entity id
//! from the call parameters, load the entity, compare its owner field with the
//! caller id.

use async_trait::async_trait;
use gatehouse_core::{
    value_as_id, CallContext, EntityLookup, EntityOwnerCheck, GatehouseError, GatehouseResult,
};
use heck::ToLowerCamelCase;
use std::sync::Arc;
use tracing::debug;

/// Entity field holding the owner id unless configured otherwise
pub const DEFAULT_OWNER_KEY: &str = "owner";

/// Ownership check for one entity type.
#[derive(Clone)]
pub struct IsOwner {
    type_name: String,
    param_key: String,
    owner_key: String,
    lookup: Arc<dyn EntityLookup>,
}

impl IsOwner {
    /// Check entities of `type_name` fetched through `lookup`
    pub fn new(type_name: impl Into<String>, lookup: Arc<dyn EntityLookup>) -> Self {
        let type_name = type_name.into();
        Self {
            param_key: type_name.to_lower_camel_case(),
            type_name,
            owner_key: DEFAULT_OWNER_KEY.to_string(),
            lookup,
        }
    }

    /// Read the owner id from `owner_key` instead of `owner`
    pub fn with_owner_key(mut self, owner_key: impl Into<String>) -> Self {
        self.owner_key = owner_key.into();
        self
    }

    /// Entity type this check covers
    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    /// Call parameter holding a nested entity, e.g. `widgetPart`
    pub fn param_key(&self) -> &str {
        &self.param_key
    }

    /// Entity field compared with the caller id
    pub fn owner_key(&self) -> &str {
        &self.owner_key
    }

    /// Entity id addressed by the call.
    ///
    /// `params.id` wins; otherwise `params.<typeName>.id` where the type name
    /// is camel-cased (`WidgetPart` → `widgetPart`).
    pub fn resolve_entity_id(&self, ctx: &CallContext) -> GatehouseResult<String> {
        if let Some(id) = ctx.param_id() {
            return Ok(id);
        }
        ctx.params()
            .get(&self.param_key)
            .and_then(|nested| nested.get("id"))
            .and_then(value_as_id)
            .ok_or_else(|| GatehouseError::entity_id_unresolvable(ctx.action_name()))
    }
}

impl std::fmt::Debug for IsOwner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IsOwner")
            .field("type_name", &self.type_name)
            .field("owner_key", &self.owner_key)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl EntityOwnerCheck for IsOwner {
    async fn is_entity_owner(&self, ctx: &CallContext) -> GatehouseResult<bool> {
        let entity_id = self.resolve_entity_id(ctx)?;
        let entity = self.lookup.get_entity(ctx, &entity_id).await?;

        let Some(user) = ctx.user() else {
            return Ok(false);
        };
        let owner = entity.get(&self.owner_key).and_then(value_as_id);
        let is_owner = owner.as_deref() == Some(user.id.as_str());

        debug!(
            entity_type = %self.type_name,
            entity_id = %entity_id,
            caller = %user.id,
            is_owner,
            "Ownership checked"
        );
        Ok(is_owner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gatehouse_core::ServiceDescriptor;
    use gatehouse_testkit::{caller, InMemoryEntities};
    use serde_json::json;

    fn call(params: serde_json::Value) -> CallContext {
        let service = Arc::new(ServiceDescriptor::new("widgets"));
        CallContext::new(service, "widgets.update")
            .with_user(caller("U1"))
            .with_params(params)
    }

    fn check_with(entities: &InMemoryEntities) -> IsOwner {
        IsOwner::new("Widget", Arc::new(entities.clone()))
    }

    async fn owns(check: &IsOwner, params: serde_json::Value) -> bool {
        check.is_entity_owner(&call(params)).await.unwrap()
    }

    #[tokio::test]
    async fn test_owner_matches_caller() {
        let entities = InMemoryEntities::new();
        entities.insert("E1", json!({"owner": "U1"}));
        entities.insert("E2", json!({"owner": "U2"}));
        let check = check_with(&entities);

        assert!(owns(&check, json!({"id": "E1"})).await);
        assert!(!owns(&check, json!({"id": "E2"})).await);
    }

    #[tokio::test]
    async fn test_nested_widget_id() {
        let entities = InMemoryEntities::new();
        entities.insert("E2", json!({"owner": "U1"}));
        let check = check_with(&entities);

        let ctx = call(json!({"widget": {"id": "E2"}}));
        assert_eq!(check.resolve_entity_id(&ctx).unwrap(), "E2");
        assert!(check.is_entity_owner(&ctx).await.unwrap());
        assert_eq!(entities.lookups(), vec!["E2".to_string()]);
    }

    #[tokio::test]
    async fn test_nested_id_uses_camel_cased_type() {
        let entities = InMemoryEntities::new();
        entities.insert("P1", json!({"owner": "U1"}));
        let check = IsOwner::new("WidgetPart", Arc::new(entities.clone()));
        assert_eq!(check.param_key(), "widgetPart");

        let ctx = call(json!({"widgetPart": {"id": "P1"}}));
        assert!(check.is_entity_owner(&ctx).await.unwrap());
        assert_eq!(entities.lookups(), vec!["P1".to_string()]);
    }

    #[tokio::test]
    async fn test_direct_id_wins_over_nested() {
        let entities = InMemoryEntities::new();
        entities.insert("E1", json!({"owner": "U1"}));
        let check = check_with(&entities);

        let ctx = call(json!({"id": "E1", "widget": {"id": "E9"}}));
        assert!(check.is_entity_owner(&ctx).await.unwrap());
        assert_eq!(entities.lookups(), vec!["E1".to_string()]);
    }

    #[tokio::test]
    async fn test_numeric_ids() {
        let entities = InMemoryEntities::new();
        entities.insert("42", json!({"owner": "U1"}));
        let check = check_with(&entities);

        assert!(owns(&check, json!({"id": 42})).await);
    }

    #[tokio::test]
    async fn test_custom_owner_key() {
        let entities = InMemoryEntities::new();
        entities.insert("E1", json!({"owner": "U2", "createdBy": "U1"}));
        let check = check_with(&entities).with_owner_key("createdBy");

        assert_eq!(check.owner_key(), "createdBy");
        assert!(owns(&check, json!({"id": "E1"})).await);
    }

    #[tokio::test]
    async fn test_missing_owner_field_is_not_owner() {
        let entities = InMemoryEntities::new();
        entities.insert("E1", json!({"name": "gear"}));
        let check = check_with(&entities);

        assert!(!owns(&check, json!({"id": "E1"})).await);
    }

    #[test]
    fn test_param_key_from_type_name() {
        let lookup = Arc::new(InMemoryEntities::new());
        for (type_name, key) in [
            ("Widget", "widget"),
            ("widget_part", "widgetPart"),
            ("widget-part", "widgetPart"),
            ("HTMLParser", "htmlParser"),
        ] {
            assert_eq!(IsOwner::new(type_name, lookup.clone()).param_key(), key);
        }
    }

    #[tokio::test]
    async fn test_unresolvable_id() {
        let entities = InMemoryEntities::new();
        let check = check_with(&entities);

        let err = check
            .is_entity_owner(&call(json!({"name": "gear"})))
            .await
            .unwrap_err();
        assert_eq!(err, GatehouseError::entity_id_unresolvable("widgets.update"));
        assert!(entities.lookups().is_empty());
    }

    #[tokio::test]
    async fn test_lookup_failure_propagates() {
        let entities = InMemoryEntities::new();
        let check = check_with(&entities);

        let err = check
            .is_entity_owner(&call(json!({"id": "missing"})))
            .await
            .unwrap_err();
        assert!(matches!(err, GatehouseError::NotFound { .. }));
    }
}
