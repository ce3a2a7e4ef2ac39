//! Policy synchronizer
//!
//! After a successful `create` or `delete`, keeps the caller's policy record
//! in the engine in step with the entities the caller created. The record id
//! is `user:{caller}:{service}` and it lists one resource per owned entity.
//!
//! The record is read before the operation runs and written after it
//! succeeds. Concurrent mutations by the same caller on the same service can
//! interleave between those two points and lose a resource; the engine API
//! offers no conditional write to prevent that.

use gatehouse_core::{
    value_as_id, CallContext, GatehouseError, GatehouseResult, Policy, PolicyEngineConfig,
    PolicyEngineEffects, PolicyId,
};
use serde_json::Value;
use std::future::Future;
use std::sync::Arc;
use tracing::{debug, info, instrument};

/// Actions granted on every resource in a caller's record
pub const GRANTED_ACTIONS: [&str; 3] = ["read", "update", "delete"];

/// Rule actions that trigger a policy write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncAction {
    /// Add the new entity to the caller's record
    Create,
    /// Leaves the record alone
    Update,
    /// Drop the entity, or the whole record with its last entity
    Delete,
}

impl SyncAction {
    /// Recognize a rule action; anything else is not synchronized
    pub fn parse(action: &str) -> Option<Self> {
        match action {
            "create" => Some(SyncAction::Create),
            "update" => Some(SyncAction::Update),
            "delete" => Some(SyncAction::Delete),
            _ => None,
        }
    }

    /// Whether this action writes to the policy record
    pub fn mutates_policy(self) -> bool {
        !matches!(self, SyncAction::Update)
    }
}

/// Synchronizer shared by every operation of a guard chain.
#[derive(Clone)]
pub struct PolicySynchronizer {
    config: Arc<PolicyEngineConfig>,
    engine: Arc<dyn PolicyEngineEffects>,
}

impl PolicySynchronizer {
    /// Synchronizer writing through `engine`
    pub fn new(config: Arc<PolicyEngineConfig>, engine: Arc<dyn PolicyEngineEffects>) -> Self {
        Self { config, engine }
    }

    /// Distinct sync actions among the rules the operation declares, in
    /// first-declared order.
    pub fn declared_actions(ctx: &CallContext) -> Vec<SyncAction> {
        let Some(spec) = ctx
            .service()
            .action(ctx.local_action_name())
            .and_then(|declaration| declaration.permissions.as_ref())
        else {
            return Vec::new();
        };

        let mut actions = Vec::new();
        let parsed = spec.rules().filter_map(|rule| SyncAction::parse(&rule.action));
        for action in parsed {
            if !actions.contains(&action) {
                actions.push(action);
            }
        }
        actions
    }

    /// Record body granting `caller_id` the standard actions on `resources`
    pub fn policy_body(&self, id: &PolicyId, caller_id: &str, resources: &[String]) -> Policy {
        let mut policy = Policy::new(id, self.config.policy_description.clone());
        policy
            .subjects
            .insert(self.config.namespaced_subject(caller_id));
        policy.actions.extend(
            GRANTED_ACTIONS
                .iter()
                .map(|action| self.config.namespaced_action(action)),
        );
        policy.resources.extend(resources.iter().cloned());
        policy
    }

    /// Run `handler` and synchronize the caller's policy record with its
    /// outcome. The handler's value is returned unchanged.
    ///
    /// Handler errors pass through untouched and skip synchronization. A
    /// failure while writing the record surfaces as
    /// [`GatehouseError::Synchronization`] wrapping the engine's error: the
    /// operation itself already succeeded at that point.
    #[instrument(skip_all, fields(operation = %ctx.action_name()))]
    pub async fn run<F, Fut>(&self, ctx: &CallContext, handler: F) -> GatehouseResult<Value>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = GatehouseResult<Value>>,
    {
        let actions = Self::declared_actions(ctx);
        let writes_policy = actions.iter().any(|action| action.mutates_policy());
        let Some(caller) = ctx.user().filter(|_| writes_policy) else {
            return handler().await;
        };

        let policy_id = PolicyId::for_caller(&caller.id, ctx.service().name());
        let existing = self.engine.get_policy(&policy_id).await?;

        let result = handler().await?;

        let entity_id = result.get("id").and_then(value_as_id).ok_or_else(|| {
            sync_failure(
                &policy_id,
                GatehouseError::invalid(format!("{} returned no entity id", ctx.action_name())),
            )
        })?;
        let current = self.config.namespaced_resource(&entity_id);

        let mut resources = vec![current.clone()];
        if let Some(existing) = &existing {
            resources.extend(existing.resources.iter().cloned());
        }
        let mut body = self.policy_body(&policy_id, &caller.id, &resources);

        for action in actions {
            match action {
                SyncAction::Create => {
                    self.engine
                        .upsert_policy(&body)
                        .await
                        .map_err(|e| sync_failure(&policy_id, e))?;
                    info!(policy = %policy_id, resource = %current, "Policy resource added");
                }
                SyncAction::Delete => {
                    let shared = existing
                        .as_ref()
                        .is_some_and(|record| record.resources.len() > 1);
                    if shared {
                        body.resources.shift_remove(&current);
                        self.engine
                            .upsert_policy(&body)
                            .await
                            .map_err(|e| sync_failure(&policy_id, e))?;
                        info!(policy = %policy_id, resource = %current, "Policy resource removed");
                    } else {
                        self.engine
                            .delete_policy(&policy_id)
                            .await
                            .map_err(|e| sync_failure(&policy_id, e))?;
                        info!(policy = %policy_id, "Policy record removed");
                    }
                }
                SyncAction::Update => {
                    debug!(policy = %policy_id, "Update leaves policy untouched");
                }
            }
        }

        Ok(result)
    }
}

fn sync_failure(policy_id: &PolicyId, error: GatehouseError) -> GatehouseError {
    GatehouseError::synchronization(policy_id.as_str(), error)
}

impl std::fmt::Debug for PolicySynchronizer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PolicySynchronizer")
            .field("admin_url", &self.config.admin_url)
            .finish_non_exhaustive()
    }
}
