//! Effect interfaces
//!
//! Guards reach the outside world only through these traits: the remote
//! policy engine, the owning service's entity lookup, the owner check
//! capability and custom permission predicates. Implementations live in
//! `gatehouse-policy` (HTTP) and `gatehouse-testkit` (in-memory).

use crate::context::CallContext;
use crate::policy::{AuthorizationDecision, AuthorizationRequest, Policy, PolicyId};
use crate::GatehouseResult;
use async_trait::async_trait;
use std::future::Future;
use std::sync::Arc;

/// Remote policy decision point and policy store.
#[async_trait]
pub trait PolicyEngineEffects: Send + Sync {
    /// Ask whether `request` is allowed under the policies of `flavor`
    async fn is_allowed(
        &self,
        flavor: &str,
        request: &AuthorizationRequest,
    ) -> GatehouseResult<AuthorizationDecision>;

    /// Fetch a policy record; `None` when the engine has no such record
    async fn get_policy(&self, id: &PolicyId) -> GatehouseResult<Option<Policy>>;

    /// Create or replace a policy record
    async fn upsert_policy(&self, policy: &Policy) -> GatehouseResult<()>;

    /// Remove a policy record
    async fn delete_policy(&self, id: &PolicyId) -> GatehouseResult<()>;
}

/// Single-entity lookup provided by a resource-owning service.
#[async_trait]
pub trait EntityLookup: Send + Sync {
    /// Fetch the entity with `id` as a JSON record
    async fn get_entity(&self, ctx: &CallContext, id: &str) -> GatehouseResult<serde_json::Value>;
}

/// Capability answering "does the caller own the addressed entity".
#[async_trait]
pub trait EntityOwnerCheck: Send + Sync {
    /// Whether the caller owns the entity addressed by the call
    async fn is_entity_owner(&self, ctx: &CallContext) -> GatehouseResult<bool>;
}

/// Custom permission check evaluated against the call context.
#[async_trait]
pub trait PermissionPredicate: Send + Sync {
    /// Name used in logs
    fn name(&self) -> &str {
        "predicate"
    }

    /// Whether the call is permitted by this predicate
    async fn check(&self, ctx: &CallContext) -> GatehouseResult<bool>;
}

/// Adapter turning an async closure into a [`PermissionPredicate`].
pub struct PredicateFn<F> {
    name: String,
    f: F,
}

#[async_trait]
impl<F, Fut> PermissionPredicate for PredicateFn<F>
where
    F: Fn(CallContext) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = GatehouseResult<bool>> + Send + 'static,
{
    fn name(&self) -> &str {
        &self.name
    }

    async fn check(&self, ctx: &CallContext) -> GatehouseResult<bool> {
        (self.f)(ctx.clone()).await
    }
}

/// Build a shared predicate from an async closure
pub fn predicate_fn<F, Fut>(name: impl Into<String>, f: F) -> Arc<dyn PermissionPredicate>
where
    F: Fn(CallContext) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = GatehouseResult<bool>> + Send + 'static,
{
    Arc::new(PredicateFn {
        name: name.into(),
        f,
    })
}
