//! Guard chain wiring
//!
//! A [`GuardChain`] holds the engine configuration and client shared by every
//! protected operation. Registering an operation wraps its handler as
//! evaluator → handler → synchronizer, so denied calls never reach the
//! handler and the policy store only changes after the handler succeeds.

use super::evaluator::{AuthorizationEvaluator, Decision};
use super::sync::PolicySynchronizer;
use async_trait::async_trait;
use gatehouse_core::{
    CallContext, GatehouseError, GatehouseResult, PolicyEngineConfig, PolicyEngineEffects,
    ServiceDescriptor,
};
use serde_json::Value;
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use tracing::debug;

/// A protected operation's business logic.
#[async_trait]
pub trait OperationHandler: Send + Sync {
    /// Run the operation for one call
    async fn call(&self, ctx: &CallContext) -> GatehouseResult<Value>;
}

/// Adapter turning an async closure into an [`OperationHandler`].
pub struct HandlerFn<F> {
    f: F,
}

#[async_trait]
impl<F, Fut> OperationHandler for HandlerFn<F>
where
    F: Fn(CallContext) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = GatehouseResult<Value>> + Send + 'static,
{
    async fn call(&self, ctx: &CallContext) -> GatehouseResult<Value> {
        (self.f)(ctx.clone()).await
    }
}

/// Build a shared handler from an async closure
pub fn handler_fn<F, Fut>(f: F) -> Arc<dyn OperationHandler>
where
    F: Fn(CallContext) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = GatehouseResult<Value>> + Send + 'static,
{
    Arc::new(HandlerFn { f })
}

/// Shared configuration and engine client for a set of protected operations.
#[derive(Clone)]
pub struct GuardChain {
    config: Arc<PolicyEngineConfig>,
    engine: Arc<dyn PolicyEngineEffects>,
}

impl GuardChain {
    /// Chain talking to `engine` with `config`
    pub fn new(config: PolicyEngineConfig, engine: Arc<dyn PolicyEngineEffects>) -> Self {
        Self {
            config: Arc::new(config),
            engine,
        }
    }

    /// Engine configuration shared by registered operations
    pub fn config(&self) -> &PolicyEngineConfig {
        &self.config
    }

    /// Wrap `handler` as the operation `local_action` of `service`, using the
    /// permissions the service declares for it.
    pub fn register(
        &self,
        service: &Arc<ServiceDescriptor>,
        local_action: &str,
        handler: Arc<dyn OperationHandler>,
    ) -> GuardedOperation {
        let name = service.qualified_name(local_action);
        let spec = service
            .action(local_action)
            .and_then(|declaration| declaration.permissions.as_ref());
        let evaluator = AuthorizationEvaluator::new(
            name.clone(),
            spec,
            Arc::clone(&self.config),
            Arc::clone(&self.engine),
        );
        debug!(
            operation = %name,
            enforced = evaluator.is_enforced(),
            "Registered guarded operation"
        );
        GuardedOperation {
            name,
            evaluator,
            synchronizer: PolicySynchronizer::new(
                Arc::clone(&self.config),
                Arc::clone(&self.engine),
            ),
            handler,
        }
    }

    /// Guard every operation of `service` that has a handler in `handlers`.
    pub fn register_service(
        &self,
        service: Arc<ServiceDescriptor>,
        handlers: impl IntoIterator<Item = (String, Arc<dyn OperationHandler>)>,
    ) -> GuardedService {
        let operations = handlers
            .into_iter()
            .map(|(local, handler)| {
                let operation = self.register(&service, &local, handler);
                (local, operation)
            })
            .collect();
        GuardedService {
            service,
            operations,
        }
    }
}

impl std::fmt::Debug for GuardChain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GuardChain")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

/// An operation wrapped by the guard chain.
pub struct GuardedOperation {
    name: String,
    evaluator: AuthorizationEvaluator,
    synchronizer: PolicySynchronizer,
    handler: Arc<dyn OperationHandler>,
}

impl GuardedOperation {
    /// Qualified operation name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Evaluator built from the operation's declaration
    pub fn evaluator(&self) -> &AuthorizationEvaluator {
        &self.evaluator
    }

    /// Evaluate only, without running the handler
    pub async fn authorize(&self, ctx: &CallContext) -> GatehouseResult<Decision> {
        self.evaluator.evaluate(ctx).await
    }

    /// Authorize, run the handler, synchronize the policy store
    pub async fn invoke(&self, ctx: &CallContext) -> GatehouseResult<Value> {
        self.evaluator.evaluate(ctx).await?;
        self.synchronizer
            .run(ctx, || self.handler.call(ctx))
            .await
    }
}

#[async_trait]
impl OperationHandler for GuardedOperation {
    async fn call(&self, ctx: &CallContext) -> GatehouseResult<Value> {
        self.invoke(ctx).await
    }
}

impl std::fmt::Debug for GuardedOperation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GuardedOperation")
            .field("name", &self.name)
            .field("evaluator", &self.evaluator)
            .finish_non_exhaustive()
    }
}

/// All guarded operations of one service, dispatched by operation name.
#[derive(Debug)]
pub struct GuardedService {
    service: Arc<ServiceDescriptor>,
    operations: HashMap<String, GuardedOperation>,
}

impl GuardedService {
    /// Service the operations belong to
    pub fn descriptor(&self) -> &Arc<ServiceDescriptor> {
        &self.service
    }

    /// Operation by local name
    pub fn operation(&self, local_action: &str) -> Option<&GuardedOperation> {
        self.operations.get(local_action)
    }

    /// Dispatch `ctx` to the operation its action name addresses
    pub async fn call(&self, ctx: &CallContext) -> GatehouseResult<Value> {
        let operation = self.operation(ctx.local_action_name()).ok_or_else(|| {
            GatehouseError::not_found(format!("no operation {}", ctx.action_name()))
        })?;
        operation.invoke(ctx).await
    }
}
