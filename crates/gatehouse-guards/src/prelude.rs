//! Gatehouse Guards prelude.
//!
//! Curated re-exports for wiring guarded operations.

pub use crate::guards::{
    handler_fn, GuardChain, GuardedOperation, GuardedService, IsOwner, OperationHandler,
};
pub use gatehouse_core::{
    predicate_fn, ActionDeclaration, CallContext, GatehouseError, GatehouseResult,
    PermissionRule, PermissionSpec, PolicyEngineConfig, PolicyEngineEffects, ServiceDescriptor,
};
