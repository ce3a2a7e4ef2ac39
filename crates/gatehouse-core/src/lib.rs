//! Gatehouse Core - shared vocabulary for authorization guards
//!
//! This crate holds the types every other Gatehouse crate speaks in and the
//! effect interfaces guards use to reach the outside world. It performs no
//! I/O of its own.
//!
//! # Contents
//!
//! - [`GatehouseError`]: unified error type with wire codes and status classes
//! - [`PolicyEngineConfig`]: policy engine connection and namespacing settings
//! - [`CallContext`]: caller identity, roles, parameters and hosting service
//! - [`PermissionSpec`]: declared permissions (rules and predicates)
//! - [`Policy`], [`AuthorizationRequest`]: policy engine wire types
//! - [`PolicyEngineEffects`], [`EntityLookup`], [`EntityOwnerCheck`],
//!   [`PermissionPredicate`]: effect traits

#![forbid(unsafe_code)]

/// Configuration loading and validation
pub mod config;

/// Per-call context
pub mod context;

/// Effect interfaces (no implementations)
pub mod effects;

/// Unified error handling
pub mod errors;

/// Permission declarations
pub mod permission;

/// Policy engine wire types
pub mod policy;

/// Service descriptors
pub mod service;

pub use config::{GatehouseConfig, PolicyEngineConfig};
pub use context::{value_as_id, CallContext, CallMeta, CallerIdentity};
pub use effects::{
    predicate_fn, EntityLookup, EntityOwnerCheck, PermissionPredicate, PolicyEngineEffects,
    PredicateFn,
};
pub use errors::{ErrorCode, GatehouseError, GatehouseResult, StatusClass};
pub use permission::{PermissionEntry, PermissionRule, PermissionSpec, OWNER_SUBJECT};
pub use policy::{AuthorizationDecision, AuthorizationRequest, Policy, PolicyEffect, PolicyId};
pub use service::{ActionDeclaration, ServiceDescriptor};
