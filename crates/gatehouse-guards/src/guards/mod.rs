//! Guard chain components
//!
//! - [`permissions`]: splitting declared permissions into rules and predicates
//! - [`evaluator`]: per-call authorization decision
//! - [`owner`]: ownership capability services install for `$owner` rules
//! - [`sync`]: policy record maintenance after create/delete
//! - [`chain`]: wiring the above around an operation handler

pub mod chain;
pub mod evaluator;
pub mod owner;
pub mod permissions;
pub mod sync;

pub use chain::{
    handler_fn, GuardChain, GuardedOperation, GuardedService, HandlerFn, OperationHandler,
};
pub use evaluator::{AuthorizationEvaluator, Decision, GrantedBy, PreparedQuery};
pub use owner::{IsOwner, DEFAULT_OWNER_KEY};
pub use permissions::{
    normalize_declaration, normalize_permissions, NormalizedPermissions, OwnerPredicate,
};
pub use sync::{PolicySynchronizer, SyncAction, GRANTED_ACTIONS};
