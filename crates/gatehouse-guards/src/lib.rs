#![forbid(unsafe_code)]
//! # Gatehouse Guards
//!
//! Authorization guards for protected operations: permission evaluation
//! against a remote policy engine and local predicates, the owner capability,
//! and policy record synchronization after create/delete.

pub mod guards;
pub mod prelude;

pub use guards::*;
