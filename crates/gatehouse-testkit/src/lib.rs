//! Gatehouse Testing Infrastructure
//!
//! In-memory implementations of the Gatehouse effect traits plus common
//! fixtures, so guard tests run without a policy engine or database.
//!
//! # Usage
//!
//! Add this to your crate's `Cargo.toml` dev-dependencies:
//! ```toml
//! [dev-dependencies]
//! gatehouse-testkit = { path = "../gatehouse-testkit" }
//! ```
//!
//! Then in your tests:
//! ```rust,ignore
//! use gatehouse_testkit::*;
//!
//! let engine = MockPolicyEngine::new();
//! engine.allow("exact", expected_request("update", "U1", "update"));
//! ```

#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]

pub mod entities;
pub mod fixtures;
pub mod mock_engine;

pub use entities::InMemoryEntities;
pub use fixtures::*;
pub use mock_engine::{MockPolicyEngine, PolicyMutation, RecordedQuery};
