//! In-memory policy engine for deterministic testing
//!
//! `MockPolicyEngine` answers decision queries from a table of allowed
//! requests and keeps policy records in a map. Every query and mutation is
//! recorded so tests can assert exactly what a guard sent.
//!
//! # Blocking Lock Usage
//!
//! Uses `std::sync::Mutex` because this is test infrastructure: no lock is
//! held across an await point and contention is not a concern.

#![allow(clippy::disallowed_types)]

use async_trait::async_trait;
use gatehouse_core::{
    AuthorizationDecision, AuthorizationRequest, GatehouseError, GatehouseResult, Policy,
    PolicyEngineEffects, PolicyId,
};
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard};

/// A decision query as the engine received it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedQuery {
    /// Flavor the query was sent to
    pub flavor: String,
    /// Query body
    pub request: AuthorizationRequest,
}

/// A policy store mutation as the engine received it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PolicyMutation {
    /// Upsert of the full record
    Upsert(Policy),
    /// Removal of a record
    Delete(PolicyId),
}

#[derive(Debug, Default)]
struct MockState {
    allowed: HashSet<(String, AuthorizationRequest)>,
    allow_everything: bool,
    fail_queries: bool,
    fail_mutations: bool,
    policies: HashMap<String, Policy>,
    queries: Vec<RecordedQuery>,
    mutations: Vec<PolicyMutation>,
    reads: Vec<PolicyId>,
}

/// Mock policy engine implementing [`PolicyEngineEffects`].
#[derive(Debug, Clone, Default)]
pub struct MockPolicyEngine {
    state: Arc<Mutex<MockState>>,
}

impl MockPolicyEngine {
    /// Engine that denies everything and holds no policies
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, MockState> {
        match self.state.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    /// Allow one exact request on one flavor
    pub fn allow(&self, flavor: impl Into<String>, request: AuthorizationRequest) -> &Self {
        self.state().allowed.insert((flavor.into(), request));
        self
    }

    /// Allow every query regardless of body
    pub fn allow_everything(&self) -> &Self {
        self.state().allow_everything = true;
        self
    }

    /// Make every decision query fail as if the engine were unreachable
    pub fn fail_queries(&self, fail: bool) -> &Self {
        self.state().fail_queries = fail;
        self
    }

    /// Make every policy upsert/delete fail
    pub fn fail_mutations(&self, fail: bool) -> &Self {
        self.state().fail_mutations = fail;
        self
    }

    /// Seed a policy record without recording a mutation
    pub fn seed_policy(&self, policy: Policy) -> &Self {
        self.state().policies.insert(policy.id.clone(), policy);
        self
    }

    /// Current record for an id
    pub fn policy(&self, id: &PolicyId) -> Option<Policy> {
        self.state().policies.get(id.as_str()).cloned()
    }

    /// Number of records currently stored
    pub fn policy_count(&self) -> usize {
        self.state().policies.len()
    }

    /// Decision queries received so far, in order
    pub fn queries(&self) -> Vec<RecordedQuery> {
        self.state().queries.clone()
    }

    /// Policy mutations received so far, in order
    pub fn mutations(&self) -> Vec<PolicyMutation> {
        self.state().mutations.clone()
    }

    /// Policy reads received so far, in order
    pub fn reads(&self) -> Vec<PolicyId> {
        self.state().reads.clone()
    }

    /// Total number of remote calls of any kind
    pub fn call_count(&self) -> usize {
        let state = self.state();
        state.queries.len() + state.mutations.len() + state.reads.len()
    }
}

#[async_trait]
impl PolicyEngineEffects for MockPolicyEngine {
    async fn is_allowed(
        &self,
        flavor: &str,
        request: &AuthorizationRequest,
    ) -> GatehouseResult<AuthorizationDecision> {
        let mut state = self.state();
        state.queries.push(RecordedQuery {
            flavor: flavor.to_string(),
            request: request.clone(),
        });
        if state.fail_queries {
            return Err(GatehouseError::network("mock engine unreachable"));
        }
        let allowed = state.allow_everything
            || state
                .allowed
                .contains(&(flavor.to_string(), request.clone()));
        Ok(AuthorizationDecision { allowed })
    }

    async fn get_policy(&self, id: &PolicyId) -> GatehouseResult<Option<Policy>> {
        let mut state = self.state();
        state.reads.push(id.clone());
        Ok(state.policies.get(id.as_str()).cloned())
    }

    async fn upsert_policy(&self, policy: &Policy) -> GatehouseResult<()> {
        let mut state = self.state();
        state.mutations.push(PolicyMutation::Upsert(policy.clone()));
        if state.fail_mutations {
            return Err(GatehouseError::network("mock engine rejected upsert"));
        }
        state.policies.insert(policy.id.clone(), policy.clone());
        Ok(())
    }

    async fn delete_policy(&self, id: &PolicyId) -> GatehouseResult<()> {
        let mut state = self.state();
        state.mutations.push(PolicyMutation::Delete(id.clone()));
        if state.fail_mutations {
            return Err(GatehouseError::network("mock engine rejected delete"));
        }
        state.policies.remove(id.as_str());
        Ok(())
    }
}
