//! In-memory entity store standing in for a service's single-entity lookup

#![allow(clippy::disallowed_types)]

use async_trait::async_trait;
use gatehouse_core::{CallContext, EntityLookup, GatehouseError, GatehouseResult};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

#[derive(Debug, Default)]
struct EntityState {
    records: HashMap<String, Value>,
    lookups: Vec<String>,
}

/// Entity records keyed by id.
#[derive(Debug, Clone, Default)]
pub struct InMemoryEntities {
    state: Arc<Mutex<EntityState>>,
}

impl InMemoryEntities {
    /// Empty store
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, EntityState> {
        match self.state.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    /// Insert or replace a record
    pub fn insert(&self, id: impl Into<String>, record: Value) -> &Self {
        self.state().records.insert(id.into(), record);
        self
    }

    /// Ids looked up so far, in order
    pub fn lookups(&self) -> Vec<String> {
        self.state().lookups.clone()
    }
}

#[async_trait]
impl EntityLookup for InMemoryEntities {
    async fn get_entity(&self, _ctx: &CallContext, id: &str) -> GatehouseResult<Value> {
        let mut state = self.state();
        state.lookups.push(id.to_string());
        state
            .records
            .get(id)
            .cloned()
            .ok_or_else(|| GatehouseError::not_found(format!("entity {id}")))
    }
}
