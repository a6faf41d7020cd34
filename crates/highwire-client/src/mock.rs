//! Mock HighwireClient for unit testing
//!
//! This module provides an in-memory implementation of HighwireClientTrait
//! that behaves like Highwire for the calls the controller makes: created
//! objects are renamed to `/Common/lbauto-<name>`, ids are assigned from a
//! counter, and missing ids answer 404.

use crate::error::HighwireError;
use crate::highwire_trait::HighwireClientTrait;
use crate::models::*;
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

#[derive(Debug, Default)]
struct MockState {
    pools: BTreeMap<i64, Pool>,
    virtual_servers: BTreeMap<i64, VirtualServer>,
    /// operation name -> HTTP status to fail with
    failures: HashMap<String, u16>,
    /// "METHOD path" log of every mutating call, in order
    calls: Vec<String>,
    next_id: i64,
}

/// Mock HighwireClient for testing
///
/// Clones share the same in-memory appliance, so a test can keep a handle
/// while the provider owns another.
#[derive(Debug, Clone)]
pub struct MockHighwireClient {
    base_url: String,
    state: Arc<Mutex<MockState>>,
}

impl MockHighwireClient {
    /// Create a new mock client
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            state: Arc::new(Mutex::new(MockState {
                next_id: 1,
                ..Default::default()
            })),
        }
    }

    fn state(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Add a pool as-is (for test setup)
    pub fn add_pool(&self, pool: Pool) {
        self.state().pools.insert(pool.id, pool);
    }

    /// Add a virtual server as-is (for test setup)
    pub fn add_virtual_server(&self, vs: VirtualServer) {
        self.state().virtual_servers.insert(vs.id, vs);
    }

    /// Remove a virtual server behind the controller's back
    pub fn remove_virtual_server(&self, id: i64) {
        self.state().virtual_servers.remove(&id);
    }

    /// Remove a pool behind the controller's back
    pub fn remove_pool(&self, id: i64) {
        self.state().pools.remove(&id);
    }

    /// Overwrite the members of an existing pool (for drift setup)
    pub fn set_pool_members(&self, pool_id: i64, members: Vec<PoolMember>) {
        if let Some(pool) = self.state().pools.get_mut(&pool_id) {
            pool.members = Some(members);
        }
    }

    /// Make every call to `operation` fail with `status` until cleared.
    ///
    /// Operation names match the trait methods, e.g. "create_pool".
    pub fn fail_with(&self, operation: &str, status: u16) {
        self.state().failures.insert(operation.to_string(), status);
    }

    pub fn clear_failures(&self) {
        self.state().failures.clear();
    }

    pub fn pools(&self) -> Vec<Pool> {
        self.state().pools.values().cloned().collect()
    }

    pub fn virtual_servers(&self) -> Vec<VirtualServer> {
        self.state().virtual_servers.values().cloned().collect()
    }

    /// Mutating calls so far, e.g. "POST ltm/pools", "DELETE ltm/pools/7"
    pub fn calls(&self) -> Vec<String> {
        self.state().calls.clone()
    }

    /// Number of recorded calls starting with `prefix`
    pub fn count_calls(&self, prefix: &str) -> usize {
        self.state()
            .calls
            .iter()
            .filter(|c| c.starts_with(prefix))
            .count()
    }

    fn check(&self, state: &MockState, operation: &str) -> Result<(), HighwireError> {
        match state.failures.get(operation) {
            Some(status) => Err(HighwireError::from_response(
                *status,
                br#"{"messages":[{"message":"injected failure"}]}"#,
            )),
            None => Ok(()),
        }
    }

    fn not_found() -> HighwireError {
        HighwireError::from_response(404, b"")
    }
}

#[async_trait::async_trait]
impl HighwireClientTrait for MockHighwireClient {
    fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn list_virtual_servers(&self, environment: i64) -> Result<Vec<VirtualServer>, HighwireError> {
        let state = self.state();
        self.check(&state, "list_virtual_servers")?;
        Ok(state
            .virtual_servers
            .values()
            .filter(|vs| vs.environment == environment)
            .cloned()
            .collect())
    }

    async fn create_virtual_server(&self, vs: &VirtualServer) -> Result<(), HighwireError> {
        let mut state = self.state();
        state.calls.push("POST ltm/virtualServers".to_string());
        self.check(&state, "create_virtual_server")?;

        let id = state.next_id;
        state.next_id += 1;
        let created = VirtualServer {
            id,
            ip: format!("10.10.0.{}", id),
            name: format!("/Common/{}", managed_name(&vs.name)),
            ..vs.clone()
        };
        state.virtual_servers.insert(id, created);
        Ok(())
    }

    async fn update_virtual_server(&self, id: i64, vs: &VirtualServer) -> Result<(), HighwireError> {
        let mut state = self.state();
        state.calls.push(format!("PUT ltm/virtualServers/{}", id));
        self.check(&state, "update_virtual_server")?;

        let existing = state
            .virtual_servers
            .get_mut(&id)
            .ok_or_else(Self::not_found)?;
        if vs.pool != 0 {
            existing.pool = vs.pool;
        }
        Ok(())
    }

    async fn delete_virtual_server(&self, id: i64) -> Result<(), HighwireError> {
        let mut state = self.state();
        state.calls.push(format!("DELETE ltm/virtualServers/{}", id));
        self.check(&state, "delete_virtual_server")?;

        state
            .virtual_servers
            .remove(&id)
            .map(|_| ())
            .ok_or_else(Self::not_found)
    }

    async fn list_pools(&self, environment: i64) -> Result<Vec<Pool>, HighwireError> {
        let state = self.state();
        self.check(&state, "list_pools")?;
        Ok(state
            .pools
            .values()
            .filter(|p| p.environment == environment)
            .cloned()
            .collect())
    }

    async fn create_pool(&self, pool: &Pool) -> Result<(), HighwireError> {
        let mut state = self.state();
        state.calls.push("POST ltm/pools".to_string());
        self.check(&state, "create_pool")?;

        let id = state.next_id;
        state.next_id += 1;
        let created = Pool {
            id,
            name: format!("/Common/{}", managed_name(&pool.name)),
            ..pool.clone()
        };
        state.pools.insert(id, created);
        Ok(())
    }

    async fn delete_pool(&self, id: i64) -> Result<(), HighwireError> {
        let mut state = self.state();
        state.calls.push(format!("DELETE ltm/pools/{}", id));
        self.check(&state, "delete_pool")?;

        state
            .pools
            .remove(&id)
            .map(|_| ())
            .ok_or_else(Self::not_found)
    }

    async fn get_pool_members(&self, pool_id: i64) -> Result<Vec<PoolMember>, HighwireError> {
        let state = self.state();
        self.check(&state, "get_pool_members")?;
        state
            .pools
            .get(&pool_id)
            .map(|p| p.members.clone().unwrap_or_default())
            .ok_or_else(Self::not_found)
    }

    async fn replace_pool_members(&self, pool_id: i64, pool: &Pool) -> Result<(), HighwireError> {
        let mut state = self.state();
        state.calls.push(format!("PUT ltm/pools/{}/members", pool_id));
        self.check(&state, "replace_pool_members")?;

        let existing = state.pools.get_mut(&pool_id).ok_or_else(Self::not_found)?;
        existing.members = Some(pool.members.clone().unwrap_or_default());
        Ok(())
    }
}
