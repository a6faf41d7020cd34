//! Test utilities for unit testing the provider and reconciler
//!
//! Builders for `Ilb` objects and an in-memory `ResourceStore` that behaves
//! like the API server for the fields the controller touches.

use crate::error::ControllerError;
use crate::store::ResourceStore;
use crds::*;
use highwire_client::MockHighwireClient;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::{ObjectMeta, Time};
use kube::ResourceExt;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

pub const TEST_NAMESPACE: &str = "team-a";
pub const VIP_ENVIRONMENT: i64 = 11;
pub const POOL_ENVIRONMENT: i64 = 12;

/// Mock Highwire with a recognisable base URL
pub fn mock_highwire() -> MockHighwireClient {
    MockHighwireClient::new("http://test-highwire/v1")
}

/// Helper to create a test Ilb with the given member IPs on port 443
pub fn create_test_ilb(name: &str, member_ips: &[&str]) -> Ilb {
    Ilb {
        metadata: ObjectMeta {
            name: Some(name.to_string()),
            namespace: Some(TEST_NAMESPACE.to_string()),
            ..Default::default()
        },
        spec: IlbSpec {
            pool: PoolSpec {
                name: format!("{}-pool", name),
                description: "test pool".to_string(),
                port: 443,
                members: member_ips
                    .iter()
                    .map(|ip| Member {
                        ip: ip.to_string(),
                        admin_state: "enabled".to_string(),
                        ..Default::default()
                    })
                    .collect(),
                environment: POOL_ENVIRONMENT,
                user_group: 3,
                load_balancing_mode: "least-connections-member".to_string(),
                min_active_members: 1,
                monitor: "i_tcp".to_string(),
            },
            vip: VipSpec {
                name: format!("{}-vip", name),
                description: "test vip".to_string(),
                port: 443,
                ip_type: "private".to_string(),
                persist: "i_client_ip_5min".to_string(),
                ip_protocol: "tcp".to_string(),
                environment: VIP_ENVIRONMENT,
                user_group: 3,
            },
            owner: "team-a".to_string(),
        },
        status: None,
    }
}

/// Same Ilb with the controller finalizer already installed
pub fn with_finalizer(mut ilb: Ilb) -> Ilb {
    ilb.add_finalizer();
    ilb
}

/// Same Ilb carrying a deletion marker
pub fn marked_for_deletion(mut ilb: Ilb) -> Ilb {
    ilb.metadata.deletion_timestamp = Some(Time(Default::default()));
    ilb
}

/// Same Ilb with status ids and conditions as if fully provisioned
pub fn provisioned(mut ilb: Ilb, vip_id: i64, pool_id: i64) -> Ilb {
    let status = ilb.status_mut();
    status.vip_id = vip_id;
    status.pool_id = pool_id;
    status.vip = format!("10.10.0.{}", vip_id);
    status.state = IlbState::Ready;
    status.conditions = IlbConditions {
        pool_created: true,
        vip_created: true,
        vip_pool_linked: true,
    };
    ilb
}

#[derive(Debug, Default)]
struct StoreState {
    objects: HashMap<String, Ilb>,
    next_version: u64,
    updates: usize,
    status_updates: usize,
}

/// In-memory resource store
///
/// `update` only persists finalizers and checks `resourceVersion`;
/// `update_status` only persists status. Removing the last finalizer from
/// an object marked for deletion removes the object.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    state: Arc<Mutex<StoreState>>,
}

fn key(namespace: &str, name: &str) -> String {
    format!("{}/{}", namespace, name)
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, StoreState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Insert or replace an object, stamping a fresh resourceVersion
    pub fn insert(&self, mut ilb: Ilb) {
        let mut state = self.state();
        state.next_version += 1;
        ilb.metadata.resource_version = Some(state.next_version.to_string());
        let k = ilb.key();
        state.objects.insert(k, ilb);
    }

    pub fn get_object(&self, name: &str) -> Option<Ilb> {
        self.state().objects.get(&key(TEST_NAMESPACE, name)).cloned()
    }

    /// Stamp a deletion marker, as the API server does on delete
    pub fn mark_for_deletion(&self, name: &str) {
        if let Some(ilb) = self.state().objects.get_mut(&key(TEST_NAMESPACE, name)) {
            ilb.metadata.deletion_timestamp = Some(Time(Default::default()));
        }
    }

    /// Number of metadata updates (finalizer changes)
    pub fn updates(&self) -> usize {
        self.state().updates
    }

    pub fn status_updates(&self) -> usize {
        self.state().status_updates
    }
}

#[async_trait::async_trait]
impl ResourceStore for MemoryStore {
    async fn get(&self, namespace: &str, name: &str) -> Result<Option<Ilb>, ControllerError> {
        Ok(self.state().objects.get(&key(namespace, name)).cloned())
    }

    async fn update(&self, ilb: &Ilb) -> Result<Ilb, ControllerError> {
        let mut state = self.state();
        state.next_version += 1;
        let version = state.next_version.to_string();
        state.updates += 1;

        let k = ilb.key();
        let stored = state
            .objects
            .get_mut(&k)
            .ok_or_else(|| ControllerError::Store(format!("{} not found", k)))?;
        if stored.metadata.resource_version != ilb.metadata.resource_version {
            return Err(ControllerError::Store(format!("conflict updating {}", k)));
        }
        stored.metadata.finalizers = ilb.metadata.finalizers.clone();
        stored.metadata.resource_version = Some(version);
        let updated = stored.clone();

        if updated.is_deleting() && updated.finalizers().is_empty() {
            state.objects.remove(&k);
        }
        Ok(updated)
    }

    async fn update_status(&self, ilb: &Ilb) -> Result<Ilb, ControllerError> {
        let mut state = self.state();
        state.next_version += 1;
        let version = state.next_version.to_string();
        state.status_updates += 1;

        let k = ilb.key();
        let stored = state
            .objects
            .get_mut(&k)
            .ok_or_else(|| ControllerError::Store(format!("{} not found", k)))?;
        stored.status = ilb.status.clone();
        stored.metadata.resource_version = Some(version);
        Ok(stored.clone())
    }
}
