//! Highwire load-balancer provider
//!
//! Maps the six provider operations onto Highwire pools and virtual
//! servers. Objects are found by name (`lbauto-<spec name>`) because
//! Highwire assigns ids only at creation time.

use super::drift::{desired_member_ips, desired_members, members_drifted, replacement_pool};
use super::{LoadBalancerProvider, ProviderError};
use crds::{
    Ilb, IlbState, DELETING_MESSAGE, POOL_MISSING_MESSAGE, PROVISIONING_MESSAGE, READY_MESSAGE,
    VIP_MISSING_MESSAGE,
};
use highwire_client::{managed_name, HighwireClientTrait, HighwireError, Pool, VirtualServer};
use kube::ResourceExt;
use tracing::{debug, error, info, warn};

/// Provider backed by a Highwire client.
///
/// Generic over the client so tests can run against `MockHighwireClient`.
#[derive(Debug)]
pub struct HighwireProvider<C> {
    client: C,
}

impl<C: HighwireClientTrait> HighwireProvider<C> {
    pub fn new(client: C) -> Self {
        Self { client }
    }
}

/// Record a failed call on the status message and convert it.
fn record(ilb: &mut Ilb, err: HighwireError) -> ProviderError {
    let code = err.status().map(i32::from).unwrap_or(0);
    ilb.status_mut().set_message(code, err.operator_text());
    err.into()
}

/// Delete one remote object; 404 counts as already gone.
///
/// Returns a failure description instead of an error so both deletions are
/// always attempted.
async fn delete_remote<F>(what: &str, id: i64, delete: F) -> Option<String>
where
    F: std::future::Future<Output = Result<(), HighwireError>>,
{
    match delete.await {
        Ok(()) => {
            info!("Deleted Highwire {} {}", what, id);
            None
        }
        Err(e) if e.is_not_found() => {
            info!("Highwire {} {} already gone", what, id);
            None
        }
        Err(e) => {
            error!("Failed to delete Highwire {} {}: {}", what, id, e);
            Some(format!("{} {}: {}", what, id, e.operator_text()))
        }
    }
}

#[async_trait::async_trait]
impl<C: HighwireClientTrait> LoadBalancerProvider for HighwireProvider<C> {
    /// Pools are looked up in the pool's own environment, not the VIP's.
    async fn get_status(&self, ilb: &mut Ilb) -> Result<(), ProviderError> {
        let key = ilb.key();
        let vip_name = managed_name(&ilb.spec.vip.name);
        let pool_name = managed_name(&ilb.spec.pool.name);
        let pool_name_unset = ilb.spec.pool.name.is_empty();
        let vip_environment = ilb.spec.vip.environment;
        let pool_environment = ilb.spec.pool.environment;

        let name = ilb.name_any();
        let status = ilb.status_mut();
        status.name = name;
        status.state = IlbState::Pending;
        status.set_message(0, PROVISIONING_MESSAGE);

        // Virtual server
        let vs = match self.client.find_virtual_server(vip_environment, &vip_name).await {
            Ok(vs) => vs,
            Err(e) => return Err(record(ilb, e)),
        };

        let status = ilb.status_mut();
        let mut linked_pool = 0;
        match vs {
            Some(vs) => {
                debug!("Found virtual server {} (id {}) for {}", vs.name, vs.id, key);
                status.vip = vs.ip;
                status.vip_id = vs.id;
                status.conditions.vip_created = true;
                linked_pool = vs.pool;
            }
            None if status.conditions.vip_created => {
                error!("Virtual server {} for {} was created but is missing in Highwire", vip_name, key);
                status.state = IlbState::Error;
                status.vip.clear();
                status.vip_id = 0;
                status.conditions.vip_created = false;
                status.conditions.vip_pool_linked = false;
                status.set_message(404, VIP_MISSING_MESSAGE);
                return Err(ProviderError::DataInconsistency(format!(
                    "virtual server {} missing for {}",
                    vip_name, key
                )));
            }
            None => debug!("Virtual server {} not created yet", vip_name),
        }

        // Pool
        let pool = if pool_name_unset {
            None
        } else {
            match self.client.find_pool(pool_environment, &pool_name).await {
                Ok(pool) => pool,
                Err(e) => return Err(record(ilb, e)),
            }
        };

        let status = ilb.status_mut();
        match pool {
            Some(pool) => {
                debug!("Found pool {} (id {}) for {}", pool.name, pool.id, key);
                status.pool_id = pool.id;
                status.conditions.pool_created = true;
            }
            None if status.conditions.pool_created => {
                error!("Pool {} for {} was created but is missing in Highwire", pool_name, key);
                status.state = IlbState::Error;
                status.pool_id = 0;
                status.conditions.pool_created = false;
                status.conditions.vip_pool_linked = false;
                status.set_message(404, POOL_MISSING_MESSAGE);
                return Err(ProviderError::DataInconsistency(format!(
                    "pool {} missing for {}",
                    pool_name, key
                )));
            }
            None => debug!("Pool {} not created yet", pool_name),
        }

        status.conditions.vip_pool_linked = status.conditions.pool_created
            && status.conditions.vip_created
            && status.pool_id != 0
            && linked_pool == status.pool_id;

        if status.conditions.all_met() {
            status.state = IlbState::Ready;
            status.set_message(0, READY_MESSAGE);
        }
        Ok(())
    }

    async fn create_pool(&self, ilb: &mut Ilb) -> Result<(), ProviderError> {
        let spec = &ilb.spec.pool;
        let pool = Pool {
            name: spec.name.clone(),
            description: spec.description.clone(),
            environment: spec.environment,
            user_group: spec.user_group,
            load_balancing_mode: spec.load_balancing_mode.clone(),
            monitor: spec.monitor.clone(),
            min_active_members: spec.min_active_members,
            members: Some(desired_members(ilb)),
            ..Default::default()
        };

        match self.client.create_pool(&pool).await {
            Ok(()) => {
                info!("Created pool {} for {}", pool.name, ilb.key());
                Ok(())
            }
            Err(e) => {
                error!("Failed to create pool {} for {}: {}", pool.name, ilb.key(), e);
                Err(record(ilb, e))
            }
        }
    }

    async fn create_virtual_server(&self, ilb: &mut Ilb) -> Result<(), ProviderError> {
        let spec = &ilb.spec.vip;
        let vs = VirtualServer {
            name: spec.name.clone(),
            description: spec.description.clone(),
            environment: spec.environment,
            user_group: spec.user_group,
            ip_type: spec.ip_type.clone(),
            port: spec.port,
            persist: spec.persist.clone(),
            ip_protocol: spec.ip_protocol.clone(),
            pool: ilb.status.as_ref().map(|s| s.pool_id).unwrap_or(0),
            ..Default::default()
        };

        match self.client.create_virtual_server(&vs).await {
            Ok(()) => {
                info!("Created virtual server {} for {}", vs.name, ilb.key());
                Ok(())
            }
            Err(e) => {
                error!("Failed to create virtual server {} for {}: {}", vs.name, ilb.key(), e);
                Err(record(ilb, e))
            }
        }
    }

    async fn link_vs_to_pool(&self, ilb: &mut Ilb) -> Result<(), ProviderError> {
        let (vip_id, pool_id) = ilb
            .status
            .as_ref()
            .map(|s| (s.vip_id, s.pool_id))
            .unwrap_or_default();
        let link = VirtualServer {
            pool: pool_id,
            ..Default::default()
        };

        match self.client.update_virtual_server(vip_id, &link).await {
            Ok(()) => {
                info!("Linked virtual server {} to pool {} for {}", vip_id, pool_id, ilb.key());
                Ok(())
            }
            Err(e) => {
                error!("Failed to link virtual server {} to pool {}: {}", vip_id, pool_id, e);
                Err(record(ilb, e))
            }
        }
    }

    async fn observe_current_and_reconcile(&self, ilb: &mut Ilb) -> Result<(), ProviderError> {
        let pool_id = ilb.status.as_ref().map(|s| s.pool_id).unwrap_or(0);

        let current: Vec<String> = match self.client.get_pool_members(pool_id).await {
            Ok(members) => members.into_iter().map(|m| m.ip).collect(),
            Err(e) => return Err(record(ilb, e)),
        };
        let desired = desired_member_ips(ilb);
        debug!("Pool {} members: desired {:?}, current {:?}", pool_id, desired, current);

        if members_drifted(&desired, &current) {
            info!("Pool {} membership drifted for {}, replacing members", pool_id, ilb.key());
            ilb.status_mut().state = IlbState::Pending;
            let pool = replacement_pool(ilb);
            if let Err(e) = self.client.replace_pool_members(pool_id, &pool).await {
                warn!("Failed to replace members of pool {}: {}", pool_id, e);
                return Err(record(ilb, e));
            }
            info!("Replaced members of pool {} with {:?}", pool_id, desired);
        }

        let status = ilb.status_mut();
        if status.conditions.all_met() {
            status.state = IlbState::Ready;
        }
        Ok(())
    }

    async fn process_finalizers(&self, ilb: &mut Ilb) -> Result<(), ProviderError> {
        if ilb.state() == IlbState::Terminated {
            ilb.status_mut().set_message(0, DELETING_MESSAGE);
            return Ok(());
        }

        let (mut vip_id, mut pool_id) = ilb
            .status
            .as_ref()
            .map(|s| (s.vip_id, s.pool_id))
            .unwrap_or_default();
        let mut failures = Vec::new();

        // Ids are learned on the refresh after creation, so an object created
        // in the previous pass may still have id 0 here.
        if vip_id == 0 && !ilb.spec.vip.name.is_empty() {
            let vip_name = managed_name(&ilb.spec.vip.name);
            match self.client.find_virtual_server(ilb.spec.vip.environment, &vip_name).await {
                Ok(vs) => vip_id = vs.map(|vs| vs.id).unwrap_or(0),
                Err(e) => failures.push(format!("virtual server lookup: {}", e.operator_text())),
            }
        }
        if pool_id == 0 && !ilb.spec.pool.name.is_empty() {
            let pool_name = managed_name(&ilb.spec.pool.name);
            match self.client.find_pool(ilb.spec.pool.environment, &pool_name).await {
                Ok(pool) => pool_id = pool.map(|p| p.id).unwrap_or(0),
                Err(e) => failures.push(format!("pool lookup: {}", e.operator_text())),
            }
        }
        info!("Processing finalizers for {} (vip {}, pool {})", ilb.key(), vip_id, pool_id);

        // The virtual server references the pool, so it goes first.
        if vip_id != 0 {
            failures.extend(
                delete_remote("virtual server", vip_id, self.client.delete_virtual_server(vip_id)).await,
            );
        }
        if pool_id != 0 {
            failures.extend(delete_remote("pool", pool_id, self.client.delete_pool(pool_id)).await);
        }

        if !failures.is_empty() {
            let message = failures.join("; ");
            ilb.status_mut().set_message(0, format!("Cleanup failed: {}", message));
            return Err(ProviderError::Cleanup(message));
        }

        info!("Processed finalizers for {}", ilb.key());
        Ok(())
    }
}
