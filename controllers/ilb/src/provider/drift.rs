//! Pool membership drift detection
//!
//! Membership is compared by IP only. Any drift replaces the whole member
//! list with the desired one; there is no incremental add/remove.

use crds::Ilb;
use highwire_client::{Pool, PoolMember};

/// Desired member IPs, in spec order.
pub fn desired_member_ips(ilb: &Ilb) -> Vec<String> {
    ilb.spec.pool.members.iter().map(|m| m.ip.clone()).collect()
}

/// True when `current` must be replaced to match `desired`: the counts
/// differ or a desired IP is absent. Order is irrelevant.
pub fn members_drifted(desired: &[String], current: &[String]) -> bool {
    desired.len() != current.len() || desired.iter().any(|ip| !current.contains(ip))
}

/// Desired members as Highwire members; every member listens on the pool port.
pub fn desired_members(ilb: &Ilb) -> Vec<PoolMember> {
    let port = ilb.spec.pool.port.to_string();
    ilb.spec
        .pool
        .members
        .iter()
        .map(|m| PoolMember {
            name: m.name.clone(),
            ip: m.ip.clone(),
            port: port.clone(),
            connection_limit: m.connection_limit,
            priority_group: m.priority_group,
            ratio: m.ratio,
            admin_state: m.admin_state.clone(),
            ..Default::default()
        })
        .collect()
}

/// Replacement body carrying every desired member with its full attributes.
pub fn replacement_pool(ilb: &Ilb) -> Pool {
    let spec = &ilb.spec.pool;
    Pool {
        description: spec.description.clone(),
        load_balancing_mode: spec.load_balancing_mode.clone(),
        monitor: spec.monitor.clone(),
        min_active_members: spec.min_active_members,
        members: Some(desired_members(ilb)),
        ..Default::default()
    }
}
