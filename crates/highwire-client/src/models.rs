//! Highwire API models
//!
//! These models match the Highwire LTM JSON schema. Highwire treats zero
//! values as "not set", so empty strings and zero numbers are left out of
//! request bodies.

use serde::{Deserialize, Serialize};

/// Prefix Highwire puts in front of every object this controller creates.
pub const MANAGED_PREFIX: &str = "lbauto-";

/// Name Highwire reports for an object created as `name`.
pub fn managed_name(name: &str) -> String {
    format!("{}{}", MANAGED_PREFIX, name)
}

/// Last segment of a `/`-delimited Highwire name (`/Common/lbauto-web` -> `lbauto-web`).
pub fn short_name(name: &str) -> &str {
    name.rsplit('/').next().unwrap_or(name)
}

fn is_zero_i32(v: &i32) -> bool {
    *v == 0
}

fn is_zero_i64(v: &i64) -> bool {
    *v == 0
}

/// Pool member
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PoolMember {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub name: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub ip: String,
    /// Highwire carries member ports as strings
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub port: String,
    #[serde(default, skip_serializing_if = "is_zero_i32")]
    pub connection_limit: i32,
    #[serde(default, skip_serializing_if = "is_zero_i32")]
    pub priority_group: i32,
    #[serde(default, skip_serializing_if = "is_zero_i32")]
    pub ratio: i32,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub admin_state: String,
    /// Reported by Highwire, never sent
    #[serde(default, skip_serializing)]
    pub monitor_status: String,
}

/// Pool
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Pool {
    #[serde(default, skip_serializing_if = "is_zero_i64")]
    pub id: i64,
    #[serde(default, skip_serializing_if = "is_zero_i64")]
    pub environment: i64,
    #[serde(default, skip_serializing_if = "is_zero_i64")]
    pub user_group: i64,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub name: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub load_balancing_mode: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub monitor: String,
    #[serde(default, skip_serializing_if = "is_zero_i32")]
    pub min_active_members: i32,
    /// `None` leaves membership untouched; `Some(vec![])` empties the pool
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub members: Option<Vec<PoolMember>>,
}

impl Pool {
    pub fn short_name(&self) -> &str {
        short_name(&self.name)
    }

    /// Member IPs in the order Highwire reported them.
    pub fn member_ips(&self) -> Vec<String> {
        self.members
            .iter()
            .flatten()
            .map(|m| m.ip.clone())
            .collect()
    }
}

/// Virtual server
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct VirtualServer {
    #[serde(default, skip_serializing_if = "is_zero_i64")]
    pub id: i64,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub ip: String,
    #[serde(default, skip_serializing_if = "is_zero_i64")]
    pub environment: i64,
    #[serde(default, skip_serializing_if = "is_zero_i64")]
    pub user_group: i64,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub name: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub ip_type: String,
    #[serde(default, skip_serializing_if = "is_zero_i32")]
    pub port: i32,
    /// Linked pool id, 0 when unlinked
    #[serde(default, skip_serializing_if = "is_zero_i64")]
    pub pool: i64,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub persist: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub ip_protocol: String,
}

impl VirtualServer {
    pub fn short_name(&self) -> &str {
        short_name(&self.name)
    }
}

/// `GET /ltm/pools` response
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct PoolList {
    #[serde(default)]
    pub pools: Vec<Pool>,
    #[serde(default)]
    pub code: i32,
}

/// `GET /ltm/virtualServers` response
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct VirtualServerList {
    #[serde(default)]
    pub virtual_servers: Vec<VirtualServer>,
    #[serde(default)]
    pub code: i32,
}

/// `POST /login` body
#[derive(Debug, Clone, Serialize)]
pub struct LoginRequest {
    pub domain: String,
    pub username: String,
    pub password: String,
}

/// `POST /login` response
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    #[serde(default)]
    pub api_token: Option<String>,
    /// Session lifetime in seconds
    #[serde(default)]
    pub session_expires: Option<f64>,
}
