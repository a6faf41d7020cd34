//! Ilb CRD
//!
//! Declares an internal load balancer: a virtual server (VIP) forwarding
//! into a pool of backend members on the load-balancing appliance.

use crate::message::OperatorMessage;
use kube::{CustomResource, ResourceExt};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Finalizer guarding remote pool/virtual-server cleanup.
pub const ILB_FINALIZER: &str = "ilb.lbauto.io/finalizer";

#[derive(CustomResource, Debug, Clone, Serialize, Deserialize, JsonSchema, Default, PartialEq)]
#[kube(
    group = "ilb.lbauto.io",
    version = "v1alpha1",
    kind = "Ilb",
    namespaced,
    status = "IlbStatus",
    shortname = "ilb",
    printcolumn = r#"{"name":"State","type":"string","jsonPath":".status.state"}"#,
    printcolumn = r#"{"name":"VIP","type":"string","jsonPath":".status.vip"}"#
)]
#[serde(rename_all = "camelCase")]
pub struct IlbSpec {
    /// Backend pool definition
    pub pool: PoolSpec,

    /// Virtual server definition
    pub vip: VipSpec,

    /// Owner of the load balancer (carried, not interpreted)
    #[serde(default)]
    pub owner: String,
}

/// Desired pool on the appliance.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PoolSpec {
    /// Pool name; the appliance stores it as `lbauto-<name>`
    pub name: String,

    #[serde(default)]
    pub description: String,

    /// Port every member listens on
    pub port: i32,

    /// Backend members
    #[serde(default)]
    pub members: Vec<Member>,

    /// Appliance environment id
    pub environment: i64,

    /// Appliance user group id
    pub user_group: i64,

    /// e.g. "least-connections-member"
    #[serde(default)]
    pub load_balancing_mode: String,

    #[serde(default)]
    pub min_active_members: i32,

    /// Health monitor, e.g. "i_tcp"
    #[serde(default)]
    pub monitor: String,
}

/// One backend member of a pool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Member {
    #[serde(default)]
    pub name: String,

    /// Member IP address
    pub ip: String,

    #[serde(default)]
    pub connection_limit: i32,

    #[serde(default)]
    pub priority_group: i32,

    #[serde(default)]
    pub ratio: i32,

    /// e.g. "enabled", "disabled"
    #[serde(default)]
    pub admin_state: String,
}

/// Desired virtual server on the appliance.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct VipSpec {
    /// Virtual server name; the appliance stores it as `lbauto-<name>`
    pub name: String,

    #[serde(default)]
    pub description: String,

    pub port: i32,

    /// e.g. "private"
    #[serde(default)]
    pub ip_type: String,

    /// Persistence profile, e.g. "i_client_ip_5min"
    #[serde(default)]
    pub persist: String,

    /// e.g. "tcp"
    #[serde(default)]
    pub ip_protocol: String,

    pub environment: i64,

    pub user_group: i64,
}

/// Observed state, written only by the controller.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct IlbStatus {
    #[serde(default)]
    pub name: String,

    #[serde(default)]
    pub state: IlbState,

    /// JSON-encoded `{errorCode, message}`
    #[serde(default)]
    pub message: String,

    /// Address assigned to the virtual server
    #[serde(default)]
    pub vip: String,

    #[serde(default, rename = "poolID")]
    pub pool_id: i64,

    #[serde(default, rename = "vipID")]
    pub vip_id: i64,

    #[serde(default)]
    pub conditions: IlbConditions,
}

/// Provisioning sub-steps completed on the provider.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, JsonSchema, Default, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct IlbConditions {
    pub pool_created: bool,

    pub vip_created: bool,

    pub vip_pool_linked: bool,
}

impl IlbConditions {
    /// Pool and VIP exist and are linked.
    pub fn all_met(&self) -> bool {
        self.pool_created && self.vip_created && self.vip_pool_linked
    }

    /// Pool and VIP exist but the VIP does not point at the pool yet.
    pub fn awaiting_link(&self) -> bool {
        self.pool_created && self.vip_created && !self.vip_pool_linked
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, JsonSchema, Default, PartialEq, Eq)]
/// Load balancer lifecycle label
///
/// `Ready` serializes as "Active" and `Terminated` as "Deleting" to stay
/// compatible with the labels the UI already renders.
pub enum IlbState {
    #[default]
    Pending,

    #[serde(rename = "Active")]
    Ready,

    #[serde(rename = "Deleting")]
    Terminated,

    Error,
}

impl IlbStatus {
    /// Replace the status message with an encoded `OperatorMessage`.
    pub fn set_message(&mut self, error_code: i32, message: impl Into<String>) {
        self.message = OperatorMessage::new(error_code, message).encode();
    }
}

impl Ilb {
    /// Mutable status, created zero-valued on first access.
    pub fn status_mut(&mut self) -> &mut IlbStatus {
        self.status.get_or_insert_with(IlbStatus::default)
    }

    /// Current conditions (all false when no status was written yet).
    pub fn conditions(&self) -> IlbConditions {
        self.status.as_ref().map(|s| s.conditions).unwrap_or_default()
    }

    /// Current state label (`Pending` when no status was written yet).
    pub fn state(&self) -> IlbState {
        self.status.as_ref().map(|s| s.state).unwrap_or_default()
    }

    /// True once the store has stamped a deletion marker on the object.
    pub fn is_deleting(&self) -> bool {
        self.metadata.deletion_timestamp.is_some()
    }

    pub fn has_finalizer(&self) -> bool {
        self.finalizers().iter().any(|f| f == ILB_FINALIZER)
    }

    pub fn add_finalizer(&mut self) {
        if !self.has_finalizer() {
            self.finalizers_mut().push(ILB_FINALIZER.to_string());
        }
    }

    pub fn remove_finalizer(&mut self) {
        self.finalizers_mut().retain(|f| f != ILB_FINALIZER);
    }

    /// `namespace/name` key used in logs and backoff tracking.
    pub fn key(&self) -> String {
        format!(
            "{}/{}",
            self.namespace().unwrap_or_else(|| "default".to_string()),
            self.name_any()
        )
    }
}
