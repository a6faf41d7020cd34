//! Status message encoding
//!
//! `status.message` is a JSON document rather than free text so the UI can
//! show the provider error code next to the reason.

use serde::{Deserialize, Serialize};
use tracing::error;

/// Message shown to the resource owner.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct OperatorMessage {
    /// HTTP status from the provider, 0 when there is no error
    pub error_code: i32,
    pub message: String,
}

pub const PROVISIONING_MESSAGE: &str = "Provisioning load balancer";
pub const READY_MESSAGE: &str = "Load balancer ready";
pub const DELETING_MESSAGE: &str = "Deleting load balancer";
pub const VIP_MISSING_MESSAGE: &str = "Virtual server was created but missing in provider";
pub const POOL_MISSING_MESSAGE: &str = "Pool was created but missing in provider";

impl OperatorMessage {
    pub fn new(error_code: i32, message: impl Into<String>) -> Self {
        Self {
            error_code,
            message: message.into(),
        }
    }

    /// Encode as the JSON string stored in `status.message`.
    pub fn encode(&self) -> String {
        match serde_json::to_string(self) {
            Ok(s) => s,
            Err(e) => {
                error!("Failed to encode operator message: {}", e);
                String::new()
            }
        }
    }

    /// Parse a stored `status.message`; `None` for empty or foreign text.
    pub fn decode(raw: &str) -> Option<Self> {
        serde_json::from_str(raw).ok()
    }
}
