//! Highwire client errors

use serde::Deserialize;
use thiserror::Error;

pub const BAD_REQUEST: &str = "Bad Request: Invalid parameters or incorrect values for env type";
pub const UNAUTHORIZED: &str = "Unauthorized: Missing, Expired, or Invalid apiToken";
pub const FORBIDDEN: &str = "Forbidden: User/User Group does not have access to given object";
pub const NOT_FOUND: &str = "Not Found: Object or supporting object not found";
pub const CONFLICT: &str = "Conflict: Object already exists with name/ip/... or object is in use by another object";
pub const GENERIC_ERROR: &str = "Error Occured";

/// Errors that can occur when interacting with the Highwire API
#[derive(Debug, Error)]
pub enum HighwireError {
    /// Transport failure (connect, timeout, TLS)
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Non-2xx response, classified
    #[error("Highwire API error {status}: {reason}{details}")]
    Api {
        status: u16,
        reason: String,
        /// Vendor-supplied messages, concatenated
        details: String,
    },

    /// JSON serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Login rejected or login response unusable
    #[error("Authentication failed: {0}")]
    Authentication(String),

    /// Client constructed with unusable settings
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

/// Error payload returned by Highwire alongside a failing status.
#[derive(Debug, Default, Deserialize)]
struct Issues {
    #[serde(default)]
    messages: Vec<Issue>,
}

#[derive(Debug, Default, Deserialize)]
struct Issue {
    #[serde(default)]
    message: String,
}

/// Human-readable reason for a Highwire status code.
pub fn status_reason(status: u16) -> &'static str {
    match status {
        400 => BAD_REQUEST,
        401 => UNAUTHORIZED,
        403 => FORBIDDEN,
        404 => NOT_FOUND,
        409 => CONFLICT,
        _ => GENERIC_ERROR,
    }
}

/// Concatenate the vendor messages in an error body (empty when the body
/// is not the vendor error shape).
pub fn vendor_messages(body: &[u8]) -> String {
    serde_json::from_slice::<Issues>(body)
        .map(|issues| {
            issues
                .messages
                .into_iter()
                .map(|m| m.message)
                .collect::<Vec<_>>()
                .join("; ")
        })
        .unwrap_or_default()
}

impl HighwireError {
    /// Classify a failed response.
    pub fn from_response(status: u16, body: &[u8]) -> Self {
        let messages = vendor_messages(body);
        let details = if messages.is_empty() {
            String::new()
        } else {
            format!(" ({})", messages)
        };
        HighwireError::Api {
            status,
            reason: status_reason(status).to_string(),
            details,
        }
    }

    /// HTTP status of an API error.
    pub fn status(&self) -> Option<u16> {
        match self {
            HighwireError::Api { status, .. } => Some(*status),
            HighwireError::Http(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }

    pub fn is_not_found(&self) -> bool {
        self.status() == Some(404)
    }

    /// Reason + vendor messages, as shown to the resource owner.
    pub fn operator_text(&self) -> String {
        match self {
            HighwireError::Api { reason, details, .. } => format!("{}{}", reason, details),
            other => other.to_string(),
        }
    }
}
