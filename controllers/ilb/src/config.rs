//! Controller configuration.
//!
//! Read once from the environment at start-up. Anything missing or
//! malformed is fatal before the first reconcile.

use crate::error::ControllerError;
use highwire_client::HighwireConfig;
use std::time::Duration;

pub const DEFAULT_PROVIDER_TYPE: &str = "highwire";
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 15;
pub const DEFAULT_MAX_CONCURRENT_RECONCILES: u16 = 3;
pub const DEFAULT_RESYNC_INTERVAL_SECS: u64 = 300;

/// Typed controller settings.
#[derive(Debug, Clone)]
pub struct ControllerConfig {
    /// Selects the concrete provider, e.g. "highwire"
    pub provider_type: String,
    pub highwire: HighwireConfig,
    pub max_concurrent_reconciles: u16,
    /// Requeue delay for resources that are fully reconciled
    pub resync_interval: Duration,
    /// `None` watches all namespaces
    pub namespace: Option<String>,
}

impl ControllerConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ControllerError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration from any key lookup (empty values count as unset)
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ControllerError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        let required = |key: &str| {
            get(key).ok_or_else(|| {
                ControllerError::InvalidConfig(format!("{} environment variable is required", key))
            })
        };

        let request_timeout = parse_or(&get, "REQUEST_TIMEOUT_SECS", DEFAULT_REQUEST_TIMEOUT_SECS)?;
        let max_concurrent_reconciles =
            parse_or(&get, "MAX_CONCURRENT_RECONCILES", DEFAULT_MAX_CONCURRENT_RECONCILES)?;
        if max_concurrent_reconciles == 0 {
            return Err(ControllerError::InvalidConfig(
                "MAX_CONCURRENT_RECONCILES must be at least 1".to_string(),
            ));
        }
        let resync_interval = parse_or(&get, "RESYNC_INTERVAL_SECS", DEFAULT_RESYNC_INTERVAL_SECS)?;

        Ok(Self {
            provider_type: get("PROVIDER_TYPE").unwrap_or_else(|| DEFAULT_PROVIDER_TYPE.to_string()),
            highwire: HighwireConfig {
                base_url: required("HIGHWIRE_BASE_URL")?,
                domain: get("HIGHWIRE_DOMAIN").unwrap_or_default(),
                username: required("HIGHWIRE_USERNAME")?,
                secret: required("HIGHWIRE_SECRET")?,
                timeout: Duration::from_secs(request_timeout),
            },
            max_concurrent_reconciles,
            resync_interval: Duration::from_secs(resync_interval),
            namespace: get("WATCH_NAMESPACE"),
        })
    }
}

fn parse_or<T, G>(get: &G, key: &str, default: T) -> Result<T, ControllerError>
where
    T: std::str::FromStr,
    G: Fn(&str) -> Option<String>,
{
    match get(key) {
        Some(raw) => raw.parse().map_err(|_| {
            ControllerError::InvalidConfig(format!("{} must be a non-negative integer, got {:?}", key, raw))
        }),
        None => Ok(default),
    }
}
