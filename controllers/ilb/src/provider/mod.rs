//! Load-balancer provider abstraction
//!
//! The reconciler only talks to `LoadBalancerProvider`. Exactly one
//! implementation is selected at start-up by `new_provider`.

pub mod drift;
pub mod highwire;
#[cfg(test)]
mod highwire_test;

use crate::config::ControllerConfig;
use crate::error::ControllerError;
use crds::Ilb;
use highwire_client::{HighwireClient, HighwireError};
use std::str::FromStr;
use thiserror::Error;
use tracing::info;

pub use highwire::HighwireProvider;

/// Errors returned by provider operations.
#[derive(Debug, Error)]
pub enum ProviderError {
    /// Highwire call failed
    #[error("Highwire error: {0}")]
    Highwire(#[from] HighwireError),

    /// Status says an object was created but the provider no longer has it
    #[error("Data inconsistency: {0}")]
    DataInconsistency(String),

    /// One or both remote deletions failed
    #[error("Cleanup failed: {0}")]
    Cleanup(String),
}

/// Operations the reconciler needs from a load-balancer backend.
///
/// Every operation records its outcome on the resource status; the caller
/// persists it.
#[async_trait::async_trait]
pub trait LoadBalancerProvider: Send + Sync {
    /// Refresh the status from the provider's current view. Creates nothing.
    async fn get_status(&self, ilb: &mut Ilb) -> Result<(), ProviderError>;

    async fn create_pool(&self, ilb: &mut Ilb) -> Result<(), ProviderError>;

    async fn create_virtual_server(&self, ilb: &mut Ilb) -> Result<(), ProviderError>;

    /// Point the created virtual server at the created pool.
    async fn link_vs_to_pool(&self, ilb: &mut Ilb) -> Result<(), ProviderError>;

    /// Detect and correct pool membership drift.
    async fn observe_current_and_reconcile(&self, ilb: &mut Ilb) -> Result<(), ProviderError>;

    /// Delete the remote virtual server and pool. Safe to repeat.
    async fn process_finalizers(&self, ilb: &mut Ilb) -> Result<(), ProviderError>;
}

/// Supported provider backends
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderType {
    Highwire,
}

impl FromStr for ProviderType {
    type Err = ControllerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "highwire" => Ok(ProviderType::Highwire),
            other => Err(ControllerError::InvalidConfig(format!(
                "unknown provider type {:?}",
                other
            ))),
        }
    }
}

/// Build the configured provider.
///
/// Unknown provider types and unusable credentials fail here, before any
/// reconcile runs.
pub fn new_provider(config: &ControllerConfig) -> Result<Box<dyn LoadBalancerProvider>, ControllerError> {
    match config.provider_type.parse::<ProviderType>()? {
        ProviderType::Highwire => {
            let client = HighwireClient::new(config.highwire.clone())
                .map_err(|e| ControllerError::InvalidConfig(e.to_string()))?;
            info!("Using Highwire provider at {}", client.base_url());
            Ok(Box::new(HighwireProvider::new(client)))
        }
    }
}
