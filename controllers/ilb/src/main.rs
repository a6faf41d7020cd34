//! Ilb Controller
//!
//! Reconciles `Ilb` resources into a virtual server and pool on the
//! load-balancing appliance, keeps pool membership in line with the spec
//! and removes both when the resource is deleted.

mod backoff;
mod config;
mod controller;
mod error;
mod provider;
mod reconciler;
mod store;
#[cfg(test)]
mod test_utils;
mod watcher;

use crate::config::ControllerConfig;
use crate::error::ControllerError;
use controller::Controller;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), ControllerError> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    info!("Starting Ilb Controller");

    let config = ControllerConfig::from_env()?;

    info!("Configuration:");
    info!("  Provider: {}", config.provider_type);
    info!("  Highwire URL: {}", config.highwire.base_url);
    info!("  Request timeout: {:?}", config.highwire.timeout);
    info!("  Max concurrent reconciles: {}", config.max_concurrent_reconciles);
    info!("  Resync interval: {:?}", config.resync_interval);
    info!("  Namespace: {}", config.namespace.as_deref().unwrap_or("all namespaces"));

    // Initialize and run controller
    let controller = Controller::new(config).await?;
    controller.run().await?;

    Ok(())
}
