//! Main controller implementation.
//!
//! Wires the provider, the resource store and the reconciler together and
//! runs the Ilb watcher until it exits or the process is interrupted.

use crate::config::ControllerConfig;
use crate::error::ControllerError;
use crate::provider::new_provider;
use crate::reconciler::Reconciler;
use crate::store::KubeStore;
use crate::watcher::watch_ilbs;
use crds::Ilb;
use kube::{Api, Client};
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::info;

/// Main controller for Ilb management.
pub struct Controller {
    ilb_watcher: JoinHandle<Result<(), ControllerError>>,
}

impl Controller {
    /// Creates a new controller instance.
    ///
    /// Provider construction happens first so a bad provider type or missing
    /// credentials fail before anything is watched.
    pub async fn new(config: ControllerConfig) -> Result<Self, ControllerError> {
        info!("Initializing Ilb Controller");

        let provider = new_provider(&config)?;

        // Create Kubernetes client
        let kube_client = Client::try_default().await?;

        let api: Api<Ilb> = match config.namespace.as_deref() {
            Some(ns) => Api::namespaced(kube_client.clone(), ns),
            None => Api::all(kube_client.clone()),
        };

        let reconciler = Arc::new(Reconciler::new(
            provider,
            Box::new(KubeStore::new(kube_client)),
            config.resync_interval,
        ));

        let max_concurrent_reconciles = config.max_concurrent_reconciles;
        let ilb_watcher = tokio::spawn(async move {
            watch_ilbs(api, reconciler, max_concurrent_reconciles).await
        });

        Ok(Self { ilb_watcher })
    }

    /// Runs the controller until shutdown.
    pub async fn run(mut self) -> Result<(), ControllerError> {
        info!("Ilb Controller running");

        tokio::select! {
            result = &mut self.ilb_watcher => {
                result.map_err(|e| ControllerError::Watch(format!("Ilb watcher panicked: {}", e)))??;
            }
            _ = tokio::signal::ctrl_c() => {
                info!("Received interrupt, shutting down");
                self.ilb_watcher.abort();
            }
        }

        Ok(())
    }
}
