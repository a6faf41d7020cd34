//! Kubernetes resource watcher.
//!
//! Drives the reconciler from a kube_runtime::Controller, which handles
//! reconnection, deduplicates events per object and never runs two
//! reconciles of the same object at once.

use crate::error::ControllerError;
use crate::reconciler::Reconciler;
use crds::Ilb;
use futures::StreamExt;
use kube::{Api, ResourceExt};
use kube_runtime::{
    controller::{Action, Config as ControllerConfig},
    watcher, Controller,
};
use std::sync::Arc;
use tracing::{debug, error, info};

/// Watches Ilb resources and reconciles them until the stream ends.
pub async fn watch_ilbs(
    api: Api<Ilb>,
    reconciler: Arc<Reconciler>,
    max_concurrent_reconciles: u16,
) -> Result<(), ControllerError> {
    info!(
        "Starting Ilb watcher ({} concurrent reconciles)",
        max_concurrent_reconciles
    );

    // Error policy: requeue with per-resource Fibonacci backoff
    let error_policy = |obj: Arc<Ilb>, error: &ControllerError, ctx: Arc<Reconciler>| {
        let key = obj.key();
        let (backoff, error_count) = ctx.get_backoff_for_resource(&key);
        error!(
            "Reconciliation of Ilb {} failed (attempt {}), retrying in {:?}: {}",
            key, error_count, backoff, error
        );
        Action::requeue(backoff)
    };

    let reconcile = |obj: Arc<Ilb>, ctx: Arc<Reconciler>| async move {
        let key = obj.key();
        let namespace = obj.namespace().unwrap_or_default();
        debug!("Reconciling Ilb {}", key);

        let outcome = ctx.reconcile(&namespace, &obj.name_any()).await?;
        ctx.reset_error(&key);
        debug!("Reconciled Ilb {}: {:?}", key, outcome);
        Ok::<Action, ControllerError>(ctx.action(outcome))
    };

    let controller_config = ControllerConfig::default().concurrency(max_concurrent_reconciles);

    Controller::new(api, watcher::Config::default())
        .with_config(controller_config)
        .run(reconcile, error_policy, reconciler)
        .for_each(|res| async move {
            if let Err(e) = res {
                error!("Ilb controller error: {}", e);
            }
        })
        .await;

    info!("Ilb watcher stopped");
    Ok(())
}
