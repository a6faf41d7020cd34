//! Ilb reconciler
//!
//! One pass walks a fixed sequence of steps and stops at the first step
//! that changed something on the provider, asking to be requeued so the
//! next pass starts again from a fresh status:
//!
//! 1. deletion: clean up remote objects, then release the finalizer
//! 2. finalizer installation
//! 3. status refresh (`get_status`)
//! 4. create virtual server
//! 5. create pool (only with at least one member)
//! 6. link virtual server to pool
//! 7. drift correction (best effort)
//! 8. requeue while still unlinked
//!
//! The status is flushed to the store once at the end of every pass that
//! reached step 3, whether the pass succeeded or not.


use crate::backoff::FibonacciBackoff;
use crate::error::ControllerError;
use crate::provider::{LoadBalancerProvider, ProviderError};
use crate::store::ResourceStore;
use crds::{Ilb, IlbState, DELETING_MESSAGE};
use kube_runtime::controller::Action;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// Delay for `Outcome::Requeue`
pub const REQUEUE_DELAY: Duration = Duration::from_secs(1);

/// What the scheduler should do after a successful pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// A step changed the provider; re-run shortly.
    Requeue,
    /// Steady state; re-run after the resync interval to catch drift.
    Resync,
    /// Nothing left to do until the object changes.
    Done,
}

/// Backoff state for a resource
#[derive(Debug, Clone, Default)]
struct BackoffState {
    backoff: FibonacciBackoff,
    error_count: u32,
}

impl BackoffState {
    fn reset(&mut self) {
        self.error_count = 0;
        self.backoff.reset();
    }
}

/// Reconciles Ilb resources against the configured provider.
pub struct Reconciler {
    provider: Box<dyn LoadBalancerProvider>,
    store: Box<dyn ResourceStore>,
    resync_interval: Duration,
    /// Error tracking per resource (namespace/name -> BackoffState)
    backoff_states: Arc<Mutex<HashMap<String, BackoffState>>>,
}

impl Reconciler {
    pub fn new(
        provider: Box<dyn LoadBalancerProvider>,
        store: Box<dyn ResourceStore>,
        resync_interval: Duration,
    ) -> Self {
        Self {
            provider,
            store,
            resync_interval,
            backoff_states: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Map a pass outcome onto a scheduler action.
    pub fn action(&self, outcome: Outcome) -> Action {
        match outcome {
            Outcome::Requeue => Action::requeue(REQUEUE_DELAY),
            Outcome::Resync => Action::requeue(self.resync_interval),
            Outcome::Done => Action::await_change(),
        }
    }

    /// Run one reconcile pass for `namespace/name`.
    pub async fn reconcile(&self, namespace: &str, name: &str) -> Result<Outcome, ControllerError> {
        let Some(mut ilb) = self.store.get(namespace, name).await? else {
            debug!("Ilb {}/{} no longer exists", namespace, name);
            self.forget(&format!("{}/{}", namespace, name));
            return Ok(Outcome::Done);
        };
        let key = ilb.key();

        if ilb.is_deleting() {
            return self.reconcile_deletion(ilb).await;
        }

        if !ilb.has_finalizer() {
            info!("Adding finalizer to {}", key);
            ilb.add_finalizer();
            self.store.update(&ilb).await?;
            return Ok(Outcome::Requeue);
        }

        if ilb.state() == IlbState::Error {
            warn!(
                "Ilb {} is in Error state; clear its status to resume provisioning",
                key
            );
            return Ok(Outcome::Done);
        }

        let outcome = self.provision(&mut ilb).await;

        let flushed = self.store.update_status(&ilb).await;
        if let Err(e) = flushed {
            if outcome.is_ok() {
                return Err(e);
            }
            warn!("Failed to persist status of {}: {}", key, e);
        }
        outcome
    }

    /// Steps 3 to 8. Mutates `ilb.status` only; the caller persists it.
    async fn provision(&self, ilb: &mut Ilb) -> Result<Outcome, ControllerError> {
        let key = ilb.key();

        match self.provider.get_status(ilb).await {
            Ok(()) => {}
            Err(ProviderError::DataInconsistency(reason)) => {
                error!("Ilb {} needs operator attention: {}", key, reason);
                return Ok(Outcome::Done);
            }
            Err(e) => return Err(e.into()),
        }

        let conditions = ilb.conditions();

        if !conditions.vip_created {
            info!("Creating virtual server for {}", key);
            self.provider.create_virtual_server(ilb).await?;
            return Ok(Outcome::Requeue);
        }

        if !conditions.pool_created {
            if ilb.spec.pool.members.is_empty() {
                debug!("Pool for {} has no members yet, not creating it", key);
            } else {
                info!("Creating pool for {}", key);
                self.provider.create_pool(ilb).await?;
                return Ok(Outcome::Requeue);
            }
        }

        if conditions.awaiting_link() {
            info!("Linking virtual server to pool for {}", key);
            self.provider.link_vs_to_pool(ilb).await?;
            return Ok(Outcome::Requeue);
        }

        if conditions.pool_created {
            if let Err(e) = self.provider.observe_current_and_reconcile(ilb).await {
                warn!("Drift correction for {} failed: {}", key, e);
            }
        }

        if ilb.conditions().awaiting_link() {
            return Ok(Outcome::Requeue);
        }
        Ok(Outcome::Resync)
    }

    /// Step 1. Remote cleanup must succeed before the finalizer goes.
    async fn reconcile_deletion(&self, mut ilb: Ilb) -> Result<Outcome, ControllerError> {
        let key = ilb.key();
        if !ilb.has_finalizer() {
            return Ok(Outcome::Done);
        }

        if ilb.state() == IlbState::Terminated {
            debug!("Ilb {} already cleaned up", key);
        } else {
            if let Err(e) = self.provider.process_finalizers(&mut ilb).await {
                error!("Failed to clean up {}: {}", key, e);
                if let Err(flush) = self.store.update_status(&ilb).await {
                    warn!("Failed to persist status of {}: {}", key, flush);
                }
                return Err(e.into());
            }

            let status = ilb.status_mut();
            status.state = IlbState::Terminated;
            status.set_message(0, DELETING_MESSAGE);
            ilb = self.store.update_status(&ilb).await?;
        }

        info!("Removing finalizer from {}", key);
        ilb.remove_finalizer();
        self.store.update(&ilb).await?;
        self.forget(&key);
        Ok(Outcome::Done)
    }

    /// Get the Fibonacci backoff delay for a resource and count the error.
    ///
    /// Returns (backoff, error_count)
    pub fn get_backoff_for_resource(&self, resource_key: &str) -> (Duration, u32) {
        match self.backoff_states.lock() {
            Ok(mut states) => {
                let state = states.entry(resource_key.to_string()).or_default();
                state.error_count += 1;
                (state.backoff.next_backoff(), state.error_count)
            }
            Err(e) => {
                warn!("Failed to lock backoff_states: {}, using default backoff", e);
                (FibonacciBackoff::default().next_backoff(), 0)
            }
        }
    }

    /// Reset error tracking for a resource (on successful reconciliation)
    pub fn reset_error(&self, resource_key: &str) {
        if let Ok(mut states) = self.backoff_states.lock() {
            if let Some(state) = states.get_mut(resource_key) {
                state.reset();
            }
        }
    }

    /// Drop error tracking for a resource that is gone
    fn forget(&self, resource_key: &str) {
        if let Ok(mut states) = self.backoff_states.lock() {
            states.remove(resource_key);
        }
    }

    #[cfg(test)]
    fn tracked_resources(&self) -> usize {
        self.backoff_states.lock().map(|s| s.len()).unwrap_or(0)
    }
}
