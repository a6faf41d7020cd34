//! Resource store seam
//!
//! The reconciler reads and writes `Ilb` objects through `ResourceStore` so
//! the state machine can be tested without an API server.

use crate::error::ControllerError;
use crds::Ilb;
use kube::api::{Patch, PatchParams};
use kube::{Api, Client, ResourceExt};
use serde_json::json;
use tracing::debug;

/// Get/update access to `Ilb` objects.
#[async_trait::async_trait]
pub trait ResourceStore: Send + Sync {
    /// Fetch the latest copy; `None` once the object is gone.
    async fn get(&self, namespace: &str, name: &str) -> Result<Option<Ilb>, ControllerError>;

    /// Persist metadata (finalizers). Fails if the object changed since it
    /// was read.
    async fn update(&self, ilb: &Ilb) -> Result<Ilb, ControllerError>;

    /// Persist the status subresource.
    async fn update_status(&self, ilb: &Ilb) -> Result<Ilb, ControllerError>;
}

/// `ResourceStore` backed by the Kubernetes API.
#[derive(Clone)]
pub struct KubeStore {
    client: Client,
}

impl KubeStore {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    fn api_for(&self, ilb: &Ilb) -> Result<Api<Ilb>, ControllerError> {
        let namespace = ilb
            .namespace()
            .ok_or_else(|| ControllerError::Store(format!("Ilb {} has no namespace", ilb.name_any())))?;
        Ok(Api::namespaced(self.client.clone(), &namespace))
    }
}

#[async_trait::async_trait]
impl ResourceStore for KubeStore {
    async fn get(&self, namespace: &str, name: &str) -> Result<Option<Ilb>, ControllerError> {
        let api: Api<Ilb> = Api::namespaced(self.client.clone(), namespace);
        Ok(api.get_opt(name).await?)
    }

    async fn update(&self, ilb: &Ilb) -> Result<Ilb, ControllerError> {
        let api = self.api_for(ilb)?;
        // resourceVersion turns the merge patch into an optimistic-concurrency update
        let patch = json!({
            "metadata": {
                "resourceVersion": ilb.resource_version(),
                "finalizers": ilb.finalizers(),
            }
        });
        debug!("Updating finalizers of {} to {:?}", ilb.key(), ilb.finalizers());
        Ok(api
            .patch(&ilb.name_any(), &PatchParams::default(), &Patch::Merge(&patch))
            .await?)
    }

    async fn update_status(&self, ilb: &Ilb) -> Result<Ilb, ControllerError> {
        let api = self.api_for(ilb)?;
        let patch = json!({ "status": ilb.status });
        debug!("Updating status of {}", ilb.key());
        Ok(api
            .patch_status(&ilb.name_any(), &PatchParams::default(), &Patch::Merge(&patch))
            .await?)
    }
}
