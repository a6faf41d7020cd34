//! Controller-specific error types.
//!
//! Provider failures arrive as `ProviderError`; everything the controller
//! itself can get wrong (configuration, store, watch) is covered here.

use crate::provider::ProviderError;
use kube::Error as KubeError;
use thiserror::Error;

/// Errors that can occur in the Ilb Controller.
#[derive(Debug, Error)]
pub enum ControllerError {
    /// Kubernetes API error
    #[error("Kubernetes error: {0}")]
    Kube(#[from] KubeError),

    /// Load-balancer provider error
    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Resource store rejected or could not address an object
    #[error("Resource store error: {0}")]
    Store(String),

    /// Resource watch failed
    #[error("Resource watch failed: {0}")]
    Watch(String),
}
