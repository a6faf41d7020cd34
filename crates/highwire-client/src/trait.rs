//! HighwireClient trait for mocking
//!
//! This trait abstracts the HighwireClient so the provider and reconciler
//! can be unit tested against `MockHighwireClient`.

use crate::error::HighwireError;
use crate::models::*;

/// Trait for Highwire API client operations
///
/// All async methods must be `Send` to work with Tokio's work-stealing runtime.
#[async_trait::async_trait]
pub trait HighwireClientTrait: Send + Sync {
    /// Get the base URL
    fn base_url(&self) -> &str;

    // Virtual servers
    async fn list_virtual_servers(&self, environment: i64) -> Result<Vec<VirtualServer>, HighwireError>;
    async fn create_virtual_server(&self, vs: &VirtualServer) -> Result<(), HighwireError>;
    async fn update_virtual_server(&self, id: i64, vs: &VirtualServer) -> Result<(), HighwireError>;
    async fn delete_virtual_server(&self, id: i64) -> Result<(), HighwireError>;

    // Pools
    async fn list_pools(&self, environment: i64) -> Result<Vec<Pool>, HighwireError>;
    async fn create_pool(&self, pool: &Pool) -> Result<(), HighwireError>;
    async fn delete_pool(&self, id: i64) -> Result<(), HighwireError>;
    async fn get_pool_members(&self, pool_id: i64) -> Result<Vec<PoolMember>, HighwireError>;
    /// Replace the whole member list of a pool
    async fn replace_pool_members(&self, pool_id: i64, pool: &Pool) -> Result<(), HighwireError>;

    /// Find a virtual server by its short name.
    ///
    /// Highwire has no server-side name filter, so this lists the whole
    /// environment and scans it.
    async fn find_virtual_server(&self, environment: i64, name: &str) -> Result<Option<VirtualServer>, HighwireError> {
        Ok(self
            .list_virtual_servers(environment)
            .await?
            .into_iter()
            .find(|vs| vs.short_name() == name))
    }

    /// Find a pool by its short name (same linear scan as virtual servers).
    async fn find_pool(&self, environment: i64, name: &str) -> Result<Option<Pool>, HighwireError> {
        Ok(self
            .list_pools(environment)
            .await?
            .into_iter()
            .find(|p| p.short_name() == name))
    }
}
