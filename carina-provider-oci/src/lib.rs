//! Carina OCI Provider
//!
//! Oracle Cloud Infrastructure provider implementation, covering GoldenGate
//! deployments.
//!
//! ## Module Structure
//!
//! - `config` - Provider configuration (TOML file and environment)
//! - `client` - HTTP transport shared by the service clients
//! - `retry` - Retry policy applied to every API call
//! - `golden_gate` - GoldenGate API models, traits and HTTP client
//! - `work_request` - Polling of asynchronous operations
//! - `resources` - Resource type definitions and adapters
//! - `provider` - OciProvider implementation

pub mod client;
pub mod config;
pub mod error;
pub mod golden_gate;
pub mod provider;
pub mod resources;
pub mod retry;
pub mod tags;
pub mod work_request;

#[cfg(test)]
mod testing;

// Re-export main types
pub use config::OciConfig;
pub use error::{OciError, OciResult};
pub use provider::OciProvider;
pub use retry::RetryPolicy;

use carina_core::provider::{BoxFuture, Provider, ProviderResult, ResourceType};
use carina_core::resource::{Resource, ResourceId, State};

use resources::resource_types;

// =============================================================================
// Provider Trait Implementation
// =============================================================================

impl Provider for OciProvider {
    fn name(&self) -> &'static str {
        "oci"
    }

    fn resource_types(&self) -> Vec<Box<dyn ResourceType>> {
        resource_types()
    }

    fn read(
        &self,
        id: &ResourceId,
        identifier: Option<&str>,
    ) -> BoxFuture<'_, ProviderResult<State>> {
        let id = id.clone();
        let identifier = identifier.map(|s| s.to_string());
        Box::pin(async move { self.read_resource(&id, identifier.as_deref()).await })
    }

    fn create(&self, resource: &Resource) -> BoxFuture<'_, ProviderResult<State>> {
        let resource = resource.clone();
        Box::pin(async move { self.create_resource(resource).await })
    }

    fn update(
        &self,
        id: &ResourceId,
        identifier: &str,
        from: &State,
        to: &Resource,
    ) -> BoxFuture<'_, ProviderResult<State>> {
        let id = id.clone();
        let identifier = identifier.to_string();
        let from = from.clone();
        let to = to.clone();
        Box::pin(async move { self.update_resource(&id, &identifier, &from, &to).await })
    }

    fn delete(&self, id: &ResourceId, identifier: &str) -> BoxFuture<'_, ProviderResult<()>> {
        let id = id.clone();
        let identifier = identifier.to_string();
        Box::pin(async move { self.delete_resource(&id, &identifier).await })
    }

    fn read_data_source(&self, resource: &Resource) -> BoxFuture<'_, ProviderResult<State>> {
        let resource = resource.clone();
        Box::pin(async move { self.read_data_source_resource(resource).await })
    }
}
