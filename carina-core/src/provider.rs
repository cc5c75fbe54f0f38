//! Provider contract
//!
//! A provider owns the API calls behind one family of resource types. The
//! OCI provider, for example, turns a `golden_gate_deployment` resource into
//! GoldenGate requests and reports what the service holds afterwards.

use std::error::Error;
use std::fmt;
use std::future::Future;
use std::pin::Pin;

use crate::resource::{Resource, ResourceId, State};
use crate::schema::ResourceSchema;

/// Failure of a provider operation, optionally tied to the resource it
/// concerned and the lower-level error that caused it
#[derive(Debug)]
pub struct ProviderError {
    pub message: String,
    pub resource_id: Option<ResourceId>,
    pub cause: Option<Box<dyn Error + Send + Sync>>,
}

impl fmt::Display for ProviderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.resource_id {
            Some(id) => write!(f, "[{}.{}] {}", id.resource_type, id.name, self.message),
            None => f.write_str(&self.message),
        }
    }
}

impl Error for ProviderError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        self.cause.as_deref().map(|e| e as &(dyn Error + 'static))
    }
}

impl ProviderError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            resource_id: None,
            cause: None,
        }
    }

    /// Prefix the message with `[type.name]` of `id`
    pub fn for_resource(mut self, id: ResourceId) -> Self {
        self.resource_id = Some(id);
        self
    }

    pub fn with_cause(mut self, cause: impl Error + Send + Sync + 'static) -> Self {
        self.cause = Some(Box::new(cause));
        self
    }
}

pub type ProviderResult<T> = Result<T, ProviderError>;

/// Future returned by provider operations
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// A resource type served by a provider
pub trait ResourceType: Send + Sync {
    /// Type name used in resource files, e.g. `golden_gate_deployment`
    fn name(&self) -> &'static str;

    fn schema(&self) -> ResourceSchema;
}

/// Operations a provider offers for its resource types
///
/// Every operation may call the remote service. Identifiers are the ones
/// the service assigns (OCIDs for OCI).
pub trait Provider: Send + Sync {
    fn name(&self) -> &'static str;

    fn resource_types(&self) -> Vec<Box<dyn ResourceType>>;

    /// Observed state of a resource
    ///
    /// Without an identifier the resource was never created. A resource the
    /// service no longer knows reads as `State::not_found`.
    fn read(
        &self,
        id: &ResourceId,
        identifier: Option<&str>,
    ) -> BoxFuture<'_, ProviderResult<State>>;

    /// Create a resource and wait until it is usable; the returned state
    /// carries the new identifier
    fn create(&self, resource: &Resource) -> BoxFuture<'_, ProviderResult<State>>;

    /// Bring the resource at `identifier` from the stored state `from` to
    /// the desired configuration `to`
    fn update(
        &self,
        id: &ResourceId,
        identifier: &str,
        from: &State,
        to: &Resource,
    ) -> BoxFuture<'_, ProviderResult<State>>;

    fn delete(&self, id: &ResourceId, identifier: &str) -> BoxFuture<'_, ProviderResult<()>>;

    /// Query a data source
    ///
    /// The resource carries the query arguments; the returned state holds
    /// them together with the results. Providers without data sources keep
    /// this default, which rejects the query.
    fn read_data_source(&self, resource: &Resource) -> BoxFuture<'_, ProviderResult<State>> {
        let id = resource.id.clone();
        let name = self.name();
        Box::pin(async move {
            Err(ProviderError::new(format!(
                "Provider '{}' does not support data source {}",
                name, id.resource_type
            ))
            .for_resource(id))
        })
    }
}
