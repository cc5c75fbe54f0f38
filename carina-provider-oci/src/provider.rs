//! OCI provider implementation
//!
//! Dispatches Carina resource operations to the resource adapters and turns
//! their results into [`State`].

use std::sync::Arc;

use carina_core::differ::Changes;
use carina_core::provider::{ProviderError, ProviderResult};
use carina_core::resource::{Resource, ResourceId, State};
use carina_core::schema::{ResourceSchema, ResourceTimeouts};

use crate::config::{OciConfig, RetryConfig, WorkRequestConfig};
use crate::error::{OciError, OciResult};
use crate::golden_gate::{GoldenGateApi, GoldenGateClient};
use crate::resources::golden_gate_deployment::{
    self, DeploymentAdapter, DeploymentConfig, deployment_attributes,
};
use crate::resources::{deployment_versions, schema_for};

/// OCI Provider
pub struct OciProvider {
    api: Arc<dyn GoldenGateApi>,
    retry: RetryConfig,
    work_requests: WorkRequestConfig,
}

fn fail(id: &ResourceId, err: OciError) -> ProviderError {
    ProviderError::from(err).for_resource(id.clone())
}

fn unsupported(id: &ResourceId) -> ProviderError {
    ProviderError::new(format!("Unsupported resource type: {}", id.resource_type))
        .for_resource(id.clone())
}

impl OciProvider {
    /// Create a provider talking HTTPS to the endpoint `config` resolves to
    pub fn from_config(config: &OciConfig) -> OciResult<Self> {
        let client = GoldenGateClient::from_config(config)?;
        Ok(Self::with_api(Arc::new(client), config))
    }

    /// Create a provider on top of any GoldenGate API implementation
    pub fn with_api(api: Arc<dyn GoldenGateApi>, config: &OciConfig) -> Self {
        Self {
            api,
            retry: config.retry.clone(),
            work_requests: config.work_requests.clone(),
        }
    }

    fn deployments(&self, timeouts: ResourceTimeouts) -> DeploymentAdapter<'_> {
        DeploymentAdapter::new(
            self.api.as_ref(),
            &self.retry,
            self.work_requests.poll_interval(),
            timeouts,
        )
    }

    fn schema(id: &ResourceId) -> ProviderResult<ResourceSchema> {
        schema_for(&id.resource_type).ok_or_else(|| unsupported(id))
    }

    /// Validate the configuration of `resource` and resolve its timeouts
    pub fn validate(resource: &Resource) -> ProviderResult<ResourceTimeouts> {
        let schema = Self::schema(&resource.id)?;
        if let Err(errors) = schema.validate(&resource.attributes) {
            let messages: Vec<String> = errors.iter().map(ToString::to_string).collect();
            return Err(ProviderError::new(format!(
                "Invalid configuration: {}",
                messages.join("; ")
            ))
            .for_resource(resource.id.clone()));
        }
        schema
            .effective_timeouts(&resource.attributes)
            .map_err(|e| fail(&resource.id, e.into()))
    }

    pub async fn read_resource(
        &self,
        id: &ResourceId,
        identifier: Option<&str>,
    ) -> ProviderResult<State> {
        let Some(identifier) = identifier else {
            return Ok(State::not_found(id.clone()));
        };

        match id.resource_type.as_str() {
            golden_gate_deployment::RESOURCE_TYPE => {
                let timeouts = Self::schema(id)?.timeouts;
                let deployment = self
                    .deployments(timeouts)
                    .read(identifier)
                    .await
                    .map_err(|e| fail(id, e))?;
                Ok(match deployment {
                    // Write-only fields are unknown without configuration
                    Some(d) => State::existing(
                        id.clone(),
                        deployment_attributes(&d, &DeploymentConfig::default()),
                    )
                    .with_identifier(d.id),
                    None => State::not_found(id.clone()),
                })
            }
            _ => Err(unsupported(id)),
        }
    }

    pub async fn create_resource(&self, resource: Resource) -> ProviderResult<State> {
        let id = &resource.id;
        match id.resource_type.as_str() {
            golden_gate_deployment::RESOURCE_TYPE => {
                let timeouts = Self::validate(&resource)?;
                let config = DeploymentConfig::from_lookup(|path| resource.get(path))
                    .map_err(|e| fail(id, e))?;
                let deployment = self
                    .deployments(timeouts)
                    .create(&config)
                    .await
                    .map_err(|e| fail(id, e))?;
                Ok(
                    State::existing(id.clone(), deployment_attributes(&deployment, &config))
                        .with_identifier(deployment.id),
                )
            }
            _ => Err(unsupported(id)),
        }
    }

    pub async fn update_resource(
        &self,
        id: &ResourceId,
        identifier: &str,
        from: &State,
        to: &Resource,
    ) -> ProviderResult<State> {
        match id.resource_type.as_str() {
            golden_gate_deployment::RESOURCE_TYPE => {
                let timeouts = Self::validate(to)?;
                let changes = Changes::new(from, to);
                let config = DeploymentConfig::from_changes(&changes).map_err(|e| fail(id, e))?;
                let deployment = self
                    .deployments(timeouts)
                    .update(identifier, &changes)
                    .await
                    .map_err(|e| fail(id, e))?;
                Ok(
                    State::existing(id.clone(), deployment_attributes(&deployment, &config))
                        .with_identifier(deployment.id),
                )
            }
            _ => Err(unsupported(id)),
        }
    }

    pub async fn delete_resource(&self, id: &ResourceId, identifier: &str) -> ProviderResult<()> {
        match id.resource_type.as_str() {
            golden_gate_deployment::RESOURCE_TYPE => {
                let timeouts = Self::schema(id)?.timeouts;
                self.deployments(timeouts)
                    .delete(identifier)
                    .await
                    .map_err(|e| fail(id, e))
            }
            _ => Err(unsupported(id)),
        }
    }

    pub async fn read_data_source_resource(&self, resource: Resource) -> ProviderResult<State> {
        let id = &resource.id;
        match id.resource_type.as_str() {
            deployment_versions::DATA_SOURCE_TYPE => {
                Self::validate(&resource)?;
                let policy = self.retry.policy(false);
                let attributes = deployment_versions::read(self.api.as_ref(), &resource, &policy)
                    .await
                    .map_err(|e| fail(id, e))?;
                Ok(State::existing(id.clone(), attributes))
            }
            _ => Err(unsupported(id)),
        }
    }
}
