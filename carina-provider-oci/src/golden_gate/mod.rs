//! GoldenGate API
//!
//! The resource adapter and the work request poller only talk to the service
//! through [`DeploymentApi`] and [`WorkRequestApi`]. [`GoldenGateClient`] is
//! the HTTP implementation.

mod client;
pub mod models;

use async_trait::async_trait;

use crate::error::OciResult;
use crate::retry::RetryPolicy;
use models::{
    ChangeDeploymentCompartmentDetails, CreateDeploymentDetails, Deployment,
    DeploymentVersionSummary, ListDeploymentVersionsRequest, UpdateDeploymentDetails,
    UpgradeDeploymentDetails, WorkRequest, WorkRequestError,
};

pub use client::GoldenGateClient;

/// Result of an asynchronous operation the service accepted
#[derive(Debug, Clone, PartialEq)]
pub struct Accepted<T> {
    pub value: T,
    pub work_request_id: String,
}

/// Deployment operations
///
/// Every call takes the retry policy to apply; the asynchronous ones return
/// the id of the work request tracking them.
#[async_trait]
pub trait DeploymentApi: Send + Sync {
    async fn create_deployment(
        &self,
        details: &CreateDeploymentDetails,
        policy: &RetryPolicy,
    ) -> OciResult<Accepted<Deployment>>;

    async fn get_deployment(&self, deployment_id: &str, policy: &RetryPolicy)
    -> OciResult<Deployment>;

    async fn update_deployment(
        &self,
        deployment_id: &str,
        details: &UpdateDeploymentDetails,
        policy: &RetryPolicy,
    ) -> OciResult<String>;

    async fn delete_deployment(&self, deployment_id: &str, policy: &RetryPolicy)
    -> OciResult<String>;

    async fn start_deployment(&self, deployment_id: &str, policy: &RetryPolicy)
    -> OciResult<String>;

    async fn stop_deployment(&self, deployment_id: &str, policy: &RetryPolicy)
    -> OciResult<String>;

    async fn upgrade_deployment(
        &self,
        deployment_id: &str,
        details: &UpgradeDeploymentDetails,
        policy: &RetryPolicy,
    ) -> OciResult<String>;

    async fn change_deployment_compartment(
        &self,
        deployment_id: &str,
        details: &ChangeDeploymentCompartmentDetails,
        policy: &RetryPolicy,
    ) -> OciResult<String>;

    /// All pages of the deployment versions listing
    async fn list_deployment_versions(
        &self,
        request: &ListDeploymentVersionsRequest,
        policy: &RetryPolicy,
    ) -> OciResult<Vec<DeploymentVersionSummary>>;
}

/// Work request operations
#[async_trait]
pub trait WorkRequestApi: Send + Sync {
    async fn get_work_request(
        &self,
        work_request_id: &str,
        policy: &RetryPolicy,
    ) -> OciResult<WorkRequest>;

    /// All errors recorded on a work request
    async fn list_work_request_errors(
        &self,
        work_request_id: &str,
        policy: &RetryPolicy,
    ) -> OciResult<Vec<WorkRequestError>>;
}

/// Everything the GoldenGate resources need
pub trait GoldenGateApi: DeploymentApi + WorkRequestApi {}

impl<T: DeploymentApi + WorkRequestApi> GoldenGateApi for T {}
