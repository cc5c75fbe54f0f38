//! HTTP implementation of the GoldenGate API

use async_trait::async_trait;
use serde::de::DeserializeOwned;

use super::models::{
    ChangeDeploymentCompartmentDetails, Collection, CreateDeploymentDetails, Deployment,
    DeploymentActionDetails, DeploymentVersionSummary, ListDeploymentVersionsRequest,
    UpdateDeploymentDetails, UpgradeDeploymentDetails, WorkRequest, WorkRequestError,
};
use super::{Accepted, DeploymentApi, WorkRequestApi};
use crate::client::{ApiRequest, ApiResponse, OciHttpClient};
use crate::config::OciConfig;
use crate::error::OciResult;
use crate::retry::RetryPolicy;

/// GoldenGate client over HTTPS
#[derive(Debug, Clone)]
pub struct GoldenGateClient {
    http: OciHttpClient,
}

impl GoldenGateClient {
    pub fn new(http: OciHttpClient) -> Self {
        Self { http }
    }

    pub fn from_config(config: &OciConfig) -> OciResult<Self> {
        Ok(Self::new(OciHttpClient::from_config(config)?))
    }

    /// Fetch every page of a collection, following `opc-next-page`
    async fn list_all<T: DeserializeOwned>(
        &self,
        operation: &str,
        request: ApiRequest,
        policy: &RetryPolicy,
    ) -> OciResult<Vec<T>> {
        let mut items = Vec::new();
        let mut page: Option<String> = None;
        loop {
            let paged = request.clone().query_opt("page", page.take());
            let response = self.http.send(operation, &paged, policy).await?;
            let collection: Collection<T> = response.decode(operation)?;
            items.extend(collection.items);

            match response.headers.opc_next_page {
                Some(next) => page = Some(next),
                None => return Ok(items),
            }
        }
    }

    async fn deployment_action(
        &self,
        operation: &str,
        request: ApiRequest,
        policy: &RetryPolicy,
    ) -> OciResult<String> {
        let response: ApiResponse = self.http.send(operation, &request, policy).await?;
        response.work_request_id(operation)
    }
}

// Identifiers are percent-encoded as path segments
fn deployment_path(deployment_id: &str) -> String {
    format!("/deployments/{}", urlencoding::encode(deployment_id))
}

fn action_path(deployment_id: &str, action: &str) -> String {
    format!("{}/actions/{}", deployment_path(deployment_id), action)
}

fn work_request_path(work_request_id: &str) -> String {
    format!("/workRequests/{}", urlencoding::encode(work_request_id))
}

#[async_trait]
impl DeploymentApi for GoldenGateClient {
    async fn create_deployment(
        &self,
        details: &CreateDeploymentDetails,
        policy: &RetryPolicy,
    ) -> OciResult<Accepted<Deployment>> {
        // One token for all attempts so the service can drop duplicates
        let request = ApiRequest::post("/deployments")
            .json(details)?
            .retry_token(uuid::Uuid::new_v4().to_string());
        let response = self.http.send("CreateDeployment", &request, policy).await?;
        Ok(Accepted {
            value: response.decode("CreateDeployment")?,
            work_request_id: response.work_request_id("CreateDeployment")?,
        })
    }

    async fn get_deployment(
        &self,
        deployment_id: &str,
        policy: &RetryPolicy,
    ) -> OciResult<Deployment> {
        let request = ApiRequest::get(deployment_path(deployment_id));
        self.http
            .send("GetDeployment", &request, policy)
            .await?
            .decode("GetDeployment")
    }

    async fn update_deployment(
        &self,
        deployment_id: &str,
        details: &UpdateDeploymentDetails,
        policy: &RetryPolicy,
    ) -> OciResult<String> {
        let request = ApiRequest::put(deployment_path(deployment_id)).json(details)?;
        self.deployment_action("UpdateDeployment", request, policy).await
    }

    async fn delete_deployment(
        &self,
        deployment_id: &str,
        policy: &RetryPolicy,
    ) -> OciResult<String> {
        let request = ApiRequest::delete(deployment_path(deployment_id));
        self.deployment_action("DeleteDeployment", request, policy).await
    }

    async fn start_deployment(
        &self,
        deployment_id: &str,
        policy: &RetryPolicy,
    ) -> OciResult<String> {
        let request = ApiRequest::post(action_path(deployment_id, "start"))
            .json(&DeploymentActionDetails::Default)?;
        self.deployment_action("StartDeployment", request, policy).await
    }

    async fn stop_deployment(
        &self,
        deployment_id: &str,
        policy: &RetryPolicy,
    ) -> OciResult<String> {
        let request = ApiRequest::post(action_path(deployment_id, "stop"))
            .json(&DeploymentActionDetails::Default)?;
        self.deployment_action("StopDeployment", request, policy).await
    }

    async fn upgrade_deployment(
        &self,
        deployment_id: &str,
        details: &UpgradeDeploymentDetails,
        policy: &RetryPolicy,
    ) -> OciResult<String> {
        let request = ApiRequest::post(action_path(deployment_id, "upgrade")).json(details)?;
        self.deployment_action("UpgradeDeployment", request, policy).await
    }

    async fn change_deployment_compartment(
        &self,
        deployment_id: &str,
        details: &ChangeDeploymentCompartmentDetails,
        policy: &RetryPolicy,
    ) -> OciResult<String> {
        let request =
            ApiRequest::post(action_path(deployment_id, "changeCompartment")).json(details)?;
        self.deployment_action("ChangeDeploymentCompartment", request, policy).await
    }

    async fn list_deployment_versions(
        &self,
        request: &ListDeploymentVersionsRequest,
        policy: &RetryPolicy,
    ) -> OciResult<Vec<DeploymentVersionSummary>> {
        let api_request = ApiRequest::get("/deploymentVersions")
            .query("compartmentId", &request.compartment_id)
            .query_opt("deploymentId", request.deployment_id.as_ref())
            .query_opt("deploymentType", request.deployment_type.as_ref())
            .query_opt("sortOrder", request.sort_order.as_ref());
        self.list_all("ListDeploymentVersions", api_request, policy).await
    }
}

#[async_trait]
impl WorkRequestApi for GoldenGateClient {
    async fn get_work_request(
        &self,
        work_request_id: &str,
        policy: &RetryPolicy,
    ) -> OciResult<WorkRequest> {
        let request = ApiRequest::get(work_request_path(work_request_id));
        self.http
            .send("GetWorkRequest", &request, policy)
            .await?
            .decode("GetWorkRequest")
    }

    async fn list_work_request_errors(
        &self,
        work_request_id: &str,
        policy: &RetryPolicy,
    ) -> OciResult<Vec<WorkRequestError>> {
        let request = ApiRequest::get(format!("{}/errors", work_request_path(work_request_id)));
        self.list_all("ListWorkRequestErrors", request, policy).await
    }
}
