//! In-memory GoldenGate service used by unit tests
//!
//! Every call goes through the caller's [`RetryPolicy`], so injected failures
//! and unfinished work requests are retried the same way as against the real
//! service. Calls are recorded by operation name.

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::Utc;
use serde::Serialize;

use crate::client::{ApiResponse, ResponseHeaders};
use crate::error::{OciError, OciResult};
use crate::golden_gate::models::{
    ActionType, ChangeDeploymentCompartmentDetails, CreateDeploymentDetails, Deployment,
    DeploymentVersionSummary, LifecycleState, ListDeploymentVersionsRequest, OggDeployment,
    OperationStatus, UpdateDeploymentDetails, UpgradeDeploymentDetails, WorkRequest,
    WorkRequestError, WorkRequestResource,
};
use crate::golden_gate::{Accepted, DeploymentApi, WorkRequestApi};
use crate::retry::RetryPolicy;

pub(crate) const DEFAULT_OGG_VERSION: &str = "21.3.0.0.0";

#[derive(Default)]
pub(crate) struct FakeGoldenGate {
    inner: Mutex<Inner>,
}

#[derive(Default)]
struct Inner {
    deployments: HashMap<String, Deployment>,
    work_requests: HashMap<String, VecDeque<WorkRequest>>,
    work_request_errors: HashMap<String, Vec<WorkRequestError>>,
    failures: HashMap<String, VecDeque<(u16, String)>>,
    versions: Vec<DeploymentVersionSummary>,
    calls: Vec<String>,
    next_id: u32,
    /// Lifecycle state reported right after create
    created_state: Option<LifecycleState>,
}

pub(crate) fn fake_work_request(
    id: &str,
    status: OperationStatus,
    resources: Vec<WorkRequestResource>,
) -> WorkRequest {
    let finished = !matches!(
        status,
        OperationStatus::Accepted | OperationStatus::InProgress | OperationStatus::Canceling
    );
    WorkRequest {
        id: id.to_string(),
        operation_type: None,
        status,
        compartment_id: None,
        resources,
        percent_complete: Some(if finished { 100.0 } else { 50.0 }),
        time_accepted: Some(Utc::now()),
        time_started: Some(Utc::now()),
        time_finished: finished.then(Utc::now),
    }
}

pub(crate) fn affected(
    entity_type: &str,
    action: ActionType,
    identifier: &str,
) -> WorkRequestResource {
    WorkRequestResource {
        entity_type: entity_type.to_string(),
        action_type: action,
        identifier: identifier.to_string(),
        entity_uri: None,
    }
}

impl FakeGoldenGate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn calls(&self) -> Vec<String> {
        self.inner.lock().unwrap().calls.clone()
    }

    /// Recorded calls other than reads and work request polling
    pub fn mutations(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter(|c| !c.starts_with("Get") && !c.starts_with("List"))
            .collect()
    }

    pub fn count(&self, operation: &str) -> usize {
        self.calls().iter().filter(|c| *c == operation).count()
    }

    /// Successive GetWorkRequest responses; the last one repeats
    pub fn script_work_request(&self, responses: Vec<WorkRequest>) {
        let mut inner = self.inner.lock().unwrap();
        if let Some(first) = responses.first() {
            let id = first.id.clone();
            inner.work_requests.insert(id, responses.into());
        }
    }

    pub fn set_work_request_errors(&self, work_request_id: &str, messages: &[&str]) {
        let errors = messages
            .iter()
            .map(|m| WorkRequestError {
                code: Some("InternalError".to_string()),
                message: m.to_string(),
                timestamp: Some(Utc::now()),
            })
            .collect();
        self.inner
            .lock()
            .unwrap()
            .work_request_errors
            .insert(work_request_id.to_string(), errors);
    }

    /// Make the next call of `operation` fail with a service error
    pub fn fail_next(&self, operation: &str, status: u16, code: &str) {
        self.inner
            .lock()
            .unwrap()
            .failures
            .entry(operation.to_string())
            .or_default()
            .push_back((status, code.to_string()));
    }

    pub fn set_created_state(&self, state: LifecycleState) {
        self.inner.lock().unwrap().created_state = Some(state);
    }

    pub fn set_versions(&self, versions: Vec<DeploymentVersionSummary>) {
        self.inner.lock().unwrap().versions = versions;
    }

    pub fn insert_deployment(&self, deployment: Deployment) {
        self.inner
            .lock()
            .unwrap()
            .deployments
            .insert(deployment.id.clone(), deployment);
    }

    pub fn deployment(&self, id: &str) -> Option<Deployment> {
        self.inner.lock().unwrap().deployments.get(id).cloned()
    }

    async fn call<T, F>(
        &self,
        operation: &str,
        policy: &RetryPolicy,
        handle: F,
    ) -> OciResult<ApiResponse>
    where
        T: Serialize,
        F: Fn(&mut Inner) -> OciResult<(T, Option<String>)> + Send + Sync,
    {
        policy
            .execute(operation, || {
                let result = {
                    let mut inner = self.inner.lock().unwrap();
                    inner.calls.push(operation.to_string());
                    let injected = inner
                        .failures
                        .get_mut(operation)
                        .and_then(VecDeque::pop_front);
                    match injected {
                        Some((status, code)) => Err(OciError::Service {
                            status,
                            code,
                            message: format!("{} failed", operation),
                            opc_request_id: None,
                        }),
                        None => handle(&mut inner).map(|(body, work_request_id)| ApiResponse {
                            status: 200,
                            headers: ResponseHeaders {
                                opc_work_request_id: work_request_id,
                                ..Default::default()
                            },
                            body: serde_json::to_value(body).unwrap(),
                        }),
                    }
                };
                async move { result }
            })
            .await
    }
}

fn not_found(id: &str) -> OciError {
    OciError::Service {
        status: 404,
        code: "NotAuthorizedOrNotFound".to_string(),
        message: format!("deployment {} not found", id),
        opc_request_id: None,
    }
}

impl Inner {
    /// Record a work request that already succeeded
    fn accept(&mut self, action: ActionType, deployment_id: &str) -> String {
        self.next_id += 1;
        let id = format!("ocid1.goldengateworkrequest.oc1..wr{}", self.next_id);
        let wr = fake_work_request(
            &id,
            OperationStatus::Succeeded,
            vec![affected("GoldenGateDeployment", action, deployment_id)],
        );
        self.work_requests.insert(id.clone(), VecDeque::from([wr]));
        id
    }

    fn deployment_mut(&mut self, id: &str) -> OciResult<&mut Deployment> {
        self.deployments.get_mut(id).ok_or_else(|| not_found(id))
    }

    fn set_state(&mut self, id: &str, state: LifecycleState) -> OciResult<String> {
        self.deployment_mut(id)?.lifecycle_state = Some(state);
        Ok(self.accept(ActionType::Updated, id))
    }
}

#[async_trait]
impl DeploymentApi for FakeGoldenGate {
    async fn create_deployment(
        &self,
        details: &CreateDeploymentDetails,
        policy: &RetryPolicy,
    ) -> OciResult<Accepted<Deployment>> {
        let response = self
            .call("CreateDeployment", policy, |inner| {
                inner.next_id += 1;
                let id = format!("ocid1.goldengatedeployment.oc1..fake{}", inner.next_id);
                let ogg_data = details.ogg_data.as_ref().map(|ogg| OggDeployment {
                    deployment_name: Some(ogg.deployment_name.clone()),
                    admin_username: Some(ogg.admin_username.clone()),
                    ogg_version: Some(
                        ogg.ogg_version
                            .clone()
                            .unwrap_or_else(|| DEFAULT_OGG_VERSION.to_string()),
                    ),
                    certificate: ogg.certificate.clone(),
                });
                let deployment = Deployment {
                    id: id.clone(),
                    display_name: Some(details.display_name.clone()),
                    description: details.description.clone(),
                    compartment_id: Some(details.compartment_id.clone()),
                    deployment_backup_id: details.deployment_backup_id.clone(),
                    time_created: Some(Utc::now()),
                    time_updated: Some(Utc::now()),
                    lifecycle_state: Some(
                        inner.created_state.clone().unwrap_or(LifecycleState::Active),
                    ),
                    freeform_tags: details.freeform_tags.clone(),
                    defined_tags: details.defined_tags.clone(),
                    is_healthy: Some(true),
                    subnet_id: Some(details.subnet_id.clone()),
                    fqdn: details.fqdn.clone(),
                    license_model: Some(details.license_model.clone()),
                    cpu_core_count: Some(details.cpu_core_count),
                    is_auto_scaling_enabled: Some(details.is_auto_scaling_enabled),
                    nsg_ids: details.nsg_ids.clone(),
                    is_public: details.is_public,
                    deployment_type: Some(details.deployment_type.clone()),
                    ogg_data,
                    ..Default::default()
                };
                inner.deployments.insert(id.clone(), deployment.clone());
                let work_request_id = inner.accept(ActionType::Created, &id);
                Ok((deployment, Some(work_request_id)))
            })
            .await?;
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
        self.call("GetDeployment", policy, |inner| {
            Ok((inner.deployment_mut(deployment_id)?.clone(), None))
        })
        .await?
        .decode("GetDeployment")
    }

    async fn update_deployment(
        &self,
        deployment_id: &str,
        details: &UpdateDeploymentDetails,
        policy: &RetryPolicy,
    ) -> OciResult<String> {
        self.call("UpdateDeployment", policy, |inner| {
            let d = inner.deployment_mut(deployment_id)?;
            if let Some(v) = &details.display_name {
                d.display_name = Some(v.clone());
            }
            if let Some(v) = &details.description {
                d.description = Some(v.clone());
            }
            if let Some(v) = details.cpu_core_count {
                d.cpu_core_count = Some(v);
            }
            if let Some(v) = details.is_auto_scaling_enabled {
                d.is_auto_scaling_enabled = Some(v);
            }
            if let Some(v) = &details.license_model {
                d.license_model = Some(v.clone());
            }
            if let Some(v) = &details.freeform_tags {
                d.freeform_tags = Some(v.clone());
            }
            if let Some(v) = &details.defined_tags {
                d.defined_tags = Some(v.clone());
            }
            if let Some(v) = &details.subnet_id {
                d.subnet_id = Some(v.clone());
            }
            if let Some(v) = &details.nsg_ids {
                d.nsg_ids = Some(v.clone());
            }
            if let Some(v) = details.is_public {
                d.is_public = Some(v);
            }
            if let Some(v) = &details.fqdn {
                d.fqdn = Some(v.clone());
            }
            Ok(((), Some(inner.accept(ActionType::Updated, deployment_id))))
        })
        .await?
        .work_request_id("UpdateDeployment")
    }

    async fn delete_deployment(
        &self,
        deployment_id: &str,
        policy: &RetryPolicy,
    ) -> OciResult<String> {
        self.call("DeleteDeployment", policy, |inner| {
            inner
                .deployments
                .remove(deployment_id)
                .ok_or_else(|| not_found(deployment_id))?;
            Ok(((), Some(inner.accept(ActionType::Deleted, deployment_id))))
        })
        .await?
        .work_request_id("DeleteDeployment")
    }

    async fn start_deployment(
        &self,
        deployment_id: &str,
        policy: &RetryPolicy,
    ) -> OciResult<String> {
        self.call("StartDeployment", policy, |inner| {
            Ok(((), Some(inner.set_state(deployment_id, LifecycleState::Active)?)))
        })
        .await?
        .work_request_id("StartDeployment")
    }

    async fn stop_deployment(
        &self,
        deployment_id: &str,
        policy: &RetryPolicy,
    ) -> OciResult<String> {
        self.call("StopDeployment", policy, |inner| {
            Ok(((), Some(inner.set_state(deployment_id, LifecycleState::Inactive)?)))
        })
        .await?
        .work_request_id("StopDeployment")
    }

    async fn upgrade_deployment(
        &self,
        deployment_id: &str,
        details: &UpgradeDeploymentDetails,
        policy: &RetryPolicy,
    ) -> OciResult<String> {
        self.call("UpgradeDeployment", policy, |inner| {
            let d = inner.deployment_mut(deployment_id)?;
            if let UpgradeDeploymentDetails::SpecificRelease { ogg_version } = details {
                d.ogg_data.get_or_insert_with(Default::default).ogg_version =
                    Some(ogg_version.clone());
            }
            Ok(((), Some(inner.accept(ActionType::Updated, deployment_id))))
        })
        .await?
        .work_request_id("UpgradeDeployment")
    }

    async fn change_deployment_compartment(
        &self,
        deployment_id: &str,
        details: &ChangeDeploymentCompartmentDetails,
        policy: &RetryPolicy,
    ) -> OciResult<String> {
        self.call("ChangeDeploymentCompartment", policy, |inner| {
            inner.deployment_mut(deployment_id)?.compartment_id =
                Some(details.compartment_id.clone());
            Ok(((), Some(inner.accept(ActionType::Updated, deployment_id))))
        })
        .await?
        .work_request_id("ChangeDeploymentCompartment")
    }

    async fn list_deployment_versions(
        &self,
        _request: &ListDeploymentVersionsRequest,
        policy: &RetryPolicy,
    ) -> OciResult<Vec<DeploymentVersionSummary>> {
        self.call("ListDeploymentVersions", policy, |inner| {
            Ok((inner.versions.clone(), None))
        })
        .await?
        .decode("ListDeploymentVersions")
    }
}

#[async_trait]
impl WorkRequestApi for FakeGoldenGate {
    async fn get_work_request(
        &self,
        work_request_id: &str,
        policy: &RetryPolicy,
    ) -> OciResult<WorkRequest> {
        self.call("GetWorkRequest", policy, |inner| {
            let script = inner
                .work_requests
                .get_mut(work_request_id)
                .ok_or_else(|| not_found(work_request_id))?;
            let current = if script.len() > 1 {
                script.pop_front()
            } else {
                script.front().cloned()
            };
            current
                .map(|wr| (wr, None))
                .ok_or_else(|| not_found(work_request_id))
        })
        .await?
        .decode("GetWorkRequest")
    }

    async fn list_work_request_errors(
        &self,
        work_request_id: &str,
        policy: &RetryPolicy,
    ) -> OciResult<Vec<WorkRequestError>> {
        self.call("ListWorkRequestErrors", policy, |inner| {
            Ok((
                inner
                    .work_request_errors
                    .get(work_request_id)
                    .cloned()
                    .unwrap_or_default(),
                None,
            ))
        })
        .await?
        .decode("ListWorkRequestErrors")
    }
}
