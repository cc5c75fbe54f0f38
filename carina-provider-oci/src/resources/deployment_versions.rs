//! golden_gate_deployment_versions data source
//!
//! Lists the OGG versions a deployment (or a new deployment of a given type)
//! can run, newest first.

use std::collections::HashMap;

use carina_core::resource::{Resource, Value};
use carina_core::schema::{AttributeSchema, AttributeType, ResourceSchema};
use chrono::SecondsFormat;

use super::{enum_ignore_case, ocid};
use crate::error::{OciError, OciResult};
use crate::golden_gate::DeploymentApi;
use crate::golden_gate::models::{
    DeploymentType, DeploymentVersionSummary, ListDeploymentVersionsRequest, SortOrder,
};
use crate::retry::RetryPolicy;

pub const DATA_SOURCE_TYPE: &str = "golden_gate_deployment_versions";

pub fn schema() -> ResourceSchema {
    let computed = |name: &str, attr_type: AttributeType| {
        AttributeSchema::new(name, attr_type).computed()
    };

    ResourceSchema::new(DATA_SOURCE_TYPE)
        .with_description("OGG versions available to GoldenGate deployments")
        .attribute(AttributeSchema::new("compartment_id", ocid()).required())
        .attribute(AttributeSchema::new("deployment_id", ocid()).optional())
        .attribute(
            AttributeSchema::new("deployment_type", enum_ignore_case(DeploymentType::VALUES))
                .optional(),
        )
        .attribute(computed(
            "deployment_version_collection",
            AttributeType::List(Box::new(AttributeType::Block(vec![computed(
                "items",
                AttributeType::List(Box::new(AttributeType::Block(vec![
                    computed("deployment_type", AttributeType::String),
                    computed("is_security_fix", AttributeType::Bool),
                    computed("ogg_version", AttributeType::String),
                    computed("release_type", AttributeType::String),
                    computed("time_released", AttributeType::String),
                    computed("time_support_end", AttributeType::String),
                ]))),
            )]))),
        ))
}

fn request_from(resource: &Resource) -> OciResult<ListDeploymentVersionsRequest> {
    let string = |name: &str| match resource.get(name) {
        None => Ok(None),
        Some(Value::String(s)) => Ok(Some(s.clone())),
        Some(other) => Err(OciError::invalid_attribute(
            name,
            format!("expected a string, got {:?}", other),
        )),
    };

    Ok(ListDeploymentVersionsRequest {
        compartment_id: string("compartment_id")?
            .ok_or_else(|| OciError::MissingAttribute("compartment_id".to_string()))?,
        deployment_id: string("deployment_id")?,
        deployment_type: string("deployment_type")?
            .map(|t| t.parse::<DeploymentType>())
            .transpose()?,
        sort_order: Some(SortOrder::Desc),
    })
}

fn version_value(version: &DeploymentVersionSummary) -> Value {
    let mut map = HashMap::new();
    let mut put = |key: &str, value: Option<Value>| {
        if let Some(value) = value {
            map.insert(key.to_string(), value);
        }
    };
    let text = |s: Option<String>| s.map(Value::String);

    put(
        "deployment_type",
        text(version.deployment_type.as_ref().map(|t| t.to_string())),
    );
    put("is_security_fix", version.is_security_fix.map(Value::Bool));
    put("ogg_version", text(version.ogg_version.clone()));
    put(
        "release_type",
        text(version.release_type.as_ref().map(|t| t.to_string())),
    );
    put(
        "time_released",
        text(
            version
                .time_released
                .map(|t| t.to_rfc3339_opts(SecondsFormat::Millis, true)),
        ),
    );
    put(
        "time_support_end",
        text(
            version
                .time_support_end
                .map(|t| t.to_rfc3339_opts(SecondsFormat::Millis, true)),
        ),
    );
    Value::Map(map)
}

/// Query the versions and return the data source attributes: the
/// configured arguments plus `deployment_version_collection`
pub async fn read<A>(
    api: &A,
    resource: &Resource,
    policy: &RetryPolicy,
) -> OciResult<HashMap<String, Value>>
where
    A: DeploymentApi + ?Sized,
{
    let request = request_from(resource)?;
    let versions = api.list_deployment_versions(&request, policy).await?;
    log::debug!(
        "{} deployment versions in {}",
        versions.len(),
        request.compartment_id
    );

    let mut attributes = resource.attributes.clone();
    let items = Value::List(versions.iter().map(version_value).collect());
    attributes.insert(
        "deployment_version_collection".to_string(),
        Value::List(vec![Value::Map(HashMap::from([(
            "items".to_string(),
            items,
        )]))]),
    );
    Ok(attributes)
}
