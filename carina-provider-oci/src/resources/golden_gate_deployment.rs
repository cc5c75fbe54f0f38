//! golden_gate_deployment resource
//!
//! A GoldenGate deployment runs the OGG software in a customer subnet. Every
//! mutating call is asynchronous: the service answers with a work request
//! that is polled to completion before the deployment is read back.
//!
//! Besides its fields, a deployment has a running state (`ACTIVE` or
//! `INACTIVE`) and a software version, which change through the start, stop
//! and upgrade actions. [`plan_update`] decides in which order those actions
//! and the field update run.

use std::collections::HashMap;
use std::fmt;
use std::time::Duration;

use carina_core::differ::Changes;
use carina_core::resource::Value;
use carina_core::schema::{
    AttributeSchema, AttributeType, DiffSuppress, ResourceSchema, ResourceTimeouts, types,
};
use carina_core::waiter::StateChangeConf;
use chrono::{DateTime, SecondsFormat, Utc};

use super::{enum_ignore_case, ocid};
use crate::config::RetryConfig;
use crate::error::{OciError, OciResult};
use crate::golden_gate::GoldenGateApi;
use crate::golden_gate::models::{
    ActionType, ApiEnum, ChangeDeploymentCompartmentDetails, CreateDeploymentDetails,
    CreateMaintenanceWindowDetails, CreateOggDeploymentDetails, Day, Deployment, DeploymentType,
    LicenseModel, LifecycleState, NamespacedTags, UpdateDeploymentDetails,
    UpdateMaintenanceWindowDetails, UpdateOggDeploymentDetails, UpgradeDeploymentDetails,
};
use crate::retry::RetryPolicy;
use crate::tags::{defined_tags_diff_suppress, defined_tags_to_map, map_to_defined_tags};
use crate::work_request::{WaitSettings, wait_for_work_request};

pub const RESOURCE_TYPE: &str = "golden_gate_deployment";

/// Entity type filter matched against work request resources
pub const ENTITY_TYPE: &str = "deployment";

pub fn schema() -> ResourceSchema {
    let computed = |name: &str, attr_type: AttributeType| {
        AttributeSchema::new(name, attr_type).computed()
    };
    let optional = |name: &str, attr_type: AttributeType| {
        AttributeSchema::new(name, attr_type).optional().computed()
    };

    ResourceSchema::new(RESOURCE_TYPE)
        .with_description("Oracle GoldenGate deployment")
        .with_timeouts(ResourceTimeouts {
            create: Duration::from_secs(90 * 60),
            update: Duration::from_secs(60 * 60),
            delete: Duration::from_secs(30 * 60),
        })
        // Required
        .attribute(AttributeSchema::new("compartment_id", ocid()).required())
        .attribute(AttributeSchema::new("cpu_core_count", types::positive_int()).required())
        .attribute(
            AttributeSchema::new("deployment_type", enum_ignore_case(DeploymentType::VALUES))
                .required()
                .force_new(),
        )
        .attribute(AttributeSchema::new("display_name", AttributeType::String).required())
        .attribute(AttributeSchema::new("is_auto_scaling_enabled", AttributeType::Bool).required())
        .attribute(
            AttributeSchema::new("license_model", enum_ignore_case(LicenseModel::VALUES))
                .required(),
        )
        .attribute(AttributeSchema::new("subnet_id", ocid()).required())
        // Optional
        .attribute(
            optional("defined_tags", types::string_map())
                .with_diff_suppress(DiffSuppress::Custom(defined_tags_diff_suppress))
                .with_description("Defined tags as {\"namespace.key\" = \"value\"}"),
        )
        .attribute(optional("deployment_backup_id", ocid()).force_new())
        .attribute(optional("description", AttributeType::String))
        .attribute(optional("fqdn", AttributeType::String))
        .attribute(optional("freeform_tags", types::string_map()))
        .attribute(optional("is_public", AttributeType::Bool))
        .attribute(
            optional(
                "maintenance_window",
                AttributeType::List(Box::new(AttributeType::Block(vec![
                    AttributeSchema::new("day", enum_ignore_case(Day::VALUES)).required(),
                    AttributeSchema::new("start_hour", types::hour_of_day()).required(),
                ]))),
            )
            .with_items(1, 1),
        )
        .attribute(optional("nsg_ids", AttributeType::Set(Box::new(ocid()))))
        .attribute(
            optional(
                "ogg_data",
                AttributeType::List(Box::new(AttributeType::Block(vec![
                    AttributeSchema::new("admin_password", AttributeType::String)
                        .required()
                        .sensitive(),
                    AttributeSchema::new("admin_username", AttributeType::String).required(),
                    AttributeSchema::new("deployment_name", AttributeType::String)
                        .required()
                        .force_new(),
                    optional("certificate", AttributeType::String),
                    optional("key", AttributeType::String).sensitive(),
                    optional("ogg_version", AttributeType::String),
                ]))),
            )
            .with_items(1, 1),
        )
        .attribute(
            optional("state", enum_ignore_case(&["ACTIVE", "INACTIVE"]))
                .with_diff_suppress(DiffSuppress::EqualIgnoreCase)
                .with_description("Requested running state"),
        )
        // Computed
        .attribute(computed(
            "deployment_diagnostic_data",
            AttributeType::List(Box::new(AttributeType::Block(vec![
                computed("bucket", AttributeType::String),
                computed("diagnostic_state", AttributeType::String),
                computed("namespace", AttributeType::String),
                computed("object", AttributeType::String),
                computed("time_diagnostic_end", AttributeType::String),
                computed("time_diagnostic_start", AttributeType::String),
            ]))),
        ))
        .attribute(computed("deployment_url", AttributeType::String))
        .attribute(computed("is_healthy", AttributeType::Bool))
        .attribute(computed("is_latest_version", AttributeType::Bool))
        .attribute(computed("is_storage_utilization_limit_exceeded", AttributeType::Bool))
        .attribute(computed("lifecycle_details", AttributeType::String))
        .attribute(computed("lifecycle_sub_state", AttributeType::String))
        .attribute(computed("next_maintenance_action_type", AttributeType::String))
        .attribute(computed("next_maintenance_description", AttributeType::String))
        .attribute(computed("private_ip_address", AttributeType::String))
        .attribute(computed("public_ip_address", AttributeType::String))
        .attribute(computed("storage_utilization_in_bytes", AttributeType::String))
        .attribute(computed("system_tags", types::string_map()))
        .attribute(computed("time_created", AttributeType::String))
        .attribute(computed("time_of_next_maintenance", AttributeType::String))
        .attribute(computed("time_updated", AttributeType::String))
        .attribute(computed("time_upgrade_required", AttributeType::String))
}

// =============================================================================
// Configuration
// =============================================================================

#[derive(Debug, Clone, Default, PartialEq)]
pub struct MaintenanceWindowConfig {
    pub day: Option<Day>,
    pub start_hour: Option<i64>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct OggDataConfig {
    pub admin_password: Option<String>,
    pub admin_username: Option<String>,
    pub deployment_name: Option<String>,
    pub certificate: Option<String>,
    pub key: Option<String>,
    pub ogg_version: Option<String>,
}

/// Settable attributes of a deployment, typed
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DeploymentConfig {
    pub compartment_id: Option<String>,
    pub cpu_core_count: Option<i64>,
    pub deployment_type: Option<DeploymentType>,
    pub display_name: Option<String>,
    pub is_auto_scaling_enabled: Option<bool>,
    pub license_model: Option<LicenseModel>,
    pub subnet_id: Option<String>,
    pub defined_tags: Option<NamespacedTags>,
    pub deployment_backup_id: Option<String>,
    pub description: Option<String>,
    pub fqdn: Option<String>,
    pub freeform_tags: Option<HashMap<String, String>>,
    pub is_public: Option<bool>,
    pub maintenance_window: Option<MaintenanceWindowConfig>,
    pub nsg_ids: Option<Vec<String>>,
    pub ogg_data: Option<OggDataConfig>,
    pub state: Option<LifecycleState>,
}

/// Typed reads over an attribute lookup
struct Attributes<F> {
    get: F,
    /// Keep enum values outside the table as `Unknown` instead of failing
    lenient: bool,
}

impl<'v, F> Attributes<F>
where
    F: Fn(&str) -> Option<&'v Value>,
{
    fn string(&self, path: &str) -> OciResult<Option<String>> {
        match (self.get)(path) {
            None => Ok(None),
            Some(Value::String(s)) => Ok(Some(s.clone())),
            Some(other) => Err(mismatch(path, "a string", other)),
        }
    }

    fn int(&self, path: &str) -> OciResult<Option<i64>> {
        match (self.get)(path) {
            None => Ok(None),
            Some(Value::Int(n)) => Ok(Some(*n)),
            Some(other) => Err(mismatch(path, "an integer", other)),
        }
    }

    fn bool(&self, path: &str) -> OciResult<Option<bool>> {
        match (self.get)(path) {
            None => Ok(None),
            Some(Value::Bool(b)) => Ok(Some(*b)),
            Some(other) => Err(mismatch(path, "a boolean", other)),
        }
    }

    fn parsed<T: ApiEnum>(&self, path: &str) -> OciResult<Option<T>> {
        let Some(s) = self.string(path)? else {
            return Ok(None);
        };
        if self.lenient {
            return Ok(Some(T::parse_or_unknown(&s)));
        }
        Ok(Some(s.parse::<T>()?))
    }

    fn strings(&self, path: &str) -> OciResult<Option<Vec<String>>> {
        match (self.get)(path) {
            None => Ok(None),
            Some(Value::List(items)) => items
                .iter()
                .map(|item| match item {
                    Value::String(s) => Ok(s.clone()),
                    other => Err(mismatch(path, "a list of strings", other)),
                })
                .collect::<OciResult<Vec<_>>>()
                .map(Some),
            Some(other) => Err(mismatch(path, "a list of strings", other)),
        }
    }

    fn map(&self, path: &str) -> OciResult<Option<&'v HashMap<String, Value>>> {
        match (self.get)(path) {
            None => Ok(None),
            Some(Value::Map(map)) => Ok(Some(map)),
            Some(other) => Err(mismatch(path, "a map", other)),
        }
    }

    fn string_map(&self, path: &str) -> OciResult<Option<HashMap<String, String>>> {
        let Some(map) = self.map(path)? else {
            return Ok(None);
        };
        map.iter()
            .map(|(k, v)| match v {
                Value::String(s) => Ok((k.clone(), s.clone())),
                other => Err(mismatch(path, "a map of strings", other)),
            })
            .collect::<OciResult<HashMap<_, _>>>()
            .map(Some)
    }

    /// Whether a single-item block is present
    fn has_block(&self, path: &str) -> bool {
        matches!((self.get)(path), Some(Value::List(items)) if !items.is_empty())
    }
}

fn mismatch(path: &str, expected: &str, got: &Value) -> OciError {
    OciError::invalid_attribute(path, format!("expected {}, got {:?}", expected, got))
}

fn required<T: Clone>(value: &Option<T>, name: &str) -> OciResult<T> {
    value
        .clone()
        .ok_or_else(|| OciError::MissingAttribute(name.to_string()))
}

impl DeploymentConfig {
    /// Read the configuration through `get`, e.g. `|path| resource.get(path)`.
    /// Enum values must be in the API's table.
    pub fn from_lookup<'v, F>(get: F) -> OciResult<Self>
    where
        F: Fn(&str) -> Option<&'v Value>,
    {
        Self::read(Attributes { get, lenient: false })
    }

    /// Configuration an update moves to. Attributes left out fall back to
    /// the stored state, whose enum values may be ones the service added
    /// after this table was written; those are kept as `Unknown`.
    pub fn from_changes(changes: &Changes<'_>) -> OciResult<Self> {
        Self::read(Attributes {
            get: |path: &str| changes.get(path),
            lenient: true,
        })
    }

    fn read<'v, F>(attrs: Attributes<F>) -> OciResult<Self>
    where
        F: Fn(&str) -> Option<&'v Value>,
    {

        let maintenance_window = if attrs.has_block("maintenance_window") {
            Some(MaintenanceWindowConfig {
                day: attrs.parsed("maintenance_window.0.day")?,
                start_hour: attrs.int("maintenance_window.0.start_hour")?,
            })
        } else {
            None
        };

        let ogg_data = if attrs.has_block("ogg_data") {
            Some(OggDataConfig {
                admin_password: attrs.string("ogg_data.0.admin_password")?,
                admin_username: attrs.string("ogg_data.0.admin_username")?,
                deployment_name: attrs.string("ogg_data.0.deployment_name")?,
                certificate: attrs.string("ogg_data.0.certificate")?,
                key: attrs.string("ogg_data.0.key")?,
                ogg_version: attrs.string("ogg_data.0.ogg_version")?,
            })
        } else {
            None
        };

        Ok(Self {
            compartment_id: attrs.string("compartment_id")?,
            cpu_core_count: attrs.int("cpu_core_count")?,
            deployment_type: attrs.parsed("deployment_type")?,
            display_name: attrs.string("display_name")?,
            is_auto_scaling_enabled: attrs.bool("is_auto_scaling_enabled")?,
            license_model: attrs.parsed("license_model")?,
            subnet_id: attrs.string("subnet_id")?,
            defined_tags: attrs
                .map("defined_tags")?
                .map(map_to_defined_tags)
                .transpose()?,
            deployment_backup_id: attrs.string("deployment_backup_id")?,
            description: attrs.string("description")?,
            fqdn: attrs.string("fqdn")?,
            freeform_tags: attrs.string_map("freeform_tags")?,
            is_public: attrs.bool("is_public")?,
            maintenance_window,
            nsg_ids: attrs.strings("nsg_ids")?,
            ogg_data,
            state: attrs.parsed("state")?,
        })
    }

    pub fn create_details(&self) -> OciResult<CreateDeploymentDetails> {
        let ogg_data = self
            .ogg_data
            .as_ref()
            .map(|ogg| -> OciResult<_> {
                Ok(CreateOggDeploymentDetails {
                    deployment_name: required(&ogg.deployment_name, "ogg_data.0.deployment_name")?,
                    admin_username: required(&ogg.admin_username, "ogg_data.0.admin_username")?,
                    admin_password: required(&ogg.admin_password, "ogg_data.0.admin_password")?,
                    certificate: ogg.certificate.clone(),
                    key: ogg.key.clone(),
                    ogg_version: ogg.ogg_version.clone(),
                })
            })
            .transpose()?;

        let maintenance_window = self
            .maintenance_window
            .as_ref()
            .map(|window| -> OciResult<_> {
                Ok(CreateMaintenanceWindowDetails {
                    day: required(&window.day, "maintenance_window.0.day")?,
                    start_hour: required(&window.start_hour, "maintenance_window.0.start_hour")?,
                })
            })
            .transpose()?;

        Ok(CreateDeploymentDetails {
            display_name: required(&self.display_name, "display_name")?,
            compartment_id: required(&self.compartment_id, "compartment_id")?,
            license_model: required(&self.license_model, "license_model")?,
            subnet_id: required(&self.subnet_id, "subnet_id")?,
            cpu_core_count: required(&self.cpu_core_count, "cpu_core_count")?,
            is_auto_scaling_enabled: required(
                &self.is_auto_scaling_enabled,
                "is_auto_scaling_enabled",
            )?,
            deployment_type: required(&self.deployment_type, "deployment_type")?,
            description: self.description.clone(),
            deployment_backup_id: self.deployment_backup_id.clone(),
            freeform_tags: self.freeform_tags.clone(),
            defined_tags: self.defined_tags.clone(),
            fqdn: self.fqdn.clone(),
            nsg_ids: self.nsg_ids.clone().filter(|ids| !ids.is_empty()),
            is_public: self.is_public,
            ogg_data,
            maintenance_window,
        })
    }

    /// Update body with every present field. `nsg_ids` is sent when non-empty,
    /// or when it changed so that clearing it reaches the service.
    pub fn update_details(&self, nsg_ids_changed: bool) -> UpdateDeploymentDetails {
        UpdateDeploymentDetails {
            display_name: self.display_name.clone(),
            license_model: self.license_model.clone(),
            description: self.description.clone(),
            freeform_tags: self.freeform_tags.clone(),
            defined_tags: self.defined_tags.clone(),
            fqdn: self.fqdn.clone(),
            subnet_id: self.subnet_id.clone(),
            nsg_ids: self
                .nsg_ids
                .clone()
                .filter(|ids| !ids.is_empty() || nsg_ids_changed),
            is_public: self.is_public,
            cpu_core_count: self.cpu_core_count,
            is_auto_scaling_enabled: self.is_auto_scaling_enabled,
            ogg_data: self.ogg_data.as_ref().map(|ogg| UpdateOggDeploymentDetails {
                admin_username: ogg.admin_username.clone(),
                admin_password: ogg.admin_password.clone(),
                certificate: ogg.certificate.clone(),
                key: ogg.key.clone(),
            }),
            maintenance_window: self.maintenance_window.as_ref().map(|window| {
                UpdateMaintenanceWindowDetails {
                    day: window.day.clone(),
                    start_hour: window.start_hour,
                }
            }),
        }
    }
}

// =============================================================================
// State mapping
// =============================================================================

fn string(value: &Option<String>) -> Option<Value> {
    value.clone().map(Value::String)
}

fn text<T: fmt::Display>(value: &Option<T>) -> Option<Value> {
    value.as_ref().map(|v| Value::String(v.to_string()))
}

fn time(value: &Option<DateTime<Utc>>) -> Option<Value> {
    value.map(|t| Value::String(t.to_rfc3339_opts(SecondsFormat::Millis, true)))
}

fn block(entries: Vec<(&str, Option<Value>)>) -> Value {
    let map = entries
        .into_iter()
        .filter_map(|(key, value)| value.map(|v| (key.to_string(), v)))
        .collect();
    Value::List(vec![Value::Map(map)])
}

/// Attributes of a deployment as stored in state.
///
/// The service never returns `admin_password` or `key`; they are carried
/// over from `config`.
pub fn deployment_attributes(
    deployment: &Deployment,
    config: &DeploymentConfig,
) -> HashMap<String, Value> {
    let d = deployment;
    let entries: Vec<(&str, Option<Value>)> = vec![
        ("compartment_id", string(&d.compartment_id)),
        ("cpu_core_count", d.cpu_core_count.map(Value::Int)),
        (
            "defined_tags",
            d.defined_tags
                .as_ref()
                .map(|tags| Value::Map(defined_tags_to_map(tags))),
        ),
        ("deployment_backup_id", string(&d.deployment_backup_id)),
        (
            "deployment_diagnostic_data",
            d.deployment_diagnostic_data.as_ref().map(|diag| {
                block(vec![
                    ("bucket", string(&diag.bucket_name)),
                    ("diagnostic_state", text(&diag.diagnostic_state)),
                    ("namespace", string(&diag.namespace_name)),
                    ("object", string(&diag.object_name)),
                    ("time_diagnostic_end", time(&diag.time_diagnostic_end)),
                    ("time_diagnostic_start", time(&diag.time_diagnostic_start)),
                ])
            }),
        ),
        ("deployment_type", text(&d.deployment_type)),
        ("deployment_url", string(&d.deployment_url)),
        ("description", string(&d.description)),
        ("display_name", string(&d.display_name)),
        ("fqdn", string(&d.fqdn)),
        (
            "freeform_tags",
            d.freeform_tags.as_ref().map(|tags| {
                Value::Map(
                    tags.iter()
                        .map(|(k, v)| (k.clone(), Value::String(v.clone())))
                        .collect(),
                )
            }),
        ),
        ("is_auto_scaling_enabled", d.is_auto_scaling_enabled.map(Value::Bool)),
        ("is_healthy", d.is_healthy.map(Value::Bool)),
        ("is_latest_version", d.is_latest_version.map(Value::Bool)),
        ("is_public", d.is_public.map(Value::Bool)),
        (
            "is_storage_utilization_limit_exceeded",
            d.is_storage_utilization_limit_exceeded.map(Value::Bool),
        ),
        ("license_model", text(&d.license_model)),
        ("lifecycle_details", string(&d.lifecycle_details)),
        ("lifecycle_sub_state", text(&d.lifecycle_sub_state)),
        (
            "maintenance_window",
            d.maintenance_window.as_ref().map(|window| {
                block(vec![
                    ("day", text(&window.day)),
                    ("start_hour", window.start_hour.map(Value::Int)),
                ])
            }),
        ),
        ("next_maintenance_action_type", text(&d.next_maintenance_action_type)),
        ("next_maintenance_description", string(&d.next_maintenance_description)),
        (
            "nsg_ids",
            Some(Value::List(
                d.nsg_ids
                    .iter()
                    .flatten()
                    .map(|id| Value::String(id.clone()))
                    .collect(),
            )),
        ),
        (
            "ogg_data",
            d.ogg_data.as_ref().map(|ogg| {
                let configured = config.ogg_data.as_ref();
                block(vec![
                    (
                        "admin_password",
                        configured.and_then(|c| string(&c.admin_password)),
                    ),
                    ("admin_username", string(&ogg.admin_username)),
                    ("certificate", string(&ogg.certificate)),
                    ("deployment_name", string(&ogg.deployment_name)),
                    ("key", configured.and_then(|c| string(&c.key))),
                    ("ogg_version", string(&ogg.ogg_version)),
                ])
            }),
        ),
        ("private_ip_address", string(&d.private_ip_address)),
        ("public_ip_address", string(&d.public_ip_address)),
        ("state", text(&d.lifecycle_state)),
        ("storage_utilization_in_bytes", text(&d.storage_utilization_in_bytes)),
        ("subnet_id", string(&d.subnet_id)),
        (
            "system_tags",
            d.system_tags
                .as_ref()
                .map(|tags| Value::Map(defined_tags_to_map(tags))),
        ),
        ("time_created", time(&d.time_created)),
        ("time_of_next_maintenance", time(&d.time_of_next_maintenance)),
        ("time_updated", time(&d.time_updated)),
        ("time_upgrade_required", time(&d.time_upgrade_required)),
    ];

    entries
        .into_iter()
        .filter_map(|(key, value)| value.map(|v| (key.to_string(), v)))
        .collect()
}

// =============================================================================
// Update ordering
// =============================================================================

/// One step of an update
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpdateStep {
    /// Upgrade the OGG software to the given version
    Upgrade(String),
    Start,
    Stop,
    /// Move compartments if needed, then update the fields
    Update,
}

impl fmt::Display for UpdateStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UpdateStep::Upgrade(version) => write!(f, "upgrade to {}", version),
            UpdateStep::Start => write!(f, "start"),
            UpdateStep::Stop => write!(f, "stop"),
            UpdateStep::Update => write!(f, "update"),
        }
    }
}

/// Stored and requested running state, if the requested one differs
fn state_transition(changes: &Changes<'_>) -> Option<(Option<LifecycleState>, LifecycleState)> {
    let (old, new) = changes.get_change("state");
    let parse = |value: Option<&Value>| {
        value
            .and_then(Value::as_str)
            .and_then(LifecycleState::parse_ignore_case)
    };
    let (old, new) = (parse(old), parse(new)?);
    (old.as_ref() != Some(&new)).then_some((old, new))
}

/// Requested OGG version, if it changed to a non-empty value
fn upgrade_target(changes: &Changes<'_>) -> Option<String> {
    let (old, new) = changes.get_change("ogg_data.0.ogg_version");
    let new = new.and_then(Value::as_str).filter(|v| !v.is_empty())?;
    (old.and_then(Value::as_str) != Some(new)).then(|| new.to_string())
}

/// Order the actions of an update.
///
/// The service accepts a field update only on a running deployment, and an
/// upgrade runs faster on a stopped one. Stopping therefore updates first
/// and upgrades last; starting upgrades first and updates last. From FAILED
/// or NEEDS_ATTENTION no start is issued.
pub fn plan_update(changes: &Changes<'_>) -> Vec<UpdateStep> {
    let upgrade = upgrade_target(changes).map(UpdateStep::Upgrade);

    let mut steps = Vec::new();
    match state_transition(changes) {
        Some((_, LifecycleState::Inactive)) => {
            steps.push(UpdateStep::Update);
            steps.push(UpdateStep::Stop);
            steps.extend(upgrade);
        }
        Some((old, LifecycleState::Active))
            if !matches!(
                old,
                Some(LifecycleState::Failed | LifecycleState::NeedsAttention)
            ) =>
        {
            steps.extend(upgrade);
            steps.push(UpdateStep::Start);
            steps.push(UpdateStep::Update);
        }
        _ => {
            steps.extend(upgrade);
            steps.push(UpdateStep::Update);
        }
    }
    steps
}

// =============================================================================
// Operations
// =============================================================================

/// Deployment operations against the GoldenGate API
pub struct DeploymentAdapter<'a> {
    api: &'a dyn GoldenGateApi,
    retry: &'a RetryConfig,
    poll_interval: Option<Duration>,
    timeouts: ResourceTimeouts,
}

impl<'a> DeploymentAdapter<'a> {
    pub fn new(
        api: &'a dyn GoldenGateApi,
        retry: &'a RetryConfig,
        poll_interval: Option<Duration>,
        timeouts: ResourceTimeouts,
    ) -> Self {
        Self {
            api,
            retry,
            poll_interval,
            timeouts,
        }
    }

    fn policy(&self) -> RetryPolicy {
        self.retry.policy(false)
    }

    async fn await_work_request(
        &self,
        work_request_id: &str,
        action: ActionType,
        timeout: Duration,
        policy: &RetryPolicy,
    ) -> OciResult<String> {
        let settings = WaitSettings::new(timeout).with_poll_interval(self.poll_interval);
        wait_for_work_request(
            self.api,
            work_request_id,
            ENTITY_TYPE,
            action,
            settings,
            policy,
        )
        .await
    }

    fn state_change(
        &self,
        pending: &[LifecycleState],
        target: &[LifecycleState],
        timeout: Duration,
    ) -> StateChangeConf {
        let conf = StateChangeConf::new(
            pending.iter().map(|s| s.to_string()),
            target.iter().map(|s| s.to_string()),
            timeout,
        );
        match self.poll_interval {
            Some(interval) => conf.with_poll_interval(interval),
            None => conf,
        }
    }

    pub async fn create(&self, config: &DeploymentConfig) -> OciResult<Deployment> {
        let details = config.create_details()?;
        let policy = &self.policy();

        let accepted = self.api.create_deployment(&details, policy).await?;
        log::info!(
            "creating deployment {} (work request {})",
            accepted.value.id,
            accepted.work_request_id
        );
        let id = self
            .await_work_request(
                &accepted.work_request_id,
                ActionType::Created,
                self.timeouts.create,
                policy,
            )
            .await?;

        let id = id.as_str();
        let deployment = self
            .state_change(
                &[LifecycleState::Creating, LifecycleState::InProgress],
                &[
                    LifecycleState::Active,
                    LifecycleState::NeedsAttention,
                    LifecycleState::Succeeded,
                ],
                self.timeouts.create,
            )
            .wait_for_state(|| async move {
                let deployment = self.api.get_deployment(id, policy).await?;
                let state = deployment
                    .lifecycle_state
                    .as_ref()
                    .map(|s| s.to_string())
                    .unwrap_or_default();
                Ok::<_, OciError>((deployment, state))
            })
            .await?;

        // The service always creates running deployments
        if config.state == Some(LifecycleState::Inactive) {
            return self.stop(id).await;
        }
        Ok(deployment)
    }

    /// Current deployment, or `None` when it no longer exists
    pub async fn read(&self, id: &str) -> OciResult<Option<Deployment>> {
        match self.api.get_deployment(id, &self.retry.policy(true)).await {
            Ok(d) if d.lifecycle_state == Some(LifecycleState::Deleted) => Ok(None),
            Ok(d) => Ok(Some(d)),
            Err(e) if e.is_not_found() => Ok(None),
            Err(e) => Err(e),
        }
    }

    pub async fn update(&self, id: &str, changes: &Changes<'_>) -> OciResult<Deployment> {
        let config = DeploymentConfig::from_changes(changes)?;

        let mut deployment = None;
        for step in plan_update(changes) {
            log::info!("deployment {}: {}", id, step);
            deployment = Some(match step {
                UpdateStep::Upgrade(version) => self.upgrade(id, &version).await?,
                UpdateStep::Start => self.start(id).await?,
                UpdateStep::Stop => self.stop(id).await?,
                UpdateStep::Update => self.update_fields(id, &config, changes).await?,
            });
        }
        match deployment {
            Some(d) => Ok(d),
            None => self.api.get_deployment(id, &self.policy()).await,
        }
    }

    async fn update_fields(
        &self,
        id: &str,
        config: &DeploymentConfig,
        changes: &Changes<'_>,
    ) -> OciResult<Deployment> {
        if let (Some(Value::String(old)), Some(Value::String(new))) =
            changes.get_change("compartment_id")
            && !old.is_empty()
            && !new.is_empty()
            && old != new
        {
            self.change_compartment(id, new).await?;
        }

        let details = config.update_details(changes.has_change("nsg_ids"));
        let policy = &self.policy();
        let work_request_id = self.api.update_deployment(id, &details, policy).await?;
        self.finish_action(id, &work_request_id, policy).await
    }

    pub async fn delete(&self, id: &str) -> OciResult<()> {
        let policy = &self.retry.policy(true);
        let work_request_id = self.api.delete_deployment(id, policy).await?;
        self.await_work_request(
            &work_request_id,
            ActionType::Deleted,
            self.timeouts.delete,
            policy,
        )
        .await?;

        self.state_change(
            &[LifecycleState::Deleting],
            &[LifecycleState::Deleted],
            self.timeouts.delete,
        )
        .wait_for_state(|| async move {
            match self.api.get_deployment(id, policy).await {
                Ok(d) => {
                    let state = d.lifecycle_state.map(|s| s.to_string()).unwrap_or_default();
                    Ok(((), state))
                }
                Err(e) if e.is_not_found() => Ok(((), LifecycleState::Deleted.to_string())),
                Err(e) => Err(e),
            }
        })
        .await?;
        log::info!("deleted deployment {}", id);
        Ok(())
    }

    pub async fn start(&self, id: &str) -> OciResult<Deployment> {
        let policy = &self.policy();
        let work_request_id = self.api.start_deployment(id, policy).await?;
        self.finish_action(id, &work_request_id, policy).await
    }

    pub async fn stop(&self, id: &str) -> OciResult<Deployment> {
        let policy = &self.policy();
        let work_request_id = self.api.stop_deployment(id, policy).await?;
        self.finish_action(id, &work_request_id, policy).await
    }

    pub async fn upgrade(&self, id: &str, ogg_version: &str) -> OciResult<Deployment> {
        let policy = &self.policy();
        let details = UpgradeDeploymentDetails::SpecificRelease {
            ogg_version: ogg_version.to_string(),
        };
        let work_request_id = self.api.upgrade_deployment(id, &details, policy).await?;
        self.finish_action(id, &work_request_id, policy).await
    }

    pub async fn change_compartment(
        &self,
        id: &str,
        compartment_id: &str,
    ) -> OciResult<Deployment> {
        let policy = &self.policy();
        let details = ChangeDeploymentCompartmentDetails {
            compartment_id: compartment_id.to_string(),
        };
        let work_request_id = self
            .api
            .change_deployment_compartment(id, &details, policy)
            .await?;
        self.finish_action(id, &work_request_id, policy).await
    }

    /// Wait for an action's work request, then read the deployment back
    async fn finish_action(
        &self,
        id: &str,
        work_request_id: &str,
        policy: &RetryPolicy,
    ) -> OciResult<Deployment> {
        self.await_work_request(
            work_request_id,
            ActionType::Updated,
            self.timeouts.update,
            policy,
        )
        .await?;
        self.api.get_deployment(id, policy).await
    }
}
