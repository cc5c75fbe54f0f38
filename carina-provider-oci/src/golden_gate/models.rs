//! GoldenGate REST models
//!
//! Request and response bodies of the GoldenGate API (version 20200407).
//! JSON uses camelCase; optional fields are omitted when unset.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Tags keyed by namespace, then by tag key
pub type NamespacedTags = HashMap<String, HashMap<String, serde_json::Value>>;

/// A string that is not one of the values an enum accepts
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unsupported enum value for {type_name}: {value}. Supported values are: {}.", expected.join(","))]
pub struct InvalidEnumValue {
    pub type_name: &'static str,
    pub value: String,
    pub expected: Vec<&'static str>,
}

/// Closed string enumeration of the API.
///
/// Parsing user input ignores case and rejects unknown values. Values coming
/// back from the service that are not in the table deserialize into
/// `Unknown` so newer service releases do not break reads.
macro_rules! api_enum {
    ($(#[$meta:meta])* $name:ident { $($variant:ident => $text:literal),+ $(,)? }) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash)]
        pub enum $name {
            $($variant,)+
            Unknown(String),
        }

        impl $name {
            pub const VALUES: &'static [&'static str] = &[$($text),+];

            pub fn as_str(&self) -> &str {
                match self {
                    $($name::$variant => $text,)+
                    $name::Unknown(raw) => raw,
                }
            }

            /// Case-insensitive lookup in the value table
            pub fn parse_ignore_case(s: &str) -> Option<Self> {
                $(if s.eq_ignore_ascii_case($text) {
                    return Some($name::$variant);
                })+
                None
            }
        }

        impl FromStr for $name {
            type Err = InvalidEnumValue;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Self::parse_ignore_case(s).ok_or_else(|| InvalidEnumValue {
                    type_name: stringify!($name),
                    value: s.to_string(),
                    expected: Self::VALUES.to_vec(),
                })
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl Serialize for $name {
            fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                serializer.serialize_str(self.as_str())
            }
        }

        impl ApiEnum for $name {
            fn parse_or_unknown(s: &str) -> Self {
                Self::parse_ignore_case(s).unwrap_or_else(|| $name::Unknown(s.to_string()))
            }
        }

        impl<'de> Deserialize<'de> for $name {
            fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
                let raw = String::deserialize(deserializer)?;
                Ok(Self::parse_or_unknown(&raw))
            }
        }
    };
}

/// Enumeration generated by `api_enum!`
pub trait ApiEnum: FromStr<Err = InvalidEnumValue> {
    /// Table value ignoring case, or `Unknown` holding `s` as given
    fn parse_or_unknown(s: &str) -> Self;
}

api_enum!(
    /// Lifecycle state of a deployment
    LifecycleState {
        Creating => "CREATING",
        Updating => "UPDATING",
        Active => "ACTIVE",
        Inactive => "INACTIVE",
        Deleting => "DELETING",
        Deleted => "DELETED",
        Failed => "FAILED",
        NeedsAttention => "NEEDS_ATTENTION",
        InProgress => "IN_PROGRESS",
        Canceling => "CANCELING",
        Canceled => "CANCELED",
        Succeeded => "SUCCEEDED",
        Waiting => "WAITING",
    }
);

api_enum!(
    /// Finer grained state while a deployment is busy
    LifecycleSubState {
        Recovering => "RECOVERING",
        Starting => "STARTING",
        Stopping => "STOPPING",
        Moving => "MOVING",
        Upgrading => "UPGRADING",
        Restoring => "RESTORING",
        BackupInProgress => "BACKUP_IN_PROGRESS",
        RollbackInProgress => "ROLLBACK_IN_PROGRESS",
    }
);

api_enum!(
    /// Status of a work request
    OperationStatus {
        Accepted => "ACCEPTED",
        InProgress => "IN_PROGRESS",
        Failed => "FAILED",
        Succeeded => "SUCCEEDED",
        Canceling => "CANCELING",
        Canceled => "CANCELED",
    }
);

api_enum!(
    /// What a work request did to one of its resources
    ActionType {
        Created => "CREATED",
        Updated => "UPDATED",
        Deleted => "DELETED",
        InProgress => "IN_PROGRESS",
        Related => "RELATED",
        Failed => "FAILED",
    }
);

api_enum!(
    DeploymentType {
        Ogg => "OGG",
        DatabaseOracle => "DATABASE_ORACLE",
        Bigdata => "BIGDATA",
        DatabaseMicrosoftSqlserver => "DATABASE_MICROSOFT_SQLSERVER",
        DatabaseMysql => "DATABASE_MYSQL",
        DatabasePostgresql => "DATABASE_POSTGRESQL",
        DatabaseDb2zos => "DATABASE_DB2ZOS",
        Ggsa => "GGSA",
        DataTransforms => "DATA_TRANSFORMS",
    }
);

api_enum!(
    LicenseModel {
        LicenseIncluded => "LICENSE_INCLUDED",
        BringYourOwnLicense => "BRING_YOUR_OWN_LICENSE",
    }
);

api_enum!(
    Day {
        Monday => "MONDAY",
        Tuesday => "TUESDAY",
        Wednesday => "WEDNESDAY",
        Thursday => "THURSDAY",
        Friday => "FRIDAY",
        Saturday => "SATURDAY",
        Sunday => "SUNDAY",
    }
);

api_enum!(
    DiagnosticState {
        InProgress => "IN_PROGRESS",
        Succeeded => "SUCCEEDED",
        Failed => "FAILED",
    }
);

api_enum!(
    MaintenanceActionType {
        Upgrade => "UPGRADE",
    }
);

api_enum!(
    ReleaseType {
        Major => "MAJOR",
        Bundle => "BUNDLE",
        Minor => "MINOR",
    }
);

api_enum!(
    SortOrder {
        Asc => "ASC",
        Desc => "DESC",
    }
);

// =============================================================================
// Deployments
// =============================================================================

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MaintenanceWindow {
    pub day: Option<Day>,
    pub start_hour: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateMaintenanceWindowDetails {
    pub day: Day,
    pub start_hour: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateMaintenanceWindowDetails {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub day: Option<Day>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_hour: Option<i64>,
}

/// GoldenGate software settings as reported by the service
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OggDeployment {
    pub deployment_name: Option<String>,
    pub admin_username: Option<String>,
    pub ogg_version: Option<String>,
    pub certificate: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateOggDeploymentDetails {
    pub deployment_name: String,
    pub admin_username: String,
    pub admin_password: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub certificate: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ogg_version: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateOggDeploymentDetails {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub admin_username: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub admin_password: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub certificate: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeploymentDiagnosticData {
    pub namespace_name: Option<String>,
    pub bucket_name: Option<String>,
    pub object_name: Option<String>,
    pub diagnostic_state: Option<DiagnosticState>,
    pub time_diagnostic_start: Option<DateTime<Utc>>,
    pub time_diagnostic_end: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Deployment {
    pub id: String,
    pub display_name: Option<String>,
    pub description: Option<String>,
    pub compartment_id: Option<String>,
    pub deployment_backup_id: Option<String>,
    pub time_created: Option<DateTime<Utc>>,
    pub time_updated: Option<DateTime<Utc>>,
    pub lifecycle_state: Option<LifecycleState>,
    pub lifecycle_sub_state: Option<LifecycleSubState>,
    pub lifecycle_details: Option<String>,
    pub freeform_tags: Option<HashMap<String, String>>,
    pub defined_tags: Option<NamespacedTags>,
    pub system_tags: Option<NamespacedTags>,
    pub is_healthy: Option<bool>,
    pub subnet_id: Option<String>,
    pub fqdn: Option<String>,
    pub license_model: Option<LicenseModel>,
    pub cpu_core_count: Option<i64>,
    pub is_auto_scaling_enabled: Option<bool>,
    pub nsg_ids: Option<Vec<String>>,
    pub is_public: Option<bool>,
    pub public_ip_address: Option<String>,
    pub private_ip_address: Option<String>,
    pub deployment_url: Option<String>,
    pub is_latest_version: Option<bool>,
    pub time_upgrade_required: Option<DateTime<Utc>>,
    pub deployment_type: Option<DeploymentType>,
    pub storage_utilization_in_bytes: Option<i64>,
    pub is_storage_utilization_limit_exceeded: Option<bool>,
    pub ogg_data: Option<OggDeployment>,
    pub deployment_diagnostic_data: Option<DeploymentDiagnosticData>,
    pub maintenance_window: Option<MaintenanceWindow>,
    pub time_of_next_maintenance: Option<DateTime<Utc>>,
    pub next_maintenance_action_type: Option<MaintenanceActionType>,
    pub next_maintenance_description: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateDeploymentDetails {
    pub display_name: String,
    pub compartment_id: String,
    pub license_model: LicenseModel,
    pub subnet_id: String,
    pub cpu_core_count: i64,
    pub is_auto_scaling_enabled: bool,
    pub deployment_type: DeploymentType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deployment_backup_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub freeform_tags: Option<HashMap<String, String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub defined_tags: Option<NamespacedTags>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fqdn: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nsg_ids: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_public: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ogg_data: Option<CreateOggDeploymentDetails>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub maintenance_window: Option<CreateMaintenanceWindowDetails>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateDeploymentDetails {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub license_model: Option<LicenseModel>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub freeform_tags: Option<HashMap<String, String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub defined_tags: Option<NamespacedTags>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fqdn: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subnet_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nsg_ids: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_public: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cpu_core_count: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_auto_scaling_enabled: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ogg_data: Option<UpdateOggDeploymentDetails>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub maintenance_window: Option<UpdateMaintenanceWindowDetails>,
}

// =============================================================================
// Deployment actions
// =============================================================================

/// Body of the start and stop actions
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum DeploymentActionDetails {
    #[serde(rename = "DEFAULT")]
    Default,
}

/// Body of the upgrade action
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum UpgradeDeploymentDetails {
    #[serde(rename = "CURRENT_RELEASE")]
    CurrentRelease,
    #[serde(rename = "SPECIFIC_RELEASE", rename_all = "camelCase")]
    SpecificRelease { ogg_version: String },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangeDeploymentCompartmentDetails {
    pub compartment_id: String,
}

// =============================================================================
// Deployment versions
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeploymentVersionSummary {
    pub deployment_type: Option<DeploymentType>,
    pub ogg_version: Option<String>,
    pub release_type: Option<ReleaseType>,
    pub time_released: Option<DateTime<Utc>>,
    pub time_support_end: Option<DateTime<Utc>>,
    pub is_security_fix: Option<bool>,
}

/// Query of the deployment versions listing
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ListDeploymentVersionsRequest {
    pub compartment_id: String,
    pub deployment_id: Option<String>,
    pub deployment_type: Option<DeploymentType>,
    pub sort_order: Option<SortOrder>,
}

// =============================================================================
// Work requests
// =============================================================================

/// A resource touched by a work request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkRequestResource {
    pub entity_type: String,
    pub action_type: ActionType,
    pub identifier: String,
    pub entity_uri: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkRequest {
    pub id: String,
    pub operation_type: Option<String>,
    pub status: OperationStatus,
    pub compartment_id: Option<String>,
    #[serde(default)]
    pub resources: Vec<WorkRequestResource>,
    pub percent_complete: Option<f32>,
    pub time_accepted: Option<DateTime<Utc>>,
    pub time_started: Option<DateTime<Utc>>,
    pub time_finished: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkRequestError {
    pub code: Option<String>,
    pub message: String,
    pub timestamp: Option<DateTime<Utc>>,
}

/// Envelope of paginated list responses
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct Collection<T> {
    #[serde(default = "Vec::new")]
    pub items: Vec<T>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn enum_parse_ignores_case() {
        assert_eq!("inactive".parse::<LifecycleState>(), Ok(LifecycleState::Inactive));
        assert_eq!(
            "Needs_Attention".parse::<LifecycleState>(),
            Ok(LifecycleState::NeedsAttention)
        );
        assert_eq!("Created".parse::<ActionType>(), Ok(ActionType::Created));
    }

    #[test]
    fn enum_parse_rejects_unknown_input() {
        let err = "SLEEPING".parse::<LifecycleState>().unwrap_err();
        assert_eq!(err.type_name, "LifecycleState");
        assert!(err.to_string().starts_with(
            "unsupported enum value for LifecycleState: SLEEPING. Supported values are: CREATING,"
        ));
    }

    #[test]
    fn unknown_service_value_is_kept() {
        let status: OperationStatus = serde_json::from_value(json!("WAITING")).unwrap();
        assert_eq!(status, OperationStatus::Unknown("WAITING".to_string()));
        assert_eq!(status.as_str(), "WAITING");
        assert_eq!(serde_json::to_value(&status).unwrap(), json!("WAITING"));
    }

    #[test]
    fn lenient_parse_keeps_values_outside_the_table() {
        assert_eq!(LifecycleState::parse_or_unknown("inactive"), LifecycleState::Inactive);
        assert_eq!(
            LifecycleState::parse_or_unknown("MAINTENANCE"),
            LifecycleState::Unknown("MAINTENANCE".to_string())
        );
        assert!("MAINTENANCE".parse::<LifecycleState>().is_err());
    }

    #[test]
    fn action_bodies() {
        assert_eq!(
            serde_json::to_value(DeploymentActionDetails::Default).unwrap(),
            json!({"type": "DEFAULT"})
        );
        assert_eq!(
            serde_json::to_value(UpgradeDeploymentDetails::SpecificRelease {
                ogg_version: "21.9.0.0.1".to_string()
            })
            .unwrap(),
            json!({"type": "SPECIFIC_RELEASE", "oggVersion": "21.9.0.0.1"})
        );
    }

    #[test]
    fn work_request_decodes() {
        let wr: WorkRequest = serde_json::from_value(json!({
            "id": "ocid1.goldengateworkrequest.oc1..wr",
            "operationType": "GOLDENGATE_DEPLOYMENT_CREATE",
            "status": "SUCCEEDED",
            "compartmentId": "ocid1.compartment.oc1..c",
            "percentComplete": 100.0,
            "resources": [{
                "entityType": "GoldenGateDeployment",
                "actionType": "CREATED",
                "identifier": "ocid1.goldengatedeployment.oc1..d",
                "entityUri": "/20200407/deployments/ocid1.goldengatedeployment.oc1..d"
            }],
            "timeAccepted": "2024-03-01T10:00:00.000Z",
            "timeFinished": "2024-03-01T10:20:00.000Z"
        }))
        .unwrap();

        assert_eq!(wr.status, OperationStatus::Succeeded);
        assert_eq!(wr.resources[0].action_type, ActionType::Created);
        assert!(wr.time_finished.is_some());
        assert!(wr.time_started.is_none());
    }

    #[test]
    fn update_details_omit_unset_fields() {
        let details = UpdateDeploymentDetails {
            display_name: Some("ogg".to_string()),
            cpu_core_count: Some(2),
            ..Default::default()
        };
        assert_eq!(
            serde_json::to_value(&details).unwrap(),
            json!({"displayName": "ogg", "cpuCoreCount": 2})
        );
    }
}
