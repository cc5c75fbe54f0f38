//! Resource types of the OCI provider
//!
//! - `golden_gate_deployment` - GoldenGate deployment
//! - `golden_gate_deployment_versions` - data source listing the OGG versions
//!   a deployment can run

pub mod deployment_versions;
pub mod golden_gate_deployment;

use std::sync::LazyLock;

use carina_core::provider::ResourceType;
use carina_core::resource::Value;
use carina_core::schema::{AttributeType, ResourceSchema};
use regex::Regex;

// =============================================================================
// Resource Type Definitions
// =============================================================================

macro_rules! define_resource_type {
    ($name:ident, $type_name:expr, $schema:path) => {
        pub struct $name;
        impl ResourceType for $name {
            fn name(&self) -> &'static str {
                $type_name
            }
            fn schema(&self) -> ResourceSchema {
                $schema()
            }
        }
    };
}

define_resource_type!(
    GoldenGateDeploymentType,
    golden_gate_deployment::RESOURCE_TYPE,
    golden_gate_deployment::schema
);
define_resource_type!(
    DeploymentVersionsType,
    deployment_versions::DATA_SOURCE_TYPE,
    deployment_versions::schema
);

/// Returns all resource types supported by this provider
pub fn resource_types() -> Vec<Box<dyn ResourceType>> {
    vec![
        Box::new(GoldenGateDeploymentType),
        Box::new(DeploymentVersionsType),
    ]
}

/// Schema of a resource type by name
pub fn schema_for(resource_type: &str) -> Option<ResourceSchema> {
    resource_types()
        .into_iter()
        .find(|t| t.name() == resource_type)
        .map(|t| t.schema())
}

// =============================================================================
// Shared attribute types
// =============================================================================

static OCID_PATTERN: LazyLock<Option<Regex>> = LazyLock::new(|| {
    Regex::new(r"^ocid1\.[a-z0-9]+\.[a-z0-9]+\.[a-z0-9-]*\.[A-Za-z0-9.]+$").ok()
});

/// Oracle Cloud identifier, e.g. "ocid1.compartment.oc1..aaaa"
pub fn ocid() -> AttributeType {
    AttributeType::Custom {
        name: "Ocid".to_string(),
        base: Box::new(AttributeType::String),
        validate: |value| match value {
            Value::String(s) if OCID_PATTERN.as_ref().is_some_and(|re| re.is_match(s)) => Ok(()),
            Value::String(s) => Err(format!("'{}' is not an OCID", s)),
            _ => Err("Expected string".to_string()),
        },
    }
}

/// Enum parsed without regard to case
pub fn enum_ignore_case(values: &[&str]) -> AttributeType {
    AttributeType::EnumIgnoreCase(values.iter().map(|v| v.to_string()).collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registers_both_types() {
        let names: Vec<_> = resource_types().iter().map(|t| t.name()).collect();
        assert_eq!(
            names,
            vec!["golden_gate_deployment", "golden_gate_deployment_versions"]
        );
        assert!(schema_for("golden_gate_deployment").is_some());
        assert!(schema_for("golden_gate_connection").is_none());
    }

    #[test]
    fn ocid_validation() {
        let t = ocid();
        assert!(t.validate(&Value::String("ocid1.compartment.oc1..aaaa".to_string())).is_ok());
        assert!(
            t.validate(&Value::String("ocid1.subnet.oc1.iad.aaaabbbb".to_string()))
                .is_ok()
        );
        assert!(t.validate(&Value::String("compartment-1".to_string())).is_err());
        assert!(t.validate(&Value::Int(1)).is_err());
    }
}
