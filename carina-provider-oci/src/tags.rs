//! Defined and system tags
//!
//! Configuration writes defined tags flat, as `{"Namespace.key" = "value"}`.
//! The API nests them by namespace.

use std::collections::HashMap;

use carina_core::resource::Value;

use crate::error::{OciError, OciResult};
use crate::golden_gate::models::NamespacedTags;

/// Namespace the service fills in on its own (CreatedBy, CreatedOn)
const ORACLE_TAGS_NAMESPACE: &str = "Oracle-Tags";

/// `{"ns.key": v}` to `{ns: {key: v}}`
pub fn map_to_defined_tags(tags: &HashMap<String, Value>) -> OciResult<NamespacedTags> {
    let mut defined = NamespacedTags::new();
    for (name, value) in tags {
        let Some((namespace, key)) = name
            .split_once('.')
            .filter(|(ns, k)| !ns.is_empty() && !k.is_empty())
        else {
            return Err(OciError::invalid_attribute(
                "defined_tags",
                format!("tag '{}' must be of the form namespace.key", name),
            ));
        };
        let value = match value {
            Value::String(s) => serde_json::Value::String(s.clone()),
            Value::Int(i) => serde_json::Value::from(*i),
            Value::Bool(b) => serde_json::Value::Bool(*b),
            other => {
                return Err(OciError::invalid_attribute(
                    "defined_tags",
                    format!("tag '{}' has a non-scalar value {:?}", name, other),
                ));
            }
        };
        defined
            .entry(namespace.to_string())
            .or_default()
            .insert(key.to_string(), value);
    }
    Ok(defined)
}

/// `{ns: {key: v}}` to `{"ns.key": "v"}`; also used for system tags
pub fn defined_tags_to_map(tags: &NamespacedTags) -> HashMap<String, Value> {
    tags.iter()
        .flat_map(|(namespace, entries)| {
            entries.iter().map(move |(key, value)| {
                let text = match value {
                    serde_json::Value::String(s) => s.clone(),
                    other => other.to_string(),
                };
                (format!("{}.{}", namespace, key), Value::String(text))
            })
        })
        .collect()
}

/// Ignore Oracle-Tags the service added that configuration does not mention
pub fn defined_tags_diff_suppress(old: Option<&Value>, new: Option<&Value>) -> bool {
    let empty = HashMap::new();
    let old = match old {
        Some(Value::Map(map)) => map,
        None => &empty,
        Some(_) => return false,
    };
    let new = match new {
        Some(Value::Map(map)) => map,
        None => &empty,
        Some(_) => return false,
    };

    let prefix = format!("{}.", ORACLE_TAGS_NAMESPACE);
    let remaining: HashMap<&String, &Value> = old
        .iter()
        .filter(|(key, _)| !key.starts_with(&prefix) || new.contains_key(*key))
        .collect();

    remaining.len() == new.len()
        && new
            .iter()
            .all(|(key, value)| remaining.get(key) == Some(&value))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tags(entries: &[(&str, &str)]) -> HashMap<String, Value> {
        entries
            .iter()
            .map(|(k, v)| (k.to_string(), Value::String(v.to_string())))
            .collect()
    }

    #[test]
    fn nests_by_namespace() {
        let flat = tags(&[("Operations.CostCenter", "42"), ("Operations.Team", "ogg")]);
        let defined = map_to_defined_tags(&flat).unwrap();
        assert_eq!(defined.len(), 1);
        assert_eq!(defined["Operations"]["CostCenter"], serde_json::json!("42"));

        assert_eq!(defined_tags_to_map(&defined), flat);
    }

    #[test]
    fn rejects_tags_without_namespace() {
        let err = map_to_defined_tags(&tags(&[("CostCenter", "42")])).unwrap_err();
        assert!(err.to_string().contains("namespace.key"));
        assert!(map_to_defined_tags(&tags(&[(".key", "v")])).is_err());
    }

    #[test]
    fn non_string_values_flatten_to_text() {
        let mut defined = NamespacedTags::new();
        defined
            .entry("ns".to_string())
            .or_default()
            .insert("count".to_string(), serde_json::json!(3));
        assert_eq!(
            defined_tags_to_map(&defined)["ns.count"],
            Value::String("3".to_string())
        );
    }

    #[test]
    fn suppresses_service_added_oracle_tags() {
        let old = Value::Map(tags(&[
            ("Operations.CostCenter", "42"),
            ("Oracle-Tags.CreatedBy", "someone"),
            ("Oracle-Tags.CreatedOn", "2024-03-01"),
        ]));
        let new = Value::Map(tags(&[("Operations.CostCenter", "42")]));
        assert!(defined_tags_diff_suppress(Some(&old), Some(&new)));

        let changed = Value::Map(tags(&[("Operations.CostCenter", "43")]));
        assert!(!defined_tags_diff_suppress(Some(&old), Some(&changed)));

        // An Oracle-Tags key set in configuration is compared normally
        let explicit = Value::Map(tags(&[
            ("Operations.CostCenter", "42"),
            ("Oracle-Tags.CreatedBy", "someone-else"),
        ]));
        assert!(!defined_tags_diff_suppress(Some(&old), Some(&explicit)));
    }
}
