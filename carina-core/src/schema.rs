//! Schema - Define attribute shapes for resources
//!
//! Providers declare a schema for each resource type: attribute types,
//! whether an attribute is required, optional or computed, which changes force
//! replacement, and how diffs are suppressed. Schemas are used to validate
//! desired state and to drive change detection in [`crate::differ`].

use std::collections::HashMap;
use std::fmt;
use std::time::Duration;

use crate::resource::Value;

/// Attribute type
#[derive(Debug, Clone)]
pub enum AttributeType {
    /// String
    String,
    /// Integer
    Int,
    /// Boolean
    Bool,
    /// Enum (list of allowed values, exact match)
    Enum(Vec<String>),
    /// Enum matched without regard to case
    EnumIgnoreCase(Vec<String>),
    /// Custom type (with validation function)
    Custom {
        name: String,
        base: Box<AttributeType>,
        validate: fn(&Value) -> Result<(), String>,
    },
    /// List
    List(Box<AttributeType>),
    /// Unordered list without duplicates
    Set(Box<AttributeType>),
    /// Map
    Map(Box<AttributeType>),
    /// Nested object with its own attributes
    Block(Vec<AttributeSchema>),
}

impl AttributeType {
    /// Check if a value conforms to this type
    pub fn validate(&self, value: &Value) -> Result<(), TypeError> {
        match (self, value) {
            (AttributeType::String, Value::String(_)) => Ok(()),
            (AttributeType::Int, Value::Int(_)) => Ok(()),
            (AttributeType::Bool, Value::Bool(_)) => Ok(()),

            (AttributeType::Enum(variants), Value::String(s)) => {
                if variants.iter().any(|v| v == s) {
                    Ok(())
                } else {
                    Err(TypeError::InvalidEnumVariant {
                        value: s.clone(),
                        expected: variants.clone(),
                    })
                }
            }

            (AttributeType::EnumIgnoreCase(variants), Value::String(s)) => {
                if variants.iter().any(|v| v.eq_ignore_ascii_case(s)) {
                    Ok(())
                } else {
                    Err(TypeError::InvalidEnumVariant {
                        value: s.clone(),
                        expected: variants.clone(),
                    })
                }
            }

            (AttributeType::Custom { validate, base, .. }, v) => {
                base.validate(v)?;
                validate(v).map_err(|msg| TypeError::ValidationFailed { message: msg })
            }

            (AttributeType::List(inner), Value::List(items)) => {
                for (i, item) in items.iter().enumerate() {
                    inner.validate(item).map_err(|e| TypeError::ListItemError {
                        index: i,
                        inner: Box::new(e),
                    })?;
                }
                Ok(())
            }

            (AttributeType::Set(inner), Value::List(items)) => {
                for (i, item) in items.iter().enumerate() {
                    inner.validate(item).map_err(|e| TypeError::ListItemError {
                        index: i,
                        inner: Box::new(e),
                    })?;
                    if items[..i].contains(item) {
                        return Err(TypeError::DuplicateSetItem { index: i });
                    }
                }
                Ok(())
            }

            (AttributeType::Map(inner), Value::Map(map)) => {
                for (k, v) in map {
                    inner.validate(v).map_err(|e| TypeError::MapValueError {
                        key: k.clone(),
                        inner: Box::new(e),
                    })?;
                }
                Ok(())
            }

            (AttributeType::Block(attributes), Value::Map(map)) => {
                for schema in attributes {
                    match map.get(&schema.name) {
                        Some(v) => schema.validate_value(v)?,
                        None if schema.required => {
                            return Err(TypeError::MissingRequired {
                                name: schema.name.clone(),
                            });
                        }
                        None => {}
                    }
                }
                for key in map.keys() {
                    if !attributes.iter().any(|a| &a.name == key) {
                        return Err(TypeError::UnknownAttribute { name: key.clone() });
                    }
                }
                Ok(())
            }

            _ => Err(TypeError::TypeMismatch {
                expected: self.type_name(),
                got: value.type_name(),
            }),
        }
    }

    fn type_name(&self) -> String {
        match self {
            AttributeType::String => "String".to_string(),
            AttributeType::Int => "Int".to_string(),
            AttributeType::Bool => "Bool".to_string(),
            AttributeType::Enum(variants) | AttributeType::EnumIgnoreCase(variants) => {
                format!("Enum({})", variants.join(" | "))
            }
            AttributeType::Custom { name, .. } => name.clone(),
            AttributeType::List(inner) => format!("List<{}>", inner.type_name()),
            AttributeType::Set(inner) => format!("Set<{}>", inner.type_name()),
            AttributeType::Map(inner) => format!("Map<{}>", inner.type_name()),
            AttributeType::Block(_) => "Block".to_string(),
        }
    }
}

impl fmt::Display for AttributeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.type_name())
    }
}

/// Type error
#[derive(Debug, Clone, thiserror::Error)]
pub enum TypeError {
    #[error("Type mismatch: expected {expected}, got {got}")]
    TypeMismatch { expected: String, got: String },

    #[error("Invalid enum variant '{value}', expected one of: {}", expected.join(", "))]
    InvalidEnumVariant {
        value: String,
        expected: Vec<String>,
    },

    #[error("Validation failed: {message}")]
    ValidationFailed { message: String },

    #[error("Required attribute '{name}' is missing")]
    MissingRequired { name: String },

    #[error("Unknown attribute '{name}'")]
    UnknownAttribute { name: String },

    #[error("Attribute '{name}' is computed and cannot be set")]
    ComputedAttribute { name: String },

    #[error("Attribute '{name}' must have between {min} and {max} items, got {got}")]
    ItemCount {
        name: String,
        min: usize,
        max: usize,
        got: usize,
    },

    #[error("Duplicate set item at index {index}")]
    DuplicateSetItem { index: usize },

    #[error("Invalid duration '{value}'")]
    InvalidDuration { value: String },

    #[error("List item at index {index}: {inner}")]
    ListItemError { index: usize, inner: Box<TypeError> },

    #[error("Map value for key '{key}': {inner}")]
    MapValueError { key: String, inner: Box<TypeError> },
}

impl Value {
    fn type_name(&self) -> String {
        match self {
            Value::String(_) => "String".to_string(),
            Value::Int(_) => "Int".to_string(),
            Value::Bool(_) => "Bool".to_string(),
            Value::List(_) => "List".to_string(),
            Value::Map(_) => "Map".to_string(),
        }
    }
}

/// How a difference between old and new values may be ignored
#[derive(Debug, Clone, Copy)]
pub enum DiffSuppress {
    /// Strings that differ only in case are equal
    EqualIgnoreCase,
    /// Provider-specific comparison of (old, new)
    Custom(fn(Option<&Value>, Option<&Value>) -> bool),
}

impl DiffSuppress {
    /// Returns true if the change from `old` to `new` should be ignored
    pub fn suppresses(&self, old: Option<&Value>, new: Option<&Value>) -> bool {
        match self {
            DiffSuppress::EqualIgnoreCase => match (old, new) {
                (Some(Value::String(a)), Some(Value::String(b))) => a.eq_ignore_ascii_case(b),
                _ => false,
            },
            DiffSuppress::Custom(f) => f(old, new),
        }
    }
}

/// Attribute schema
#[derive(Debug, Clone)]
pub struct AttributeSchema {
    pub name: String,
    pub attr_type: AttributeType,
    pub required: bool,
    pub optional: bool,
    /// Value may be filled in by the provider
    pub computed: bool,
    /// Changing this attribute requires replacing the resource
    pub force_new: bool,
    /// Value must never be printed
    pub sensitive: bool,
    pub min_items: Option<usize>,
    pub max_items: Option<usize>,
    pub diff_suppress: Option<DiffSuppress>,
    pub default: Option<Value>,
    pub description: Option<String>,
    /// Provider-side property name (e.g., "compartmentId")
    pub provider_name: Option<String>,
}

impl AttributeSchema {
    pub fn new(name: impl Into<String>, attr_type: AttributeType) -> Self {
        Self {
            name: name.into(),
            attr_type,
            required: false,
            optional: false,
            computed: false,
            force_new: false,
            sensitive: false,
            min_items: None,
            max_items: None,
            diff_suppress: None,
            default: None,
            description: None,
            provider_name: None,
        }
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn optional(mut self) -> Self {
        self.optional = true;
        self
    }

    pub fn computed(mut self) -> Self {
        self.computed = true;
        self
    }

    pub fn force_new(mut self) -> Self {
        self.force_new = true;
        self
    }

    pub fn sensitive(mut self) -> Self {
        self.sensitive = true;
        self
    }

    pub fn with_items(mut self, min: usize, max: usize) -> Self {
        self.min_items = Some(min);
        self.max_items = Some(max);
        self
    }

    pub fn with_diff_suppress(mut self, suppress: DiffSuppress) -> Self {
        self.diff_suppress = Some(suppress);
        self
    }

    pub fn with_default(mut self, value: Value) -> Self {
        self.default = Some(value);
        self
    }

    pub fn with_description(mut self, desc: impl Into<String>) -> Self {
        self.description = Some(desc.into());
        self
    }

    pub fn with_provider_name(mut self, name: impl Into<String>) -> Self {
        self.provider_name = Some(name.into());
        self
    }

    /// Computed and not settable by the user
    pub fn is_computed_only(&self) -> bool {
        self.computed && !self.optional && !self.required
    }

    fn validate_value(&self, value: &Value) -> Result<(), TypeError> {
        if let Value::List(items) = value {
            let min = self.min_items.unwrap_or(0);
            let max = self.max_items.unwrap_or(usize::MAX);
            if items.len() < min || items.len() > max {
                return Err(TypeError::ItemCount {
                    name: self.name.clone(),
                    min,
                    max,
                    got: items.len(),
                });
            }
        }
        self.attr_type.validate(value)
    }
}

/// Operation timeouts of a resource type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResourceTimeouts {
    pub create: Duration,
    pub update: Duration,
    pub delete: Duration,
}

impl Default for ResourceTimeouts {
    fn default() -> Self {
        let twenty_minutes = Duration::from_secs(20 * 60);
        Self {
            create: twenty_minutes,
            update: twenty_minutes,
            delete: twenty_minutes,
        }
    }
}

/// Resource schema
#[derive(Debug, Clone)]
pub struct ResourceSchema {
    pub resource_type: String,
    pub attributes: HashMap<String, AttributeSchema>,
    pub description: Option<String>,
    pub timeouts: ResourceTimeouts,
}

impl ResourceSchema {
    pub fn new(resource_type: impl Into<String>) -> Self {
        Self {
            resource_type: resource_type.into(),
            attributes: HashMap::new(),
            description: None,
            timeouts: ResourceTimeouts::default(),
        }
    }

    pub fn attribute(mut self, schema: AttributeSchema) -> Self {
        self.attributes.insert(schema.name.clone(), schema);
        self
    }

    pub fn with_description(mut self, desc: impl Into<String>) -> Self {
        self.description = Some(desc.into());
        self
    }

    pub fn with_timeouts(mut self, timeouts: ResourceTimeouts) -> Self {
        self.timeouts = timeouts;
        self
    }

    /// Validate resource attributes
    pub fn validate(&self, attributes: &HashMap<String, Value>) -> Result<(), Vec<TypeError>> {
        let mut errors = Vec::new();

        // Check required attributes
        for (name, schema) in &self.attributes {
            if schema.required && !attributes.contains_key(name) && schema.default.is_none() {
                errors.push(TypeError::MissingRequired { name: name.clone() });
            }
        }

        for (name, value) in attributes {
            match self.attributes.get(name) {
                Some(schema) if schema.is_computed_only() => {
                    errors.push(TypeError::ComputedAttribute { name: name.clone() });
                }
                Some(schema) => {
                    if let Err(e) = schema.validate_value(value) {
                        errors.push(e);
                    }
                }
                // `timeouts` is accepted on every resource
                None if name == "timeouts" => {}
                None => errors.push(TypeError::UnknownAttribute { name: name.clone() }),
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    /// Timeouts with any `timeouts { create = "..." }` override from configuration applied
    pub fn effective_timeouts(
        &self,
        attributes: &HashMap<String, Value>,
    ) -> Result<ResourceTimeouts, TypeError> {
        let mut timeouts = self.timeouts;
        let Some(Value::Map(overrides)) = attributes.get("timeouts") else {
            return Ok(timeouts);
        };
        for (key, value) in overrides {
            let Value::String(s) = value else {
                return Err(TypeError::InvalidDuration {
                    value: format!("{:?}", value),
                });
            };
            let duration = parse_duration(s)?;
            match key.as_str() {
                "create" => timeouts.create = duration,
                "update" => timeouts.update = duration,
                "delete" => timeouts.delete = duration,
                _ => return Err(TypeError::UnknownAttribute { name: key.clone() }),
            }
        }
        Ok(timeouts)
    }
}

/// Parse a duration such as "90m", "1h30m" or "2.5s"
pub fn parse_duration(s: &str) -> Result<Duration, TypeError> {
    let invalid = || TypeError::InvalidDuration {
        value: s.to_string(),
    };
    if s.is_empty() {
        return Err(invalid());
    }
    if s == "0" {
        return Ok(Duration::ZERO);
    }

    let mut total_nanos = 0f64;
    let mut rest = s;
    while !rest.is_empty() {
        let number_len = rest
            .find(|c: char| !(c.is_ascii_digit() || c == '.'))
            .ok_or_else(invalid)?;
        if number_len == 0 {
            return Err(invalid());
        }
        let number: f64 = rest[..number_len].parse().map_err(|_| invalid())?;
        rest = &rest[number_len..];

        let unit_len = rest
            .find(|c: char| c.is_ascii_digit() || c == '.')
            .unwrap_or(rest.len());
        let nanos_per_unit = match &rest[..unit_len] {
            "h" => 3_600e9,
            "m" => 60e9,
            "s" => 1e9,
            "ms" => 1e6,
            "us" | "µs" => 1e3,
            "ns" => 1.0,
            _ => return Err(invalid()),
        };
        total_nanos += number * nanos_per_unit;
        rest = &rest[unit_len..];
    }

    Ok(Duration::from_nanos(total_nanos.round() as u64))
}

/// Helper functions for common types
pub mod types {
    use super::*;

    /// Positive integer type
    pub fn positive_int() -> AttributeType {
        AttributeType::Custom {
            name: "PositiveInt".to_string(),
            base: Box::new(AttributeType::Int),
            validate: |value| {
                if let Value::Int(n) = value {
                    if *n > 0 {
                        Ok(())
                    } else {
                        Err("Value must be positive".to_string())
                    }
                } else {
                    Err("Expected integer".to_string())
                }
            },
        }
    }

    /// Hour of the day (0-23)
    pub fn hour_of_day() -> AttributeType {
        AttributeType::Custom {
            name: "HourOfDay".to_string(),
            base: Box::new(AttributeType::Int),
            validate: |value| match value {
                Value::Int(n) if (0..24).contains(n) => Ok(()),
                Value::Int(n) => Err(format!("Hour {} is out of range 0-23", n)),
                _ => Err("Expected integer".to_string()),
            },
        }
    }

    /// String-valued map (tags)
    pub fn string_map() -> AttributeType {
        AttributeType::Map(Box::new(AttributeType::String))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validate_string_type() {
        let t = AttributeType::String;
        assert!(t.validate(&Value::String("hello".to_string())).is_ok());
        assert!(t.validate(&Value::Int(42)).is_err());
    }

    #[test]
    fn validate_enum_type() {
        let t = AttributeType::Enum(vec!["a".to_string(), "b".to_string()]);
        assert!(t.validate(&Value::String("a".to_string())).is_ok());
        assert!(t.validate(&Value::String("A".to_string())).is_err());
        assert!(t.validate(&Value::String("c".to_string())).is_err());
    }

    #[test]
    fn validate_enum_ignore_case() {
        let t = AttributeType::EnumIgnoreCase(vec!["ACTIVE".to_string(), "INACTIVE".to_string()]);
        assert!(t.validate(&Value::String("inactive".to_string())).is_ok());
        assert!(t.validate(&Value::String("Active".to_string())).is_ok());
        assert!(t.validate(&Value::String("DELETED".to_string())).is_err());
    }

    #[test]
    fn validate_positive_int() {
        let t = types::positive_int();
        assert!(t.validate(&Value::Int(1)).is_ok());
        assert!(t.validate(&Value::Int(100)).is_ok());
        assert!(t.validate(&Value::Int(0)).is_err());
        assert!(t.validate(&Value::Int(-1)).is_err());
        assert!(t.validate(&Value::String("1".to_string())).is_err());
    }

    #[test]
    fn validate_set_rejects_duplicates() {
        let t = AttributeType::Set(Box::new(AttributeType::String));
        let ok = Value::List(vec![Value::from("a"), Value::from("b")]);
        let dup = Value::List(vec![Value::from("a"), Value::from("a")]);
        assert!(t.validate(&ok).is_ok());
        assert!(matches!(
            t.validate(&dup),
            Err(TypeError::DuplicateSetItem { index: 1 })
        ));
    }

    fn window_schema() -> ResourceSchema {
        ResourceSchema::new("resource").attribute(
            AttributeSchema::new(
                "maintenance_window",
                AttributeType::List(Box::new(AttributeType::Block(vec![
                    AttributeSchema::new("day", AttributeType::String).required(),
                    AttributeSchema::new("start_hour", types::hour_of_day()).required(),
                ]))),
            )
            .optional()
            .computed()
            .with_items(1, 1),
        )
    }

    fn window(pairs: Vec<(&str, Value)>) -> Value {
        Value::Map(pairs.into_iter().map(|(k, v)| (k.to_string(), v)).collect())
    }

    #[test]
    fn validate_block_attributes() {
        let schema = window_schema();

        let mut attrs = HashMap::new();
        attrs.insert(
            "maintenance_window".to_string(),
            Value::List(vec![window(vec![
                ("day", Value::from("MONDAY")),
                ("start_hour", Value::Int(4)),
            ])]),
        );
        assert!(schema.validate(&attrs).is_ok());

        attrs.insert(
            "maintenance_window".to_string(),
            Value::List(vec![window(vec![("day", Value::from("MONDAY"))])]),
        );
        assert!(schema.validate(&attrs).is_err());
    }

    #[test]
    fn validate_block_item_count() {
        let schema = window_schema();
        let item = window(vec![
            ("day", Value::from("MONDAY")),
            ("start_hour", Value::Int(4)),
        ]);

        let mut attrs = HashMap::new();
        attrs.insert(
            "maintenance_window".to_string(),
            Value::List(vec![item.clone(), item]),
        );
        let errors = schema.validate(&attrs).unwrap_err();
        assert!(matches!(errors[0], TypeError::ItemCount { got: 2, .. }));
    }

    #[test]
    fn validate_resource_schema() {
        let schema = ResourceSchema::new("resource")
            .attribute(AttributeSchema::new("name", AttributeType::String).required())
            .attribute(AttributeSchema::new("count", types::positive_int()).optional())
            .attribute(AttributeSchema::new("enabled", AttributeType::Bool).optional());

        let mut attrs = HashMap::new();
        attrs.insert("name".to_string(), Value::String("my-resource".to_string()));
        attrs.insert("count".to_string(), Value::Int(5));
        attrs.insert("enabled".to_string(), Value::Bool(true));

        assert!(schema.validate(&attrs).is_ok());
    }

    #[test]
    fn missing_required_attribute() {
        let schema = ResourceSchema::new("deployment")
            .attribute(AttributeSchema::new("name", AttributeType::String).required());

        let attrs = HashMap::new();
        let result = schema.validate(&attrs);
        assert!(result.is_err());
    }

    #[test]
    fn computed_only_attribute_cannot_be_set() {
        let schema = ResourceSchema::new("deployment")
            .attribute(AttributeSchema::new("deployment_url", AttributeType::String).computed());

        let mut attrs = HashMap::new();
        attrs.insert("deployment_url".to_string(), Value::from("https://x"));
        let errors = schema.validate(&attrs).unwrap_err();
        assert!(matches!(errors[0], TypeError::ComputedAttribute { .. }));
    }

    #[test]
    fn equal_ignore_case_suppression() {
        let s = DiffSuppress::EqualIgnoreCase;
        assert!(s.suppresses(Some(&Value::from("ACTIVE")), Some(&Value::from("active"))));
        assert!(!s.suppresses(Some(&Value::from("ACTIVE")), Some(&Value::from("INACTIVE"))));
        assert!(!s.suppresses(None, Some(&Value::from("active"))));
    }

    #[test]
    fn parse_go_style_durations() {
        assert_eq!(parse_duration("90m").unwrap(), Duration::from_secs(5400));
        assert_eq!(parse_duration("1h30m").unwrap(), Duration::from_secs(5400));
        assert_eq!(parse_duration("1.5s").unwrap(), Duration::from_millis(1500));
        assert_eq!(parse_duration("250ms").unwrap(), Duration::from_millis(250));
        assert_eq!(parse_duration("0").unwrap(), Duration::ZERO);
        assert!(parse_duration("").is_err());
        assert!(parse_duration("10").is_err());
        assert!(parse_duration("m10").is_err());
        assert!(parse_duration("10d").is_err());
    }

    #[test]
    fn timeouts_override() {
        let schema = ResourceSchema::new("deployment").with_timeouts(ResourceTimeouts {
            create: Duration::from_secs(5400),
            update: Duration::from_secs(3600),
            delete: Duration::from_secs(1800),
        });

        let mut overrides = HashMap::new();
        overrides.insert("create".to_string(), Value::from("2h"));
        let mut attrs = HashMap::new();
        attrs.insert("timeouts".to_string(), Value::Map(overrides));

        let timeouts = schema.effective_timeouts(&attrs).unwrap();
        assert_eq!(timeouts.create, Duration::from_secs(7200));
        assert_eq!(timeouts.update, Duration::from_secs(3600));
        assert!(schema.validate(&attrs).is_ok());
    }
}
