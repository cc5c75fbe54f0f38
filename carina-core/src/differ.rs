//! Differ - Compare desired state with current state
//!
//! [`diff`] classifies what has to happen to a resource, and [`Changes`] lets a
//! provider ask which individual attributes moved between the stored state and
//! the desired configuration while it carries out an update.

use std::collections::HashMap;

use crate::resource::{Resource, ResourceId, State, Value};
use crate::schema::{AttributeSchema, AttributeType, ResourceSchema};

/// Result of a diff operation
#[derive(Debug, Clone, PartialEq)]
pub enum Diff {
    /// Resource does not exist -> needs creation
    Create(Resource),
    /// Resource exists with differences -> needs update
    Update {
        id: ResourceId,
        from: State,
        to: Resource,
        changed_attributes: Vec<String>,
    },
    /// A force-new attribute changed -> delete and create
    Replace {
        id: ResourceId,
        from: State,
        to: Resource,
        changed_attributes: Vec<String>,
    },
    /// Resource exists with no differences -> no action needed
    NoChange(ResourceId),
}

impl Diff {
    /// Returns whether this Diff involves a change
    pub fn is_change(&self) -> bool {
        !matches!(self, Diff::NoChange(_))
    }
}

/// Compare desired state with current state to compute a Diff
pub fn diff(desired: &Resource, current: &State, schema: Option<&ResourceSchema>) -> Diff {
    if !current.exists {
        return Diff::Create(desired.clone());
    }

    let changed = find_changed_attributes(&desired.attributes, &current.attributes, schema);

    if changed.is_empty() {
        return Diff::NoChange(desired.id.clone());
    }

    let forces_new = schema.is_some_and(|s| {
        changed
            .iter()
            .any(|name| forces_replacement(s.attributes.get(name), name, desired, current))
    });

    if forces_new {
        Diff::Replace {
            id: desired.id.clone(),
            from: current.clone(),
            to: desired.clone(),
            changed_attributes: changed,
        }
    } else {
        Diff::Update {
            id: desired.id.clone(),
            from: current.clone(),
            to: desired.clone(),
            changed_attributes: changed,
        }
    }
}

fn forces_replacement(
    attr: Option<&AttributeSchema>,
    name: &str,
    desired: &Resource,
    current: &State,
) -> bool {
    let Some(attr) = attr else {
        return false;
    };
    if attr.force_new {
        return true;
    }
    // force_new nested inside a single block, e.g. ogg_data.0.deployment_name
    let Some(nested) = block_attributes(attr) else {
        return false;
    };
    nested.iter().any(|inner| {
        let path = format!("{}.0.{}", name, inner.name);
        inner.force_new && current.get(&path).is_some() && desired.get(&path) != current.get(&path)
    })
}

fn block_attributes(attr: &AttributeSchema) -> Option<&[AttributeSchema]> {
    match &attr.attr_type {
        AttributeType::List(inner) => match inner.as_ref() {
            AttributeType::Block(nested) => Some(nested),
            _ => None,
        },
        _ => None,
    }
}

/// Find changed attributes between desired and current state
fn find_changed_attributes(
    desired: &HashMap<String, Value>,
    current: &HashMap<String, Value>,
    schema: Option<&ResourceSchema>,
) -> Vec<String> {
    let mut changed = Vec::new();

    for (key, desired_value) in desired {
        // Skip internal attributes (starting with _) and operation timeouts
        if key.starts_with('_') || key == "timeouts" {
            continue;
        }

        let current_value = current.get(key);
        if current_value == Some(desired_value) {
            continue;
        }

        let attr = schema.and_then(|s| s.attributes.get(key));
        if let Some(suppress) = attr.and_then(|a| a.diff_suppress)
            && suppress.suppresses(current_value, Some(desired_value))
        {
            continue;
        }
        if attr.is_some_and(|a| matches!(a.attr_type, AttributeType::Set(_)))
            && let (Some(Value::List(a)), Value::List(b)) = (current_value, desired_value)
            && same_members(a, b)
        {
            continue;
        }

        changed.push(key.clone());
    }

    changed.sort();
    changed
}

fn same_members(a: &[Value], b: &[Value]) -> bool {
    a.len() == b.len() && a.iter().all(|v| b.contains(v))
}

/// Attribute-level view of an update from stored state to desired configuration
///
/// Optional+computed attributes that the configuration leaves out keep their
/// stored value, so they never show up as changes.
#[derive(Debug, Clone, Copy)]
pub struct Changes<'a> {
    from: &'a State,
    to: &'a Resource,
}

impl<'a> Changes<'a> {
    pub fn new(from: &'a State, to: &'a Resource) -> Self {
        Self { from, to }
    }

    /// Desired value at `path`, falling back to the stored value
    pub fn get(&self, path: &str) -> Option<&'a Value> {
        self.to.get(path).or_else(|| self.from.get(path))
    }

    /// Stored and desired values at `path`
    pub fn get_change(&self, path: &str) -> (Option<&'a Value>, Option<&'a Value>) {
        (self.from.get(path), self.get(path))
    }

    /// Whether the value at `path` differs between stored state and configuration
    pub fn has_change(&self, path: &str) -> bool {
        let (old, new) = self.get_change(path);
        old != new
    }

    pub fn desired(&self) -> &'a Resource {
        self.to
    }

    pub fn stored(&self) -> &'a State {
        self.from
    }
}
