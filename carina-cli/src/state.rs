//! JSON resource and state files
//!
//! A resource file names one resource and its desired attributes:
//!
//! ```json
//! { "type": "golden_gate_deployment", "name": "ogg", "attributes": { ... } }
//! ```
//!
//! The state file maps `type.name` to the identifier and attributes last
//! returned by the provider.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use carina_core::resource::{Resource, ResourceId, State, Value};
use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize)]
struct ResourceFile {
    #[serde(rename = "type")]
    resource_type: String,
    name: String,
    #[serde(default)]
    attributes: serde_json::Map<String, serde_json::Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct StoredState {
    identifier: Option<String>,
    #[serde(default)]
    attributes: serde_json::Map<String, serde_json::Value>,
}

pub fn load_resource(path: &Path) -> Result<Resource, String> {
    let content = fs::read_to_string(path)
        .map_err(|e| format!("Failed to read {}: {}", path.display(), e))?;
    let file: ResourceFile = serde_json::from_str(&content)
        .map_err(|e| format!("Failed to parse {}: {}", path.display(), e))?;

    let mut resource = Resource::new(file.resource_type, file.name);
    for (key, value) in &file.attributes {
        // null means "not set"
        if let Some(value) = json_to_value(value) {
            resource.attributes.insert(key.clone(), value);
        }
    }
    Ok(resource)
}

/// State file keyed by `type.name`
pub struct StateStore {
    path: PathBuf,
    states: HashMap<String, StoredState>,
}

impl StateStore {
    pub fn open(path: &Path) -> Result<Self, String> {
        let states = match fs::read_to_string(path) {
            Ok(content) => serde_json::from_str(&content)
                .map_err(|e| format!("Failed to parse {}: {}", path.display(), e))?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => HashMap::new(),
            Err(e) => return Err(format!("Failed to read {}: {}", path.display(), e)),
        };
        Ok(Self {
            path: path.to_path_buf(),
            states,
        })
    }

    fn key(id: &ResourceId) -> String {
        format!("{}.{}", id.resource_type, id.name)
    }

    pub fn get(&self, id: &ResourceId) -> Option<State> {
        let stored = self.states.get(&Self::key(id))?;
        let attributes = stored
            .attributes
            .iter()
            .filter_map(|(k, v)| json_to_value(v).map(|v| (k.clone(), v)))
            .collect();
        let state = State::existing(id.clone(), attributes);
        Some(match &stored.identifier {
            Some(identifier) => state.with_identifier(identifier.clone()),
            None => state,
        })
    }

    pub fn identifier(&self, id: &ResourceId) -> Option<String> {
        self.states
            .get(&Self::key(id))
            .and_then(|s| s.identifier.clone())
    }

    /// Record `state`, or forget the resource when it no longer exists
    pub fn put(&mut self, state: &State) {
        let key = Self::key(&state.id);
        if !state.exists {
            self.states.remove(&key);
            return;
        }
        self.states.insert(
            key,
            StoredState {
                identifier: state.identifier.clone(),
                attributes: state
                    .attributes
                    .iter()
                    .map(|(k, v)| (k.clone(), value_to_json(v)))
                    .collect(),
            },
        );
    }

    pub fn remove(&mut self, id: &ResourceId) {
        self.states.remove(&Self::key(id));
    }

    pub fn save(&self) -> Result<(), String> {
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent)
                .map_err(|e| format!("Failed to create {}: {}", parent.display(), e))?;
        }
        let content = serde_json::to_string_pretty(&self.states).map_err(|e| e.to_string())?;
        fs::write(&self.path, content)
            .map_err(|e| format!("Failed to write {}: {}", self.path.display(), e))
    }
}

pub fn value_to_json(value: &Value) -> serde_json::Value {
    match value {
        Value::String(s) => serde_json::Value::String(s.clone()),
        Value::Int(n) => serde_json::Value::Number((*n).into()),
        Value::Bool(b) => serde_json::Value::Bool(*b),
        Value::List(items) => serde_json::Value::Array(items.iter().map(value_to_json).collect()),
        Value::Map(map) => serde_json::Value::Object(
            map.iter()
                .map(|(k, v)| (k.clone(), value_to_json(v)))
                .collect(),
        ),
    }
}

/// Convert JSON to a resource value; `null` has no counterpart. Fractional
/// numbers keep their text so validation reports them instead of truncating.
pub fn json_to_value(json: &serde_json::Value) -> Option<Value> {
    Some(match json {
        serde_json::Value::Null => return None,
        serde_json::Value::String(s) => Value::String(s.clone()),
        serde_json::Value::Number(n) => match n.as_i64() {
            Some(i) => Value::Int(i),
            None => Value::String(n.to_string()),
        },
        serde_json::Value::Bool(b) => Value::Bool(*b),
        serde_json::Value::Array(items) => {
            Value::List(items.iter().filter_map(json_to_value).collect())
        }
        serde_json::Value::Object(map) => Value::Map(
            map.iter()
                .filter_map(|(k, v)| json_to_value(v).map(|v| (k.clone(), v)))
                .collect(),
        ),
    })
}
