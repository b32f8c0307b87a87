//! The provider-side state record of one resource instance.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Observed state of a resource as written back to the state store.
///
/// An empty `id` means the resource no longer exists remotely and should be
/// dropped from state.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResourceState {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    id: Option<String>,
    #[serde(default)]
    attributes: Map<String, Value>,
}

impl ResourceState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a state record from the configured attributes.
    pub fn from_config(config: &Value) -> Self {
        Self {
            id: None,
            attributes: config.as_object().cloned().unwrap_or_default(),
        }
    }

    pub fn id(&self) -> Option<&str> {
        self.id.as_deref().filter(|id| !id.is_empty())
    }

    pub fn set_id(&mut self, id: impl Into<String>) {
        self.id = Some(id.into());
    }

    /// Mark the resource as gone.
    pub fn clear_id(&mut self) {
        self.id = None;
    }

    pub fn is_gone(&self) -> bool {
        self.id().is_none()
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.attributes.get(name)
    }

    pub fn get_str(&self, name: &str) -> Option<&str> {
        self.attributes.get(name).and_then(Value::as_str)
    }

    pub fn set(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        self.attributes.insert(name.into(), value.into());
    }

    pub fn attributes(&self) -> &Map<String, Value> {
        &self.attributes
    }
}
