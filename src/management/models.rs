//! Wire models for the subset of the Management API this crate touches.
//!
//! Field names follow the Auth0 JSON representation. Only the attributes the
//! reconcilers read or write are modelled; everything else the API returns is
//! ignored on deserialization.

use serde::{Deserialize, Serialize};

/// An Auth0 connection (identity provider configuration).
///
/// `enabled_clients` is the server-authoritative membership list. The API only
/// accepts it as a whole: there is no element-level add or remove.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Connection {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub strategy: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enabled_clients: Option<Vec<String>>,
}

impl Connection {
    /// Create a connection with the given identity.
    pub fn new(id: impl Into<String>, name: impl Into<String>, strategy: impl Into<String>) -> Self {
        Self {
            id: Some(id.into()),
            name: Some(name.into()),
            strategy: Some(strategy.into()),
            ..Self::default()
        }
    }

    /// Set the enabled clients.
    pub fn with_enabled_clients<I, S>(mut self, clients: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.enabled_clients = Some(clients.into_iter().map(Into::into).collect());
        self
    }

    pub fn id(&self) -> &str {
        self.id.as_deref().unwrap_or_default()
    }

    pub fn name(&self) -> &str {
        self.name.as_deref().unwrap_or_default()
    }

    pub fn strategy(&self) -> &str {
        self.strategy.as_deref().unwrap_or_default()
    }

    /// Enabled clients, treating an absent list as empty.
    pub fn enabled_clients(&self) -> &[String] {
        self.enabled_clients.as_deref().unwrap_or_default()
    }
}

/// Partial update body for `PATCH /connections/{id}`.
///
/// Unset fields are not serialised, so the API leaves them untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConnectionUpdate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enabled_clients: Option<Vec<String>>,
}

impl ConnectionUpdate {
    /// Replace the whole enabled-clients list.
    pub fn enabled_clients(clients: Vec<String>) -> Self {
        Self {
            enabled_clients: Some(clients),
        }
    }
}

/// One page of connections as returned with `include_totals=true`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConnectionList {
    #[serde(default)]
    pub connections: Vec<Connection>,
    #[serde(default)]
    pub start: usize,
    #[serde(default)]
    pub limit: usize,
    #[serde(default)]
    pub total: usize,
}

impl ConnectionList {
    /// Whether another page exists after this one.
    pub fn has_next(&self) -> bool {
        self.total > self.start + self.limit
    }
}

/// Paging and field selection for list calls.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListOptions {
    /// Zero-based page index
    pub page: usize,
    pub per_page: usize,
    /// Fields to include in each item; empty means all fields
    pub fields: Vec<String>,
}

impl Default for ListOptions {
    fn default() -> Self {
        Self {
            page: 0,
            per_page: 50,
            fields: Vec::new(),
        }
    }
}

impl ListOptions {
    pub fn page(mut self, page: usize) -> Self {
        self.page = page;
        self
    }

    pub fn per_page(mut self, per_page: usize) -> Self {
        self.per_page = per_page;
        self
    }

    pub fn include_fields<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.fields = fields.into_iter().map(Into::into).collect();
        self
    }
}

/// The action referenced by a trigger binding.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ActionRef {
    #[serde(default)]
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

/// An action bound to a trigger, as returned by the API.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ActionBinding {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trigger_id: Option<String>,
    #[serde(default)]
    pub display_name: String,
    #[serde(default)]
    pub action: ActionRef,
}

/// The ordered bindings of a trigger.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TriggerBindingList {
    #[serde(default)]
    pub bindings: Vec<ActionBinding>,
    #[serde(default)]
    pub total: usize,
    #[serde(default)]
    pub page: usize,
    #[serde(default)]
    pub per_page: usize,
}

/// How a binding update refers to its action.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BindingRef {
    #[serde(rename = "type")]
    pub ref_type: String,
    pub value: String,
}

/// One element of the whole-list body for `PATCH /actions/triggers/{id}/bindings`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BindingUpdate {
    #[serde(rename = "ref")]
    pub reference: BindingRef,
    pub display_name: String,
}

impl BindingUpdate {
    /// Bind the action with the given ID.
    pub fn action_id(id: impl Into<String>, display_name: impl Into<String>) -> Self {
        Self {
            reference: BindingRef {
                ref_type: "action_id".to_string(),
                value: id.into(),
            },
            display_name: display_name.into(),
        }
    }
}
