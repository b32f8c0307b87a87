//! Resource lifecycle handlers.
//!
//! Each resource type exposes create/read/(update)/delete/import over a
//! [`ResourceState`] record, validating configuration against its
//! [`ResourceSchema`](schema::ResourceSchema) before touching the API.
//!
//! * [`ConnectionClientResource`] - `auth0_connection_client`, a membership
//!   fact reconciled through the per-connection lock
//! * [`TriggerBindingResource`] - `auth0_trigger_binding`, an ordered
//!   whole-list replacement of a trigger's bound actions

pub mod connection_client;
pub mod errors;
pub mod schema;
pub mod state;
pub mod trigger_binding;

pub use connection_client::ConnectionClientResource;
pub use errors::ResourceError;
pub use schema::{AttributeSchema, ResourceSchema, SchemaError};
pub use state::ResourceState;
pub use trigger_binding::TriggerBindingResource;

use chrono::Utc;

/// A fresh, time-ordered unique resource ID.
pub fn unique_id() -> String {
    format!(
        "{}-{}",
        Utc::now().format("%Y%m%d%H%M%S"),
        uuid::Uuid::new_v4().simple()
    )
}
