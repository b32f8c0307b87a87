//! The `auth0_connection_client` resource.
//!
//! Each instance declares that one client is enabled on one connection. Many
//! instances can point at the same connection, and the API only accepts the
//! connection's `enabled_clients` as a whole list, so every change goes through
//! the [`MembershipReconciler`] and its per-connection lock.

use crate::management::{Connection, ManagementApi};
use crate::reconcile::{ConnectionClients, Membership, MembershipReconciler, Removal};
use crate::resources::schema::{AttributeSchema, ResourceSchema, SchemaError};
use crate::resources::{ResourceError, ResourceState, unique_id};
use log::{debug, info};
use serde_json::Value;

pub const TYPE_NAME: &str = "auth0_connection_client";

/// Schema of `auth0_connection_client`.
pub fn schema() -> ResourceSchema {
    ResourceSchema::new(
        TYPE_NAME,
        "With this resource, you can manage enabled clients on a connection.",
    )
    .attribute(
        AttributeSchema::string("connection_id")
            .required()
            .force_new()
            .description("ID of the connection on which to enable the client."),
    )
    .attribute(
        AttributeSchema::string("client_id")
            .required()
            .force_new()
            .description("ID of the client for which the connection is enabled."),
    )
    .attribute(
        AttributeSchema::string("name")
            .computed()
            .description("The name of the connection on which to enable the client."),
    )
    .attribute(
        AttributeSchema::string("strategy")
            .computed()
            .description("The strategy of the connection on which to enable the client."),
    )
}

/// Lifecycle handlers for `auth0_connection_client`.
pub struct ConnectionClientResource<M> {
    reconciler: MembershipReconciler<ConnectionClients<M>>,
    schema: ResourceSchema,
}

impl<M: ManagementApi + 'static> ConnectionClientResource<M> {
    pub fn new(reconciler: MembershipReconciler<ConnectionClients<M>>) -> Self {
        Self {
            reconciler,
            schema: schema(),
        }
    }

    pub fn schema(&self) -> &ResourceSchema {
        &self.schema
    }

    /// Enable the configured client on the configured connection.
    pub async fn create(&self, config: &Value) -> Result<ResourceState, ResourceError> {
        self.schema.validate(config)?;
        let mut state = ResourceState::from_config(config);
        let (connection_id, client_id) = Self::identity(&state)?;

        let membership = self.reconciler.establish(&connection_id, &client_id).await?;
        state.set_id(unique_id());
        Self::apply_membership(&mut state, membership);

        info!(
            "Created {} for client '{}' on connection '{}'",
            TYPE_NAME, client_id, connection_id
        );
        Ok(state)
    }

    /// Refresh `state` from the connection, clearing the ID if the client is
    /// no longer enabled or the connection is gone.
    pub async fn read(&self, state: &mut ResourceState) -> Result<(), ResourceError> {
        let (connection_id, client_id) = Self::identity(state)?;
        let membership = self.reconciler.observe(&connection_id, &client_id).await?;
        Self::apply_membership(state, membership);
        Ok(())
    }

    /// Disable the client on the connection.
    pub async fn delete(&self, state: &mut ResourceState) -> Result<(), ResourceError> {
        let (connection_id, client_id) = Self::identity(state)?;
        match self.reconciler.remove(&connection_id, &client_id).await? {
            Removal::Removed => info!(
                "Removed client '{}' from connection '{}'",
                client_id, connection_id
            ),
            Removal::AlreadyGone => debug!(
                "Connection '{}' already gone, nothing to remove",
                connection_id
            ),
        }
        state.clear_id();
        Ok(())
    }

    /// Build state from an import ID of the form `<connectionID>:<clientID>`.
    ///
    /// The returned state still needs a [`read`](Self::read) to fill in the
    /// computed attributes.
    pub fn import(&self, id: &str) -> Result<ResourceState, ResourceError> {
        let (connection_id, client_id) = parse_import_id(id)?;
        let mut state = ResourceState::new();
        state.set("connection_id", connection_id);
        state.set("client_id", client_id);
        state.set_id(unique_id());
        Ok(state)
    }

    fn identity(state: &ResourceState) -> Result<(String, String), ResourceError> {
        let get = |name: &str| {
            state
                .get_str(name)
                .filter(|v| !v.is_empty())
                .map(str::to_string)
                .ok_or_else(|| SchemaError::MissingRequired {
                    attribute: name.to_string(),
                })
        };
        Ok((get("connection_id")?, get("client_id")?))
    }

    fn apply_membership(state: &mut ResourceState, membership: Membership<Connection>) {
        match membership {
            Membership::Present(connection) => {
                state.set("name", connection.name());
                state.set("strategy", connection.strategy());
            }
            Membership::Absent => state.clear_id(),
        }
    }
}

/// Split `<connectionID>:<clientID>`.
pub fn parse_import_id(id: &str) -> Result<(&str, &str), ResourceError> {
    if id.is_empty() {
        return Err(ResourceError::EmptyImportId);
    }
    match id.split(':').collect::<Vec<_>>().as_slice() {
        [connection_id, client_id] if !connection_id.is_empty() && !client_id.is_empty() => {
            Ok((*connection_id, *client_id))
        }
        _ => Err(ResourceError::InvalidImportId { id: id.to_string() }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_import_id() {
        assert_eq!(parse_import_id("con_1:client_a").unwrap(), ("con_1", "client_a"));
        assert!(matches!(parse_import_id(""), Err(ResourceError::EmptyImportId)));

        for bad in ["con_1", "con_1:", ":client_a", "a:b:c"] {
            let err = parse_import_id(bad).unwrap_err();
            assert_eq!(
                err.to_string(),
                "ID must be formated as <connectionID>:<clientID>",
                "input {:?}",
                bad
            );
        }
    }

    #[test]
    fn test_schema_shape() {
        let schema = schema();
        assert!(schema.get("connection_id").unwrap().force_new);
        assert!(schema.get("client_id").unwrap().required);
        assert!(schema.get("name").unwrap().is_computed_only());
        assert!(schema.get("strategy").unwrap().is_computed_only());
    }
}
