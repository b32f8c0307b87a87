//! Transport abstraction over the Auth0 Management API.
//!
//! The `ManagementApi` trait describes the remote calls the reconcilers and
//! resource handlers depend on: whole-object reads, partial updates that
//! replace list attributes wholesale, paged listing and deletes. Backends
//! are pluggable so the reconciliation logic can be exercised against
//! [`InMemoryManagement`] and run in production against
//! [`HttpManagementClient`].
//!
//! # Example Usage
//!
//! ```rust
//! use auth0_provider::management::{
//!     Connection, ConnectionUpdate, InMemoryManagement, ManagementApi,
//! };
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let api = InMemoryManagement::new();
//! api.insert_connection(Connection::new("con_1", "db", "auth0")).await;
//!
//! api.update_connection("con_1", ConnectionUpdate::enabled_clients(vec!["app".into()]))
//!     .await?;
//! let connection = api.read_connection("con_1").await?;
//! assert_eq!(connection.enabled_clients(), ["app"]);
//! # Ok(())
//! # }
//! ```

pub mod auth;
pub mod errors;
pub mod http;
pub mod in_memory;
pub mod models;

pub use auth::{Credentials, ManagementAuth};
pub use errors::ManagementError;
pub use http::HttpManagementClient;
pub use in_memory::{FailurePoint, InMemoryManagement, InMemoryManagementStats};
pub use models::{
    ActionBinding, ActionRef, BindingRef, BindingUpdate, Connection, ConnectionList,
    ConnectionUpdate, ListOptions, TriggerBindingList,
};

use std::future::Future;

/// Remote operations against the Management API.
///
/// # Behavior
///
/// - A missing remote object is reported as [`ManagementError::NotFound`],
///   never as a generic API error.
/// - No call retries internally. Retrying is the caller's decision.
/// - Updates replace list attributes in full; the trait offers no
///   element-level mutation because the API does not.
pub trait ManagementApi: Send + Sync {
    /// Fetch a connection by ID.
    fn read_connection(
        &self,
        id: &str,
    ) -> impl Future<Output = Result<Connection, ManagementError>> + Send;

    /// Apply a partial update to a connection.
    fn update_connection(
        &self,
        id: &str,
        update: ConnectionUpdate,
    ) -> impl Future<Output = Result<Connection, ManagementError>> + Send;

    /// List one page of connections.
    fn list_connections(
        &self,
        options: ListOptions,
    ) -> impl Future<Output = Result<ConnectionList, ManagementError>> + Send;

    /// Delete a connection.
    fn delete_connection(&self, id: &str)
    -> impl Future<Output = Result<(), ManagementError>> + Send;

    /// Fetch the ordered action bindings of a trigger.
    fn trigger_bindings(
        &self,
        trigger_id: &str,
    ) -> impl Future<Output = Result<TriggerBindingList, ManagementError>> + Send;

    /// Replace the action bindings of a trigger with the given ordered list.
    fn update_trigger_bindings(
        &self,
        trigger_id: &str,
        bindings: Vec<BindingUpdate>,
    ) -> impl Future<Output = Result<TriggerBindingList, ManagementError>> + Send;
}
