//! Reconciliation core of an Auth0 infrastructure-as-code provider.
//!
//! Several independently declared resources may each own one element of a
//! list that the Auth0 Management API only accepts as a whole, such as the
//! enabled clients of a connection. This crate serialises the
//! read-modify-write cycles on such lists so that concurrent resource
//! operations never lose each other's updates.
//!
//! # Core Components
//!
//! - [`LockTable`] - Named mutual-exclusion locks keyed by parent ID
//! - [`MembershipReconciler`] - Establish, observe and remove membership facts
//! - [`ManagementApi`] - Trait over the Management API, with HTTP and in-memory backends
//! - [`Auth0Provider`] - Wires a backend to the resource handlers
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use auth0_provider::{Auth0Provider, config::ProviderConfig};
//! use serde_json::json;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = ProviderConfig::from_env()?;
//! let provider = Auth0Provider::from_config(&config)?;
//!
//! let state = provider
//!     .connection_client()
//!     .create(&json!({"connection_id": "con_123", "client_id": "abc"}))
//!     .await?;
//! println!("enabled on {:?}", state.get_str("name"));
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod error;
pub mod lock_table;
pub mod management;
pub mod provider;
pub mod reconcile;
pub mod resources;
pub mod state_upgrade;
pub mod sweep;

pub use error::{Auth0Error, Auth0Result};
pub use lock_table::{LockGuard, LockTable};
pub use management::{HttpManagementClient, InMemoryManagement, ManagementApi, ManagementError};
pub use provider::Auth0Provider;
pub use reconcile::{
    DuplicatePolicy, Membership, MembershipReconciler, ReconcileError, Removal,
};
pub use resources::{ConnectionClientResource, ResourceError, ResourceState, TriggerBindingResource};
