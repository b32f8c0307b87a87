//! Provider wiring: one Management API backend, one lock table, and the
//! resource handlers that share them.

use crate::config::{ConfigError, ProviderConfig};
use crate::error::Auth0Result;
use crate::lock_table::LockTable;
use crate::management::{HttpManagementClient, ManagementApi};
use crate::reconcile::{ConnectionClients, DuplicatePolicy, MembershipReconciler};
use crate::resources::{ConnectionClientResource, TriggerBindingResource};
use crate::sweep::{SweepError, SweepReport, is_test_connection, sweep_connections};
use log::info;
use std::sync::Arc;

/// Entry point handing out resource handlers.
///
/// Every handler obtained from the same provider serialises writes through
/// the same [`LockTable`], so two `auth0_connection_client` instances on one
/// connection never overwrite each other's enabled clients.
///
/// ```rust
/// use auth0_provider::Auth0Provider;
/// use auth0_provider::management::{Connection, InMemoryManagement};
/// use serde_json::json;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let api = InMemoryManagement::new();
/// api.insert_connection(Connection::new("con_1", "db", "auth0")).await;
///
/// let provider = Auth0Provider::new(api);
/// let state = provider
///     .connection_client()
///     .create(&json!({"connection_id": "con_1", "client_id": "client_a"}))
///     .await?;
/// assert_eq!(state.get_str("name"), Some("db"));
/// # Ok(())
/// # }
/// ```
pub struct Auth0Provider<M> {
    api: Arc<M>,
    locks: LockTable,
    reconciler: MembershipReconciler<ConnectionClients<M>>,
}

impl<M: ManagementApi + 'static> Auth0Provider<M> {
    pub fn new(api: M) -> Self {
        Self::with_duplicate_policy(api, DuplicatePolicy::default())
    }

    pub fn with_duplicate_policy(api: M, policy: DuplicatePolicy) -> Self {
        let api = Arc::new(api);
        let locks = LockTable::new();
        let reconciler = MembershipReconciler::new(ConnectionClients::new(api.clone()), locks.clone())
            .with_duplicate_policy(policy);
        Self {
            api,
            locks,
            reconciler,
        }
    }

    pub fn api(&self) -> &M {
        &self.api
    }

    pub fn lock_table(&self) -> &LockTable {
        &self.locks
    }

    pub fn connection_client(&self) -> ConnectionClientResource<M> {
        ConnectionClientResource::new(self.reconciler.clone())
    }

    pub fn trigger_binding(&self) -> TriggerBindingResource<M> {
        TriggerBindingResource::new(self.api.clone(), self.locks.clone())
    }

    /// Delete connections left behind by acceptance test runs.
    pub async fn sweep_test_connections(&self) -> Result<SweepReport, SweepError> {
        sweep_connections(self.api.as_ref(), is_test_connection).await
    }

    /// Stop accepting new membership writes.
    pub fn shutdown(&self) {
        self.reconciler.shutdown();
    }
}

impl Auth0Provider<HttpManagementClient> {
    /// Build a provider talking to the tenant described by `config`.
    pub fn from_config(config: &ProviderConfig) -> Auth0Result<Self> {
        config.validate()?;
        let credentials = config
            .credentials
            .clone()
            .ok_or(ConfigError::MissingCredentials)?;
        let client = HttpManagementClient::new(
            config.base_url(),
            credentials,
            config.timeout,
            &config.user_agent,
        )?;
        info!("Configured Management API client for {}", config.domain);
        Ok(Self::with_duplicate_policy(client, config.duplicate_policy))
    }
}

impl<M> std::fmt::Debug for Auth0Provider<M> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Auth0Provider")
            .field("locks", &self.locks)
            .field("reconciler", &self.reconciler)
            .finish()
    }
}
