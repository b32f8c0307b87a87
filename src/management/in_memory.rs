//! In-memory Management API backend.
//!
//! This module provides a thread-safe stand-in for the Auth0 Management API
//! using HashMap and RwLock. It keeps the same observable contract as the HTTP
//! client: whole-object reads, whole-list replacement on update, Auth0's
//! `start/limit/total` paging envelope and distinguishable not-found errors.
//!
//! # Features
//!
//! * Thread-safe concurrent access with async RwLock
//! * Optional artificial latency to widen read-modify-write race windows
//! * One-shot failure injection per operation
//! * Operation counters for asserting how many remote calls were made
//!
//! # Example Usage
//!
//! ```rust
//! use auth0_provider::management::{Connection, InMemoryManagement, ManagementApi};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let api = InMemoryManagement::new();
//! api.insert_connection(Connection::new("con_1", "Test DB", "auth0")).await;
//!
//! let connection = api.read_connection("con_1").await?;
//! assert_eq!(connection.name(), "Test DB");
//! assert_eq!(api.stats().reads, 1);
//! # Ok(())
//! # }
//! ```

use crate::management::{
    ActionBinding, ActionRef, BindingUpdate, Connection, ConnectionList, ConnectionUpdate,
    ListOptions, ManagementApi, ManagementError, TriggerBindingList,
};
use log::trace;
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tokio::sync::RwLock;

/// Operations that can be made to fail on their next invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailurePoint {
    ReadConnection,
    UpdateConnection,
    ListConnections,
    DeleteConnection,
    ReadBindings,
    UpdateBindings,
}

#[derive(Debug, Default)]
struct Inner {
    connections: HashMap<String, Connection>,
    // trigger_id -> ordered bindings
    triggers: HashMap<String, Vec<ActionBinding>>,
    // action_id -> action name, used to fill in binding responses
    actions: HashMap<String, String>,
    failures: HashMap<FailurePoint, ManagementError>,
}

#[derive(Debug, Default)]
struct Counters {
    reads: AtomicUsize,
    updates: AtomicUsize,
    lists: AtomicUsize,
    deletes: AtomicUsize,
}

/// Thread-safe in-memory Management API.
///
/// Clones share the same underlying data.
#[derive(Debug, Clone, Default)]
pub struct InMemoryManagement {
    inner: Arc<RwLock<Inner>>,
    counters: Arc<Counters>,
    latency: Option<Duration>,
}

impl InMemoryManagement {
    /// Create a new empty backend.
    pub fn new() -> Self {
        Self::default()
    }

    /// Delay every read and update by `latency`.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    /// Insert or replace a connection. The connection must carry an ID.
    pub async fn insert_connection(&self, connection: Connection) {
        let id = connection.id().to_string();
        self.inner.write().await.connections.insert(id, connection);
    }

    /// Remove a connection out-of-band, bypassing counters and failures.
    pub async fn remove_connection(&self, id: &str) -> Option<Connection> {
        self.inner.write().await.connections.remove(id)
    }

    /// Current enabled clients of a connection, without counting a read.
    pub async fn enabled_clients(&self, id: &str) -> Option<Vec<String>> {
        self.inner
            .read()
            .await
            .connections
            .get(id)
            .map(|c| c.enabled_clients().to_vec())
    }

    /// Make a trigger known so its bindings can be read and replaced.
    pub async fn register_trigger(&self, trigger_id: impl Into<String>) {
        self.inner
            .write()
            .await
            .triggers
            .entry(trigger_id.into())
            .or_default();
    }

    /// Make an action known so bindings can reference it by ID.
    pub async fn register_action(&self, id: impl Into<String>, name: impl Into<String>) {
        self.inner
            .write()
            .await
            .actions
            .insert(id.into(), name.into());
    }

    /// Make the next call at `point` fail with `error`.
    pub async fn fail_next(&self, point: FailurePoint, error: ManagementError) {
        self.inner.write().await.failures.insert(point, error);
    }

    /// Snapshot of the operation counters.
    pub fn stats(&self) -> InMemoryManagementStats {
        InMemoryManagementStats {
            reads: self.counters.reads.load(Ordering::SeqCst),
            updates: self.counters.updates.load(Ordering::SeqCst),
            lists: self.counters.lists.load(Ordering::SeqCst),
            deletes: self.counters.deletes.load(Ordering::SeqCst),
        }
    }

    async fn simulate_latency(&self) {
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }
    }

    async fn take_failure(&self, point: FailurePoint) -> Result<(), ManagementError> {
        match self.inner.write().await.failures.remove(&point) {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    fn project_fields(connection: &Connection, fields: &[String]) -> Connection {
        if fields.is_empty() {
            return connection.clone();
        }
        let keep = |name: &str| fields.iter().any(|f| f == name);
        Connection {
            id: connection.id.clone().filter(|_| keep("id")),
            name: connection.name.clone().filter(|_| keep("name")),
            display_name: connection.display_name.clone().filter(|_| keep("display_name")),
            strategy: connection.strategy.clone().filter(|_| keep("strategy")),
            enabled_clients: connection
                .enabled_clients
                .clone()
                .filter(|_| keep("enabled_clients")),
        }
    }
}

impl ManagementApi for InMemoryManagement {
    async fn read_connection(&self, id: &str) -> Result<Connection, ManagementError> {
        self.counters.reads.fetch_add(1, Ordering::SeqCst);
        self.take_failure(FailurePoint::ReadConnection).await?;

        let connection = self
            .inner
            .read()
            .await
            .connections
            .get(id)
            .cloned()
            .ok_or_else(|| ManagementError::not_found("connection", id))?;

        self.simulate_latency().await;
        trace!("In-memory read of connection '{}'", id);
        Ok(connection)
    }

    async fn update_connection(
        &self,
        id: &str,
        update: ConnectionUpdate,
    ) -> Result<Connection, ManagementError> {
        self.counters.updates.fetch_add(1, Ordering::SeqCst);
        self.take_failure(FailurePoint::UpdateConnection).await?;
        self.simulate_latency().await;

        let mut inner = self.inner.write().await;
        let connection = inner
            .connections
            .get_mut(id)
            .ok_or_else(|| ManagementError::not_found("connection", id))?;

        if let Some(clients) = update.enabled_clients {
            connection.enabled_clients = Some(clients);
        }
        trace!("In-memory update of connection '{}'", id);
        Ok(connection.clone())
    }

    async fn list_connections(
        &self,
        options: ListOptions,
    ) -> Result<ConnectionList, ManagementError> {
        self.counters.lists.fetch_add(1, Ordering::SeqCst);
        self.take_failure(FailurePoint::ListConnections).await?;

        let inner = self.inner.read().await;
        let mut ids: Vec<&String> = inner.connections.keys().collect();
        ids.sort();

        let start = options.page * options.per_page;
        let connections = ids
            .into_iter()
            .skip(start)
            .take(options.per_page)
            .filter_map(|id| inner.connections.get(id))
            .map(|c| Self::project_fields(c, &options.fields))
            .collect();

        Ok(ConnectionList {
            connections,
            start,
            limit: options.per_page,
            total: inner.connections.len(),
        })
    }

    async fn delete_connection(&self, id: &str) -> Result<(), ManagementError> {
        self.counters.deletes.fetch_add(1, Ordering::SeqCst);
        self.take_failure(FailurePoint::DeleteConnection).await?;

        self.inner
            .write()
            .await
            .connections
            .remove(id)
            .map(|_| ())
            .ok_or_else(|| ManagementError::not_found("connection", id))
    }

    async fn trigger_bindings(
        &self,
        trigger_id: &str,
    ) -> Result<TriggerBindingList, ManagementError> {
        self.counters.reads.fetch_add(1, Ordering::SeqCst);
        self.take_failure(FailurePoint::ReadBindings).await?;

        let inner = self.inner.read().await;
        let bindings = inner
            .triggers
            .get(trigger_id)
            .cloned()
            .ok_or_else(|| ManagementError::not_found("trigger", trigger_id))?;

        Ok(TriggerBindingList {
            total: bindings.len(),
            page: 0,
            per_page: bindings.len(),
            bindings,
        })
    }

    async fn update_trigger_bindings(
        &self,
        trigger_id: &str,
        bindings: Vec<BindingUpdate>,
    ) -> Result<TriggerBindingList, ManagementError> {
        self.counters.updates.fetch_add(1, Ordering::SeqCst);
        self.take_failure(FailurePoint::UpdateBindings).await?;
        self.simulate_latency().await;

        let mut inner = self.inner.write().await;
        if !inner.triggers.contains_key(trigger_id) {
            return Err(ManagementError::not_found("trigger", trigger_id));
        }

        let mut stored = Vec::with_capacity(bindings.len());
        for update in bindings {
            let action_id = update.reference.value;
            let name = inner.actions.get(&action_id).cloned().ok_or_else(|| {
                ManagementError::Api {
                    status: 400,
                    message: format!("action '{}' does not exist", action_id),
                }
            })?;
            stored.push(ActionBinding {
                id: Some(uuid::Uuid::new_v4().to_string()),
                trigger_id: Some(trigger_id.to_string()),
                display_name: update.display_name,
                action: ActionRef {
                    id: action_id,
                    name: Some(name),
                },
            });
        }
        inner.triggers.insert(trigger_id.to_string(), stored.clone());

        Ok(TriggerBindingList {
            total: stored.len(),
            page: 0,
            per_page: stored.len(),
            bindings: stored,
        })
    }
}

/// Counters of calls made against an [`InMemoryManagement`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct InMemoryManagementStats {
    /// Connection and binding reads
    pub reads: usize,
    /// Connection and binding updates
    pub updates: usize,
    pub lists: usize,
    pub deletes: usize,
}
