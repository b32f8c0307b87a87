//! Shared helpers for the integration tests.

#![allow(dead_code)]

use auth0_provider::management::{Connection, InMemoryManagement};
use serde_json::{Value, json};
use std::time::Duration;

/// Route `log` output through the test harness. Safe to call repeatedly.
pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// An in-memory tenant holding the given connections and their enabled clients.
pub async fn seeded_api(connections: &[(&str, Vec<&str>)]) -> InMemoryManagement {
    let api = InMemoryManagement::new();
    seed(&api, connections).await;
    api
}

/// Like [`seeded_api`], but every read and update takes `latency`, widening
/// the window in which unsynchronised cycles would interleave.
pub async fn slow_api(connections: &[(&str, Vec<&str>)], latency: Duration) -> InMemoryManagement {
    let api = InMemoryManagement::new().with_latency(latency);
    seed(&api, connections).await;
    api
}

async fn seed(api: &InMemoryManagement, connections: &[(&str, Vec<&str>)]) {
    for (id, clients) in connections {
        api.insert_connection(
            Connection::new(*id, format!("{}-name", id), "auth0")
                .with_enabled_clients(clients.iter().copied()),
        )
        .await;
    }
}

pub fn connection_client_config(connection_id: &str, client_id: &str) -> Value {
    json!({
        "connection_id": connection_id,
        "client_id": client_id,
    })
}

pub fn sorted(mut items: Vec<String>) -> Vec<String> {
    items.sort();
    items
}
