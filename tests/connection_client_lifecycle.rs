//! End-to-end lifecycle of `auth0_connection_client` against the in-memory
//! Management API: create, read, import, delete, and drift.

mod common;

use auth0_provider::management::{FailurePoint, ManagementError};
use auth0_provider::{Auth0Error, Auth0Provider, ReconcileError, ResourceError};
use common::{connection_client_config, init_logging, seeded_api, sorted};
use serde_json::json;

#[tokio::test]
async fn create_read_delete_roundtrip() {
    init_logging();
    let provider = Auth0Provider::new(seeded_api(&[("con_1", vec!["existing"])]).await);
    let resource = provider.connection_client();

    let mut state = resource
        .create(&connection_client_config("con_1", "client_a"))
        .await
        .unwrap();
    assert!(state.id().is_some());
    assert_eq!(state.get_str("name"), Some("con_1-name"));
    assert_eq!(state.get_str("strategy"), Some("auth0"));
    assert_eq!(
        provider.api().enabled_clients("con_1").await.unwrap(),
        vec!["existing", "client_a"]
    );

    resource.read(&mut state).await.unwrap();
    assert!(!state.is_gone());

    resource.delete(&mut state).await.unwrap();
    assert!(state.is_gone());
    assert_eq!(
        provider.api().enabled_clients("con_1").await.unwrap(),
        vec!["existing"]
    );
}

#[tokio::test]
async fn read_detects_out_of_band_removal() {
    let provider = Auth0Provider::new(seeded_api(&[("con_1", vec![])]).await);
    let resource = provider.connection_client();
    let mut state = resource
        .create(&connection_client_config("con_1", "client_a"))
        .await
        .unwrap();

    // Someone disables the client in the dashboard.
    let other = provider.connection_client();
    let mut other_state = other.import("con_1:client_a").unwrap();
    other.delete(&mut other_state).await.unwrap();

    resource.read(&mut state).await.unwrap();
    assert!(state.is_gone());
}

#[tokio::test]
async fn read_after_connection_deleted_clears_state() {
    let provider = Auth0Provider::new(seeded_api(&[("con_1", vec![])]).await);
    let resource = provider.connection_client();
    let mut state = resource
        .create(&connection_client_config("con_1", "client_a"))
        .await
        .unwrap();

    provider.api().remove_connection("con_1").await;

    resource.read(&mut state).await.unwrap();
    assert!(state.is_gone());
}

#[tokio::test]
async fn delete_after_connection_deleted_succeeds() {
    let provider = Auth0Provider::new(seeded_api(&[("con_1", vec![])]).await);
    let resource = provider.connection_client();
    let mut state = resource
        .create(&connection_client_config("con_1", "client_a"))
        .await
        .unwrap();

    provider.api().remove_connection("con_1").await;

    resource.delete(&mut state).await.unwrap();
    assert!(state.is_gone());
    assert_eq!(provider.api().stats().updates, 1);
}

#[tokio::test]
async fn create_on_missing_connection_fails() {
    let provider = Auth0Provider::new(seeded_api(&[]).await);

    let err = provider
        .connection_client()
        .create(&connection_client_config("con_missing", "client_a"))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        ResourceError::Reconcile(ReconcileError::ParentNotFound { ref parent_id }) if parent_id == "con_missing"
    ));
}

#[tokio::test]
async fn create_rejects_invalid_configuration() {
    let provider = Auth0Provider::new(seeded_api(&[("con_1", vec![])]).await);
    let resource = provider.connection_client();

    let missing = resource.create(&json!({"connection_id": "con_1"})).await;
    assert!(matches!(missing, Err(ResourceError::Schema(_))));

    let computed = resource
        .create(&json!({"connection_id": "con_1", "client_id": "a", "name": "mine"}))
        .await;
    assert!(matches!(computed, Err(ResourceError::Schema(_))));

    assert_eq!(provider.api().stats().reads, 0);
}

#[tokio::test]
async fn import_then_read_fills_computed_attributes() {
    let provider = Auth0Provider::new(seeded_api(&[("con_1", vec!["client_a"])]).await);
    let resource = provider.connection_client();

    let mut state = resource.import("con_1:client_a").unwrap();
    assert_eq!(state.get_str("connection_id"), Some("con_1"));
    assert_eq!(state.get_str("client_id"), Some("client_a"));
    assert_eq!(state.get("name"), None);

    resource.read(&mut state).await.unwrap();
    assert_eq!(state.get_str("name"), Some("con_1-name"));
    assert_eq!(state.get_str("strategy"), Some("auth0"));
}

#[tokio::test]
async fn import_rejects_malformed_ids() {
    let provider = Auth0Provider::new(seeded_api(&[]).await);
    let resource = provider.connection_client();

    let empty = resource.import("").unwrap_err();
    assert_eq!(empty.to_string(), "ID cannot be empty");

    let bad = resource.import("con_1").unwrap_err();
    assert_eq!(
        bad.to_string(),
        "ID must be formated as <connectionID>:<clientID>"
    );
}

#[tokio::test]
async fn transport_errors_surface_unchanged() {
    let provider = Auth0Provider::new(seeded_api(&[("con_1", vec![])]).await);
    provider
        .api()
        .fail_next(
            FailurePoint::UpdateConnection,
            ManagementError::RateLimited {
                retry_after_secs: Some(3),
            },
        )
        .await;

    let err = provider
        .connection_client()
        .create(&connection_client_config("con_1", "client_a"))
        .await
        .unwrap_err();
    let err = Auth0Error::from(err);
    assert!(err.to_string().contains("Rate limited"), "{}", err);
    assert!(provider.api().enabled_clients("con_1").await.unwrap().is_empty());
}

#[tokio::test]
async fn many_resources_on_one_connection_keep_every_client() {
    let provider = Auth0Provider::new(seeded_api(&[("con_1", vec![])]).await);

    let creates = (0..8).map(|i| {
        let resource = provider.connection_client();
        async move {
            resource
                .create(&connection_client_config("con_1", &format!("client_{}", i)))
                .await
        }
    });
    let states = futures::future::join_all(creates).await;
    assert!(states.iter().all(|s| s.as_ref().is_ok_and(|s| !s.is_gone())));

    let expected: Vec<String> = (0..8).map(|i| format!("client_{}", i)).collect();
    assert_eq!(
        sorted(provider.api().enabled_clients("con_1").await.unwrap()),
        expected
    );
}
