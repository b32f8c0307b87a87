//! Management API HTTP client (reqwest-based).
//!
//! Maps the [`ManagementApi`] operations onto `https://{domain}/api/v2`
//! endpoints and translates HTTP failures into [`ManagementError`] so that a
//! 404 stays distinguishable from every other failure.

use crate::management::{
    BindingUpdate, Connection, ConnectionList, ConnectionUpdate, ListOptions, ManagementApi,
    ManagementAuth, ManagementError, TriggerBindingList,
};
use log::{debug, warn};
use reqwest::{Client, Method, StatusCode, Url};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::time::Duration;

/// HTTP client for the Auth0 Management API v2.
#[derive(Debug, Clone)]
pub struct HttpManagementClient {
    /// Tenant base URL, e.g. `https://example.eu.auth0.com`
    base_url: String,
    auth: ManagementAuth,
    http_client: Client,
}

#[derive(Serialize)]
struct BindingsBody {
    bindings: Vec<BindingUpdate>,
}

impl HttpManagementClient {
    /// Create a client with its own connection pool.
    pub fn new(
        base_url: impl Into<String>,
        credentials: crate::management::Credentials,
        timeout: Duration,
        user_agent: &str,
    ) -> Result<Self, ManagementError> {
        let http_client = Client::builder()
            .timeout(timeout)
            .user_agent(user_agent)
            .build()
            .map_err(|e| {
                ManagementError::Configuration(format!("Failed to build HTTP client: {}", e))
            })?;
        let base_url = base_url.into().trim_end_matches('/').to_string();
        let auth = ManagementAuth::new(credentials, base_url.clone(), http_client.clone());

        Ok(Self {
            base_url,
            auth,
            http_client,
        })
    }

    /// Create a client around a pre-built `reqwest::Client` (for testing).
    pub fn with_http_client(base_url: impl Into<String>, auth: ManagementAuth, http_client: Client) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            auth,
            http_client,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Builds `{base_url}/api/v2/{segments...}`, percent-encoding each segment
    /// so an id can never address a different path.
    fn url(&self, segments: &[&str]) -> Result<Url, ManagementError> {
        // `extend` drops "." and ".." rather than encoding them.
        if let Some(bad) = segments.iter().find(|s| matches!(**s, "" | "." | "..")) {
            return Err(ManagementError::Configuration(format!(
                "Invalid path segment '{}'",
                bad
            )));
        }
        let mut url = Url::parse(&self.base_url).map_err(|e| {
            ManagementError::Configuration(format!("Invalid base URL '{}': {}", self.base_url, e))
        })?;
        url.path_segments_mut()
            .map_err(|_| {
                ManagementError::Configuration(format!(
                    "Base URL '{}' cannot carry a path",
                    self.base_url
                ))
            })?
            .pop_if_empty()
            .extend(["api", "v2"])
            .extend(segments);
        Ok(url)
    }

    async fn send<T, B>(
        &self,
        method: Method,
        segments: &[&str],
        query: &[(&str, String)],
        body: Option<&B>,
        not_found: (&str, &str),
    ) -> Result<T, ManagementError>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        let url = self.url(segments)?;
        debug!("{} {}", method, url);

        let mut builder = self.http_client.request(method, url);
        if !query.is_empty() {
            builder = builder.query(query);
        }
        if let Some(body) = body {
            builder = builder.json(body);
        }
        let response = self.auth.apply(builder).await?.send().await?;

        let status = response.status();
        if status.is_success() {
            if status == StatusCode::NO_CONTENT {
                return serde_json::from_str("null").map_err(ManagementError::from);
            }
            let text = response.text().await?;
            let text = if text.trim().is_empty() { "null" } else { text.as_str() };
            return serde_json::from_str(text).map_err(|e| {
                ManagementError::Serialization(format!("Failed to parse response: {}", e))
            });
        }

        self.error_from_response(response, not_found).await
    }

    async fn error_from_response<T>(
        &self,
        response: reqwest::Response,
        (resource, id): (&str, &str),
    ) -> Result<T, ManagementError> {
        let status = response.status();
        let retry_after = response
            .headers()
            .get("Retry-After")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.parse::<u64>().ok());
        let body = response
            .text()
            .await
            .unwrap_or_else(|_| "<no body>".to_string());

        match status {
            StatusCode::NOT_FOUND => Err(ManagementError::not_found(resource, id)),
            StatusCode::TOO_MANY_REQUESTS => {
                warn!("Management API rate limited, retry after {:?}s", retry_after);
                Err(ManagementError::RateLimited {
                    retry_after_secs: retry_after,
                })
            }
            StatusCode::UNAUTHORIZED => {
                self.auth.invalidate_cache().await;
                Err(ManagementError::Unauthorized(format!(
                    "Authentication failed (401): {}",
                    body
                )))
            }
            _ => Err(ManagementError::Api {
                status: status.as_u16(),
                message: if body.is_empty() {
                    format!("HTTP {}", status)
                } else {
                    body
                },
            }),
        }
    }
}

impl ManagementApi for HttpManagementClient {
    async fn read_connection(&self, id: &str) -> Result<Connection, ManagementError> {
        self.send::<_, ()>(
            Method::GET,
            &["connections", id],
            &[],
            None,
            ("connection", id),
        )
        .await
    }

    async fn update_connection(
        &self,
        id: &str,
        update: ConnectionUpdate,
    ) -> Result<Connection, ManagementError> {
        self.send(
            Method::PATCH,
            &["connections", id],
            &[],
            Some(&update),
            ("connection", id),
        )
        .await
    }

    async fn list_connections(
        &self,
        options: ListOptions,
    ) -> Result<ConnectionList, ManagementError> {
        let mut query = vec![
            ("page", options.page.to_string()),
            ("per_page", options.per_page.to_string()),
            ("include_totals", "true".to_string()),
        ];
        if !options.fields.is_empty() {
            query.push(("fields", options.fields.join(",")));
            query.push(("include_fields", "true".to_string()));
        }

        self.send::<_, ()>(Method::GET, &["connections"], &query, None, ("connections", ""))
            .await
    }

    async fn delete_connection(&self, id: &str) -> Result<(), ManagementError> {
        let _: serde_json::Value = self
            .send::<_, ()>(
                Method::DELETE,
                &["connections", id],
                &[],
                None,
                ("connection", id),
            )
            .await?;
        Ok(())
    }

    async fn trigger_bindings(
        &self,
        trigger_id: &str,
    ) -> Result<TriggerBindingList, ManagementError> {
        self.send::<_, ()>(
            Method::GET,
            &["actions", "triggers", trigger_id, "bindings"],
            &[],
            None,
            ("trigger", trigger_id),
        )
        .await
    }

    async fn update_trigger_bindings(
        &self,
        trigger_id: &str,
        bindings: Vec<BindingUpdate>,
    ) -> Result<TriggerBindingList, ManagementError> {
        self.send(
            Method::PATCH,
            &["actions", "triggers", trigger_id, "bindings"],
            &[],
            Some(&BindingsBody { bindings }),
            ("trigger", trigger_id),
        )
        .await
    }
}
