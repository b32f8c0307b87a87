//! Management API authentication: static API token or client credentials.

use crate::management::ManagementError;
use chrono::{DateTime, Duration, Utc};
use log::debug;
use reqwest::RequestBuilder;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::RwLock;

/// Tokens are refreshed this long before Auth0 says they expire.
const EXPIRY_MARGIN_SECS: i64 = 30;

/// Credentials used to obtain a Management API bearer token.
///
/// The [`Debug`] impl redacts tokens and secrets.
#[derive(Clone, PartialEq, Eq)]
pub enum Credentials {
    /// A pre-issued Management API token.
    ApiToken(String),

    /// OAuth2 client credentials grant against the tenant's token endpoint.
    ClientCredentials {
        client_id: String,
        client_secret: String,
        /// Defaults to `https://{domain}/api/v2/`
        audience: Option<String>,
    },
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ApiToken(_) => f.debug_tuple("ApiToken").field(&"[REDACTED]").finish(),
            Self::ClientCredentials {
                client_id,
                audience,
                ..
            } => f
                .debug_struct("ClientCredentials")
                .field("client_id", client_id)
                .field("client_secret", &"[REDACTED]")
                .field("audience", audience)
                .finish(),
        }
    }
}

#[derive(Debug, Serialize)]
struct TokenRequest<'a> {
    grant_type: &'static str,
    client_id: &'a str,
    client_secret: &'a str,
    audience: &'a str,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    expires_in: Option<i64>,
}

#[derive(Debug, Clone)]
struct CachedToken {
    access_token: String,
    expires_at: Option<DateTime<Utc>>,
}

impl CachedToken {
    fn is_expired(&self) -> bool {
        self.expires_at.is_some_and(|exp| Utc::now() >= exp)
    }
}

/// Produces bearer tokens for Management API requests.
///
/// Client-credential tokens are cached (shared across clones) until shortly
/// before they expire, or until [`invalidate_cache`](Self::invalidate_cache)
/// is called after a 401.
#[derive(Debug, Clone)]
pub struct ManagementAuth {
    credentials: Credentials,
    base_url: String,
    cached_token: Arc<RwLock<Option<CachedToken>>>,
    http_client: reqwest::Client,
}

impl ManagementAuth {
    /// Create an auth handler for the tenant served at `base_url`
    /// (e.g. `https://example.eu.auth0.com`).
    pub fn new(credentials: Credentials, base_url: impl Into<String>, http_client: reqwest::Client) -> Self {
        Self {
            credentials,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            cached_token: Arc::new(RwLock::new(None)),
            http_client,
        }
    }

    /// Audience requested for client-credential tokens.
    pub fn audience(&self) -> String {
        match &self.credentials {
            Credentials::ClientCredentials {
                audience: Some(audience),
                ..
            } => audience.clone(),
            _ => format!("{}/api/v2/", self.base_url),
        }
    }

    /// Get the bearer token to use for the next request.
    pub async fn bearer_token(&self) -> Result<String, ManagementError> {
        let (client_id, client_secret) = match &self.credentials {
            Credentials::ApiToken(token) => return Ok(token.clone()),
            Credentials::ClientCredentials {
                client_id,
                client_secret,
                ..
            } => (client_id, client_secret),
        };

        if let Some(cached) = self.cached_token.read().await.as_ref() {
            if !cached.is_expired() {
                return Ok(cached.access_token.clone());
            }
        }

        let token_url = format!("{}/oauth/token", self.base_url);
        let audience = self.audience();
        debug!("Requesting Management API token from {}", token_url);

        let response = self
            .http_client
            .post(&token_url)
            .json(&TokenRequest {
                grant_type: "client_credentials",
                client_id,
                client_secret,
                audience: &audience,
            })
            .send()
            .await
            .map_err(|e| ManagementError::Unauthorized(format!("Token request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "<no body>".to_string());
            return Err(ManagementError::Unauthorized(format!(
                "Token endpoint returned {}: {}",
                status, body
            )));
        }

        let token: TokenResponse = response.json().await.map_err(|e| {
            ManagementError::Unauthorized(format!("Failed to parse token response: {}", e))
        })?;

        let expires_at = expiry_from(token.expires_in, Utc::now());

        *self.cached_token.write().await = Some(CachedToken {
            access_token: token.access_token.clone(),
            expires_at,
        });

        Ok(token.access_token)
    }

    /// Attach the bearer token to a request.
    pub async fn apply(&self, builder: RequestBuilder) -> Result<RequestBuilder, ManagementError> {
        let token = self.bearer_token().await?;
        Ok(builder.bearer_auth(token))
    }

    /// Drop any cached token so the next request fetches a fresh one.
    pub async fn invalidate_cache(&self) {
        *self.cached_token.write().await = None;
    }
}

/// Absolute expiry for a token issued at `now`, minus the refresh margin.
/// A lifetime too large to represent is treated as no expiry.
fn expiry_from(expires_in: Option<i64>, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
    let secs = expires_in?.saturating_sub(EXPIRY_MARGIN_SECS).max(0);
    Duration::try_seconds(secs).and_then(|lifetime| now.checked_add_signed(lifetime))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_debug_redacts_secrets() {
        let creds = Credentials::ClientCredentials {
            client_id: "abc".to_string(),
            client_secret: "super-secret".to_string(),
            audience: None,
        };
        let rendered = format!("{:?}", creds);
        assert!(rendered.contains("abc"));
        assert!(!rendered.contains("super-secret"));

        let token = format!("{:?}", Credentials::ApiToken("eyJhbGciOi".to_string()));
        assert!(!token.contains("eyJhbGciOi"));
    }

    #[test]
    fn test_default_audience_is_management_api() {
        let auth = ManagementAuth::new(
            Credentials::ClientCredentials {
                client_id: "id".to_string(),
                client_secret: "secret".to_string(),
                audience: None,
            },
            "https://tenant.auth0.com/",
            reqwest::Client::new(),
        );
        assert_eq!(auth.audience(), "https://tenant.auth0.com/api/v2/");
    }

    #[tokio::test]
    async fn test_api_token_is_returned_verbatim() {
        let auth = ManagementAuth::new(
            Credentials::ApiToken("static-token".to_string()),
            "https://tenant.auth0.com",
            reqwest::Client::new(),
        );
        assert_eq!(auth.bearer_token().await.unwrap(), "static-token");
    }

    #[test]
    fn test_cached_token_expiry() {
        let fresh = CachedToken {
            access_token: "t".to_string(),
            expires_at: Some(Utc::now() + Duration::seconds(60)),
        };
        assert!(!fresh.is_expired());

        let stale = CachedToken {
            expires_at: Some(Utc::now() - Duration::seconds(1)),
            ..fresh.clone()
        };
        assert!(stale.is_expired());

        let forever = CachedToken {
            expires_at: None,
            ..fresh
        };
        assert!(!forever.is_expired());
    }

    #[test]
    fn test_expiry_keeps_refresh_margin() {
        let now = Utc::now();
        assert_eq!(expiry_from(Some(86400), now), Some(now + Duration::seconds(86370)));
        assert_eq!(expiry_from(Some(10), now), Some(now));
        assert_eq!(expiry_from(None, now), None);
    }

    #[test]
    fn test_unrepresentable_lifetime_never_expires() {
        let now = Utc::now();
        assert_eq!(expiry_from(Some(i64::MAX), now), None);
        assert_eq!(expiry_from(Some(i64::MIN), now), Some(now));
        assert_eq!(expiry_from(Some(i64::MAX / 1000), now), None);
    }
}
