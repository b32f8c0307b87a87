//! Provider configuration.
//!
//! Configuration is either assembled with [`ProviderConfigBuilder`] or read
//! from the same environment variables the Terraform provider honours:
//!
//! | Variable               | Meaning                                   |
//! |------------------------|-------------------------------------------|
//! | `AUTH0_DOMAIN`         | Tenant domain, e.g. `example.eu.auth0.com` |
//! | `AUTH0_API_TOKEN`      | Static Management API token               |
//! | `AUTH0_CLIENT_ID`      | Client ID for the client credentials grant |
//! | `AUTH0_CLIENT_SECRET`  | Client secret for the same grant          |
//! | `AUTH0_AUDIENCE`       | Optional audience override                |
//! | `AUTH0_TIMEOUT_SECS`   | Request timeout in seconds                |
//!
//! A static API token takes precedence over client credentials.

use crate::management::Credentials;
use crate::reconcile::DuplicatePolicy;
use std::time::Duration;
use thiserror::Error;

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Errors raised while loading or validating configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("Domain cannot be empty")]
    EmptyDomain,

    #[error("Domain '{0}' must not include a scheme")]
    DomainWithScheme(String),

    #[error("Either an API token or a client ID and client secret must be configured")]
    MissingCredentials,

    #[error("Invalid value '{value}' for {name}")]
    InvalidValue { name: String, value: String },
}

/// Settings used to build a provider against a live tenant.
#[derive(Debug, Clone)]
pub struct ProviderConfig {
    pub domain: String,
    pub credentials: Option<Credentials>,
    pub timeout: Duration,
    pub user_agent: String,
    pub duplicate_policy: DuplicatePolicy,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            domain: String::new(),
            credentials: None,
            timeout: DEFAULT_TIMEOUT,
            user_agent: default_user_agent(),
            duplicate_policy: DuplicatePolicy::default(),
        }
    }
}

fn default_user_agent() -> String {
    format!("{}/{}", env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION"))
}

impl ProviderConfig {
    /// Read configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Read configuration through `lookup`, treating empty values as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str| lookup(name).filter(|v| !v.is_empty());

        let mut builder = ProviderConfigBuilder::new(var("AUTH0_DOMAIN").unwrap_or_default());

        if let Some(token) = var("AUTH0_API_TOKEN") {
            builder = builder.with_api_token(token);
        } else if let (Some(id), Some(secret)) = (var("AUTH0_CLIENT_ID"), var("AUTH0_CLIENT_SECRET")) {
            builder = builder.with_client_credentials(id, secret, var("AUTH0_AUDIENCE"));
        }

        if let Some(raw) = var("AUTH0_TIMEOUT_SECS") {
            let secs = raw.parse::<u64>().map_err(|_| ConfigError::InvalidValue {
                name: "AUTH0_TIMEOUT_SECS".to_string(),
                value: raw.clone(),
            })?;
            builder = builder.with_timeout(Duration::from_secs(secs));
        }

        builder.build()
    }

    /// Tenant base URL.
    pub fn base_url(&self) -> String {
        format!("https://{}", self.domain)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.domain.trim().is_empty() {
            return Err(ConfigError::EmptyDomain);
        }
        if self.domain.contains("://") {
            return Err(ConfigError::DomainWithScheme(self.domain.clone()));
        }
        match &self.credentials {
            None => Err(ConfigError::MissingCredentials),
            Some(Credentials::ApiToken(token)) if token.is_empty() => {
                Err(ConfigError::MissingCredentials)
            }
            Some(Credentials::ClientCredentials {
                client_id,
                client_secret,
                ..
            }) if client_id.is_empty() || client_secret.is_empty() => {
                Err(ConfigError::MissingCredentials)
            }
            Some(_) => Ok(()),
        }
    }
}

/// Fluent builder for [`ProviderConfig`].
///
/// ```rust
/// use auth0_provider::config::ProviderConfigBuilder;
///
/// let config = ProviderConfigBuilder::new("example.eu.auth0.com")
///     .with_api_token("token")
///     .build()
///     .unwrap();
/// assert_eq!(config.base_url(), "https://example.eu.auth0.com");
/// ```
#[derive(Debug, Clone)]
pub struct ProviderConfigBuilder {
    config: ProviderConfig,
}

impl ProviderConfigBuilder {
    pub fn new(domain: impl Into<String>) -> Self {
        Self {
            config: ProviderConfig {
                domain: domain.into(),
                ..ProviderConfig::default()
            },
        }
    }

    pub fn with_api_token(mut self, token: impl Into<String>) -> Self {
        self.config.credentials = Some(Credentials::ApiToken(token.into()));
        self
    }

    pub fn with_client_credentials(
        mut self,
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
        audience: Option<String>,
    ) -> Self {
        self.config.credentials = Some(Credentials::ClientCredentials {
            client_id: client_id.into(),
            client_secret: client_secret.into(),
            audience,
        });
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.config.timeout = timeout;
        self
    }

    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.config.user_agent = user_agent.into();
        self
    }

    pub fn with_duplicate_policy(mut self, policy: DuplicatePolicy) -> Self {
        self.config.duplicate_policy = policy;
        self
    }

    /// Validate and return the configuration.
    pub fn build(self) -> Result<ProviderConfig, ConfigError> {
        self.config.validate()?;
        Ok(self.config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| vars.get(name).cloned()
    }

    #[test]
    fn test_api_token_wins_over_client_credentials() {
        let config = ProviderConfig::from_lookup(lookup(&[
            ("AUTH0_DOMAIN", "example.auth0.com"),
            ("AUTH0_API_TOKEN", "token"),
            ("AUTH0_CLIENT_ID", "id"),
            ("AUTH0_CLIENT_SECRET", "secret"),
        ]))
        .unwrap();
        assert_eq!(config.credentials, Some(Credentials::ApiToken("token".to_string())));
        assert_eq!(config.timeout, DEFAULT_TIMEOUT);
    }

    #[test]
    fn test_client_credentials_from_env() {
        let config = ProviderConfig::from_lookup(lookup(&[
            ("AUTH0_DOMAIN", "example.auth0.com"),
            ("AUTH0_API_TOKEN", ""),
            ("AUTH0_CLIENT_ID", "id"),
            ("AUTH0_CLIENT_SECRET", "secret"),
            ("AUTH0_AUDIENCE", "https://custom/api/v2/"),
            ("AUTH0_TIMEOUT_SECS", "5"),
        ]))
        .unwrap();
        assert_eq!(
            config.credentials,
            Some(Credentials::ClientCredentials {
                client_id: "id".to_string(),
                client_secret: "secret".to_string(),
                audience: Some("https://custom/api/v2/".to_string()),
            })
        );
        assert_eq!(config.timeout, Duration::from_secs(5));
    }

    #[test]
    fn test_invalid_configurations() {
        assert_eq!(
            ProviderConfig::from_lookup(lookup(&[("AUTH0_API_TOKEN", "t")])).unwrap_err(),
            ConfigError::EmptyDomain
        );
        assert_eq!(
            ProviderConfig::from_lookup(lookup(&[("AUTH0_DOMAIN", "example.auth0.com")]))
                .unwrap_err(),
            ConfigError::MissingCredentials
        );
        assert!(matches!(
            ProviderConfigBuilder::new("https://example.auth0.com")
                .with_api_token("t")
                .build(),
            Err(ConfigError::DomainWithScheme(_))
        ));
        assert!(matches!(
            ProviderConfig::from_lookup(lookup(&[
                ("AUTH0_DOMAIN", "example.auth0.com"),
                ("AUTH0_API_TOKEN", "t"),
                ("AUTH0_TIMEOUT_SECS", "soon"),
            ])),
            Err(ConfigError::InvalidValue { .. })
        ));
    }

    #[test]
    fn test_builder_defaults() {
        let config = ProviderConfigBuilder::new("example.auth0.com")
            .with_api_token("t")
            .with_duplicate_policy(DuplicatePolicy::Skip)
            .build()
            .unwrap();
        assert!(config.user_agent.starts_with("auth0-provider/"));
        assert_eq!(config.duplicate_policy, DuplicatePolicy::Skip);
    }
}
