//! Error types for calls against the Auth0 Management API.
//!
//! These errors describe what the transport observed and nothing more. The
//! reconciliation layer decides which of them are expected outcomes (a missing
//! parent on delete) and which are hard failures.

use thiserror::Error;

/// Errors that can occur while talking to the Management API.
///
/// `NotFound` is kept apart from every other failure because callers treat a
/// missing remote object as a normal outcome on read and delete paths.
#[derive(Debug, Clone, Error)]
pub enum ManagementError {
    #[error("{resource} '{id}' not found")]
    NotFound {
        /// The kind of remote object that was requested (e.g. "connection")
        resource: String,
        /// The identifier that could not be resolved
        id: String,
    },

    #[error("Management API returned HTTP {status}: {message}")]
    Api {
        /// HTTP status code returned by the API
        status: u16,
        /// Error body or a synthesised description
        message: String,
    },

    #[error("Rate limited by the Management API (retry after {retry_after_secs:?}s)")]
    RateLimited {
        /// Value of the `Retry-After` header, when present
        retry_after_secs: Option<u64>,
    },

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Configuration error: {0}")]
    Configuration(String),
}

impl ManagementError {
    /// Create a not-found error for a remote object.
    pub fn not_found(resource: impl Into<String>, id: impl Into<String>) -> Self {
        Self::NotFound {
            resource: resource.into(),
            id: id.into(),
        }
    }

    /// Whether the remote object does not exist.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    /// HTTP status associated with this error, if any.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::NotFound { .. } => Some(404),
            Self::Api { status, .. } => Some(*status),
            Self::RateLimited { .. } => Some(429),
            Self::Unauthorized(_) => Some(401),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for ManagementError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            Self::Serialization(err.to_string())
        } else if let Some(status) = err.status() {
            Self::Api {
                status: status.as_u16(),
                message: err.to_string(),
            }
        } else {
            Self::Network(err.to_string())
        }
    }
}

impl From<serde_json::Error> for ManagementError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}
