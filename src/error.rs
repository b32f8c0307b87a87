//! Crate-level error type.
//!
//! Each layer has its own error enum; [`Auth0Error`] wraps all of them for
//! callers that drive several layers at once, such as the sweep binary.

use crate::config::ConfigError;
use crate::management::ManagementError;
use crate::reconcile::ReconcileError;
use crate::resources::{ResourceError, SchemaError};
use crate::sweep::SweepError;

/// Any error the provider can produce.
#[derive(Debug, Clone, thiserror::Error)]
pub enum Auth0Error {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Management(#[from] ManagementError),

    #[error(transparent)]
    Reconcile(#[from] ReconcileError),

    #[error(transparent)]
    Resource(#[from] ResourceError),

    #[error("Invalid configuration: {0}")]
    Schema(#[from] SchemaError),

    #[error("Sweep failed: {0}")]
    Sweep(#[from] SweepError),
}

impl Auth0Error {
    /// Whether the underlying Management API call answered 404.
    pub fn is_not_found(&self) -> bool {
        match self {
            Self::Management(err) => err.is_not_found(),
            Self::Reconcile(ReconcileError::Management(err)) => err.is_not_found(),
            Self::Resource(ResourceError::Management(err)) => err.is_not_found(),
            Self::Resource(ResourceError::Reconcile(ReconcileError::Management(err))) => {
                err.is_not_found()
            }
            _ => false,
        }
    }
}

/// Result alias used across the crate's top-level API.
pub type Auth0Result<T> = Result<T, Auth0Error>;
