//! Errors returned by resource lifecycle handlers.

use crate::management::ManagementError;
use crate::reconcile::ReconcileError;
use crate::resources::schema::SchemaError;
use thiserror::Error;

/// Errors that can occur in a resource's create, read, update, delete or import.
#[derive(Debug, Clone, Error)]
pub enum ResourceError {
    #[error("Invalid configuration: {0}")]
    Schema(#[from] SchemaError),

    #[error(transparent)]
    Reconcile(#[from] ReconcileError),

    #[error(transparent)]
    Management(#[from] ManagementError),

    #[error("ID cannot be empty")]
    EmptyImportId,

    #[error("ID must be formated as <connectionID>:<clientID>")]
    InvalidImportId { id: String },

    #[error("Changing {attributes:?} requires replacing the resource")]
    RequiresReplacement { attributes: Vec<String> },

    #[error("{resource} has no ID in state")]
    MissingId { resource: String },
}
