//! Errors surfaced by membership reconciliation.

use crate::management::ManagementError;
use thiserror::Error;

/// Errors that can occur while reconciling a membership fact.
///
/// A missing parent is only an error on the establish path. Read and remove
/// paths report it as an outcome (`Membership::Absent`, `Removal::AlreadyGone`).
#[derive(Debug, Clone, Error)]
pub enum ReconcileError {
    #[error("Parent '{parent_id}' does not exist")]
    ParentNotFound {
        /// The parent the membership was to be established on
        parent_id: String,
    },

    /// Any other remote failure, passed through unmodified.
    #[error(transparent)]
    Management(#[from] ManagementError),

    #[error("Reconciler is shutting down, not starting a cycle on '{parent_id}'")]
    ShuttingDown {
        /// The parent whose cycle was refused
        parent_id: String,
    },

    #[error("Reconciliation of '{parent_id}' was interrupted: {message}")]
    Interrupted {
        /// The parent whose cycle did not complete
        parent_id: String,
        /// Description of the panic or abort
        message: String,
    },
}

impl ReconcileError {
    /// The underlying transport error, if this is one.
    pub fn management(&self) -> Option<&ManagementError> {
        match self {
            Self::Management(err) => Some(err),
            _ => None,
        }
    }
}
