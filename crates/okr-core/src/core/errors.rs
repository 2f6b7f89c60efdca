//! Typed error types for the okr-core service layer.

use thiserror::Error;

use crate::identity::AuthError;
use crate::sync::SyncError;

/// Result type alias for core service operations.
pub type CoreResult<T> = Result<T, CoreError>;

/// Errors that can occur in the okr-core service layer.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Input was rejected before anything was written.
    #[error("Invalid {field}: {reason}")]
    Validation { field: &'static str, reason: String },

    /// A lookup by id found nothing.
    #[error("{kind} not found: {id}")]
    NotFound { kind: &'static str, id: String },

    /// The operation needs a signed-in owner.
    #[error("Not signed in. Pass --owner or set OKR_OWNER.")]
    SignedOut,

    /// Sign-in sync aborted. The local store is unchanged.
    #[error(transparent)]
    Sync(#[from] SyncError),

    #[error(transparent)]
    Auth(#[from] AuthError),

    /// An internal storage error.
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl CoreError {
    pub(crate) fn validation(field: &'static str, reason: impl Into<String>) -> Self {
        Self::Validation {
            field,
            reason: reason.into(),
        }
    }

    pub(crate) fn not_found(kind: &'static str, id: &str) -> Self {
        Self::NotFound {
            kind,
            id: id.to_string(),
        }
    }
}
