//! Error types for the enrichment core.
//!
//! Every rejected operation returns a typed reason and leaves the stored
//! record unchanged. The `Error` meeting status is not a member of this
//! taxonomy: it is a domain outcome persisted on the Meeting row, always
//! accompanied by an `error_message`.

use serde::Serialize;
use thiserror::Error;

use crate::db::DbError;
use crate::types::MeetingStatus;

/// Errors returned by the boundary operations.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("Meeting not found: {0}")]
    NotFound(String),

    #[error("Invalid transition: {from} -> {to}")]
    InvalidTransition {
        from: MeetingStatus,
        to: MeetingStatus,
    },

    #[error("Precondition unmet: {0}")]
    PreconditionUnmet(String),

    #[error("Invalid state: {0}")]
    InvalidState(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Storage error: {0}")]
    Storage(#[from] DbError),
}

impl CoreError {
    /// True when the caller can fix its input and retry; storage errors are
    /// the only environmental failures.
    pub fn is_caller_error(&self) -> bool {
        !matches!(self, CoreError::Storage(_))
    }
}

/// Serializable error representation for a front-end boundary.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiError {
    pub message: String,
    pub kind: ErrorKind,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    NotFound,
    InvalidTransition,
    PreconditionUnmet,
    InvalidState,
    Validation,
    Storage,
}

impl From<&CoreError> for ApiError {
    fn from(err: &CoreError) -> Self {
        let kind = match err {
            CoreError::NotFound(_) => ErrorKind::NotFound,
            CoreError::InvalidTransition { .. } => ErrorKind::InvalidTransition,
            CoreError::PreconditionUnmet(_) => ErrorKind::PreconditionUnmet,
            CoreError::InvalidState(_) => ErrorKind::InvalidState,
            CoreError::Validation(_) => ErrorKind::Validation,
            CoreError::Storage(_) => ErrorKind::Storage,
        };

        ApiError {
            message: err.to_string(),
            kind,
        }
    }
}
