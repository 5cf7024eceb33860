//! Error types for store interactions.

use thiserror::Error;

use crate::Revision;

/// Errors a store operation can surface.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// The requested entity does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// A conditional write presented a revision that no longer matches
    /// the stored one.
    #[error("revision conflict: expected {expected}, found {found}")]
    Conflict { expected: Revision, found: Revision },

    /// The backend could not serve the request.
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

impl StoreError {
    /// Returns true if the entity was missing.
    pub fn is_not_found(&self) -> bool {
        matches!(self, StoreError::NotFound(_))
    }

    /// Returns true if a conditional write lost its revision check.
    pub fn is_conflict(&self) -> bool {
        matches!(self, StoreError::Conflict { .. })
    }
}
