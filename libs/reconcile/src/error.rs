//! Error types for reconcile passes.

use std::time::Duration;

use claimsched_store::StoreError;
use thiserror::Error;

/// Errors a reconcile pass can surface.
///
/// Every variant is transient: the dispatcher retries and the next
/// pass either short-circuits on an already-bound claim or runs the
/// whole sequence again. The messages are fixed context tags naming
/// the store operation that failed.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ReconcileError {
    /// The claim could not be fetched (for reasons other than absence).
    #[error("cannot get resource claim")]
    GetClaim(#[source] StoreError),

    /// The candidate classes could not be listed.
    #[error("cannot list resource classes")]
    ListClasses(#[source] StoreError),

    /// The conditional write failed, either because a rival instance
    /// won the race (revision conflict) or because the store erred.
    #[error("cannot update resource claim")]
    UpdateClaim(#[source] StoreError),

    /// The pass exceeded its overall deadline.
    #[error("reconcile pass timed out after {0:?}")]
    Timeout(Duration),
}
