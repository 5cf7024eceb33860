//! # claimsched-store
//!
//! The versioned store abstraction the scheduler runs against.
//!
//! ## Design Principles
//!
//! - The store is the only coordination point between scheduler
//!   instances. It exposes read-by-key, filtered list, and
//!   conditional-write-on-revision; nothing else.
//! - Revisions are opaque to consumers: compare them, echo them back,
//!   never compute with them.
//! - A conditional write must be a genuine compare-and-swap. A backend
//!   without native support has to emulate it with an atomic
//!   read-compare-write transaction; the revision check is what makes
//!   multi-writer scheduling correct.
//!
//! [`MemoryStore`] is the in-process reference implementation, used by
//! the test suites and suitable for single-process hosts.

mod error;
mod memory;

pub use error::StoreError;
pub use memory::MemoryStore;

use async_trait::async_trait;
use claimsched_api::{Claim, ClaimKey, Class, LabelSelector};

/// An opaque version token minted by the store on every claim read and
/// required unchanged for a write to succeed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Revision(u64);

impl Revision {
    /// Wraps a backend-assigned revision number.
    #[must_use]
    pub const fn new(value: u64) -> Self {
        Self(value)
    }

    /// The revision a backend assigns on first write.
    pub const INITIAL: Revision = Revision(1);

    /// The revision following this one. Backends mint successors;
    /// consumers only compare.
    #[must_use]
    pub const fn next(self) -> Self {
        Self(self.0 + 1)
    }
}

impl std::fmt::Display for Revision {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// An object together with the revision it was read at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Versioned<T> {
    pub object: T,
    pub revision: Revision,
}

/// Store operations the scheduler depends on.
///
/// Implementations must guarantee that of all writes presented for the
/// same claim with the same expected revision, at most one succeeds;
/// every other writer observes [`StoreError::Conflict`]. No other
/// ordering is assumed anywhere in this workspace.
#[async_trait]
pub trait ClaimStore: Send + Sync {
    /// Fetches a claim and the revision it was read at.
    async fn get_claim(&self, key: &ClaimKey) -> Result<Versioned<Claim>, StoreError>;

    /// Lists classes whose labels satisfy the selector.
    ///
    /// The result is a point-in-time view local to the caller; rival
    /// instances may observe a different set or a different order.
    async fn list_classes(&self, selector: &LabelSelector) -> Result<Vec<Class>, StoreError>;

    /// Writes the claim back iff its stored revision still equals
    /// `expected`, returning the new revision.
    ///
    /// A mismatch means the claim changed since it was read; the write
    /// is rejected with [`StoreError::Conflict`] and the stored object
    /// is left untouched, never merged.
    async fn update_claim(&self, claim: &Claim, expected: Revision)
        -> Result<Revision, StoreError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_revision_successor_ordering() {
        let r = Revision::INITIAL;
        assert!(r.next() > r);
        assert_eq!(r.next().to_string(), "2");
    }
}
