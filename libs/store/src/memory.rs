//! In-memory reference store with genuine compare-and-swap writes.

use std::collections::BTreeMap;
use std::sync::{Mutex, PoisonError};

use async_trait::async_trait;
use claimsched_api::{Claim, ClaimKey, Class, LabelSelector};

use crate::{ClaimStore, Revision, StoreError, Versioned};

#[derive(Default)]
struct Inner {
    claims: BTreeMap<ClaimKey, Versioned<Claim>>,
    classes: BTreeMap<String, Class>,
    counter: u64,
}

impl Inner {
    fn next_revision(&mut self) -> Revision {
        self.counter += 1;
        Revision::new(self.counter)
    }
}

/// An in-process [`ClaimStore`].
///
/// One lock covers all state, so every write observes a total order
/// and the revision check in [`update_claim`](ClaimStore::update_claim)
/// is atomic with the write itself. Revisions come from a single
/// monotonic counter shared across all claims.
#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

impl MemoryStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Inserts or replaces a claim, returning the revision assigned.
    ///
    /// This models the external actor that owns the claim; the
    /// scheduler itself only ever writes through `update_claim`.
    pub fn insert_claim(&self, claim: Claim) -> Revision {
        let mut inner = self.lock();
        let revision = inner.next_revision();
        inner.claims.insert(
            claim.key.clone(),
            Versioned {
                object: claim,
                revision,
            },
        );
        revision
    }

    /// Inserts or replaces a class.
    pub fn insert_class(&self, class: Class) {
        self.lock().classes.insert(class.name.clone(), class);
    }

    /// Removes a claim, returning it if present.
    pub fn remove_claim(&self, key: &ClaimKey) -> Option<Claim> {
        self.lock().claims.remove(key).map(|v| v.object)
    }
}

#[async_trait]
impl ClaimStore for MemoryStore {
    async fn get_claim(&self, key: &ClaimKey) -> Result<Versioned<Claim>, StoreError> {
        self.lock()
            .claims
            .get(key)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(key.to_string()))
    }

    async fn list_classes(&self, selector: &LabelSelector) -> Result<Vec<Class>, StoreError> {
        Ok(self
            .lock()
            .classes
            .values()
            .filter(|class| selector.matches(&class.labels))
            .cloned()
            .collect())
    }

    async fn update_claim(
        &self,
        claim: &Claim,
        expected: Revision,
    ) -> Result<Revision, StoreError> {
        let mut inner = self.lock();
        let found = inner
            .claims
            .get(&claim.key)
            .ok_or_else(|| StoreError::NotFound(claim.key.to_string()))?
            .revision;

        if found != expected {
            return Err(StoreError::Conflict { expected, found });
        }

        let revision = inner.next_revision();
        inner.claims.insert(
            claim.key.clone(),
            Versioned {
                object: claim.clone(),
                revision,
            },
        );
        Ok(revision)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use claimsched_api::ClassReference;

    fn store_with_claim() -> (MemoryStore, Claim, Revision) {
        let store = MemoryStore::new();
        let claim = Claim::new(
            ClaimKey::new("default", "db"),
            LabelSelector::matching([("env", "prod")]),
        );
        let revision = store.insert_claim(claim.clone());
        (store, claim, revision)
    }

    #[tokio::test]
    async fn test_get_missing_claim_is_not_found() {
        let store = MemoryStore::new();
        let err = store
            .get_claim(&ClaimKey::new("default", "missing"))
            .await
            .unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_conditional_write_bumps_revision() {
        let (store, mut claim, revision) = store_with_claim();
        claim.class_reference = Some(ClassReference::new("ResourceClass", "fast"));

        let next = store.update_claim(&claim, revision).await.unwrap();
        assert!(next > revision);

        let read = store.get_claim(&claim.key).await.unwrap();
        assert_eq!(read.revision, next);
        assert!(read.object.is_bound());
    }

    #[tokio::test]
    async fn test_stale_revision_is_rejected_without_mutation() {
        let (store, claim, revision) = store_with_claim();

        // A rival write moves the claim past the revision we hold.
        let rebound = store.insert_claim(claim.clone());
        assert_ne!(rebound, revision);

        let mut stale = claim.clone();
        stale.class_reference = Some(ClassReference::new("ResourceClass", "slow"));
        let err = store.update_claim(&stale, revision).await.unwrap_err();
        assert!(err.is_conflict());

        let read = store.get_claim(&claim.key).await.unwrap();
        assert_eq!(read.object, claim);
        assert_eq!(read.revision, rebound);
    }

    #[tokio::test]
    async fn test_list_filters_by_selector() {
        let store = MemoryStore::new();
        store.insert_class(Class::new("c1", [("env", "prod")]));
        store.insert_class(Class::new("c2", [("env", "dev")]));

        let matched = store
            .list_classes(&LabelSelector::matching([("env", "prod")]))
            .await
            .unwrap();
        assert_eq!(matched.len(), 1);
        assert_eq!(matched[0].name, "c1");

        let all = store.list_classes(&LabelSelector::default()).await.unwrap();
        assert_eq!(all.len(), 2);
    }
}
