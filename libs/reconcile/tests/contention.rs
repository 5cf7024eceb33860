//! Multi-instance contention: exactly one conditional write lands.
//!
//! These tests gate rival instances on a barrier after their claim
//! read, so every instance holds the same revision token when it
//! races to write.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use claimsched_api::{Claim, ClaimKey, Class, LabelSelector};
use claimsched_reconcile::{NoJitter, Outcome, ReconcileError, Reconciler, ReconcilerConfig};
use claimsched_store::{ClaimStore, MemoryStore, Revision, StoreError, Versioned};
use tokio::sync::Barrier;

const KIND: &str = "ResourceClass";

/// Holds the first `parties` readers at a barrier after their claim
/// read, forcing all racing instances to observe the same revision
/// before any of them writes. Later reads pass through ungated.
struct GatedStore {
    inner: MemoryStore,
    gate: Barrier,
    reads: AtomicUsize,
    parties: usize,
}

impl GatedStore {
    fn new(inner: MemoryStore, parties: usize) -> Self {
        Self {
            inner,
            gate: Barrier::new(parties),
            reads: AtomicUsize::new(0),
            parties,
        }
    }
}

#[async_trait]
impl ClaimStore for GatedStore {
    async fn get_claim(&self, key: &ClaimKey) -> Result<Versioned<Claim>, StoreError> {
        let versioned = self.inner.get_claim(key).await?;
        if self.reads.fetch_add(1, Ordering::SeqCst) < self.parties {
            self.gate.wait().await;
        }
        Ok(versioned)
    }

    async fn list_classes(&self, selector: &LabelSelector) -> Result<Vec<Class>, StoreError> {
        self.inner.list_classes(selector).await
    }

    async fn update_claim(&self, claim: &Claim, expected: Revision) -> Result<Revision, StoreError> {
        self.inner.update_claim(claim, expected).await
    }
}

fn reconciler(store: Arc<GatedStore>, seed: u64) -> Reconciler<GatedStore> {
    Reconciler::new(
        store,
        KIND,
        ReconcilerConfig {
            jitter: Arc::new(NoJitter),
            rng_seed: Some(seed),
            ..ReconcilerConfig::default()
        },
    )
}

fn seeded_store(parties: usize) -> (Arc<GatedStore>, ClaimKey) {
    let inner = MemoryStore::new();
    let key = ClaimKey::new("default", "db");
    inner.insert_claim(Claim::new(
        key.clone(),
        LabelSelector::matching([("env", "prod")]),
    ));
    for name in ["c1", "c2", "c3"] {
        inner.insert_class(Class::new(name, [("env", "prod")]));
    }
    (Arc::new(GatedStore::new(inner, parties)), key)
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn two_instances_race_from_the_same_revision() {
    let (store, key) = seeded_store(2);
    let first = reconciler(Arc::clone(&store), 1);
    let second = reconciler(Arc::clone(&store), 2);

    let (a, b) = tokio::join!(first.reconcile(&key), second.reconcile(&key));

    let (winner, loser) = match (&a, &b) {
        (Outcome::Bound(_), _) => (&a, &b),
        (_, Outcome::Bound(_)) => (&b, &a),
        other => panic!("no instance won: {other:?}"),
    };

    let Outcome::Bound(reference) = winner else {
        unreachable!()
    };
    let Outcome::Failed(ReconcileError::UpdateClaim(err)) = loser else {
        panic!("loser should have lost its revision check, got {loser:?}");
    };
    assert!(err.is_conflict());

    // The stored binding is the winner's, permanently.
    let stored = store.inner.get_claim(&key).await.unwrap().object;
    assert_eq!(stored.class_reference.as_ref(), Some(reference));

    // The loser's next pass short-circuits without another write.
    let retry = second.reconcile(&key).await;
    let rebound = first.reconcile(&key).await;
    assert_eq!(retry, Outcome::AlreadyBound(reference.clone()));
    assert_eq!(rebound, Outcome::AlreadyBound(reference.clone()));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn n_instances_produce_exactly_one_winner() {
    const INSTANCES: usize = 8;

    let (store, key) = seeded_store(INSTANCES);
    let reconcilers: Vec<_> = (0..INSTANCES)
        .map(|seed| Arc::new(reconciler(Arc::clone(&store), seed as u64)))
        .collect();

    let mut handles = Vec::new();
    for instance in &reconcilers {
        let instance = Arc::clone(instance);
        let key = key.clone();
        handles.push(tokio::spawn(
            async move { instance.reconcile(&key).await },
        ));
    }

    let mut wins = 0;
    let mut conflicts = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Outcome::Bound(_) => wins += 1,
            Outcome::Failed(ReconcileError::UpdateClaim(err)) if err.is_conflict() => {
                conflicts += 1;
            }
            other => panic!("unexpected outcome: {other:?}"),
        }
    }
    assert_eq!(wins, 1);
    assert_eq!(conflicts, INSTANCES - 1);

    // Every instance now observes the same terminal binding.
    let stored = store.inner.get_claim(&key).await.unwrap().object;
    let reference = stored.class_reference.expect("bound");
    for instance in &reconcilers {
        assert_eq!(
            instance.reconcile(&key).await,
            Outcome::AlreadyBound(reference.clone())
        );
    }
}
