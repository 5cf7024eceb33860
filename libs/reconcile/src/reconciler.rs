//! The scheduling reconciler: one self-contained bind attempt per call.

use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use claimsched_api::{Class, ClassReference, ClaimKey};
use claimsched_events::{Event, NopRecorder, Recorder};
use claimsched_store::{ClaimStore, Versioned};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::{debug, info, instrument};

use crate::error::ReconcileError;
use crate::jitter::{Jitter, RandomJitter, DEFAULT_MAX_JITTER};

/// Deadline covering an entire pass: fetch, list, jitter, and write.
pub const DEFAULT_RECONCILE_TIMEOUT: Duration = Duration::from_secs(60);

/// How long to wait before re-invoking when no class matched. Short,
/// because an empty candidate set is ambiguous: either no class exists
/// or a rival instance owns the matching classes and this instance's
/// view is incomplete.
pub const DEFAULT_NO_CANDIDATES_WAIT: Duration = Duration::from_secs(30);

/// Reason code of the event emitted when a class is selected.
pub const REASON_CLASS_SELECTED: &str = "SelectedResourceClass";

/// Recommended name for a scheduler instance handling the given claim
/// kind, e.g. `claimsched/bucketclaim`.
pub fn controller_name(kind: &str) -> String {
    format!("claimsched/{}", kind.to_lowercase())
}

/// What a pass concluded and what the dispatcher should do next.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// This pass's conditional write landed; the claim is now bound.
    Bound(ClassReference),

    /// The claim already carried a class reference. Some instance,
    /// possibly this one on an earlier pass, won the race.
    AlreadyBound(ClassReference),

    /// The claim no longer exists; there is nothing to schedule.
    Gone,

    /// No class matched the selector; invoke again after this delay.
    Wait(Duration),

    /// A store interaction failed; invoke again under the
    /// dispatcher's backoff policy.
    Failed(ReconcileError),
}

impl Outcome {
    /// Returns true if the dispatcher should not invoke again for the
    /// same trigger.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Outcome::Bound(_) | Outcome::AlreadyBound(_) | Outcome::Gone
        )
    }
}

/// Options for a [`Reconciler`], with usable defaults throughout.
///
/// | option               | default                             |
/// |----------------------|-------------------------------------|
/// | `timeout`            | [`DEFAULT_RECONCILE_TIMEOUT`]       |
/// | `no_candidates_wait` | [`DEFAULT_NO_CANDIDATES_WAIT`]      |
/// | `jitter`             | [`RandomJitter`] over `[0, 1500ms)` |
/// | `recorder`           | [`NopRecorder`]                     |
/// | `rng_seed`           | none (OS entropy)                   |
///
/// Logging is not an option here: the crate emits through the
/// `tracing` facade and the host decides what to do with it.
#[derive(Clone)]
pub struct ReconcilerConfig {
    /// Deadline for one whole pass.
    pub timeout: Duration,

    /// Delay reported by [`Outcome::Wait`] when no class matches.
    pub no_candidates_wait: Duration,

    /// Pre-write delay strategy.
    pub jitter: Arc<dyn Jitter>,

    /// Sink for best-effort notification events.
    pub recorder: Arc<dyn Recorder>,

    /// Fixed seed for the selection generator. Leave unset outside
    /// tests.
    pub rng_seed: Option<u64>,
}

impl Default for ReconcilerConfig {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_RECONCILE_TIMEOUT,
            no_candidates_wait: DEFAULT_NO_CANDIDATES_WAIT,
            jitter: Arc::new(RandomJitter::new(DEFAULT_MAX_JITTER)),
            recorder: Arc::new(NopRecorder),
            rng_seed: None,
        }
    }
}

/// Schedules claims to classes matching their selector.
///
/// Designed to race rival instances for the same claim: correctness
/// relies only on the store rejecting a write whose revision token
/// went stale. The reconciler holds no state across passes beyond its
/// random generator.
pub struct Reconciler<S> {
    store: Arc<S>,
    class_kind: String,
    timeout: Duration,
    no_candidates_wait: Duration,
    jitter: Arc<dyn Jitter>,
    recorder: Arc<dyn Recorder>,
    rng: Mutex<StdRng>,
}

impl<S: ClaimStore> Reconciler<S> {
    /// Creates a reconciler binding claims to classes of `class_kind`.
    pub fn new(store: Arc<S>, class_kind: impl Into<String>, config: ReconcilerConfig) -> Self {
        let rng = match config.rng_seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };
        Self {
            store,
            class_kind: class_kind.into(),
            timeout: config.timeout,
            no_candidates_wait: config.no_candidates_wait,
            jitter: config.jitter,
            recorder: config.recorder,
            rng: Mutex::new(rng),
        }
    }

    /// Performs at most one bind attempt for the claim.
    ///
    /// No step is retried internally; the dispatcher re-invokes on a
    /// non-terminal [`Outcome`] and the already-bound short-circuit
    /// makes re-entry safe after every kind of failure.
    #[instrument(skip(self), fields(claim = %key))]
    pub async fn reconcile(&self, key: &ClaimKey) -> Outcome {
        match tokio::time::timeout(self.timeout, self.attempt(key)).await {
            Ok(outcome) => outcome,
            Err(_) => Outcome::Failed(ReconcileError::Timeout(self.timeout)),
        }
    }

    async fn attempt(&self, key: &ClaimKey) -> Outcome {
        debug!("reconciling");

        let Versioned {
            object: mut claim,
            revision,
        } = match self.store.get_claim(key).await {
            Ok(versioned) => versioned,
            Err(err) if err.is_not_found() => {
                debug!("claim no longer exists");
                return Outcome::Gone;
            }
            Err(err) => return Outcome::Failed(ReconcileError::GetClaim(err)),
        };

        // Rival instances race to schedule this claim. If it was bound
        // since this pass was queued, another instance won.
        if let Some(reference) = claim.class_reference.clone() {
            debug!(class = %reference, "class reference already set");
            return Outcome::AlreadyBound(reference);
        }

        // A list failure is never recorded on the claim itself. No
        // single instance can tell whether a rival will succeed where
        // it errored, so marking the claim failed would be misleading.
        let candidates = match self.store.list_classes(&claim.class_selector).await {
            Ok(candidates) => candidates,
            Err(err) => {
                debug!(error = %err, "cannot list classes");
                return Outcome::Failed(ReconcileError::ListClasses(err));
            }
        };

        if candidates.is_empty() {
            debug!(wait = ?self.no_candidates_wait, "no matching classes");
            return Outcome::Wait(self.no_candidates_wait);
        }

        let selected = self.select(&candidates);
        let reference = ClassReference::new(self.class_kind.clone(), selected.name.clone());
        claim.class_reference = Some(reference.clone());

        // Decorrelate write timing from list cost before racing to the
        // store.
        self.jitter.sleep().await;

        // Intent, not confirmed outcome; at-least-once is acceptable.
        self.recorder.record(
            key,
            Event::normal(REASON_CLASS_SELECTED, "selected matching class")
                .with_attribute("class-kind", self.class_kind.as_str())
                .with_attribute("class-name", reference.name.as_str()),
        );

        // If the claim changed since the read above, the store rejects
        // this write; the next pass stops at the already-bound check if
        // a rival won, or runs the sequence again otherwise.
        debug!(class = %reference.name, "attempting to set class reference");
        match self.store.update_claim(&claim, revision).await {
            Ok(_) => {
                info!(class = %reference.name, "claim bound");
                Outcome::Bound(reference)
            }
            Err(err) => Outcome::Failed(ReconcileError::UpdateClaim(err)),
        }
    }

    /// Uniform over candidates, not list positions: rivals whose list
    /// calls return identical order must still diverge in choice.
    fn select<'a>(&self, candidates: &'a [Class]) -> &'a Class {
        let index = self
            .rng
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .random_range(0..candidates.len());
        &candidates[index]
    }
}
