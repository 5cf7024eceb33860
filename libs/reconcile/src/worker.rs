//! Background worker driving claims to a terminal outcome.
//!
//! The reconciler itself never loops; this worker is the dispatcher
//! side of the contract. It consumes claim keys from a channel and
//! re-invokes the reconciler per [`Outcome`]: `Wait` sleeps the
//! reported delay, `Failed` backs off exponentially up to a cap, and
//! terminal outcomes end the work for that key.

use std::sync::Arc;
use std::time::Duration;

use claimsched_api::ClaimKey;
use claimsched_store::ClaimStore;
use tokio::sync::{mpsc, watch};
use tracing::{debug, info, warn};

use crate::reconciler::{Outcome, Reconciler};

/// Retry policy for the worker.
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    /// First backoff after a transient failure.
    pub initial_backoff: Duration,

    /// Backoff ceiling.
    pub max_backoff: Duration,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            initial_backoff: Duration::from_secs(1),
            max_backoff: Duration::from_secs(300),
        }
    }
}

/// Drives one claim at a time from a request channel until shutdown.
pub struct ReconcileWorker<S> {
    reconciler: Arc<Reconciler<S>>,
    config: WorkerConfig,
}

impl<S: ClaimStore> ReconcileWorker<S> {
    /// Creates a worker over the given reconciler.
    pub fn new(reconciler: Arc<Reconciler<S>>, config: WorkerConfig) -> Self {
        Self { reconciler, config }
    }

    /// Runs until the request channel closes or shutdown is signaled.
    pub async fn run(
        &self,
        mut requests: mpsc::Receiver<ClaimKey>,
        mut shutdown: watch::Receiver<bool>,
    ) {
        info!("starting reconcile worker");

        loop {
            tokio::select! {
                request = requests.recv() => match request {
                    Some(key) => self.drive(key, &mut shutdown).await,
                    None => break,
                },
                _ = shutdown.changed() => {
                    if *shutdown.borrow() {
                        info!("reconcile worker shutting down");
                        break;
                    }
                }
            }
        }
    }

    /// Re-invokes the reconciler for one claim until a terminal
    /// outcome or shutdown.
    async fn drive(&self, key: ClaimKey, shutdown: &mut watch::Receiver<bool>) {
        let mut backoff = self.config.initial_backoff;

        loop {
            let delay = match self.reconciler.reconcile(&key).await {
                Outcome::Bound(reference) => {
                    debug!(claim = %key, class = %reference.name, "bound");
                    return;
                }
                Outcome::AlreadyBound(_) => {
                    debug!(claim = %key, "already bound");
                    return;
                }
                Outcome::Gone => {
                    debug!(claim = %key, "gone");
                    return;
                }
                Outcome::Wait(delay) => {
                    // Not a failure; reset the backoff.
                    backoff = self.config.initial_backoff;
                    delay
                }
                Outcome::Failed(err) => {
                    warn!(claim = %key, error = %err, backoff = ?backoff, "reconcile failed");
                    let delay = backoff;
                    backoff = (backoff * 2).min(self.config.max_backoff);
                    delay
                }
            };

            tokio::select! {
                _ = tokio::time::sleep(delay) => {}
                _ = shutdown.changed() => {
                    if *shutdown.borrow() {
                        return;
                    }
                }
            }
        }
    }
}
