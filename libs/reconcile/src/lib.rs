//! # claimsched-reconcile
//!
//! A decentralized, race-tolerant scheduler that binds claims to
//! classes matching their label selector.
//!
//! Any number of non-coordinating scheduler instances, in the same or
//! different processes, may reconcile the same claim concurrently.
//! That is the designed-for condition, not an edge case. There is no
//! leader election and no lock anywhere: the only atomicity primitive
//! is the store's conditional write, which rejects a claim update
//! whose revision token no longer matches.
//!
//! ## How a pass works
//!
//! [`Reconciler::reconcile`] performs exactly one self-contained bind
//! attempt: fetch the claim, stop if it is already bound, list the
//! classes matching its selector, pick one uniformly at random, sleep
//! a random jitter, then write the reference back conditioned on the
//! revision read at the start. The returned [`Outcome`] tells the
//! dispatcher whether and when to invoke the pass again; nothing is
//! retried internally and no state survives a pass.
//!
//! ## Invariants
//!
//! - First successful write wins permanently; a set class reference is
//!   never overwritten or cleared by this crate.
//! - Re-entry is always safe: a repeat invocation on a bound claim is
//!   a cheap read followed by a short-circuit.
//! - A list failure never marks the claim failed; no single instance
//!   can know whether a rival succeeded where it errored.

mod error;
mod jitter;
mod reconciler;
mod worker;

pub use error::ReconcileError;
pub use jitter::{Jitter, NoJitter, RandomJitter, DEFAULT_MAX_JITTER};
pub use reconciler::{
    controller_name, Outcome, Reconciler, ReconcilerConfig, DEFAULT_NO_CANDIDATES_WAIT,
    DEFAULT_RECONCILE_TIMEOUT, REASON_CLASS_SELECTED,
};
pub use worker::{ReconcileWorker, WorkerConfig};
