//! # claimsched-api
//!
//! Entity model for the claimsched scheduler.
//!
//! ## Design Principles
//!
//! - Claims request a binding; classes are candidate targets. Both are
//!   owned by external actors and the scheduler only ever sets a
//!   claim's class reference, exactly once.
//! - All types are plain values: no store handles, no async, no
//!   interior mutability. Versioning lives in `claimsched-store`.
//! - Everything serializes, so hosts can move these entities over
//!   whatever wire or storage format they own.

mod claim;
mod class;
mod selector;

pub use claim::{Claim, ClaimKey, ClassReference};
pub use class::Class;
pub use selector::LabelSelector;

use std::collections::BTreeMap;

/// Label sets are ordered maps so listings and comparisons are
/// deterministic.
pub type Labels = BTreeMap<String, String>;
