//! Claims and the class reference a successful binding records.

use serde::{Deserialize, Serialize};

use crate::selector::LabelSelector;

/// Stable identity of a claim: a namespace/name pair.
///
/// Keys are ordered and hashable so stores and dispatchers can index
/// on them directly.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ClaimKey {
    pub namespace: String,
    pub name: String,
}

impl ClaimKey {
    /// Creates a key from a namespace and name.
    pub fn new(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            name: name.into(),
        }
    }
}

impl std::fmt::Display for ClaimKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.namespace, self.name)
    }
}

/// A value recording which class a claim is bound to.
///
/// Written exactly once, by whichever scheduler instance's conditional
/// write lands first. Never cleared by the scheduler.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassReference {
    /// The kind of class entity referenced (e.g. "ResourceClass").
    pub kind: String,

    /// The name of the referenced class.
    pub name: String,
}

impl ClassReference {
    /// Creates a reference to the named class of the given kind.
    pub fn new(kind: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            name: name.into(),
        }
    }
}

impl std::fmt::Display for ClassReference {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.kind, self.name)
    }
}

/// A claim: a request to be bound to one class matching its selector.
///
/// The claim is owned by an external actor. That actor may create the
/// claim with a nil reference or clear the reference; the scheduler
/// performs exactly one mutation, setting `class_reference` from
/// `None` to `Some`, and never overwrites a set reference.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claim {
    /// Stable identity.
    pub key: ClaimKey,

    /// Narrows classes to candidates for this claim.
    #[serde(default)]
    pub class_selector: LabelSelector,

    /// The class this claim is bound to, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub class_reference: Option<ClassReference>,
}

impl Claim {
    /// Creates an unbound claim with the given selector.
    pub fn new(key: ClaimKey, class_selector: LabelSelector) -> Self {
        Self {
            key,
            class_selector,
            class_reference: None,
        }
    }

    /// Returns true once a class reference has been set.
    #[must_use]
    pub fn is_bound(&self) -> bool {
        self.class_reference.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_claim_key_display() {
        let key = ClaimKey::new("default", "db-claim");
        assert_eq!(key.to_string(), "default/db-claim");
    }

    #[test]
    fn test_claim_starts_unbound() {
        let claim = Claim::new(
            ClaimKey::new("default", "db-claim"),
            LabelSelector::default(),
        );
        assert!(!claim.is_bound());
        assert!(claim.class_reference.is_none());
    }

    #[test]
    fn test_claim_serde_round_trip() {
        let mut claim = Claim::new(
            ClaimKey::new("default", "db-claim"),
            LabelSelector::matching([("env", "prod")]),
        );
        claim.class_reference = Some(ClassReference::new("ResourceClass", "fast"));

        let json = serde_json::to_string(&claim).expect("serialize");
        let back: Claim = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(back, claim);
    }

    #[test]
    fn test_unbound_claim_omits_reference_field() {
        let claim = Claim::new(ClaimKey::new("ns", "c"), LabelSelector::default());
        let json = serde_json::to_string(&claim).expect("serialize");
        assert!(!json.contains("class_reference"));
    }
}
