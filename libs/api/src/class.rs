//! Classes: candidate targets a claim may be bound to.

use serde::{Deserialize, Serialize};

use crate::Labels;

/// A candidate class. Read-only to the scheduler.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Class {
    /// Name of the class within its kind.
    pub name: String,

    /// Labels the claim's selector is matched against.
    #[serde(default)]
    pub labels: Labels,
}

impl Class {
    /// Creates a class with the given labels.
    pub fn new<K, V>(name: impl Into<String>, labels: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            name: name.into(),
            labels: labels
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_class_labels_are_ordered() {
        let class = Class::new("fast", [("b", "2"), ("a", "1")]);
        let keys: Vec<_> = class.labels.keys().cloned().collect();
        assert_eq!(keys, vec!["a", "b"]);
    }
}
