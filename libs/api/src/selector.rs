//! Label selectors: the predicate narrowing classes to candidates.

use serde::{Deserialize, Serialize};

use crate::Labels;

/// A label-match predicate.
///
/// A selector matches a label set when every `match_labels` pair is
/// present in the set with an equal value. The empty selector matches
/// every label set.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LabelSelector {
    #[serde(default)]
    pub match_labels: Labels,
}

impl LabelSelector {
    /// Builds a selector from key/value pairs.
    pub fn matching<K, V>(pairs: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            match_labels: pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }

    /// Returns true if the given label set satisfies this selector.
    #[must_use]
    pub fn matches(&self, labels: &Labels) -> bool {
        self.match_labels
            .iter()
            .all(|(k, v)| labels.get(k) == Some(v))
    }

    /// Returns true if this selector has no match labels.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.match_labels.is_empty()
    }
}
