// ============================================================================
// Per-save change records
// ============================================================================
//
// A ChangeSet is what one save reports: attribute name -> (before, after).
// Insertion order follows the record's attribute order, so iteration and the
// JSON rendering are stable.
//
// ============================================================================

use crate::core::Value;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// The before/after pair for one attribute, produced by a single save.
///
/// Serializes as a two element array, `[before, after]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "(Value, Value)", into = "(Value, Value)")]
pub struct AttributeChange {
    pub before: Value,
    pub after: Value,
}

impl AttributeChange {
    pub fn new(before: impl Into<Value>, after: impl Into<Value>) -> Self {
        Self {
            before: before.into(),
            after: after.into(),
        }
    }

    /// True for a forced change whose value never moved.
    pub fn is_noop(&self) -> bool {
        self.before == self.after
    }
}

impl<B: Into<Value>, A: Into<Value>> From<(B, A)> for AttributeChange {
    fn from((before, after): (B, A)) -> Self {
        Self::new(before, after)
    }
}

impl From<AttributeChange> for (Value, Value) {
    fn from(change: AttributeChange) -> Self {
        (change.before, change.after)
    }
}

/// Mapping from attribute name to its change, for exactly one save or for a
/// whole transaction once merged.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChangeSet {
    changes: IndexMap<String, AttributeChange>,
}

impl ChangeSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a change, replacing any earlier entry for the same attribute
    /// while keeping its position.
    pub fn insert(&mut self, name: impl Into<String>, change: AttributeChange) {
        self.changes.insert(name.into(), change);
    }

    pub fn get(&self, name: &str) -> Option<&AttributeChange> {
        self.changes.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.changes.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.changes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.changes.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &AttributeChange)> {
        self.changes.iter().map(|(name, change)| (name.as_str(), change))
    }
}

impl<K: Into<String>> FromIterator<(K, AttributeChange)> for ChangeSet {
    fn from_iter<I: IntoIterator<Item = (K, AttributeChange)>>(iter: I) -> Self {
        let mut set = ChangeSet::new();
        for (name, change) in iter {
            set.insert(name, change);
        }
        set
    }
}

impl IntoIterator for ChangeSet {
    type Item = (String, AttributeChange);
    type IntoIter = indexmap::map::IntoIter<String, AttributeChange>;

    fn into_iter(self) -> Self::IntoIter {
        self.changes.into_iter()
    }
}
