use super::{Attribute, AttributeChange, AttributeSet, ChangeSet};
use crate::core::Value;
use indexmap::IndexSet;

/// Attribute state plus the names explicitly marked as changed.
///
/// An attribute counts as changed when it was forced or when its current
/// value differs from its original one. This is the shape a host hands out
/// as its attribute snapshot and the shape the merged view is computed in.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MutationTracker {
    attributes: AttributeSet,
    forced: IndexSet<String>,
}

impl MutationTracker {
    pub fn new(attributes: AttributeSet) -> Self {
        Self {
            attributes,
            forced: IndexSet::new(),
        }
    }

    pub fn attributes(&self) -> &AttributeSet {
        &self.attributes
    }

    pub fn attributes_mut(&mut self) -> &mut AttributeSet {
        &mut self.attributes
    }

    pub fn attribute(&self, name: &str) -> Option<&Attribute> {
        self.attributes.get(name)
    }

    pub fn value(&self, name: &str) -> Option<&Value> {
        self.attributes.value(name)
    }

    pub fn changed(&self, name: &str) -> bool {
        self.forced.contains(name)
            || self
                .attributes
                .get(name)
                .is_some_and(Attribute::changed)
    }

    pub fn force_change(&mut self, name: impl Into<String>) {
        self.forced.insert(name.into());
    }

    pub fn forced(&self) -> impl Iterator<Item = &str> {
        self.forced.iter().map(String::as_str)
    }

    pub fn has_changes(&self) -> bool {
        self.attributes.iter().any(|attribute| self.changed(attribute.name()))
    }

    /// Every changed attribute as `(original, current)`, in attribute order.
    pub fn changes(&self) -> ChangeSet {
        self.attributes
            .iter()
            .filter(|attribute| self.changed(attribute.name()))
            .map(|attribute| {
                (
                    attribute.name().to_string(),
                    AttributeChange::new(attribute.original().clone(), attribute.value().clone()),
                )
            })
            .collect()
    }

    /// Makes the current values the new originals and drops forced markers.
    pub fn changes_applied(&mut self) {
        self.attributes.forget_assignments();
        self.forced.clear();
    }
}
