// ============================================================================
// Change Aggregator
// ============================================================================
//
// Collects the change-set of every save inside one transaction and, right
// before commit observers run, replaces the last save's change-set with one
// merged change-set spanning the whole transaction.
//
// Merge rules:
// - the baseline is the attribute state captured before the first save
// - later saves overwrite values; the final value always wins
// - any attribute written by a later save counts as changed, even when its
//   final value equals the baseline value
//
// ============================================================================

use super::{
    Attribute, AttributeChange, AttributeHost, ChangeSet, MutationTracker, TransactionListener,
};
use crate::config::{AggregatorConfig, MissingBaseline};
use crate::core::{DataType, Result, Value};
use std::fmt;
use tracing::{debug, trace};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AggregatorPhase {
    /// No save recorded since the last transaction boundary
    Idle,

    /// At least one save recorded
    Accumulating,

    /// Building the merged view during commit
    Merging,
}

impl fmt::Display for AggregatorPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AggregatorPhase::Idle => write!(f, "IDLE"),
            AggregatorPhase::Accumulating => write!(f, "ACCUMULATING"),
            AggregatorPhase::Merging => write!(f, "MERGING"),
        }
    }
}

/// Per-record transaction change bookkeeping.
///
/// Owned one-to-one by a record and driven through [`TransactionListener`].
/// Not synchronized; the host serializes a record's lifecycle.
#[derive(Debug, Clone)]
pub struct ChangeAggregator {
    config: AggregatorConfig,
    phase: AggregatorPhase,
    baseline: Option<MutationTracker>,
    log: Vec<ChangeSet>,
    last_save: ChangeSet,
    view: Option<ChangeSet>,
    /// `(last_save, view)` as of the open transaction's start; put back on
    /// rollback.
    committed: Option<(ChangeSet, Option<ChangeSet>)>,
}

impl Default for ChangeAggregator {
    fn default() -> Self {
        Self::new(AggregatorConfig::default())
    }
}

impl ChangeAggregator {
    pub fn new(config: AggregatorConfig) -> Self {
        Self {
            config,
            phase: AggregatorPhase::Idle,
            baseline: None,
            log: Vec::new(),
            last_save: ChangeSet::new(),
            view: None,
            committed: None,
        }
    }

    pub fn config(&self) -> &AggregatorConfig {
        &self.config
    }

    pub fn phase(&self) -> AggregatorPhase {
        self.phase
    }

    /// Number of saves recorded in the open transaction.
    pub fn pending_saves(&self) -> usize {
        self.log.len()
    }

    pub fn has_baseline(&self) -> bool {
        self.baseline.is_some()
    }

    /// The change-set commit observers read: the merged view when the
    /// transaction saved more than once, otherwise the last save's own.
    pub fn net_changes_for_transaction(&self) -> &ChangeSet {
        self.view.as_ref().unwrap_or(&self.last_save)
    }

    /// Whether a merged view is installed.
    pub fn is_aggregated(&self) -> bool {
        self.view.is_some()
    }

    pub fn saved_change_to(&self, name: &str) -> bool {
        self.net_changes_for_transaction().contains(name)
    }

    pub fn previous_change(&self, name: &str) -> Option<&AttributeChange> {
        self.net_changes_for_transaction().get(name)
    }

    fn remember_committed(&mut self) {
        self.committed = Some((self.last_save.clone(), self.view.clone()));
    }

    fn reset(&mut self) {
        self.log.clear();
        self.baseline = None;
        self.phase = AggregatorPhase::Idle;
    }

    /// Folds the transaction's change log onto the baseline.
    fn rollup(
        &self,
        baseline: MutationTracker,
        log: &[ChangeSet],
        host: &dyn AttributeHost,
    ) -> Result<ChangeSet> {
        let mut working = baseline;
        let mut saves = log.iter();

        // The first save is already part of the baseline's pending state.
        // Folding it only picks up values the host assigned during the save
        // itself, such as a generated primary key.
        if let Some(first) = saves.next() {
            for (name, change) in first.iter() {
                self.fold(&mut working, name, change, host)?;
                if change.is_noop() {
                    working.force_change(name);
                }
            }
        }

        for change_set in saves {
            for (name, change) in change_set.iter() {
                self.fold(&mut working, name, change, host)?;
                working.force_change(name);
            }
        }

        Ok(working.changes())
    }

    fn fold(
        &self,
        working: &mut MutationTracker,
        name: &str,
        change: &AttributeChange,
        host: &dyn AttributeHost,
    ) -> Result<()> {
        if let Some(attribute) = working.attribute(name) {
            let value = host.cast_user_value(name, change.after.clone(), attribute.data_type())?;
            working.attributes_mut().write_value(name, value);
            return Ok(());
        }

        let data_type = change
            .after
            .data_type()
            .or_else(|| change.before.data_type())
            .unwrap_or(DataType::Text);
        let before = match self.config.missing_baseline {
            MissingBaseline::FirstOccurrence => {
                host.cast_user_value(name, change.before.clone(), data_type)?
            }
            MissingBaseline::Null => Value::Null,
        };
        let after = host.cast_user_value(name, change.after.clone(), data_type)?;

        trace!(attribute = name, %data_type, "attribute missing from baseline");
        working
            .attributes_mut()
            .insert(Attribute::new(name, data_type, before, after));
        Ok(())
    }
}

impl TransactionListener for ChangeAggregator {
    fn on_transaction_begin(&mut self, host: &dyn AttributeHost) {
        self.reset();
        self.remember_committed();
        self.baseline = Some(host.attribute_snapshot());
        trace!("captured baseline at transaction begin");
    }

    fn on_before_save(&mut self, host: &dyn AttributeHost) {
        if self.baseline.is_none() {
            self.remember_committed();
            self.baseline = Some(host.attribute_snapshot());
            trace!("captured baseline before first save");
        }
    }

    fn on_after_save(&mut self, change_set: ChangeSet) {
        self.last_save = change_set.clone();
        self.view = None;
        self.log.push(change_set);
        self.phase = AggregatorPhase::Accumulating;
        trace!(saves = self.log.len(), "recorded save");
    }

    fn on_before_commit(&mut self, host: &dyn AttributeHost) -> Result<()> {
        if self.log.len() > 1 && self.config.enabled {
            self.phase = AggregatorPhase::Merging;
            let log = std::mem::take(&mut self.log);
            let baseline = self.baseline.take().unwrap_or_default();
            let merged = self.rollup(baseline, &log, host);
            self.reset();

            let merged = merged?;
            debug!(
                saves = log.len(),
                attributes = merged.len(),
                "installed aggregated change view"
            );
            self.view = Some(merged);
            return Ok(());
        }

        self.reset();
        Ok(())
    }

    fn on_after_commit(&mut self) {
        self.committed = None;
    }

    fn on_rollback(&mut self) {
        if !self.log.is_empty() {
            debug!(saves = self.log.len(), "discarding change log on rollback");
        }
        self.reset();
        if let Some((last_save, view)) = self.committed.take() {
            self.last_save = last_save;
            self.view = view;
        }
    }
}
