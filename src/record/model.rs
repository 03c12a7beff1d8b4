// ============================================================================
// Record
// ============================================================================
//
// One row of an in-memory table with attribute dirty tracking, record-level
// transactions and commit observers. Each record owns exactly one
// ChangeAggregator and drives it through the TransactionListener hooks:
//
//   transaction begin -> begin
//   each save         -> before_save, after_save
//   commit            -> before_commit, then before_commit observers,
//                        then after_commit, then after_commit observers
//   rollback          -> rollback, then after_rollback observers
//
// ============================================================================

use super::observers::{CommitHook, Observers};
use crate::changes::{
    Attribute, AttributeChange, AttributeHost, ChangeAggregator, ChangeSet, MutationTracker,
    TransactionListener,
};
use crate::config::AggregatorConfig;
use crate::core::{ChangeError, Result, Row, Value};
use crate::storage::{PRIMARY_KEY, Table};
use crate::transaction::{Change, Transaction, TransactionId};
use log::warn;
use tracing::debug;

/// Attribute state of a record; the part the aggregator reads.
#[derive(Debug, Clone)]
struct RecordState {
    tracker: MutationTracker,
    new_record: bool,
}

impl AttributeHost for RecordState {
    fn attribute_snapshot(&self) -> MutationTracker {
        self.tracker.clone()
    }
}

/// An active-record style handle on one table row.
pub struct Record {
    table: Table,
    state: RecordState,
    aggregator: ChangeAggregator,
    observers: Observers,
    transaction: Option<Transaction>,
    start_state: Option<RecordState>,
}

impl Record {
    /// A new, unsaved record with every attribute `NULL`.
    pub fn new(table: &Table) -> Self {
        Self::with_config(table, AggregatorConfig::default())
    }

    pub fn with_config(table: &Table, config: AggregatorConfig) -> Self {
        let attributes = table
            .schema()
            .schema()
            .columns()
            .iter()
            .map(|column| Attribute::from_database(column.name.clone(), column.data_type, Value::Null))
            .collect();

        Self {
            table: table.clone(),
            state: RecordState {
                tracker: MutationTracker::new(attributes),
                new_record: true,
            },
            aggregator: ChangeAggregator::new(config),
            observers: Observers::new(),
            transaction: None,
            start_state: None,
        }
    }

    /// Builds a record from `attributes` and saves it.
    pub fn create<I, K, V>(table: &Table, attributes: I) -> Result<Self>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<Value>,
    {
        let mut record = Self::new(table);
        record.update(attributes)?;
        Ok(record)
    }

    /// Loads the row stored under `id`.
    pub fn find(table: &Table, id: i64) -> Result<Self> {
        let mut record = Self::new(table);
        record.load_row(id)?;
        Ok(record)
    }

    pub fn table(&self) -> &Table {
        &self.table
    }

    pub fn id(&self) -> Option<i64> {
        self.state.tracker.value(PRIMARY_KEY).and_then(Value::as_i64)
    }

    pub fn is_new_record(&self) -> bool {
        self.state.new_record
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.state.tracker.value(name)
    }

    /// Assigns one attribute, casting it through the column type.
    pub fn assign(&mut self, name: &str, value: impl Into<Value>) -> Result<()> {
        let data_type = self.attribute(name)?.data_type();
        let value = self
            .state
            .cast_user_value(name, value.into(), data_type)?;
        self.state.tracker.attributes_mut().write_value(name, value);
        Ok(())
    }

    pub fn assign_all<I, K, V>(&mut self, attributes: I) -> Result<()>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<Value>,
    {
        for (name, value) in attributes {
            self.assign(name.as_ref(), value)?;
        }
        Ok(())
    }

    /// Marks an attribute as changed for the next save without touching
    /// its value.
    pub fn will_change(&mut self, name: &str) -> Result<()> {
        self.attribute(name)?;
        self.state.tracker.force_change(name);
        Ok(())
    }

    pub fn has_changes_to_save(&self) -> bool {
        self.state.tracker.has_changes()
    }

    /// Pending, unsaved changes.
    pub fn changes_to_save(&self) -> ChangeSet {
        self.state.tracker.changes()
    }

    /// Changes of the last save, or of the whole last transaction once it
    /// committed after several saves.
    pub fn saved_changes(&self) -> &ChangeSet {
        self.aggregator.net_changes_for_transaction()
    }

    pub fn saved_change_to(&self, name: &str) -> bool {
        self.aggregator.saved_change_to(name)
    }

    pub fn previous_change(&self, name: &str) -> Option<&AttributeChange> {
        self.aggregator.previous_change(name)
    }

    pub fn aggregator(&self) -> &ChangeAggregator {
        &self.aggregator
    }

    pub fn observers_mut(&mut self) -> &mut Observers {
        &mut self.observers
    }

    pub fn before_commit<F>(&mut self, callback: F)
    where
        F: FnMut(&ChangeSet) -> Result<()> + Send + 'static,
    {
        self.observers.register(CommitHook::BeforeCommit, callback);
    }

    pub fn after_commit<F>(&mut self, callback: F)
    where
        F: FnMut(&ChangeSet) -> Result<()> + Send + 'static,
    {
        self.observers.register(CommitHook::AfterCommit, callback);
    }

    pub fn after_rollback<F>(&mut self, callback: F)
    where
        F: FnMut(&ChangeSet) -> Result<()> + Send + 'static,
    {
        self.observers.register(CommitHook::AfterRollback, callback);
    }

    pub fn in_transaction(&self) -> bool {
        self.transaction.is_some()
    }

    /// Assigns `attributes` and saves, as one transaction.
    pub fn update<I, K, V>(&mut self, attributes: I) -> Result<()>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<Value>,
    {
        self.transaction(|record| {
            record.assign_all(attributes)?;
            record.save_row()
        })
    }

    /// Persists pending changes. Outside an explicit transaction the save is
    /// its own transaction.
    pub fn save(&mut self) -> Result<()> {
        self.transaction(|record| record.save_row())
    }

    /// Runs `f` inside a transaction on this record.
    ///
    /// Nested calls join the open transaction. An error from `f` rolls the
    /// transaction back and is returned unchanged.
    pub fn transaction<T, F>(&mut self, f: F) -> Result<T>
    where
        F: FnOnce(&mut Self) -> Result<T>,
    {
        if self.transaction.is_some() {
            return f(self);
        }

        self.begin();
        match f(self) {
            Ok(value) => {
                self.commit()?;
                Ok(value)
            }
            Err(err) => Err(self.abort(err)),
        }
    }

    /// Discards pending assignments and re-reads the stored row.
    pub fn reload(&mut self) -> Result<()> {
        let id = self.id().ok_or_else(|| {
            ChangeError::InvalidTransactionState(format!(
                "Cannot reload an unsaved record of '{}'",
                self.table.name()
            ))
        })?;
        self.load_row(id)
    }

    fn attribute(&self, name: &str) -> Result<&Attribute> {
        self.state.tracker.attribute(name).ok_or_else(|| {
            ChangeError::UnknownAttribute(name.to_string(), self.table.name().to_string())
        })
    }

    fn load_row(&mut self, id: i64) -> Result<()> {
        let row = self
            .table
            .get(id)?
            .ok_or_else(|| ChangeError::RecordNotFound(id, self.table.name().to_string()))?;

        let attributes = self
            .table
            .schema()
            .schema()
            .columns()
            .iter()
            .zip(row)
            .map(|(column, value)| Attribute::from_database(column.name.clone(), column.data_type, value))
            .collect();
        self.state = RecordState {
            tracker: MutationTracker::new(attributes),
            new_record: false,
        };
        Ok(())
    }

    fn row(&self) -> Row {
        self.state
            .tracker
            .attributes()
            .iter()
            .map(|attribute| attribute.value().clone())
            .collect()
    }

    fn journal(&mut self, change: Change) -> Result<()> {
        match self.transaction.as_mut() {
            Some(transaction) => transaction.record_change(change),
            None => Err(ChangeError::InvalidTransactionState(
                "Row write outside a transaction".to_string(),
            )),
        }
    }

    fn save_row(&mut self) -> Result<()> {
        self.aggregator.on_before_save(&self.state);

        if self.state.new_record {
            let id = self.table.insert(self.row())?;
            self.journal(Change::InsertRow {
                table: self.table.name().to_string(),
                id,
            })?;
            self.state
                .tracker
                .attributes_mut()
                .write_value(PRIMARY_KEY, Value::Integer(id));
            self.state.new_record = false;
        } else if self.state.tracker.has_changes() {
            let id = self.id().ok_or_else(|| {
                ChangeError::ConstraintViolation(format!(
                    "Persisted record of '{}' has no primary key",
                    self.table.name()
                ))
            })?;
            let new_row = self.row();
            let old_row = self.table.update(id, new_row.clone())?;
            self.journal(Change::UpdateRow {
                table: self.table.name().to_string(),
                id,
                old_row,
                new_row,
            })?;
        }

        let change_set = self.state.tracker.changes();
        self.state.tracker.changes_applied();
        self.aggregator.on_after_save(change_set);
        Ok(())
    }

    fn begin(&mut self) {
        let transaction = Transaction::new(TransactionId::next());
        debug!(transaction = %transaction.id(), table = self.table.name(), "begin");

        self.start_state = Some(self.state.clone());
        self.aggregator.on_transaction_begin(&self.state);
        self.transaction = Some(transaction);
    }

    fn commit(&mut self) -> Result<()> {
        if let Err(err) = self.aggregator.on_before_commit(&self.state) {
            return Err(self.abort(err));
        }
        if let Err(err) = self.observers.run(
            CommitHook::BeforeCommit,
            self.aggregator.net_changes_for_transaction(),
        ) {
            return Err(self.abort(err));
        }

        let mut transaction = self.transaction.take().ok_or_else(|| {
            ChangeError::InvalidTransactionState("No open transaction to commit".to_string())
        })?;
        transaction.commit()?;
        self.start_state = None;
        self.aggregator.on_after_commit();
        debug!(
            transaction = %transaction.id(),
            writes = transaction.change_count(),
            "commit"
        );

        self.observers.run(
            CommitHook::AfterCommit,
            self.aggregator.net_changes_for_transaction(),
        )
    }

    /// Rolls back after `err` and hands `err` back. A failing rollback is
    /// logged and does not replace the error that caused it.
    fn abort(&mut self, err: ChangeError) -> ChangeError {
        let id = self.transaction.as_ref().map(Transaction::id);
        warn!("Rolling back {:?} on '{}': {}", id, self.table.name(), err);
        if let Err(rollback_err) = self.rollback() {
            warn!("Rollback failed on '{}': {}", self.table.name(), rollback_err);
        }
        err
    }

    /// Undoes the journal newest first, restores the attribute state and
    /// resets the aggregator, even when an undo fails. The first undo error
    /// is returned after that.
    fn rollback(&mut self) -> Result<()> {
        let mut transaction = self.transaction.take().ok_or_else(|| {
            ChangeError::InvalidTransactionState("No open transaction to roll back".to_string())
        })?;
        let rolled_back = self.aggregator.net_changes_for_transaction().clone();

        let mut undo_error = None;
        let journal = transaction.rollback().unwrap_or_else(|err| {
            undo_error = Some(err);
            Vec::new()
        });
        for change in journal.iter().rev() {
            if let Err(err) = change.undo(&self.table) {
                warn!(
                    "Cannot undo write to row {} of '{}': {}",
                    change.row_id(),
                    change.table_name(),
                    err
                );
                undo_error.get_or_insert(err);
            }
        }
        if let Some(start) = self.start_state.take() {
            self.state = start;
        }
        self.aggregator.on_rollback();
        debug!(transaction = %transaction.id(), undone = journal.len(), "rollback");

        if let Some(err) = undo_error {
            return Err(err);
        }
        self.observers.run(CommitHook::AfterRollback, &rolled_back)
    }
}

impl std::fmt::Debug for Record {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Record")
            .field("table", &self.table.name())
            .field("id", &self.id())
            .field("new_record", &self.state.new_record)
            .field("in_transaction", &self.in_transaction())
            .finish()
    }
}
