use super::{ChangeSet, MutationTracker};
use crate::core::{DataType, Result, Value};

/// What the change aggregator needs from the persistence layer that owns
/// the record.
pub trait AttributeHost {
    /// Deep copy of the record's current attribute state, including pending
    /// assignments and forced-change markers.
    fn attribute_snapshot(&self) -> MutationTracker;

    /// Re-hydrates a raw value through the host's type-casting rules.
    fn cast_user_value(&self, name: &str, value: Value, data_type: DataType) -> Result<Value> {
        let _ = name;
        data_type.cast_user_value(value)
    }
}

/// Fixed-order lifecycle listener attached to one record.
///
/// ```text
/// Idle ──after_save──> Accumulating ──before_commit──> Merging ──> Idle
///                           │
///                           └──────rollback──────> Idle
/// ```
pub trait TransactionListener {
    /// A logical transaction opened; nothing has been saved in it yet.
    fn on_transaction_begin(&mut self, host: &dyn AttributeHost);

    /// A save is about to run. Captures the baseline when no transaction
    /// begin was seen.
    fn on_before_save(&mut self, host: &dyn AttributeHost);

    /// One save completed and produced `change_set`.
    fn on_after_save(&mut self, change_set: ChangeSet);

    /// All saves are done and commit observers are about to run.
    fn on_before_commit(&mut self, host: &dyn AttributeHost) -> Result<()>;

    /// The transaction is durable; a later rollback belongs to a new one.
    fn on_after_commit(&mut self);

    /// The transaction aborted. The change view goes back to what the last
    /// committed transaction left.
    fn on_rollback(&mut self);
}
