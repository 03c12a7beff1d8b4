// ============================================================================
// Transaction Bookkeeping
// ============================================================================
//
// Transaction identity, lifecycle state and the journal of row writes the
// in-memory record host undoes on rollback.
//
// Design Patterns Used:
// - State Pattern: transaction status guards journal writes
// - Command Pattern: Reversible row writes for rollback
//
// ============================================================================

pub mod change;
pub mod state;

pub use change::Change;
pub use state::{Transaction, TransactionId};
