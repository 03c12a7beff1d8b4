// ============================================================================
// Transaction Change Aggregation
// ============================================================================
//
// Per-save change-sets are collected for the lifetime of a transaction and
// merged into one net change-set before commit observers run.
//
// ============================================================================

pub mod aggregator;
pub mod attribute;
pub mod change;
pub mod host;
pub mod tracker;

pub use aggregator::{AggregatorPhase, ChangeAggregator};
pub use attribute::{Attribute, AttributeSet};
pub use change::{AttributeChange, ChangeSet};
pub use host::{AttributeHost, TransactionListener};
pub use tracker::MutationTracker;
