//! Common imports for hosts and commit observers.
//!
//! Hosts plugging their own persistence layer in need the `changes` traits;
//! applications using the in-memory host usually only need `Record`.

pub use crate::changes::{
    AttributeChange, AttributeHost, ChangeAggregator, ChangeSet, MutationTracker,
    TransactionListener,
};
pub use crate::config::{AggregatorConfig, MissingBaseline};
pub use crate::core::{ChangeError, DataType, Result, Value};
pub use crate::record::{CommitHook, Record, saved_change_to};
pub use crate::storage::{Table, TableSchema};
