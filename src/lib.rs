// ============================================================================
// netchanges
// ============================================================================
//
// Transaction-wide change tracking for records: every save inside one
// transaction reports its own change-set, and commit observers see a single
// merged change-set as if the whole transaction had been one save.
//
// ============================================================================

//! # Example
//!
//! ```
//! use netchanges::prelude::*;
//! use netchanges::core::Column;
//!
//! # fn main() -> netchanges::Result<()> {
//! let table = Table::new(TableSchema::new(
//!     "test_models",
//!     vec![Column::new("name", DataType::Text), Column::new("value", DataType::Text)],
//! ));
//! let mut record = Record::create(&table, [("name", "foo"), ("value", "bar")])?;
//!
//! record.transaction(|r| {
//!     r.update([("name", "baz")])?;
//!     r.update([("value", "biz")])?;
//!     r.update([("name", "fub")])
//! })?;
//!
//! assert_eq!(record.previous_change("name"), Some(&AttributeChange::new("foo", "fub")));
//! assert_eq!(record.previous_change("value"), Some(&AttributeChange::new("bar", "biz")));
//! # Ok(())
//! # }
//! ```

pub mod changes;
pub mod config;
pub mod core;
pub mod prelude;
pub mod record;
pub mod storage;
pub mod transaction;

pub use crate::changes::{
    AggregatorPhase, AttributeChange, AttributeHost, ChangeAggregator, ChangeSet,
    TransactionListener,
};
pub use crate::config::{AggregatorConfig, MissingBaseline};
pub use crate::core::{ChangeError, DataType, Result, Value};
pub use crate::record::Record;
