// ============================================================================
// In-memory Record Host
// ============================================================================
//
// A small active-record style persistence layer over `storage::Table`. It
// supplies the lifecycle events the change aggregator listens to and exposes
// the aggregated view to commit observers.
//
// ============================================================================

pub mod model;
pub mod observers;

pub use model::Record;
pub use observers::{Callback, CommitHook, Condition, Observers, saved_change_to};
