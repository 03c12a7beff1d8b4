// ============================================================================
// Transaction Change Journal
// ============================================================================
//
// Each Change records one row write made inside a transaction, with enough
// state to reverse it on rollback.
//
// ============================================================================

use crate::core::{Result, Row};
use crate::storage::Table;

/// Represents a single reversible row write in a transaction
#[derive(Debug, Clone, PartialEq)]
pub enum Change {
    /// A new row was inserted
    InsertRow { table: String, id: i64 },

    /// An existing row was overwritten
    UpdateRow {
        table: String,
        id: i64,
        old_row: Row,
        new_row: Row,
    },
}

impl Change {
    /// Get the table name affected by this change
    pub fn table_name(&self) -> &str {
        match self {
            Change::InsertRow { table, .. } => table,
            Change::UpdateRow { table, .. } => table,
        }
    }

    pub fn row_id(&self) -> i64 {
        match self {
            Change::InsertRow { id, .. } | Change::UpdateRow { id, .. } => *id,
        }
    }

    /// Reverses this write against `table`.
    pub fn undo(&self, table: &Table) -> Result<()> {
        match self {
            Change::InsertRow { id, .. } => {
                table.delete(*id)?;
            }
            Change::UpdateRow { id, old_row, .. } => {
                table.update(*id, old_row.clone())?;
            }
        }
        Ok(())
    }
}
