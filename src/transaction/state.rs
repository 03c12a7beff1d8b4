// ============================================================================
// Record Transaction
// ============================================================================
//
// One record-level transaction: an id for log correlation, a guard that
// only lets an open transaction take writes, and the journal of row writes
// handed back on rollback.
//
//   Open ──commit──> Committed
//     │
//     └──rollback──> RolledBack
//
// ============================================================================

use super::Change;
use crate::core::{ChangeError, Result};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

static NEXT_TXN_ID: AtomicU64 = AtomicU64::new(1);

/// Process-unique transaction number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TransactionId(u64);

impl TransactionId {
    pub fn next() -> Self {
        TransactionId(NEXT_TXN_ID.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Display for TransactionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "txn_{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Status {
    Open,
    Committed,
    RolledBack,
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Status::Open => write!(f, "open"),
            Status::Committed => write!(f, "committed"),
            Status::RolledBack => write!(f, "rolled back"),
        }
    }
}

#[derive(Debug)]
pub struct Transaction {
    id: TransactionId,
    status: Status,
    journal: Vec<Change>,
}

impl Transaction {
    pub fn new(id: TransactionId) -> Self {
        Self {
            id,
            status: Status::Open,
            journal: Vec::new(),
        }
    }

    pub fn id(&self) -> TransactionId {
        self.id
    }

    /// Row writes journaled so far.
    pub fn change_count(&self) -> usize {
        self.journal.len()
    }

    fn ensure_open(&self, action: &str) -> Result<()> {
        if self.status != Status::Open {
            return Err(ChangeError::InvalidTransactionState(format!(
                "Cannot {}: transaction {} is {}",
                action, self.id, self.status
            )));
        }
        Ok(())
    }

    pub fn record_change(&mut self, change: Change) -> Result<()> {
        self.ensure_open("record change")?;
        self.journal.push(change);
        Ok(())
    }

    pub fn commit(&mut self) -> Result<()> {
        self.ensure_open("commit")?;
        self.status = Status::Committed;
        Ok(())
    }

    /// Closes the transaction and hands back its journal, oldest write first.
    pub fn rollback(&mut self) -> Result<Vec<Change>> {
        self.ensure_open("roll back")?;
        self.status = Status::RolledBack;
        Ok(std::mem::take(&mut self.journal))
    }
}
