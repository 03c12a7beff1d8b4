use thiserror::Error;

#[derive(Error, Debug)]
pub enum ChangeError {
    #[error("Type mismatch: {0}")]
    TypeMismatch(String),

    #[error("Attribute '{0}' not found on '{1}'")]
    UnknownAttribute(String, String),

    #[error("Record {0} not found in table '{1}'")]
    RecordNotFound(i64, String),

    #[error("Constraint violation: {0}")]
    ConstraintViolation(String),

    #[error("Invalid transaction state: {0}")]
    InvalidTransactionState(String),

    #[error("Transaction aborted: {0}")]
    Aborted(String),

    #[error("Observer failed: {0}")]
    Observer(String),

    #[error("Lock error: {0}")]
    LockError(String),
}

pub type Result<T> = std::result::Result<T, ChangeError>;

impl<T> From<std::sync::PoisonError<T>> for ChangeError {
    fn from(err: std::sync::PoisonError<T>) -> Self {
        Self::LockError(err.to_string())
    }
}
