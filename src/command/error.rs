use thiserror::Error;

use crate::record::RecordError;
use crate::recovery::RecoveryError;
use crate::storage::StorageError;
use crate::wal::TxnId;

#[derive(Debug, Error)]
pub enum CommandError {
    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Recovery error: {0}")]
    Recovery(#[from] RecoveryError),

    #[error("Record error: {0}")]
    Record(#[from] RecordError),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Expected {expected} values, got {actual}")]
    ArityMismatch { expected: usize, actual: usize },

    #[error("The table has no columns yet")]
    EmptySchema,

    #[error("No transaction in progress")]
    NoTransaction,

    #[error("Transaction {0} is still in progress")]
    TransactionActive(TxnId),
}

pub type CommandResult<T> = Result<T, CommandError>;
