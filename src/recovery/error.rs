use thiserror::Error;

use super::TxnState;
use crate::storage::StorageError;
use crate::wal::{TxnId, WalError};

#[derive(Debug, Error)]
pub enum RecoveryError {
    #[error("Log error: {0}")]
    Wal(#[from] WalError),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Transaction {txn} cannot {action}: it is {state}")]
    InvalidTransition {
        txn: TxnId,
        state: TxnState,
        action: &'static str,
    },

    #[error("Transaction {0} was never begun")]
    UnknownTransaction(TxnId),
}

pub type RecoveryResult<T> = Result<T, RecoveryError>;
