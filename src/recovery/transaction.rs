use std::fmt;

use crate::wal::TxnId;

/// Opaque transaction handle; all durable effects go through the recovery manager
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Transaction {
    id: TxnId,
}

impl Transaction {
    pub(crate) fn new(id: TxnId) -> Self {
        Self { id }
    }

    pub fn id(&self) -> TxnId {
        self.id
    }
}

/// Lifecycle of a transaction: `InProgress` then exactly one terminal state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TxnState {
    InProgress,
    Committed,
    Aborted,
}

impl fmt::Display for TxnState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TxnState::InProgress => write!(f, "in progress"),
            TxnState::Committed => write!(f, "committed"),
            TxnState::Aborted => write!(f, "aborted"),
        }
    }
}
