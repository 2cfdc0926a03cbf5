use thiserror::Error;

use super::BTreeKey;
use crate::buffer::BufferError;
use crate::file::BlockNumber;

/// Errors that can occur during B+ tree operations
#[derive(Debug, Error)]
pub enum BTreeError {
    #[error("Buffer error: {0}")]
    Buffer(#[from] BufferError),

    #[error("Key out of range: {0} (keys must be below the sentinel)")]
    KeyOutOfRange(BTreeKey),

    #[error("Duplicate key: {0}")]
    DuplicateKey(BTreeKey),

    #[error("Page overflow: {size} bytes exceeds page size {max}")]
    PageOverflow { size: usize, max: usize },

    #[error("Page with {0} keys cannot be split")]
    InvalidSplit(usize),

    #[error("Corrupted page: {0}")]
    CorruptedPage(String),

    #[error("Invalid tree state at block {block}: {reason}")]
    InvalidState { block: BlockNumber, reason: String },

    #[error("Invalid max degree: {0} (must be >= 3)")]
    InvalidDegree(usize),
}

pub type BTreeResult<T> = Result<T, BTreeError>;
