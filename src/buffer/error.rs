use thiserror::Error;

use super::FrameId;
use crate::btree::BTreeError;
use crate::file::{BlockId, FileError};

#[derive(Debug, Error)]
pub enum BufferError {
    #[error("File error: {0}")]
    File(#[from] FileError),

    #[error("Page codec error: {0}")]
    Page(#[from] Box<BTreeError>),

    #[error("Buffer pool is full")]
    PoolFull,

    #[error("All {0} frames are pinned")]
    AllPinned(usize),

    #[error("Invalid frame: {0}")]
    InvalidFrame(FrameId),

    #[error("Frame {0} is not pinned")]
    NotPinned(FrameId),

    #[error("Block is not resident: {0}")]
    NotResident(BlockId),

    #[error("Block is already resident: {0}")]
    AlreadyResident(BlockId),

    #[error("Block does not exist on disk: {0}")]
    BlockNotFound(BlockId),

    #[error("Block is pinned: {0}")]
    Pinned(BlockId),
}

impl From<BTreeError> for BufferError {
    fn from(err: BTreeError) -> Self {
        BufferError::Page(Box::new(err))
    }
}

pub type BufferResult<T> = Result<T, BufferError>;
