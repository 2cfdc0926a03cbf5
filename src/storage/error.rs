use thiserror::Error;

use crate::btree::BTreeError;
use crate::buffer::BufferError;
use crate::file::FileError;
use crate::record::RecordError;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("File error: {0}")]
    File(#[from] FileError),

    #[error("Buffer error: {0}")]
    Buffer(#[from] BufferError),

    #[error("B+ tree error: {0}")]
    BTree(#[from] BTreeError),

    #[error("Record error: {0}")]
    Record(#[from] RecordError),

    #[error("Storage already exists: {0}")]
    AlreadyExists(String),

    #[error("Storage not found: {0}")]
    NotFound(String),

    #[error("Invalid magic number in meta page")]
    InvalidMagic,

    #[error("Unsupported storage version: {0}")]
    UnsupportedVersion(u32),

    #[error("Corrupted meta page: {0}")]
    CorruptedMeta(String),

    #[error("Key not found: {0}")]
    KeyNotFound(String),

    #[error("The primary key column cannot be updated")]
    PrimaryKeyUpdate,

    #[error("Columns cannot be added once rows exist")]
    SchemaFrozen,

    #[error("Invalid update: {0}")]
    InvalidUpdate(String),
}

pub type StorageResult<T> = Result<T, StorageError>;
