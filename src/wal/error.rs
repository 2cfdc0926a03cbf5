use thiserror::Error;

use crate::file::FileError;

#[derive(Debug, Error)]
pub enum WalError {
    #[error("File error: {0}")]
    File(#[from] FileError),

    #[error("Unknown log type: {0}")]
    UnknownLogType(u32),

    #[error("UPDATE records must carry update info")]
    UpdateWithoutInfo,

    #[error("Log record of {0} bytes does not fit in a log page")]
    RecordTooLarge(usize),

    #[error("Log page is full")]
    PageFull,

    #[error("Corrupted log: {0}")]
    CorruptedLog(String),
}

pub type WalResult<T> = Result<T, WalError>;
