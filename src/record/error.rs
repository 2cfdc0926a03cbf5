use thiserror::Error;

#[derive(Debug, Error)]
pub enum RecordError {
    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Deserialization error: {0}")]
    Deserialization(String),

    #[error("Schema mismatch: {0}")]
    SchemaMismatch(String),

    #[error("Type mismatch: expected {expected}, got {actual}")]
    TypeMismatch { expected: String, actual: String },

    #[error("Column not found: {0}")]
    ColumnNotFound(String),

    #[error("Column already exists: {0}")]
    DuplicateColumn(String),

    #[error("Record size {size} exceeds maximum {max}")]
    RecordTooLarge { size: usize, max: usize },
}

pub type RecordResult<T> = Result<T, RecordError>;
