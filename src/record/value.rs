use std::fmt;

use super::error::{RecordError, RecordResult};

/// Represents a column data type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataType {
    Integer,     // 4 bytes
    Char(usize), // n bytes (fixed length)
}

impl DataType {
    const INTEGER_ID: u8 = 0;
    const CHAR_ID: u8 = 1;

    /// Get the size in bytes for this data type
    pub fn size(&self) -> usize {
        match self {
            DataType::Integer => 4,
            DataType::Char(n) => *n,
        }
    }

    /// On-disk type tag
    pub fn type_id(&self) -> u8 {
        match self {
            DataType::Integer => Self::INTEGER_ID,
            DataType::Char(_) => Self::CHAR_ID,
        }
    }

    /// Rebuild a type from its tag and width
    pub fn from_type_id(id: u8, size: usize) -> RecordResult<Self> {
        match id {
            Self::INTEGER_ID if size == 4 => Ok(DataType::Integer),
            Self::CHAR_ID if size > 0 => Ok(DataType::Char(size)),
            _ => Err(RecordError::Deserialization(format!(
                "Unknown column type: id={}, size={}",
                id, size
            ))),
        }
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DataType::Integer => write!(f, "INT"),
            DataType::Char(n) => write!(f, "CHAR({})", n),
        }
    }
}

/// Represents a single column value
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {
    Integer(i32),
    Char(String),
}

impl Value {
    /// Serialize value to exactly `data_type.size()` bytes.
    /// Strings are zero-padded to the column width.
    pub fn serialize(&self, data_type: &DataType) -> RecordResult<Vec<u8>> {
        match (self, data_type) {
            (Value::Integer(i), DataType::Integer) => Ok(i.to_le_bytes().to_vec()),
            (Value::Char(s), DataType::Char(max_len)) => {
                let bytes = s.as_bytes();
                if bytes.len() > *max_len {
                    return Err(RecordError::Serialization(format!(
                        "String length {} exceeds max length {}",
                        bytes.len(),
                        max_len
                    )));
                }
                let mut result = vec![0u8; *max_len];
                result[..bytes.len()].copy_from_slice(bytes);
                Ok(result)
            }
            _ => Err(RecordError::TypeMismatch {
                expected: data_type.to_string(),
                actual: format!("{:?}", self),
            }),
        }
    }

    /// Deserialize value from bytes
    pub fn deserialize(bytes: &[u8], data_type: &DataType) -> RecordResult<Self> {
        if bytes.len() != data_type.size() {
            return Err(RecordError::Deserialization(format!(
                "Expected {} bytes for {}, got {}",
                data_type.size(),
                data_type,
                bytes.len()
            )));
        }

        match data_type {
            DataType::Integer => Ok(Value::Integer(i32::from_le_bytes([
                bytes[0], bytes[1], bytes[2], bytes[3],
            ]))),
            DataType::Char(_) => {
                // Find the first null byte (string terminator)
                let end = bytes.iter().position(|&b| b == 0).unwrap_or(bytes.len());
                let s = String::from_utf8(bytes[..end].to_vec())
                    .map_err(|e| RecordError::Deserialization(format!("Invalid UTF-8: {}", e)))?;
                Ok(Value::Char(s))
            }
        }
    }

    /// Parse a textual literal as a value of `data_type`
    pub fn parse(text: &str, data_type: &DataType) -> RecordResult<Self> {
        match data_type {
            DataType::Integer => text
                .trim()
                .parse::<i32>()
                .map(Value::Integer)
                .map_err(|e| RecordError::TypeMismatch {
                    expected: data_type.to_string(),
                    actual: format!("'{}' ({})", text, e),
                }),
            DataType::Char(_) => Ok(Value::Char(text.to_string())),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Integer(i) => write!(f, "{}", i),
            Value::Char(s) => write!(f, "{}", s),
        }
    }
}
