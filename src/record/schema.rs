use super::MAX_RECORD_SIZE;
use super::error::{RecordError, RecordResult};
use super::value::{DataType, Value};

/// Column definition with its fixed position inside a row
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Column {
    pub name: String,
    pub data_type: DataType,
    pub offset: usize,
}

impl Column {
    /// Get the size of this column in bytes
    pub fn size(&self) -> usize {
        self.data_type.size()
    }

    /// Byte range of this column inside an encoded row
    pub fn range(&self) -> std::ops::Range<usize> {
        self.offset..self.offset + self.size()
    }

    /// Encoded length of this descriptor
    fn encoded_len(&self) -> usize {
        1 + 4 + 4 + 4 + self.name.len()
    }

    /// Append this descriptor as `[type u8][size u32][offset u32][name_len u32][name]`
    fn serialize_into(&self, buf: &mut Vec<u8>) {
        buf.push(self.data_type.type_id());
        buf.extend_from_slice(&(self.size() as u32).to_le_bytes());
        buf.extend_from_slice(&(self.offset as u32).to_le_bytes());
        buf.extend_from_slice(&(self.name.len() as u32).to_le_bytes());
        buf.extend_from_slice(self.name.as_bytes());
    }

    fn deserialize(data: &[u8], offset: &mut usize) -> RecordResult<Self> {
        let type_id = *data
            .get(*offset)
            .ok_or_else(|| truncated("column type"))?;
        *offset += 1;
        let size = read_u32(data, offset)? as usize;
        let column_offset = read_u32(data, offset)? as usize;
        let name_len = read_u32(data, offset)? as usize;
        let name_bytes = data
            .get(*offset..*offset + name_len)
            .ok_or_else(|| truncated("column name"))?;
        *offset += name_len;

        let name = String::from_utf8(name_bytes.to_vec())
            .map_err(|e| RecordError::Deserialization(format!("Invalid column name: {}", e)))?;

        Ok(Self {
            name,
            data_type: DataType::from_type_id(type_id, size)?,
            offset: column_offset,
        })
    }
}

fn truncated(what: &str) -> RecordError {
    RecordError::Deserialization(format!("Truncated schema while reading {}", what))
}

fn read_u32(data: &[u8], offset: &mut usize) -> RecordResult<u32> {
    let bytes = data
        .get(*offset..*offset + 4)
        .ok_or_else(|| truncated("integer field"))?;
    *offset += 4;
    Ok(u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
}

/// Ordered, append-only list of columns. Column 0 is the primary key.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Schema {
    columns: Vec<Column>,
    record_size: usize,
}

impl Schema {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a column; its offset is the running sum of prior widths
    pub fn add_column(&mut self, name: &str, data_type: DataType) -> RecordResult<()> {
        if self.find_column(name).is_some() {
            return Err(RecordError::DuplicateColumn(name.to_string()));
        }

        let size = self.record_size + data_type.size();
        if size > MAX_RECORD_SIZE {
            return Err(RecordError::RecordTooLarge {
                size,
                max: MAX_RECORD_SIZE,
            });
        }

        self.columns.push(Column {
            name: name.to_string(),
            data_type,
            offset: self.record_size,
        });
        self.record_size = size;
        Ok(())
    }

    /// Get all columns
    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    /// Get column count
    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    /// Get a specific column
    pub fn column(&self, idx: usize) -> Option<&Column> {
        self.columns.get(idx)
    }

    /// Find column index by name
    pub fn find_column(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.name == name)
    }

    /// Find column index by name, failing if absent
    pub fn column_index(&self, name: &str) -> RecordResult<usize> {
        self.find_column(name)
            .ok_or_else(|| RecordError::ColumnNotFound(name.to_string()))
    }

    /// Get total record size in bytes
    pub fn record_size(&self) -> usize {
        self.record_size
    }

    /// Encode one value per column into a row
    pub fn encode(&self, values: &[Value]) -> RecordResult<Vec<u8>> {
        if self.columns.is_empty() {
            return Err(RecordError::SchemaMismatch(
                "Schema has no columns".to_string(),
            ));
        }
        if values.len() != self.columns.len() {
            return Err(RecordError::SchemaMismatch(format!(
                "Expected {} columns, got {}",
                self.columns.len(),
                values.len()
            )));
        }

        let mut record = Vec::with_capacity(self.record_size);
        for (value, column) in values.iter().zip(&self.columns) {
            record.extend_from_slice(&value.serialize(&column.data_type)?);
        }
        Ok(record)
    }

    /// Decode the value of column `idx` from a row
    pub fn decode_column(&self, record: &[u8], idx: usize) -> RecordResult<Value> {
        let column = self
            .column(idx)
            .ok_or_else(|| RecordError::ColumnNotFound(format!("#{}", idx)))?;
        let bytes = record.get(column.range()).ok_or_else(|| {
            RecordError::Deserialization(format!(
                "Record of {} bytes has no column '{}'",
                record.len(),
                column.name
            ))
        })?;
        Value::deserialize(bytes, &column.data_type)
    }

    /// Decode every column of a row
    pub fn decode(&self, record: &[u8]) -> RecordResult<Vec<Value>> {
        (0..self.columns.len())
            .map(|idx| self.decode_column(record, idx))
            .collect()
    }

    /// Tree key of an encoded row, derived from column 0.
    ///
    /// Integers are their own key. Fixed-width strings use their first four
    /// bytes read as a big-endian `u32` with the sign bit flipped, so keys
    /// follow unsigned byte prefix order across the whole `i32` range.
    pub fn key_of(&self, record: &[u8]) -> RecordResult<i32> {
        let column = self
            .column(0)
            .ok_or_else(|| RecordError::SchemaMismatch("Schema has no columns".to_string()))?;
        let bytes = record.get(column.range()).ok_or_else(|| {
            RecordError::Deserialization(format!(
                "Record of {} bytes has no primary key",
                record.len()
            ))
        })?;

        let mut prefix = [0u8; 4];
        let n = bytes.len().min(4);
        prefix[..n].copy_from_slice(&bytes[..n]);
        Ok(match column.data_type {
            DataType::Integer => i32::from_le_bytes(prefix),
            DataType::Char(_) => (u32::from_be_bytes(prefix) ^ 0x8000_0000) as i32,
        })
    }

    /// Tree key of a primary key value
    pub fn key_of_value(&self, value: &Value) -> RecordResult<i32> {
        let column = self
            .column(0)
            .ok_or_else(|| RecordError::SchemaMismatch("Schema has no columns".to_string()))?;
        let bytes = value.serialize(&column.data_type)?;

        let mut record = vec![0u8; self.record_size];
        record[column.range()].copy_from_slice(&bytes);
        self.key_of(&record)
    }

    /// Encoded length of `[column_count u32][descriptors...]`
    pub fn encoded_len(&self) -> usize {
        4 + self.columns.iter().map(Column::encoded_len).sum::<usize>()
    }

    /// Append `[column_count u32][descriptors...]`
    pub fn serialize_into(&self, buf: &mut Vec<u8>) {
        buf.extend_from_slice(&(self.columns.len() as u32).to_le_bytes());
        for column in &self.columns {
            column.serialize_into(buf);
        }
    }

    /// Read a schema written by `serialize_into`, advancing `offset`
    pub fn deserialize(data: &[u8], offset: &mut usize) -> RecordResult<Self> {
        let count = read_u32(data, offset)? as usize;
        let mut schema = Schema::new();

        for _ in 0..count {
            let column = Column::deserialize(data, offset)?;
            if column.offset != schema.record_size {
                return Err(RecordError::Deserialization(format!(
                    "Column '{}' at offset {}, expected {}",
                    column.name, column.offset, schema.record_size
                )));
            }
            schema.record_size += column.size();
            schema.columns.push(column);
        }

        Ok(schema)
    }
}
