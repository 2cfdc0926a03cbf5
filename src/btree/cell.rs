use super::BTreeKey;
use super::error::{BTreeError, BTreeResult};
use crate::file::BlockNumber;

/// Leaf payload: a key and the full encoded row it was derived from
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyValueCell {
    pub key: BTreeKey,
    pub record: Vec<u8>,
}

/// Internal separator: `child` holds keys below `key`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyCell {
    pub key: BTreeKey,
    pub child: BlockNumber,
}

/// A slotted-page cell. Leaves hold only `KeyValue`, internal nodes only `Key`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Cell {
    KeyValue(KeyValueCell),
    Key(KeyCell),
}

impl Cell {
    pub fn key(&self) -> BTreeKey {
        match self {
            Cell::KeyValue(cell) => cell.key,
            Cell::Key(cell) => cell.key,
        }
    }

    /// Encoded size in bytes
    pub fn encoded_len(&self) -> usize {
        match self {
            // key + record length + record
            Cell::KeyValue(cell) => 4 + 4 + cell.record.len(),
            // key + child block
            Cell::Key(_) => 4 + 4,
        }
    }

    /// Write the cell into `buf`, which must be exactly `encoded_len()` bytes
    pub fn serialize_into(&self, buf: &mut [u8]) {
        buf[0..4].copy_from_slice(&self.key().to_le_bytes());
        match self {
            Cell::KeyValue(cell) => {
                buf[4..8].copy_from_slice(&(cell.record.len() as u32).to_le_bytes());
                buf[8..8 + cell.record.len()].copy_from_slice(&cell.record);
            }
            Cell::Key(cell) => {
                buf[4..8].copy_from_slice(&cell.child.to_le_bytes());
            }
        }
    }

    /// Decode a cell starting at the beginning of `data`
    pub fn deserialize(data: &[u8], is_leaf: bool) -> BTreeResult<Self> {
        if data.len() < 8 {
            return Err(BTreeError::CorruptedPage(format!(
                "Cell needs 8 bytes, {} available",
                data.len()
            )));
        }

        let key = i32::from_le_bytes([data[0], data[1], data[2], data[3]]);
        let second = u32::from_le_bytes([data[4], data[5], data[6], data[7]]);

        if !is_leaf {
            return Ok(Cell::Key(KeyCell { key, child: second }));
        }

        let len = second as usize;
        let record = data.get(8..8 + len).ok_or_else(|| {
            BTreeError::CorruptedPage(format!(
                "Record of {} bytes runs past the page end",
                len
            ))
        })?;
        Ok(Cell::KeyValue(KeyValueCell {
            key,
            record: record.to_vec(),
        }))
    }
}
