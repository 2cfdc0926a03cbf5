//! Meta page serialization (block 0 of the storage file)

use super::error::{StorageError, StorageResult};
use crate::file::{BlockNumber, PAGE_SIZE};
use crate::record::Schema;

/// Magic number for storage files: "PGDB" in ASCII
pub const MAGIC_NUMBER: u32 = 0x50474442;

/// Current storage file version
pub const VERSION: u32 = 1;

/// Fixed part of the meta page: magic, version, root, block counter, degree
const FIXED_SIZE: usize = 20;

/// Everything needed to rebuild a storage handle from disk
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetaPage {
    pub root: BlockNumber,
    /// Next block number the allocator will hand out
    pub next_block: BlockNumber,
    pub max_degree: u32,
    pub schema: Schema,
}

impl MetaPage {
    /// Serialize into a full block
    pub fn serialize(&self) -> StorageResult<Vec<u8>> {
        let size = FIXED_SIZE + self.schema.encoded_len();
        if size > PAGE_SIZE {
            return Err(StorageError::CorruptedMeta(format!(
                "Schema needs {} bytes, meta page holds {}",
                size, PAGE_SIZE
            )));
        }

        let mut buf = Vec::with_capacity(PAGE_SIZE);
        buf.extend_from_slice(&MAGIC_NUMBER.to_le_bytes());
        buf.extend_from_slice(&VERSION.to_le_bytes());
        buf.extend_from_slice(&self.root.to_le_bytes());
        buf.extend_from_slice(&self.next_block.to_le_bytes());
        buf.extend_from_slice(&self.max_degree.to_le_bytes());
        self.schema.serialize_into(&mut buf);
        buf.resize(PAGE_SIZE, 0);
        Ok(buf)
    }

    /// Deserialize from a full block
    pub fn deserialize(buf: &[u8]) -> StorageResult<Self> {
        if buf.len() < PAGE_SIZE {
            return Err(StorageError::CorruptedMeta(
                "Buffer too small for meta page".to_string(),
            ));
        }

        let field =
            |at: usize| u32::from_le_bytes([buf[at], buf[at + 1], buf[at + 2], buf[at + 3]]);

        if field(0) != MAGIC_NUMBER {
            return Err(StorageError::InvalidMagic);
        }
        let version = field(4);
        if version != VERSION {
            return Err(StorageError::UnsupportedVersion(version));
        }

        let root = field(8);
        let next_block = field(12);
        if root == 0 || root >= next_block {
            return Err(StorageError::CorruptedMeta(format!(
                "Root block {} outside allocated range 1..{}",
                root, next_block
            )));
        }

        let mut offset = FIXED_SIZE;
        let schema = Schema::deserialize(buf, &mut offset)?;

        Ok(Self {
            root,
            next_block,
            max_degree: field(16),
            schema,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::DataType;

    fn create_test_meta() -> MetaPage {
        let mut schema = Schema::new();
        schema.add_column("hoge", DataType::Integer).unwrap();
        schema.add_column("country", DataType::Char(13)).unwrap();
        MetaPage {
            root: 1,
            next_block: 9,
            max_degree: 3,
            schema,
        }
    }

    #[test]
    fn test_round_trip() {
        let meta = create_test_meta();
        let bytes = meta.serialize().unwrap();
        assert_eq!(bytes.len(), PAGE_SIZE);

        let decoded = MetaPage::deserialize(&bytes).unwrap();
        assert_eq!(decoded, meta);
        assert_eq!(decoded.serialize().unwrap(), bytes);
    }

    #[test]
    fn test_invalid_magic() {
        let result = MetaPage::deserialize(&vec![0u8; PAGE_SIZE]);
        assert!(matches!(result, Err(StorageError::InvalidMagic)));
    }

    #[test]
    fn test_unsupported_version() {
        let mut bytes = create_test_meta().serialize().unwrap();
        bytes[4..8].copy_from_slice(&7u32.to_le_bytes());
        assert!(matches!(
            MetaPage::deserialize(&bytes),
            Err(StorageError::UnsupportedVersion(7))
        ));
    }

    #[test]
    fn test_root_outside_allocated_range() {
        let mut meta = create_test_meta();
        meta.root = 12;
        let bytes = meta.serialize().unwrap();
        assert!(matches!(
            MetaPage::deserialize(&bytes),
            Err(StorageError::CorruptedMeta(_))
        ));
    }
}
