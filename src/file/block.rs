use std::fmt;

use super::BlockNumber;

/// Identity of one fixed-size block of a named file
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct BlockId {
    file_name: String,
    number: BlockNumber,
}

impl BlockId {
    pub fn new(file_name: impl Into<String>, number: BlockNumber) -> Self {
        Self {
            file_name: file_name.into(),
            number,
        }
    }

    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    pub fn number(&self) -> BlockNumber {
        self.number
    }
}

impl fmt::Display for BlockId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.file_name, self.number)
    }
}

/// Issues fresh block numbers for one file.
///
/// The counter is owned by whoever owns the file (the storage handle keeps
/// it in its meta page), so independent storages never share numbering.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockAllocator {
    next: BlockNumber,
}

impl BlockAllocator {
    /// Create an allocator whose first issued block is `next`
    pub fn new(next: BlockNumber) -> Self {
        Self { next }
    }

    /// Issue a new, never before used block number
    pub fn allocate(&mut self) -> BlockNumber {
        let number = self.next;
        self.next += 1;
        number
    }

    /// The block number the next call to `allocate` will return
    pub fn peek(&self) -> BlockNumber {
        self.next
    }

    /// Restart numbering at `next`
    pub fn reset(&mut self, next: BlockNumber) {
        self.next = next;
    }
}
