use super::BTreeKey;
use super::cell::{Cell, KeyCell};
use super::error::{BTreeError, BTreeResult};
use crate::file::{BlockNumber, PAGE_SIZE};
use crate::wal::Lsn;

/// Block number meaning "no child". Block 0 always holds the meta page.
pub const NO_CHILD: BlockNumber = 0;

/// Page header stored at the beginning of each page
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PageHeader {
    pub is_leaf: bool,                // 1 byte
    pub slot_count: u32,              // 4 bytes - cells, plus the rightmost child when internal
    pub rightmost_child: BlockNumber, // 4 bytes - internal pages only
    pub page_lsn: Lsn,                // 4 bytes - last logged change applied to this page
    pub rec_lsn: Lsn,                 // 4 bytes - first logged change since the page was clean
}

impl PageHeader {
    pub const SIZE: usize = 17;

    pub fn serialize(&self) -> [u8; Self::SIZE] {
        let mut result = [0u8; Self::SIZE];
        result[0] = self.is_leaf as u8;
        result[1..5].copy_from_slice(&self.slot_count.to_le_bytes());
        result[5..9].copy_from_slice(&self.rightmost_child.to_le_bytes());
        result[9..13].copy_from_slice(&self.page_lsn.to_le_bytes());
        result[13..17].copy_from_slice(&self.rec_lsn.to_le_bytes());
        result
    }

    pub fn deserialize(data: &[u8]) -> BTreeResult<Self> {
        if data.len() < Self::SIZE {
            return Err(BTreeError::CorruptedPage(format!(
                "Not enough data for page header: {} bytes",
                data.len()
            )));
        }

        let is_leaf = match data[0] {
            0 => false,
            1 => true,
            other => {
                return Err(BTreeError::CorruptedPage(format!(
                    "Invalid leaf flag: {}",
                    other
                )));
            }
        };

        Ok(Self {
            is_leaf,
            slot_count: u32::from_le_bytes([data[1], data[2], data[3], data[4]]),
            rightmost_child: u32::from_le_bytes([data[5], data[6], data[7], data[8]]),
            page_lsn: u32::from_le_bytes([data[9], data[10], data[11], data[12]]),
            rec_lsn: u32::from_le_bytes([data[13], data[14], data[15], data[16]]),
        })
    }
}

/// Decoded slotted page.
///
/// `pointers` maps logical slots (in key order) to indices into `cells`,
/// which only ever grows while the page is resident. Internal pages keep
/// their last child outside the key array, in `header.rightmost_child`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page {
    header: PageHeader,
    pointers: Vec<usize>,
    cells: Vec<Cell>,
}

impl Page {
    /// Create an empty leaf page
    pub fn new_leaf() -> Self {
        Self {
            header: PageHeader {
                is_leaf: true,
                ..PageHeader::default()
            },
            pointers: Vec::new(),
            cells: Vec::new(),
        }
    }

    /// Create an internal page with no children yet
    pub fn new_internal() -> Self {
        Self {
            header: PageHeader::default(),
            pointers: Vec::new(),
            cells: Vec::new(),
        }
    }

    /// Create an internal page over a single child
    pub fn with_child(child: BlockNumber) -> Self {
        let mut page = Self::new_internal();
        page.set_rightmost_child(child);
        page
    }

    pub fn header(&self) -> &PageHeader {
        &self.header
    }

    pub fn is_leaf(&self) -> bool {
        self.header.is_leaf
    }

    pub fn slot_count(&self) -> usize {
        self.header.slot_count as usize
    }

    /// Number of entries in the sorted key array
    pub fn key_count(&self) -> usize {
        self.pointers.len()
    }

    pub fn page_lsn(&self) -> Lsn {
        self.header.page_lsn
    }

    pub fn set_page_lsn(&mut self, lsn: Lsn) {
        self.header.page_lsn = lsn;
    }

    pub fn rec_lsn(&self) -> Lsn {
        self.header.rec_lsn
    }

    pub fn set_rec_lsn(&mut self, lsn: Lsn) {
        self.header.rec_lsn = lsn;
    }

    pub fn rightmost_child(&self) -> Option<BlockNumber> {
        (!self.header.is_leaf && self.header.rightmost_child != NO_CHILD)
            .then_some(self.header.rightmost_child)
    }

    pub fn set_rightmost_child(&mut self, child: BlockNumber) {
        self.header.rightmost_child = child;
        self.sync_slot_count();
    }

    fn sync_slot_count(&mut self) {
        let rightmost = self.rightmost_child().is_some() as usize;
        self.header.slot_count = (self.pointers.len() + rightmost) as u32;
    }

    /// Cell at a logical slot
    pub fn cell(&self, slot: usize) -> Option<&Cell> {
        self.pointers.get(slot).map(|&idx| &self.cells[idx])
    }

    pub fn key_at(&self, slot: usize) -> Option<BTreeKey> {
        self.cell(slot).map(Cell::key)
    }

    /// Cells in key order
    pub fn entries(&self) -> impl Iterator<Item = &Cell> {
        self.pointers.iter().map(|&idx| &self.cells[idx])
    }

    /// Keys in slot order
    pub fn keys(&self) -> Vec<BTreeKey> {
        self.entries().map(Cell::key).collect()
    }

    /// First slot whose key is strictly greater than `key`, or `key_count()`
    /// when there is none (the rightmost child, for internal pages)
    pub fn locate(&self, key: BTreeKey) -> usize {
        self.pointers
            .partition_point(|&idx| self.cells[idx].key() <= key)
    }

    /// Binary search for an exact key
    pub fn search(&self, key: BTreeKey) -> Result<usize, usize> {
        self.pointers
            .binary_search_by(|&idx| self.cells[idx].key().cmp(&key))
    }

    /// Child reached through `slot`; `key_count()` selects the rightmost child
    pub fn child_at(&self, slot: usize) -> Option<BlockNumber> {
        if slot == self.pointers.len() {
            return self.rightmost_child();
        }
        match self.cell(slot)? {
            Cell::Key(cell) => Some(cell.child),
            Cell::KeyValue(_) => None,
        }
    }

    /// Encoded row stored at a leaf slot
    pub fn record(&self, slot: usize) -> Option<&[u8]> {
        match self.cell(slot)? {
            Cell::KeyValue(cell) => Some(&cell.record),
            Cell::Key(_) => None,
        }
    }

    /// Mutable encoded row stored at a leaf slot
    pub fn record_mut(&mut self, slot: usize) -> Option<&mut [u8]> {
        let idx = *self.pointers.get(slot)?;
        match &mut self.cells[idx] {
            Cell::KeyValue(cell) => Some(&mut cell.record),
            Cell::Key(_) => None,
        }
    }

    /// Append a cell and make it visible at logical `slot`
    pub fn insert_cell(&mut self, slot: usize, cell: Cell) {
        self.cells.push(cell);
        self.pointers.insert(slot, self.cells.len() - 1);
        self.sync_slot_count();
    }

    /// Size of the serialized page if it had no size limit
    pub fn encoded_len(&self) -> usize {
        PageHeader::SIZE
            + self.pointers.len() * 4
            + self.entries().map(Cell::encoded_len).sum::<usize>()
    }

    /// Whether the page has outgrown its fan-out or its block
    pub fn needs_split(&self, max_degree: usize) -> bool {
        let over_degree = if self.is_leaf() {
            self.slot_count() >= max_degree
        } else {
            self.slot_count() > max_degree
        };
        let oversized = self.encoded_len() > PAGE_SIZE && self.key_count() >= 2;
        over_degree || oversized
    }

    /// Split this page in two.
    ///
    /// Returns the new page holding the lower half and the separator key.
    /// For leaves the separator is the first key kept here. For internal
    /// pages the separator cell leaves the array; its child becomes the
    /// rightmost child of the lower half and this page keeps its own.
    pub fn split(&mut self) -> BTreeResult<(Page, BTreeKey)> {
        let count = self.pointers.len();
        if count < 2 {
            return Err(BTreeError::InvalidSplit(count));
        }

        let split_index = count / 2;
        let mut left = if self.is_leaf() {
            Page::new_leaf()
        } else {
            Page::new_internal()
        };
        for (slot, &idx) in self.pointers[..split_index].iter().enumerate() {
            left.insert_cell(slot, self.cells[idx].clone());
        }

        let separator = if self.is_leaf() {
            self.pointers.drain(..split_index);
            self.key_at(0).ok_or(BTreeError::InvalidSplit(count))?
        } else {
            let separator = match self.cells[self.pointers[split_index]] {
                Cell::Key(KeyCell { key, child }) => {
                    left.set_rightmost_child(child);
                    key
                }
                Cell::KeyValue(_) => {
                    return Err(BTreeError::CorruptedPage(
                        "Leaf cell in internal page".to_string(),
                    ));
                }
            };
            self.pointers.drain(..=split_index);
            separator
        };

        self.compact();
        Ok((left, separator))
    }

    /// Drop cells no longer referenced by any slot
    fn compact(&mut self) {
        let cells = self
            .pointers
            .iter()
            .map(|&idx| self.cells[idx].clone())
            .collect();
        self.cells = cells;
        self.pointers = (0..self.cells.len()).collect();
        self.sync_slot_count();
    }

    /// Serialize as `[header][pointers][free space][cells from the end]`
    pub fn serialize(&self) -> BTreeResult<Vec<u8>> {
        let size = self.encoded_len();
        if size > PAGE_SIZE {
            return Err(BTreeError::PageOverflow {
                size,
                max: PAGE_SIZE,
            });
        }

        let mut buf = vec![0u8; PAGE_SIZE];
        buf[..PageHeader::SIZE].copy_from_slice(&self.header.serialize());

        let mut pointer_offset = PageHeader::SIZE;
        let mut cell_offset = PAGE_SIZE;
        for cell in self.entries() {
            cell_offset -= cell.encoded_len();
            cell.serialize_into(&mut buf[cell_offset..cell_offset + cell.encoded_len()]);
            buf[pointer_offset..pointer_offset + 4]
                .copy_from_slice(&(cell_offset as u32).to_le_bytes());
            pointer_offset += 4;
        }

        Ok(buf)
    }

    /// Decode a page; an all-zero block decodes as an empty internal page
    pub fn deserialize(data: &[u8]) -> BTreeResult<Self> {
        if data.len() != PAGE_SIZE {
            return Err(BTreeError::CorruptedPage(format!(
                "Expected {} bytes, got {}",
                PAGE_SIZE,
                data.len()
            )));
        }

        let header = PageHeader::deserialize(data)?;
        let rightmost = (!header.is_leaf && header.rightmost_child != NO_CHILD) as usize;
        let key_count = (header.slot_count as usize)
            .checked_sub(rightmost)
            .ok_or_else(|| BTreeError::CorruptedPage("Rightmost child without slot".to_string()))?;
        if !header.is_leaf && key_count > 0 && rightmost == 0 {
            return Err(BTreeError::CorruptedPage(
                "Internal page with keys but no rightmost child".to_string(),
            ));
        }

        let cells_start = PageHeader::SIZE + key_count * 4;
        if cells_start > PAGE_SIZE {
            return Err(BTreeError::CorruptedPage(format!(
                "Slot count {} does not fit in a page",
                header.slot_count
            )));
        }

        let mut cells = Vec::with_capacity(key_count);
        for slot in 0..key_count {
            let at = PageHeader::SIZE + slot * 4;
            let offset =
                u32::from_le_bytes([data[at], data[at + 1], data[at + 2], data[at + 3]]) as usize;
            if offset < cells_start || offset >= PAGE_SIZE {
                return Err(BTreeError::CorruptedPage(format!(
                    "Slot {} points outside the cell area: {}",
                    slot, offset
                )));
            }
            cells.push(Cell::deserialize(&data[offset..], header.is_leaf)?);
        }

        Ok(Self {
            header,
            pointers: (0..cells.len()).collect(),
            cells,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::btree::cell::KeyValueCell;

    fn leaf_with(keys: &[BTreeKey]) -> Page {
        let mut page = Page::new_leaf();
        for &key in keys {
            let slot = page.locate(key);
            page.insert_cell(
                slot,
                Cell::KeyValue(KeyValueCell {
                    key,
                    record: key.to_le_bytes().to_vec(),
                }),
            );
        }
        page
    }

    fn internal_with(separators: &[(BTreeKey, BlockNumber)], rightmost: BlockNumber) -> Page {
        let mut page = Page::with_child(rightmost);
        for &(key, child) in separators {
            let slot = page.locate(key);
            page.insert_cell(slot, Cell::Key(KeyCell { key, child }));
        }
        page
    }

    #[test]
    fn test_header_round_trip() {
        let header = PageHeader {
            is_leaf: true,
            slot_count: 3,
            rightmost_child: 0,
            page_lsn: 9,
            rec_lsn: 4,
        };
        assert_eq!(PageHeader::deserialize(&header.serialize()).unwrap(), header);
    }

    #[test]
    fn test_leaf_insert_keeps_order() {
        let page = leaf_with(&[10, -3, 100, 11]);
        assert_eq!(page.keys(), vec![-3, 10, 11, 100]);
        assert_eq!(page.slot_count(), 4);
    }

    #[test]
    fn test_locate_and_search() {
        let page = leaf_with(&[1, 5, 9]);
        assert_eq!(page.locate(0), 0);
        assert_eq!(page.locate(5), 2);
        assert_eq!(page.locate(9), 3);
        assert_eq!(page.search(5), Ok(1));
        assert_eq!(page.search(6), Err(2));
    }

    #[test]
    fn test_internal_slot_count_includes_rightmost() {
        let page = internal_with(&[(10, 2), (20, 3)], 4);
        assert_eq!(page.key_count(), 2);
        assert_eq!(page.slot_count(), 3);
        assert_eq!(page.child_at(page.locate(5)), Some(2));
        assert_eq!(page.child_at(page.locate(10)), Some(3));
        assert_eq!(page.child_at(page.locate(25)), Some(4));
    }

    #[test]
    fn test_leaf_split() {
        let mut page = leaf_with(&[1, 2, 3]);
        let (left, separator) = page.split().unwrap();

        assert_eq!(left.keys(), vec![1]);
        assert_eq!(page.keys(), vec![2, 3]);
        assert_eq!(separator, 2);
        assert_eq!(left.slot_count() + page.slot_count(), 3);
    }

    #[test]
    fn test_internal_split_promotes_separator() {
        let mut page = internal_with(&[(10, 2), (20, 3), (30, 4)], 5);
        let (left, separator) = page.split().unwrap();

        assert_eq!(separator, 20);
        assert_eq!(left.keys(), vec![10]);
        assert_eq!(left.rightmost_child(), Some(3));
        assert_eq!(page.keys(), vec![30]);
        assert_eq!(page.rightmost_child(), Some(5));
        assert_eq!(left.slot_count() + page.slot_count(), 4);
    }

    #[test]
    fn test_split_too_small() {
        let mut page = leaf_with(&[1]);
        assert!(matches!(page.split(), Err(BTreeError::InvalidSplit(1))));
    }

    #[test]
    fn test_needs_split() {
        assert!(!leaf_with(&[1, 2]).needs_split(3));
        assert!(leaf_with(&[1, 2, 3]).needs_split(3));
        assert!(!internal_with(&[(10, 2), (20, 3)], 4).needs_split(3));
        assert!(internal_with(&[(10, 2), (20, 3), (30, 4)], 5).needs_split(3));
    }

    #[test]
    fn test_serialized_layout() {
        let page = leaf_with(&[7]);
        let bytes = page.serialize().unwrap();

        // One 12-byte cell at the very end of the block
        let offset = u32::from_le_bytes(
            bytes[PageHeader::SIZE..PageHeader::SIZE + 4].try_into().unwrap(),
        ) as usize;
        assert_eq!(offset, PAGE_SIZE - 12);
        assert_eq!(&bytes[offset..offset + 4], &7i32.to_le_bytes());
    }

    #[test]
    fn test_round_trip_is_byte_identical() {
        let mut page = leaf_with(&[10, 11, 12, 1, 2]);
        page.set_page_lsn(5);
        let bytes = page.serialize().unwrap();

        let decoded = Page::deserialize(&bytes).unwrap();
        assert_eq!(decoded.keys(), page.keys());
        assert_eq!(decoded.page_lsn(), 5);
        assert_eq!(decoded.serialize().unwrap(), bytes);

        let internal = internal_with(&[(10, 2), (20, 3)], 4);
        let bytes = internal.serialize().unwrap();
        let decoded = Page::deserialize(&bytes).unwrap();
        assert_eq!(decoded.rightmost_child(), Some(4));
        assert_eq!(decoded.serialize().unwrap(), bytes);
    }

    #[test]
    fn test_zero_block_is_empty_internal() {
        let page = Page::deserialize(&vec![0u8; PAGE_SIZE]).unwrap();
        assert!(!page.is_leaf());
        assert_eq!(page.slot_count(), 0);
        assert_eq!(page.rightmost_child(), None);
    }

    #[test]
    fn test_corrupted_pointer() {
        let mut bytes = leaf_with(&[1]).serialize().unwrap();
        bytes[PageHeader::SIZE..PageHeader::SIZE + 4].copy_from_slice(&3u32.to_le_bytes());
        assert!(matches!(
            Page::deserialize(&bytes),
            Err(BTreeError::CorruptedPage(_))
        ));
    }

    #[test]
    fn test_overflow() {
        let mut page = Page::new_leaf();
        for key in 0..5 {
            page.insert_cell(
                key as usize,
                Cell::KeyValue(KeyValueCell {
                    key,
                    record: vec![0u8; 1000],
                }),
            );
        }
        assert!(page.needs_split(100));
        assert!(matches!(
            page.serialize(),
            Err(BTreeError::PageOverflow { .. })
        ));
    }
}
