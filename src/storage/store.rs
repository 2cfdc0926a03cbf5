use std::ops::Range;

use log::{debug, info};

use super::META_BLOCK;
use super::error::{StorageError, StorageResult};
use super::meta::MetaPage;
use super::update_info::UpdateInfo;
use crate::btree::{BTree, Page};
use crate::buffer::{BufferPool, FrameId, PageTable};
use crate::file::{BlockAllocator, BlockId, BlockNumber, FileManager};
use crate::record::{DataType, RecordError, Schema, Value};
use crate::wal::Lsn;

/// One table stored in one file: block 0 is the meta page, every other block
/// is a B+ tree page reached through the page table.
pub struct Storage {
    file_name: String,
    table: PageTable,
    allocator: BlockAllocator,
    tree: BTree,
    schema: Schema,
}

impl Storage {
    /// Create a new storage file holding an empty tree and no columns
    pub fn create(
        mut file_manager: FileManager,
        file_name: &str,
        pool_capacity: usize,
        max_degree: usize,
    ) -> StorageResult<Self> {
        if file_manager.exists(file_name) {
            return Err(StorageError::AlreadyExists(file_name.to_string()));
        }

        let mut allocator = BlockAllocator::new(META_BLOCK + 1);
        let root = allocator.allocate();
        let tree = BTree::new(file_name, root, max_degree)?;

        // Block 0 goes to disk first so the file is recognisable even before the first flush
        let meta = MetaPage {
            root,
            next_block: allocator.peek(),
            max_degree: max_degree as u32,
            schema: Schema::new(),
        };
        file_manager.write(&BlockId::new(file_name, META_BLOCK), &meta.serialize()?)?;

        let mut table = PageTable::new(BufferPool::new(file_manager, pool_capacity));
        table.set(BlockId::new(file_name, root), Page::new_internal())?;

        let mut storage = Self {
            file_name: file_name.to_string(),
            table,
            allocator,
            tree,
            schema: Schema::new(),
        };
        storage.flush()?;
        info!("created storage {} with root block {}", file_name, root);
        Ok(storage)
    }

    /// Reopen a storage file from its meta page
    pub fn open(
        mut file_manager: FileManager,
        file_name: &str,
        pool_capacity: usize,
    ) -> StorageResult<Self> {
        if !file_manager.exists(file_name) {
            return Err(StorageError::NotFound(file_name.to_string()));
        }

        let meta = Self::read_meta(&mut file_manager, file_name)?;
        let storage = Self {
            file_name: file_name.to_string(),
            table: PageTable::new(BufferPool::new(file_manager, pool_capacity)),
            allocator: BlockAllocator::new(meta.next_block),
            tree: BTree::new(file_name, meta.root, meta.max_degree as usize)?,
            schema: meta.schema,
        };
        info!(
            "opened storage {}: root block {}, {} columns",
            file_name,
            storage.tree.root(),
            storage.schema.column_count()
        );
        Ok(storage)
    }

    fn read_meta(file_manager: &mut FileManager, file_name: &str) -> StorageResult<MetaPage> {
        let (bytes_read, data) = file_manager.read(&BlockId::new(file_name, META_BLOCK))?;
        if bytes_read == 0 {
            return Err(StorageError::NotFound(file_name.to_string()));
        }
        MetaPage::deserialize(&data)
    }

    fn meta(&self) -> MetaPage {
        MetaPage {
            root: self.tree.root(),
            next_block: self.allocator.peek(),
            max_degree: self.tree.max_degree() as u32,
            schema: self.schema.clone(),
        }
    }

    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    pub fn root(&self) -> BlockNumber {
        self.tree.root()
    }

    pub fn page_table(&self) -> &PageTable {
        &self.table
    }

    fn block(&self, number: BlockNumber) -> BlockId {
        BlockId::new(&self.file_name, number)
    }

    /// Whether any row was ever inserted
    pub fn has_rows(&mut self) -> StorageResult<bool> {
        let frame_id = self.table.get_or_load(&self.block(self.tree.root()))?;
        let root = self.table.page(frame_id)?;
        Ok(root.rightmost_child().is_some())
    }

    /// Append a column to the schema. Rows are fixed-width, so this is only
    /// allowed while the table is empty.
    pub fn add_column(&mut self, name: &str, data_type: DataType) -> StorageResult<()> {
        if self.has_rows()? {
            return Err(StorageError::SchemaFrozen);
        }
        self.schema.add_column(name, data_type)?;
        debug!("added column {} {} to {}", name, data_type, self.file_name);
        Ok(())
    }

    /// Insert one row; `values` are given in schema order
    pub fn add(&mut self, values: &[Value]) -> StorageResult<()> {
        let record = self.schema.encode(values)?;
        let key = self.schema.key_of(&record)?;
        self.tree
            .insert(&mut self.table, &mut self.allocator, key, record)?;
        Ok(())
    }

    /// Row whose primary column equals `primary`
    pub fn find(&mut self, primary: &Value) -> StorageResult<Option<Vec<Value>>> {
        let key = self.schema.key_of_value(primary)?;
        match self.tree.find(&mut self.table, key)? {
            Some(record) if self.holds_primary(&record, primary)? => {
                Ok(Some(self.schema.decode(&record)?))
            }
            _ => Ok(None),
        }
    }

    /// Whether `record` stores exactly `primary` in column 0.
    /// Char keys only index a prefix, so a tree hit alone is not a match.
    fn holds_primary(&self, record: &[u8], primary: &Value) -> StorageResult<bool> {
        let column = self
            .schema
            .column(0)
            .ok_or_else(|| RecordError::SchemaMismatch("Schema has no columns".to_string()))?;
        let expected = primary.serialize(&column.data_type)?;
        Ok(record.get(column.range()) == Some(expected.as_slice()))
    }

    /// Overwrite one non-key column of the row identified by `primary`.
    ///
    /// Returns the physical change so it can be logged.
    pub fn update(
        &mut self,
        primary: &Value,
        column_name: &str,
        new_value: &Value,
    ) -> StorageResult<UpdateInfo> {
        let col_num = self.schema.column_index(column_name)?;
        if col_num == 0 {
            return Err(StorageError::PrimaryKeyUpdate);
        }

        let column = &self.schema.columns()[col_num];
        let range = column.range();
        let after = new_value.serialize(&column.data_type)?;

        let key = self.schema.key_of_value(primary)?;
        let (page_idx, slot) = self
            .tree
            .locate_leaf(&mut self.table, key)?
            .ok_or_else(|| StorageError::KeyNotFound(primary.to_string()))?;

        let block = self.block(page_idx);
        let frame_id = self.table.pin(&block)?;
        let before = self.overwrite(frame_id, slot, primary, range, &after);
        self.table.unpin(&block)?;

        let before = before?.ok_or_else(|| {
            StorageError::InvalidUpdate(format!("no row at block {} slot {}", page_idx, slot))
        })?;

        Ok(UpdateInfo {
            page_idx,
            ptr_idx: slot as u32,
            col_num: col_num as u32,
            before,
            after,
        })
    }

    /// Swap `after` into `range` of the row at `slot`, returning the old bytes.
    /// Leaves the page untouched if that row holds a different primary key.
    fn overwrite(
        &mut self,
        frame_id: FrameId,
        slot: usize,
        primary: &Value,
        range: Range<usize>,
        after: &[u8],
    ) -> StorageResult<Option<Vec<u8>>> {
        let Some(record) = self.table.page(frame_id)?.record(slot) else {
            return Ok(None);
        };
        if !self.holds_primary(record, primary)? {
            return Err(StorageError::KeyNotFound(primary.to_string()));
        }

        Ok(self
            .table
            .page_mut(frame_id)?
            .record_mut(slot)
            .and_then(|record| record.get_mut(range))
            .map(|bytes| {
                let before = bytes.to_vec();
                bytes.copy_from_slice(after);
                before
            }))
    }

    /// Write the after-image of a logged update back into its page
    pub fn apply_update(&mut self, info: &UpdateInfo) -> StorageResult<()> {
        let column = self
            .schema
            .column(info.col_num as usize)
            .ok_or_else(|| StorageError::InvalidUpdate(format!("no column {}", info.col_num)))?;
        if info.col_num == 0 {
            return Err(StorageError::PrimaryKeyUpdate);
        }
        if info.after.len() != column.size() {
            return Err(StorageError::InvalidUpdate(format!(
                "image of {} bytes for column '{}' of {} bytes",
                info.after.len(),
                column.name,
                column.size()
            )));
        }
        let range = column.range();

        let block = self.block(info.page_idx);
        let frame_id = self.table.pin(&block)?;
        let applied = self
            .table
            .page_mut(frame_id)?
            .record_mut(info.ptr_idx as usize)
            .and_then(|record| record.get_mut(range))
            .map(|bytes| bytes.copy_from_slice(&info.after))
            .is_some();
        self.table.unpin(&block)?;

        if !applied {
            return Err(StorageError::InvalidUpdate(format!(
                "no row at block {} slot {}",
                info.page_idx, info.ptr_idx
            )));
        }
        Ok(())
    }

    /// Project `columns` out of every row, in key order
    pub fn select(&mut self, columns: &[&str]) -> StorageResult<Vec<Vec<Value>>> {
        let indices = columns
            .iter()
            .map(|name| self.schema.column_index(name))
            .collect::<Result<Vec<_>, _>>()?;

        let records = self.tree.scan(&mut self.table)?;
        let mut rows = Vec::with_capacity(records.len());
        for record in &records {
            let row = indices
                .iter()
                .map(|&idx| self.schema.decode_column(record, idx))
                .collect::<Result<Vec<_>, _>>()?;
            rows.push(row);
        }
        Ok(rows)
    }

    pub fn page_lsn(&mut self, page_idx: BlockNumber) -> StorageResult<Lsn> {
        Ok(self.table.get_page_lsn(&self.block(page_idx))?)
    }

    pub fn set_page_lsn(&mut self, page_idx: BlockNumber, lsn: Lsn) -> StorageResult<()> {
        Ok(self.table.set_page_lsn(&self.block(page_idx), lsn)?)
    }

    /// Write every buffered page back, then the meta page
    pub fn flush(&mut self) -> StorageResult<()> {
        self.table.flush_all()?;
        let meta = self.meta().serialize()?;
        let block = self.block(META_BLOCK);
        let file_manager = self.table.file_manager_mut();
        file_manager.write(&block, &meta)?;
        file_manager.sync_all()?;
        debug!("flushed storage {}", self.file_name);
        Ok(())
    }

    /// Drop every buffered page without writing it and fall back to the
    /// state recorded in the meta page, as if the process had crashed
    pub fn clear(&mut self) -> StorageResult<()> {
        self.table.clear();
        let meta = Self::read_meta(self.table.file_manager_mut(), &self.file_name)?;
        self.allocator = BlockAllocator::new(meta.next_block);
        self.tree = BTree::new(&self.file_name, meta.root, meta.max_degree as usize)?;
        self.schema = meta.schema;
        info!("cleared buffered state of {}", self.file_name);
        Ok(())
    }
}
