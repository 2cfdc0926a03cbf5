use std::collections::VecDeque;

use ahash::AHashMap;
use log::{debug, warn};

use super::buffer_pool::{BufferPool, FrameId};
use super::error::{BufferError, BufferResult};
use crate::btree::Page;
use crate::file::{BlockId, FileManager};
use crate::wal::Lsn;

/// Maps blocks to frames and decides which frame to give up when the pool is full.
///
/// Resident blocks sit in a FIFO queue scanned with second-chance semantics:
/// pinned entries and entries with their reference bit set go back to the tail
/// (the latter losing the bit), the first entry with neither is evicted.
pub struct PageTable {
    pool: BufferPool,
    table: AHashMap<BlockId, FrameId>,
    queue: VecDeque<BlockId>,
    num_pinned: usize,
}

impl PageTable {
    pub fn new(pool: BufferPool) -> Self {
        Self {
            pool,
            table: AHashMap::new(),
            queue: VecDeque::new(),
            num_pinned: 0,
        }
    }

    pub fn capacity(&self) -> usize {
        self.pool.capacity()
    }

    /// Number of resident blocks
    pub fn len(&self) -> usize {
        self.table.len()
    }

    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }

    /// Number of frames with a nonzero pin count
    pub fn num_pinned(&self) -> usize {
        self.num_pinned
    }

    pub fn is_resident(&self, block: &BlockId) -> bool {
        self.table.contains_key(block)
    }

    pub fn file_manager_mut(&mut self) -> &mut FileManager {
        self.pool.file_manager_mut()
    }

    /// Whether at least one frame could be given up
    pub fn available(&self) -> bool {
        self.num_pinned < self.capacity()
    }

    /// Frame holding `block`, loading it from disk if it is not resident
    pub fn get_or_load(&mut self, block: &BlockId) -> BufferResult<FrameId> {
        if let Some(&frame_id) = self.table.get(block) {
            return Ok(frame_id);
        }

        self.make_space()?;
        let frame_id = self.pool.load(block.clone())?;
        self.queue.push_back(block.clone());
        self.table.insert(block.clone(), frame_id);
        Ok(frame_id)
    }

    /// Register a page created in memory (never read from disk)
    pub fn set(&mut self, block: BlockId, page: Page) -> BufferResult<FrameId> {
        if self.table.contains_key(&block) {
            return Err(BufferError::AlreadyResident(block));
        }

        self.make_space()?;
        let frame_id = self.pool.allocate(block.clone(), page)?;
        self.queue.push_back(block.clone());
        self.table.insert(block, frame_id);
        Ok(frame_id)
    }

    /// Evict one frame if the pool is at capacity
    pub fn make_space(&mut self) -> BufferResult<()> {
        if self.table.len() < self.capacity() {
            return Ok(());
        }
        if !self.available() {
            return Err(BufferError::AllPinned(self.capacity()));
        }

        while let Some(block) = self.queue.pop_front() {
            let frame_id = self.frame_of(&block)?;
            let buffer = self.pool.frame(frame_id)?;

            if buffer.is_pinned() {
                self.queue.push_back(block);
            } else if buffer.is_referenced() {
                self.pool.clear_reference(frame_id)?;
                self.queue.push_back(block);
            } else {
                debug!("evicting block {} from frame {}", block, frame_id);
                if let Err(err) = self.pool.flush(frame_id) {
                    self.queue.push_front(block);
                    return Err(err);
                }
                self.table.remove(&block);
                return Ok(());
            }
        }

        Err(BufferError::AllPinned(self.capacity()))
    }

    fn frame_of(&self, block: &BlockId) -> BufferResult<FrameId> {
        self.table
            .get(block)
            .copied()
            .ok_or_else(|| BufferError::NotResident(block.clone()))
    }

    /// Make `block` resident and pin it
    pub fn pin(&mut self, block: &BlockId) -> BufferResult<FrameId> {
        let frame_id = self.get_or_load(block)?;
        if self.pool.pin(frame_id)? == 1 {
            self.num_pinned += 1;
        }
        Ok(frame_id)
    }

    /// Release one pin on a resident block
    pub fn unpin(&mut self, block: &BlockId) -> BufferResult<()> {
        let frame_id = self.frame_of(block)?;
        if self.pool.unpin(frame_id)? == 0 {
            self.num_pinned -= 1;
        }
        Ok(())
    }

    /// Page in a resident frame
    pub fn page(&self, frame_id: FrameId) -> BufferResult<&Page> {
        Ok(&self.pool.frame(frame_id)?.page)
    }

    /// Mutable page in a resident frame; the frame becomes dirty
    pub fn page_mut(&mut self, frame_id: FrameId) -> BufferResult<&mut Page> {
        self.pool.page_mut(frame_id)
    }

    pub fn get_page_lsn(&mut self, block: &BlockId) -> BufferResult<Lsn> {
        let frame_id = self.get_or_load(block)?;
        Ok(self.page(frame_id)?.page_lsn())
    }

    /// Stamp the page LSN; the first stamp since the page was clean also sets its rec LSN
    pub fn set_page_lsn(&mut self, block: &BlockId, lsn: Lsn) -> BufferResult<()> {
        let frame_id = self.get_or_load(block)?;
        let page = self.page_mut(frame_id)?;
        page.set_page_lsn(lsn);
        if page.rec_lsn() == 0 {
            page.set_rec_lsn(lsn);
        }
        Ok(())
    }

    /// Write back and drop every resident frame
    pub fn flush_all(&mut self) -> BufferResult<()> {
        for block in &self.queue {
            if self.pool.frame(self.frame_of(block)?)?.is_pinned() {
                return Err(BufferError::Pinned(block.clone()));
            }
        }

        while let Some(block) = self.queue.pop_front() {
            let flushed = self
                .frame_of(&block)
                .and_then(|frame_id| self.pool.flush(frame_id));
            if let Err(err) = flushed {
                self.queue.push_front(block);
                return Err(err);
            }
            self.table.remove(&block);
        }
        self.pool.file_manager_mut().sync_all()?;
        Ok(())
    }

    /// Drop every resident frame without writing anything back
    pub fn clear(&mut self) {
        let discarded = self.pool.clear();
        if discarded > 0 {
            warn!("discarded {} modified pages without writing them", discarded);
        }
        self.table.clear();
        self.queue.clear();
        self.num_pinned = 0;
    }
}
