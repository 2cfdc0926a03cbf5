use log::debug;

use super::error::{BufferError, BufferResult};
use crate::btree::Page;
use crate::file::{BlockId, FileManager};

/// Index of a frame in the pool
pub type FrameId = usize;

/// One resident page plus its replacement metadata
#[derive(Debug)]
pub struct Buffer {
    pub block: BlockId,
    pub page: Page,
    pin_count: u32,
    referenced: bool,
    dirty: bool,
}

impl Buffer {
    pub fn pin_count(&self) -> u32 {
        self.pin_count
    }

    pub fn is_pinned(&self) -> bool {
        self.pin_count > 0
    }

    pub fn is_referenced(&self) -> bool {
        self.referenced
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }
}

/// Fixed array of frames backed by a file manager
pub struct BufferPool {
    file_manager: FileManager,
    frames: Vec<Option<Buffer>>,
}

impl BufferPool {
    /// Create a pool with `capacity` empty frames
    pub fn new(file_manager: FileManager, capacity: usize) -> Self {
        Self {
            file_manager,
            frames: (0..capacity).map(|_| None).collect(),
        }
    }

    pub fn capacity(&self) -> usize {
        self.frames.len()
    }

    /// Number of occupied frames
    pub fn len(&self) -> usize {
        self.frames.iter().filter(|f| f.is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn file_manager_mut(&mut self) -> &mut FileManager {
        &mut self.file_manager
    }

    fn free_frame(&self) -> BufferResult<FrameId> {
        self.frames
            .iter()
            .position(Option::is_none)
            .ok_or(BufferError::PoolFull)
    }

    fn install(&mut self, block: BlockId, page: Page, dirty: bool) -> BufferResult<FrameId> {
        let frame_id = self.free_frame()?;
        self.frames[frame_id] = Some(Buffer {
            block,
            page,
            pin_count: 0,
            referenced: false,
            dirty,
        });
        Ok(frame_id)
    }

    /// Install a page that has never been written into the first free frame
    pub fn allocate(&mut self, block: BlockId, page: Page) -> BufferResult<FrameId> {
        self.install(block, page, true)
    }

    /// Read and decode a block into the first free frame
    pub fn load(&mut self, block: BlockId) -> BufferResult<FrameId> {
        let (bytes_read, data) = self.file_manager.read(&block)?;
        if bytes_read == 0 {
            return Err(BufferError::BlockNotFound(block));
        }

        let page = Page::deserialize(&data)?;
        debug!("loaded block {}", block);
        self.install(block, page, false)
    }

    /// Write the frame's page back if it changed, then free the frame.
    /// A failed write leaves the frame occupied and untouched.
    pub fn flush(&mut self, frame_id: FrameId) -> BufferResult<()> {
        let buffer = self
            .frames
            .get(frame_id)
            .and_then(Option::as_ref)
            .ok_or(BufferError::InvalidFrame(frame_id))?;
        if buffer.dirty {
            let mut page = buffer.page.clone();
            page.set_rec_lsn(0);
            let data = page.serialize()?;
            self.file_manager.write(&buffer.block, &data)?;
        }

        self.frames[frame_id] = None;
        Ok(())
    }

    /// Drop every frame without writing anything back.
    /// Returns how many discarded frames held unwritten changes.
    pub fn clear(&mut self) -> usize {
        self.frames
            .iter_mut()
            .filter_map(Option::take)
            .filter(|b| b.dirty)
            .count()
    }

    pub fn frame(&self, frame_id: FrameId) -> BufferResult<&Buffer> {
        self.frames
            .get(frame_id)
            .and_then(Option::as_ref)
            .ok_or(BufferError::InvalidFrame(frame_id))
    }

    fn frame_mut(&mut self, frame_id: FrameId) -> BufferResult<&mut Buffer> {
        self.frames
            .get_mut(frame_id)
            .and_then(Option::as_mut)
            .ok_or(BufferError::InvalidFrame(frame_id))
    }

    /// Mutable access to a resident page; marks the frame dirty
    pub fn page_mut(&mut self, frame_id: FrameId) -> BufferResult<&mut Page> {
        let buffer = self.frame_mut(frame_id)?;
        buffer.dirty = true;
        Ok(&mut buffer.page)
    }

    /// Pin a frame and set its reference bit. Returns the new pin count.
    pub fn pin(&mut self, frame_id: FrameId) -> BufferResult<u32> {
        let buffer = self.frame_mut(frame_id)?;
        buffer.pin_count += 1;
        buffer.referenced = true;
        Ok(buffer.pin_count)
    }

    /// Release one pin. Returns the remaining pin count.
    pub fn unpin(&mut self, frame_id: FrameId) -> BufferResult<u32> {
        let buffer = self.frame_mut(frame_id)?;
        if buffer.pin_count == 0 {
            return Err(BufferError::NotPinned(frame_id));
        }
        buffer.pin_count -= 1;
        Ok(buffer.pin_count)
    }

    /// Clear the reference bit (second chance consumed)
    pub fn clear_reference(&mut self, frame_id: FrameId) -> BufferResult<()> {
        self.frame_mut(frame_id)?.referenced = false;
        Ok(())
    }
}
