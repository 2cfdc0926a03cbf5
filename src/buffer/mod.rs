//! Fixed-capacity frame pool and the page table that maps blocks onto it
//!
//! The pool only knows frames; the page table owns the block to frame map,
//! pin accounting and the second-chance FIFO eviction queue.

mod buffer_pool;
mod error;
mod page_table;

pub use buffer_pool::{Buffer, BufferPool, FrameId};
pub use error::{BufferError, BufferResult};
pub use page_table::PageTable;

/// Default number of frames in the buffer pool
pub const DEFAULT_POOL_CAPACITY: usize = 10;
