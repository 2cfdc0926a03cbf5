mod block;
mod error;
mod file_manager;

pub use block::{BlockAllocator, BlockId};
pub use error::{FileError, FileResult};
pub use file_manager::FileManager;

/// Block size in bytes (4KB)
pub const PAGE_SIZE: usize = 4096;

/// Block number within a file
pub type BlockNumber = u32;
