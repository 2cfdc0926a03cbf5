//! Slotted-page B+ tree over buffer-pool pages
//!
//! Pages are addressed by block number inside one storage file and are only
//! ever touched through the [`PageTable`](crate::buffer::PageTable). Leaves
//! hold full encoded rows; internal pages hold separator keys plus a
//! rightmost child that covers every key at or above the last separator.

mod cell;
mod error;
mod page;
mod tree;


pub use cell::{Cell, KeyCell, KeyValueCell};
pub use error::{BTreeError, BTreeResult};
pub use page::{NO_CHILD, Page, PageHeader};
pub use tree::{BTree, Split};

/// Key type: derived from the primary column of a row
pub type BTreeKey = i32;

/// Reserved upper bound; every user key must be strictly below it
pub const MAX_KEY: BTreeKey = i32::MAX;

/// Default fan-out threshold
pub const DEFAULT_MAX_DEGREE: usize = 3;
