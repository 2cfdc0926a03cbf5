//! Single-table storage: a schema, a B+ tree of rows and the meta page that
//! bootstraps both from block 0 of the storage file.

mod error;
mod meta;
mod store;
mod update_info;

#[cfg(test)]
mod tests;

pub use error::{StorageError, StorageResult};
pub use meta::MetaPage;
pub use store::Storage;
pub use update_info::UpdateInfo;

/// Block holding the meta page
pub const META_BLOCK: crate::file::BlockNumber = 0;
