use crate::file::BlockNumber;

/// Physical description of one column overwrite inside a leaf page.
///
/// Carries both images, but only `after` is ever replayed: it is enough to
/// redo the change, not to undo it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdateInfo {
    /// Leaf block holding the row
    pub page_idx: BlockNumber,
    /// Slot of the row inside that leaf
    pub ptr_idx: u32,
    /// Column that changed
    pub col_num: u32,
    pub before: Vec<u8>,
    pub after: Vec<u8>,
}
