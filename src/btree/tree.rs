use std::collections::VecDeque;

use log::debug;

use super::cell::{Cell, KeyCell, KeyValueCell};
use super::error::{BTreeError, BTreeResult};
use super::page::Page;
use super::{BTreeKey, MAX_KEY};
use crate::buffer::{FrameId, PageTable};
use crate::file::{BlockAllocator, BlockId, BlockNumber};

/// Result of a page split reported to the parent
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Split {
    /// Smallest key that stays in the page that was split (the right half)
    pub separator: BTreeKey,
    /// Freshly allocated page holding the lower half
    pub left: BlockNumber,
}

/// One step of a root-to-leaf descent
enum Descent {
    Child(BlockNumber),
    Leaf(Option<usize>),
    Empty,
}

/// Handle on one tree: where its root lives and how wide its pages get
#[derive(Debug, Clone)]
pub struct BTree {
    file_name: String,
    root: BlockNumber,
    max_degree: usize,
}

impl BTree {
    pub fn new(
        file_name: impl Into<String>,
        root: BlockNumber,
        max_degree: usize,
    ) -> BTreeResult<Self> {
        if max_degree < 3 {
            return Err(BTreeError::InvalidDegree(max_degree));
        }
        Ok(Self {
            file_name: file_name.into(),
            root,
            max_degree,
        })
    }

    pub fn root(&self) -> BlockNumber {
        self.root
    }

    pub fn max_degree(&self) -> usize {
        self.max_degree
    }

    fn block(&self, number: BlockNumber) -> BlockId {
        BlockId::new(&self.file_name, number)
    }

    /// Run `f` on a pinned block, releasing the pin afterwards even on failure
    fn with_pinned<T>(
        &self,
        table: &mut PageTable,
        number: BlockNumber,
        f: impl FnOnce(&mut PageTable, FrameId) -> BTreeResult<T>,
    ) -> BTreeResult<T> {
        let block = self.block(number);
        let frame_id = table.pin(&block)?;
        let result = f(table, frame_id);
        let unpinned = table.unpin(&block);
        let value = result?;
        unpinned?;
        Ok(value)
    }

    /// Insert a row under `key`. A split that reaches the root grows the tree
    /// by one level: the old root becomes the rightmost child of a new root.
    pub fn insert(
        &mut self,
        table: &mut PageTable,
        allocator: &mut BlockAllocator,
        key: BTreeKey,
        record: Vec<u8>,
    ) -> BTreeResult<()> {
        if key >= MAX_KEY {
            return Err(BTreeError::KeyOutOfRange(key));
        }

        if let Some(split) = self.insert_at(table, allocator, self.root, key, record)? {
            let new_root = allocator.allocate();
            let mut page = Page::with_child(self.root);
            page.insert_cell(
                0,
                Cell::Key(KeyCell {
                    key: split.separator,
                    child: split.left,
                }),
            );
            table.set(self.block(new_root), page)?;
            debug!(
                "root split: new root {} over {} and {} at key {}",
                new_root, split.left, self.root, split.separator
            );
            self.root = new_root;
        }
        Ok(())
    }

    fn insert_at(
        &self,
        table: &mut PageTable,
        allocator: &mut BlockAllocator,
        number: BlockNumber,
        key: BTreeKey,
        record: Vec<u8>,
    ) -> BTreeResult<Option<Split>> {
        let frame_id = table.get_or_load(&self.block(number))?;
        let page = table.page(frame_id)?;

        if page.is_leaf() {
            let slot = match page.search(key) {
                Ok(_) => return Err(BTreeError::DuplicateKey(key)),
                Err(slot) => slot,
            };
            return self.with_pinned(table, number, |table, frame_id| {
                table
                    .page_mut(frame_id)?
                    .insert_cell(slot, Cell::KeyValue(KeyValueCell { key, record }));
                self.split_if_needed(table, allocator, number, frame_id)
            });
        }

        if page.rightmost_child().is_none() {
            // Empty tree: the first leaf is created on first insert
            let leaf_number = allocator.allocate();
            let mut leaf = Page::new_leaf();
            leaf.insert_cell(0, Cell::KeyValue(KeyValueCell { key, record }));
            return self.with_pinned(table, number, |table, frame_id| {
                table.set(self.block(leaf_number), leaf)?;
                table.page_mut(frame_id)?.set_rightmost_child(leaf_number);
                Ok(None)
            });
        }

        let slot = page.locate(key);
        let child = page.child_at(slot).ok_or_else(|| BTreeError::InvalidState {
            block: number,
            reason: format!("no child at slot {}", slot),
        })?;

        let Some(split) = self.insert_at(table, allocator, child, key, record)? else {
            return Ok(None);
        };

        // The child kept its upper half, so the new lower half goes right before it
        self.with_pinned(table, number, |table, frame_id| {
            table.page_mut(frame_id)?.insert_cell(
                slot,
                Cell::Key(KeyCell {
                    key: split.separator,
                    child: split.left,
                }),
            );
            self.split_if_needed(table, allocator, number, frame_id)
        })
    }

    fn split_if_needed(
        &self,
        table: &mut PageTable,
        allocator: &mut BlockAllocator,
        number: BlockNumber,
        frame_id: FrameId,
    ) -> BTreeResult<Option<Split>> {
        let page = table.page_mut(frame_id)?;
        if !page.needs_split(self.max_degree) {
            return Ok(None);
        }

        let (left, separator) = page.split()?;
        let left_number = allocator.allocate();
        table.set(self.block(left_number), left)?;
        debug!(
            "split block {}: lower half to {}, separator {}",
            number, left_number, separator
        );

        Ok(Some(Split {
            separator,
            left: left_number,
        }))
    }

    /// Leaf block and slot holding `key`, if present
    pub fn locate_leaf(
        &self,
        table: &mut PageTable,
        key: BTreeKey,
    ) -> BTreeResult<Option<(BlockNumber, usize)>> {
        if key >= MAX_KEY {
            return Err(BTreeError::KeyOutOfRange(key));
        }

        let mut number = self.root;
        loop {
            let step = self.with_pinned(table, number, |table, frame_id| {
                let page = table.page(frame_id)?;
                Ok(if page.is_leaf() {
                    Descent::Leaf(page.search(key).ok())
                } else {
                    match page.child_at(page.locate(key)) {
                        Some(child) => Descent::Child(child),
                        None => Descent::Empty,
                    }
                })
            })?;

            match step {
                Descent::Child(child) => number = child,
                Descent::Leaf(slot) => return Ok(slot.map(|slot| (number, slot))),
                Descent::Empty => return Ok(None),
            }
        }
    }

    /// Encoded row stored under `key`, if present
    pub fn find(&self, table: &mut PageTable, key: BTreeKey) -> BTreeResult<Option<Vec<u8>>> {
        let Some((number, slot)) = self.locate_leaf(table, key)? else {
            return Ok(None);
        };

        self.with_pinned(table, number, |table, frame_id| {
            Ok(table.page(frame_id)?.record(slot).map(<[u8]>::to_vec))
        })
    }

    /// Every row in the tree, visiting pages breadth-first from the root.
    ///
    /// Children are queued left to right and all leaves sit at the same
    /// depth, so rows come out in key order.
    pub fn scan(&self, table: &mut PageTable) -> BTreeResult<Vec<Vec<u8>>> {
        let mut rows = Vec::new();
        let mut queue = VecDeque::from([self.root]);

        while let Some(number) = queue.pop_front() {
            self.with_pinned(table, number, |table, frame_id| {
                let page = table.page(frame_id)?;
                if page.is_leaf() {
                    rows.extend(
                        (0..page.key_count())
                            .filter_map(|slot| page.record(slot).map(<[u8]>::to_vec)),
                    );
                } else {
                    queue.extend((0..=page.key_count()).filter_map(|slot| page.child_at(slot)));
                }
                Ok(())
            })?;
        }

        Ok(rows)
    }
}
