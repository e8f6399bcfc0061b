//! Branch node: separator keys over child page ids.
//!
//! Page layout, from offset 0:
//!
//! ```text
//! right_child: u64 LE | slotted region
//! ```
//!
//! Each slot holds `(separator key, left child id)` with the child id
//! encoded as a fixed 8-byte little-endian integer in the pair's value.
//! The child at slot `i` covers keys up to and including `keys[i]`; keys
//! greater than every separator descend into `right_child`, which lives
//! in the header and has no separator of its own.

use crate::btree::node;
use crate::error::{Result, StorageError};
use crate::page::{Pair, SlottedPage};
use crate::types::{PageId, SlotId};

/// Size of the branch header (the rightmost child id)
pub const BRANCH_HEADER_SIZE: usize = 8;

/// A branch node view over a page's bytes
pub struct Branch<'a> {
    header: &'a mut [u8],
    body: SlottedPage<'a>,
}

impl<'a> Branch<'a> {
    /// Initialize `page` as a branch holding one separator between `left`
    /// and `right`
    pub fn new(page: &'a mut [u8], key: &[u8], left: PageId, right: PageId) -> Result<Self> {
        let mut branch = Self::new_empty(page);
        branch.set_right_child(right);
        branch.insert(0, key, left)?;
        Ok(branch)
    }

    /// Initialize `page` as an empty branch (the destination of a split;
    /// its right child is filled when the split completes)
    pub fn new_empty(page: &'a mut [u8]) -> Self {
        let (header, body) = page.split_at_mut(BRANCH_HEADER_SIZE);
        let mut branch = Self {
            header,
            body: SlottedPage::new(body),
        };
        branch.set_right_child(PageId::INVALID);
        branch
    }

    /// Wrap a page that already holds a branch
    pub fn from_page(page: &'a mut [u8]) -> Self {
        let (header, body) = page.split_at_mut(BRANCH_HEADER_SIZE);
        Self {
            header,
            body: SlottedPage::from_page(body),
        }
    }

    /// The distinguished rightmost child
    pub fn right_child(&self) -> PageId {
        PageId::new(u64::from_le_bytes(self.header[0..8].try_into().unwrap()))
    }

    /// Set the rightmost child
    pub fn set_right_child(&mut self, page_id: PageId) {
        self.header[0..8].copy_from_slice(&page_id.value().to_le_bytes());
    }

    /// Number of separator pairs (one less than the number of children)
    pub fn num_pairs(&self) -> SlotId {
        self.body.slot_num()
    }

    /// Decode the separator pair at `slot_id`
    pub fn pair_at(&self, slot_id: SlotId) -> Result<Pair> {
        node::pair_at(&self.body, slot_id)
    }

    /// Binary-search the separators for `key`
    pub fn search_slot(&self, key: &[u8]) -> Result<(SlotId, bool)> {
        node::search(&self.body, key)
    }

    /// Index of the child that covers `key`.
    ///
    /// A key equal to a separator descends into the separator's right
    /// neighbor, so an exact match at slot `i` selects child `i + 1`.
    pub fn search_child_index(&self, key: &[u8]) -> Result<SlotId> {
        let (slot_id, found) = self.search_slot(key)?;
        if found {
            Ok(slot_id + 1)
        } else {
            Ok(slot_id)
        }
    }

    /// Child page id at `child_index`; index `num_pairs` is the rightmost
    /// child
    pub fn child_at(&self, child_index: SlotId) -> Result<PageId> {
        if child_index == self.num_pairs() {
            return Ok(self.right_child());
        }
        decode_child(&self.pair_at(child_index)?.value)
    }

    /// Page id of the child that covers `key`
    pub fn search_child(&self, key: &[u8]) -> Result<PageId> {
        self.child_at(self.search_child_index(key)?)
    }

    /// Largest encoded pair this branch accepts
    pub fn max_pair_size(&self) -> usize {
        node::max_pair_size(&self.body)
    }

    /// Insert the separator `key` with its left child at `slot_id`
    pub fn insert(&mut self, slot_id: SlotId, key: &[u8], child: PageId) -> Result<()> {
        let pair = Pair::new(key, child.value().to_le_bytes().to_vec());
        node::insert_pair(&mut self.body, slot_id, &pair)
    }

    /// Whether this branch has reached the split target
    pub fn is_half_full(&self) -> bool {
        node::is_half_full(&self.body)
    }

    /// Pop the last separator and promote its child to the rightmost
    /// slot.
    ///
    /// Run on the destination after a split has moved pairs in: the last
    /// key moved over stops being a separator, and its child becomes the
    /// new branch's right child.
    pub fn fill_right_child(&mut self) -> Result<()> {
        assert!(self.num_pairs() > 0, "fill_right_child on empty branch");
        let last = self.num_pairs() - 1;
        let child = self.child_at(last)?;
        self.body.remove(last)?;
        self.set_right_child(child);
        Ok(())
    }

    /// Split this branch into `new_branch` while inserting `(new_key,
    /// new_page_id)`, returning the separator key for the parent.
    ///
    /// As with a leaf split, the source hands its smallest pairs to
    /// `new_branch` until the latter is half-full. The differences are
    /// that a duplicate separator is rejected with `KeyExists`, the
    /// source is never drained below one pair, and the returned separator
    /// is *removed* from both nodes: it survives only in the parent,
    /// while its child becomes `new_branch`'s right child.
    pub fn split_insert(
        &mut self,
        new_branch: &mut Branch<'_>,
        new_key: &[u8],
        new_page_id: PageId,
    ) -> Result<Vec<u8>> {
        loop {
            if new_branch.is_half_full() {
                let (slot_id, found) = self.search_slot(new_key)?;
                if found {
                    return Err(StorageError::KeyExists);
                }
                self.insert(slot_id, new_key, new_page_id)?;
                break;
            }
            let smallest = self.pair_at(0)?;
            if smallest.key.as_slice() < new_key {
                self.transfer(new_branch)?;
            } else {
                new_branch.insert(new_branch.num_pairs(), new_key, new_page_id)?;
                while !new_branch.is_half_full() {
                    if self.num_pairs() == 1 {
                        break;
                    }
                    self.transfer(new_branch)?;
                }
                break;
            }
        }
        new_branch.fill_right_child()?;
        Ok(self.pair_at(0)?.key)
    }

    fn transfer(&mut self, dest: &mut Branch<'_>) -> Result<()> {
        node::transfer_first(&mut self.body, &mut dest.body)
    }
}

fn decode_child(value: &[u8]) -> Result<PageId> {
    let bytes: [u8; 8] = value
        .try_into()
        .map_err(|_| StorageError::corruption("branch child id must be 8 bytes"))?;
    Ok(PageId::new(u64::from_le_bytes(bytes)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::varint::put_uvarint;

    fn key(n: u64) -> Vec<u8> {
        let mut buf = Vec::new();
        put_uvarint(&mut buf, n);
        buf
    }

    fn sample_branch(page: &mut [u8]) -> Branch<'_> {
        let mut branch = Branch::new(page, &key(5), PageId::new(1), PageId::new(2)).unwrap();
        branch.insert(1, &key(8), PageId::new(3)).unwrap();
        branch.insert(2, &key(11), PageId::new(4)).unwrap();
        branch
    }

    #[test]
    fn test_search_child() {
        let mut page = [0u8; 500];
        let branch = sample_branch(&mut page);
        assert_eq!(branch.num_pairs(), 3);
        assert_eq!(branch.right_child(), PageId::new(2));

        for (input, expected) in [(1, 1), (5, 3), (6, 3), (8, 4), (10, 4), (11, 2), (12, 2)] {
            assert_eq!(
                branch.search_child(&key(input)).unwrap(),
                PageId::new(expected),
                "search_child({input})"
            );
        }
    }

    #[test]
    fn test_child_at_positions() {
        let mut page = [0u8; 500];
        let branch = sample_branch(&mut page);

        assert_eq!(branch.child_at(0).unwrap(), PageId::new(1));
        assert_eq!(branch.child_at(1).unwrap(), PageId::new(3));
        assert_eq!(branch.child_at(2).unwrap(), PageId::new(4));
        // index num_pairs selects the rightmost child
        assert_eq!(branch.child_at(3).unwrap(), PageId::new(2));
    }

    #[test]
    fn test_split_insert() {
        let mut page = [0u8; 60];
        let mut branch = sample_branch(&mut page);

        let mut new_page = [0u8; 60];
        let mut new_branch = Branch::new_empty(&mut new_page);
        let separator = branch
            .split_insert(&mut new_branch, &key(10), PageId::new(5))
            .unwrap();
        assert_eq!(separator, key(10));

        assert_eq!(branch.num_pairs(), 2);
        assert_eq!(new_branch.num_pairs(), 1);

        for (input, expected) in [(1, 1), (5, 3), (6, 3)] {
            assert_eq!(
                new_branch.search_child(&key(input)).unwrap(),
                PageId::new(expected),
                "new_branch.search_child({input})"
            );
        }
        for (input, expected) in [(9, 5), (10, 4), (11, 2), (12, 2)] {
            assert_eq!(
                branch.search_child(&key(input)).unwrap(),
                PageId::new(expected),
                "branch.search_child({input})"
            );
        }
    }

    #[test]
    fn test_split_insert_duplicate_separator() {
        let mut page = [0u8; 60];
        let mut branch = sample_branch(&mut page);

        let mut new_page = [0u8; 60];
        let mut new_branch = Branch::new_empty(&mut new_page);
        let err = branch
            .split_insert(&mut new_branch, &key(11), PageId::new(5))
            .unwrap_err();
        assert!(matches!(err, StorageError::KeyExists));
    }
}
