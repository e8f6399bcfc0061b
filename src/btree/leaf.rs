//! Leaf node: ordered `(key, value)` pairs with sibling links.
//!
//! Page layout, from offset 0:
//!
//! ```text
//! prev_page_id: u64 LE | next_page_id: u64 LE | slotted region
//! ```

use crate::btree::node;
use crate::error::{Result, StorageError};
use crate::page::{Pair, SlottedPage};
use crate::types::{PageId, SlotId};

/// Size of the leaf header (two sibling page ids)
pub const LEAF_HEADER_SIZE: usize = 16;

/// A leaf node view over a page's bytes
pub struct Leaf<'a> {
    header: &'a mut [u8],
    body: SlottedPage<'a>,
}

impl<'a> Leaf<'a> {
    /// Initialize `page` as an empty leaf with both sibling links invalid
    pub fn new(page: &'a mut [u8]) -> Self {
        let (header, body) = page.split_at_mut(LEAF_HEADER_SIZE);
        let mut leaf = Self {
            header,
            body: SlottedPage::new(body),
        };
        leaf.set_prev_page_id(PageId::INVALID);
        leaf.set_next_page_id(PageId::INVALID);
        leaf
    }

    /// Wrap a page that already holds a leaf
    pub fn from_page(page: &'a mut [u8]) -> Self {
        let (header, body) = page.split_at_mut(LEAF_HEADER_SIZE);
        Self {
            header,
            body: SlottedPage::from_page(body),
        }
    }

    /// Left sibling, or `PageId::INVALID` at the chain's start
    pub fn prev_page_id(&self) -> PageId {
        PageId::new(u64::from_le_bytes(self.header[0..8].try_into().unwrap()))
    }

    /// Set the left sibling link; wiring siblings is the tree driver's job
    pub fn set_prev_page_id(&mut self, page_id: PageId) {
        self.header[0..8].copy_from_slice(&page_id.value().to_le_bytes());
    }

    /// Right sibling, or `PageId::INVALID` at the chain's end
    pub fn next_page_id(&self) -> PageId {
        PageId::new(u64::from_le_bytes(self.header[8..16].try_into().unwrap()))
    }

    /// Set the right sibling link
    pub fn set_next_page_id(&mut self, page_id: PageId) {
        self.header[8..16].copy_from_slice(&page_id.value().to_le_bytes());
    }

    /// Number of pairs stored in this leaf
    pub fn num_pairs(&self) -> SlotId {
        self.body.slot_num()
    }

    /// Decode the pair at `slot_id`
    pub fn pair_at(&self, slot_id: SlotId) -> Result<Pair> {
        node::pair_at(&self.body, slot_id)
    }

    /// Binary-search for `key`; on a miss the returned slot is the
    /// insertion point
    pub fn search(&self, key: &[u8]) -> Result<(SlotId, bool)> {
        node::search(&self.body, key)
    }

    /// Largest encoded pair this leaf accepts
    pub fn max_pair_size(&self) -> usize {
        node::max_pair_size(&self.body)
    }

    /// Insert `(key, value)` at `slot_id`
    pub fn insert(&mut self, slot_id: SlotId, key: &[u8], value: &[u8]) -> Result<()> {
        node::insert_pair(&mut self.body, slot_id, &Pair::new(key, value))
    }

    /// Whether this leaf has reached the split target
    pub fn is_half_full(&self) -> bool {
        node::is_half_full(&self.body)
    }

    /// Split this leaf into `new_leaf` while inserting `(new_key,
    /// new_value)`, returning the separator key for the parent.
    ///
    /// The source hands its smallest pairs to `new_leaf`'s tail until the
    /// latter is half-full; the new pair lands wherever key order puts it
    /// along the way. Unlike a branch split, the separator (the source's
    /// resulting smallest key) remains stored in the source. If the new
    /// key is still unplaced once `new_leaf` is half-full and an equal
    /// key sits at its insertion point, the split fails with `KeyExists`.
    pub fn split_insert(
        &mut self,
        new_leaf: &mut Leaf<'_>,
        new_key: &[u8],
        new_value: &[u8],
    ) -> Result<Vec<u8>> {
        loop {
            if new_leaf.is_half_full() {
                let (slot_id, found) = self.search(new_key)?;
                if found {
                    return Err(StorageError::KeyExists);
                }
                self.insert(slot_id, new_key, new_value)?;
                break;
            }
            let smallest = self.pair_at(0)?;
            if smallest.key.as_slice() <= new_key {
                self.transfer(new_leaf)?;
            } else {
                new_leaf.insert(new_leaf.num_pairs(), new_key, new_value)?;
                while !new_leaf.is_half_full() {
                    self.transfer(new_leaf)?;
                }
                break;
            }
        }
        Ok(self.pair_at(0)?.key)
    }

    fn transfer(&mut self, dest: &mut Leaf<'_>) -> Result<()> {
        node::transfer_first(&mut self.body, &mut dest.body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn put(leaf: &mut Leaf<'_>, key: &[u8], value: &[u8]) {
        let (slot_id, found) = leaf.search(key).unwrap();
        assert!(!found);
        leaf.insert(slot_id, key, value).unwrap();
    }

    #[test]
    fn test_new_leaf_has_invalid_siblings() {
        let mut page = [0u8; 300];
        let mut leaf = Leaf::new(&mut page);
        assert_eq!(leaf.num_pairs(), 0);
        assert_eq!(leaf.prev_page_id(), PageId::INVALID);
        assert_eq!(leaf.next_page_id(), PageId::INVALID);

        leaf.set_prev_page_id(PageId::new(7));
        leaf.set_next_page_id(PageId::new(9));
        assert_eq!(leaf.prev_page_id(), PageId::new(7));
        assert_eq!(leaf.next_page_id(), PageId::new(9));
    }

    #[test]
    fn test_insert_keeps_key_order() {
        let mut page = [0u8; 300];
        let mut leaf = Leaf::new(&mut page);

        let (slot_id, found) = leaf.search(b"deadbeef").unwrap();
        assert_eq!((slot_id, found), (0, false));
        leaf.insert(slot_id, b"deadbeef", b"world").unwrap();

        let (slot_id, _) = leaf.search(b"facebook").unwrap();
        assert_eq!(slot_id, 1);
        leaf.insert(slot_id, b"facebook", b"!").unwrap();

        let (slot_id, _) = leaf.search(b"beefdead").unwrap();
        assert_eq!(slot_id, 0);
        leaf.insert(slot_id, b"beefdead", b"hello").unwrap();

        assert_eq!(leaf.pair_at(0).unwrap().key, b"beefdead");
        assert_eq!(leaf.pair_at(1).unwrap().key, b"deadbeef");
        assert_eq!(leaf.pair_at(2).unwrap().key, b"facebook");
        assert_eq!(leaf.pair_at(0).unwrap().value, b"hello");

        let (slot_id, found) = leaf.search(b"deadbeef").unwrap();
        assert_eq!((slot_id, found), (1, true));
    }

    #[test]
    fn test_split_insert() {
        let mut page = [0u8; 120];
        let mut leaf = Leaf::new(&mut page);
        put(&mut leaf, b"deadbeef", b"world");
        put(&mut leaf, b"facebook", b"!");
        put(&mut leaf, b"beefdead", b"hello");

        let mut new_page = [0u8; 120];
        let mut new_leaf = Leaf::new(&mut new_page);
        let separator = leaf
            .split_insert(&mut new_leaf, b"beefdead", b"hello")
            .unwrap();

        assert!(leaf.num_pairs() > 0);
        assert!(new_leaf.num_pairs() > 0);
        assert!(leaf.is_half_full() || new_leaf.is_half_full());
        assert_eq!(separator, leaf.pair_at(0).unwrap().key);
        assert_eq!(separator, b"facebook");
    }

    #[test]
    fn test_split_insert_duplicate_in_source() {
        let mut page = [0u8; 140];
        let mut leaf = Leaf::new(&mut page);
        // two bulky pairs that will migrate, two small ones that stay
        put(&mut leaf, b"a", &[0u8; 33]);
        put(&mut leaf, b"b", &[1u8; 33]);
        put(&mut leaf, b"c", b"x");
        put(&mut leaf, b"d", b"y");

        let mut new_page = [0u8; 140];
        let mut new_leaf = Leaf::new(&mut new_page);
        let err = leaf.split_insert(&mut new_leaf, b"c", b"z").unwrap_err();
        assert!(matches!(err, StorageError::KeyExists));
    }

    #[test]
    fn test_insert_rejects_oversized_pair() {
        let mut page = [0u8; 64];
        let mut leaf = Leaf::new(&mut page);
        let max = leaf.max_pair_size();

        let err = leaf.insert(0, &[7u8; 12], &[8u8; 12]).unwrap_err();
        assert!(matches!(err, StorageError::PairTooLarge { size: _, max: m } if m == max));
        assert_eq!(leaf.num_pairs(), 0);
    }
}
