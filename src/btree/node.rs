//! Pair-level operations shared by leaf and branch nodes.
//!
//! Both node kinds store encoded pairs in a slotted region and keep them
//! ordered by key; everything here is expressed over [`SlottedPage`] so
//! the two wrappers stay thin.

use crate::error::{Result, StorageError};
use crate::page::{Pair, SlottedPage, POINTER_SIZE};
use crate::types::SlotId;
use std::cmp::Ordering;

/// Decode the pair stored at `slot_id`
pub(crate) fn pair_at(body: &SlottedPage<'_>, slot_id: SlotId) -> Result<Pair> {
    Pair::decode(body.fetch(slot_id))
}

/// Binary-search the ordered pairs for `key`.
///
/// Returns `(slot_id, true)` on an exact match, or `(insertion_point,
/// false)` when the key is absent.
pub(crate) fn search(body: &SlottedPage<'_>, key: &[u8]) -> Result<(SlotId, bool)> {
    let mut left = 0;
    let mut right = body.slot_num() as usize;
    while left < right {
        let mid = left + (right - left) / 2;
        let pair = pair_at(body, mid as SlotId)?;
        match pair.key.as_slice().cmp(key) {
            Ordering::Less => left = mid + 1,
            Ordering::Greater => right = mid,
            Ordering::Equal => return Ok((mid as SlotId, true)),
        }
    }
    Ok((left as SlotId, false))
}

/// Largest encoded pair a node accepts, sized so at least two pairs and
/// their pointers always fit
pub(crate) fn max_pair_size(body: &SlottedPage<'_>) -> usize {
    body.capacity() / 2 - POINTER_SIZE
}

/// Encode `pair` into a new slot at `slot_id`
pub(crate) fn insert_pair(body: &mut SlottedPage<'_>, slot_id: SlotId, pair: &Pair) -> Result<()> {
    let encoded = pair.encode();
    let max = max_pair_size(body);
    if encoded.len() > max {
        return Err(StorageError::PairTooLarge {
            size: encoded.len(),
            max,
        });
    }
    body.insert(slot_id, encoded.len() as u16)?;
    body.set(slot_id, &encoded);
    Ok(())
}

/// The split target: a node with less than half its capacity free
pub(crate) fn is_half_full(body: &SlottedPage<'_>) -> bool {
    2 * body.free_space() < body.capacity()
}

/// Move the source's smallest pair to the destination's tail.
///
/// The raw record moves without re-encoding. Ordering survives because
/// splits always hand the source's smallest key to a destination whose
/// keys are all smaller.
pub(crate) fn transfer_first(src: &mut SlottedPage<'_>, dst: &mut SlottedPage<'_>) -> Result<()> {
    let next = dst.slot_num();
    let record = src.fetch(0).to_vec();
    dst.insert(next, record.len() as u16)?;
    dst.set(next, &record);
    src.remove(0)
}
