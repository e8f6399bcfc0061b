//! Slotted page layout.
//!
//! A slotted page stores variable-length records inside a fixed byte
//! region with the following layout:
//!
//! ```text
//! ┌──────────────────────────────────────────────────┐
//! │ slot_num: u16 LE │ free_space_offset: u16 LE     │  header
//! ├──────────────────────────────────────────────────┤
//! │ [ptr0][ptr1][ptr2]...        →                   │  pointer array
//! ├──────────────────────────────────────────────────┤
//! │                  free space                      │
//! ├──────────────────────────────────────────────────┤
//! │              ←  [rec2][rec1][rec0]               │  record heap
//! └──────────────────────────────────────────────────┘
//! ```
//!
//! The pointer array grows from the body's front, the record heap from its
//! back; the free region lies between them. Every offset below, including
//! `free_space_offset`, is relative to the body (the bytes after the
//! 4-byte header). Records are addressable only through their pointers, so
//! `resize` is free to slide heap bytes around as long as it keeps the
//! pointers coherent.

use crate::error::{Result, StorageError};
use crate::types::SlotId;

/// Size of the slotted region header in bytes
pub const SLOTTED_HEADER_SIZE: usize = 4;

/// Size of one record pointer in bytes (two `u16` little-endian fields)
pub const POINTER_SIZE: usize = 4;

/// A record pointer: `[offset, offset + len)` within the body
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Pointer {
    offset: u16,
    len: u16,
}

impl Pointer {
    fn read(buf: &[u8]) -> Self {
        Self {
            offset: u16::from_le_bytes([buf[0], buf[1]]),
            len: u16::from_le_bytes([buf[2], buf[3]]),
        }
    }

    fn write(self, buf: &mut [u8]) {
        buf[0..2].copy_from_slice(&self.offset.to_le_bytes());
        buf[2..4].copy_from_slice(&self.len.to_le_bytes());
    }

    fn range(self) -> std::ops::Range<usize> {
        let start = self.offset as usize;
        start..start + self.len as usize
    }
}

/// A mutable slotted view over a byte region
pub struct SlottedPage<'a> {
    data: &'a mut [u8],
}

impl<'a> SlottedPage<'a> {
    /// Initialize `data` as an empty slotted region and wrap it
    pub fn new(data: &'a mut [u8]) -> Self {
        assert!(
            data.len() > SLOTTED_HEADER_SIZE && data.len() - SLOTTED_HEADER_SIZE <= u16::MAX as usize,
            "slotted region must be between {} and {} bytes",
            SLOTTED_HEADER_SIZE + 1,
            SLOTTED_HEADER_SIZE + u16::MAX as usize,
        );
        let mut page = Self { data };
        page.set_slot_num(0);
        let capacity = page.capacity() as u16;
        page.set_free_space_offset(capacity);
        page
    }

    /// Wrap an already-initialized slotted region
    pub fn from_page(data: &'a mut [u8]) -> Self {
        Self { data }
    }

    /// Number of bytes available to the pointer array and record heap
    pub fn capacity(&self) -> usize {
        self.data.len() - SLOTTED_HEADER_SIZE
    }

    /// Number of slots in use
    pub fn slot_num(&self) -> SlotId {
        u16::from_le_bytes([self.data[0], self.data[1]])
    }

    fn set_slot_num(&mut self, num: SlotId) {
        self.data[0..2].copy_from_slice(&num.to_le_bytes());
    }

    /// Offset of the record heap's first byte within the body
    pub fn free_space_offset(&self) -> u16 {
        u16::from_le_bytes([self.data[2], self.data[3]])
    }

    fn set_free_space_offset(&mut self, offset: u16) {
        self.data[2..4].copy_from_slice(&offset.to_le_bytes());
    }

    /// Width of the free region between the pointer array and the heap
    pub fn free_space(&self) -> usize {
        self.free_space_offset() as usize - self.slot_num() as usize * POINTER_SIZE
    }

    fn body(&self) -> &[u8] {
        &self.data[SLOTTED_HEADER_SIZE..]
    }

    fn body_mut(&mut self) -> &mut [u8] {
        &mut self.data[SLOTTED_HEADER_SIZE..]
    }

    fn pointer(&self, index: SlotId) -> Pointer {
        assert!(index < self.slot_num(), "slot index {index} out of range");
        Pointer::read(&self.body()[index as usize * POINTER_SIZE..])
    }

    fn set_pointer(&mut self, index: SlotId, pointer: Pointer) {
        pointer.write(&mut self.body_mut()[index as usize * POINTER_SIZE..]);
    }

    /// Open a new slot at `index` holding an uninitialized record of
    /// `len` bytes; existing slots at `index` and after shift right.
    ///
    /// The record's bytes are undefined until [`set`](Self::set).
    pub fn insert(&mut self, index: SlotId, len: u16) -> Result<()> {
        let old_num = self.slot_num();
        assert!(index <= old_num, "slot index {index} out of range");

        let needed = POINTER_SIZE + len as usize;
        let available = self.free_space();
        if available < needed {
            return Err(StorageError::PageFull { needed, available });
        }

        let offset = self.free_space_offset() - len;
        self.set_free_space_offset(offset);
        self.set_slot_num(old_num + 1);

        let body = self.body_mut();
        body.copy_within(
            index as usize * POINTER_SIZE..old_num as usize * POINTER_SIZE,
            (index as usize + 1) * POINTER_SIZE,
        );
        self.set_pointer(index, Pointer { offset, len });
        Ok(())
    }

    /// Overwrite the record at `index`; `record` must match the slot's
    /// current length exactly.
    pub fn set(&mut self, index: SlotId, record: &[u8]) {
        let range = self.pointer(index).range();
        self.body_mut()[range].copy_from_slice(record);
    }

    /// Borrow the record bytes at `index`
    pub fn fetch(&self, index: SlotId) -> &[u8] {
        &self.body()[self.pointer(index).range()]
    }

    /// Delete the slot at `index`; later slots shift left and renumber
    pub fn remove(&mut self, index: SlotId) -> Result<()> {
        self.resize(index, 0)?;
        let num = self.slot_num();
        self.body_mut().copy_within(
            (index as usize + 1) * POINTER_SIZE..num as usize * POINTER_SIZE,
            index as usize * POINTER_SIZE,
        );
        self.set_slot_num(num - 1);
        Ok(())
    }

    /// Change the record at `index` to `new_len` bytes, compacting the
    /// heap in place.
    ///
    /// Every record at or below the resized one slides by the length
    /// difference so the gap just past the record closes (shrink) or
    /// opens (grow); affected pointers follow their records. Growing
    /// leaves the added bytes undefined until [`set`](Self::set); a
    /// `new_len` of zero parks the pointer at the new free-space
    /// boundary.
    pub fn resize(&mut self, index: SlotId, new_len: u16) -> Result<()> {
        let old = self.pointer(index);
        let diff = new_len as isize - old.len as isize;
        if diff == 0 {
            return Ok(());
        }
        let available = self.free_space();
        if diff > available as isize {
            return Err(StorageError::PageFull {
                needed: diff as usize,
                available,
            });
        }

        let old_fso = self.free_space_offset() as usize;
        let new_fso = (old_fso as isize - diff) as usize;

        self.body_mut()
            .copy_within(old_fso..old.offset as usize, new_fso);

        for i in 0..self.slot_num() {
            let mut pointer = self.pointer(i);
            if pointer.offset > old.offset {
                continue;
            }
            pointer.offset = (pointer.offset as isize - diff) as u16;
            if i == index {
                pointer.len = new_len;
                if new_len == 0 {
                    pointer.offset = new_fso as u16;
                }
            }
            self.set_pointer(i, pointer);
        }

        self.set_free_space_offset(new_fso as u16);
        Ok(())
    }
}
