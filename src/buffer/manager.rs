//! Buffer pool manager: the page table and pinned-page guards.
//!
//! The manager maps page ids to frames, creating and fetching pages
//! through the disk manager and writing dirty victims back before a
//! frame is reused. Borrowed pages are returned as RAII guards so a pin
//! can never leak: dropping the guard releases it.

use crate::buffer::pool::{BufferFrame, BufferPool, FrameId};
use crate::error::{Result, StorageError};
use crate::page::PageBuf;
use crate::storage::DiskManager;
use crate::types::PageId;
use parking_lot::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::collections::HashMap;
use std::sync::Arc;

/// Caches pages in a fixed set of frames, spilling dirty victims to disk
pub struct BufferPoolManager {
    disk: Arc<dyn DiskManager>,
    pool: BufferPool,
    page_table: RwLock<HashMap<PageId, FrameId>>,
}

impl BufferPoolManager {
    /// Create a manager over the given disk manager and frame pool
    pub fn new(disk: Arc<dyn DiskManager>, pool: BufferPool) -> Self {
        let page_table = RwLock::new(HashMap::with_capacity(pool.size()));
        Self {
            disk,
            pool,
            page_table,
        }
    }

    /// Number of frames in the underlying pool
    pub fn capacity(&self) -> usize {
        self.pool.size()
    }

    /// Allocate a fresh page and return it pinned.
    ///
    /// The new page starts zeroed and dirty: it has never been persisted,
    /// so it must be written back whenever its frame is evicted.
    pub fn create_page(&self) -> Result<PageGuard<'_>> {
        let frame_id = self.pool.evict().ok_or(StorageError::BufferPoolExhausted)?;
        let frame = self.pool.frame(frame_id);
        let mut slot = frame.write();

        self.flush_victim(&mut slot)?;

        let mut table = self.page_table.write();
        if slot.page_id.is_valid() {
            table.remove(&slot.page_id);
        }

        let page_id = self.disk.allocate_page();
        slot.page_id = page_id;
        slot.dirty = true;
        slot.pin_count = 1;
        slot.page = PageBuf::new();
        table.insert(page_id, frame_id);

        drop(slot);
        Ok(PageGuard { page_id, frame })
    }

    /// Pin the page with the given id, reading it from disk on a cache
    /// miss.
    ///
    /// Pages read from disk start clean; a caller that modifies one must
    /// do so through [`PageGuard::write`], which marks the frame dirty.
    pub fn fetch_page(&self, page_id: PageId) -> Result<PageGuard<'_>> {
        let cached = self.page_table.read().get(&page_id).copied();
        if let Some(frame_id) = cached {
            let frame = self.pool.frame(frame_id);
            frame.write().pin_count += 1;
            return Ok(PageGuard { page_id, frame });
        }

        let frame_id = self.pool.evict().ok_or(StorageError::BufferPoolExhausted)?;
        let frame = self.pool.frame(frame_id);
        let mut slot = frame.write();

        self.flush_victim(&mut slot)?;

        let mut table = self.page_table.write();
        if slot.page_id.is_valid() {
            table.remove(&slot.page_id);
        }

        // Zero first so a page the file does not cover yet reads as all
        // zeroes; on a read error the old mapping is already gone and the
        // frame stays unmapped until successfully reassigned.
        slot.page_id = page_id;
        slot.dirty = false;
        slot.page = PageBuf::new();
        self.disk.read_page(page_id, &mut slot.page)?;
        slot.pin_count = 1;
        table.insert(page_id, frame_id);

        drop(slot);
        Ok(PageGuard { page_id, frame })
    }

    /// Write back every dirty cached page and sync the heap file
    pub fn flush_all(&self) -> Result<()> {
        let table = self.page_table.read();
        for (&page_id, &frame_id) in table.iter() {
            let mut slot = self.pool.frame(frame_id).write();
            if slot.dirty {
                self.disk.write_page(page_id, &slot.page)?;
                slot.dirty = false;
            }
        }
        self.disk.sync()
    }

    /// Persist a dirty victim before its frame is repurposed. A write
    /// failure surfaces before any state has changed.
    fn flush_victim(&self, slot: &mut BufferFrame) -> Result<()> {
        if slot.dirty {
            self.disk.write_page(slot.page_id, &slot.page)?;
            slot.dirty = false;
        }
        Ok(())
    }
}

/// A pinned page.
///
/// Holds one pin on the underlying frame for its whole lifetime and
/// releases it on drop, so every exit path unpins exactly once.
pub struct PageGuard<'a> {
    page_id: PageId,
    frame: &'a RwLock<BufferFrame>,
}

impl<'a> PageGuard<'a> {
    /// Get the page id
    pub fn page_id(&self) -> PageId {
        self.page_id
    }

    /// Borrow the page bytes for reading
    pub fn read(&self) -> PageRef<'_> {
        PageRef {
            guard: self.frame.read(),
        }
    }

    /// Borrow the page bytes for writing, marking the frame dirty
    pub fn write(&self) -> PageRefMut<'_> {
        let mut guard = self.frame.write();
        guard.dirty = true;
        PageRefMut { guard }
    }
}

impl Drop for PageGuard<'_> {
    fn drop(&mut self) {
        let mut slot = self.frame.write();
        debug_assert!(slot.pin_count > 0, "pin count underflow");
        slot.pin_count = slot.pin_count.saturating_sub(1);
    }
}

/// Shared borrow of a pinned page's bytes
pub struct PageRef<'a> {
    guard: RwLockReadGuard<'a, BufferFrame>,
}

impl std::ops::Deref for PageRef<'_> {
    type Target = PageBuf;

    fn deref(&self) -> &Self::Target {
        &self.guard.page
    }
}

/// Exclusive borrow of a pinned page's bytes
pub struct PageRefMut<'a> {
    guard: RwLockWriteGuard<'a, BufferFrame>,
}

impl std::ops::Deref for PageRefMut<'_> {
    type Target = PageBuf;

    fn deref(&self) -> &Self::Target {
        &self.guard.page
    }
}

impl std::ops::DerefMut for PageRefMut<'_> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.guard.page
    }
}
