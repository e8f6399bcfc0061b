//! Frame array and clock-hand victim selection.
//!
//! The pool owns the frames and nothing else: no I/O, no page table.
//! Those belong to the buffer pool manager layered on top.

use crate::page::PageBuf;
use crate::types::PageId;
use parking_lot::{Mutex, RwLock};

/// Index of a frame within the buffer pool
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameId(pub usize);

/// A frame: one page-sized cache slot, repurposed across pages for the
/// pool's lifetime
pub struct BufferFrame {
    pub(crate) page_id: PageId,
    pub(crate) page: PageBuf,
    pub(crate) dirty: bool,
    pub(crate) pin_count: u64,
}

impl BufferFrame {
    fn new() -> Self {
        Self {
            page_id: PageId::INVALID,
            page: PageBuf::new(),
            dirty: false,
            pin_count: 0,
        }
    }

    /// Id of the page this frame currently holds
    pub fn page_id(&self) -> PageId {
        self.page_id
    }

    /// Whether the frame's page has unpersisted modifications
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Number of outstanding pins; the frame is evictable at zero
    pub fn pin_count(&self) -> u64 {
        self.pin_count
    }
}

/// A fixed set of frames with a clock hand for victim selection
pub struct BufferPool {
    frames: Vec<RwLock<BufferFrame>>,
    next_victim: Mutex<usize>,
}

impl BufferPool {
    /// Create a pool with `pool_size` frames
    pub fn new(pool_size: usize) -> Self {
        assert!(pool_size > 0, "buffer pool needs at least one frame");
        Self {
            frames: (0..pool_size).map(|_| RwLock::new(BufferFrame::new())).collect(),
            next_victim: Mutex::new(0),
        }
    }

    /// Number of frames in the pool
    pub fn size(&self) -> usize {
        self.frames.len()
    }

    pub(crate) fn frame(&self, frame_id: FrameId) -> &RwLock<BufferFrame> {
        &self.frames[frame_id.0]
    }

    /// Pick an eviction victim with a clock scan.
    ///
    /// Starting at the hand, probe up to `size()` frames: the first one
    /// with a zero pin count wins and the hand stays on it; each pinned
    /// frame advances the hand one step. Returns `None` when every frame
    /// is pinned.
    pub fn evict(&self) -> Option<FrameId> {
        let mut hand = self.next_victim.lock();
        for _ in 0..self.size() {
            if self.frames[*hand].read().pin_count == 0 {
                return Some(FrameId(*hand));
            }
            *hand = (*hand + 1) % self.size();
        }
        None
    }
}
