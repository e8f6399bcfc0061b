//! # B+ Tree Page Storage Core
//!
//! The storage core of a disk-backed key-value B+ tree: fixed-size pages
//! in a single heap file, cached through a pinning buffer pool, with
//! variable-length records packed into slotted pages and leaf/branch node
//! operations layered on top.
//!
//! ## Architecture
//!
//! - **Types** (`types`): page ids, slot ids, page-size constants
//! - **Page Layer** (`page`): raw page buffers, the pair codec, and the
//!   slotted record layout
//! - **Storage Layer** (`storage`): heap-file I/O and page allocation
//! - **Buffer Pool** (`buffer`): fixed frame cache with clock-hand
//!   eviction, pin counting, and dirty write-back
//! - **Node Layer** (`btree`): leaf and branch views with ordered
//!   search, insertion, and split-with-redistribution
//!
//! A tree driver sits above this crate: it fetches a page through the
//! buffer pool manager, wraps the bytes as a [`Leaf`] or [`Branch`],
//! performs its operation, and drops the guard to release the pin.
//! Splits allocate their new page through the manager and hand the
//! returned separator key back to the driver to propagate upward.
//!
//! ```rust,ignore
//! use bplus_storage::{BufferPool, BufferPoolManager, HeapFile, Leaf};
//! use std::sync::Arc;
//!
//! let disk = Arc::new(HeapFile::open("data.db", false)?);
//! let manager = BufferPoolManager::new(disk, BufferPool::new(1000));
//!
//! let guard = manager.create_page()?;
//! let mut page = guard.write();
//! let mut leaf = Leaf::new(page.as_bytes_mut());
//! let (slot_id, _) = leaf.search(b"hello")?;
//! leaf.insert(slot_id, b"hello", b"world")?;
//! ```

pub mod btree;
pub mod buffer;
pub mod error;
pub mod page;
pub mod storage;
pub mod types;

pub use error::{Result, StorageError};
pub use types::{PageId, SlotId, PAGE_SIZE};

// Re-export the main public API
pub use btree::{Branch, Leaf};
pub use buffer::{BufferPool, BufferPoolManager, PageGuard};
pub use page::{PageBuf, Pair, SlottedPage};
pub use storage::{DiskManager, HeapFile};
