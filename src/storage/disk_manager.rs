//! Disk manager implementation.
//!
//! The disk manager is responsible for allocating page ids and moving
//! pages between memory and the heap file. It is abstracted behind a
//! trait so the buffer pool can be tested against mock storage.

use crate::error::Result;
use crate::page::PageBuf;
use crate::types::{PageId, PAGE_SIZE};
use parking_lot::Mutex;
use std::fs::{File, OpenOptions};
use std::io::{ErrorKind, Read, Seek, SeekFrom, Write};
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};

/// Trait for page allocation and I/O
pub trait DiskManager: Send + Sync {
    /// Hand out the next page id. Performs no I/O; the heap file grows
    /// lazily when the page is first written.
    fn allocate_page(&self) -> PageId;

    /// Read the page at `page_id` into `page`.
    ///
    /// Reading past the end of the file is not an error: the bytes that
    /// were not covered by the file are left untouched.
    fn read_page(&self, page_id: PageId, page: &mut PageBuf) -> Result<()>;

    /// Write the full page at `page_id`
    fn write_page(&self, page_id: PageId, page: &PageBuf) -> Result<()>;

    /// Sync all written data to disk
    fn sync(&self) -> Result<()>;
}

/// File-backed disk manager over a single heap file.
///
/// Page `p` occupies bytes `[p * PAGE_SIZE, (p + 1) * PAGE_SIZE)`. Ids are
/// issued starting at 1; page 0 is never allocated, leaving it for a
/// driver's meta page via direct reads and writes.
pub struct HeapFile {
    file: Mutex<File>,
    /// Highest page id handed out so far
    last_page_id: AtomicU64,
    sync_on_write: bool,
}

impl HeapFile {
    /// Open or create a heap file at the given path.
    ///
    /// Reopening an existing file resumes allocation after its last page.
    pub fn open(path: impl AsRef<Path>, sync_on_write: bool) -> Result<Self> {
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(path)?;

        let pages = file.metadata()?.len().div_ceil(PAGE_SIZE as u64);
        Ok(Self {
            file: Mutex::new(file),
            last_page_id: AtomicU64::new(pages.saturating_sub(1)),
            sync_on_write,
        })
    }
}

impl DiskManager for HeapFile {
    fn allocate_page(&self) -> PageId {
        PageId::new(self.last_page_id.fetch_add(1, Ordering::SeqCst) + 1)
    }

    fn read_page(&self, page_id: PageId, page: &mut PageBuf) -> Result<()> {
        let mut file = self.file.lock();
        file.seek(SeekFrom::Start(page_id.file_offset(PAGE_SIZE)))?;

        let buf = page.as_bytes_mut();
        let mut filled = 0;
        while filled < buf.len() {
            match file.read(&mut buf[filled..]) {
                Ok(0) => break,
                Ok(n) => filled += n,
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return Err(e.into()),
            }
        }
        Ok(())
    }

    fn write_page(&self, page_id: PageId, page: &PageBuf) -> Result<()> {
        let mut file = self.file.lock();
        file.seek(SeekFrom::Start(page_id.file_offset(PAGE_SIZE)))?;
        file.write_all(page.as_bytes())?;

        if self.sync_on_write {
            file.sync_data()?;
        }
        Ok(())
    }

    fn sync(&self) -> Result<()> {
        self.file.lock().sync_all()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_allocate_starts_at_one() -> Result<()> {
        let dir = tempdir().unwrap();
        let disk = HeapFile::open(dir.path().join("test.db"), false)?;

        assert_eq!(disk.allocate_page(), PageId::new(1));
        assert_eq!(disk.allocate_page(), PageId::new(2));
        assert_eq!(disk.allocate_page(), PageId::new(3));
        Ok(())
    }

    #[test]
    fn test_write_and_read_page() -> Result<()> {
        let dir = tempdir().unwrap();
        let disk = HeapFile::open(dir.path().join("test.db"), false)?;

        let page_id = disk.allocate_page();
        let mut page = PageBuf::new();
        page[..15].copy_from_slice(b"This is a test.");
        disk.write_page(page_id, &page)?;

        let mut read = PageBuf::new();
        disk.read_page(page_id, &mut read)?;
        assert_eq!(read.as_bytes(), page.as_bytes());
        Ok(())
    }

    #[test]
    fn test_read_past_eof_leaves_buffer_untouched() -> Result<()> {
        let dir = tempdir().unwrap();
        let disk = HeapFile::open(dir.path().join("test.db"), false)?;

        // allocated but never written; the file has not grown
        let page_id = disk.allocate_page();
        let mut page = PageBuf::new();
        page[..6].copy_from_slice(b"marker");
        disk.read_page(page_id, &mut page)?;
        assert_eq!(&page[..6], b"marker");
        Ok(())
    }

    #[test]
    fn test_reopen_resumes_allocation() -> Result<()> {
        let dir = tempdir().unwrap();
        let path = dir.path().join("test.db");

        {
            let disk = HeapFile::open(&path, true)?;
            let p1 = disk.allocate_page();
            let p2 = disk.allocate_page();
            assert_eq!(p2, PageId::new(2));
            let mut page = PageBuf::new();
            page[..4].copy_from_slice(b"keep");
            disk.write_page(p1, &page)?;
            disk.write_page(p2, &page)?;
        }

        let disk = HeapFile::open(&path, false)?;
        assert_eq!(disk.allocate_page(), PageId::new(3));

        let mut page = PageBuf::new();
        disk.read_page(PageId::new(1), &mut page)?;
        assert_eq!(&page[..4], b"keep");
        Ok(())
    }
}
