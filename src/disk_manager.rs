use crate::page::{Page, PageId, PAGE_SIZE};
use std::fs::{File, OpenOptions};
use std::io::{ErrorKind, Read, Seek, SeekFrom, Write};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DiskError {
    Io(String),
}

impl std::fmt::Display for DiskError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DiskError::Io(msg) => write!(f, "[DM] I/O error: {}", msg),
        }
    }
}

impl std::error::Error for DiskError {}

impl From<std::io::Error> for DiskError {
    fn from(e: std::io::Error) -> Self {
        DiskError::Io(e.to_string())
    }
}

/// Block-level page storage injected into the buffer pool.
///
/// The pool calls `write_page` before reusing a dirty frame and `read_page`
/// when faulting a page in; `deallocate_page` is advisory.
pub trait DiskManager: Send + Sync {
    /// Fill `page` with the stored content of `page_id`.
    fn read_page(&self, page_id: PageId, page: &mut Page) -> Result<(), DiskError>;

    /// Durably store `page` as the content of `page_id`.
    fn write_page(&self, page_id: PageId, page: &Page) -> Result<(), DiskError>;

    /// Advise the disk layer that `page_id` may be reclaimed.
    fn deallocate_page(&self, page_id: PageId);
}

/// File-backed disk manager. Pages live at `page_id * PAGE_SIZE` in a single
/// backing file.
pub struct FileDiskManager {
    file: Mutex<File>,
    num_pages: AtomicUsize,
}

impl FileDiskManager {
    pub fn new<P: AsRef<std::path::Path>>(path: P) -> Result<Self, DiskError> {
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .open(path)?;
        let num_pages = file.metadata()?.len() as usize / PAGE_SIZE;
        Ok(FileDiskManager {
            file: Mutex::new(file),
            num_pages: AtomicUsize::new(num_pages),
        })
    }

    /// High-water mark of pages ever written to the backing file.
    pub fn num_pages(&self) -> usize {
        self.num_pages.load(Ordering::Relaxed)
    }
}

impl DiskManager for FileDiskManager {
    fn read_page(&self, page_id: PageId, page: &mut Page) -> Result<(), DiskError> {
        let mut file = self.file.lock().unwrap();
        file.seek(SeekFrom::Start(page_id as u64 * PAGE_SIZE as u64))?;
        let mut filled = 0;
        while filled < PAGE_SIZE {
            match file.read(&mut page[filled..]) {
                Ok(0) => break,
                Ok(n) => filled += n,
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return Err(e.into()),
            }
        }
        if filled < PAGE_SIZE {
            // Reading past the end of file is legal: the page was never
            // written (or was deallocated), so the rest reads as zeros.
            log::warn!(
                "short read of page {}: {} of {} bytes",
                page_id,
                filled,
                PAGE_SIZE
            );
            page[filled..].fill(0);
        }
        Ok(())
    }

    fn write_page(&self, page_id: PageId, page: &Page) -> Result<(), DiskError> {
        let mut file = self.file.lock().unwrap();
        file.seek(SeekFrom::Start(page_id as u64 * PAGE_SIZE as u64))?;
        file.write_all(page)?;
        file.flush()?;
        self.num_pages
            .fetch_max(page_id as usize + 1, Ordering::Relaxed);
        Ok(())
    }

    fn deallocate_page(&self, _page_id: PageId) {
        // The file is not shrunk; the identifier is simply never reused by
        // the pool's allocator.
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn temp_disk(dir: &TempDir) -> FileDiskManager {
        FileDiskManager::new(dir.path().join("pages.db")).unwrap()
    }

    #[test]
    fn test_write_then_read_round_trip() {
        let dir = TempDir::new().unwrap();
        let dm = temp_disk(&dir);

        let mut page = Page::new();
        page[0] = 0xDE;
        page[PAGE_SIZE - 1] = 0xAD;
        dm.write_page(3, &page).unwrap();

        let mut out = Page::new();
        dm.read_page(3, &mut out).unwrap();
        assert_eq!(out[0], 0xDE);
        assert_eq!(out[PAGE_SIZE - 1], 0xAD);
        assert_eq!(dm.num_pages(), 4);
    }

    #[test]
    fn test_read_unwritten_page_is_zeroed() {
        let dir = TempDir::new().unwrap();
        let dm = temp_disk(&dir);

        let mut out = Page::new();
        out[100] = 7;
        dm.read_page(9, &mut out).unwrap();
        assert!(out.iter().all(|&b| b == 0));
    }

    #[test]
    fn test_reopen_preserves_pages() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("pages.db");
        {
            let dm = FileDiskManager::new(&path).unwrap();
            let mut page = Page::new();
            page[42] = 42;
            dm.write_page(0, &page).unwrap();
        }
        let dm = FileDiskManager::new(&path).unwrap();
        assert_eq!(dm.num_pages(), 1);
        let mut out = Page::new();
        dm.read_page(0, &mut out).unwrap();
        assert_eq!(out[42], 42);
    }

    #[test]
    fn test_deallocate_is_advisory() {
        let dir = TempDir::new().unwrap();
        let dm = temp_disk(&dir);

        let mut page = Page::new();
        page[0] = 1;
        dm.write_page(0, &page).unwrap();
        dm.deallocate_page(0);

        // Content is still readable; only the pool's allocator forgets it.
        let mut out = Page::new();
        dm.read_page(0, &mut out).unwrap();
        assert_eq!(out[0], 1);
    }
}
