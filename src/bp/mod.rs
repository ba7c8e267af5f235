mod buffer_frame;
mod buffer_pool;
mod lru_k_replacer;
mod page_table;

pub use buffer_frame::BufferFrame;
pub use buffer_pool::BufferPoolManager;
pub use lru_k_replacer::LruKReplacer;
pub use page_table::ExtendibleHashTable;

use crate::disk_manager::{DiskError, FileDiskManager};
use std::ops::Deref;
use tempfile::TempDir;

/// Index of a slot in the pool, in `[0, pool_size)`.
pub type FrameId = usize;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PoolStatus {
    /// The page is not resident in the pool.
    PageNotFound,
    /// Unpin on a page whose pin count is already zero.
    PageNotPinned,
    /// Delete on a page with outstanding pins.
    PagePinned,
    /// No free frame and no evictable frame.
    CannotEvictPage,
    Disk(DiskError),
}

impl From<DiskError> for PoolStatus {
    fn from(e: DiskError) -> Self {
        PoolStatus::Disk(e)
    }
}

impl std::fmt::Display for PoolStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PoolStatus::PageNotFound => write!(f, "[BP] Page not found"),
            PoolStatus::PageNotPinned => write!(f, "[BP] Page is not pinned"),
            PoolStatus::PagePinned => write!(f, "[BP] Page has outstanding pins"),
            PoolStatus::CannotEvictPage => {
                write!(f, "[BP] All frames are pinned and no page can be evicted")
            }
            PoolStatus::Disk(e) => e.fmt(f),
        }
    }
}

impl std::error::Error for PoolStatus {}

#[derive(Debug, Clone)]
pub struct PoolOptions {
    /// Number of frames owned by the pool.
    pub pool_size: usize,
    /// History depth of the LRU-K replacer.
    pub replacer_k: usize,
    /// Entries per bucket of the page table directory.
    pub bucket_size: usize,
}

impl Default for PoolOptions {
    fn default() -> Self {
        PoolOptions {
            pool_size: 64,
            replacer_k: 2,
            bucket_size: 4,
        }
    }
}

/// A pool over a temporary backing file. The directory lives as long as the
/// value, so tests and benches can drive real disk I/O without setup.
pub struct PoolForTest {
    pub _temp_dir: TempDir,
    pub pool: BufferPoolManager<FileDiskManager>,
}

impl Deref for PoolForTest {
    type Target = BufferPoolManager<FileDiskManager>;

    fn deref(&self) -> &Self::Target {
        &self.pool
    }
}

pub fn get_test_pool(pool_size: usize, replacer_k: usize) -> PoolForTest {
    let temp_dir = TempDir::new().unwrap();
    let disk = FileDiskManager::new(temp_dir.path().join("pages.db")).unwrap();
    let options = PoolOptions {
        pool_size,
        replacer_k,
        ..PoolOptions::default()
    };
    PoolForTest {
        _temp_dir: temp_dir,
        pool: BufferPoolManager::new(options, disk),
    }
}

pub mod prelude {
    pub use super::{
        get_test_pool, BufferFrame, BufferPoolManager, ExtendibleHashTable, FrameId,
        LruKReplacer, PoolForTest, PoolOptions, PoolStatus,
    };
}
