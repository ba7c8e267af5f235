use crate::log_debug;

use super::buffer_frame::BufferFrame;
use super::lru_k_replacer::LruKReplacer;
use super::page_table::ExtendibleHashTable;
use super::{FrameId, PoolOptions, PoolStatus};
use crate::disk_manager::DiskManager;
use crate::log_manager::LogManager;
use crate::page::{PageId, INVALID_PAGE_ID};

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

#[cfg(feature = "stat")]
#[derive(Default)]
struct PoolStats {
    fetch_hit: usize,
    fetch_miss: usize,
    new_page: usize,
    victim_free: usize,
    victim_clean: usize,
    victim_dirty: usize,
}

#[cfg(feature = "stat")]
impl PoolStats {
    fn to_report(&self) -> String {
        let mut out = String::new();
        out.push_str("Buffer Pool Statistics\n");
        let total = self.fetch_hit + self.fetch_miss + self.new_page;
        let labels = [
            ("Fetch Hit", self.fetch_hit),
            ("Fetch Miss", self.fetch_miss),
            ("New Page", self.new_page),
        ];
        for (label, count) in labels {
            out.push_str(&format!(
                "{:12}: {:8} ({:6.2}%)\n",
                label,
                count,
                (count as f64 / total.max(1) as f64) * 100.0
            ));
        }
        out.push_str("Frame Acquisition\n");
        let sources = [
            ("Free", self.victim_free),
            ("Clean", self.victim_clean),
            ("Dirty", self.victim_dirty),
        ];
        for (label, count) in sources {
            out.push_str(&format!("{:12}: {:8}\n", label, count));
        }
        out
    }
}

struct PoolState {
    page_table: ExtendibleHashTable<PageId, FrameId>,
    replacer: LruKReplacer,
    free_list: VecDeque<FrameId>,
    next_page_id: PageId,
    #[cfg(feature = "stat")]
    stats: PoolStats,
}

/// The buffer pool manager: a fixed array of frames, a free list, the page
/// table, and the replacer, all serialised by one mutex. Disk I/O happens
/// under the lock; correctness of the residency invariants comes first.
///
/// Callers receive a pinned [`BufferFrame`] from `new_page`/`fetch_page`,
/// access the payload through the frame's latch, and hand the frame back
/// with `unpin_page`.
pub struct BufferPoolManager<D: DiskManager> {
    pool_size: usize,
    frames: Vec<BufferFrame>,
    state: Mutex<PoolState>,
    disk: D,
    log_manager: Option<Arc<dyn LogManager>>,
}

impl<D: DiskManager> BufferPoolManager<D> {
    pub fn new(options: PoolOptions, disk: D) -> Self {
        Self::with_log_manager(options, disk, None)
    }

    pub fn with_log_manager(
        options: PoolOptions,
        disk: D,
        log_manager: Option<Arc<dyn LogManager>>,
    ) -> Self {
        let PoolOptions {
            pool_size,
            replacer_k,
            bucket_size,
        } = options;
        assert!(pool_size > 0);
        log_debug!(
            "buffer pool created: pool_size: {}, replacer_k: {}",
            pool_size,
            replacer_k
        );
        BufferPoolManager {
            pool_size,
            frames: (0..pool_size).map(BufferFrame::new).collect(),
            state: Mutex::new(PoolState {
                page_table: ExtendibleHashTable::new(bucket_size),
                replacer: LruKReplacer::new(pool_size, replacer_k),
                free_list: (0..pool_size).collect(),
                next_page_id: 0,
                #[cfg(feature = "stat")]
                stats: PoolStats::default(),
            }),
            disk,
            log_manager,
        }
    }

    pub fn pool_size(&self) -> usize {
        self.pool_size
    }

    pub fn free_frame_count(&self) -> usize {
        self.state.lock().unwrap().free_list.len()
    }

    pub fn disk_manager(&self) -> &D {
        &self.disk
    }

    pub fn log_manager(&self) -> Option<&Arc<dyn LogManager>> {
        self.log_manager.as_ref()
    }

    pub fn eviction_stats(&self) -> String {
        #[cfg(feature = "stat")]
        {
            self.state.lock().unwrap().stats.to_report()
        }
        #[cfg(not(feature = "stat"))]
        {
            "Stat is disabled".to_string()
        }
    }

    fn allocate_page(state: &mut PoolState) -> PageId {
        let page_id = state.next_page_id;
        state.next_page_id += 1;
        page_id
    }

    /// Take a frame from the free list, or evict a victim. A dirty victim is
    /// written back before its page table entry is removed; a write-back
    /// failure leaves the entry in place so the page stays reachable.
    fn acquire_frame(&self, state: &mut PoolState) -> Result<FrameId, PoolStatus> {
        if let Some(frame_id) = state.free_list.pop_front() {
            #[cfg(feature = "stat")]
            {
                state.stats.victim_free += 1;
            }
            return Ok(frame_id);
        }

        let frame_id = state.replacer.evict().ok_or(PoolStatus::CannotEvictPage)?;
        let frame = &self.frames[frame_id];
        let old_page_id = frame.page_id();
        if frame.is_dirty() {
            let page = frame.read();
            self.disk.write_page(old_page_id, &page)?;
            #[cfg(feature = "stat")]
            {
                state.stats.victim_dirty += 1;
            }
        } else {
            #[cfg(feature = "stat")]
            {
                state.stats.victim_clean += 1;
            }
        }
        state.page_table.remove(&old_page_id);
        log_debug!("page {} evicted from frame {}", old_page_id, frame_id);
        Ok(frame_id)
    }

    /// Install a freshly allocated, zeroed page into a frame and return it
    /// pinned once.
    pub fn new_page(&self) -> Result<&BufferFrame, PoolStatus> {
        let mut state = self.state.lock().unwrap();
        let frame_id = self.acquire_frame(&mut state)?;
        let page_id = Self::allocate_page(&mut state);
        let frame = &self.frames[frame_id];

        frame.write().reset();
        frame.set_page_id(page_id);
        frame.set_dirty(false);
        frame.set_pin_count(1);
        state.page_table.insert(page_id, frame_id);
        state.replacer.set_evictable(frame_id, false);
        state.replacer.record_access(frame_id);
        #[cfg(feature = "stat")]
        {
            state.stats.new_page += 1;
        }
        log_debug!("page {} created in frame {}", page_id, frame_id);
        Ok(frame)
    }

    /// Return the frame holding `page_id`, pinned once more, reading the
    /// page from disk on a miss.
    pub fn fetch_page(&self, page_id: PageId) -> Result<&BufferFrame, PoolStatus> {
        if page_id == INVALID_PAGE_ID {
            return Err(PoolStatus::PageNotFound);
        }
        let mut state = self.state.lock().unwrap();

        if let Some(frame_id) = state.page_table.get(&page_id) {
            let frame = &self.frames[frame_id];
            frame.pin();
            state.replacer.set_evictable(frame_id, false);
            state.replacer.record_access(frame_id);
            #[cfg(feature = "stat")]
            {
                state.stats.fetch_hit += 1;
            }
            log_debug!("page {} hit in frame {}", page_id, frame_id);
            return Ok(frame);
        }

        #[cfg(feature = "stat")]
        {
            state.stats.fetch_miss += 1;
        }
        let frame_id = self.acquire_frame(&mut state)?;
        let frame = &self.frames[frame_id];

        {
            let mut page = frame.write();
            if let Err(e) = self.disk.read_page(page_id, &mut page) {
                // The old resident is already gone; free the frame rather
                // than strand it outside both the free list and the table.
                drop(page);
                frame.reset();
                state.free_list.push_back(frame_id);
                return Err(e.into());
            }
        }
        frame.set_page_id(page_id);
        frame.set_dirty(false);
        frame.set_pin_count(1);
        state.page_table.insert(page_id, frame_id);
        state.replacer.set_evictable(frame_id, false);
        state.replacer.record_access(frame_id);
        log_debug!("page {} loaded into frame {}", page_id, frame_id);
        Ok(frame)
    }

    /// Drop one pin. The dirty flag is OR-ed in, never cleared here; the
    /// frame becomes evictable when the last pin goes away.
    pub fn unpin_page(&self, page_id: PageId, is_dirty: bool) -> Result<(), PoolStatus> {
        let state = self.state.lock().unwrap();
        let frame_id = state
            .page_table
            .get(&page_id)
            .ok_or(PoolStatus::PageNotFound)?;
        let frame = &self.frames[frame_id];
        if frame.pin_count() == 0 {
            return Err(PoolStatus::PageNotPinned);
        }
        if frame.unpin() == 0 {
            state.replacer.set_evictable(frame_id, true);
        }
        if is_dirty {
            frame.set_dirty(true);
        }
        Ok(())
    }

    /// Write the page to disk unconditionally and clear its dirty flag.
    /// Pin count is not consulted; flushing a pinned page is legal.
    pub fn flush_page(&self, page_id: PageId) -> Result<(), PoolStatus> {
        if page_id == INVALID_PAGE_ID {
            return Err(PoolStatus::PageNotFound);
        }
        let state = self.state.lock().unwrap();
        let frame_id = state
            .page_table
            .get(&page_id)
            .ok_or(PoolStatus::PageNotFound)?;
        let frame = &self.frames[frame_id];
        {
            let page = frame.read();
            self.disk.write_page(page_id, &page)?;
        }
        frame.set_dirty(false);
        Ok(())
    }

    /// Flush every non-free frame.
    pub fn flush_all_pages(&self) -> Result<(), PoolStatus> {
        let _state = self.state.lock().unwrap();
        for frame in &self.frames {
            let page_id = frame.page_id();
            if page_id == INVALID_PAGE_ID {
                continue;
            }
            {
                let page = frame.read();
                self.disk.write_page(page_id, &page)?;
            }
            frame.set_dirty(false);
        }
        Ok(())
    }

    /// Evict `page_id` from the pool without writing it back, free its
    /// frame, and advise the disk layer. Deleting a non-resident page
    /// succeeds; deleting a pinned page fails.
    pub fn delete_page(&self, page_id: PageId) -> Result<(), PoolStatus> {
        let mut state = self.state.lock().unwrap();
        let Some(frame_id) = state.page_table.get(&page_id) else {
            return Ok(());
        };
        let frame = &self.frames[frame_id];
        if frame.pin_count() > 0 {
            return Err(PoolStatus::PagePinned);
        }
        state.page_table.remove(&page_id);
        state.replacer.remove(frame_id);
        state.free_list.push_back(frame_id);
        frame.reset();
        self.disk.deallocate_page(page_id);
        log_debug!("page {} deleted from frame {}", page_id, frame_id);
        Ok(())
    }
}

#[cfg(test)]
impl<D: DiskManager> BufferPoolManager<D> {
    pub fn run_checks(&self) {
        let state = self.state.lock().unwrap();
        let mut resident = 0;
        for frame in &self.frames {
            let page_id = frame.page_id();
            if page_id == INVALID_PAGE_ID {
                assert_eq!(frame.pin_count(), 0);
                assert!(!frame.is_dirty());
                assert!(state.free_list.contains(&frame.frame_id()));
            } else {
                resident += 1;
                assert_eq!(state.page_table.get(&page_id), Some(frame.frame_id()));
            }
            if state.replacer.is_evictable(frame.frame_id()) {
                assert_eq!(frame.pin_count(), 0);
            }
        }
        assert_eq!(state.page_table.len(), resident);
        assert_eq!(state.free_list.len() + resident, self.pool_size);
    }
}
