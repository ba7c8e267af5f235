use super::FrameId;
use crate::page::{Page, PageId, INVALID_PAGE_ID};
use std::fmt::Debug;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

/// One slot of the pool: a page payload behind its latch, plus metadata.
///
/// Metadata is only mutated while the pool's mutex is held; the atomics make
/// the accessors safe to call from a frame reference handed out by the pool.
/// The payload latch belongs to the caller: acquire it only while the page
/// is pinned, and release it before calling back into the pool.
pub struct BufferFrame {
    frame_id: FrameId,
    page_id: AtomicU32, // INVALID_PAGE_ID when the slot is free
    pin_count: AtomicU32,
    is_dirty: AtomicBool,
    page: RwLock<Page>,
}

impl BufferFrame {
    pub(crate) fn new(frame_id: FrameId) -> Self {
        BufferFrame {
            frame_id,
            page_id: AtomicU32::new(INVALID_PAGE_ID),
            pin_count: AtomicU32::new(0),
            is_dirty: AtomicBool::new(false),
            page: RwLock::new(Page::new()),
        }
    }

    pub fn frame_id(&self) -> FrameId {
        self.frame_id
    }

    /// Identifier of the resident page, or [`INVALID_PAGE_ID`] for a free
    /// slot.
    pub fn page_id(&self) -> PageId {
        self.page_id.load(Ordering::Acquire)
    }

    pub fn pin_count(&self) -> u32 {
        self.pin_count.load(Ordering::Acquire)
    }

    pub fn is_dirty(&self) -> bool {
        self.is_dirty.load(Ordering::Acquire)
    }

    /// Latch the payload for reading.
    pub fn read(&self) -> RwLockReadGuard<'_, Page> {
        self.page.read().unwrap()
    }

    /// Latch the payload for writing. The caller is responsible for marking
    /// the page dirty through `unpin_page`.
    pub fn write(&self) -> RwLockWriteGuard<'_, Page> {
        self.page.write().unwrap()
    }

    pub(crate) fn set_page_id(&self, page_id: PageId) {
        self.page_id.store(page_id, Ordering::Release);
    }

    pub(crate) fn set_dirty(&self, dirty: bool) {
        self.is_dirty.store(dirty, Ordering::Release);
    }

    pub(crate) fn set_pin_count(&self, pins: u32) {
        self.pin_count.store(pins, Ordering::Release);
    }

    pub(crate) fn pin(&self) -> u32 {
        self.pin_count.fetch_add(1, Ordering::AcqRel) + 1
    }

    /// Decrement the pin count and return the remaining pins. Must not be
    /// called on an unpinned frame.
    pub(crate) fn unpin(&self) -> u32 {
        self.pin_count.fetch_sub(1, Ordering::AcqRel) - 1
    }

    /// Return the slot to its free state: no resident page, no pins, clean,
    /// zeroed payload.
    pub(crate) fn reset(&self) {
        self.set_page_id(INVALID_PAGE_ID);
        self.set_pin_count(0);
        self.set_dirty(false);
        self.page.write().unwrap().reset();
    }
}

impl Debug for BufferFrame {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BufferFrame")
            .field("frame_id", &self.frame_id)
            .field("page_id", &self.page_id())
            .field("pin_count", &self.pin_count())
            .field("dirty", &self.is_dirty())
            .finish()
    }
}
