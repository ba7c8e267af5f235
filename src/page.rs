use std::ops::{Deref, DerefMut};

pub const PAGE_SIZE: usize = 4096;

pub type PageId = u32;

/// Sentinel for "no page". The allocator issues identifiers monotonically
/// from 0, so this bit pattern is never handed out.
pub const INVALID_PAGE_ID: PageId = PageId::MAX;

/// A fixed-size page payload. The pool tracks the resident page's identity
/// in the frame metadata; the payload itself is opaque bytes.
pub struct Page([u8; PAGE_SIZE]);

impl Page {
    pub fn new() -> Self {
        Page([0; PAGE_SIZE])
    }

    /// Zero the payload.
    pub fn reset(&mut self) {
        self.0.fill(0);
    }

    pub fn copy_from(&mut self, other: &Page) {
        self.0.copy_from_slice(&other.0);
    }
}

impl Default for Page {
    fn default() -> Self {
        Page::new()
    }
}

impl Deref for Page {
    type Target = [u8];

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl DerefMut for Page {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.0
    }
}
