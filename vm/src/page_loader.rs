use std::{collections::TryReserveError, ops::Range};

use crate::try_filled_vec;

/// Home location of pages that are not resident. Pages move between it and
/// physical memory one page-sized word block at a time.
pub trait PageLoader {
    /// Number of virtual pages this store has a slot for.
    fn page_count(&self) -> u32;

    /// Size of a slot in words.
    fn page_size(&self) -> u32;

    fn load_page_into(&mut self, page_number: u32, target: &mut [u32]);

    fn flush_page(&mut self, page_number: u32, buffer: &[u32]);
}

/// The simulated disk: every virtual page has a slot, zero-filled at start.
#[derive(Debug, Clone)]
pub struct BackingStore {
    words: Vec<u32>,
    pages: u32,
    page_size: usize,
}

impl BackingStore {
    pub fn new(pages: u32, page_size: u32) -> Result<Self, TryReserveError> {
        let page_size = page_size as usize;
        let words = try_filled_vec(pages as usize * page_size, 0)?;

        Ok(BackingStore {
            words,
            pages,
            page_size,
        })
    }

    fn page_range(&self, page_number: u32) -> Range<usize> {
        let start = page_number as usize * self.page_size;

        start..start + self.page_size
    }

    /// Contents of a page's slot on disk, if the page exists.
    pub fn page(&self, page_number: u32) -> Option<&[u32]> {
        self.words.get(self.page_range(page_number))
    }
}

impl PageLoader for BackingStore {
    fn page_count(&self) -> u32 {
        self.pages
    }

    fn page_size(&self) -> u32 {
        self.page_size as u32
    }

    fn load_page_into(&mut self, page_number: u32, target: &mut [u32]) {
        let range = self.page_range(page_number);

        target.copy_from_slice(&self.words[range]);
    }

    fn flush_page(&mut self, page_number: u32, buffer: &[u32]) {
        let range = self.page_range(page_number);

        self.words[range].copy_from_slice(buffer);
    }
}
