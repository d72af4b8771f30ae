use std::collections::TryReserveError;

use crate::{
    config::Policy,
    page_replacer::{replacer_for, PageReplacer},
    try_filled_vec,
};

/// One physical frame and the virtual page currently living in it.
#[derive(Copy, Clone, Default, Debug, PartialEq, Eq)]
pub struct Frame {
    pub resident_page: u32,
    pub last_access: u64,
    pub dirty: bool,
}

/// Inverted page table: one entry per frame, searched linearly.
pub struct PageTable {
    frames: Vec<Frame>,
    replacer: Box<dyn PageReplacer>,
}

impl PageTable {
    /// Frame `i` starts out holding virtual page `i`.
    pub fn new(frame_count: u32, policy: Policy) -> Result<Self, TryReserveError> {
        let mut frames = try_filled_vec(frame_count as usize, Frame::default())?;

        for (page, frame) in (0..frame_count).zip(frames.iter_mut()) {
            frame.resident_page = page;
        }

        Ok(PageTable {
            frames,
            replacer: replacer_for(policy, frame_count as usize),
        })
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    pub fn get(&self, frame_idx: usize) -> Option<Frame> {
        self.frames.get(frame_idx).copied()
    }

    /// Frame index holding `page`, if it is resident.
    pub fn find(&self, page: u32) -> Option<usize> {
        self.frames.iter().position(|frame| frame.resident_page == page)
    }

    /// Records an access to a resident frame.
    pub fn mark(&mut self, frame_idx: usize, timestamp: u64, dirty: bool) {
        let frame = &mut self.frames[frame_idx];

        if dirty {
            frame.dirty = true;
        }
        frame.last_access = timestamp;
    }

    pub fn pick_victim(&mut self) -> usize {
        let mut stamps = self.frames.iter().map(|frame| frame.last_access);

        self.replacer.pick_replacement(&mut stamps)
    }

    /// Hands the frame over to `page`, freshly loaded and clean.
    pub fn remap(&mut self, frame_idx: usize, page: u32, timestamp: u64) {
        self.frames[frame_idx] = Frame {
            resident_page: page,
            last_access: timestamp,
            dirty: false,
        };
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_identity_mapped() {
        let table = PageTable::new(4, Policy::RoundRobin).unwrap();

        assert_eq!(table.len(), 4);
        for idx in 0..4 {
            assert_eq!(table.find(idx as u32), Some(idx));
            assert!(!table.get(idx).unwrap().dirty);
        }
        assert_eq!(table.find(4), None);
    }

    #[test]
    fn mark_only_sets_dirty() {
        let mut table = PageTable::new(2, Policy::RoundRobin).unwrap();

        table.mark(1, 3, true);
        table.mark(1, 4, false);

        assert_eq!(
            table.get(1),
            Some(Frame {
                resident_page: 1,
                last_access: 4,
                dirty: true
            })
        );
    }

    #[test]
    fn lru_victim_follows_frame_timestamps() {
        let mut table = PageTable::new(3, Policy::LeastRecentlyUsed).unwrap();

        table.mark(0, 1, false);
        table.mark(2, 2, false);

        assert_eq!(table.pick_victim(), 1);
        table.mark(1, 3, false);
        assert_eq!(table.pick_victim(), 0);
    }

    #[test]
    fn remap_clears_dirty() {
        let mut table = PageTable::new(2, Policy::RoundRobin).unwrap();

        table.mark(0, 1, true);
        table.remap(0, 7, 2);

        assert_eq!(table.find(7), Some(0));
        assert_eq!(table.find(0), None);
        assert!(!table.get(0).unwrap().dirty);
    }
}
