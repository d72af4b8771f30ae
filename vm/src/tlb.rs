use std::collections::TryReserveError;

use log::trace;

use crate::{
    config::Policy,
    page_replacer::{replacer_for, PageReplacer},
    try_filled_vec,
};

/// A cached translation. Dirtiness lives on the frame, not here.
#[derive(Copy, Clone, Default, Debug, PartialEq, Eq)]
pub struct TlbEntry {
    pub frame: usize,
    pub page: u32,
    pub last_access: u64,
}

/// Fully associative translation cache. Empty slots (`None`) only exist when
/// the TLB has more slots than there are frames.
pub struct Tlb {
    entries: Vec<Option<TlbEntry>>,
    replacer: Box<dyn PageReplacer>,
}

impl Tlb {
    /// Slot `i` starts out mapping page `i` to frame `i`, for every slot that
    /// has a matching frame.
    pub fn new(size: u32, frame_count: u32, policy: Policy) -> Result<Self, TryReserveError> {
        let mut entries = try_filled_vec(size as usize, None)?;

        for (idx, slot) in entries.iter_mut().enumerate().take(frame_count as usize) {
            *slot = Some(TlbEntry {
                frame: idx,
                page: idx as u32,
                last_access: 0,
            });
        }

        Ok(Tlb {
            entries,
            replacer: replacer_for(policy, size as usize),
        })
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, slot: usize) -> Option<TlbEntry> {
        self.entries.get(slot).copied().flatten()
    }

    /// Returns the frame caching `page` and refreshes the slot's timestamp.
    pub fn lookup(&mut self, page: u32, timestamp: u64) -> Option<usize> {
        let entry = self.entries.iter_mut().flatten().find(|entry| entry.page == page)?;

        entry.last_access = timestamp;

        Some(entry.frame)
    }

    /// Overwrites the slot chosen by the replacement policy.
    pub fn insert(&mut self, frame: usize, page: u32, timestamp: u64) {
        if self.entries.is_empty() {
            return;
        }

        let mut stamps = self
            .entries
            .iter()
            .map(|slot| slot.map_or(0, |entry| entry.last_access));
        let slot = self.replacer.pick_replacement(&mut stamps);

        trace!("tlb: slot {} <- page {:#X} frame {}", slot, page, frame);

        self.entries[slot] = Some(TlbEntry {
            frame,
            page,
            last_access: timestamp,
        });
    }

    /// After `frame` got a new page: points the slot already caching `frame`
    /// at the new page, keeping its position and timestamp. Inserts a fresh
    /// entry if no slot caches `frame`.
    pub fn retarget(&mut self, frame: usize, page: u32, timestamp: u64) {
        match self.entries.iter_mut().flatten().find(|entry| entry.frame == frame) {
            Some(entry) => entry.page = page,
            None => self.insert(frame, page, timestamp),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_identity_mapped() {
        let mut tlb = Tlb::new(2, 4, Policy::RoundRobin).unwrap();

        assert_eq!(tlb.lookup(0, 1), Some(0));
        assert_eq!(tlb.lookup(1, 1), Some(1));
        assert_eq!(tlb.lookup(2, 1), None);
    }

    #[test]
    fn slots_past_frame_count_start_empty() {
        let tlb = Tlb::new(4, 2, Policy::RoundRobin).unwrap();

        assert_eq!(tlb.len(), 4);
        assert!(tlb.get(1).is_some());
        assert_eq!(tlb.get(2), None);
        assert_eq!(tlb.get(3), None);
    }

    #[test]
    fn lookup_refreshes_timestamp() {
        let mut tlb = Tlb::new(2, 2, Policy::LeastRecentlyUsed).unwrap();

        tlb.lookup(0, 5);
        tlb.insert(3, 9, 6);

        assert_eq!(
            tlb.get(1),
            Some(TlbEntry {
                frame: 3,
                page: 9,
                last_access: 6
            })
        );
        assert_eq!(tlb.get(0).unwrap().last_access, 5);
    }

    #[test]
    fn retarget_keeps_slot_and_timestamp() {
        let mut tlb = Tlb::new(2, 2, Policy::RoundRobin).unwrap();

        tlb.retarget(1, 7, 3);

        assert_eq!(
            tlb.get(1),
            Some(TlbEntry {
                frame: 1,
                page: 7,
                last_access: 0
            })
        );
        assert_eq!(tlb.get(0).unwrap().page, 0);
    }

    #[test]
    fn retarget_inserts_when_frame_not_cached() {
        let mut tlb = Tlb::new(2, 4, Policy::RoundRobin).unwrap();

        tlb.retarget(3, 6, 2);

        assert_eq!(
            tlb.get(0),
            Some(TlbEntry {
                frame: 3,
                page: 6,
                last_access: 2
            })
        );
    }

    #[test]
    fn empty_tlb_never_caches() {
        let mut tlb = Tlb::new(0, 2, Policy::LeastRecentlyUsed).unwrap();

        tlb.insert(0, 0, 1);

        assert!(tlb.is_empty());
        assert_eq!(tlb.lookup(0, 2), None);
    }
}
