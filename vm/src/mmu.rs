use std::{io, ops::Range};

use log::{debug, trace, warn};

use crate::{
    config::VmConfig,
    error::{AccessError, CreateError},
    page_loader::{BackingStore, PageLoader},
    page_table::{Frame, PageTable},
    stats::Statistics,
    tlb::{Tlb, TlbEntry},
    try_filled_vec, Policy,
};

/// The address translation engine. Owns physical memory, the page table, the
/// TLB, the backing store and the counters of one simulation.
///
/// Every access goes TLB first, then page table, then page fault handling.
/// Errors are returned, never acted upon: deciding that a bad address ends
/// the program is up to the caller.
pub struct Mmu<L: PageLoader = BackingStore> {
    config: VmConfig,
    memory: Vec<u32>,
    page_table: PageTable,
    tlb: Tlb,
    loader: L,
    timestamp: u64,
    stats: Statistics,
}

impl Mmu<BackingStore> {
    /// Builds a simulation backed by a zero-filled in-memory disk.
    pub fn new(config: VmConfig) -> Result<Self, CreateError> {
        config.validate()?;

        let disk = BackingStore::new(config.virtual_pages, config.page_size)?;

        Self::with_loader(config, disk)
    }

    pub fn create(
        virtual_pages: u32,
        physical_pages: u32,
        page_size: u32,
        tlb_entries: u32,
        page_policy: Policy,
        tlb_policy: Policy,
    ) -> Result<Self, CreateError> {
        Self::new(VmConfig {
            virtual_pages,
            physical_pages,
            page_size,
            tlb_entries,
            page_policy,
            tlb_policy,
        })
    }
}

impl<L: PageLoader> Mmu<L> {
    /// Builds a simulation on top of a caller-provided backing store, which
    /// must have a slot for every virtual page. Frame `i` starts out with the
    /// store's copy of page `i`.
    pub fn with_loader(config: VmConfig, mut loader: L) -> Result<Self, CreateError> {
        config.validate()?;

        if loader.page_count() < config.virtual_pages || loader.page_size() != config.page_size {
            return Err(CreateError::LoaderMismatch {
                loader_pages: loader.page_count(),
                loader_page_size: loader.page_size(),
                virtual_pages: config.virtual_pages,
                page_size: config.page_size,
            });
        }

        if config.tlb_oversized() {
            warn!(
                "mmu: {} TLB entries for {} frames, the TLB should not be larger than physical memory",
                config.tlb_entries, config.physical_pages
            );
        }

        let mut memory = try_filled_vec(config.frame_words(), 0)?;

        for (page, frame) in (0..config.physical_pages).zip(memory.chunks_exact_mut(config.page_size as usize)) {
            loader.load_page_into(page, frame);
        }

        let mmu = Mmu {
            memory,
            page_table: PageTable::new(config.physical_pages, config.page_policy)?,
            tlb: Tlb::new(config.tlb_entries, config.physical_pages, config.tlb_policy)?,
            config,
            loader,
            timestamp: 0,
            stats: Statistics::default(),
        };

        debug!(
            "mmu: {} virtual pages, {} frames of {} words, {} TLB entries (page policy {}, TLB policy {})",
            config.virtual_pages,
            config.physical_pages,
            config.page_size,
            config.tlb_entries,
            config.page_policy,
            config.tlb_policy
        );

        Ok(mmu)
    }

    fn frame_range(&self, frame_idx: usize) -> Range<usize> {
        let frame_size = self.config.page_size as usize;

        Range {
            start: frame_idx * frame_size,
            end: (frame_idx + 1) * frame_size,
        }
    }

    fn handle_page_fault(&mut self, page_number: u32) -> usize {
        self.stats.page_faults += 1;

        let frame_idx = self.page_table.pick_victim();
        let evicted = self.page_table.get(frame_idx).unwrap_or_default();
        let frame_range = self.frame_range(frame_idx);

        if evicted.dirty {
            debug!(
                "mmu: page {:#X} in frame {} is dirty, writing back before eviction",
                evicted.resident_page, frame_idx
            );

            self.stats.disk_writes += 1;
            self.loader
                .flush_page(evicted.resident_page, &self.memory[frame_range.clone()]);
        }

        debug!(
            "mmu: evicting page {:#X} from frame {} for page {:#X}",
            evicted.resident_page, frame_idx, page_number
        );

        self.loader.load_page_into(page_number, &mut self.memory[frame_range]);
        self.page_table.remap(frame_idx, page_number, self.timestamp);
        self.tlb.retarget(frame_idx, page_number, self.timestamp);

        frame_idx
    }

    /// Resolves a virtual word address to an index into physical memory,
    /// updating the TLB, the page table and the counters on the way.
    pub fn translate(&mut self, address: u32, is_write: bool) -> Result<usize, AccessError> {
        let page_size = self.config.page_size;
        let page_number = address / page_size;
        let page_offset = address % page_size;

        if page_number >= self.config.virtual_pages {
            return Err(AccessError::AddressOutOfRange {
                address,
                page: page_number,
                virtual_pages: self.config.virtual_pages,
            });
        }

        self.timestamp += 1;

        trace!(
            "mmu: access addr {:#010X} page_num={:#X} page_offset={:#X} write={}",
            address,
            page_number,
            page_offset,
            is_write
        );

        let frame_idx = match self.tlb.lookup(page_number, self.timestamp) {
            Some(frame_idx) => {
                trace!("mmu: tlb hit");
                frame_idx
            }
            None => {
                self.stats.tlb_misses += 1;

                match self.page_table.find(page_number) {
                    Some(frame_idx) => {
                        trace!("mmu: tlb miss, page hit");
                        self.tlb.insert(frame_idx, page_number, self.timestamp);
                        frame_idx
                    }
                    None => {
                        trace!("mmu: page fault! handling...");
                        self.handle_page_fault(page_number)
                    }
                }
            }
        };

        self.page_table.mark(frame_idx, self.timestamp, is_write);

        Ok(self.frame_range(frame_idx).start + page_offset as usize)
    }

    fn read_word(&mut self, address: u32) -> Result<u32, AccessError> {
        let location = self.translate(address, false)?;

        Ok(self.memory[location])
    }

    fn write_word(&mut self, address: u32, value: u32) -> Result<(), AccessError> {
        let location = self.translate(address, true)?;

        self.memory[location] = value;

        Ok(())
    }

    pub fn read_int(&mut self, address: u32) -> Result<i32, AccessError> {
        self.read_word(address).map(|word| word as i32)
    }

    pub fn read_float(&mut self, address: u32) -> Result<f32, AccessError> {
        self.read_word(address).map(f32::from_bits)
    }

    pub fn write_int(&mut self, address: u32, value: i32) -> Result<(), AccessError> {
        self.write_word(address, value as u32)
    }

    pub fn write_float(&mut self, address: u32, value: f32) -> Result<(), AccessError> {
        self.write_word(address, value.to_bits())
    }

    pub fn config(&self) -> &VmConfig {
        &self.config
    }

    pub fn statistics(&self) -> Statistics {
        self.stats
    }

    /// Number of translation requests served so far.
    pub fn timestamp(&self) -> u64 {
        self.timestamp
    }

    pub fn frame(&self, frame_idx: usize) -> Option<Frame> {
        self.page_table.get(frame_idx)
    }

    /// Raw contents of a frame in physical memory.
    pub fn frame_words(&self, frame_idx: usize) -> Option<&[u32]> {
        if frame_idx >= self.page_table.len() {
            return None;
        }

        Some(&self.memory[self.frame_range(frame_idx)])
    }

    /// The translation cached in a TLB slot, `None` for empty or missing slots.
    pub fn tlb_entry(&self, slot: usize) -> Option<TlbEntry> {
        self.tlb.get(slot)
    }

    pub fn loader(&self) -> &L {
        &self.loader
    }

    pub fn write_statistics<W: io::Write>(&self, out: &mut W) -> io::Result<()> {
        writeln!(out, "{}", self.stats)
    }

    pub fn print_statistics(&self) {
        println!("{}", self.stats);
    }
}
