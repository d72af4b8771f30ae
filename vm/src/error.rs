use std::collections::TryReserveError;

use thiserror::Error;

/// The configuration was refused. No instance is created.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("virtual memory ({virtual_pages} pages) must be larger than physical memory ({physical_pages} pages)")]
    VirtualNotLargerThanPhysical { virtual_pages: u32, physical_pages: u32 },

    #[error("physical memory must hold at least one page")]
    NoFrames,

    #[error("page size {0} is not a power of two")]
    PageSizeNotPowerOfTwo(u32),

    #[error("virtual address space of {words} words exceeds 2^32")]
    AddressSpaceTooLarge { words: u64 },

    #[error("unknown replacement policy {0:?} (expected round-robin, lru, 0 or 1)")]
    UnknownPolicy(String),
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CreateError {
    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("backing store holds {loader_pages} pages of {loader_page_size} words, need {virtual_pages} pages of {page_size} words")]
    LoaderMismatch {
        loader_pages: u32,
        loader_page_size: u32,
        virtual_pages: u32,
        page_size: u32,
    },

    /// Not recoverable: the host is expected to terminate.
    #[error("cannot allocate simulated memory: {0}")]
    OutOfMemory(#[from] TryReserveError),
}

/// A translation request the simulated hardware cannot serve. Hosts treat
/// this as fatal.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum AccessError {
    #[error("address {address:#010X} is out of range: page {page} >= {virtual_pages} virtual pages")]
    AddressOutOfRange {
        address: u32,
        page: u32,
        virtual_pages: u32,
    },
}
