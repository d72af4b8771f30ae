//! Simulated paged virtual memory: a TLB in front of a page table, page
//! replacement against an in-memory backing store, and fault/miss/write-back
//! accounting.

use std::collections::TryReserveError;

pub mod config;
pub mod error;
pub mod mmu;
pub mod page_loader;
pub mod page_replacer;
pub mod page_table;
pub mod stats;
pub mod tlb;

pub use config::{Policy, VmConfig};
pub use error::{AccessError, ConfigError, CreateError};
pub use mmu::Mmu;
pub use stats::Statistics;

/// Allocates a vector of `len` copies of `value`, reporting allocation
/// failure instead of aborting.
pub(crate) fn try_filled_vec<T: Clone>(len: usize, value: T) -> Result<Vec<T>, TryReserveError> {
    let mut vec = Vec::new();
    vec.try_reserve_exact(len)?;
    vec.resize(len, value);

    Ok(vec)
}
