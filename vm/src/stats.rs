use std::fmt;

/// Counters accumulated over an instance's lifetime. They only grow.
#[derive(Copy, Clone, Default, Debug, PartialEq, Eq)]
pub struct Statistics {
    pub page_faults: u64,
    pub tlb_misses: u64,
    pub disk_writes: u64,
}

impl fmt::Display for Statistics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Number of page faults: {}", self.page_faults)?;
        writeln!(f, "Number of TLB misses: {}", self.tlb_misses)?;
        write!(f, "Number of disk writes: {}", self.disk_writes)
    }
}
