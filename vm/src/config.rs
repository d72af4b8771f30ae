use std::{fmt, str::FromStr};

use crate::error::ConfigError;

/// Replacement strategy, used both for frames and for TLB slots.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Policy {
    /// Unconditional rotation over the slots, regardless of access history.
    RoundRobin,
    LeastRecentlyUsed,
}

impl FromStr for Policy {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "0" | "rr" | "round-robin" | "roundrobin" => Ok(Policy::RoundRobin),
            "1" | "lru" | "least-recently-used" => Ok(Policy::LeastRecentlyUsed),
            _ => Err(ConfigError::UnknownPolicy(s.to_owned())),
        }
    }
}

impl fmt::Display for Policy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Policy::RoundRobin => f.write_str("round-robin"),
            Policy::LeastRecentlyUsed => f.write_str("lru"),
        }
    }
}

/// Shape of a simulated memory. Fixed once an [`Mmu`](crate::Mmu) is built.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct VmConfig {
    /// Size of the virtual memory in pages.
    pub virtual_pages: u32,
    /// Size of the physical memory in pages (frames).
    pub physical_pages: u32,
    /// Size of a page in 32-bit words.
    pub page_size: u32,
    pub tlb_entries: u32,
    pub page_policy: Policy,
    pub tlb_policy: Policy,
}

impl VmConfig {
    /// Checks the hard constraints. A TLB larger than physical memory is
    /// allowed; see [`VmConfig::tlb_oversized`].
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.virtual_pages <= self.physical_pages {
            return Err(ConfigError::VirtualNotLargerThanPhysical {
                virtual_pages: self.virtual_pages,
                physical_pages: self.physical_pages,
            });
        }

        if self.physical_pages == 0 {
            return Err(ConfigError::NoFrames);
        }

        if !self.page_size.is_power_of_two() {
            return Err(ConfigError::PageSizeNotPowerOfTwo(self.page_size));
        }

        let words = self.virtual_words();
        if words > 1 << 32 {
            return Err(ConfigError::AddressSpaceTooLarge { words });
        }

        Ok(())
    }

    pub fn tlb_oversized(&self) -> bool {
        self.tlb_entries > self.physical_pages
    }

    pub fn virtual_words(&self) -> u64 {
        u64::from(self.virtual_pages) * u64::from(self.page_size)
    }

    pub(crate) fn frame_words(&self) -> usize {
        self.physical_pages as usize * self.page_size as usize
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(virtual_pages: u32, physical_pages: u32, page_size: u32) -> VmConfig {
        VmConfig {
            virtual_pages,
            physical_pages,
            page_size,
            tlb_entries: 2,
            page_policy: Policy::RoundRobin,
            tlb_policy: Policy::RoundRobin,
        }
    }

    #[test]
    fn accepts_valid_shapes() {
        assert_eq!(config(8, 2, 4).validate(), Ok(()));
        assert_eq!(config(1 << 22, 16, 1024).validate(), Ok(()));
    }

    #[test]
    fn rejects_virtual_not_larger_than_physical() {
        assert_eq!(
            config(4, 4, 4).validate(),
            Err(ConfigError::VirtualNotLargerThanPhysical {
                virtual_pages: 4,
                physical_pages: 4
            })
        );
    }

    #[test]
    fn rejects_empty_physical_memory() {
        assert_eq!(config(4, 0, 4).validate(), Err(ConfigError::NoFrames));
    }

    #[test]
    fn rejects_page_size_not_power_of_two() {
        assert_eq!(config(8, 2, 12).validate(), Err(ConfigError::PageSizeNotPowerOfTwo(12)));
        assert_eq!(config(8, 2, 0).validate(), Err(ConfigError::PageSizeNotPowerOfTwo(0)));
    }

    #[test]
    fn rejects_address_space_over_four_gigawords() {
        assert_eq!(config(1 << 22, 2, 1024).validate(), Ok(()));
        assert_eq!(
            config((1 << 22) + 1, 2, 1024).validate(),
            Err(ConfigError::AddressSpaceTooLarge {
                words: ((1 << 22) + 1) * 1024
            })
        );
    }

    #[test]
    fn oversized_tlb_is_only_a_recommendation() {
        let mut config = config(8, 2, 4);
        config.tlb_entries = 6;

        assert!(config.tlb_oversized());
        assert_eq!(config.validate(), Ok(()));
    }

    #[test]
    fn parses_policy_names_and_codes() {
        assert_eq!("0".parse::<Policy>(), Ok(Policy::RoundRobin));
        assert_eq!("round-robin".parse::<Policy>(), Ok(Policy::RoundRobin));
        assert_eq!("1".parse::<Policy>(), Ok(Policy::LeastRecentlyUsed));
        assert_eq!("LRU".parse::<Policy>(), Ok(Policy::LeastRecentlyUsed));
        assert_eq!(
            "fifo".parse::<Policy>(),
            Err(ConfigError::UnknownPolicy("fifo".to_owned()))
        );
    }
}
