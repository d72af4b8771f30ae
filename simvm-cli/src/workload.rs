//! Access patterns the demo can drive through a simulated memory.

use std::str::FromStr;

use log::info;
use thiserror::Error;
use vm::{AccessError, Mmu, Policy, Statistics, VmConfig};

#[derive(Debug, Error)]
pub enum WorkloadError {
    #[error(transparent)]
    Access(#[from] AccessError),

    #[error("verification failed at {address:#X}: expected {expected}, got {actual}")]
    Mismatch {
        address: u32,
        expected: String,
        actual: String,
    },

    #[error("{step}: expected {expected:?}, got {actual:?}")]
    UnexpectedStatistics {
        step: &'static str,
        expected: Statistics,
        actual: Statistics,
    },

    #[error("matrix of {n}x{n} floats needs {needed} words, virtual memory holds {available}")]
    MatrixTooLarge { n: u32, needed: u64, available: u64 },
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ParseAccessError {
    #[error("expected r:ADDR, rf:ADDR, w:ADDR=INT or wf:ADDR=FLOAT, got {0:?}")]
    Syntax(String),

    #[error("bad address {0:?}")]
    Address(String),

    #[error("bad value {0:?}")]
    Value(String),
}

/// One explicit access given on the command line.
#[derive(Copy, Clone, Debug, PartialEq)]
pub enum Access {
    ReadInt(u32),
    ReadFloat(u32),
    WriteInt(u32, i32),
    WriteFloat(u32, f32),
}

fn parse_address(s: &str) -> Result<u32, ParseAccessError> {
    let parsed = match s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        Some(hex) => u32::from_str_radix(hex, 16),
        None => s.parse(),
    };

    parsed.map_err(|_| ParseAccessError::Address(s.to_owned()))
}

impl FromStr for Access {
    type Err = ParseAccessError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (kind, rest) = s
            .split_once(':')
            .ok_or_else(|| ParseAccessError::Syntax(s.to_owned()))?;

        match kind {
            "r" => Ok(Access::ReadInt(parse_address(rest)?)),
            "rf" => Ok(Access::ReadFloat(parse_address(rest)?)),
            "w" | "wf" => {
                let (address, value) = rest
                    .split_once('=')
                    .ok_or_else(|| ParseAccessError::Syntax(s.to_owned()))?;
                let address = parse_address(address)?;
                let bad_value = || ParseAccessError::Value(value.to_owned());

                if kind == "w" {
                    Ok(Access::WriteInt(address, value.parse().map_err(|_| bad_value())?))
                } else {
                    Ok(Access::WriteFloat(address, value.parse().map_err(|_| bad_value())?))
                }
            }
            _ => Err(ParseAccessError::Syntax(s.to_owned())),
        }
    }
}

/// Shape used by [`scenario`], independent of command-line flags.
pub fn scenario_config() -> VmConfig {
    VmConfig {
        virtual_pages: 8,
        physical_pages: 2,
        page_size: 4,
        tlb_entries: 2,
        page_policy: Policy::RoundRobin,
        tlb_policy: Policy::RoundRobin,
    }
}

fn expect_statistics(mmu: &Mmu, step: &'static str, expected: Statistics) -> Result<(), WorkloadError> {
    let actual = mmu.statistics();

    if actual != expected {
        return Err(WorkloadError::UnexpectedStatistics { step, expected, actual });
    }

    Ok(())
}

/// Two writes and a read on an 8-page memory with 2 frames, checking the
/// counters after each step.
pub fn scenario(mmu: &mut Mmu) -> Result<(), WorkloadError> {
    mmu.write_int(0, 42)?;
    mmu.write_int(16, 7)?;
    expect_statistics(
        mmu,
        "after faulting in page 4",
        Statistics {
            page_faults: 1,
            tlb_misses: 1,
            disk_writes: 1,
        },
    )?;

    let value = mmu.read_int(0)?;
    expect_statistics(
        mmu,
        "after faulting page 0 back in",
        Statistics {
            page_faults: 2,
            tlb_misses: 2,
            disk_writes: 1,
        },
    )?;

    if value != 42 {
        return Err(WorkloadError::Mismatch {
            address: 0,
            expected: 42.to_string(),
            actual: value.to_string(),
        });
    }

    info!("scenario: page 0 survived eviction with value {}", value);

    Ok(())
}

fn sweep_value(address: u32) -> i32 {
    (address ^ 0x5A5A_5A5A) as i32
}

/// Writes every word of virtual memory, then reads everything back.
pub fn sweep(mmu: &mut Mmu) -> Result<(), WorkloadError> {
    let words = mmu.config().virtual_words();

    for address in (0..words).map(|word| word as u32) {
        mmu.write_int(address, sweep_value(address))?;
    }

    for address in (0..words).map(|word| word as u32) {
        let actual = mmu.read_int(address)?;

        if actual != sweep_value(address) {
            return Err(WorkloadError::Mismatch {
                address,
                expected: sweep_value(address).to_string(),
                actual: actual.to_string(),
            });
        }
    }

    info!("sweep: {} words verified", words);

    Ok(())
}

/// Multiplies two `n`x`n` float matrices stored row-major in virtual
/// memory (A, then B, then C) and checks C against a product computed
/// outside the simulation.
pub fn matmul(mmu: &mut Mmu, n: u32) -> Result<(), WorkloadError> {
    let cells = u64::from(n) * u64::from(n);
    let needed = 3 * cells;
    let available = mmu.config().virtual_words();

    if needed > available {
        return Err(WorkloadError::MatrixTooLarge { n, needed, available });
    }

    // Fits: `needed` is bounded by the 2^32-word address space.
    let cells = cells as u32;

    let (a, b, c) = (0, cells, 2 * cells);
    let a_at = |i: u32, j: u32| (i + j) as f32 * 0.5;
    let b_at = |i: u32, j: u32| ((i * j) % 7) as f32 - 3.0;

    for i in 0..n {
        for j in 0..n {
            mmu.write_float(a + i * n + j, a_at(i, j))?;
            mmu.write_float(b + i * n + j, b_at(i, j))?;
        }
    }

    for i in 0..n {
        for j in 0..n {
            let mut sum = 0.0f32;
            for k in 0..n {
                sum += mmu.read_float(a + i * n + k)? * mmu.read_float(b + k * n + j)?;
            }
            mmu.write_float(c + i * n + j, sum)?;
        }
    }

    for i in 0..n {
        for j in 0..n {
            let expected = (0..n).fold(0.0f32, |sum, k| sum + a_at(i, k) * b_at(k, j));
            let address = c + i * n + j;
            let actual = mmu.read_float(address)?;

            if actual.to_bits() != expected.to_bits() {
                return Err(WorkloadError::Mismatch {
                    address,
                    expected: expected.to_string(),
                    actual: actual.to_string(),
                });
            }
        }
    }

    info!("matmul: {}x{} product verified", n, n);

    Ok(())
}

/// Runs explicit accesses, printing every value read.
pub fn touch(mmu: &mut Mmu, accesses: &[Access]) -> Result<(), WorkloadError> {
    for access in accesses {
        match *access {
            Access::ReadInt(address) => println!("r {:#X} = {}", address, mmu.read_int(address)?),
            Access::ReadFloat(address) => println!("rf {:#X} = {}", address, mmu.read_float(address)?),
            Access::WriteInt(address, value) => mmu.write_int(address, value)?,
            Access::WriteFloat(address, value) => mmu.write_float(address, value)?,
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mmu(virtual_pages: u32, physical_pages: u32, page_size: u32, policy: Policy) -> Mmu {
        Mmu::create(virtual_pages, physical_pages, page_size, 2, policy, policy).unwrap()
    }

    #[test]
    fn parses_accesses() {
        assert_eq!("r:16".parse::<Access>(), Ok(Access::ReadInt(16)));
        assert_eq!("rf:0x10".parse::<Access>(), Ok(Access::ReadFloat(16)));
        assert_eq!("w:0x1F=-3".parse::<Access>(), Ok(Access::WriteInt(31, -3)));
        assert_eq!("wf:2=1.5".parse::<Access>(), Ok(Access::WriteFloat(2, 1.5)));
        assert_eq!("x:2".parse::<Access>(), Err(ParseAccessError::Syntax("x:2".to_owned())));
        assert_eq!("w:2".parse::<Access>(), Err(ParseAccessError::Syntax("w:2".to_owned())));
        assert_eq!("r:zz".parse::<Access>(), Err(ParseAccessError::Address("zz".to_owned())));
        assert_eq!("w:2=1.5".parse::<Access>(), Err(ParseAccessError::Value("1.5".to_owned())));
    }

    #[test]
    fn scenario_passes() {
        let mut mmu = Mmu::new(scenario_config()).unwrap();

        scenario(&mut mmu).unwrap();
    }

    #[test]
    fn sweep_survives_heavy_paging() {
        let mut mmu = mmu(16, 3, 8, Policy::RoundRobin);

        sweep(&mut mmu).unwrap();

        assert!(mmu.statistics().disk_writes > 0);
    }

    #[test]
    fn matmul_verifies_under_lru() {
        let mut mmu = mmu(32, 4, 8, Policy::LeastRecentlyUsed);

        matmul(&mut mmu, 6).unwrap();
    }

    #[test]
    fn matmul_rejects_oversized_matrix() {
        let mut mmu = mmu(8, 2, 4, Policy::RoundRobin);

        assert!(matches!(
            matmul(&mut mmu, 4),
            Err(WorkloadError::MatrixTooLarge { needed: 48, available: 32, .. })
        ));
    }

    #[test]
    fn matmul_rejects_matrix_beyond_address_space() {
        let mut mmu = mmu(8, 2, 4, Policy::RoundRobin);

        assert!(matches!(
            matmul(&mut mmu, 65536),
            Err(WorkloadError::MatrixTooLarge { needed: 0x3_0000_0000, available: 32, .. })
        ));
    }

    #[test]
    fn out_of_range_access_is_reported() {
        let mut mmu = mmu(8, 2, 4, Policy::RoundRobin);

        assert!(matches!(
            touch(&mut mmu, &[Access::WriteInt(4, 1), Access::ReadInt(32)]),
            Err(WorkloadError::Access(AccessError::AddressOutOfRange { page: 8, .. }))
        ));
    }
}
