mod workload;

use std::process;

use clap::{Parser, Subcommand};
use log::error;
use vm::{CreateError, Mmu, Policy, VmConfig};

use workload::Access;

#[derive(Parser, Debug)]
#[command(
    name = "simvm",
    author,
    version,
    about = "Paged virtual memory simulator with a TLB",
    long_about = None,
)]
struct Cli {
    /// Size of the virtual memory in pages.
    #[arg(long, default_value_t = 64)]
    virtual_pages: u32,

    /// Size of the physical memory in pages.
    #[arg(long, default_value_t = 16)]
    physical_pages: u32,

    /// Size of a page in 32-bit words (power of two).
    #[arg(long, default_value_t = 256)]
    page_size: u32,

    #[arg(long, default_value_t = 8)]
    tlb_entries: u32,

    /// round-robin (0) or lru (1).
    #[arg(long, default_value_t = Policy::LeastRecentlyUsed)]
    page_policy: Policy,

    /// round-robin (0) or lru (1).
    #[arg(long, default_value_t = Policy::LeastRecentlyUsed)]
    tlb_policy: Policy,

    /// Hex dump of every frame once the workload is done.
    #[arg(long)]
    dump_frames: bool,

    #[command(subcommand)]
    workload: Workload,
}

#[derive(Subcommand, Debug)]
enum Workload {
    /// Fixed 8-page/2-frame round-robin run with known counters (ignores the size flags).
    Scenario,
    /// Write every word of virtual memory, then read it all back.
    Sweep,
    /// Float matrix product kept in virtual memory.
    Matmul {
        #[arg(long, default_value_t = 16)]
        n: u32,
    },
    /// Explicit accesses: r:ADDR, rf:ADDR, w:ADDR=INT, wf:ADDR=FLOAT.
    Touch {
        #[arg(required = true)]
        accesses: Vec<Access>,
    },
}

impl Cli {
    fn config(&self) -> VmConfig {
        match self.workload {
            Workload::Scenario => workload::scenario_config(),
            _ => VmConfig {
                virtual_pages: self.virtual_pages,
                physical_pages: self.physical_pages,
                page_size: self.page_size,
                tlb_entries: self.tlb_entries,
                page_policy: self.page_policy,
                tlb_policy: self.tlb_policy,
            },
        }
    }
}

fn dump_frames(mmu: &Mmu) {
    for frame_idx in 0..mmu.config().physical_pages as usize {
        let (Some(frame), Some(words)) = (mmu.frame(frame_idx), mmu.frame_words(frame_idx)) else {
            continue;
        };
        let bytes: Vec<u8> = words.iter().flat_map(|word| word.to_le_bytes()).collect();

        println!(
            "frame {:#06X} page={:#06X} dirty={} last_access={}: {}",
            frame_idx,
            frame.resident_page,
            frame.dirty,
            frame.last_access,
            hex::encode(bytes)
        );
    }
}

fn main() {
    env_logger::init();

    let cli = Cli::parse();

    let mut mmu = match Mmu::new(cli.config()) {
        Ok(mmu) => mmu,
        Err(CreateError::Config(err)) => {
            eprintln!("simvm: refusing to create virtual memory: {}", err);
            process::exit(2);
        }
        Err(err) => {
            error!("simvm: {}", err);
            eprintln!("simvm: fatal: {}", err);
            process::exit(1);
        }
    };

    let result = match &cli.workload {
        Workload::Scenario => workload::scenario(&mut mmu),
        Workload::Sweep => workload::sweep(&mut mmu),
        Workload::Matmul { n } => workload::matmul(&mut mmu, *n),
        Workload::Touch { accesses } => workload::touch(&mut mmu, accesses),
    };

    if let Err(err) = result {
        error!("simvm: workload aborted: {}", err);
        eprintln!("simvm: fatal: {}", err);
        mmu.print_statistics();
        process::exit(1);
    }

    mmu.print_statistics();

    if cli.dump_frames {
        dump_frames(&mmu);
    }
}
