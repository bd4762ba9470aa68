use std::path::PathBuf;

use clap::Parser;

/// Runs a loaded program to completion (or failure), emitting the
/// `OK`/`INST`/`CHANGES`/`ERROR`/`END`/`SIGNAL` protocol on stdout for an
/// external comparator tool to consume line by line.
#[derive(Debug, Parser)]
#[command(name = "mx86", version, about)]
pub struct Args {
    /// Region layout: `KIND START_HEX SIZE_HEX` per line.
    #[arg(long = "memory-map")]
    pub memory_map: PathBuf,

    /// Raw ROM-then-RAM bytes, in memory-map declaration order.
    #[arg(long = "memory-data")]
    pub memory_data: PathBuf,

    /// Packed little-endian `Inst` records, indexed directly by EIP.
    #[arg(long = "instructions")]
    pub instructions: PathBuf,

    /// `HEXADDRESS,HEXINDEX` per line, used only to print `INST <hexaddr>`.
    #[arg(long = "instructions-map")]
    pub instructions_map: PathBuf,

    /// Clock cycles after which a still-running program is stopped with
    /// `ERROR MAX_CYCLES`.
    #[arg(long = "max-cycles", default_value_t = 1000)]
    pub max_cycles: u64,

    /// Enable `tracing` diagnostics on stderr (`RUST_LOG` also works).
    #[arg(short = 'v', long)]
    pub verbose: bool,
}
