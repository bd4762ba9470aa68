//! `mx86` — runs a loaded program to completion and emits the
//! `program_compare.cpp` protocol on stdout. Grounded directly in that
//! file's `main`/`run`/`print_changes`, with two bugs deliberately not
//! reproduced (see DESIGN.md): `ERROR` no longer falls through to a
//! trailing `END` with a success exit code, and `SIGNAL`'s mnemonic stays
//! on stdout instead of splitting onto stderr.

mod cli;
mod protocol;
mod signals;

use std::process::ExitCode;

use clap::Parser;
use mx86_cpu_core::{Cpu, CpuError, RecordingMonitor};
use mx86_mem::{load_program, parse_instructions_map};
use mx86_types::Opcode;

fn main() -> ExitCode {
    let args = cli::Args::parse();

    let default_filter = if args.verbose { "debug" } else { "error" };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_filter));
    tracing_subscriber::fmt().with_env_filter(filter).with_writer(std::io::stderr).init();

    let received_signal = match signals::install() {
        Ok(flag) => flag,
        Err(e) => {
            protocol::error(&format!("failed to install signal handlers: {e}"));
            return ExitCode::FAILURE;
        }
    };

    let memory = match load_program(&args.memory_map, &args.memory_data, &args.instructions) {
        Ok(memory) => memory,
        Err(e) => {
            protocol::error(&e.to_string());
            return ExitCode::FAILURE;
        }
    };

    let instructions_map = match std::fs::read_to_string(&args.instructions_map)
        .map_err(anyhow::Error::from)
        .and_then(|contents| parse_instructions_map(&contents).map_err(anyhow::Error::from))
    {
        Ok(map) => map,
        Err(e) => {
            protocol::error(&e.to_string());
            return ExitCode::FAILURE;
        }
    };

    protocol::loaded_ok();

    let mut cpu = Cpu::new(memory);
    cpu.startup();
    let mut monitor = RecordingMonitor::new();
    let mut cycle_count: u64 = 0;

    loop {
        if let Some(sig) = signals::poll(&received_signal) {
            protocol::signal(signals::mnemonic(sig));
            return ExitCode::from(sig as u8);
        }

        if cpu.is_halted() {
            protocol::end();
            return ExitCode::SUCCESS;
        }

        monitor.new_clock_cycle();
        let eip = cpu.registers().read_eip();
        let address = instructions_map.get(&eip).copied().unwrap_or(0);
        protocol::instruction_at(address);

        if address != 0 {
            if let Ok(inst) = cpu.memory().fetch_instruction(eip) {
                if inst.opcode == Opcode::Int {
                    protocol::end();
                    return ExitCode::SUCCESS;
                }
            }
        }

        match cpu.execute_instruction(&mut monitor) {
            Ok(()) => {}
            Err(e) => {
                protocol::error(&reason_for(&e));
                return ExitCode::FAILURE;
            }
        }
        protocol::changes(&monitor);
        cycle_count += 1;

        if cycle_count >= args.max_cycles {
            protocol::error("MAX_CYCLES");
            return ExitCode::FAILURE;
        }
    }
}

/// `program_compare.cpp` prints each caught exception's `what()`; ours is a
/// structured enum, so this is just the error's `Display` text.
fn reason_for(err: &CpuError) -> String {
    err.to_string()
}
