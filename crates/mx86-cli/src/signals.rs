//! Abnormal-termination handling via `signal-hook`, the idiomatic
//! replacement for the original's raw `<csignal>` handler plus
//! `std::quick_exit` — hand-rolling a signal-safe global here would be
//! exactly the stdlib reinvention this crate avoids when an ecosystem
//! crate already does it correctly.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use signal_hook::consts::{SIGABRT, SIGFPE, SIGILL, SIGINT, SIGSEGV, SIGTERM};
use signal_hook::flag;

const CAUGHT: [i32; 6] = [SIGSEGV, SIGABRT, SIGTERM, SIGILL, SIGFPE, SIGINT];

/// One flag per signal `program_compare.cpp` caught, registered via
/// `signal_hook::flag::register` (async-signal-safe: just a `store`).
/// `poll` checks each in a fixed order and reports the first one set.
pub struct SignalFlags {
    flags: Vec<(i32, Arc<AtomicBool>)>,
}

pub fn install() -> anyhow::Result<SignalFlags> {
    let mut flags = Vec::with_capacity(CAUGHT.len());
    for sig in CAUGHT {
        let flag = Arc::new(AtomicBool::new(false));
        flag::register(sig, Arc::clone(&flag))
            .map_err(|e| anyhow::anyhow!("failed to register signal {sig}: {e}"))?;
        flags.push((sig, flag));
    }
    Ok(SignalFlags { flags })
}

/// Number → mnemonic, matching `quick_exit_handler`'s switch exactly (the
/// `"unknown"` fallback included, for a signal this process never actually
/// registers a handler for).
pub fn mnemonic(signal: i32) -> &'static str {
    match signal {
        SIGSEGV => "SIGSEGV",
        SIGABRT => "SIGABRT",
        SIGTERM => "SIGTERM",
        SIGILL => "SIGILL",
        SIGFPE => "SIGFPE",
        SIGINT => "SIGINT",
        _ => "unknown",
    }
}

pub fn poll(flags: &SignalFlags) -> Option<i32> {
    flags.flags.iter().find(|(_, flag)| flag.load(Ordering::SeqCst)).map(|(sig, _)| *sig)
}
