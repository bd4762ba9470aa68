//! The line-oriented stdout protocol a comparator tool consumes, grounded
//! directly in `program_compare.cpp`'s `print_changes`/`run`/`main` — same
//! tokens and line breaks, with two deliberate departures from the
//! original noted inline where they are emitted.

use mx86_cpu_core::RecordingMonitor;
use mx86_types::Register;

pub fn loaded_ok() {
    println!("OK");
}

pub fn instruction_at(address: u32) {
    println!("INST");
    println!("{:x}", address);
}

pub fn changes(monitor: &RecordingMonitor) {
    println!("CHANGES");
    println!("REG");
    println!("{}", join_registers(monitor.registers()));
    println!("MEM");
    let mem: Vec<String> = monitor.memory().iter().map(|c| format!("{:x}:{}", c.address, c.size)).collect();
    println!("{}", mem.join(","));
}

pub fn error(reason: &str) {
    println!("ERROR");
    println!("{reason}");
}

pub fn end() {
    println!("END");
}

/// `SIGNAL <mnemonic>` on stdout as a single protocol line. The original's
/// `quick_exit_handler` sends `"SIGNAL\n"` to stdout but the mnemonic to
/// stderr, splitting one protocol event across two streams — this keeps
/// the whole event on the channel a comparator actually reads.
pub fn signal(mnemonic: &str) {
    println!("SIGNAL");
    println!("{mnemonic}");
}

fn join_registers(regs: &[Register]) -> String {
    regs.iter().map(register_name).collect::<Vec<_>>().join(",")
}

fn register_name(reg: &Register) -> String {
    format!("{reg:?}").to_ascii_uppercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn register_names_are_uppercased() {
        assert_eq!(register_name(&Register::Eax), "EAX");
        assert_eq!(register_name(&Register::Cr0), "CR0");
    }
}
