//! Push/pop stack discipline: ESP adjustment plus the memory access. Only
//! `Word`/`Dword` operands make sense on the stack; a `Byte` push is a
//! decode-level mistake, not something the engine silently widens.

use mx86_mem::{Bus, FlatMemory};
use mx86_types::{OpSize, Register};

use crate::alu;
use crate::error::CpuError;
use crate::monitor::ChangeMonitor;
use crate::registers::Registers;

fn size_in_bytes(eip: u32, size: OpSize) -> Result<u32, CpuError> {
    match size {
        OpSize::Dword => Ok(4),
        OpSize::Word => Ok(2),
        OpSize::Byte | OpSize::Unknown => {
            Err(CpuError::BadInstruction { eip, reason: "byte-sized push/pop is not a valid stack operand".into() })
        }
    }
}

pub fn push(
    registers: &mut Registers,
    memory: &mut FlatMemory,
    monitor: &mut dyn ChangeMonitor,
    eip: u32,
    value: u32,
    size: OpSize,
) -> Result<(), CpuError> {
    let delta = size_in_bytes(eip, size)?;
    let esp = registers.read(Register::Esp);
    let new_esp = alu::sub_no_carry(esp, delta, OpSize::Dword);
    registers.write(Register::Esp, new_esp, monitor)?;
    memory.write(new_esp, value, size)?;
    monitor.memory_change(new_esp, delta);
    Ok(())
}

/// Also reports the read through [`ChangeMonitor::memory_change`]: the
/// monitor's only consumer is a cross-implementation cycle comparator that
/// diffs whatever memory a cycle touched, and a pop's read is exactly as
/// relevant to that diff as a push's write.
pub fn pop(
    registers: &mut Registers,
    memory: &mut FlatMemory,
    monitor: &mut dyn ChangeMonitor,
    eip: u32,
    size: OpSize,
) -> Result<u32, CpuError> {
    let delta = size_in_bytes(eip, size)?;
    let esp = registers.read(Register::Esp);
    let value = memory.read(esp, size)?;
    monitor.memory_change(esp, delta);
    let new_esp = alu::add_no_carry(esp, delta, OpSize::Dword);
    registers.write(Register::Esp, new_esp, monitor)?;
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::monitor::RecordingMonitor;

    fn memory() -> FlatMemory {
        FlatMemory::new(0, Vec::new(), 0x1000, vec![0; 16], 0x2000, vec![0; 16], 0x3000, 16)
    }

    #[test]
    fn push_then_pop_round_trips_and_restores_esp() {
        let mut regs = Registers::new();
        let mut mem = memory();
        let mut monitor = RecordingMonitor::new();
        regs.write(Register::Esp, mem.stack_end(), &mut monitor).unwrap();
        let esp0 = regs.read(Register::Esp);

        push(&mut regs, &mut mem, &mut monitor, 0, 0xDEAD_BEEF, OpSize::Dword).unwrap();
        assert_eq!(regs.read(Register::Esp), esp0 - 4);

        let popped = pop(&mut regs, &mut mem, &mut monitor, 0, OpSize::Dword).unwrap();
        assert_eq!(popped, 0xDEAD_BEEF);
        assert_eq!(regs.read(Register::Esp), esp0);
    }

    #[test]
    fn push_then_pop_reports_exactly_two_memory_events() {
        let mut regs = Registers::new();
        let mut mem = memory();
        let mut monitor = RecordingMonitor::new();
        regs.write(Register::Esp, mem.stack_end(), &mut monitor).unwrap();

        push(&mut regs, &mut mem, &mut monitor, 0, 1, OpSize::Dword).unwrap();
        pop(&mut regs, &mut mem, &mut monitor, 0, OpSize::Dword).unwrap();

        assert_eq!(monitor.memory().len(), 2);
        assert_eq!(monitor.memory()[0].address, monitor.memory()[1].address);
        assert_eq!(monitor.memory()[0].size, 4);
    }

    #[test]
    fn byte_sized_push_is_rejected() {
        let mut regs = Registers::new();
        let mut mem = memory();
        let mut monitor = RecordingMonitor::new();
        regs.write(Register::Esp, mem.stack_end(), &mut monitor).unwrap();
        assert!(push(&mut regs, &mut mem, &mut monitor, 0, 1, OpSize::Byte).is_err());
    }
}

#[cfg(test)]
mod round_trip_props {
    use super::*;
    use crate::monitor::RecordingMonitor;
    use proptest::prelude::*;

    fn memory() -> FlatMemory {
        FlatMemory::new(0, Vec::new(), 0x1000, vec![0; 16], 0x2000, vec![0; 16], 0x3000, 64)
    }

    proptest! {
        // `push v; pop` restores ESP and returns `v` truncated to the chosen
        // size (spec.md §8's round-trip law).
        #[test]
        fn push_then_pop_restores_esp_and_value(
            value in any::<u32>(),
            word_sized in any::<bool>(),
        ) {
            let size = if word_sized { OpSize::Word } else { OpSize::Dword };
            let mut regs = Registers::new();
            let mut mem = memory();
            let mut monitor = RecordingMonitor::new();
            regs.write(Register::Esp, mem.stack_end(), &mut monitor).unwrap();
            let esp0 = regs.read(Register::Esp);

            push(&mut regs, &mut mem, &mut monitor, 0, value, size).unwrap();
            let popped = pop(&mut regs, &mut mem, &mut monitor, 0, size).unwrap();

            prop_assert_eq!(regs.read(Register::Esp), esp0);
            prop_assert_eq!(popped, value & size.mask().unwrap());
        }
    }
}
