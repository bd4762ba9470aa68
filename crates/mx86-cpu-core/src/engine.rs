//! The execution engine: the `Cpu` struct, the startup/run control flow,
//! and `execute_instruction`'s operand-fetch → dispatch → writeback →
//! EIP-advance pipeline. Grounded directly in `CPU.cpp`'s `startup`,
//! `run`, `execute_instruction`, `compute_address`, and `interrupt`.

use mx86_interrupts::{error_code, InterruptDescriptor, InterruptDescriptorTable, GENERAL_PROTECTION, MIN_LENGTH};
use mx86_mem::{Bus, FlatMemory, IoPorts};
use mx86_types::{Inst, InstData, OpSize, OpType, Opcode, OpcodeClass, Operand, Register};

use crate::alu;
use crate::dispatch;
use crate::error::{CpuError, RunStop};
use crate::flags::{Cr0, Eflags};
use crate::monitor::{ChangeMonitor, NullMonitor};
use crate::registers::Registers;
use crate::stack;

/// Register/flag state, the flat memory bus, the I/O port buffer, and the
/// (structurally present, functionally stubbed — see [`Cpu::interrupt`])
/// interrupt descriptor table.
pub struct Cpu {
    pub(crate) registers: Registers,
    pub(crate) memory: FlatMemory,
    pub(crate) io: IoPorts,
    idt: Vec<InterruptDescriptor>,
    pub(crate) halted: bool,
    clock_cycle_count: u64,
}

impl Cpu {
    pub fn new(memory: FlatMemory) -> Cpu {
        let mut registers = Registers::new();
        registers.set_idt_limit((MIN_LENGTH - 1) as u32);
        Cpu {
            registers,
            memory,
            io: IoPorts::new(),
            idt: vec![InterruptDescriptor::as_none(); MIN_LENGTH],
            halted: false,
            clock_cycle_count: 0,
        }
    }

    pub fn registers(&self) -> &Registers {
        &self.registers
    }

    pub fn memory(&self) -> &FlatMemory {
        &self.memory
    }

    pub fn memory_mut(&mut self) -> &mut FlatMemory {
        &mut self.memory
    }

    pub fn is_halted(&self) -> bool {
        self.halted
    }

    pub fn clock_cycle_count(&self) -> u64 {
        self.clock_cycle_count
    }

    /// Replace the interrupt descriptor table. Defaults to all-absent
    /// entries with the limit at [`MIN_LENGTH`] `- 1`.
    pub fn set_idt(&mut self, entries: Vec<InterruptDescriptor>, limit: u32) {
        self.idt = entries;
        self.registers.set_idt_limit(limit);
    }

    /// Zero every register bank, enter protected mode, and point EIP at
    /// the first decoded instruction and ESP at the top of the stack
    /// region. EIP addresses the decoded instruction stream by index, not
    /// by byte offset — `FlatMemory::fetch_instruction` is itself index-based.
    pub fn startup(&mut self) {
        self.registers.complete_reset();
        self.registers.set_idt_limit((MIN_LENGTH - 1) as u32);
        self.clock_cycle_count = 0;
        self.halted = false;

        let mut cr0 = self.registers.get_cr0();
        cr0.insert(Cr0::PE);
        self.registers.set_cr0(cr0);

        self.registers.write_eip(0);
        let stack_end = self.memory.stack_end();
        let _ = self.registers.write(Register::Esp, stack_end, &mut NullMonitor);
    }

    /// Run until halted, a structured failure is raised, or `max_cycles`
    /// is reached. Never returns `Err` on a clean stop.
    pub fn run(&mut self, max_cycles: u64, monitor: &mut dyn ChangeMonitor) -> Result<RunStop, CpuError> {
        while !self.halted {
            monitor.new_clock_cycle();
            self.execute_instruction(monitor)?;
            self.clock_cycle_count += 1;
            if self.clock_cycle_count >= max_cycles {
                return Ok(RunStop::MaxCycles);
            }
        }
        Ok(RunStop::Halted)
    }

    /// Fetch, resolve operands, dispatch, write back, and advance EIP for
    /// exactly one instruction.
    pub fn execute_instruction(&mut self, monitor: &mut dyn ChangeMonitor) -> Result<(), CpuError> {
        let eip = self.registers.read_eip();
        let inst = self.memory.fetch_instruction(eip)?.clone();

        let mut data = InstData { op_size: inst.operand_size(), ..InstData::default() };

        if inst.compute_address {
            data.address = self.compute_effective_address(&inst, eip)?;
        } else {
            data.address = inst.address_value;
        }

        // Resolved unconditionally, not only when `read` is set: the
        // writeback below uses the same size to address a not-read
        // destination (MOV/MOVSX/MOVZX/LEA/SETcc/POP/IN all decode their
        // destination operand with `read == false`), matching `CPU.cpp`
        // writing a register destination at its natural width regardless
        // of whether it was also a source.
        data.op1_size = self.operand_size(&inst.op1, data.op_size);
        data.op2_size = self.operand_size(&inst.op2, data.op_size);

        let mut saw_immediate = false;
        if inst.op1.read {
            data.op1 = self.read_operand(&inst.op1, &inst, data.address, data.op1_size)?;
            saw_immediate |= inst.op1.op_type == OpType::Imm;
        }
        if inst.op2.read {
            data.op2 = self.read_operand(&inst.op2, &inst, data.address, data.op2_size)?;
            saw_immediate |= inst.op2.op_type == OpType::Imm;
        }
        if !saw_immediate {
            data.imm = inst.immediate_value;
        }
        // ROT/SHFT/SHD pack their bitfield (count / use_imm / direction /
        // with-carry) into the immediate; `Inst` has no dedicated third
        // operand slot, and the original left `data.op3` entirely
        // unpopulated ("TODO: missing data.op3 value"). BOUND overrides
        // this with an actual memory read in its own dispatch arm.
        data.op3 = inst.immediate_value;

        let mut flags = if inst.get_flags { self.registers.flags } else { Eflags::default() };

        let (ret, ret2) = match inst.opcode.class() {
            OpcodeClass::Arithmetic => dispatch::arithmetic::execute(self, &inst, &data, &mut flags, monitor, eip)?,
            OpcodeClass::NonArithmetic => {
                dispatch::non_arithmetic::execute(self, &inst, &data, &mut flags, monitor, eip)?
            }
            OpcodeClass::Jump => dispatch::jump::execute(self, &inst, &data, &mut flags, monitor, eip)?,
            OpcodeClass::String => dispatch::string_ops::execute(self, &inst, &data, &mut flags, monitor, eip)?,
            OpcodeClass::StateMachine => {
                dispatch::state_machine::execute(self, &inst, &data, &mut flags, monitor, eip)?
            }
        };

        if inst.get_flags {
            self.registers.flags = flags;
        }

        if inst.write_ret1_to_op1 {
            self.write_operand(&inst.op1, data.address, data.op1_size, ret, monitor)?;
        }

        if inst.write_ret2_to_register {
            let size = if inst.scale_output_override { data.op1_size } else { OpSize::Dword };
            self.registers.write_sized(inst.register_out, ret2, size, monitor)?;
        } else if inst.write_ret2_to_op2 {
            self.write_operand(&inst.op2, data.address, data.op2_size, ret2, monitor)?;
        }

        // Jump-class opcodes rewrite EIP themselves (branch target, or
        // fallthrough +1 on a not-taken Jcc/LOOP); everything else
        // advances by exactly one instruction index.
        if !matches!(inst.opcode.class(), OpcodeClass::Jump) {
            self.registers.write_eip(eip.wrapping_add(1));
        }

        Ok(())
    }

    fn operand_size(&self, op: &Operand, base: OpSize) -> OpSize {
        if op.op_type == OpType::Reg {
            if op.reg.is_segment() {
                OpSize::Word
            } else if op.reg.is_control() {
                OpSize::Dword
            } else {
                base
            }
        } else {
            base
        }
    }

    fn read_operand(&self, op: &Operand, inst: &Inst, effective_address: u32, size: OpSize) -> Result<u32, CpuError> {
        match op.op_type {
            OpType::Reg => Ok(self.registers.read_sized(op.reg, size)),
            OpType::Mem => Ok(self.memory.read(effective_address, size)?),
            OpType::Imm => Ok(inst.immediate_value),
            OpType::ImmMem => Ok(inst.address_value),
        }
    }

    pub(crate) fn write_operand(
        &mut self,
        op: &Operand,
        address: u32,
        size: OpSize,
        value: u32,
        monitor: &mut dyn ChangeMonitor,
    ) -> Result<(), CpuError> {
        match op.op_type {
            OpType::Reg => self.registers.write_sized(op.reg, value, size, monitor),
            OpType::Mem => {
                self.memory.write(address, value, size)?;
                monitor.memory_change(address, size.bytes().unwrap_or(4));
                Ok(())
            }
            OpType::Imm | OpType::ImmMem => Ok(()),
        }
    }

    /// `displacement + base_reg + (scaled_reg << scale)`, mod 2^32.
    /// Grounded in `CPU::compute_address`; `register_field`'s low 3 bits
    /// select the base register and bits 3-4 carry the scale's log2.
    fn compute_effective_address(&self, inst: &Inst, eip: u32) -> Result<u32, CpuError> {
        if inst.op1.op_type != OpType::Mem && inst.op2.op_type != OpType::Mem {
            return Err(CpuError::BadInstruction {
                eip,
                reason: "compute_address is set but neither operand is OpType::Mem".into(),
            });
        }

        let mut address = inst.address_value;
        if inst.base_reg_present {
            let base_index = (inst.register_field & 0b111) as usize;
            let base_value = self.registers.read_index(base_index, OpSize::Dword, false);
            address = alu::add_no_carry(address, base_value, OpSize::Dword);
        }
        if inst.scaled_reg_present {
            let scale = (inst.register_field >> 3) & 0b11;
            let scaled_value = self.registers.read_index(inst.scaled_reg as usize, OpSize::Dword, false);
            let scaled_value = alu::shift_left(scaled_value, scale as u32, OpSize::Dword).0;
            address = alu::add_no_carry(address, scaled_value, OpSize::Dword);
        }
        Ok(address)
    }

    pub(crate) fn push(
        &mut self,
        monitor: &mut dyn ChangeMonitor,
        eip: u32,
        value: u32,
        size: OpSize,
    ) -> Result<(), CpuError> {
        stack::push(&mut self.registers, &mut self.memory, monitor, eip, value, size)
    }

    pub(crate) fn pop(&mut self, monitor: &mut dyn ChangeMonitor, eip: u32, size: OpSize) -> Result<u32, CpuError> {
        stack::pop(&mut self.registers, &mut self.memory, monitor, eip, size)
    }

    pub(crate) fn read_io(&mut self, port: u32, size: OpSize) -> Result<u32, CpuError> {
        Ok(self.io.read_port(port, size)?)
    }

    pub(crate) fn write_io(&mut self, port: u32, value: u32, size: OpSize) -> Result<(), CpuError> {
        Ok(self.io.write_port(port, value, size)?)
    }

    /// Raise interrupt `vector`. On a present descriptor, returns
    /// `NotImplemented` — the state-save/instruction-restart machinery a
    /// real dispatch would need is intentionally unbuilt (see DESIGN.md).
    /// On a missing descriptor, recursively raises `GeneralProtection`
    /// with a properly-encoded error code exactly once; a second miss (a
    /// missing #GP handler too) becomes a `DoubleFault` rather than an
    /// infinite loop — real hardware would triple-fault and reset, which
    /// this engine has nowhere to do.
    pub(crate) fn interrupt(
        &mut self,
        vector: u8,
        software: bool,
        eip: u32,
        monitor: &mut dyn ChangeMonitor,
    ) -> Result<(), CpuError> {
        self.interrupt_inner(vector, software, eip, monitor, false)
    }

    fn interrupt_inner(
        &mut self,
        vector: u8,
        software: bool,
        eip: u32,
        monitor: &mut dyn ChangeMonitor,
        is_recursive: bool,
    ) -> Result<(), CpuError> {
        let idt = InterruptDescriptorTable::new(&self.idt, self.registers.idt_limit());
        match idt.get_descriptor(vector) {
            Some(descriptor) if descriptor.present => {
                Err(CpuError::NotImplemented { eip, what: "interrupt dispatch (state save/resume)".into() })
            }
            _ => {
                if is_recursive {
                    return Err(CpuError::processor_exception(eip, &mx86_interrupts::DOUBLE_FAULT));
                }
                let code = error_code(vector, !software);
                tracing::debug!(vector, code, "missing IDT descriptor, raising #GP");
                self.interrupt_inner(GENERAL_PROTECTION.vector, false, eip, monitor, true)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::monitor::NullMonitor;

    fn empty_memory() -> FlatMemory {
        FlatMemory::new(0, Vec::new(), 0x1000, vec![0; 16], 0x2000, vec![0; 16], 0x3000, 16)
    }

    #[test]
    fn startup_enters_protected_mode_and_points_esp_at_stack_end() {
        let mut cpu = Cpu::new(empty_memory());
        cpu.startup();
        assert!(cpu.registers().get_cr0().contains(Cr0::PE));
        assert_eq!(cpu.registers().read(Register::Esp), cpu.memory().stack_end());
        assert_eq!(cpu.registers().read_eip(), 0);
    }

    #[test]
    fn interrupt_without_a_descriptor_raises_general_protection() {
        let mut cpu = Cpu::new(empty_memory());
        cpu.startup();
        let mut monitor = NullMonitor;
        let err = cpu.interrupt(0, true, 0, &mut monitor).unwrap_err();
        assert!(matches!(err, CpuError::ProcessorException { vector, .. } if vector == GENERAL_PROTECTION.vector));
    }

    #[test]
    fn interrupt_with_no_gp_handler_either_escalates_to_double_fault() {
        let mut cpu = Cpu::new(empty_memory());
        cpu.startup();
        let mut monitor = NullMonitor;
        let err = cpu.interrupt(5, true, 0, &mut monitor).unwrap_err();
        assert!(matches!(err, CpuError::ProcessorException { vector, .. } if vector == mx86_interrupts::DOUBLE_FAULT.vector));
    }
}
