//! Control-transfer opcodes. Unlike every other class, these manage EIP
//! themselves — `execute_instruction` does not auto-advance after this
//! dispatch runs. EIP addresses the decoded instruction stream by index
//! (see `FlatMemory::fetch_instruction`), so "the next instruction" is
//! always `eip + 1`, not a byte-width add.

use mx86_types::{Inst, InstData, OpSize, Opcode};

use crate::condition;
use crate::engine::Cpu;
use crate::error::CpuError;
use crate::flags::Eflags;
use crate::monitor::ChangeMonitor;

pub fn execute(
    cpu: &mut Cpu,
    inst: &Inst,
    data: &InstData,
    flags: &mut Eflags,
    monitor: &mut dyn ChangeMonitor,
    eip: u32,
) -> Result<(u32, u32), CpuError> {
    let next = match inst.opcode {
        Opcode::Jmp => data.op1,

        Opcode::Jcc => {
            if condition::evaluate(inst.condition_code, *flags) {
                data.op1
            } else {
                eip.wrapping_add(1)
            }
        }

        Opcode::Loop => {
            use mx86_types::Register;
            let ecx = cpu.registers().read(Register::Ecx);
            let ecx = ecx.wrapping_sub(1);
            cpu.registers.write(Register::Ecx, ecx, monitor)?;
            if ecx != 0 {
                data.op1
            } else {
                eip.wrapping_add(1)
            }
        }

        Opcode::Call => {
            cpu.push(monitor, eip, eip.wrapping_add(1), OpSize::Dword)?;
            data.op1
        }

        Opcode::Ret => {
            let target = cpu.pop(monitor, eip, OpSize::Dword)?;
            if data.imm != 0 {
                use mx86_types::Register;
                let esp = cpu.registers().read(Register::Esp);
                cpu.registers.write(Register::Esp, esp.wrapping_add(data.imm), monitor)?;
            }
            target
        }

        Opcode::Iret => {
            let target = cpu.pop(monitor, eip, OpSize::Dword)?;
            let popped_flags = cpu.pop(monitor, eip, OpSize::Dword)?;
            *flags = Eflags::from_bits_truncate(popped_flags) | Eflags::RESERVED1;
            target
        }

        Opcode::Int => {
            let vector = (data.imm & 0xFF) as u8;
            cpu.interrupt(vector, true, eip, monitor)?;
            // `interrupt` never returns `Ok` in this engine's current,
            // intentionally-incomplete dispatch (see `Cpu::interrupt`);
            // this is unreachable today and kept only so a future,
            // completed dispatch has somewhere to resume from.
            eip.wrapping_add(1)
        }

        other => {
            return Err(CpuError::BadInstruction {
                eip,
                reason: format!("{other:?} is not classified OpcodeClass::Jump"),
            })
        }
    };

    cpu.registers.write_eip(next);
    Ok((0, 0))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::monitor::NullMonitor;
    use mx86_mem::FlatMemory;
    use mx86_types::{Operand, OpType, Register};

    fn memory() -> FlatMemory {
        FlatMemory::new(0, Vec::new(), 0x1000, vec![0; 16], 0x2000, vec![0; 16], 0x3000, 16)
    }

    fn base_inst(opcode: Opcode) -> Inst {
        Inst {
            opcode,
            op1: Operand { op_type: OpType::Imm, reg: Register::Eax, read: true },
            op2: Operand::unused(),
            compute_address: false,
            base_reg_present: false,
            scaled_reg_present: false,
            scaled_reg: 0,
            register_field: 0,
            address_value: 0,
            immediate_value: 0,
            operand_byte_size_override: false,
            operand_size_override: false,
            get_flags: false,
            write_ret1_to_op1: false,
            write_ret2_to_op2: false,
            write_ret2_to_register: false,
            scale_output_override: false,
            register_out: Register::Eax,
            rep_prefix: mx86_types::RepPrefix::None,
            condition_code: 0,
        }
    }

    #[test]
    fn jmp_sets_eip_to_the_target_index() {
        let mut cpu = Cpu::new(memory());
        cpu.startup();
        let inst = base_inst(Opcode::Jmp);
        let data = InstData { op1: 42, ..Default::default() };
        let mut flags = Eflags::default();
        let mut monitor = NullMonitor;
        execute(&mut cpu, &inst, &data, &mut flags, &mut monitor, 0).unwrap();
        assert_eq!(cpu.registers().read_eip(), 42);
    }

    #[test]
    fn jcc_falls_through_when_condition_is_false() {
        let mut cpu = Cpu::new(memory());
        cpu.startup();
        let mut inst = base_inst(Opcode::Jcc);
        inst.condition_code = 0x4; // JZ
        let data = InstData { op1: 99, ..Default::default() };
        let flags = Eflags::default();
        let mut flags_mut = flags;
        let mut monitor = NullMonitor;
        execute(&mut cpu, &inst, &data, &mut flags_mut, &mut monitor, 5).unwrap();
        assert_eq!(cpu.registers().read_eip(), 6);
    }

    #[test]
    fn call_pushes_return_index_then_jumps() {
        let mut cpu = Cpu::new(memory());
        cpu.startup();
        let inst = base_inst(Opcode::Call);
        let data = InstData { op1: 100, ..Default::default() };
        let mut flags = Eflags::default();
        let mut monitor = NullMonitor;
        execute(&mut cpu, &inst, &data, &mut flags, &mut monitor, 7).unwrap();
        assert_eq!(cpu.registers().read_eip(), 100);

        let ret_inst = base_inst(Opcode::Ret);
        let ret_data = InstData::default();
        execute(&mut cpu, &ret_inst, &ret_data, &mut flags, &mut monitor, 100).unwrap();
        assert_eq!(cpu.registers().read_eip(), 8);
    }

    #[test]
    fn loop_decrements_ecx_and_branches_while_nonzero() {
        let mut cpu = Cpu::new(memory());
        cpu.startup();
        let mut monitor = NullMonitor;
        cpu.registers.write(Register::Ecx, 1, &mut monitor).unwrap();
        let inst = base_inst(Opcode::Loop);
        let data = InstData { op1: 3, ..Default::default() };
        let mut flags = Eflags::default();
        execute(&mut cpu, &inst, &data, &mut flags, &mut monitor, 10).unwrap();
        assert_eq!(cpu.registers().read(Register::Ecx), 0);
        assert_eq!(cpu.registers().read_eip(), 11);
    }
}
