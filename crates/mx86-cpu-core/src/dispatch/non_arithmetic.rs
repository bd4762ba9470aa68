//! Single-cycle opcodes outside the arithmetic status-flag contract: HLT,
//! IN/OUT, PUSH/POP/PUSHF/POPF, LOCK/WAIT (no-ops in a single-hart, no-FPU
//! model), and the descriptor-table-table/segmentation family, which is an
//! explicit non-goal (flat memory, no segmentation) and surfaces as
//! `NotImplemented` rather than being silently wrong.

use mx86_types::{Inst, InstData, OpSize, Opcode, OpType};

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
    match inst.opcode {
        Opcode::Hlt => {
            cpu.halted = true;
            Ok((0, 0))
        }

        Opcode::In => {
            let port = data.op2;
            let value = cpu.read_io(port, data.op1_size)?;
            Ok((value, 0))
        }

        Opcode::Out => {
            let port = data.op1;
            cpu.write_io(port, data.op2, data.op2_size)?;
            Ok((0, 0))
        }

        Opcode::Push => {
            let size = if data.op1_size == OpSize::Unknown { data.op_size } else { data.op1_size };
            cpu.push(monitor, eip, data.op1, size)?;
            Ok((0, 0))
        }

        Opcode::Pop => {
            let size = if inst.op1.op_type == OpType::Reg {
                inst.op1.reg.natural_size()
            } else {
                data.op_size
            };
            let value = cpu.pop(monitor, eip, size)?;
            Ok((value, 0))
        }

        Opcode::Pushf => {
            cpu.push(monitor, eip, cpu.registers().flags.bits(), OpSize::Dword)?;
            Ok((0, 0))
        }

        Opcode::Popf => {
            let value = cpu.pop(monitor, eip, OpSize::Dword)?;
            *flags = eflags_from_popped_bits(value);
            Ok((0, 0))
        }

        Opcode::Lock | Opcode::Wait => Ok((0, 0)),

        Opcode::Lar
        | Opcode::Lgdt
        | Opcode::Lgs
        | Opcode::Lldt
        | Opcode::Lmsw
        | Opcode::Lsl
        | Opcode::Ltr
        | Opcode::Sgdt
        | Opcode::Sldt
        | Opcode::Smsw
        | Opcode::Str
        | Opcode::Verr => Err(CpuError::NotImplemented {
            eip,
            what: format!("{:?} (segmentation/descriptor tables are out of scope)", inst.opcode),
        }),

        other => Err(CpuError::BadInstruction {
            eip,
            reason: format!("{other:?} is not classified OpcodeClass::NonArithmetic"),
        }),
    }
}

/// POPF reconstructs EFLAGS from a popped dword, preserving reserved bit 1.
fn eflags_from_popped_bits(value: u32) -> Eflags {
    Eflags::from_bits_truncate(value) | Eflags::RESERVED1
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::monitor::NullMonitor;
    use mx86_mem::FlatMemory;
    use mx86_types::{Operand, Register};

    fn memory() -> FlatMemory {
        FlatMemory::new(0, Vec::new(), 0x1000, vec![0; 16], 0x2000, vec![0; 16], 0x3000, 16)
    }

    fn base_inst(opcode: Opcode) -> Inst {
        Inst {
            opcode,
            op1: Operand { op_type: OpType::Reg, reg: Register::Eax, read: true },
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
    fn hlt_sets_the_halted_flag() {
        let mut cpu = Cpu::new(memory());
        cpu.startup();
        let inst = base_inst(Opcode::Hlt);
        let data = InstData::default();
        let mut flags = Eflags::default();
        let mut monitor = NullMonitor;
        execute(&mut cpu, &inst, &data, &mut flags, &mut monitor, 0).unwrap();
        assert!(cpu.is_halted());
    }

    #[test]
    fn push_then_pop_restores_esp() {
        let mut cpu = Cpu::new(memory());
        cpu.startup();
        let esp0 = cpu.registers().read(Register::Esp);
        let mut monitor = NullMonitor;

        let push_inst = base_inst(Opcode::Push);
        let push_data = InstData { op1: 0xDEAD_BEEF, op1_size: OpSize::Dword, ..Default::default() };
        let mut flags = Eflags::default();
        execute(&mut cpu, &push_inst, &push_data, &mut flags, &mut monitor, 0).unwrap();
        assert_eq!(cpu.registers().read(Register::Esp), esp0 - 4);

        let pop_inst = base_inst(Opcode::Pop);
        let pop_data = InstData::default();
        let (ret, _) = execute(&mut cpu, &pop_inst, &pop_data, &mut flags, &mut monitor, 0).unwrap();
        assert_eq!(ret, 0xDEAD_BEEF);
        assert_eq!(cpu.registers().read(Register::Esp), esp0);
    }

    #[test]
    fn lgdt_is_not_implemented() {
        let mut cpu = Cpu::new(memory());
        cpu.startup();
        let inst = base_inst(Opcode::Lgdt);
        let data = InstData::default();
        let mut flags = Eflags::default();
        let mut monitor = NullMonitor;
        assert!(matches!(
            execute(&mut cpu, &inst, &data, &mut flags, &mut monitor, 0),
            Err(CpuError::NotImplemented { .. })
        ));
    }
}
