//! ENTER/LEAVE/PUSHA/POPA — multi-register stack bookkeeping opcodes. Not
//! control transfer despite sharing the original's combined
//! `not_arithmetic | state_machine` bit-test with Jump; EIP still just
//! advances by one afterward.

use mx86_types::{Inst, InstData, OpSize, Opcode, Register};

use crate::engine::Cpu;
use crate::error::CpuError;
use crate::flags::Eflags;
use crate::monitor::ChangeMonitor;

/// Registers PUSHA stores (and POPA restores, in reverse), in encoding order.
const PUSHA_ORDER: [Register; 8] = [
    Register::Eax,
    Register::Ecx,
    Register::Edx,
    Register::Ebx,
    Register::Esp,
    Register::Ebp,
    Register::Esi,
    Register::Edi,
];

pub fn execute(
    cpu: &mut Cpu,
    inst: &Inst,
    data: &InstData,
    _flags: &mut Eflags,
    monitor: &mut dyn ChangeMonitor,
    eip: u32,
) -> Result<(u32, u32), CpuError> {
    match inst.opcode {
        Opcode::Enter => {
            let frame_size = data.op1;
            let nesting_level = data.imm & 0xFF;
            if nesting_level != 0 {
                return Err(CpuError::NotImplemented {
                    eip,
                    what: "ENTER with a nonzero nesting level (nested display frames)".to_string(),
                });
            }
            let ebp = cpu.registers().read(Register::Ebp);
            cpu.push(monitor, eip, ebp, OpSize::Dword)?;
            let new_ebp = cpu.registers().read(Register::Esp);
            cpu.registers.write(Register::Ebp, new_ebp, monitor)?;
            let new_esp = new_ebp.wrapping_sub(frame_size);
            cpu.registers.write(Register::Esp, new_esp, monitor)?;
            Ok((0, 0))
        }

        Opcode::Leave => {
            let ebp = cpu.registers().read(Register::Ebp);
            cpu.registers.write(Register::Esp, ebp, monitor)?;
            let saved_ebp = cpu.pop(monitor, eip, OpSize::Dword)?;
            cpu.registers.write(Register::Ebp, saved_ebp, monitor)?;
            Ok((0, 0))
        }

        Opcode::Pusha => {
            let original_esp = cpu.registers().read(Register::Esp);
            for reg in PUSHA_ORDER {
                let value = if reg == Register::Esp { original_esp } else { cpu.registers().read(reg) };
                cpu.push(monitor, eip, value, OpSize::Dword)?;
            }
            Ok((0, 0))
        }

        Opcode::Popa => {
            for reg in PUSHA_ORDER.iter().rev() {
                let value = cpu.pop(monitor, eip, OpSize::Dword)?;
                if *reg != Register::Esp {
                    cpu.registers.write(*reg, value, monitor)?;
                }
            }
            Ok((0, 0))
        }

        other => Err(CpuError::BadInstruction {
            eip,
            reason: format!("{other:?} is not classified OpcodeClass::StateMachine"),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::monitor::NullMonitor;
    use mx86_mem::FlatMemory;
    use mx86_types::Operand;

    fn memory() -> FlatMemory {
        FlatMemory::new(0, Vec::new(), 0x1000, vec![0; 16], 0x2000, vec![0; 16], 0x3000, 64)
    }

    fn base_inst(opcode: Opcode) -> Inst {
        Inst {
            opcode,
            op1: Operand::unused(),
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
    fn enter_pushes_ebp_and_allocates_locals() {
        let mut cpu = Cpu::new(memory());
        cpu.startup();
        let mut monitor = NullMonitor;
        cpu.registers.write(Register::Ebp, 0xAAAA_AAAA, &mut monitor).unwrap();
        let esp0 = cpu.registers().read(Register::Esp);

        let inst = base_inst(Opcode::Enter);
        let data = InstData { op1: 16, imm: 0, ..Default::default() };
        let mut flags = Eflags::default();
        execute(&mut cpu, &inst, &data, &mut flags, &mut monitor, 0).unwrap();

        let new_ebp = cpu.registers().read(Register::Ebp);
        assert_eq!(new_ebp, esp0 - 4);
        assert_eq!(cpu.registers().read(Register::Esp), new_ebp - 16);

        let leave_inst = base_inst(Opcode::Leave);
        let leave_data = InstData::default();
        execute(&mut cpu, &leave_inst, &leave_data, &mut flags, &mut monitor, 1).unwrap();
        assert_eq!(cpu.registers().read(Register::Ebp), 0xAAAA_AAAA);
        assert_eq!(cpu.registers().read(Register::Esp), esp0);
    }

    #[test]
    fn pusha_then_popa_round_trips_general_registers() {
        let mut cpu = Cpu::new(memory());
        cpu.startup();
        let mut monitor = NullMonitor;
        cpu.registers.write(Register::Eax, 1, &mut monitor).unwrap();
        cpu.registers.write(Register::Ebx, 2, &mut monitor).unwrap();
        cpu.registers.write(Register::Esi, 3, &mut monitor).unwrap();
        let esp0 = cpu.registers().read(Register::Esp);

        let pusha_inst = base_inst(Opcode::Pusha);
        let data = InstData::default();
        let mut flags = Eflags::default();
        execute(&mut cpu, &pusha_inst, &data, &mut flags, &mut monitor, 0).unwrap();
        assert_eq!(cpu.registers().read(Register::Esp), esp0 - 32);

        cpu.registers.write(Register::Eax, 0, &mut monitor).unwrap();
        cpu.registers.write(Register::Ebx, 0, &mut monitor).unwrap();
        cpu.registers.write(Register::Esi, 0, &mut monitor).unwrap();

        let popa_inst = base_inst(Opcode::Popa);
        execute(&mut cpu, &popa_inst, &data, &mut flags, &mut monitor, 1).unwrap();
        assert_eq!(cpu.registers().read(Register::Eax), 1);
        assert_eq!(cpu.registers().read(Register::Ebx), 2);
        assert_eq!(cpu.registers().read(Register::Esi), 3);
        assert_eq!(cpu.registers().read(Register::Esp), esp0);
    }
}
