//! String-class opcodes: CMPS/INS/LODS/MOVS/OUTS/SCAS/STOS, each operating
//! through ESI and/or EDI with direction controlled by EFLAGS.DF. REP
//! completes the whole repetition within this single call — no per-byte
//! cycle stepping is modeled (spec.md's explicit simplification), so EIP
//! still just advances by one afterward like any other non-control-flow
//! opcode.

use mx86_mem::Bus;
use mx86_types::{Inst, InstData, OpSize, Opcode, RepPrefix, Register};

use crate::alu;
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
    let size = if data.op_size == OpSize::Unknown { OpSize::Dword } else { data.op_size };
    let step = size.bytes().unwrap_or(4);
    let backward = flags.contains(Eflags::DF);

    let mut iterations: u64 = match inst.rep_prefix {
        RepPrefix::None => 1,
        RepPrefix::Repe | RepPrefix::Repne => cpu.registers().read(Register::Ecx) as u64,
    };
    if iterations == 0 && inst.rep_prefix != RepPrefix::None {
        // REP with ECX == 0 executes the body zero times.
        return Ok((0, 0));
    }
    if inst.rep_prefix == RepPrefix::None {
        iterations = 1;
    }

    let mut ran = 0u64;
    let mut stop_reason: Option<bool> = None; // Some(zf_matches_repeat_condition)

    while ran < iterations {
        match inst.opcode {
            Opcode::Movs => {
                let esi = cpu.registers().read(Register::Esi);
                let edi = cpu.registers().read(Register::Edi);
                let value = cpu.memory().read(esi, size)?;
                cpu.memory_mut().write(edi, value, size)?;
                monitor.memory_change(edi, step);
                advance(cpu, monitor, Register::Esi, step, backward)?;
                advance(cpu, monitor, Register::Edi, step, backward)?;
            }

            Opcode::Lods => {
                let esi = cpu.registers().read(Register::Esi);
                let value = cpu.memory().read(esi, size)?;
                cpu.registers.write_sized(Register::Eax, value, size, monitor)?;
                advance(cpu, monitor, Register::Esi, step, backward)?;
            }

            Opcode::Stos => {
                let edi = cpu.registers().read(Register::Edi);
                let eax = cpu.registers().read_sized(Register::Eax, size);
                cpu.memory_mut().write(edi, eax, size)?;
                monitor.memory_change(edi, step);
                advance(cpu, monitor, Register::Edi, step, backward)?;
            }

            Opcode::Cmps => {
                let esi = cpu.registers().read(Register::Esi);
                let edi = cpu.registers().read(Register::Edi);
                let a = cpu.memory().read(esi, size)?;
                let b = cpu.memory().read(edi, size)?;
                let (diff, borrow) = alu::sub(a, b, false, size);
                flags.update_status_flags(a, b, diff, size, borrow, true);
                advance(cpu, monitor, Register::Esi, step, backward)?;
                advance(cpu, monitor, Register::Edi, step, backward)?;
                stop_reason = Some(flags.contains(Eflags::ZF));
            }

            Opcode::Scas => {
                let edi = cpu.registers().read(Register::Edi);
                let eax = cpu.registers().read_sized(Register::Eax, size);
                let b = cpu.memory().read(edi, size)?;
                let (diff, borrow) = alu::sub(eax, b, false, size);
                flags.update_status_flags(eax, b, diff, size, borrow, true);
                advance(cpu, monitor, Register::Edi, step, backward)?;
                stop_reason = Some(flags.contains(Eflags::ZF));
            }

            Opcode::Ins => {
                let edi = cpu.registers().read(Register::Edi);
                let port = cpu.registers().read(Register::Edx);
                let value = cpu.read_io(port, size)?;
                cpu.memory_mut().write(edi, value, size)?;
                monitor.memory_change(edi, step);
                advance(cpu, monitor, Register::Edi, step, backward)?;
            }

            Opcode::Outs => {
                let esi = cpu.registers().read(Register::Esi);
                let port = cpu.registers().read(Register::Edx);
                let value = cpu.memory().read(esi, size)?;
                cpu.write_io(port, value, size)?;
                advance(cpu, monitor, Register::Esi, step, backward)?;
            }

            other => {
                return Err(CpuError::BadInstruction {
                    eip,
                    reason: format!("{other:?} is not classified OpcodeClass::String"),
                })
            }
        }

        ran += 1;

        if let Some(zf) = stop_reason {
            let should_continue = match inst.rep_prefix {
                RepPrefix::Repe => zf,
                RepPrefix::Repne => !zf,
                RepPrefix::None => true,
            };
            if !should_continue {
                break;
            }
        }
    }

    if inst.rep_prefix != RepPrefix::None {
        let remaining = iterations.saturating_sub(ran);
        cpu.registers.write(Register::Ecx, remaining as u32, monitor)?;
    }

    Ok((0, 0))
}

fn advance(
    cpu: &mut Cpu,
    monitor: &mut dyn ChangeMonitor,
    reg: Register,
    step: u32,
    backward: bool,
) -> Result<(), CpuError> {
    let current = cpu.registers().read(reg);
    let next = if backward {
        alu::sub_no_carry(current, step, OpSize::Dword)
    } else {
        alu::add_no_carry(current, step, OpSize::Dword)
    };
    cpu.registers.write(reg, next, monitor)
}
