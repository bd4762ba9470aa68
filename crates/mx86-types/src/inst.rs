use crate::op_size::OpSize;
use crate::opcode::{Opcode, RepPrefix};
use crate::operand::Operand;
use crate::register::Register;

/// A pre-decoded instruction record, as produced by the (out of scope)
/// decoder and consumed one at a time by the execution engine.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Inst {
    pub opcode: Opcode,
    pub op1: Operand,
    pub op2: Operand,

    /// If set, the engine computes an effective address from whichever of
    /// `op1`/`op2` is `OpType::Mem`.
    pub compute_address: bool,
    pub base_reg_present: bool,
    pub scaled_reg_present: bool,
    /// Register index of the scaled register (not a `Register` value —
    /// it is looked up through [`crate::register::Register::general_index`]'s
    /// inverse via the engine's register file).
    pub scaled_reg: u8,
    /// Base index in bits 0-2, scale log2 in bits 3-4.
    pub register_field: u8,

    pub address_value: u32,
    pub immediate_value: u32,

    pub operand_byte_size_override: bool,
    pub operand_size_override: bool,

    /// Snapshot EFLAGS before dispatch, write it back after.
    pub get_flags: bool,

    pub write_ret1_to_op1: bool,
    pub write_ret2_to_op2: bool,
    pub write_ret2_to_register: bool,
    pub scale_output_override: bool,
    pub register_out: Register,

    /// REP/REPE/REPNE prefix; meaningful only for `OpcodeClass::String`.
    pub rep_prefix: RepPrefix,
    /// 4-bit condition code for SETcc / Jcc.
    pub condition_code: u8,
}

impl Inst {
    /// Width selected by the two size-override bits: byte wins over word,
    /// which wins over the dword default.
    pub fn operand_size(&self) -> OpSize {
        OpSize::from_overrides(self.operand_byte_size_override, self.operand_size_override)
    }
}

/// Per-cycle scratch record built by the engine from `Inst` plus the
/// current register/memory state. Not persisted across instructions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct InstData {
    pub op1: u32,
    pub op2: u32,
    pub op3: u32,
    pub op1_size: OpSize,
    pub op2_size: OpSize,
    pub op_size: OpSize,
    pub address: u32,
    pub imm: u32,
}
