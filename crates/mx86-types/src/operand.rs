use crate::op_type::OpType;
use crate::register::Register;

/// One operand slot of a decoded instruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Operand {
    pub op_type: OpType,
    pub reg: Register,
    pub read: bool,
}

impl Operand {
    pub const fn unused() -> Operand {
        Operand {
            op_type: OpType::Imm,
            reg: Register::Eax,
            read: false,
        }
    }
}

impl Default for Operand {
    fn default() -> Operand {
        Operand::unused()
    }
}
