//! Shared vocabulary for the pre-decoded instruction model: operand widths
//! and sources, register identifiers, opcodes, and the `Inst`/`InstData`
//! records the execution engine consumes. No behavior lives here — just
//! the types every other crate builds on.

mod inst;
mod op_size;
mod op_type;
mod opcode;
mod operand;
mod register;

pub use inst::{Inst, InstData};
pub use op_size::OpSize;
pub use op_type::OpType;
pub use opcode::{Opcode, OpcodeClass, RepPrefix, JMP, NOT_ARITHMETIC, STATE_MACHINE, STR};
pub use operand::Operand;
pub use register::Register;
