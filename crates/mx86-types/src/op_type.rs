/// Where an operand's value lives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum OpType {
    /// Operand is a register identifier.
    Reg,
    /// Operand resides at the computed effective address.
    Mem,
    /// Operand value is the instruction's immediate field.
    Imm,
    /// Operand value is the instruction's address field, used literally.
    ImmMem,
}
