/// Broad dispatch category the engine's interrupt stub switches on. Separate
/// from `DescriptorType`, which describes the IDT *entry*; this describes
/// the *interrupt itself*.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InterruptKind {
    Fault,
    Trap,
    Abort,
    User,
}

/// A named, vectored interrupt/exception.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Interrupt {
    pub vector: u8,
    pub kind: InterruptKind,
    pub mnemonic: &'static str,
}

macro_rules! interrupt {
    ($name:ident, $vector:expr, $kind:expr, $mnemonic:expr) => {
        pub const $name: Interrupt = Interrupt {
            vector: $vector,
            kind: $kind,
            mnemonic: $mnemonic,
        };
    };
}

interrupt!(DIVIDE_ERROR, 0, InterruptKind::Fault, "#DE");
interrupt!(DEBUG_EXCEPTION, 1, InterruptKind::Fault, "#DB");
interrupt!(BREAKPOINT, 3, InterruptKind::Trap, "#BP");
interrupt!(OVERFLOW_EXCEPTION, 4, InterruptKind::Trap, "#OF");
interrupt!(BOUND_EXCEPTION, 5, InterruptKind::Fault, "#BR");
interrupt!(OPCODE_EXCEPTION, 6, InterruptKind::Fault, "#UD");
interrupt!(DOUBLE_FAULT, 8, InterruptKind::Abort, "#DF");
interrupt!(INVALID_TASK_SWITCH, 10, InterruptKind::Fault, "#TS");
interrupt!(SEGMENT_NOT_PRESENT, 11, InterruptKind::Fault, "#NP");
interrupt!(STACK_FAULT, 12, InterruptKind::Fault, "#SS");
interrupt!(GENERAL_PROTECTION, 13, InterruptKind::Fault, "#GP");
interrupt!(PAGE_FAULT, 14, InterruptKind::Fault, "#PF");
interrupt!(FLOATING_POINT_ERROR, 16, InterruptKind::Fault, "#MF");
interrupt!(ALIGNMENT_ERROR, 17, InterruptKind::Fault, "#AC");
