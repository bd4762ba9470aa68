//! Interrupt descriptor table model: the descriptor shape, the well-known
//! exception catalog, the error-code encoding, and a borrowed-view table
//! type. The engine's actual fault/trap dispatch lives in `mx86-cpu-core`;
//! this crate only models the static IDT data structure.

mod catalog;
mod descriptor;
mod error_code;
mod table;

pub use catalog::{
    Interrupt, InterruptKind, ALIGNMENT_ERROR, BOUND_EXCEPTION, BREAKPOINT, DEBUG_EXCEPTION,
    DIVIDE_ERROR, DOUBLE_FAULT, FLOATING_POINT_ERROR, GENERAL_PROTECTION, INVALID_TASK_SWITCH,
    OPCODE_EXCEPTION, OVERFLOW_EXCEPTION, PAGE_FAULT, SEGMENT_NOT_PRESENT, STACK_FAULT,
};
pub use descriptor::{DescriptorType, InterruptDescriptor};
pub use error_code::error_code;
pub use table::{InterruptDescriptorTable, MIN_LENGTH};
