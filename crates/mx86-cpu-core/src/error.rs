use mx86_interrupts::Interrupt;
use mx86_mem::MemoryError;
use thiserror::Error;

/// Structured failure raised while executing one instruction. A raised
/// error aborts that instruction and terminates the run loop — there is
/// no retry and no partial-progress rollback.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CpuError {
    #[error("inconsistent instruction at EIP={eip}: {reason}")]
    BadInstruction { eip: u32, reason: String },

    #[error("unknown opcode at EIP={eip}")]
    UnknownInstruction { eip: u32 },

    #[error("{what} is not implemented (EIP={eip})")]
    NotImplemented { eip: u32, what: String },

    #[error("processor exception {mnemonic} (vector {vector}) at EIP={eip}")]
    ProcessorException { eip: u32, vector: u8, mnemonic: &'static str },

    #[error("register exception: {reason}")]
    RegisterException { reason: String },

    #[error("memory exception: {0}")]
    MemoryException(#[from] MemoryError),
}

impl CpuError {
    pub fn processor_exception(eip: u32, interrupt: &Interrupt) -> CpuError {
        CpuError::ProcessorException { eip, vector: interrupt.vector, mnemonic: interrupt.mnemonic }
    }

    /// EIP the failing instruction was fetched from, when the variant
    /// carries one. `mx86-cli` uses this to re-fetch that instruction and
    /// decide whether an `Int` reaching here is the harness's "program end"
    /// convention rather than a genuine error.
    pub fn eip(&self) -> Option<u32> {
        match *self {
            CpuError::BadInstruction { eip, .. }
            | CpuError::UnknownInstruction { eip }
            | CpuError::NotImplemented { eip, .. }
            | CpuError::ProcessorException { eip, .. } => Some(eip),
            CpuError::RegisterException { .. } | CpuError::MemoryException(_) => None,
        }
    }
}

/// Clean (non-error) reasons the run loop can stop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStop {
    Halted,
    MaxCycles,
}
