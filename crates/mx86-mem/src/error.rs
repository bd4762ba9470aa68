use thiserror::Error;

/// Failures raised by the memory and I/O abstractions.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum MemoryError {
    #[error("read out of bounds at {address:#010x} (size {size})")]
    OutOfBounds { address: u32, size: u32 },

    #[error("write to protected region {region} at {address:#010x}")]
    WriteProtected { address: u32, region: &'static str },

    #[error("instruction fetch out of bounds at index {index}")]
    NoSuchInstruction { index: u32 },

    #[error("port {port} out of range for the I/O buffer")]
    InvalidPort { port: u32 },

    #[error("unresolved operand size for a memory access")]
    UnknownSize,
}
