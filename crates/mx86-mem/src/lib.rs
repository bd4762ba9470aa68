//! The flat 32-bit address space, the I/O port buffer, and the loaders for
//! the three external file formats (memory map, memory contents, packed
//! instruction stream) plus the tooling-only instructions-map format.

mod bus;
mod error;
mod flat_memory;
mod io_ports;
mod loader;

pub use bus::Bus;
pub use error::MemoryError;
pub use flat_memory::FlatMemory;
pub use io_ports::{IoPorts, IO_PORT_COUNT};
pub use loader::{decode_instructions, load_program, parse_instructions_map, parse_memory_map, LoaderError, MemoryMap};
