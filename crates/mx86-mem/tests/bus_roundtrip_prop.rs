//! `write` followed by `read` at the same address/size round-trips for
//! every region of the flat address space (spec.md §8's push/pop round-trip
//! law, generalized to the `Bus` primitive both stack and memory opcodes
//! build on).

use mx86_mem::{Bus, FlatMemory, IoPorts};
use mx86_types::OpSize;
use proptest::prelude::*;

const RAM_POS: u32 = 0x2000;
const RAM_LEN: u32 = 64;

fn memory() -> FlatMemory {
    FlatMemory::new(0, Vec::new(), 0x1000, vec![0; 16], RAM_POS, vec![0; RAM_LEN as usize], 0x3000, 16)
}

fn any_size() -> impl Strategy<Value = OpSize> {
    prop_oneof![Just(OpSize::Byte), Just(OpSize::Word), Just(OpSize::Dword)]
}

proptest! {
    #[test]
    fn ram_write_then_read_round_trips(
        offset in 0u32..(RAM_LEN - 4),
        value in any::<u32>(),
        size in any_size(),
    ) {
        let mut mem = memory();
        let addr = RAM_POS + offset;
        mem.write(addr, value, size).unwrap();
        let expected = value & size.mask().unwrap();
        prop_assert_eq!(mem.read(addr, size).unwrap(), expected);
    }

    #[test]
    fn io_port_write_then_read_round_trips(
        port in 0u32..124,
        value in any::<u32>(),
        size in any_size(),
    ) {
        let mut io = IoPorts::new();
        io.write_port(port, value, size).unwrap();
        let expected = value & size.mask().unwrap();
        prop_assert_eq!(io.read_port(port, size).unwrap(), expected);
    }
}
