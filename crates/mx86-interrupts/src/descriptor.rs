/// Gate type carried by an `InterruptDescriptor`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DescriptorType {
    #[default]
    None,
    Task,
    Interrupt,
    Trap,
}

/// One entry of the interrupt descriptor table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InterruptDescriptor {
    pub present: bool,
    pub dpl: u8,
    pub gate_size: u8,
    pub descriptor_type: DescriptorType,
    pub segment_selector: u16,
    pub offset: u32,
}

impl InterruptDescriptor {
    pub const fn as_none() -> InterruptDescriptor {
        InterruptDescriptor {
            present: false,
            dpl: 0,
            gate_size: 0,
            descriptor_type: DescriptorType::None,
            segment_selector: 0,
            offset: 0,
        }
    }

    pub const fn as_task(dpl: u8, segment_selector: u16) -> InterruptDescriptor {
        InterruptDescriptor {
            present: true,
            dpl,
            gate_size: 32,
            descriptor_type: DescriptorType::Task,
            segment_selector,
            offset: 0,
        }
    }

    pub const fn as_interrupt(dpl: u8, gate_size: u8, segment_selector: u16, offset: u32) -> InterruptDescriptor {
        InterruptDescriptor {
            present: true,
            dpl,
            gate_size,
            descriptor_type: DescriptorType::Interrupt,
            segment_selector,
            offset,
        }
    }

    pub const fn as_trap(dpl: u8, gate_size: u8, segment_selector: u16, offset: u32) -> InterruptDescriptor {
        InterruptDescriptor {
            present: true,
            dpl,
            gate_size,
            descriptor_type: DescriptorType::Trap,
            segment_selector,
            offset,
        }
    }
}

impl Default for InterruptDescriptor {
    fn default() -> InterruptDescriptor {
        InterruptDescriptor::as_none()
    }
}
