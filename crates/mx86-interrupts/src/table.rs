use crate::descriptor::InterruptDescriptor;

/// Minimum number of vectors a table must provide, matching the Intel
/// reserved range (0..=31) plus headroom for user vectors.
pub const MIN_LENGTH: usize = 32;

/// Vector → descriptor lookup. Entries are borrowed from whatever memory
/// region backs the table rather than owned by this view, per the design
/// note that IDT contents are borrowed and should be expressed as an
/// indexed view.
#[derive(Debug, Clone, Copy)]
pub struct InterruptDescriptorTable<'a> {
    entries: &'a [InterruptDescriptor],
    limit: u32,
}

impl<'a> InterruptDescriptorTable<'a> {
    /// `entries.len()` must be at least [`MIN_LENGTH`]; `limit` is the
    /// highest valid vector index (inclusive), independent of the slice
    /// length so a table can expose fewer usable vectors than it has
    /// storage for.
    pub fn new(entries: &'a [InterruptDescriptor], limit: u32) -> InterruptDescriptorTable<'a> {
        debug_assert!(entries.len() >= MIN_LENGTH);
        InterruptDescriptorTable { entries, limit }
    }

    pub fn limit(&self) -> u32 {
        self.limit
    }

    /// `None` if `vector` exceeds the table's limit or its backing slice.
    pub fn get_descriptor(&self, vector: u8) -> Option<&InterruptDescriptor> {
        if vector as u32 > self.limit {
            return None;
        }
        self.entries.get(vector as usize)
    }
}
