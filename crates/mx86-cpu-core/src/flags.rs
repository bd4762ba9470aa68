//! EFLAGS and CR0 bit-flag models, plus the flag-derivation helpers the
//! arithmetic opcode table calls after every computation.

use mx86_types::OpSize;

use crate::alu;

bitflags::bitflags! {
    /// Processor status + system flags register. Reserved bit 1 is always
    /// set; nothing in this engine ever clears it.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct Eflags: u32 {
        const CF    = 1 << 0;
        const RESERVED1 = 1 << 1;
        const PF    = 1 << 2;
        const AF    = 1 << 4;
        const ZF    = 1 << 6;
        const SF    = 1 << 7;
        const TF    = 1 << 8;
        const IF    = 1 << 9;
        const DF    = 1 << 10;
        const OF    = 1 << 11;
        const IOPL  = 0b11 << 12;
        const NT    = 1 << 14;
        const RF    = 1 << 16;
        const VM    = 1 << 17;
        const AC    = 1 << 18;
        const VIF   = 1 << 19;
        const VIP   = 1 << 20;
        const ID    = 1 << 21;
    }
}

impl Eflags {
    pub const DEFAULT_VALUE: u32 = 0b10;

    pub fn read_iopl(&self) -> u8 {
        ((self.bits() & Self::IOPL.bits()) >> 12) as u8
    }

    pub fn set_iopl(&mut self, level: u8) {
        let cleared = self.bits() & !Self::IOPL.bits();
        *self = Eflags::from_bits_truncate(cleared | (((level & 0b11) as u32) << 12));
    }

    pub fn update_sign_flag(&mut self, result: u32, size: OpSize) {
        self.set(Eflags::SF, alu::check_is_negative(result, size));
    }

    pub fn update_zero_flag(&mut self, result: u32) {
        self.set(Eflags::ZF, alu::check_equal_zero(result));
    }

    pub fn update_parity_flag(&mut self, result: u32) {
        self.set(Eflags::PF, alu::check_parity(result));
    }

    /// `carry_or_borrow` is the ALU's own `carry_out` (add) or `borrow_out`
    /// (sub, with `borrow_in = false`) — both already match the definition
    /// CF needs, so this just stores it.
    pub fn update_carry_flag(&mut self, carry_or_borrow: bool) {
        self.set(Eflags::CF, carry_or_borrow);
    }

    pub fn update_overflow_flag(&mut self, op1: u32, op2: u32, result: u32, size: OpSize, is_sub: bool) {
        let op2_effective = if is_sub { alu::negate(op2, size) } else { op2 };
        let s1 = alu::check_is_negative(op1, size);
        let s2 = alu::check_is_negative(op2_effective, size);
        let sr = alu::check_is_negative(result, size);
        self.set(Eflags::OF, (s1 == s2) && (sr != s1));
    }

    pub fn update_adjust_flag(&mut self, op1: u32, op2: u32, is_sub: bool) {
        let a = op1 & 0xF;
        let b = op2 & 0xF;
        let af = if is_sub { a < b } else { a + b > 0xF };
        self.set(Eflags::AF, af);
    }

    #[allow(clippy::too_many_arguments)]
    pub fn update_status_flags(
        &mut self,
        op1: u32,
        op2: u32,
        result: u32,
        size: OpSize,
        carry_or_borrow: bool,
        is_sub: bool,
    ) {
        self.update_carry_flag(carry_or_borrow);
        self.update_overflow_flag(op1, op2, result, size, is_sub);
        self.update_adjust_flag(op1, op2, is_sub);
        self.update_sign_flag(result, size);
        self.update_zero_flag(result);
        self.update_parity_flag(result);
    }

    /// Names of every set, named flag bit, for diagnostics.
    pub fn print(&self) -> String {
        let names: &[(Eflags, &str)] = &[
            (Eflags::CF, "CF"),
            (Eflags::PF, "PF"),
            (Eflags::AF, "AF"),
            (Eflags::ZF, "ZF"),
            (Eflags::SF, "SF"),
            (Eflags::TF, "TF"),
            (Eflags::IF, "IF"),
            (Eflags::DF, "DF"),
            (Eflags::OF, "OF"),
            (Eflags::NT, "NT"),
            (Eflags::RF, "RF"),
            (Eflags::VM, "VM"),
            (Eflags::AC, "AC"),
            (Eflags::VIF, "VIF"),
            (Eflags::VIP, "VIP"),
            (Eflags::ID, "ID"),
        ];
        names
            .iter()
            .filter(|(flag, _)| self.contains(*flag))
            .map(|(_, name)| *name)
            .collect::<Vec<_>>()
            .join(",")
    }
}

impl Default for Eflags {
    fn default() -> Eflags {
        Eflags::from_bits_truncate(Eflags::DEFAULT_VALUE)
    }
}

bitflags::bitflags! {
    /// Control register 0. Only the bits this engine models are named;
    /// the rest of the 32-bit cell reads back as whatever was last written.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct Cr0: u32 {
        const PE = 1 << 0;
        const MP = 1 << 1;
        const EM = 1 << 2;
        const TS = 1 << 3;
        const ET = 1 << 4;
        const PG = 1 << 31;
    }
}

impl Default for Cr0 {
    fn default() -> Cr0 {
        Cr0::empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_has_only_reserved_bit_set() {
        assert_eq!(Eflags::default().bits(), 0b10);
    }

    #[test]
    fn overflow_flag_matches_add_int32_max_plus_one() {
        let mut flags = Eflags::default();
        let (result, carry) = alu::add(0x7FFF_FFFF, 1, false, OpSize::Dword);
        flags.update_status_flags(0x7FFF_FFFF, 1, result, OpSize::Dword, carry, false);
        assert!(flags.contains(Eflags::OF));
        assert!(!flags.contains(Eflags::CF));
        assert!(flags.contains(Eflags::SF));
    }

    #[test]
    fn overflow_flag_matches_sub_zero_minus_one() {
        let mut flags = Eflags::default();
        let (result, borrow) = alu::sub(0, 1, false, OpSize::Dword);
        flags.update_status_flags(0, 1, result, OpSize::Dword, borrow, true);
        assert!(flags.contains(Eflags::CF));
        assert!(!flags.contains(Eflags::OF));
    }
}
