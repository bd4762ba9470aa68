use crate::op_size::OpSize;

/// Architectural register identifier.
///
/// Declaration order matters: the register file and the effective-address
/// computation both rely on ordered comparisons (`reg <= Register::Edi`,
/// `reg >= Register::Cs`) to classify an identifier into its storage bank,
/// exactly as the general-purpose / 16-bit / 8-bit-low / 8-bit-high /
/// segment / control groupings are laid out below. Don't reorder variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize)]
#[repr(u8)]
pub enum Register {
    Eax,
    Ecx,
    Edx,
    Ebx,
    Esp,
    Ebp,
    Esi,
    Edi,
    Ax,
    Cx,
    Dx,
    Bx,
    Sp,
    Bp,
    Si,
    Di,
    Al,
    Cl,
    Dl,
    Bl,
    Ah,
    Ch,
    Dh,
    Bh,
    Cs,
    Ss,
    Ds,
    Es,
    Fs,
    Gs,
    Cr0,
    Cr1,
}

impl Register {
    /// Index (0..=7) into the eight-cell general-purpose bank, shared by
    /// all three views (EAX/AX/AL and EDI/DI/BL/BH etc. alias the same
    /// backing cell).
    pub const fn general_index(self) -> Option<usize> {
        use Register::*;
        Some(match self {
            Eax | Ax | Al | Ah => 0,
            Ecx | Cx | Cl | Ch => 1,
            Edx | Dx | Dl | Dh => 2,
            Ebx | Bx | Bl | Bh => 3,
            Esp | Sp => 4,
            Ebp | Bp => 5,
            Esi | Si => 6,
            Edi | Di => 7,
            _ => return None,
        })
    }

    /// Index into the six-cell segment bank (CS..GS).
    pub const fn segment_index(self) -> Option<usize> {
        use Register::*;
        Some(match self {
            Cs => 0,
            Ss => 1,
            Ds => 2,
            Es => 3,
            Fs => 4,
            Gs => 5,
            _ => return None,
        })
    }

    /// Index into the two-cell control-register bank (CR0, CR1).
    pub const fn control_index(self) -> Option<usize> {
        use Register::*;
        Some(match self {
            Cr0 => 0,
            Cr1 => 1,
            _ => return None,
        })
    }

    pub const fn is_general_purpose(self) -> bool {
        self.general_index().is_some()
    }

    pub const fn is_segment(self) -> bool {
        self.segment_index().is_some()
    }

    pub const fn is_control(self) -> bool {
        self.control_index().is_some()
    }

    /// Whether this identifier names the high byte of a general-purpose
    /// cell (AH/CH/DH/BH) — these need a shift as well as a mask.
    pub const fn is_high_byte(self) -> bool {
        matches!(self, Register::Ah | Register::Ch | Register::Dh | Register::Bh)
    }

    /// Natural width this identifier addresses. Segment registers are
    /// always word-sized and control registers are always dword-sized,
    /// regardless of the instruction's size override (§3).
    pub const fn natural_size(self) -> OpSize {
        use Register::*;
        match self {
            Eax | Ecx | Edx | Ebx | Esp | Ebp | Esi | Edi => OpSize::Dword,
            Ax | Cx | Dx | Bx | Sp | Bp | Si | Di => OpSize::Word,
            Al | Cl | Dl | Bl | Ah | Ch | Dh | Bh => OpSize::Byte,
            Cs | Ss | Ds | Es | Fs | Gs => OpSize::Word,
            Cr0 | Cr1 => OpSize::Dword,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn general_purpose_views_share_one_index_per_letter() {
        assert_eq!(Register::Eax.general_index(), Register::Ax.general_index());
        assert_eq!(Register::Eax.general_index(), Register::Al.general_index());
        assert_eq!(Register::Eax.general_index(), Register::Ah.general_index());
        assert_eq!(Register::Edi.general_index(), Some(7));
    }

    #[test]
    fn ordering_matches_the_documented_bank_layout() {
        assert!(Register::Eax < Register::Edi);
        assert!(Register::Edi < Register::Ax);
        assert!(Register::Di < Register::Al);
        assert!(Register::Bl < Register::Ah);
        assert!(Register::Bh < Register::Cs);
        assert!(Register::Gs < Register::Cr0);
    }

    #[test]
    fn only_ah_family_is_flagged_high_byte() {
        assert!(Register::Ah.is_high_byte());
        assert!(!Register::Al.is_high_byte());
        assert!(!Register::Eax.is_high_byte());
    }
}
