/// Operand width, threaded through the engine's single generic pipeline.
///
/// `Unknown` shows up on operands the instruction record never populated
/// (e.g. an unused op2): callers must resolve it from context (the last
/// executed instruction's size override, in the case of push/pop) rather
/// than treating it as a fourth real width.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, serde::Serialize, serde::Deserialize)]
pub enum OpSize {
    Byte,
    Word,
    Dword,
    #[default]
    Unknown,
}

impl OpSize {
    /// Width in bits, or `None` for `Unknown`.
    pub const fn bits(self) -> Option<u32> {
        match self {
            OpSize::Byte => Some(8),
            OpSize::Word => Some(16),
            OpSize::Dword => Some(32),
            OpSize::Unknown => None,
        }
    }

    /// Width in bytes, or `None` for `Unknown`.
    pub const fn bytes(self) -> Option<u32> {
        match self.bits() {
            Some(bits) => Some(bits / 8),
            None => None,
        }
    }

    /// Mask covering exactly this many low bits, or `None` for `Unknown`.
    pub const fn mask(self) -> Option<u32> {
        match self {
            OpSize::Byte => Some(0xFF),
            OpSize::Word => Some(0xFFFF),
            OpSize::Dword => Some(0xFFFF_FFFF),
            OpSize::Unknown => None,
        }
    }

    /// Resolve from the two size-override bits on `Inst`: byte override wins
    /// over word override, which wins over the default dword.
    pub const fn from_overrides(byte_override: bool, word_override: bool) -> OpSize {
        if byte_override {
            OpSize::Byte
        } else if word_override {
            OpSize::Word
        } else {
            OpSize::Dword
        }
    }
}
