//! x86 register definitions.

use num_traits::FromPrimitive;
use std::fmt;

/// An enumeration of every register the decoder can produce.
///
/// Registers of one kind are laid out contiguously and in encoding order, so
/// the register selected by a 3, 4 or 5-bit register number is found by adding
/// the number to the first register of its class (see `RegisterKind`).
#[derive(Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Copy, Clone, FromPrimitive)]
#[repr(u8)]
pub enum Register {
    // 8-bit GP registers. `Ah`-`Bh` are only reachable without a REX prefix,
    // `Spl`-`Dil` only with one.
    Al, Cl, Dl, Bl, Ah, Ch, Dh, Bh,
    Spl, Bpl, Sil, Dil, R8l, R9l, R10l, R11l,
    R12l, R13l, R14l, R15l,

    // 16-bit GP registers
    Ax, Cx, Dx, Bx, Sp, Bp, Si, Di,
    R8w, R9w, R10w, R11w, R12w, R13w, R14w, R15w,

    // 32-bit GP registers
    Eax, Ecx, Edx, Ebx, Esp, Ebp, Esi, Edi,
    R8d, R9d, R10d, R11d, R12d, R13d, R14d, R15d,

    // 64-bit GP registers
    Rax, Rcx, Rdx, Rbx, Rsp, Rbp, Rsi, Rdi,
    R8, R9, R10, R11, R12, R13, R14, R15,

    /// Instruction pointers, used as the base of IP-relative memory operands.
    Eip,
    Rip,

    // Segment registers, in `Sreg` encoding order
    Es, Cs, Ss, Ds, Fs, Gs,

    // 64-bit MMX registers
    Mm0, Mm1, Mm2, Mm3, Mm4, Mm5, Mm6, Mm7,

    // 128-bit SSE registers
    Xmm0, Xmm1, Xmm2, Xmm3, Xmm4, Xmm5, Xmm6, Xmm7,
    Xmm8, Xmm9, Xmm10, Xmm11, Xmm12, Xmm13, Xmm14, Xmm15,
    Xmm16, Xmm17, Xmm18, Xmm19, Xmm20, Xmm21, Xmm22, Xmm23,
    Xmm24, Xmm25, Xmm26, Xmm27, Xmm28, Xmm29, Xmm30, Xmm31,

    // 256-bit AVX registers
    Ymm0, Ymm1, Ymm2, Ymm3, Ymm4, Ymm5, Ymm6, Ymm7,
    Ymm8, Ymm9, Ymm10, Ymm11, Ymm12, Ymm13, Ymm14, Ymm15,
    Ymm16, Ymm17, Ymm18, Ymm19, Ymm20, Ymm21, Ymm22, Ymm23,
    Ymm24, Ymm25, Ymm26, Ymm27, Ymm28, Ymm29, Ymm30, Ymm31,

    // 512-bit AVX-512 registers
    Zmm0, Zmm1, Zmm2, Zmm3, Zmm4, Zmm5, Zmm6, Zmm7,
    Zmm8, Zmm9, Zmm10, Zmm11, Zmm12, Zmm13, Zmm14, Zmm15,
    Zmm16, Zmm17, Zmm18, Zmm19, Zmm20, Zmm21, Zmm22, Zmm23,
    Zmm24, Zmm25, Zmm26, Zmm27, Zmm28, Zmm29, Zmm30, Zmm31,

    /// AVX-512 opmask registers. `K0` can not be used as a write mask.
    K0, K1, K2, K3, K4, K5, K6, K7,
}

static NAMES: [&str; 188] = [
    "al", "cl", "dl", "bl", "ah", "ch", "dh", "bh",
    "spl", "bpl", "sil", "dil", "r8b", "r9b", "r10b", "r11b",
    "r12b", "r13b", "r14b", "r15b", "ax", "cx", "dx", "bx",
    "sp", "bp", "si", "di", "r8w", "r9w", "r10w", "r11w",
    "r12w", "r13w", "r14w", "r15w", "eax", "ecx", "edx", "ebx",
    "esp", "ebp", "esi", "edi", "r8d", "r9d", "r10d", "r11d",
    "r12d", "r13d", "r14d", "r15d", "rax", "rcx", "rdx", "rbx",
    "rsp", "rbp", "rsi", "rdi", "r8", "r9", "r10", "r11",
    "r12", "r13", "r14", "r15", "eip", "rip", "es", "cs",
    "ss", "ds", "fs", "gs", "mm0", "mm1", "mm2", "mm3",
    "mm4", "mm5", "mm6", "mm7", "xmm0", "xmm1", "xmm2", "xmm3",
    "xmm4", "xmm5", "xmm6", "xmm7", "xmm8", "xmm9", "xmm10", "xmm11",
    "xmm12", "xmm13", "xmm14", "xmm15", "xmm16", "xmm17", "xmm18", "xmm19",
    "xmm20", "xmm21", "xmm22", "xmm23", "xmm24", "xmm25", "xmm26", "xmm27",
    "xmm28", "xmm29", "xmm30", "xmm31", "ymm0", "ymm1", "ymm2", "ymm3",
    "ymm4", "ymm5", "ymm6", "ymm7", "ymm8", "ymm9", "ymm10", "ymm11",
    "ymm12", "ymm13", "ymm14", "ymm15", "ymm16", "ymm17", "ymm18", "ymm19",
    "ymm20", "ymm21", "ymm22", "ymm23", "ymm24", "ymm25", "ymm26", "ymm27",
    "ymm28", "ymm29", "ymm30", "ymm31", "zmm0", "zmm1", "zmm2", "zmm3",
    "zmm4", "zmm5", "zmm6", "zmm7", "zmm8", "zmm9", "zmm10", "zmm11",
    "zmm12", "zmm13", "zmm14", "zmm15", "zmm16", "zmm17", "zmm18", "zmm19",
    "zmm20", "zmm21", "zmm22", "zmm23", "zmm24", "zmm25", "zmm26", "zmm27",
    "zmm28", "zmm29", "zmm30", "zmm31", "k0", "k1", "k2", "k3",
    "k4", "k5", "k6", "k7",
];

impl Register {
    /// Returns the lowercase assembler name of the register.
    pub fn name(&self) -> &'static str {
        NAMES[*self as usize]
    }

    /// Returns the register's size in bytes.
    pub fn size(&self) -> usize {
        match self.class() {
            RegisterKind::Gpr8 => 1,
            RegisterKind::Gpr16 | RegisterKind::Segment => 2,
            RegisterKind::Gpr32 => 4,
            RegisterKind::Ip if *self == Register::Eip => 4,
            RegisterKind::Gpr64 | RegisterKind::Ip | RegisterKind::Mm | RegisterKind::Opmask => 8,
            RegisterKind::Xmm => 16,
            RegisterKind::Ymm => 32,
            RegisterKind::Zmm => 64,
        }
    }

    /// Returns the register number inside its register file.
    ///
    /// This is the value that was encoded in the instruction, including all
    /// extension bits (`Xmm27` is 27, `R11d` is 11). The legacy high-byte
    /// registers `Ah`-`Bh` are numbered 4-7.
    pub fn number(&self) -> u8 {
        let idx = *self as u8;
        match self.class() {
            RegisterKind::Gpr8 if idx >= Register::Spl as u8 => idx - 4,
            kind => idx - kind.first() as u8,
        }
    }

    /// Returns which kind of register this is.
    pub fn class(&self) -> RegisterKind {
        use self::Register::*;

        let idx = *self as u8;
        if idx <= R15l as u8 {
            RegisterKind::Gpr8
        } else if idx <= R15w as u8 {
            RegisterKind::Gpr16
        } else if idx <= R15d as u8 {
            RegisterKind::Gpr32
        } else if idx <= R15 as u8 {
            RegisterKind::Gpr64
        } else if idx <= Rip as u8 {
            RegisterKind::Ip
        } else if idx <= Gs as u8 {
            RegisterKind::Segment
        } else if idx <= Mm7 as u8 {
            RegisterKind::Mm
        } else if idx <= Xmm31 as u8 {
            RegisterKind::Xmm
        } else if idx <= Ymm31 as u8 {
            RegisterKind::Ymm
        } else if idx <= Zmm31 as u8 {
            RegisterKind::Zmm
        } else {
            RegisterKind::Opmask
        }
    }

    /// Whether this is a general purpose register of any width.
    pub fn is_gpr(&self) -> bool {
        match self.class() {
            RegisterKind::Gpr8 | RegisterKind::Gpr16 | RegisterKind::Gpr32 | RegisterKind::Gpr64 => true,
            _ => false,
        }
    }

    /// Whether this is an SSE, AVX or AVX-512 vector register.
    pub fn is_vector(&self) -> bool {
        match self.class() {
            RegisterKind::Xmm | RegisterKind::Ymm | RegisterKind::Zmm => true,
            _ => false,
        }
    }

    /// Looks up the `n`th register of a register kind.
    ///
    /// For 8-bit registers, `rex` selects `Spl`-`Dil` over `Ah`-`Bh` for
    /// `n` in 4..8. Returns `None` if `n` is out of range for the kind.
    pub fn from_number(kind: RegisterKind, n: u8, rex: bool) -> Option<Register> {
        if n >= kind.count() {
            return None;
        }

        let idx = match kind {
            RegisterKind::Gpr8 if rex && n >= 4 => n + 4,
            RegisterKind::Gpr8 if n >= 8 => n + 4,
            _ => n,
        };
        Register::from_u8(kind.first() as u8 + idx)
    }

    /// Returns the default segment used when this register is the base of a
    /// memory operand.
    ///
    /// Stack- and frame-pointer based accesses go through `SS`, everything
    /// else through `DS`.
    pub fn default_segment(&self) -> Register {
        use self::Register::*;

        match self {
            Sp | Bp | Esp | Ebp | Rsp | Rbp => Ss,
            _ => Ds,
        }
    }
}

impl fmt::Display for Register {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// The register files an instruction operand can refer to.
#[derive(Debug, PartialEq, Eq, Copy, Clone)]
pub enum RegisterKind {
    Gpr8,
    Gpr16,
    Gpr32,
    Gpr64,
    /// `Eip` and `Rip`.
    Ip,
    Segment,
    Mm,
    Xmm,
    Ymm,
    Zmm,
    Opmask,
}

impl RegisterKind {
    /// The first register of this kind, in `Register` order.
    fn first(&self) -> Register {
        match self {
            RegisterKind::Gpr8 => Register::Al,
            RegisterKind::Gpr16 => Register::Ax,
            RegisterKind::Gpr32 => Register::Eax,
            RegisterKind::Gpr64 => Register::Rax,
            RegisterKind::Ip => Register::Eip,
            RegisterKind::Segment => Register::Es,
            RegisterKind::Mm => Register::Mm0,
            RegisterKind::Xmm => Register::Xmm0,
            RegisterKind::Ymm => Register::Ymm0,
            RegisterKind::Zmm => Register::Zmm0,
            RegisterKind::Opmask => Register::K0,
        }
    }

    /// Number of encodable registers of this kind.
    fn count(&self) -> u8 {
        match self {
            RegisterKind::Gpr8 | RegisterKind::Gpr16 | RegisterKind::Gpr32 | RegisterKind::Gpr64 => 16,
            RegisterKind::Ip => 2,
            RegisterKind::Segment => 6,
            RegisterKind::Mm | RegisterKind::Opmask => 8,
            RegisterKind::Xmm | RegisterKind::Ymm | RegisterKind::Zmm => 32,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn byte_registers() {
        assert_eq!(Register::from_number(RegisterKind::Gpr8, 4, false), Some(Register::Ah));
        assert_eq!(Register::from_number(RegisterKind::Gpr8, 4, true), Some(Register::Spl));
        assert_eq!(Register::from_number(RegisterKind::Gpr8, 7, true), Some(Register::Dil));
        assert_eq!(Register::from_number(RegisterKind::Gpr8, 8, false), Some(Register::R8l));
        assert_eq!(Register::from_number(RegisterKind::Gpr8, 15, true), Some(Register::R15l));
        assert_eq!(Register::from_number(RegisterKind::Gpr8, 16, true), None);
        assert_eq!(Register::Bh.number(), 7);
        assert_eq!(Register::Sil.number(), 6);
        assert_eq!(Register::R9l.number(), 9);
    }

    #[test]
    fn numbering() {
        assert_eq!(Register::from_number(RegisterKind::Xmm, 27, false), Some(Register::Xmm27));
        assert_eq!(Register::from_number(RegisterKind::Zmm, 31, false), Some(Register::Zmm31));
        assert_eq!(Register::from_number(RegisterKind::Opmask, 5, false), Some(Register::K5));
        assert_eq!(Register::from_number(RegisterKind::Mm, 8, false), None);
        assert_eq!(Register::R11d.number(), 11);
        assert_eq!(Register::Ymm18.number(), 18);
        assert_eq!(Register::Rsi.number(), 6);
        assert_eq!(Register::Gs.number(), 5);
    }

    #[test]
    fn classes_and_sizes() {
        assert_eq!(Register::R15l.class(), RegisterKind::Gpr8);
        assert_eq!(Register::Ax.class(), RegisterKind::Gpr16);
        assert_eq!(Register::Rip.class(), RegisterKind::Ip);
        assert_eq!(Register::K7.class(), RegisterKind::Opmask);
        assert_eq!(Register::Eip.size(), 4);
        assert_eq!(Register::Rip.size(), 8);
        assert_eq!(Register::R8w.size(), 2);
        assert_eq!(Register::Zmm0.size(), 64);
        assert!(Register::Esi.is_gpr());
        assert!(!Register::Mm3.is_gpr());
        assert!(Register::Ymm3.is_vector());
    }

    #[test]
    fn names() {
        assert_eq!(Register::R13d.to_string(), "r13d");
        assert_eq!(Register::Xmm19.to_string(), "xmm19");
        assert_eq!(Register::Spl.name(), "spl");
        assert_eq!(Register::K0.name(), "k0");
    }

    #[test]
    fn default_segments() {
        assert_eq!(Register::Bp.default_segment(), Register::Ss);
        assert_eq!(Register::Rsp.default_segment(), Register::Ss);
        assert_eq!(Register::Bx.default_segment(), Register::Ds);
        assert_eq!(Register::R13.default_segment(), Register::Ds);
    }
}
