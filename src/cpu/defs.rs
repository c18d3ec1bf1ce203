//! Definitions used to describe instruction encodings.
//!
//! The operand descriptors follow the notation of the Intel manual, volume 2,
//! appendix A ("Opcode Map"), restricted to what the opcode tables need.

use cpu::code::Code;
use cpu::memsize::MemorySize;
use cpu::register::RegisterKind;

use std::fmt;

/// The opcode map selected by the escape bytes (or the VEX/EVEX map field).
#[derive(Debug, PartialEq, Eq, Hash, Copy, Clone)]
pub enum OpcodeMap {
    /// One-byte opcodes, no escape.
    Primary,
    /// `0F xx`
    Map0F,
    /// `0F 38 xx`
    Map0F38,
    /// `0F 3A xx`
    Map0F3A,
}

impl fmt::Display for OpcodeMap {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(match self {
            OpcodeMap::Primary => "",
            OpcodeMap::Map0F => "0F ",
            OpcodeMap::Map0F38 => "0F38 ",
            OpcodeMap::Map0F3A => "0F3A ",
        })
    }
}

/// Operand or address size attribute.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum OpSize {
    Bits16,
    Bits32,
    Bits64,
}

impl OpSize {
    /// The general purpose register file of this width.
    pub fn gpr(&self) -> RegisterKind {
        match self {
            OpSize::Bits16 => RegisterKind::Gpr16,
            OpSize::Bits32 => RegisterKind::Gpr32,
            OpSize::Bits64 => RegisterKind::Gpr64,
        }
    }

    pub fn bytes(&self) -> u8 {
        match self {
            OpSize::Bits16 => 2,
            OpSize::Bits32 => 4,
            OpSize::Bits64 => 8,
        }
    }
}

/// Where an operand comes from, and which register file it selects.
///
/// According to "A.2.1 Codes for Addressing Method", with the register file
/// already fixed by the template (the "operand type" of the manual).
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum OperandSpec {
    /// `G`, `P`, `V` - the reg field of the ModR/M byte selects a register.
    Reg(RegisterKind),
    /// `E`, `Q`, `W` - ModR/M specifies either a register or a memory
    /// location.
    Rm(RegisterKind),
    /// `M` - ModR/M may only refer to memory.
    Mem,
    /// `B`, `H` - the VEX/EVEX `vvvv` field selects a register.
    Vvvv(RegisterKind),
    /// `Ib` - an 8-bit immediate follows the ModR/M operand bytes.
    Imm8,
}

/// EVEX tuple type, used to compute the `N` in compressed `disp8*N`
/// displacements.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum TupleType {
    /// Not an EVEX instruction, displacements are not scaled.
    None,
    /// Full vector, or a single element when broadcasting.
    Full,
    /// Full vector, no broadcast.
    FullMem,
    /// A single scalar element.
    Scalar,
}

/// Which EVEX masking features an instruction accepts.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum MaskSupport {
    /// No opmask (`aaa` must be 0).
    None,
    /// `{k1}`, merge masking only.
    Merge,
    /// `{k1}{z}`, merge or zeroing masking.
    MergeZero,
}

/// How an instruction interprets EVEX.b on register operands.
///
/// None of the opcodes in `cpu::table` take `{er}` or `{sae}`, so their
/// templates all use `None`. `Rounding` and `Sae` describe the other EVEX
/// instruction classes and are handled by `vector::interpret_b`.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum RegisterB {
    /// `b` must be 0 for register forms.
    None,
    /// `{er}` static rounding, `L'L` holds the rounding mode.
    Rounding,
    /// `{sae}`, suppress all exceptions.
    Sae,
}

/// Everything the decoder needs to know about one instruction encoding.
///
/// Templates are leaves of the static opcode tables in `cpu::table`.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Template {
    pub code: Code,
    /// Operands in Intel order.
    pub operands: &'static [OperandSpec],
    /// Size of the memory operand when it is not broadcast.
    pub memory: MemorySize,
    /// Size of a broadcast memory operand, `Unknown` if broadcasting is not
    /// supported.
    pub broadcast: MemorySize,
    pub tuple: TupleType,
    pub mask: MaskSupport,
    pub register_b: RegisterB,
    /// Whether the `lock` prefix is allowed on the memory form.
    pub lockable: bool,
}

impl Template {
    /// Whether the template references the `vvvv` field.
    pub fn uses_vvvv(&self) -> bool {
        self.operands.iter().any(|op| match op {
            OperandSpec::Vvvv(_) => true,
            _ => false,
        })
    }

    pub fn supports_broadcast(&self) -> bool {
        self.broadcast != MemorySize::Unknown
    }

    /// Returns the `N` of compressed displacements for a memory operand.
    pub fn disp8_scale(&self, broadcast: bool) -> u32 {
        match self.tuple {
            TupleType::None => 1,
            TupleType::Full if broadcast => self.broadcast.element_size() as u32,
            TupleType::Full | TupleType::FullMem | TupleType::Scalar => self.memory.size() as u32,
        }
    }
}
