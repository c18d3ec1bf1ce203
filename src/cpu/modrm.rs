//! Mod-Reg-R/M and SIB decoding.

use cpu::cursor::ByteCursor;
use cpu::decode::DecoderError;
use cpu::defs::OpSize;
use cpu::instr::MemoryOperand;
use cpu::memsize::MemorySize;
use cpu::prefix::Rex;
use cpu::register::{Register, RegisterKind};

/// A Mod-Reg-R/M byte (also called Mod-R/M).
///
/// This is used by many opcodes to define their source and destination operands
/// and, if present, follows right after the opcode bytes.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct ModRegRm(pub u8);

impl ModRegRm {
    /// Get the addressing mode, specified by the `Mod` field.
    ///
    /// This influences the interpretation of the `R/M` field.
    pub fn addressing_mode(&self) -> AddressingMode {
        match self.0 >> 6 {
            0b00 => AddressingMode::RegIndirect,
            0b01 => AddressingMode::OneByteDisplacement,
            0b10 => AddressingMode::FullDisplacement,
            _ => AddressingMode::Register,
        }
    }

    /// Whether the R/M field names a register instead of memory.
    pub fn is_register(&self) -> bool {
        self.addressing_mode() == AddressingMode::Register
    }

    /// Gets the raw value of the `Reg` field.
    ///
    /// Group opcodes use it as an opcode extension.
    pub fn reg_raw(&self) -> u8 {
        (self.0 & 0b00111000) >> 3
    }

    /// Returns the raw R/M field value.
    pub fn rm_raw(&self) -> u8 {
        self.0 & 0b111
    }
}

/// The possible values of the Mod-Reg-R/M bytes Mod field.
///
/// For all addressing modes except `Register`, if `R/M == 0b100` in 32- and
/// 64-bit addressing, an SIB byte follows the Mod-R/M byte and replaces the
/// base address (the displacement is still applied to the SIB-determined
/// address). 16-bit addressing never uses an SIB byte.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum AddressingMode {
    /// `00` - Operand is in memory, its effective address is a register.
    ///
    /// If `R/M == 0b101` (`0b110` with 16-bit addressing), a full-width
    /// displacement follows instead of using a base register.
    RegIndirect,

    /// `01` - Same as `RegIndirect`, but followed by a 1-byte/8-bit signed
    /// displacement added to the effective address.
    OneByteDisplacement,

    /// `10` - Same as `RegIndirect`, but followed by a 16-bit (16-bit
    /// addressing) or 32-bit signed displacement.
    FullDisplacement,

    /// `11` - Register-register op, no memory access. R/M is interpreted just
    /// like Reg.
    Register,
}

/// Register number extensions from a REX, VEX or EVEX prefix.
///
/// Each field holds the value added to the 3-bit register number found in the
/// ModR/M or SIB byte.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub struct Extensions {
    /// `R` (+8) and EVEX `R'` (+16), extends ModR/M.reg.
    pub reg: u8,
    /// `X` (+8), extends SIB.index.
    pub index: u8,
    /// `B` (+8), extends ModR/M.rm and SIB.base.
    pub base: u8,
    /// EVEX `X` (+16), extends ModR/M.rm when it names a vector register.
    pub rm_vector: u8,
    /// Whether any REX prefix is present. Selects `SPL`-`DIL` over `AH`-`BH`.
    pub rex: bool,
}

impl Extensions {
    pub fn from_rex(rex: Option<Rex>) -> Self {
        match rex {
            None => Extensions::default(),
            Some(rex) => Extensions {
                reg: if rex.r() { 8 } else { 0 },
                index: if rex.x() { 8 } else { 0 },
                base: if rex.b() { 8 } else { 0 },
                rm_vector: 0,
                rex: true,
            },
        }
    }
}

/// Resolves the register selected by the `Reg` field.
///
/// MMX, opmask and segment registers are never extended.
pub fn reg_operand(modrm: ModRegRm, kind: RegisterKind, ext: &Extensions) -> Result<Register, DecoderError> {
    let extension = match kind {
        RegisterKind::Xmm | RegisterKind::Ymm | RegisterKind::Zmm => ext.reg,
        RegisterKind::Gpr8 | RegisterKind::Gpr16 | RegisterKind::Gpr32 | RegisterKind::Gpr64 => ext.reg & 8,
        _ => 0,
    };
    Register::from_number(kind, modrm.reg_raw() + extension, ext.rex)
        .ok_or_else(|| DecoderError::invalid_operands("reg field out of range"))
}

/// Resolves the register selected by the `R/M` field when `Mod == 11`.
pub fn rm_register(modrm: ModRegRm, kind: RegisterKind, ext: &Extensions) -> Result<Register, DecoderError> {
    let extension = match kind {
        RegisterKind::Xmm | RegisterKind::Ymm | RegisterKind::Zmm => ext.base + ext.rm_vector,
        RegisterKind::Gpr8 | RegisterKind::Gpr16 | RegisterKind::Gpr32 | RegisterKind::Gpr64 => ext.base,
        _ => 0,
    };
    Register::from_number(kind, modrm.rm_raw() + extension, ext.rex)
        .ok_or_else(|| DecoderError::invalid_operands("r/m field out of range"))
}

/// Context needed to decode a memory operand.
#[derive(Debug, Copy, Clone)]
pub struct Addressing {
    pub address_size: OpSize,
    /// Segment override prefix.
    pub segment: Option<Register>,
    pub ext: Extensions,
    /// Whether the CPU is in 64-bit mode, which turns `disp32` into
    /// IP-relative addressing.
    pub long_mode: bool,
    /// Multiplier for 8-bit displacements (EVEX `disp8*N`), 1 otherwise.
    pub disp8_scale: u32,
}

/// A decoded memory operand and where its displacement was encoded.
#[derive(Debug, Clone, PartialEq)]
pub struct MemoryRead {
    pub operand: MemoryOperand,
    /// Offset of the displacement from the instruction start. Only meaningful
    /// if `operand.displ_size != 0`.
    pub displacement_offset: u8,
}

/// Reads additional addressing mode data from the stream, as specified in
/// a Mod-Reg-R/M byte, and builds the memory operand.
///
/// Must not be called for register operands (`Mod == 11`).
pub fn read_memory(
    cursor: &mut ByteCursor,
    modrm: ModRegRm,
    addr: &Addressing,
    size: MemorySize,
) -> Result<MemoryRead, DecoderError> {
    if modrm.is_register() {
        return Err(DecoderError::invalid_operands("expected memory operand"));
    }

    let (base, index, scale, disp_mode) = if addr.address_size == OpSize::Bits16 {
        addressing16(modrm)
    } else {
        addressing32(cursor, modrm, addr)?
    };

    let displacement_offset = cursor.instruction_len() as u8;
    let (displacement, displ_size) = read_disp(cursor, disp_mode, addr)?;

    let segment = addr.segment
        .unwrap_or_else(|| base.map(|base| base.default_segment()).unwrap_or(Register::Ds));

    Ok(MemoryRead {
        operand: MemoryOperand {
            size,
            segment,
            base,
            index,
            scale,
            displacement,
            displ_size,
            address_size: addr.address_size.bytes(),
        },
        displacement_offset,
    })
}

/// Where the displacement of a memory operand comes from.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
enum DispMode {
    None,
    Disp8,
    Disp16,
    Disp32,
}

/// The 8 base/index combinations of 16-bit addressing.
fn addressing16(modrm: ModRegRm) -> (Option<Register>, Option<Register>, u8, DispMode) {
    use cpu::register::Register::*;

    let mode = modrm.addressing_mode();
    let (base, index) = match modrm.rm_raw() {
        0b000 => (Some(Bx), Some(Si)),
        0b001 => (Some(Bx), Some(Di)),
        0b010 => (Some(Bp), Some(Si)),
        0b011 => (Some(Bp), Some(Di)),
        0b100 => (Some(Si), None),
        0b101 => (Some(Di), None),
        0b110 if mode == AddressingMode::RegIndirect => (None, None),
        0b110 => (Some(Bp), None),
        _ => (Some(Bx), None),
    };
    let disp_mode = match mode {
        AddressingMode::RegIndirect if base.is_none() => DispMode::Disp16,
        AddressingMode::OneByteDisplacement => DispMode::Disp8,
        AddressingMode::FullDisplacement => DispMode::Disp16,
        _ => DispMode::None,
    };

    (base, index, 1, disp_mode)
}

/// 32- and 64-bit addressing, optionally through an SIB byte.
fn addressing32(
    cursor: &mut ByteCursor,
    modrm: ModRegRm,
    addr: &Addressing,
) -> Result<(Option<Register>, Option<Register>, u8, DispMode), DecoderError> {
    let mode = modrm.addressing_mode();
    let gpr = addr.address_size.gpr();
    let full_disp = match mode {
        AddressingMode::RegIndirect => DispMode::None,
        AddressingMode::OneByteDisplacement => DispMode::Disp8,
        _ => DispMode::Disp32,
    };

    if modrm.rm_raw() == 0b100 {
        let sib = Sib::decode(cursor.read()?, mode, gpr, &addr.ext)?;
        let disp_mode = if sib.forced_disp32 { DispMode::Disp32 } else { full_disp };
        return Ok((sib.base, sib.index, sib.scale_val, disp_mode));
    }

    if mode == AddressingMode::RegIndirect && modrm.rm_raw() == 0b101 {
        // disp32 without base, which is IP-relative in 64-bit mode
        let base = match addr.address_size {
            _ if !addr.long_mode => None,
            OpSize::Bits64 => Some(Register::Rip),
            _ => Some(Register::Eip),
        };
        return Ok((base, None, 1, DispMode::Disp32));
    }

    let base = Register::from_number(gpr, modrm.rm_raw() + addr.ext.base, addr.ext.rex);
    Ok((base, None, 1, full_disp))
}

/// Reads a displacement.
///
/// Returns the sign-extended value and the number of bytes it was encoded
/// with.
fn read_disp(cursor: &mut ByteCursor, mode: DispMode, addr: &Addressing) -> Result<(i64, u8), DecoderError> {
    Ok(match mode {
        DispMode::None => (0, 0),
        DispMode::Disp8 => (cursor.read()? as i8 as i64 * addr.disp8_scale as i64, 1),
        DispMode::Disp16 => (cursor.read_u16()? as i16 as i64, 2),
        DispMode::Disp32 => (cursor.read_u32()? as i32 as i64, 4),
    })
}

/// A decoded Scaled Index Byte (SIB).
///
/// The SIB is followed by a displacement according to the addressing mode
/// specified in the Mod-Reg-R/M byte.
#[derive(Debug)]
struct Sib {
    /// 1, 2, 4 or 8
    scale_val: u8,
    /// The index register to multiply with the scale value.
    index: Option<Register>,
    /// The base register, or `None` if Base is `0b101` and Mod is `0b00`.
    base: Option<Register>,
    /// Set when the missing base forces a 32-bit displacement.
    forced_disp32: bool,
}

impl Sib {
    fn decode(raw: u8, mode: AddressingMode, gpr: RegisterKind, ext: &Extensions) -> Result<Self, DecoderError> {
        let (scale, index, base) = (
            raw >> 6,
            (raw & 0b00111000) >> 3,
            (raw & 0b00000111),
        );

        let scale = 1 << scale;

        let index = match index + ext.index {
            // this would encode ESP, but is special-cased to leave out the index reg
            0b100 => None,
            index => Some(Self::reg(gpr, index, ext)?),
        };
        let (base, forced_disp32) = if base == 0b101 && mode == AddressingMode::RegIndirect {
            // displacement-only enforces a 32-bit displacement
            (None, true)
        } else {
            (Some(Self::reg(gpr, base + ext.base, ext)?), false)
        };

        Ok(Sib {
            scale_val: scale,
            index,
            base,
            forced_disp32,
        })
    }

    fn reg(gpr: RegisterKind, n: u8, ext: &Extensions) -> Result<Register, DecoderError> {
        Register::from_number(gpr, n, ext.rex)
            .ok_or_else(|| DecoderError::invalid_operands("SIB register out of range"))
    }
}
