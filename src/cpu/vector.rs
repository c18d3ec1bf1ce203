//! VEX and EVEX prefix decoding.
//!
//! VEX (`C5`/`C4`) and EVEX (`62`) prefixes replace the REX prefix, the
//! mandatory prefix and the opcode escape bytes of legacy SSE instructions
//! with a compact encoding:
//!
//! ```notrust
//! VEX2:  C5  [R vvvv L pp]
//! VEX3:  C4  [R X B m-mmmm]  [W vvvv L pp]
//! EVEX:  62  [R X B R' 0 0 m m]  [W vvvv 1 pp]  [z L'L b V' aaa]
//! ```
//!
//! `R`, `X`, `B`, `R'`, `V'` and `vvvv` are stored inverted.

use cpu::code::EncodingKind;
use cpu::cursor::ByteCursor;
use cpu::decode::{DecodeMode, DecoderError};
use cpu::defs::{OpcodeMap, RegisterB, Template};
use cpu::instr::RoundingControl;
use cpu::modrm::Extensions;
use cpu::prefix::MandatoryPrefix;

/// The fields of a decoded VEX or EVEX prefix.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct VectorPrefix {
    /// `Vex` or `Evex`.
    pub kind: EncodingKind,
    /// Opcode map the prefix implies.
    pub map: OpcodeMap,
    /// Implied mandatory prefix (`pp`).
    pub pp: MandatoryPrefix,
    pub w: bool,
    /// `L` (VEX) or `L'L` (EVEX): 0 = 128, 1 = 256, 2 = 512 bits.
    pub l: u8,
    /// The non-inverted `vvvv` register number, including `V'`.
    ///
    /// Outside of 64-bit mode only the low 3 bits are used.
    pub vvvv: u8,
    /// The full non-inverted `vvvv` field as encoded, used to check that
    /// instructions without a `vvvv` operand leave it at `1111b`.
    pub vvvv_raw: u8,
    /// Register extensions from `R`, `X`, `B` and `R'`.
    pub ext: Extensions,
    /// EVEX opmask register number.
    pub aaa: u8,
    /// EVEX zeroing-masking bit.
    pub z: bool,
    /// EVEX broadcast / rounding control / SAE bit.
    ///
    /// Its meaning is only known once the ModR/M byte tells whether the
    /// operand is in memory, see `interpret_b`.
    pub b: bool,
}

impl VectorPrefix {
    fn vex() -> Self {
        VectorPrefix {
            kind: EncodingKind::Vex,
            map: OpcodeMap::Map0F,
            pp: MandatoryPrefix::None,
            w: false,
            l: 0,
            vvvv: 0,
            vvvv_raw: 0,
            ext: Extensions::default(),
            aaa: 0,
            z: false,
            b: false,
        }
    }

    /// Sets `vvvv` from the inverted 4-bit field.
    fn set_vvvv(&mut self, inverted: u8, mode: DecodeMode) {
        self.vvvv_raw = !inverted & 0xF;
        self.vvvv = if mode == DecodeMode::Bits64 {
            self.vvvv_raw
        } else {
            self.vvvv_raw & 0b111
        };
    }
}

/// Whether `C4`, `C5` or `62` starts a VEX/EVEX prefix instead of `LES`,
/// `LDS` or `BOUND`.
///
/// Outside of 64-bit mode this is decided by the following byte: `LES`, `LDS`
/// and `BOUND` require a memory operand, so a ModR/M byte with `Mod == 11`
/// can only be the start of a vector prefix.
pub fn is_vector_lead(mode: DecodeMode, next: u8) -> bool {
    mode == DecodeMode::Bits64 || bitpat!(1 1 _ _ _ _ _ _)(next)
}

/// Decodes the byte following a `C5` lead byte.
pub fn decode_vex2(cursor: &mut ByteCursor, mode: DecodeMode) -> Result<VectorPrefix, DecoderError> {
    let b = cursor.read()?;

    let mut vex = VectorPrefix::vex();
    if mode == DecodeMode::Bits64 && b & 0x80 == 0 {
        vex.ext.reg = 8;
    }
    vex.set_vvvv(b >> 3, mode);
    vex.l = (b >> 2) & 1;
    vex.pp = MandatoryPrefix::from_pp(b);

    trace!("VEX2 {:02X}: {:?}", b, vex);
    Ok(vex)
}

/// Decodes the two bytes following a `C4` lead byte.
pub fn decode_vex3(cursor: &mut ByteCursor, mode: DecodeMode) -> Result<VectorPrefix, DecoderError> {
    let b1 = cursor.read()?;
    let b2 = cursor.read()?;

    let mut vex = VectorPrefix::vex();
    vex.map = match b1 & 0x1F {
        1 => OpcodeMap::Map0F,
        2 => OpcodeMap::Map0F38,
        3 => OpcodeMap::Map0F3A,
        _ => return Err(DecoderError::reserved_bits("VEX.mmmmm selects no opcode map")),
    };
    if mode == DecodeMode::Bits64 {
        vex.ext.reg = if b1 & 0x80 == 0 { 8 } else { 0 };
        vex.ext.index = if b1 & 0x40 == 0 { 8 } else { 0 };
        vex.ext.base = if b1 & 0x20 == 0 { 8 } else { 0 };
    }
    vex.w = b2 & 0x80 != 0;
    vex.set_vvvv(b2 >> 3, mode);
    vex.l = (b2 >> 2) & 1;
    vex.pp = MandatoryPrefix::from_pp(b2);

    trace!("VEX3 {:02X} {:02X}: {:?}", b1, b2, vex);
    Ok(vex)
}

/// Decodes the three payload bytes following a `62` lead byte.
pub fn decode_evex(cursor: &mut ByteCursor, mode: DecodeMode) -> Result<VectorPrefix, DecoderError> {
    let p0 = cursor.read()?;
    let p1 = cursor.read()?;
    let p2 = cursor.read()?;

    if p0 & 0b0000_1100 != 0 {
        return Err(DecoderError::reserved_bits("EVEX.P0[3:2] must be 0"));
    }
    if p1 & 0b0000_0100 == 0 {
        return Err(DecoderError::reserved_bits("EVEX.P1[2] must be 1"));
    }

    let mut evex = VectorPrefix::vex();
    evex.kind = EncodingKind::Evex;
    evex.map = match p0 & 0b11 {
        1 => OpcodeMap::Map0F,
        2 => OpcodeMap::Map0F38,
        3 => OpcodeMap::Map0F3A,
        _ => return Err(DecoderError::reserved_bits("EVEX.mm selects no opcode map")),
    };
    evex.w = p1 & 0x80 != 0;
    evex.set_vvvv(p1 >> 3, mode);
    evex.pp = MandatoryPrefix::from_pp(p1);
    evex.aaa = p2 & 0b111;
    evex.b = p2 & 0x10 != 0;
    evex.l = (p2 >> 5) & 0b11;
    evex.z = p2 & 0x80 != 0;

    if mode == DecodeMode::Bits64 {
        if p2 & 0x08 == 0 {
            evex.vvvv += 16;
        }
        evex.ext.reg = (if p0 & 0x80 == 0 { 8 } else { 0 }) + (if p0 & 0x10 == 0 { 16 } else { 0 });
        evex.ext.index = if p0 & 0x40 == 0 { 8 } else { 0 };
        evex.ext.rm_vector = if p0 & 0x40 == 0 { 16 } else { 0 };
        evex.ext.base = if p0 & 0x20 == 0 { 8 } else { 0 };
    }

    trace!("EVEX {:02X} {:02X} {:02X}: {:?}", p0, p1, p2, evex);
    Ok(evex)
}

/// What the EVEX.b bit turned out to mean.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum EvexB {
    /// `b` is clear, or ignored.
    Off,
    /// Memory operand: embedded broadcast.
    Broadcast,
    /// Register operand: static rounding, which implies `{sae}`.
    Rounding(RoundingControl),
    /// Register operand: suppress all exceptions.
    Sae,
}

/// Interprets EVEX.b once the kind of the ModR/M operand is known.
///
/// With `strict` unset, a `b` bit on register forms that have no use for it
/// is ignored instead of rejected.
pub fn interpret_b(
    prefix: &VectorPrefix,
    template: &Template,
    is_memory: bool,
    strict: bool,
) -> Result<EvexB, DecoderError> {
    if prefix.kind != EncodingKind::Evex || !prefix.b {
        return Ok(EvexB::Off);
    }

    if is_memory {
        return if template.supports_broadcast() {
            Ok(EvexB::Broadcast)
        } else {
            Err(DecoderError::invalid_operands("instruction does not support broadcast"))
        };
    }

    match template.register_b {
        RegisterB::Rounding => Ok(EvexB::Rounding(RoundingControl::from_ll(prefix.l))),
        RegisterB::Sae => Ok(EvexB::Sae),
        RegisterB::None if strict => {
            Err(DecoderError::invalid_operands("EVEX.b set on register operand"))
        }
        RegisterB::None => Ok(EvexB::Off),
    }
}
