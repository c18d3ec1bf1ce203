//! Decoded x86 instruction representation.

use cpu::code::{Code, EncodingKind, Mnemonic};
use cpu::memsize::MemorySize;
use cpu::register::Register;

use std::fmt;

/// A decoded x86 instruction.
///
/// An `Instruction` keeps everything the decoder learned from the byte stream
/// that is relevant for interpreting the instruction: its `Code`, its operands
/// in Intel order, the prefixes that were not consumed as mandatory prefixes,
/// and the EVEX masking and rounding attributes.
///
/// Instructions are plain values. Decoding the same bytes in the same mode
/// always produces an equal `Instruction`.
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct Instruction {
    code: Code,
    len: u8,
    ip: u64,
    ops: [Option<Operand>; 4],
    op_count: u8,
    flags: InstrFlags,
    segment_prefix: Option<Register>,
    op_mask: Option<Register>,
    rounding: RoundingControl,
    offsets: ConstantOffsets,
}

bitflags! {
    /// Boolean instruction attributes.
    struct InstrFlags: u8 {
        const LOCK = 0x01;
        const REPE = 0x02;
        const REPNE = 0x04;
        const ZEROING = 0x08;
        const SAE = 0x10;
    }
}

impl Instruction {
    /// Creates an instruction without operands or attributes.
    pub(crate) fn new(code: Code) -> Self {
        Instruction {
            code,
            len: 0,
            ip: 0,
            ops: [None, None, None, None],
            op_count: 0,
            flags: InstrFlags::empty(),
            segment_prefix: None,
            op_mask: None,
            rounding: RoundingControl::None,
            offsets: ConstantOffsets::default(),
        }
    }

    /// Appends the next operand.
    ///
    /// Templates never have more than 4 operands, additional ones are dropped.
    pub(crate) fn push_op<O: Into<Operand>>(&mut self, op: O) {
        if let Some(slot) = self.ops.get_mut(self.op_count as usize) {
            *slot = Some(op.into());
            self.op_count += 1;
        }
    }

    pub(crate) fn set_len(&mut self, len: u8) {
        self.len = len;
    }

    pub(crate) fn set_ip(&mut self, ip: u64) {
        self.ip = ip;
    }

    pub(crate) fn set_lock(&mut self, lock: bool) {
        self.flags.set(InstrFlags::LOCK, lock);
    }

    pub(crate) fn set_repe(&mut self, repe: bool) {
        self.flags.set(InstrFlags::REPE, repe);
    }

    pub(crate) fn set_repne(&mut self, repne: bool) {
        self.flags.set(InstrFlags::REPNE, repne);
    }

    pub(crate) fn set_segment_prefix(&mut self, seg: Option<Register>) {
        self.segment_prefix = seg;
    }

    /// Sets the opmask register. `K0` means "no masking" and is stored as
    /// `None`.
    pub(crate) fn set_op_mask(&mut self, mask: Register) {
        self.op_mask = if mask == Register::K0 { None } else { Some(mask) };
    }

    pub(crate) fn set_zeroing(&mut self, zeroing: bool) {
        self.flags.set(InstrFlags::ZEROING, zeroing);
    }

    pub(crate) fn set_rounding(&mut self, rc: RoundingControl) {
        self.rounding = rc;
    }

    pub(crate) fn set_sae(&mut self, sae: bool) {
        self.flags.set(InstrFlags::SAE, sae);
    }

    pub(crate) fn set_constant_offsets(&mut self, offsets: ConstantOffsets) {
        self.offsets = offsets;
    }

    pub fn code(&self) -> Code {
        self.code
    }

    pub fn mnemonic(&self) -> Mnemonic {
        self.code.mnemonic()
    }

    /// Returns whether the instruction was encoded as legacy, VEX or EVEX.
    pub fn encoding(&self) -> EncodingKind {
        self.code.encoding()
    }

    /// Number of bytes the instruction occupies, including all prefixes.
    pub fn len(&self) -> usize {
        self.len as usize
    }

    /// Address of the first byte of the instruction.
    pub fn ip(&self) -> u64 {
        self.ip
    }

    /// Address of the instruction following this one.
    pub fn next_ip(&self) -> u64 {
        self.ip.wrapping_add(self.len as u64)
    }

    /// Number of explicit operands (0 to 4).
    pub fn op_count(&self) -> usize {
        self.op_count as usize
    }

    /// Returns the `n`th operand, or `None` if the instruction has fewer.
    pub fn op(&self, n: usize) -> Option<&Operand> {
        self.ops.get(n).and_then(|op| op.as_ref())
    }

    /// Returns the kind of the `n`th operand. Missing operands are
    /// `OpKind::None`.
    pub fn op_kind(&self, n: usize) -> OpKind {
        self.op(n).map(Operand::kind).unwrap_or(OpKind::None)
    }

    /// Returns the register of the `n`th operand if it is a register operand.
    pub fn op_register(&self, n: usize) -> Option<Register> {
        match self.op(n) {
            Some(Operand::Reg(reg)) => Some(*reg),
            _ => None,
        }
    }

    /// Iterates over the operands in Intel order.
    pub fn operands<'a>(&'a self) -> impl Iterator<Item = &'a Operand> + 'a {
        self.ops.iter().take(self.op_count as usize).filter_map(|op| op.as_ref())
    }

    /// Returns the memory operand, if the instruction has one.
    ///
    /// x86 instructions have at most one explicit memory operand.
    pub fn memory(&self) -> Option<&MemoryOperand> {
        self.operands()
            .filter_map(|op| match op {
                Operand::Mem(mem) => Some(mem),
                _ => None,
            })
            .next()
    }

    pub fn memory_base(&self) -> Option<Register> {
        self.memory().and_then(|mem| mem.base)
    }

    pub fn memory_index(&self) -> Option<Register> {
        self.memory().and_then(|mem| mem.index)
    }

    /// Index scale (1, 2, 4 or 8). 1 if there is no memory operand.
    pub fn memory_index_scale(&self) -> u8 {
        self.memory().map(|mem| mem.scale).unwrap_or(1)
    }

    pub fn memory_displacement(&self) -> u64 {
        self.memory().map(MemoryOperand::displacement).unwrap_or(0)
    }

    pub fn memory_displ_size(&self) -> u8 {
        self.memory().map(|mem| mem.displ_size).unwrap_or(0)
    }

    /// Segment used to access the memory operand.
    pub fn memory_segment(&self) -> Option<Register> {
        self.memory().map(|mem| mem.segment)
    }

    pub fn memory_size(&self) -> MemorySize {
        self.memory().map(|mem| mem.size).unwrap_or(MemorySize::Unknown)
    }

    /// Whether the memory operand is an EVEX embedded broadcast.
    pub fn is_broadcast(&self) -> bool {
        self.memory_size().is_broadcast()
    }

    /// Computes the target of an IP-relative memory operand.
    ///
    /// Returns `None` if the memory operand is not based on `RIP` or `EIP`.
    pub fn ip_rel_memory_address(&self) -> Option<u64> {
        let mem = self.memory()?;
        match mem.base {
            Some(Register::Rip) => Some(self.next_ip().wrapping_add(mem.displacement as u64)),
            Some(Register::Eip) => {
                Some(self.next_ip().wrapping_add(mem.displacement as u64) & 0xFFFF_FFFF)
            }
            _ => None,
        }
    }

    /// Returns the first immediate operand, zero-extended.
    pub fn immediate(&self) -> Option<u64> {
        self.operands()
            .filter_map(|op| match *op {
                Operand::Imm8(imm) => Some(imm as u64),
                Operand::Imm16(imm) => Some(imm as u64),
                Operand::Imm32(imm) => Some(imm as u64),
                Operand::Imm64(imm) => Some(imm),
                _ => None,
            })
            .next()
    }

    pub fn immediate8(&self) -> Option<u8> {
        self.operands()
            .filter_map(|op| match *op {
                Operand::Imm8(imm) => Some(imm),
                _ => None,
            })
            .next()
    }

    pub fn has_lock_prefix(&self) -> bool {
        self.flags.contains(InstrFlags::LOCK)
    }

    pub fn has_repe_prefix(&self) -> bool {
        self.flags.contains(InstrFlags::REPE)
    }

    pub fn has_repne_prefix(&self) -> bool {
        self.flags.contains(InstrFlags::REPNE)
    }

    /// The explicit segment override prefix, if any.
    pub fn segment_prefix(&self) -> Option<Register> {
        self.segment_prefix
    }

    /// EVEX opmask register (`K1`-`K7`), or `None` if no masking is done.
    pub fn op_mask(&self) -> Option<Register> {
        self.op_mask
    }

    /// Whether masked-out lanes are zeroed instead of merged.
    pub fn zeroing_masking(&self) -> bool {
        self.flags.contains(InstrFlags::ZEROING)
    }

    pub fn rounding_control(&self) -> RoundingControl {
        self.rounding
    }

    /// Whether `{sae}` (suppress all exceptions) is in effect.
    pub fn suppress_all_exceptions(&self) -> bool {
        self.flags.contains(InstrFlags::SAE)
    }

    /// Location of the displacement and immediate bytes in the instruction.
    pub fn constant_offsets(&self) -> ConstantOffsets {
        self.offsets
    }
}

/// Prints a basic Intel-syntax rendition of the instruction.
///
/// This is meant for debugging and the command-line tool, not as a complete
/// formatter: memory operands carry no size keyword and immediates are always
/// printed in hex.
impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        if self.has_lock_prefix() {
            f.write_str("lock ")?;
        }
        if self.has_repe_prefix() {
            f.write_str("repe ")?;
        }
        if self.has_repne_prefix() {
            f.write_str("repne ")?;
        }
        write!(f, "{}", self.mnemonic())?;

        for (i, op) in self.operands().enumerate() {
            f.write_str(if i == 0 { " " } else { ", " })?;
            write!(f, "{}", op)?;
            if i == 0 {
                if let Some(k) = self.op_mask {
                    write!(f, " {{{}}}", k)?;
                }
                if self.zeroing_masking() {
                    f.write_str(" {z}")?;
                }
            }
            if let Operand::Mem(mem) = op {
                if mem.size.is_broadcast() {
                    write!(f, " {{1to{}}}", mem.size.lanes())?;
                }
            }
        }

        match self.rounding {
            RoundingControl::None if self.suppress_all_exceptions() => f.write_str(", {sae}"),
            RoundingControl::None => Ok(()),
            rc => write!(f, ", {{{}}}", rc),
        }
    }
}

/// An instruction operand.
#[derive(Debug, PartialEq, Eq, Clone)]
pub enum Operand {
    /// Register operand.
    Reg(Register),
    /// Memory operand, addressed through ModRM (and SIB).
    Mem(MemoryOperand),
    Imm8(u8),
    // The wider immediates complete the operand model. No instruction in the
    // opcode tables encodes one yet.
    Imm16(u16),
    Imm32(u32),
    Imm64(u64),
}

impl Operand {
    pub fn kind(&self) -> OpKind {
        match self {
            Operand::Reg(_) => OpKind::Register,
            Operand::Mem(_) => OpKind::Memory,
            Operand::Imm8(_) => OpKind::Immediate8,
            Operand::Imm16(_) => OpKind::Immediate16,
            Operand::Imm32(_) => OpKind::Immediate32,
            Operand::Imm64(_) => OpKind::Immediate64,
        }
    }
}

impl From<Register> for Operand {
    fn from(reg: Register) -> Self {
        Operand::Reg(reg)
    }
}

impl From<MemoryOperand> for Operand {
    fn from(mem: MemoryOperand) -> Self {
        Operand::Mem(mem)
    }
}

impl From<u8> for Operand {
    fn from(imm: u8) -> Self {
        Operand::Imm8(imm)
    }
}

impl fmt::Display for Operand {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Operand::Reg(reg) => write!(f, "{}", reg),
            Operand::Mem(mem) => write!(f, "{}", mem),
            Operand::Imm8(imm) => write!(f, "{:#x}", imm),
            Operand::Imm16(imm) => write!(f, "{:#x}", imm),
            Operand::Imm32(imm) => write!(f, "{:#x}", imm),
            Operand::Imm64(imm) => write!(f, "{:#x}", imm),
        }
    }
}

/// The kind of an operand, without its value.
#[derive(Debug, PartialEq, Eq, Copy, Clone)]
pub enum OpKind {
    /// The operand does not exist.
    None,
    Register,
    Memory,
    Immediate8,
    Immediate16,
    Immediate32,
    Immediate64,
}

/// A memory operand.
///
/// The effective address is `base + index * scale + displacement`, computed
/// in `address_size` bytes and then added to the base of `segment`.
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct MemoryOperand {
    /// How the memory is accessed. For broadcasts this is the broadcast shape.
    pub size: MemorySize,
    /// Segment used for the access. Either the override prefix or the default
    /// segment of the base register.
    pub segment: Register,
    /// Base register. `Rip`/`Eip` for IP-relative addressing, `None` for
    /// absolute addresses.
    pub base: Option<Register>,
    pub index: Option<Register>,
    /// Multiplier applied to `index`: 1, 2, 4 or 8.
    pub scale: u8,
    /// Sign-extended displacement. For EVEX compressed displacements this is
    /// the already scaled value.
    pub displacement: i64,
    /// Number of displacement bytes in the encoding (0, 1, 2 or 4).
    pub displ_size: u8,
    /// Address size in bytes (2, 4 or 8).
    pub address_size: u8,
}

impl MemoryOperand {
    /// Returns the displacement truncated to the address size.
    pub fn displacement(&self) -> u64 {
        match self.address_size {
            2 => self.displacement as u64 & 0xFFFF,
            4 => self.displacement as u64 & 0xFFFF_FFFF,
            _ => self.displacement as u64,
        }
    }
}

impl fmt::Display for MemoryOperand {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let default_seg = self.base.map(|base| base.default_segment()).unwrap_or(Register::Ds);
        if self.segment != default_seg {
            write!(f, "{}:", self.segment)?;
        }

        f.write_str("[")?;
        let mut empty = true;
        if let Some(base) = self.base {
            write!(f, "{}", base)?;
            empty = false;
        }
        if let Some(index) = self.index {
            if !empty {
                f.write_str("+")?;
            }
            write!(f, "{}", index)?;
            if self.scale != 1 {
                write!(f, "*{}", self.scale)?;
            }
            empty = false;
        }
        if empty {
            write!(f, "{:#x}", self.displacement())?;
        } else if self.displacement < 0 {
            write!(f, "-{:#x}", self.displacement.wrapping_neg() as u64)?;
        } else if self.displacement > 0 {
            write!(f, "+{:#x}", self.displacement)?;
        }
        f.write_str("]")
    }
}

/// EVEX static rounding mode (`{er}`).
#[derive(Debug, PartialEq, Eq, Copy, Clone)]
pub enum RoundingControl {
    /// No static rounding, MXCSR.RC is used.
    None,
    RoundToNearest,
    RoundDown,
    RoundUp,
    RoundTowardZero,
}

impl RoundingControl {
    /// Maps the `L'L` field of a register-form EVEX instruction with `b` set
    /// to the rounding mode it selects.
    pub(crate) fn from_ll(ll: u8) -> Self {
        match ll & 3 {
            0 => RoundingControl::RoundToNearest,
            1 => RoundingControl::RoundDown,
            2 => RoundingControl::RoundUp,
            _ => RoundingControl::RoundTowardZero,
        }
    }
}

impl fmt::Display for RoundingControl {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(match self {
            RoundingControl::None => "",
            RoundingControl::RoundToNearest => "rn-sae",
            RoundingControl::RoundDown => "rd-sae",
            RoundingControl::RoundUp => "ru-sae",
            RoundingControl::RoundTowardZero => "rz-sae",
        })
    }
}

/// Positions of the constant fields of an instruction.
///
/// Offsets are relative to the first byte of the instruction. A size of 0
/// means the field is absent.
#[derive(Debug, PartialEq, Eq, Copy, Clone, Default)]
pub struct ConstantOffsets {
    pub displacement_offset: u8,
    pub displacement_size: u8,
    pub immediate_offset: u8,
    pub immediate_size: u8,
}

impl ConstantOffsets {
    pub fn has_displacement(&self) -> bool {
        self.displacement_size != 0
    }

    pub fn has_immediate(&self) -> bool {
        self.immediate_size != 0
    }
}
