//! x86 instruction decoder.

use cpu::code::EncodingKind;
use cpu::cursor::ByteCursor;
use cpu::defs::{MaskSupport, OpSize, OpcodeMap, OperandSpec};
use cpu::instr::{ConstantOffsets, Instruction, Operand};
use cpu::memsize::MemorySize;
use cpu::modrm::{self, Addressing, Extensions, ModRegRm};
use cpu::prefix::{scan_prefixes, PrefixState};
use cpu::register::{Register, RegisterKind};
use cpu::table::{self, Key};
use cpu::vector::{self, EvexB, VectorPrefix};

use std::error::Error;
use std::fmt;
use std::str::FromStr;

/// The processor mode the code is decoded for.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum DecodeMode {
    /// Real mode and 16-bit protected mode.
    Bits16,
    /// 32-bit protected mode and compatibility mode.
    Bits32,
    /// 64-bit long mode.
    Bits64,
}

impl DecodeMode {
    /// Operand size used when no `66` or REX.W prefix is present.
    pub fn default_operand_size(&self) -> OpSize {
        match self {
            DecodeMode::Bits16 => OpSize::Bits16,
            DecodeMode::Bits32 | DecodeMode::Bits64 => OpSize::Bits32,
        }
    }

    /// Address size used when no `67` prefix is present.
    pub fn default_address_size(&self) -> OpSize {
        match self {
            DecodeMode::Bits16 => OpSize::Bits16,
            DecodeMode::Bits32 => OpSize::Bits32,
            DecodeMode::Bits64 => OpSize::Bits64,
        }
    }

    pub fn bitness(&self) -> u32 {
        match self {
            DecodeMode::Bits16 => 16,
            DecodeMode::Bits32 => 32,
            DecodeMode::Bits64 => 64,
        }
    }
}

impl FromStr for DecodeMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, String> {
        match s {
            "16" => Ok(DecodeMode::Bits16),
            "32" => Ok(DecodeMode::Bits32),
            "64" => Ok(DecodeMode::Bits64),
            _ => Err(format!("invalid mode '{}', expected 16, 32 or 64", s)),
        }
    }
}

bitflags! {
    /// Options that change what the decoder accepts.
    pub struct DecoderOptions: u32 {
        const NONE = 0;
        /// Accept instructions a CPU would reject with `#UD` because of
        /// misused prefixes or unused fields: `lock` on instructions that
        /// don't support it, legacy prefixes in front of VEX/EVEX, EVEX
        /// zeroing without an opmask, EVEX.b on register operands that ignore
        /// it and `vvvv` fields that should be `1111b`.
        ///
        /// Truncated input, unknown opcodes and reserved bits are still
        /// rejected.
        const NO_INVALID_CHECK = 0x01;
    }
}

impl Default for DecoderOptions {
    fn default() -> Self {
        DecoderOptions::NONE
    }
}

/// x86 machine instruction decoder.
///
/// Decodes instructions from a byte slice, one at a time. Decoding is
/// deterministic: the same bytes in the same mode always produce the same
/// `Instruction`.
#[derive(Debug, Clone)]
pub struct Decoder<'a> {
    cursor: ByteCursor<'a>,
    mode: DecodeMode,
    options: DecoderOptions,
    /// Instruction pointer of the next instruction.
    ip: u64,
}

impl<'a> Decoder<'a> {
    /// Creates a new instruction decoder.
    ///
    /// # Parameters
    ///
    /// * `mode`: The processor mode to decode for.
    /// * `bytes`: The machine code. The first instruction starts at index 0.
    /// * `options`: Decoder options, usually `DecoderOptions::NONE`.
    pub fn new(mode: DecodeMode, bytes: &'a [u8], options: DecoderOptions) -> Self {
        Self {
            cursor: ByteCursor::new(bytes),
            mode,
            options,
            ip: 0,
        }
    }

    /// Sets the instruction pointer of the first instruction.
    pub fn with_ip(mut self, ip: u64) -> Self {
        self.ip = ip;
        self
    }

    pub fn mode(&self) -> DecodeMode {
        self.mode
    }

    /// Returns the instruction pointer of the next instruction.
    ///
    /// This is incremented as `decode` is called.
    pub fn ip(&self) -> u64 {
        self.ip
    }

    pub fn set_ip(&mut self, ip: u64) {
        self.ip = ip;
    }

    /// Returns the index of the next byte that will be decoded.
    pub fn position(&self) -> usize {
        self.cursor.position()
    }

    /// Moves the decoder to another index in the byte slice.
    ///
    /// Positions past the end are clamped to the slice length. The
    /// instruction pointer is not changed.
    pub fn set_position(&mut self, pos: usize) {
        self.cursor.set_position(pos);
    }

    /// Whether there are bytes left to decode.
    pub fn can_decode(&self) -> bool {
        self.cursor.remaining() != 0
    }

    /// Read and decode the next instruction in the stream.
    ///
    /// If this returns an error, the decoder skips a single byte, so calling
    /// `decode` again resumes at the next possible instruction start.
    pub fn decode(&mut self) -> Result<Instruction, DecoderError> {
        self.cursor.begin_instruction();
        let start = self.cursor.position();

        match self.decode_instruction() {
            Ok(instr) => {
                trace!("{:#x}: {:?} ({} bytes)", self.ip, instr.code(), instr.len());
                self.ip = instr.next_ip();
                Ok(instr)
            }
            Err(e) => {
                debug!("invalid instruction at offset {} ({:#x}): {}", start, self.ip, e);
                self.cursor.set_position(start + 1);
                let skipped = self.cursor.position() - start;
                self.ip = self.ip.wrapping_add(skipped as u64);
                Err(e)
            }
        }
    }

    fn strict(&self) -> bool {
        !self.options.contains(DecoderOptions::NO_INVALID_CHECK)
    }

    fn decode_instruction(&mut self) -> Result<Instruction, DecoderError> {
        let mut prefixes = scan_prefixes(&mut self.cursor, self.mode)?;

        let lead = self.cursor.read()?;
        let (map, opcode, vector) = match lead {
            0x0F => {
                let (map, opcode) = self.read_escaped_opcode()?;
                (map, opcode, None)
            }
            0xC5 | 0xC4 | 0x62 if vector::is_vector_lead(self.mode, self.cursor.peek()?) => {
                self.check_vector_prefixes(&prefixes)?;
                let vector = match lead {
                    0xC5 => vector::decode_vex2(&mut self.cursor, self.mode)?,
                    0xC4 => vector::decode_vex3(&mut self.cursor, self.mode)?,
                    _ => vector::decode_evex(&mut self.cursor, self.mode)?,
                };
                (vector.map, self.cursor.read()?, Some(vector))
            }
            _ => return Err(DecoderError::unknown_opcode(OpcodeMap::Primary, lead)),
        };

        let key = self.table_key(&prefixes, vector.as_ref(), map, opcode);
        let resolved = table::resolve(&key)?;
        let template = resolved.template;
        if vector.is_none() && resolved.consumed_prefix {
            prefixes.consume_mandatory();
        }

        let modrm = ModRegRm(self.cursor.read()?);
        let is_memory = !modrm.is_register();
        let ext = match vector {
            Some(ref vector) => vector.ext,
            None => Extensions::from_rex(prefixes.rex),
        };

        let evex_b = match vector {
            Some(ref vector) => vector::interpret_b(vector, template, is_memory, self.strict())?,
            None => EvexB::Off,
        };
        let broadcast = evex_b == EvexB::Broadcast;
        let memory_size = if broadcast { template.broadcast } else { template.memory };

        let addressing = Addressing {
            address_size: prefixes.address_size,
            segment: prefixes.segment,
            ext,
            long_mode: self.mode == DecodeMode::Bits64,
            disp8_scale: match vector {
                Some(ref vector) if vector.kind == EncodingKind::Evex => template.disp8_scale(broadcast),
                _ => 1,
            },
        };

        let mut instr = Instruction::new(template.code);
        let mut offsets = ConstantOffsets::default();
        for operand in template.operands {
            match *operand {
                OperandSpec::Reg(RegisterKind::Opmask) if ext.reg != 0 && self.strict() => {
                    return Err(DecoderError::invalid_operands("EVEX.R and EVEX.R' must be 1 for opmask destinations"));
                }
                OperandSpec::Reg(kind) => instr.push_op(modrm::reg_operand(modrm, kind, &ext)?),
                OperandSpec::Rm(kind) if !is_memory => {
                    instr.push_op(modrm::rm_register(modrm, kind, &ext)?)
                }
                OperandSpec::Mem if !is_memory => {
                    return Err(DecoderError::invalid_operands("instruction requires a memory operand"));
                }
                OperandSpec::Rm(_) | OperandSpec::Mem => {
                    let operand = self.read_memory(modrm, &addressing, memory_size, &mut offsets)?;
                    instr.push_op(operand);
                }
                OperandSpec::Vvvv(kind) => instr.push_op(vvvv_register(vector.as_ref(), kind)?),
                OperandSpec::Imm8 => {
                    offsets.immediate_offset = self.cursor.instruction_len() as u8;
                    offsets.immediate_size = 1;
                    instr.push_op(self.cursor.read()?);
                }
            }
        }

        if let Some(ref vector) = vector {
            self.apply_vector_attributes(&mut instr, vector, template.uses_vvvv(), template.mask, evex_b)?;
        }

        if prefixes.has_lock() {
            if self.strict() && (!template.lockable || !is_memory) {
                return Err(DecoderError::invalid_lock());
            }
            instr.set_lock(true);
        }
        instr.set_repe(prefixes.has_repe());
        instr.set_repne(prefixes.has_repne());
        instr.set_segment_prefix(prefixes.segment);
        instr.set_constant_offsets(offsets);
        instr.set_len(self.cursor.instruction_len() as u8);
        instr.set_ip(self.ip);

        Ok(instr)
    }

    /// Reads the opcode following a `0F` escape, including the second escape
    /// byte of the `0F 38` and `0F 3A` maps.
    fn read_escaped_opcode(&mut self) -> Result<(OpcodeMap, u8), DecoderError> {
        let byte = self.cursor.read()?;
        Ok(match byte {
            0x38 => (OpcodeMap::Map0F38, self.cursor.read()?),
            0x3A => (OpcodeMap::Map0F3A, self.cursor.read()?),
            _ => (OpcodeMap::Map0F, byte),
        })
    }

    /// VEX and EVEX encode REX, `66`, `F2` and `F3` themselves and must not
    /// follow any of them, or `lock`.
    fn check_vector_prefixes(&self, prefixes: &PrefixState) -> Result<(), DecoderError> {
        if !self.strict() {
            return Ok(());
        }

        if prefixes.rex.is_some() {
            Err(DecoderError::illegal_prefix("REX prefix before VEX/EVEX"))
        } else if prefixes.operand_size != self.mode.default_operand_size() {
            Err(DecoderError::illegal_prefix("66 prefix before VEX/EVEX"))
        } else if prefixes.has_repe() || prefixes.has_repne() {
            Err(DecoderError::illegal_prefix("F2/F3 prefix before VEX/EVEX"))
        } else if prefixes.has_lock() {
            Err(DecoderError::illegal_prefix("lock prefix before VEX/EVEX"))
        } else {
            Ok(())
        }
    }

    fn table_key(
        &self,
        prefixes: &PrefixState,
        vector: Option<&VectorPrefix>,
        map: OpcodeMap,
        opcode: u8,
    ) -> Key {
        let long_mode = self.mode == DecodeMode::Bits64;
        let (encoding, prefix, length, w) = match vector {
            None => (EncodingKind::Legacy, prefixes.mandatory, 0, prefixes.rex_w()),
            // VEX.W only widens operands in 64-bit mode
            Some(v) if v.kind == EncodingKind::Vex => (v.kind, v.pp, v.l, v.w && long_mode),
            Some(v) => (v.kind, v.pp, v.l, v.w),
        };

        Key {
            encoding,
            map,
            opcode,
            prefix,
            length,
            w,
            op_size: prefixes.operand_size,
            op_size_without_66: if prefixes.rex_w() {
                OpSize::Bits64
            } else {
                self.mode.default_operand_size()
            },
            // Group opcodes need the reg field before the template is known.
            // At the end of the input, resolving still reports unknown
            // opcodes and reading the ModR/M byte fails afterwards.
            modrm_reg: self.cursor.peek().map(|b| ModRegRm(b).reg_raw()).unwrap_or(0),
        }
    }

    fn read_memory(
        &mut self,
        modrm: ModRegRm,
        addressing: &Addressing,
        size: MemorySize,
        offsets: &mut ConstantOffsets,
    ) -> Result<Operand, DecoderError> {
        let read = modrm::read_memory(&mut self.cursor, modrm, addressing, size)?;
        if read.operand.displ_size != 0 {
            offsets.displacement_offset = read.displacement_offset;
            offsets.displacement_size = read.operand.displ_size;
        }
        Ok(Operand::Mem(read.operand))
    }

    fn apply_vector_attributes(
        &self,
        instr: &mut Instruction,
        vector: &VectorPrefix,
        uses_vvvv: bool,
        mask: MaskSupport,
        evex_b: EvexB,
    ) -> Result<(), DecoderError> {
        let strict = self.strict();

        if !uses_vvvv && (vector.vvvv != 0 || vector.vvvv_raw != 0) && strict {
            return Err(DecoderError::invalid_operands("unused vvvv field must be 1111b"));
        }

        if vector.kind != EncodingKind::Evex {
            return Ok(());
        }

        if mask == MaskSupport::None && (vector.aaa != 0 || vector.z) {
            return Err(DecoderError::invalid_operands("instruction does not support masking"));
        }
        if vector.z && vector.aaa == 0 && strict {
            return Err(DecoderError::invalid_operands("zeroing-masking without opmask"));
        }

        let k = Register::from_number(RegisterKind::Opmask, vector.aaa, false)
            .ok_or_else(|| DecoderError::invalid_operands("opmask out of range"))?;
        instr.set_op_mask(k);
        instr.set_zeroing(vector.z);

        match evex_b {
            EvexB::Rounding(rc) => instr.set_rounding(rc),
            EvexB::Sae => instr.set_sae(true),
            EvexB::Off | EvexB::Broadcast => {}
        }

        Ok(())
    }
}

impl<'a> Iterator for Decoder<'a> {
    type Item = Result<Instruction, DecoderError>;

    /// Decodes the next instruction, or returns `None` when the input is
    /// exhausted.
    fn next(&mut self) -> Option<Self::Item> {
        if self.can_decode() {
            Some(self.decode())
        } else {
            None
        }
    }
}

/// Resolves the register encoded in the VEX/EVEX `vvvv` field.
fn vvvv_register(vector: Option<&VectorPrefix>, kind: RegisterKind) -> Result<Register, DecoderError> {
    let vvvv = vector
        .map(|v| v.vvvv)
        .ok_or_else(|| DecoderError::invalid_operands("vvvv operand without VEX/EVEX prefix"))?;
    Register::from_number(kind, vvvv, false)
        .ok_or_else(|| DecoderError::invalid_operands("vvvv field out of range"))
}

/// Error type returned by the decoder.
///
/// All variants except `OutOfBounds` and `TooLong` are equivalent to the CPU
/// raising `#UD` for the instruction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DecoderError {
    /// The input ended in the middle of an instruction.
    OutOfBounds,
    /// The instruction would be longer than 15 Bytes.
    TooLong,
    /// No instruction is encoded by this opcode and prefix combination.
    UnknownOpcode { map: OpcodeMap, opcode: u8 },
    /// The operand encoding is not allowed for the instruction.
    InvalidOperands(&'static str),
    /// `lock` prefix on an instruction that can't be locked.
    InvalidLockUsage,
    /// A prefix that may not appear in this position.
    IllegalPrefix(&'static str),
    /// A VEX or EVEX field with a fixed value has the wrong value.
    ReservedBits(&'static str),
}

impl DecoderError {
    #[cold]
    pub(crate) fn out_of_bounds() -> Self {
        DecoderError::OutOfBounds
    }

    #[cold]
    pub(crate) fn too_long() -> Self {
        DecoderError::TooLong
    }

    #[cold]
    pub(crate) fn unknown_opcode(map: OpcodeMap, opcode: u8) -> Self {
        DecoderError::UnknownOpcode { map, opcode }
    }

    #[cold]
    pub(crate) fn invalid_operands(why: &'static str) -> Self {
        DecoderError::InvalidOperands(why)
    }

    #[cold]
    pub(crate) fn invalid_lock() -> Self {
        DecoderError::InvalidLockUsage
    }

    #[cold]
    pub(crate) fn illegal_prefix(why: &'static str) -> Self {
        DecoderError::IllegalPrefix(why)
    }

    #[cold]
    pub(crate) fn reserved_bits(why: &'static str) -> Self {
        DecoderError::ReservedBits(why)
    }
}

impl fmt::Display for DecoderError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            DecoderError::OutOfBounds => f.write_str("unexpected end of input"),
            DecoderError::TooLong => f.write_str("instruction exceeds 15 bytes"),
            DecoderError::UnknownOpcode { map, opcode } => write!(f, "unknown opcode {}{:02X}", map, opcode),
            DecoderError::InvalidOperands(why) => write!(f, "invalid operands: {}", why),
            DecoderError::InvalidLockUsage => f.write_str("invalid use of the lock prefix"),
            DecoderError::IllegalPrefix(why) => write!(f, "illegal prefix: {}", why),
            DecoderError::ReservedBits(why) => write!(f, "reserved bits violated: {}", why),
        }
    }
}

impl Error for DecoderError {}
