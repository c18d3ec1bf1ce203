//! Instruction prefix byte decoding.

use cpu::cursor::ByteCursor;
use cpu::decode::{DecodeMode, DecoderError};
use cpu::defs::OpSize;
use cpu::register::Register;

bitflags! {
    /// Bitmask of raw instruction prefixes.
    ///
    /// Their meaning depends on the instruction opcode. In (dis)assembly, not
    /// all prefixes show up as actual prefix words before the mnemonic.
    ///
    /// We collect prefix bytes in this bitmask and later build a completed
    /// instruction with instruction-specific prefixes from this.
    pub struct RawPrefixes: u16 {
        /// `0xF0`
        const LOCK       = 0x0100;
        /// `0xF2`
        const REPNE      = 0x0400;
        /// `0xF3` - `rep` or `repe` prefix, depending on the instruction.
        const REP_REPE   = 0x0800;
        /// `0x26`
        const OVERRIDE_ES = 0x0010;
        /// `0x2E` - Use CS instead of the instruction's default segment.
        ///
        /// This prefix doubles as a "not taken" branch hint.
        const OVERRIDE_CS = 0x0020;
        /// `0x36`
        const OVERRIDE_SS = 0x0040;
        /// `0x3E` - Use DS instead of the instruction's default segment.
        ///
        /// This prefix doubles as a "taken" branch hint.
        const OVERRIDE_DS = 0x0080;
        /// `0x64`
        const OVERRIDE_FS = 0x0001;
        /// `0x65`
        const OVERRIDE_GS = 0x0002;
        /// `0x66` - Operand size override.
        ///
        /// Switches between 16-bit and 32-bit operands. A REX.W prefix takes
        /// precedence.
        const OVERRIDE_OPERAND = 0x0004;
        /// `0x67` - Address size override.
        ///
        /// Switches between 16- and 32-bit addressing, or from 64- to 32-bit
        /// addressing in 64-bit mode.
        const OVERRIDE_ADDRESS = 0x0008;
    }
}

impl RawPrefixes {
    /// Decodes a prefix byte and merges it with `self`.
    ///
    /// Returns `Ok` when the byte is a valid legacy prefix, and `Err` if not.
    pub fn decode(self, prefix: u8) -> Result<Self, Self> {
        Ok(self | match prefix {
            0xF0 => RawPrefixes::LOCK,
            0xF3 => RawPrefixes::REP_REPE,
            0xF2 => RawPrefixes::REPNE,
            0x2E => RawPrefixes::OVERRIDE_CS,
            0x36 => RawPrefixes::OVERRIDE_SS,
            0x3E => RawPrefixes::OVERRIDE_DS,
            0x26 => RawPrefixes::OVERRIDE_ES,
            0x64 => RawPrefixes::OVERRIDE_FS,
            0x65 => RawPrefixes::OVERRIDE_GS,
            0x66 => RawPrefixes::OVERRIDE_OPERAND,
            0x67 => RawPrefixes::OVERRIDE_ADDRESS,
            _ => return Err(self),
        })
    }

    /// If `self` contains `other`, removes `other` from `self` and returns
    /// `true`.
    pub fn take(&mut self, other: RawPrefixes) -> bool {
        if self.contains(other) {
            self.remove(other);
            true
        } else {
            false
        }
    }
}

/// The mandatory prefix group of an instruction.
///
/// `66`, `F3` and `F2` double as opcode extensions for most SSE and later
/// instructions. VEX and EVEX encode the same information in their `pp`
/// field.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum MandatoryPrefix {
    None,
    P66,
    PF3,
    PF2,
}

impl MandatoryPrefix {
    /// Decodes the 2-bit `pp` field of a VEX or EVEX prefix.
    pub fn from_pp(pp: u8) -> Self {
        match pp & 0b11 {
            0b00 => MandatoryPrefix::None,
            0b01 => MandatoryPrefix::P66,
            0b10 => MandatoryPrefix::PF3,
            _ => MandatoryPrefix::PF2,
        }
    }
}

/// A REX prefix byte (`0100WRXB`), only valid in 64-bit mode.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct Rex(pub u8);

impl Rex {
    /// 64-bit operand size.
    pub fn w(&self) -> bool {
        self.0 & 0b1000 != 0
    }

    /// Extension of the ModR/M reg field.
    pub fn r(&self) -> bool {
        self.0 & 0b0100 != 0
    }

    /// Extension of the SIB index field.
    pub fn x(&self) -> bool {
        self.0 & 0b0010 != 0
    }

    /// Extension of the ModR/M rm field or the SIB base field.
    pub fn b(&self) -> bool {
        self.0 & 0b0001 != 0
    }
}

/// Everything learned from the legacy and REX prefixes of an instruction.
#[derive(Debug, Clone, PartialEq)]
pub struct PrefixState {
    /// All legacy prefixes that were present and not consumed.
    pub raw: RawPrefixes,
    /// Effective segment override, if any.
    pub segment: Option<Register>,
    /// Candidate mandatory prefix. Only becomes one if the opcode table says
    /// so.
    pub mandatory: MandatoryPrefix,
    /// The REX prefix, if it was the last prefix before the opcode.
    pub rex: Option<Rex>,
    pub operand_size: OpSize,
    pub address_size: OpSize,
    mode: DecodeMode,
}

impl PrefixState {
    /// Creates the prefix state of an instruction without prefixes.
    pub fn new(mode: DecodeMode) -> Self {
        Self {
            raw: RawPrefixes::empty(),
            segment: None,
            mandatory: MandatoryPrefix::None,
            rex: None,
            operand_size: mode.default_operand_size(),
            address_size: mode.default_address_size(),
            mode,
        }
    }

    pub fn has_lock(&self) -> bool {
        self.raw.contains(RawPrefixes::LOCK)
    }

    pub fn has_repe(&self) -> bool {
        self.raw.contains(RawPrefixes::REP_REPE)
    }

    pub fn has_repne(&self) -> bool {
        self.raw.contains(RawPrefixes::REPNE)
    }

    /// Whether REX.W is set.
    pub fn rex_w(&self) -> bool {
        self.rex.map(|rex| rex.w()).unwrap_or(false)
    }

    /// Consumes the candidate mandatory prefix after the opcode table used it
    /// to select the instruction.
    ///
    /// A consumed `66` no longer changes the operand size, and a consumed
    /// `F3`/`F2` is no longer reported as a repeat prefix.
    pub fn consume_mandatory(&mut self) {
        match self.mandatory {
            MandatoryPrefix::None => {}
            MandatoryPrefix::P66 => {
                self.raw.take(RawPrefixes::OVERRIDE_OPERAND);
                self.update_operand_size();
            }
            MandatoryPrefix::PF3 => {
                self.raw.take(RawPrefixes::REP_REPE);
            }
            MandatoryPrefix::PF2 => {
                self.raw.take(RawPrefixes::REPNE);
            }
        }
        self.mandatory = MandatoryPrefix::None;
    }

    fn update_operand_size(&mut self) {
        let override_operand = self.raw.contains(RawPrefixes::OVERRIDE_OPERAND);
        self.operand_size = match self.mode.default_operand_size() {
            _ if self.rex_w() => OpSize::Bits64,
            OpSize::Bits16 if override_operand => OpSize::Bits32,
            _ if override_operand => OpSize::Bits16,
            default => default,
        };
    }

    fn update_address_size(&mut self) {
        let override_address = self.raw.contains(RawPrefixes::OVERRIDE_ADDRESS);
        self.address_size = match self.mode.default_address_size() {
            OpSize::Bits16 if override_address => OpSize::Bits32,
            OpSize::Bits32 if override_address => OpSize::Bits16,
            OpSize::Bits64 if override_address => OpSize::Bits32,
            default => default,
        };
    }
}

/// Consumes all legacy and REX prefixes in front of an instruction.
///
/// Stops at the first byte that is not a prefix, which stays unread. Only the
/// 15 byte length limit and the end of the buffer can make this fail, illegal
/// combinations of prefixes are rejected once the opcode is known.
pub fn scan_prefixes(cursor: &mut ByteCursor, mode: DecodeMode) -> Result<PrefixState, DecoderError> {
    let mut state = PrefixState::new(mode);

    loop {
        let byte = cursor.peek()?;

        if mode == DecodeMode::Bits64 && bitpat!(0 1 0 0 _ _ _ _)(byte) {
            // REX only counts if it's the last prefix, a later legacy prefix
            // will discard it again.
            cursor.read()?;
            state.rex = Some(Rex(byte));
            continue;
        }

        state.raw = match state.raw.decode(byte) {
            Ok(raw) => raw,
            Err(_) => break,
        };
        cursor.read()?;
        state.rex = None;

        match byte {
            0x26 | 0x2E | 0x36 | 0x3E => {
                // In 64-bit mode these are ignored after an FS or GS override.
                let fs_gs = match state.segment {
                    Some(Register::Fs) | Some(Register::Gs) => true,
                    _ => false,
                };
                if mode != DecodeMode::Bits64 || !fs_gs {
                    state.segment = Some(match byte {
                        0x26 => Register::Es,
                        0x2E => Register::Cs,
                        0x36 => Register::Ss,
                        _ => Register::Ds,
                    });
                }
            }
            0x64 => state.segment = Some(Register::Fs),
            0x65 => state.segment = Some(Register::Gs),
            0x66 => {
                if state.mandatory == MandatoryPrefix::None {
                    state.mandatory = MandatoryPrefix::P66;
                }
            }
            0xF3 => state.mandatory = MandatoryPrefix::PF3,
            0xF2 => state.mandatory = MandatoryPrefix::PF2,
            _ => {}
        }
    }

    state.update_operand_size();
    state.update_address_size();
    trace!("prefixes: {:?}", state);
    Ok(state)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scan(mode: DecodeMode, bytes: &[u8]) -> (PrefixState, usize) {
        let mut cursor = ByteCursor::new(bytes);
        let state = scan_prefixes(&mut cursor, mode).unwrap();
        (state, cursor.position())
    }

    #[test]
    fn stops_at_opcode() {
        let (state, pos) = scan(DecodeMode::Bits32, &[0x0F, 0xF8, 0x08]);
        assert_eq!(pos, 0);
        assert_eq!(state.raw, RawPrefixes::empty());
        assert_eq!(state.mandatory, MandatoryPrefix::None);
        assert_eq!(state.operand_size, OpSize::Bits32);
        assert_eq!(state.address_size, OpSize::Bits32);

        let (_, pos) = scan(DecodeMode::Bits32, &[0x66, 0xF0, 0x2E, 0xC4, 0xE2]);
        assert_eq!(pos, 3);
    }

    #[test]
    fn operand_size() {
        let (state, _) = scan(DecodeMode::Bits16, &[0x66, 0x0F]);
        assert_eq!(state.operand_size, OpSize::Bits32);
        assert_eq!(state.mandatory, MandatoryPrefix::P66);

        let (state, _) = scan(DecodeMode::Bits32, &[0x66, 0x0F]);
        assert_eq!(state.operand_size, OpSize::Bits16);

        let (state, _) = scan(DecodeMode::Bits64, &[0x66, 0x48, 0x0F]);
        assert_eq!(state.operand_size, OpSize::Bits64);
        assert!(state.rex_w());
    }

    #[test]
    fn address_size() {
        let (state, _) = scan(DecodeMode::Bits16, &[0x67, 0x0F]);
        assert_eq!(state.address_size, OpSize::Bits32);
        let (state, _) = scan(DecodeMode::Bits32, &[0x67, 0x0F]);
        assert_eq!(state.address_size, OpSize::Bits16);
        let (state, _) = scan(DecodeMode::Bits64, &[0x67, 0x0F]);
        assert_eq!(state.address_size, OpSize::Bits32);
        let (state, _) = scan(DecodeMode::Bits64, &[0x0F]);
        assert_eq!(state.address_size, OpSize::Bits64);
    }

    #[test]
    fn rex_must_be_last() {
        let (state, pos) = scan(DecodeMode::Bits64, &[0x48, 0x66, 0x0F]);
        assert_eq!(pos, 2);
        assert_eq!(state.rex, None);
        assert_eq!(state.operand_size, OpSize::Bits16);

        let (state, pos) = scan(DecodeMode::Bits64, &[0x41, 0x4C, 0x0F]);
        assert_eq!(pos, 2);
        assert_eq!(state.rex, Some(Rex(0x4C)));
        let rex = Rex(0x4C);
        assert!(rex.w() && rex.r() && !rex.x() && !rex.b());
    }

    #[test]
    fn no_rex_outside_long_mode() {
        let (state, pos) = scan(DecodeMode::Bits32, &[0x48, 0x0F]);
        assert_eq!(pos, 0);
        assert_eq!(state.rex, None);
    }

    #[test]
    fn mandatory_prefix_candidates() {
        let (state, _) = scan(DecodeMode::Bits64, &[0xF3, 0xF2, 0x0F]);
        assert_eq!(state.mandatory, MandatoryPrefix::PF2);
        assert!(state.has_repe() && state.has_repne());

        let (state, _) = scan(DecodeMode::Bits64, &[0xF2, 0x66, 0x0F]);
        assert_eq!(state.mandatory, MandatoryPrefix::PF2);

        let (state, _) = scan(DecodeMode::Bits64, &[0x66, 0xF3, 0x0F]);
        assert_eq!(state.mandatory, MandatoryPrefix::PF3);
    }

    #[test]
    fn consuming_mandatory_prefixes() {
        let (mut state, _) = scan(DecodeMode::Bits32, &[0x66, 0x0F]);
        state.consume_mandatory();
        assert_eq!(state.operand_size, OpSize::Bits32);
        assert_eq!(state.mandatory, MandatoryPrefix::None);

        let (mut state, _) = scan(DecodeMode::Bits32, &[0xF3, 0xF2, 0x0F]);
        state.consume_mandatory();
        assert!(state.has_repe());
        assert!(!state.has_repne());
    }

    #[test]
    fn segment_overrides() {
        let (state, _) = scan(DecodeMode::Bits32, &[0x64, 0x2E, 0x0F]);
        assert_eq!(state.segment, Some(Register::Cs));

        let (state, _) = scan(DecodeMode::Bits64, &[0x64, 0x2E, 0x0F]);
        assert_eq!(state.segment, Some(Register::Fs));

        let (state, _) = scan(DecodeMode::Bits64, &[0x26, 0x65, 0x0F]);
        assert_eq!(state.segment, Some(Register::Gs));

        let (state, _) = scan(DecodeMode::Bits64, &[0x36, 0x0F]);
        assert_eq!(state.segment, Some(Register::Ss));
    }

    #[test]
    fn vex_pp_field() {
        assert_eq!(MandatoryPrefix::from_pp(0), MandatoryPrefix::None);
        assert_eq!(MandatoryPrefix::from_pp(1), MandatoryPrefix::P66);
        assert_eq!(MandatoryPrefix::from_pp(2), MandatoryPrefix::PF3);
        assert_eq!(MandatoryPrefix::from_pp(3), MandatoryPrefix::PF2);
    }

    #[test]
    fn empty_input() {
        let mut cursor = ByteCursor::new(&[]);
        assert_eq!(scan_prefixes(&mut cursor, DecodeMode::Bits64), Err(DecoderError::OutOfBounds));

        let mut cursor = ByteCursor::new(&[0x66, 0x67]);
        assert_eq!(scan_prefixes(&mut cursor, DecodeMode::Bits64), Err(DecoderError::OutOfBounds));
    }
}
