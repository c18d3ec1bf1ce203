extern crate x86dec;
extern crate termcolor;

use x86dec::cpu::{Code, EncodingKind, MandatoryPrefix};
use x86dec::cpu::defs::{OpSize, OpcodeMap};
use x86dec::cpu::table::{resolve, Key};

use termcolor::{ColorChoice, Color, ColorSpec, StandardStream, WriteColor};
use std::collections::BTreeSet;
use std::error::Error;
use std::io::Write;

const PREFIXES: [MandatoryPrefix; 4] = [
    MandatoryPrefix::None,
    MandatoryPrefix::P66,
    MandatoryPrefix::PF3,
    MandatoryPrefix::PF2,
];

const OP_SIZES: [OpSize; 3] = [OpSize::Bits16, OpSize::Bits32, OpSize::Bits64];

const TABLES: [(EncodingKind, OpcodeMap); 9] = [
    (EncodingKind::Legacy, OpcodeMap::Map0F),
    (EncodingKind::Legacy, OpcodeMap::Map0F38),
    (EncodingKind::Legacy, OpcodeMap::Map0F3A),
    (EncodingKind::Vex, OpcodeMap::Map0F),
    (EncodingKind::Vex, OpcodeMap::Map0F38),
    (EncodingKind::Vex, OpcodeMap::Map0F3A),
    (EncodingKind::Evex, OpcodeMap::Map0F),
    (EncodingKind::Evex, OpcodeMap::Map0F38),
    (EncodingKind::Evex, OpcodeMap::Map0F3A),
];

/// Collects every instruction an opcode can decode to, by trying all
/// prefixes, vector lengths, `W` values, operand sizes and group extensions.
fn codes(encoding: EncodingKind, map: OpcodeMap, opcode: u8) -> BTreeSet<Code> {
    let mut codes = BTreeSet::new();
    for &prefix in &PREFIXES {
        for length in 0..4 {
            for &w in &[false, true] {
                for &op_size in &OP_SIZES {
                    for modrm_reg in 0..8 {
                        let key = Key {
                            encoding,
                            map,
                            opcode,
                            prefix,
                            length,
                            w,
                            op_size,
                            op_size_without_66: op_size,
                            modrm_reg,
                        };
                        if let Ok(resolved) = resolve(&key) {
                            codes.insert(resolved.template.code);
                        }
                    }
                }
            }
        }
    }
    codes
}

fn main() -> Result<(), Box<Error>> {
    let mut out = StandardStream::stdout(ColorChoice::Auto);

    let mut all_codes = BTreeSet::new();
    let mut opcode_count = 0;
    for &(encoding, map) in &TABLES {
        writeln!(out, "{:?} {:?} opcodes implemented:", encoding, map)?;
        for opcode in 0x00..=0xff {
            let codes = codes(encoding, map, opcode);
            let color = if codes.is_empty() { Color::Red } else { Color::Green };
            if !codes.is_empty() {
                opcode_count += 1;
            }
            all_codes.extend(codes);

            out.set_color(ColorSpec::new().set_fg(Some(color)))?;
            write!(out, " {:02X}", opcode)?;
            out.set_color(ColorSpec::new().set_fg(None))?;
            if opcode % 32 == 31 {
                writeln!(out)?;
            }
        }
        writeln!(out)?;
    }

    writeln!(out, "{} opcodes decode to {} distinct instructions:", opcode_count, all_codes.len())?;
    for code in &all_codes {
        writeln!(out, "  {:?} ({})", code, code.mnemonic())?;
    }

    Ok(())
}
