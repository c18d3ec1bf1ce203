extern crate x86dec;
extern crate env_logger;
extern crate termcolor;
#[macro_use] extern crate structopt;

use x86dec::cpu::{DecodeMode, Decoder, DecoderOptions};

use structopt::StructOpt;
use termcolor::{ColorChoice, Color, ColorSpec, StandardStream, WriteColor};
use std::fs;
use std::error::Error;
use std::path::PathBuf;
use std::io::Write;
use std::str::FromStr;
use std::num::ParseIntError;

/// Parse a number that might be hexadecimal.
fn parse_hex(src: &str) -> Result<u64, ParseIntError> {
    if src.starts_with("0x") {
        u64::from_str_radix(&src[2..], 16)
    } else {
        u64::from_str(src)
    }
}

/// Parses machine code given as hex bytes. Bytes may be separated by
/// whitespace or written together, like `66 0FF8 08`.
fn parse_bytes(args: &[String]) -> Result<Vec<u8>, String> {
    let digits: String = args.iter()
        .flat_map(|arg| arg.chars())
        .filter(|c| !c.is_whitespace())
        .collect();
    if digits.len() % 2 != 0 {
        return Err(format!("odd number of hex digits in '{}'", digits));
    }

    (0..digits.len()).step_by(2)
        .map(|i| {
            let hexstr = &digits[i..i + 2];
            u8::from_str_radix(hexstr, 16).map_err(|e| format!("invalid byte '{}': {}", hexstr, e))
        })
        .collect()
}

#[derive(Debug, StructOpt)]
#[structopt(name = "x86dec", about = "Decode x86 machine code")]
struct Opt {
    /// Processor mode to decode for (16, 32 or 64).
    #[structopt(long = "mode", default_value = "64")]
    mode: DecodeMode,

    /// Instruction pointer of the first instruction (can also be a
    /// hexadecimal value starting with `0x`).
    #[structopt(long = "ip", default_value = "0", parse(try_from_str = "parse_hex"))]
    ip: u64,

    /// Accept instructions with misused prefixes or unused fields.
    #[structopt(long = "no-invalid-check")]
    no_invalid_check: bool,

    /// Read the machine code from a raw binary file.
    #[structopt(long = "file", parse(from_os_str))]
    file: Option<PathBuf>,

    /// Machine code as hex bytes, used when no file is given.
    bytes: Vec<String>,
}

const COLOR_ADDR: Color = Color::Cyan;
const COLOR_BYTES: Color = Color::Green;
const COLOR_ERROR: Color = Color::Red;

fn print_colored<W: WriteColor>(w: &mut W, color: Color, text: &str) -> Result<(), Box<Error>> {
    w.set_color(ColorSpec::new().set_fg(Some(color)))?;
    write!(w, "{}", text)?;
    w.set_color(ColorSpec::new().set_fg(None))?;
    Ok(())
}

fn main() -> Result<(), Box<Error>> {
    env_logger::init();

    let opt = Opt::from_args();

    let code = match opt.file {
        Some(ref path) => fs::read(path)?,
        None => parse_bytes(&opt.bytes)?,
    };

    let options = if opt.no_invalid_check {
        DecoderOptions::NO_INVALID_CHECK
    } else {
        DecoderOptions::NONE
    };

    let mut out = StandardStream::stdout(ColorChoice::Auto);
    let mut decoder = Decoder::new(opt.mode, &code, options).with_ip(opt.ip);
    let mut errors = 0;
    while decoder.can_decode() {
        let ip = decoder.ip();
        let start = decoder.position();
        let result = decoder.decode();
        let raw = code[start..decoder.position()].iter()
            .map(|b| format!("{:02X} ", b))
            .collect::<String>();

        print_colored(&mut out, COLOR_ADDR, &format!("{:016X}  ", ip))?;
        print_colored(&mut out, COLOR_BYTES, &format!("{:46} ", raw))?;
        match result {
            Ok(instr) => writeln!(out, "{}", instr)?,
            Err(e) => {
                errors += 1;
                print_colored(&mut out, COLOR_ERROR, &format!("(bad: {})", e))?;
                writeln!(out)?;
            }
        }
    }

    if errors != 0 {
        eprintln!("{} byte(s) could not be decoded", errors);
    }

    Ok(())
}
