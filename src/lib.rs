//! A table-driven x86 instruction decoder.
//!
//! Decodes 16-, 32- and 64-bit machine code into structured `Instruction`s:
//! the instruction `Code`, its operands (registers, memory operands with base,
//! index, scale, displacement and segment, immediates), the prefixes that
//! apply to it, and the EVEX opmask, zeroing, broadcast, rounding and
//! suppress-all-exceptions attributes.
//!
//! Legacy, VEX and EVEX encodings are decoded through separate opcode tables,
//! so the same opcode byte may decode to different instructions depending on
//! the prefix that introduced it.
//!
//! # Example
//!
//! ```
//! use x86dec::cpu::{Code, DecodeMode, Decoder, DecoderOptions, Register};
//!
//! let bytes = [0x48, 0x0F, 0xFF, 0xCE];
//! let mut decoder = Decoder::new(DecodeMode::Bits64, &bytes, DecoderOptions::NONE);
//! let instr = decoder.decode().unwrap();
//!
//! assert_eq!(instr.code(), Code::Ud0_Gq_Eq);
//! assert_eq!(instr.op_register(0), Some(Register::Rcx));
//! assert_eq!(instr.op_register(1), Some(Register::Rsi));
//! assert_eq!(instr.len(), 4);
//! ```

#![doc(html_root_url = "https://docs.rs/x86dec/0.1.0")]
#![warn(missing_debug_implementations)]
//#![warn(missing_docs)]

#[macro_use] extern crate bitflags;
#[macro_use] extern crate bitpat;
#[macro_use] extern crate log;
#[macro_use] extern crate num_derive;
extern crate num_traits;

pub mod cpu;
