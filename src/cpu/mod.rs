//! Decoding of x86 machine code.

mod cursor;
mod modrm;
mod prefix;
mod vector;
pub mod code;
pub mod decode;
pub mod defs;
pub mod instr;
pub mod memsize;
pub mod register;
pub mod table;

pub use self::code::{Code, EncodingKind, Mnemonic};
pub use self::decode::{DecodeMode, Decoder, DecoderError, DecoderOptions};
pub use self::instr::{ConstantOffsets, Instruction, MemoryOperand, OpKind, Operand, RoundingControl};
pub use self::memsize::MemorySize;
pub use self::prefix::MandatoryPrefix;
pub use self::register::{Register, RegisterKind};
