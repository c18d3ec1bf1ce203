//! Static opcode tables and their lookup.
//!
//! Every supported opcode is the root of a small decision tree. Inner nodes
//! pick a branch by one property of the instruction (mandatory prefix, vector
//! length, `W` bit, operand size or ModR/M.reg), leaves hold the `Template`
//! describing the instruction. Legacy, VEX and EVEX encodings have separate
//! tables, so the same opcode byte can map to unrelated instructions.

use cpu::code::{Code, EncodingKind};
use cpu::decode::DecoderError;
use cpu::defs::{MaskSupport, OpSize, OpcodeMap, OperandSpec, RegisterB, Template, TupleType};
use cpu::memsize::MemorySize;
use cpu::prefix::MandatoryPrefix;
use cpu::register::RegisterKind::*;

use self::OperandSpec::*;

/// A node of an opcode decision tree.
#[derive(Debug)]
pub enum Node {
    /// No instruction is encoded here.
    Invalid,
    Leaf(Template),
    /// Branches on the mandatory prefix: none, `66`, `F3`, `F2`.
    ///
    /// The prefix is consumed, so it no longer acts as an operand-size or
    /// repeat prefix.
    Prefix(&'static [Node; 4]),
    /// Branches on a repeat prefix: none, `F3`, `F2`.
    ///
    /// Unlike `Prefix`, a `66` prefix is not part of the opcode here and
    /// keeps selecting the operand size.
    RepPrefix(&'static [Node; 3]),
    /// Branches on the vector length: 128, 256, 512 bits, reserved.
    Length(&'static [Node; 4]),
    /// Branches on REX.W/VEX.W/EVEX.W.
    W(&'static [Node; 2]),
    /// Branches on the effective operand size: 16, 32, 64 bits.
    OpSize(&'static [Node; 3]),
    /// Branches on the ModR/M reg field.
    Group(&'static [Node; 8]),
}

/// The properties of an instruction that select its template.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct Key {
    pub encoding: EncodingKind,
    pub map: OpcodeMap,
    pub opcode: u8,
    /// Legacy mandatory prefix candidate, or the VEX/EVEX `pp` field.
    pub prefix: MandatoryPrefix,
    /// `L` or `L'L`.
    pub length: u8,
    /// The `W` bit, where it is meaningful in the current mode.
    pub w: bool,
    /// Operand size including the effect of a `66` prefix.
    pub op_size: OpSize,
    /// Operand size if a `66` prefix is consumed as mandatory prefix.
    pub op_size_without_66: OpSize,
    pub modrm_reg: u8,
}

/// Result of a table lookup.
#[derive(Debug, Copy, Clone)]
pub struct Resolved {
    pub template: &'static Template,
    /// Whether the mandatory prefix candidate was used to select the
    /// template.
    pub consumed_prefix: bool,
}

/// Looks up the template of an instruction.
pub fn resolve(key: &Key) -> Result<Resolved, DecoderError> {
    let mut node = root(key.encoding, key.map, key.opcode);
    let mut consumed_prefix = false;
    let mut op_size = key.op_size;

    loop {
        node = match node {
            Node::Invalid => return Err(DecoderError::unknown_opcode(key.map, key.opcode)),
            Node::Leaf(template) => {
                return Ok(Resolved { template, consumed_prefix })
            }
            Node::Prefix(nodes) => {
                match key.prefix {
                    MandatoryPrefix::None => {}
                    MandatoryPrefix::P66 => {
                        consumed_prefix = true;
                        op_size = key.op_size_without_66;
                    }
                    MandatoryPrefix::PF3 | MandatoryPrefix::PF2 => consumed_prefix = true,
                }
                &nodes[key.prefix as usize]
            }
            Node::RepPrefix(nodes) => match key.prefix {
                MandatoryPrefix::PF3 => {
                    consumed_prefix = true;
                    &nodes[1]
                }
                MandatoryPrefix::PF2 => {
                    consumed_prefix = true;
                    &nodes[2]
                }
                MandatoryPrefix::None | MandatoryPrefix::P66 => &nodes[0],
            },
            Node::Length(nodes) => {
                let next = &nodes[(key.length & 0b11) as usize];
                if let Node::Invalid = next {
                    if key.length == 3 && key.encoding == EncodingKind::Evex {
                        return Err(DecoderError::reserved_bits("EVEX.L'L = 11"));
                    }
                }
                next
            }
            Node::W(nodes) => &nodes[key.w as usize],
            Node::OpSize(nodes) => &nodes[match op_size {
                OpSize::Bits16 => 0,
                OpSize::Bits32 => 1,
                OpSize::Bits64 => 2,
            }],
            Node::Group(nodes) => &nodes[(key.modrm_reg & 0b111) as usize],
        };
    }
}

static INVALID: Node = Node::Invalid;

/// Returns the root node of an opcode.
fn root(encoding: EncodingKind, map: OpcodeMap, opcode: u8) -> &'static Node {
    let (table, first): (&'static [Node], u8) = match (encoding, map) {
        (EncodingKind::Legacy, OpcodeMap::Map0F) => (&LEGACY_0F, 0xF8),
        (EncodingKind::Legacy, OpcodeMap::Map0F38) => (&LEGACY_0F38, 0xF0),
        (EncodingKind::Legacy, OpcodeMap::Map0F3A) => (&LEGACY_0F3A, 0x60),
        (EncodingKind::Vex, OpcodeMap::Map0F) => (&VEX_0F, 0xF8),
        (EncodingKind::Vex, OpcodeMap::Map0F38) => (&VEX_0F38, 0xF0),
        (EncodingKind::Vex, OpcodeMap::Map0F3A) => (&VEX_0F3A, 0x60),
        (EncodingKind::Evex, OpcodeMap::Map0F) => (&EVEX_0F, 0xF8),
        (EncodingKind::Evex, OpcodeMap::Map0F3A) => (&EVEX_0F3A, 0x60),
        _ => return &INVALID,
    };

    opcode.checked_sub(first)
        .and_then(|index| table.get(index as usize))
        .unwrap_or(&INVALID)
}

/// Legacy and VEX instruction without EVEX features.
macro_rules! op {
    ($code:ident, $ops:expr, $mem:ident) => {
        Node::Leaf(Template {
            code: Code::$code,
            operands: $ops,
            memory: MemorySize::$mem,
            broadcast: MemorySize::Unknown,
            tuple: TupleType::None,
            mask: MaskSupport::None,
            register_b: RegisterB::None,
            lockable: false,
        })
    };
}

/// EVEX instruction.
macro_rules! evex {
    ($code:ident, $ops:expr, $mem:ident, $bcst:ident, $tuple:ident, $mask:ident) => {
        Node::Leaf(Template {
            code: Code::$code,
            operands: $ops,
            memory: MemorySize::$mem,
            broadcast: MemorySize::$bcst,
            tuple: TupleType::$tuple,
            mask: MaskSupport::$mask,
            register_b: RegisterB::None,
            lockable: false,
        })
    };
}

// Operand lists, named like the Intel opcode map (`G` = ModR/M.reg GPR,
// `E` = ModR/M.rm GPR or memory, `M` = memory only, `B`/`H` = vvvv, `P`/`Q`
// = MMX, `V`/`W` = vector, `K` = opmask).
const P_Q: &[OperandSpec] = &[Reg(Mm), Rm(Mm)];
const VX_WX: &[OperandSpec] = &[Reg(Xmm), Rm(Xmm)];
const GW_EW: &[OperandSpec] = &[Reg(Gpr16), Rm(Gpr16)];
const GD_ED: &[OperandSpec] = &[Reg(Gpr32), Rm(Gpr32)];
const GQ_EQ: &[OperandSpec] = &[Reg(Gpr64), Rm(Gpr64)];
const GW_MW: &[OperandSpec] = &[Reg(Gpr16), Mem];
const GD_MD: &[OperandSpec] = &[Reg(Gpr32), Mem];
const GQ_MQ: &[OperandSpec] = &[Reg(Gpr64), Mem];
const MW_GW: &[OperandSpec] = &[Mem, Reg(Gpr16)];
const MD_GD: &[OperandSpec] = &[Mem, Reg(Gpr32)];
const MQ_GQ: &[OperandSpec] = &[Mem, Reg(Gpr64)];
const GD_EB: &[OperandSpec] = &[Reg(Gpr32), Rm(Gpr8)];
const GQ_EB: &[OperandSpec] = &[Reg(Gpr64), Rm(Gpr8)];
const GD_EW: &[OperandSpec] = &[Reg(Gpr32), Rm(Gpr16)];
const VX_WX_IB: &[OperandSpec] = &[Reg(Xmm), Rm(Xmm), Imm8];
const VX_HX_WX: &[OperandSpec] = &[Reg(Xmm), Vvvv(Xmm), Rm(Xmm)];
const VY_HY_WY: &[OperandSpec] = &[Reg(Ymm), Vvvv(Ymm), Rm(Ymm)];
const VZ_HZ_WZ: &[OperandSpec] = &[Reg(Zmm), Vvvv(Zmm), Rm(Zmm)];
const GD_BD_ED: &[OperandSpec] = &[Reg(Gpr32), Vvvv(Gpr32), Rm(Gpr32)];
const GQ_BQ_EQ: &[OperandSpec] = &[Reg(Gpr64), Vvvv(Gpr64), Rm(Gpr64)];
const GD_ED_BD: &[OperandSpec] = &[Reg(Gpr32), Rm(Gpr32), Vvvv(Gpr32)];
const GQ_EQ_BQ: &[OperandSpec] = &[Reg(Gpr64), Rm(Gpr64), Vvvv(Gpr64)];
const BD_ED: &[OperandSpec] = &[Vvvv(Gpr32), Rm(Gpr32)];
const BQ_EQ: &[OperandSpec] = &[Vvvv(Gpr64), Rm(Gpr64)];
const KR_WX_IB: &[OperandSpec] = &[Reg(Opmask), Rm(Xmm), Imm8];
const KR_WY_IB: &[OperandSpec] = &[Reg(Opmask), Rm(Ymm), Imm8];
const KR_WZ_IB: &[OperandSpec] = &[Reg(Opmask), Rm(Zmm), Imm8];

/// `0F F8`-`0F FF`
static LEGACY_0F: [Node; 8] = [
    Node::Prefix(&[
        op!(Psubb_P_Q, P_Q, Packed64_Int8),
        op!(Psubb_VX_WX, VX_WX, Packed128_Int8),
        Node::Invalid,
        Node::Invalid,
    ]),
    Node::Prefix(&[
        op!(Psubw_P_Q, P_Q, Packed64_Int16),
        op!(Psubw_VX_WX, VX_WX, Packed128_Int16),
        Node::Invalid,
        Node::Invalid,
    ]),
    Node::Prefix(&[
        op!(Psubd_P_Q, P_Q, Packed64_Int32),
        op!(Psubd_VX_WX, VX_WX, Packed128_Int32),
        Node::Invalid,
        Node::Invalid,
    ]),
    Node::Prefix(&[
        op!(Psubq_P_Q, P_Q, Int64),
        op!(Psubq_VX_WX, VX_WX, Packed128_Int64),
        Node::Invalid,
        Node::Invalid,
    ]),
    Node::Prefix(&[
        op!(Paddb_P_Q, P_Q, Packed64_Int8),
        op!(Paddb_VX_WX, VX_WX, Packed128_Int8),
        Node::Invalid,
        Node::Invalid,
    ]),
    Node::Prefix(&[
        op!(Paddw_P_Q, P_Q, Packed64_Int16),
        op!(Paddw_VX_WX, VX_WX, Packed128_Int16),
        Node::Invalid,
        Node::Invalid,
    ]),
    Node::Prefix(&[
        op!(Paddd_P_Q, P_Q, Packed64_Int32),
        op!(Paddd_VX_WX, VX_WX, Packed128_Int32),
        Node::Invalid,
        Node::Invalid,
    ]),
    Node::OpSize(&[
        op!(Ud0_Gw_Ew, GW_EW, UInt16),
        op!(Ud0_Gd_Ed, GD_ED, UInt32),
        op!(Ud0_Gq_Eq, GQ_EQ, UInt64),
    ]),
];

/// `0F 38 F0`-`0F 38 F7`
static LEGACY_0F38: [Node; 8] = [
    Node::RepPrefix(&[
        Node::OpSize(&[
            op!(Movbe_r16_m16, GW_MW, UInt16),
            op!(Movbe_r32_m32, GD_MD, UInt32),
            op!(Movbe_r64_m64, GQ_MQ, UInt64),
        ]),
        Node::Invalid,
        Node::W(&[
            op!(Crc32_r32_rm8, GD_EB, UInt8),
            op!(Crc32_r64_rm8, GQ_EB, UInt8),
        ]),
    ]),
    Node::RepPrefix(&[
        Node::OpSize(&[
            op!(Movbe_m16_r16, MW_GW, UInt16),
            op!(Movbe_m32_r32, MD_GD, UInt32),
            op!(Movbe_m64_r64, MQ_GQ, UInt64),
        ]),
        Node::Invalid,
        Node::OpSize(&[
            op!(Crc32_r32_rm16, GD_EW, UInt16),
            op!(Crc32_r32_rm32, GD_ED, UInt32),
            op!(Crc32_r64_rm64, GQ_EQ, UInt64),
        ]),
    ]),
    Node::Invalid,
    Node::Invalid,
    Node::Invalid,
    Node::Prefix(&[
        Node::Invalid,
        Node::W(&[
            op!(Wrussd_m32_r32, MD_GD, UInt32),
            op!(Wrussq_m64_r64, MQ_GQ, UInt64),
        ]),
        Node::Invalid,
        Node::Invalid,
    ]),
    Node::Prefix(&[
        Node::W(&[
            op!(Wrssd_m32_r32, MD_GD, UInt32),
            op!(Wrssq_m64_r64, MQ_GQ, UInt64),
        ]),
        Node::W(&[
            op!(Adcx_r32_rm32, GD_ED, UInt32),
            op!(Adcx_r64_rm64, GQ_EQ, UInt64),
        ]),
        Node::W(&[
            op!(Adox_r32_rm32, GD_ED, UInt32),
            op!(Adox_r64_rm64, GQ_EQ, UInt64),
        ]),
        Node::Invalid,
    ]),
    Node::Invalid,
];

/// `0F 3A 60`-`0F 3A 63`
static LEGACY_0F3A: [Node; 4] = [
    Node::Prefix(&[
        Node::Invalid,
        Node::W(&[
            op!(Pcmpestrm_xmm_xmmm128_imm8, VX_WX_IB, Packed128_UInt8),
            op!(Pcmpestrm64_xmm_xmmm128_imm8, VX_WX_IB, Packed128_UInt8),
        ]),
        Node::Invalid,
        Node::Invalid,
    ]),
    Node::Prefix(&[
        Node::Invalid,
        Node::W(&[
            op!(Pcmpestri_xmm_xmmm128_imm8, VX_WX_IB, Packed128_UInt8),
            op!(Pcmpestri64_xmm_xmmm128_imm8, VX_WX_IB, Packed128_UInt8),
        ]),
        Node::Invalid,
        Node::Invalid,
    ]),
    Node::Prefix(&[
        Node::Invalid,
        op!(Pcmpistrm_xmm_xmmm128_imm8, VX_WX_IB, Packed128_UInt8),
        Node::Invalid,
        Node::Invalid,
    ]),
    Node::Prefix(&[
        Node::Invalid,
        op!(Pcmpistri_xmm_xmmm128_imm8, VX_WX_IB, Packed128_UInt8),
        Node::Invalid,
        Node::Invalid,
    ]),
];

/// VEX `0F F8`-`0F FE`
static VEX_0F: [Node; 7] = [
    Node::Prefix(&[
        Node::Invalid,
        Node::Length(&[
            op!(VEX_Vpsubb_VX_HX_WX, VX_HX_WX, Packed128_Int8),
            op!(VEX_Vpsubb_VY_HY_WY, VY_HY_WY, Packed256_Int8),
            Node::Invalid,
            Node::Invalid,
        ]),
        Node::Invalid,
        Node::Invalid,
    ]),
    Node::Prefix(&[
        Node::Invalid,
        Node::Length(&[
            op!(VEX_Vpsubw_VX_HX_WX, VX_HX_WX, Packed128_Int16),
            op!(VEX_Vpsubw_VY_HY_WY, VY_HY_WY, Packed256_Int16),
            Node::Invalid,
            Node::Invalid,
        ]),
        Node::Invalid,
        Node::Invalid,
    ]),
    Node::Prefix(&[
        Node::Invalid,
        Node::Length(&[
            op!(VEX_Vpsubd_VX_HX_WX, VX_HX_WX, Packed128_Int32),
            op!(VEX_Vpsubd_VY_HY_WY, VY_HY_WY, Packed256_Int32),
            Node::Invalid,
            Node::Invalid,
        ]),
        Node::Invalid,
        Node::Invalid,
    ]),
    Node::Prefix(&[
        Node::Invalid,
        Node::Length(&[
            op!(VEX_Vpsubq_VX_HX_WX, VX_HX_WX, Packed128_Int64),
            op!(VEX_Vpsubq_VY_HY_WY, VY_HY_WY, Packed256_Int64),
            Node::Invalid,
            Node::Invalid,
        ]),
        Node::Invalid,
        Node::Invalid,
    ]),
    Node::Prefix(&[
        Node::Invalid,
        Node::Length(&[
            op!(VEX_Vpaddb_VX_HX_WX, VX_HX_WX, Packed128_Int8),
            op!(VEX_Vpaddb_VY_HY_WY, VY_HY_WY, Packed256_Int8),
            Node::Invalid,
            Node::Invalid,
        ]),
        Node::Invalid,
        Node::Invalid,
    ]),
    Node::Prefix(&[
        Node::Invalid,
        Node::Length(&[
            op!(VEX_Vpaddw_VX_HX_WX, VX_HX_WX, Packed128_Int16),
            op!(VEX_Vpaddw_VY_HY_WY, VY_HY_WY, Packed256_Int16),
            Node::Invalid,
            Node::Invalid,
        ]),
        Node::Invalid,
        Node::Invalid,
    ]),
    Node::Prefix(&[
        Node::Invalid,
        Node::Length(&[
            op!(VEX_Vpaddd_VX_HX_WX, VX_HX_WX, Packed128_Int32),
            op!(VEX_Vpaddd_VY_HY_WY, VY_HY_WY, Packed256_Int32),
            Node::Invalid,
            Node::Invalid,
        ]),
        Node::Invalid,
        Node::Invalid,
    ]),
];

/// VEX `0F 38 F0`-`0F 38 F7`, the BMI1/BMI2 instructions.
static VEX_0F38: [Node; 8] = [
    Node::Invalid,
    Node::Invalid,
    Node::Prefix(&[
        Node::Length(&[
            Node::W(&[
                op!(VEX_Andn_r32_r32_rm32, GD_BD_ED, UInt32),
                op!(VEX_Andn_r64_r64_rm64, GQ_BQ_EQ, UInt64),
            ]),
            Node::Invalid,
            Node::Invalid,
            Node::Invalid,
        ]),
        Node::Invalid,
        Node::Invalid,
        Node::Invalid,
    ]),
    Node::Prefix(&[
        Node::Length(&[
            Node::Group(&[
                Node::Invalid,
                Node::W(&[
                    op!(VEX_Blsr_r32_rm32, BD_ED, UInt32),
                    op!(VEX_Blsr_r64_rm64, BQ_EQ, UInt64),
                ]),
                Node::W(&[
                    op!(VEX_Blsmsk_r32_rm32, BD_ED, UInt32),
                    op!(VEX_Blsmsk_r64_rm64, BQ_EQ, UInt64),
                ]),
                Node::W(&[
                    op!(VEX_Blsi_r32_rm32, BD_ED, UInt32),
                    op!(VEX_Blsi_r64_rm64, BQ_EQ, UInt64),
                ]),
                Node::Invalid,
                Node::Invalid,
                Node::Invalid,
                Node::Invalid,
            ]),
            Node::Invalid,
            Node::Invalid,
            Node::Invalid,
        ]),
        Node::Invalid,
        Node::Invalid,
        Node::Invalid,
    ]),
    Node::Invalid,
    Node::Prefix(&[
        Node::Length(&[
            Node::W(&[
                op!(VEX_Bzhi_r32_rm32_r32, GD_ED_BD, UInt32),
                op!(VEX_Bzhi_r64_rm64_r64, GQ_EQ_BQ, UInt64),
            ]),
            Node::Invalid,
            Node::Invalid,
            Node::Invalid,
        ]),
        Node::Invalid,
        Node::Length(&[
            Node::W(&[
                op!(VEX_Pext_r32_r32_rm32, GD_BD_ED, UInt32),
                op!(VEX_Pext_r64_r64_rm64, GQ_BQ_EQ, UInt64),
            ]),
            Node::Invalid,
            Node::Invalid,
            Node::Invalid,
        ]),
        Node::Length(&[
            Node::W(&[
                op!(VEX_Pdep_r32_r32_rm32, GD_BD_ED, UInt32),
                op!(VEX_Pdep_r64_r64_rm64, GQ_BQ_EQ, UInt64),
            ]),
            Node::Invalid,
            Node::Invalid,
            Node::Invalid,
        ]),
    ]),
    Node::Prefix(&[
        Node::Invalid,
        Node::Invalid,
        Node::Invalid,
        Node::Length(&[
            Node::W(&[
                op!(VEX_Mulx_r32_r32_rm32, GD_BD_ED, UInt32),
                op!(VEX_Mulx_r64_r64_rm64, GQ_BQ_EQ, UInt64),
            ]),
            Node::Invalid,
            Node::Invalid,
            Node::Invalid,
        ]),
    ]),
    Node::Prefix(&[
        Node::Length(&[
            Node::W(&[
                op!(VEX_Bextr_r32_rm32_r32, GD_ED_BD, UInt32),
                op!(VEX_Bextr_r64_rm64_r64, GQ_EQ_BQ, UInt64),
            ]),
            Node::Invalid,
            Node::Invalid,
            Node::Invalid,
        ]),
        Node::Length(&[
            Node::W(&[
                op!(VEX_Shlx_r32_rm32_r32, GD_ED_BD, UInt32),
                op!(VEX_Shlx_r64_rm64_r64, GQ_EQ_BQ, UInt64),
            ]),
            Node::Invalid,
            Node::Invalid,
            Node::Invalid,
        ]),
        Node::Length(&[
            Node::W(&[
                op!(VEX_Sarx_r32_rm32_r32, GD_ED_BD, Int32),
                op!(VEX_Sarx_r64_rm64_r64, GQ_EQ_BQ, Int64),
            ]),
            Node::Invalid,
            Node::Invalid,
            Node::Invalid,
        ]),
        Node::Length(&[
            Node::W(&[
                op!(VEX_Shrx_r32_rm32_r32, GD_ED_BD, UInt32),
                op!(VEX_Shrx_r64_rm64_r64, GQ_EQ_BQ, UInt64),
            ]),
            Node::Invalid,
            Node::Invalid,
            Node::Invalid,
        ]),
    ]),
];

/// VEX `0F 3A 60`-`0F 3A 63`
static VEX_0F3A: [Node; 4] = [
    Node::Prefix(&[
        Node::Invalid,
        Node::Length(&[
            Node::W(&[
                op!(VEX_Vpcmpestrm_xmm_xmmm128_imm8, VX_WX_IB, Packed128_UInt8),
                op!(VEX_Vpcmpestrm64_xmm_xmmm128_imm8, VX_WX_IB, Packed128_UInt8),
            ]),
            Node::Invalid,
            Node::Invalid,
            Node::Invalid,
        ]),
        Node::Invalid,
        Node::Invalid,
    ]),
    Node::Prefix(&[
        Node::Invalid,
        Node::Length(&[
            Node::W(&[
                op!(VEX_Vpcmpestri_xmm_xmmm128_imm8, VX_WX_IB, Packed128_UInt8),
                op!(VEX_Vpcmpestri64_xmm_xmmm128_imm8, VX_WX_IB, Packed128_UInt8),
            ]),
            Node::Invalid,
            Node::Invalid,
            Node::Invalid,
        ]),
        Node::Invalid,
        Node::Invalid,
    ]),
    Node::Prefix(&[
        Node::Invalid,
        Node::Length(&[
            op!(VEX_Vpcmpistrm_xmm_xmmm128_imm8, VX_WX_IB, Packed128_UInt8),
            Node::Invalid,
            Node::Invalid,
            Node::Invalid,
        ]),
        Node::Invalid,
        Node::Invalid,
    ]),
    Node::Prefix(&[
        Node::Invalid,
        Node::Length(&[
            op!(VEX_Vpcmpistri_xmm_xmmm128_imm8, VX_WX_IB, Packed128_UInt8),
            Node::Invalid,
            Node::Invalid,
            Node::Invalid,
        ]),
        Node::Invalid,
        Node::Invalid,
    ]),
];

/// EVEX `0F F8`-`0F FE`
static EVEX_0F: [Node; 7] = [
    Node::Prefix(&[
        Node::Invalid,
        Node::Length(&[
            evex!(EVEX_Vpsubb_VX_k1z_HX_WX, VX_HX_WX, Packed128_Int8, Unknown, FullMem, MergeZero),
            evex!(EVEX_Vpsubb_VY_k1z_HY_WY, VY_HY_WY, Packed256_Int8, Unknown, FullMem, MergeZero),
            evex!(EVEX_Vpsubb_VZ_k1z_HZ_WZ, VZ_HZ_WZ, Packed512_Int8, Unknown, FullMem, MergeZero),
            Node::Invalid,
        ]),
        Node::Invalid,
        Node::Invalid,
    ]),
    Node::Prefix(&[
        Node::Invalid,
        Node::Length(&[
            evex!(EVEX_Vpsubw_VX_k1z_HX_WX, VX_HX_WX, Packed128_Int16, Unknown, FullMem, MergeZero),
            evex!(EVEX_Vpsubw_VY_k1z_HY_WY, VY_HY_WY, Packed256_Int16, Unknown, FullMem, MergeZero),
            evex!(EVEX_Vpsubw_VZ_k1z_HZ_WZ, VZ_HZ_WZ, Packed512_Int16, Unknown, FullMem, MergeZero),
            Node::Invalid,
        ]),
        Node::Invalid,
        Node::Invalid,
    ]),
    Node::Prefix(&[
        Node::Invalid,
        Node::W(&[
            Node::Length(&[
                evex!(EVEX_Vpsubd_VX_k1z_HX_WX_b, VX_HX_WX, Packed128_Int32, Broadcast128_Int32, Full, MergeZero),
                evex!(EVEX_Vpsubd_VY_k1z_HY_WY_b, VY_HY_WY, Packed256_Int32, Broadcast256_Int32, Full, MergeZero),
                evex!(EVEX_Vpsubd_VZ_k1z_HZ_WZ_b, VZ_HZ_WZ, Packed512_Int32, Broadcast512_Int32, Full, MergeZero),
                Node::Invalid,
            ]),
            Node::Invalid,
        ]),
        Node::Invalid,
        Node::Invalid,
    ]),
    Node::Prefix(&[
        Node::Invalid,
        Node::W(&[
            Node::Invalid,
            Node::Length(&[
                evex!(EVEX_Vpsubq_VX_k1z_HX_WX_b, VX_HX_WX, Packed128_Int64, Broadcast128_Int64, Full, MergeZero),
                evex!(EVEX_Vpsubq_VY_k1z_HY_WY_b, VY_HY_WY, Packed256_Int64, Broadcast256_Int64, Full, MergeZero),
                evex!(EVEX_Vpsubq_VZ_k1z_HZ_WZ_b, VZ_HZ_WZ, Packed512_Int64, Broadcast512_Int64, Full, MergeZero),
                Node::Invalid,
            ]),
        ]),
        Node::Invalid,
        Node::Invalid,
    ]),
    Node::Prefix(&[
        Node::Invalid,
        Node::Length(&[
            evex!(EVEX_Vpaddb_VX_k1z_HX_WX, VX_HX_WX, Packed128_Int8, Unknown, FullMem, MergeZero),
            evex!(EVEX_Vpaddb_VY_k1z_HY_WY, VY_HY_WY, Packed256_Int8, Unknown, FullMem, MergeZero),
            evex!(EVEX_Vpaddb_VZ_k1z_HZ_WZ, VZ_HZ_WZ, Packed512_Int8, Unknown, FullMem, MergeZero),
            Node::Invalid,
        ]),
        Node::Invalid,
        Node::Invalid,
    ]),
    Node::Prefix(&[
        Node::Invalid,
        Node::Length(&[
            evex!(EVEX_Vpaddw_VX_k1z_HX_WX, VX_HX_WX, Packed128_Int16, Unknown, FullMem, MergeZero),
            evex!(EVEX_Vpaddw_VY_k1z_HY_WY, VY_HY_WY, Packed256_Int16, Unknown, FullMem, MergeZero),
            evex!(EVEX_Vpaddw_VZ_k1z_HZ_WZ, VZ_HZ_WZ, Packed512_Int16, Unknown, FullMem, MergeZero),
            Node::Invalid,
        ]),
        Node::Invalid,
        Node::Invalid,
    ]),
    Node::Prefix(&[
        Node::Invalid,
        Node::W(&[
            Node::Length(&[
                evex!(EVEX_Vpaddd_VX_k1z_HX_WX_b, VX_HX_WX, Packed128_Int32, Broadcast128_Int32, Full, MergeZero),
                evex!(EVEX_Vpaddd_VY_k1z_HY_WY_b, VY_HY_WY, Packed256_Int32, Broadcast256_Int32, Full, MergeZero),
                evex!(EVEX_Vpaddd_VZ_k1z_HZ_WZ_b, VZ_HZ_WZ, Packed512_Int32, Broadcast512_Int32, Full, MergeZero),
                Node::Invalid,
            ]),
            Node::Invalid,
        ]),
        Node::Invalid,
        Node::Invalid,
    ]),
];

/// EVEX `0F 3A 60`-`0F 3A 67`
static EVEX_0F3A: [Node; 8] = [
    Node::Invalid,
    Node::Invalid,
    Node::Invalid,
    Node::Invalid,
    Node::Invalid,
    Node::Invalid,
    Node::Prefix(&[
        Node::Invalid,
        Node::W(&[
            Node::Length(&[
                evex!(EVEX_Vfpclassps_k_k1_xmmm128b32_imm8, KR_WX_IB, Packed128_Float32, Broadcast128_Float32, Full, Merge),
                evex!(EVEX_Vfpclassps_k_k1_ymmm256b32_imm8, KR_WY_IB, Packed256_Float32, Broadcast256_Float32, Full, Merge),
                evex!(EVEX_Vfpclassps_k_k1_zmmm512b32_imm8, KR_WZ_IB, Packed512_Float32, Broadcast512_Float32, Full, Merge),
                Node::Invalid,
            ]),
            Node::Length(&[
                evex!(EVEX_Vfpclasspd_k_k1_xmmm128b64_imm8, KR_WX_IB, Packed128_Float64, Broadcast128_Float64, Full, Merge),
                evex!(EVEX_Vfpclasspd_k_k1_ymmm256b64_imm8, KR_WY_IB, Packed256_Float64, Broadcast256_Float64, Full, Merge),
                evex!(EVEX_Vfpclasspd_k_k1_zmmm512b64_imm8, KR_WZ_IB, Packed512_Float64, Broadcast512_Float64, Full, Merge),
                Node::Invalid,
            ]),
        ]),
        Node::Invalid,
        Node::Invalid,
    ]),
    // vfpclassss/sd ignore L'L
    Node::Prefix(&[
        Node::Invalid,
        Node::W(&[
            evex!(EVEX_Vfpclassss_k_k1_xmmm32_imm8, KR_WX_IB, Float32, Unknown, Scalar, Merge),
            evex!(EVEX_Vfpclasssd_k_k1_xmmm64_imm8, KR_WX_IB, Float64, Unknown, Scalar, Merge),
        ]),
        Node::Invalid,
        Node::Invalid,
    ]),
];

#[cfg(test)]
mod tests {
    use super::*;

    fn key(encoding: EncodingKind, map: OpcodeMap, opcode: u8) -> Key {
        Key {
            encoding,
            map,
            opcode,
            prefix: MandatoryPrefix::None,
            length: 0,
            w: false,
            op_size: OpSize::Bits32,
            op_size_without_66: OpSize::Bits32,
            modrm_reg: 0,
        }
    }

    fn code(key: &Key) -> Result<Code, DecoderError> {
        resolve(key).map(|r| r.template.code)
    }

    #[test]
    fn same_opcode_different_families() {
        let legacy = key(EncodingKind::Legacy, OpcodeMap::Map0F, 0xF8);
        assert_eq!(code(&legacy), Ok(Code::Psubb_P_Q));

        let vex = Key { prefix: MandatoryPrefix::P66, ..key(EncodingKind::Vex, OpcodeMap::Map0F, 0xF8) };
        assert_eq!(code(&vex), Ok(Code::VEX_Vpsubb_VX_HX_WX));

        let evex = Key { length: 2, ..vex };
        let evex = Key { encoding: EncodingKind::Evex, ..evex };
        assert_eq!(code(&evex), Ok(Code::EVEX_Vpsubb_VZ_k1z_HZ_WZ));
    }

    #[test]
    fn mandatory_66_is_consumed() {
        let k = Key {
            prefix: MandatoryPrefix::P66,
            op_size: OpSize::Bits16,
            ..key(EncodingKind::Legacy, OpcodeMap::Map0F, 0xFA)
        };
        let r = resolve(&k).unwrap();
        assert_eq!(r.template.code, Code::Psubd_VX_WX);
        assert!(r.consumed_prefix);

        let k = Key { prefix: MandatoryPrefix::PF3, ..k };
        assert_eq!(code(&k), Err(DecoderError::UnknownOpcode { map: OpcodeMap::Map0F, opcode: 0xFA }));
    }

    #[test]
    fn ud0_by_operand_size() {
        let k = key(EncodingKind::Legacy, OpcodeMap::Map0F, 0xFF);
        assert_eq!(code(&Key { op_size: OpSize::Bits16, ..k }), Ok(Code::Ud0_Gw_Ew));
        assert_eq!(code(&k), Ok(Code::Ud0_Gd_Ed));
        assert_eq!(code(&Key { op_size: OpSize::Bits64, ..k }), Ok(Code::Ud0_Gq_Eq));

        // not a mandatory-prefix opcode, F3 stays a repeat prefix
        let r = resolve(&Key { prefix: MandatoryPrefix::PF3, ..k }).unwrap();
        assert!(!r.consumed_prefix);
    }

    #[test]
    fn movbe_and_crc32() {
        let k = Key { op_size: OpSize::Bits16, ..key(EncodingKind::Legacy, OpcodeMap::Map0F38, 0xF0) };
        let r = resolve(&Key { prefix: MandatoryPrefix::P66, ..k }).unwrap();
        assert_eq!(r.template.code, Code::Movbe_r16_m16);
        assert!(!r.consumed_prefix);

        let k = Key { prefix: MandatoryPrefix::PF2, ..k };
        assert_eq!(code(&k), Ok(Code::Crc32_r32_rm8));
        assert_eq!(code(&Key { w: true, ..k }), Ok(Code::Crc32_r64_rm8));
        assert_eq!(code(&Key { opcode: 0xF1, ..k }), Ok(Code::Crc32_r32_rm16));

        assert!(code(&Key { prefix: MandatoryPrefix::PF3, ..k }).is_err());
    }

    #[test]
    fn shadow_stack_and_adx() {
        let k = key(EncodingKind::Legacy, OpcodeMap::Map0F38, 0xF6);
        assert_eq!(code(&k), Ok(Code::Wrssd_m32_r32));
        assert_eq!(code(&Key { prefix: MandatoryPrefix::P66, w: true, ..k }), Ok(Code::Adcx_r64_rm64));
        assert_eq!(code(&Key { prefix: MandatoryPrefix::PF3, ..k }), Ok(Code::Adox_r32_rm32));
        assert!(code(&Key { prefix: MandatoryPrefix::PF2, ..k }).is_err());

        let k = Key { opcode: 0xF5, prefix: MandatoryPrefix::P66, ..k };
        assert_eq!(code(&k), Ok(Code::Wrussd_m32_r32));
    }

    #[test]
    fn bmi_groups() {
        let k = Key { modrm_reg: 2, ..key(EncodingKind::Vex, OpcodeMap::Map0F38, 0xF3) };
        assert_eq!(code(&k), Ok(Code::VEX_Blsmsk_r32_rm32));
        assert_eq!(code(&Key { w: true, modrm_reg: 3, ..k }), Ok(Code::VEX_Blsi_r64_rm64));
        assert!(code(&Key { modrm_reg: 0, ..k }).is_err());
        assert!(code(&Key { length: 1, ..k }).is_err());

        let k = Key { opcode: 0xF7, prefix: MandatoryPrefix::PF3, ..k };
        assert_eq!(code(&k), Ok(Code::VEX_Sarx_r32_rm32_r32));
        let r = resolve(&k).unwrap();
        assert_eq!(r.template.memory, MemorySize::Int32);
    }

    #[test]
    fn evex_w_and_length() {
        let k = Key {
            prefix: MandatoryPrefix::P66,
            length: 1,
            ..key(EncodingKind::Evex, OpcodeMap::Map0F, 0xFB)
        };
        assert!(code(&k).is_err());
        assert_eq!(code(&Key { w: true, ..k }), Ok(Code::EVEX_Vpsubq_VY_k1z_HY_WY_b));
        assert_eq!(
            code(&Key { w: true, length: 3, ..k }),
            Err(DecoderError::ReservedBits("EVEX.L'L = 11"))
        );

        // scalar forms ignore the vector length
        let k = Key { opcode: 0x67, map: OpcodeMap::Map0F3A, length: 3, ..k };
        assert_eq!(code(&k), Ok(Code::EVEX_Vfpclassss_k_k1_xmmm32_imm8));
    }

    #[test]
    fn unknown_opcodes() {
        let k = key(EncodingKind::Legacy, OpcodeMap::Map0F, 0x00);
        assert_eq!(code(&k), Err(DecoderError::UnknownOpcode { map: OpcodeMap::Map0F, opcode: 0x00 }));
        assert!(code(&key(EncodingKind::Legacy, OpcodeMap::Primary, 0xF8)).is_err());
        assert!(code(&key(EncodingKind::Evex, OpcodeMap::Map0F38, 0xF0)).is_err());
        assert!(code(&key(EncodingKind::Legacy, OpcodeMap::Map0F3A, 0x64)).is_err());
    }
}
