//! Instruction codes and mnemonics.

use std::fmt;

use self::Mnemonic as M;

/// Identifies one encoding variant of an instruction.
///
/// A `Code` pins down the mnemonic, the prefix family it was encoded with and
/// the kind and width of every operand. The same arithmetic operation usually
/// has several codes: `PSUBB` exists as `Psubb_P_Q` (MMX), `Psubb_VX_WX`
/// (SSE2), `VEX_Vpsubb_VX_HX_WX` and `EVEX_Vpsubb_VZ_k1z_HZ_WZ` among others.
///
/// Operand letters follow the opcode map notation of the Intel manual (see
/// `defs::OperandSpec`). Lowercase suffixes name operands explicitly (`r32`,
/// `rm64`, or `xmmm128b32` for "xmm register, 128-bit memory or 32-bit
/// broadcast"). `k1z` denotes an opmask with optional zeroing, and a trailing
/// `_b` marks codes whose memory operand can be broadcast.
#[allow(non_camel_case_types)]
#[derive(Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Copy, Clone)]
pub enum Code {
    // Legacy encodings
    Psubb_P_Q,
    Psubb_VX_WX,
    Psubw_P_Q,
    Psubw_VX_WX,
    Psubd_P_Q,
    Psubd_VX_WX,
    Psubq_P_Q,
    Psubq_VX_WX,
    Paddb_P_Q,
    Paddb_VX_WX,
    Paddw_P_Q,
    Paddw_VX_WX,
    Paddd_P_Q,
    Paddd_VX_WX,
    Ud0_Gw_Ew,
    Ud0_Gd_Ed,
    Ud0_Gq_Eq,
    Movbe_r16_m16,
    Movbe_r32_m32,
    Movbe_r64_m64,
    Movbe_m16_r16,
    Movbe_m32_r32,
    Movbe_m64_r64,
    Crc32_r32_rm8,
    Crc32_r64_rm8,
    Crc32_r32_rm16,
    Crc32_r32_rm32,
    Crc32_r64_rm64,
    Wrussd_m32_r32,
    Wrussq_m64_r64,
    Wrssd_m32_r32,
    Wrssq_m64_r64,
    Adcx_r32_rm32,
    Adcx_r64_rm64,
    Adox_r32_rm32,
    Adox_r64_rm64,
    Pcmpestrm_xmm_xmmm128_imm8,
    Pcmpestrm64_xmm_xmmm128_imm8,
    Pcmpestri_xmm_xmmm128_imm8,
    Pcmpestri64_xmm_xmmm128_imm8,
    Pcmpistrm_xmm_xmmm128_imm8,
    Pcmpistri_xmm_xmmm128_imm8,

    // VEX encodings
    VEX_Vpsubb_VX_HX_WX,
    VEX_Vpsubb_VY_HY_WY,
    VEX_Vpsubw_VX_HX_WX,
    VEX_Vpsubw_VY_HY_WY,
    VEX_Vpsubd_VX_HX_WX,
    VEX_Vpsubd_VY_HY_WY,
    VEX_Vpsubq_VX_HX_WX,
    VEX_Vpsubq_VY_HY_WY,
    VEX_Vpaddb_VX_HX_WX,
    VEX_Vpaddb_VY_HY_WY,
    VEX_Vpaddw_VX_HX_WX,
    VEX_Vpaddw_VY_HY_WY,
    VEX_Vpaddd_VX_HX_WX,
    VEX_Vpaddd_VY_HY_WY,
    VEX_Andn_r32_r32_rm32,
    VEX_Andn_r64_r64_rm64,
    VEX_Blsr_r32_rm32,
    VEX_Blsr_r64_rm64,
    VEX_Blsmsk_r32_rm32,
    VEX_Blsmsk_r64_rm64,
    VEX_Blsi_r32_rm32,
    VEX_Blsi_r64_rm64,
    VEX_Bzhi_r32_rm32_r32,
    VEX_Bzhi_r64_rm64_r64,
    VEX_Pext_r32_r32_rm32,
    VEX_Pext_r64_r64_rm64,
    VEX_Pdep_r32_r32_rm32,
    VEX_Pdep_r64_r64_rm64,
    VEX_Mulx_r32_r32_rm32,
    VEX_Mulx_r64_r64_rm64,
    VEX_Bextr_r32_rm32_r32,
    VEX_Bextr_r64_rm64_r64,
    VEX_Shlx_r32_rm32_r32,
    VEX_Shlx_r64_rm64_r64,
    VEX_Sarx_r32_rm32_r32,
    VEX_Sarx_r64_rm64_r64,
    VEX_Shrx_r32_rm32_r32,
    VEX_Shrx_r64_rm64_r64,
    VEX_Vpcmpestrm_xmm_xmmm128_imm8,
    VEX_Vpcmpestrm64_xmm_xmmm128_imm8,
    VEX_Vpcmpestri_xmm_xmmm128_imm8,
    VEX_Vpcmpestri64_xmm_xmmm128_imm8,
    VEX_Vpcmpistrm_xmm_xmmm128_imm8,
    VEX_Vpcmpistri_xmm_xmmm128_imm8,

    // EVEX encodings
    EVEX_Vpsubb_VX_k1z_HX_WX,
    EVEX_Vpsubb_VY_k1z_HY_WY,
    EVEX_Vpsubb_VZ_k1z_HZ_WZ,
    EVEX_Vpsubw_VX_k1z_HX_WX,
    EVEX_Vpsubw_VY_k1z_HY_WY,
    EVEX_Vpsubw_VZ_k1z_HZ_WZ,
    EVEX_Vpsubd_VX_k1z_HX_WX_b,
    EVEX_Vpsubd_VY_k1z_HY_WY_b,
    EVEX_Vpsubd_VZ_k1z_HZ_WZ_b,
    EVEX_Vpsubq_VX_k1z_HX_WX_b,
    EVEX_Vpsubq_VY_k1z_HY_WY_b,
    EVEX_Vpsubq_VZ_k1z_HZ_WZ_b,
    EVEX_Vpaddb_VX_k1z_HX_WX,
    EVEX_Vpaddb_VY_k1z_HY_WY,
    EVEX_Vpaddb_VZ_k1z_HZ_WZ,
    EVEX_Vpaddw_VX_k1z_HX_WX,
    EVEX_Vpaddw_VY_k1z_HY_WY,
    EVEX_Vpaddw_VZ_k1z_HZ_WZ,
    EVEX_Vpaddd_VX_k1z_HX_WX_b,
    EVEX_Vpaddd_VY_k1z_HY_WY_b,
    EVEX_Vpaddd_VZ_k1z_HZ_WZ_b,
    EVEX_Vfpclassps_k_k1_xmmm128b32_imm8,
    EVEX_Vfpclassps_k_k1_ymmm256b32_imm8,
    EVEX_Vfpclassps_k_k1_zmmm512b32_imm8,
    EVEX_Vfpclasspd_k_k1_xmmm128b64_imm8,
    EVEX_Vfpclasspd_k_k1_ymmm256b64_imm8,
    EVEX_Vfpclasspd_k_k1_zmmm512b64_imm8,
    EVEX_Vfpclassss_k_k1_xmmm32_imm8,
    EVEX_Vfpclasssd_k_k1_xmmm64_imm8,
}

static MNEMONICS: [Mnemonic; 115] = [
    M::Psubb, M::Psubb, M::Psubw, M::Psubw, M::Psubd,
    M::Psubd, M::Psubq, M::Psubq, M::Paddb, M::Paddb,
    M::Paddw, M::Paddw, M::Paddd, M::Paddd, M::Ud0,
    M::Ud0, M::Ud0, M::Movbe, M::Movbe, M::Movbe,
    M::Movbe, M::Movbe, M::Movbe, M::Crc32, M::Crc32,
    M::Crc32, M::Crc32, M::Crc32, M::Wrussd, M::Wrussq,
    M::Wrssd, M::Wrssq, M::Adcx, M::Adcx, M::Adox,
    M::Adox, M::Pcmpestrm, M::Pcmpestrm64, M::Pcmpestri, M::Pcmpestri64,
    M::Pcmpistrm, M::Pcmpistri, M::Vpsubb, M::Vpsubb, M::Vpsubw,
    M::Vpsubw, M::Vpsubd, M::Vpsubd, M::Vpsubq, M::Vpsubq,
    M::Vpaddb, M::Vpaddb, M::Vpaddw, M::Vpaddw, M::Vpaddd,
    M::Vpaddd, M::Andn, M::Andn, M::Blsr, M::Blsr,
    M::Blsmsk, M::Blsmsk, M::Blsi, M::Blsi, M::Bzhi,
    M::Bzhi, M::Pext, M::Pext, M::Pdep, M::Pdep,
    M::Mulx, M::Mulx, M::Bextr, M::Bextr, M::Shlx,
    M::Shlx, M::Sarx, M::Sarx, M::Shrx, M::Shrx,
    M::Vpcmpestrm, M::Vpcmpestrm64, M::Vpcmpestri, M::Vpcmpestri64, M::Vpcmpistrm,
    M::Vpcmpistri, M::Vpsubb, M::Vpsubb, M::Vpsubb, M::Vpsubw,
    M::Vpsubw, M::Vpsubw, M::Vpsubd, M::Vpsubd, M::Vpsubd,
    M::Vpsubq, M::Vpsubq, M::Vpsubq, M::Vpaddb, M::Vpaddb,
    M::Vpaddb, M::Vpaddw, M::Vpaddw, M::Vpaddw, M::Vpaddd,
    M::Vpaddd, M::Vpaddd, M::Vfpclassps, M::Vfpclassps, M::Vfpclassps,
    M::Vfpclasspd, M::Vfpclasspd, M::Vfpclasspd, M::Vfpclassss, M::Vfpclasssd,
];

impl Code {
    /// Returns the instruction's mnemonic.
    pub fn mnemonic(&self) -> Mnemonic {
        MNEMONICS[*self as usize]
    }

    /// Returns the prefix family this code is encoded with.
    pub fn encoding(&self) -> EncodingKind {
        if *self >= Code::EVEX_Vpsubb_VX_k1z_HX_WX {
            EncodingKind::Evex
        } else if *self >= Code::VEX_Vpsubb_VX_HX_WX {
            EncodingKind::Vex
        } else {
            EncodingKind::Legacy
        }
    }
}

/// The encoding family of an instruction.
#[derive(Debug, PartialEq, Eq, Hash, Copy, Clone)]
pub enum EncodingKind {
    /// Legacy encoding, possibly with REX and escape bytes.
    Legacy,
    /// 2- or 3-byte VEX prefix (`C5`/`C4`).
    Vex,
    /// 4-byte EVEX prefix (`62`).
    Evex,
}

/// An instruction mnemonic, as printed by assemblers.
#[derive(Debug, PartialEq, Eq, Hash, Copy, Clone)]
pub enum Mnemonic {
    Psubb, Psubw, Psubd, Psubq, Paddb, Paddw, Paddd, Ud0,
    Movbe, Crc32, Wrussd, Wrussq, Wrssd, Wrssq, Adcx, Adox,
    Pcmpestrm, Pcmpestrm64, Pcmpestri, Pcmpestri64, Pcmpistrm, Pcmpistri, Vpsubb, Vpsubw,
    Vpsubd, Vpsubq, Vpaddb, Vpaddw, Vpaddd, Andn, Blsr, Blsmsk,
    Blsi, Bzhi, Pext, Pdep, Mulx, Bextr, Shlx, Sarx,
    Shrx, Vpcmpestrm, Vpcmpestrm64, Vpcmpestri, Vpcmpestri64, Vpcmpistrm, Vpcmpistri, Vfpclassps,
    Vfpclasspd, Vfpclassss, Vfpclasssd,
}

static MNEMONIC_NAMES: [&str; 51] = [
    "psubb", "psubw", "psubd", "psubq", "paddb", "paddw", "paddd", "ud0",
    "movbe", "crc32", "wrussd", "wrussq", "wrssd", "wrssq", "adcx", "adox",
    "pcmpestrm", "pcmpestrm64", "pcmpestri", "pcmpestri64", "pcmpistrm", "pcmpistri", "vpsubb", "vpsubw",
    "vpsubd", "vpsubq", "vpaddb", "vpaddw", "vpaddd", "andn", "blsr", "blsmsk",
    "blsi", "bzhi", "pext", "pdep", "mulx", "bextr", "shlx", "sarx",
    "shrx", "vpcmpestrm", "vpcmpestrm64", "vpcmpestri", "vpcmpestri64", "vpcmpistrm", "vpcmpistri", "vfpclassps",
    "vfpclasspd", "vfpclassss", "vfpclasssd",
];

impl Mnemonic {
    /// Returns the lowercase assembler spelling.
    pub fn name(&self) -> &'static str {
        MNEMONIC_NAMES[*self as usize]
    }
}

impl fmt::Display for Mnemonic {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encoding_families() {
        assert_eq!(Code::Psubb_P_Q.encoding(), EncodingKind::Legacy);
        assert_eq!(Code::Pcmpistri_xmm_xmmm128_imm8.encoding(), EncodingKind::Legacy);
        assert_eq!(Code::VEX_Vpsubb_VX_HX_WX.encoding(), EncodingKind::Vex);
        assert_eq!(Code::VEX_Vpcmpistri_xmm_xmmm128_imm8.encoding(), EncodingKind::Vex);
        assert_eq!(Code::EVEX_Vpsubb_VX_k1z_HX_WX.encoding(), EncodingKind::Evex);
        assert_eq!(Code::EVEX_Vfpclasssd_k_k1_xmmm64_imm8.encoding(), EncodingKind::Evex);
    }

    #[test]
    fn mnemonics() {
        assert_eq!(Code::Psubb_VX_WX.mnemonic(), Mnemonic::Psubb);
        assert_eq!(Code::Ud0_Gq_Eq.mnemonic(), Mnemonic::Ud0);
        assert_eq!(Code::Crc32_r64_rm8.mnemonic(), Mnemonic::Crc32);
        assert_eq!(Code::VEX_Sarx_r64_rm64_r64.mnemonic(), Mnemonic::Sarx);
        assert_eq!(Code::VEX_Vpcmpestri64_xmm_xmmm128_imm8.mnemonic(), Mnemonic::Vpcmpestri64);
        assert_eq!(Code::EVEX_Vpaddd_VZ_k1z_HZ_WZ_b.mnemonic(), Mnemonic::Vpaddd);
        assert_eq!(Code::EVEX_Vfpclassss_k_k1_xmmm32_imm8.mnemonic(), Mnemonic::Vfpclassss);
    }

    #[test]
    fn mnemonic_names() {
        assert_eq!(Mnemonic::Vpsubq.to_string(), "vpsubq");
        assert_eq!(Mnemonic::Blsmsk.name(), "blsmsk");
        assert_eq!(Mnemonic::Vfpclasspd.name(), "vfpclasspd");
    }
}
