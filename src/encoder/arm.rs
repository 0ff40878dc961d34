//! Pure A32 word builders. Each returns exactly one instruction word.

use super::imm::encode_imm;
use super::{EncodeError, Reg};
use crate::cond::Cond;
use serde::{Deserialize, Serialize};

/// Data-processing opcodes, bits 24..21.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DpOp {
    And = 0,
    Eor = 1,
    Sub = 2,
    Rsb = 3,
    Add = 4,
    Adc = 5,
    Sbc = 6,
    Rsc = 7,
    Tst = 8,
    Teq = 9,
    Cmp = 10,
    Cmn = 11,
    Orr = 12,
    Mov = 13,
    Bic = 14,
    Mvn = 15,
}

impl DpOp {
    pub const fn from_bits(n: u32) -> DpOp {
        match n & 0xF {
            0 => DpOp::And,
            1 => DpOp::Eor,
            2 => DpOp::Sub,
            3 => DpOp::Rsb,
            4 => DpOp::Add,
            5 => DpOp::Adc,
            6 => DpOp::Sbc,
            7 => DpOp::Rsc,
            8 => DpOp::Tst,
            9 => DpOp::Teq,
            10 => DpOp::Cmp,
            11 => DpOp::Cmn,
            12 => DpOp::Orr,
            13 => DpOp::Mov,
            14 => DpOp::Bic,
            _ => DpOp::Mvn,
        }
    }

    /// TST/TEQ/CMP/CMN: no destination, S always set.
    #[inline]
    pub const fn is_compare(self) -> bool {
        matches!(self, DpOp::Tst | DpOp::Teq | DpOp::Cmp | DpOp::Cmn)
    }

    /// MOV/MVN: no first operand.
    #[inline]
    pub const fn is_move(self) -> bool {
        matches!(self, DpOp::Mov | DpOp::Mvn)
    }

    pub const fn mnemonic(self) -> &'static str {
        match self {
            DpOp::And => "and",
            DpOp::Eor => "eor",
            DpOp::Sub => "sub",
            DpOp::Rsb => "rsb",
            DpOp::Add => "add",
            DpOp::Adc => "adc",
            DpOp::Sbc => "sbc",
            DpOp::Rsc => "rsc",
            DpOp::Tst => "tst",
            DpOp::Teq => "teq",
            DpOp::Cmp => "cmp",
            DpOp::Cmn => "cmn",
            DpOp::Orr => "orr",
            DpOp::Mov => "mov",
            DpOp::Bic => "bic",
            DpOp::Mvn => "mvn",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Shift {
    Lsl(u8),
    Lsr(u8),
    Asr(u8),
    Ror(u8),
    Rrx,
    LslReg(Reg),
    LsrReg(Reg),
    AsrReg(Reg),
    RorReg(Reg),
}

/// Flexible second operand of a data-processing instruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Operand {
    Reg(Reg),
    Shifted(Reg, Shift),
    /// Arbitrary constant, folded by the builder.
    Imm(u32),
    /// Pre-split immediate: `base` rotated right by `rot` (even, 0..=30).
    Imm8Ror(u8, u8),
}

impl From<Reg> for Operand {
    fn from(r: Reg) -> Self {
        Operand::Reg(r)
    }
}

fn shift_field(rm: Reg, sh: Shift, allow_reg: bool) -> Result<u32, EncodeError> {
    let rm = rm.n();
    let bits = match sh {
        Shift::Lsl(n) if n <= 31 => rm | (n as u32) << 7,
        Shift::Lsr(n) if (1..=32).contains(&n) => rm | ((n as u32) & 31) << 7 | 0x20,
        Shift::Asr(n) if (1..=32).contains(&n) => rm | ((n as u32) & 31) << 7 | 0x40,
        Shift::Ror(n) if (1..=31).contains(&n) => rm | (n as u32) << 7 | 0x60,
        Shift::Rrx => rm | 0x60,
        Shift::Lsl(n) => return Err(EncodeError::ShiftOutOfRange { kind: "lsl", amount: n }),
        Shift::Lsr(n) => return Err(EncodeError::ShiftOutOfRange { kind: "lsr", amount: n }),
        Shift::Asr(n) => return Err(EncodeError::ShiftOutOfRange { kind: "asr", amount: n }),
        Shift::Ror(n) => return Err(EncodeError::ShiftOutOfRange { kind: "ror", amount: n }),
        _ if !allow_reg => {
            return Err(EncodeError::InvalidOperand("register-specified shift"))
        }
        Shift::LslReg(rs) => rm | rs.n() << 8 | 0x10,
        Shift::LsrReg(rs) => rm | rs.n() << 8 | 0x30,
        Shift::AsrReg(rs) => rm | rs.n() << 8 | 0x50,
        Shift::RorReg(rs) => rm | rs.n() << 8 | 0x70,
    };
    Ok(bits)
}

/// Bits 25 and 11..0 for an operand.
pub fn operand2(op2: Operand) -> Result<u32, EncodeError> {
    match op2 {
        Operand::Reg(rm) => Ok(rm.n()),
        Operand::Shifted(rm, sh) => shift_field(rm, sh, true),
        Operand::Imm(v) => Ok(0x0200_0000 | encode_imm(v)?),
        Operand::Imm8Ror(base, rot) => {
            if rot & 1 != 0 || rot > 30 {
                return Err(EncodeError::BadRotation { rot });
            }
            Ok(0x0200_0000 | ((rot as u32) >> 1) << 8 | base as u32)
        }
    }
}

/// Generic data-processing word. Compares force S; moves ignore `rn`.
pub fn dp(
    cond: Cond,
    op: DpOp,
    s: bool,
    rd: Reg,
    rn: Reg,
    op2: Operand,
) -> Result<u32, EncodeError> {
    let s = s || op.is_compare();
    let rd = if op.is_compare() { 0 } else { rd.n() };
    let rn = if op.is_move() { 0 } else { rn.n() };
    Ok(cond.bits() | (op as u32) << 21 | (s as u32) << 20 | rn << 16 | rd << 12 | operand2(op2)?)
}

pub fn mov(cond: Cond, s: bool, rd: Reg, op2: Operand) -> Result<u32, EncodeError> {
    dp(cond, DpOp::Mov, s, rd, Reg::R0, op2)
}

pub fn mvn(cond: Cond, s: bool, rd: Reg, op2: Operand) -> Result<u32, EncodeError> {
    dp(cond, DpOp::Mvn, s, rd, Reg::R0, op2)
}

pub fn cmp(cond: Cond, rn: Reg, op2: Operand) -> Result<u32, EncodeError> {
    dp(cond, DpOp::Cmp, true, Reg::R0, rn, op2)
}

pub fn cmn(cond: Cond, rn: Reg, op2: Operand) -> Result<u32, EncodeError> {
    dp(cond, DpOp::Cmn, true, Reg::R0, rn, op2)
}

pub fn tst(cond: Cond, rn: Reg, op2: Operand) -> Result<u32, EncodeError> {
    dp(cond, DpOp::Tst, true, Reg::R0, rn, op2)
}

pub fn teq(cond: Cond, rn: Reg, op2: Operand) -> Result<u32, EncodeError> {
    dp(cond, DpOp::Teq, true, Reg::R0, rn, op2)
}

/// Single-transfer opcodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MemOp {
    Ldr,
    Str,
    Ldrb,
    Strb,
    Ldrh,
    Strh,
    Ldrsb,
    Ldrsh,
}

impl MemOp {
    pub const fn is_load(self) -> bool {
        matches!(self, MemOp::Ldr | MemOp::Ldrb | MemOp::Ldrh | MemOp::Ldrsb | MemOp::Ldrsh)
    }

    /// Uses the split-immediate halfword/signed encoding.
    pub const fn is_extra(self) -> bool {
        matches!(self, MemOp::Ldrh | MemOp::Strh | MemOp::Ldrsb | MemOp::Ldrsh)
    }

    pub const fn mnemonic(self) -> &'static str {
        match self {
            MemOp::Ldr => "ldr",
            MemOp::Str => "str",
            MemOp::Ldrb => "ldrb",
            MemOp::Strb => "strb",
            MemOp::Ldrh => "ldrh",
            MemOp::Strh => "strh",
            MemOp::Ldrsb => "ldrsb",
            MemOp::Ldrsh => "ldrsh",
        }
    }
}

/// Offset part of a `[rn, <offset>]` address (pre-indexed, no writeback).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Offset {
    Imm(i32),
    Reg(Reg),
    NegReg(Reg),
    Shifted { rm: Reg, shift: Shift, subtract: bool },
}

impl From<i32> for Offset {
    fn from(v: i32) -> Self {
        Offset::Imm(v)
    }
}

impl From<Reg> for Offset {
    fn from(r: Reg) -> Self {
        Offset::Reg(r)
    }
}

pub fn mem(cond: Cond, op: MemOp, rt: Reg, rn: Reg, off: Offset) -> Result<u32, EncodeError> {
    let l = op.is_load() as u32;
    let base = cond.bits() | 1 << 24 | l << 20 | rn.n() << 16 | rt.n() << 12;
    if op.is_extra() {
        let (s, h) = match op {
            MemOp::Ldrh | MemOp::Strh => (0, 1),
            MemOp::Ldrsb => (1, 0),
            _ => (1, 1),
        };
        let base = base | s << 6 | h << 5 | 0x90;
        return match off {
            Offset::Imm(i) => {
                let mag = i.unsigned_abs();
                if mag > 0xFF {
                    return Err(EncodeError::OffsetOutOfRange { op: op.mnemonic(), offset: i });
                }
                let u = (i >= 0) as u32;
                Ok(base | u << 23 | 1 << 22 | (mag & 0xF0) << 4 | (mag & 0xF))
            }
            Offset::Reg(rm) => Ok(base | 1 << 23 | rm.n()),
            Offset::NegReg(rm) => Ok(base | rm.n()),
            Offset::Shifted { .. } => Err(EncodeError::InvalidOperand("shifted halfword offset")),
        };
    }
    let b = matches!(op, MemOp::Ldrb | MemOp::Strb) as u32;
    let base = base | 1 << 26 | b << 22;
    match off {
        Offset::Imm(i) => {
            let mag = i.unsigned_abs();
            if mag > 0xFFF {
                return Err(EncodeError::OffsetOutOfRange { op: op.mnemonic(), offset: i });
            }
            Ok(base | ((i >= 0) as u32) << 23 | mag)
        }
        Offset::Reg(rm) => Ok(base | 1 << 25 | 1 << 23 | rm.n()),
        Offset::NegReg(rm) => Ok(base | 1 << 25 | rm.n()),
        Offset::Shifted { rm, shift, subtract } => {
            Ok(base | 1 << 25 | ((!subtract) as u32) << 23 | shift_field(rm, shift, false)?)
        }
    }
}

/// `B` with a word offset relative to PC+8.
pub fn b(cond: Cond, offset: i32) -> Result<u32, EncodeError> {
    branch(cond, 0x0A, offset)
}

pub fn bl(cond: Cond, offset: i32) -> Result<u32, EncodeError> {
    branch(cond, 0x0B, offset)
}

fn branch(cond: Cond, op: u32, offset: i32) -> Result<u32, EncodeError> {
    if !(-(1 << 23)..(1 << 23)).contains(&offset) {
        return Err(EncodeError::BranchOutOfRange { offset });
    }
    Ok(cond.bits() | op << 24 | (offset as u32 & 0x00FF_FFFF))
}

pub fn bx(cond: Cond, rm: Reg) -> u32 {
    cond.bits() | 0x12 << 20 | 0xFFF << 8 | 1 << 4 | rm.n()
}

pub fn blx(cond: Cond, rm: Reg) -> u32 {
    cond.bits() | 0x12 << 20 | 0xFFF << 8 | 3 << 4 | rm.n()
}

pub fn mrs(cond: Cond, rd: Reg, spsr: bool) -> u32 {
    let op = if spsr { 0x14 } else { 0x10 };
    cond.bits() | op << 20 | 0xF << 16 | rd.n() << 12
}

/// MSR field masks (bits 19..16).
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PsrFields {
    /// flags + control
    Fc = 0x9,
    /// flags only
    F = 0x8,
    /// control only
    C = 0x1,
}

pub fn msr(cond: Cond, fields: PsrFields, src: Operand) -> Result<u32, EncodeError> {
    let base = cond.bits() | (fields as u32) << 16 | 0xF << 12;
    match src {
        Operand::Reg(rm) => Ok(base | 0x12 << 20 | rm.n()),
        Operand::Imm(_) | Operand::Imm8Ror(..) => Ok(base | 0x32 << 20 | operand2(src)?),
        Operand::Shifted(..) => Err(EncodeError::InvalidOperand("shifted msr source")),
    }
}

pub fn push(cond: Cond, list: u16) -> u32 {
    cond.bits() | 0x92D << 16 | list as u32
}

pub fn pop(cond: Cond, list: u16) -> u32 {
    cond.bits() | 0x8BD << 16 | list as u32
}

/// `MUL rd, rm, rs`
pub fn mul(cond: Cond, s: bool, rd: Reg, rm: Reg, rs: Reg) -> u32 {
    cond.bits() | (s as u32) << 20 | rd.n() << 16 | rs.n() << 8 | 0x90 | rm.n()
}

/// `SMULL lo, hi, rm, rs`
pub fn smull(cond: Cond, s: bool, lo: Reg, hi: Reg, rm: Reg, rs: Reg) -> u32 {
    cond.bits() | (0x0C | s as u32) << 20 | hi.n() << 16 | lo.n() << 12 | rs.n() << 8 | 0x90 | rm.n()
}

/// `UMULL lo, hi, rm, rs`
pub fn umull(cond: Cond, s: bool, lo: Reg, hi: Reg, rm: Reg, rs: Reg) -> u32 {
    cond.bits() | (0x08 | s as u32) << 20 | hi.n() << 16 | lo.n() << 12 | rs.n() << 8 | 0x90 | rm.n()
}

pub fn clz(cond: Cond, rd: Reg, rm: Reg) -> u32 {
    cond.bits() | 0x16 << 20 | 0xF << 16 | rd.n() << 12 | 0xF << 8 | 0x1 << 4 | rm.n()
}

pub fn rev(cond: Cond, rd: Reg, rm: Reg) -> u32 {
    cond.bits() | 0x6B << 20 | 0xF << 16 | rd.n() << 12 | 0xF << 8 | 0x3 << 4 | rm.n()
}

pub fn rev16(cond: Cond, rd: Reg, rm: Reg) -> u32 {
    cond.bits() | 0x6B << 20 | 0xF << 16 | rd.n() << 12 | 0xF << 8 | 0xB << 4 | rm.n()
}

pub fn revsh(cond: Cond, rd: Reg, rm: Reg) -> u32 {
    cond.bits() | 0x6F << 20 | 0xF << 16 | rd.n() << 12 | 0xF << 8 | 0xB << 4 | rm.n()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Extend {
    Sxtb,
    Sxth,
    Uxtb,
    Uxth,
}

impl Extend {
    const fn op(self) -> u32 {
        match self {
            Extend::Sxtb => 0x6A,
            Extend::Sxth => 0x6B,
            Extend::Uxtb => 0x6E,
            Extend::Uxth => 0x6F,
        }
    }

    pub const fn mnemonic(self) -> &'static str {
        match self {
            Extend::Sxtb => "sxtb",
            Extend::Sxth => "sxth",
            Extend::Uxtb => "uxtb",
            Extend::Uxth => "uxth",
        }
    }
}

/// Sign/zero extension with an optional pre-rotation of 8, 16 or 24.
pub fn extend(cond: Cond, kind: Extend, rd: Reg, rm: Reg, ror: u8) -> Result<u32, EncodeError> {
    let rot = match ror {
        0 => 0,
        8 => 1,
        16 => 2,
        24 => 3,
        _ => return Err(EncodeError::BadRotation { rot: ror }),
    };
    Ok(cond.bits() | kind.op() << 20 | 0xF << 16 | rd.n() << 12 | rot << 10 | 0x7 << 4 | rm.n())
}

/// `PKHBT rd, rn, rm, LSL #lsl`
pub fn pkhbt(cond: Cond, rd: Reg, rn: Reg, rm: Reg, lsl: u8) -> Result<u32, EncodeError> {
    if lsl > 31 {
        return Err(EncodeError::ShiftOutOfRange { kind: "pkhbt lsl", amount: lsl });
    }
    Ok(cond.bits() | 0x68 << 20 | rn.n() << 16 | rd.n() << 12 | (lsl as u32) << 7 | 0x1 << 4 | rm.n())
}

/// `PKHTB rd, rn, rm, ASR #asr`
pub fn pkhtb(cond: Cond, rd: Reg, rn: Reg, rm: Reg, asr: u8) -> Result<u32, EncodeError> {
    if !(1..=32).contains(&asr) {
        return Err(EncodeError::ShiftOutOfRange { kind: "pkhtb asr", amount: asr });
    }
    Ok(cond.bits()
        | 0x68 << 20
        | rn.n() << 16
        | rd.n() << 12
        | ((asr as u32) & 31) << 7
        | 0x5 << 4
        | rm.n())
}

/// `MOV r0, r0`
pub const NOP: u32 = 0xE1A0_0000;
