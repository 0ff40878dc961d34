//! Multi-word sequences for things A32 cannot say in one instruction.
//!
//! Conventions shared by every builder here:
//!
//! * `W1` and `W2` are clobbered; `d` and `s` must not be either of them.
//! * The host NZCV flags hold the guest flags, with C meaning the guest carry/borrow.
//!   A32 subtracts produce "not borrow" in C, so every subtract-style sequence ends with
//!   [`invert_carry`].
//! * Sub-word operations shift both operands into the top bits, operate on the full
//!   word with `S` and merge the result back into the low bits of `d`. The bits of `d`
//!   above the operation width are preserved.
//! * The extend-chain sequences (`addx`, `subx`, `negx`) keep Z sticky: it is only ever
//!   cleared, never set. The prior Z mask is parked on the stack for the duration.

use super::{Assembler, EncodeError, Operand, Reg, W1, W2};
use crate::cond::Cond;
use serde::{Deserialize, Serialize};

type Result<T> = std::result::Result<T, EncodeError>;

pub const FLAG_N: u32 = 1 << 31;
pub const FLAG_Z: u32 = 1 << 30;
pub const FLAG_C: u32 = 1 << 29;
pub const FLAG_V: u32 = 1 << 28;

/// Optional host instructions the sequences may use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HostFeatures {
    /// `SXT*`, `UXT*`, `REV*` and `PKH*` are available.
    pub armv6: bool,
}

impl Default for HostFeatures {
    fn default() -> Self {
        Self { armv6: true }
    }
}

impl HostFeatures {
    pub const ARMV5: HostFeatures = HostFeatures { armv6: false };
    pub const ARMV6: HostFeatures = HostFeatures { armv6: true };
}

/// Operation width.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Width {
    B8,
    B16,
    B32,
}

impl Width {
    #[inline]
    pub const fn bits(self) -> u8 {
        match self {
            Width::B8 => 8,
            Width::B16 => 16,
            Width::B32 => 32,
        }
    }

    #[inline]
    pub const fn bytes(self) -> u8 {
        self.bits() / 8
    }

    /// Left shift that moves the operand into the top bits.
    #[inline]
    pub const fn shift(self) -> u8 {
        32 - self.bits()
    }

    #[inline]
    pub const fn mask(self) -> u32 {
        match self {
            Width::B8 => 0xFF,
            Width::B16 => 0xFFFF,
            Width::B32 => 0xFFFF_FFFF,
        }
    }

    #[inline]
    pub const fn sign_bit(self) -> u32 {
        1 << (self.bits() - 1)
    }
}

/// Write the top-aligned value in `W2` back into the low bits of `d`. Flags untouched.
pub fn merge(a: &mut Assembler, w: Width, d: Reg, hf: HostFeatures) -> Result<()> {
    match w {
        Width::B8 => {
            a.bic(d, d, Operand::Imm(0xFF))?;
            a.orr(d, d, W2.lsr(24))
        }
        Width::B16 if hf.armv6 => a.pkhtb(d, d, W2, 16),
        Width::B16 => {
            a.bic(d, d, Operand::Imm(0xFF))?;
            a.bic(d, d, Operand::Imm(0xFF00))?;
            a.orr(d, d, W2.lsr(16))
        }
        Width::B32 => a.mov(d, W2),
    }
}

/// `MRS W1; EOR W1, W1, #C; MSR CPSR_f, W1`
pub fn invert_carry(a: &mut Assembler) -> Result<()> {
    a.mrs(W1)?;
    a.eor(W1, W1, Operand::Imm(FLAG_C))?;
    a.msr_flags(W1)
}

/// `d = d + s` with N, Z, V, C.
pub fn add(a: &mut Assembler, w: Width, d: Reg, s: Reg, hf: HostFeatures) -> Result<()> {
    if w == Width::B32 {
        return a.adds(d, d, s);
    }
    let sh = w.shift();
    a.lsl(W1, s, sh)?;
    a.lsl(W2, d, sh)?;
    a.adds(W2, W2, W1)?;
    merge(a, w, d, hf)
}

/// `d = d - s` with N, Z, V and the guest borrow in C.
pub fn sub(a: &mut Assembler, w: Width, d: Reg, s: Reg, hf: HostFeatures) -> Result<()> {
    if w == Width::B32 {
        a.subs(d, d, s)?;
    } else {
        let sh = w.shift();
        a.lsl(W1, s, sh)?;
        a.lsl(W2, d, sh)?;
        a.subs(W2, W2, W1)?;
        merge(a, w, d, hf)?;
    }
    invert_carry(a)
}

/// Flags of `d - s`; neither register changes.
///
/// The operands are compared top-aligned rather than sign-extended so that N and V
/// come out at the operation width.
pub fn cmp(a: &mut Assembler, w: Width, d: Reg, s: Reg) -> Result<()> {
    if w == Width::B32 {
        a.cmp(d, s)?;
    } else {
        let sh = w.shift();
        a.lsl(W1, s, sh)?;
        a.lsl(W2, d, sh)?;
        a.cmp(W2, W1)?;
    }
    invert_carry(a)
}

/// `d = 0 - d`. C is set unless the operand was zero.
pub fn neg(a: &mut Assembler, w: Width, d: Reg, hf: HostFeatures) -> Result<()> {
    if w == Width::B32 {
        a.rsbs(d, d, Operand::Imm(0))?;
    } else {
        a.lsl(W2, d, w.shift())?;
        a.rsbs(W2, W2, Operand::Imm(0))?;
        merge(a, w, d, hf)?;
    }
    invert_carry(a)
}

// MVNEQ W2,#0 ; MVNNE W2,#Z ; PUSH {W2}
fn sticky_zero_begin(a: &mut Assembler) -> Result<()> {
    a.cond(Cond::Eq).mvn(W2, Operand::Imm(0))?;
    a.cond(Cond::Ne).mvn(W2, Operand::Imm(FLAG_Z))?;
    a.push(W2.mask())
}

// POP {W1} ; MRS W2 ; AND W2,W2,W1 ; MSR CPSR_f,W2
fn sticky_zero_end(a: &mut Assembler) -> Result<()> {
    a.pop(W1.mask())?;
    a.mrs(W2)?;
    a.and(W2, W2, W1)?;
    a.msr_flags(W2)
}

// N/Z from the top `w` bits of W2 only. C and V survive.
fn fix_nz(a: &mut Assembler, w: Width) -> Result<()> {
    a.mvn(W1, Operand::Imm(0))?;
    a.lsl(W1, W1, w.shift())?;
    a.tst(W2, W1)
}

/// `d = d + s + X`. Expects the guest X in host C (see [`restore_carry`]).
pub fn addx(a: &mut Assembler, w: Width, d: Reg, s: Reg, hf: HostFeatures) -> Result<()> {
    sticky_zero_begin(a)?;
    if w == Width::B32 {
        a.adcs(d, d, s)?;
    } else {
        // Ones below the operand carry the incoming C into its lowest bit.
        let sh = w.shift();
        a.mvn(W1, Operand::Imm(0))?;
        a.lsl(W2, d, sh)?;
        a.orr(W2, W2, W1.lsr(w.bits()))?;
        a.lsl(W1, s, sh)?;
        a.adcs(W2, W2, W1)?;
        fix_nz(a, w)?;
        merge(a, w, d, hf)?;
    }
    sticky_zero_end(a)
}

/// `d = d - s - X`. Expects the inverted guest X in host C
/// (`restore_carry(.., invert = true)`).
pub fn subx(a: &mut Assembler, w: Width, d: Reg, s: Reg, hf: HostFeatures) -> Result<()> {
    sticky_zero_begin(a)?;
    if w == Width::B32 {
        a.sbcs(d, d, s)?;
    } else {
        let sh = w.shift();
        a.lsl(W2, d, sh)?;
        a.lsl(W1, s, sh)?;
        a.sbcs(W2, W2, W1)?;
        fix_nz(a, w)?;
        merge(a, w, d, hf)?;
    }
    invert_carry(a)?;
    sticky_zero_end(a)
}

/// `d = 0 - d - X`. Same carry precondition as [`subx`].
pub fn negx(a: &mut Assembler, w: Width, d: Reg, hf: HostFeatures) -> Result<()> {
    sticky_zero_begin(a)?;
    if w == Width::B32 {
        a.rscs(d, d, Operand::Imm(0))?;
    } else {
        a.lsl(W2, d, w.shift())?;
        a.rscs(W2, W2, Operand::Imm(0))?;
        fix_nz(a, w)?;
        merge(a, w, d, hf)?;
    }
    invert_carry(a)?;
    sticky_zero_end(a)
}

/// N and Z from the low `w` bits of `v`, C and V cleared.
pub fn logic_flags(a: &mut Assembler, w: Width, v: Reg) -> Result<()> {
    a.msr_flags(Operand::Imm(0))?;
    if w == Width::B32 {
        a.tst(v, v)
    } else {
        a.lsl(W1, v, w.shift())?;
        a.tst(W1, W1)
    }
}

/// Store host C as 0/1 into the byte at `[base, #slot]`.
pub fn duplicate_carry(a: &mut Assembler, base: Reg, slot: i32) -> Result<()> {
    a.mrs(W1)?;
    a.lsr(W1, W1, 29)?;
    a.and(W1, W1, Operand::Imm(1))?;
    a.strb(W1, base, slot)
}

/// Load the 0/1 byte at `[base, #slot]` into host C, inverted for subtract chains.
pub fn restore_carry(a: &mut Assembler, base: Reg, slot: i32, invert: bool) -> Result<()> {
    a.ldrb(W1, base, slot)?;
    if invert {
        a.eor(W1, W1, Operand::Imm(1))?;
    }
    a.mrs(W2)?;
    a.bic(W2, W2, Operand::Imm(FLAG_C))?;
    a.orr(W2, W2, W1.lsl(29))?;
    a.msr_flags(W2)
}

/// `d = s` when the guest condition `c` holds. Flags untouched.
///
/// `Hi` and `Ls` see the guest carry in host C, which is the opposite sense of the
/// host's own definition, so they become two branches.
pub fn cmov(a: &mut Assembler, c: Cond, d: Reg, s: Reg) -> Result<()> {
    match c {
        Cond::Ls => {
            a.cond(Cond::Eq).b(0)?;
            a.cond(Cond::Cc).b(0)?;
            a.mov(d, s)
        }
        Cond::Hi => {
            a.cond(Cond::Eq).b(1)?;
            a.cond(Cond::Cs).b(0)?;
            a.mov(d, s)
        }
        Cond::Nv => Err(EncodeError::InvalidOperand("condition never")),
        c => a.cond(c).mov(d, s),
    }
}

/// `d = 1` when the guest condition `c` holds, else `d = 0`. Flags untouched.
pub fn setcc(a: &mut Assembler, c: Cond, d: Reg) -> Result<()> {
    match c {
        Cond::Ls => {
            a.cond(Cond::Eq).b(0)?;
            a.cond(Cond::Cc).b(1)?;
            a.mov(d, Operand::Imm(1))?;
            a.b(0)?;
            a.mov(d, Operand::Imm(0))
        }
        Cond::Hi => {
            a.cond(Cond::Eq).b(2)?;
            a.cond(Cond::Cs).b(1)?;
            a.mov(d, Operand::Imm(1))?;
            a.b(0)?;
            a.mov(d, Operand::Imm(0))
        }
        Cond::Al => a.mov(d, Operand::Imm(1)),
        Cond::Nv => a.mov(d, Operand::Imm(0)),
        c => {
            a.cond(c).mov(d, Operand::Imm(1))?;
            a.cond(c.invert()).mov(d, Operand::Imm(0))
        }
    }
}

/// `d = sign_extend(s)` from `w` bits.
pub fn sign_extend(a: &mut Assembler, w: Width, d: Reg, s: Reg, hf: HostFeatures) -> Result<()> {
    match (w, hf.armv6) {
        (Width::B8, true) => a.sxtb(d, s),
        (Width::B16, true) => a.sxth(d, s),
        (Width::B32, _) => {
            if d == s {
                Ok(())
            } else {
                a.mov(d, s)
            }
        }
        (w, false) => {
            a.lsl(d, s, w.shift())?;
            a.asr(d, d, w.shift())
        }
    }
}

/// `d = zero_extend(s)` from `w` bits.
pub fn zero_extend(a: &mut Assembler, w: Width, d: Reg, s: Reg, hf: HostFeatures) -> Result<()> {
    match (w, hf.armv6) {
        (Width::B8, true) => a.uxtb(d, s),
        (Width::B16, true) => a.uxth(d, s),
        (Width::B8, false) => a.and(d, s, Operand::Imm(0xFF)),
        (Width::B16, false) => {
            a.lsl(d, s, 16)?;
            a.lsr(d, d, 16)
        }
        (Width::B32, _) => {
            if d == s {
                Ok(())
            } else {
                a.mov(d, s)
            }
        }
    }
}

/// Swap the two low bytes of `s` into `d`. On ARMv5 the result is zero-extended and
/// `W1` is clobbered; ARMv6 also swaps the upper halfword.
pub fn bswap16(a: &mut Assembler, d: Reg, s: Reg, hf: HostFeatures) -> Result<()> {
    if hf.armv6 {
        return a.rev16(d, s);
    }
    a.and(W1, s, Operand::Imm(0xFF))?;
    a.lsr(d, s, 8)?;
    a.and(d, d, Operand::Imm(0xFF))?;
    a.orr(d, d, W1.lsl(8))
}

/// Reverse the four bytes of `s` into `d`. Clobbers `W1` on ARMv5.
pub fn bswap32(a: &mut Assembler, d: Reg, s: Reg, hf: HostFeatures) -> Result<()> {
    if hf.armv6 {
        return a.rev(d, s);
    }
    a.eor(W1, s, s.ror(16))?;
    a.bic(W1, W1, Operand::Imm(0x00FF_0000))?;
    a.mov(d, s.ror(8))?;
    a.eor(d, d, W1.lsr(8))
}
