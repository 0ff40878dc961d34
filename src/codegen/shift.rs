//! ASL ASR LSL LSR ROL ROR ROXL ROXR.
//!
//! Flag-producing forms work on a 32-bit image of the operand so that the host
//! shifter produces the guest carry directly:
//!
//! * left shifts shift the operand top-aligned; C falls out of bit 31,
//! * right shifts work on the sign or zero extended operand,
//! * rotates replicate the operand across the word, so a 32-bit rotate is also a
//!   rotate at the operand width.
//!
//! A register count is taken modulo 64, as the guest does.

use super::ctx::Ctx;
use super::ea::{gen_dst, gen_src, genastore, Access};
use super::template::Guard;
use super::{GenError, RoutineFlags, REGS, X_SLOT};
use crate::cond::Cond;
use crate::encoder::composite::{self, FLAG_C, FLAG_V};
use crate::encoder::{imm, Assembler, EncodeError, HostFeatures, Reg, Width, W1, W2};
use crate::guest::{Ea, Mnemonic, Size};

type Result<T> = std::result::Result<T, EncodeError>;

#[derive(Debug, Clone, Copy)]
enum Amount {
    Imm(u8),
    Reg(Reg),
}

pub fn shift(ctx: &mut Ctx<'_>) -> std::result::Result<(), GenError> {
    let m = ctx.entry.mnemonic;
    let size = ctx.size()?;
    let through_x = matches!(m, Mnemonic::Roxl | Mnemonic::Roxr);
    if through_x {
        ctx.flags |= RoutineFlags::ADDX;
    }
    let imm_count = match ctx.entry.src {
        None => Some(1),
        Some(Ea::Quick(c)) => Some(c as u8),
        Some(Ea::Dreg(_)) => None,
        Some(_) => return Err(GenError::BadOperand("shift count")),
    };
    if imm_count.is_none() {
        ctx.guard(Guard::FieldsDiffer { a: 0, b: 9 });
    }

    let amount = match imm_count {
        Some(c) => Amount::Imm(c),
        None => Amount::Reg(gen_src(ctx, Size::Long, Access::Read)?.val()?),
    };
    let dst = gen_dst(ctx, size, Access::Read)?;
    let x = dst.val()?;
    let t = ctx.scratch()?;
    let u = ctx.scratch()?;
    let (w, hf, ff) = (size.width(), ctx.hf, ctx.ff());

    let mut a = ctx.asm();
    if let Amount::Reg(cnt) = amount {
        a.and(cnt, cnt, imm(63))?;
    }
    match (m, ff) {
        (Mnemonic::Asl | Mnemonic::Lsl, true) => {
            left_ff(&mut a, w, x, t, amount, m == Mnemonic::Asl, hf)?;
            carry_to_x(&mut a, amount, t)?;
        }
        (Mnemonic::Asr | Mnemonic::Lsr, true) => {
            right_ff(&mut a, w, x, amount, m == Mnemonic::Asr, hf)?;
            carry_to_x(&mut a, amount, t)?;
        }
        (Mnemonic::Ror | Mnemonic::Rol, true) => {
            rotate_ff(&mut a, w, x, t, amount, m == Mnemonic::Rol, hf)?;
        }
        (Mnemonic::Roxl | Mnemonic::Roxr, _) => match amount {
            Amount::Imm(c) => rotate_x(&mut a, w, x, c, m == Mnemonic::Roxl, ff, hf)?,
            Amount::Reg(cnt) => rotate_x_reg(&mut a, w, x, cnt, t, u, m == Mnemonic::Roxl, ff, hf)?,
        },
        (_, false) => plain(&mut a, m, w, x, t, amount, hf)?,
        _ => return Err(GenError::BadOperand("not a shift")),
    }
    genastore(ctx, &dst, x)
}

fn shifted(r: Reg, kind: Mnemonic, amount: Amount) -> crate::encoder::Operand {
    match (kind, amount) {
        (Mnemonic::Lsl, Amount::Imm(c)) => r.lsl(c),
        (Mnemonic::Lsl, Amount::Reg(s)) => r.lsl_reg(s),
        (Mnemonic::Lsr, Amount::Imm(c)) => r.lsr(c),
        (Mnemonic::Lsr, Amount::Reg(s)) => r.lsr_reg(s),
        (Mnemonic::Asr, Amount::Imm(c)) => r.asr(c),
        (Mnemonic::Asr, Amount::Reg(s)) => r.asr_reg(s),
        (_, Amount::Imm(c)) => r.ror(c),
        (_, Amount::Reg(s)) => r.ror_reg(s),
    }
}

/// LSL and ASL with flags. V is only ever set by ASL: when the bits shifted through
/// the sign position were not all equal.
fn left_ff(
    a: &mut Assembler,
    w: Width,
    x: Reg,
    t: Reg,
    amount: Amount,
    arith: bool,
    hf: HostFeatures,
) -> Result<()> {
    a.lsl(W1, x, w.shift())?;
    if arith {
        // W2 = the top count+1 bits, sign-extended
        match amount {
            Amount::Imm(c) => a.asr(W2, W1, 31 - c)?,
            Amount::Reg(cnt) => {
                let lim = w.bits().min(31) as u32;
                a.cmp(cnt, imm(lim))?;
                a.cond(Cond::Cs).mov(t, imm(lim))?;
                a.cond(Cond::Cc).mov(t, cnt)?;
                a.rsb(t, t, imm(31))?;
                a.mov(W2, W1.asr_reg(t))?;
                if w == Width::B32 {
                    // Everything shifted out: V iff the operand was nonzero.
                    a.cmp(cnt, imm(32))?;
                    a.cond(Cond::Cs).mov(W2, imm(1))?;
                    a.cond(Cond::Cs).cmp(W1, imm(0))?;
                    a.cond(Cond::Eq).mov(W2, imm(0))?;
                }
            }
        }
        a.cmn(W2, imm(1))?;
        a.cond(Cond::Ne).cmp(W2, imm(0))?;
        a.mov(W2, imm(0))?;
        a.cond(Cond::Ne).mov(W2, imm(FLAG_V))?;
        a.msr_flags(W2)?;
    } else {
        a.msr_flags(imm(0))?;
    }
    a.movs(W2, shifted(W1, Mnemonic::Lsl, amount))?;
    composite::merge(a, w, x, hf)
}

/// LSR and ASR with flags.
fn right_ff(a: &mut Assembler, w: Width, x: Reg, amount: Amount, arith: bool, hf: HostFeatures) -> Result<()> {
    let kind = if arith {
        composite::sign_extend(a, w, W1, x, hf)?;
        Mnemonic::Asr
    } else {
        composite::zero_extend(a, w, W1, x, hf)?;
        Mnemonic::Lsr
    };
    a.msr_flags(imm(0))?;
    a.movs(W2, shifted(W1, kind, amount))?;
    if w != Width::B32 {
        // N and Z at the operand width; C survives TST of a plain register.
        a.lsl(W2, W2, w.shift())?;
        a.tst(W2, W2)?;
    }
    composite::merge(a, w, x, hf)
}

/// Copy the operand into every `w`-bit lane of W1.
fn replicate(a: &mut Assembler, w: Width, x: Reg) -> Result<()> {
    match w {
        Width::B8 => {
            a.and(W1, x, imm(0xFF))?;
            a.orr(W1, W1, W1.lsl(8))?;
            a.orr(W1, W1, W1.lsl(16))
        }
        Width::B16 => {
            a.lsl(W1, x, 16)?;
            a.orr(W1, W1, W1.lsr(16))
        }
        Width::B32 => a.mov(W1, x),
    }
}

/// ROL becomes a right rotate by `32 - count`.
fn rotate_amount(a: &mut Assembler, t: Reg, amount: Amount, left: bool) -> Result<Amount> {
    Ok(match (amount, left) {
        (Amount::Imm(c), true) => Amount::Imm(32 - c),
        (Amount::Reg(cnt), true) => {
            a.rsb(t, cnt, imm(32))?;
            Amount::Reg(t)
        }
        (amount, false) => amount,
    })
}

fn rotate_ff(
    a: &mut Assembler,
    w: Width,
    x: Reg,
    t: Reg,
    amount: Amount,
    left: bool,
    hf: HostFeatures,
) -> Result<()> {
    replicate(a, w, x)?;
    let by = rotate_amount(a, t, amount, left)?;
    a.msr_flags(imm(0))?;
    a.movs(W2, shifted(W1, Mnemonic::Ror, by))?;
    if left {
        // The last bit out of a left rotate lands in bit 0.
        a.mrs(W1)?;
        a.tst(W2, imm(1))?;
        a.cond(Cond::Ne).orr(W1, W1, imm(FLAG_C))?;
        a.cond(Cond::Eq).bic(W1, W1, imm(FLAG_C))?;
        if let Amount::Reg(cnt) = amount {
            a.tst(cnt, cnt)?;
            a.cond(Cond::Eq).bic(W1, W1, imm(FLAG_C))?;
        }
        a.msr_flags(W1)?;
    }
    composite::merge(a, w, x, hf)
}

/// X takes C, except after a zero register count.
fn carry_to_x(a: &mut Assembler, amount: Amount, sv: Reg) -> Result<()> {
    match amount {
        Amount::Imm(_) => composite::duplicate_carry(a, REGS, X_SLOT),
        Amount::Reg(cnt) => {
            a.mrs(sv)?;
            a.mov(W1, sv.lsr(29))?;
            a.and(W1, W1, imm(1))?;
            a.tst(cnt, cnt)?;
            a.cond(Cond::Ne).strb(W1, REGS, X_SLOT)?;
            a.msr_flags(sv)
        }
    }
}

/// ROXL and ROXR by an immediate count: an `n + 1` bit rotate with X on top.
fn rotate_x(a: &mut Assembler, w: Width, x: Reg, c: u8, left: bool, ff: bool, hf: HostFeatures) -> Result<()> {
    if w == Width::B32 {
        composite::restore_carry(a, REGS, X_SLOT, false)?;
        a.mov(W2, x)?;
        for _ in 0..c {
            if left {
                a.adcs(W2, W2, W2)?;
            } else {
                a.movs(W2, W2.rrx())?;
            }
        }
        a.mov(x, W2)?;
        if ff {
            a.mrs(W1)?;
            a.bic(W1, W1, imm(FLAG_V))?;
            a.msr_flags(W1)?;
            composite::duplicate_carry(a, REGS, X_SLOT)?;
        }
        return Ok(());
    }
    let n = w.bits();
    a.ldrb(W1, REGS, X_SLOT)?;
    composite::zero_extend(a, w, W2, x, hf)?;
    a.orr(W2, W2, W1.lsl(n))?;
    if left {
        a.mov(W1, W2.lsr(n + 1 - c))?;
        a.orr(W2, W1, W2.lsl(c))?;
    } else {
        a.mov(W1, W2.lsr(c))?;
        a.orr(W2, W1, W2.lsl(n + 1 - c))?;
    }
    if !ff {
        return a.mov(x, W2);
    }
    // Bit n of the rotated value is the new X and C.
    a.msr_flags(imm(0))?;
    a.movs(W1, W2.lsl(32 - n))?;
    a.mov(W2, W1)?;
    composite::merge(a, w, x, hf)?;
    composite::duplicate_carry(a, REGS, X_SLOT)
}

/// ROXL and ROXR by a register count. The count is reduced modulo `n + 1`, a right
/// rotate becomes the complementary left rotate, and the `n + 1` bit rotate is put
/// together from register shifts; shifts by 32 or more (including the `-1` of an empty
/// rotate) produce zero. An empty rotate leaves X alone and copies it into C.
#[allow(clippy::too_many_arguments)]
fn rotate_x_reg(
    a: &mut Assembler,
    w: Width,
    x: Reg,
    cnt: Reg,
    t: Reg,
    u: Reg,
    left: bool,
    ff: bool,
    hf: HostFeatures,
) -> Result<()> {
    let n = w.bits() as u32;
    let span = n + 1;
    for _ in 0..63 / span {
        a.cmp(cnt, imm(span))?;
        a.cond(Cond::Cs).sub(cnt, cnt, imm(span))?;
    }
    if !left {
        a.cmp(cnt, imm(0))?;
        a.cond(Cond::Ne).rsb(cnt, cnt, imm(span))?;
    }
    composite::zero_extend(a, w, W1, x, hf)?;
    a.ldrb(W2, REGS, X_SLOT)?;
    // u = the last bit rotated out, the new X
    a.rsb(t, cnt, imm(n))?;
    a.mov(u, W1.lsr_reg(t))?;
    a.and(u, u, imm(1))?;
    a.cmp(cnt, imm(0))?;
    a.cond(Cond::Eq).mov(u, W2)?;
    // W2 = x << k | X << (k - 1) | x >> (n + 1 - k)
    a.sub(t, cnt, imm(1))?;
    a.mov(W2, W2.lsl_reg(t))?;
    a.orr(W2, W2, W1.lsl_reg(cnt))?;
    a.rsb(t, cnt, imm(span))?;
    a.orr(W2, W2, W1.lsr_reg(t))?;
    if !ff {
        return a.mov(x, W2);
    }
    if w != Width::B32 {
        a.lsl(W2, W2, w.shift())?;
    }
    a.msr_flags(imm(0))?;
    a.tst(W2, W2)?;
    a.mrs(t)?;
    a.orr(t, t, u.lsl(29))?;
    a.msr_flags(t)?;
    composite::merge(a, w, x, hf)?;
    a.strb(u, REGS, X_SLOT)
}

/// Flag-free forms. Only the low `w` bits of `x` matter afterwards.
fn plain(
    a: &mut Assembler,
    m: Mnemonic,
    w: Width,
    x: Reg,
    t: Reg,
    amount: Amount,
    hf: HostFeatures,
) -> Result<()> {
    match m {
        Mnemonic::Asl | Mnemonic::Lsl => a.mov(x, shifted(x, Mnemonic::Lsl, amount)),
        Mnemonic::Lsr => {
            composite::zero_extend(a, w, x, x, hf)?;
            a.mov(x, shifted(x, Mnemonic::Lsr, amount))
        }
        Mnemonic::Asr => {
            composite::sign_extend(a, w, x, x, hf)?;
            a.mov(x, shifted(x, Mnemonic::Asr, amount))
        }
        _ => {
            replicate(a, w, x)?;
            let by = rotate_amount(a, t, amount, m == Mnemonic::Rol)?;
            a.mov(x, shifted(W1, Mnemonic::Ror, by))
        }
    }
}
