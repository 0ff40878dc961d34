//! Arithmetic, logical, data movement and multiply families.

use super::ctx::Ctx;
use super::ea::{gen_dst, gen_src, genastore, push_long, Access, Opnd};
use super::template::LitValue;
use super::{GenError, RoutineFlags, REGS, X_SLOT};
use crate::cond::Cond;
use crate::encoder::composite::{self, FLAG_V, FLAG_Z};
use crate::encoder::{imm, Offset, Reg, Shift, Width, W1, W2};
use crate::guest::{Mnemonic, Size};

/// Source then destination, both read.
fn operands(ctx: &mut Ctx<'_>, size: Size) -> Result<(Opnd, Opnd), GenError> {
    let src = gen_src(ctx, size, Access::Read)?;
    let dst = gen_dst(ctx, size, Access::Read)?;
    Ok((src, dst))
}

/// ADD, SUB and their quick and immediate forms.
pub fn add_sub(ctx: &mut Ctx<'_>, sub: bool) -> Result<(), GenError> {
    let size = ctx.size()?;
    let (src, dst) = operands(ctx, size)?;
    let (s, d) = (src.val()?, dst.val()?);
    let (w, hf) = (size.width(), ctx.hf);
    if ctx.ff() {
        let mut a = ctx.asm();
        if sub {
            composite::sub(&mut a, w, d, s, hf)?;
        } else {
            composite::add(&mut a, w, d, s, hf)?;
        }
        composite::duplicate_carry(&mut a, REGS, X_SLOT)?;
    } else {
        let mut a = ctx.asm();
        if sub {
            a.sub(d, d, s)?;
        } else {
            a.add(d, d, s)?;
        }
    }
    genastore(ctx, &dst, d)
}

/// ADDA, SUBA. Word sources are sign-extended; no flags in either variant.
pub fn adda_suba(ctx: &mut Ctx<'_>, sub: bool) -> Result<(), GenError> {
    let size = ctx.size()?;
    let src = gen_src(ctx, size, Access::Read)?;
    let dst = gen_dst(ctx, Size::Long, Access::Read)?;
    let (s, d) = (src.val()?, dst.val()?);
    let hf = ctx.hf;
    let mut a = ctx.asm();
    if size == Size::Word {
        composite::sign_extend(&mut a, Width::B16, s, s, hf)?;
    }
    if sub {
        a.sub(d, d, s)?;
    } else {
        a.add(d, d, s)?;
    }
    genastore(ctx, &dst, d)
}

/// ADDX, SUBX: X into host C first, Z sticky.
pub fn addx_subx(ctx: &mut Ctx<'_>, sub: bool) -> Result<(), GenError> {
    ctx.flags |= RoutineFlags::ADDX;
    let size = ctx.size()?;
    let (src, dst) = operands(ctx, size)?;
    let (s, d) = (src.val()?, dst.val()?);
    let (w, hf) = (size.width(), ctx.hf);
    let ff = ctx.ff();
    let mut a = ctx.asm();
    composite::restore_carry(&mut a, REGS, X_SLOT, sub)?;
    match (ff, sub) {
        (true, false) => composite::addx(&mut a, w, d, s, hf)?,
        (true, true) => composite::subx(&mut a, w, d, s, hf)?,
        (false, false) => a.adc(d, d, s)?,
        (false, true) => a.sbc(d, d, s)?,
    }
    if ff {
        composite::duplicate_carry(&mut a, REGS, X_SLOT)?;
    }
    genastore(ctx, &dst, d)
}

pub fn neg(ctx: &mut Ctx<'_>) -> Result<(), GenError> {
    let size = ctx.size()?;
    let dst = gen_dst(ctx, size, Access::Read)?;
    let d = dst.val()?;
    let hf = ctx.hf;
    if ctx.ff() {
        let mut a = ctx.asm();
        composite::neg(&mut a, size.width(), d, hf)?;
        composite::duplicate_carry(&mut a, REGS, X_SLOT)?;
    } else {
        ctx.asm().rsb(d, d, imm(0))?;
    }
    genastore(ctx, &dst, d)
}

pub fn negx(ctx: &mut Ctx<'_>) -> Result<(), GenError> {
    ctx.flags |= RoutineFlags::ADDX;
    let size = ctx.size()?;
    let dst = gen_dst(ctx, size, Access::Read)?;
    let d = dst.val()?;
    let hf = ctx.hf;
    let ff = ctx.ff();
    let mut a = ctx.asm();
    composite::restore_carry(&mut a, REGS, X_SLOT, true)?;
    if ff {
        composite::negx(&mut a, size.width(), d, hf)?;
        composite::duplicate_carry(&mut a, REGS, X_SLOT)?;
    } else {
        a.rsc(d, d, imm(0))?;
    }
    genastore(ctx, &dst, d)
}

/// CMP, CMPI, CMPM. Without live flags only the operand side effects remain.
pub fn cmp(ctx: &mut Ctx<'_>) -> Result<(), GenError> {
    let size = ctx.size()?;
    if !ctx.ff() {
        gen_src(ctx, size, Access::Effect)?;
        gen_dst(ctx, size, Access::Effect)?;
        return Ok(());
    }
    let (src, dst) = operands(ctx, size)?;
    let (s, d) = (src.val()?, dst.val()?);
    composite::cmp(&mut ctx.asm(), size.width(), d, s)?;
    Ok(())
}

pub fn cmpa(ctx: &mut Ctx<'_>) -> Result<(), GenError> {
    let size = ctx.size()?;
    if !ctx.ff() {
        gen_src(ctx, size, Access::Effect)?;
        return Ok(());
    }
    let src = gen_src(ctx, size, Access::Read)?;
    let dst = gen_dst(ctx, Size::Long, Access::Read)?;
    let (s, d) = (src.val()?, dst.val()?);
    let hf = ctx.hf;
    let mut a = ctx.asm();
    if size == Size::Word {
        composite::sign_extend(&mut a, Width::B16, s, s, hf)?;
    }
    composite::cmp(&mut a, Width::B32, d, s)?;
    Ok(())
}

/// AND, OR, EOR and the immediate forms.
pub fn logical(ctx: &mut Ctx<'_>) -> Result<(), GenError> {
    let size = ctx.size()?;
    let (src, dst) = operands(ctx, size)?;
    let (s, d) = (src.val()?, dst.val()?);
    let m = ctx.entry.mnemonic;
    let ff = ctx.ff();
    let mut a = ctx.asm();
    match m {
        Mnemonic::And => a.and(d, d, s)?,
        Mnemonic::Or => a.orr(d, d, s)?,
        _ => a.eor(d, d, s)?,
    }
    if ff {
        composite::logic_flags(&mut a, size.width(), d)?;
    }
    genastore(ctx, &dst, d)
}

pub fn not(ctx: &mut Ctx<'_>) -> Result<(), GenError> {
    let size = ctx.size()?;
    let dst = gen_dst(ctx, size, Access::Read)?;
    let d = dst.val()?;
    let ff = ctx.ff();
    let mut a = ctx.asm();
    a.mvn(d, d)?;
    if ff {
        composite::logic_flags(&mut a, size.width(), d)?;
    }
    genastore(ctx, &dst, d)
}

/// MOVE and MOVEQ.
pub fn move_(ctx: &mut Ctx<'_>) -> Result<(), GenError> {
    let size = ctx.size()?;
    let src = gen_src(ctx, size, Access::Read)?;
    let dst = gen_dst(ctx, size, Access::Effect)?;
    let v = src.val()?;
    if ctx.ff() {
        composite::logic_flags(&mut ctx.asm(), size.width(), v)?;
    }
    genastore(ctx, &dst, v)
}

pub fn movea(ctx: &mut Ctx<'_>) -> Result<(), GenError> {
    let size = ctx.size()?;
    let src = gen_src(ctx, size, Access::Read)?;
    let dst = gen_dst(ctx, Size::Long, Access::Effect)?;
    let v = src.val()?;
    if size == Size::Word {
        let hf = ctx.hf;
        composite::sign_extend(&mut ctx.asm(), Width::B16, v, v, hf)?;
    }
    genastore(ctx, &dst, v)
}

pub fn clr(ctx: &mut Ctx<'_>) -> Result<(), GenError> {
    let size = ctx.size()?;
    let dst = gen_dst(ctx, size, Access::Effect)?;
    let v = ctx.scratch()?;
    let ff = ctx.ff();
    let mut a = ctx.asm();
    a.mov(v, imm(0))?;
    if ff {
        a.msr_flags(imm(FLAG_Z))?;
    }
    genastore(ctx, &dst, v)
}

pub fn tst(ctx: &mut Ctx<'_>) -> Result<(), GenError> {
    let size = ctx.size()?;
    if !ctx.ff() {
        gen_src(ctx, size, Access::Effect)?;
        return Ok(());
    }
    let src = gen_src(ctx, size, Access::Read)?;
    let v = src.val()?;
    composite::logic_flags(&mut ctx.asm(), size.width(), v)?;
    Ok(())
}

/// EXT.W (byte to word), EXT.L (word to long), EXTB.L (byte to long).
pub fn ext(ctx: &mut Ctx<'_>) -> Result<(), GenError> {
    let size = ctx.size()?;
    let from = match (ctx.entry.mnemonic, size) {
        (Mnemonic::Ext, Size::Long) => Width::B16,
        _ => Width::B8,
    };
    let dst = gen_dst(ctx, size, Access::Read)?;
    let d = dst.val()?;
    let (hf, ff) = (ctx.hf, ctx.ff());
    let mut a = ctx.asm();
    composite::sign_extend(&mut a, from, d, d, hf)?;
    if ff {
        composite::logic_flags(&mut a, size.width(), d)?;
    }
    genastore(ctx, &dst, d)
}

pub fn swap(ctx: &mut Ctx<'_>) -> Result<(), GenError> {
    let dst = gen_dst(ctx, Size::Long, Access::Read)?;
    let d = dst.val()?;
    let ff = ctx.ff();
    let mut a = ctx.asm();
    a.ror(d, d, 16)?;
    if ff {
        composite::logic_flags(&mut a, Width::B32, d)?;
    }
    genastore(ctx, &dst, d)
}

pub fn exg(ctx: &mut Ctx<'_>) -> Result<(), GenError> {
    let (src, dst) = operands(ctx, Size::Long)?;
    let (s, d) = (src.val()?, dst.val()?);
    genastore(ctx, &src, d)?;
    genastore(ctx, &dst, s)
}

pub fn lea(ctx: &mut Ctx<'_>) -> Result<(), GenError> {
    let src = gen_src(ctx, Size::Long, Access::Effect)?;
    let dst = gen_dst(ctx, Size::Long, Access::Effect)?;
    genastore(ctx, &dst, src.addr()?)
}

pub fn pea(ctx: &mut Ctx<'_>) -> Result<(), GenError> {
    let src = gen_src(ctx, Size::Long, Access::Effect)?;
    push_long(ctx, src.addr()?)
}

/// MULU.W, MULS.W: 16 x 16 -> 32.
pub fn mul(ctx: &mut Ctx<'_>) -> Result<(), GenError> {
    let signed = ctx.entry.mnemonic == Mnemonic::Muls;
    let (src, dst) = operands(ctx, Size::Word)?;
    let (s, d) = (src.val()?, dst.val()?);
    let (hf, ff) = (ctx.hf, ctx.ff());
    let mut a = ctx.asm();
    if signed {
        composite::sign_extend(&mut a, Width::B16, s, s, hf)?;
        composite::sign_extend(&mut a, Width::B16, d, d, hf)?;
    } else {
        composite::zero_extend(&mut a, Width::B16, s, s, hf)?;
        composite::zero_extend(&mut a, Width::B16, d, d, hf)?;
    }
    if ff {
        // MULS leaves C and V alone.
        a.msr_flags(imm(0))?;
        a.muls(d, s, d)?;
    } else {
        a.mul(d, s, d)?;
    }
    genastore(ctx, &Opnd { size: Size::Long, ..dst }, d)
}

/// MULU.L, MULS.L. The extension word is decoded at run time: Dl in bits 14..12, Dh
/// in bits 2..0, bit 11 for a signed product and bit 10 for the 64-bit form.
pub fn mull(ctx: &mut Ctx<'_>) -> Result<(), GenError> {
    let src = gen_src(ctx, Size::Long, Access::Read)?;
    let s = src.val()?;
    let (e, dl, lo, hi) = (ctx.scratch()?, ctx.scratch()?, ctx.scratch()?, ctx.scratch()?);
    let (t, f) = (ctx.scratch()?, ctx.scratch()?);
    ctx.literal(e, LitValue::Ext16 { at: 0 })?;
    let ff = ctx.ff();
    let data = |r: Reg| Offset::Shifted { rm: r, shift: Shift::Lsl(2), subtract: false };

    let mut a = ctx.asm();
    a.lsr(W1, e, 12)?;
    a.and(W1, W1, imm(7))?;
    a.ldr(dl, REGS, data(W1))?;
    a.tst(e, imm(0x800))?;
    a.cond(Cond::Ne).smull(lo, hi, dl, s)?;
    a.cond(Cond::Eq).umull(lo, hi, dl, s)?;
    a.str(lo, REGS, data(W1))?;
    a.and(W2, e, imm(7))?;
    a.tst(e, imm(0x400))?;
    a.cond(Cond::Ne).str(hi, REGS, data(W2))?;
    if !ff {
        return Ok(());
    }
    // V: the 32-bit form lost significant bits. C is always clear.
    a.mov(f, imm(0))?;
    a.tst(e, imm(0x800))?;
    a.cond(Cond::Ne).mov(t, lo.asr(31))?;
    a.cond(Cond::Eq).mov(t, imm(0))?;
    a.cmp(hi, t)?;
    a.cond(Cond::Ne).mov(f, imm(FLAG_V))?;
    a.tst(e, imm(0x400))?;
    a.cond(Cond::Ne).mov(f, imm(0))?;
    // N and Z from Dl, or from Dh:Dl for the 64-bit form: `t` keeps the sign of Dh
    // and is zero only when both halves are.
    a.cmp(lo, imm(0))?;
    a.mov(t, hi)?;
    a.cond(Cond::Ne).orr(t, t, imm(1))?;
    a.tst(e, imm(0x400))?;
    a.cond(Cond::Eq).mov(t, lo)?;
    a.msr_flags(f)?;
    a.tst(t, t)?;
    Ok(())
}
