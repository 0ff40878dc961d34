//! BTST, BCHG, BCLR, BSET. Only Z changes: it reflects the tested bit before the
//! operation.

use super::ctx::Ctx;
use super::ea::{gen_dst, gen_src, genamode, genastore, Access};
use super::GenError;
use crate::encoder::composite::FLAG_Z;
use crate::encoder::{imm, Reg, W2};
use crate::cond::Cond;
use crate::guest::{Ea, Mnemonic, Size};

pub fn bit_op(ctx: &mut Ctx<'_>) -> Result<(), GenError> {
    let m = ctx.entry.mnemonic;
    let size = ctx.size()?;
    // Dn holds bits 0..31, memory bytes 0..7.
    let modulo = if size == Size::Long { 31 } else { 7 };
    let test_only = m == Mnemonic::Btst;

    // The static bit number is an immediate byte whatever the operand size.
    let src = match ctx.entry.src {
        Some(Ea::Imm) => genamode(ctx, Ea::Imm, Size::Byte, Access::Read)?,
        _ => gen_src(ctx, Size::Long, Access::Read)?,
    };
    let dst = gen_dst(ctx, size, Access::Read)?;

    if test_only && !ctx.ff() {
        return Ok(());
    }
    let (n, d) = (src.val()?, dst.val()?);
    let mask = bit_mask(ctx, n, modulo)?;
    let ff = ctx.ff();
    let mut a = ctx.asm();
    if ff {
        a.mrs(W2)?;
        a.tst(d, mask)?;
        a.bic(W2, W2, imm(FLAG_Z))?;
        a.cond(Cond::Eq).orr(W2, W2, imm(FLAG_Z))?;
        a.msr_flags(W2)?;
    }
    match m {
        Mnemonic::Bchg => a.eor(d, d, mask)?,
        Mnemonic::Bclr => a.bic(d, d, mask)?,
        Mnemonic::Bset => a.orr(d, d, mask)?,
        _ => return Ok(()),
    }
    genastore(ctx, &dst, d)
}

// mask = 1 << (n & modulo)
fn bit_mask(ctx: &mut Ctx<'_>, n: Reg, modulo: u32) -> Result<Reg, GenError> {
    let mask = ctx.scratch()?;
    let mut a = ctx.asm();
    a.and(n, n, imm(modulo))?;
    a.mov(mask, imm(1))?;
    a.mov(mask, mask.lsl_reg(n))?;
    Ok(mask)
}
