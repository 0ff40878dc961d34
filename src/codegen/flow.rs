//! Control flow: Bcc, BSR, DBcc, Scc, JMP, JSR, RTS, RTD, LINK, UNLK.
//!
//! Routines that change the guest PC store the new value into the PC slot and carry
//! [`RoutineFlags::JUMP`]; the block ends after them. Conditional ones select between
//! the fall-through and the target address with a conditional move, so the slot is
//! written on both paths.

use super::ctx::{Bank, Ctx};
use super::ea::{gen_dst, gen_src, genastore, push_long, read_mem, write_mem, Access};
use super::template::LitValue;
use super::{GenError, RoutineFlags, PC_SLOT, REGS};
use crate::cond::Cond;
use crate::encoder::{arm, composite, imm, Reg, Width, W1};
use crate::guest::{Ea, RegRef, Size};

fn condition(ctx: &Ctx<'_>) -> Cond {
    Cond::from_guest(ctx.entry.cc).unwrap_or(Cond::Nv)
}

/// Address of the next instruction.
fn next_pc(ctx: &Ctx<'_>) -> LitValue {
    LitValue::Pc { addend: 2 + 2 * ctx.entry.ext_words() as i32 }
}

fn set_pc(ctx: &mut Ctx<'_>, r: Reg) -> Result<(), GenError> {
    ctx.asm().str(r, REGS, PC_SLOT)?;
    Ok(())
}

/// Branch target of a Bcc/BSR.
fn branch_target(ctx: &mut Ctx<'_>) -> Result<LitValue, GenError> {
    match (ctx.entry.src, ctx.size()?) {
        (Some(Ea::Quick(d)), _) => Ok(LitValue::Pc { addend: 2 + d }),
        (Some(Ea::Imm), Size::Word) => Ok(LitValue::PcExt16 { at: ctx.take_ext(1) }),
        (Some(Ea::Imm), Size::Long) => Ok(LitValue::PcExt32 { at: ctx.take_ext(2) }),
        _ => Err(GenError::BadOperand("branch displacement")),
    }
}

pub fn bcc(ctx: &mut Ctx<'_>) -> Result<(), GenError> {
    ctx.flags |= RoutineFlags::JUMP;
    let c = condition(ctx);
    let target = branch_target(ctx)?;
    let t = ctx.scratch()?;
    ctx.literal(t, target)?;
    if c == Cond::Al {
        return set_pc(ctx, t);
    }
    ctx.flags |= RoutineFlags::COND_JUMP | RoutineFlags::CMOV;
    let n = ctx.scratch()?;
    let next = next_pc(ctx);
    ctx.literal(n, next)?;
    composite::cmov(&mut ctx.asm(), c, n, t)?;
    set_pc(ctx, n)
}

pub fn bsr(ctx: &mut Ctx<'_>) -> Result<(), GenError> {
    ctx.flags |= RoutineFlags::JUMP;
    let target = branch_target(ctx)?;
    let (t, n) = (ctx.scratch()?, ctx.scratch()?);
    ctx.literal(t, target)?;
    let next = next_pc(ctx);
    ctx.literal(n, next)?;
    push_long(ctx, n)?;
    set_pc(ctx, t)
}

/// DBcc: when the condition is false, decrement the low word of Dn and branch unless
/// it became -1.
pub fn dbcc(ctx: &mut Ctx<'_>) -> Result<(), GenError> {
    ctx.flags |= RoutineFlags::JUMP | RoutineFlags::COND_JUMP | RoutineFlags::CMOV;
    let c = condition(ctx);
    let dn = match ctx.entry.src {
        Some(Ea::Dreg(r)) => r,
        _ => return Err(GenError::BadOperand("DBcc counter")),
    };
    let ff = ctx.ff();
    let (sv, n, t) = (ctx.scratch()?, ctx.scratch()?, ctx.scratch()?);
    let (cc, d) = (ctx.scratch()?, ctx.scratch()?);

    if ff {
        ctx.asm().mrs(sv)?;
    }
    let next = next_pc(ctx);
    ctx.literal(n, next)?;
    let at = ctx.take_ext(1);
    ctx.literal(t, LitValue::PcExt16 { at })?;
    let skip = {
        let mut a = ctx.asm();
        composite::setcc(&mut a, c, cc)?;
        a.cmp(cc, imm(0))?;
        let p = a.pos();
        a.b(0)?;
        p
    };
    ctx.load_reg(d, Bank::Data, dn)?;
    ctx.asm().sub(d, d, imm(1))?;
    ctx.store_reg(d, Bank::Data, dn, Width::B16)?;
    {
        let mut a = ctx.asm();
        a.lsl(W1, d, 16)?;
        a.cmn(W1, imm(0x1_0000))?;
        a.cond(Cond::Ne).mov(n, t)?;
        let end = a.pos();
        a.patch(skip, arm::b(Cond::Ne, end as i32 - skip as i32 - 2)?)?;
        a.str(n, REGS, PC_SLOT)?;
        if ff {
            a.msr_flags(sv)?;
        }
    }
    Ok(())
}

/// Scc: the destination byte becomes all ones when the condition holds.
pub fn scc(ctx: &mut Ctx<'_>) -> Result<(), GenError> {
    ctx.flags |= RoutineFlags::CMOV;
    let c = condition(ctx);
    let dst = gen_dst(ctx, Size::Byte, Access::Effect)?;
    let v = ctx.scratch()?;
    {
        let mut a = ctx.asm();
        composite::setcc(&mut a, c, v)?;
        a.rsb(v, v, imm(0))?;
    }
    genastore(ctx, &dst, v)
}

pub fn jmp(ctx: &mut Ctx<'_>) -> Result<(), GenError> {
    ctx.flags |= RoutineFlags::JUMP;
    let src = gen_src(ctx, Size::Long, Access::Effect)?;
    set_pc(ctx, src.addr()?)
}

pub fn jsr(ctx: &mut Ctx<'_>) -> Result<(), GenError> {
    ctx.flags |= RoutineFlags::JUMP;
    let src = gen_src(ctx, Size::Long, Access::Effect)?;
    let target = src.addr()?;
    let n = ctx.scratch()?;
    let next = next_pc(ctx);
    ctx.literal(n, next)?;
    push_long(ctx, n)?;
    set_pc(ctx, target)
}

pub fn rts(ctx: &mut Ctx<'_>) -> Result<(), GenError> {
    ctx.flags |= RoutineFlags::JUMP;
    let a7 = RegRef::implied(7);
    let sp = ctx.scratch()?;
    ctx.load_reg(sp, Bank::Addr, a7)?;
    let v = read_mem(ctx, Size::Long, sp)?;
    ctx.asm().add(sp, sp, imm(4))?;
    ctx.store_reg(sp, Bank::Addr, a7, Width::B32)?;
    set_pc(ctx, v)
}

/// RTD #d: PC = (A7), A7 += 4 + d.
pub fn rtd(ctx: &mut Ctx<'_>) -> Result<(), GenError> {
    ctx.flags |= RoutineFlags::JUMP;
    let a7 = RegRef::implied(7);
    let (sp, disp) = (ctx.scratch()?, ctx.scratch()?);
    let at = ctx.take_ext(1);
    ctx.literal(disp, LitValue::Ext16Signed { at })?;
    ctx.load_reg(sp, Bank::Addr, a7)?;
    let v = read_mem(ctx, Size::Long, sp)?;
    set_pc(ctx, v)?;
    {
        let mut a = ctx.asm();
        a.add(sp, sp, imm(4))?;
        a.add(sp, sp, disp)?;
    }
    ctx.store_reg(sp, Bank::Addr, a7, Width::B32)
}

/// LINK An,#d: push An, An = A7, A7 += d.
pub fn link(ctx: &mut Ctx<'_>) -> Result<(), GenError> {
    let size = ctx.size()?;
    let an = match ctx.entry.src {
        Some(Ea::Areg(r)) => r,
        _ => return Err(GenError::BadOperand("LINK register")),
    };
    let a7 = RegRef::implied(7);
    let (sp, v, disp) = (ctx.scratch()?, ctx.scratch()?, ctx.scratch()?);
    ctx.load_reg(sp, Bank::Addr, a7)?;
    ctx.asm().sub(sp, sp, imm(4))?;
    ctx.store_reg(sp, Bank::Addr, a7, Width::B32)?;
    // Loaded after the A7 update: LINK A7 pushes the decremented value.
    ctx.load_reg(v, Bank::Addr, an)?;
    write_mem(ctx, Size::Long, sp, v)?;
    ctx.store_reg(sp, Bank::Addr, an, Width::B32)?;
    let value = if size == Size::Long {
        LitValue::Ext32 { at: ctx.take_ext(2) }
    } else {
        LitValue::Ext16Signed { at: ctx.take_ext(1) }
    };
    ctx.literal(disp, value)?;
    ctx.asm().add(sp, sp, disp)?;
    ctx.store_reg(sp, Bank::Addr, a7, Width::B32)
}

/// UNLK An: A7 = An + 4, An = (An).
pub fn unlk(ctx: &mut Ctx<'_>) -> Result<(), GenError> {
    let an = match ctx.entry.src {
        Some(Ea::Areg(r)) => r,
        _ => return Err(GenError::BadOperand("UNLK register")),
    };
    let fp = ctx.scratch()?;
    ctx.load_reg(fp, Bank::Addr, an)?;
    let v = read_mem(ctx, Size::Long, fp)?;
    ctx.asm().add(fp, fp, imm(4))?;
    ctx.store_reg(fp, Bank::Addr, RegRef::implied(7), Width::B32)?;
    ctx.store_reg(v, Bank::Addr, an, Width::B32)
}
