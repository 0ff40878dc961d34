//! Operand realisation (`genamode`) and store-back (`genastore`).
//!
//! Address-register side effects are applied while the operand is realised: the
//! pre-decrement before the access, the post-increment right after the address is
//! taken. Callers realise the source before the destination, which gives the guest
//! ordering for instructions naming the same register twice.

use super::ctx::{Bank, Ctx};
use super::template::{Guard, LitValue};
use super::{GenError, MEM, REGS};
use crate::encoder::composite::{bswap16, bswap32, sign_extend};
use crate::encoder::{imm, Offset, Reg, Shift, Width, W1, W2};
use crate::guest::{Ea, RegRef, Size};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    /// Realise the value.
    Read,
    /// Only the address and its side effects (stores, LEA, control transfers).
    Effect,
}

/// A realised operand.
#[derive(Debug, Clone, Copy)]
pub struct Opnd {
    pub ea: Ea,
    pub size: Size,
    /// Guest address, for memory operands.
    pub addr: Option<Reg>,
    pub val: Option<Reg>,
}

impl Opnd {
    pub fn val(&self) -> Result<Reg, GenError> {
        self.val.ok_or(GenError::BadOperand("operand was not read"))
    }

    pub fn addr(&self) -> Result<Reg, GenError> {
        self.addr.ok_or(GenError::BadOperand("operand has no address"))
    }
}

pub fn genamode(ctx: &mut Ctx<'_>, ea: Ea, size: Size, access: Access) -> Result<Opnd, GenError> {
    let read = access == Access::Read;
    let mut o = Opnd { ea, size, addr: None, val: None };
    match ea {
        Ea::Dreg(r) | Ea::Areg(r) => {
            if read {
                let v = ctx.scratch()?;
                let bank = if matches!(ea, Ea::Dreg(_)) { Bank::Data } else { Bank::Addr };
                ctx.load_reg(v, bank, r)?;
                o.val = Some(v);
            }
        }
        Ea::Quick(q) => {
            if read {
                let v = ctx.scratch()?;
                ctx.asm().load_const(v, q as u32)?;
                o.val = Some(v);
            }
        }
        Ea::Imm => {
            let words = if size == Size::Long { 2 } else { 1 };
            let at = ctx.take_ext(words);
            if read {
                let v = ctx.scratch()?;
                let value = match size {
                    Size::Byte => LitValue::Ext8 { at },
                    Size::Word => LitValue::Ext16 { at },
                    Size::Long => LitValue::Ext32 { at },
                };
                ctx.literal(v, value)?;
                o.val = Some(v);
            }
        }
        _ => {
            let a = address(ctx, ea, size)?;
            o.addr = Some(a);
            if read {
                o.val = Some(read_mem(ctx, size, a)?);
            }
        }
    }
    Ok(o)
}

/// Realise the entry's source operand.
pub fn gen_src(ctx: &mut Ctx<'_>, size: Size, access: Access) -> Result<Opnd, GenError> {
    let ea = ctx.entry.src.ok_or(GenError::BadOperand("missing source"))?;
    genamode(ctx, ea, size, access)
}

/// Realise the entry's destination operand.
pub fn gen_dst(ctx: &mut Ctx<'_>, size: Size, access: Access) -> Result<Opnd, GenError> {
    let ea = ctx.entry.dst.ok_or(GenError::BadOperand("missing destination"))?;
    genamode(ctx, ea, size, access)
}

/// Compute the guest address of a memory operand, applying any register update.
fn address(ctx: &mut Ctx<'_>, ea: Ea, size: Size) -> Result<Reg, GenError> {
    let a = ctx.scratch()?;
    match ea {
        Ea::Aind(r) => ctx.load_reg(a, Bank::Addr, r)?,
        Ea::Aipi(r) => {
            ctx.load_reg(a, Bank::Addr, r)?;
            ctx.step(W1, a, r, size, false)?;
            ctx.store_reg(W1, Bank::Addr, r, Width::B32)?;
        }
        Ea::Apdi(r) => {
            ctx.load_reg(a, Bank::Addr, r)?;
            ctx.step(a, a, r, size, true)?;
            ctx.store_reg(a, Bank::Addr, r, Width::B32)?;
        }
        Ea::Ad16(r) => {
            ctx.load_reg(a, Bank::Addr, r)?;
            let at = ctx.take_ext(1);
            ctx.literal(W1, LitValue::Ext16Signed { at })?;
            ctx.asm().add(a, a, W1)?;
        }
        Ea::Ad8r(r) => indexed(ctx, a, Some(r))?,
        Ea::Pc8r => indexed(ctx, a, None)?,
        Ea::AbsW => {
            let at = ctx.take_ext(1);
            ctx.literal(a, LitValue::Ext16Signed { at })?;
        }
        Ea::AbsL => {
            let at = ctx.take_ext(2);
            ctx.literal(a, LitValue::Ext32 { at })?;
        }
        Ea::Pc16 => {
            let at = ctx.take_ext(1);
            ctx.literal(a, LitValue::PcExt16 { at })?;
        }
        _ => return Err(GenError::BadOperand("not a memory operand")),
    }
    Ok(a)
}

/// `(d8,An,Xn)` and `(d8,PC,Xn)` with a brief extension word decoded at run time:
/// `ea = base + d8 + (W ? sext16(Xn) : Xn) << scale`.
fn indexed(ctx: &mut Ctx<'_>, ea: Reg, base: Option<RegRef>) -> Result<(), GenError> {
    let at = ctx.take_ext(1);
    ctx.guard(Guard::BriefExtension { at });
    let x = ctx.scratch()?;
    let hf = ctx.hf;
    ctx.literal(W1, LitValue::Ext16 { at })?;
    {
        let mut a = ctx.asm();
        a.lsr(W2, W1, 12)?;
        a.ldr(x, REGS, Offset::Shifted { rm: W2, shift: Shift::Lsl(2), subtract: false })?;
        // W2 = all ones for a long index
        a.lsl(W2, W1, 20)?;
        a.asr(W2, W2, 31)?;
        sign_extend(&mut a, Width::B16, ea, x, hf)?;
        a.bic(ea, ea, W2)?;
        a.and(x, x, W2)?;
        a.orr(x, x, ea)?;
        a.lsr(W2, W1, 9)?;
        a.and(W2, W2, imm(3))?;
        a.mov(x, x.lsl_reg(W2))?;
        sign_extend(&mut a, Width::B8, W2, W1, hf)?;
    }
    match base {
        Some(r) => ctx.load_reg(ea, Bank::Addr, r)?,
        None => ctx.literal(ea, LitValue::Pc { addend: 2 + 2 * at as i32 })?,
    }
    let mut a = ctx.asm();
    a.add(ea, ea, W2)?;
    a.add(ea, ea, x)?;
    Ok(())
}

/// Big-endian guest load. The result is zero-extended.
pub fn read_mem(ctx: &mut Ctx<'_>, size: Size, addr: Reg) -> Result<Reg, GenError> {
    let v = ctx.scratch()?;
    let hf = ctx.hf;
    let mut a = ctx.asm();
    match size {
        Size::Byte => a.ldrb(v, MEM, addr)?,
        Size::Word => {
            a.ldrh(v, MEM, addr)?;
            bswap16(&mut a, v, v, hf)?;
        }
        Size::Long => {
            a.ldr(v, MEM, addr)?;
            bswap32(&mut a, v, v, hf)?;
        }
    }
    Ok(v)
}

/// Big-endian guest store of the low `size` bytes of `v`. Clobbers W1 and W2.
pub fn write_mem(ctx: &mut Ctx<'_>, size: Size, addr: Reg, v: Reg) -> Result<(), GenError> {
    let hf = ctx.hf;
    let mut a = ctx.asm();
    match size {
        Size::Byte => a.strb(v, MEM, addr)?,
        Size::Word => {
            bswap16(&mut a, W2, v, hf)?;
            a.strh(W2, MEM, addr)?;
        }
        Size::Long => {
            bswap32(&mut a, W2, v, hf)?;
            a.str(W2, MEM, addr)?;
        }
    }
    Ok(())
}

/// Write `v` back through a realised operand.
pub fn genastore(ctx: &mut Ctx<'_>, dst: &Opnd, v: Reg) -> Result<(), GenError> {
    match dst.ea {
        Ea::Dreg(r) => ctx.store_reg(v, Bank::Data, r, dst.size.width()),
        Ea::Areg(r) => ctx.store_reg(v, Bank::Addr, r, Width::B32),
        e if e.is_memory_alterable() => write_mem(ctx, dst.size, dst.addr()?, v),
        _ => Err(GenError::BadOperand("operand is not writable")),
    }
}

/// Push a long onto the guest stack (A7).
pub fn push_long(ctx: &mut Ctx<'_>, v: Reg) -> Result<(), GenError> {
    let sp = ctx.scratch()?;
    let a7 = RegRef::implied(7);
    ctx.load_reg(sp, Bank::Addr, a7)?;
    ctx.asm().sub(sp, sp, imm(4))?;
    ctx.store_reg(sp, Bank::Addr, a7, Width::B32)?;
    write_mem(ctx, Size::Long, sp, v)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codegen::{GenEnv, Variant};
    use crate::guest::table::decode;

    #[test]
    fn postincrement_byte_step_is_patchable() {
        // MOVE.B (A0)+,D0
        let e = decode(0x1018);
        let mut ctx = Ctx::new(&e, Variant::Nf, &GenEnv::default());
        let src = e.src.unwrap();
        let o = genamode(&mut ctx, src, Size::Byte, Access::Read).unwrap();
        assert!(o.val.is_some() && o.addr.is_some());
        let t = ctx.finish().template().cloned().unwrap();
        let patched = t.instantiate(0x1E1F, &[], 0).unwrap();
        // add r2, r4, #2 for A7
        assert_eq!(patched[1], 0xe284_2002);
        let patched = t.instantiate(0x1018, &[], 0).unwrap();
        assert_eq!(patched[1], 0xe284_2001);
    }

    #[test]
    fn immediate_consumes_words_without_read() {
        let e = decode(0x0C80); // CMPI.L #imm,D0
        let mut ctx = Ctx::new(&e, Variant::Nf, &GenEnv::default());
        let o = genamode(&mut ctx, Ea::Imm, Size::Long, Access::Effect).unwrap();
        assert!(o.val.is_none());
        assert_eq!(ctx.take_ext(0), 2);
        assert_eq!(ctx.pos(), 0);
    }
}
