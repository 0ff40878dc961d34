//! MOVEM in both directions.
//!
//! The register mask is the first extension word and reaches the code through a
//! literal, so one template serves every mask. The body is unrolled over the sixteen
//! registers; each step tests its mask bit and branches over itself when clear.
//! Registers are addressed directly in the register file, D0..D7 then A0..A7.

use super::ctx::{Bank, Ctx};
use super::ea::{genamode, Access};
use super::template::LitValue;
use super::{GenError, DREG_BASE, MEM, REGS};
use crate::cond::Cond;
use crate::encoder::composite::{bswap16, bswap32, sign_extend};
use crate::encoder::{arm, imm, Assembler, Reg, Width, W2};
use crate::guest::{Ea, Mnemonic, Size};

/// Emit `TST mask,#bit` and a placeholder branch; returns the branch position.
fn test_bit(a: &mut Assembler, mask: Reg, bit: u8) -> Result<usize, GenError> {
    a.tst(mask, imm(1 << bit))?;
    let p = a.pos();
    a.b(0)?;
    Ok(p)
}

fn skip_to_here(a: &mut Assembler, p: usize) -> Result<(), GenError> {
    let end = a.pos();
    a.patch(p, arm::b(Cond::Eq, end as i32 - p as i32 - 2)?)?;
    Ok(())
}

/// Start address of the transfer. Predecrement and postincrement start from An
/// itself; the register is written back once at the end.
fn base(ctx: &mut Ctx<'_>, ea: Ea, size: Size) -> Result<Reg, GenError> {
    match ea {
        Ea::Aipi(r) | Ea::Apdi(r) => {
            let addr = ctx.scratch()?;
            ctx.load_reg(addr, Bank::Addr, r)?;
            Ok(addr)
        }
        _ => genamode(ctx, ea, size, Access::Effect)?.addr(),
    }
}

pub fn movem(ctx: &mut Ctx<'_>) -> Result<(), GenError> {
    debug_assert_eq!(ctx.entry.mnemonic, Mnemonic::Movem);
    let size = ctx.size()?;
    let mask = ctx.scratch()?;
    ctx.literal(mask, LitValue::Ext16 { at: 0 })?;
    match (ctx.entry.src, ctx.entry.dst) {
        (Some(ea), None) => to_registers(ctx, ea, size, mask),
        (None, Some(ea)) => to_memory(ctx, ea, size, mask),
        _ => Err(GenError::BadOperand("MOVEM operands")),
    }
}

/// MOVEM <ea>,list. Words are sign-extended into the whole register.
fn to_registers(ctx: &mut Ctx<'_>, ea: Ea, size: Size, mask: Reg) -> Result<(), GenError> {
    let addr = base(ctx, ea, size)?;
    let v = ctx.scratch()?;
    let hf = ctx.hf;
    {
        let mut a = ctx.asm();
        for i in 0..16u8 {
            let p = test_bit(&mut a, mask, i)?;
            match size {
                Size::Long => {
                    a.ldr(v, MEM, addr)?;
                    bswap32(&mut a, v, v, hf)?;
                }
                _ => {
                    a.ldrh(v, MEM, addr)?;
                    bswap16(&mut a, v, v, hf)?;
                    sign_extend(&mut a, Width::B16, v, v, hf)?;
                }
            }
            a.str(v, REGS, DREG_BASE + 4 * i as i32)?;
            a.add(addr, addr, imm(size.bytes()))?;
            skip_to_here(&mut a, p)?;
        }
    }
    if let Ea::Aipi(r) = ea {
        // Written after the loads: a loaded An is overwritten.
        ctx.store_reg(addr, Bank::Addr, r, Width::B32)?;
    }
    Ok(())
}

/// MOVEM list,<ea>. In predecrement mode the mask is reversed (bit 0 is A7) and
/// registers are stored from A7 down to D0.
fn to_memory(ctx: &mut Ctx<'_>, ea: Ea, size: Size, mask: Reg) -> Result<(), GenError> {
    let addr = base(ctx, ea, size)?;
    let v = ctx.scratch()?;
    let hf = ctx.hf;
    let down = matches!(ea, Ea::Apdi(_));
    {
        let mut a = ctx.asm();
        for k in 0..16u8 {
            let i = if down { 15 - k } else { k };
            let p = test_bit(&mut a, mask, k)?;
            if down {
                a.sub(addr, addr, imm(size.bytes()))?;
            }
            a.ldr(v, REGS, DREG_BASE + 4 * i as i32)?;
            match size {
                Size::Long => {
                    bswap32(&mut a, W2, v, hf)?;
                    a.str(W2, MEM, addr)?;
                }
                _ => {
                    bswap16(&mut a, W2, v, hf)?;
                    a.strh(W2, MEM, addr)?;
                }
            }
            if !down {
                a.add(addr, addr, imm(size.bytes()))?;
            }
            skip_to_here(&mut a, p)?;
        }
    }
    if let Ea::Apdi(r) = ea {
        ctx.store_reg(addr, Bank::Addr, r, Width::B32)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use crate::codegen::{generate, GenEnv, RoutineFlags, Variant};
    use crate::guest::table::decode;
    use pretty_assertions::assert_eq;

    #[test]
    fn one_template_serves_every_mask() {
        // MOVEM.L d0-d7/a0-a6,-(a7)
        let r = generate(&decode(0x48E7), Variant::Ff, &GenEnv::default());
        assert!(!r.is_failed());
        assert!(r.flags.contains(RoutineFlags::WIDE));
        let t = r.template().unwrap();
        assert_eq!(t.ext_words, 1);
        let a = t.instantiate(0x48E7, &[0xFFFE], 0).unwrap();
        let b = t.instantiate(0x48E7, &[0x0001], 0).unwrap();
        // Only the mask literal differs.
        let diff: Vec<usize> = (0..a.len()).filter(|&i| a[i] != b[i]).collect();
        assert_eq!(diff.len(), 1);
        assert_eq!(a[diff[0]], 0xFFFE);
    }
}
