use super::cpu::{Cpu, Cpsr, Trap};
use super::decoder::{Decoded, Insn};
use super::memory::Bus;
use crate::cond::Cond;
use crate::encoder::{DpOp, Extend, MemOp, Offset, Operand, Reg, Shift};
use num_traits::AsPrimitive;

pub trait Executor {
    fn exec<B: Bus>(&self, cpu: &mut Cpu, bus: &mut B, d: Decoded) -> Result<(), Trap>;
}

/// Reference A32 semantics, including shifter carry-out.
pub struct IntExecutor;

pub fn condition_holds(c: Cond, f: Cpsr) -> bool {
    let (n, z, cf, v) = (
        f.contains(Cpsr::N),
        f.contains(Cpsr::Z),
        f.contains(Cpsr::C),
        f.contains(Cpsr::V),
    );
    match c {
        Cond::Eq => z,
        Cond::Ne => !z,
        Cond::Cs => cf,
        Cond::Cc => !cf,
        Cond::Mi => n,
        Cond::Pl => !n,
        Cond::Vs => v,
        Cond::Vc => !v,
        Cond::Hi => cf && !z,
        Cond::Ls => !cf || z,
        Cond::Ge => n == v,
        Cond::Lt => n != v,
        Cond::Gt => !z && n == v,
        Cond::Le => z || n != v,
        Cond::Al => true,
        Cond::Nv => false,
    }
}

/// Shift `v` by an immediate amount as encoded (`Lsr(32)`, `Asr(32)` and `Rrx` are the
/// zero-amount encodings).
fn shift_imm(v: u32, sh: Shift, c: bool) -> (u32, bool) {
    let bit = |n: u32| (v >> n) & 1 != 0;
    match sh {
        Shift::Lsl(0) => (v, c),
        Shift::Lsl(n) => (v << n, bit(32 - n as u32)),
        Shift::Lsr(32) => (0, bit(31)),
        Shift::Lsr(n) => (v >> n, bit(n as u32 - 1)),
        Shift::Asr(32) => (((v as i32) >> 31) as u32, bit(31)),
        Shift::Asr(n) => (((v as i32) >> n) as u32, bit(n as u32 - 1)),
        Shift::Ror(n) => (v.rotate_right(n as u32), bit(n as u32 - 1)),
        Shift::Rrx => ((c as u32) << 31 | v >> 1, bit(0)),
        _ => (v, c),
    }
}

/// Shift by the bottom byte of a register.
fn shift_reg(v: u32, sh: Shift, amount: u32, c: bool) -> (u32, bool) {
    let n = amount & 0xFF;
    if n == 0 {
        return (v, c);
    }
    let bit = |k: u32| (v >> k) & 1 != 0;
    match sh {
        Shift::LslReg(_) => match n {
            1..=31 => (v << n, bit(32 - n)),
            32 => (0, bit(0)),
            _ => (0, false),
        },
        Shift::LsrReg(_) => match n {
            1..=31 => (v >> n, bit(n - 1)),
            32 => (0, bit(31)),
            _ => (0, false),
        },
        Shift::AsrReg(_) => match n {
            1..=31 => (((v as i32) >> n) as u32, bit(n - 1)),
            _ => (((v as i32) >> 31) as u32, bit(31)),
        },
        Shift::RorReg(_) => match n & 31 {
            0 => (v, bit(31)),
            k => (v.rotate_right(k), bit(k - 1)),
        },
        _ => (v, c),
    }
}

/// Value and shifter carry-out of a data-processing operand.
fn operand(cpu: &Cpu, op2: Operand) -> (u32, bool) {
    let c = cpu.cpsr.contains(Cpsr::C);
    match op2 {
        Operand::Reg(rm) => (cpu.reg(rm), c),
        Operand::Imm(v) => (v, c),
        Operand::Imm8Ror(base, 0) => (base as u32, c),
        Operand::Imm8Ror(base, rot) => {
            let v = (base as u32).rotate_right(rot as u32);
            (v, v >> 31 != 0)
        }
        Operand::Shifted(rm, sh) => {
            let v = cpu.reg(rm);
            match sh {
                Shift::LslReg(rs) | Shift::LsrReg(rs) | Shift::AsrReg(rs) | Shift::RorReg(rs) => {
                    shift_reg(v, sh, cpu.reg(rs), c)
                }
                _ => shift_imm(v, sh, c),
            }
        }
    }
}

/// `x + y + carry` with carry-out and signed overflow.
pub fn add_with_carry(x: u32, y: u32, carry: bool) -> (u32, bool, bool) {
    let unsigned = x as u64 + y as u64 + carry as u64;
    let signed = x as i32 as i64 + y as i32 as i64 + carry as i64;
    let r = unsigned as u32;
    (r, unsigned >> 32 != 0, r as i32 as i64 != signed)
}

fn set_nz(cpu: &mut Cpu, r: u32) {
    cpu.cpsr.set(Cpsr::N, (r as i32) < 0);
    cpu.cpsr.set(Cpsr::Z, r == 0);
}

fn data_processing(cpu: &mut Cpu, op: DpOp, s: bool, rd: Reg, rn: Reg, op2: Operand) {
    let (b, shifter_c) = operand(cpu, op2);
    let a = cpu.reg(rn);
    let c = cpu.cpsr.contains(Cpsr::C);
    let (r, arith) = match op {
        DpOp::And | DpOp::Tst => (a & b, None),
        DpOp::Eor | DpOp::Teq => (a ^ b, None),
        DpOp::Orr => (a | b, None),
        DpOp::Bic => (a & !b, None),
        DpOp::Mov => (b, None),
        DpOp::Mvn => (!b, None),
        DpOp::Add | DpOp::Cmn => {
            let (r, c, v) = add_with_carry(a, b, false);
            (r, Some((c, v)))
        }
        DpOp::Sub | DpOp::Cmp => {
            let (r, c, v) = add_with_carry(a, !b, true);
            (r, Some((c, v)))
        }
        DpOp::Rsb => {
            let (r, c, v) = add_with_carry(b, !a, true);
            (r, Some((c, v)))
        }
        DpOp::Adc => {
            let (r, c, v) = add_with_carry(a, b, c);
            (r, Some((c, v)))
        }
        DpOp::Sbc => {
            let (r, c, v) = add_with_carry(a, !b, c);
            (r, Some((c, v)))
        }
        DpOp::Rsc => {
            let (r, c, v) = add_with_carry(b, !a, c);
            (r, Some((c, v)))
        }
    };
    if !op.is_compare() {
        cpu.set_reg(rd, r);
    }
    if s || op.is_compare() {
        set_nz(cpu, r);
        match arith {
            Some((c, v)) => {
                cpu.cpsr.set(Cpsr::C, c);
                cpu.cpsr.set(Cpsr::V, v);
            }
            None => cpu.cpsr.set(Cpsr::C, shifter_c),
        }
    }
}

fn transfer<B: Bus>(cpu: &mut Cpu, bus: &mut B, op: MemOp, rt: Reg, rn: Reg, off: Offset) -> Result<(), Trap> {
    let c = cpu.cpsr.contains(Cpsr::C);
    let delta = match off {
        Offset::Imm(i) => i as u32,
        Offset::Reg(rm) => cpu.reg(rm),
        Offset::NegReg(rm) => cpu.reg(rm).wrapping_neg(),
        Offset::Shifted { rm, shift, subtract } => {
            let v = shift_imm(cpu.reg(rm), shift, c).0;
            if subtract {
                v.wrapping_neg()
            } else {
                v
            }
        }
    };
    let addr = cpu.reg(rn).wrapping_add(delta);
    let bus_err = |source| Trap::Bus { addr, source };
    match op {
        MemOp::Ldr => {
            let v = bus.read_u32(addr).map_err(bus_err)?;
            cpu.set_reg(rt, v);
        }
        MemOp::Ldrb => {
            let v = bus.read_u8(addr).map_err(bus_err)?;
            cpu.set_reg(rt, v as u32);
        }
        MemOp::Ldrh => {
            let v = bus.read_u16(addr).map_err(bus_err)?;
            cpu.set_reg(rt, v as u32);
        }
        MemOp::Ldrsb => {
            let v = bus.read_u8(addr).map_err(bus_err)?;
            cpu.set_reg(rt, sext(v as i8));
        }
        MemOp::Ldrsh => {
            let v = bus.read_u16(addr).map_err(bus_err)?;
            cpu.set_reg(rt, sext(v as i16));
        }
        MemOp::Str => bus.write_u32(addr, cpu.reg(rt)).map_err(bus_err)?,
        MemOp::Strb => bus.write_u8(addr, cpu.reg(rt) as u8).map_err(bus_err)?,
        MemOp::Strh => bus.write_u16(addr, cpu.reg(rt) as u16).map_err(bus_err)?,
    }
    Ok(())
}

/// Sign-extend a narrow signed value to a register word.
#[inline]
pub fn sext<T: AsPrimitive<i32>>(v: T) -> u32 {
    v.as_() as u32
}

fn extend(kind: Extend, v: u32, ror: u8) -> u32 {
    let v = v.rotate_right(ror as u32);
    match kind {
        Extend::Sxtb => sext(v as u8 as i8),
        Extend::Sxth => sext(v as u16 as i16),
        Extend::Uxtb => v & 0xFF,
        Extend::Uxth => v & 0xFFFF,
    }
}

impl Executor for IntExecutor {
    fn exec<B: Bus>(&self, cpu: &mut Cpu, bus: &mut B, d: Decoded) -> Result<(), Trap> {
        if !condition_holds(d.cond, cpu.cpsr) {
            return Ok(());
        }
        match d.insn {
            Insn::Dp { op, s, rd, rn, op2 } => data_processing(cpu, op, s, rd, rn, op2),
            Insn::Mem { op, rt, rn, off } => transfer(cpu, bus, op, rt, rn, off)?,
            Insn::Branch { link, offset } => {
                // cpu.pc already points past this instruction.
                let target = cpu.pc.wrapping_add(4).wrapping_add((offset as u32) << 2);
                if link {
                    cpu.r[14] = cpu.pc;
                }
                cpu.pc = target;
            }
            Insn::Bx { link, rm } => {
                let target = cpu.reg(rm) & !1;
                if link {
                    cpu.r[14] = cpu.pc;
                }
                cpu.pc = target;
            }
            Insn::Mrs { rd } => cpu.set_reg(rd, cpu.cpsr.bits()),
            Insn::Msr { fields, src } => {
                let v = operand(cpu, src).0;
                if fields & 0x8 != 0 {
                    cpu.cpsr = Cpsr::from_bits_truncate(v);
                }
            }
            Insn::Push { list } => {
                let count = list.count_ones();
                let mut addr = cpu.r[13].wrapping_sub(4 * count);
                cpu.r[13] = addr;
                for i in (0..16).filter(|i| list & (1 << i) != 0) {
                    let v = cpu.reg(Reg::new(i as u8));
                    bus.write_u32(addr, v).map_err(|source| Trap::Bus { addr, source })?;
                    addr = addr.wrapping_add(4);
                }
            }
            Insn::Pop { list } => {
                let mut addr = cpu.r[13];
                for i in (0..16).filter(|i| list & (1 << i) != 0) {
                    let v = bus.read_u32(addr).map_err(|source| Trap::Bus { addr, source })?;
                    cpu.set_reg(Reg::new(i as u8), v);
                    addr = addr.wrapping_add(4);
                }
                if list & (1 << 13) == 0 {
                    cpu.r[13] = addr;
                }
            }
            Insn::Mul { s, rd, rm, rs } => {
                let r = cpu.reg(rm).wrapping_mul(cpu.reg(rs));
                cpu.set_reg(rd, r);
                if s {
                    set_nz(cpu, r);
                }
            }
            Insn::MulLong { signed, s, lo, hi, rm, rs } => {
                let (a, b) = (cpu.reg(rm), cpu.reg(rs));
                let r = if signed {
                    (a as i32 as i64).wrapping_mul(b as i32 as i64) as u64
                } else {
                    a as u64 * b as u64
                };
                cpu.set_reg(lo, r as u32);
                cpu.set_reg(hi, (r >> 32) as u32);
                if s {
                    cpu.cpsr.set(Cpsr::N, (r as i64) < 0);
                    cpu.cpsr.set(Cpsr::Z, r == 0);
                }
            }
            Insn::Clz { rd, rm } => cpu.set_reg(rd, cpu.reg(rm).leading_zeros()),
            Insn::Rev { rd, rm } => cpu.set_reg(rd, cpu.reg(rm).swap_bytes()),
            Insn::Rev16 { rd, rm } => {
                let v = cpu.reg(rm);
                cpu.set_reg(rd, (v & 0xFF00_FF00) >> 8 | (v & 0x00FF_00FF) << 8);
            }
            Insn::Revsh { rd, rm } => {
                let v = (cpu.reg(rm) as u16).swap_bytes();
                cpu.set_reg(rd, sext(v as i16));
            }
            Insn::Extend { kind, rd, rm, ror } => cpu.set_reg(rd, extend(kind, cpu.reg(rm), ror)),
            Insn::Pkh { top, rd, rn, rm, shift } => {
                let (n, m) = (cpu.reg(rn), cpu.reg(rm));
                let r = if top {
                    let low = if shift == 0 { (m as i32 >> 31) as u32 } else { (m as i32 >> shift) as u32 };
                    n & 0xFFFF_0000 | low & 0xFFFF
                } else {
                    n & 0xFFFF | (m << shift) & 0xFFFF_0000
                };
                cpu.set_reg(rd, r);
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn add_with_carry_flags() {
        assert_eq!(add_with_carry(0xFFFF_FFFF, 1, false), (0, true, false));
        assert_eq!(add_with_carry(0x7FFF_FFFF, 1, false), (0x8000_0000, false, true));
        // 5 - 7 as 5 + !7 + 1: borrow, so C clear
        assert_eq!(add_with_carry(5, !7, true), (0xFFFF_FFFE, false, false));
    }

    #[test]
    fn register_shift_carry_edges() {
        assert_eq!(shift_reg(0x8000_0001, Shift::LslReg(Reg::R0), 32, false), (0, true));
        assert_eq!(shift_reg(0x8000_0001, Shift::LsrReg(Reg::R0), 33, true), (0, false));
        assert_eq!(shift_reg(0x8000_0000, Shift::AsrReg(Reg::R0), 40, false), (0xFFFF_FFFF, true));
        assert_eq!(shift_reg(0x8000_0000, Shift::RorReg(Reg::R0), 32, false), (0x8000_0000, true));
        assert_eq!(shift_reg(5, Shift::RorReg(Reg::R0), 0, true), (5, true));
    }
}
