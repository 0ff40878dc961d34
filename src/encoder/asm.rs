//! Appending facade over the word builders.
//!
//! Every method appends exactly one word to the underlying [`CodeBuffer`]. The
//! condition travels with the `Assembler` value: `asm.cond(Cond::Ne).mov(..)` emits a
//! conditional move without touching the condition of `asm` itself.

use super::arm::{self, DpOp, Extend, MemOp, Offset, Operand, PsrFields};
use super::{imm, CodeBuffer, EncodeError, Reg};
use crate::cond::Cond;

type Result<T> = std::result::Result<T, EncodeError>;

pub struct Assembler<'b> {
    buf: &'b mut CodeBuffer,
    cond: Cond,
}

macro_rules! dp3 {
    ($($name:ident, $names:ident => $op:ident;)*) => {
        $(
            pub fn $name(&mut self, rd: Reg, rn: Reg, op2: impl Into<Operand>) -> Result<()> {
                self.dp(DpOp::$op, false, rd, rn, op2.into())
            }
            pub fn $names(&mut self, rd: Reg, rn: Reg, op2: impl Into<Operand>) -> Result<()> {
                self.dp(DpOp::$op, true, rd, rn, op2.into())
            }
        )*
    };
}

macro_rules! mem_ops {
    ($($name:ident => $op:ident;)*) => {
        $(
            pub fn $name(&mut self, rt: Reg, rn: Reg, off: impl Into<Offset>) -> Result<()> {
                let w = arm::mem(self.cond, MemOp::$op, rt, rn, off.into())?;
                self.emit(w)
            }
        )*
    };
}

impl<'b> Assembler<'b> {
    pub fn new(buf: &'b mut CodeBuffer) -> Self {
        Self { buf, cond: Cond::Al }
    }

    /// A view of the same buffer emitting under condition `c`.
    pub fn cond(&mut self, c: Cond) -> Assembler<'_> {
        Assembler { buf: &mut *self.buf, cond: c }
    }

    #[inline]
    pub fn condition(&self) -> Cond {
        self.cond
    }

    /// Index of the next emitted word.
    #[inline]
    pub fn pos(&self) -> usize {
        self.buf.offset()
    }

    #[inline]
    pub fn emit(&mut self, word: u32) -> Result<()> {
        self.buf.emit(word)
    }

    pub fn patch(&mut self, index: usize, word: u32) -> Result<()> {
        self.buf.patch(index, word)
    }

    pub fn buffer(&self) -> &CodeBuffer {
        self.buf
    }

    pub fn dp(&mut self, op: DpOp, s: bool, rd: Reg, rn: Reg, op2: Operand) -> Result<()> {
        let w = arm::dp(self.cond, op, s, rd, rn, op2)?;
        self.emit(w)
    }

    dp3! {
        and, ands => And;
        eor, eors => Eor;
        sub, subs => Sub;
        rsb, rsbs => Rsb;
        add, adds => Add;
        adc, adcs => Adc;
        sbc, sbcs => Sbc;
        rsc, rscs => Rsc;
        orr, orrs => Orr;
        bic, bics => Bic;
    }

    pub fn mov(&mut self, rd: Reg, op2: impl Into<Operand>) -> Result<()> {
        self.dp(DpOp::Mov, false, rd, Reg::R0, op2.into())
    }

    pub fn movs(&mut self, rd: Reg, op2: impl Into<Operand>) -> Result<()> {
        self.dp(DpOp::Mov, true, rd, Reg::R0, op2.into())
    }

    pub fn mvn(&mut self, rd: Reg, op2: impl Into<Operand>) -> Result<()> {
        self.dp(DpOp::Mvn, false, rd, Reg::R0, op2.into())
    }

    pub fn mvns(&mut self, rd: Reg, op2: impl Into<Operand>) -> Result<()> {
        self.dp(DpOp::Mvn, true, rd, Reg::R0, op2.into())
    }

    pub fn cmp(&mut self, rn: Reg, op2: impl Into<Operand>) -> Result<()> {
        self.dp(DpOp::Cmp, true, Reg::R0, rn, op2.into())
    }

    pub fn cmn(&mut self, rn: Reg, op2: impl Into<Operand>) -> Result<()> {
        self.dp(DpOp::Cmn, true, Reg::R0, rn, op2.into())
    }

    pub fn tst(&mut self, rn: Reg, op2: impl Into<Operand>) -> Result<()> {
        self.dp(DpOp::Tst, true, Reg::R0, rn, op2.into())
    }

    pub fn teq(&mut self, rn: Reg, op2: impl Into<Operand>) -> Result<()> {
        self.dp(DpOp::Teq, true, Reg::R0, rn, op2.into())
    }

    // Shift aliases (MOV with a shifted operand).

    pub fn lsl(&mut self, rd: Reg, rm: Reg, n: u8) -> Result<()> {
        self.mov(rd, rm.lsl(n))
    }

    pub fn lsls(&mut self, rd: Reg, rm: Reg, n: u8) -> Result<()> {
        self.movs(rd, rm.lsl(n))
    }

    pub fn lsr(&mut self, rd: Reg, rm: Reg, n: u8) -> Result<()> {
        self.mov(rd, rm.lsr(n))
    }

    pub fn lsrs(&mut self, rd: Reg, rm: Reg, n: u8) -> Result<()> {
        self.movs(rd, rm.lsr(n))
    }

    pub fn asr(&mut self, rd: Reg, rm: Reg, n: u8) -> Result<()> {
        self.mov(rd, rm.asr(n))
    }

    pub fn asrs(&mut self, rd: Reg, rm: Reg, n: u8) -> Result<()> {
        self.movs(rd, rm.asr(n))
    }

    pub fn ror(&mut self, rd: Reg, rm: Reg, n: u8) -> Result<()> {
        self.mov(rd, rm.ror(n))
    }

    pub fn rors(&mut self, rd: Reg, rm: Reg, n: u8) -> Result<()> {
        self.movs(rd, rm.ror(n))
    }

    mem_ops! {
        ldr => Ldr;
        str => Str;
        ldrb => Ldrb;
        strb => Strb;
        ldrh => Ldrh;
        strh => Strh;
        ldrsb => Ldrsb;
        ldrsh => Ldrsh;
    }

    /// Branch by `offset` words past PC+8. `b(0)` skips the next instruction.
    pub fn b(&mut self, offset: i32) -> Result<()> {
        let w = arm::b(self.cond, offset)?;
        self.emit(w)
    }

    pub fn bl(&mut self, offset: i32) -> Result<()> {
        let w = arm::bl(self.cond, offset)?;
        self.emit(w)
    }

    pub fn bx(&mut self, rm: Reg) -> Result<()> {
        let w = arm::bx(self.cond, rm);
        self.emit(w)
    }

    pub fn blx(&mut self, rm: Reg) -> Result<()> {
        let w = arm::blx(self.cond, rm);
        self.emit(w)
    }

    pub fn mrs(&mut self, rd: Reg) -> Result<()> {
        let w = arm::mrs(self.cond, rd, false);
        self.emit(w)
    }

    /// Write the NZCV flags only.
    pub fn msr_flags(&mut self, src: impl Into<Operand>) -> Result<()> {
        let w = arm::msr(self.cond, PsrFields::F, src.into())?;
        self.emit(w)
    }

    pub fn msr(&mut self, fields: PsrFields, src: impl Into<Operand>) -> Result<()> {
        let w = arm::msr(self.cond, fields, src.into())?;
        self.emit(w)
    }

    pub fn push(&mut self, list: u16) -> Result<()> {
        let w = arm::push(self.cond, list);
        self.emit(w)
    }

    pub fn pop(&mut self, list: u16) -> Result<()> {
        let w = arm::pop(self.cond, list);
        self.emit(w)
    }

    pub fn mul(&mut self, rd: Reg, rm: Reg, rs: Reg) -> Result<()> {
        let w = arm::mul(self.cond, false, rd, rm, rs);
        self.emit(w)
    }

    pub fn muls(&mut self, rd: Reg, rm: Reg, rs: Reg) -> Result<()> {
        let w = arm::mul(self.cond, true, rd, rm, rs);
        self.emit(w)
    }

    pub fn smull(&mut self, lo: Reg, hi: Reg, rm: Reg, rs: Reg) -> Result<()> {
        let w = arm::smull(self.cond, false, lo, hi, rm, rs);
        self.emit(w)
    }

    pub fn umull(&mut self, lo: Reg, hi: Reg, rm: Reg, rs: Reg) -> Result<()> {
        let w = arm::umull(self.cond, false, lo, hi, rm, rs);
        self.emit(w)
    }

    pub fn clz(&mut self, rd: Reg, rm: Reg) -> Result<()> {
        let w = arm::clz(self.cond, rd, rm);
        self.emit(w)
    }

    pub fn rev(&mut self, rd: Reg, rm: Reg) -> Result<()> {
        let w = arm::rev(self.cond, rd, rm);
        self.emit(w)
    }

    pub fn rev16(&mut self, rd: Reg, rm: Reg) -> Result<()> {
        let w = arm::rev16(self.cond, rd, rm);
        self.emit(w)
    }

    pub fn revsh(&mut self, rd: Reg, rm: Reg) -> Result<()> {
        let w = arm::revsh(self.cond, rd, rm);
        self.emit(w)
    }

    pub fn extend(&mut self, kind: Extend, rd: Reg, rm: Reg, ror: u8) -> Result<()> {
        let w = arm::extend(self.cond, kind, rd, rm, ror)?;
        self.emit(w)
    }

    pub fn sxtb(&mut self, rd: Reg, rm: Reg) -> Result<()> {
        self.extend(Extend::Sxtb, rd, rm, 0)
    }

    pub fn sxth(&mut self, rd: Reg, rm: Reg) -> Result<()> {
        self.extend(Extend::Sxth, rd, rm, 0)
    }

    pub fn uxtb(&mut self, rd: Reg, rm: Reg) -> Result<()> {
        self.extend(Extend::Uxtb, rd, rm, 0)
    }

    pub fn uxth(&mut self, rd: Reg, rm: Reg) -> Result<()> {
        self.extend(Extend::Uxth, rd, rm, 0)
    }

    pub fn pkhbt(&mut self, rd: Reg, rn: Reg, rm: Reg, lsl: u8) -> Result<()> {
        let w = arm::pkhbt(self.cond, rd, rn, rm, lsl)?;
        self.emit(w)
    }

    pub fn pkhtb(&mut self, rd: Reg, rn: Reg, rm: Reg, asr: u8) -> Result<()> {
        let w = arm::pkhtb(self.cond, rd, rn, rm, asr)?;
        self.emit(w)
    }

    pub fn nop(&mut self) -> Result<()> {
        self.emit(arm::NOP)
    }

    /// `LDR rd, [pc, #0]; B +0; .word value`. Returns the index of the literal slot.
    ///
    /// PC reads as the load's address plus 8, which is exactly the slot; the branch
    /// steps over it. The slot stays patchable, which is how translation-time values
    /// (extension words, guest addresses) reach the code.
    pub fn load_literal(&mut self, rd: Reg, value: u32) -> Result<usize> {
        self.ldr(rd, Reg::PC, 0)?;
        self.b(0)?;
        let slot = self.pos();
        self.emit(value)?;
        Ok(slot)
    }

    /// Materialise `value` in `rd` with the shortest available form.
    pub fn load_const(&mut self, rd: Reg, value: u32) -> Result<()> {
        if imm::is_encodable(value) {
            self.mov(rd, Operand::Imm(value))
        } else if imm::is_encodable(!value) {
            self.mvn(rd, Operand::Imm(!value))
        } else {
            self.load_literal(rd, value).map(|_| ())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encoder::imm;

    #[test]
    fn load_const_prefers_short_forms() {
        let mut buf = CodeBuffer::new(16);
        let mut a = Assembler::new(&mut buf);
        a.load_const(Reg::R4, 0xff00).unwrap();
        a.load_const(Reg::R4, 0xffff_fffe).unwrap();
        a.load_const(Reg::R4, 0x1234_5678).unwrap();
        assert_eq!(
            buf.as_slice(),
            &[0xe3a0_4cff, 0xe3e0_4001, 0xe59f_4000, 0xea00_0000, 0x1234_5678]
        );
    }

    #[test]
    fn conditional_view_does_not_leak() {
        let mut buf = CodeBuffer::new(8);
        let mut a = Assembler::new(&mut buf);
        a.cond(Cond::Cs).mov(Reg::R4, imm(1)).unwrap();
        a.mov(Reg::R4, imm(1)).unwrap();
        assert_eq!(a.condition(), Cond::Al);
        assert_eq!(buf.as_slice(), &[0x23a0_4001, 0xe3a0_4001]);
    }
}
