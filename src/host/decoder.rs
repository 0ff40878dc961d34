//! A32 decoder for the instruction forms the encoder produces.
//!
//! Operands decode into the encoder's own types, so a decoded word re-encodes to
//! itself. Anything outside that subset decodes to `None`.

use crate::cond::Cond;
use crate::encoder::{DpOp, Extend, MemOp, Offset, Operand, Reg, Shift};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Insn {
    Dp { op: DpOp, s: bool, rd: Reg, rn: Reg, op2: Operand },
    Mem { op: MemOp, rt: Reg, rn: Reg, off: Offset },
    Branch { link: bool, offset: i32 },
    Bx { link: bool, rm: Reg },
    Mrs { rd: Reg },
    /// `fields` is the 4-bit c/x/s/f mask.
    Msr { fields: u8, src: Operand },
    Push { list: u16 },
    Pop { list: u16 },
    Mul { s: bool, rd: Reg, rm: Reg, rs: Reg },
    MulLong { signed: bool, s: bool, lo: Reg, hi: Reg, rm: Reg, rs: Reg },
    Clz { rd: Reg, rm: Reg },
    Rev { rd: Reg, rm: Reg },
    Rev16 { rd: Reg, rm: Reg },
    Revsh { rd: Reg, rm: Reg },
    Extend { kind: Extend, rd: Reg, rm: Reg, ror: u8 },
    /// PKHBT (`top = false`, LSL) or PKHTB (`top = true`, ASR; 0 means 32).
    Pkh { top: bool, rd: Reg, rn: Reg, rm: Reg, shift: u8 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Decoded {
    pub cond: Cond,
    pub insn: Insn,
}

pub trait Decoder {
    fn decode(&self, raw32: u32) -> Option<Decoded>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct A32Decoder;

impl A32Decoder {
    pub fn new() -> Self {
        Self
    }
}

fn reg(w: u32, at: u32) -> Reg {
    Reg::new(((w >> at) & 0xF) as u8)
}

fn imm_shift(kind: u32, n: u8) -> Option<Shift> {
    Some(match (kind, n) {
        (0, 0) => return None,
        (0, n) => Shift::Lsl(n),
        (1, 0) => Shift::Lsr(32),
        (1, n) => Shift::Lsr(n),
        (2, 0) => Shift::Asr(32),
        (2, n) => Shift::Asr(n),
        (_, 0) => Shift::Rrx,
        (_, n) => Shift::Ror(n),
    })
}

fn operand2(w: u32) -> Option<Operand> {
    if w & (1 << 25) != 0 {
        let rot = ((w >> 8) & 0xF) as u8 * 2;
        return Some(Operand::Imm8Ror((w & 0xFF) as u8, rot));
    }
    let rm = reg(w, 0);
    let kind = (w >> 5) & 3;
    if w & 0x10 == 0 {
        let n = ((w >> 7) & 0x1F) as u8;
        return Some(match imm_shift(kind, n) {
            None => Operand::Reg(rm),
            Some(sh) => Operand::Shifted(rm, sh),
        });
    }
    if w & 0x80 != 0 {
        return None;
    }
    let rs = reg(w, 8);
    let sh = match kind {
        0 => Shift::LslReg(rs),
        1 => Shift::LsrReg(rs),
        2 => Shift::AsrReg(rs),
        _ => Shift::RorReg(rs),
    };
    Some(Operand::Shifted(rm, sh))
}

fn extra_transfer(w: u32) -> Option<Insn> {
    // Pre-indexed, no writeback only.
    if w & (1 << 24) == 0 || w & (1 << 21) != 0 {
        return None;
    }
    let load = w & (1 << 20) != 0;
    let op = match ((w >> 5) & 3, load) {
        (1, true) => MemOp::Ldrh,
        (1, false) => MemOp::Strh,
        (2, true) => MemOp::Ldrsb,
        (3, true) => MemOp::Ldrsh,
        _ => return None,
    };
    let up = w & (1 << 23) != 0;
    let off = if w & (1 << 22) != 0 {
        let mag = ((w >> 4) & 0xF0 | w & 0xF) as i32;
        Offset::Imm(if up { mag } else { -mag })
    } else if up {
        Offset::Reg(reg(w, 0))
    } else {
        Offset::NegReg(reg(w, 0))
    };
    Some(Insn::Mem { op, rt: reg(w, 12), rn: reg(w, 16), off })
}

fn single_transfer(w: u32) -> Option<Insn> {
    if w & (1 << 24) == 0 || w & (1 << 21) != 0 {
        return None;
    }
    let op = match (w & (1 << 22) != 0, w & (1 << 20) != 0) {
        (false, true) => MemOp::Ldr,
        (false, false) => MemOp::Str,
        (true, true) => MemOp::Ldrb,
        (true, false) => MemOp::Strb,
    };
    let up = w & (1 << 23) != 0;
    let off = if w & (1 << 25) == 0 {
        let mag = (w & 0xFFF) as i32;
        Offset::Imm(if up { mag } else { -mag })
    } else {
        if w & 0x10 != 0 {
            return None;
        }
        let rm = reg(w, 0);
        match imm_shift((w >> 5) & 3, ((w >> 7) & 0x1F) as u8) {
            None if up => Offset::Reg(rm),
            None => Offset::NegReg(rm),
            Some(shift) => Offset::Shifted { rm, shift, subtract: !up },
        }
    };
    Some(Insn::Mem { op, rt: reg(w, 12), rn: reg(w, 16), off })
}

fn media(w: u32) -> Option<Insn> {
    let (rd, rm) = (reg(w, 12), reg(w, 0));
    match w & 0x0FFF_0FF0 {
        0x06BF_0F30 => return Some(Insn::Rev { rd, rm }),
        0x06BF_0FB0 => return Some(Insn::Rev16 { rd, rm }),
        0x06FF_0FB0 => return Some(Insn::Revsh { rd, rm }),
        _ => {}
    }
    if w & 0x0F8F_03F0 == 0x068F_0070 {
        let kind = match (w >> 20) & 0xFF {
            0x6A => Extend::Sxtb,
            0x6B => Extend::Sxth,
            0x6E => Extend::Uxtb,
            0x6F => Extend::Uxth,
            _ => return None,
        };
        let ror = ((w >> 10) & 3) as u8 * 8;
        return Some(Insn::Extend { kind, rd, rm, ror });
    }
    if w & 0x0FF0_0030 == 0x0680_0010 {
        return Some(Insn::Pkh {
            top: w & 0x40 != 0,
            rd,
            rn: reg(w, 16),
            rm,
            shift: ((w >> 7) & 0x1F) as u8,
        });
    }
    None
}

fn misc(w: u32) -> Option<Insn> {
    if w & 0x0FFF_0FFF == 0x010F_0000 {
        return Some(Insn::Mrs { rd: reg(w, 12) });
    }
    if w & 0x0FB0_FFF0 == 0x0120_F000 {
        let fields = ((w >> 16) & 0xF) as u8;
        return Some(Insn::Msr { fields, src: Operand::Reg(reg(w, 0)) });
    }
    if w & 0x0FB0_F000 == 0x0320_F000 {
        let fields = ((w >> 16) & 0xF) as u8;
        let rot = ((w >> 8) & 0xF) as u8 * 2;
        return Some(Insn::Msr { fields, src: Operand::Imm8Ror((w & 0xFF) as u8, rot) });
    }
    if w & 0x0FFF_FFD0 == 0x012F_FF10 {
        return Some(Insn::Bx { link: w & 0x20 != 0, rm: reg(w, 0) });
    }
    if w & 0x0FFF_0FF0 == 0x016F_0F10 {
        return Some(Insn::Clz { rd: reg(w, 12), rm: reg(w, 0) });
    }
    None
}

fn multiply(w: u32) -> Option<Insn> {
    let s = w & (1 << 20) != 0;
    let (rm, rs) = (reg(w, 0), reg(w, 8));
    match w & 0x0FE0_00F0 {
        0x0000_0090 => Some(Insn::Mul { s, rd: reg(w, 16), rm, rs }),
        0x0080_0090 | 0x00C0_0090 => Some(Insn::MulLong {
            signed: w & (1 << 22) != 0,
            s,
            lo: reg(w, 12),
            hi: reg(w, 16),
            rm,
            rs,
        }),
        _ => None,
    }
}

impl Decoder for A32Decoder {
    fn decode(&self, w: u32) -> Option<Decoded> {
        let cond = Cond::from_index((w >> 28) as u8);
        if cond == Cond::Nv {
            return None;
        }
        let insn = match (w >> 25) & 7 {
            0b101 => {
                let offset = ((w << 8) as i32) >> 8;
                Insn::Branch { link: w & (1 << 24) != 0, offset }
            }
            0b100 => match w & 0x0FFF_0000 {
                0x092D_0000 => Insn::Push { list: w as u16 },
                0x08BD_0000 => Insn::Pop { list: w as u16 },
                _ => return None,
            },
            0b010 => single_transfer(w)?,
            0b011 if w & 0x10 != 0 => media(w)?,
            0b011 => single_transfer(w)?,
            0b000 if w & 0x90 == 0x90 && w & 0x60 == 0 => multiply(w)?,
            0b000 if w & 0x90 == 0x90 => extra_transfer(w)?,
            0b000 | 0b001 => {
                let op = DpOp::from_bits(w >> 21);
                let s = w & (1 << 20) != 0;
                if op.is_compare() && !s {
                    misc(w)?
                } else {
                    Insn::Dp { op, s, rd: reg(w, 12), rn: reg(w, 16), op2: operand2(w)? }
                }
            }
            _ => return None,
        };
        Some(Decoded { cond, insn })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(w: u32) -> Insn {
        A32Decoder.decode(w).unwrap().insn
    }

    #[test]
    fn decodes_common_forms() {
        assert_eq!(
            d(0xe093_3002),
            Insn::Dp { op: DpOp::Add, s: true, rd: Reg::R3, rn: Reg::R3, op2: Operand::Reg(Reg::R2) }
        );
        assert_eq!(
            d(0xe1cb_41bc),
            Insn::Mem { op: MemOp::Strh, rt: Reg::R4, rn: Reg::R11, off: Offset::Imm(28) }
        );
        assert_eq!(d(0xe328_f101), Insn::Msr { fields: 8, src: Operand::Imm8Ror(1, 2) });
        assert_eq!(d(0xe10f_2000), Insn::Mrs { rd: Reg::R2 });
        assert_eq!(
            d(0xe1b0_3062),
            Insn::Dp {
                op: DpOp::Mov,
                s: true,
                rd: Reg::R3,
                rn: Reg::R0,
                op2: Operand::Shifted(Reg::R2, Shift::Rrx)
            }
        );
        assert_eq!(d(0xe085_4796), Insn::MulLong {
            signed: false,
            s: false,
            lo: Reg::R4,
            hi: Reg::R5,
            rm: Reg::R6,
            rs: Reg::R7
        });
        assert_eq!(d(0xe6af_4475), Insn::Extend { kind: Extend::Sxtb, rd: Reg::R4, rm: Reg::R5, ror: 8 });
        assert_eq!(d(0xe684_4853), Insn::Pkh { top: true, rd: Reg::R4, rn: Reg::R4, rm: Reg::R3, shift: 16 });
        assert_eq!(d(0x1a00_0002), Insn::Branch { link: false, offset: 2 });
    }

    #[test]
    fn unsupported_words_are_rejected() {
        assert_eq!(A32Decoder.decode(0xf57f_f01f), None); // clrex
        assert_eq!(A32Decoder.decode(0xe8b0_0003), None); // ldm r0!, {r0, r1}
    }
}
