//! Decoder for the full 16-bit 68k opcode space.

use super::Mnemonic::{self, *};
use super::{Ea, OpcodeEntry, RegRef, Size};

/// Number of opcode values.
pub const OPCODES: usize = 0x1_0000;

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum TableError {
    #[error("decode table has {0} entries, expected 65536")]
    Length(usize),
    #[error("entry {index:#06x} is inconsistent: {reason}")]
    Inconsistent { index: usize, reason: &'static str },
}

/// The decode table, indexed by opcode.
#[derive(Debug, Clone)]
pub struct DecodeTable {
    entries: Vec<OpcodeEntry>,
}

impl DecodeTable {
    pub fn build() -> Self {
        let entries = (0..OPCODES).map(|op| decode(op as u16)).collect();
        Self { entries }
    }

    /// Wrap externally supplied rows. Nothing is checked until [`DecodeTable::validate`].
    pub fn from_entries(entries: Vec<OpcodeEntry>) -> Self {
        Self { entries }
    }

    #[inline]
    pub fn get(&self, opcode: u16) -> Option<&OpcodeEntry> {
        self.entries.get(opcode as usize)
    }

    pub fn entries(&self) -> &[OpcodeEntry] {
        &self.entries
    }

    pub fn entries_mut(&mut self) -> &mut [OpcodeEntry] {
        &mut self.entries
    }

    pub fn iter(&self) -> impl Iterator<Item = &OpcodeEntry> {
        self.entries.iter()
    }

    pub fn validate(&self) -> Result<(), TableError> {
        if self.entries.len() != OPCODES {
            return Err(TableError::Length(self.entries.len()));
        }
        for (index, e) in self.entries.iter().enumerate() {
            let bad = |reason| Err(TableError::Inconsistent { index, reason });
            if e.opcode as usize != index {
                return bad("opcode does not match its index");
            }
            if e.cc > 15 {
                return bad("condition field out of range");
            }
            if e.clev > 4 {
                return bad("unknown cpu level");
            }
            if e.is_illegal() && (e.src.is_some() || e.dst.is_some()) {
                return bad("illegal entry carries operands");
            }
            for ea in [e.src, e.dst].into_iter().flatten() {
                let Some(r) = ea.reg() else { continue };
                if r.n > 7 {
                    return bad("register number out of range");
                }
                if r.is_field() && (r.field > 13 || RegRef::at(e.opcode, r.field).n != r.n) {
                    return bad("register field disagrees with opcode bits");
                }
            }
        }
        Ok(())
    }
}

/// Decode one opcode. Unassigned encodings come back as [`Mnemonic::Illegal`].
pub fn decode(op: u16) -> OpcodeEntry {
    let e = match op >> 12 {
        0x0 => line0(op),
        0x1..=0x3 => moves(op),
        0x4 => line4(op),
        0x5 => line5(op),
        0x6 => branch(op),
        0x7 => moveq(op),
        0x8 => line8(op),
        0x9 | 0xD => addsub(op),
        0xB => line_b(op),
        0xC => line_c(op),
        0xE => line_e(op),
        0xF => line_f(op),
        _ => None,
    };
    e.unwrap_or(OpcodeEntry::illegal(op))
}

struct B(OpcodeEntry);

impl B {
    fn new(op: u16, m: Mnemonic) -> B {
        B(OpcodeEntry { mnemonic: m, ..OpcodeEntry::illegal(op) })
    }
    fn size(mut self, s: Size) -> B {
        self.0.size = Some(s);
        self
    }
    fn src(mut self, e: Ea) -> B {
        self.0.src = Some(e);
        self
    }
    fn dst(mut self, e: Ea) -> B {
        self.0.dst = Some(e);
        self
    }
    fn cc(mut self, cc: u16) -> B {
        self.0.cc = (cc & 15) as u8;
        self
    }
    fn clev(mut self, l: u8) -> B {
        self.0.clev = l;
        self
    }
    fn privileged(mut self) -> B {
        self.0.privileged = true;
        self
    }
    fn lead(mut self, n: u8) -> B {
        self.0.lead_words = n;
        self
    }
    fn done(self) -> Option<OpcodeEntry> {
        Some(self.0)
    }
}

#[inline]
fn ea(op: u16) -> Option<Ea> {
    Ea::from_mode(op, 3, 0)
}

#[inline]
fn dreg(op: u16, at: u8) -> Ea {
    Ea::Dreg(RegRef::at(op, at))
}

#[inline]
fn areg(op: u16, at: u8) -> Ea {
    Ea::Areg(RegRef::at(op, at))
}

#[inline]
fn size6(op: u16) -> Option<Size> {
    Size::from_bits(op >> 6)
}

#[inline]
fn mode(op: u16) -> u16 {
    (op >> 3) & 7
}

fn bit_op(kind: u16) -> Mnemonic {
    match kind & 3 {
        0 => Btst,
        1 => Bchg,
        2 => Bclr,
        _ => Bset,
    }
}

fn line0(op: u16) -> Option<OpcodeEntry> {
    let sz = (op >> 6) & 3;
    if op & 0x0100 != 0 {
        if mode(op) == 1 {
            let size = if op & 0x40 != 0 { Size::Long } else { Size::Word };
            let mem = Ea::Ad16(RegRef::at(op, 0));
            let b = B::new(op, Movep).size(size);
            return if op & 0x80 != 0 {
                b.src(dreg(op, 9)).dst(mem).done()
            } else {
                b.src(mem).dst(dreg(op, 9)).done()
            };
        }
        let m = bit_op(sz);
        let dst = ea(op)?;
        let ok = if m == Btst { dst.is_data() } else { dst.is_data_alterable() };
        if !ok {
            return None;
        }
        let size = if matches!(dst, Ea::Dreg(_)) { Size::Long } else { Size::Byte };
        return B::new(op, m).size(size).src(dreg(op, 9)).dst(dst).done();
    }

    let op3 = (op >> 9) & 7;
    if op3 == 4 {
        let m = bit_op(sz);
        let dst = ea(op)?;
        let ok = if m == Btst {
            dst.is_data() && dst != Ea::Imm
        } else {
            dst.is_data_alterable()
        };
        if !ok {
            return None;
        }
        let size = if matches!(dst, Ea::Dreg(_)) { Size::Long } else { Size::Byte };
        return B::new(op, m).size(size).src(Ea::Imm).dst(dst).done();
    }
    if op3 == 7 && sz != 3 {
        let dst = ea(op)?;
        if !dst.is_memory_alterable() {
            return None;
        }
        let size = Size::from_bits(sz)?;
        return B::new(op, Moves).size(size).dst(dst).lead(1).clev(1).privileged().done();
    }
    if sz == 3 {
        return match op3 {
            0..=2 => {
                let src = ea(op)?;
                if !src.is_control() {
                    return None;
                }
                let size = Size::from_bits(op3)?;
                B::new(op, Chk2).size(size).src(src).lead(1).clev(2).done()
            }
            5..=7 => {
                let size = Size::from_bits(op3 - 5)?;
                if op & 0x3F == 0x3C {
                    if op3 == 5 {
                        return None;
                    }
                    return B::new(op, Cas2).size(size).lead(2).clev(2).done();
                }
                let dst = ea(op)?;
                if !dst.is_memory_alterable() {
                    return None;
                }
                B::new(op, Cas).size(size).dst(dst).lead(1).clev(2).done()
            }
            _ => None,
        };
    }

    if op & 0x3F == 0x3C && matches!(op3, 0 | 1 | 5) {
        let m = match op3 {
            0 => OrSr,
            1 => AndSr,
            _ => EorSr,
        };
        return match sz {
            0 => B::new(op, m).size(Size::Byte).src(Ea::Imm).done(),
            1 => B::new(op, m).size(Size::Word).src(Ea::Imm).privileged().done(),
            _ => None,
        };
    }
    let m = match op3 {
        0 => Or,
        1 => And,
        2 => Sub,
        3 => Add,
        5 => Eor,
        6 => Cmp,
        _ => return None,
    };
    let size = Size::from_bits(sz)?;
    let dst = ea(op)?;
    let pcrel = m == Cmp && dst.is_pc_relative();
    if !(dst.is_data_alterable() || pcrel) {
        return None;
    }
    B::new(op, m)
        .size(size)
        .src(Ea::Imm)
        .dst(dst)
        .clev(if pcrel { 2 } else { 0 })
        .done()
}

fn moves(op: u16) -> Option<OpcodeEntry> {
    let size = match op >> 12 {
        1 => Size::Byte,
        3 => Size::Word,
        _ => Size::Long,
    };
    let src = ea(op)?;
    if size == Size::Byte && matches!(src, Ea::Areg(_)) {
        return None;
    }
    let dst = Ea::from_mode(op, 6, 9)?;
    let m = match dst {
        Ea::Areg(_) if size != Size::Byte => Movea,
        d if d.is_data_alterable() => Move,
        _ => return None,
    };
    B::new(op, m).size(size).src(src).dst(dst).done()
}

fn line4(op: u16) -> Option<OpcodeEntry> {
    let sz = (op >> 6) & 3;
    if op & 0x0100 != 0 {
        return match (op >> 6) & 7 {
            7 if op & 0xFFF8 == 0x49C0 => {
                B::new(op, Extb).size(Size::Long).dst(dreg(op, 0)).clev(2).done()
            }
            7 => {
                let src = ea(op)?;
                if !src.is_control() {
                    return None;
                }
                B::new(op, Lea).size(Size::Long).src(src).dst(areg(op, 9)).done()
            }
            6 | 4 => {
                let src = ea(op)?;
                if !src.is_data() {
                    return None;
                }
                let (size, clev) = if op & 0x80 != 0 { (Size::Word, 0) } else { (Size::Long, 2) };
                B::new(op, Chk).size(size).src(src).dst(dreg(op, 9)).clev(clev).done()
            }
            _ => None,
        };
    }

    match (op >> 9) & 7 {
        0..=3 => {
            let (m, special) = match (op >> 9) & 7 {
                0 => (Negx, MoveFromSr),
                1 => (Clr, MoveFromCcr),
                2 => (Neg, MoveToCcr),
                _ => (Not, MoveToSr),
            };
            let e = ea(op)?;
            if sz != 3 {
                if !e.is_data_alterable() {
                    return None;
                }
                return B::new(op, m).size(Size::from_bits(sz)?).dst(e).done();
            }
            match special {
                MoveToCcr | MoveToSr => {
                    if !e.is_data() {
                        return None;
                    }
                    let b = B::new(op, special).size(Size::Word).src(e);
                    if special == MoveToSr {
                        b.privileged().done()
                    } else {
                        b.done()
                    }
                }
                _ => {
                    if !e.is_data_alterable() {
                        return None;
                    }
                    let clev = if special == MoveFromCcr { 1 } else { 0 };
                    B::new(op, special).size(Size::Word).dst(e).clev(clev).done()
                }
            }
        }
        4 => match sz {
            0 if mode(op) == 1 => B::new(op, Link)
                .size(Size::Long)
                .src(areg(op, 0))
                .dst(Ea::Imm)
                .clev(2)
                .done(),
            0 => {
                let dst = ea(op)?;
                if !dst.is_data_alterable() {
                    return None;
                }
                B::new(op, Nbcd).size(Size::Byte).dst(dst).done()
            }
            1 => match mode(op) {
                0 => B::new(op, Swap).size(Size::Word).dst(dreg(op, 0)).done(),
                1 => B::new(op, Bkpt).src(Ea::Quick((op & 7) as i32)).clev(1).done(),
                _ => {
                    let src = ea(op)?;
                    if !src.is_control() {
                        return None;
                    }
                    B::new(op, Pea).size(Size::Long).src(src).done()
                }
            },
            _ => {
                let size = if sz == 3 { Size::Long } else { Size::Word };
                if mode(op) == 0 {
                    return B::new(op, Ext).size(size).dst(dreg(op, 0)).done();
                }
                let dst = ea(op)?;
                let ok = matches!(dst, Ea::Apdi(_)) || (dst.is_control() && dst.is_alterable());
                if !ok {
                    return None;
                }
                B::new(op, Movem).size(size).dst(dst).lead(1).done()
            }
        },
        5 => {
            if sz == 3 {
                if op == 0x4AFC {
                    return None;
                }
                let dst = ea(op)?;
                if !dst.is_data_alterable() {
                    return None;
                }
                return B::new(op, Tas).size(Size::Byte).dst(dst).done();
            }
            let size = Size::from_bits(sz)?;
            let src = ea(op)?;
            if size == Size::Byte && matches!(src, Ea::Areg(_)) {
                return None;
            }
            let clev = if src.is_data_alterable() { 0 } else { 2 };
            B::new(op, Tst).size(size).src(src).clev(clev).done()
        }
        6 => match sz {
            0 | 1 => {
                let src = ea(op)?;
                if !src.is_data() {
                    return None;
                }
                let m = if sz == 0 { Mull } else { Divl };
                B::new(op, m).size(Size::Long).src(src).lead(1).clev(2).done()
            }
            _ => {
                let src = ea(op)?;
                let ok = matches!(src, Ea::Aipi(_)) || src.is_control();
                if !ok {
                    return None;
                }
                let size = if sz == 3 { Size::Long } else { Size::Word };
                B::new(op, Movem).size(size).src(src).lead(1).done()
            }
        },
        7 => match sz {
            1 => misc_4e(op),
            2 | 3 => {
                let src = ea(op)?;
                if !src.is_control() {
                    return None;
                }
                let m = if sz == 2 { Jsr } else { Jmp };
                B::new(op, m).src(src).done()
            }
            _ => None,
        },
        _ => None,
    }
}

// 0x4E40..=0x4E7F
fn misc_4e(op: u16) -> Option<OpcodeEntry> {
    match mode(op) {
        0 | 1 => B::new(op, Trap).src(Ea::Quick((op & 15) as i32)).done(),
        2 => B::new(op, Link).size(Size::Word).src(areg(op, 0)).dst(Ea::Imm).done(),
        3 => B::new(op, Unlk).src(areg(op, 0)).done(),
        4 | 5 => B::new(op, MoveUsp).size(Size::Long).src(areg(op, 0)).privileged().done(),
        6 => match op & 7 {
            0 => B::new(op, Reset).privileged().done(),
            1 => B::new(op, Nop).done(),
            2 => B::new(op, Stop).size(Size::Word).src(Ea::Imm).privileged().done(),
            3 => B::new(op, Rte).privileged().done(),
            4 => B::new(op, Rtd).size(Size::Word).src(Ea::Imm).clev(1).done(),
            5 => B::new(op, Rts).done(),
            6 => B::new(op, Trapv).done(),
            _ => B::new(op, Rtr).done(),
        },
        _ if op & 6 == 2 => B::new(op, Movec).size(Size::Long).lead(1).clev(1).privileged().done(),
        _ => None,
    }
}

fn line5(op: u16) -> Option<OpcodeEntry> {
    let sz = (op >> 6) & 3;
    if sz == 3 {
        let cc = op >> 8;
        if mode(op) == 1 {
            return B::new(op, Dbcc)
                .size(Size::Word)
                .src(dreg(op, 0))
                .dst(Ea::Imm)
                .cc(cc)
                .done();
        }
        if mode(op) == 7 && (2..=4).contains(&(op & 7)) {
            let b = B::new(op, Trapcc).cc(cc).clev(2);
            return match op & 7 {
                2 => b.size(Size::Word).src(Ea::Imm).done(),
                3 => b.size(Size::Long).src(Ea::Imm).done(),
                _ => b.done(),
            };
        }
        let dst = ea(op)?;
        if !dst.is_data_alterable() {
            return None;
        }
        return B::new(op, Scc).size(Size::Byte).dst(dst).cc(cc).done();
    }
    let q = match (op >> 9) & 7 {
        0 => 8,
        n => n as i32,
    };
    let sub = op & 0x0100 != 0;
    let size = Size::from_bits(sz)?;
    let dst = ea(op)?;
    let m = match dst {
        Ea::Areg(_) if size == Size::Byte => return None,
        Ea::Areg(_) if sub => Suba,
        Ea::Areg(_) => Adda,
        d if d.is_alterable() && sub => Sub,
        d if d.is_alterable() => Add,
        _ => return None,
    };
    B::new(op, m).size(size).src(Ea::Quick(q)).dst(dst).done()
}

fn branch(op: u16) -> Option<OpcodeEntry> {
    let cc = (op >> 8) & 15;
    let m = if cc == 1 { Bsr } else { Bcc };
    let b = B::new(op, m).cc(cc);
    match op as u8 {
        0 => b.size(Size::Word).src(Ea::Imm).done(),
        0xFF => b.size(Size::Long).src(Ea::Imm).clev(2).done(),
        d => b.size(Size::Byte).src(Ea::Quick(d as i8 as i32)).done(),
    }
}

fn moveq(op: u16) -> Option<OpcodeEntry> {
    if op & 0x0100 != 0 {
        return None;
    }
    B::new(op, Move)
        .size(Size::Long)
        .src(Ea::Quick(op as u8 as i8 as i32))
        .dst(dreg(op, 9))
        .done()
}

// Register pair of ABCD/SBCD/ADDX/SUBX/PACK/UNPK: bit 3 selects -(Ay),-(Ax).
fn reg_pair(op: u16) -> (Ea, Ea) {
    if op & 8 != 0 {
        (Ea::Apdi(RegRef::at(op, 0)), Ea::Apdi(RegRef::at(op, 9)))
    } else {
        (dreg(op, 0), dreg(op, 9))
    }
}

// OR/AND in both directions.
fn logical(op: u16, m: Mnemonic) -> Option<OpcodeEntry> {
    let opm = (op >> 6) & 7;
    let size = Size::from_bits(opm)?;
    let e = ea(op)?;
    if opm < 4 {
        if !e.is_data() {
            return None;
        }
        B::new(op, m).size(size).src(e).dst(dreg(op, 9)).done()
    } else {
        if !e.is_memory_alterable() {
            return None;
        }
        B::new(op, m).size(size).src(dreg(op, 9)).dst(e).done()
    }
}

fn line8(op: u16) -> Option<OpcodeEntry> {
    match (op >> 6) & 7 {
        3 | 7 => {
            let src = ea(op)?;
            if !src.is_data() {
                return None;
            }
            let m = if op & 0x0100 != 0 { Divs } else { Divu };
            B::new(op, m).size(Size::Word).src(src).dst(dreg(op, 9)).done()
        }
        _ if op & 0x1F0 == 0x100 => {
            let (s, d) = reg_pair(op);
            B::new(op, Sbcd).size(Size::Byte).src(s).dst(d).done()
        }
        _ if op & 0x1F0 == 0x140 || op & 0x1F0 == 0x180 => {
            let (s, d) = reg_pair(op);
            let m = if op & 0x1F0 == 0x140 { Pack } else { Unpk };
            B::new(op, m).src(s).dst(d).lead(1).clev(2).done()
        }
        _ => logical(op, Or),
    }
}

fn addsub(op: u16) -> Option<OpcodeEntry> {
    let add = op >> 12 == 0xD;
    let opm = (op >> 6) & 7;
    if opm == 3 || opm == 7 {
        let size = if opm == 7 { Size::Long } else { Size::Word };
        let m = if add { Adda } else { Suba };
        return B::new(op, m).size(size).src(ea(op)?).dst(areg(op, 9)).done();
    }
    let size = Size::from_bits(opm)?;
    if opm >= 4 && op & 0x30 == 0 {
        let (s, d) = reg_pair(op);
        let m = if add { Addx } else { Subx };
        return B::new(op, m).size(size).src(s).dst(d).done();
    }
    let m = if add { Add } else { Sub };
    let e = ea(op)?;
    if opm < 4 {
        if size == Size::Byte && matches!(e, Ea::Areg(_)) {
            return None;
        }
        B::new(op, m).size(size).src(e).dst(dreg(op, 9)).done()
    } else {
        if !e.is_memory_alterable() {
            return None;
        }
        B::new(op, m).size(size).src(dreg(op, 9)).dst(e).done()
    }
}

fn line_b(op: u16) -> Option<OpcodeEntry> {
    let opm = (op >> 6) & 7;
    if opm == 3 || opm == 7 {
        let size = if opm == 7 { Size::Long } else { Size::Word };
        return B::new(op, Cmpa).size(size).src(ea(op)?).dst(areg(op, 9)).done();
    }
    let size = Size::from_bits(opm)?;
    if opm < 4 {
        let src = ea(op)?;
        if size == Size::Byte && matches!(src, Ea::Areg(_)) {
            return None;
        }
        return B::new(op, Cmp).size(size).src(src).dst(dreg(op, 9)).done();
    }
    if mode(op) == 1 {
        return B::new(op, Cmpm)
            .size(size)
            .src(Ea::Aipi(RegRef::at(op, 0)))
            .dst(Ea::Aipi(RegRef::at(op, 9)))
            .done();
    }
    let dst = ea(op)?;
    if !dst.is_data_alterable() {
        return None;
    }
    B::new(op, Eor).size(size).src(dreg(op, 9)).dst(dst).done()
}

fn line_c(op: u16) -> Option<OpcodeEntry> {
    match (op >> 6) & 7 {
        3 | 7 => {
            let src = ea(op)?;
            if !src.is_data() {
                return None;
            }
            let m = if op & 0x0100 != 0 { Muls } else { Mulu };
            B::new(op, m).size(Size::Word).src(src).dst(dreg(op, 9)).done()
        }
        _ if op & 0x1F0 == 0x100 => {
            let (s, d) = reg_pair(op);
            B::new(op, Abcd).size(Size::Byte).src(s).dst(d).done()
        }
        _ => match op & 0x1F8 {
            0x140 => B::new(op, Exg).size(Size::Long).src(dreg(op, 9)).dst(dreg(op, 0)).done(),
            0x148 => B::new(op, Exg).size(Size::Long).src(areg(op, 9)).dst(areg(op, 0)).done(),
            0x188 => B::new(op, Exg).size(Size::Long).src(dreg(op, 9)).dst(areg(op, 0)).done(),
            _ => logical(op, And),
        },
    }
}

fn shift_mnemonic(kind: u16, left: bool) -> Mnemonic {
    match (kind & 3, left) {
        (0, false) => Asr,
        (0, true) => Asl,
        (1, false) => Lsr,
        (1, true) => Lsl,
        (2, false) => Roxr,
        (2, true) => Roxl,
        (_, false) => Ror,
        (_, true) => Rol,
    }
}

fn line_e(op: u16) -> Option<OpcodeEntry> {
    let left = op & 0x0100 != 0;
    if (op >> 6) & 3 == 3 {
        let e = ea(op)?;
        if op & 0x0800 != 0 {
            if !(e.is_control() || matches!(e, Ea::Dreg(_))) {
                return None;
            }
            return B::new(op, Bitfield).dst(e).lead(1).clev(2).done();
        }
        if !e.is_memory_alterable() {
            return None;
        }
        let m = shift_mnemonic(op >> 9, left);
        return B::new(op, m).size(Size::Word).dst(e).done();
    }
    let size = size6(op)?;
    let src = if op & 0x20 != 0 {
        dreg(op, 9)
    } else {
        Ea::Quick(match (op >> 9) & 7 {
            0 => 8,
            n => n as i32,
        })
    };
    let m = shift_mnemonic(op >> 3, left);
    B::new(op, m).size(size).src(src).dst(dreg(op, 0)).done()
}

fn line_f(op: u16) -> Option<OpcodeEntry> {
    match (op >> 9) & 7 {
        1 => B::new(op, Fpu).clev(3).done(),
        2 if op & 0x0100 == 0 => B::new(op, Cache).clev(4).privileged().done(),
        3 if op & 0x01F8 < 0x0028 => B::new(op, Move16).clev(4).done(),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn common_encodings() {
        let e = decode(0xD041); // ADD.W D1,D0
        assert_eq!(e.mnemonic, Add);
        assert_eq!(e.size, Some(Size::Word));
        assert_eq!(e.src, Some(Ea::Dreg(RegRef { n: 1, field: 0 })));
        assert_eq!(e.dst, Some(Ea::Dreg(RegRef { n: 0, field: 9 })));

        let e = decode(0x7205); // MOVEQ #5,D1
        assert_eq!((e.mnemonic, e.src), (Move, Some(Ea::Quick(5))));

        let e = decode(0x5248); // ADDQ.W #1,A0
        assert_eq!(e.mnemonic, Adda);

        let e = decode(0x51C8); // DBF D0
        assert_eq!((e.mnemonic, e.cc, e.ext_words()), (Dbcc, 1, 1));

        let e = decode(0x4E75);
        assert_eq!(e.mnemonic, Rts);
        assert_eq!(decode(0x4AFC).mnemonic, Illegal);
        assert_eq!(decode(0xA000).mnemonic, Illegal);
    }

    #[test]
    fn extension_word_counts() {
        // MOVE.L #imm,(d16,A1)
        assert_eq!(decode(0x237C).ext_words(), 3);
        // BTST #n,D0 keeps a single word for the bit number
        let e = decode(0x0800);
        assert_eq!((e.mnemonic, e.size), (Btst, Some(Size::Long)));
        assert_eq!(e.ext_words(), 1);
        // MOVEM.L D0-D7,-(A7)
        assert_eq!(decode(0x48E7).ext_words(), 1);
    }

    #[test]
    fn built_table_validates() {
        let t = DecodeTable::build();
        assert_eq!(t.validate(), Ok(()));
    }

    #[test]
    fn validation_catches_index_mismatch() {
        let mut t = DecodeTable::build();
        t.entries_mut()[0x1234].opcode = 0x4321;
        assert!(matches!(
            t.validate(),
            Err(TableError::Inconsistent { index: 0x1234, .. })
        ));
    }
}
