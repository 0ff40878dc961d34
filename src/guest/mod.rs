//! Guest (68k) opcode decode entries.
//!
//! One [`OpcodeEntry`] per 16-bit opcode, built by [`table::DecodeTable::build`]. The
//! generator only reads these; it never looks at raw opcode bits itself except through
//! [`RegRef`] fields, which record where a register number lives in the opcode word so
//! that one routine can serve every opcode of a group.

pub mod table;

use crate::encoder::Width;
use serde::{Deserialize, Serialize};
use std::fmt;

pub use table::{DecodeTable, TableError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Size {
    Byte,
    Word,
    Long,
}

impl Size {
    pub const fn width(self) -> Width {
        match self {
            Size::Byte => Width::B8,
            Size::Word => Width::B16,
            Size::Long => Width::B32,
        }
    }

    pub const fn bytes(self) -> u32 {
        match self {
            Size::Byte => 1,
            Size::Word => 2,
            Size::Long => 4,
        }
    }

    pub const fn suffix(self) -> &'static str {
        match self {
            Size::Byte => ".B",
            Size::Word => ".W",
            Size::Long => ".L",
        }
    }

    /// The common `00/01/10` size field. `11` is not a size.
    pub const fn from_bits(n: u16) -> Option<Size> {
        match n & 3 {
            0 => Some(Size::Byte),
            1 => Some(Size::Word),
            2 => Some(Size::Long),
            _ => None,
        }
    }
}

/// No opcode field: the register is implied by the instruction (A7 for stack ops).
pub const IMPLIED: u8 = 0xFF;

/// A guest register number and the bit position of the 3-bit opcode field holding it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RegRef {
    pub n: u8,
    pub field: u8,
}

impl RegRef {
    pub const fn at(op: u16, field: u8) -> RegRef {
        RegRef { n: ((op >> field) & 7) as u8, field }
    }

    pub const fn implied(n: u8) -> RegRef {
        RegRef { n, field: IMPLIED }
    }

    #[inline]
    pub const fn is_field(self) -> bool {
        self.field != IMPLIED
    }
}

/// Effective-address descriptor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Ea {
    Dreg(RegRef),
    Areg(RegRef),
    Aind(RegRef),
    Aipi(RegRef),
    Apdi(RegRef),
    Ad16(RegRef),
    Ad8r(RegRef),
    AbsW,
    AbsL,
    Pc16,
    Pc8r,
    Imm,
    /// Small constant carried in the opcode word itself (ADDQ, MOVEQ, shift counts).
    Quick(i32),
}

impl Ea {
    /// Decode the standard 6-bit mode/register pair.
    pub const fn from_mode(op: u16, mode_at: u8, reg_at: u8) -> Option<Ea> {
        let mode = (op >> mode_at) & 7;
        let r = RegRef::at(op, reg_at);
        Some(match mode {
            0 => Ea::Dreg(r),
            1 => Ea::Areg(r),
            2 => Ea::Aind(r),
            3 => Ea::Aipi(r),
            4 => Ea::Apdi(r),
            5 => Ea::Ad16(r),
            6 => Ea::Ad8r(r),
            _ => match r.n {
                0 => Ea::AbsW,
                1 => Ea::AbsL,
                2 => Ea::Pc16,
                3 => Ea::Pc8r,
                4 => Ea::Imm,
                _ => return None,
            },
        })
    }

    /// Extension words this operand consumes at operand size `size`.
    pub const fn ext_words(self, size: Option<Size>) -> u8 {
        match self {
            Ea::Ad16(_) | Ea::Ad8r(_) | Ea::AbsW | Ea::Pc16 | Ea::Pc8r => 1,
            Ea::AbsL => 2,
            Ea::Imm => match size {
                Some(Size::Long) => 2,
                _ => 1,
            },
            _ => 0,
        }
    }

    pub const fn reg(self) -> Option<RegRef> {
        match self {
            Ea::Dreg(r)
            | Ea::Areg(r)
            | Ea::Aind(r)
            | Ea::Aipi(r)
            | Ea::Apdi(r)
            | Ea::Ad16(r)
            | Ea::Ad8r(r) => Some(r),
            _ => None,
        }
    }

    pub const fn is_data(self) -> bool {
        !matches!(self, Ea::Areg(_))
    }

    pub const fn is_memory(self) -> bool {
        !matches!(self, Ea::Dreg(_) | Ea::Areg(_) | Ea::Quick(_))
    }

    pub const fn is_alterable(self) -> bool {
        !matches!(self, Ea::Pc16 | Ea::Pc8r | Ea::Imm | Ea::Quick(_))
    }

    pub const fn is_control(self) -> bool {
        matches!(
            self,
            Ea::Aind(_) | Ea::Ad16(_) | Ea::Ad8r(_) | Ea::AbsW | Ea::AbsL | Ea::Pc16 | Ea::Pc8r
        )
    }

    pub const fn is_data_alterable(self) -> bool {
        self.is_data() && self.is_alterable()
    }

    pub const fn is_memory_alterable(self) -> bool {
        self.is_memory() && self.is_alterable()
    }

    pub const fn is_pc_relative(self) -> bool {
        matches!(self, Ea::Pc16 | Ea::Pc8r)
    }
}

impl fmt::Display for Ea {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Ea::Dreg(r) => write!(f, "D{}", r.n),
            Ea::Areg(r) => write!(f, "A{}", r.n),
            Ea::Aind(r) => write!(f, "(A{})", r.n),
            Ea::Aipi(r) => write!(f, "(A{})+", r.n),
            Ea::Apdi(r) => write!(f, "-(A{})", r.n),
            Ea::Ad16(r) => write!(f, "(d16,A{})", r.n),
            Ea::Ad8r(r) => write!(f, "(d8,A{},Xn)", r.n),
            Ea::AbsW => f.write_str("(xxx).W"),
            Ea::AbsL => f.write_str("(xxx).L"),
            Ea::Pc16 => f.write_str("(d16,PC)"),
            Ea::Pc8r => f.write_str("(d8,PC,Xn)"),
            Ea::Imm => f.write_str("#imm"),
            Ea::Quick(v) => write!(f, "#{v}"),
        }
    }
}

macro_rules! mnemonics {
    ($($variant:ident => $name:literal,)*) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        pub enum Mnemonic {
            $($variant,)*
        }

        impl Mnemonic {
            pub const ALL: &'static [Mnemonic] = &[$(Mnemonic::$variant,)*];

            pub const fn name(self) -> &'static str {
                match self {
                    $(Mnemonic::$variant => $name,)*
                }
            }

            pub fn from_name(s: &str) -> Option<Mnemonic> {
                Self::ALL.iter().copied().find(|m| m.name().eq_ignore_ascii_case(s))
            }
        }
    };
}

mnemonics! {
    Illegal => "ILLEGAL",
    Or => "OR",
    And => "AND",
    Eor => "EOR",
    OrSr => "ORSR",
    AndSr => "ANDSR",
    EorSr => "EORSR",
    Sub => "SUB",
    Suba => "SUBA",
    Subx => "SUBX",
    Sbcd => "SBCD",
    Add => "ADD",
    Adda => "ADDA",
    Addx => "ADDX",
    Abcd => "ABCD",
    Neg => "NEG",
    Negx => "NEGX",
    Nbcd => "NBCD",
    Clr => "CLR",
    Not => "NOT",
    Tst => "TST",
    Btst => "BTST",
    Bchg => "BCHG",
    Bclr => "BCLR",
    Bset => "BSET",
    Cmp => "CMP",
    Cmpm => "CMPM",
    Cmpa => "CMPA",
    Movep => "MOVEP",
    Move => "MOVE",
    Movea => "MOVEA",
    MoveFromSr => "MVSR2",
    MoveToSr => "MV2SR",
    MoveFromCcr => "MVCCR2",
    MoveToCcr => "MV2CCR",
    Swap => "SWAP",
    Exg => "EXG",
    Ext => "EXT",
    Extb => "EXTB",
    Movem => "MOVEM",
    Trap => "TRAP",
    MoveUsp => "MOVEUSP",
    Nop => "NOP",
    Reset => "RESET",
    Rte => "RTE",
    Rtd => "RTD",
    Link => "LINK",
    Unlk => "UNLK",
    Rts => "RTS",
    Stop => "STOP",
    Trapv => "TRAPV",
    Rtr => "RTR",
    Jsr => "JSR",
    Jmp => "JMP",
    Bsr => "BSR",
    Bcc => "Bcc",
    Lea => "LEA",
    Pea => "PEA",
    Dbcc => "DBcc",
    Scc => "Scc",
    Divu => "DIVU",
    Divs => "DIVS",
    Mulu => "MULU",
    Muls => "MULS",
    Asr => "ASR",
    Asl => "ASL",
    Lsr => "LSR",
    Lsl => "LSL",
    Rol => "ROL",
    Ror => "ROR",
    Roxl => "ROXL",
    Roxr => "ROXR",
    Movec => "MOVEC",
    Cas => "CAS",
    Cas2 => "CAS2",
    Mull => "MULL",
    Divl => "DIVL",
    Bitfield => "BFxxx",
    Pack => "PACK",
    Unpk => "UNPK",
    Tas => "TAS",
    Bkpt => "BKPT",
    Chk => "CHK",
    Chk2 => "CHK2",
    Trapcc => "TRAPcc",
    Moves => "MOVES",
    Fpu => "FPP",
    Cache => "CINV/CPUSH",
    Move16 => "MOVE16",
}

/// One row of the decode table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OpcodeEntry {
    pub opcode: u16,
    pub mnemonic: Mnemonic,
    pub size: Option<Size>,
    pub src: Option<Ea>,
    pub dst: Option<Ea>,
    /// Condition field for Bcc/DBcc/Scc/TRAPcc, 0 otherwise.
    pub cc: u8,
    /// 0 = 68000, 1 = 68010, 2 = 68020, 3 = FPU, 4 = 68040.
    pub clev: u8,
    pub privileged: bool,
    /// Words between the opcode and the first operand's extension words (MOVEM mask,
    /// bitfield/MULL/DIVL/CAS operand words).
    pub lead_words: u8,
}

impl OpcodeEntry {
    pub const fn illegal(opcode: u16) -> OpcodeEntry {
        OpcodeEntry {
            opcode,
            mnemonic: Mnemonic::Illegal,
            size: None,
            src: None,
            dst: None,
            cc: 0,
            clev: 0,
            privileged: false,
            lead_words: 0,
        }
    }

    #[inline]
    pub const fn is_illegal(&self) -> bool {
        matches!(self.mnemonic, Mnemonic::Illegal)
    }

    /// Extension words following the opcode.
    pub fn ext_words(&self) -> u8 {
        // A static bit number is one word whatever the operand size.
        let src_size = match self.mnemonic {
            Mnemonic::Btst | Mnemonic::Bchg | Mnemonic::Bclr | Mnemonic::Bset => Some(Size::Byte),
            _ => self.size,
        };
        let src = self.src.map_or(0, |e| e.ext_words(src_size));
        let dst = self.dst.map_or(0, |e| e.ext_words(self.size));
        self.lead_words + src + dst
    }
}

impl fmt::Display for OpcodeEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.mnemonic.name())?;
        if let Some(sz) = self.size {
            f.write_str(sz.suffix())?;
        }
        match (self.src, self.dst) {
            (Some(s), Some(d)) => write!(f, " {s},{d}"),
            (Some(e), None) | (None, Some(e)) => write!(f, " {e}"),
            (None, None) => Ok(()),
        }
    }
}
