//! ARM A32 instruction encoder.
//!
//! `arm` holds the pure word builders, `CodeBuffer` the per-routine output stream,
//! `Assembler` the appending facade used by everything that generates code, and
//! `composite` the multi-word sequences that emulate sub-word arithmetic and the
//! guest flag model.

pub mod arm;
pub mod asm;
pub mod buffer;
pub mod composite;
pub mod imm;

use serde::{Deserialize, Serialize};

pub use arm::{DpOp, Extend, MemOp, Offset, Operand, PsrFields, Shift};
pub use asm::Assembler;
pub use buffer::CodeBuffer;
pub use composite::{HostFeatures, Width};

/// A host core register.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Reg(u8);

impl Reg {
    pub const R0: Reg = Reg(0);
    pub const R1: Reg = Reg(1);
    pub const R2: Reg = Reg(2);
    pub const R3: Reg = Reg(3);
    pub const R4: Reg = Reg(4);
    pub const R5: Reg = Reg(5);
    pub const R6: Reg = Reg(6);
    pub const R7: Reg = Reg(7);
    pub const R8: Reg = Reg(8);
    pub const R9: Reg = Reg(9);
    pub const R10: Reg = Reg(10);
    pub const R11: Reg = Reg(11);
    pub const R12: Reg = Reg(12);
    pub const SP: Reg = Reg(13);
    pub const LR: Reg = Reg(14);
    pub const PC: Reg = Reg(15);

    #[inline]
    pub const fn new(n: u8) -> Reg {
        Reg(n & 0xF)
    }

    #[inline]
    pub const fn index(self) -> u8 {
        self.0
    }

    #[inline]
    pub(crate) const fn n(self) -> u32 {
        self.0 as u32
    }

    /// Bit for this register in a PUSH/POP list.
    #[inline]
    pub const fn mask(self) -> u16 {
        1 << self.0
    }

    pub const fn lsl(self, n: u8) -> Operand {
        Operand::Shifted(self, Shift::Lsl(n))
    }
    pub const fn lsr(self, n: u8) -> Operand {
        Operand::Shifted(self, Shift::Lsr(n))
    }
    pub const fn asr(self, n: u8) -> Operand {
        Operand::Shifted(self, Shift::Asr(n))
    }
    pub const fn ror(self, n: u8) -> Operand {
        Operand::Shifted(self, Shift::Ror(n))
    }
    pub const fn rrx(self) -> Operand {
        Operand::Shifted(self, Shift::Rrx)
    }
    pub const fn lsl_reg(self, rs: Reg) -> Operand {
        Operand::Shifted(self, Shift::LslReg(rs))
    }
    pub const fn lsr_reg(self, rs: Reg) -> Operand {
        Operand::Shifted(self, Shift::LsrReg(rs))
    }
    pub const fn asr_reg(self, rs: Reg) -> Operand {
        Operand::Shifted(self, Shift::AsrReg(rs))
    }
    pub const fn ror_reg(self, rs: Reg) -> Operand {
        Operand::Shifted(self, Shift::RorReg(rs))
    }
}

impl std::fmt::Display for Reg {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.0 {
            13 => f.write_str("sp"),
            14 => f.write_str("lr"),
            15 => f.write_str("pc"),
            n => write!(f, "r{n}"),
        }
    }
}

/// First reserved work register (never handed out for symbolic registers).
pub const W1: Reg = Reg::R2;
/// Second reserved work register.
pub const W2: Reg = Reg::R3;

/// Immediate operand, folded into 8 bits plus rotation when encoded.
#[inline]
pub const fn imm(value: u32) -> Operand {
    Operand::Imm(value)
}

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum EncodeError {
    #[error("immediate {value:#010x} has no 8-bit rotated encoding")]
    UnencodableImmediate { value: u32 },
    #[error("rotation {rot} is not an even amount in 0..=30")]
    BadRotation { rot: u8 },
    #[error("shift amount {amount} out of range for {kind}")]
    ShiftOutOfRange { kind: &'static str, amount: u8 },
    #[error("memory offset {offset} out of range for {op}")]
    OffsetOutOfRange { op: &'static str, offset: i32 },
    #[error("branch offset {offset} does not fit in 24 bits")]
    BranchOutOfRange { offset: i32 },
    #[error("operand not allowed here: {0}")]
    InvalidOperand(&'static str),
    #[error("code buffer full ({capacity} words)")]
    BufferFull { capacity: usize },
    #[error("patch index {index} beyond emitted length {len}")]
    PatchOutOfRange { index: usize, len: usize },
}
