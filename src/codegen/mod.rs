//! Per-opcode translation routines.
//!
//! [`generate`] runs once per (opcode, variant) and produces a [`Routine`]: either a
//! [`Template`] of host words with its fixups and guards, or a hole that leaves the
//! opcode to the interpreter. The `ff` variant maintains the guest flags in host NZCV
//! (and X in the register file); the `nf` variant is free to leave them clobbered.
//!
//! Host register convention of the emitted code:
//!
//! | register | role |
//! |---|---|
//! | R11 | guest register file: D0..D7 at 0..28, A0..A7 at 32..60, PC at 64, X at 68 |
//! | R10 | host address of guest address 0 (guest memory is big-endian) |
//! | R2, R3 | work registers, clobbered by every composite |
//! | SP | host stack |
//! | the rest | symbolic registers, see [`ReferenceBinding`] |

pub mod alu;
pub mod bits;
pub mod ctx;
pub mod ea;
pub mod flow;
pub mod movem;
pub mod shift;
pub mod template;

use crate::encoder::{EncodeError, HostFeatures, Reg};
use crate::guest::{Mnemonic, OpcodeEntry};
use bitflags::bitflags;
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::warn;

pub use ctx::{Bank, Ctx, ReferenceBinding, RegisterBinding, Sym, POOL};
pub use template::{Fixup, Guard, InstantiateError, LitValue, Template};

/// Guest register file base.
pub const REGS: Reg = Reg::R11;
/// Guest memory base.
pub const MEM: Reg = Reg::R10;
pub const DREG_BASE: i32 = 0;
pub const AREG_BASE: i32 = 32;
pub const PC_SLOT: i32 = 64;
pub const X_SLOT: i32 = 68;
/// Bytes of register file the emitted code may touch.
pub const REGFILE_BYTES: usize = 72;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Variant {
    /// Guest flags are live after the instruction.
    Ff,
    /// Guest flags are dead after the instruction.
    Nf,
}

impl Variant {
    pub const BOTH: [Variant; 2] = [Variant::Ff, Variant::Nf];

    pub const fn tag(self) -> &'static str {
        match self {
            Variant::Ff => "ff",
            Variant::Nf => "nf",
        }
    }
}

impl fmt::Display for Variant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

bitflags! {
    /// Dispatch-table metadata. The bit values are part of the table format.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
    pub struct RoutineFlags: u32 {
        const JUMP = 1;
        const WIDE = 2;
        const CMOV = 4;
        const ADDX = 8;
        const COND_JUMP = 16;
        const FPU = 32;
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Body {
    Failed,
    Template(Template),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Routine {
    pub opcode: u16,
    pub variant: Variant,
    pub flags: RoutineFlags,
    pub may_fail: bool,
    pub body: Body,
}

impl Routine {
    pub fn hole(opcode: u16, variant: Variant, flags: RoutineFlags) -> Self {
        Self { opcode, variant, flags, may_fail: false, body: Body::Failed }
    }

    #[inline]
    pub fn is_failed(&self) -> bool {
        matches!(self.body, Body::Failed)
    }

    pub fn template(&self) -> Option<&Template> {
        match &self.body {
            Body::Template(t) => Some(t),
            Body::Failed => None,
        }
    }

    /// Symbol of the routine in the generated sources.
    pub fn symbol(&self) -> String {
        symbol(self.opcode, self.variant)
    }
}

pub fn symbol(opcode: u16, variant: Variant) -> String {
    format!("op_{:x}_0_comp_{}", opcode, variant.tag())
}

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum GenError {
    #[error(transparent)]
    Encode(#[from] EncodeError),
    #[error("register pressure: symbolic register {wanted} but only {available} host registers")]
    RegisterPressure { wanted: u32, available: usize },
    #[error("bad operand: {0}")]
    BadOperand(&'static str),
}

/// Generation settings shared by every routine of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GenEnv {
    pub host: HostFeatures,
    /// Word capacity of each routine's code buffer.
    pub capacity: usize,
}

impl Default for GenEnv {
    fn default() -> Self {
        Self { host: HostFeatures::default(), capacity: crate::encoder::buffer::DEFAULT_CAPACITY }
    }
}

/// Generate the routine for one opcode and variant with the reference binding.
pub fn generate(entry: &OpcodeEntry, variant: Variant, env: &GenEnv) -> Routine {
    let ctx = Ctx::new(entry, variant, env);
    generate_with(ctx)
}

/// Generate with an already prepared context (custom register binding).
pub fn generate_with(mut ctx: Ctx<'_>) -> Routine {
    let (opcode, variant) = (ctx.entry.opcode, ctx.variant);
    match dispatch(&mut ctx) {
        Ok(()) => ctx.finish(),
        Err(e) => {
            warn!(opcode = format_args!("{opcode:#06x}"), %variant, "generation error: {e}");
            Routine::hole(opcode, variant, ctx.flags)
        }
    }
}

fn dispatch(ctx: &mut Ctx<'_>) -> Result<(), GenError> {
    use Mnemonic::*;
    if ctx.entry.privileged {
        return ctx.fail("privileged");
    }
    match ctx.entry.mnemonic {
        Add => alu::add_sub(ctx, false),
        Sub => alu::add_sub(ctx, true),
        Adda => alu::adda_suba(ctx, false),
        Suba => alu::adda_suba(ctx, true),
        Addx => alu::addx_subx(ctx, false),
        Subx => alu::addx_subx(ctx, true),
        Neg => alu::neg(ctx),
        Negx => alu::negx(ctx),
        Cmp | Cmpm => alu::cmp(ctx),
        Cmpa => alu::cmpa(ctx),
        And | Or | Eor => alu::logical(ctx),
        Not => alu::not(ctx),
        Move => alu::move_(ctx),
        Movea => alu::movea(ctx),
        Clr => alu::clr(ctx),
        Tst => alu::tst(ctx),
        Ext | Extb => alu::ext(ctx),
        Swap => alu::swap(ctx),
        Exg => alu::exg(ctx),
        Lea => alu::lea(ctx),
        Pea => alu::pea(ctx),
        Mulu | Muls => alu::mul(ctx),
        Mull => alu::mull(ctx),
        Movem => movem::movem(ctx),
        Divu | Divs => {
            // The divide-by-zero trap leaves the block.
            ctx.flags |= RoutineFlags::JUMP;
            ctx.fail("divide")
        }
        Asl | Asr | Lsl | Lsr | Rol | Ror | Roxl | Roxr => shift::shift(ctx),
        Btst | Bchg | Bclr | Bset => bits::bit_op(ctx),
        Bcc => flow::bcc(ctx),
        Bsr => flow::bsr(ctx),
        Dbcc => flow::dbcc(ctx),
        Scc => flow::scc(ctx),
        Jmp => flow::jmp(ctx),
        Jsr => flow::jsr(ctx),
        Rts => flow::rts(ctx),
        Rtd => flow::rtd(ctx),
        Link => flow::link(ctx),
        Unlk => flow::unlk(ctx),
        Nop => Ok(()),
        Fpu => {
            ctx.flags |= RoutineFlags::FPU;
            ctx.fail("fpu")
        }
        Rte | Rtr | Trap | Trapv | Trapcc | Chk | Chk2 | Stop | Reset | Bkpt => {
            ctx.flags |= RoutineFlags::JUMP;
            ctx.fail("exception or return")
        }
        Abcd | Sbcd | Nbcd => ctx.fail("bcd"),
        Movep | Tas | Cas | Cas2 | Pack | Unpk | Bitfield | Divl => {
            ctx.fail("not translated")
        }
        OrSr | AndSr | EorSr | MoveFromSr | MoveToSr | MoveFromCcr | MoveToCcr => {
            ctx.fail("status register")
        }
        Moves | Movec | MoveUsp | Cache | Move16 | Illegal => ctx.fail("system"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::guest::table::decode;

    #[test]
    fn symbols_use_lower_hex() {
        assert_eq!(symbol(0xD041, Variant::Ff), "op_d041_0_comp_ff");
        assert_eq!(symbol(0x0000, Variant::Nf), "op_0_0_comp_nf");
    }

    #[test]
    fn failed_families_are_holes() {
        let env = GenEnv::default();
        for op in [0xC100u16, 0x0108, 0x4E73, 0xF200, 0x80C1] {
            let r = generate(&decode(op), Variant::Ff, &env);
            assert!(r.is_failed(), "{op:#06x}");
        }
        let div = generate(&decode(0x80C1), Variant::Nf, &env);
        assert!(div.flags.contains(RoutineFlags::JUMP));
        let fpu = generate(&decode(0xF200), Variant::Nf, &env);
        assert_eq!(fpu.flags, RoutineFlags::FPU);
    }
}
