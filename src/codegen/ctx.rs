//! Per-routine generation state.

use super::template::{Fixup, Guard, LitValue, Template};
use super::{Body, GenEnv, GenError, Routine, RoutineFlags, Variant, AREG_BASE, DREG_BASE, REGS};
use crate::encoder::{Assembler, CodeBuffer, HostFeatures, Reg, Width};
use crate::guest::{OpcodeEntry, RegRef, Size};
use tracing::debug;

/// Host registers handed out for symbolic registers, in allocation order.
pub const POOL: [Reg; 10] = [
    Reg::R4,
    Reg::R5,
    Reg::R6,
    Reg::R7,
    Reg::R8,
    Reg::R9,
    Reg::R12,
    Reg::R0,
    Reg::R1,
    Reg::LR,
];

/// A symbolic register. Identifiers are never reused inside one routine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Sym(u32);

impl Sym {
    #[inline]
    pub const fn id(self) -> u32 {
        self.0
    }
}

/// Maps symbolic registers to host registers.
pub trait RegisterBinding {
    fn bind(&mut self, sym: Sym) -> Result<Reg, GenError>;
}

/// Fixed, deterministic binding onto [`POOL`].
#[derive(Debug, Clone, Copy, Default)]
pub struct ReferenceBinding;

impl RegisterBinding for ReferenceBinding {
    fn bind(&mut self, sym: Sym) -> Result<Reg, GenError> {
        POOL.get(sym.0 as usize).copied().ok_or(GenError::RegisterPressure {
            wanted: sym.0 + 1,
            available: POOL.len(),
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Bank {
    Data,
    Addr,
}

impl Bank {
    pub const fn base(self) -> i32 {
        match self {
            Bank::Data => DREG_BASE,
            Bank::Addr => AREG_BASE,
        }
    }
}

pub struct Ctx<'e> {
    pub entry: &'e OpcodeEntry,
    pub variant: Variant,
    pub hf: HostFeatures,
    pub flags: RoutineFlags,
    buf: CodeBuffer,
    binding: Box<dyn RegisterBinding + 'e>,
    next_sym: u32,
    fixups: Vec<Fixup>,
    guards: Vec<Guard>,
    ext_at: u8,
    failed: Option<&'static str>,
}

impl<'e> Ctx<'e> {
    pub fn new(entry: &'e OpcodeEntry, variant: Variant, env: &GenEnv) -> Self {
        Self::with_binding(entry, variant, env, Box::new(ReferenceBinding))
    }

    pub fn with_binding(
        entry: &'e OpcodeEntry,
        variant: Variant,
        env: &GenEnv,
        binding: Box<dyn RegisterBinding + 'e>,
    ) -> Self {
        Self {
            entry,
            variant,
            hf: env.host,
            flags: RoutineFlags::empty(),
            buf: CodeBuffer::new(env.capacity),
            binding,
            next_sym: 0,
            fixups: Vec::new(),
            guards: Vec::new(),
            ext_at: entry.lead_words,
            failed: None,
        }
    }

    /// Appending view of the routine's buffer.
    #[inline]
    pub fn asm(&mut self) -> Assembler<'_> {
        Assembler::new(&mut self.buf)
    }

    #[inline]
    pub fn ff(&self) -> bool {
        self.variant == Variant::Ff
    }

    #[inline]
    pub fn pos(&self) -> usize {
        self.buf.offset()
    }

    pub fn size(&self) -> Result<Size, GenError> {
        self.entry.size.ok_or(GenError::BadOperand("entry has no operand size"))
    }

    /// A fresh symbolic register, bound to a host register.
    pub fn scratch(&mut self) -> Result<Reg, GenError> {
        let sym = Sym(self.next_sym);
        self.next_sym += 1;
        self.binding.bind(sym)
    }

    /// Symbolic registers allocated so far.
    pub fn syms(&self) -> u32 {
        self.next_sym
    }

    /// Reserve `n` extension words and return the index of the first.
    pub fn take_ext(&mut self, n: u8) -> u8 {
        let at = self.ext_at;
        self.ext_at += n;
        at
    }

    /// Load a translation-time value into `rd` through a patched literal slot.
    pub fn literal(&mut self, rd: Reg, value: LitValue) -> Result<(), GenError> {
        let slot = self.asm().load_literal(rd, 0)?;
        self.fixups.push(Fixup::Literal { slot: slot as u32, value });
        Ok(())
    }

    pub fn fixup(&mut self, f: Fixup) {
        self.fixups.push(f);
    }

    /// Add a may-fail check.
    pub fn guard(&mut self, g: Guard) {
        if !self.guards.contains(&g) {
            self.guards.push(g);
        }
    }

    /// Give up on this opcode. Always `Ok`: failing is a result, not an error.
    pub fn fail(&mut self, reason: &'static str) -> Result<(), GenError> {
        debug!(opcode = format_args!("{:#06x}", self.entry.opcode), variant = %self.variant, reason, "hole");
        self.failed = Some(reason);
        Ok(())
    }

    #[inline]
    pub fn is_failed(&self) -> bool {
        self.failed.is_some()
    }

    fn slot(&self, bank: Bank, r: RegRef) -> (i32, Option<u8>) {
        if r.is_field() {
            (bank.base(), Some(r.field))
        } else {
            (bank.base() + 4 * r.n as i32, None)
        }
    }

    fn note_slot(&mut self, at: usize, field: Option<u8>) {
        if let Some(field) = field {
            self.fixups.push(Fixup::RegSlot { at: at as u32, field });
        }
    }

    /// `LDR rd, <guest register>`
    pub fn load_reg(&mut self, rd: Reg, bank: Bank, r: RegRef) -> Result<(), GenError> {
        let (off, field) = self.slot(bank, r);
        let at = self.pos();
        self.asm().ldr(rd, REGS, off)?;
        self.note_slot(at, field);
        Ok(())
    }

    /// Store the low `w` bits of `rs` into a guest register, keeping the rest of it.
    pub fn store_reg(&mut self, rs: Reg, bank: Bank, r: RegRef, w: Width) -> Result<(), GenError> {
        let (off, field) = self.slot(bank, r);
        let at = self.pos();
        {
            let mut a = self.asm();
            match w {
                Width::B8 => a.strb(rs, REGS, off)?,
                Width::B16 => a.strh(rs, REGS, off)?,
                Width::B32 => a.str(rs, REGS, off)?,
            }
        }
        self.note_slot(at, field);
        Ok(())
    }

    /// Emit `ADD/SUB rd, rn, #step` for an address register step of `size`. Byte steps
    /// of a register taken from an opcode field get patched to 2 for A7.
    pub fn step(&mut self, rd: Reg, rn: Reg, r: RegRef, size: Size, down: bool) -> Result<(), GenError> {
        let bytes = match size {
            Size::Byte if !r.is_field() && r.n == 7 => 2,
            s => s.bytes(),
        };
        let at = self.pos();
        {
            let mut a = self.asm();
            let n = crate::encoder::imm(bytes);
            if down {
                a.sub(rd, rn, n)?;
            } else {
                a.add(rd, rn, n)?;
            }
        }
        if size == Size::Byte && r.is_field() {
            self.fixups.push(Fixup::StackStep { at: at as u32, field: r.field });
        }
        Ok(())
    }

    /// Close the routine.
    pub fn finish(self) -> Routine {
        let ext_words = self.entry.ext_words();
        let mut flags = self.flags;
        if ext_words > 0 {
            flags |= RoutineFlags::WIDE;
        }
        let opcode = self.entry.opcode;
        if self.failed.is_some() {
            return Routine::hole(opcode, self.variant, flags);
        }
        let may_fail = !self.guards.is_empty();
        let template = Template {
            words: self.buf.finalize(),
            fixups: self.fixups,
            guards: self.guards,
            ext_words,
        };
        Routine { opcode, variant: self.variant, flags, may_fail, body: Body::Template(template) }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::guest::table::decode;

    #[test]
    fn reference_binding_runs_out() {
        let e = decode(0x4E71);
        let mut ctx = Ctx::new(&e, Variant::Ff, &GenEnv::default());
        let regs: Vec<Reg> = (0..POOL.len()).map(|_| ctx.scratch().unwrap()).collect();
        assert_eq!(regs, POOL.to_vec());
        assert_eq!(
            ctx.scratch(),
            Err(GenError::RegisterPressure { wanted: 11, available: 10 })
        );
    }

    #[test]
    fn field_registers_leave_a_fixup() {
        let e = decode(0xD041);
        let mut ctx = Ctx::new(&e, Variant::Nf, &GenEnv::default());
        ctx.load_reg(Reg::R4, Bank::Addr, RegRef::at(0x0003, 0)).unwrap();
        ctx.load_reg(Reg::R4, Bank::Addr, RegRef::implied(7)).unwrap();
        let r = ctx.finish();
        let t = r.template().unwrap();
        // ldr r4, [r11, #32] ; ldr r4, [r11, #60]
        assert_eq!(t.words, vec![0xe59b_4020, 0xe59b_403c]);
        assert_eq!(t.fixups, vec![Fixup::RegSlot { at: 0, field: 0 }]);
    }
}
