//! Runs generated routines on the host model against a guest state.
//!
//! Host memory layout:
//!
//! | range | use |
//! |---|---|
//! | `REGFILE_BASE..+72` | guest register file, R11 points here |
//! | `CODE_BASE..` | the routine under test, entered at its first word |
//! | `..STACK_TOP` | host stack |
//! | `GUEST_BASE..+GUEST_SIZE` | guest memory (big-endian), R10 points here |
//!
//! A routine is done when the host PC reaches the word after its last one.

use super::cpu::{Cpsr, Cpu, Trap};
use super::decoder::A32Decoder;
use super::exec::IntExecutor;
use super::memory::{Bus, LinearMemory};
use crate::codegen::{
    InstantiateError, Routine, RoutineFlags, AREG_BASE, DREG_BASE, MEM, PC_SLOT, REGS, X_SLOT,
};
use crate::encoder::Reg;
use serde::{Deserialize, Serialize};
use tracing::trace;

pub const REGFILE_BASE: u32 = 0x100;
pub const CODE_BASE: u32 = 0x1000;
pub const STACK_TOP: u32 = 0xF000;
pub const GUEST_BASE: u32 = 0x1_0000;
pub const GUEST_SIZE: u32 = 0x1_0000;
pub const DEFAULT_STEP_LIMIT: u64 = 10_000;

const _: () = assert!(DREG_BASE >= 0 && AREG_BASE >= 0 && PC_SLOT >= 0 && X_SLOT >= 0);

/// Architectural guest state around one instruction. `ccr.C` is the guest carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct GuestState {
    pub d: [u32; 8],
    pub a: [u32; 8],
    pub pc: u32,
    pub x: bool,
    pub ccr: Cpsr,
}

#[derive(thiserror::Error, Debug)]
pub enum MachineError {
    #[error("opcode {opcode:#06x} has no routine")]
    Hole { opcode: u16 },
    #[error(transparent)]
    Instantiate(#[from] InstantiateError),
    #[error(transparent)]
    Trap(#[from] Trap),
    #[error("routine of {words} words does not fit the code area")]
    CodeTooLarge { words: usize },
    #[error("host stack pointer is {sp:#x} after the routine")]
    StackImbalance { sp: u32 },
    #[error("routine changed reserved host register {reg}")]
    Clobbered { reg: Reg },
    #[error(transparent)]
    Memory(#[from] anyhow::Error),
}

#[derive(Debug)]
pub struct Machine {
    pub cpu: Cpu,
    pub mem: LinearMemory,
    pub step_limit: u64,
}

impl Default for Machine {
    fn default() -> Self {
        Self::new()
    }
}

impl Machine {
    pub fn new() -> Self {
        Self {
            cpu: Cpu::new(),
            mem: LinearMemory::new((GUEST_BASE + GUEST_SIZE) as usize),
            step_limit: DEFAULT_STEP_LIMIT,
        }
    }

    pub fn with_step_limit(mut self, limit: u64) -> Self {
        self.step_limit = limit;
        self
    }

    pub fn guest_write(&mut self, addr: u32, bytes: &[u8]) -> anyhow::Result<()> {
        self.mem
            .bytes_mut(GUEST_BASE.wrapping_add(addr), bytes.len())?
            .copy_from_slice(bytes);
        Ok(())
    }

    pub fn guest_write_u16(&mut self, addr: u32, v: u16) -> anyhow::Result<()> {
        self.guest_write(addr, &v.to_be_bytes())
    }

    pub fn guest_write_u32(&mut self, addr: u32, v: u32) -> anyhow::Result<()> {
        self.guest_write(addr, &v.to_be_bytes())
    }

    pub fn guest_read_u8(&self, addr: u32) -> anyhow::Result<u8> {
        Ok(self.mem.bytes(GUEST_BASE.wrapping_add(addr), 1)?[0])
    }

    pub fn guest_read_u16(&self, addr: u32) -> anyhow::Result<u16> {
        let b = self.mem.bytes(GUEST_BASE.wrapping_add(addr), 2)?;
        Ok(u16::from_be_bytes([b[0], b[1]]))
    }

    pub fn guest_read_u32(&self, addr: u32) -> anyhow::Result<u32> {
        let b = self.mem.bytes(GUEST_BASE.wrapping_add(addr), 4)?;
        Ok(u32::from_be_bytes([b[0], b[1], b[2], b[3]]))
    }

    /// Host address of a register-file offset. Offsets are non-negative constants.
    fn slot(off: i32) -> u32 {
        debug_assert!(off >= 0, "negative register-file offset {off}");
        REGFILE_BASE + off as u32
    }

    fn load_state(&mut self, s: &GuestState) -> anyhow::Result<()> {
        for i in 0..8 {
            self.mem.write_u32(Self::slot(DREG_BASE) + 4 * i as u32, s.d[i])?;
            self.mem.write_u32(Self::slot(AREG_BASE) + 4 * i as u32, s.a[i])?;
        }
        self.mem.write_u32(Self::slot(PC_SLOT), s.pc)?;
        self.mem.write_u32(Self::slot(X_SLOT), s.x as u32)?;
        self.cpu.cpsr = s.ccr;
        Ok(())
    }

    fn read_state(&mut self) -> anyhow::Result<GuestState> {
        let mut s = GuestState::default();
        for i in 0..8 {
            s.d[i] = self.mem.read_u32(Self::slot(DREG_BASE) + 4 * i as u32)?;
            s.a[i] = self.mem.read_u32(Self::slot(AREG_BASE) + 4 * i as u32)?;
        }
        s.pc = self.mem.read_u32(Self::slot(PC_SLOT))?;
        s.x = self.mem.read_u8(Self::slot(X_SLOT))? != 0;
        s.ccr = self.cpu.cpsr;
        Ok(s)
    }

    /// Run raw host words with the runtime register convention set up. Returns the
    /// number of host instructions executed.
    pub fn run_code(&mut self, words: &[u32]) -> Result<u64, MachineError> {
        let end = CODE_BASE + 4 * words.len() as u32;
        if end > STACK_TOP - 0x1000 {
            return Err(MachineError::CodeTooLarge { words: words.len() });
        }
        for (i, w) in words.iter().enumerate() {
            self.mem.write_u32(CODE_BASE + 4 * i as u32, *w)?;
        }
        self.cpu.reset(CODE_BASE);
        self.cpu.set_reg(MEM, GUEST_BASE);
        self.cpu.set_reg(REGS, REGFILE_BASE);
        self.cpu.set_reg(Reg::SP, STACK_TOP);
        let steps =
            self.cpu.run_until(&mut self.mem, &A32Decoder, &IntExecutor, end, self.step_limit)?;
        trace!(steps, words = words.len(), "routine finished");
        let sp = self.cpu.reg(Reg::SP);
        if sp != STACK_TOP {
            return Err(MachineError::StackImbalance { sp });
        }
        for (reg, want) in [(MEM, GUEST_BASE), (REGS, REGFILE_BASE)] {
            if self.cpu.reg(reg) != want {
                return Err(MachineError::Clobbered { reg });
            }
        }
        Ok(steps)
    }

    /// Execute one guest instruction through its routine. The guest PC advances past
    /// the instruction unless the routine is a jump, which leaves it in the PC slot.
    pub fn execute(
        &mut self,
        routine: &Routine,
        ext: &[u16],
        state: &GuestState,
    ) -> Result<GuestState, MachineError> {
        let template = routine.template().ok_or(MachineError::Hole { opcode: routine.opcode })?;
        let words = template.instantiate(routine.opcode, ext, state.pc)?;
        self.load_state(state)?;
        self.run_code(&words)?;
        let mut out = self.read_state()?;
        if !routine.flags.contains(RoutineFlags::JUMP) {
            out.pc = state.pc.wrapping_add(2 + template.ext_bytes());
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codegen::{generate, GenEnv, Variant};
    use crate::guest::table::decode;

    #[test]
    fn moveq_sets_register_and_flags() {
        let r = generate(&decode(0x72FF), Variant::Ff, &GenEnv::default()); // MOVEQ #-1,D1
        let mut m = Machine::new();
        let s = GuestState { pc: 0x100, ccr: Cpsr::C | Cpsr::V, ..Default::default() };
        let out = m.execute(&r, &[], &s).unwrap();
        assert_eq!(out.d[1], 0xFFFF_FFFF);
        assert_eq!(out.ccr, Cpsr::N);
        assert_eq!(out.pc, 0x102);
    }

    #[test]
    fn slots_cover_the_register_file() {
        assert_eq!(Machine::slot(DREG_BASE), REGFILE_BASE);
        assert_eq!(Machine::slot(X_SLOT), REGFILE_BASE + 68);
    }

    #[test]
    #[cfg(debug_assertions)]
    #[should_panic(expected = "negative register-file offset")]
    fn negative_slots_are_rejected() {
        Machine::slot(-4);
    }

    #[test]
    fn holes_do_not_run() {
        let r = generate(&decode(0xC100), Variant::Ff, &GenEnv::default()); // ABCD
        let mut m = Machine::new();
        assert!(matches!(
            m.execute(&r, &[], &GuestState::default()),
            Err(MachineError::Hole { opcode: 0xC100 })
        ));
    }
}
