use super::decoder::Decoder;
use super::exec::Executor;
use super::memory::Bus;
use crate::encoder::Reg;
use anyhow::Error;
use bitflags::bitflags;
use serde::{Deserialize, Serialize};

bitflags! {
    /// The modelled part of the CPSR: the condition flags.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
    pub struct Cpsr: u32 {
        const N = 1 << 31;
        const Z = 1 << 30;
        const C = 1 << 29;
        const V = 1 << 28;
    }
}

#[derive(thiserror::Error, Debug)]
pub enum Trap {
    #[error("invalid instruction {word:#010x} at {pc:#010x}")]
    InvalidInstruction { pc: u32, word: u32 },
    #[error("unaligned fetch at {addr:#010x}")]
    Unaligned { addr: u32 },
    #[error("bus error at {addr:#010x}: {source}")]
    Bus { addr: u32, #[source] source: Error },
    #[error("no exit after {limit} steps")]
    StepLimit { limit: u64 },
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Cpu {
    /// Address of the next instruction to fetch.
    pub pc: u32,
    /// R0..R14. Slot 15 is unused: reads of PC go through [`Cpu::reg`].
    pub r: [u32; 16],
    pub cpsr: Cpsr,
}

impl Cpu {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reset(&mut self, reset_pc: u32) {
        self.pc = reset_pc;
    }

    /// Register read as an instruction sees it; PC reads as its own address plus 8.
    #[inline]
    pub fn reg(&self, r: Reg) -> u32 {
        match r.index() {
            15 => self.pc.wrapping_add(4),
            n => self.r[n as usize],
        }
    }

    #[inline]
    pub fn set_reg(&mut self, r: Reg, v: u32) {
        match r.index() {
            15 => self.pc = v & !3,
            n => self.r[n as usize] = v,
        }
    }

    pub fn step<B: Bus, D: Decoder, X: Executor>(
        &mut self,
        bus: &mut B,
        dec: &D,
        exec: &X,
    ) -> Result<(), Trap> {
        let pc = self.pc;
        if pc % 4 != 0 {
            return Err(Trap::Unaligned { addr: pc });
        }
        let word = bus
            .read_u32(pc)
            .map_err(|source| Trap::Bus { addr: pc, source })?;
        let d = dec.decode(word).ok_or(Trap::InvalidInstruction { pc, word })?;
        self.pc = pc.wrapping_add(4);
        exec.exec(self, bus, d)
    }

    /// Step until the PC reaches `exit`, at most `limit` instructions.
    pub fn run_until<B: Bus, D: Decoder, X: Executor>(
        &mut self,
        bus: &mut B,
        dec: &D,
        exec: &X,
        exit: u32,
        limit: u64,
    ) -> Result<u64, Trap> {
        let mut steps = 0;
        while self.pc != exit {
            if steps == limit {
                return Err(Trap::StepLimit { limit });
            }
            self.step(bus, dec, exec)?;
            steps += 1;
        }
        Ok(steps)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::{A32Decoder, IntExecutor, LinearMemory};

    #[test]
    fn literal_load_and_skip() {
        let mut mem = LinearMemory::new(64);
        // ldr r4,[pc,#0] ; b +0 ; .word 0x12345678
        for (i, w) in [0xe59f_4000u32, 0xea00_0000, 0x1234_5678].iter().enumerate() {
            mem.write_u32(4 * i as u32, *w).unwrap();
        }
        let mut cpu = Cpu::new();
        let steps = cpu.run_until(&mut mem, &A32Decoder, &IntExecutor, 12, 10).unwrap();
        assert_eq!(steps, 2);
        assert_eq!(cpu.r[4], 0x1234_5678);
    }

    #[test]
    fn runaway_code_hits_the_step_limit() {
        let mut mem = LinearMemory::new(16);
        // b . (branch to self)
        mem.write_u32(0, 0xeaff_fffe).unwrap();
        let mut cpu = Cpu::new();
        assert!(matches!(
            cpu.run_until(&mut mem, &A32Decoder, &IntExecutor, 4, 100),
            Err(Trap::StepLimit { limit: 100 })
        ));
    }
}
