//! Reference host model: an A32 interpreter for the instruction subset the encoder
//! emits, and a harness that runs routines against guest state.

pub mod cpu;
pub mod decoder;
pub mod disasm;
pub mod exec;
pub mod machine;
pub mod memory;

pub use cpu::{Cpsr, Cpu, Trap};
pub use decoder::{A32Decoder, Decoded, Decoder, Insn};
pub use exec::{Executor, IntExecutor};
pub use machine::{GuestState, Machine, MachineError};
pub use memory::{Bus, LinearMemory};
