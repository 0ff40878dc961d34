pub mod codegen;
pub mod cond;
pub mod config;
pub mod driver;
pub mod encoder;
pub mod guest;
pub mod host;
pub mod selftest;

pub use codegen::{generate, GenEnv, Routine, RoutineFlags, Template, Variant};
pub use cond::Cond;
pub use config::GenConfig;
pub use driver::{Artifacts, DriverError, Generator};
pub use encoder::{Assembler, CodeBuffer, EncodeError, Reg};
pub use guest::table::DecodeTable;
pub use host::{GuestState, Machine};
