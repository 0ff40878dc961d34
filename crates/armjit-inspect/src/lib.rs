pub mod model;

pub use model::{parse_u16, parse_u32, render_state, Poke, RoutineView, RunOutcome, RunSpec};
