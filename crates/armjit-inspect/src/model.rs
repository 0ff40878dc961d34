use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

use m68k_armjit::codegen::{Fixup, Guard, Routine, Variant};
use m68k_armjit::guest::OpcodeEntry;
use m68k_armjit::host::{disasm, GuestState, Machine};

/// Serializable view of one generated routine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RoutineView {
    pub opcode: u16,
    pub instruction: String,
    pub variant: Variant,
    pub symbol: String,
    pub flags: Vec<String>,
    pub may_fail: bool,
    pub failed: bool,
    pub ext_words: u8,
    pub words: Vec<u32>,
    pub listing: Vec<String>,
    pub fixups: Vec<Fixup>,
    pub guards: Vec<Guard>,
}

impl RoutineView {
    pub fn new(entry: &OpcodeEntry, r: &Routine) -> Self {
        let (words, fixups, guards, ext_words) = match r.template() {
            Some(t) => (t.words.clone(), t.fixups.clone(), t.guards.clone(), t.ext_words),
            None => (Vec::new(), Vec::new(), Vec::new(), entry.ext_words()),
        };
        let data: Vec<usize> = fixups
            .iter()
            .filter_map(|f| match f {
                Fixup::Literal { slot, .. } => Some(*slot as usize),
                _ => None,
            })
            .collect();
        Self {
            opcode: r.opcode,
            instruction: entry.to_string(),
            variant: r.variant,
            symbol: r.symbol(),
            flags: r.flags.iter_names().map(|(n, _)| n.to_string()).collect(),
            may_fail: r.may_fail,
            failed: r.is_failed(),
            ext_words,
            listing: disasm::listing(&words, &data),
            words,
            fixups,
            guards,
        }
    }

    pub fn render(&self) -> String {
        let mut s = format!(
            "{} ({:#06x}) {}  flags=[{}]{}{}\n",
            self.symbol,
            self.opcode,
            self.instruction,
            self.flags.join("|"),
            if self.may_fail { " may-fail" } else { "" },
            if self.ext_words > 0 { format!(" ext={}", self.ext_words) } else { String::new() },
        );
        if self.failed {
            s.push_str("  <hole: left to the interpreter>\n");
            return s;
        }
        for g in &self.guards {
            s.push_str(&format!("  guard {g:?}\n"));
        }
        for f in &self.fixups {
            s.push_str(&format!("  fixup {f:?}\n"));
        }
        for line in &self.listing {
            s.push_str("  ");
            s.push_str(line);
            s.push('\n');
        }
        s
    }
}

/// A block of guest memory to preload, at a guest address.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Poke {
    pub addr: u32,
    pub bytes: Vec<u8>,
}

/// Input of the `run` command: guest state plus memory contents.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RunSpec {
    pub state: GuestState,
    pub memory: Vec<Poke>,
}

impl RunSpec {
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading {}", path.display()))?;
        Ok(serde_json::from_str(&text)?)
    }

    pub fn apply(&self, m: &mut Machine) -> Result<()> {
        for p in &self.memory {
            m.guest_write(p.addr, &p.bytes)?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct RunOutcome {
    pub before: GuestState,
    pub after: GuestState,
}

pub fn parse_u32(s: &str) -> Result<u32> {
    let s = s.trim();
    if let Some(hex) = s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        Ok(u32::from_str_radix(hex, 16)?)
    } else {
        Ok(s.parse::<u32>()?)
    }
}

pub fn parse_u16(s: &str) -> Result<u16> {
    let v = parse_u32(s)?;
    u16::try_from(v).with_context(|| format!("{s} does not fit in 16 bits"))
}

pub fn render_state(s: &GuestState) -> String {
    let regs = |bank: char, r: &[u32; 8]| {
        r.iter()
            .enumerate()
            .map(|(i, v)| format!("{bank}{i}={v:08x}"))
            .collect::<Vec<_>>()
            .join(" ")
    };
    let flag = |on: bool, c: char| if on { c } else { '-' };
    format!(
        "{}\n{}\npc={:08x} x={} nzvc={}{}{}{}",
        regs('d', &s.d),
        regs('a', &s.a),
        s.pc,
        s.x as u8,
        flag(s.ccr.contains(m68k_armjit::host::Cpsr::N), 'N'),
        flag(s.ccr.contains(m68k_armjit::host::Cpsr::Z), 'Z'),
        flag(s.ccr.contains(m68k_armjit::host::Cpsr::V), 'V'),
        flag(s.ccr.contains(m68k_armjit::host::Cpsr::C), 'C'),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use m68k_armjit::codegen::{generate, GenEnv};
    use m68k_armjit::guest::table::decode;
    use pretty_assertions::assert_eq;

    #[test]
    fn parse_hex_and_dec() {
        assert_eq!(parse_u32("0x10").unwrap(), 0x10);
        assert_eq!(parse_u32("16").unwrap(), 16);
        assert!(parse_u32("zz").is_err());
        assert!(parse_u16("0x10000").is_err());
    }

    #[test]
    fn views_of_holes_and_templates() {
        let env = GenEnv::default();
        let e = decode(0xC100);
        let hole = RoutineView::new(&e, &generate(&e, Variant::Ff, &env));
        assert!(hole.failed);
        assert!(hole.render().contains("<hole"));

        let e = decode(0x6004);
        let v = RoutineView::new(&e, &generate(&e, Variant::Nf, &env));
        assert_eq!(v.flags, vec!["JUMP".to_string()]);
        assert!(v.listing[2].ends_with(".word 0x00000000"));
    }

    #[test]
    fn run_spec_defaults() {
        let spec: RunSpec = serde_json::from_str(r#"{ "memory": [{ "addr": 16, "bytes": [1, 2] }] }"#).unwrap();
        assert_eq!(spec.state, GuestState::default());
        assert_eq!(spec.memory[0].bytes, vec![1, 2]);
    }
}
