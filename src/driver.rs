//! Walks the opcode space, generates both variants of every routine and serializes
//! them into the dispatch tables and the routine source.
//!
//! Opcodes whose templates come out identical (same words, fixups, guards, metadata)
//! share one routine: the first opcode generating it is the leader and names the
//! function, the others point their table entry at it. Every routine takes the opcode
//! word, so register fields are resolved at translation time.

use crate::codegen::{self, symbol, Fixup, Routine, RoutineFlags, Template, Variant};
use crate::config::{ConfigError, GenConfig};
use crate::guest::table::{DecodeTable, TableError, OPCODES};
use crate::guest::{Mnemonic, OpcodeEntry};
use crate::host::disasm;
use bitvec::prelude::*;
use std::collections::{HashMap, HashSet};
use std::fmt::Write as _;
use std::path::Path;
use tracing::{debug, info};

#[derive(thiserror::Error, Debug)]
pub enum DriverError {
    #[error("inconsistent decode table: {0}")]
    InconsistentTable(#[from] TableError),
    #[error("routine {symbol} emitted twice")]
    Collision { symbol: String },
    #[error("writing {path}: {source}")]
    Io { path: String, #[source] source: std::io::Error },
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("formatting output: {0}")]
    Format(#[from] std::fmt::Error),
}

/// One row of a dispatch table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TableEntry {
    pub opcode: u16,
    pub mnemonic: Mnemonic,
    pub flags: RoutineFlags,
    /// Opcode of the leader whose routine handles this one; `None` for a hole.
    pub handler: Option<u16>,
}

/// A routine that gets its own function in the output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Leader {
    pub mnemonic: Mnemonic,
    pub routine: Routine,
}

#[derive(Debug, Clone)]
pub struct VariantTable {
    pub variant: Variant,
    pub entries: Vec<TableEntry>,
    pub leaders: Vec<Leader>,
    /// Opcodes with a routine.
    pub covered: BitVec,
}

impl VariantTable {
    pub fn holes(&self) -> usize {
        self.entries.iter().filter(|e| e.handler.is_none()).count()
    }

    pub fn entry(&self, opcode: u16) -> Option<&TableEntry> {
        self.entries
            .binary_search_by_key(&opcode, |e| e.opcode)
            .ok()
            .map(|i| &self.entries[i])
    }

    pub fn leader(&self, opcode: u16) -> Option<&Leader> {
        self.leaders.iter().find(|l| l.routine.opcode == opcode)
    }
}

#[derive(Debug, Clone)]
pub struct Generated {
    pub ff: VariantTable,
    pub nf: VariantTable,
}

impl Generated {
    pub fn tables(&self) -> [&VariantTable; 2] {
        [&self.ff, &self.nf]
    }
}

/// The three generated sources.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Artifacts {
    pub header: String,
    pub table: String,
    pub routines: String,
}

impl Artifacts {
    pub fn write_to(&self, dir: impl AsRef<Path>, cfg: &GenConfig) -> Result<(), DriverError> {
        let dir = dir.as_ref();
        for (name, text) in [
            (&cfg.output.header, &self.header),
            (&cfg.output.table, &self.table),
            (&cfg.output.routines, &self.routines),
        ] {
            let path = dir.join(name);
            std::fs::write(&path, text)
                .map_err(|source| DriverError::Io { path: path.display().to_string(), source })?;
            debug!(path = %path.display(), bytes = text.len(), "wrote");
        }
        Ok(())
    }
}

pub struct Generator<'a> {
    table: &'a DecodeTable,
    config: &'a GenConfig,
    hand_written: Vec<Mnemonic>,
}

impl<'a> Generator<'a> {
    pub fn new(table: &'a DecodeTable, config: &'a GenConfig) -> Result<Self, DriverError> {
        table.validate()?;
        config.check()?;
        let hand_written = config.hand_written_mnemonics()?;
        Ok(Self { table, config, hand_written })
    }

    /// Whether the opcode gets a table entry at all.
    pub fn selected(&self, e: &OpcodeEntry) -> bool {
        !e.is_illegal() && e.clev <= self.config.cpu_level && !self.hand_written.contains(&e.mnemonic)
    }

    pub fn generate_variant(&self, variant: Variant) -> Result<VariantTable, DriverError> {
        let mut entries = Vec::new();
        let mut leaders: Vec<Leader> = Vec::new();
        let mut by_body: HashMap<(Template, RoutineFlags, bool), u16> = HashMap::new();
        let mut symbols = HashSet::new();
        let mut covered = bitvec![0; OPCODES];

        for e in self.table.iter().filter(|e| self.selected(e)) {
            let r = codegen::generate(e, variant, &self.config.env);
            let handler = match r.template() {
                None => {
                    debug!(opcode = format_args!("{:#06x}", e.opcode), %variant, mnemonic = e.mnemonic.name(), "hole");
                    None
                }
                Some(t) => {
                    covered.set(e.opcode as usize, true);
                    let key = (t.clone(), r.flags, r.may_fail);
                    match by_body.get(&key) {
                        Some(&leader) => Some(leader),
                        None => {
                            if !symbols.insert(r.symbol()) {
                                return Err(DriverError::Collision { symbol: r.symbol() });
                            }
                            by_body.insert(key, e.opcode);
                            leaders.push(Leader { mnemonic: e.mnemonic, routine: r.clone() });
                            Some(e.opcode)
                        }
                    }
                }
            };
            entries.push(TableEntry { opcode: e.opcode, mnemonic: e.mnemonic, flags: r.flags, handler });
        }

        let table = VariantTable { variant, entries, leaders, covered };
        info!(
            %variant,
            entries = table.entries.len(),
            translated = table.covered.count_ones(),
            holes = table.holes(),
            routines = table.leaders.len(),
            "variant generated"
        );
        Ok(table)
    }

    pub fn generate(&self) -> Result<Generated, DriverError> {
        Ok(Generated { ff: self.generate_variant(Variant::Ff)?, nf: self.generate_variant(Variant::Nf)? })
    }

    pub fn artifacts(&self, g: &Generated) -> Result<Artifacts, DriverError> {
        Ok(Artifacts {
            header: header(g)?,
            table: dispatch_tables(g)?,
            routines: routines(g, self.config.parts, self.config.annotate)?,
        })
    }

    /// Generate and serialize in one go.
    pub fn run(&self) -> Result<(Generated, Artifacts), DriverError> {
        let g = self.generate()?;
        let a = self.artifacts(&g)?;
        Ok((g, a))
    }
}

const BANNER: &str = "/* Generated by gencomp. Do not edit. */\n";

const INCLUDES: &[&str] = &[
    "sysdeps.h",
    "m68k.h",
    "memory.h",
    "readcpu.h",
    "newcpu.h",
    "comptbl.h",
    "debug.h",
];

fn includes(out: &mut String, extra: &[&str]) -> std::fmt::Result {
    for f in INCLUDES.iter().chain(extra) {
        writeln!(out, "#include \"{f}\"")?;
    }
    Ok(())
}

fn table_symbol(v: Variant) -> String {
    format!("op_smalltbl_0_comp_{}", v.tag())
}

fn header(g: &Generated) -> Result<String, std::fmt::Error> {
    let mut out = String::from(BANNER);
    for v in [Variant::Nf, Variant::Ff] {
        writeln!(out, "extern const struct comptbl {}[];", table_symbol(v))?;
    }
    for t in g.tables() {
        for l in &t.leaders {
            writeln!(out, "extern compop_func {};", l.routine.symbol())?;
        }
    }
    Ok(out)
}

fn dispatch_tables(g: &Generated) -> Result<String, std::fmt::Error> {
    let mut out = String::from(BANNER);
    includes(&mut out, &[])?;
    for t in g.tables() {
        writeln!(out, "const struct comptbl {}[] = {{", table_symbol(t.variant))?;
        for e in &t.entries {
            let name = e.mnemonic.name();
            match e.handler {
                Some(leader) => writeln!(
                    out,
                    "{{ {}, {}, 0x{:08x} }}, /* {name} */",
                    symbol(leader, t.variant),
                    e.opcode,
                    e.flags.bits()
                )?,
                None => writeln!(
                    out,
                    "{{ NULL, 0x{:08x}, {} }}, /* {name} */",
                    e.opcode,
                    e.flags.bits()
                )?,
            }
        }
        writeln!(out, "{{ 0, 65536, 0 }}}};")?;
    }
    Ok(out)
}

fn routines(g: &Generated, parts: usize, annotate: bool) -> Result<String, std::fmt::Error> {
    let mut out = String::from(BANNER);
    includes(&mut out, &["compiler/compemu.h"])?;
    let all: Vec<&Leader> = g.tables().into_iter().flat_map(|t| t.leaders.iter()).collect();
    let per_part = all.len().div_ceil(parts.max(1)).max(1);
    let mut chunks = all.chunks(per_part);
    for part in 1..=parts {
        writeln!(out, "\n#ifdef PART_{part}")?;
        for l in chunks.next().unwrap_or_default() {
            routine(&mut out, l, annotate)?;
        }
        writeln!(out, "#endif")?;
    }
    Ok(out)
}

fn routine(out: &mut String, l: &Leader, annotate: bool) -> std::fmt::Result {
    let Some(t) = l.routine.template() else { return Ok(()) };
    writeln!(
        out,
        "void REGPARAM2 {}(uae_u32 opcode) /* {} */\n{{",
        l.routine.symbol(),
        l.mnemonic.name()
    )?;
    out.push_str("\tuae_u32 m68k_pc_offset_thisinst=m68k_pc_offset;\n");
    out.push_str("\tm68k_pc_offset+=2;\n");
    let mut ind = "\t";
    if !t.guards.is_empty() {
        for g in &t.guards {
            writeln!(out, "\tif ({}) FAIL(1);", g.c_condition())?;
        }
        out.push_str("\tif (!failure) {\n");
        ind = "\t\t";
    }
    if !t.words.is_empty() {
        let data: Vec<usize> = t
            .fixups
            .iter()
            .filter_map(|f| match *f {
                Fixup::Literal { slot, .. } => Some(slot as usize),
                _ => None,
            })
            .collect();
        writeln!(out, "{ind}static const uae_u32 code[{}] = {{", t.words.len())?;
        for (i, &w) in t.words.iter().enumerate() {
            if !annotate {
                writeln!(out, "{ind}\t0x{w:08x},")?;
            } else if data.contains(&i) {
                writeln!(out, "{ind}\t0x{w:08x}, /* literal */")?;
            } else {
                writeln!(out, "{ind}\t0x{w:08x}, /* {} */", disasm::disassemble(w))?;
            }
        }
        writeln!(out, "{ind}}};")?;
        writeln!(out, "{ind}uae_u32 *w = comp_emit_words(code, {});", t.words.len())?;
        for f in &t.fixups {
            match *f {
                Fixup::RegSlot { at, field } => {
                    writeln!(out, "{ind}comp_fix_regslot(w + {at}, opcode, {field});")?
                }
                Fixup::StackStep { at, field } => {
                    writeln!(out, "{ind}comp_fix_stackstep(w + {at}, opcode, {field});")?
                }
                Fixup::Literal { slot, value } => {
                    writeln!(out, "{ind}comp_fix_literal(w + {slot}, {});", value.c_expr())?
                }
            }
        }
    }
    if t.ext_words > 0 {
        writeln!(out, "{ind}m68k_pc_offset+={};", t.ext_bytes())?;
    }
    if !t.guards.is_empty() {
        out.push_str("\t}\n");
    }
    if l.routine.may_fail {
        out.push_str("\tif (failure)  m68k_pc_offset=m68k_pc_offset_thisinst;\n");
    }
    out.push_str("}\n");
    Ok(())
}
