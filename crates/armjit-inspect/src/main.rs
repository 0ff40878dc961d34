use anyhow::{bail, Result};
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

use armjit_inspect::{parse_u16, parse_u32, render_state, RoutineView, RunOutcome, RunSpec};
use m68k_armjit::codegen::{generate, GenEnv, Variant};
use m68k_armjit::encoder::HostFeatures;
use m68k_armjit::guest::table::decode;
use m68k_armjit::host::{disasm, Machine};
use m68k_armjit::selftest;

#[derive(Parser, Debug)]
#[command(author, version, about = "Inspect generated 68k translation routines", long_about = None)]
struct Cli {
    /// Emit ARMv5 sequences (no SXT/UXT/REV/PKH)
    #[arg(long, global = true)]
    armv5: bool,
    /// Output format: text or json
    #[arg(long, value_enum, default_value_t = OutputFormat::Text, global = true)]
    format: OutputFormat,
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Show both variants of the routine for an opcode
    Routine {
        /// Opcode (hex or dec)
        opcode: String,
    },
    /// Instantiate a routine and execute it on the host model
    Run {
        /// Opcode (hex or dec)
        opcode: String,
        /// Extension words following the opcode
        #[arg(long = "ext", value_name = "WORD", num_args = 1..)]
        ext: Vec<String>,
        /// Variant to run
        #[arg(long, value_enum, default_value_t = VariantArg::Ff)]
        variant: VariantArg,
        /// JSON file with the initial guest state and memory contents
        #[arg(long, value_name = "FILE")]
        state: Option<PathBuf>,
    },
    /// Disassemble host words
    Disasm {
        /// Words (hex or dec)
        #[arg(required = true)]
        words: Vec<String>,
    },
    /// Run the encoder vectors
    Selftest,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum VariantArg {
    Ff,
    Nf,
}

impl From<VariantArg> for Variant {
    fn from(v: VariantArg) -> Self {
        match v {
            VariantArg::Ff => Variant::Ff,
            VariantArg::Nf => Variant::Nf,
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let env = GenEnv {
        host: if cli.armv5 { HostFeatures::ARMV5 } else { HostFeatures::ARMV6 },
        ..GenEnv::default()
    };

    match cli.cmd {
        Command::Routine { opcode } => {
            let entry = decode(parse_u16(&opcode)?);
            let views: Vec<RoutineView> = Variant::BOTH
                .iter()
                .map(|&v| RoutineView::new(&entry, &generate(&entry, v, &env)))
                .collect();
            match cli.format {
                OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&views)?),
                OutputFormat::Text => {
                    for v in &views {
                        println!("{}", v.render());
                    }
                }
            }
        }
        Command::Run { opcode, ext, variant, state } => {
            let entry = decode(parse_u16(&opcode)?);
            let ext = ext.iter().map(|w| parse_u16(w)).collect::<Result<Vec<_>>>()?;
            let spec = match &state {
                Some(path) => RunSpec::load(path)?,
                None => RunSpec::default(),
            };
            let routine = generate(&entry, variant.into(), &env);
            let mut m = Machine::new();
            spec.apply(&mut m)?;
            let after = m.execute(&routine, &ext, &spec.state)?;
            let outcome = RunOutcome { before: spec.state, after };
            match cli.format {
                OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&outcome)?),
                OutputFormat::Text => {
                    println!("{} {entry}", routine.symbol());
                    println!("before:\n{}", render_state(&outcome.before));
                    println!("after:\n{}", render_state(&outcome.after));
                }
            }
        }
        Command::Disasm { words } => {
            let words = words.iter().map(|w| parse_u32(w)).collect::<Result<Vec<_>>>()?;
            for line in disasm::listing(&words, &[]) {
                println!("{line}");
            }
        }
        Command::Selftest => {
            let report = selftest::run();
            println!("{report}");
            if !report.passed() {
                bail!("{} vector(s) failed", report.failures.len());
            }
        }
    }
    Ok(())
}
