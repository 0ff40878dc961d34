use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;

use m68k_armjit::{DecodeTable, GenConfig, Generator};

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "Generate the 68k to ARM translation routines and dispatch tables"
)]
struct Opts {
    /// Directory receiving comptbl.h, compstbl.cpp and compemu.cpp
    #[arg(short, long, default_value = ".")]
    out_dir: PathBuf,
    /// JSON generator configuration
    #[arg(short, long)]
    config: Option<PathBuf>,
    /// Highest CPU level to translate (0 = 68000 .. 4 = 68040)
    #[arg(long)]
    cpu_level: Option<u8>,
    /// Comment every emitted word with its disassembly
    #[arg(long)]
    annotate: bool,
    /// Emit ARMv5 sequences (no SXT/UXT/REV/PKH)
    #[arg(long)]
    armv5: bool,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let opts = Opts::parse();
    let mut cfg = match &opts.config {
        Some(path) => GenConfig::load(path)?,
        None => GenConfig::default(),
    };
    if let Some(level) = opts.cpu_level {
        cfg.cpu_level = level;
    }
    cfg.annotate |= opts.annotate;
    if opts.armv5 {
        cfg.env.host.armv6 = false;
    }

    let table = DecodeTable::build();
    let gen = Generator::new(&table, &cfg)?;
    let (generated, artifacts) = gen.run()?;
    std::fs::create_dir_all(&opts.out_dir)
        .with_context(|| format!("creating {}", opts.out_dir.display()))?;
    artifacts.write_to(&opts.out_dir, &cfg)?;

    for t in generated.tables() {
        info!(
            variant = %t.variant,
            entries = t.entries.len(),
            holes = t.holes(),
            routines = t.leaders.len(),
            "table written"
        );
    }
    Ok(())
}
