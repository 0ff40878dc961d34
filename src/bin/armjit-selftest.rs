use anyhow::{bail, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use m68k_armjit::selftest;

#[derive(Parser, Debug)]
#[command(author, version, about = "Check the A32 encoder against literal vectors")]
struct Opts {
    /// Print every vector with its built and expected words, not only failures
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let opts = Opts::parse();
    if opts.verbose {
        for v in selftest::vectors() {
            println!("{}", v.line());
        }
    }
    let report = selftest::run();
    println!("{report}");
    if !report.passed() {
        bail!("{} vector(s) failed", report.failures.len());
    }
    Ok(())
}
