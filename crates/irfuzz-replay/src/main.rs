//! Replay a recorded transformation sequence against a module.
//!
//! ```text
//! irfuzz-replay <module.json> <records.json> [--facts facts.json] [--config config.json] [-o|--out out.json] [--log-json]
//! ```
//!
//! The transformed module is written as JSON to `--out`, or to stdout.

mod telemetry;

use anyhow::{Context, Result};
use clap::Parser;
use irfuzz_core::SessionConfig;
use irfuzz_ir::Module;
use irfuzz_transform::{Fact, Session, TransformationRecord};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{error, info};

/// Replay recorded transformations against a module
#[derive(Parser, Debug)]
#[command(version, about)]
struct Args {
    /// Module to transform (.json)
    module: PathBuf,

    /// Transformation records to replay (.json)
    records: PathBuf,

    /// Initial facts (.json list)
    #[arg(long)]
    facts: Option<PathBuf>,

    /// Session configuration (.json)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Where to write the transformed module; stdout if omitted
    #[arg(long, short)]
    out: Option<PathBuf>,

    /// Log one JSON object per event
    #[arg(long)]
    log_json: bool,
}

fn read(path: &Path) -> Result<String> {
    fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))
}

fn run(args: &Args) -> Result<()> {
    let config: SessionConfig = match &args.config {
        Some(path) => serde_json::from_str(&read(path)?).context("parsing session config")?,
        None => SessionConfig::default(),
    };
    let module = Module::from_json(&read(&args.module)?).context("parsing module")?;
    let records = TransformationRecord::sequence_from_json(&read(&args.records)?).context("parsing records")?;

    info!(
        module = %args.module.display(),
        records = records.len(),
        "Starting replay"
    );

    let mut session = Session::new(module, config);
    if let Some(path) = &args.facts {
        let facts: Vec<Fact> = serde_json::from_str(&read(path)?).context("parsing facts")?;
        info!(count = facts.len(), "Loaded initial facts");
        session.add_facts(facts);
    }

    let total = records.len();
    let applied = session.replay(records)?;
    info!(applied, skipped = total - applied, "Replay complete");

    let output = session.module().to_json()?;
    match &args.out {
        Some(path) => fs::write(path, output).with_context(|| format!("writing {}", path.display()))?,
        None => println!("{output}"),
    }
    Ok(())
}

fn main() -> Result<()> {
    let args = Args::parse();
    telemetry::init_telemetry(args.log_json)?;

    if let Err(e) = run(&args) {
        error!("Replay failed: {:#}", e);
        return Err(e);
    }
    Ok(())
}
