//! `snow-vm` runner binary. The CLI surface itself is not specified; this
//! is the minimal driver needed to load and run a program, in the same
//! `clap::Parser` + `anyhow::Result` shape the workspace's other driver
//! uses.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;

use snow_vm::{load_program, Engine, VmConfig};

#[derive(Parser)]
#[command(name = "snow-vm")]
#[command(about = "Runs a Snow VM textual instruction file")]
struct Cli {
    /// Path to the instruction file to load and run.
    program: PathBuf,

    /// Optional TOML config file for engine tunables.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Dump the final engine state as JSON to stderr after running.
    #[arg(long)]
    dump_state: bool,
}

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => VmConfig::from_path(path).with_context(|| format!("reading config {}", path.display()))?,
        None => VmConfig::default(),
    };

    let program = load_program(&cli.program).with_context(|| format!("loading program {}", cli.program.display()))?;
    let mut engine = Engine::new(program, config);

    match engine.run() {
        Ok(Some(value)) => {
            if cli.dump_state {
                eprintln!("{}", engine.dump_state());
            }
            println!("{value}");
        }
        Ok(None) => {
            if cli.dump_state {
                eprintln!("{}", engine.dump_state());
            }
        }
        Err(fault) => {
            eprintln!("fault: {fault}");
            eprintln!("{}", engine.dump_state());
            std::process::exit(1);
        }
    }

    Ok(())
}
