//! MSX timing model binary.
//!
//! Runs the machine headless for a number of frames and prints its
//! counters. Optionally starts from, or ends with, a JSON save-state.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use emu_msx::{MachineConfig, MachineResult, MachineState, Msx};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "emu-msx", version, about = "Headless MSX timing model")]
struct Args {
    /// Machine configuration (JSON). Defaults to an NTSC machine.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Frames to run.
    #[arg(short, long, default_value_t = 60)]
    frames: u64,

    /// Resume from a save-state.
    #[arg(long)]
    load_state: Option<PathBuf>,

    /// Write a save-state when the run ends.
    #[arg(long)]
    save_state: Option<PathBuf>,

    /// Log at debug level unless RUST_LOG says otherwise.
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> ExitCode {
    let args = Args::parse();
    init_tracing(args.verbose);

    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{e}");
            eprintln!("emu-msx: {e}");
            ExitCode::FAILURE
        }
    }
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn run(args: &Args) -> MachineResult<()> {
    let config = match &args.config {
        Some(path) => MachineConfig::load(path)?,
        None => MachineConfig::default(),
    };

    let mut msx = match &args.load_state {
        Some(path) => {
            let state = MachineState::load(path)?;
            info!(path = %path.display(), "loading save-state");
            Msx::restore(&config, &state)?
        }
        None => Msx::new(&config)?,
    };

    msx.run_frames(args.frames);
    println!("{}", msx.stats());

    if let Some(path) = &args.save_state {
        msx.save_state().save(path)?;
        info!(path = %path.display(), "save-state written");
    }
    Ok(())
}
