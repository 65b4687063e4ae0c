use clap::Parser;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{error, info};

use kolrl::{buffer, logging, AppConfig, RlTrainer, SharedReplayBuffer};

/// Train the KOL RL agent from logged transitions
#[derive(Parser, Debug)]
#[command(name = "train", version)]
struct Args {
    /// Path to the trainer TOML config
    #[arg(long, default_value = "config/train.toml")]
    config: PathBuf,

    /// How many times to drive the orchestrator (IQL advances one batch
    /// per run; CQL runs a full epoch per run)
    #[arg(long, default_value_t = 1)]
    runs: usize,
}

fn main() -> ExitCode {
    logging::init_logging();
    let args = Args::parse();

    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %e, "training failed");
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn run(args: &Args) -> kolrl::Result<()> {
    info!(config = %args.config.display(), "loading config");
    let config = AppConfig::load(&args.config)?;

    let store = SharedReplayBuffer::with_capacity(config.buffer.capacity);
    if let Some(path) = &config.dataset_path {
        let (admitted, rejected) = buffer::load_jsonl(&store, path)?;
        info!(admitted, rejected, dataset = %path.display(), "dataset loaded");
    }

    let checkpoint_path = config.trainer.checkpoint_path.clone();
    let mut trainer = RlTrainer::new(config.trainer, store);

    for run_no in 1..=args.runs.max(1) {
        let report = trainer.run()?;
        info!(
            run = run_no,
            batches = report.batches,
            transitions = report.transitions_seen,
            "run complete"
        );
    }

    info!(checkpoint = %checkpoint_path.display(), "training finished");
    Ok(())
}
