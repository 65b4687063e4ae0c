use clap::Parser;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::error;

use kolrl::{logging, KolAgent, KolrlError, MarketFeatures};

/// Run inference with the KOL RL agent
#[derive(Parser, Debug)]
#[command(name = "infer", version)]
struct Args {
    /// KOL text input
    #[arg(long)]
    text: String,

    /// Path to a JSON object of market features (key order is the
    /// canonical feature order)
    #[arg(long)]
    market: PathBuf,

    /// Policy checkpoint; omitted means the untrained default policy
    #[arg(long)]
    model: Option<PathBuf>,
}

fn main() -> ExitCode {
    logging::init_logging_simple();
    let args = Args::parse();

    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %e, "inference failed");
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn run(args: &Args) -> kolrl::Result<()> {
    let raw = std::fs::read_to_string(&args.market)?;
    let value: serde_json::Value = serde_json::from_str(&raw)?;
    let object = value.as_object().ok_or_else(|| {
        KolrlError::Validation(format!(
            "{} must contain a JSON object of market features",
            args.market.display()
        ))
    })?;
    let market = MarketFeatures::from_json_object(object);

    let mut agent = match &args.model {
        Some(path) => KolAgent::from_checkpoint(path)?,
        None => KolAgent::new(),
    };

    let prediction = agent.predict(&args.text, &market);
    println!("{}", serde_json::to_string_pretty(&prediction)?);
    Ok(())
}
