//! Download the raw dataset and write the train/test split.

use clap::Parser;
use reservation_pipeline::config::{PipelineConfig, DEFAULT_CONFIG_PATH};
use reservation_pipeline::{logging, DataIngestion, Result};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "ingest", about = "Fetch the raw booking data and split it")]
struct Cli {
    /// Pipeline configuration file
    #[arg(long, default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,
}

fn run(cli: &Cli) -> Result<()> {
    let config = PipelineConfig::load(&cli.config)?;
    logging::init(&config.paths.log_dir)?;
    DataIngestion::from_config(&config)?.run()?;
    Ok(())
}

fn main() {
    let cli = Cli::parse();
    if let Err(err) = run(&cli) {
        eprintln!("ingest: {}", err.chain());
        std::process::exit(1);
    }
}
