//! Clean, encode and rebalance the train/test split.

use clap::Parser;
use reservation_pipeline::config::{PipelineConfig, DEFAULT_CONFIG_PATH};
use reservation_pipeline::{logging, DataProcessor, Result};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "preprocess", about = "Preprocess the raw train and test splits")]
struct Cli {
    /// Pipeline configuration file
    #[arg(long, default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,
}

fn run(cli: &Cli) -> Result<()> {
    let config = PipelineConfig::load(&cli.config)?;
    logging::init(&config.paths.log_dir)?;
    DataProcessor::new(&config).process()
}

fn main() {
    let cli = Cli::parse();
    if let Err(err) = run(&cli) {
        eprintln!("preprocess: {}", err.chain());
        std::process::exit(1);
    }
}
