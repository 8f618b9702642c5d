//! Tune, evaluate and save the cancellation classifier.

use clap::Parser;
use reservation_pipeline::config::{PipelineConfig, DEFAULT_CONFIG_PATH};
use reservation_pipeline::{logging, ModelTraining, Result};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "train", about = "Train the booking cancellation model")]
struct Cli {
    /// Pipeline configuration file
    #[arg(long, default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,
}

fn run(cli: &Cli) -> Result<()> {
    let config = PipelineConfig::load(&cli.config)?;
    logging::init(&config.paths.log_dir)?;
    for (name, value) in ModelTraining::new(&config).run()? {
        println!("{name:<10} {value:.4}");
    }
    Ok(())
}

fn main() {
    let cli = Cli::parse();
    if let Err(err) = run(&cli) {
        eprintln!("train: {}", err.chain());
        std::process::exit(1);
    }
}
