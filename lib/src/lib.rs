//! # reservation-pipeline
//!
//! A three-stage batch pipeline that predicts hotel booking cancellations.
//!
//! ## Stages
//!
//! 1. [`ingestion::DataIngestion`] downloads the raw CSV from object storage
//!    and writes a seeded train/test split.
//! 2. [`preprocessing::DataProcessor`] drops the identifier column and
//!    duplicate rows, encodes categoricals, log-transforms skewed columns and
//!    rebalances the training split with SMOTE.
//! 3. [`training::ModelTraining`] tunes a gradient-boosted tree classifier with
//!    randomized search, evaluates it on the test split and persists it.
//!
//! Each stage reads only the files the previous one wrote, so they run as
//! separate processes (`ingest`, `preprocess`, `train`) sharing one
//! [`config::PipelineConfig`].
//!
//! ## Design
//!
//! - **Stateful type safety**: models and transformers carry their training
//!   state in the type system (`Unfitted` vs `Fitted`, [`preprocessing::Transformer`]
//!   vs [`preprocessing::FittedTransformer`]).
//! - **One error type**: every operation returns [`error::Result`], tagged with
//!   an [`error::ErrorKind`] and keeping the underlying cause.
//! - **Injected logging**: stages log through a `tracing` span given at
//!   construction; only the binaries install a subscriber ([`logging::init`]).
//!
//! ## Quick start
//!
//! ```no_run
//! use reservation_pipeline::config::PipelineConfig;
//! use reservation_pipeline::ingestion::DataIngestion;
//! use reservation_pipeline::preprocessing::DataProcessor;
//! use reservation_pipeline::training::ModelTraining;
//!
//! # fn main() -> reservation_pipeline::error::Result<()> {
//! let config = PipelineConfig::load("config/config.toml")?;
//! DataIngestion::from_config(&config)?.run()?;
//! DataProcessor::new(&config).process()?;
//! let metrics = ModelTraining::new(&config).run()?;
//! println!("accuracy = {}", metrics["accuracy"]);
//! # Ok(())
//! # }
//! ```

/// Pipeline configuration document.
pub mod config;

/// Tabular data, CSV I/O and train/test splitting.
pub mod dataset;

/// Error type shared by all stages.
pub mod error;

/// Raw data download and splitting.
pub mod ingestion;

/// Stdout and rolling-file log setup for the binaries.
pub mod logging;

/// Classification metrics and search scoring.
pub mod metrics;

/// Gradient-boosted tree classifier with compile-time state safety.
pub mod model;

/// Data preprocessing transformers and the preprocessing stage.
pub mod preprocessing;

/// Model persistence.
pub mod serialization;

/// Object storage backends.
pub mod storage;

/// Randomized hyper-parameter search.
pub mod trainer;

/// Model tuning, evaluation and persistence.
pub mod training;

pub use config::PipelineConfig;
pub use error::{ErrorKind, PipelineError, Result};
pub use ingestion::DataIngestion;
pub use preprocessing::DataProcessor;
pub use training::ModelTraining;
