//! The ingestion stage: fetch the raw dataset and split it.

use crate::config::{IngestionConfig, PathsConfig, PipelineConfig};
use crate::dataset::{train_test_split, Table};
use crate::error::{ErrorKind, PipelineError, Result, ResultExt};
use crate::storage::{self, ObjectStore};
use std::path::Path;
use tracing::{info, Span};

/// Row counts of a finished split.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SplitSummary {
    pub train_rows: usize,
    pub test_rows: usize,
}

pub struct DataIngestion {
    config: IngestionConfig,
    paths: PathsConfig,
    store: Box<dyn ObjectStore>,
    span: Span,
}

impl DataIngestion {
    pub fn new(config: &PipelineConfig, store: Box<dyn ObjectStore>) -> Self {
        let span = tracing::info_span!("ingestion");
        span.in_scope(|| {
            info!(
                "Data ingestion initialized with {} and file is {}",
                config.data_ingestion.bucket_name, config.data_ingestion.bucket_file_name
            )
        });
        Self {
            config: config.data_ingestion.clone(),
            paths: config.paths.clone(),
            store,
            span,
        }
    }

    /// Stage backed by the store named in the configuration.
    pub fn from_config(config: &PipelineConfig) -> Result<Self> {
        Ok(Self::new(config, storage::from_config(&config.data_ingestion)?))
    }

    /// Record this stage's events under `span` instead of the default one.
    pub fn with_span(mut self, span: Span) -> Self {
        self.span = span;
        self
    }

    /// Download the configured object to the raw file path.
    pub fn fetch(&self) -> Result<u64> {
        let _enter = self.span.enter();
        self.ensure_raw_dir()
            .and_then(|()| {
                self.store.download(
                    &self.config.bucket_name,
                    &self.config.bucket_file_name,
                    &self.paths.raw_file,
                )
            })
            .map(|bytes| {
                info!(
                    bytes,
                    "Successfully downloaded {} to {}",
                    self.config.bucket_file_name,
                    self.paths.raw_file.display()
                );
                bytes
            })
            .log_context("failed to download raw data")
    }

    /// Split the downloaded file into train and test CSVs.
    pub fn split(&self, train_ratio: f64) -> Result<SplitSummary> {
        let _enter = self.span.enter();
        info!("Splitting data into train and test sets");
        self.split_inner(train_ratio)
            .log_context("failed to split data into train and test sets")
    }

    fn split_inner(&self, train_ratio: f64) -> Result<SplitSummary> {
        self.ensure_raw_dir()?;
        let table = Table::read_csv(&self.paths.raw_file)?;
        let (train, test) = train_test_split(&table, train_ratio, self.config.random_state)?;
        for path in [&self.paths.train_file, &self.paths.test_file] {
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                create_dir(parent)?;
            }
        }
        train.write_csv(&self.paths.train_file)?;
        test.write_csv(&self.paths.test_file)?;
        info!(
            train_rows = train.n_rows(),
            test_rows = test.n_rows(),
            "Saved splits to {} and {}",
            self.paths.train_file.display(),
            self.paths.test_file.display()
        );
        Ok(SplitSummary {
            train_rows: train.n_rows(),
            test_rows: test.n_rows(),
        })
    }

    /// Fetch, then split with the configured ratio.
    ///
    /// A completion line is logged whether or not the stage succeeded.
    pub fn run(&self) -> Result<SplitSummary> {
        let _enter = self.span.enter();
        info!("Starting data ingestion process");
        let result = self
            .fetch()
            .and_then(|_| self.split(self.config.train_ratio))
            .log_context("data ingestion failed");
        if result.is_ok() {
            info!("Data ingestion process completed successfully");
        }
        info!("Data ingestion process completed");
        result
    }

    fn ensure_raw_dir(&self) -> Result<()> {
        create_dir(&self.paths.raw_dir)
    }
}

fn create_dir(dir: &Path) -> Result<()> {
    std::fs::create_dir_all(dir).map_err(|e| {
        PipelineError::with_source(ErrorKind::Io, format!("cannot create {}", dir.display()), e)
    })
}
