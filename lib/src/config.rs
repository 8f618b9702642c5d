//! Pipeline configuration.
//!
//! A single TOML document is read once at process start and passed by
//! reference to every stage. Missing optional keys fall back to the
//! defaults below.

use crate::error::{PipelineError, Result};
use crate::metrics::Scoring;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Default location of the configuration document.
pub const DEFAULT_CONFIG_PATH: &str = "config/config.toml";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineConfig {
    #[serde(default)]
    pub paths: PathsConfig,
    pub data_ingestion: IngestionConfig,
    pub data_processing: ProcessingConfig,
    #[serde(default)]
    pub model_training: TrainingConfig,
}

impl PipelineConfig {
    /// Read, parse and validate a configuration file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| {
            PipelineError::with_source(
                crate::error::ErrorKind::Config,
                format!("cannot read configuration file {}", path.display()),
                e,
            )
        })?;
        let config = Self::from_toml_str(&text)?;
        tracing::debug!(path = %path.display(), "configuration loaded");
        Ok(config)
    }

    pub fn from_toml_str(text: &str) -> Result<Self> {
        let config: PipelineConfig = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values no stage can run with.
    pub fn validate(&self) -> Result<()> {
        let ratio = self.data_ingestion.train_ratio;
        if !(ratio > 0.0 && ratio < 1.0) {
            return Err(PipelineError::config(format!(
                "train_ratio must be in (0, 1), got {ratio}"
            )));
        }
        if self.data_ingestion.bucket_name.is_empty() || self.data_ingestion.bucket_file_name.is_empty()
        {
            return Err(PipelineError::config(
                "bucket_name and bucket_file_name must not be empty",
            ));
        }
        let processing = &self.data_processing;
        if processing.target_column.is_empty() {
            return Err(PipelineError::config("target_column must not be empty"));
        }
        if processing.smote_k_neighbors == 0 {
            return Err(PipelineError::config("smote_k_neighbors must be positive"));
        }
        if processing.no_of_features == Some(0) {
            return Err(PipelineError::config("no_of_features must be positive"));
        }
        if !processing.skewness_threshold.is_finite() {
            return Err(PipelineError::config("skewness_threshold must be finite"));
        }
        let training = &self.model_training;
        if training.n_iter == 0 {
            return Err(PipelineError::config("n_iter must be positive"));
        }
        if training.cv < 2 {
            return Err(PipelineError::config(format!(
                "cv must be at least 2, got {}",
                training.cv
            )));
        }
        if training.n_jobs == 0 {
            return Err(PipelineError::config("n_jobs must be -1 or positive"));
        }
        training.params.validate()
    }
}

/// Fixed filesystem layout shared by the three stages.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PathsConfig {
    pub raw_dir: PathBuf,
    pub raw_file: PathBuf,
    pub train_file: PathBuf,
    pub test_file: PathBuf,
    pub processed_dir: PathBuf,
    pub processed_train_file: PathBuf,
    pub processed_test_file: PathBuf,
    pub model_output: PathBuf,
    pub log_dir: PathBuf,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self::rooted_at("artifacts")
    }
}

impl PathsConfig {
    /// Standard layout below `root` (`raw/`, `processed/`, `models/`).
    pub fn rooted_at<P: AsRef<Path>>(root: P) -> Self {
        let root = root.as_ref();
        let raw_dir = root.join("raw");
        let processed_dir = root.join("processed");
        Self {
            raw_file: raw_dir.join("raw.csv"),
            train_file: raw_dir.join("train.csv"),
            test_file: raw_dir.join("test.csv"),
            raw_dir,
            processed_train_file: processed_dir.join("processed_train.csv"),
            processed_test_file: processed_dir.join("processed_test.csv"),
            processed_dir,
            model_output: root.join("models").join("gbdt_model.bin"),
            log_dir: PathBuf::from("logs"),
        }
    }
}

/// Where the raw dataset is fetched from.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageKind {
    #[default]
    Gcs,
    Local,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IngestionConfig {
    pub bucket_name: String,
    pub bucket_file_name: String,
    pub train_ratio: f64,
    #[serde(default = "default_seed")]
    pub random_state: u64,
    #[serde(default)]
    pub storage: StorageKind,
    #[serde(default = "default_endpoint")]
    pub endpoint: String,
    /// Root directory of the bucket tree when `storage = "local"`.
    #[serde(default)]
    pub local_root: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessingConfig {
    #[serde(default = "default_id_column")]
    pub id_column: String,
    #[serde(default = "default_target_column")]
    pub target_column: String,
    pub categorical_columns: Vec<String>,
    pub numerical_columns: Vec<String>,
    pub skewness_threshold: f64,
    #[serde(default)]
    pub no_of_features: Option<usize>,
    #[serde(default = "default_k_neighbors")]
    pub smote_k_neighbors: usize,
    #[serde(default = "default_seed")]
    pub random_state: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainingConfig {
    pub n_iter: usize,
    pub cv: usize,
    /// Worker threads for fold evaluation; `-1` uses every core.
    pub n_jobs: i32,
    pub verbose: u8,
    pub random_state: u64,
    pub scoring: Scoring,
    pub params: SearchSpaceConfig,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            n_iter: 4,
            cv: 2,
            n_jobs: -1,
            verbose: 2,
            random_state: 42,
            scoring: Scoring::Accuracy,
            params: SearchSpaceConfig::default(),
        }
    }
}

/// Half-open integer interval `[low, high)` sampled uniformly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct IntRange {
    pub low: i64,
    pub high: i64,
}

impl IntRange {
    pub const fn new(low: i64, high: i64) -> Self {
        Self { low, high }
    }
}

/// Half-open float interval `[low, high)` sampled uniformly.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FloatRange {
    pub low: f64,
    pub high: f64,
}

impl FloatRange {
    pub const fn new(low: f64, high: f64) -> Self {
        Self { low, high }
    }
}

/// Hyper-parameter distributions explored by the randomized search.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchSpaceConfig {
    pub n_estimators: IntRange,
    pub max_depth: IntRange,
    pub learning_rate: FloatRange,
    pub num_leaves: IntRange,
    pub min_child_samples: IntRange,
}

impl Default for SearchSpaceConfig {
    fn default() -> Self {
        Self {
            n_estimators: IntRange::new(100, 500),
            max_depth: IntRange::new(5, 50),
            learning_rate: FloatRange::new(0.01, 0.2),
            num_leaves: IntRange::new(20, 100),
            min_child_samples: IntRange::new(20, 21),
        }
    }
}

impl SearchSpaceConfig {
    pub fn validate(&self) -> Result<()> {
        let ints = [
            ("n_estimators", self.n_estimators, 1),
            ("max_depth", self.max_depth, i64::MIN),
            ("num_leaves", self.num_leaves, 2),
            ("min_child_samples", self.min_child_samples, 1),
        ];
        for (name, range, min) in ints {
            if range.low >= range.high {
                return Err(PipelineError::config(format!(
                    "{name} range [{}, {}) is empty",
                    range.low, range.high
                )));
            }
            if range.low < min {
                return Err(PipelineError::config(format!(
                    "{name} lower bound must be at least {min}, got {}",
                    range.low
                )));
            }
        }
        let lr = self.learning_rate;
        if !(lr.low > 0.0 && lr.low < lr.high && lr.high.is_finite()) {
            return Err(PipelineError::config(format!(
                "learning_rate range [{}, {}) is invalid",
                lr.low, lr.high
            )));
        }
        Ok(())
    }
}

fn default_seed() -> u64 {
    97
}

fn default_endpoint() -> String {
    "https://storage.googleapis.com".to_string()
}

fn default_id_column() -> String {
    "Booking_ID".to_string()
}

fn default_target_column() -> String {
    "booking_status".to_string()
}

fn default_k_neighbors() -> usize {
    5
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    const MINIMAL: &str = r#"
        [data_ingestion]
        bucket_name = "bucket"
        bucket_file_name = "Hotel_Reservations.csv"
        train_ratio = 0.8

        [data_processing]
        categorical_columns = ["type_of_meal_plan", "booking_status"]
        numerical_columns = ["lead_time"]
        skewness_threshold = 5.0
    "#;

    #[test]
    fn test_minimal_config_uses_defaults() {
        let config = PipelineConfig::from_toml_str(MINIMAL).unwrap();
        assert_eq!(config.data_ingestion.random_state, 97);
        assert_eq!(config.data_ingestion.storage, StorageKind::Gcs);
        assert_eq!(config.data_processing.id_column, "Booking_ID");
        assert_eq!(config.data_processing.target_column, "booking_status");
        assert_eq!(config.model_training.cv, 2);
        assert_eq!(config.model_training.scoring, Scoring::Accuracy);
        assert_eq!(config.paths.train_file, PathBuf::from("artifacts/raw/train.csv"));
    }

    #[test]
    fn test_full_training_section() {
        let text = format!(
            "{MINIMAL}\n[model_training]\nn_iter = 3\ncv = 4\nscoring = \"f1\"\n\
             [model_training.params]\nn_estimators = {{ low = 10, high = 20 }}\n"
        );
        let config = PipelineConfig::from_toml_str(&text).unwrap();
        assert_eq!(config.model_training.n_iter, 3);
        assert_eq!(config.model_training.scoring, Scoring::F1);
        assert_eq!(config.model_training.params.n_estimators, IntRange::new(10, 20));
        assert_eq!(config.model_training.params.num_leaves, IntRange::new(20, 100));
    }

    #[test]
    fn test_invalid_ratio_rejected() {
        let text = MINIMAL.replace("train_ratio = 0.8", "train_ratio = 1.0");
        let err = PipelineConfig::from_toml_str(&text).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Config);
    }

    #[test]
    fn test_empty_range_rejected() {
        let mut space = SearchSpaceConfig::default();
        space.num_leaves = IntRange::new(10, 10);
        assert!(space.validate().is_err());
    }

    #[test]
    fn test_missing_file_is_config_error() {
        let err = PipelineConfig::load("/nonexistent/config.toml").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Config);
    }

    #[test]
    fn test_malformed_document_is_config_error() {
        let err = PipelineConfig::from_toml_str("data_ingestion = 3").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Config);
    }
}
