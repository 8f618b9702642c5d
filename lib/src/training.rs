//! The training stage: tune, evaluate and persist the classifier.

use crate::config::{PathsConfig, PipelineConfig, TrainingConfig};
use crate::dataset::{LabeledData, Table};
use crate::error::{ErrorKind, PipelineError, Result, ResultExt};
use crate::metrics::{ClassificationMetrics, POSITIVE_LABEL};
use crate::model::{BoostingParams, Fitted, GradientBoostingClassifier, InferenceModel};
use crate::trainer::RandomizedSearch;
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::{info, Span};

/// Evaluation report written beside the model artifact.
pub const METRICS_FILE: &str = "metrics.json";

#[derive(Serialize)]
struct MetricsReport<'a> {
    metrics: &'a BTreeMap<String, f64>,
    params: &'a BoostingParams,
    n_trees: usize,
}

pub struct ModelTraining {
    config: TrainingConfig,
    target: String,
    paths: PathsConfig,
    span: Span,
}

impl ModelTraining {
    pub fn new(config: &PipelineConfig) -> Self {
        Self {
            config: config.model_training.clone(),
            target: config.data_processing.target_column.clone(),
            paths: config.paths.clone(),
            span: tracing::info_span!("training"),
        }
    }

    /// Record this stage's events under `span` instead of the default one.
    pub fn with_span(mut self, span: Span) -> Self {
        self.span = span;
        self
    }

    /// Read the processed splits and separate features from the target.
    pub fn load_and_split<P: AsRef<Path>>(
        &self,
        train_path: P,
        test_path: P,
    ) -> Result<(LabeledData, LabeledData)> {
        let _enter = self.span.enter();
        self.load_inner(train_path.as_ref(), test_path.as_ref())
            .log_context("error while loading data")
    }

    fn load_inner(&self, train_path: &Path, test_path: &Path) -> Result<(LabeledData, LabeledData)> {
        info!("Loading data from {}", train_path.display());
        let train = Table::read_csv(train_path)?;
        info!("Loading data from {}", test_path.display());
        let test = Table::read_csv(test_path)?;

        let train = train.features_and_target(&self.target)?;
        let test = test.features_and_target(&self.target)?;
        if train.feature_names() != test.feature_names() {
            return Err(PipelineError::column(format!(
                "train columns {:?} differ from test columns {:?}",
                train.feature_names(),
                test.feature_names()
            )));
        }
        info!(
            train_rows = train.len(),
            test_rows = test.len(),
            features = train.n_features(),
            "Data split successfully for model training"
        );
        Ok((train, test))
    }

    /// Run the randomized search and return the refitted best model.
    pub fn train(&self, data: &LabeledData) -> Result<GradientBoostingClassifier<Fitted>> {
        let _enter = self.span.enter();
        info!("Starting our model training");
        let outcome = RandomizedSearch::from_config(&self.config)
            .fit(data)
            .log_context("error while training model")?;
        info!(score = outcome.best_score, "Best parameters are: {}", outcome.best_params);
        Ok(outcome.best_model)
    }

    /// Score `model` on held-out data.
    pub fn evaluate(
        &self,
        model: &GradientBoostingClassifier<Fitted>,
        data: &LabeledData,
    ) -> Result<BTreeMap<String, f64>> {
        let _enter = self.span.enter();
        info!("Evaluating our model");
        let predictions = model
            .predict(data.features().view())
            .log_context("error while evaluating model")?;
        let metrics = ClassificationMetrics::compute(data.labels(), &predictions, POSITIVE_LABEL);
        info!("Accuracy Score : {}", metrics.accuracy);
        info!("Precision Score : {}", metrics.precision);
        info!("Recall Score : {}", metrics.recall);
        info!("F1 Score : {}", metrics.f1);
        Ok(metrics.to_map())
    }

    /// Save `model` to the configured output path, replacing any earlier artifact.
    pub fn persist(&self, model: &GradientBoostingClassifier<Fitted>) -> Result<()> {
        let _enter = self.span.enter();
        info!("Saving the model");
        model
            .save_to_file(&self.paths.model_output)
            .log_context("error while saving model")?;
        info!("Model saved to {}", self.paths.model_output.display());
        Ok(())
    }

    /// Path of the metrics report for the configured model output.
    pub fn metrics_path(&self) -> PathBuf {
        self.paths
            .model_output
            .parent()
            .map(|dir| dir.join(METRICS_FILE))
            .unwrap_or_else(|| PathBuf::from(METRICS_FILE))
    }

    fn write_metrics(
        &self,
        model: &GradientBoostingClassifier<Fitted>,
        metrics: &BTreeMap<String, f64>,
    ) -> Result<()> {
        let path = self.metrics_path();
        let report = MetricsReport {
            metrics,
            params: model.params(),
            n_trees: model.n_trees(),
        };
        let json = serde_json::to_string_pretty(&report)?;
        std::fs::write(&path, json).map_err(|e| {
            PipelineError::with_source(ErrorKind::Io, format!("cannot write {}", path.display()), e)
        })
    }

    /// load_and_split → train → evaluate → persist.
    pub fn run(&self) -> Result<BTreeMap<String, f64>> {
        let _enter = self.span.enter();
        info!("Starting our model training pipeline");
        let result = self
            .load_and_split(&self.paths.processed_train_file, &self.paths.processed_test_file)
            .and_then(|(train, test)| {
                let model = self.train(&train)?;
                let metrics = self.evaluate(&model, &test)?;
                self.persist(&model)?;
                self.write_metrics(&model, &metrics)
                    .log_context("error while writing metrics")?;
                Ok(metrics)
            })
            .log_context("model training pipeline failed")?;
        info!("Model training completed successfully");
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{FloatRange, IntRange, PathsConfig};
    use rand::{Rng, SeedableRng};
    use rand_chacha::ChaCha8Rng;

    fn config(root: &Path) -> PipelineConfig {
        let mut config = PipelineConfig::from_toml_str(
            r#"
            [data_ingestion]
            bucket_name = "bucket"
            bucket_file_name = "reservations.csv"
            train_ratio = 0.8

            [data_processing]
            categorical_columns = []
            numerical_columns = ["lead_time"]
            skewness_threshold = 5.0

            [model_training]
            n_iter = 2
            cv = 2
            n_jobs = 2
            "#,
        )
        .unwrap();
        config.model_training.params.n_estimators = IntRange::new(5, 10);
        config.model_training.params.max_depth = IntRange::new(2, 4);
        config.model_training.params.num_leaves = IntRange::new(3, 6);
        config.model_training.params.min_child_samples = IntRange::new(2, 3);
        config.model_training.params.learning_rate = FloatRange::new(0.1, 0.3);
        config.paths = PathsConfig::rooted_at(root);
        config
    }

    fn write_split(path: &Path, rows: usize, seed: u64) {
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let mut csv = String::from("lead_time,price,booking_status\n");
        for _ in 0..rows {
            let lead: f64 = rng.random_range(0.0..100.0);
            let price: f64 = rng.random_range(50.0..150.0);
            let label = if lead > 50.0 { 0 } else { 1 };
            csv.push_str(&format!("{lead:.3},{price:.2},{label}\n"));
        }
        std::fs::write(path, csv).unwrap();
    }

    #[test]
    fn test_load_and_split_separates_target() {
        let tmp = tempfile::tempdir().unwrap();
        let cfg = config(tmp.path());
        write_split(&cfg.paths.processed_train_file, 30, 1);
        write_split(&cfg.paths.processed_test_file, 10, 2);

        let stage = ModelTraining::new(&cfg);
        let (train, test) = stage
            .load_and_split(&cfg.paths.processed_train_file, &cfg.paths.processed_test_file)
            .unwrap();
        assert_eq!(train.len(), 30);
        assert_eq!(test.len(), 10);
        assert_eq!(train.feature_names(), ["lead_time", "price"]);
    }

    #[test]
    fn test_missing_target_is_column_error() {
        let tmp = tempfile::tempdir().unwrap();
        let cfg = config(tmp.path());
        std::fs::create_dir_all(&cfg.paths.processed_dir).unwrap();
        std::fs::write(&cfg.paths.processed_train_file, "a,b\n1,2\n").unwrap();
        std::fs::write(&cfg.paths.processed_test_file, "a,b\n1,2\n").unwrap();

        let err = ModelTraining::new(&cfg)
            .load_and_split(&cfg.paths.processed_train_file, &cfg.paths.processed_test_file)
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Column);
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let tmp = tempfile::tempdir().unwrap();
        let cfg = config(tmp.path());
        let err = ModelTraining::new(&cfg)
            .load_and_split(&cfg.paths.processed_train_file, &cfg.paths.processed_test_file)
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Io);
    }

    #[test]
    fn test_evaluate_reports_all_metrics() {
        let tmp = tempfile::tempdir().unwrap();
        let cfg = config(tmp.path());
        write_split(&cfg.paths.processed_train_file, 60, 3);
        write_split(&cfg.paths.processed_test_file, 20, 4);
        let stage = ModelTraining::new(&cfg);
        let (train, test) = stage
            .load_and_split(&cfg.paths.processed_train_file, &cfg.paths.processed_test_file)
            .unwrap();

        let model = stage.train(&train).unwrap();
        let metrics = stage.evaluate(&model, &test).unwrap();
        let keys: Vec<&str> = metrics.keys().map(String::as_str).collect();
        assert_eq!(keys, ["accuracy", "f1", "precision", "recall"]);
        assert!(metrics.values().all(|v| (0.0..=1.0).contains(v)));
    }

    #[test]
    fn test_run_persists_model_and_metrics() {
        let tmp = tempfile::tempdir().unwrap();
        let cfg = config(tmp.path());
        write_split(&cfg.paths.processed_train_file, 60, 5);
        write_split(&cfg.paths.processed_test_file, 20, 6);
        assert!(!cfg.paths.model_output.exists());

        let stage = ModelTraining::new(&cfg);
        let metrics = stage.run().unwrap();
        assert!(metrics["accuracy"] > 0.7);
        assert!(cfg.paths.model_output.exists());

        let report: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(stage.metrics_path()).unwrap()).unwrap();
        assert_eq!(report["metrics"]["accuracy"], metrics["accuracy"]);

        let model = GradientBoostingClassifier::<Fitted>::load_from_file(&cfg.paths.model_output).unwrap();
        assert_eq!(model.feature_names(), ["lead_time", "price"]);
    }

    #[test]
    fn test_run_single_class_fails_without_artifact() {
        let tmp = tempfile::tempdir().unwrap();
        let cfg = config(tmp.path());
        std::fs::create_dir_all(&cfg.paths.processed_dir).unwrap();
        let csv: String = std::iter::once("lead_time,booking_status\n".to_string())
            .chain((0..10).map(|i| format!("{i},1\n")))
            .collect();
        std::fs::write(&cfg.paths.processed_train_file, &csv).unwrap();
        std::fs::write(&cfg.paths.processed_test_file, &csv).unwrap();

        let err = ModelTraining::new(&cfg).run().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Fit);
        assert!(err.chain().contains("model training pipeline failed"));
        assert!(!cfg.paths.model_output.exists());
    }
}
