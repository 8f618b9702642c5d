//! The preprocessing stage.
//!
//! Raw train/test splits are cleaned (identifier column and duplicate rows
//! removed), categorical columns are encoded, skewed numerical columns are
//! log-transformed, and the training split is rebalanced with SMOTE.
//! Optionally only the most important features are kept.

use crate::config::{PathsConfig, PipelineConfig, ProcessingConfig};
use crate::dataset::Table;
use crate::error::{ErrorKind, PipelineError, Result, ResultExt};
use crate::preprocessing::encoding::{CategoryEncoder, FittedCategoryEncoder};
use crate::preprocessing::feature_selection::FeatureSelector;
use crate::preprocessing::skew::SkewCorrector;
use crate::preprocessing::smote::{class_counts, Smote};
use crate::preprocessing::traits::{FittedTransformer, Transformer};
use std::path::Path;
use tracing::{info, Span};

/// Audit file holding the category → code tables, written beside the
/// processed CSVs.
pub const CATEGORY_MAPPINGS_FILE: &str = "category_mappings.json";

/// Fitted category encoder, written beside the processed CSVs so new
/// bookings can be coded the same way.
pub const CATEGORY_ENCODER_FILE: &str = "category_encoder.bin";

pub struct DataProcessor {
    config: ProcessingConfig,
    paths: PathsConfig,
    span: Span,
}

impl DataProcessor {
    pub fn new(config: &PipelineConfig) -> Self {
        Self {
            config: config.data_processing.clone(),
            paths: config.paths.clone(),
            span: tracing::info_span!("preprocessing"),
        }
    }

    /// Record this stage's events under `span` instead of the default one.
    pub fn with_span(mut self, span: Span) -> Self {
        self.span = span;
        self
    }

    /// Clean and encode one table on its own.
    ///
    /// Category codes are learned from `table` alone, so two calls may code
    /// the same category differently. [`DataProcessor::process`] uses
    /// [`DataProcessor::clean_and_encode_with`] and a shared encoder instead.
    pub fn clean_and_encode(&self, table: Table) -> Result<Table> {
        let _enter = self.span.enter();
        let encoder = self.fit_encoder(&[&table]);
        encoder
            .and_then(|encoder| self.encode_and_correct(table, &encoder))
            .log_context("clean_and_encode failed")
    }

    /// Clean a table and encode it with an already fitted encoder.
    pub fn clean_and_encode_with(&self, table: Table, encoder: &FittedCategoryEncoder) -> Result<Table> {
        let _enter = self.span.enter();
        self.encode_and_correct(table, encoder)
            .log_context("clean_and_encode failed")
    }

    /// Fit the categorical encoder over the vocabularies of all `tables`.
    pub fn fit_encoder(&self, tables: &[&Table]) -> Result<FittedCategoryEncoder> {
        let encoder = CategoryEncoder::new(self.config.categorical_columns.clone())
            .fit_many(tables)?;
        info!("Label mappings are:");
        for (column, codes) in encoder.mappings() {
            info!(column = %column, mapping = ?codes, "label mapping");
        }
        Ok(encoder)
    }

    fn encode_and_correct(&self, table: Table, encoder: &FittedCategoryEncoder) -> Result<Table> {
        info!("Dropping '{}' column and duplicates", self.config.id_column);
        let table = self.clean(table)?;
        let table = encoder.transform(&table)?;

        let corrector = SkewCorrector::new(
            self.config.numerical_columns.clone(),
            self.config.skewness_threshold,
        )
        .fit(&table)?;
        if !corrector.skewed_columns().is_empty() {
            info!(columns = ?corrector.skewed_columns(), "applying log1p to skewed columns");
        }
        corrector.transform(&table)
    }

    fn clean(&self, mut table: Table) -> Result<Table> {
        table.drop_column(&self.config.id_column)?;
        let removed = table.drop_duplicates();
        info!(removed, remaining = table.n_rows(), "duplicate rows dropped");
        Ok(table)
    }

    /// Oversample minority classes of the target until class counts match.
    pub fn rebalance(&self, table: Table) -> Result<Table> {
        let _enter = self.span.enter();
        info!("Handling imbalanced data");
        self.rebalance_inner(table).log_context("rebalance failed")
    }

    fn rebalance_inner(&self, table: Table) -> Result<Table> {
        let target = &self.config.target_column;
        let data = table.features_and_target(target)?;
        info!(counts = ?class_counts(data.labels()), "class counts before balancing");

        let balanced = Smote::new(self.config.smote_k_neighbors, self.config.random_state)
            .fit_resample(&data)?;
        info!(counts = ?class_counts(balanced.labels()), "data balanced successfully");
        balanced.into_table(target)
    }

    /// Keep the `n_features` most important features in both tables.
    pub fn select_features(&self, train: Table, test: Table, n_features: usize) -> Result<(Table, Table)> {
        let _enter = self.span.enter();
        let run = || -> Result<(Table, Table)> {
            let selector = FeatureSelector::new(self.config.target_column.clone(), n_features)
                .fit(&train)?;
            info!(features = ?selector.selected(), "selected features");
            Ok((selector.transform(&train)?, selector.transform(&test)?))
        };
        run().log_context("feature selection failed")
    }

    /// Run the whole stage: read the raw splits, transform them and write the
    /// processed CSVs. Nothing is written unless every step succeeds.
    pub fn process(&self) -> Result<()> {
        let _enter = self.span.enter();
        info!("Starting data processing");
        self.process_inner().log_context("data processing failed")?;
        info!("Data processing completed");
        Ok(())
    }

    fn process_inner(&self) -> Result<()> {
        let train = Table::read_csv(&self.paths.train_file)?;
        let test = Table::read_csv(&self.paths.test_file)?;

        let encoder = self.fit_encoder(&[&train, &test])?;
        let train = self.clean_and_encode_with(train, &encoder)?;
        let test = self.clean_and_encode_with(test, &encoder)?;
        let train = self.rebalance(train)?;

        let (train, test) = match self.config.no_of_features {
            Some(n) => self.select_features(train, test, n)?,
            None => (train, test),
        };

        let dir = &self.paths.processed_dir;
        std::fs::create_dir_all(dir).map_err(|e| {
            PipelineError::with_source(
                ErrorKind::Io,
                format!("cannot create {}", dir.display()),
                e,
            )
        })?;
        ensure_parent(&self.paths.processed_train_file)?;
        ensure_parent(&self.paths.processed_test_file)?;
        train.write_csv(&self.paths.processed_train_file)?;
        test.write_csv(&self.paths.processed_test_file)?;

        let mappings = serde_json::to_string_pretty(&encoder.mappings())?;
        std::fs::write(dir.join(CATEGORY_MAPPINGS_FILE), mappings)?;
        encoder.save_to_file(dir.join(CATEGORY_ENCODER_FILE))?;
        info!(
            train = %self.paths.processed_train_file.display(),
            test = %self.paths.processed_test_file.display(),
            "processed data saved"
        );
        Ok(())
    }
}

fn ensure_parent(path: &Path) -> Result<()> {
    match path.parent().filter(|p| !p.as_os_str().is_empty()) {
        Some(parent) => std::fs::create_dir_all(parent).map_err(|e| {
            PipelineError::with_source(
                ErrorKind::Io,
                format!("cannot create {}", parent.display()),
                e,
            )
        }),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PathsConfig;
    use crate::dataset::Column;
    use crate::preprocessing::encoding::CategoryMappings;

    const CONFIG: &str = r#"
        [data_ingestion]
        bucket_name = "bucket"
        bucket_file_name = "reservations.csv"
        train_ratio = 0.8

        [data_processing]
        categorical_columns = ["meal", "booking_status"]
        numerical_columns = ["lead_time"]
        skewness_threshold = 1.0
        smote_k_neighbors = 2
    "#;

    fn processor() -> DataProcessor {
        let config = PipelineConfig::from_toml_str(CONFIG).unwrap();
        DataProcessor::new(&config)
    }

    fn raw(meals: &[&str], lead: &[f64], status: &[&str]) -> Table {
        let n = meals.len();
        Table::new(
            vec![
                "Booking_ID".into(),
                "meal".into(),
                "lead_time".into(),
                "booking_status".into(),
            ],
            vec![
                Column::Text((0..n).map(|i| format!("INN{i:05}")).collect()),
                Column::Text(meals.iter().map(|s| s.to_string()).collect()),
                Column::Numeric(lead.to_vec()),
                Column::Text(status.iter().map(|s| s.to_string()).collect()),
            ],
        )
        .unwrap()
    }

    #[test]
    fn test_clean_and_encode_drops_id_and_encodes() {
        let table = raw(
            &["Meal 2", "Meal 1", "Not Selected", "Meal 1"],
            &[1.0, 2.0, 3.0, 4.0],
            &["Canceled", "Not_Canceled", "Not_Canceled", "Canceled"],
        );
        let out = processor().clean_and_encode(table).unwrap();
        assert!(!out.has_column("Booking_ID"));
        assert_eq!(out.numeric("meal").unwrap(), &[1.0, 0.0, 2.0, 0.0]);
        assert_eq!(out.numeric("booking_status").unwrap(), &[0.0, 1.0, 1.0, 0.0]);
    }

    #[test]
    fn test_duplicates_after_id_removal_are_dropped() {
        let table = raw(
            &["A", "A", "B"],
            &[5.0, 5.0, 6.0],
            &["Canceled", "Canceled", "Not_Canceled"],
        );
        let out = processor().clean_and_encode(table).unwrap();
        assert_eq!(out.n_rows(), 2);
    }

    #[test]
    fn test_skewed_column_log_transformed() {
        let lead = [1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0, 9.0, 1000.0];
        let meals = ["A", "B", "A", "B", "A", "B", "A", "B", "A", "B"];
        let status = ["Canceled"; 10];
        let out = processor()
            .clean_and_encode(raw(&meals, &lead, &status))
            .unwrap();
        let expected: Vec<f64> = lead.iter().map(|v: &f64| v.ln_1p()).collect();
        assert_eq!(out.numeric("lead_time").unwrap(), expected.as_slice());
    }

    #[test]
    fn test_missing_id_column_is_column_error() {
        let table = raw(&["A", "B"], &[1.0, 2.0], &["Canceled", "Not_Canceled"]);
        let table = table
            .select(&["meal", "lead_time", "booking_status"])
            .unwrap();
        let err = processor().clean_and_encode(table).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Column);
    }

    #[test]
    fn test_rebalance_equalizes_classes() {
        let status = [
            "Canceled",
            "Not_Canceled",
            "Not_Canceled",
            "Not_Canceled",
            "Not_Canceled",
            "Canceled",
        ];
        let table = raw(
            &["A", "B", "A", "B", "A", "B"],
            &[1.0, 2.0, 3.0, 4.0, 5.0, 6.0],
            &status,
        );
        let p = processor();
        let encoded = p.clean_and_encode(table).unwrap();
        let balanced = p.rebalance(encoded).unwrap();
        let counts = class_counts(balanced.numeric("booking_status").unwrap());
        assert_eq!(counts, vec![(0.0, 4), (1.0, 4)]);
        assert_eq!(
            balanced.column_names().last().map(String::as_str),
            Some("booking_status")
        );
    }

    #[test]
    fn test_rebalance_single_class_fails() {
        let table = raw(&["A", "B", "A"], &[1.0, 2.0, 3.0], &["Canceled"; 3]);
        let p = processor();
        let encoded = p.clean_and_encode(table).unwrap();
        let err = p.rebalance(encoded).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ClassImbalance);
    }

    #[test]
    fn test_rebalance_without_target_is_column_error() {
        let table = raw(&["A", "B", "A"], &[1.0, 2.0, 3.0], &["Canceled", "Not_Canceled", "Canceled"]);
        let p = processor();
        let mut encoded = p.clean_and_encode(table).unwrap();
        encoded.drop_column("booking_status").unwrap();
        let err = p.rebalance(encoded).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Column);
    }

    #[test]
    fn test_process_saves_encoder_beside_outputs() {
        let tmp = tempfile::tempdir().unwrap();
        let mut config = PipelineConfig::from_toml_str(CONFIG).unwrap();
        config.paths = PathsConfig::rooted_at(tmp.path());
        std::fs::create_dir_all(&config.paths.raw_dir).unwrap();
        let meals = ["A", "B", "C", "A", "B", "C", "A", "B"];
        let lead = [1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0];
        let status = ["Canceled", "Not_Canceled", "Not_Canceled", "Canceled", "Not_Canceled", "Not_Canceled", "Not_Canceled", "Canceled"];
        raw(&meals, &lead, &status).write_csv(&config.paths.train_file).unwrap();
        raw(&["C", "A"], &[9.0, 10.0], &["Canceled", "Not_Canceled"])
            .write_csv(&config.paths.test_file)
            .unwrap();

        DataProcessor::new(&config).process().unwrap();
        let dir = &config.paths.processed_dir;
        let encoder = FittedCategoryEncoder::load_from_file(dir.join(CATEGORY_ENCODER_FILE)).unwrap();
        let audit: CategoryMappings =
            serde_json::from_str(&std::fs::read_to_string(dir.join(CATEGORY_MAPPINGS_FILE)).unwrap()).unwrap();
        assert_eq!(encoder.mappings(), audit);
        assert_eq!(audit["booking_status"]["Canceled"], 0);
    }
}
