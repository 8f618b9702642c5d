use crate::dataset::{Column, Table};
use crate::error::{PipelineError, Result};
use ndarray::{Array2, Axis};

/// In-memory feature matrix with its target vector.
///
/// Rows of `features` line up with `labels`; column `j` of `features` is
/// named `feature_names[j]`.
#[derive(Debug, Clone, PartialEq)]
pub struct LabeledData {
    features: Array2<f64>,
    labels: Vec<f64>,
    feature_names: Vec<String>,
}

impl LabeledData {
    pub fn new(features: Array2<f64>, labels: Vec<f64>, feature_names: Vec<String>) -> Result<Self> {
        if features.nrows() != labels.len() {
            return Err(PipelineError::parse(format!(
                "{} feature rows but {} labels",
                features.nrows(),
                labels.len()
            )));
        }
        if features.ncols() != feature_names.len() {
            return Err(PipelineError::parse(format!(
                "{} feature columns but {} names",
                features.ncols(),
                feature_names.len()
            )));
        }
        Ok(Self {
            features,
            labels,
            feature_names,
        })
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    pub fn n_features(&self) -> usize {
        self.feature_names.len()
    }

    pub fn features(&self) -> &Array2<f64> {
        &self.features
    }

    pub fn labels(&self) -> &[f64] {
        &self.labels
    }

    pub fn feature_names(&self) -> &[String] {
        &self.feature_names
    }

    /// Subset of rows, in the given order.
    pub fn rows(&self, indices: &[usize]) -> LabeledData {
        LabeledData {
            features: self.features.select(Axis(0), indices),
            labels: indices.iter().map(|&i| self.labels[i]).collect(),
            feature_names: self.feature_names.clone(),
        }
    }

    /// Reassemble a table: feature columns first, target last.
    pub fn into_table(self, target: &str) -> Result<Table> {
        let mut names = self.feature_names;
        let mut columns: Vec<Column> = self
            .features
            .columns()
            .into_iter()
            .map(|col| Column::Numeric(col.to_vec()))
            .collect();
        names.push(target.to_string());
        columns.push(Column::Numeric(self.labels));
        Table::new(names, columns)
    }
}
