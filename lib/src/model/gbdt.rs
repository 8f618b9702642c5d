//! Gradient-boosted decision trees for binary classification.
//!
//! The classifier minimizes logistic loss with second-order boosting: every
//! round fits a [`Tree`] to the gradients and hessians of the current raw
//! scores, shrunk by the learning rate. Raw scores start from the log-odds of
//! the positive class frequency.
//!
//! ```rust
//! use ndarray::array;
//! use reservation_pipeline::dataset::LabeledData;
//! use reservation_pipeline::model::{BoostingParams, GradientBoostingClassifier, InferenceModel};
//!
//! let data = LabeledData::new(
//!     array![[0.0], [1.0], [2.0], [3.0]],
//!     vec![0.0, 0.0, 1.0, 1.0],
//!     vec!["x".to_string()],
//! )
//! .unwrap();
//! let params = BoostingParams { n_estimators: 20, min_child_samples: 1, ..Default::default() };
//! let model = GradientBoostingClassifier::new(params).fit(&data).unwrap();
//! assert_eq!(model.predict(data.features().view()).unwrap(), vec![0.0, 0.0, 1.0, 1.0]);
//! ```

use crate::dataset::LabeledData;
use crate::error::{PipelineError, Result};
use crate::model::binning::{BinnedMatrix, MAX_BINS};
use crate::model::tree::{Tree, TreeBuilder};
use crate::model::{Fitted, InferenceModel, Unfitted};
use ndarray::ArrayView2;
use serde::{Deserialize, Serialize};
use std::marker::PhantomData;

/// Hyper-parameters of the boosted ensemble.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoostingParams {
    /// Number of boosting rounds (trees).
    pub n_estimators: usize,
    /// Shrinkage applied to every leaf value.
    pub learning_rate: f64,
    /// Maximum tree depth; `<= 0` means unlimited.
    pub max_depth: i64,
    /// Maximum number of leaves per tree.
    pub num_leaves: usize,
    /// Minimum number of rows in each child of a split.
    pub min_child_samples: usize,
    /// L2 regularization on leaf values.
    pub lambda_l2: f64,
    /// Minimum gain required to split.
    pub min_split_gain: f64,
    /// Histogram bins per feature.
    pub max_bins: usize,
}

impl Default for BoostingParams {
    fn default() -> Self {
        Self {
            n_estimators: 100,
            learning_rate: 0.1,
            max_depth: -1,
            num_leaves: 31,
            min_child_samples: 20,
            lambda_l2: 0.0,
            min_split_gain: 0.0,
            max_bins: 255,
        }
    }
}

impl BoostingParams {
    fn validate(&self) -> Result<()> {
        if self.n_estimators == 0 {
            return Err(PipelineError::fit("n_estimators must be positive"));
        }
        if !(self.learning_rate > 0.0 && self.learning_rate.is_finite()) {
            return Err(PipelineError::fit(format!(
                "learning_rate must be positive, got {}",
                self.learning_rate
            )));
        }
        if self.num_leaves < 2 {
            return Err(PipelineError::fit("num_leaves must be at least 2"));
        }
        if self.lambda_l2 < 0.0 {
            return Err(PipelineError::fit("lambda_l2 must be non-negative"));
        }
        if !(2..=MAX_BINS).contains(&self.max_bins) {
            return Err(PipelineError::fit(format!(
                "max_bins must be in [2, {MAX_BINS}], got {}",
                self.max_bins
            )));
        }
        Ok(())
    }
}

/// Learned state of a fitted ensemble.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Ensemble {
    /// Original label values; index 1 is the positive class.
    classes: Vec<f64>,
    init_score: f64,
    trees: Vec<Tree>,
    feature_names: Vec<String>,
    feature_gains: Vec<f64>,
}

/// Serialized form of a fitted classifier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GbdtArtifact {
    pub params: BoostingParams,
    pub ensemble: Ensemble,
}

/// Boosted tree classifier with its training state in the type.
#[derive(Debug, Clone)]
pub struct GradientBoostingClassifier<S> {
    params: BoostingParams,
    ensemble: Ensemble,
    _state: PhantomData<S>,
}

impl GradientBoostingClassifier<Unfitted> {
    pub fn new(params: BoostingParams) -> Self {
        Self {
            params,
            ensemble: Ensemble::default(),
            _state: PhantomData,
        }
    }

    pub fn params(&self) -> &BoostingParams {
        &self.params
    }

    /// Fit the ensemble.
    ///
    /// # Errors
    /// `Fit` when the data is empty, has no features, contains non-finite
    /// labels, or does not hold exactly two classes.
    pub fn fit(self, data: &LabeledData) -> Result<GradientBoostingClassifier<Fitted>> {
        self.params.validate()?;
        if data.is_empty() {
            return Err(PipelineError::fit("cannot fit on an empty dataset"));
        }
        if data.n_features() == 0 {
            return Err(PipelineError::fit("cannot fit without feature columns"));
        }
        let classes = binary_classes(data.labels())?;
        let targets: Vec<f64> = data
            .labels()
            .iter()
            .map(|&y| if y == classes[1] { 1.0 } else { 0.0 })
            .collect();

        let n = targets.len();
        let positive_rate = targets.iter().sum::<f64>() / n as f64;
        let init_score = (positive_rate / (1.0 - positive_rate)).ln();

        let bins = BinnedMatrix::from_features(data.features(), self.params.max_bins);
        let mut scores = vec![init_score; n];
        let mut grad = vec![0.0; n];
        let mut hess = vec![0.0; n];
        let mut trees = Vec::with_capacity(self.params.n_estimators);
        let mut feature_gains = vec![0.0; data.n_features()];

        for _ in 0..self.params.n_estimators {
            for i in 0..n {
                let p = sigmoid(scores[i]);
                grad[i] = p - targets[i];
                hess[i] = (p * (1.0 - p)).max(1e-16);
            }
            let fitted = TreeBuilder::new(&bins, &grad, &hess, &self.params).build();
            for (score, delta) in scores.iter_mut().zip(fitted.row_values.iter()) {
                *score += delta;
            }
            for (total, gain) in feature_gains.iter_mut().zip(fitted.gains.iter()) {
                *total += gain;
            }
            trees.push(fitted.tree);
        }

        Ok(GradientBoostingClassifier {
            params: self.params,
            ensemble: Ensemble {
                classes: classes.to_vec(),
                init_score,
                trees,
                feature_names: data.feature_names().to_vec(),
                feature_gains,
            },
            _state: PhantomData,
        })
    }
}

impl GradientBoostingClassifier<Fitted> {
    pub fn params(&self) -> &BoostingParams {
        &self.params
    }

    pub fn classes(&self) -> &[f64] {
        &self.ensemble.classes
    }

    pub fn n_trees(&self) -> usize {
        self.ensemble.trees.len()
    }

    pub fn feature_names(&self) -> &[String] {
        &self.ensemble.feature_names
    }

    /// Total split gain per feature, aligned with [`Self::feature_names`].
    pub fn feature_importances(&self) -> &[f64] {
        &self.ensemble.feature_gains
    }

    fn check_width(&self, x: &ArrayView2<'_, f64>) -> Result<()> {
        let expected = self.ensemble.feature_names.len();
        if x.ncols() != expected {
            return Err(PipelineError::column(format!(
                "model expects {expected} features, got {}",
                x.ncols()
            )));
        }
        Ok(())
    }
}

impl InferenceModel for GradientBoostingClassifier<Fitted> {
    type ParamsRepr = GbdtArtifact;

    fn predict_proba(&self, x: ArrayView2<'_, f64>) -> Result<Vec<f64>> {
        self.check_width(&x)?;
        Ok(x.rows()
            .into_iter()
            .map(|row| {
                let raw = self
                    .ensemble
                    .trees
                    .iter()
                    .fold(self.ensemble.init_score, |acc, t| acc + t.predict_row(row));
                sigmoid(raw)
            })
            .collect())
    }

    fn predict(&self, x: ArrayView2<'_, f64>) -> Result<Vec<f64>> {
        let [negative, positive] = [self.ensemble.classes[0], self.ensemble.classes[1]];
        Ok(self
            .predict_proba(x)?
            .into_iter()
            .map(|p| if p > 0.5 { positive } else { negative })
            .collect())
    }

    fn extract_params(&self) -> GbdtArtifact {
        GbdtArtifact {
            params: self.params.clone(),
            ensemble: self.ensemble.clone(),
        }
    }

    fn from_params(artifact: GbdtArtifact) -> Result<Self> {
        let ensemble = artifact.ensemble;
        if ensemble.classes.len() != 2 {
            return Err(PipelineError::fit(format!(
                "artifact holds {} classes, expected 2",
                ensemble.classes.len()
            )));
        }
        if ensemble.feature_gains.len() != ensemble.feature_names.len() {
            return Err(PipelineError::fit("artifact feature metadata is inconsistent"));
        }
        Ok(Self {
            params: artifact.params,
            ensemble,
            _state: PhantomData,
        })
    }
}

/// Sorted pair of distinct label values.
fn binary_classes(labels: &[f64]) -> Result<[f64; 2]> {
    if let Some(bad) = labels.iter().find(|y| !y.is_finite()) {
        return Err(PipelineError::fit(format!("label {bad} is not finite")));
    }
    let mut distinct = labels.to_vec();
    distinct.sort_by(f64::total_cmp);
    distinct.dedup();
    match distinct.as_slice() {
        [a, b] => Ok([*a, *b]),
        [_] | [] => Err(PipelineError::fit(
            "training labels contain fewer than two classes",
        )),
        more => Err(PipelineError::fit(format!(
            "binary classifier got {} classes",
            more.len()
        ))),
    }
}

fn sigmoid(x: f64) -> f64 {
    1.0 / (1.0 + (-x).exp())
}
