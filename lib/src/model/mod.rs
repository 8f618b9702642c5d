//! Classifiers with compile-time training state.
//!
//! - [`GradientBoostingClassifier<Unfitted>`] carries hyper-parameters and is
//!   consumed by `fit`.
//! - [`GradientBoostingClassifier<Fitted>`] implements [`InferenceModel`] and
//!   is the persisted artifact of the training stage.

pub mod binning;
pub mod gbdt;
pub mod state;
pub mod tree;

pub use gbdt::{BoostingParams, GbdtArtifact, GradientBoostingClassifier};
pub use state::{Fitted, Unfitted};

use crate::error::Result;
use crate::serialization::{load_params, save_params, SerializableParams};
use ndarray::ArrayView2;
use std::path::Path;

/// Inference interface of a trained binary classifier.
pub trait InferenceModel: Sized {
    /// Serializable representation of the fitted model.
    type ParamsRepr: SerializableParams;

    /// Probability of the positive (larger) class for every row.
    fn predict_proba(&self, x: ArrayView2<'_, f64>) -> Result<Vec<f64>>;

    /// Predicted class label for every row.
    fn predict(&self, x: ArrayView2<'_, f64>) -> Result<Vec<f64>>;

    fn extract_params(&self) -> Self::ParamsRepr;

    fn from_params(params: Self::ParamsRepr) -> Result<Self>;

    /// Serialize the model to `path`, replacing any previous artifact.
    fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        save_params(&self.extract_params(), path)
    }

    fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::from_params(load_params(path)?)
    }
}
