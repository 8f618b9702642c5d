/// A marker type indicating that a classifier is **not yet trained**.
///
/// Used as the state parameter of [`GradientBoostingClassifier`](super::GradientBoostingClassifier):
/// an `Unfitted` classifier only carries hyper-parameters and exposes `fit`.
/// Prediction is not available until fitting produces a `Fitted` classifier.
#[derive(Debug, Clone, Copy)]
pub struct Unfitted;

/// A marker type indicating that a classifier has been **fully trained**.
///
/// A `Fitted` classifier implements [`InferenceModel`](super::InferenceModel)
/// and can be serialized or used for prediction.
#[derive(Debug, Clone, Copy)]
pub struct Fitted;
