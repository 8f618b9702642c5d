//! Binary classification metrics.
//!
//! All metrics are derived from the confusion matrix of predicted versus true
//! labels for a designated positive class. Undefined ratios (no predicted or
//! no actual positives) evaluate to 0.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Label treated as the positive class.
pub const POSITIVE_LABEL: f64 = 1.0;

/// Metric used to rank hyper-parameter candidates.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Scoring {
    #[default]
    Accuracy,
    Precision,
    Recall,
    F1,
}

impl Scoring {
    pub fn score(&self, y_true: &[f64], y_pred: &[f64]) -> f64 {
        let m = ClassificationMetrics::compute(y_true, y_pred, POSITIVE_LABEL);
        match self {
            Scoring::Accuracy => m.accuracy,
            Scoring::Precision => m.precision,
            Scoring::Recall => m.recall,
            Scoring::F1 => m.f1,
        }
    }
}

impl fmt::Display for Scoring {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Scoring::Accuracy => "accuracy",
            Scoring::Precision => "precision",
            Scoring::Recall => "recall",
            Scoring::F1 => "f1",
        };
        f.write_str(name)
    }
}

/// Accuracy, precision, recall and F1 for one evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ClassificationMetrics {
    pub accuracy: f64,
    pub precision: f64,
    pub recall: f64,
    pub f1: f64,
}

impl ClassificationMetrics {
    /// Compute metrics from paired true and predicted labels.
    ///
    /// # Panics
    /// Panics if the slices differ in length.
    pub fn compute(y_true: &[f64], y_pred: &[f64], positive: f64) -> Self {
        assert_eq!(
            y_true.len(),
            y_pred.len(),
            "Arrays must have the same length"
        );

        let mut tp = 0usize;
        let mut fp = 0usize;
        let mut fn_count = 0usize;
        let mut correct = 0usize;
        for (&t, &p) in y_true.iter().zip(y_pred.iter()) {
            if t == p {
                correct += 1;
            }
            match (p == positive, t == positive) {
                (true, true) => tp += 1,
                (true, false) => fp += 1,
                (false, true) => fn_count += 1,
                (false, false) => {}
            }
        }

        let accuracy = ratio(correct, y_true.len());
        let precision = ratio(tp, tp + fp);
        let recall = ratio(tp, tp + fn_count);
        let f1 = if precision + recall > 0.0 {
            2.0 * precision * recall / (precision + recall)
        } else {
            0.0
        };

        Self {
            accuracy,
            precision,
            recall,
            f1,
        }
    }

    /// Flat name → value mapping.
    pub fn to_map(&self) -> BTreeMap<String, f64> {
        BTreeMap::from([
            ("accuracy".to_string(), self.accuracy),
            ("precision".to_string(), self.precision),
            ("recall".to_string(), self.recall),
            ("f1".to_string(), self.f1),
        ])
    }
}

fn ratio(num: usize, den: usize) -> f64 {
    if den == 0 {
        0.0
    } else {
        num as f64 / den as f64
    }
}
