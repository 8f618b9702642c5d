//! Synthetic minority oversampling (SMOTE).
//!
//! Every class smaller than the largest one is grown to the majority count.
//! A synthetic row is placed at a random point on the segment between a
//! randomly drawn class member and one of its `k` nearest same-class
//! neighbours (Euclidean distance). Original rows are kept unchanged and
//! synthetic rows are appended after them.

use crate::dataset::LabeledData;
use crate::error::{ErrorKind, PipelineError, Result};
use ndarray::{Array2, ArrayView1};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rayon::prelude::*;

/// Number of rows per distinct label, in ascending label order.
pub fn class_counts(labels: &[f64]) -> Vec<(f64, usize)> {
    let mut sorted = labels.to_vec();
    sorted.sort_by(f64::total_cmp);
    let mut counts: Vec<(f64, usize)> = Vec::new();
    for y in sorted {
        match counts.last_mut() {
            Some((label, n)) if label.total_cmp(&y).is_eq() => *n += 1,
            _ => counts.push((y, 1)),
        }
    }
    counts
}

#[derive(Clone, Debug)]
pub struct Smote {
    k_neighbors: usize,
    seed: u64,
}

impl Smote {
    pub fn new(k_neighbors: usize, seed: u64) -> Self {
        Self { k_neighbors, seed }
    }

    /// Return `data` with synthetic rows appended until all classes are equal.
    ///
    /// # Errors
    /// - `ClassImbalance` when fewer than two classes are present.
    /// - `Column` when a label is missing (`NaN`).
    /// - `Config` when `k_neighbors` is zero.
    pub fn fit_resample(&self, data: &LabeledData) -> Result<LabeledData> {
        if self.k_neighbors == 0 {
            return Err(PipelineError::config("SMOTE needs at least one neighbour"));
        }
        if data.labels().iter().any(|y| y.is_nan()) {
            return Err(PipelineError::column("target column contains missing labels"));
        }
        let counts = class_counts(data.labels());
        if counts.len() < 2 {
            return Err(PipelineError::class_imbalance(format!(
                "oversampling needs at least two classes, found {}",
                counts.len()
            )));
        }
        let majority = counts.iter().map(|&(_, n)| n).max().unwrap_or(0);

        let mut rng = ChaCha8Rng::seed_from_u64(self.seed);
        let x = data.features();
        let n_features = data.n_features();
        let mut new_rows: Vec<f64> = Vec::new();
        let mut new_labels: Vec<f64> = Vec::new();

        for &(label, n) in &counts {
            let needed = majority - n;
            if needed == 0 {
                continue;
            }
            let members: Vec<usize> = data
                .labels()
                .iter()
                .enumerate()
                .filter(|(_, y)| y.total_cmp(&label).is_eq())
                .map(|(i, _)| i)
                .collect();

            if members.len() == 1 {
                let row = x.row(members[0]);
                for _ in 0..needed {
                    new_rows.extend(row.iter());
                }
            } else {
                let k = self.k_neighbors.min(members.len() - 1);
                let neighbours = nearest_neighbours(x, &members, k);
                for _ in 0..needed {
                    let i = rng.random_range(0..members.len());
                    let j = neighbours[i][rng.random_range(0..k)];
                    let gap: f64 = rng.random();
                    let base = x.row(members[i]);
                    let other = x.row(j);
                    new_rows.extend(base.iter().zip(other.iter()).map(|(a, b)| a + gap * (b - a)));
                }
            }
            new_labels.extend(std::iter::repeat(label).take(needed));
        }

        let n_out = data.len() + new_labels.len();
        let mut values = Vec::with_capacity(n_out * n_features);
        values.extend(x.iter());
        values.extend(new_rows);
        let features = Array2::from_shape_vec((n_out, n_features), values).map_err(|e| {
            PipelineError::with_source(ErrorKind::Fit, "resampled feature matrix shape", e)
        })?;
        let mut labels = data.labels().to_vec();
        labels.extend(new_labels);
        LabeledData::new(features, labels, data.feature_names().to_vec())
    }
}

/// For each member, the row indices of its `k` nearest other members.
fn nearest_neighbours(x: &Array2<f64>, members: &[usize], k: usize) -> Vec<Vec<usize>> {
    members
        .par_iter()
        .map(|&i| {
            let row = x.row(i);
            let mut dists: Vec<(f64, usize)> = members
                .iter()
                .filter(|&&j| j != i)
                .map(|&j| (squared_distance(row, x.row(j)), j))
                .collect();
            let k = k.min(dists.len());
            if k < dists.len() {
                dists.select_nth_unstable_by(k - 1, |a, b| a.0.total_cmp(&b.0));
                dists.truncate(k);
            }
            dists.sort_by(|a, b| a.0.total_cmp(&b.0));
            dists.into_iter().map(|(_, j)| j).collect()
        })
        .collect()
}

fn squared_distance(a: ArrayView1<'_, f64>, b: ArrayView1<'_, f64>) -> f64 {
    a.iter().zip(b.iter()).map(|(p, q)| (p - q) * (p - q)).sum()
}
