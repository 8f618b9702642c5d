//! Hyper-parameter distributions and sampled candidates.

use crate::config::{FloatRange, IntRange, SearchSpaceConfig};
use crate::model::BoostingParams;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fmt;

/// One sampled hyper-parameter combination.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ParamSet {
    pub n_estimators: usize,
    pub max_depth: i64,
    pub learning_rate: f64,
    pub num_leaves: usize,
    pub min_child_samples: usize,
}

impl ParamSet {
    /// Overlay the sampled values on `base`.
    pub fn apply(&self, base: &BoostingParams) -> BoostingParams {
        BoostingParams {
            n_estimators: self.n_estimators,
            max_depth: self.max_depth,
            learning_rate: self.learning_rate,
            num_leaves: self.num_leaves,
            min_child_samples: self.min_child_samples,
            ..base.clone()
        }
    }
}

impl fmt::Display for ParamSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "learning_rate={:.6}, max_depth={}, min_child_samples={}, n_estimators={}, num_leaves={}",
            self.learning_rate,
            self.max_depth,
            self.min_child_samples,
            self.n_estimators,
            self.num_leaves
        )
    }
}

/// Uniform distributions over half-open ranges.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchSpace {
    n_estimators: IntRange,
    max_depth: IntRange,
    learning_rate: FloatRange,
    num_leaves: IntRange,
    min_child_samples: IntRange,
}

impl From<&SearchSpaceConfig> for SearchSpace {
    fn from(config: &SearchSpaceConfig) -> Self {
        Self {
            n_estimators: config.n_estimators,
            max_depth: config.max_depth,
            learning_rate: config.learning_rate,
            num_leaves: config.num_leaves,
            min_child_samples: config.min_child_samples,
        }
    }
}

impl Default for SearchSpace {
    fn default() -> Self {
        Self::from(&SearchSpaceConfig::default())
    }
}

impl SearchSpace {
    /// Draw one candidate. Ranges are assumed validated (non-empty, counts
    /// at least 1).
    pub fn sample<R: Rng>(&self, rng: &mut R) -> ParamSet {
        ParamSet {
            n_estimators: int(rng, self.n_estimators).max(1) as usize,
            max_depth: int(rng, self.max_depth),
            learning_rate: rng.random_range(self.learning_rate.low..self.learning_rate.high),
            num_leaves: int(rng, self.num_leaves).max(2) as usize,
            min_child_samples: int(rng, self.min_child_samples).max(1) as usize,
        }
    }

    /// Draw `n` candidates in order.
    pub fn sample_n<R: Rng>(&self, rng: &mut R, n: usize) -> Vec<ParamSet> {
        (0..n).map(|_| self.sample(rng)).collect()
    }
}

fn int<R: Rng>(rng: &mut R, range: IntRange) -> i64 {
    rng.random_range(range.low..range.high)
}
