//! Feature discretization for histogram-based tree building.

use ndarray::Array2;

/// Upper bound on the number of bins per feature (bins are stored as `u8`).
pub const MAX_BINS: usize = 256;

/// Maps raw values of one feature to bin indices.
///
/// Bin `b` holds values in `(thresholds[b - 1], thresholds[b]]`; the last bin
/// holds everything above the last threshold as well as `NaN`.
#[derive(Debug, Clone, PartialEq)]
pub struct BinMapper {
    thresholds: Vec<f64>,
}

impl BinMapper {
    /// Learn bin boundaries from the observed values of one feature.
    ///
    /// With at most `max_bins` distinct values every value gets its own bin
    /// and boundaries sit halfway between neighbours; otherwise boundaries
    /// are taken at evenly spaced quantiles.
    pub fn fit(values: &[f64], max_bins: usize) -> Self {
        let max_bins = max_bins.clamp(2, MAX_BINS);
        let mut sorted: Vec<f64> = values.iter().copied().filter(|v| !v.is_nan()).collect();
        sorted.sort_by(f64::total_cmp);

        let mut distinct = sorted.clone();
        distinct.dedup();

        let thresholds = if distinct.len() <= max_bins {
            distinct.windows(2).map(|w| w[0] + (w[1] - w[0]) / 2.0).collect()
        } else {
            let n = sorted.len();
            let mut cuts: Vec<f64> = (1..max_bins).map(|i| sorted[i * n / max_bins]).collect();
            cuts.dedup();
            // A cut at the maximum would leave the last bin empty.
            if cuts.last() == distinct.last() {
                cuts.pop();
            }
            cuts
        };
        Self { thresholds }
    }

    pub fn n_bins(&self) -> usize {
        self.thresholds.len() + 1
    }

    pub fn bin(&self, value: f64) -> u8 {
        if value.is_nan() {
            return self.thresholds.len() as u8;
        }
        self.thresholds.partition_point(|&t| t < value) as u8
    }

    /// Raw-value threshold equivalent to "bin <= b".
    pub fn upper_bound(&self, bin: usize) -> f64 {
        self.thresholds[bin]
    }
}

/// Column-major binned copy of a feature matrix.
#[derive(Debug, Clone)]
pub struct BinnedMatrix {
    mappers: Vec<BinMapper>,
    columns: Vec<Vec<u8>>,
}

impl BinnedMatrix {
    pub fn from_features(features: &Array2<f64>, max_bins: usize) -> Self {
        let (mappers, columns): (Vec<BinMapper>, Vec<Vec<u8>>) = features
            .columns()
            .into_iter()
            .map(|col| {
                let values = col.to_vec();
                let mapper = BinMapper::fit(&values, max_bins);
                let binned: Vec<u8> = values.iter().map(|&v| mapper.bin(v)).collect();
                (mapper, binned)
            })
            .unzip();
        Self { mappers, columns }
    }

    pub fn n_features(&self) -> usize {
        self.columns.len()
    }

    pub fn mapper(&self, feature: usize) -> &BinMapper {
        &self.mappers[feature]
    }

    pub fn column(&self, feature: usize) -> &[u8] {
        &self.columns[feature]
    }
}
