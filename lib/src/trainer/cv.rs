//! Stratified k-fold cross-validation splits.

use crate::error::{PipelineError, Result};
use crate::preprocessing::class_counts;

/// `(train_indices, test_indices)` for one fold.
pub type Fold = (Vec<usize>, Vec<usize>);

/// Splits rows into `k` folds preserving class proportions.
///
/// Rows are not shuffled: within each class, consecutive members form
/// contiguous blocks, one per fold, whose sizes differ by at most one.
#[derive(Debug, Clone, Copy)]
pub struct StratifiedKFold {
    k: usize,
}

impl StratifiedKFold {
    pub fn new(k: usize) -> Self {
        Self { k }
    }

    pub fn split(&self, labels: &[f64]) -> Result<Vec<Fold>> {
        let k = self.k;
        if k < 2 {
            return Err(PipelineError::config(format!(
                "cross-validation needs at least 2 folds, got {k}"
            )));
        }
        if labels.len() < k {
            return Err(PipelineError::fit(format!(
                "cannot split {} rows into {k} folds",
                labels.len()
            )));
        }

        let counts = class_counts(labels);
        let largest = counts.iter().map(|&(_, n)| n).max().unwrap_or(0);
        if largest < k {
            return Err(PipelineError::fit(format!(
                "cannot split into {k} folds: the largest class has only {largest} members"
            )));
        }

        let mut fold_of = vec![0usize; labels.len()];
        for (class, _) in counts {
            let members: Vec<usize> = labels
                .iter()
                .enumerate()
                .filter(|(_, y)| y.total_cmp(&class).is_eq())
                .map(|(i, _)| i)
                .collect();
            let (base, extra) = (members.len() / k, members.len() % k);
            let mut start = 0;
            for fold in 0..k {
                let size = base + usize::from(fold < extra);
                for &row in &members[start..start + size] {
                    fold_of[row] = fold;
                }
                start += size;
            }
        }

        Ok((0..k)
            .map(|fold| {
                let (test, train): (Vec<usize>, Vec<usize>) =
                    (0..labels.len()).partition(|&row| fold_of[row] == fold);
                (train, test)
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_folds_partition_rows() {
        let labels = [0.0, 1.0, 0.0, 1.0, 0.0, 0.0, 1.0, 0.0];
        let folds = StratifiedKFold::new(2).split(&labels).unwrap();
        assert_eq!(folds.len(), 2);
        let mut seen: Vec<usize> = folds.iter().flat_map(|(_, test)| test.clone()).collect();
        seen.sort();
        assert_eq!(seen, (0..labels.len()).collect::<Vec<_>>());
        for (train, test) in &folds {
            assert_eq!(train.len() + test.len(), labels.len());
            assert!(train.iter().all(|r| !test.contains(r)));
        }
    }

    #[test]
    fn test_folds_are_stratified() {
        let labels: Vec<f64> = (0..30).map(|i| if i % 3 == 0 { 1.0 } else { 0.0 }).collect();
        let folds = StratifiedKFold::new(5).split(&labels).unwrap();
        for (_, test) in folds {
            let positives = test.iter().filter(|&&r| labels[r] == 1.0).count();
            assert_eq!(test.len(), 6);
            assert_eq!(positives, 2);
        }
    }

    #[test]
    fn test_too_few_rows_is_error() {
        assert!(StratifiedKFold::new(3).split(&[0.0, 1.0]).is_err());
        assert!(StratifiedKFold::new(1).split(&[0.0, 1.0]).is_err());
    }

    #[test]
    fn test_folds_beyond_class_sizes_are_rejected() {
        let labels = [0.0, 0.0, 1.0, 1.0, 0.0, 1.0];
        let err = StratifiedKFold::new(5).split(&labels).unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::Fit);

        let folds = StratifiedKFold::new(3).split(&labels).unwrap();
        assert!(folds.iter().all(|(_, test)| !test.is_empty()));
    }
}
