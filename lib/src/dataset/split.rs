//! Seeded train/test partitioning.

use crate::dataset::Table;
use crate::error::{PipelineError, Result};
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

/// Randomly partition rows into `(train, test)`.
///
/// The test partition receives `ceil(n * (1 - train_ratio))` rows, the train
/// partition the rest. The same table and seed always yield the same
/// membership.
///
/// # Errors
/// `Config` for a ratio outside `(0, 1)`, `Parse` for fewer than two rows.
pub fn train_test_split(table: &Table, train_ratio: f64, seed: u64) -> Result<(Table, Table)> {
    if !(train_ratio > 0.0 && train_ratio < 1.0) {
        return Err(PipelineError::config(format!(
            "train ratio must be in (0, 1), got {train_ratio}"
        )));
    }
    let n = table.n_rows();
    if n < 2 {
        return Err(PipelineError::parse(format!(
            "cannot split a table of {n} rows into train and test sets"
        )));
    }

    // Tolerance absorbs representation error in 1 - ratio (e.g. 1 - 0.7).
    let n_test = ((n as f64) * (1.0 - train_ratio) - 1e-9).ceil() as usize;
    let n_test = n_test.clamp(1, n - 1);

    let mut indices: Vec<usize> = (0..n).collect();
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    indices.shuffle(&mut rng);

    let (test_idx, train_idx) = indices.split_at(n_test);
    Ok((table.take(train_idx), table.take(test_idx)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::Column;
    use std::collections::HashSet;

    fn numbered(n: usize) -> Table {
        Table::new(
            vec!["row".into()],
            vec![Column::Numeric((0..n).map(|i| i as f64).collect())],
        )
        .unwrap()
    }

    fn ids(table: &Table) -> Vec<u64> {
        table.numeric("row").unwrap().iter().map(|&x| x as u64).collect()
    }

    #[test]
    fn test_sizes_follow_ratio() {
        let (train, test) = train_test_split(&numbered(100), 0.8, 97).unwrap();
        assert_eq!(train.n_rows(), 80);
        assert_eq!(test.n_rows(), 20);

        let (train, test) = train_test_split(&numbered(100), 0.7, 97).unwrap();
        assert_eq!(train.n_rows(), 70);
        assert_eq!(test.n_rows(), 30);

        let (train, test) = train_test_split(&numbered(7), 0.5, 1).unwrap();
        assert_eq!(train.n_rows() + test.n_rows(), 7);
        assert_eq!(test.n_rows(), 4);
    }

    #[test]
    fn test_partitions_are_disjoint_and_complete() {
        let (train, test) = train_test_split(&numbered(57), 0.75, 3).unwrap();
        let a: HashSet<u64> = ids(&train).into_iter().collect();
        let b: HashSet<u64> = ids(&test).into_iter().collect();
        assert!(a.is_disjoint(&b));
        assert_eq!(a.len() + b.len(), 57);
    }

    #[test]
    fn test_same_seed_same_split() {
        let table = numbered(40);
        let (train1, test1) = train_test_split(&table, 0.8, 97).unwrap();
        let (train2, test2) = train_test_split(&table, 0.8, 97).unwrap();
        assert_eq!(ids(&train1), ids(&train2));
        assert_eq!(ids(&test1), ids(&test2));

        let (train3, _) = train_test_split(&table, 0.8, 98).unwrap();
        assert_ne!(ids(&train1), ids(&train3));
    }

    #[test]
    fn test_invalid_inputs() {
        assert!(train_test_split(&numbered(10), 0.0, 1).is_err());
        assert!(train_test_split(&numbered(10), 1.0, 1).is_err());
        assert!(train_test_split(&numbered(1), 0.5, 1).is_err());
    }
}
