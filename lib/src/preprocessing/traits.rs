//! Core traits for table transformers.
//!
//! This module defines the two central traits:
//! - [`Transformer`]: Used during fitting; has settings and can learn from a table.
//! - [`FittedTransformer`]: After fitting; applies what it learned and can be serialized.

use crate::dataset::Table;
use crate::error::Result;
use crate::serialization::{load_params, save_params, SerializableParams};
use std::path::Path;

/// Trait for unfitted transformers.
///
/// A transformer learns state from one table (category vocabularies, skewed
/// column names, selected features) and can then apply it to any table that
/// carries the same columns.
///
/// # Example
/// ```ignore
/// use reservation_pipeline::preprocessing::{CategoryEncoder, FittedTransformer, Transformer};
///
/// let encoder = CategoryEncoder::new(vec!["type_of_meal_plan".to_string()]);
/// let fitted = encoder.fit(&train)?;
/// let encoded_test = fitted.transform(&test)?;
/// ```
pub trait Transformer: Clone {
    /// The fitted transformer type.
    type Fitted: FittedTransformer;

    /// Learn state from `table`.
    ///
    /// # Errors
    /// `Column` if a configured column is absent or has the wrong type.
    fn fit(&self, table: &Table) -> Result<Self::Fitted>;

    /// Fit on `table` and transform that same table.
    fn fit_transform(&self, table: &Table) -> Result<Table> {
        self.fit(table)?.transform(table)
    }
}

/// Trait for fitted transformers.
///
/// # Guarantees
/// - `extract_params()` + `from_params()` is a round-trip.
pub trait FittedTransformer: Clone {
    /// Serializable representation of learned state.
    type Params: SerializableParams;

    /// Apply the learned state, returning a new table.
    fn transform(&self, table: &Table) -> Result<Table>;

    fn extract_params(&self) -> Self::Params;

    fn from_params(params: Self::Params) -> Result<Self>
    where
        Self: Sized;

    fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        save_params(&self.extract_params(), path)
    }

    fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self>
    where
        Self: Sized,
    {
        Self::from_params(load_params(path)?)
    }
}
