//! Feature selection by boosted-tree importance.

use crate::dataset::Table;
use crate::error::{PipelineError, Result};
use crate::model::{BoostingParams, GradientBoostingClassifier};
use crate::preprocessing::traits::{FittedTransformer, Transformer};
use serde::{Deserialize, Serialize};

/// Keeps the `n_features` features with the largest total split gain.
///
/// Importance comes from a classifier fitted on the table itself; ties keep
/// table order. The target column is always kept, last.
#[derive(Clone, Debug)]
pub struct FeatureSelector {
    target: String,
    n_features: usize,
    params: BoostingParams,
}

impl FeatureSelector {
    pub fn new(target: impl Into<String>, n_features: usize) -> Self {
        Self {
            target: target.into(),
            n_features,
            params: BoostingParams::default(),
        }
    }

    pub fn with_params(mut self, params: BoostingParams) -> Self {
        self.params = params;
        self
    }
}

impl Transformer for FeatureSelector {
    type Fitted = FittedFeatureSelector;

    fn fit(&self, table: &Table) -> Result<FittedFeatureSelector> {
        if self.n_features == 0 {
            return Err(PipelineError::config("feature selection needs at least one feature"));
        }
        let data = table.features_and_target(&self.target)?;
        let model = GradientBoostingClassifier::new(self.params.clone()).fit(&data)?;

        let mut ranked: Vec<(&String, f64)> = model
            .feature_names()
            .iter()
            .zip(model.feature_importances().iter().copied())
            .collect();
        ranked.sort_by(|a, b| b.1.total_cmp(&a.1));
        for (name, gain) in &ranked {
            tracing::debug!(feature = %name, gain, "feature importance");
        }

        let selected = ranked
            .into_iter()
            .take(self.n_features)
            .map(|(name, _)| name.clone())
            .collect();
        Ok(FittedFeatureSelector {
            selected,
            target: self.target.clone(),
        })
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FittedFeatureSelector {
    selected: Vec<String>,
    target: String,
}

impl FittedFeatureSelector {
    /// Kept features, most important first.
    pub fn selected(&self) -> &[String] {
        &self.selected
    }
}

impl FittedTransformer for FittedFeatureSelector {
    type Params = FittedFeatureSelector;

    fn transform(&self, table: &Table) -> Result<Table> {
        let mut columns: Vec<&str> = self.selected.iter().map(String::as_str).collect();
        columns.push(&self.target);
        table.select(columns.as_slice())
    }

    fn extract_params(&self) -> FittedFeatureSelector {
        self.clone()
    }

    fn from_params(params: FittedFeatureSelector) -> Result<Self> {
        Ok(params)
    }
}
