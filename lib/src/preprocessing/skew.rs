//! Log transform of skewed numerical columns.
//!
//! Skewness is the adjusted Fisher–Pearson sample coefficient
//!
//! ```text
//! G1 = sqrt(n (n - 1)) / (n - 2) * m3 / m2^1.5
//! ```
//!
//! with `m2`, `m3` the biased central moments over the non-missing values.
//! A column whose `G1` exceeds the threshold is replaced by `ln(1 + x)`.

use crate::dataset::{Column, Table};
use crate::error::{PipelineError, Result};
use crate::preprocessing::traits::{FittedTransformer, Transformer};
use serde::{Deserialize, Serialize};

/// Sample skewness of the non-`NaN` values.
///
/// Returns `None` with fewer than three values; a constant column has
/// skewness 0.
pub fn skewness(values: &[f64]) -> Option<f64> {
    let present: Vec<f64> = values.iter().copied().filter(|v| !v.is_nan()).collect();
    let n = present.len();
    if n < 3 {
        return None;
    }
    let nf = n as f64;
    let mean = present.iter().sum::<f64>() / nf;
    let (m2, m3) = present.iter().fold((0.0, 0.0), |(m2, m3), &v| {
        let d = v - mean;
        (m2 + d * d, m3 + d * d * d)
    });
    let (m2, m3) = (m2 / nf, m3 / nf);
    if m2 <= f64::EPSILON * mean.abs().max(1.0) {
        return Some(0.0);
    }
    Some((nf * (nf - 1.0)).sqrt() / (nf - 2.0) * m3 / m2.powf(1.5))
}

/// Selects numerical columns whose skewness exceeds `threshold`.
#[derive(Clone, Debug)]
pub struct SkewCorrector {
    columns: Vec<String>,
    threshold: f64,
}

impl SkewCorrector {
    pub fn new(columns: Vec<String>, threshold: f64) -> Self {
        Self { columns, threshold }
    }
}

impl Transformer for SkewCorrector {
    type Fitted = FittedSkewCorrector;

    fn fit(&self, table: &Table) -> Result<FittedSkewCorrector> {
        let mut skewed = Vec::new();
        for name in &self.columns {
            let values = table.numeric(name)?;
            match skewness(values) {
                Some(s) if s > self.threshold => {
                    tracing::debug!(column = %name, skewness = s, "column exceeds skewness threshold");
                    skewed.push(name.clone());
                }
                _ => {}
            }
        }
        Ok(FittedSkewCorrector { skewed })
    }
}

/// Columns chosen for the `ln(1 + x)` transform.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FittedSkewCorrector {
    skewed: Vec<String>,
}

impl FittedSkewCorrector {
    pub fn skewed_columns(&self) -> &[String] {
        &self.skewed
    }
}

impl FittedTransformer for FittedSkewCorrector {
    type Params = FittedSkewCorrector;

    fn transform(&self, table: &Table) -> Result<Table> {
        let mut out = table.clone();
        for name in &self.skewed {
            let values = table.numeric(name)?;
            if let Some(bad) = values.iter().find(|&&v| v <= -1.0) {
                return Err(PipelineError::column(format!(
                    "column '{name}' holds {bad}, outside the domain of log(1 + x)"
                )));
            }
            let transformed = values.iter().map(|v| v.ln_1p()).collect();
            out.replace_column(name, Column::Numeric(transformed))?;
        }
        Ok(out)
    }

    fn extract_params(&self) -> FittedSkewCorrector {
        self.clone()
    }

    fn from_params(params: FittedSkewCorrector) -> Result<Self> {
        Ok(params)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    fn table(lead_time: Vec<f64>, price: Vec<f64>) -> Table {
        Table::new(
            vec!["lead_time".to_string(), "price".to_string()],
            vec![Column::Numeric(lead_time), Column::Numeric(price)],
        )
        .unwrap()
    }

    #[test]
    fn test_skewness_matches_reference_value() {
        // pandas: pd.Series([1, 2, 3, 10]).skew() == 1.7636...
        let s = skewness(&[1.0, 2.0, 3.0, 10.0]).unwrap();
        assert!((s - 1.763_632_614_8).abs() < 1e-6, "got {s}");
    }

    #[test]
    fn test_skewness_symmetric_is_zero() {
        let s = skewness(&[1.0, 2.0, 3.0, 4.0, 5.0]).unwrap();
        assert!(s.abs() < 1e-12);
    }

    #[test]
    fn test_skewness_edge_cases() {
        assert_eq!(skewness(&[1.0, 2.0]), None);
        assert_eq!(skewness(&[4.0, 4.0, 4.0]), Some(0.0));
        assert_eq!(skewness(&[1.0, f64::NAN, 2.0]), None);
    }

    #[test]
    fn test_only_skewed_columns_are_transformed() {
        let lead = vec![0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 1.0, 500.0];
        let price = vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0, 9.0, 10.0];
        let t = table(lead.clone(), price.clone());
        let corrector = SkewCorrector::new(vec!["lead_time".into(), "price".into()], 1.0);
        let fitted = corrector.fit(&t).unwrap();
        assert_eq!(fitted.skewed_columns(), &["lead_time".to_string()]);

        let out = fitted.transform(&t).unwrap();
        let expected: Vec<f64> = lead.iter().map(|v| v.ln_1p()).collect();
        assert_eq!(out.numeric("lead_time").unwrap(), expected.as_slice());
        assert_eq!(out.numeric("price").unwrap(), price.as_slice());
    }

    #[test]
    fn test_text_column_is_column_error() {
        let t = Table::new(
            vec!["lead_time".to_string()],
            vec![Column::Text(vec!["a".into(), "b".into(), "c".into()])],
        )
        .unwrap();
        let err = SkewCorrector::new(vec!["lead_time".into()], 1.0)
            .fit(&t)
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Column);
    }

    #[test]
    fn test_values_below_domain_rejected() {
        let fitted = FittedSkewCorrector {
            skewed: vec!["lead_time".to_string()],
        };
        let t = table(vec![-2.0, 1.0, 3.0], vec![0.0, 0.0, 0.0]);
        assert_eq!(fitted.transform(&t).unwrap_err().kind(), ErrorKind::Column);
    }
}
