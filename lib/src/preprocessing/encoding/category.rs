//! Integer encoding of categorical columns.

use crate::dataset::{Column, Table};
use crate::error::{PipelineError, Result};
use crate::preprocessing::traits::{FittedTransformer, Transformer};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashMap};

/// Category → code table per column, in a stable order for logs and audit files.
pub type CategoryMappings = BTreeMap<String, BTreeMap<String, usize>>;

/// Encoder for a set of categorical columns.
///
/// # Example
/// ```rust
/// use reservation_pipeline::dataset::{Column, Table};
/// use reservation_pipeline::preprocessing::{CategoryEncoder, FittedTransformer, Transformer};
///
/// let table = Table::new(
///     vec!["room".to_string()],
///     vec![Column::Text(vec!["B".into(), "A".into(), "C".into(), "A".into()])],
/// )
/// .unwrap();
/// let fitted = CategoryEncoder::new(vec!["room".to_string()]).fit(&table).unwrap();
/// let encoded = fitted.transform(&table).unwrap();
/// assert_eq!(encoded.numeric("room").unwrap(), &[1.0, 0.0, 2.0, 0.0]);
/// ```
#[derive(Clone, Debug)]
pub struct CategoryEncoder {
    columns: Vec<String>,
}

impl CategoryEncoder {
    pub fn new(columns: Vec<String>) -> Self {
        Self { columns }
    }

    /// Fit over the union of the vocabularies found in several tables.
    ///
    /// Every configured column must be present in every table.
    pub fn fit_many(&self, tables: &[&Table]) -> Result<FittedCategoryEncoder> {
        let mut classes = Vec::with_capacity(self.columns.len());
        for name in &self.columns {
            let mut seen = BTreeSet::new();
            let mut numeric = true;
            for table in tables {
                let column = table.column(name)?;
                numeric &= column.is_numeric();
                seen.extend((0..column.len()).map(|row| column.cell(row).into_owned()));
            }
            let mut values: Vec<String> = seen.into_iter().collect();
            if numeric {
                values.sort_by(|a, b| numeric_key(a).total_cmp(&numeric_key(b)));
            }
            classes.push(values);
        }
        Ok(FittedCategoryEncoder::build(self.columns.clone(), classes))
    }
}

impl Transformer for CategoryEncoder {
    type Fitted = FittedCategoryEncoder;

    fn fit(&self, table: &Table) -> Result<FittedCategoryEncoder> {
        self.fit_many(&[table])
    }
}

/// Missing numeric cells render as "" and sort after every number.
fn numeric_key(cell: &str) -> f64 {
    cell.parse::<f64>().unwrap_or(f64::INFINITY)
}

/// Serializable parameters for a fitted [`CategoryEncoder`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CategoryEncoderParams {
    pub columns: Vec<String>,
    /// Sorted distinct values per column; the position is the code.
    pub classes: Vec<Vec<String>>,
}

/// Fitted encoder ready to transform tables.
#[derive(Clone, Debug)]
pub struct FittedCategoryEncoder {
    columns: Vec<String>,
    classes: Vec<Vec<String>>,
    lookup: Vec<HashMap<String, usize>>,
}

impl FittedCategoryEncoder {
    fn build(columns: Vec<String>, classes: Vec<Vec<String>>) -> Self {
        let lookup = classes
            .iter()
            .map(|values| {
                values
                    .iter()
                    .enumerate()
                    .map(|(code, v)| (v.clone(), code))
                    .collect()
            })
            .collect();
        Self {
            columns,
            classes,
            lookup,
        }
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Sorted distinct values of `column`, or `None` if it was not fitted.
    pub fn classes(&self, column: &str) -> Option<&[String]> {
        self.columns
            .iter()
            .position(|c| c == column)
            .map(|i| self.classes[i].as_slice())
    }

    pub fn mappings(&self) -> CategoryMappings {
        self.columns
            .iter()
            .zip(self.classes.iter())
            .map(|(name, values)| {
                let codes = values
                    .iter()
                    .enumerate()
                    .map(|(code, v)| (v.clone(), code))
                    .collect();
                (name.clone(), codes)
            })
            .collect()
    }

    fn encode(&self, idx: usize, column: &Column) -> Result<Column> {
        let lookup = &self.lookup[idx];
        let mut codes = Vec::with_capacity(column.len());
        for row in 0..column.len() {
            let cell = column.cell(row);
            let code = lookup.get(cell.as_ref()).ok_or_else(|| {
                PipelineError::column(format!(
                    "unknown category '{cell}' in column '{}'",
                    self.columns[idx]
                ))
            })?;
            codes.push(*code as f64);
        }
        Ok(Column::Numeric(codes))
    }
}

impl FittedTransformer for FittedCategoryEncoder {
    type Params = CategoryEncoderParams;

    fn transform(&self, table: &Table) -> Result<Table> {
        let mut out = table.clone();
        for (idx, name) in self.columns.iter().enumerate() {
            let encoded = self.encode(idx, table.column(name)?)?;
            out.replace_column(name, encoded)?;
        }
        Ok(out)
    }

    fn extract_params(&self) -> CategoryEncoderParams {
        CategoryEncoderParams {
            columns: self.columns.clone(),
            classes: self.classes.clone(),
        }
    }

    fn from_params(params: CategoryEncoderParams) -> Result<Self> {
        if params.columns.len() != params.classes.len() {
            return Err(PipelineError::config(format!(
                "{} encoded columns but {} class lists",
                params.columns.len(),
                params.classes.len()
            )));
        }
        Ok(Self::build(params.columns, params.classes))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    fn table(meal: &[&str], parking: &[f64]) -> Table {
        Table::new(
            vec!["meal".to_string(), "parking".to_string()],
            vec![
                Column::Text(meal.iter().map(|s| s.to_string()).collect()),
                Column::Numeric(parking.to_vec()),
            ],
        )
        .unwrap()
    }

    fn encoder() -> CategoryEncoder {
        CategoryEncoder::new(vec!["meal".to_string(), "parking".to_string()])
    }

    #[test]
    fn test_codes_follow_sorted_order() {
        let t = table(&["Not Selected", "Meal Plan 1", "Meal Plan 2"], &[1.0, 0.0, 1.0]);
        let encoded = encoder().fit_transform(&t).unwrap();
        assert_eq!(encoded.numeric("meal").unwrap(), &[2.0, 0.0, 1.0]);
        assert_eq!(encoded.numeric("parking").unwrap(), &[1.0, 0.0, 1.0]);
    }

    #[test]
    fn test_numeric_categories_sort_numerically() {
        let t = table(&["a", "a", "a"], &[10.0, 9.0, 100.0]);
        let fitted = encoder().fit(&t).unwrap();
        assert_eq!(fitted.classes("parking").unwrap(), &["9", "10", "100"]);
    }

    #[test]
    fn test_fit_many_uses_union_vocabulary() {
        let train = table(&["A", "B"], &[0.0, 1.0]);
        let test = table(&["C", "A"], &[0.0, 0.0]);
        let fitted = encoder().fit_many(&[&train, &test]).unwrap();

        let train_codes = fitted.transform(&train).unwrap();
        let test_codes = fitted.transform(&test).unwrap();
        assert_eq!(train_codes.numeric("meal").unwrap(), &[0.0, 1.0]);
        assert_eq!(test_codes.numeric("meal").unwrap(), &[2.0, 0.0]);
    }

    #[test]
    fn test_unknown_category_is_column_error() {
        let train = table(&["A", "B"], &[0.0, 1.0]);
        let test = table(&["Z", "A"], &[0.0, 1.0]);
        let fitted = encoder().fit(&train).unwrap();
        let err = fitted.transform(&test).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Column);
    }

    #[test]
    fn test_missing_column_is_column_error() {
        let t = Table::new(vec!["other".to_string()], vec![Column::Numeric(vec![1.0])]).unwrap();
        let err = encoder().fit(&t).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Column);
    }

    #[test]
    fn test_mappings_report_codes() {
        let t = table(&["B", "A"], &[0.0, 1.0]);
        let mappings = encoder().fit(&t).unwrap().mappings();
        assert_eq!(mappings["meal"]["A"], 0);
        assert_eq!(mappings["meal"]["B"], 1);
        assert_eq!(mappings["parking"]["1"], 1);
    }

    #[test]
    fn test_serialization_round_trip() {
        let t = table(&["B", "A", "C"], &[0.0, 1.0, 0.0]);
        let fitted = encoder().fit(&t).unwrap();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("encoder.bin");
        fitted.save_to_file(&path).unwrap();
        let loaded = FittedCategoryEncoder::load_from_file(&path).unwrap();
        assert_eq!(loaded.extract_params(), fitted.extract_params());
        assert_eq!(loaded.transform(&t).unwrap(), fitted.transform(&t).unwrap());
    }
}
