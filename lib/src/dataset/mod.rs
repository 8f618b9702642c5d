//! Tabular data handling for the pipeline stages.
//!
//! This module provides a small column-oriented [`Table`] with mixed numeric
//! and text columns, CSV reading and writing, and the row operations the
//! stages need (duplicate removal, row selection, column replacement).
//!
//! # Example
//!
//! ```rust
//! use reservation_pipeline::dataset::{Column, Table};
//!
//! let table = Table::new(
//!     vec!["id".to_string(), "price".to_string()],
//!     vec![
//!         Column::Text(vec!["a".into(), "b".into()]),
//!         Column::Numeric(vec![10.0, 12.5]),
//!     ],
//! )
//! .unwrap();
//! assert_eq!(table.n_rows(), 2);
//! assert_eq!(table.numeric("price").unwrap(), &[10.0, 12.5]);
//! ```

use crate::error::{ErrorKind, PipelineError, Result};
use std::borrow::Cow;
use std::collections::HashSet;
use std::io::{Read, Write};
use std::path::Path;

pub mod memory;
pub mod split;

pub use self::memory::LabeledData;
pub use self::split::train_test_split;

/// A single column of a [`Table`].
#[derive(Debug, Clone, PartialEq)]
pub enum Column {
    /// Floating point values; missing cells are `NaN`.
    Numeric(Vec<f64>),
    /// Raw text values.
    Text(Vec<String>),
}

impl Column {
    pub fn len(&self) -> usize {
        match self {
            Column::Numeric(v) => v.len(),
            Column::Text(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_numeric(&self) -> bool {
        matches!(self, Column::Numeric(_))
    }

    pub fn as_numeric(&self) -> Option<&[f64]> {
        match self {
            Column::Numeric(v) => Some(v),
            Column::Text(_) => None,
        }
    }

    /// Cell rendered the way it is written to CSV.
    pub fn cell(&self, row: usize) -> Cow<'_, str> {
        match self {
            Column::Numeric(v) => Cow::Owned(format_number(v[row])),
            Column::Text(v) => Cow::Borrowed(v[row].as_str()),
        }
    }

    fn take(&self, indices: &[usize]) -> Column {
        match self {
            Column::Numeric(v) => Column::Numeric(indices.iter().map(|&i| v[i]).collect()),
            Column::Text(v) => Column::Text(indices.iter().map(|&i| v[i].clone()).collect()),
        }
    }

    fn key(&self, row: usize) -> CellKey<'_> {
        match self {
            Column::Numeric(v) => {
                let x = v[row];
                let bits = if x.is_nan() {
                    f64::NAN.to_bits()
                } else if x == 0.0 {
                    0.0f64.to_bits()
                } else {
                    x.to_bits()
                };
                CellKey::Number(bits)
            }
            Column::Text(v) => CellKey::Text(&v[row]),
        }
    }
}

#[derive(Hash, PartialEq, Eq)]
enum CellKey<'a> {
    Number(u64),
    Text(&'a str),
}

/// Column-oriented table with named, equally long columns.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Table {
    names: Vec<String>,
    columns: Vec<Column>,
    n_rows: usize,
}

impl Table {
    /// Build a table, checking that names are unique and lengths agree.
    pub fn new(names: Vec<String>, columns: Vec<Column>) -> Result<Self> {
        if names.len() != columns.len() {
            return Err(PipelineError::parse(format!(
                "{} column names for {} columns",
                names.len(),
                columns.len()
            )));
        }
        let mut seen = HashSet::new();
        for name in &names {
            if !seen.insert(name.as_str()) {
                return Err(PipelineError::parse(format!("duplicate column name '{name}'")));
            }
        }
        let n_rows = columns.first().map(Column::len).unwrap_or(0);
        if let Some((name, col)) = names
            .iter()
            .zip(columns.iter())
            .find(|(_, c)| c.len() != n_rows)
        {
            return Err(PipelineError::parse(format!(
                "column '{name}' has {} rows, expected {n_rows}",
                col.len()
            )));
        }
        Ok(Self {
            names,
            columns,
            n_rows,
        })
    }

    pub fn n_rows(&self) -> usize {
        self.n_rows
    }

    pub fn n_cols(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.n_rows == 0
    }

    pub fn column_names(&self) -> &[String] {
        &self.names
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.position(name).is_some()
    }

    fn position(&self, name: &str) -> Option<usize> {
        self.names.iter().position(|n| n == name)
    }

    fn require(&self, name: &str) -> Result<usize> {
        self.position(name)
            .ok_or_else(|| PipelineError::column(format!("column '{name}' not found in table")))
    }

    pub fn column(&self, name: &str) -> Result<&Column> {
        let idx = self.require(name)?;
        Ok(&self.columns[idx])
    }

    /// Values of a numeric column.
    ///
    /// # Errors
    /// `Column` if the column is absent or holds text.
    pub fn numeric(&self, name: &str) -> Result<&[f64]> {
        self.column(name)?.as_numeric().ok_or_else(|| {
            PipelineError::column(format!("column '{name}' is not numeric"))
        })
    }

    pub fn columns(&self) -> impl Iterator<Item = (&str, &Column)> {
        self.names.iter().map(String::as_str).zip(self.columns.iter())
    }

    /// Remove a column and return it.
    pub fn drop_column(&mut self, name: &str) -> Result<Column> {
        let idx = self.require(name)?;
        self.names.remove(idx);
        let col = self.columns.remove(idx);
        if self.columns.is_empty() {
            self.n_rows = 0;
        }
        Ok(col)
    }

    /// Replace an existing column in place, keeping its position.
    pub fn replace_column(&mut self, name: &str, column: Column) -> Result<()> {
        let idx = self.require(name)?;
        if column.len() != self.n_rows {
            return Err(PipelineError::column(format!(
                "replacement for '{name}' has {} rows, expected {}",
                column.len(),
                self.n_rows
            )));
        }
        self.columns[idx] = column;
        Ok(())
    }

    /// Append a new column at the end.
    pub fn push_column(&mut self, name: impl Into<String>, column: Column) -> Result<()> {
        let name = name.into();
        if self.has_column(&name) {
            return Err(PipelineError::column(format!("column '{name}' already exists")));
        }
        if !self.columns.is_empty() && column.len() != self.n_rows {
            return Err(PipelineError::column(format!(
                "column '{name}' has {} rows, expected {}",
                column.len(),
                self.n_rows
            )));
        }
        self.n_rows = column.len();
        self.names.push(name);
        self.columns.push(column);
        Ok(())
    }

    /// Remove exact duplicate rows, keeping the first occurrence.
    ///
    /// Returns the number of rows removed.
    pub fn drop_duplicates(&mut self) -> usize {
        let keep: Vec<usize> = {
            let mut seen: HashSet<Vec<CellKey<'_>>> = HashSet::with_capacity(self.n_rows);
            (0..self.n_rows)
                .filter(|&row| seen.insert(self.columns.iter().map(|c| c.key(row)).collect()))
                .collect()
        };
        let removed = self.n_rows - keep.len();
        if removed > 0 {
            *self = self.take(&keep);
        }
        removed
    }

    /// New table holding the given rows in the given order.
    pub fn take(&self, indices: &[usize]) -> Table {
        Table {
            names: self.names.clone(),
            columns: self.columns.iter().map(|c| c.take(indices)).collect(),
            n_rows: indices.len(),
        }
    }

    /// New table holding only the named columns, in the given order.
    pub fn select<S: AsRef<str>>(&self, names: &[S]) -> Result<Table> {
        let mut out_names = Vec::with_capacity(names.len());
        let mut out_cols = Vec::with_capacity(names.len());
        for name in names {
            let name = name.as_ref();
            out_names.push(name.to_string());
            out_cols.push(self.column(name)?.clone());
        }
        Table::new(out_names, out_cols)
    }

    /// Split into a numeric feature matrix and the target vector.
    ///
    /// Every column except `target` becomes a feature, in table order.
    pub fn features_and_target(&self, target: &str) -> Result<LabeledData> {
        let labels = self.numeric(target)?.to_vec();
        let feature_names: Vec<String> = self
            .names
            .iter()
            .filter(|n| n.as_str() != target)
            .cloned()
            .collect();
        let mut data = Vec::with_capacity(self.n_rows * feature_names.len());
        let feature_cols = feature_names
            .iter()
            .map(|name| self.numeric(name))
            .collect::<Result<Vec<_>>>()?;
        for row in 0..self.n_rows {
            data.extend(feature_cols.iter().map(|col| col[row]));
        }
        let features = ndarray::Array2::from_shape_vec((self.n_rows, feature_names.len()), data)
            .map_err(|e| PipelineError::with_source(ErrorKind::Parse, "feature matrix shape", e))?;
        LabeledData::new(features, labels, feature_names)
    }

    /// Read a CSV file with a header row.
    pub fn read_csv<P: AsRef<Path>>(path: P) -> Result<Table> {
        let path = path.as_ref();
        let file = std::fs::File::open(path).map_err(|e| {
            PipelineError::with_source(
                ErrorKind::Io,
                format!("cannot open {}", path.display()),
                e,
            )
        })?;
        Self::read_csv_from(std::io::BufReader::new(file)).map_err(|e| {
            let kind = e.kind();
            PipelineError::with_source(kind, format!("cannot read table {}", path.display()), e)
        })
    }

    /// Read CSV data with a header row from any reader.
    ///
    /// A column is numeric when every non-empty cell parses as a number;
    /// empty cells in numeric columns become `NaN`.
    pub fn read_csv_from<R: Read>(reader: R) -> Result<Table> {
        let mut rdr = csv::ReaderBuilder::new().from_reader(reader);
        let names: Vec<String> = rdr.headers()?.iter().map(|h| h.to_string()).collect();
        if names.is_empty() || names.iter().all(String::is_empty) {
            return Err(PipelineError::parse("CSV input has no header"));
        }

        let mut raw: Vec<Vec<String>> = vec![Vec::new(); names.len()];
        for record in rdr.records() {
            let record = record?;
            for (col, field) in raw.iter_mut().zip(record.iter()) {
                col.push(field.to_string());
            }
        }

        let columns = raw.into_iter().map(infer_column).collect();
        Table::new(names, columns)
    }

    /// Write the table as CSV with a header row.
    pub fn write_csv<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        let file = std::fs::File::create(path).map_err(|e| {
            PipelineError::with_source(
                ErrorKind::Io,
                format!("cannot create {}", path.display()),
                e,
            )
        })?;
        self.write_csv_to(std::io::BufWriter::new(file))
    }

    pub fn write_csv_to<W: Write>(&self, writer: W) -> Result<()> {
        let mut wtr = csv::Writer::from_writer(writer);
        wtr.write_record(&self.names)?;
        for row in 0..self.n_rows {
            wtr.write_record(self.columns.iter().map(|c| c.cell(row).into_owned()))?;
        }
        wtr.flush()?;
        Ok(())
    }
}

fn infer_column(cells: Vec<String>) -> Column {
    let parsed: Option<Vec<f64>> = cells
        .iter()
        .map(|cell| {
            let trimmed = cell.trim();
            if trimmed.is_empty() {
                Some(f64::NAN)
            } else {
                trimmed.parse::<f64>().ok()
            }
        })
        .collect();
    match parsed {
        Some(values) => Column::Numeric(values),
        None => Column::Text(cells),
    }
}

fn format_number(x: f64) -> String {
    if x.is_nan() {
        String::new()
    } else {
        x.to_string()
    }
}
