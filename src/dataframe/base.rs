use std::collections::HashMap;

use crate::column::{Column, ColumnType};
use crate::core::error::{Error, Result};

/// DataFrame struct: Column-oriented 2D data structure
///
/// Columns keep their insertion order and all share the same row count.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DataFrame {
    columns: HashMap<String, Column>,
    column_order: Vec<String>,
    row_count: usize,
}

impl DataFrame {
    /// Create a new empty DataFrame
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a DataFrame from `(name, column)` pairs, in order
    pub fn from_columns<S: Into<String>>(columns: Vec<(S, Column)>) -> Result<Self> {
        let mut df = Self::new();
        for (name, column) in columns {
            df.add_column(name, column)?;
        }
        Ok(df)
    }

    /// Add a column; fails on a duplicate name or a row count mismatch
    pub fn add_column(&mut self, name: impl Into<String>, column: Column) -> Result<()> {
        let name = name.into();
        if self.columns.contains_key(&name) {
            return Err(Error::DuplicateColumnName(name));
        }
        self.check_row_count(&column)?;

        if self.column_order.is_empty() {
            self.row_count = column.len();
        }
        self.column_order.push(name.clone());
        self.columns.insert(name, column);
        Ok(())
    }

    /// Replace a column in place, or append it when absent
    pub fn set_column(&mut self, name: impl Into<String>, column: Column) -> Result<()> {
        let name = name.into();
        if !self.columns.contains_key(&name) {
            return self.add_column(name, column);
        }
        if self.column_order.len() == 1 {
            self.row_count = column.len();
        } else {
            self.check_row_count(&column)?;
        }
        self.columns.insert(name, column);
        Ok(())
    }

    fn check_row_count(&self, column: &Column) -> Result<()> {
        if !self.column_order.is_empty() && column.len() != self.row_count {
            return Err(Error::InconsistentRowCount {
                expected: self.row_count,
                found: column.len(),
            });
        }
        Ok(())
    }

    pub fn contains_column(&self, column_name: &str) -> bool {
        self.columns.contains_key(column_name)
    }

    /// Get a column by name
    pub fn column(&self, column_name: &str) -> Result<&Column> {
        self.columns
            .get(column_name)
            .ok_or_else(|| Error::ColumnNotFound(column_name.to_string()))
    }

    /// Column names in insertion order
    pub fn column_names(&self) -> &[String] {
        &self.column_order
    }

    pub fn nrows(&self) -> usize {
        self.row_count
    }

    pub fn ncols(&self) -> usize {
        self.column_order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.row_count == 0
    }

    /// Create a new DataFrame with only the specified columns
    pub fn select_columns(&self, columns: &[&str]) -> Result<Self> {
        let mut result = Self::new();
        for &name in columns {
            result.add_column(name, self.column(name)?.clone())?;
        }
        Ok(result)
    }

    /// Gather rows by position into a new DataFrame
    pub fn take_rows(&self, indices: &[usize]) -> Result<Self> {
        if let Some(&bad) = indices.iter().find(|&&i| i >= self.row_count) {
            return Err(Error::InvalidInput(format!(
                "row index {} out of bounds for {} rows",
                bad, self.row_count
            )));
        }

        let mut result = Self::new();
        for name in &self.column_order {
            result.add_column(name.clone(), self.columns[name].take(indices))?;
        }
        if result.column_order.is_empty() {
            result.row_count = indices.len();
        }
        Ok(result)
    }

    /// Numeric values of a column (Int64 or Float64), `None` for missing entries
    pub fn numeric_values(&self, column_name: &str) -> Result<Vec<Option<f64>>> {
        let column = self.column(column_name)?;
        column
            .to_f64_options()
            .ok_or_else(|| Error::ColumnTypeMismatch {
                name: column_name.to_string(),
                expected: ColumnType::Float64,
                found: column.column_type(),
            })
    }

    /// Row-major matrix of the given numeric columns
    pub fn numeric_matrix(&self, columns: &[String]) -> Result<Vec<Vec<Option<f64>>>> {
        let by_column = columns
            .iter()
            .map(|name| self.numeric_values(name))
            .collect::<Result<Vec<_>>>()?;

        Ok((0..self.row_count)
            .map(|row| by_column.iter().map(|col| col[row]).collect())
            .collect())
    }

    /// Values of any column rendered as strings, `None` for missing entries
    pub fn string_values(&self, column_name: &str) -> Result<Vec<Option<String>>> {
        Ok(self.column(column_name)?.to_string_options())
    }
}
