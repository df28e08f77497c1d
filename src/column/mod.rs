//! Typed, nullable columns
//!
//! Every column stores its values contiguously plus an optional NULL bitmask.
//! For `Float64` columns a `NaN` is treated as missing by the numeric accessors,
//! so data arriving with either convention behaves the same way.

mod bitmask;
mod typed;

use chrono::{DateTime, Utc};

pub use bitmask::BitMask;
pub use typed::TypedColumn;

pub type Float64Column = TypedColumn<f64>;
pub type Int64Column = TypedColumn<i64>;
pub type StringColumn = TypedColumn<String>;
pub type BooleanColumn = TypedColumn<bool>;
pub type DateTimeColumn = TypedColumn<DateTime<Utc>>;

/// Enumeration of column types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ColumnType {
    Int64,
    Float64,
    String,
    Boolean,
    DateTime,
}

/// Enum representing a column
#[derive(Debug, Clone, PartialEq)]
pub enum Column {
    Int64(Int64Column),
    Float64(Float64Column),
    String(StringColumn),
    Boolean(BooleanColumn),
    DateTime(DateTimeColumn),
}

impl Column {
    pub fn len(&self) -> usize {
        match self {
            Column::Int64(c) => c.len(),
            Column::Float64(c) => c.len(),
            Column::String(c) => c.len(),
            Column::Boolean(c) => c.len(),
            Column::DateTime(c) => c.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn column_type(&self) -> ColumnType {
        match self {
            Column::Int64(_) => ColumnType::Int64,
            Column::Float64(_) => ColumnType::Float64,
            Column::String(_) => ColumnType::String,
            Column::Boolean(_) => ColumnType::Boolean,
            Column::DateTime(_) => ColumnType::DateTime,
        }
    }

    pub fn is_numeric(&self) -> bool {
        matches!(self, Column::Int64(_) | Column::Float64(_))
    }

    /// Whether row `index` holds no usable value (NULL, or NaN for floats)
    pub fn is_missing(&self, index: usize) -> bool {
        match self {
            Column::Int64(c) => c.is_null(index),
            Column::Float64(c) => c.get(index).map(|v| v.is_nan()).unwrap_or(true),
            Column::String(c) => c.is_null(index),
            Column::Boolean(c) => c.is_null(index),
            Column::DateTime(c) => c.is_null(index),
        }
    }

    /// Gather rows by position
    pub fn take(&self, indices: &[usize]) -> Column {
        match self {
            Column::Int64(c) => Column::Int64(c.take(indices)),
            Column::Float64(c) => Column::Float64(c.take(indices)),
            Column::String(c) => Column::String(c.take(indices)),
            Column::Boolean(c) => Column::Boolean(c.take(indices)),
            Column::DateTime(c) => Column::DateTime(c.take(indices)),
        }
    }

    /// Numeric view of the column; `None` when the column is not numeric.
    /// NULLs and NaNs both come back as `None` entries.
    pub fn to_f64_options(&self) -> Option<Vec<Option<f64>>> {
        match self {
            Column::Float64(c) => Some(
                c.iter()
                    .map(|v| v.copied().filter(|x| !x.is_nan()))
                    .collect(),
            ),
            Column::Int64(c) => Some(c.iter().map(|v| v.map(|x| *x as f64)).collect()),
            _ => None,
        }
    }

    /// Display form of each value, used where values act as keys (items, ids)
    pub fn to_string_options(&self) -> Vec<Option<String>> {
        match self {
            Column::Int64(c) => c.iter().map(|v| v.map(|x| x.to_string())).collect(),
            Column::Float64(c) => c
                .iter()
                .map(|v| v.filter(|x| !x.is_nan()).map(|x| x.to_string()))
                .collect(),
            Column::String(c) => c.to_options(),
            Column::Boolean(c) => c.iter().map(|v| v.map(|x| x.to_string())).collect(),
            Column::DateTime(c) => c.iter().map(|v| v.map(|x| x.to_rfc3339())).collect(),
        }
    }

    pub fn as_float64(&self) -> Option<&Float64Column> {
        match self {
            Column::Float64(c) => Some(c),
            _ => None,
        }
    }

    pub fn as_int64(&self) -> Option<&Int64Column> {
        match self {
            Column::Int64(c) => Some(c),
            _ => None,
        }
    }

    pub fn as_string(&self) -> Option<&StringColumn> {
        match self {
            Column::String(c) => Some(c),
            _ => None,
        }
    }

    pub fn as_boolean(&self) -> Option<&BooleanColumn> {
        match self {
            Column::Boolean(c) => Some(c),
            _ => None,
        }
    }

    pub fn as_datetime(&self) -> Option<&DateTimeColumn> {
        match self {
            Column::DateTime(c) => Some(c),
            _ => None,
        }
    }
}

impl From<Vec<f64>> for Column {
    fn from(values: Vec<f64>) -> Self {
        Column::Float64(Float64Column::new(values))
    }
}

impl From<Vec<Option<f64>>> for Column {
    fn from(values: Vec<Option<f64>>) -> Self {
        Column::Float64(Float64Column::from_options(values))
    }
}

impl From<Vec<i64>> for Column {
    fn from(values: Vec<i64>) -> Self {
        Column::Int64(Int64Column::new(values))
    }
}

impl From<Vec<Option<i64>>> for Column {
    fn from(values: Vec<Option<i64>>) -> Self {
        Column::Int64(Int64Column::from_options(values))
    }
}

impl From<Vec<String>> for Column {
    fn from(values: Vec<String>) -> Self {
        Column::String(StringColumn::new(values))
    }
}

impl From<Vec<&str>> for Column {
    fn from(values: Vec<&str>) -> Self {
        Column::String(StringColumn::new(
            values.into_iter().map(str::to_string).collect(),
        ))
    }
}

impl From<Vec<Option<String>>> for Column {
    fn from(values: Vec<Option<String>>) -> Self {
        Column::String(StringColumn::from_options(values))
    }
}

impl From<Vec<bool>> for Column {
    fn from(values: Vec<bool>) -> Self {
        Column::Boolean(BooleanColumn::new(values))
    }
}

impl From<Vec<DateTime<Utc>>> for Column {
    fn from(values: Vec<DateTime<Utc>>) -> Self {
        Column::DateTime(DateTimeColumn::new(values))
    }
}

impl From<Vec<Option<DateTime<Utc>>>> for Column {
    fn from(values: Vec<Option<DateTime<Utc>>>) -> Self {
        Column::DateTime(DateTimeColumn::from_options(values))
    }
}
