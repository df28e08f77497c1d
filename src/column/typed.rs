use std::sync::Arc;

use super::bitmask::BitMask;
use crate::core::error::{Error, Result};

/// Column of values of one scalar type with an optional NULL mask
#[derive(Debug, Clone, PartialEq)]
pub struct TypedColumn<T> {
    pub(crate) data: Arc<[T]>,
    pub(crate) null_mask: Option<BitMask>,
}

impl<T: Clone + Default> TypedColumn<T> {
    /// Create a column without NULL values
    pub fn new(data: Vec<T>) -> Self {
        Self {
            data: data.into(),
            null_mask: None,
        }
    }

    /// Create a column where `nulls[i] == true` marks row `i` as NULL
    pub fn with_nulls(data: Vec<T>, nulls: Vec<bool>) -> Result<Self> {
        if data.len() != nulls.len() {
            return Err(Error::InconsistentRowCount {
                expected: data.len(),
                found: nulls.len(),
            });
        }

        let null_mask = if nulls.iter().any(|&is_null| is_null) {
            Some(BitMask::from_bools(&nulls))
        } else {
            None
        };

        Ok(Self {
            data: data.into(),
            null_mask,
        })
    }

    /// Create a column from optional values, `None` becoming NULL
    pub fn from_options(values: Vec<Option<T>>) -> Self {
        let nulls: Vec<bool> = values.iter().map(Option::is_none).collect();
        let data: Vec<T> = values.into_iter().map(Option::unwrap_or_default).collect();
        let null_mask = if nulls.iter().any(|&n| n) {
            Some(BitMask::from_bools(&nulls))
        } else {
            None
        };
        Self {
            data: data.into(),
            null_mask,
        }
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn is_null(&self, index: usize) -> bool {
        self.null_mask
            .as_ref()
            .map(|mask| mask.get(index))
            .unwrap_or(false)
    }

    pub fn null_count(&self) -> usize {
        self.null_mask
            .as_ref()
            .map(BitMask::count_ones)
            .unwrap_or(0)
    }

    /// Value at `index`, `None` for NULL or out of range
    pub fn get(&self, index: usize) -> Option<&T> {
        if index >= self.data.len() || self.is_null(index) {
            return None;
        }
        Some(&self.data[index])
    }

    /// Iterate rows in order, yielding `None` for NULLs
    pub fn iter(&self) -> impl Iterator<Item = Option<&T>> + '_ {
        (0..self.data.len()).map(move |i| self.get(i))
    }

    pub fn to_options(&self) -> Vec<Option<T>> {
        self.iter().map(|v| v.cloned()).collect()
    }

    /// Gather rows by position; indices must be in range
    pub fn take(&self, indices: &[usize]) -> Self {
        Self::from_options(indices.iter().map(|&i| self.get(i).cloned()).collect())
    }
}
