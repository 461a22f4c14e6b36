//! Row buffer - immutable ordered tuple of column values
//!
//! One `RowBuffer` represents one materialized result row. The buffer is
//! immutable once constructed and cheap to clone (shared backing storage),
//! so the same row can sit in a cursor's current slot and in a drained
//! backlog without copying column data.

use crate::error::{CursorError, Result};
use crate::types::Value;
use serde::{Deserialize, Serialize};
use std::ops::Index;
use std::sync::Arc;

/// Immutable, fixed-width ordered tuple of column values
///
/// Using Arc<[Value]> to allow cheap cloning when a row moves between the
/// current slot and a backlog queue
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RowBuffer {
    values: Arc<[Value]>,
}

impl RowBuffer {
    /// Create a row buffer from column values in position order
    pub fn new(values: Vec<Value>) -> Self {
        Self {
            values: values.into(),
        }
    }

    /// Get a column value by position
    pub fn get(&self, index: usize) -> Option<&Value> {
        self.values.get(index)
    }

    /// Get a column value by position, failing on out-of-range access
    pub fn try_get(&self, index: usize) -> Result<&Value> {
        self.values
            .get(index)
            .ok_or(CursorError::ColumnOutOfRange {
                index,
                count: self.values.len(),
            })
    }

    /// Get number of columns
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Check if the row has no columns
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Iterate over column values in position order
    pub fn iter(&self) -> std::slice::Iter<'_, Value> {
        self.values.iter()
    }

    /// View the row as a value slice
    pub fn as_slice(&self) -> &[Value] {
        &self.values
    }
}

impl Index<usize> for RowBuffer {
    type Output = Value;

    fn index(&self, index: usize) -> &Self::Output {
        &self.values[index]
    }
}

impl From<Vec<Value>> for RowBuffer {
    fn from(values: Vec<Value>) -> Self {
        Self::new(values)
    }
}

impl<'a> IntoIterator for &'a RowBuffer {
    type Item = &'a Value;
    type IntoIter = std::slice::Iter<'a, Value>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
