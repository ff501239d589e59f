use std::collections::HashMap;
use std::sync::Arc;

use crate::error::StoreDbError;
use crate::scan::FromCell;

/// A row from a query result, every cell as text.
#[derive(Debug, Clone)]
pub struct TextRow {
    /// The column names for this row (shared across all rows in a result set)
    pub column_names: Arc<Vec<String>>,
    /// The fields the output line carried, in column order
    pub values: Vec<Option<String>>,
    // Shared name -> index map, built once per result set
    #[doc(hidden)]
    pub(crate) column_index_cache: Arc<HashMap<String, usize>>,
}

impl TextRow {
    /// Create a row with its own column index.
    #[must_use]
    pub fn new(column_names: Arc<Vec<String>>, values: Vec<Option<String>>) -> Self {
        let cache = Arc::new(index_columns(&column_names));
        Self {
            column_names,
            values,
            column_index_cache: cache,
        }
    }

    /// Get the index of a column by name
    #[must_use]
    pub fn get_column_index(&self, column_name: &str) -> Option<usize> {
        if let Some(&idx) = self.column_index_cache.get(column_name) {
            return Some(idx);
        }
        self.column_names.iter().position(|col| col == column_name)
    }

    /// Raw cell by column name. Missing columns and missing trailing fields are `None`.
    #[must_use]
    pub fn get(&self, column_name: &str) -> Option<&str> {
        self.get_column_index(column_name)
            .and_then(|idx| self.get_by_index(idx))
    }

    /// Raw cell by position.
    #[must_use]
    pub fn get_by_index(&self, index: usize) -> Option<&str> {
        self.values.get(index).and_then(|v| v.as_deref())
    }

    /// Convert a named column to a caller-chosen type.
    ///
    /// # Errors
    /// Returns `StoreDbError::ScanError` if the column is absent from the result or its text
    /// does not parse as `T`.
    pub fn scan<T: FromCell>(&self, column_name: &str) -> Result<T, StoreDbError> {
        let idx = self
            .get_column_index(column_name)
            .ok_or_else(|| StoreDbError::ScanError {
                column: column_name.to_string(),
                value: String::new(),
                target: "an existing column",
            })?;
        self.scan_at(idx)
    }

    /// Convert a positional column to a caller-chosen type.
    ///
    /// # Errors
    /// Returns `StoreDbError::ScanError` if the text does not parse as `T`.
    pub fn scan_at<T: FromCell>(&self, index: usize) -> Result<T, StoreDbError> {
        let cell = self.get_by_index(index);
        T::from_cell(cell).ok_or_else(|| StoreDbError::ScanError {
            column: self
                .column_names
                .get(index)
                .cloned()
                .unwrap_or_else(|| format!("#{index}")),
            value: cell.unwrap_or_default().to_string(),
            target: T::TARGET,
        })
    }
}

pub(crate) fn index_columns(column_names: &[String]) -> HashMap<String, usize> {
    let mut map = HashMap::with_capacity(column_names.len());
    for (i, name) in column_names.iter().enumerate() {
        // first occurrence wins for duplicate names
        map.entry(name.clone()).or_insert(i);
    }
    map
}
