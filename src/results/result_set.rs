use std::collections::HashMap;
use std::sync::Arc;

use super::row::{TextRow, index_columns};
use super::rows::Rows;

/// The rows a query produced, materialized from the shell's output.
#[derive(Debug, Clone, Default)]
pub struct ResultSet {
    /// The rows returned by the query
    pub results: Vec<TextRow>,
    /// Column names shared by all rows (to avoid duplicating in each row)
    column_names: Arc<Vec<String>>,
    column_index_cache: Arc<HashMap<String, usize>>,
}

impl ResultSet {
    /// Create an empty result set for the given header.
    #[must_use]
    pub fn new(column_names: Vec<String>) -> Self {
        let cache = Arc::new(index_columns(&column_names));
        Self {
            results: Vec::new(),
            column_names: Arc::new(column_names),
            column_index_cache: cache,
        }
    }

    /// Get the column names for this result set
    #[must_use]
    pub fn column_names(&self) -> &[String] {
        &self.column_names
    }

    /// Add a row of raw fields. Fields are kept as given; readers pad short rows.
    pub fn add_row_values(&mut self, values: Vec<Option<String>>) {
        self.results.push(TextRow {
            column_names: Arc::clone(&self.column_names),
            values,
            column_index_cache: Arc::clone(&self.column_index_cache),
        });
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.results.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    #[must_use]
    pub fn first(&self) -> Option<&TextRow> {
        self.results.first()
    }

    /// Hand the rows to a forward-only cursor.
    #[must_use]
    pub fn into_rows(self) -> Rows {
        Rows::new(self.column_names, self.results)
    }
}

impl IntoIterator for ResultSet {
    type Item = TextRow;
    type IntoIter = Rows;

    fn into_iter(self) -> Rows {
        self.into_rows()
    }
}
