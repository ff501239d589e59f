//! Fakes and helpers for exercising stores without a `sqlite3` binary.

mod recording_store;

pub use recording_store::RecordingStore;

use std::sync::Arc;

use crate::results::TextRow;

/// Create a test row with the given column names and values.
#[must_use]
pub fn create_test_row(column_names: &[&str], values: &[Option<&str>]) -> TextRow {
    TextRow::new(
        Arc::new(column_names.iter().map(|c| (*c).to_string()).collect()),
        values.iter().map(|v| v.map(str::to_string)).collect(),
    )
}

/// A result set built from literal cells, for canned responses.
#[must_use]
pub fn result_set(column_names: &[&str], rows: &[&[Option<&str>]]) -> crate::results::ResultSet {
    let mut rs = crate::results::ResultSet::new(
        column_names.iter().map(|c| (*c).to_string()).collect(),
    );
    for row in rows {
        rs.add_row_values(row.iter().map(|v| v.map(str::to_string)).collect());
    }
    rs
}
