//! Query results as text.
//!
//! The shell hands back strings, so every cell is `Option<String>`: `Some` for a field
//! that was present in the output, `None` for a trailing field the line did not have.
//! A SQL NULL and an empty string both print as an empty field and cannot be told apart;
//! see [`crate::scan`] for how typed reads treat that.

pub mod result_set;
pub mod row;
pub mod rows;

pub use result_set::ResultSet;
pub use row::TextRow;
pub use rows::{Fetch, Rows};
