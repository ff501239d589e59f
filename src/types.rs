use std::fmt;
use std::fmt::Write as _;

use chrono::NaiveDateTime;
use serde_json::Value as JsonValue;

use crate::error::StoreDbError;
use crate::interpolation::quote_literal;

/// Timestamp layout used by `CURRENT_TIMESTAMP` and the `date()` family.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Values that callers interpolate into SQL text.
///
/// The shell driver has no binding path, so these never travel separately from the
/// statement; they are rendered as SQL literals by [`RowValues::to_sql_literal`]:
/// ```rust
/// use sqlcli_store::prelude::*;
///
/// let v = RowValues::Text("o'brien".into());
/// assert_eq!(v.to_sql_literal().unwrap(), "'o''brien'");
/// ```
#[derive(Debug, Clone, PartialEq)]
pub enum RowValues {
    /// Integer value (64-bit)
    Int(i64),
    /// Floating point value (64-bit)
    Float(f64),
    /// Text/string value
    Text(String),
    /// Boolean value, stored as 0/1
    Bool(bool),
    /// Timestamp value, stored as `YYYY-MM-DD HH:MM:SS` text
    Timestamp(NaiveDateTime),
    /// NULL value
    Null,
    /// JSON value, stored as text
    JSON(JsonValue),
    /// Binary data, rendered as a hex blob literal
    Blob(Vec<u8>),
}

impl RowValues {
    /// Check if this value is NULL
    #[must_use]
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Render the value as a SQLite literal.
    ///
    /// # Errors
    /// Returns `StoreDbError::ParameterError` for non-finite floats and text containing NUL,
    /// neither of which can be expressed in a shell argument.
    pub fn to_sql_literal(&self) -> Result<String, StoreDbError> {
        match self {
            RowValues::Int(i) => Ok(i.to_string()),
            RowValues::Float(f) if f.is_finite() => Ok(format!("{f:?}")),
            RowValues::Float(f) => Err(StoreDbError::ParameterError(format!(
                "non-finite float {f} has no SQL literal"
            ))),
            RowValues::Text(s) => quote_literal(s),
            RowValues::Bool(b) => Ok(if *b { "1" } else { "0" }.to_string()),
            RowValues::Timestamp(ts) => quote_literal(&ts.format(TIMESTAMP_FORMAT).to_string()),
            RowValues::Null => Ok("NULL".to_string()),
            RowValues::JSON(value) => quote_literal(&value.to_string()),
            RowValues::Blob(bytes) => {
                let mut out = String::with_capacity(bytes.len() * 2 + 3);
                out.push_str("X'");
                for b in bytes {
                    let _ = write!(out, "{b:02X}");
                }
                out.push('\'');
                Ok(out)
            }
        }
    }
}

impl From<&str> for RowValues {
    fn from(value: &str) -> Self {
        RowValues::Text(value.to_string())
    }
}

impl From<String> for RowValues {
    fn from(value: String) -> Self {
        RowValues::Text(value)
    }
}

impl From<i64> for RowValues {
    fn from(value: i64) -> Self {
        RowValues::Int(value)
    }
}

impl From<f64> for RowValues {
    fn from(value: f64) -> Self {
        RowValues::Float(value)
    }
}

impl From<bool> for RowValues {
    fn from(value: bool) -> Self {
        RowValues::Bool(value)
    }
}

impl<T: Into<RowValues>> From<Option<T>> for RowValues {
    fn from(value: Option<T>) -> Self {
        value.map_or(RowValues::Null, Into::into)
    }
}

/// Broad statement category, carried in errors and log events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StatementKind {
    /// Connection-level `PRAGMA`
    Pragma,
    /// Reads or writes of `PRAGMA user_version`
    Version,
    /// `CREATE` / `ALTER` / `DROP`
    Ddl,
    /// `INSERT` / `UPDATE` / `DELETE` / anything else with side effects
    Write,
    /// `SELECT` and friends
    Read,
}

impl StatementKind {
    /// Categorize a statement by its leading keyword.
    #[must_use]
    pub fn classify(sql: &str) -> Self {
        let head = sql.trim_start();
        let keyword: String = head
            .chars()
            .take_while(char::is_ascii_alphabetic)
            .collect::<String>()
            .to_ascii_uppercase();
        match keyword.as_str() {
            "PRAGMA" => {
                if head.to_ascii_lowercase().contains("user_version") {
                    StatementKind::Version
                } else {
                    StatementKind::Pragma
                }
            }
            "CREATE" | "ALTER" | "DROP" => StatementKind::Ddl,
            "SELECT" | "WITH" | "VALUES" | "EXPLAIN" => StatementKind::Read,
            _ => StatementKind::Write,
        }
    }
}

impl fmt::Display for StatementKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            StatementKind::Pragma => "pragma",
            StatementKind::Version => "version",
            StatementKind::Ddl => "ddl",
            StatementKind::Write => "write",
            StatementKind::Read => "read",
        };
        f.write_str(name)
    }
}
