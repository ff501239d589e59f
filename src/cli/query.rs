use std::ffi::OsStr;

use crate::error::StoreDbError;
use crate::results::ResultSet;
use crate::store::QueryOptions;
use crate::types::StatementKind;

use super::connection::CliConnection;
use super::executor::normalize_sql;
use super::process::{combined_output, run};

/// Column delimiter requested from the shell. Values containing it split into extra fields.
pub const FIELD_SEPARATOR: &str = "|";

/// Parse `-list -header` output into a result set.
///
/// The first non-empty line names the columns and each later non-empty line is a row,
/// both split on [`FIELD_SEPARATOR`] with no unescaping. Empty output yields zero columns
/// and zero rows. Blank lines are skipped, so a one-column row holding `''` or NULL
/// disappears, and a value containing a newline splits into two rows.
#[must_use]
pub fn parse_output(text: &str) -> ResultSet {
    let mut lines = text.lines().filter(|line| !line.is_empty());
    let Some(header) = lines.next() else {
        return ResultSet::default();
    };
    let mut result_set =
        ResultSet::new(header.split(FIELD_SEPARATOR).map(str::to_string).collect());
    for line in lines {
        result_set.add_row_values(
            line.split(FIELD_SEPARATOR)
                .map(|field| Some(field.to_string()))
                .collect(),
        );
    }
    result_set
}

impl CliConnection {
    /// Run one row-producing statement and parse its output.
    pub(crate) async fn query_statement(
        &self,
        query: &str,
        options: &QueryOptions,
    ) -> Result<ResultSet, StoreDbError> {
        let sql = normalize_sql(query);
        if sql.is_empty() {
            return Ok(ResultSet::default());
        }
        let kind = StatementKind::classify(&sql);
        tracing::debug!(%kind, sql_len = sql.len(), path = %self.path, "sqlite3 query");

        // pin list mode; parse_output reads nothing else
        let args = [
            OsStr::new("-list"),
            OsStr::new("-header"),
            OsStr::new("-separator"),
            OsStr::new(FIELD_SEPARATOR),
            OsStr::new(&self.path),
            OsStr::new(&sql),
        ];
        let output = run(&self.driver, kind, &args, options).await?;
        if !output.status.success() {
            let captured = combined_output(&output);
            tracing::warn!(
                %kind,
                status = %output.status,
                output = %captured,
                "sqlite3 query failed"
            );
            return Err(StoreDbError::QueryFailed {
                kind,
                status: output.status.to_string(),
                output: captured,
            });
        }
        Ok(parse_output(&String::from_utf8_lossy(&output.stdout)))
    }
}
