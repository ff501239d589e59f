use std::ffi::OsStr;

use crate::error::StoreDbError;
use crate::store::QueryOptions;
use crate::types::StatementKind;

use super::connection::CliConnection;
use super::process::{combined_output, run};

/// Collapse newlines, tabs, and whitespace runs into single spaces.
///
/// Applies inside string literals too: a literal carrying a newline arrives with a space.
#[must_use]
pub fn normalize_sql(query: &str) -> String {
    query.split_whitespace().collect::<Vec<_>>().join(" ")
}

impl CliConnection {
    /// Run one side-effecting statement; no rows are expected.
    pub(crate) async fn exec_statement(
        &self,
        query: &str,
        options: &QueryOptions,
    ) -> Result<(), StoreDbError> {
        let sql = normalize_sql(query);
        if sql.is_empty() {
            return Ok(());
        }
        let kind = StatementKind::classify(&sql);
        tracing::debug!(%kind, sql_len = sql.len(), path = %self.path, "sqlite3 exec");

        let args = [OsStr::new(&self.path), OsStr::new(&sql)];
        let output = run(&self.driver, kind, &args, options).await?;
        if !output.status.success() {
            let captured = combined_output(&output);
            tracing::warn!(
                %kind,
                status = %output.status,
                output = %captured,
                "sqlite3 exec failed"
            );
            return Err(StoreDbError::ExecFailed {
                kind,
                status: output.status.to_string(),
                output: captured,
            });
        }
        Ok(())
    }
}
