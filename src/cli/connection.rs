use std::fmt;
use std::time::Duration;

use async_trait::async_trait;

use crate::dsn::{Dsn, parse_dsn};
use crate::error::StoreDbError;
use crate::results::ResultSet;
use crate::store::{QueryOptions, Store};
use crate::types::RowValues;

use super::driver::CliDriver;

/// A logical handle on one database file.
///
/// Nothing stays open between statements: each one spawns its own short-lived `sqlite3`
/// process, so every call pays spawn latency and [`Store::close`] has nothing to release.
pub struct CliConnection {
    pub(crate) driver: CliDriver,
    pub(crate) path: String,
    pub(crate) default_timeout: Option<Duration>,
}

impl CliConnection {
    pub(crate) async fn open(
        driver: CliDriver,
        dsn: &str,
        default_timeout: Option<Duration>,
    ) -> Result<Self, StoreDbError> {
        driver.program()?;
        let Dsn { path, pragmas } = parse_dsn(dsn)?;
        let conn = Self {
            driver,
            path: shell_safe_path(path),
            default_timeout,
        };
        conn.apply_pragmas(&pragmas).await?;
        tracing::debug!(path = %conn.path, pragmas = pragmas.len(), "opened sqlite3 connection");
        Ok(conn)
    }

    async fn apply_pragmas(&self, pragmas: &[String]) -> Result<(), StoreDbError> {
        let options = QueryOptions::default().or_timeout(self.default_timeout);
        for pragma in pragmas {
            self.exec_statement(&format!("PRAGMA {pragma};"), &options)
                .await?;
        }
        Ok(())
    }

    /// Path of the database file as handed to the engine.
    #[must_use]
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Check that the engine answers for this file by reading `user_version`.
    ///
    /// # Errors
    /// Returns the query failure if the engine cannot read the file.
    pub async fn ping(&self) -> Result<(), StoreDbError> {
        let options = QueryOptions::default().or_timeout(self.default_timeout);
        self.query_statement("PRAGMA user_version;", &options)
            .await
            .map(|_| ())
    }
}

// A leading '-' would be read as a shell option.
fn shell_safe_path(path: String) -> String {
    if path.starts_with('-') {
        format!("./{path}")
    } else {
        path
    }
}

impl fmt::Debug for CliConnection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CliConnection")
            .field("path", &self.path)
            .field("default_timeout", &self.default_timeout)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl Store for CliConnection {
    async fn execute_with(
        &self,
        query: &str,
        params: &[RowValues],
        options: &QueryOptions,
    ) -> Result<(), StoreDbError> {
        if !params.is_empty() {
            return Err(StoreDbError::UnsupportedParameters(params.len()));
        }
        self.exec_statement(query, &options.or_timeout(self.default_timeout))
            .await
    }

    async fn select_with(
        &self,
        query: &str,
        params: &[RowValues],
        options: &QueryOptions,
    ) -> Result<ResultSet, StoreDbError> {
        if !params.is_empty() {
            return Err(StoreDbError::UnsupportedParameters(params.len()));
        }
        self.query_statement(query, &options.or_timeout(self.default_timeout))
            .await
    }

    async fn close(&self) -> Result<(), StoreDbError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dash_paths_are_made_relative() {
        assert_eq!(shell_safe_path("-odd.db".into()), "./-odd.db");
        assert_eq!(shell_safe_path("/tmp/x.db".into()), "/tmp/x.db");
    }
}
