use std::convert::Infallible;
use std::time::Duration;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::error::StoreDbError;
use crate::query_builder::QueryBuilder;
use crate::results::ResultSet;
use crate::types::RowValues;

/// Per-call options for the execute and select paths.
///
/// ```rust
/// use std::time::Duration;
/// use sqlcli_store::prelude::*;
///
/// let token = CancellationToken::new();
/// let options = QueryOptions::default()
///     .with_timeout(Duration::from_secs(2))
///     .with_cancel(token.clone());
/// # let _ = options;
/// ```
#[derive(Debug, Clone, Default)]
pub struct QueryOptions {
    /// Upper bound on the spawned process; falls back to the connection default.
    pub timeout: Option<Duration>,
    /// Kills the spawned process when triggered.
    pub cancel: Option<CancellationToken>,
}

impl QueryOptions {
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    #[must_use]
    pub fn with_cancel(mut self, cancel: CancellationToken) -> Self {
        self.cancel = Some(cancel);
        self
    }

    /// Fill in the timeout from a connection default when the call did not set one.
    #[must_use]
    pub(crate) fn or_timeout(&self, default: Option<Duration>) -> Self {
        Self {
            timeout: self.timeout.or(default),
            cancel: self.cancel.clone(),
        }
    }
}

/// The data-access contract consumed by usage and session writers.
///
/// Every statement is auto-committed on its own; there is no cross-statement atomicity,
/// so write sequences must be made of statements that are each safe in isolation.
#[async_trait]
pub trait Store: Send + Sync {
    /// Run a side-effecting statement.
    ///
    /// # Errors
    /// Returns `StoreDbError::UnsupportedParameters` when `params` is non-empty, and
    /// `StoreDbError::ExecFailed` / `Canceled` / `DeadlineExceeded` from the process.
    async fn execute_with(
        &self,
        query: &str,
        params: &[RowValues],
        options: &QueryOptions,
    ) -> Result<(), StoreDbError>;

    /// Run a row-producing statement and collect its rows as text.
    ///
    /// # Errors
    /// Returns `StoreDbError::UnsupportedParameters` when `params` is non-empty, and
    /// `StoreDbError::QueryFailed` / `Canceled` / `DeadlineExceeded` from the process.
    async fn select_with(
        &self,
        query: &str,
        params: &[RowValues],
        options: &QueryOptions,
    ) -> Result<ResultSet, StoreDbError>;

    /// Release the store. Statements own no long-lived resources, so this is cheap.
    ///
    /// # Errors
    /// Implementations may report shutdown failures.
    async fn close(&self) -> Result<(), StoreDbError>;

    /// Transactions are not offered.
    ///
    /// # Errors
    /// Always returns `StoreDbError::Unsupported`.
    fn begin(&self) -> Result<Infallible, StoreDbError> {
        Err(StoreDbError::Unsupported(
            "transactions are not supported by the sqlite3 shell driver".into(),
        ))
    }

    /// # Errors
    /// See [`Store::execute_with`].
    async fn execute(&self, query: &str) -> Result<(), StoreDbError> {
        self.execute_with(query, &[], &QueryOptions::default()).await
    }

    /// # Errors
    /// See [`Store::select_with`].
    async fn select(&self, query: &str) -> Result<ResultSet, StoreDbError> {
        self.select_with(query, &[], &QueryOptions::default()).await
    }

    /// Start a fluent builder for one statement.
    fn query<'a>(&'a self, sql: &'a str) -> QueryBuilder<'a, Self>
    where
        Self: Sized,
    {
        QueryBuilder::new(self, sql)
    }
}
