use std::borrow::Cow;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::error::StoreDbError;
use crate::interpolation::inline_params;
use crate::results::ResultSet;
use crate::store::{QueryOptions, Store};
use crate::types::RowValues;

/// Fluent builder for one statement, with literal inlining and per-call limits.
///
/// Values supplied through [`QueryBuilder::inline`] are rendered into the SQL text by the
/// shared quoting helper before the statement leaves the process; nothing is bound.
///
/// ```rust,no_run
/// use sqlcli_store::prelude::*;
///
/// # async fn demo(store: &StorePool) -> Result<(), StoreDbError> {
/// store
///     .query("UPDATE sessions SET notes = ?1 WHERE id = ?2")
///     .inline(&[RowValues::Text("it's done".into()), RowValues::Text("s-1".into())])
///     .execute()
///     .await?;
/// # Ok(()) }
/// ```
pub struct QueryBuilder<'a, S: Store + ?Sized> {
    store: &'a S,
    sql: Cow<'a, str>,
    literals: Cow<'a, [RowValues]>,
    options: QueryOptions,
}

impl<'a, S: Store + ?Sized> QueryBuilder<'a, S> {
    pub fn new(store: &'a S, sql: &'a str) -> Self {
        Self {
            store,
            sql: Cow::Borrowed(sql),
            literals: Cow::Borrowed(&[]),
            options: QueryOptions::default(),
        }
    }

    /// Values substituted for `?` / `?N` placeholders as escaped literals.
    #[must_use]
    pub fn inline(mut self, values: &'a [RowValues]) -> Self {
        self.literals = Cow::Borrowed(values);
        self
    }

    #[must_use]
    pub fn options(mut self, options: QueryOptions) -> Self {
        self.options = options;
        self
    }

    #[must_use]
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.options.timeout = Some(timeout);
        self
    }

    #[must_use]
    pub fn cancel_on(mut self, token: CancellationToken) -> Self {
        self.options.cancel = Some(token);
        self
    }

    fn render(&self) -> Result<Cow<'_, str>, StoreDbError> {
        inline_params(&self.sql, &self.literals)
    }

    /// # Errors
    /// Returns `StoreDbError::ParameterError` if a placeholder cannot be filled, or any
    /// error from [`Store::execute_with`].
    pub async fn execute(self) -> Result<(), StoreDbError> {
        let sql = self.render()?;
        self.store.execute_with(&sql, &[], &self.options).await
    }

    /// # Errors
    /// Returns `StoreDbError::ParameterError` if a placeholder cannot be filled, or any
    /// error from [`Store::select_with`].
    pub async fn select(self) -> Result<ResultSet, StoreDbError> {
        let sql = self.render()?;
        self.store.select_with(&sql, &[], &self.options).await
    }
}
