//! Persistence for the control plane's usage and session data, driven through the
//! `sqlite3` command-line shell instead of an in-process SQLite library.
//!
//! Every statement spawns one short-lived `sqlite3` process against the database file.
//! There are no bound parameters and no transactions: values are inlined as escaped
//! literals by [`interpolation`], and each statement commits on its own. On top of the
//! shell driver sit a single-connection [`StorePool`], the schema bootstrapper and
//! migrator in [`schema`], and typed [`records`].
//!
//! ```rust,no_run
//! use sqlcli_store::prelude::*;
//!
//! # async fn demo() -> Result<(), StoreDbError> {
//! let store = StorePool::builder("/var/lib/app/usage.db").build().await?;
//! store.execute(&SessionRecord::new("s-1", "cli").insert_sql()?).await?;
//! let today = today_totals(&store).await?;
//! # let _ = today;
//! # Ok(()) }
//! ```

pub mod cli;
pub mod config;
pub mod dsn;
pub mod error;
pub mod interpolation;
pub mod pool;
pub mod prelude;
pub mod query_builder;
pub mod records;
pub mod results;
pub mod scan;
pub mod schema;
pub mod store;
pub mod types;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

pub use cli::{CliConnection, CliDriver};
pub use config::{StoreOptions, StoreOptionsBuilder};
pub use error::StoreDbError;
pub use pool::{PooledConnection, StorePool};
pub use results::{Fetch, ResultSet, Rows, TextRow};
pub use store::{QueryOptions, Store};
pub use types::{RowValues, StatementKind};
