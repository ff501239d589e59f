//! Convenient imports for common functionality.

pub use crate::cli::{CliConnection, CliDriver};
pub use crate::config::{StoreOptions, StoreOptionsBuilder};
pub use crate::dsn::{file_dsn, parse_dsn, with_pragmas};
pub use crate::error::StoreDbError;
pub use crate::interpolation::{inline_params, quote_ident, quote_literal};
pub use crate::pool::{PooledConnection, StorePool};
pub use crate::query_builder::QueryBuilder;
pub use crate::records::{
    DailySummary, EstimateLevel, SessionRecord, Totals, UsageRecord, daily_summary,
    fetch_session, recent_sessions, recent_usage, today_totals,
};
pub use crate::results::{Fetch, ResultSet, Rows, TextRow};
pub use crate::scan::FromCell;
pub use crate::schema::{BootstrapOutcome, Migrator, TARGET_VERSION, bootstrap, ensure_upgrades};
pub use crate::store::{QueryOptions, Store};
pub use crate::types::{RowValues, StatementKind};

pub use tokio_util::sync::CancellationToken;
