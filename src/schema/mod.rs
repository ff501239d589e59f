//! Schema bootstrap and version-gated migrations.
//!
//! The store's version lives in `PRAGMA user_version`. [`bootstrap`] brings any store this
//! build can read up to [`TARGET_VERSION`]; [`ensure_upgrades`] is the migration half on
//! its own. Both are safe to call on every start.

pub mod bootstrap;
pub mod ddl;
pub mod migrate;
pub mod version;

pub use bootstrap::{BootstrapOutcome, apply_base_schema};
pub use ddl::{
    BASE_SCHEMA, DAILY_SUMMARY_VIEW, SESSIONS_TABLE, TARGET_VERSION, USAGE_TABLE, USAGE_TS_INDEX,
};
pub use migrate::{AddColumn, EnsureIndex, MigrationStep, Migrator, column_exists};
pub use version::{read_user_version, set_user_version};

use crate::error::StoreDbError;
use crate::store::Store;

/// Bootstrap with the steps this build ships.
///
/// # Errors
/// See [`Migrator::bootstrap`].
pub async fn bootstrap(store: &dyn Store) -> Result<BootstrapOutcome, StoreDbError> {
    Migrator::standard().bootstrap(store).await
}

/// Migrate with the steps this build ships.
///
/// # Errors
/// See [`Migrator::ensure_upgrades`].
pub async fn ensure_upgrades(store: &dyn Store, from: u32, to: u32) -> Result<(), StoreDbError> {
    Migrator::standard().ensure_upgrades(store, from, to).await
}
