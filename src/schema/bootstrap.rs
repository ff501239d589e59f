use crate::error::StoreDbError;
use crate::store::Store;

use super::ddl::BASE_SCHEMA;
use super::migrate::Migrator;
use super::version::{read_user_version, set_user_version};

/// What [`Migrator::bootstrap`] found and did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BootstrapOutcome {
    /// The store had no version; the base schema was created and stamped.
    Fresh { version: u32 },
    /// Already at the target; only create-if-absent DDL ran.
    Current { version: u32 },
    /// Upgraded through the registered steps.
    Migrated { from: u32, to: u32 },
}

impl BootstrapOutcome {
    /// Version the store ends at.
    #[must_use]
    pub fn version(self) -> u32 {
        match self {
            Self::Fresh { version } | Self::Current { version } => version,
            Self::Migrated { to, .. } => to,
        }
    }
}

/// Run every create-if-absent statement of the base schema, in order.
///
/// # Errors
/// Returns the first failing statement's error.
pub async fn apply_base_schema(store: &dyn Store) -> Result<(), StoreDbError> {
    for ddl in BASE_SCHEMA {
        store.execute(ddl).await?;
    }
    Ok(())
}

impl Migrator {
    /// Bring a store to this migrator's target version.
    ///
    /// A store newer than the target is refused before anything is written. A fresh store
    /// (version 0) gets the base schema, which is already at the target shape, and is
    /// stamped without running any step. Older stores are migrated.
    ///
    /// # Errors
    /// `StoreDbError::IncompatibleVersion` for a too-new store; otherwise the failure of
    /// whichever stage broke, wrapped in `StoreDbError::Schema`.
    pub async fn bootstrap(&self, store: &dyn Store) -> Result<BootstrapOutcome, StoreDbError> {
        let target = self.target();
        let found = read_user_version(store)
            .await
            .map_err(StoreDbError::in_stage("read schema version"))?;
        if found > target {
            tracing::error!(found, supported = target, "store schema is newer than this build");
            return Err(StoreDbError::IncompatibleVersion {
                found,
                supported: target,
            });
        }

        apply_base_schema(store)
            .await
            .map_err(StoreDbError::in_stage("apply schema"))?;

        let outcome = if found == 0 {
            set_user_version(store, target)
                .await
                .map_err(StoreDbError::in_stage("set schema version"))?;
            BootstrapOutcome::Fresh { version: target }
        } else if found == target {
            BootstrapOutcome::Current { version: target }
        } else {
            self.ensure_upgrades(store, found, target)
                .await
                .map_err(StoreDbError::in_stage("migrate schema"))?;
            BootstrapOutcome::Migrated {
                from: found,
                to: target,
            }
        };
        tracing::info!(?outcome, "schema ready");
        Ok(outcome)
    }
}
