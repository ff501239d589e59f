use std::collections::BTreeMap;

use async_trait::async_trait;
use lazy_static::lazy_static;
use regex::Regex;

use crate::error::StoreDbError;
use crate::interpolation::quote_ident;
use crate::store::Store;

use super::ddl::{TARGET_VERSION, USAGE_TABLE, USAGE_TS_INDEX};
use super::version::set_user_version;

lazy_static! {
    static ref DUPLICATE_COLUMN: Regex =
        Regex::new(r"(?i)duplicate column name:?\s*(\S+)").expect("static regex");
}

/// One idempotent schema change.
///
/// Steps must be safe to re-run after a partial or complete earlier run: check first,
/// then change only what is missing.
#[async_trait]
pub trait MigrationStep: Send + Sync {
    /// Short label used in logs and error context.
    fn name(&self) -> &'static str;

    async fn apply(&self, store: &dyn Store) -> Result<(), StoreDbError>;
}

/// Advances the persisted schema version one step at a time.
pub struct Migrator {
    target: u32,
    steps: BTreeMap<u32, Vec<Box<dyn MigrationStep>>>,
}

impl Migrator {
    /// A migrator with no steps registered.
    #[must_use]
    pub fn new(target: u32) -> Self {
        Self {
            target,
            steps: BTreeMap::new(),
        }
    }

    /// The steps this build ships, targeting [`TARGET_VERSION`].
    #[must_use]
    pub fn standard() -> Self {
        Self::new(TARGET_VERSION)
            .register(
                2,
                AddColumn::new(USAGE_TABLE, "estimate_level", "TEXT NOT NULL DEFAULT 'exact'"),
            )
            .register(2, EnsureIndex::new(USAGE_TS_INDEX, USAGE_TABLE, "created_at"))
    }

    /// Add a step to the transition that ends at `version`. Steps for the same version run
    /// in registration order.
    #[must_use]
    pub fn register(mut self, version: u32, step: impl MigrationStep + 'static) -> Self {
        self.steps.entry(version).or_default().push(Box::new(step));
        self
    }

    #[must_use]
    pub fn target(&self) -> u32 {
        self.target
    }

    /// Migrate from `from` to `to`, then persist `to`.
    ///
    /// The whole path is checked before any step runs, so a gap fails without side
    /// effects. Equal versions are a no-op. The version write happens after the last step
    /// as a separate statement; a crash between the two leaves the steps applied under the
    /// old version, and the next run re-applies them.
    ///
    /// # Errors
    /// Returns `StoreDbError::IncompatibleVersion` when `from > to`,
    /// `StoreDbError::UnknownMigration` for the first unregistered transition, or the
    /// failing step's error wrapped with its name.
    pub async fn ensure_upgrades(
        &self,
        store: &dyn Store,
        from: u32,
        to: u32,
    ) -> Result<(), StoreDbError> {
        if from > to {
            return Err(StoreDbError::IncompatibleVersion {
                found: from,
                supported: to,
            });
        }
        if from == to {
            return Ok(());
        }

        let mut plan = Vec::new();
        for next in from + 1..=to {
            let steps = self
                .steps
                .get(&next)
                .ok_or(StoreDbError::UnknownMigration {
                    from: next - 1,
                    to: next,
                })?;
            plan.push((next, steps));
        }

        for (version, steps) in plan {
            for step in steps {
                tracing::info!(version, step = step.name(), "applying schema migration step");
                step.apply(store)
                    .await
                    .map_err(StoreDbError::in_stage(step.name()))?;
            }
        }

        set_user_version(store, to)
            .await
            .map_err(StoreDbError::in_stage("set schema version"))?;
        tracing::info!(from, to, "schema migrated");
        Ok(())
    }
}

impl std::fmt::Debug for Migrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let steps: BTreeMap<u32, Vec<&str>> = self
            .steps
            .iter()
            .map(|(v, steps)| (*v, steps.iter().map(|s| s.name()).collect()))
            .collect();
        f.debug_struct("Migrator")
            .field("target", &self.target)
            .field("steps", &steps)
            .finish()
    }
}

/// Whether `table` currently has `column`, from `PRAGMA table_info`.
///
/// # Errors
/// Returns the query failure.
pub async fn column_exists(
    store: &dyn Store,
    table: &str,
    column: &str,
) -> Result<bool, StoreDbError> {
    let info = store
        .select(&format!("PRAGMA table_info({})", quote_ident(table)))
        .await?;
    Ok(info.results.iter().any(|row| row.get("name") == Some(column)))
}

/// `ALTER TABLE .. ADD COLUMN`, skipped when the column is already there.
#[derive(Debug, Clone)]
pub struct AddColumn {
    table: &'static str,
    column: &'static str,
    definition: &'static str,
}

impl AddColumn {
    #[must_use]
    pub fn new(table: &'static str, column: &'static str, definition: &'static str) -> Self {
        Self {
            table,
            column,
            definition,
        }
    }
}

#[async_trait]
impl MigrationStep for AddColumn {
    fn name(&self) -> &'static str {
        "add column"
    }

    async fn apply(&self, store: &dyn Store) -> Result<(), StoreDbError> {
        if column_exists(store, self.table, self.column).await? {
            tracing::debug!(table = self.table, column = self.column, "column present; skipping");
            return Ok(());
        }
        let sql = format!(
            "ALTER TABLE {} ADD COLUMN {} {}",
            quote_ident(self.table),
            quote_ident(self.column),
            self.definition
        );
        match store.execute(&sql).await {
            // another writer added it between the check and the alter
            Err(StoreDbError::ExecFailed { output, .. })
                if DUPLICATE_COLUMN
                    .captures(&output)
                    .is_some_and(|c| c[1].trim_matches('"') == self.column) =>
            {
                Ok(())
            }
            other => other,
        }
    }
}

/// `CREATE INDEX IF NOT EXISTS` on one column list.
#[derive(Debug, Clone)]
pub struct EnsureIndex {
    index: &'static str,
    table: &'static str,
    columns: &'static str,
}

impl EnsureIndex {
    #[must_use]
    pub fn new(index: &'static str, table: &'static str, columns: &'static str) -> Self {
        Self {
            index,
            table,
            columns,
        }
    }
}

#[async_trait]
impl MigrationStep for EnsureIndex {
    fn name(&self) -> &'static str {
        "ensure index"
    }

    async fn apply(&self, store: &dyn Store) -> Result<(), StoreDbError> {
        store
            .execute(&format!(
                "CREATE INDEX IF NOT EXISTS {} ON {}({})",
                self.index, self.table, self.columns
            ))
            .await
    }
}
