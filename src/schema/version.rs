use crate::error::StoreDbError;
use crate::store::Store;

/// Read the persisted schema version (`PRAGMA user_version`).
///
/// # Errors
/// Returns the query failure, or `StoreDbError::ScanError` if the engine answered with
/// something other than a non-negative integer.
pub async fn read_user_version(store: &dyn Store) -> Result<u32, StoreDbError> {
    let result = store.select("PRAGMA user_version").await?;
    match result.first() {
        Some(row) => row.scan_at::<u32>(0),
        None => Ok(0),
    }
}

/// Persist the schema version.
///
/// # Errors
/// Returns the exec failure.
pub async fn set_user_version(store: &dyn Store, version: u32) -> Result<(), StoreDbError> {
    store
        .execute(&format!("PRAGMA user_version = {version}"))
        .await
}
