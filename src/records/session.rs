use chrono::NaiveDateTime;
use serde::Serialize;

use crate::error::StoreDbError;
use crate::interpolation::inline_params;
use crate::query_builder::QueryBuilder;
use crate::results::TextRow;
use crate::store::Store;
use crate::types::RowValues;

const SESSION_COLUMNS: &str = "id, source, started_at, ended_at, success, notes";

/// One row of `sessions`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SessionRecord {
    pub id: String,
    pub source: String,
    /// `None` lets the engine stamp `CURRENT_TIMESTAMP`.
    pub started_at: Option<NaiveDateTime>,
    pub ended_at: Option<NaiveDateTime>,
    pub success: bool,
    pub notes: Option<String>,
}

impl SessionRecord {
    #[must_use]
    pub fn new(id: impl Into<String>, source: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            source: source.into(),
            started_at: None,
            ended_at: None,
            success: false,
            notes: None,
        }
    }

    /// `INSERT` for this session.
    ///
    /// # Errors
    /// Returns `StoreDbError::ParameterError` if a text field cannot be quoted.
    pub fn insert_sql(&self) -> Result<String, StoreDbError> {
        let sql = inline_params(
            "INSERT INTO sessions (id, source, started_at, ended_at, success, notes) \
             VALUES (?1, ?2, COALESCE(?3, CURRENT_TIMESTAMP), ?4, ?5, ?6)",
            &[
                RowValues::from(self.id.as_str()),
                RowValues::from(self.source.as_str()),
                self.started_at.map_or(RowValues::Null, RowValues::Timestamp),
                self.ended_at.map_or(RowValues::Null, RowValues::Timestamp),
                RowValues::Bool(self.success),
                RowValues::from(self.notes.clone()),
            ],
        )?;
        Ok(sql.into_owned())
    }

    /// `UPDATE` closing session `id`. A missing `ended_at` means now.
    ///
    /// # Errors
    /// Returns `StoreDbError::ParameterError` if a text field cannot be quoted.
    pub fn complete_sql(
        id: &str,
        success: bool,
        notes: Option<&str>,
        ended_at: Option<NaiveDateTime>,
    ) -> Result<String, StoreDbError> {
        let sql = inline_params(
            "UPDATE sessions SET ended_at = COALESCE(?1, CURRENT_TIMESTAMP), success = ?2, \
             notes = ?3 WHERE id = ?4",
            &[
                ended_at.map_or(RowValues::Null, RowValues::Timestamp),
                RowValues::Bool(success),
                RowValues::from(notes),
                RowValues::from(id),
            ],
        )?;
        Ok(sql.into_owned())
    }

    /// # Errors
    /// Returns `StoreDbError::ScanError` for a missing or malformed column.
    pub fn from_row(row: &TextRow) -> Result<Self, StoreDbError> {
        Ok(Self {
            id: row.scan("id")?,
            source: row.scan("source")?,
            started_at: row.scan("started_at")?,
            ended_at: row.scan("ended_at")?,
            success: row.scan("success")?,
            notes: row.scan("notes")?,
        })
    }
}

/// Look up one session by id.
///
/// # Errors
/// Returns the query or scan failure.
pub async fn fetch_session(
    store: &dyn Store,
    id: &str,
) -> Result<Option<SessionRecord>, StoreDbError> {
    let sql = format!("SELECT {SESSION_COLUMNS} FROM sessions WHERE id = ?1 LIMIT 1");
    let params = [RowValues::from(id)];
    let rows = QueryBuilder::new(store, &sql).inline(&params).select().await?;
    rows.first().map(SessionRecord::from_row).transpose()
}

/// Most recently started sessions first.
///
/// # Errors
/// Returns the query or scan failure.
pub async fn recent_sessions(
    store: &dyn Store,
    limit: u32,
) -> Result<Vec<SessionRecord>, StoreDbError> {
    let sql = format!(
        "SELECT {SESSION_COLUMNS} FROM sessions ORDER BY started_at DESC, id LIMIT {limit}"
    );
    let rows = store.select(&sql).await?;
    rows.results.iter().map(SessionRecord::from_row).collect()
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::*;
    use crate::test_utils::{RecordingStore, create_test_row, result_set};

    fn at(h: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 5, 1)
            .unwrap()
            .and_hms_opt(h, 0, 0)
            .unwrap()
    }

    #[test]
    fn insert_defaults_start_time_and_escapes_text() {
        let mut session = SessionRecord::new("s-1", "cli");
        session.notes = Some("it's fine".into());
        assert_eq!(
            session.insert_sql().unwrap(),
            "INSERT INTO sessions (id, source, started_at, ended_at, success, notes) \
             VALUES ('s-1', 'cli', COALESCE(NULL, CURRENT_TIMESTAMP), NULL, 0, 'it''s fine')"
        );
    }

    #[test]
    fn complete_renders_explicit_end() {
        let sql = SessionRecord::complete_sql("s-1", true, None, Some(at(9))).unwrap();
        assert_eq!(
            sql,
            "UPDATE sessions SET ended_at = COALESCE('2024-05-01 09:00:00', CURRENT_TIMESTAMP), \
             success = 1, notes = NULL WHERE id = 's-1'"
        );
    }

    #[test]
    fn from_row_reads_nullable_columns() {
        let row = create_test_row(
            &["id", "source", "started_at", "ended_at", "success", "notes"],
            &[
                Some("s-2"),
                Some("proxy"),
                Some("2024-05-01 08:00:00"),
                Some(""),
                Some("0"),
                Some(""),
            ],
        );
        let s = SessionRecord::from_row(&row).unwrap();
        assert_eq!(s.started_at, Some(at(8)));
        assert_eq!(s.ended_at, None);
        assert_eq!(s.notes, None);
        assert!(!s.success);
    }

    #[tokio::test]
    async fn fetch_inlines_id_and_handles_absence() {
        let store = RecordingStore::new().respond_to(
            "WHERE id = 's-9'",
            result_set(
                &["id", "source", "started_at", "ended_at", "success", "notes"],
                &[&[Some("s-9"), Some("cli"), Some("2024-05-01 09:00:00"), None, Some("1"), None]],
            ),
        );
        let found = fetch_session(&store, "s-9").await.unwrap().unwrap();
        assert_eq!(found.id, "s-9");
        assert!(found.success);
        assert_eq!(fetch_session(&store, "nope").await.unwrap(), None);
        assert!(store.statements()[1].contains("WHERE id = 'nope'"));
    }
}
