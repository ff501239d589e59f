use chrono::NaiveDate;
use serde::Serialize;

use crate::error::StoreDbError;
use crate::query_builder::QueryBuilder;
use crate::results::TextRow;
use crate::store::Store;
use crate::types::RowValues;

/// One day of `usage_daily_summary`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DailySummary {
    pub usage_date: NaiveDate,
    pub total_input_tokens: i64,
    pub total_output_tokens: i64,
    pub total_cost_usd: f64,
    pub sessions: i64,
}

impl DailySummary {
    /// # Errors
    /// Returns `StoreDbError::ScanError` for a missing or malformed column.
    pub fn from_row(row: &TextRow) -> Result<Self, StoreDbError> {
        Ok(Self {
            usage_date: row.scan("usage_date")?,
            total_input_tokens: row.scan("total_input_tokens")?,
            total_output_tokens: row.scan("total_output_tokens")?,
            total_cost_usd: row.scan("total_cost_usd")?,
            sessions: row.scan("sessions")?,
        })
    }
}

/// Aggregate usage for one window.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct Totals {
    pub tokens: i64,
    pub cost_usd: f64,
    pub sessions: i64,
}

/// The last `days` days of the daily view, newest first. Today counts as one day, so
/// `days == 0` asks for nothing and returns no rows.
///
/// # Errors
/// Returns the query or scan failure.
pub async fn daily_summary(
    store: &dyn Store,
    days: u32,
) -> Result<Vec<DailySummary>, StoreDbError> {
    if days == 0 {
        return Ok(Vec::new());
    }
    let offset = [RowValues::Text(format!("-{} days", days - 1))];
    let rows = QueryBuilder::new(
        store,
        "SELECT usage_date, total_input_tokens, total_output_tokens, total_cost_usd, sessions \
         FROM usage_daily_summary WHERE usage_date >= date('now', ?1) ORDER BY usage_date DESC",
    )
    .inline(&offset)
    .select()
    .await?;
    rows.results.iter().map(DailySummary::from_row).collect()
}

/// Usage recorded since midnight UTC.
///
/// # Errors
/// Returns the query or scan failure.
pub async fn today_totals(store: &dyn Store) -> Result<Totals, StoreDbError> {
    let rows = store
        .select(
            "SELECT COALESCE(SUM(input_tokens + output_tokens), 0) AS tokens, \
             COALESCE(SUM(cost_usd), 0) AS cost_usd, \
             COUNT(DISTINCT session_id) AS sessions \
             FROM usage_records WHERE date(created_at) = date('now')",
        )
        .await?;
    let Some(row) = rows.first() else {
        return Ok(Totals::default());
    };
    Ok(Totals {
        tokens: row.scan("tokens")?,
        cost_usd: row.scan("cost_usd")?,
        sessions: row.scan("sessions")?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{RecordingStore, result_set};

    #[tokio::test]
    async fn summary_window_is_inlined() {
        let store = RecordingStore::new().respond_to(
            "FROM usage_daily_summary",
            result_set(
                &[
                    "usage_date",
                    "total_input_tokens",
                    "total_output_tokens",
                    "total_cost_usd",
                    "sessions",
                ],
                &[
                    &[Some("2024-05-02"), Some("10"), Some("4"), Some("0.2"), Some("1")],
                    &[Some("2024-05-01"), Some("7"), Some("3"), Some("0"), Some("2")],
                ],
            ),
        );
        let days = daily_summary(&store, 7).await.unwrap();
        assert_eq!(days.len(), 2);
        assert_eq!(days[0].usage_date, NaiveDate::from_ymd_opt(2024, 5, 2).unwrap());
        assert_eq!(days[1].sessions, 2);
        assert!(store.statements()[0].contains("date('now', '-6 days')"));
    }

    #[tokio::test]
    async fn zero_day_window_is_empty() {
        let store = RecordingStore::new();
        assert!(daily_summary(&store, 0).await.unwrap().is_empty());
        assert!(store.statements().is_empty());

        daily_summary(&store, 1).await.unwrap();
        assert!(store.statements()[0].contains("date('now', '-0 days')"));
    }

    #[tokio::test]
    async fn totals_default_when_no_row() {
        let store = RecordingStore::new();
        assert_eq!(today_totals(&store).await.unwrap(), Totals::default());
    }

    #[tokio::test]
    async fn totals_scan_aggregates() {
        let store = RecordingStore::new().respond_to(
            "AS tokens",
            result_set(
                &["tokens", "cost_usd", "sessions"],
                &[&[Some("150"), Some("0.75"), Some("2")]],
            ),
        );
        let totals = today_totals(&store).await.unwrap();
        assert_eq!(totals.tokens, 150);
        assert_eq!(totals.sessions, 2);
        assert!((totals.cost_usd - 0.75).abs() < f64::EPSILON);
    }
}
