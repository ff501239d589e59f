use std::fmt;
use std::str::FromStr;

use chrono::NaiveDateTime;
use serde::Serialize;

use crate::error::StoreDbError;
use crate::interpolation::inline_params;
use crate::results::TextRow;
use crate::scan::FromCell;
use crate::store::Store;
use crate::types::RowValues;

/// How a usage row's token counts were obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EstimateLevel {
    /// Reported by the provider.
    #[default]
    Exact,
    /// Derived from a provider-specific mapping.
    Mapped,
    /// Guessed from text length.
    Heuristic,
}

impl EstimateLevel {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Exact => "exact",
            Self::Mapped => "mapped",
            Self::Heuristic => "heuristic",
        }
    }
}

impl fmt::Display for EstimateLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EstimateLevel {
    type Err = StoreDbError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "exact" => Ok(Self::Exact),
            "mapped" => Ok(Self::Mapped),
            "heuristic" => Ok(Self::Heuristic),
            other => Err(StoreDbError::ParameterError(format!(
                "unknown estimate level {other:?}"
            ))),
        }
    }
}

impl FromCell for EstimateLevel {
    const TARGET: &'static str = "estimate level";

    fn from_cell(cell: Option<&str>) -> Option<Self> {
        cell?.parse().ok()
    }
}

/// One row of `usage_records`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UsageRecord {
    /// Assigned by the engine on insert.
    pub id: Option<i64>,
    pub session_id: String,
    pub profile: Option<String>,
    pub provider: Option<String>,
    pub model: Option<String>,
    pub input_tokens: i64,
    pub output_tokens: i64,
    pub cost_usd: f64,
    pub latency_ms: i64,
    pub estimate_level: EstimateLevel,
    /// `None` lets the engine stamp `CURRENT_TIMESTAMP`.
    pub created_at: Option<NaiveDateTime>,
}

impl UsageRecord {
    #[must_use]
    pub fn new(session_id: impl Into<String>) -> Self {
        Self {
            id: None,
            session_id: session_id.into(),
            profile: None,
            provider: None,
            model: None,
            input_tokens: 0,
            output_tokens: 0,
            cost_usd: 0.0,
            latency_ms: 0,
            estimate_level: EstimateLevel::Exact,
            created_at: None,
        }
    }

    #[must_use]
    pub fn total_tokens(&self) -> i64 {
        self.input_tokens.saturating_add(self.output_tokens)
    }

    /// `INSERT` for this usage row. `id` is left to the engine.
    ///
    /// # Errors
    /// Returns `StoreDbError::ParameterError` for a non-finite cost or unquotable text.
    pub fn insert_sql(&self) -> Result<String, StoreDbError> {
        let sql = inline_params(
            "INSERT INTO usage_records (session_id, profile, provider, model, input_tokens, \
             output_tokens, cost_usd, latency_ms, estimate_level, created_at) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, COALESCE(?, CURRENT_TIMESTAMP))",
            &[
                RowValues::from(self.session_id.as_str()),
                RowValues::from(self.profile.as_deref()),
                RowValues::from(self.provider.as_deref()),
                RowValues::from(self.model.as_deref()),
                RowValues::Int(self.input_tokens),
                RowValues::Int(self.output_tokens),
                RowValues::Float(self.cost_usd),
                RowValues::Int(self.latency_ms),
                RowValues::from(self.estimate_level.as_str()),
                self.created_at.map_or(RowValues::Null, RowValues::Timestamp),
            ],
        )?;
        Ok(sql.into_owned())
    }

    /// # Errors
    /// Returns `StoreDbError::ScanError` for a missing or malformed column.
    pub fn from_row(row: &TextRow) -> Result<Self, StoreDbError> {
        Ok(Self {
            id: row.scan("id")?,
            session_id: row.scan("session_id")?,
            profile: row.scan("profile")?,
            provider: row.scan("provider")?,
            model: row.scan("model")?,
            input_tokens: row.scan("input_tokens")?,
            output_tokens: row.scan("output_tokens")?,
            cost_usd: row.scan("cost_usd")?,
            latency_ms: row.scan("latency_ms")?,
            estimate_level: row.scan("estimate_level")?,
            created_at: row.scan("created_at")?,
        })
    }
}

/// Newest usage rows first.
///
/// # Errors
/// Returns the query or scan failure.
pub async fn recent_usage(store: &dyn Store, limit: u32) -> Result<Vec<UsageRecord>, StoreDbError> {
    let rows = store
        .select(&format!(
            "SELECT id, session_id, profile, provider, model, input_tokens, output_tokens, \
             cost_usd, latency_ms, estimate_level, created_at \
             FROM usage_records ORDER BY created_at DESC, id DESC LIMIT {limit}"
        ))
        .await?;
    rows.results.iter().map(UsageRecord::from_row).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{RecordingStore, result_set};

    #[test]
    fn insert_renders_literals_in_order() {
        let mut usage = UsageRecord::new("s-1");
        usage.model = Some("o'model".into());
        usage.input_tokens = 120;
        usage.output_tokens = 30;
        usage.cost_usd = 0.5;
        usage.estimate_level = EstimateLevel::Heuristic;
        assert_eq!(
            usage.insert_sql().unwrap(),
            "INSERT INTO usage_records (session_id, profile, provider, model, input_tokens, \
             output_tokens, cost_usd, latency_ms, estimate_level, created_at) \
             VALUES ('s-1', NULL, NULL, 'o''model', 120, 30, 0.5, 0, 'heuristic', \
             COALESCE(NULL, CURRENT_TIMESTAMP))"
        );
        assert_eq!(usage.total_tokens(), 150);
    }

    #[test]
    fn total_tokens_saturates() {
        let mut usage = UsageRecord::new("s-1");
        usage.input_tokens = i64::MAX;
        usage.output_tokens = 1;
        assert_eq!(usage.total_tokens(), i64::MAX);
    }

    #[test]
    fn non_finite_cost_is_rejected() {
        let mut usage = UsageRecord::new("s-1");
        usage.cost_usd = f64::NAN;
        assert!(matches!(
            usage.insert_sql(),
            Err(StoreDbError::ParameterError(_))
        ));
    }

    #[test]
    fn estimate_level_round_trips_through_text() {
        assert_eq!("mapped".parse::<EstimateLevel>().unwrap(), EstimateLevel::Mapped);
        assert_eq!(EstimateLevel::default().to_string(), "exact");
        assert!("bogus".parse::<EstimateLevel>().is_err());
        assert_eq!(EstimateLevel::from_cell(Some("")), None);
    }

    #[tokio::test]
    async fn recent_usage_scans_rows() {
        let store = RecordingStore::new().respond_to(
            "FROM usage_records ORDER BY",
            result_set(
                &[
                    "id", "session_id", "profile", "provider", "model", "input_tokens",
                    "output_tokens", "cost_usd", "latency_ms", "estimate_level", "created_at",
                ],
                &[&[
                    Some("3"), Some("s-1"), None, Some("anthropic"), Some("m"), Some("10"),
                    Some("5"), Some("0.01"), Some("900"), Some("mapped"),
                    Some("2024-05-01 10:00:00"),
                ]],
            ),
        );
        let rows = recent_usage(&store, 10).await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].id, Some(3));
        assert_eq!(rows[0].profile, None);
        assert_eq!(rows[0].estimate_level, EstimateLevel::Mapped);
        assert!(store.statements()[0].ends_with("LIMIT 10"));
    }
}
