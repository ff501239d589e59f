//! Base schema shared with every collaborator that reads or writes usage data.

/// Schema version this build writes and understands.
pub const TARGET_VERSION: u32 = 2;

pub const SESSIONS_TABLE: &str = "sessions";
pub const USAGE_TABLE: &str = "usage_records";
pub const DAILY_SUMMARY_VIEW: &str = "usage_daily_summary";
pub const USAGE_TS_INDEX: &str = "idx_usage_ts";

pub(crate) const CREATE_SESSIONS: &str = "CREATE TABLE IF NOT EXISTS sessions (
    id TEXT PRIMARY KEY,
    source TEXT NOT NULL,
    started_at DATETIME NOT NULL DEFAULT CURRENT_TIMESTAMP,
    ended_at DATETIME,
    success INTEGER NOT NULL DEFAULT 0,
    notes TEXT
)";

pub(crate) const CREATE_USAGE_RECORDS: &str = "CREATE TABLE IF NOT EXISTS usage_records (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    session_id TEXT NOT NULL,
    profile TEXT,
    provider TEXT,
    model TEXT,
    input_tokens INTEGER NOT NULL DEFAULT 0,
    output_tokens INTEGER NOT NULL DEFAULT 0,
    cost_usd REAL NOT NULL DEFAULT 0,
    latency_ms INTEGER NOT NULL DEFAULT 0,
    estimate_level TEXT NOT NULL DEFAULT 'exact',
    created_at DATETIME NOT NULL DEFAULT CURRENT_TIMESTAMP,
    FOREIGN KEY (session_id) REFERENCES sessions(id)
)";

pub(crate) const CREATE_DAILY_SUMMARY: &str = "CREATE VIEW IF NOT EXISTS usage_daily_summary AS
    SELECT date(created_at) AS usage_date,
           SUM(input_tokens) AS total_input_tokens,
           SUM(output_tokens) AS total_output_tokens,
           SUM(cost_usd) AS total_cost_usd,
           COUNT(DISTINCT session_id) AS sessions
    FROM usage_records
    GROUP BY date(created_at)";

pub(crate) const CREATE_USAGE_TS_INDEX: &str =
    "CREATE INDEX IF NOT EXISTS idx_usage_ts ON usage_records(created_at)";

/// Create-if-absent DDL, in dependency order.
pub const BASE_SCHEMA: [&str; 4] = [
    CREATE_SESSIONS,
    CREATE_USAGE_RECORDS,
    CREATE_DAILY_SUMMARY,
    CREATE_USAGE_TS_INDEX,
];
