//! Typed rows for the tables and view the base schema creates, plus the statements
//! collaborators run against them.
//!
//! All SQL here goes through the shared literal-inlining helper and all reads go through
//! [`TextRow::scan`](crate::results::TextRow::scan).

pub mod session;
pub mod summary;
pub mod usage;

pub use session::{SessionRecord, fetch_session, recent_sessions};
pub use summary::{DailySummary, Totals, daily_summary, today_totals};
pub use usage::{EstimateLevel, UsageRecord, recent_usage};
