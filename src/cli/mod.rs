//! `sqlite3` shell driver.
//!
//! This module is split into several sub-modules:
//! - driver: executable lookup and the connection factory
//! - connection: open/close/ping and the `Store` implementation
//! - process: spawning with deadlines and cancellation
//! - executor: the exec path
//! - query: the query path and output parsing

pub mod connection;
pub mod driver;
pub mod executor;
pub(crate) mod process;
pub mod query;

pub use connection::CliConnection;
pub use driver::{CliDriver, SQLITE3};
pub use executor::normalize_sql;
pub use query::{FIELD_SEPARATOR, parse_output};
