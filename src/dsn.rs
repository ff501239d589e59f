//! Connection strings.
//!
//! A DSN is either a bare filesystem path or a `file:` URI whose repeated `_pragma`
//! parameters carry full pragma expressions:
//!
//! ```text
//! file:/var/lib/app/usage.db?_pragma=journal_mode(WAL)&_pragma=busy_timeout(5000)
//! ```

use std::path::Path;

use percent_encoding::{AsciiSet, CONTROLS, percent_decode_str, utf8_percent_encode};
use url::form_urlencoded;

use crate::error::StoreDbError;

/// Pragmas applied by the owning layer to every store it opens.
pub const DEFAULT_PRAGMAS: [&str; 3] = [
    "journal_mode(WAL)",
    "busy_timeout(5000)",
    "foreign_keys(ON)",
];

const PRAGMA_KEY: &str = "_pragma";

/// Characters that would otherwise be read as URI structure inside the path.
const PATH_RESERVED: &AsciiSet = &CONTROLS.add(b'%').add(b'?').add(b'#');

/// A parsed connection string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dsn {
    /// Filesystem path of the database file, passed to the shell as-is.
    pub path: String,
    /// Pragma expressions in the order they appeared.
    pub pragmas: Vec<String>,
}

/// Split a DSN into its path and ordered pragma list.
///
/// Pragma expressions are carried verbatim; the engine validates them when they run.
///
/// # Errors
/// Returns `StoreDbError::ConfigError` when a `file:` URI is malformed: a non-local
/// authority, a fragment, an empty path, or a blank or `;`-bearing pragma.
pub fn parse_dsn(dsn: &str) -> Result<Dsn, StoreDbError> {
    let Some(rest) = dsn.strip_prefix("file:") else {
        if dsn.trim().is_empty() {
            return Err(StoreDbError::ConfigError("empty sqlite path".into()));
        }
        return Ok(Dsn {
            path: dsn.to_string(),
            pragmas: Vec::new(),
        });
    };

    if rest.contains('#') {
        return Err(StoreDbError::ConfigError(format!(
            "sqlite dsn must not carry a fragment: {dsn}"
        )));
    }

    let (raw_path, query) = match rest.split_once('?') {
        Some((path, query)) => (path, Some(query)),
        None => (rest, None),
    };

    let raw_path = match raw_path.strip_prefix("//") {
        Some(with_authority) => {
            let (authority, path) = match with_authority.find('/') {
                Some(slash) => with_authority.split_at(slash),
                None => (with_authority, ""),
            };
            if !authority.is_empty() && authority != "localhost" {
                return Err(StoreDbError::ConfigError(format!(
                    "sqlite dsn host {authority:?} is not local"
                )));
            }
            path
        }
        None => raw_path,
    };

    let path = percent_decode_str(raw_path)
        .decode_utf8()
        .map_err(|e| StoreDbError::ConfigError(format!("parse sqlite dsn path: {e}")))?
        .into_owned();
    if path.is_empty() {
        return Err(StoreDbError::ConfigError(format!(
            "sqlite dsn has no path: {dsn}"
        )));
    }

    let mut pragmas = Vec::new();
    for (key, value) in form_urlencoded::parse(query.unwrap_or_default().as_bytes()) {
        if key != PRAGMA_KEY {
            tracing::debug!(key = %key, "ignoring unknown sqlite dsn parameter");
            continue;
        }
        if value.trim().is_empty() || value.contains(';') {
            return Err(StoreDbError::ConfigError(format!(
                "invalid pragma expression {value:?} in sqlite dsn"
            )));
        }
        pragmas.push(value.into_owned());
    }

    Ok(Dsn { path, pragmas })
}

/// Append the default pragmas to a DSN.
#[must_use]
pub fn with_pragmas(dsn: &str) -> String {
    let separator = if dsn.contains('?') { '&' } else { '?' };
    let params = DEFAULT_PRAGMAS
        .iter()
        .map(|p| format!("{PRAGMA_KEY}={p}"))
        .collect::<Vec<_>>()
        .join("&");
    format!("{dsn}{separator}{params}")
}

/// Build a `file:` DSN for a filesystem path.
#[must_use]
pub fn file_dsn(path: &Path) -> String {
    let display = path.to_string_lossy();
    format!("file:{}", utf8_percent_encode(&display, PATH_RESERVED))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn with_pragmas_appends_defaults() {
        assert_eq!(
            with_pragmas("file:test.db"),
            "file:test.db?_pragma=journal_mode(WAL)&_pragma=busy_timeout(5000)&_pragma=foreign_keys(ON)"
        );
        assert_eq!(
            with_pragmas("file:test.db?mode=rwc"),
            "file:test.db?mode=rwc&_pragma=journal_mode(WAL)&_pragma=busy_timeout(5000)&_pragma=foreign_keys(ON)"
        );
    }

    #[test]
    fn parses_pragmas_in_order() {
        let dsn = parse_dsn("file:test.db?_pragma=journal_mode(WAL)&_pragma=busy_timeout(5000)")
            .unwrap();
        assert_eq!(dsn.path, "test.db");
        assert_eq!(dsn.pragmas, vec!["journal_mode(WAL)", "busy_timeout(5000)"]);
    }

    #[test]
    fn bare_path_has_no_pragmas() {
        let dsn = parse_dsn("/tmp/usage.db").unwrap();
        assert_eq!(dsn.path, "/tmp/usage.db");
        assert!(dsn.pragmas.is_empty());
    }

    #[test]
    fn parses_absolute_uri_forms() {
        assert_eq!(parse_dsn("file:///var/db/x.db").unwrap().path, "/var/db/x.db");
        assert_eq!(
            parse_dsn("file://localhost/var/db/x.db").unwrap().path,
            "/var/db/x.db"
        );
        assert_eq!(parse_dsn("file:/var/db/x.db").unwrap().path, "/var/db/x.db");
    }

    #[test]
    fn decodes_percent_escapes() {
        let dsn = parse_dsn("file:/tmp/my%20db.db?_pragma=busy_timeout%285000%29").unwrap();
        assert_eq!(dsn.path, "/tmp/my db.db");
        assert_eq!(dsn.pragmas, vec!["busy_timeout(5000)"]);
    }

    #[test]
    fn pragma_text_is_kept_as_given() {
        let dsn = parse_dsn("file:x.db?_pragma=%20cache_size(100)%20").unwrap();
        assert_eq!(dsn.pragmas, vec![" cache_size(100) "]);
    }

    #[test]
    fn ignores_unknown_parameters() {
        let dsn = parse_dsn("file:x.db?cache=shared&_pragma=foreign_keys(ON)").unwrap();
        assert_eq!(dsn.pragmas, vec!["foreign_keys(ON)"]);
    }

    #[test]
    fn rejects_malformed_uris() {
        for bad in [
            "file:",
            "file:?_pragma=foreign_keys(ON)",
            "file://remote-host/x.db",
            "file:x.db#frag",
            "file:x.db?_pragma=",
            "file:x.db?_pragma=%20%20",
            "file:x.db?_pragma=foreign_keys(ON);DROP TABLE sessions",
            "",
        ] {
            assert!(
                matches!(parse_dsn(bad), Err(StoreDbError::ConfigError(_))),
                "expected config error for {bad:?}"
            );
        }
    }

    #[test]
    fn file_dsn_round_trips_reserved_characters() {
        let dsn = file_dsn(Path::new("/tmp/odd?name#1%.db"));
        assert_eq!(dsn, "file:/tmp/odd%3Fname%231%25.db");
        assert_eq!(parse_dsn(&with_pragmas(&dsn)).unwrap().path, "/tmp/odd?name#1%.db");
    }
}
