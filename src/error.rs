use std::time::Duration;

use thiserror::Error;

use crate::types::StatementKind;

#[derive(Debug, Error)]
pub enum StoreDbError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("sqlite3 executable not found: {0}")]
    ExecutableNotFound(String),

    #[error("sqlite3 {kind} exec failed ({status}): {output}")]
    ExecFailed {
        kind: StatementKind,
        status: String,
        output: String,
    },

    #[error("sqlite3 {kind} query failed ({status}): {output}")]
    QueryFailed {
        kind: StatementKind,
        status: String,
        output: String,
    },

    #[error("bound parameters are not supported by the sqlite3 shell driver (got {0})")]
    UnsupportedParameters(usize),

    #[error("Unsupported operation: {0}")]
    Unsupported(String),

    #[error("store schema version {found} is newer than supported version {supported}")]
    IncompatibleVersion { found: u32, supported: u32 },

    #[error("no migration registered for {from} -> {to}")]
    UnknownMigration { from: u32, to: u32 },

    #[error("statement canceled")]
    Canceled,

    #[error("statement exceeded deadline of {0:?}")]
    DeadlineExceeded(Duration),

    #[error("Parameter conversion error: {0}")]
    ParameterError(String),

    #[error("cannot scan column {column} value {value:?} as {target}")]
    ScanError {
        column: String,
        value: String,
        target: &'static str,
    },

    #[error("{stage}: {source}")]
    Schema {
        stage: &'static str,
        #[source]
        source: Box<StoreDbError>,
    },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl StoreDbError {
    /// Wrap an error with the bootstrap/migration stage it came from.
    pub(crate) fn in_stage(stage: &'static str) -> impl FnOnce(StoreDbError) -> StoreDbError {
        move |source| StoreDbError::Schema {
            stage,
            source: Box::new(source),
        }
    }

    /// The innermost error, skipping any stage wrappers.
    #[must_use]
    pub fn root(&self) -> &StoreDbError {
        match self {
            StoreDbError::Schema { source, .. } => source.root(),
            other => other,
        }
    }

    /// Errors that make the store unusable for this build, as opposed to per-call failures.
    #[must_use]
    pub fn is_fatal(&self) -> bool {
        matches!(
            self.root(),
            StoreDbError::IncompatibleVersion { .. } | StoreDbError::UnknownMigration { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stage_wrapper_keeps_root_and_fatality() {
        let wrapped = StoreDbError::in_stage("migrate schema")(StoreDbError::UnknownMigration {
            from: 2,
            to: 3,
        });
        assert!(wrapped.is_fatal());
        assert!(matches!(
            wrapped.root(),
            StoreDbError::UnknownMigration { from: 2, to: 3 }
        ));
        assert_eq!(
            wrapped.to_string(),
            "migrate schema: no migration registered for 2 -> 3"
        );
    }

    #[test]
    fn exec_failures_are_not_fatal() {
        let err = StoreDbError::ExecFailed {
            kind: StatementKind::Ddl,
            status: "exit status: 1".into(),
            output: "Error: near \"CREAT\": syntax error".into(),
        };
        assert!(!err.is_fatal());
        assert!(err.to_string().contains("ddl exec failed"));
    }
}
