use std::ffi::{OsStr, OsString};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use crate::error::StoreDbError;

use super::connection::CliConnection;

/// Default engine executable name.
pub const SQLITE3: &str = "sqlite3";

#[derive(Debug)]
struct DriverInner {
    program: Result<PathBuf, String>,
    launcher_args: Vec<OsString>,
}

/// Factory for shell-backed connections.
///
/// Resolve it once at startup and hand clones to whatever opens connections; the
/// executable lookup is never repeated. A driver whose lookup failed still constructs,
/// and every [`CliDriver::open`] on it reports `ExecutableNotFound`.
#[derive(Debug, Clone)]
pub struct CliDriver {
    inner: Arc<DriverInner>,
}

impl CliDriver {
    /// Look up `sqlite3` on `PATH`.
    #[must_use]
    pub fn locate() -> Self {
        Self::locate_named(SQLITE3)
    }

    /// Look up a named executable on `PATH`, or check an explicit path.
    #[must_use]
    pub fn locate_named(program: impl AsRef<OsStr>) -> Self {
        let program = program.as_ref();
        let resolved = which::which(program).map_err(|e| {
            let shown = Path::new(program).display();
            tracing::warn!(program = %shown, error = %e, "sqlite3 executable lookup failed");
            format!("{shown}: {e}")
        });
        if let Ok(path) = &resolved {
            tracing::debug!(path = %path.display(), "resolved sqlite3 executable");
        }
        Self::from_parts(resolved, Vec::new())
    }

    /// Use an already-resolved executable without a `PATH` lookup.
    #[must_use]
    pub fn with_executable(path: impl Into<PathBuf>) -> Self {
        Self::from_parts(Ok(path.into()), Vec::new())
    }

    /// Arguments placed between the program and the engine arguments on every call, for
    /// wrappers such as `nice -n 10 sqlite3` or a shell script standing in for the engine.
    #[must_use]
    pub fn with_launcher_args<I, A>(self, args: I) -> Self
    where
        I: IntoIterator<Item = A>,
        A: Into<OsString>,
    {
        let launcher_args = args.into_iter().map(Into::into).collect();
        Self::from_parts(self.inner.program.clone(), launcher_args)
    }

    fn from_parts(program: Result<PathBuf, String>, launcher_args: Vec<OsString>) -> Self {
        Self {
            inner: Arc::new(DriverInner {
                program,
                launcher_args,
            }),
        }
    }

    /// The resolved executable.
    ///
    /// # Errors
    /// Returns `StoreDbError::ExecutableNotFound` when the lookup at construction failed.
    pub fn program(&self) -> Result<&Path, StoreDbError> {
        self.inner
            .program
            .as_deref()
            .map_err(|e| StoreDbError::ExecutableNotFound(e.clone()))
    }

    pub(crate) fn launcher_args(&self) -> &[OsString] {
        &self.inner.launcher_args
    }

    /// Open a connection and apply the DSN's pragmas in order.
    ///
    /// # Errors
    /// Returns `StoreDbError::ExecutableNotFound`, `StoreDbError::ConfigError` for a bad DSN,
    /// or the first pragma's failure.
    pub async fn open(&self, dsn: &str) -> Result<CliConnection, StoreDbError> {
        self.open_with_timeout(dsn, None).await
    }

    /// [`CliDriver::open`] with a default timeout applied to every statement on the connection.
    ///
    /// # Errors
    /// See [`CliDriver::open`].
    pub async fn open_with_timeout(
        &self,
        dsn: &str,
        default_timeout: Option<Duration>,
    ) -> Result<CliConnection, StoreDbError> {
        CliConnection::open(self.clone(), dsn, default_timeout).await
    }
}
