use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Deserializer};

use crate::cli::driver::{CliDriver, SQLITE3};
use crate::dsn::{file_dsn, with_pragmas};
use crate::error::StoreDbError;
use crate::pool::StorePool;

/// Options for opening a store.
///
/// Deserializable so collaborators can embed it in their own configuration:
///
/// ```rust
/// # use sqlcli_store::config::StoreOptions;
/// let opts: StoreOptions = serde_json::from_str(
///     r#"{ "dsn": "/var/lib/app/usage.db", "default_timeout_ms": 5000 }"#,
/// ).unwrap();
/// assert!(opts.pragmas);
/// ```
#[derive(Debug, Clone, Deserialize)]
pub struct StoreOptions {
    /// Bare path or `file:` URI.
    pub dsn: String,
    /// Engine executable; `sqlite3` on `PATH` when unset.
    #[serde(default)]
    pub executable: Option<PathBuf>,
    /// Placed before the engine arguments on every call.
    #[serde(default)]
    pub launcher_args: Vec<String>,
    /// Append the default pragmas to the DSN.
    #[serde(default = "enabled")]
    pub pragmas: bool,
    #[serde(
        default,
        rename = "default_timeout_ms",
        deserialize_with = "millis_opt"
    )]
    pub default_timeout: Option<Duration>,
}

fn enabled() -> bool {
    true
}

fn millis_opt<'de, D>(deserializer: D) -> Result<Option<Duration>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<u64>::deserialize(deserializer)?.map(Duration::from_millis))
}

impl StoreOptions {
    #[must_use]
    pub fn new(dsn: impl Into<String>) -> Self {
        Self {
            dsn: dsn.into(),
            executable: None,
            launcher_args: Vec::new(),
            pragmas: true,
            default_timeout: None,
        }
    }

    /// The DSN handed to the driver: bare paths become `file:` URIs and the default
    /// pragmas are appended when enabled.
    #[must_use]
    pub fn effective_dsn(&self) -> String {
        if !self.pragmas {
            return self.dsn.clone();
        }
        if self.dsn.starts_with("file:") {
            with_pragmas(&self.dsn)
        } else {
            with_pragmas(&file_dsn(Path::new(&self.dsn)))
        }
    }

    /// Resolve the engine executable. Lookup failures surface on first use.
    ///
    /// Each call repeats the lookup; resolve once and pass the driver to
    /// [`StorePool::connect_with`] when opening several stores.
    #[must_use]
    pub fn driver(&self) -> CliDriver {
        let driver = match &self.executable {
            Some(path) if path.components().count() > 1 => CliDriver::with_executable(path),
            Some(name) => CliDriver::locate_named(name),
            None => CliDriver::locate_named(SQLITE3),
        };
        if self.launcher_args.is_empty() {
            driver
        } else {
            driver.with_launcher_args(&self.launcher_args)
        }
    }
}

/// Fluent builder for [`StoreOptions`].
#[derive(Debug, Clone)]
pub struct StoreOptionsBuilder {
    opts: StoreOptions,
    driver: Option<CliDriver>,
}

impl StoreOptionsBuilder {
    #[must_use]
    pub fn new(dsn: impl Into<String>) -> Self {
        Self {
            opts: StoreOptions::new(dsn),
            driver: None,
        }
    }

    #[must_use]
    pub fn executable(mut self, executable: impl Into<PathBuf>) -> Self {
        self.opts.executable = Some(executable.into());
        self
    }

    #[must_use]
    pub fn launcher_args<I, A>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = A>,
        A: Into<String>,
    {
        self.opts.launcher_args = args.into_iter().map(Into::into).collect();
        self
    }

    #[must_use]
    pub fn pragmas(mut self, pragmas: bool) -> Self {
        self.opts.pragmas = pragmas;
        self
    }

    #[must_use]
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.opts.default_timeout = Some(timeout);
        self
    }

    /// Open through an already-resolved driver instead of resolving one from the options.
    #[must_use]
    pub fn driver(mut self, driver: CliDriver) -> Self {
        self.driver = Some(driver);
        self
    }

    #[must_use]
    pub fn finish(self) -> StoreOptions {
        self.opts
    }

    /// Open the store and bring its schema up to date.
    ///
    /// # Errors
    /// Returns `StoreDbError` if the engine cannot be found, the DSN is malformed, the
    /// directory cannot be created, or bootstrap fails.
    pub async fn build(self) -> Result<StorePool, StoreDbError> {
        match self.driver {
            Some(driver) => StorePool::open_with(driver, self.opts).await,
            None => StorePool::open(self.opts).await,
        }
    }
}

impl StorePool {
    #[must_use]
    pub fn builder(dsn: impl Into<String>) -> StoreOptionsBuilder {
        StoreOptionsBuilder::new(dsn)
    }
}
