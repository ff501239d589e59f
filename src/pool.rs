use std::ops::Deref;
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use tokio::sync::{Mutex, OwnedMutexGuard};

use crate::cli::connection::CliConnection;
use crate::cli::driver::CliDriver;
use crate::config::StoreOptions;
use crate::dsn::parse_dsn;
use crate::error::StoreDbError;
use crate::results::ResultSet;
use crate::schema::{self, BootstrapOutcome};
use crate::store::{QueryOptions, Store};
use crate::types::RowValues;

/// One logical connection shared by every caller.
///
/// The shell driver offers no isolation between concurrent writers on the same file, so
/// the pool holds exactly one connection and hands it out one statement (or one
/// [`StorePool::get_connection`] guard) at a time. Waiting for the connection honors the
/// call's cancel token and counts against its deadline.
#[derive(Clone, Debug)]
pub struct StorePool {
    conn: Arc<Mutex<CliConnection>>,
    options: Arc<StoreOptions>,
}

/// Exclusive use of the pool's connection until dropped.
#[derive(Debug)]
pub struct PooledConnection {
    guard: OwnedMutexGuard<CliConnection>,
}

impl Deref for PooledConnection {
    type Target = CliConnection;

    fn deref(&self) -> &CliConnection {
        &self.guard
    }
}

impl StorePool {
    /// Create the database directory if needed and open the connection, without touching
    /// the schema. The driver is resolved from `options` on every call; use
    /// [`StorePool::connect_with`] to share one driver across stores.
    ///
    /// # Errors
    /// Returns `StoreDbError::ConfigError` for a bad DSN, `StoreDbError::Io` if the
    /// directory cannot be created, or the driver's open failure.
    pub async fn connect(options: StoreOptions) -> Result<Self, StoreDbError> {
        let driver = options.driver();
        Self::connect_with(driver, options).await
    }

    /// [`StorePool::connect`] with an already-resolved driver. The `executable` and
    /// `launcher_args` in `options` are ignored.
    ///
    /// # Errors
    /// See [`StorePool::connect`].
    pub async fn connect_with(
        driver: CliDriver,
        options: StoreOptions,
    ) -> Result<Self, StoreDbError> {
        driver.program()?;
        let dsn = options.effective_dsn();
        let path = parse_dsn(&dsn)?.path;
        ensure_parent_dir(Path::new(&path)).await?;

        let conn = driver
            .open_with_timeout(&dsn, options.default_timeout)
            .await?;
        tracing::info!(path = %conn.path(), "store connected");
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
            options: Arc::new(options),
        })
    }

    /// [`StorePool::connect`], then bootstrap the schema.
    ///
    /// # Errors
    /// See [`StorePool::connect`] and [`schema::bootstrap`].
    pub async fn open(options: StoreOptions) -> Result<Self, StoreDbError> {
        let driver = options.driver();
        Self::open_with(driver, options).await
    }

    /// [`StorePool::connect_with`], then bootstrap the schema.
    ///
    /// # Errors
    /// See [`StorePool::connect`] and [`schema::bootstrap`].
    pub async fn open_with(
        driver: CliDriver,
        options: StoreOptions,
    ) -> Result<Self, StoreDbError> {
        let pool = Self::connect_with(driver, options).await?;
        pool.bootstrap().await?;
        Ok(pool)
    }

    /// Run the bootstrapper against this store.
    ///
    /// # Errors
    /// See [`schema::bootstrap`].
    pub async fn bootstrap(&self) -> Result<BootstrapOutcome, StoreDbError> {
        let conn = self.get_connection().await;
        schema::bootstrap(&*conn).await
    }

    /// Wait for the connection.
    pub async fn get_connection(&self) -> PooledConnection {
        PooledConnection {
            guard: Arc::clone(&self.conn).lock_owned().await,
        }
    }

    /// The call's deadline, or the store default when the call sets none.
    fn deadline_for(&self, options: &QueryOptions) -> Option<Duration> {
        options.timeout.or(self.options.default_timeout)
    }

    /// Wait for the connection, then hand back options carrying what is left of the
    /// call's deadline for the statement itself.
    async fn acquire(
        &self,
        options: &QueryOptions,
    ) -> Result<(PooledConnection, QueryOptions), StoreDbError> {
        let limit = self.deadline_for(options);
        let cancel = options.cancel.clone().unwrap_or_default();
        let started = Instant::now();
        let deadline = async move {
            match limit {
                Some(limit) => tokio::time::sleep(limit).await,
                None => std::future::pending::<()>().await,
            }
        };

        let conn = tokio::select! {
            conn = self.get_connection() => conn,
            () = cancel.cancelled() => return Err(StoreDbError::Canceled),
            () = deadline => {
                let limit = limit.unwrap_or_default();
                tracing::warn!(?limit, "deadline exceeded waiting for the store connection");
                return Err(StoreDbError::DeadlineExceeded(limit));
            }
        };

        let remaining = QueryOptions {
            timeout: limit.map(|limit| limit.saturating_sub(started.elapsed())),
            cancel: options.cancel.clone(),
        };
        if let Some(limit) = limit.filter(|_| remaining.timeout.is_some_and(|t| t.is_zero())) {
            return Err(StoreDbError::DeadlineExceeded(limit));
        }
        Ok((conn, remaining))
    }

    /// Report a deadline hit during the statement against the call's full deadline.
    fn whole_deadline(&self, options: &QueryOptions, err: StoreDbError) -> StoreDbError {
        match (err, self.deadline_for(options)) {
            (StoreDbError::DeadlineExceeded(_), Some(limit)) => {
                StoreDbError::DeadlineExceeded(limit)
            }
            (err, _) => err,
        }
    }

    #[must_use]
    pub fn options(&self) -> &StoreOptions {
        &self.options
    }
}

#[cfg(unix)]
async fn ensure_parent_dir(path: &Path) -> Result<(), StoreDbError> {
    let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) else {
        return Ok(());
    };
    tokio::fs::DirBuilder::new()
        .recursive(true)
        .mode(0o700)
        .create(parent)
        .await?;
    Ok(())
}

#[cfg(not(unix))]
async fn ensure_parent_dir(path: &Path) -> Result<(), StoreDbError> {
    let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) else {
        return Ok(());
    };
    tokio::fs::create_dir_all(parent).await?;
    Ok(())
}

#[async_trait]
impl Store for StorePool {
    async fn execute_with(
        &self,
        query: &str,
        params: &[RowValues],
        options: &QueryOptions,
    ) -> Result<(), StoreDbError> {
        let (conn, remaining) = self.acquire(options).await?;
        conn.execute_with(query, params, &remaining)
            .await
            .map_err(|err| self.whole_deadline(options, err))
    }

    async fn select_with(
        &self,
        query: &str,
        params: &[RowValues],
        options: &QueryOptions,
    ) -> Result<ResultSet, StoreDbError> {
        let (conn, remaining) = self.acquire(options).await?;
        conn.select_with(query, params, &remaining)
            .await
            .map_err(|err| self.whole_deadline(options, err))
    }

    async fn close(&self) -> Result<(), StoreDbError> {
        self.get_connection().await.close().await
    }
}
