use std::ffi::OsStr;
use std::process::{Output, Stdio};
use std::time::{Duration, Instant};

use tokio::process::Command;
use tokio_util::sync::CancellationToken;

use crate::error::StoreDbError;
use crate::store::QueryOptions;
use crate::types::StatementKind;

use super::driver::CliDriver;

#[cfg(not(windows))]
const NULL_DEVICE: &str = "/dev/null";
#[cfg(windows)]
const NULL_DEVICE: &str = "NUL";

/// Leading engine arguments on every call: read no `~/.sqliterc`.
pub(crate) const ENGINE_PREAMBLE: [&str; 2] = ["-init", NULL_DEVICE];

/// Spawn one engine process and wait for it, honoring the call's deadline and cancel token.
///
/// The child is killed if the wait is abandoned. Anything the engine already committed
/// before that point stays committed.
pub(crate) async fn run(
    driver: &CliDriver,
    kind: StatementKind,
    args: &[&OsStr],
    options: &QueryOptions,
) -> Result<Output, StoreDbError> {
    let program = driver.program()?;
    let cancel = options.cancel.clone().unwrap_or_else(CancellationToken::new);
    if cancel.is_cancelled() {
        return Err(StoreDbError::Canceled);
    }

    let mut cmd = Command::new(program);
    cmd.args(driver.launcher_args())
        .args(ENGINE_PREAMBLE)
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    let started = Instant::now();
    let child = cmd.spawn().map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            StoreDbError::ExecutableNotFound(format!("{}: {e}", program.display()))
        } else {
            StoreDbError::Io(e)
        }
    })?;

    let limit = options.timeout;
    let deadline = async move {
        match limit {
            Some(limit) => {
                tokio::time::sleep(limit).await;
                limit
            }
            None => std::future::pending::<Duration>().await,
        }
    };

    tokio::select! {
        output = child.wait_with_output() => {
            let output = output?;
            tracing::debug!(
                %kind,
                status = %output.status,
                elapsed_ms = started.elapsed().as_millis() as u64,
                "sqlite3 finished"
            );
            Ok(output)
        }
        () = cancel.cancelled() => {
            tracing::warn!(
                %kind,
                elapsed_ms = started.elapsed().as_millis() as u64,
                "sqlite3 canceled; process killed"
            );
            Err(StoreDbError::Canceled)
        }
        limit = deadline => {
            tracing::warn!(%kind, ?limit, "sqlite3 deadline exceeded; process killed");
            Err(StoreDbError::DeadlineExceeded(limit))
        }
    }
}

/// stderr then stdout, trimmed, for error messages.
pub(crate) fn combined_output(output: &Output) -> String {
    let stderr = String::from_utf8_lossy(&output.stderr);
    let stdout = String::from_utf8_lossy(&output.stdout);
    let parts: Vec<&str> = [stderr.trim(), stdout.trim()]
        .into_iter()
        .filter(|s| !s.is_empty())
        .collect();
    parts.join("\n")
}
