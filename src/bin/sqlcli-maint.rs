use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use clap::{Parser, Subcommand};
use serde_json::json;
use tracing_subscriber::EnvFilter;

use sqlcli_store::cli::FIELD_SEPARATOR;
use sqlcli_store::prelude::*;
use sqlcli_store::schema::read_user_version;

#[derive(Parser, Debug)]
#[command(author, version, about = "Maintenance commands for a sqlite3-shell usage store")]
struct Args {
    /// Database file or `file:` DSN
    #[arg(long)]
    db: String,
    /// Engine executable (name on PATH or a path)
    #[arg(long, default_value = "sqlite3")]
    sqlite3: PathBuf,
    /// Per-statement timeout in milliseconds
    #[arg(long)]
    timeout_ms: Option<u64>,
    /// Skip the default WAL/busy-timeout/foreign-key pragmas
    #[arg(long)]
    no_pragmas: bool,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Create or upgrade the schema
    Bootstrap,
    /// Print the stored and supported schema versions
    Version,
    /// Run a row-producing statement and print its rows
    Query {
        sql: String,
        /// Print rows as JSON objects
        #[arg(long)]
        json: bool,
    },
    /// Run a side-effecting statement
    Exec { sql: String },
    /// Print daily usage and today's totals as JSON
    Summary {
        #[arg(long, default_value_t = 7)]
        days: u32,
    },
}

impl Args {
    fn options(&self) -> StoreOptions {
        let mut builder = StoreOptionsBuilder::new(self.db.clone())
            .executable(self.sqlite3.clone())
            .pragmas(!self.no_pragmas);
        if let Some(ms) = self.timeout_ms {
            builder = builder.timeout(Duration::from_millis(ms));
        }
        builder.finish()
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();
    match run(args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            tracing::error!(fatal = err.is_fatal(), "{err}");
            eprintln!("Error: {err}");
            ExitCode::FAILURE
        }
    }
}

async fn run(args: Args) -> Result<(), StoreDbError> {
    let options = args.options();
    match args.command {
        Command::Bootstrap => {
            let store = StorePool::connect(options).await?;
            let outcome = store.bootstrap().await?;
            let shown = json!({ "outcome": format!("{outcome:?}"), "version": outcome.version() });
            println!("{}", to_json(&shown));
        }
        Command::Version => {
            let store = StorePool::connect(options).await?;
            let found = read_user_version(&store).await?;
            println!(
                "{}",
                to_json(&json!({ "stored": found, "supported": TARGET_VERSION }))
            );
        }
        Command::Query { sql, json } => {
            let store = StorePool::connect(options).await?;
            let rows = store.select(&sql).await?;
            if json {
                let objects: Vec<_> = rows
                    .results
                    .iter()
                    .map(|row| {
                        row.column_names
                            .iter()
                            .zip(&row.values)
                            .map(|(k, v)| (k.clone(), json!(v)))
                            .collect::<serde_json::Map<_, _>>()
                    })
                    .collect();
                println!("{}", to_json(&json!(objects)));
            } else {
                if !rows.is_empty() {
                    println!("{}", rows.column_names().join(FIELD_SEPARATOR));
                }
                for row in &rows.results {
                    let line: Vec<&str> = row
                        .values
                        .iter()
                        .map(|v| v.as_deref().unwrap_or_default())
                        .collect();
                    println!("{}", line.join(FIELD_SEPARATOR));
                }
            }
        }
        Command::Exec { sql } => {
            let store = StorePool::connect(options).await?;
            store.execute(&sql).await?;
        }
        Command::Summary { days } => {
            let store = StorePool::open(options).await?;
            let daily = daily_summary(&store, days).await?;
            let today = today_totals(&store).await?;
            println!("{}", to_json(&json!({ "days": daily, "today": today })));
        }
    }
    Ok(())
}

fn to_json(value: &serde_json::Value) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string())
}
