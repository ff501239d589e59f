mod common;

use std::time::{Duration, Instant};

use common::FakeEngine;
use sqlcli_store::prelude::*;

#[tokio::test]
async fn exec_passes_path_and_normalized_sql() -> Result<(), StoreDbError> {
    let engine = FakeEngine::recording("exit 0");
    let conn = engine.driver().open(&engine.db_path()).await?;

    conn.execute("INSERT INTO sessions\n\t(id, source)\n  VALUES ('a', 'b')")
        .await?;

    let calls = engine.invocations();
    assert_eq!(calls.len(), 1);
    assert_eq!(
        calls[0],
        vec![
            "-init".to_string(),
            "/dev/null".to_string(),
            engine.db_path(),
            "INSERT INTO sessions (id, source) VALUES ('a', 'b')".to_string()
        ]
    );
    Ok(())
}

#[tokio::test]
async fn open_applies_dsn_pragmas_in_order() -> Result<(), StoreDbError> {
    let engine = FakeEngine::recording("exit 0");
    let dsn = with_pragmas(&file_dsn(std::path::Path::new(&engine.db_path())));
    let conn = engine.driver().open(&dsn).await?;
    assert_eq!(conn.path(), engine.db_path());

    let sql: Vec<String> = engine
        .invocations()
        .into_iter()
        .filter_map(|call| call.last().cloned())
        .collect();
    assert_eq!(
        sql,
        vec![
            "PRAGMA journal_mode(WAL);",
            "PRAGMA busy_timeout(5000);",
            "PRAGMA foreign_keys(ON);"
        ]
    );
    Ok(())
}

#[tokio::test]
async fn query_requests_header_and_separator() -> Result<(), StoreDbError> {
    let engine = FakeEngine::recording("printf 'id|name|note\\n1|alpha|\\n2|beta|x\\n'");
    let conn = engine.driver().open(&engine.db_path()).await?;

    let rows = conn.select("SELECT id, name, note FROM t").await?;
    assert_eq!(rows.column_names(), ["id", "name", "note"]);
    assert_eq!(rows.len(), 2);
    assert_eq!(rows.results[0].scan::<i64>("id")?, 1);
    assert_eq!(rows.results[0].scan::<Option<String>>("note")?, None);
    assert_eq!(rows.results[1].get("note"), Some("x"));

    let calls = engine.invocations();
    assert_eq!(
        calls[0][..7],
        [
            "-init",
            "/dev/null",
            "-list",
            "-header",
            "-separator",
            "|",
            engine.db_path().as_str()
        ]
    );
    Ok(())
}

#[tokio::test]
async fn empty_query_output_is_zero_rows() -> Result<(), StoreDbError> {
    let engine = FakeEngine::new("exit 0");
    let conn = engine.driver().open(&engine.db_path()).await?;
    let rows = conn.select("SELECT * FROM t WHERE 0").await?;
    assert!(rows.is_empty());
    assert!(rows.column_names().is_empty());

    let mut cursor = rows.into_rows();
    let mut buf = vec![None; 2];
    assert_eq!(cursor.advance(&mut buf), Fetch::Exhausted);
    Ok(())
}

#[tokio::test]
async fn failed_exec_carries_engine_output() -> Result<(), StoreDbError> {
    let engine = FakeEngine::new("echo 'Error: near \"FOO\": syntax error' >&2\nexit 1\n");
    let conn = engine.driver().open(&engine.db_path()).await?;

    let err = conn.execute("FOO BAR").await.unwrap_err();
    match &err {
        StoreDbError::ExecFailed { kind, output, .. } => {
            assert_eq!(*kind, StatementKind::Write);
            assert!(output.contains("syntax error"), "{output}");
        }
        other => panic!("unexpected error: {other:?}"),
    }
    assert!(err.to_string().contains("syntax error"));
    Ok(())
}

#[tokio::test]
async fn failed_query_ignores_stdout_rows() -> Result<(), StoreDbError> {
    let engine = FakeEngine::new("echo 'a|b'\necho 'Error: no such table: t' >&2\nexit 1\n");
    let conn = engine.driver().open(&engine.db_path()).await?;

    let err = conn.select("SELECT * FROM t").await.unwrap_err();
    assert!(matches!(
        &err,
        StoreDbError::QueryFailed { kind: StatementKind::Read, output, .. }
            if output.contains("no such table") && output.contains("a|b")
    ));
    Ok(())
}

#[tokio::test]
async fn empty_statement_spawns_nothing() -> Result<(), StoreDbError> {
    let engine = FakeEngine::recording("exit 0");
    let conn = engine.driver().open(&engine.db_path()).await?;
    conn.execute("  \n\t ").await?;
    assert!(conn.select("").await?.is_empty());
    assert!(engine.invocations().is_empty());
    Ok(())
}

#[tokio::test]
async fn bound_parameters_are_refused_before_spawning() -> Result<(), StoreDbError> {
    let engine = FakeEngine::recording("exit 0");
    let conn = engine.driver().open(&engine.db_path()).await?;

    let err = conn
        .execute_with("UPDATE t SET a = ?", &[RowValues::Int(1)], &QueryOptions::default())
        .await
        .unwrap_err();
    assert!(matches!(err, StoreDbError::UnsupportedParameters(1)));

    let err = conn
        .select_with(
            "SELECT ?1, ?2",
            &[RowValues::Int(1), RowValues::Null],
            &QueryOptions::default(),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, StoreDbError::UnsupportedParameters(2)));
    assert!(engine.invocations().is_empty());
    Ok(())
}

#[tokio::test]
async fn transactions_are_unsupported() -> Result<(), StoreDbError> {
    let engine = FakeEngine::new("exit 0");
    let conn = engine.driver().open(&engine.db_path()).await?;
    assert!(matches!(conn.begin(), Err(StoreDbError::Unsupported(_))));
    conn.close().await?;
    conn.close().await?;
    Ok(())
}

#[tokio::test]
async fn builder_inlines_literals() -> Result<(), StoreDbError> {
    let engine = FakeEngine::recording("exit 0");
    let conn = engine.driver().open(&engine.db_path()).await?;

    conn.query("UPDATE sessions SET notes = ?1 WHERE id = ?2")
        .inline(&[RowValues::from("it's done"), RowValues::from("s-1")])
        .execute()
        .await?;

    let calls = engine.invocations();
    assert_eq!(
        calls[0].last().unwrap(),
        "UPDATE sessions SET notes = 'it''s done' WHERE id = 's-1'"
    );
    Ok(())
}

#[tokio::test]
async fn deadline_kills_the_process() -> Result<(), StoreDbError> {
    let engine = FakeEngine::new("sleep 5\n");
    let conn = engine.driver().open(&engine.db_path()).await?;

    let started = Instant::now();
    let err = conn
        .query("SELECT 1")
        .timeout(Duration::from_millis(150))
        .select()
        .await
        .unwrap_err();
    assert!(matches!(err, StoreDbError::DeadlineExceeded(d) if d == Duration::from_millis(150)));
    assert!(started.elapsed() < Duration::from_secs(4));
    Ok(())
}

#[tokio::test]
async fn connection_default_timeout_applies() -> Result<(), StoreDbError> {
    let engine = FakeEngine::new("sleep 5\n");
    let conn = engine
        .driver()
        .open_with_timeout(&engine.db_path(), Some(Duration::from_millis(100)))
        .await?;
    let err = conn.execute("DELETE FROM t").await.unwrap_err();
    assert!(matches!(err, StoreDbError::DeadlineExceeded(_)));
    Ok(())
}

#[tokio::test]
async fn cancel_token_aborts_the_call() -> Result<(), StoreDbError> {
    let engine = FakeEngine::new("sleep 5\n");
    let conn = engine.driver().open(&engine.db_path()).await?;

    let token = CancellationToken::new();
    let trigger = token.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(100)).await;
        trigger.cancel();
    });

    let started = Instant::now();
    let err = conn
        .query("DELETE FROM t")
        .cancel_on(token)
        .execute()
        .await
        .unwrap_err();
    assert!(matches!(err, StoreDbError::Canceled));
    assert!(started.elapsed() < Duration::from_secs(4));
    Ok(())
}

#[tokio::test]
async fn already_canceled_token_spawns_nothing() -> Result<(), StoreDbError> {
    let engine = FakeEngine::recording("exit 0");
    let conn = engine.driver().open(&engine.db_path()).await?;
    let token = CancellationToken::new();
    token.cancel();

    let err = conn
        .execute_with(
            "DELETE FROM t",
            &[],
            &QueryOptions::default().with_cancel(token),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, StoreDbError::Canceled));
    assert!(engine.invocations().is_empty());
    Ok(())
}

#[tokio::test]
async fn ping_reads_user_version() -> Result<(), StoreDbError> {
    let engine = FakeEngine::recording("printf 'user_version\\n0\\n'");
    let conn = engine.driver().open(&engine.db_path()).await?;
    conn.ping().await?;
    assert_eq!(engine.invocations()[0].last().unwrap(), "PRAGMA user_version;");
    Ok(())
}

#[tokio::test]
async fn failing_pragma_fails_open() {
    let engine = FakeEngine::new("echo 'Error: unknown pragma' >&2\nexit 1\n");
    let dsn = format!("file:{}?_pragma=bogus(1)", engine.db_path());
    let err = engine.driver().open(&dsn).await.unwrap_err();
    assert!(matches!(
        err,
        StoreDbError::ExecFailed { kind: StatementKind::Pragma, .. }
    ));
}

#[tokio::test]
async fn malformed_dsn_is_a_config_error() {
    let engine = FakeEngine::recording("exit 0");
    let err = engine
        .driver()
        .open("file://remote-host/x.db")
        .await
        .unwrap_err();
    assert!(matches!(err, StoreDbError::ConfigError(_)));
    assert!(engine.invocations().is_empty());
}
