use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use lazy_static::lazy_static;
use regex::Regex;

use crate::cli::normalize_sql;
use crate::error::StoreDbError;
use crate::results::ResultSet;
use crate::store::{QueryOptions, Store};
use crate::types::{RowValues, StatementKind};

lazy_static! {
    static ref SET_VERSION: Regex =
        Regex::new(r"(?i)^PRAGMA\s+user_version\s*=\s*(\d+)\s*;?$").expect("static regex");
    static ref GET_VERSION: Regex =
        Regex::new(r"(?i)^PRAGMA\s+user_version\s*;?$").expect("static regex");
    static ref TABLE_INFO: Regex =
        Regex::new(r#"(?i)^PRAGMA\s+table_info\(\s*"?(\w+)"?\s*\)\s*;?$"#).expect("static regex");
    static ref CREATE_TABLE: Regex =
        Regex::new(r#"(?i)^CREATE\s+TABLE\s+IF\s+NOT\s+EXISTS\s+"?(\w+)"?\s*\((.*)\)\s*;?$"#)
            .expect("static regex");
    static ref CREATE_VIEW: Regex =
        Regex::new(r#"(?i)^CREATE\s+VIEW\s+IF\s+NOT\s+EXISTS\s+"?(\w+)"?"#).expect("static regex");
    static ref CREATE_INDEX: Regex = Regex::new(
        r#"(?i)^CREATE\s+INDEX\s+IF\s+NOT\s+EXISTS\s+"?(\w+)"?\s+ON\s+"?(\w+)"?"#
    )
    .expect("static regex");
    static ref ADD_COLUMN: Regex = Regex::new(
        r#"(?i)^ALTER\s+TABLE\s+"?(\w+)"?\s+ADD\s+COLUMN\s+"?(\w+)"?\s*(.*?)\s*;?$"#
    )
    .expect("static regex");
    static ref DEFAULT_CLAUSE: Regex =
        Regex::new(r"(?i)\bDEFAULT\s+('[^']*'|\S+)").expect("static regex");
}

#[derive(Debug, Clone)]
struct Column {
    name: String,
    decl: String,
}

impl Column {
    fn parse(def: &str) -> Option<Self> {
        let def = def.trim();
        let mut words = def.split_whitespace();
        let first = words.next()?;
        if matches!(
            first.to_ascii_uppercase().as_str(),
            "FOREIGN" | "PRIMARY" | "UNIQUE" | "CHECK" | "CONSTRAINT"
        ) {
            return None;
        }
        Some(Self {
            name: first.trim_matches('"').to_string(),
            decl: words.collect::<Vec<_>>().join(" "),
        })
    }

    fn decl_type(&self) -> &str {
        self.decl.split_whitespace().next().unwrap_or_default()
    }

    fn default(&self) -> Option<String> {
        DEFAULT_CLAUSE
            .captures(&self.decl)
            .map(|c| c[1].to_string())
    }

    fn has(&self, clause: &str) -> bool {
        self.decl.to_ascii_uppercase().contains(clause)
    }
}

/// Split a column list on commas outside parentheses.
fn split_defs(body: &str) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut depth = 0usize;
    let mut start = 0;
    for (i, c) in body.char_indices() {
        match c {
            '(' => depth += 1,
            ')' => depth = depth.saturating_sub(1),
            ',' if depth == 0 => {
                parts.push(&body[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    parts.push(&body[start..]);
    parts
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Path {
    Exec,
    Query,
}

#[derive(Debug, Default)]
struct State {
    user_version: u32,
    tables: BTreeMap<String, Vec<Column>>,
    views: BTreeSet<String>,
    indexes: BTreeSet<String>,
    log: Vec<(Path, String)>,
    failures: Vec<(String, String)>,
    canned: Vec<(String, ResultSet)>,
}

/// An in-memory [`Store`] that understands just enough DDL to exercise bootstrap and
/// migrations without a `sqlite3` binary.
///
/// It tracks `user_version`, table columns, views, and indexes, and records every
/// statement it sees after the same whitespace normalization the shell driver applies.
/// Statements it does not model are logged and otherwise ignored; reads it does not model
/// return an empty result unless a canned response matches.
#[derive(Debug, Default)]
pub struct RecordingStore {
    state: Mutex<State>,
}

impl RecordingStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_user_version(self, version: u32) -> Self {
        self.lock().user_version = version;
        self
    }

    /// Seed a table with bare columns, as an older schema would have left it.
    #[must_use]
    pub fn with_table(self, table: &str, columns: &[&str]) -> Self {
        let cols = columns
            .iter()
            .map(|name| Column {
                name: (*name).to_string(),
                decl: "TEXT".to_string(),
            })
            .collect();
        self.lock().tables.insert(table.to_string(), cols);
        self
    }

    /// Fail every statement containing `needle`, with `output` as the engine's message.
    #[must_use]
    pub fn fail_when(self, needle: &str, output: &str) -> Self {
        self.lock()
            .failures
            .push((needle.to_string(), output.to_string()));
        self
    }

    /// Answer reads containing `needle` with `rows`.
    #[must_use]
    pub fn respond_to(self, needle: &str, rows: ResultSet) -> Self {
        self.lock().canned.push((needle.to_string(), rows));
        self
    }

    #[must_use]
    pub fn user_version(&self) -> u32 {
        self.lock().user_version
    }

    #[must_use]
    pub fn has_table(&self, table: &str) -> bool {
        self.lock().tables.contains_key(table)
    }

    #[must_use]
    pub fn has_view(&self, view: &str) -> bool {
        self.lock().views.contains(view)
    }

    #[must_use]
    pub fn has_index(&self, index: &str) -> bool {
        self.lock().indexes.contains(index)
    }

    /// Column names of `table`, in declaration order.
    #[must_use]
    pub fn columns(&self, table: &str) -> Option<Vec<String>> {
        self.lock()
            .tables
            .get(table)
            .map(|cols| cols.iter().map(|c| c.name.clone()).collect())
    }

    /// The literal after `DEFAULT` in a column's declaration, quotes included.
    #[must_use]
    pub fn column_default(&self, table: &str, column: &str) -> Option<String> {
        self.lock()
            .tables
            .get(table)?
            .iter()
            .find(|c| c.name == column)?
            .default()
    }

    /// Every statement seen, reads and writes, in order.
    #[must_use]
    pub fn statements(&self) -> Vec<String> {
        self.lock().log.iter().map(|(_, sql)| sql.clone()).collect()
    }

    /// Statements that went through the execute path.
    #[must_use]
    pub fn writes(&self) -> Vec<String> {
        self.lock()
            .log
            .iter()
            .filter(|(path, _)| *path == Path::Exec)
            .map(|(_, sql)| sql.clone())
            .collect()
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn injected_failure(state: &State, sql: &str) -> Option<String> {
        state
            .failures
            .iter()
            .find(|(needle, _)| sql.contains(needle.as_str()))
            .map(|(_, output)| output.clone())
    }

    fn apply(state: &mut State, sql: &str) -> Result<(), String> {
        if let Some(c) = SET_VERSION.captures(sql) {
            state.user_version = c[1].parse().map_err(|e| format!("Error: {e}"))?;
        } else if let Some(c) = CREATE_TABLE.captures(sql) {
            let cols = split_defs(&c[2]).into_iter().filter_map(Column::parse).collect();
            state.tables.entry(c[1].to_string()).or_insert(cols);
        } else if let Some(c) = CREATE_VIEW.captures(sql) {
            state.views.insert(c[1].to_string());
        } else if let Some(c) = CREATE_INDEX.captures(sql) {
            if !state.tables.contains_key(&c[2]) {
                return Err(format!("Error: no such table: main.{}", &c[2]));
            }
            state.indexes.insert(c[1].to_string());
        } else if let Some(c) = ADD_COLUMN.captures(sql) {
            let Some(cols) = state.tables.get_mut(&c[1]) else {
                return Err(format!("Error: no such table: {}", &c[1]));
            };
            if cols.iter().any(|col| col.name == c[2]) {
                return Err(format!("Error: duplicate column name: {}", &c[2]));
            }
            cols.push(Column {
                name: c[2].to_string(),
                decl: c[3].to_string(),
            });
        }
        Ok(())
    }

    fn answer(state: &State, sql: &str) -> ResultSet {
        if GET_VERSION.is_match(sql) {
            let mut rs = ResultSet::new(vec!["user_version".to_string()]);
            rs.add_row_values(vec![Some(state.user_version.to_string())]);
            return rs;
        }
        if let Some(c) = TABLE_INFO.captures(sql) {
            let mut rs = ResultSet::new(
                ["cid", "name", "type", "notnull", "dflt_value", "pk"]
                    .into_iter()
                    .map(String::from)
                    .collect(),
            );
            for (cid, col) in state.tables.get(&c[1]).into_iter().flatten().enumerate() {
                rs.add_row_values(vec![
                    Some(cid.to_string()),
                    Some(col.name.clone()),
                    Some(col.decl_type().to_string()),
                    Some(u8::from(col.has("NOT NULL")).to_string()),
                    Some(col.default().unwrap_or_default()),
                    Some(u8::from(col.has("PRIMARY KEY")).to_string()),
                ]);
            }
            return rs;
        }
        state
            .canned
            .iter()
            .find(|(needle, _)| sql.contains(needle.as_str()))
            .map(|(_, rows)| rows.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl Store for RecordingStore {
    async fn execute_with(
        &self,
        query: &str,
        params: &[RowValues],
        _options: &QueryOptions,
    ) -> Result<(), StoreDbError> {
        if !params.is_empty() {
            return Err(StoreDbError::UnsupportedParameters(params.len()));
        }
        let sql = normalize_sql(query);
        if sql.is_empty() {
            return Ok(());
        }
        let kind = StatementKind::classify(&sql);
        let mut state = self.lock();
        state.log.push((Path::Exec, sql.clone()));
        let outcome = match Self::injected_failure(&state, &sql) {
            Some(output) => Err(output),
            None => Self::apply(&mut state, &sql),
        };
        outcome.map_err(|output| StoreDbError::ExecFailed {
            kind,
            status: "exit status: 1".to_string(),
            output,
        })
    }

    async fn select_with(
        &self,
        query: &str,
        params: &[RowValues],
        _options: &QueryOptions,
    ) -> Result<ResultSet, StoreDbError> {
        if !params.is_empty() {
            return Err(StoreDbError::UnsupportedParameters(params.len()));
        }
        let sql = normalize_sql(query);
        let kind = StatementKind::classify(&sql);
        let mut state = self.lock();
        state.log.push((Path::Query, sql.clone()));
        if let Some(output) = Self::injected_failure(&state, &sql) {
            return Err(StoreDbError::QueryFailed {
                kind,
                status: "exit status: 1".to_string(),
                output,
            });
        }
        Ok(Self::answer(&state, &sql))
    }

    async fn close(&self) -> Result<(), StoreDbError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn models_create_and_alter() {
        let store = RecordingStore::new();
        store
            .execute(
                "CREATE TABLE IF NOT EXISTS t (\n id INTEGER PRIMARY KEY,\n \
                 note TEXT DEFAULT 'x',\n FOREIGN KEY (id) REFERENCES u(id)\n)",
            )
            .await
            .unwrap();
        assert_eq!(store.columns("t").unwrap(), vec!["id", "note"]);
        assert_eq!(store.column_default("t", "note").as_deref(), Some("'x'"));

        store.execute("ALTER TABLE \"t\" ADD COLUMN \"extra\" INTEGER").await.unwrap();
        let err = store
            .execute("ALTER TABLE t ADD COLUMN extra INTEGER")
            .await
            .unwrap_err();
        assert!(err.to_string().contains("duplicate column name: extra"));

        let info = store.select("PRAGMA table_info(\"t\")").await.unwrap();
        assert_eq!(info.len(), 3);
        assert_eq!(info.results[0].get("pk"), Some("1"));
        assert_eq!(info.results[1].get("dflt_value"), Some("'x'"));
    }

    #[tokio::test]
    async fn reads_are_not_writes() {
        let store = RecordingStore::new().with_user_version(5);
        let rs = store.select("PRAGMA user_version").await.unwrap();
        assert_eq!(rs.first().unwrap().get("user_version"), Some("5"));
        assert!(store.writes().is_empty());
        assert_eq!(store.statements(), vec!["PRAGMA user_version"]);
    }
}
