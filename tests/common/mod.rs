#![allow(dead_code)]

use std::path::{Path, PathBuf};

use sqlcli_store::prelude::*;
use tempfile::TempDir;

/// A shell script standing in for `sqlite3`. It is read by `/bin/sh`, so it needs no
/// execute bit.
pub struct FakeEngine {
    pub dir: TempDir,
    pub script: PathBuf,
}

impl FakeEngine {
    pub fn new(body: &str) -> Self {
        let dir = tempfile::tempdir().expect("tempdir");
        let script = dir.path().join("engine.sh");
        std::fs::write(&script, body).expect("write script");
        Self { dir, script }
    }

    /// Script that appends each argument, one per line, to `args.log` and then runs `tail`.
    pub fn recording(tail: &str) -> Self {
        let dir = tempfile::tempdir().expect("tempdir");
        let log = dir.path().join("args.log");
        let script = dir.path().join("engine.sh");
        let body = format!(
            "for a in \"$@\"; do printf '%s\\n' \"$a\" >> '{}'; done\necho --- >> '{}'\n{tail}\n",
            log.display(),
            log.display()
        );
        std::fs::write(&script, body).expect("write script");
        Self { dir, script }
    }

    pub fn driver(&self) -> CliDriver {
        CliDriver::with_executable("/bin/sh").with_launcher_args([self.script.as_os_str()])
    }

    pub fn db_path(&self) -> String {
        self.dir.path().join("store.db").to_string_lossy().into_owned()
    }

    /// Argument lists of every invocation so far.
    pub fn invocations(&self) -> Vec<Vec<String>> {
        let Ok(text) = std::fs::read_to_string(self.dir.path().join("args.log")) else {
            return Vec::new();
        };
        let mut calls = Vec::new();
        let mut current = Vec::new();
        for line in text.lines() {
            if line == "---" {
                calls.push(std::mem::take(&mut current));
            } else {
                current.push(line.to_string());
            }
        }
        calls
    }
}

pub fn sqlite3_on_path() -> Option<PathBuf> {
    which::which("sqlite3").ok()
}

pub fn exists(path: &str) -> bool {
    Path::new(path).exists()
}
