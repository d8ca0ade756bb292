//! Shared fixtures for SQLite integration tests

#![allow(dead_code)]

use std::path::PathBuf;

/// SQLite database file in the temp dir, removed (with its WAL files) on drop
pub struct TempDb {
    path: PathBuf,
}

impl TempDb {
    pub fn new(label: &str) -> Self {
        let path = std::env::temp_dir().join(format!(
            "dbcommand-{}-{}.db",
            label,
            uuid::Uuid::new_v4()
        ));
        Self { path }
    }

    pub fn url(&self) -> String {
        format!("sqlite://{}", self.path.display())
    }
}

impl Drop for TempDb {
    fn drop(&mut self) {
        let _ = std::fs::remove_file(&self.path);
        for suffix in ["-wal", "-shm"] {
            let mut sidecar = self.path.clone().into_os_string();
            sidecar.push(suffix);
            let _ = std::fs::remove_file(sidecar);
        }
    }
}

/// URL of a database inside a directory that does not exist
pub fn missing_directory_url() -> String {
    let dir = std::env::temp_dir().join(format!("dbcommand-missing-{}", uuid::Uuid::new_v4()));
    format!("sqlite://{}", dir.join("nested").join("db.sqlite").display())
}
