//! Shared fixtures for the integration tests

#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};

use sqlshift::Config;
use sqlx::sqlite::{SqlitePool, SqlitePoolOptions};
use tempfile::TempDir;

/// A temporary migrations folder
pub struct MigrationDir {
    pub dir: TempDir,
}

impl MigrationDir {
    pub fn new() -> Self {
        Self {
            dir: TempDir::new().expect("create temp dir"),
        }
    }

    /// Folder with `count` migrations, each creating and dropping table `t<version>`
    pub fn with_tables(count: i64) -> Self {
        let fixture = Self::new();
        for version in 1..=count {
            fixture.add(
                version,
                &format!("CREATE TABLE t{} (id INTEGER PRIMARY KEY);", version),
                &format!("DROP TABLE t{};", version),
            );
        }
        fixture
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    pub fn pattern(&self) -> String {
        format!("{}/*.sql", self.path().display())
    }

    pub fn add(&self, version: i64, do_sql: &str, undo_sql: &str) {
        fs::write(self.do_file(version), do_sql).expect("write do file");
        fs::write(
            self.path().join(format!("{:03}.undo.table-{}.sql", version, version)),
            undo_sql,
        )
        .expect("write undo file");
    }

    pub fn do_file(&self, version: i64) -> PathBuf {
        self.path().join(format!("{:03}.do.table-{}.sql", version, version))
    }

    pub fn config(&self, driver: &str) -> Config {
        Config::new(driver).with_migration_pattern(self.pattern())
    }
}

/// Single-connection in-memory database that lives as long as the pool
pub async fn memory_pool() -> SqlitePool {
    SqlitePoolOptions::new()
        .max_connections(1)
        .idle_timeout(None)
        .max_lifetime(None)
        .connect("sqlite::memory:")
        .await
        .expect("open in-memory sqlite")
}

/// Names of the user tables in a SQLite database, sorted
pub async fn sqlite_tables(pool: &SqlitePool) -> Vec<String> {
    sqlx::query_scalar::<_, String>(
        "SELECT name FROM sqlite_master WHERE type = 'table' AND name LIKE 't%' ORDER BY name",
    )
    .fetch_all(pool)
    .await
    .expect("list tables")
}
