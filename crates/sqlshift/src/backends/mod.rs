//! Database Dialects
//!
//! One module per supported database. The engine only ever sees
//! `Box<dyn Client>`; [`connect`] picks the implementation from the
//! configured driver name and the pool the caller handed in.

pub mod core;
pub mod postgres;
pub mod sqlite;

use std::fmt;
use std::str::FromStr;

use sqlx::postgres::PgPool;
use sqlx::sqlite::SqlitePool;

pub use self::core::{quote_literal, Client, Dialect, Row, SqlValue, StateColumn};
pub use postgres::{PostgresClient, PostgresDialect};
pub use sqlite::{SqliteClient, SqliteDialect};

use crate::config::Config;
use crate::error::{MigrateError, MigrateResult};

/// Supported database dialects
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DialectKind {
    Postgres,
    Sqlite,
}

impl DialectKind {
    pub fn name(&self) -> &'static str {
        match self {
            DialectKind::Postgres => "pg",
            DialectKind::Sqlite => "sqlite3",
        }
    }
}

impl fmt::Display for DialectKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for DialectKind {
    type Err = MigrateError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pg" | "postgres" | "postgresql" => Ok(DialectKind::Postgres),
            "sqlite3" | "sqlite" => Ok(DialectKind::Sqlite),
            _ => Err(MigrateError::UnsupportedDriver(s.to_string())),
        }
    }
}

/// A caller-owned connection pool for one of the supported dialects
#[derive(Debug, Clone)]
pub enum DatabasePool {
    Postgres(PgPool),
    Sqlite(SqlitePool),
}

impl DatabasePool {
    pub fn kind(&self) -> DialectKind {
        match self {
            DatabasePool::Postgres(_) => DialectKind::Postgres,
            DatabasePool::Sqlite(_) => DialectKind::Sqlite,
        }
    }
}

impl From<PgPool> for DatabasePool {
    fn from(pool: PgPool) -> Self {
        DatabasePool::Postgres(pool)
    }
}

impl From<SqlitePool> for DatabasePool {
    fn from(pool: SqlitePool) -> Self {
        DatabasePool::Sqlite(pool)
    }
}

/// Build the client matching `config.driver` over `pool`
pub fn connect(config: &Config, pool: DatabasePool) -> MigrateResult<Box<dyn Client>> {
    let kind: DialectKind = config.driver.parse()?;
    if kind != pool.kind() {
        return Err(MigrateError::DriverMismatch {
            driver: config.driver.clone(),
            pool: pool.kind().to_string(),
        });
    }

    let client: Box<dyn Client> = match pool {
        DatabasePool::Postgres(pool) => Box::new(PostgresClient::new(config, pool)),
        DatabasePool::Sqlite(pool) => Box::new(SqliteClient::new(config, pool)),
    };
    Ok(client)
}
