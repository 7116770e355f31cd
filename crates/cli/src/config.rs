//! Settings resolution for the CLI
//!
//! Every setting comes from, in order of preference: an explicit flag, the
//! environment (connection string only), the JSON config file, then the
//! built-in default.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::Args;
use serde::Deserialize;
use sqlshift::config::{DEFAULT_MIGRATION_PATTERN, DEFAULT_SCHEMA_TABLE};
use sqlshift::{Config, DialectKind, LineEnding};

/// In-memory database used when SQLite runs without a connection string
pub const SQLITE_MEMORY: &str = "sqlite::memory:";

/// Options shared by every command
#[derive(Args, Debug, Clone, Default)]
pub struct GlobalArgs {
    /// Database driver: pg or sqlite3 [default: pg]
    #[arg(long, global = true)]
    pub driver: Option<String>,

    /// Connection string (falls back to DATABASE_URL for pg, SQLITE_URL for sqlite3)
    #[arg(long, global = true)]
    pub conn: Option<String>,

    /// JSON config file
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Glob pattern locating migration files [default: migrations/*.sql]
    #[arg(long, global = true)]
    pub migration_pattern: Option<String>,

    /// State table name, optionally schema-qualified [default: schemaversion]
    #[arg(long, global = true)]
    pub schema_table: Option<String>,

    /// Normalize line endings before checksumming: LF, CR or CRLF
    #[arg(long, global = true)]
    pub newline: Option<String>,

    /// Skip checksum validation of applied migrations
    #[arg(long, global = true)]
    pub no_validate_checksums: bool,

    /// Search path for PostgreSQL sessions
    #[arg(long, global = true)]
    pub current_schema: Option<String>,

    /// Database (catalog) name used when inspecting the state table
    #[arg(long, global = true)]
    pub database: Option<String>,

    /// Cancel the command after this many seconds
    #[arg(long, global = true, default_value_t = 600)]
    pub timeout_secs: u64,

    /// Log level when RUST_LOG is unset [default: warn]
    #[arg(long, global = true)]
    pub log_level: Option<String>,

    /// Emit logs as JSON
    #[arg(long, global = true)]
    pub log_json: bool,
}

/// Contents of the `--config` file; every key is optional
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileConfig {
    pub driver: Option<String>,
    pub conn: Option<String>,
    pub schema_table: Option<String>,
    pub migration_pattern: Option<String>,
    pub newline: Option<LineEnding>,
    pub validate_checksums: Option<bool>,
    pub database: Option<String>,
    pub current_schema: Option<String>,
}

impl FileConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path)
            .with_context(|| format!("failed to read config file {}", path.display()))?;
        serde_json::from_str(&raw)
            .with_context(|| format!("failed to parse config file {}", path.display()))
    }
}

/// Fully resolved settings for one invocation
#[derive(Debug, Clone)]
pub struct Settings {
    pub config: Config,
    pub kind: DialectKind,
    pub conn: Option<String>,
}

impl Settings {
    /// Connection string for commands that open a database.
    ///
    /// SQLite falls back to an in-memory database; pg has no default.
    pub fn connection_string(&self) -> Result<&str> {
        match (&self.conn, self.kind) {
            (Some(conn), _) => Ok(conn.as_str()),
            (None, DialectKind::Sqlite) => Ok(SQLITE_MEMORY),
            (None, DialectKind::Postgres) => bail!(
                "a connection string is required for pg: pass --conn, set {} or add \"conn\" to the config file",
                conn_env_var(self.kind)
            ),
        }
    }
}

/// Environment variable holding the connection string for a dialect
pub fn conn_env_var(kind: DialectKind) -> &'static str {
    match kind {
        DialectKind::Postgres => "DATABASE_URL",
        DialectKind::Sqlite => "SQLITE_URL",
    }
}

/// Load the config file named by `--config`, if any
pub fn load_file(args: &GlobalArgs) -> Result<FileConfig> {
    match &args.config {
        Some(path) => FileConfig::load(path),
        None => Ok(FileConfig::default()),
    }
}

/// Merge flags, environment and file into [`Settings`].
///
/// `env` looks up an environment variable; it is a parameter so tests do not
/// depend on the process environment.
pub fn resolve<F>(args: &GlobalArgs, file: FileConfig, env: F) -> Result<Settings>
where
    F: Fn(&str) -> Option<String>,
{
    let driver = args
        .driver
        .clone()
        .or(file.driver)
        .unwrap_or_else(|| "pg".to_string());
    let kind: DialectKind = driver.parse()?;

    let newline = match &args.newline {
        Some(value) => Some(value.parse::<LineEnding>()?),
        None => file.newline,
    };

    let validate_checksums = if args.no_validate_checksums {
        false
    } else {
        file.validate_checksums.unwrap_or(true)
    };

    let mut config = Config::new(driver)
        .with_schema_table(
            args.schema_table
                .clone()
                .or(file.schema_table)
                .unwrap_or_else(|| DEFAULT_SCHEMA_TABLE.to_string()),
        )
        .with_migration_pattern(
            args.migration_pattern
                .clone()
                .or(file.migration_pattern)
                .unwrap_or_else(|| DEFAULT_MIGRATION_PATTERN.to_string()),
        )
        .with_newline(newline)
        .with_validate_checksums(validate_checksums);
    config.database = args.database.clone().or(file.database);
    config.current_schema = args.current_schema.clone().or(file.current_schema);
    config.validate()?;

    let conn = args
        .conn
        .clone()
        .or_else(|| env(conn_env_var(kind)).filter(|value| !value.is_empty()))
        .or(file.conn);

    Ok(Settings { config, kind, conn })
}
