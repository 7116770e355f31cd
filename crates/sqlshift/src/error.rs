//! Error types for the migration engine
//!
//! Every failure the engine can surface is a variant of [`MigrateError`].
//! Operations that may stop part-way through a run return [`RunError`],
//! which also carries the migrations that were committed before the failure.

use std::path::PathBuf;

use thiserror::Error;

use crate::migrations::{Action, Migration};

/// Result type alias for migration operations
pub type MigrateResult<T> = Result<T, MigrateError>;

/// Error types for migration operations
#[derive(Debug, Error)]
pub enum MigrateError {
    /// Two migration files map to the same (version, action) pair
    #[error("duplicate migration for version {version} and action {action}")]
    DuplicateMigration { version: i64, action: Action },

    /// The checksum stored for an applied migration differs from the file on disk
    #[error("checksum mismatch for migration [{version}]: the file changed after it was applied")]
    ChecksumMismatch { version: i64 },

    /// The requested target is neither "max", empty, nor a non-negative integer
    #[error("invalid target version '{target}': expected \"max\" or a non-negative integer")]
    InvalidTargetVersion { target: String },

    /// The configured driver name is not one of the supported dialects
    #[error("db driver '{0}' not supported. Must be one of: sqlite3 or pg")]
    UnsupportedDriver(String),

    /// The configured driver does not match the connection pool handed in
    #[error("driver '{driver}' cannot run on a {pool} connection pool")]
    DriverMismatch { driver: String, pool: String },

    /// The newline setting is not one of LF, CR or CRLF
    #[error("newline must be one of: LF, CR, CRLF (got '{0}')")]
    InvalidNewline(String),

    /// Reading or writing a migration file failed
    #[error("io error on {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The database driver rejected a query or script
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// The run was cancelled through its cancellation token
    #[error("migration run cancelled")]
    Cancelled,

    /// Invalid configuration value
    #[error("configuration error: {0}")]
    Configuration(String),
}

impl MigrateError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        MigrateError::Io {
            path: path.into(),
            source,
        }
    }
}

/// Failure of a migration run, with the migrations that did commit.
///
/// The database is left at the version of the last entry in `applied`
/// (or untouched when `applied` is empty). Nothing is rolled back.
#[derive(Debug, Error)]
#[error("{source} (after {} migration(s) completed)", .applied.len())]
pub struct RunError {
    /// Migrations that ran and were recorded before the failure, in run order
    pub applied: Vec<Migration>,
    /// The error that stopped the run
    #[source]
    pub source: MigrateError,
}

impl RunError {
    pub fn new(applied: Vec<Migration>, source: MigrateError) -> Self {
        Self { applied, source }
    }

    /// Version the database was left at, if any migration completed
    pub fn last_completed_version(&self) -> Option<i64> {
        self.applied.last().map(|m| m.version)
    }
}

impl From<MigrateError> for RunError {
    fn from(source: MigrateError) -> Self {
        RunError::new(Vec::new(), source)
    }
}

impl From<sqlx::Error> for RunError {
    fn from(err: sqlx::Error) -> Self {
        RunError::from(MigrateError::from(err))
    }
}
