//! # sqlshift: Versioned SQL migrations
//!
//! Migrations are pairs of plain SQL files, `<version>.do.<name>.sql` and
//! `<version>.undo.<name>.sql`. The version a database sits at is kept in a
//! state table inside that database, together with a checksum of every
//! applied script so edits to already-applied files are caught.
//!
//! PostgreSQL and SQLite are supported through sqlx pools owned by the caller.
//!
//! ```no_run
//! use sqlshift::{CancellationToken, Config, Migrator};
//!
//! # async fn run(pool: sqlx::PgPool) -> Result<(), Box<dyn std::error::Error>> {
//! let config = Config::new("pg").with_migration_pattern("db/migrations/*.sql");
//! let mut migrator = Migrator::connect(config, pool)?;
//! let applied = migrator.migrate(&CancellationToken::new(), "max").await?;
//! println!("applied {} migration(s)", applied.len());
//! # Ok(())
//! # }
//! ```

pub mod backends;
pub mod config;
pub mod error;
pub mod migrations;

pub use backends::{Client, DatabasePool, Dialect, DialectKind, Row, SqlValue};
pub use config::{Config, LineEnding};
pub use error::{MigrateError, MigrateResult, RunError};
pub use migrations::{Action, Migration, Migrator, Target, VersionMode};

pub use tokio_util::sync::CancellationToken;
