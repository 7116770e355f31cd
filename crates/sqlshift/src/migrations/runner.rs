//! Migration Runner - Moves the database between versions
//!
//! [`Migrator`] resolves which scripts lie between the current database
//! version and a target, checks the checksums of already-applied scripts,
//! and executes the resolved list one script at a time. Each script and its
//! state-table record commit independently; a failure leaves the database at
//! the last script that completed.

use std::future::Future;
use std::path::PathBuf;
use std::time::Instant;

use tokio_util::sync::CancellationToken;

use super::definitions::{sort_ascending, sort_descending, Action, Migration, Target};
use super::loader::load_migrations;
use super::scaffold::{create_migration, VersionMode};
use crate::backends::{self, Client, DatabasePool, DialectKind, Row, SqlValue};
use crate::config::Config;
use crate::error::{MigrateError, MigrateResult, RunError};

/// Race `fut` against the cancellation token
async fn cancellable<T, F>(cancel: &CancellationToken, fut: F) -> MigrateResult<T>
where
    F: Future<Output = MigrateResult<T>>,
{
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(MigrateError::Cancelled),
        res = fut => res,
    }
}

/// Migration engine bound to one database
pub struct Migrator {
    config: Config,
    client: Box<dyn Client>,
    migrations: Option<Vec<Migration>>,
}

impl Migrator {
    /// Create an engine around an existing client
    pub fn new(config: Config, client: Box<dyn Client>) -> MigrateResult<Self> {
        config.validate()?;
        let kind: DialectKind = config.driver.parse()?;
        let client_kind = client.dialect().kind();
        if kind != client_kind {
            return Err(MigrateError::DriverMismatch {
                driver: config.driver.clone(),
                pool: client_kind.to_string(),
            });
        }

        Ok(Self {
            config,
            client,
            migrations: None,
        })
    }

    /// Create an engine over a caller-owned pool, picking the dialect from `config.driver`
    pub fn connect(config: Config, pool: impl Into<DatabasePool>) -> MigrateResult<Self> {
        config.validate()?;
        let client = backends::connect(&config, pool.into())?;
        Ok(Self {
            config,
            client,
            migrations: None,
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn client(&self) -> &dyn Client {
        self.client.as_ref()
    }

    /// Migrations from the last load, if any load happened yet
    pub fn migrations(&self) -> &[Migration] {
        self.migrations.as_deref().unwrap_or_default()
    }

    /// Reload migrations from disk, replacing any previously loaded set
    pub fn get_migrations(&mut self) -> MigrateResult<&[Migration]> {
        let migrations = load_migrations(&self.config.migration_pattern, self.config.newline)?;
        let migrations = self.migrations.insert(migrations);
        Ok(migrations.as_slice())
    }

    fn loaded_migrations(&mut self) -> MigrateResult<&[Migration]> {
        if self.migrations.is_none() {
            return self.get_migrations();
        }
        Ok(self.migrations())
    }

    /// Highest version among the loaded migrations, loading them on first use
    pub fn max_version(&mut self) -> MigrateResult<i64> {
        Ok(self
            .loaded_migrations()?
            .iter()
            .map(|m| m.version)
            .max()
            .unwrap_or(0))
    }

    /// Current version recorded in the state table; 0 when there is no table yet
    pub async fn database_version(&self, cancel: &CancellationToken) -> MigrateResult<i64> {
        if !cancellable(cancel, self.client.state_table_exists()).await? {
            return Ok(0);
        }

        let sql = self.client.dialect().current_version_query();
        let rows = cancellable(cancel, self.client.execute_query(&sql)).await?;

        Ok(rows
            .first()
            .and_then(|row| row.get_index(0))
            .and_then(SqlValue::as_i64)
            .unwrap_or(0))
    }

    /// Compare stored checksums of applied migrations with the files on disk.
    ///
    /// Migrations are reloaded first, so the comparison always uses the
    /// current file contents. Rows without a stored checksum are accepted.
    pub async fn validate_migrations(
        &mut self,
        cancel: &CancellationToken,
        database_version: i64,
    ) -> MigrateResult<()> {
        let applied: Vec<Migration> = self
            .get_migrations()?
            .iter()
            .filter(|m| m.action == Action::Apply && m.version > 0 && m.version <= database_version)
            .cloned()
            .collect();

        for migration in &applied {
            let sql = self.client.dialect().checksum_query(migration.version);
            let rows = cancellable(cancel, self.client.execute_query(&sql)).await?;

            let stored = rows
                .first()
                .and_then(|row| row.get("checksum"))
                .and_then(SqlValue::as_str)
                .filter(|sum| !sum.is_empty());

            if let Some(stored) = stored {
                if stored != migration.checksum {
                    return Err(MigrateError::ChecksumMismatch {
                        version: migration.version,
                    });
                }
            }
        }

        Ok(())
    }

    /// Scripts that move the database from `database_version` to `target_version`, in run order
    pub fn runnable_migrations(&self, database_version: i64, target_version: i64) -> Vec<Migration> {
        if target_version > database_version {
            let mut runnable: Vec<_> = self
                .migrations()
                .iter()
                .filter(|m| {
                    m.action == Action::Apply
                        && m.version > database_version
                        && m.version <= target_version
                })
                .cloned()
                .collect();
            sort_ascending(&mut runnable);
            runnable
        } else if target_version < database_version {
            let mut runnable: Vec<_> = self
                .migrations()
                .iter()
                .filter(|m| {
                    m.action == Action::Revert
                        && m.version > target_version
                        && m.version <= database_version
                })
                .cloned()
                .collect();
            sort_descending(&mut runnable);
            runnable
        } else {
            Vec::new()
        }
    }

    /// Execute `migrations` in order, recording each one in the state table.
    ///
    /// Stops at the first failure; the error carries every migration that completed.
    /// Cancellation is checked between migrations only: a script that has started
    /// always runs to completion and is recorded.
    pub async fn run_migrations(
        &self,
        cancel: &CancellationToken,
        migrations: Vec<Migration>,
    ) -> Result<Vec<Migration>, RunError> {
        let mut applied = Vec::with_capacity(migrations.len());

        for migration in migrations {
            if cancel.is_cancelled() {
                return Err(RunError::new(applied, MigrateError::Cancelled));
            }

            let start_time = Instant::now();
            if let Err(e) = self.run_one(&migration).await {
                return Err(RunError::new(applied, e));
            }

            tracing::info!(
                version = migration.version,
                action = %migration.action,
                name = %migration.name,
                elapsed_ms = start_time.elapsed().as_millis() as u64,
                "{} migration",
                match migration.action {
                    Action::Apply => "applied",
                    Action::Revert => "reverted",
                }
            );
            applied.push(migration);
        }

        Ok(applied)
    }

    async fn run_one(&self, migration: &Migration) -> MigrateResult<()> {
        let sql = migration.sql()?;
        // Dropping an in-flight driver call does not stop the statement, so the
        // script and its record are never raced against the token.
        self.client.execute_script(&sql).await?;

        let persist = self.client.dialect().persist_query(migration);
        self.client.execute_script(&persist).await
    }

    /// Move the database to `target`: `"max"`, empty, or a version number
    pub async fn migrate(
        &mut self,
        cancel: &CancellationToken,
        target: &str,
    ) -> Result<Vec<Migration>, RunError> {
        let target: Target = target.parse()?;
        self.migrate_to(cancel, target).await
    }

    /// Move the database to an already-parsed target
    pub async fn migrate_to(
        &mut self,
        cancel: &CancellationToken,
        target: Target,
    ) -> Result<Vec<Migration>, RunError> {
        cancellable(cancel, self.client.ensure_state_table()).await?;
        self.get_migrations()?;

        let target_version = match target {
            Target::Max => self.max_version()?,
            Target::Version(version) => version,
        };
        let database_version = self.database_version(cancel).await?;
        tracing::debug!(database_version, target_version, "resolved migration target");

        if self.config.validate_checksums && target_version >= database_version {
            self.validate_migrations(cancel, database_version).await?;
        }

        let runnable = self.runnable_migrations(database_version, target_version);
        self.run_migrations(cancel, runnable).await
    }

    /// Revert the latest `steps` migrations, stopping at version 0
    pub async fn down(
        &mut self,
        cancel: &CancellationToken,
        steps: u32,
    ) -> Result<Vec<Migration>, RunError> {
        let current = self.database_version(cancel).await?;
        let target = current.saturating_sub(i64::from(steps)).max(0);
        self.migrate_to(cancel, Target::Version(target)).await
    }

    /// Scaffold a new do/undo pair next to the configured migrations
    pub fn create_migration(&self, description: &str, mode: VersionMode) -> MigrateResult<(PathBuf, PathBuf)> {
        create_migration(&self.config, description, mode)
    }

    /// Run arbitrary SQL through the bound client
    pub async fn execute_query(&self, cancel: &CancellationToken, sql: &str) -> MigrateResult<Vec<Row>> {
        cancellable(cancel, self.client.execute_query(sql)).await
    }
}
