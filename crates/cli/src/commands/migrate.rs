use anyhow::Result;
use sqlshift::{CancellationToken, Migration, RunError};

use super::{open_migrator, print_migrations};
use crate::config::Settings;

/// Migrate to `target` ("max" or a version)
pub async fn run(settings: &Settings, cancel: &CancellationToken, target: &str) -> Result<()> {
    let mut migrator = open_migrator(settings).await?;
    println!("Migrating to version {}...", target);
    report("Applied", migrator.migrate(cancel, target).await)
}

/// Revert the latest `steps` migrations
pub async fn down(settings: &Settings, cancel: &CancellationToken, steps: u32) -> Result<()> {
    let mut migrator = open_migrator(settings).await?;
    println!("Reverting {} step(s)...", steps);
    report("Reverted", migrator.down(cancel, steps).await)
}

// Completed migrations are printed even when the run failed part-way.
fn report(heading: &str, result: Result<Vec<Migration>, RunError>) -> Result<()> {
    match result {
        Ok(done) => {
            print_migrations(heading, &done);
            Ok(())
        }
        Err(err) => {
            if !err.applied.is_empty() {
                print_migrations(heading, &err.applied);
            }
            Err(err.into())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{resolve, FileConfig, GlobalArgs};
    use std::fs;
    use tempfile::TempDir;

    fn sqlite_settings(dir: &TempDir) -> Settings {
        let args = GlobalArgs {
            driver: Some("sqlite3".into()),
            conn: Some(format!("sqlite://{}", dir.path().join("app.db").display())),
            migration_pattern: Some(format!("{}/*.sql", dir.path().display())),
            ..Default::default()
        };
        resolve(&args, FileConfig::default(), |_| None).unwrap()
    }

    #[tokio::test]
    async fn migrates_and_reverts_sqlite_file() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("001.do.items.sql"), "CREATE TABLE items (id INTEGER);").unwrap();
        fs::write(dir.path().join("001.undo.items.sql"), "DROP TABLE items;").unwrap();
        fs::write(dir.path().join("002.do.tags.sql"), "CREATE TABLE tags (id INTEGER);").unwrap();
        fs::write(dir.path().join("002.undo.tags.sql"), "DROP TABLE tags;").unwrap();

        let settings = sqlite_settings(&dir);
        let cancel = CancellationToken::new();

        run(&settings, &cancel, "max").await.unwrap();
        let migrator = open_migrator(&settings).await.unwrap();
        assert_eq!(migrator.database_version(&cancel).await.unwrap(), 2);

        down(&settings, &cancel, 1).await.unwrap();
        assert_eq!(migrator.database_version(&cancel).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn failed_run_is_an_error() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("001.do.bad.sql"), "CREATE TABLEX nope;").unwrap();

        let settings = sqlite_settings(&dir);
        let err = run(&settings, &CancellationToken::new(), "max").await.unwrap_err();
        assert!(err.downcast_ref::<RunError>().is_some());
    }
}
