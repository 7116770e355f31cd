pub mod list;
pub mod migrate;
pub mod new;
pub mod schema;

use std::str::FromStr;

use anyhow::{Context, Result};
use sqlshift::{DatabasePool, DialectKind, Migration, Migrator};
use sqlx::postgres::PgPoolOptions;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};

use crate::config::Settings;

/// Open a single-connection pool for the configured dialect
pub async fn open_pool(settings: &Settings) -> Result<DatabasePool> {
    let conn = settings.connection_string()?;
    let pool: DatabasePool = match settings.kind {
        DialectKind::Postgres => PgPoolOptions::new()
            .max_connections(1)
            .connect(conn)
            .await
            .context("failed to connect to PostgreSQL")?
            .into(),
        DialectKind::Sqlite => {
            let options = SqliteConnectOptions::from_str(conn)
                .with_context(|| format!("invalid SQLite connection string '{}'", conn))?
                .create_if_missing(true);
            SqlitePoolOptions::new()
                .max_connections(1)
                .connect_with(options)
                .await
                .context("failed to open SQLite database")?
                .into()
        }
    };
    Ok(pool)
}

pub async fn open_migrator(settings: &Settings) -> Result<Migrator> {
    let pool = open_pool(settings).await?;
    Ok(Migrator::connect(settings.config.clone(), pool)?)
}

/// One line per migration: `[version] do|undo name (path)`
pub fn print_migrations(heading: &str, migrations: &[Migration]) {
    println!("{} {} migration(s)", heading, migrations.len());
    for m in migrations {
        println!("  [{}] {} {} ({})", m.version, m.action, m.name, m.path.display());
    }
}
