use anyhow::Result;
use sqlshift::CancellationToken;

use super::open_migrator;
use crate::config::Settings;

/// Drop the state table; the migrated schema itself is left alone
pub async fn drop(settings: &Settings, cancel: &CancellationToken) -> Result<()> {
    let migrator = open_migrator(settings).await?;
    let sql = format!("DROP TABLE {}", migrator.client().dialect().quoted_table());

    println!("Dropping state table {}...", settings.config.schema_table);
    migrator.execute_query(cancel, &sql).await?;
    println!("State table dropped.");
    Ok(())
}
