use anyhow::Result;
use serde_json::json;
use sqlshift::migrations::sort_ascending;
use sqlshift::{CancellationToken, Migration};

use super::open_migrator;
use crate::config::Settings;

/// Print every migration file and mark the ones at the current database version.
///
/// Read-only: the state table is neither created nor repaired.
pub async fn run(settings: &Settings, cancel: &CancellationToken, as_json: bool) -> Result<()> {
    let mut migrator = open_migrator(settings).await?;
    let mut migrations = migrator.get_migrations()?.to_vec();
    sort_ascending(&mut migrations);
    let current = migrator.database_version(cancel).await?;

    if as_json {
        println!("{}", render_json(&migrations, current)?);
    } else {
        print!("{}", render_text(&migrations, current));
    }
    Ok(())
}

fn render_text(migrations: &[Migration], current: i64) -> String {
    if migrations.is_empty() {
        return "No migrations found\n".to_string();
    }

    let mut out = String::new();
    for m in migrations {
        let marker = if m.version == current { "  <== current" } else { "" };
        out.push_str(&format!(
            "{:>5} {:<4} {} ({}){}\n",
            m.version,
            m.action.to_string(),
            m.name,
            m.path.display(),
            marker
        ));
    }
    out
}

fn render_json(migrations: &[Migration], current: i64) -> Result<String> {
    let entries: Vec<_> = migrations
        .iter()
        .map(|m| {
            json!({
                "version": m.version,
                "action": m.action,
                "name": m.name,
                "path": m.path,
                "checksum": m.checksum,
                "current": m.version == current,
            })
        })
        .collect();
    Ok(serde_json::to_string_pretty(&entries)?)
}
