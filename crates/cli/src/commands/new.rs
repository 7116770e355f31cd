use anyhow::Result;
use sqlshift::migrations::create_migration;
use sqlshift::VersionMode;

use crate::config::Settings;

/// Scaffold a do/undo pair; needs no database connection
pub fn create(settings: &Settings, description: &str, mode: &str) -> Result<()> {
    let (do_path, undo_path) =
        create_migration(&settings.config, description, VersionMode::from_name(mode))?;

    println!("Created {}", do_path.display());
    println!("Created {}", undo_path.display());
    Ok(())
}
