//! Migration Scaffolding - Creates new do/undo file pairs

use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::Utc;
use once_cell::sync::Lazy;
use regex::Regex;

use super::loader::{expand_pattern, pattern_base_dir};
use crate::config::Config;
use crate::error::{MigrateError, MigrateResult};

static NON_ALPHANUMERIC: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^a-z0-9]+").expect("valid regex"));

const DO_PLACEHOLDER: &str = "-- Write your migration SQL here\n";
const UNDO_PLACEHOLDER: &str = "-- Write your rollback SQL here\n";

/// How the version of a new migration is chosen
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum VersionMode {
    /// One more than the highest existing version, zero-padded to three digits
    #[default]
    Int,
    /// Current Unix time in seconds
    Timestamp,
}

impl VersionMode {
    /// `timestamp` (any case) selects timestamps; everything else is integer mode
    pub fn from_name(name: &str) -> Self {
        if name.trim().eq_ignore_ascii_case("timestamp") {
            VersionMode::Timestamp
        } else {
            VersionMode::Int
        }
    }
}

/// Lowercase `description` and collapse every non-alphanumeric run into one hyphen
pub fn slugify(description: &str) -> String {
    let lowered = description.trim().to_lowercase();
    NON_ALPHANUMERIC
        .replace_all(&lowered, "-")
        .trim_matches('-')
        .to_string()
}

/// Version string the next migration should use
pub fn next_version(config: &Config, mode: VersionMode) -> MigrateResult<String> {
    match mode {
        VersionMode::Timestamp => Ok(Utc::now().timestamp().to_string()),
        VersionMode::Int => {
            let highest = expand_pattern(&config.migration_pattern)?
                .iter()
                .filter_map(|path| leading_version(path))
                .max()
                .unwrap_or(0);
            Ok(format!("{:03}", highest + 1))
        }
    }
}

fn leading_version(path: &Path) -> Option<i64> {
    let file_name = path.file_name()?.to_str()?;
    let prefix = file_name.split('.').next()?;
    if prefix.is_empty() || !prefix.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    prefix.parse().ok()
}

/// Write `{version}.do.{slug}.sql` and `{version}.undo.{slug}.sql` into the migrations folder.
///
/// Neither file may exist already. Returns the do and undo paths.
pub fn create_migration(
    config: &Config,
    description: &str,
    mode: VersionMode,
) -> MigrateResult<(PathBuf, PathBuf)> {
    let version = next_version(config, mode)?;
    let slug = slugify(description);
    let folder = pattern_base_dir(&config.migration_pattern);

    let do_path = folder.join(format!("{}.do.{}.sql", version, slug));
    let undo_path = folder.join(format!("{}.undo.{}.sql", version, slug));

    write_new(&do_path, DO_PLACEHOLDER)?;
    write_new(&undo_path, UNDO_PLACEHOLDER)?;

    tracing::info!(
        version = %version,
        do_path = %do_path.display(),
        undo_path = %undo_path.display(),
        "created migration"
    );
    Ok((do_path, undo_path))
}

fn write_new(path: &Path, content: &str) -> MigrateResult<()> {
    let mut file = OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(path)
        .map_err(|e| MigrateError::io(path, e))?;
    file.write_all(content.as_bytes())
        .map_err(|e| MigrateError::io(path, e))
}
