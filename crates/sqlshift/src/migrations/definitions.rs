//! Migration Definitions - Core types shared by the loader, engine and scaffolder

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::Serialize;

use crate::error::{MigrateError, MigrateResult};

/// Direction a migration file moves the schema
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum Action {
    /// `do` script: moves the schema up to its version
    #[serde(rename = "do")]
    Apply,
    /// `undo` script: moves the schema back below its version
    #[serde(rename = "undo")]
    Revert,
}

impl Action {
    /// Map a filename segment to an action; anything but `do`/`undo` is not a migration
    pub fn from_segment(segment: &str) -> Option<Self> {
        match segment {
            "do" => Some(Action::Apply),
            "undo" => Some(Action::Revert),
            _ => None,
        }
    }

    /// The filename segment for this action
    pub fn as_segment(&self) -> &'static str {
        match self {
            Action::Apply => "do",
            Action::Revert => "undo",
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_segment())
    }
}

/// A single migration script on disk.
///
/// Built once per loader scan and never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Migration {
    pub version: i64,
    pub action: Action,
    /// Free-text label from the filename; may be empty
    pub name: String,
    pub path: PathBuf,
    /// Hex digest of the (optionally line-ending-normalized) file content
    pub checksum: String,
}

impl Migration {
    /// Read the SQL text of this migration
    pub fn sql(&self) -> MigrateResult<String> {
        std::fs::read_to_string(&self.path).map_err(|e| MigrateError::io(&self.path, e))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Version a migration run should end at
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Target {
    /// Highest version among the loaded migrations
    Max,
    /// An explicit version
    Version(i64),
}

impl FromStr for Target {
    type Err = MigrateError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let cleaned = s.trim();
        if cleaned.is_empty() || cleaned.eq_ignore_ascii_case("max") {
            return Ok(Target::Max);
        }
        let invalid = || MigrateError::InvalidTargetVersion {
            target: s.to_string(),
        };
        if !cleaned.bytes().all(|b| b.is_ascii_digit()) {
            return Err(invalid());
        }
        cleaned.parse::<i64>().map(Target::Version).map_err(|_| invalid())
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Target::Max => write!(f, "max"),
            Target::Version(v) => write!(f, "{}", v),
        }
    }
}

/// Sort migrations ascending by version, Apply before Revert on ties
pub fn sort_ascending(migrations: &mut [Migration]) {
    migrations.sort_by(|a, b| a.version.cmp(&b.version).then(a.action.cmp(&b.action)));
}

/// Sort migrations descending by version
pub fn sort_descending(migrations: &mut [Migration]) {
    migrations.sort_by(|a, b| b.version.cmp(&a.version).then(a.action.cmp(&b.action)));
}
