//! Migration Loader - Discovers migration files and parses their names
//!
//! Files are named `<version>.<do|undo>[.<name>].sql`. Anything else matched
//! by the glob is skipped without error.

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use once_cell::sync::Lazy;
use regex::Regex;
use sha2::{Digest, Sha256};

use super::definitions::{Action, Migration};
use crate::config::LineEnding;
use crate::error::{MigrateError, MigrateResult};

static LINE_BREAK: Lazy<Regex> = Lazy::new(|| Regex::new(r"\r\n|\r|\n").expect("valid regex"));

const GLOB_META: &[char] = &['*', '?', '[', '{'];

/// Load every migration matched by `pattern`.
///
/// Fails on the first (version, action) pair seen twice. The returned order
/// is the lexicographic order of the matched paths; callers sort as needed.
pub fn load_migrations(pattern: &str, newline: Option<LineEnding>) -> MigrateResult<Vec<Migration>> {
    let mut migrations = Vec::new();
    let mut seen = HashSet::new();

    for path in expand_pattern(pattern)? {
        if path.extension().and_then(|ext| ext.to_str()) != Some("sql") {
            continue;
        }
        let Some((version, action, name)) = parse_file_name(&path) else {
            continue;
        };

        if !seen.insert((version, action)) {
            return Err(MigrateError::DuplicateMigration { version, action });
        }

        // Non-UTF-8 files are rejected here rather than hashed lossily.
        let content = fs::read_to_string(&path).map_err(|e| MigrateError::io(&path, e))?;
        let checksum = checksum(&content, newline);

        migrations.push(Migration {
            version,
            action,
            name,
            path,
            checksum,
        });
    }

    tracing::debug!(pattern, count = migrations.len(), "loaded migrations");
    Ok(migrations)
}

/// Parse `<version>.<do|undo>[.<name>].sql` into its parts
pub fn parse_file_name(path: &Path) -> Option<(i64, Action, String)> {
    let stem = path.file_stem()?.to_str()?;
    let mut parts = stem.split('.');

    let version_part = parts.next()?;
    if version_part.is_empty() || !version_part.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let version = version_part.parse::<i64>().ok()?;
    let action = Action::from_segment(parts.next()?)?;
    let name = parts.collect::<Vec<_>>().join(".");

    Some((version, action, name))
}

/// Rewrite every line break in `content` to the terminator of `newline`
pub fn normalize_line_endings(content: &str, newline: LineEnding) -> String {
    LINE_BREAK
        .replace_all(content, newline.terminator())
        .into_owned()
}

/// Hex-encoded SHA-256 of `content`, normalized first when a newline mode is set
pub fn checksum(content: &str, newline: Option<LineEnding>) -> String {
    let digest = match newline {
        Some(mode) => Sha256::digest(normalize_line_endings(content, mode).as_bytes()),
        None => Sha256::digest(content.as_bytes()),
    };
    hex::encode(digest)
}

/// Directory part of `pattern` that precedes the first wildcard component
pub fn pattern_base_dir(pattern: &str) -> PathBuf {
    let (base, rest) = split_pattern(pattern);
    let base = if rest.is_empty() {
        // No wildcard at all: the pattern names a file, its parent is the folder.
        Path::new(&base)
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_default()
    } else {
        PathBuf::from(base)
    };
    if base.as_os_str().is_empty() {
        PathBuf::from(".")
    } else {
        base
    }
}

/// Expand a glob pattern into the sorted list of files it matches.
///
/// The literal directory prefix is walked and each relative path is matched
/// against the remaining components. A missing base directory matches nothing.
pub fn expand_pattern(pattern: &str) -> MigrateResult<Vec<PathBuf>> {
    let (base, rest) = split_pattern(pattern);

    if rest.is_empty() {
        let path = PathBuf::from(&base);
        return Ok(if path.is_file() { vec![path] } else { Vec::new() });
    }

    let root = if base.is_empty() {
        PathBuf::from(".")
    } else {
        PathBuf::from(&base)
    };
    if !root.is_dir() {
        return Ok(Vec::new());
    }

    let max_depth = if rest.contains("**") {
        usize::MAX
    } else {
        rest.split('/').count()
    };

    let mut matches = Vec::new();
    walk(&root, "", 1, max_depth, &rest, &mut matches)?;
    matches.sort();
    Ok(matches)
}

fn split_pattern(pattern: &str) -> (String, String) {
    let normalized = pattern.replace('\\', "/");
    let components: Vec<&str> = normalized.split('/').collect();
    let first_glob = components
        .iter()
        .position(|c| c.contains(GLOB_META))
        .unwrap_or(components.len());

    (
        components[..first_glob].join("/"),
        components[first_glob..].join("/"),
    )
}

fn walk(
    dir: &Path,
    relative: &str,
    depth: usize,
    max_depth: usize,
    glob: &str,
    matches: &mut Vec<PathBuf>,
) -> MigrateResult<()> {
    let entries = fs::read_dir(dir).map_err(|e| MigrateError::io(dir, e))?;

    for entry in entries {
        let entry = entry.map_err(|e| MigrateError::io(dir, e))?;
        let path = entry.path();
        let file_name = entry.file_name();
        let Some(file_name) = file_name.to_str() else {
            continue;
        };
        let candidate = if relative.is_empty() {
            file_name.to_string()
        } else {
            format!("{}/{}", relative, file_name)
        };

        if path.is_dir() {
            if depth < max_depth {
                walk(&path, &candidate, depth + 1, max_depth, glob, matches)?;
            }
        } else if glob_match::glob_match(glob, &candidate) {
            matches.push(path);
        }
    }

    Ok(())
}
