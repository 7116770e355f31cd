//! Migration System
//!
//! Loading migration files from disk, resolving and running them against a
//! database, and scaffolding new ones.

pub mod definitions;
pub mod loader;
pub mod runner;
pub mod scaffold;

pub use definitions::{sort_ascending, sort_descending, Action, Migration, Target};
pub use loader::{checksum, expand_pattern, load_migrations, normalize_line_endings, pattern_base_dir};
pub use runner::Migrator;
pub use scaffold::{create_migration, slugify, VersionMode};
