//! Migration configuration
//!
//! An immutable value handed to the engine at construction. It deserializes
//! from the camelCase JSON the CLI reads, but the library itself never
//! touches config files.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::MigrateError;

/// Default name of the state table
pub const DEFAULT_SCHEMA_TABLE: &str = "schemaversion";

/// Default glob used to find migration files
pub const DEFAULT_MIGRATION_PATTERN: &str = "migrations/*.sql";

/// Line terminator that migration content is normalized to before hashing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineEnding {
    Lf,
    Cr,
    CrLf,
}

impl LineEnding {
    /// The terminator this mode rewrites every line break to
    pub fn terminator(&self) -> &'static str {
        match self {
            LineEnding::Lf => "\n",
            LineEnding::Cr => "\r",
            LineEnding::CrLf => "\r\n",
        }
    }
}

impl fmt::Display for LineEnding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LineEnding::Lf => write!(f, "LF"),
            LineEnding::Cr => write!(f, "CR"),
            LineEnding::CrLf => write!(f, "CRLF"),
        }
    }
}

impl FromStr for LineEnding {
    type Err = MigrateError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "LF" => Ok(LineEnding::Lf),
            "CR" => Ok(LineEnding::Cr),
            "CRLF" => Ok(LineEnding::CrLf),
            other => Err(MigrateError::InvalidNewline(other.to_string())),
        }
    }
}

impl Serialize for LineEnding {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for LineEnding {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

/// Configuration for the migration engine
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    /// Dialect selector: "pg" or "sqlite3"
    pub driver: String,
    /// State table name, optionally schema-qualified as `schema.table`
    #[serde(default = "default_schema_table")]
    pub schema_table: String,
    /// Glob pattern locating migration files
    #[serde(default = "default_migration_pattern")]
    pub migration_pattern: String,
    /// Line-ending normalization applied before checksumming; `None` hashes raw bytes
    #[serde(default)]
    pub newline: Option<LineEnding>,
    /// Compare stored checksums of applied migrations before migrating up
    #[serde(default = "default_validate_checksums")]
    pub validate_checksums: bool,
    /// Catalog filter for server-dialect introspection
    #[serde(default)]
    pub database: Option<String>,
    /// Search path applied to server-dialect sessions
    #[serde(default)]
    pub current_schema: Option<String>,
}

fn default_schema_table() -> String {
    DEFAULT_SCHEMA_TABLE.to_string()
}

fn default_migration_pattern() -> String {
    DEFAULT_MIGRATION_PATTERN.to_string()
}

fn default_validate_checksums() -> bool {
    true
}

impl Default for Config {
    fn default() -> Self {
        Self::new("pg")
    }
}

impl Config {
    /// Create a configuration for the given driver with default settings
    pub fn new(driver: impl Into<String>) -> Self {
        Self {
            driver: driver.into(),
            schema_table: default_schema_table(),
            migration_pattern: default_migration_pattern(),
            newline: None,
            validate_checksums: true,
            database: None,
            current_schema: None,
        }
    }

    pub fn with_schema_table(mut self, table: impl Into<String>) -> Self {
        self.schema_table = table.into();
        self
    }

    pub fn with_migration_pattern(mut self, pattern: impl Into<String>) -> Self {
        self.migration_pattern = pattern.into();
        self
    }

    pub fn with_newline(mut self, newline: Option<LineEnding>) -> Self {
        self.newline = newline;
        self
    }

    pub fn with_validate_checksums(mut self, validate: bool) -> Self {
        self.validate_checksums = validate;
        self
    }

    pub fn with_database(mut self, database: impl Into<String>) -> Self {
        self.database = Some(database.into());
        self
    }

    pub fn with_current_schema(mut self, schema: impl Into<String>) -> Self {
        self.current_schema = Some(schema.into());
        self
    }

    /// Reject values no dialect can work with
    pub fn validate(&self) -> Result<(), MigrateError> {
        if self.schema_table.trim().is_empty() {
            return Err(MigrateError::Configuration(
                "schema table name cannot be empty".to_string(),
            ));
        }
        if self.schema_table.split('.').any(|part| part.is_empty()) {
            return Err(MigrateError::Configuration(format!(
                "schema table '{}' has an empty identifier segment",
                self.schema_table
            )));
        }
        if self.migration_pattern.trim().is_empty() {
            return Err(MigrateError::Configuration(
                "migration pattern cannot be empty".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_fill_missing_keys() {
        let config: Config = serde_json::from_str(r#"{ "driver": "sqlite3" }"#).unwrap();
        assert_eq!(config.driver, "sqlite3");
        assert_eq!(config.schema_table, DEFAULT_SCHEMA_TABLE);
        assert_eq!(config.migration_pattern, DEFAULT_MIGRATION_PATTERN);
        assert!(config.validate_checksums);
        assert_eq!(config.newline, None);
    }

    #[test]
    fn camel_case_keys_and_newline() {
        let config: Config = serde_json::from_str(
            r#"{
                "driver": "pg",
                "schemaTable": "app.versions",
                "migrationPattern": "sql/*.sql",
                "newline": "CRLF",
                "validateChecksums": false,
                "currentSchema": "app"
            }"#,
        )
        .unwrap();
        assert_eq!(config.schema_table, "app.versions");
        assert_eq!(config.migration_pattern, "sql/*.sql");
        assert_eq!(config.newline, Some(LineEnding::CrLf));
        assert!(!config.validate_checksums);
        assert_eq!(config.current_schema.as_deref(), Some("app"));
    }

    #[test]
    fn unknown_newline_is_rejected() {
        let result: Result<Config, _> =
            serde_json::from_str(r#"{ "driver": "pg", "newline": "LFCR" }"#);
        assert!(result.is_err());
        assert!(matches!(
            "crlf".parse::<LineEnding>(),
            Err(MigrateError::InvalidNewline(_))
        ));
    }

    #[test]
    fn validate_rejects_empty_segments() {
        assert!(Config::new("pg").validate().is_ok());
        assert!(Config::new("pg").with_schema_table("").validate().is_err());
        assert!(Config::new("pg").with_schema_table("app.").validate().is_err());
        assert!(Config::new("pg").with_migration_pattern(" ").validate().is_err());
    }
}
