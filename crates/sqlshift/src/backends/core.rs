//! Core Dialect Traits
//!
//! This module defines the dialect abstraction the migration engine runs
//! against. A [`Dialect`] only produces SQL text; a [`Client`] pairs a
//! dialect with a live connection pool and executes that text.

use std::fmt;

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};

use super::DialectKind;
use crate::error::MigrateResult;
use crate::migrations::{Action, Migration};

/// Dialect-neutral value decoded from a result row
#[derive(Debug, Clone, PartialEq)]
pub enum SqlValue {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    Bytes(Vec<u8>),
    Timestamp(DateTime<Utc>),
    /// A value of a type this crate does not decode; carries the type name
    Unsupported(String),
}

impl SqlValue {
    pub fn is_null(&self) -> bool {
        matches!(self, SqlValue::Null)
    }

    /// Integer view of the value; integral text is accepted as well
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            SqlValue::Int(v) => Some(*v),
            SqlValue::Text(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            SqlValue::Text(s) => Some(s),
            _ => None,
        }
    }
}

impl fmt::Display for SqlValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SqlValue::Null => write!(f, "NULL"),
            SqlValue::Bool(v) => write!(f, "{}", v),
            SqlValue::Int(v) => write!(f, "{}", v),
            SqlValue::Float(v) => write!(f, "{}", v),
            SqlValue::Text(v) => write!(f, "{}", v),
            SqlValue::Bytes(v) => write!(f, "\\x{}", hex::encode(v)),
            SqlValue::Timestamp(v) => write!(f, "{}", v.to_rfc3339()),
            SqlValue::Unsupported(type_name) => write!(f, "<{}>", type_name),
        }
    }
}

/// A single result row with its column names
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Row {
    pub columns: Vec<String>,
    pub values: Vec<SqlValue>,
}

impl Row {
    pub fn new(columns: Vec<String>, values: Vec<SqlValue>) -> Self {
        Self { columns, values }
    }

    /// Value of the named column, matched case-insensitively
    pub fn get(&self, column: &str) -> Option<&SqlValue> {
        self.columns
            .iter()
            .position(|c| c.eq_ignore_ascii_case(column))
            .and_then(|i| self.values.get(i))
    }

    pub fn get_index(&self, index: usize) -> Option<&SqlValue> {
        self.values.get(index)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Auxiliary state-table columns added on top of `version`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StateColumn {
    Name,
    Checksum,
    AppliedAt,
}

impl StateColumn {
    pub const ALL: [StateColumn; 3] = [StateColumn::Name, StateColumn::Checksum, StateColumn::AppliedAt];

    pub fn name(&self) -> &'static str {
        match self {
            StateColumn::Name => "name",
            StateColumn::Checksum => "checksum",
            StateColumn::AppliedAt => "applied_at",
        }
    }
}

/// Quote a string literal by doubling embedded single quotes
pub fn quote_literal(value: &str) -> String {
    format!("'{}'", value.replace('\'', "''"))
}

/// SQL text generation for one database dialect
pub trait Dialect: Send + Sync {
    fn kind(&self) -> DialectKind;

    /// State table name exactly as configured
    fn table_name(&self) -> &str;

    /// State table name ready to splice into SQL
    fn quoted_table(&self) -> String;

    /// Query returning one `column_name` row per existing state-table column
    fn columns_query(&self) -> String;

    /// Statements creating the bare state table and its sentinel row
    fn create_table_queries(&self) -> Vec<String>;

    fn add_column_query(&self, column: StateColumn) -> String;

    /// Session setup run before each query or script, if any
    fn session_query(&self) -> Option<String> {
        None
    }

    fn current_version_query(&self) -> String {
        format!("SELECT MAX(version) AS version FROM {}", self.quoted_table())
    }

    fn checksum_query(&self, version: i64) -> String {
        format!(
            "SELECT checksum FROM {} WHERE version = {}",
            self.quoted_table(),
            version
        )
    }

    /// Record an applied migration, or forget a reverted one
    fn persist_query(&self, migration: &Migration) -> String {
        match migration.action {
            Action::Apply => format!(
                "INSERT INTO {} (version, name, checksum, applied_at) VALUES ({}, {}, {}, {})",
                self.quoted_table(),
                migration.version,
                quote_literal(&migration.name),
                quote_literal(&migration.checksum),
                quote_literal(&Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true)),
            ),
            Action::Revert => format!(
                "DELETE FROM {} WHERE version = {}",
                self.quoted_table(),
                migration.version
            ),
        }
    }
}

/// A dialect bound to a live connection pool
#[async_trait]
pub trait Client: Send + Sync {
    fn dialect(&self) -> &dyn Dialect;

    /// Run a read query and decode every row
    async fn execute_query(&self, sql: &str) -> MigrateResult<Vec<Row>>;

    /// Run a script of one or more statements as a single driver call
    async fn execute_script(&self, sql: &str) -> MigrateResult<()>;

    async fn state_table_exists(&self) -> MigrateResult<bool> {
        state_table_exists(self).await
    }

    async fn ensure_state_table(&self) -> MigrateResult<()> {
        ensure_state_table(self).await
    }
}

/// Names of the columns the state table currently has
pub async fn state_table_columns<C: Client + ?Sized>(client: &C) -> MigrateResult<Vec<String>> {
    let rows = client
        .execute_query(&client.dialect().columns_query())
        .await?;

    Ok(rows
        .iter()
        .filter_map(|row| row.get("column_name").or_else(|| row.get_index(0)))
        .filter_map(|value| value.as_str().map(str::to_string))
        .collect())
}

pub async fn state_table_exists<C: Client + ?Sized>(client: &C) -> MigrateResult<bool> {
    Ok(!state_table_columns(client).await?.is_empty())
}

/// Create the state table if it is missing and add any missing auxiliary column.
///
/// Only ever adds; existing columns and rows are left untouched.
pub async fn ensure_state_table<C: Client + ?Sized>(client: &C) -> MigrateResult<()> {
    let dialect = client.dialect();
    let columns = state_table_columns(client).await?;

    if columns.is_empty() {
        tracing::debug!(table = dialect.table_name(), "creating state table");
        for sql in dialect.create_table_queries() {
            client.execute_script(&sql).await?;
        }
    }

    for column in StateColumn::ALL {
        if columns.iter().any(|c| c.eq_ignore_ascii_case(column.name())) {
            continue;
        }
        let sql = dialect.add_column_query(column);
        tracing::debug!(table = dialect.table_name(), sql = %sql, "adding state table column");
        client.execute_script(&sql).await?;
    }

    Ok(())
}
