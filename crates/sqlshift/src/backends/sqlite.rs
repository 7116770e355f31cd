//! SQLite Dialect

use async_trait::async_trait;
use sqlx::sqlite::{SqlitePool, SqliteRow};
use sqlx::{Column, Executor, Row as _, TypeInfo, ValueRef};

use super::core::{quote_literal, Client, Dialect, Row, SqlValue, StateColumn};
use super::DialectKind;
use crate::config::Config;
use crate::error::MigrateResult;

/// SQLite SQL generation; the table name is used as written
#[derive(Debug, Clone)]
pub struct SqliteDialect {
    table: String,
}

impl SqliteDialect {
    pub fn new(config: &Config) -> Self {
        Self {
            table: config.schema_table.clone(),
        }
    }
}

impl Dialect for SqliteDialect {
    fn kind(&self) -> DialectKind {
        DialectKind::Sqlite
    }

    fn table_name(&self) -> &str {
        &self.table
    }

    fn quoted_table(&self) -> String {
        self.table.clone()
    }

    fn columns_query(&self) -> String {
        format!(
            "SELECT name AS column_name FROM pragma_table_info({})",
            quote_literal(&self.table)
        )
    }

    fn create_table_queries(&self) -> Vec<String> {
        vec![
            format!("CREATE TABLE {} (version INTEGER PRIMARY KEY)", self.table),
            format!("INSERT INTO {} (version) VALUES (0)", self.table),
        ]
    }

    fn add_column_query(&self, column: StateColumn) -> String {
        format!("ALTER TABLE {} ADD COLUMN {} TEXT", self.table, column.name())
    }
}

/// SQLite client over a caller-owned pool
#[derive(Debug, Clone)]
pub struct SqliteClient {
    dialect: SqliteDialect,
    pool: SqlitePool,
}

impl SqliteClient {
    pub fn new(config: &Config, pool: SqlitePool) -> Self {
        Self {
            dialect: SqliteDialect::new(config),
            pool,
        }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

#[async_trait]
impl Client for SqliteClient {
    fn dialect(&self) -> &dyn Dialect {
        &self.dialect
    }

    async fn execute_query(&self, sql: &str) -> MigrateResult<Vec<Row>> {
        let rows = sqlx::query(sql).fetch_all(&self.pool).await?;
        rows.iter().map(decode_row).collect()
    }

    async fn execute_script(&self, sql: &str) -> MigrateResult<()> {
        self.pool.execute(sql).await?;
        Ok(())
    }
}

fn decode_row(row: &SqliteRow) -> MigrateResult<Row> {
    let columns = row
        .columns()
        .iter()
        .map(|c| c.name().to_string())
        .collect::<Vec<_>>();
    let values = (0..columns.len())
        .map(|index| decode_value(row, index))
        .collect::<MigrateResult<Vec<_>>>()?;

    Ok(Row::new(columns, values))
}

// SQLite is dynamically typed; the storage class of the value decides.
fn decode_value(row: &SqliteRow, index: usize) -> MigrateResult<SqlValue> {
    let raw = row.try_get_raw(index)?;
    if raw.is_null() {
        return Ok(SqlValue::Null);
    }
    let type_name = raw.type_info().name().to_ascii_uppercase();

    let value = match type_name.as_str() {
        "INTEGER" | "INT8" | "BIGINT" => SqlValue::Int(row.try_get_unchecked::<i64, _>(index)?),
        "BOOLEAN" => SqlValue::Bool(row.try_get_unchecked::<bool, _>(index)?),
        "REAL" => SqlValue::Float(row.try_get_unchecked::<f64, _>(index)?),
        "TEXT" => SqlValue::Text(row.try_get_unchecked::<String, _>(index)?),
        "BLOB" => SqlValue::Bytes(row.try_get_unchecked::<Vec<u8>, _>(index)?),
        other => SqlValue::Unsupported(other.to_string()),
    };
    Ok(value)
}
