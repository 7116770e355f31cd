//! PostgreSQL Dialect
//!
//! State table names may be schema-qualified (`schema.table`). Each segment is
//! double-quoted, and the schema is created on demand together with the table.

use async_trait::async_trait;
use sqlx::postgres::{PgPool, PgRow};
use sqlx::{Column, Executor, Row as _, TypeInfo, ValueRef};

use super::core::{quote_literal, Client, Dialect, Row, SqlValue, StateColumn};
use super::DialectKind;
use crate::config::Config;
use crate::error::MigrateResult;

/// PostgreSQL SQL generation
#[derive(Debug, Clone)]
pub struct PostgresDialect {
    table: String,
    database: Option<String>,
    current_schema: Option<String>,
}

impl PostgresDialect {
    pub fn new(config: &Config) -> Self {
        Self {
            table: config.schema_table.clone(),
            database: config.database.clone(),
            current_schema: config.current_schema.clone(),
        }
    }

    /// Split `schema.table` into its schema qualifier and bare table name
    fn split_table(&self) -> (Option<&str>, &str) {
        match self.table.rsplit_once('.') {
            Some((schema, table)) => (Some(schema), table),
            None => (None, self.table.as_str()),
        }
    }
}

fn quote_identifier(identifier: &str) -> String {
    format!("\"{}\"", identifier.replace('"', "\"\""))
}

impl Dialect for PostgresDialect {
    fn kind(&self) -> DialectKind {
        DialectKind::Postgres
    }

    fn table_name(&self) -> &str {
        &self.table
    }

    fn quoted_table(&self) -> String {
        self.table
            .split('.')
            .map(quote_identifier)
            .collect::<Vec<_>>()
            .join(".")
    }

    fn columns_query(&self) -> String {
        let (schema, table) = self.split_table();

        let mut sql = format!(
            "SELECT column_name::text AS column_name FROM information_schema.columns WHERE table_name = {}",
            quote_literal(table)
        );
        if let Some(database) = &self.database {
            sql.push_str(&format!(" AND table_catalog = {}", quote_literal(database)));
        }
        match schema.or(self.current_schema.as_deref()) {
            Some(schema) => sql.push_str(&format!(" AND table_schema = {}", quote_literal(schema))),
            None => sql.push_str(" AND table_schema = current_schema()"),
        }
        sql
    }

    fn create_table_queries(&self) -> Vec<String> {
        let mut queries = Vec::new();
        if let (Some(schema), _) = self.split_table() {
            queries.push(format!(
                "CREATE SCHEMA IF NOT EXISTS {}",
                schema
                    .split('.')
                    .map(quote_identifier)
                    .collect::<Vec<_>>()
                    .join(".")
            ));
        }
        queries.push(format!(
            "CREATE TABLE {} (version BIGINT PRIMARY KEY)",
            self.quoted_table()
        ));
        queries.push(format!(
            "INSERT INTO {} (version) VALUES (0)",
            self.quoted_table()
        ));
        queries
    }

    fn add_column_query(&self, column: StateColumn) -> String {
        let column_type = match column {
            StateColumn::Name | StateColumn::Checksum => "TEXT",
            StateColumn::AppliedAt => "TIMESTAMP WITH TIME ZONE",
        };
        format!(
            "ALTER TABLE {} ADD COLUMN {} {}",
            self.quoted_table(),
            column.name(),
            column_type
        )
    }

    fn session_query(&self) -> Option<String> {
        let schemas = self
            .current_schema
            .as_deref()?
            .split(',')
            .map(str::trim)
            .filter(|schema| !schema.is_empty())
            .map(quote_identifier)
            .collect::<Vec<_>>();
        if schemas.is_empty() {
            return None;
        }
        Some(format!("SET search_path TO {}", schemas.join(", ")))
    }
}

/// PostgreSQL client over a caller-owned pool
#[derive(Debug, Clone)]
pub struct PostgresClient {
    dialect: PostgresDialect,
    pool: PgPool,
}

impl PostgresClient {
    pub fn new(config: &Config, pool: PgPool) -> Self {
        Self {
            dialect: PostgresDialect::new(config),
            pool,
        }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl Client for PostgresClient {
    fn dialect(&self) -> &dyn Dialect {
        &self.dialect
    }

    async fn execute_query(&self, sql: &str) -> MigrateResult<Vec<Row>> {
        // search_path is per session, so it has to run on the same connection.
        let mut conn = self.pool.acquire().await?;
        if let Some(session) = self.dialect.session_query() {
            (&mut *conn).execute(session.as_str()).await?;
        }

        let rows = sqlx::query(sql).fetch_all(&mut *conn).await?;
        rows.iter().map(decode_row).collect()
    }

    async fn execute_script(&self, sql: &str) -> MigrateResult<()> {
        let mut conn = self.pool.acquire().await?;
        if let Some(session) = self.dialect.session_query() {
            (&mut *conn).execute(session.as_str()).await?;
        }

        (&mut *conn).execute(sql).await?;
        Ok(())
    }
}

fn decode_row(row: &PgRow) -> MigrateResult<Row> {
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

fn decode_value(row: &PgRow, index: usize) -> MigrateResult<SqlValue> {
    let raw = row.try_get_raw(index)?;
    if raw.is_null() {
        return Ok(SqlValue::Null);
    }
    let type_name = raw.type_info().name().to_string();

    let value = match type_name.as_str() {
        "BOOL" => SqlValue::Bool(row.try_get_unchecked::<bool, _>(index)?),
        "INT2" => SqlValue::Int(row.try_get_unchecked::<i16, _>(index)? as i64),
        "INT4" => SqlValue::Int(row.try_get_unchecked::<i32, _>(index)? as i64),
        "INT8" => SqlValue::Int(row.try_get_unchecked::<i64, _>(index)?),
        "FLOAT4" => SqlValue::Float(row.try_get_unchecked::<f32, _>(index)? as f64),
        "FLOAT8" => SqlValue::Float(row.try_get_unchecked::<f64, _>(index)?),
        "TEXT" | "VARCHAR" | "NAME" | "BPCHAR" | "CHAR" => {
            SqlValue::Text(row.try_get_unchecked::<String, _>(index)?)
        }
        "TIMESTAMPTZ" => SqlValue::Timestamp(row.try_get_unchecked(index)?),
        "TIMESTAMP" => {
            let naive: chrono::NaiveDateTime = row.try_get_unchecked(index)?;
            SqlValue::Timestamp(naive.and_utc())
        }
        "BYTEA" => SqlValue::Bytes(row.try_get_unchecked::<Vec<u8>, _>(index)?),
        other => SqlValue::Unsupported(other.to_string()),
    };
    Ok(value)
}
