//! Migration runs against a real PostgreSQL server.
//!
//! Skipped unless `TEST_DATABASE_URL` points at a database the tests may
//! create schemas in. Every test works inside its own throwaway schema.

mod common;

use std::fs;
use std::process;
use std::sync::atomic::{AtomicUsize, Ordering};

use common::MigrationDir;
use sqlshift::{Action, CancellationToken, Config, MigrateError, Migrator, SqlValue};
use sqlx::postgres::{PgPool, PgPoolOptions};

static SCHEMA_COUNTER: AtomicUsize = AtomicUsize::new(0);

async fn test_pool() -> Option<PgPool> {
    let url = std::env::var("TEST_DATABASE_URL").ok()?;
    let pool = PgPoolOptions::new()
        .max_connections(2)
        .connect(&url)
        .await
        .expect("connect to TEST_DATABASE_URL");
    Some(pool)
}

fn unique_schema() -> String {
    format!(
        "sqlshift_test_{}_{}",
        process::id(),
        SCHEMA_COUNTER.fetch_add(1, Ordering::SeqCst)
    )
}

fn schema_config(fixture: &MigrationDir, schema: &str) -> Config {
    fixture
        .config("pg")
        .with_schema_table(format!("{}.schemaversion", schema))
        .with_current_schema(schema)
}

async fn drop_schema(pool: &PgPool, schema: &str) {
    sqlx::query(&format!("DROP SCHEMA IF EXISTS \"{}\" CASCADE", schema))
        .execute(pool)
        .await
        .expect("drop test schema");
}

#[tokio::test]
async fn postgres_round_trip_in_qualified_table() {
    let Some(pool) = test_pool().await else {
        return;
    };
    let schema = unique_schema();
    let fixture = MigrationDir::with_tables(3);
    let mut migrator = Migrator::connect(schema_config(&fixture, &schema), pool.clone()).unwrap();
    let cancel = CancellationToken::new();

    let applied = migrator.migrate(&cancel, "max").await.unwrap();
    assert_eq!(applied.iter().map(|m| m.version).collect::<Vec<_>>(), vec![1, 2, 3]);
    assert_eq!(migrator.database_version(&cancel).await.unwrap(), 3);

    // search_path puts the created tables into the test schema
    let tables: Vec<String> = sqlx::query_scalar(
        "SELECT table_name::text FROM information_schema.tables WHERE table_schema = $1 AND table_name LIKE 't%' ORDER BY table_name",
    )
    .bind(&schema)
    .fetch_all(&pool)
    .await
    .unwrap();
    assert_eq!(tables, vec!["t1", "t2", "t3"]);

    let reverted = migrator.down(&cancel, 1).await.unwrap();
    assert_eq!(reverted.len(), 1);
    assert_eq!(reverted[0].action, Action::Revert);
    assert_eq!(migrator.database_version(&cancel).await.unwrap(), 2);

    migrator.migrate(&cancel, "0").await.unwrap();
    assert_eq!(migrator.database_version(&cancel).await.unwrap(), 0);

    drop_schema(&pool, &schema).await;
}

#[tokio::test]
async fn postgres_state_table_is_idempotent_and_typed() {
    let Some(pool) = test_pool().await else {
        return;
    };
    let schema = unique_schema();
    let fixture = MigrationDir::with_tables(1);
    let mut migrator = Migrator::connect(schema_config(&fixture, &schema), pool.clone()).unwrap();
    let cancel = CancellationToken::new();

    migrator.client().ensure_state_table().await.unwrap();
    migrator.client().ensure_state_table().await.unwrap();
    migrator.migrate(&cancel, "max").await.unwrap();

    let sql = format!(
        "SELECT version, name, checksum, applied_at FROM {} WHERE version = 1",
        migrator.client().dialect().quoted_table()
    );
    let rows = migrator.execute_query(&cancel, &sql).await.unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].get("version"), Some(&SqlValue::Int(1)));
    assert_eq!(rows[0].get("name"), Some(&SqlValue::Text("table-1".into())));
    assert!(matches!(rows[0].get("applied_at"), Some(SqlValue::Timestamp(_))));

    drop_schema(&pool, &schema).await;
}

#[tokio::test]
async fn postgres_checksum_mismatch_applies_nothing() {
    let Some(pool) = test_pool().await else {
        return;
    };
    let schema = unique_schema();
    let fixture = MigrationDir::with_tables(3);
    let mut migrator = Migrator::connect(schema_config(&fixture, &schema), pool.clone()).unwrap();
    let cancel = CancellationToken::new();

    migrator.migrate(&cancel, "1").await.unwrap();
    fs::write(fixture.do_file(1), "CREATE TABLE t1 (id BIGINT);").unwrap();

    let err = migrator.migrate(&cancel, "max").await.unwrap_err();
    assert!(matches!(err.source, MigrateError::ChecksumMismatch { version: 1 }));
    assert!(err.applied.is_empty());
    assert_eq!(migrator.database_version(&cancel).await.unwrap(), 1);

    drop_schema(&pool, &schema).await;
}

#[tokio::test]
async fn postgres_decodes_common_types() {
    let Some(pool) = test_pool().await else {
        return;
    };
    let fixture = MigrationDir::new();
    let migrator = Migrator::connect(fixture.config("postgres"), pool).unwrap();
    let cancel = CancellationToken::new();

    let rows = migrator
        .execute_query(
            &cancel,
            "SELECT 1::int4 AS a, 2::int8 AS b, 'x'::text AS c, true AS d, \
             1.5::float8 AS e, NULL::text AS f, now() AS g, '\\xbeef'::bytea AS h",
        )
        .await
        .unwrap();

    let row = &rows[0];
    assert_eq!(row.get("a"), Some(&SqlValue::Int(1)));
    assert_eq!(row.get("b"), Some(&SqlValue::Int(2)));
    assert_eq!(row.get("c"), Some(&SqlValue::Text("x".into())));
    assert_eq!(row.get("d"), Some(&SqlValue::Bool(true)));
    assert_eq!(row.get("e"), Some(&SqlValue::Float(1.5)));
    assert_eq!(row.get("f"), Some(&SqlValue::Null));
    assert!(matches!(row.get("g"), Some(SqlValue::Timestamp(_))));
    assert_eq!(row.get("h"), Some(&SqlValue::Bytes(vec![0xbe, 0xef])));
}
