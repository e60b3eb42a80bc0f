//! Connection pool and schema utilities.

use std::time::Duration;

use diesel::pg::PgConnection;
use diesel::prelude::*;
use diesel::r2d2::{ConnectionManager, Pool};
use diesel::sql_types::{BigInt, Text};
use diesel_migrations::{embed_migrations, EmbeddedMigrations, MigrationHarness};
use menugen_common::api::{ColumnInfo, TableData, TableInfo, TableStructure};

use crate::config::Config;
use crate::error::ApiError;

pub const MIGRATIONS: EmbeddedMigrations = embed_migrations!("./migrations");

pub const CONNECT_ATTEMPTS: u32 = 5;
pub const CONNECT_RETRY_DELAY: Duration = Duration::from_secs(5);

pub type DbPool = Pool<ConnectionManager<PgConnection>>;

/// Builds the pool without touching the database. Connections are opened on
/// first use.
pub fn build_pool_lazy(config: &Config) -> DbPool {
    let manager = ConnectionManager::<PgConnection>::new(&config.database_url);
    Pool::builder()
        .max_size(config.db_pool_size)
        .min_idle(Some(0))
        .connection_timeout(config.db_pool_timeout)
        .build_unchecked(manager)
}

/// Builds the pool and waits for the database, retrying with a fixed delay.
/// Blocks the calling thread.
pub fn connect_with_retry(
    config: &Config,
    attempts: u32,
    delay: Duration,
) -> Result<DbPool, diesel::r2d2::PoolError> {
    let mut attempt = 1;
    loop {
        let manager = ConnectionManager::<PgConnection>::new(&config.database_url);
        let result = Pool::builder()
            .max_size(config.db_pool_size)
            .connection_timeout(config.db_pool_timeout)
            .build(manager);
        match result {
            Ok(pool) => return Ok(pool),
            Err(e) if attempt < attempts => {
                tracing::warn!(
                    attempt,
                    max_attempts = attempts,
                    delay_secs = delay.as_secs(),
                    "Database not reachable, retrying: {e}"
                );
                std::thread::sleep(delay);
                attempt += 1;
            }
            Err(e) => return Err(e),
        }
    }
}

pub fn run_migrations(pool: &DbPool) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let mut conn = pool.get()?;
    let applied = conn.run_pending_migrations(MIGRATIONS)?;
    for version in applied {
        tracing::info!(%version, "Applied migration");
    }
    Ok(())
}

/// Runs blocking diesel work on the blocking thread pool. Failing to obtain a
/// connection within the pool timeout is reported as [`ApiError::Busy`].
pub async fn with_connection<T, F>(pool: &DbPool, work: F) -> Result<T, ApiError>
where
    T: Send + 'static,
    F: FnOnce(&mut PgConnection) -> Result<T, ApiError> + Send + 'static,
{
    let pool = pool.clone();
    tokio::task::spawn_blocking(move || {
        let mut conn = pool.get().map_err(|e| {
            tracing::warn!("Failed to acquire database connection: {e}");
            ApiError::Busy
        })?;
        work(&mut conn)
    })
    .await
    .map_err(|e| ApiError::Internal(format!("database task failed: {e}")))?
}

#[derive(QueryableByName)]
struct TableNameRow {
    #[diesel(sql_type = Text)]
    table_name: String,
}

#[derive(QueryableByName)]
struct ColumnRow {
    #[diesel(sql_type = Text)]
    column_name: String,
    #[diesel(sql_type = Text)]
    data_type: String,
}

#[derive(QueryableByName)]
struct JsonSample {
    #[diesel(sql_type = Text)]
    sample: String,
}

#[derive(QueryableByName)]
struct CountRow {
    #[diesel(sql_type = BigInt)]
    count: i64,
}

fn public_tables(conn: &mut PgConnection) -> QueryResult<Vec<String>> {
    let tables = diesel::sql_query(
        "SELECT table_name::text AS table_name FROM information_schema.tables \
         WHERE table_schema = 'public' AND table_type = 'BASE TABLE' \
         ORDER BY table_name",
    )
    .load::<TableNameRow>(conn)?;
    Ok(tables.into_iter().map(|t| t.table_name).collect())
}

fn table_columns(conn: &mut PgConnection, table_name: &str) -> QueryResult<Vec<ColumnInfo>> {
    let columns = diesel::sql_query(
        "SELECT column_name::text AS column_name, data_type::text AS data_type \
         FROM information_schema.columns \
         WHERE table_schema = 'public' AND table_name = $1 \
         ORDER BY ordinal_position",
    )
    .bind::<Text, _>(table_name)
    .load::<ColumnRow>(conn)?
    .into_iter()
    .map(|c| ColumnInfo {
        name: c.column_name,
        data_type: c.data_type,
    })
    .collect();
    Ok(columns)
}

fn row_count(conn: &mut PgConnection, table_name: &str) -> QueryResult<i64> {
    Ok(diesel::sql_query(format!(
        "SELECT COUNT(*) AS count FROM {}",
        quote_identifier(table_name)
    ))
    .get_result::<CountRow>(conn)?
    .count)
}

/// Name of the public table `name`, or `None` when there is no such table.
/// Only names returned here are ever interpolated into SQL.
fn find_table(conn: &mut PgConnection, name: &str) -> QueryResult<Option<String>> {
    Ok(public_tables(conn)?.into_iter().find(|t| t == name))
}

/// Tables of the public schema with their columns and row counts.
pub fn debug_tables(conn: &mut PgConnection) -> QueryResult<Vec<TableInfo>> {
    let tables = public_tables(conn)?;
    let mut infos = Vec::with_capacity(tables.len());
    for table_name in tables {
        let columns = table_columns(conn, &table_name)?;
        let row_count = row_count(conn, &table_name)?;
        infos.push(TableInfo {
            name: table_name,
            columns,
            row_count,
        });
    }
    Ok(infos)
}

pub fn table_structure(conn: &mut PgConnection, name: &str) -> Result<TableStructure, ApiError> {
    let table_name = find_table(conn, name)?.ok_or_else(|| table_not_found(name))?;
    let columns = table_columns(conn, &table_name)?;
    Ok(TableStructure {
        table_name,
        columns,
    })
}

/// Row count and the first `limit` rows of a public table, each row as a
/// JSON object.
pub fn table_data(
    conn: &mut PgConnection,
    name: &str,
    limit: i64,
) -> Result<TableData, ApiError> {
    let table_name = find_table(conn, name)?.ok_or_else(|| table_not_found(name))?;
    let row_count = row_count(conn, &table_name)?;
    let sample = diesel::sql_query(format!(
        "SELECT COALESCE(json_agg(t), '[]'::json)::text AS sample \
         FROM (SELECT * FROM {} LIMIT $1) t",
        quote_identifier(&table_name)
    ))
    .bind::<BigInt, _>(limit)
    .get_result::<JsonSample>(conn)?
    .sample;
    let sample_data = serde_json::from_str(&sample)
        .map_err(|e| ApiError::Internal(format!("invalid table rows: {e}")))?;
    Ok(TableData {
        table_name,
        row_count,
        sample_data,
    })
}

fn table_not_found(name: &str) -> ApiError {
    ApiError::NotFound(format!("table {name} not found"))
}

fn quote_identifier(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}
