use menugen_api::db::{self, DbPool, CONNECT_ATTEMPTS, CONNECT_RETRY_DELAY};
use menugen_api::Config;
use tracing_subscriber::EnvFilter;

pub mod migrate;
pub mod serve;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

pub fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();
}

/// Waits for the database and applies pending migrations.
async fn connect(config: &Config) -> Result<DbPool, BoxError> {
    let config = config.clone();
    let pool = tokio::task::spawn_blocking(move || {
        db::connect_with_retry(&config, CONNECT_ATTEMPTS, CONNECT_RETRY_DELAY)
    })
    .await??;
    let migrated = pool.clone();
    tokio::task::spawn_blocking(move || db::run_migrations(&migrated)).await??;
    Ok(pool)
}
