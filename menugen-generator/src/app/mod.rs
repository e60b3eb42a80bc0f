use tracing_subscriber::EnvFilter;

pub mod serve;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

pub fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();
}
