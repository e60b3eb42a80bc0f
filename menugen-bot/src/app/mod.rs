use tracing_subscriber::EnvFilter;

pub mod console;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

pub fn init_tracing() {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .init();
}
