use clap::{Parser, Subcommand};

pub mod app;

#[derive(Parser)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the HTTP API
    Serve,
    /// Apply pending database migrations and exit
    Migrate,
}

#[tokio::main]
pub async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    dotenvy::dotenv().ok();
    app::init_tracing();

    let cli = Cli::parse();
    match &cli.command {
        Commands::Serve => app::serve::main().await,
        Commands::Migrate => app::migrate::main().await,
    }
}
