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
    /// Talk to the bot from the terminal
    Console {
        /// External user id the conversation runs as
        #[arg(long, default_value_t = 1)]
        user_id: i64,
    },
}

#[tokio::main]
pub async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    dotenvy::dotenv().ok();
    app::init_tracing();

    let cli = Cli::parse();
    match &cli.command {
        Commands::Console { user_id } => app::console::main(*user_id).await,
    }
}
