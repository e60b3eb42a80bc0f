use menugen_api::generation::GeneratorClient;
use menugen_api::handlers::{router, AppState};
use menugen_api::Config;
use tracing::info;

use super::BoxError;

pub async fn main() -> Result<(), BoxError> {
    let config = Config::from_env()?;
    tokio::fs::create_dir_all(&config.upload_dir).await?;

    let pool = super::connect(&config).await?;
    let generator = GeneratorClient::new(&config.generator_url, config.http_timeout)?;
    let listen_addr = config.listen_addr.clone();
    let app = router(AppState::new(config, pool, generator));

    let listener = tokio::net::TcpListener::bind(&listen_addr).await?;
    info!("Menugen API listening on {}", listener.local_addr()?);

    axum::serve(listener, app).await?;

    Ok(())
}
