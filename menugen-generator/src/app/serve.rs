use menugen_common::RetryPolicy;
use menugen_generator::handlers::{router, AppState};
use menugen_generator::themes::ThemeRegistry;
use menugen_generator::Config;
use tracing::info;

use super::BoxError;

pub async fn main() -> Result<(), BoxError> {
    let config = Config::from_env()?;
    tokio::fs::create_dir_all(&config.pages_dir).await?;

    let themes = ThemeRegistry::load(
        config.themes_url.clone(),
        config.http_timeout,
        RetryPolicy::default(),
    )
    .await?;
    let listen_addr = config.listen_addr.clone();
    let app = router(AppState::new(config, themes));

    let listener = tokio::net::TcpListener::bind(&listen_addr).await?;
    info!("Menu page generator listening on {}", listener.local_addr()?);

    axum::serve(listener, app).await?;

    Ok(())
}
