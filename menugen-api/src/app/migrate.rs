use menugen_api::Config;

use super::BoxError;

pub async fn main() -> Result<(), BoxError> {
    let config = Config::from_env()?;
    super::connect(&config).await?;
    tracing::info!("Database is up to date");
    Ok(())
}
