// image-mixer-relay - HTTP relay between the workbench and the model provider
use anyhow::Result;
use image_mixer::{config::RelayConfig, server};

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = RelayConfig::from_env()?;
    server::serve(config).await
}
