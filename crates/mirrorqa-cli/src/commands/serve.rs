use anyhow::Result;
use clap::Parser;
use mirrorqa_server::ServerConfig;

use super::utils::info;

#[derive(Parser)]
pub struct ServeArgs {}

pub async fn execute(_args: ServeArgs) -> Result<()> {
    let config = ServerConfig::from_env()?;
    info(&format!("starting mirrors-qa API on {}:{}", config.host, config.port));
    mirrorqa_server::serve(config).await?;
    Ok(())
}
