use anyhow::Result;
use tracing::info;

use crate::config::Config;
use crate::llm::factory;
use crate::server;

pub async fn run(config_path: Option<String>, host: Option<String>, dry_run: bool) -> Result<()> {
    let mut config = Config::load_with_path(config_path)?;
    if let Some(host) = host {
        info!("CLI override: host = {}", host);
        config.server.host = host;
    }

    info!(
        "LLM: {} ({}), timeout {}s{}",
        config.llm.provider,
        config.llm.model,
        config.llm.timeout_secs,
        if dry_run { " [dry run]" } else { "" }
    );

    let client = factory::create_client(&config.llm, dry_run)?;
    server::serve(&config.server.host, client).await
}
