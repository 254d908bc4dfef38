use anyhow::Result;
use config_manager::ConfigManager;
use tracing::info;

/// Checks the configuration the API server would start with and prints it with
/// secrets blanked. Pass a path to check a file other than `config.toml`.
#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let manager = match std::env::args().nth(1) {
        Some(path) => ConfigManager::from_file(path)?,
        None => ConfigManager::new()?,
    };
    let config = manager.config();

    info!("Configuration is valid");
    info!("Collection: {}", config.collection.contract_address);
    info!("Network: {}", config.alchemy.network);
    info!(
        "OpenSea feed: {}, WWMM feed: {}",
        if config.opensea.enabled { "enabled" } else { "disabled" },
        if config.reservoir.enabled { "enabled" } else { "disabled" }
    );
    println!("{}", serde_json::to_string_pretty(&config.to_json_value())?);

    info!("Start the server with: cargo run -p api_server");
    Ok(())
}
