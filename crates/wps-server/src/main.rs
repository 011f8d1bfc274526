use anyhow::{Context, Result};
use tracing::{info, warn};
use wps_server::config::ServerConfig;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration from the config file and environment variables
    let (config, warnings) = ServerConfig::load().context("Failed to load configuration")?;

    wps_monitoring::init_logging(&config.monitoring_config())
        .context("Failed to initialize logging")?;
    for warning in &warnings {
        warn!("{}", warning);
    }
    info!(
        algorithms = ?config.algorithms,
        protocol_versions = ?config.protocol_versions,
        "Loaded server configuration"
    );

    // Run the server using the library's run function
    wps_server::run(config).await.context("Server error")?;

    Ok(())
}
