use anyhow::Result;
use tokio::signal;
use tracing_subscriber::EnvFilter;
use vigil_core::{Monitor, MonitorConfig};

#[tokio::main]
async fn main() -> Result<()> {
    vigil_common::id::init(1, 1);

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("vigil=info".parse()?))
        .init();

    let args: Vec<String> = std::env::args().collect();
    let config_path = args
        .get(1)
        .map(|s| s.as_str())
        .unwrap_or("config/vigil.toml");

    let config = if std::path::Path::new(config_path).exists() {
        MonitorConfig::load(config_path)?
    } else {
        tracing::warn!(path = config_path, "Config file not found, using defaults");
        MonitorConfig::default()
    };

    let monitor = Monitor::start(config)?;
    tracing::info!("vigild running, press Ctrl-C to stop");

    signal::ctrl_c().await?;
    tracing::info!("Shutting down gracefully");
    monitor.shutdown().await;

    Ok(())
}
