use anyhow::Result;
use std::sync::Arc;
use telemirror::Config;
use telemirror::geocode::{Geocoder, NominatimGeocoder};
use telemirror::logging::init_logging;
use telemirror::persistence::FileRegistry;
use telemirror::plugin::VehiclePlugin;
use telemirror::vehicle::HttpVehicleClient;
use tokio::time::Duration;
use tracing::{error, info};

#[tokio::main]
async fn main() -> Result<()> {
    // Explicit config path wins over the default locations
    let config = match std::env::args().nth(1) {
        Some(path) => Config::from_file(&path)
            .map_err(|e| anyhow::anyhow!("Failed to load config '{}': {}", path, e))?,
        None => Config::load().map_err(|e| anyhow::anyhow!("Failed to load config: {}", e))?,
    };

    init_logging(&config.logging)
        .map_err(|e| anyhow::anyhow!("Failed to initialize logging: {}", e))?;

    if let Err(e) = config.validate() {
        error!("Invalid configuration: {}", e);
        return Err(anyhow::anyhow!("Invalid configuration: {}", e));
    }

    info!("Telemirror {} starting up", env!("APP_VERSION"));

    let client = HttpVehicleClient::new(&config.provider)
        .map_err(|e| anyhow::anyhow!("Failed to create vehicle client: {}", e))?;
    let geocoder: Option<Arc<dyn Geocoder>> = if config.geocoding.enabled {
        let geocoder = NominatimGeocoder::new(&config.geocoding, &config.account.locale)
            .map_err(|e| anyhow::anyhow!("Failed to create geocoder: {}", e))?;
        Some(Arc::new(geocoder))
    } else {
        None
    };
    let registry = FileRegistry::open(&config.registry.state_file)
        .map_err(|e| anyhow::anyhow!("Failed to open device store: {}", e))?;

    let mut plugin =
        VehiclePlugin::from_config(&config, Box::new(client), geocoder, Arc::new(registry));
    plugin.start().await;

    let period = Duration::from_secs(config.heartbeat.period_secs);
    plugin
        .run_until(period, async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                error!("Failed to listen for shutdown signal: {}", e);
            }
        })
        .await;

    info!("Telemirror shutdown complete");
    Ok(())
}
