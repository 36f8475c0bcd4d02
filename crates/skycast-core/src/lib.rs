pub mod config;
pub mod error;
pub mod request;

pub use config::{
    Config, DefaultLocationConfig, EndpointConfig, NetworkConfig, SearchConfig, TemperatureUnit,
    WeatherConfig,
};
pub use error::{
    AppError, ConfigError, NetworkError, ReqwestErrorExt, StorageError, WeatherError,
};
pub use request::{
    BeginOptions, RequestCoordinator, RequestKind, RequestSlot, RequestStatus, RequestTicket,
};

use anyhow::Result;

/// Initialize logging for the application
pub fn init() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    tracing::info!("Skycast core initialized");
    Ok(())
}
