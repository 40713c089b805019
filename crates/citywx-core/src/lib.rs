pub mod config;
pub mod error;

pub use config::{
    CacheConfig, CacheKind, Config, ConfigIssue, ProviderConfig, ProviderKind, StorageConfig,
    StorageKind, TrendConfig, ValidationResult, API_KEY_ENV,
};
pub use error::{
    AppError, CacheError, ConfigError, ReqwestErrorExt, RusqliteErrorExt, WeatherError,
    WeatherResult,
};

use anyhow::Result;

/// Initialize logging for the citywx binary
pub fn init() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    tracing::debug!("citywx core initialized");
    Ok(())
}
