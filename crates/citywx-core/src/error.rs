//! Error taxonomy for citywx.
//!
//! `WeatherError` is what the pipeline returns. Cache and config failures
//! have their own types; `AppError` gathers everything for the binary and
//! decides the exit code.

use thiserror::Error;

/// Anything that can end a CLI invocation.
#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Weather(#[from] WeatherError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("summary cache: {0}")]
    Cache(#[from] CacheError),

    #[error("filesystem: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0:#}")]
    Other(#[from] anyhow::Error),
}

impl AppError {
    /// Short explanation printed above the detailed error.
    pub fn user_message(&self) -> &'static str {
        match self {
            Self::Weather(e) => e.user_message(),
            Self::Config(_) => "Fix the configuration file and run again.",
            Self::Cache(e) => e.user_message(),
            Self::Io(_) => "Could not access the data directory.",
            Self::Other(_) => "Something went wrong.",
        }
    }

    /// Process exit code for CLI adapters.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Weather(e) => e.exit_code(),
            Self::Config(_) => 78,
            Self::Io(_) => 74,
            Self::Cache(_) | Self::Other(_) => 1,
        }
    }
}

/// Failures of the weather summary pipeline.
///
/// `InvalidInput` is a caller error and is never retried. The provider and
/// store variants are surfaced unchanged from the collaborator that raised
/// them. `InvalidConfiguration` is only raised while constructing components.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum WeatherError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    #[error("Weather provider unavailable: {0}")]
    ProviderUnavailable(String),

    #[error("Malformed weather provider response: {0}")]
    ProviderMalformedResponse(String),

    #[error("History store unavailable: {0}")]
    StoreUnavailable(String),
}

impl WeatherError {
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput(message.into())
    }

    pub fn invalid_configuration(message: impl Into<String>) -> Self {
        Self::InvalidConfiguration(message.into())
    }

    pub fn provider_unavailable(message: impl Into<String>) -> Self {
        Self::ProviderUnavailable(message.into())
    }

    pub fn provider_malformed(message: impl Into<String>) -> Self {
        Self::ProviderMalformedResponse(message.into())
    }

    pub fn store_unavailable(message: impl Into<String>) -> Self {
        Self::StoreUnavailable(message.into())
    }

    pub fn user_message(&self) -> &'static str {
        match self {
            WeatherError::InvalidInput(_) => "The request was invalid. Check the city name.",
            WeatherError::InvalidConfiguration(_) => {
                "The service is misconfigured. Check your settings."
            }
            WeatherError::ProviderUnavailable(_) => {
                "Weather service unavailable. Please try again later."
            }
            WeatherError::ProviderMalformedResponse(_) => {
                "Weather service returned unexpected data. Please try again later."
            }
            WeatherError::StoreUnavailable(_) => {
                "Weather history is unavailable. Please try again later."
            }
        }
    }

    /// HTTP status an inbound HTTP adapter should answer with.
    pub fn http_status(&self) -> u16 {
        match self {
            WeatherError::InvalidInput(_) => 400,
            WeatherError::InvalidConfiguration(_) => 500,
            WeatherError::ProviderUnavailable(_) => 503,
            WeatherError::ProviderMalformedResponse(_) => 502,
            WeatherError::StoreUnavailable(_) => 503,
        }
    }

    /// Process exit code for CLI adapters (sysexits.h values).
    pub fn exit_code(&self) -> i32 {
        match self {
            WeatherError::InvalidInput(_) => 65,
            WeatherError::InvalidConfiguration(_) => 78,
            WeatherError::ProviderUnavailable(_) | WeatherError::StoreUnavailable(_) => 69,
            WeatherError::ProviderMalformedResponse(_) => 76,
        }
    }

    /// Whether the failure is the caller's fault.
    pub fn is_client_error(&self) -> bool {
        matches!(self, WeatherError::InvalidInput(_))
    }
}

/// Result type for the weather pipeline.
pub type WeatherResult<T> = Result<T, WeatherError>;

/// Summary cache errors. These never escape the caching layer.
#[derive(Debug, Error)]
pub enum CacheError {
    #[error("Cache unavailable: {0}")]
    Unavailable(String),

    #[error("Cache entry corrupt: {0}")]
    Corrupt(String),
}

impl CacheError {
    pub fn user_message(&self) -> &'static str {
        match self {
            CacheError::Unavailable(_) => "Cache unavailable. Results are computed directly.",
            CacheError::Corrupt(_) => "Cached data was unreadable and has been ignored.",
        }
    }
}

/// The config file could not be loaded or failed validation.
#[derive(Debug, Error)]
#[error("configuration: {0}")]
pub struct ConfigError(pub String);

impl From<anyhow::Error> for ConfigError {
    fn from(e: anyhow::Error) -> Self {
        Self(format!("{:#}", e))
    }
}

/// Extension trait for classifying reqwest errors as provider failures.
pub trait ReqwestErrorExt {
    fn into_weather_error(self) -> WeatherError;
}

impl ReqwestErrorExt for reqwest::Error {
    fn into_weather_error(self) -> WeatherError {
        if self.is_timeout() {
            WeatherError::provider_unavailable(format!("request timed out: {}", self))
        } else if self.is_decode() {
            WeatherError::provider_malformed(self.to_string())
        } else if let Some(status) = self.status() {
            WeatherError::provider_unavailable(format!("status {}: {}", status.as_u16(), self))
        } else {
            WeatherError::provider_unavailable(self.to_string())
        }
    }
}

/// Extension trait for converting rusqlite errors to our error types.
pub trait RusqliteErrorExt {
    fn into_store_error(self) -> WeatherError;
    fn into_cache_error(self) -> CacheError;
}

impl RusqliteErrorExt for rusqlite::Error {
    fn into_store_error(self) -> WeatherError {
        WeatherError::store_unavailable(self.to_string())
    }

    fn into_cache_error(self) -> CacheError {
        match &self {
            rusqlite::Error::SqliteFailure(_, Some(msg)) if msg.contains("corrupt") => {
                CacheError::Corrupt(self.to_string())
            }
            _ => CacheError::Unavailable(self.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_input_is_client_error() {
        let err = WeatherError::invalid_input("City name cannot be empty.");
        assert!(err.is_client_error());
        assert_eq!(err.http_status(), 400);
    }

    #[test]
    fn test_collaborator_failures_map_to_server_statuses() {
        assert_eq!(WeatherError::provider_unavailable("down").http_status(), 503);
        assert_eq!(WeatherError::provider_malformed("no temp").http_status(), 502);
        assert_eq!(WeatherError::store_unavailable("locked").http_status(), 503);
        assert!(!WeatherError::store_unavailable("locked").is_client_error());
    }

    #[test]
    fn test_app_error_conversion() {
        let err = WeatherError::invalid_input("blank");
        let app_err: AppError = err.into();
        assert!(matches!(app_err, AppError::Weather(WeatherError::InvalidInput(_))));
        assert_eq!(app_err.exit_code(), 65);
    }

    #[test]
    fn test_user_message_propagation() {
        let app_err = AppError::Weather(WeatherError::provider_unavailable("timeout"));
        assert_eq!(
            app_err.user_message(),
            "Weather service unavailable. Please try again later."
        );
    }

    #[test]
    fn test_config_failures_exit_with_config_code() {
        let err: AppError = ConfigError::from(anyhow::anyhow!("bad ttl")).into();
        assert_eq!(err.exit_code(), 78);
        assert_eq!(err.to_string(), "configuration: bad ttl");
    }

    #[test]
    fn test_display_includes_detail() {
        let err = WeatherError::store_unavailable("database is locked");
        assert_eq!(err.to_string(), "History store unavailable: database is locked");
    }
}
