use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use url::Url;

/// Environment variable consulted when `provider.api_key` is not set.
pub const API_KEY_ENV: &str = "OPENWEATHER_API_KEY";

/// A problem with one config key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigIssue {
    pub key: &'static str,
    pub message: String,
}

impl std::fmt::Display for ConfigIssue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.key, self.message)
    }
}

/// Issues found by `Config::validate`. Errors stop startup; warnings are
/// only logged.
#[derive(Debug, Clone, Default)]
pub struct ValidationResult {
    pub errors: Vec<ConfigIssue>,
    pub warnings: Vec<ConfigIssue>,
}

impl ValidationResult {
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn error(&mut self, key: &'static str, message: impl Into<String>) {
        self.errors.push(ConfigIssue {
            key,
            message: message.into(),
        });
    }

    pub fn warning(&mut self, key: &'static str, message: impl Into<String>) {
        self.warnings.push(ConfigIssue {
            key,
            message: message.into(),
        });
    }

    /// All errors on one line
    pub fn error_summary(&self) -> String {
        let parts: Vec<String> = self.errors.iter().map(ToString::to_string).collect();
        parts.join("; ")
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Directory holding the SQLite databases
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    /// Current-weather provider settings
    #[serde(default)]
    pub provider: ProviderConfig,

    /// History storage settings
    #[serde(default)]
    pub storage: StorageConfig,

    /// Summary cache settings
    #[serde(default)]
    pub cache: CacheConfig,

    /// Trend classification settings
    #[serde(default)]
    pub trend: TrendConfig,
}

/// Which current-weather provider to use
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ProviderKind {
    #[default]
    OpenWeather,
    Fake,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    #[serde(default)]
    pub kind: ProviderKind,

    /// Endpoint of the current-weather API
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// API key (optional, can be set via environment)
    #[serde(default)]
    pub api_key: Option<String>,

    /// Per-request timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Retries for transient provider failures
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
}

fn default_base_url() -> String {
    "https://api.openweathermap.org/data/2.5/weather".to_string()
}

fn default_timeout_secs() -> u64 {
    10
}

fn default_max_retries() -> u32 {
    3
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            kind: ProviderKind::default(),
            base_url: default_base_url(),
            api_key: None,
            timeout_secs: default_timeout_secs(),
            max_retries: default_max_retries(),
        }
    }
}

impl ProviderConfig {
    /// The configured key, falling back to the environment.
    pub fn resolved_api_key(&self) -> Option<String> {
        self.api_key
            .clone()
            .filter(|k| !k.trim().is_empty())
            .or_else(|| std::env::var(API_KEY_ENV).ok())
            .filter(|k| !k.trim().is_empty())
    }
}

/// Which history store to use
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum StorageKind {
    #[default]
    Sqlite,
    Memory,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    #[serde(default)]
    pub kind: StorageKind,

    /// Database file name, relative to `data_dir`
    #[serde(default = "default_database_file")]
    pub database_file: String,
}

fn default_database_file() -> String {
    "weather.db".to_string()
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            kind: StorageKind::default(),
            database_file: default_database_file(),
        }
    }
}

/// Which summary cache to use. `Memory` only pays off in a long-lived
/// process; each CLI run starts with it empty.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum CacheKind {
    Memory,
    #[default]
    Sqlite,
    Disabled,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    #[serde(default)]
    pub kind: CacheKind,

    /// Summary time-to-live in seconds
    #[serde(default = "default_ttl_secs")]
    pub ttl_secs: u64,
}

fn default_ttl_secs() -> u64 {
    300
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            kind: CacheKind::default(),
            ttl_secs: default_ttl_secs(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrendConfig {
    /// Deltas strictly below this magnitude are reported as stable
    #[serde(default = "default_stable_threshold")]
    pub stable_threshold_celsius: f64,
}

fn default_stable_threshold() -> f64 {
    0.3
}

impl Default for TrendConfig {
    fn default() -> Self {
        Self {
            stable_threshold_celsius: default_stable_threshold(),
        }
    }
}

/// Why `raw` cannot be used as the provider endpoint, if it cannot.
fn http_url_problem(raw: &str) -> Option<String> {
    let url = match Url::parse(raw) {
        Ok(url) => url,
        Err(e) => return Some(format!("not a valid URL: {}", e)),
    };
    if !matches!(url.scheme(), "http" | "https") {
        return Some(format!("expected http or https, got {}", url.scheme()));
    }
    if url.host_str().map_or(true, str::is_empty) {
        return Some("URL has no host".to_string());
    }
    if url.port() == Some(0) {
        return Some("port 0 is not usable".to_string());
    }
    None
}

fn default_data_dir() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("citywx")
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            provider: ProviderConfig::default(),
            storage: StorageConfig::default(),
            cache: CacheConfig::default(),
            trend: TrendConfig::default(),
        }
    }
}

impl Config {
    /// Read `config.toml` from the user config directory.
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::default_path()?)
    }

    /// Read a config file, writing defaults there first if it is missing.
    pub fn load_from(path: &Path) -> Result<Self> {
        match std::fs::read_to_string(path) {
            Ok(raw) => toml::from_str(&raw)
                .with_context(|| format!("Invalid TOML in {}", path.display())),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::info!("No config at {}, writing defaults", path.display());
                let config = Self::default();
                config.save_to(path)?;
                Ok(config)
            }
            Err(e) => Err(e).with_context(|| format!("Cannot read {}", path.display())),
        }
    }

    /// Load (explicit path or default location) and validate.
    ///
    /// Fails when validation reports errors; warnings are logged and
    /// returned alongside the config.
    pub fn load_validated(path: Option<&Path>) -> Result<(Self, ValidationResult)> {
        let config = match path {
            Some(path) => Self::load_from(path)?,
            None => Self::load()?,
        };

        let report = config.validate();
        if !report.is_valid() {
            anyhow::bail!("Invalid configuration: {}", report.error_summary());
        }
        for issue in &report.warnings {
            tracing::warn!("Config: {}", issue);
        }

        Ok((config, report))
    }

    /// Check every section; see `ValidationResult` for how issues are used.
    pub fn validate(&self) -> ValidationResult {
        let mut result = ValidationResult::default();

        if self.provider.kind == ProviderKind::OpenWeather {
            if let Some(problem) = http_url_problem(&self.provider.base_url) {
                result.error("provider.base_url", problem);
            }

            if self.provider.resolved_api_key().is_none() {
                result.error(
                    "provider.api_key",
                    format!("API key required for open_weather (or set {})", API_KEY_ENV),
                );
            }
        }

        if self.provider.timeout_secs == 0 {
            result.error("provider.timeout_secs", "Timeout must be greater than 0");
        } else if self.provider.timeout_secs > 120 {
            result.warning("provider.timeout_secs", "Timeout is unusually long (>120s)");
        }

        if self.provider.max_retries > 10 {
            result.warning("provider.max_retries", "More than 10 retries per request");
        }

        if self.storage.kind == StorageKind::Sqlite && self.storage.database_file.trim().is_empty() {
            result.error("storage.database_file", "Database file name cannot be empty");
        }

        if self.storage.kind == StorageKind::Memory {
            result.warning(
                "storage.kind",
                "In-memory storage loses all measurements on exit",
            );
        }

        if self.cache.kind == CacheKind::Memory {
            result.warning(
                "cache.kind",
                "In-memory cache starts empty on every run",
            );
        }

        if self.cache.kind != CacheKind::Disabled {
            if self.cache.ttl_secs == 0 {
                result.error("cache.ttl_secs", "TTL must be greater than 0");
            } else if self.cache.ttl_secs > 86_400 {
                result.warning("cache.ttl_secs", "Summaries cached for more than 24 hours");
            }
        }

        let threshold = self.trend.stable_threshold_celsius;
        if !threshold.is_finite() || threshold < 0.0 {
            result.error(
                "trend.stable_threshold_celsius",
                "Stable threshold must be a finite value >= 0",
            );
        }

        result
    }

    /// Full path of the history database
    pub fn database_path(&self) -> PathBuf {
        self.data_dir.join(&self.storage.database_file)
    }

    /// Full path of the persistent summary cache
    pub fn cache_database_path(&self) -> PathBuf {
        self.data_dir.join("summary_cache.db")
    }

    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::default_path()?)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(dir) = path.parent() {
            std::fs::create_dir_all(dir)
                .with_context(|| format!("Cannot create {}", dir.display()))?;
        }
        let body = toml::to_string_pretty(self).context("Cannot encode config as TOML")?;
        std::fs::write(path, body).with_context(|| format!("Cannot write {}", path.display()))
    }

    /// `<config dir>/citywx/config.toml`
    pub fn default_path() -> Result<PathBuf> {
        let base = dirs::config_dir().context("No user config directory on this platform")?;
        Ok(base.join("citywx").join("config.toml"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fake_config() -> Config {
        let mut config = Config::default();
        config.provider.kind = ProviderKind::Fake;
        config
    }

    #[test]
    fn test_valid_fake_config() {
        let result = fake_config().validate();
        assert!(result.is_valid(), "Fake config should be valid: {:?}", result.errors);
    }

    #[test]
    fn test_open_weather_requires_api_key() {
        let mut config = Config::default();
        config.provider.kind = ProviderKind::OpenWeather;
        config.provider.api_key = Some("abc123".to_string());
        assert!(config.validate().is_valid());

        config.provider.api_key = Some("   ".to_string());
        if std::env::var(API_KEY_ENV).is_err() {
            let result = config.validate();
            assert!(result.errors.iter().any(|e| e.key == "provider.api_key"));
        }
    }

    #[test]
    fn test_invalid_url_scheme() {
        let mut config = Config::default();
        config.provider.api_key = Some("abc123".to_string());
        config.provider.base_url = "ftp://weather.example".to_string();
        let result = config.validate();
        assert!(!result.is_valid());
        assert!(result.errors.iter().any(|e| e.message.contains("http or https")));
    }

    #[test]
    fn test_invalid_url() {
        let mut config = Config::default();
        config.provider.api_key = Some("abc123".to_string());
        config.provider.base_url = "not-a-url".to_string();
        let result = config.validate();
        assert!(result.errors.iter().any(|e| e.key == "provider.base_url"));
    }

    #[test]
    fn test_negative_threshold_rejected() {
        let mut config = fake_config();
        config.trend.stable_threshold_celsius = -0.1;
        let result = config.validate();
        assert!(result.errors.iter().any(|e| e.key == "trend.stable_threshold_celsius"));
    }

    #[test]
    fn test_zero_ttl_rejected_unless_cache_disabled() {
        let mut config = fake_config();
        config.cache.ttl_secs = 0;
        assert!(!config.validate().is_valid());

        config.cache.kind = CacheKind::Disabled;
        assert!(config.validate().is_valid());
    }

    #[test]
    fn test_zero_timeout_rejected() {
        let mut config = fake_config();
        config.provider.timeout_secs = 0;
        let result = config.validate();
        assert!(result.errors.iter().any(|e| e.key == "provider.timeout_secs"));
    }

    #[test]
    fn test_memory_storage_warns() {
        let mut config = fake_config();
        config.storage.kind = StorageKind::Memory;
        let result = config.validate();
        assert!(result.is_valid());
        assert!(result.warnings.iter().any(|w| w.key == "storage.kind"));
    }

    #[test]
    fn test_memory_cache_warns() {
        let mut config = fake_config();
        assert!(!config.validate().warnings.iter().any(|w| w.key == "cache.kind"));

        config.cache.kind = CacheKind::Memory;
        let result = config.validate();
        assert!(result.is_valid());
        assert!(result.warnings.iter().any(|w| w.key == "cache.kind"));
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let config: Config = toml::from_str(
            r#"
            [provider]
            kind = "fake"

            [trend]
            stable_threshold_celsius = 0.5
            "#,
        )
        .unwrap();

        assert_eq!(config.provider.kind, ProviderKind::Fake);
        assert_eq!(config.provider.timeout_secs, 10);
        assert_eq!(config.cache.ttl_secs, 300);
        assert_eq!(config.cache.kind, CacheKind::Sqlite);
        assert_eq!(config.storage.database_file, "weather.db");
        assert!((config.trend.stable_threshold_celsius - 0.5).abs() < f64::EPSILON);
    }

    #[test]
    fn test_error_summary_joins_errors() {
        let mut result = ValidationResult::default();
        result.error("a", "first");
        result.error("b", "second");
        assert_eq!(result.error_summary(), "a: first; b: second");
    }
}
