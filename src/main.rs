use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::{Parser, Subcommand};
use citywx_core::{
    AppError, CacheKind, Config, ConfigError, ProviderKind, StorageKind, WeatherError,
};
use citywx_services::{
    seed_sample_history, CachedSummaryService, CityQuery, HistoryStore, ImportService,
    InMemoryHistoryStore, SqliteHistoryStore, SqliteSummaryCache, SummaryService,
    WeatherSummaryService,
};
use citywx_weather::{
    City, CurrentWeatherProvider, FakeProvider, MemoryCache, OpenWeatherProvider, RetryConfig,
    SimpleTrendAnalyzer, SummaryCache,
};

#[derive(Debug, Parser)]
#[command(name = "citywx", version, about = "City weather summaries with trend analysis")]
struct Cli {
    /// Path to config.toml (defaults to the user config directory)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Print the current temperature, recent average and trend for a city
    Summary { city: String },
    /// Fetch and store the current temperature for one or more cities
    Import {
        #[arg(required = true)]
        cities: Vec<String>,
    },
    /// Insert five days of sample history for a city
    Seed { city: String },
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    if let Err(e) = citywx_core::init() {
        eprintln!("Failed to initialize logging: {:#}", e);
        return ExitCode::FAILURE;
    }

    match run(cli).await {
        Ok(code) => code,
        Err(e) => {
            tracing::error!("{}", e);
            eprintln!("error: {}\n  {}", e.user_message(), e);
            ExitCode::from(u8::try_from(e.exit_code()).unwrap_or(1))
        }
    }
}

async fn run(cli: Cli) -> Result<ExitCode, AppError> {
    let (config, _) =
        Config::load_validated(cli.config.as_deref()).map_err(ConfigError::from)?;
    let app = App::from_config(&config)?;

    match cli.command {
        Command::Summary { city } => {
            let query = CityQuery::parse(Some(city.as_str())).map_err(WeatherError::from)?;
            let summary = app.summaries.get_summary_for_city(query.city()).await?;
            let json = serde_json::to_string_pretty(&summary.to_view())
                .context("Failed to encode summary")?;
            println!("{}", json);
            Ok(ExitCode::SUCCESS)
        }
        Command::Import { cities } => {
            let report = app.importer.import_many(&cities).await;
            for measurement in &report.imported {
                println!(
                    "Imported measurement for {}: {} at {}",
                    measurement.city(),
                    measurement.temperature(),
                    measurement.measured_at()
                );
            }
            for failure in &report.failed {
                eprintln!("Failed to import {:?}: {}", failure.city, failure.error);
            }
            Ok(if report.is_success() {
                ExitCode::SUCCESS
            } else {
                ExitCode::FAILURE
            })
        }
        Command::Seed { city } => {
            let city = City::new(&city)?;
            let store = Arc::clone(&app.store);
            let seeded = tokio::task::spawn_blocking(move || {
                seed_sample_history(store.as_ref(), &city).map(|m| (city, m.len()))
            })
            .await
            .context("Seed task failed")?;
            let (city, count) = seeded?;
            println!("Seeded {} measurements for {}", count, city);
            Ok(ExitCode::SUCCESS)
        }
    }
}

/// Services wired from configuration.
struct App {
    store: Arc<dyn HistoryStore>,
    summaries: Box<dyn WeatherSummaryService>,
    importer: ImportService,
}

impl App {
    fn from_config(config: &Config) -> Result<Self, AppError> {
        let needs_dir = config.storage.kind == StorageKind::Sqlite
            || config.cache.kind == CacheKind::Sqlite;
        if needs_dir {
            std::fs::create_dir_all(&config.data_dir)?;
        }

        let provider = build_provider(config)?;
        let store = build_store(config)?;
        let analyzer = Arc::new(SimpleTrendAnalyzer::new(
            config.trend.stable_threshold_celsius,
        )?);

        let inner = SummaryService::new(Arc::clone(&provider), Arc::clone(&store), analyzer);
        let summaries: Box<dyn WeatherSummaryService> = match build_cache(config) {
            Some(cache) => Box::new(CachedSummaryService::new(
                inner,
                cache,
                config.cache.ttl_secs,
            )?),
            None => Box::new(inner),
        };

        let importer = ImportService::new(provider, Arc::clone(&store));

        Ok(Self {
            store,
            summaries,
            importer,
        })
    }
}

fn build_provider(config: &Config) -> Result<Arc<dyn CurrentWeatherProvider>, AppError> {
    match config.provider.kind {
        ProviderKind::Fake => {
            tracing::info!("Using fake weather provider");
            Ok(Arc::new(FakeProvider::new()))
        }
        ProviderKind::OpenWeather => {
            let api_key = config
                .provider
                .resolved_api_key()
                .context("OpenWeather API key is not configured")?;
            let provider = OpenWeatherProvider::new(
                config.provider.base_url.clone(),
                api_key,
                Duration::from_secs(config.provider.timeout_secs),
            )?
            .with_retry(RetryConfig {
                max_retries: config.provider.max_retries,
                ..RetryConfig::default()
            });
            Ok(Arc::new(provider))
        }
    }
}

fn build_store(config: &Config) -> Result<Arc<dyn HistoryStore>, AppError> {
    match config.storage.kind {
        StorageKind::Sqlite => {
            let path = config.database_path();
            tracing::info!("Using SQLite history at {}", path.display());
            Ok(Arc::new(SqliteHistoryStore::new(path)?))
        }
        StorageKind::Memory => Ok(Arc::new(InMemoryHistoryStore::new())),
    }
}

/// The summary cache is optional: if it cannot be opened the service runs
/// uncached.
fn build_cache(config: &Config) -> Option<Arc<dyn SummaryCache>> {
    match config.cache.kind {
        CacheKind::Disabled => None,
        CacheKind::Memory => Some(Arc::new(MemoryCache::new())),
        CacheKind::Sqlite => {
            let path = config.cache_database_path();
            match SqliteSummaryCache::new(&path) {
                Ok(cache) => Some(Arc::new(cache)),
                Err(e) => {
                    tracing::warn!(
                        "Summary cache at {} unavailable, continuing without it: {}",
                        path.display(),
                        e
                    );
                    None
                }
            }
        }
    }
}
