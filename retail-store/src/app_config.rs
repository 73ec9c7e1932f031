use serde::Deserialize;
use std::env;
use std::path::PathBuf;
use std::time::Duration;

use retail_pricing::PricingPolicy;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub server: ServerConfig,
    pub dataset: DatasetConfig,
    #[serde(default)]
    pub forecast: ForecastConfig,
    #[serde(default)]
    pub pricing: PricingPolicy,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub port: u16,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DatasetConfig {
    /// CSV of historical sales, loaded once at startup
    pub path: PathBuf,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ForecastConfig {
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
    /// Coverage of the forecast confidence interval
    #[serde(default = "default_interval_width")]
    pub interval_width: f64,
}

fn default_timeout_ms() -> u64 { 2000 }
fn default_interval_width() -> f64 { 0.90 }

impl Default for ForecastConfig {
    fn default() -> Self {
        Self {
            timeout_ms: default_timeout_ms(),
            interval_width: default_interval_width(),
        }
    }
}

impl ForecastConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

impl Config {
    pub fn load() -> Result<Self, config::ConfigError> {
        let run_mode = env::var("RUN_MODE").unwrap_or_else(|_| "development".into());

        let s = config::Config::builder()
            .add_source(config::File::with_name("config/default"))
            // Per-environment overrides, optional
            .add_source(config::File::with_name(&format!("config/{}", run_mode)).required(false))
            // Local overrides, not checked in
            .add_source(config::File::with_name("config/local").required(false))
            // Eg. `RETAIL__SERVER__PORT=9000` sets `server.port`
            .add_source(config::Environment::with_prefix("RETAIL").separator("__"))
            .build()?;

        s.try_deserialize()
    }
}
