// ⚙️ Configuration - environment variables, optionally seeded from `.env`

use anyhow::{Context, Result};
use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_COUNTRIES_URL: &str =
    "https://restcountries.com/v2/all?fields=name,capital,region,population,flag,currencies";
pub const DEFAULT_RATES_URL: &str = "https://open.er-api.com/v6/latest/USD";

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub port: u16,
    pub database_path: PathBuf,
    pub countries_url: String,
    pub rates_url: String,
    pub http_timeout: Duration,
    pub summary_image_path: PathBuf,
    /// Seed for the GDP multiplier. `None` draws from entropy each pass.
    pub gdp_seed: Option<u64>,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            port: 4000,
            database_path: PathBuf::from("countries.db"),
            countries_url: DEFAULT_COUNTRIES_URL.to_string(),
            rates_url: DEFAULT_RATES_URL.to_string(),
            http_timeout: Duration::from_secs(15),
            summary_image_path: PathBuf::from("cache/summary.svg"),
            gdp_seed: None,
        }
    }
}

impl Config {
    /// Load `.env` (if present) and read the process environment.
    pub fn from_env() -> Result<Self> {
        // A missing .env file is normal outside development
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key lookup. Unset or blank keys keep their defaults.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let mut config = Config::default();

        if let Some(port) = get("PORT") {
            config.port = port
                .trim()
                .trim_start_matches(':')
                .parse()
                .with_context(|| format!("PORT must be a port number, got {:?}", port))?;
        }

        if let Some(path) = get("DATABASE_PATH") {
            config.database_path = PathBuf::from(path);
        }

        if let Some(url) = get("COUNTRIES_API_URL") {
            config.countries_url = url;
        }

        if let Some(url) = get("RATES_API_URL") {
            config.rates_url = url;
        }

        if let Some(secs) = get("HTTP_TIMEOUT_SECS") {
            let secs: u64 = secs
                .trim()
                .parse()
                .with_context(|| format!("HTTP_TIMEOUT_SECS must be whole seconds, got {:?}", secs))?;
            config.http_timeout = Duration::from_secs(secs);
        }

        if let Some(path) = get("SUMMARY_IMAGE_PATH") {
            config.summary_image_path = PathBuf::from(path);
        }

        if let Some(seed) = get("GDP_SEED") {
            config.gdp_seed = Some(
                seed.trim()
                    .parse()
                    .with_context(|| format!("GDP_SEED must be an unsigned integer, got {:?}", seed))?,
            );
        }

        Ok(config)
    }

    pub fn bind_addr(&self) -> String {
        format!("0.0.0.0:{}", self.port)
    }
}
