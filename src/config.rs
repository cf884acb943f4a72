use anyhow::{Context, Result};
use directories::ProjectDirs;
use indexmap::IndexMap;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::{fs, path::PathBuf};
use tracing::debug;

pub const DEFAULT_CBR_BASE_URL: &str = "https://www.cbr-xml-daily.ru";

fn default_retries() -> usize {
    2
}

fn default_retry_delay_ms() -> u64 {
    500
}

fn default_refresh_minutes() -> u64 {
    5
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct CbrProviderConfig {
    pub base_url: String,
    /// Retry attempts for transient feed failures.
    #[serde(default = "default_retries")]
    pub retries: usize,
    #[serde(default = "default_retry_delay_ms")]
    pub retry_delay_ms: u64,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ProvidersConfig {
    pub cbr: Option<CbrProviderConfig>,
}

impl Default for ProvidersConfig {
    fn default() -> Self {
        ProvidersConfig {
            cbr: Some(CbrProviderConfig {
                base_url: DEFAULT_CBR_BASE_URL.to_string(),
                retries: default_retries(),
                retry_delay_ms: default_retry_delay_ms(),
            }),
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct AppConfig {
    /// Initial balance, currency code to amount. Order is preserved and
    /// drives the order of the published cross-rate pairs.
    pub balance: IndexMap<String, Decimal>,
    #[serde(default)]
    pub providers: ProvidersConfig,
    /// Cadence of the watch command, in minutes.
    #[serde(default = "default_refresh_minutes")]
    pub refresh_minutes: u64,
}

impl AppConfig {
    pub fn load() -> Result<Self> {
        debug!("Loading default config");
        let config_path = Self::default_config_path()?;
        Self::load_from_path(&config_path)
    }

    pub fn default_config_path() -> Result<PathBuf> {
        let proj_dirs =
            ProjectDirs::from("", "", "fxb").context("Could not determine project directories")?;
        Ok(proj_dirs.config_dir().join("config.yaml"))
    }

    pub fn load_from_path<P: AsRef<std::path::Path>>(path: P) -> Result<Self> {
        let config_str = fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read config file: {}", path.as_ref().display()))?;

        let config: Self = serde_yaml::from_str(&config_str)
            .with_context(|| format!("Failed to parse config file: {}", path.as_ref().display()))?;
        debug!("Successfully loaded config");
        Ok(config)
    }
}
