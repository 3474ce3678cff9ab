use serde::Deserialize;
use std::env;

use crate::engine::writer::WriterOptions;

#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub logging: LoggingConfig,
    #[serde(default)]
    pub sidecar: SidecarConfig,
    #[serde(default)]
    pub catalog: CatalogConfig,
    #[serde(default)]
    pub writer: WriterOptions,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    pub log_dir: String,
    pub stdout_level: String,
    pub file_level: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SidecarConfig {
    #[serde(default = "default_sidecar_port")]
    pub port: u16,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_millis_to_sleep")]
    pub millis_to_sleep: u64,
    #[serde(default = "default_max_millis_to_sleep")]
    pub max_millis_to_sleep: u64,
    /// Per-attempt timeout.
    #[serde(default = "default_timeout_seconds")]
    pub timeout_seconds: u64,
    /// Concurrent control-plane calls across the whole process.
    #[serde(default = "default_max_pool_size")]
    pub max_pool_size: usize,
    /// How long shutdown waits for snapshot clears before abandoning them.
    #[serde(default = "default_clear_deadline_secs")]
    pub clear_deadline_secs: u64,
}

fn default_sidecar_port() -> u16 {
    9043
}

fn default_max_retries() -> u32 {
    10
}

fn default_millis_to_sleep() -> u64 {
    500
}

fn default_max_millis_to_sleep() -> u64 {
    60_000
}

fn default_timeout_seconds() -> u64 {
    60
}

fn default_max_pool_size() -> usize {
    64
}

fn default_clear_deadline_secs() -> u64 {
    120
}

impl Default for SidecarConfig {
    fn default() -> Self {
        Self {
            port: default_sidecar_port(),
            max_retries: default_max_retries(),
            millis_to_sleep: default_millis_to_sleep(),
            max_millis_to_sleep: default_max_millis_to_sleep(),
            timeout_seconds: default_timeout_seconds(),
            max_pool_size: default_max_pool_size(),
            clear_deadline_secs: default_clear_deadline_secs(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct CatalogConfig {
    #[serde(default = "default_max_entries")]
    pub max_entries: usize,
    #[serde(default = "default_expire_after_access_secs")]
    pub expire_after_access_secs: u64,
}

fn default_max_entries() -> usize {
    128
}

fn default_expire_after_access_secs() -> u64 {
    15 * 60
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            max_entries: default_max_entries(),
            expire_after_access_secs: default_expire_after_access_secs(),
        }
    }
}

pub fn load_settings() -> Result<Settings, config::ConfigError> {
    let config_path = env::var("CASS_BULK_CONFIG").unwrap_or_else(|_| "config".to_string());
    load_settings_from(&config_path)
}

pub fn load_settings_from(path: &str) -> Result<Settings, config::ConfigError> {
    let settings: Settings = config::Config::builder()
        .add_source(config::File::with_name(path))
        .build()?
        .try_deserialize()?;

    Ok(settings)
}
