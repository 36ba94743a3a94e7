//! Configuration management.

mod file_config;

pub use file_config::{save_config, write_default_config, ConfigFileError};

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Environment variable prefix for overrides (`EXHIBIT_ASSEMBLER_POLLING__MAX_ATTEMPTS=600`)
pub const ENV_PREFIX: &str = "EXHIBIT_ASSEMBLER";

/// File name searched for in the working directory
pub const LOCAL_CONFIG_FILE: &str = "exhibit-assembler.toml";

/// Application configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Remote generation service
    #[serde(default)]
    pub service: ServiceConfig,

    /// Job polling budget
    #[serde(default)]
    pub polling: PollingConfig,

    /// Reorder history
    #[serde(default)]
    pub sequencer: SequencerConfig,

    /// Product limits
    #[serde(default)]
    pub limits: LimitsConfig,

    /// Local record storage
    #[serde(default)]
    pub storage: StorageConfig,
}

/// Remote generation service settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceConfig {
    /// Base URL all API paths and relative result URLs are resolved against
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Bearer token sent with every request
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_token: Option<String>,

    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,

    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,

    #[serde(default)]
    pub user_agent: Option<String>,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            api_token: std::env::var("EXHIBIT_ASSEMBLER_API_TOKEN").ok(),
            request_timeout_secs: default_request_timeout(),
            connect_timeout_secs: default_connect_timeout(),
            user_agent: None,
        }
    }
}

fn default_base_url() -> String {
    "http://localhost:5000".to_string()
}

fn default_request_timeout() -> u64 {
    120
}

fn default_connect_timeout() -> u64 {
    10
}

/// Polling budget for generation jobs
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PollingConfig {
    /// Fixed wait between status checks
    #[serde(default = "default_interval_secs")]
    pub interval_secs: u64,

    /// Status checks before the job is declared timed out
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self {
            interval_secs: default_interval_secs(),
            max_attempts: default_max_attempts(),
        }
    }
}

impl PollingConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }
}

fn default_interval_secs() -> u64 {
    2
}

fn default_max_attempts() -> u32 {
    300
}

/// Sequencer settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SequencerConfig {
    #[serde(default = "default_undo_depth")]
    pub max_undo_depth: usize,
}

impl Default for SequencerConfig {
    fn default() -> Self {
        Self {
            max_undo_depth: default_undo_depth(),
        }
    }
}

fn default_undo_depth() -> usize {
    50
}

/// Product rules kept out of the code
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LimitsConfig {
    #[serde(default = "default_max_visa_years")]
    pub max_visa_duration_years: u32,

    /// Upload extensions accepted by the normalizer
    #[serde(default = "default_extensions")]
    pub allowed_extensions: Vec<String>,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_visa_duration_years: default_max_visa_years(),
            allowed_extensions: default_extensions(),
        }
    }
}

fn default_max_visa_years() -> u32 {
    3
}

fn default_extensions() -> Vec<String> {
    ["pdf", "jpg", "jpeg", "png"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

/// Where package records are written
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StorageConfig {
    #[serde(default = "default_records_path")]
    pub records_path: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            records_path: default_records_path(),
        }
    }
}

fn default_records_path() -> PathBuf {
    default_data_dir().join("packages.jsonl")
}

/// Per-user data directory
pub fn default_data_dir() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("exhibit-assembler")
}

/// Per-user config directory
pub fn default_config_dir() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("~/.config"))
        .join("exhibit-assembler")
}

/// Look for a config file in the working directory, then the user config directory
pub fn find_config_file() -> Option<PathBuf> {
    let local = PathBuf::from(LOCAL_CONFIG_FILE);
    if local.is_file() {
        return Some(local);
    }

    let user = default_config_dir().join("config.toml");
    if user.is_file() {
        return Some(user);
    }

    None
}

/// `EXHIBIT_ASSEMBLER_<SECTION>__<KEY>` variables
fn env_source() -> config::Environment {
    config::Environment::with_prefix(ENV_PREFIX)
        .prefix_separator("_")
        .separator("__")
}

/// Load configuration from a file, with environment overrides
pub fn load_config(path: &Path) -> Result<Config, config::ConfigError> {
    let settings = config::Config::builder()
        .add_source(config::File::from(path))
        .add_source(env_source())
        .build()?;

    settings.try_deserialize()
}

/// Load configuration from environment variables only
pub fn load_env_config() -> Result<Config, config::ConfigError> {
    let settings = config::Config::builder()
        .add_source(env_source())
        .build()?;

    settings.try_deserialize()
}
