//! Configuration file support.
//!
//! # Configuration File Format
//!
//! ```toml
//! [service]
//! base_url = "https://exhibits.example.com"
//! api_token = "secret"
//! request_timeout_secs = 120
//! connect_timeout_secs = 10
//!
//! [polling]
//! interval_secs = 2
//! max_attempts = 300
//!
//! [sequencer]
//! max_undo_depth = 50
//!
//! [limits]
//! max_visa_duration_years = 3
//! allowed_extensions = ["pdf", "jpg", "jpeg", "png"]
//!
//! [storage]
//! records_path = "~/.local/share/exhibit-assembler/packages.jsonl"
//! ```

use std::path::Path;

use super::Config;

/// Configuration file errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigFileError {
    #[error("IO error: {0}")]
    Io(String),

    #[error("Serialize error: {0}")]
    Serialize(String),
}

/// Write configuration as TOML, creating parent directories
pub fn save_config(config: &Config, path: &Path) -> Result<(), ConfigFileError> {
    let content =
        toml::to_string_pretty(config).map_err(|e| ConfigFileError::Serialize(e.to_string()))?;

    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent).map_err(|e| ConfigFileError::Io(e.to_string()))?;
        }
    }

    std::fs::write(path, content).map_err(|e| ConfigFileError::Io(e.to_string()))
}

/// Write the default configuration, refusing to overwrite an existing file
pub fn write_default_config(path: &Path) -> Result<(), ConfigFileError> {
    write_new_config(Config::default(), path)
}

/// The API token stays in the environment and is never written out
fn write_new_config(mut config: Config, path: &Path) -> Result<(), ConfigFileError> {
    if path.exists() {
        return Err(ConfigFileError::Io(format!(
            "{} already exists",
            path.display()
        )));
    }
    config.service.api_token = None;
    save_config(&config, path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_config_file_save_load() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        let mut config = Config::default();
        config.service.base_url = "https://saved.example.com".to_string();
        config.polling.max_attempts = 42;

        save_config(&config, &path).unwrap();

        let loaded: Config = toml::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(loaded.service.base_url, "https://saved.example.com");
        assert_eq!(loaded.polling.max_attempts, 42);
    }

    #[test]
    fn test_new_config_omits_api_token() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("exhibit-assembler.toml");

        let mut config = Config::default();
        config.service.api_token = Some("sk-live-secret".to_string());
        write_new_config(config, &path).unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        assert!(!content.contains("sk-live-secret"));
        assert!(!content.contains("api_token"));
        assert!(content.contains("max_attempts = 300"));

        assert!(matches!(
            write_default_config(&path),
            Err(ConfigFileError::Io(_))
        ));
    }
}
