use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use common::config as defaults;
use common::prelude::Options;

const CONFIG_FILE: &str = ".megacli.json";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("unable to read config: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid json config")]
    Invalid,
}

/// JSON config file plus the per-invocation flags layered on top of it.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "PascalCase")]
pub struct Config {
    pub base_url: String,
    pub retries: usize,
    pub download_workers: usize,
    pub upload_workers: usize,
    /// Request timeout, seconds.
    pub time_out: u64,
    pub user: String,
    pub password: String,

    // flags, never read from the file
    #[serde(skip)]
    pub recursive: bool,
    #[serde(skip)]
    pub force: bool,
    #[serde(skip)]
    pub verbose: u8,
    #[serde(skip)]
    pub skip_same_size: bool,
    #[serde(skip)]
    pub skip_error: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            base_url: defaults::API_URL.to_string(),
            retries: defaults::RETRIES,
            download_workers: defaults::DOWNLOAD_WORKERS,
            upload_workers: defaults::UPLOAD_WORKERS,
            time_out: defaults::TIMEOUT.as_secs(),
            user: String::new(),
            password: String::new(),
            recursive: false,
            force: false,
            verbose: 0,
            skip_same_size: false,
            skip_error: false,
        }
    }
}

impl Config {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let data = std::fs::read(path)?;
        serde_json::from_slice(&data).map_err(|_| ConfigError::Invalid)
    }

    pub fn options(&self) -> Options {
        Options {
            base_url: self.base_url.clone(),
            retries: self.retries,
            download_workers: self.download_workers,
            upload_workers: self.upload_workers,
            timeout: Duration::from_secs(self.time_out),
        }
    }
}

pub fn default_path() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(CONFIG_FILE))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let cfg = Config::default();
        assert_eq!(cfg.base_url, "https://eu.api.mega.co.nz");
        assert_eq!(cfg.retries, 10);
        assert_eq!(cfg.download_workers, 3);
        assert_eq!(cfg.upload_workers, 1);
        assert_eq!(cfg.time_out, 10);
    }

    #[test]
    fn test_load_pascal_case_fields() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"BaseUrl":"https://api.example","Retries":2,"DownloadWorkers":5,"UploadWorkers":2,"TimeOut":30,"User":"u@example.com","Password":"pw"}}"#
        )
        .unwrap();

        let cfg = Config::load(file.path()).unwrap();
        assert_eq!(cfg.base_url, "https://api.example");
        assert_eq!(cfg.retries, 2);
        assert_eq!(cfg.download_workers, 5);
        assert_eq!(cfg.upload_workers, 2);
        assert_eq!(cfg.time_out, 30);
        assert_eq!(cfg.user, "u@example.com");
        assert_eq!(cfg.password, "pw");
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"User":"u@example.com","Password":"pw"}}"#).unwrap();

        let cfg = Config::load(file.path()).unwrap();
        assert_eq!(cfg.retries, 10);
        assert_eq!(cfg.user, "u@example.com");
    }

    #[test]
    fn test_invalid_json_is_config_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "not json").unwrap();
        assert!(matches!(
            Config::load(file.path()),
            Err(ConfigError::Invalid)
        ));
    }

    #[test]
    fn test_missing_file_is_io_error() {
        assert!(matches!(
            Config::load(Path::new("/nonexistent/config.json")),
            Err(ConfigError::Io(_))
        ));
    }
}
