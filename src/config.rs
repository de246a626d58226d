use listing_submission::{ApiConfig, CaptureConfig, SubmissionConfig};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Name of the optional configuration file next to the working directory
pub const CONFIG_FILE: &str = "plantswap.toml";

/// Environment variable overriding `api.base_url`
pub const BASE_URL_ENV: &str = "PLANTSWAP_BASE_URL";

#[derive(Debug)]
pub enum ConfigError {
    Io(std::io::Error),
    Parse(toml::de::Error),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::Io(e) => write!(f, "Config file error: {}", e),
            ConfigError::Parse(e) => write!(f, "Config parse error: {}", e),
        }
    }
}

impl std::error::Error for ConfigError {}

impl From<std::io::Error> for ConfigError {
    fn from(e: std::io::Error) -> Self {
        ConfigError::Io(e)
    }
}

impl From<toml::de::Error> for ConfigError {
    fn from(e: toml::de::Error) -> Self {
        ConfigError::Parse(e)
    }
}

/// Upload settings as written in the config file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UploadSettings {
    pub max_concurrent_uploads: usize,
    pub max_gallery_selection: usize,
}

impl Default for UploadSettings {
    fn default() -> Self {
        Self {
            max_concurrent_uploads: SubmissionConfig::default().max_concurrent_uploads,
            max_gallery_selection: CaptureConfig::default().max_gallery_selection,
        }
    }
}

/// Application configuration (`plantswap.toml`)
///
/// ```toml
/// [api]
/// base_url = "https://plantswap.example/api/v1/"
///
/// [upload]
/// max_concurrent_uploads = 3
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub api: ApiConfig,
    pub upload: UploadSettings,
}

impl AppConfig {
    pub fn from_toml(s: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(s)?)
    }

    /// Reads `path`; a missing file yields the defaults
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        match std::fs::read_to_string(path) {
            Ok(content) => Self::from_toml(&content),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(e) => Err(e.into()),
        }
    }

    fn apply_base_url_override(&mut self, base_url: Option<String>) {
        if let Some(url) = base_url.filter(|u| !u.trim().is_empty()) {
            log::info!("Using base URL from {}: {}", BASE_URL_ENV, url);
            self.api.base_url = url.trim().to_string();
        }
    }

    /// Config file plus environment override. Errors fall back to defaults.
    pub fn load() -> Self {
        let mut config = match Self::from_file(Path::new(CONFIG_FILE)) {
            Ok(config) => config,
            Err(e) => {
                log::warn!("Ignoring {}: {}", CONFIG_FILE, e);
                Self::default()
            }
        };
        config.apply_base_url_override(std::env::var(BASE_URL_ENV).ok());
        config
    }

    pub fn submission(&self) -> SubmissionConfig {
        SubmissionConfig {
            max_concurrent_uploads: self.upload.max_concurrent_uploads,
        }
    }

    pub fn capture(&self) -> CaptureConfig {
        CaptureConfig {
            max_gallery_selection: self.upload.max_gallery_selection,
        }
    }
}
