//! Configuration types.
//!
//! Configuration lives in `~/.config/relay/config.toml`. Every section and
//! key is optional; missing values fall back to the defaults below.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::ConfigError;

/// Runtime configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RelayConfig {
    /// Report download settings
    #[serde(default)]
    pub download: DownloadConfig,

    /// Client environment settings
    #[serde(default)]
    pub client: ClientConfig,

    /// Modal layering settings
    #[serde(default)]
    pub modal: ModalConfig,
}

/// Report download configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DownloadConfig {
    /// Server origin, e.g. "http://localhost:8069"
    pub base_url: String,

    /// Download endpoint path
    pub url: String,

    /// Where downloaded files are written. `~/` is expanded.
    pub output_dir: Option<PathBuf>,

    /// Request timeout in seconds
    pub timeout_secs: u64,
}

impl Default for DownloadConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8069".to_string(),
            url: "/get_reports".to_string(),
            output_dir: None,
            timeout_secs: 120,
        }
    }
}

impl DownloadConfig {
    /// Output directory with `~/` expanded, falling back to the user's
    /// download directory and then the working directory.
    pub fn resolved_output_dir(&self) -> PathBuf {
        match &self.output_dir {
            Some(dir) => expand_home(dir),
            None => dirs::download_dir().unwrap_or_else(|| PathBuf::from(".")),
        }
    }
}

/// Client environment configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ClientConfig {
    /// IANA time-zone override, e.g. "Europe/Brussels"
    pub timezone: Option<String>,
}

/// Default z-indices for modal surfaces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModalConfig {
    pub modal_z_index: i32,
    pub backdrop_z_index: i32,
}

impl Default for ModalConfig {
    fn default() -> Self {
        Self {
            modal_z_index: 1050,
            backdrop_z_index: 1040,
        }
    }
}

impl RelayConfig {
    /// Load from the default config path.
    ///
    /// A missing file is not an error; defaults are returned.
    pub fn load() -> Result<Self, ConfigError> {
        let path = config_path().ok_or(ConfigError::NoConfigDir)?;
        if !path.exists() {
            tracing::info!("No config found at {:?}, using defaults", path);
            return Ok(Self::default());
        }
        Self::load_from(&path)
    }

    /// Load from an explicit path.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|e| ConfigError::Io(e.to_string()))?;
        let config: RelayConfig =
            toml::from_str(&text).map_err(|e| ConfigError::Parse(e.to_string()))?;
        tracing::debug!("Loaded config from {:?}", path);
        Ok(config)
    }

    /// Render as TOML.
    pub fn to_toml_string(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    /// Write to `path` unless a file already exists there.
    ///
    /// Returns `false` when an existing file was left alone.
    pub fn write_new(&self, path: &Path) -> Result<bool, ConfigError> {
        use std::io::Write;

        let text = self.to_toml_string()?;
        let mut file = match std::fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(path)
        {
            Ok(file) => file,
            Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => return Ok(false),
            Err(e) => return Err(ConfigError::Io(e.to_string())),
        };
        file.write_all(text.as_bytes())
            .map_err(|e| ConfigError::Io(e.to_string()))?;
        tracing::info!("Wrote config to {:?}", path);
        Ok(true)
    }

    /// Create the default config file at the default path if there is none.
    pub fn init_default() -> Result<PathBuf, ConfigError> {
        ensure_config_dir().map_err(|e| ConfigError::Io(e.to_string()))?;
        let path = config_path().ok_or(ConfigError::NoConfigDir)?;
        if !Self::default().write_new(&path)? {
            tracing::info!("Config already exists at {:?}", path);
        }
        Ok(path)
    }
}

/// Get the config directory path.
pub fn config_dir() -> Option<PathBuf> {
    dirs::config_dir().map(|p| p.join("relay"))
}

/// Get the path to config.toml.
pub fn config_path() -> Option<PathBuf> {
    config_dir().map(|p| p.join("config.toml"))
}

/// Ensure the config directory exists.
pub fn ensure_config_dir() -> std::io::Result<()> {
    if let Some(dir) = config_dir() {
        std::fs::create_dir_all(dir)?;
    }
    Ok(())
}

fn expand_home(path: &Path) -> PathBuf {
    match path.strip_prefix("~") {
        Ok(rest) => dirs::home_dir()
            .map(|home| home.join(rest))
            .unwrap_or_else(|| path.to_path_buf()),
        Err(_) => path.to_path_buf(),
    }
}
