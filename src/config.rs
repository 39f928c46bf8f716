// Application configuration - TOML file with CLI overrides
//
// Precedence: CLI flags > config file > defaults.

use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::downloader::errors::ServiceError;
use crate::downloader::models::{NetworkConfig, Protocol, ResolveOptions};

pub const CONFIG_DIR: &str = "playgrab";
pub const CONFIG_FILE: &str = "config.toml";

/// Output and selection defaults
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Directory derived filenames are placed in
    pub directory: Option<PathBuf>,

    /// Skip episodes whose output name contains any of these words
    pub exclude: Vec<String>,

    pub get_all_subtitles: bool,

    pub include_clips: bool,

    /// Preferred bitrate in kbps
    pub quality: Option<u32>,

    pub flexible_quality: u32,

    /// hls, dash, hds or rtmp
    pub preferred: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub network: NetworkConfig,
    pub output: OutputConfig,
}

impl AppConfig {
    /// `<config dir>/playgrab/config.toml`
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join(CONFIG_DIR).join(CONFIG_FILE))
    }

    pub fn from_toml_str(raw: &str) -> Result<Self, ServiceError> {
        toml::from_str(raw).map_err(|e| ServiceError::Config(format!("Invalid config: {}", e)))
    }

    /// Load an explicit path (must exist) or the default path (may be absent)
    pub fn load(explicit: Option<&Path>) -> Result<Self, ServiceError> {
        let path = match explicit {
            Some(path) => path.to_path_buf(),
            None => match Self::default_path() {
                Some(path) if path.exists() => path,
                _ => {
                    debug!("No config file, using defaults");
                    return Ok(Self::default());
                }
            },
        };

        let raw = fs::read_to_string(&path).map_err(|e| {
            ServiceError::Config(format!("Can't read {}: {}", path.display(), e))
        })?;
        let config = Self::from_toml_str(&raw)?;
        info!(path = %path.display(), "Loaded config");
        Ok(config)
    }

    pub fn with_proxy(mut self, proxy: Option<String>) -> Self {
        if proxy.is_some() {
            self.network.proxy = proxy;
        }
        self
    }

    pub fn with_timeout(mut self, timeout_seconds: Option<u32>) -> Self {
        if timeout_seconds.is_some() {
            self.network.timeout_seconds = timeout_seconds;
        }
        self
    }

    pub fn with_directory(mut self, directory: Option<PathBuf>) -> Self {
        if directory.is_some() {
            self.output.directory = directory;
        }
        self
    }

    /// Options snapshot seeded from the file's output section
    pub fn resolve_options(&self) -> Result<ResolveOptions, ServiceError> {
        let preferred = self
            .output
            .preferred
            .as_deref()
            .map(str::parse::<Protocol>)
            .transpose()
            .map_err(ServiceError::Config)?;

        // A trailing separator marks the hint as a directory for the deriver
        let output = self.output.directory.as_ref().map(|dir| {
            let mut raw = dir.as_os_str().to_os_string();
            if !dir.to_string_lossy().ends_with(std::path::MAIN_SEPARATOR) {
                raw.push(std::path::MAIN_SEPARATOR.to_string());
            }
            PathBuf::from(raw)
        });

        Ok(ResolveOptions::default()
            .with_output(output)
            .with_exclude(self.output.exclude.clone())
            .with_get_all_subtitles(self.output.get_all_subtitles)
            .with_include_clips(self.output.include_clips)
            .with_quality(self.output.quality, self.output.flexible_quality)
            .with_preferred(preferred))
    }
}
