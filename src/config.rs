//! Configuration management for packref
//!
//! Registry sources and runtime parameters are resolved once at startup into
//! a [`PackrefConfig`] value that is passed into the aggregator and the
//! converter — there is no process-wide mutable configuration state.
//!
//! Resolution order:
//! 1. `packref.toml` in the working directory, else
//!    `<config dir>/packref/config.toml` (both optional);
//! 2. environment overrides: `PACKREF_SOURCES` (semicolon-separated
//!    `name=url` entries or bare URLs), `PACKREF_REQUEST_TIMEOUT`,
//!    `PACKREF_SEARCH_PAGE_SIZE`, `PACKREF_LOG_LEVEL`;
//! 3. built-in defaults (nuget.org as the only source).
//!
//! A config file that exists but cannot be read or parsed is fatal for the
//! whole run — there is no meaningful per-document fallback.

use std::collections::HashMap;
use std::env;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;

use crate::registry::PackageSource;

/// Global MSBuild-style properties handed to the project loader.
pub type Properties = HashMap<String, String>;

pub const DEFAULT_SOURCE_NAME: &str = "nuget.org";
pub const DEFAULT_SOURCE_URL: &str = "https://api.nuget.org/v3/index.json";
pub const CONFIG_FILE_NAME: &str = "packref.toml";

const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;
const DEFAULT_SEARCH_PAGE_SIZE: usize = 10;
const DEFAULT_LOG_LEVEL: &str = "info";

/// Configuration errors. All of them abort the run.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("invalid package source in {origin}: {reason}")]
    InvalidSource { origin: String, reason: String },

    #[error("invalid property '{entry}': expected KEY=VALUE")]
    InvalidProperty { entry: String },

    #[error("configuration validation failed: {0}")]
    ValidationFailed(String),
}

#[derive(Debug, Default, Deserialize)]
struct ConfigFile {
    #[serde(default)]
    sources: Vec<PackageSource>,
    request_timeout_secs: Option<u64>,
    search_page_size: Option<usize>,
    log_level: Option<String>,
}

/// The run's configuration, immutable once loaded.
#[derive(Debug, Clone)]
pub struct PackrefConfig {
    /// Registries in priority order; the first exact match wins.
    pub sources: Vec<PackageSource>,
    pub request_timeout_secs: u64,
    /// Result page requested per registry search.
    pub search_page_size: usize,
    pub log_level: String,
}

impl Default for PackrefConfig {
    fn default() -> Self {
        Self {
            sources: vec![PackageSource::new(DEFAULT_SOURCE_NAME, DEFAULT_SOURCE_URL)],
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
            search_page_size: DEFAULT_SEARCH_PAGE_SIZE,
            log_level: DEFAULT_LOG_LEVEL.to_string(),
        }
    }
}

impl PackrefConfig {
    /// Loads the run configuration from the ambient settings store.
    pub fn load() -> Result<Self, ConfigError> {
        let file = Self::find_config_file();
        Self::load_with(file.as_deref())
    }

    /// Loads from an explicit config file (or just env + defaults when
    /// `None`). Split out of [`load`](Self::load) for tests.
    pub fn load_with(file: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = match file {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        config.apply_env()?;
        Ok(config)
    }

    fn find_config_file() -> Option<PathBuf> {
        let local = PathBuf::from(CONFIG_FILE_NAME);
        if local.is_file() {
            return Some(local);
        }
        dirs::config_dir()
            .map(|dir| dir.join("packref").join("config.toml"))
            .filter(|path| path.is_file())
    }

    fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let file: ConfigFile = toml::from_str(&text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;

        let defaults = Self::default();
        Ok(Self {
            sources: if file.sources.is_empty() {
                defaults.sources
            } else {
                file.sources
            },
            request_timeout_secs: file
                .request_timeout_secs
                .unwrap_or(defaults.request_timeout_secs),
            search_page_size: file.search_page_size.unwrap_or(defaults.search_page_size),
            log_level: file.log_level.unwrap_or(defaults.log_level),
        })
    }

    fn apply_env(&mut self) -> Result<(), ConfigError> {
        if let Ok(raw) = env::var("PACKREF_SOURCES") {
            let mut sources = Vec::new();
            for entry in raw.split(';').filter(|entry| !entry.trim().is_empty()) {
                let source =
                    PackageSource::parse(entry).map_err(|reason| ConfigError::InvalidSource {
                        origin: "PACKREF_SOURCES".to_string(),
                        reason,
                    })?;
                sources.push(source);
            }
            if sources.is_empty() {
                return Err(ConfigError::InvalidSource {
                    origin: "PACKREF_SOURCES".to_string(),
                    reason: "no sources listed".to_string(),
                });
            }
            self.sources = sources;
        }

        if let Some(timeout) = env::var("PACKREF_REQUEST_TIMEOUT")
            .ok()
            .and_then(|value| value.parse::<u64>().ok())
        {
            self.request_timeout_secs = timeout;
        }
        if let Some(page_size) = env::var("PACKREF_SEARCH_PAGE_SIZE")
            .ok()
            .and_then(|value| value.parse::<usize>().ok())
        {
            self.search_page_size = page_size;
        }
        if let Ok(level) = env::var("PACKREF_LOG_LEVEL") {
            self.log_level = level.to_lowercase();
        }
        Ok(())
    }

    /// Bounds-checks the loaded values.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.sources.is_empty() {
            return Err(ConfigError::ValidationFailed(
                "at least one package source is required".to_string(),
            ));
        }
        for source in &self.sources {
            if !source.url.starts_with("http://") && !source.url.starts_with("https://") {
                return Err(ConfigError::ValidationFailed(format!(
                    "source '{}' has a non-http(s) URL: {}",
                    source.name, source.url
                )));
            }
        }

        if self.request_timeout_secs == 0 || self.request_timeout_secs > 600 {
            return Err(ConfigError::ValidationFailed(
                "request timeout must be between 1 and 600 seconds".to_string(),
            ));
        }
        if self.search_page_size == 0 || self.search_page_size > 100 {
            return Err(ConfigError::ValidationFailed(
                "search page size must be between 1 and 100".to_string(),
            ));
        }

        match self.log_level.as_str() {
            "trace" | "debug" | "info" | "warn" | "error" => Ok(()),
            other => Err(ConfigError::ValidationFailed(format!(
                "invalid log level: {other}. Valid options: trace, debug, info, warn, error"
            ))),
        }
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Parses `--property KEY=VALUE` arguments into the global-properties
    /// map handed to the project loader.
    pub fn parse_properties(entries: &[String]) -> Result<Properties, ConfigError> {
        let mut properties = Properties::new();
        for entry in entries {
            match entry.split_once('=') {
                Some((key, value)) if !key.trim().is_empty() => {
                    properties.insert(key.trim().to_string(), value.to_string());
                }
                _ => {
                    return Err(ConfigError::InvalidProperty {
                        entry: entry.clone(),
                    })
                }
            }
        }
        Ok(properties)
    }
}

impl fmt::Display for PackrefConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Packref Configuration:")?;
        writeln!(f, "  Sources:")?;
        for source in &self.sources {
            writeln!(f, "    {} ({})", source.name, source.url)?;
        }
        writeln!(f, "  Request Timeout: {}s", self.request_timeout_secs)?;
        writeln!(f, "  Search Page Size: {}", self.search_page_size)?;
        writeln!(f, "  Log Level: {}", self.log_level)?;
        Ok(())
    }
}
