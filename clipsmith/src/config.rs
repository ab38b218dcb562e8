// Configuration for clipsmith
//
// Configuration is loaded in order of precedence:
// 1. Environment variables (highest priority)
// 2. Config file (<config dir>/clipsmith/config.toml, or --config <path>)
// 3. Built-in defaults (lowest priority)

use crate::models::DEFAULT_PREVIEW_CHARS;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

pub const ENV_DATABASE: &str = "CLIPSMITH_DB";
pub const ENV_POLL_MS: &str = "CLIPSMITH_POLL_MS";
pub const ENV_LOG: &str = "CLIPSMITH_LOG";

const DEFAULT_POLL_MS: u64 = 500;
const DATABASE_FILE: &str = "clipsmith.db";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoggingConfig {
    /// Log level: trace, debug, info, warn, error
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

/// Application configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// SQLite history file
    pub database_path: PathBuf,

    /// How often the watcher checks the clipboard
    pub poll_interval_ms: u64,

    /// Skip a capture identical to the one before it
    pub suppress_consecutive_duplicates: bool,

    /// Width of one-line previews in listings
    pub preview_chars: usize,

    pub logging: LoggingConfig,
}

/// Logging settings as loaded from config file
#[derive(Debug, Deserialize, Default)]
struct FileLogging {
    level: Option<String>,
}

/// Config file structure, every field optional
#[derive(Debug, Deserialize, Default)]
struct FileConfig {
    database_path: Option<PathBuf>,
    poll_interval_ms: Option<u64>,
    suppress_consecutive_duplicates: Option<bool>,
    preview_chars: Option<usize>,

    /// Optional [logging] section
    logging: Option<FileLogging>,
}

impl Config {
    /// Default config file: <config dir>/clipsmith/config.toml
    pub fn config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("clipsmith").join("config.toml"))
    }

    /// Default history file: <data dir>/clipsmith/clipsmith.db, else ./clipsmith.db
    pub fn default_database_path() -> PathBuf {
        dirs::data_dir()
            .map(|p| p.join("clipsmith").join(DATABASE_FILE))
            .unwrap_or_else(|| PathBuf::from(DATABASE_FILE))
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    /// Load configuration: env > file > defaults.
    ///
    /// An explicit `path` must exist and parse. A broken file at the default
    /// location is reported on stderr and ignored.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let file = match path {
            Some(path) => read_file_config(path)?,
            None => Self::load_default_file(),
        };
        Ok(Self::resolve(file, |key| std::env::var(key).ok()))
    }

    fn load_default_file() -> FileConfig {
        let Some(path) = Self::config_path() else {
            return FileConfig::default();
        };
        if !path.exists() {
            return FileConfig::default();
        }

        read_file_config(&path).unwrap_or_else(|e| {
            // Logging is not up yet, it depends on this config
            eprintln!("Warning: {e}");
            FileConfig::default()
        })
    }

    fn resolve(file: FileConfig, env: impl Fn(&str) -> Option<String>) -> Self {
        // Database: env > file > default
        let database_path = env(ENV_DATABASE)
            .filter(|v| !v.is_empty())
            .map(PathBuf::from)
            .or(file.database_path)
            .unwrap_or_else(Self::default_database_path);

        // Poll interval: env > file > default, zero is not a usable interval
        let poll_interval_ms = env(ENV_POLL_MS)
            .and_then(|v| v.trim().parse().ok())
            .or(file.poll_interval_ms)
            .filter(|ms| *ms > 0)
            .unwrap_or(DEFAULT_POLL_MS);

        let suppress_consecutive_duplicates =
            file.suppress_consecutive_duplicates.unwrap_or(false);

        let preview_chars = file
            .preview_chars
            .filter(|n| *n > 0)
            .unwrap_or(DEFAULT_PREVIEW_CHARS);

        // Log level: env > file > default (RUST_LOG handled in logging)
        let file_logging = file.logging.unwrap_or_default();
        let logging = LoggingConfig {
            level: env(ENV_LOG)
                .or(file_logging.level)
                .unwrap_or_else(|| LoggingConfig::default().level),
        };

        Self {
            database_path,
            poll_interval_ms,
            suppress_consecutive_duplicates,
            preview_chars,
            logging,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::resolve(FileConfig::default(), |_| None)
    }
}

fn read_file_config(path: &Path) -> Result<FileConfig, ConfigError> {
    let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    toml::from_str(&contents).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })
}
