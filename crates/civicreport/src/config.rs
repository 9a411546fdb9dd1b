//! Configuration management for civicreport.
//!
//! This module provides configuration loading and validation using figment,
//! supporting TOML config files, environment variables, and defaults.

use std::path::PathBuf;
use std::time::Duration;

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "config.toml";

/// Default data directory name.
const DATA_DIR_NAME: &str = "civicreport";

/// Default database file name.
const DATABASE_FILE_NAME: &str = "issues.db";

/// Default media directory name.
const MEDIA_DIR_NAME: &str = "media";

/// Default session file name.
const SESSION_FILE_NAME: &str = "session.json";

/// Bucket attachments are stored in.
const DEFAULT_MEDIA_BUCKET: &str = "issue-media";

/// Upload limit advertised to citizens: 10 MiB per file.
const DEFAULT_MAX_UPLOAD_BYTES: u64 = 10 * 1024 * 1024;

/// Environment variable prefix.
const ENV_PREFIX: &str = "CIVICREPORT_";

/// Application configuration.
///
/// Configuration is loaded from (in order of precedence, highest first):
/// 1. Environment variables (prefixed with `CIVICREPORT_`, sections split by `__`)
/// 2. TOML config file at `~/.config/civicreport/config.toml`
/// 3. Default values
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Which collaborators to use.
    pub backend: BackendKind,
    /// Local storage configuration.
    pub storage: StorageConfig,
    /// Hosted backend configuration.
    pub remote: RemoteConfig,
    /// Session configuration.
    pub session: SessionConfig,
}

/// Which object and record store implementation to use.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    /// Files on disk and a `SQLite` database.
    #[default]
    Local,
    /// The hosted REST API.
    Remote,
}

impl std::fmt::Display for BackendKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Local => write!(f, "local"),
            Self::Remote => write!(f, "remote"),
        }
    }
}

/// Local storage configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Path to the issue database.
    /// Defaults to `~/.local/share/civicreport/issues.db`
    pub database_path: Option<PathBuf>,
    /// Directory attachments are written to.
    /// Defaults to `~/.local/share/civicreport/media`
    pub media_dir: Option<PathBuf>,
    /// Bucket name for attachments (also used by the remote backend).
    pub media_bucket: String,
    /// Base URL local attachments are served from.
    /// Defaults to a `file://` URL of the media directory.
    pub public_base_url: Option<String>,
    /// Largest accepted attachment, in bytes.
    pub max_upload_bytes: u64,
}

/// Hosted backend configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RemoteConfig {
    /// Project base URL, e.g. `https://xyz.supabase.co`.
    pub url: Option<String>,
    /// Public API key sent with every request.
    pub api_key: Option<String>,
    /// Request timeout in seconds.
    pub timeout_secs: u64,
}

/// Session configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Path to the session file.
    /// Defaults to `~/.local/share/civicreport/session.json`
    pub path: Option<PathBuf>,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database_path: None,
            media_dir: None,
            media_bucket: DEFAULT_MEDIA_BUCKET.to_string(),
            public_base_url: None,
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
        }
    }
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            url: None,
            api_key: None,
            timeout_secs: 30,
        }
    }
}

impl Config {
    /// Load configuration from all sources.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration loading or parsing fails.
    pub fn load() -> Result<Self> {
        Self::load_from(None)
    }

    /// Load configuration with an optional custom config path.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration loading, parsing or validation fails.
    pub fn load_from(config_path: Option<PathBuf>) -> Result<Self> {
        let config_file = config_path.unwrap_or_else(Self::default_config_path);
        Self::from_figment(Self::figment(config_file))
    }

    /// The provider stack: defaults, then the TOML file, then the environment.
    fn figment(config_file: PathBuf) -> Figment {
        Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Toml::file(config_file))
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
    }

    fn from_figment(figment: Figment) -> Result<Self> {
        let config: Config = figment.extract()?;
        config.validate()?;
        Ok(config)
    }

    /// Get the default configuration file path.
    #[must_use]
    pub fn default_config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from(".config"))
            .join(DATA_DIR_NAME)
            .join(CONFIG_FILE_NAME)
    }

    /// Get the default data directory path.
    #[must_use]
    pub fn default_data_dir() -> PathBuf {
        dirs::data_local_dir()
            .unwrap_or_else(|| PathBuf::from(".local/share"))
            .join(DATA_DIR_NAME)
    }

    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if any configuration values are invalid.
    pub fn validate(&self) -> Result<()> {
        let bucket = &self.storage.media_bucket;
        if bucket.is_empty() || bucket.contains('/') {
            return Err(Error::ConfigValidation {
                message: format!("media_bucket must be a single non-empty name, got '{bucket}'"),
            });
        }

        if self.storage.max_upload_bytes == 0 {
            return Err(Error::ConfigValidation {
                message: "max_upload_bytes must be greater than 0".to_string(),
            });
        }

        if self.backend == BackendKind::Remote {
            match self.remote.url.as_deref() {
                None | Some("") => {
                    return Err(Error::ConfigValidation {
                        message: "remote backend requires remote.url".to_string(),
                    })
                }
                Some(url) if !(url.starts_with("http://") || url.starts_with("https://")) => {
                    return Err(Error::ConfigValidation {
                        message: format!("remote.url must be an http(s) URL, got '{url}'"),
                    })
                }
                Some(_) => {}
            }
            if self.remote.api_key.as_deref().unwrap_or_default().is_empty() {
                return Err(Error::ConfigValidation {
                    message: "remote backend requires remote.api_key".to_string(),
                });
            }
            if self.remote.timeout_secs == 0 {
                return Err(Error::ConfigValidation {
                    message: "remote.timeout_secs must be greater than 0".to_string(),
                });
            }
        }

        Ok(())
    }

    /// Get the database path, resolving defaults if not set.
    #[must_use]
    pub fn database_path(&self) -> PathBuf {
        self.storage
            .database_path
            .clone()
            .unwrap_or_else(|| Self::default_data_dir().join(DATABASE_FILE_NAME))
    }

    /// Get the media directory, resolving defaults if not set.
    #[must_use]
    pub fn media_dir(&self) -> PathBuf {
        self.storage
            .media_dir
            .clone()
            .unwrap_or_else(|| Self::default_data_dir().join(MEDIA_DIR_NAME))
    }

    /// Get the base URL for local attachments, resolving defaults if not set.
    #[must_use]
    pub fn public_base_url(&self) -> String {
        self.storage
            .public_base_url
            .clone()
            .unwrap_or_else(|| format!("file://{}", self.media_dir().display()))
    }

    /// Get the session file path, resolving defaults if not set.
    #[must_use]
    pub fn session_path(&self) -> PathBuf {
        self.session
            .path
            .clone()
            .unwrap_or_else(|| Self::default_data_dir().join(SESSION_FILE_NAME))
    }

    /// Get the remote request timeout as a Duration.
    #[must_use]
    pub fn remote_timeout(&self) -> Duration {
        Duration::from_secs(self.remote.timeout_secs)
    }
}
