//! # Configuration
//!
//! Settings are merged with `figment`, later sources overriding earlier ones:
//!
//! 1. Built-in defaults ([`AppConfig::default`]).
//! 2. A TOML file: the path in `ORDERS_CONFIG`, else `orders.toml` in the
//!    working directory. A missing file is skipped.
//! 3. Environment variables prefixed `ORDERS_`, with `__` between section
//!    and key: `ORDERS_HTTP__ADDR=127.0.0.1:9000`.
//!
//! ```toml
//! [http]
//! addr = "0.0.0.0:8080"
//! request_timeout_secs = 60
//!
//! [cache]
//! capacity = 1000
//!
//! [store]
//! dir = "/var/lib/orders"   # omit for the in-memory store
//!
//! [ingest]
//! source = "stdin"          # or a path to a newline-delimited JSON file
//!
//! [lifecycle]
//! shutdown_grace_secs = 40
//! ```

use crate::cache::DEFAULT_CAPACITY;
use crate::http::DEFAULT_REQUEST_TIMEOUT;
use crate::lifecycle::DEFAULT_SHUTDOWN_GRACE;
use figment::providers::{Env, Format, Serialized, Toml};
use figment::Figment;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info};

pub const ENV_PREFIX: &str = "ORDERS_";
pub const CONFIG_PATH_VAR: &str = "ORDERS_CONFIG";
pub const DEFAULT_CONFIG_FILE: &str = "orders.toml";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to load configuration: {0}")]
    Load(#[from] Box<figment::Error>),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

impl From<figment::Error> for ConfigError {
    fn from(e: figment::Error) -> Self {
        ConfigError::Load(Box::new(e))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub http: HttpConfig,
    pub cache: CacheConfig,
    pub store: StoreConfig,
    pub ingest: IngestConfig,
    pub lifecycle: LifecycleConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    pub addr: String,
    pub request_timeout_secs: u64,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            addr: "0.0.0.0:8080".to_string(),
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT.as_secs(),
        }
    }
}

impl HttpConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    pub capacity: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            capacity: DEFAULT_CAPACITY,
        }
    }
}

/// Without a directory the in-memory store is used.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    pub dir: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IngestConfig {
    pub source: String,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            source: "stdin".to_string(),
        }
    }
}

/// Where ingested messages come from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IngestSource {
    Stdin,
    File(PathBuf),
}

impl IngestConfig {
    pub fn source(&self) -> IngestSource {
        match self.source.as_str() {
            "stdin" | "-" => IngestSource::Stdin,
            path => IngestSource::File(PathBuf::from(path)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LifecycleConfig {
    pub shutdown_grace_secs: u64,
}

impl Default for LifecycleConfig {
    fn default() -> Self {
        Self {
            shutdown_grace_secs: DEFAULT_SHUTDOWN_GRACE.as_secs(),
        }
    }
}

impl LifecycleConfig {
    pub fn shutdown_grace(&self) -> Duration {
        Duration::from_secs(self.shutdown_grace_secs)
    }
}

/// Builds an [`AppConfig`] from defaults, a TOML file and the environment.
#[derive(Debug, Clone, Default)]
pub struct ConfigLoader {
    config_path: Option<PathBuf>,
}

impl ConfigLoader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Uses `path` instead of `ORDERS_CONFIG` / `orders.toml`.
    pub fn with_config_path(mut self, path: impl AsRef<Path>) -> Self {
        self.config_path = Some(path.as_ref().to_path_buf());
        self
    }

    pub fn load(&self) -> Result<AppConfig, ConfigError> {
        let mut figment = Figment::new().merge(Serialized::defaults(AppConfig::default()));

        let path = self.resolve_path();
        if path.exists() {
            info!(path = %path.display(), "Loading configuration file");
            figment = figment.merge(Toml::file(&path));
        } else {
            debug!(path = %path.display(), "No configuration file, using defaults");
        }

        let config: AppConfig = figment
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
            .extract()?;
        validate(&config)?;
        Ok(config)
    }

    fn resolve_path(&self) -> PathBuf {
        if let Some(path) = &self.config_path {
            return path.clone();
        }
        std::env::var_os(CONFIG_PATH_VAR)
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE))
    }
}

fn validate(config: &AppConfig) -> Result<(), ConfigError> {
    let invalid = |msg: &str| Err(ConfigError::Invalid(msg.to_string()));

    if config.http.addr.trim().is_empty() {
        return invalid("http.addr cannot be empty");
    }
    if config.http.request_timeout_secs == 0 {
        return invalid("http.request_timeout_secs cannot be 0");
    }
    if config.cache.capacity == 0 {
        return invalid("cache.capacity cannot be 0");
    }
    if config.lifecycle.shutdown_grace_secs == 0 {
        return invalid("lifecycle.shutdown_grace_secs cannot be 0");
    }
    if config.ingest.source.trim().is_empty() {
        return invalid("ingest.source cannot be empty");
    }
    Ok(())
}
