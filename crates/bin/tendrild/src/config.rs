//! Configuration loading: TOML file with environment variable overrides.
//!
//! Looks for `tendril.toml` in the working directory (or the file named by
//! `TENDRIL_CONFIG`). Every field has a sensible default so the file is
//! optional. Environment variables take precedence over file values.

use std::str::FromStr;

use serde::Deserialize;
use tendril_app::trigger_engine::TriggerScope;

/// Top-level configuration.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    /// HTTP server settings.
    pub server: ServerConfig,
    /// Persistence settings.
    pub storage: StorageConfig,
    /// Logging settings.
    pub logging: LoggingConfig,
    /// Metadata of the generated API document.
    pub api: ApiConfig,
    /// Trigger engine settings.
    pub triggers: TriggersConfig,
    /// Device drivers.
    pub drivers: DriversConfig,
}

/// HTTP listener configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Address to bind to (e.g. `0.0.0.0`).
    pub host: String,
    /// TCP port.
    pub port: u16,
}

/// Where records and settings live.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    #[default]
    Sqlite,
    Memory,
}

impl FromStr for Backend {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "sqlite" => Ok(Self::Sqlite),
            "memory" => Ok(Self::Memory),
            other => Err(ConfigError::Validation(format!(
                "unknown storage backend {other:?}"
            ))),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub backend: Backend,
    /// `SQLite` connection URL, used by the `sqlite` backend.
    pub url: String,
}

/// Logging configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Filter directive (`RUST_LOG` syntax).
    pub filter: String,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    pub title: String,
    pub version: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct TriggersConfig {
    /// Which triggers a new reading is matched against.
    pub scope: TriggerScope,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct DriversConfig {
    /// Driver kinds served by the virtual loopback driver.
    pub virtual_kinds: Vec<String>,
}

impl Config {
    /// Load configuration from the config file (if present) then apply
    /// environment-variable overrides.
    ///
    /// # Errors
    ///
    /// Returns an error if the TOML file exists but is malformed, or if the
    /// resulting configuration is invalid.
    pub fn load() -> Result<Self, ConfigError> {
        let path = std::env::var("TENDRIL_CONFIG").unwrap_or_else(|_| "tendril.toml".to_string());
        let mut config = Self::from_file(&path)?;
        config.apply_overrides(|name| std::env::var(name).ok())?;
        config.validate()?;
        Ok(config)
    }

    fn from_file(path: &str) -> Result<Self, ConfigError> {
        match std::fs::read_to_string(path) {
            Ok(content) => toml::from_str(&content).map_err(ConfigError::Parse),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(err) => Err(ConfigError::Io(err)),
        }
    }

    /// Apply overrides read through `var` (the process environment in
    /// [`Config::load`]).
    fn apply_overrides(
        &mut self,
        var: impl Fn(&str) -> Option<String>,
    ) -> Result<(), ConfigError> {
        if let Some(val) = var("TENDRIL_HOST") {
            self.server.host = val;
        }
        if let Some(val) = var("TENDRIL_PORT") {
            self.server.port = parse_port(&val)?;
        }
        if let Some(val) = var("TENDRIL_BIND") {
            let (host, port) = val.rsplit_once(':').ok_or_else(|| {
                ConfigError::Validation(format!("TENDRIL_BIND {val:?} is not host:port"))
            })?;
            self.server.host = host.to_string();
            self.server.port = parse_port(port)?;
        }
        if let Some(val) = var("TENDRIL_STORAGE") {
            self.storage.backend = val.parse()?;
        }
        if let Some(val) = var("TENDRIL_DATABASE_URL") {
            self.storage.url = val;
        }
        if let Some(val) = var("TENDRIL_TRIGGER_SCOPE") {
            self.triggers.scope = val.parse().map_err(ConfigError::Validation)?;
        }
        if let Some(val) = var("TENDRIL_LOG") {
            self.logging.filter = val;
        }
        if let Some(val) = var("RUST_LOG") {
            self.logging.filter = val;
        }
        Ok(())
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.server.port == 0 {
            return Err(ConfigError::Validation("port must be non-zero".to_string()));
        }
        if self.storage.backend == Backend::Sqlite && self.storage.url.trim().is_empty() {
            return Err(ConfigError::Validation(
                "storage.url is required by the sqlite backend".to_string(),
            ));
        }
        if self.drivers.virtual_kinds.iter().any(|kind| kind.trim().is_empty()) {
            return Err(ConfigError::Validation(
                "driver kinds must be non-empty".to_string(),
            ));
        }
        Ok(())
    }

    /// Return the `host:port` bind address.
    #[must_use]
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}

fn parse_port(value: &str) -> Result<u16, ConfigError> {
    value
        .parse()
        .map_err(|_| ConfigError::Validation(format!("invalid port {value:?}")))
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: Backend::Sqlite,
            url: "sqlite:tendril.db?mode=rwc".to_string(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: "tendrild=info,tendril=info,tower_http=debug".to_string(),
        }
    }
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            title: "tendril".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

impl Default for DriversConfig {
    fn default() -> Self {
        Self {
            virtual_kinds: vec!["virtual".to_string()],
        }
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// TOML parse failure.
    #[error("failed to parse config file")]
    Parse(#[from] toml::de::Error),
    /// File I/O failure.
    #[error("failed to read config file")]
    Io(#[from] std::io::Error),
    /// Semantic validation failure.
    #[error("invalid configuration: {0}")]
    Validation(String),
}
