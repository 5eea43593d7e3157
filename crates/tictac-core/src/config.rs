//! Configuration loading and typed config structures for the session service.
//!
//! The configuration lives in `tictac-config.yaml` next to the binary (or
//! wherever `TICTAC_CONFIG` points). Every field has a default, so a missing
//! file or an empty document yields a runnable single-session setup.

use std::path::Path;

use serde::Deserialize;
use uuid::Uuid;

/// Default configuration file name.
pub const CONFIG_FILE: &str = "tictac-config.yaml";

/// Environment variable naming an alternative configuration file.
pub const CONFIG_ENV: &str = "TICTAC_CONFIG";

/// Errors that can occur when loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read the configuration file from disk.
    #[error("failed to read config file: {source}")]
    Io {
        /// The underlying I/O error.
        #[from]
        source: std::io::Error,
    },

    /// Failed to parse YAML content.
    #[error("failed to parse config YAML: {source}")]
    Yaml {
        /// The underlying YAML parse error.
        source: serde_yml::Error,
    },

    /// An environment override holds an unusable value.
    #[error("invalid value for {var}: {value}")]
    InvalidOverride {
        /// The environment variable.
        var: &'static str,
        /// The rejected value.
        value: String,
    },
}

impl From<serde_yml::Error> for ConfigError {
    fn from(source: serde_yml::Error) -> Self {
        Self::Yaml { source }
    }
}

/// Top-level service configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct TictacConfig {
    /// Listener settings.
    #[serde(default)]
    pub server: ServerConfig,

    /// Which session this instance serves and under which identity.
    #[serde(default)]
    pub session: SessionConfig,

    /// Backplane connection strings.
    #[serde(default)]
    pub infrastructure: InfrastructureConfig,

    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl TictacConfig {
    /// Load configuration from a YAML file and apply environment overrides.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] if the file cannot be read,
    /// [`ConfigError::Yaml`] if the content is not valid YAML, or
    /// [`ConfigError::InvalidOverride`] if an override cannot be parsed.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        let mut config = Self::parse(&contents)?;
        config.apply_env_overrides()?;
        Ok(config)
    }

    /// Load `TICTAC_CONFIG` (or `tictac-config.yaml`), falling back to
    /// defaults when the file does not exist. Environment overrides apply
    /// either way.
    ///
    /// # Errors
    ///
    /// Same as [`TictacConfig::from_file`], except a missing file.
    pub fn load() -> Result<Self, ConfigError> {
        let path = std::env::var(CONFIG_ENV).unwrap_or_else(|_| CONFIG_FILE.to_owned());
        let path = Path::new(&path);
        if path.exists() {
            return Self::from_file(path);
        }
        let mut config = Self::default();
        config.apply_env_overrides()?;
        Ok(config)
    }

    /// Parse configuration from a YAML string. No overrides are applied.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Yaml`] if the string is not valid YAML.
    pub fn parse(yaml: &str) -> Result<Self, ConfigError> {
        if yaml.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yml::from_str(yaml)?)
    }

    /// Override values from the process environment.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidOverride`] for an unparsable `PORT`
    /// or `INSTANCE_ID`.
    pub fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        self.apply_overrides(|var| std::env::var(var).ok())
    }

    /// Override values from `lookup`, which maps a variable name to its value.
    ///
    /// - `DRAGONFLY_URL` overrides `infrastructure.dragonfly_url`
    /// - `NATS_URL` overrides `infrastructure.nats_url`
    /// - `PORT` overrides `server.port`
    /// - `SESSION_ID` overrides `session.id`
    /// - `INSTANCE_ID` overrides `session.instance_id`
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidOverride`] for an unparsable `PORT`
    /// or `INSTANCE_ID`.
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(val) = lookup("DRAGONFLY_URL") {
            self.infrastructure.dragonfly_url = val;
        }
        if let Some(val) = lookup("NATS_URL") {
            self.infrastructure.nats_url = val;
        }
        if let Some(val) = lookup("PORT") {
            self.server.port = val.parse().map_err(|e| ConfigError::InvalidOverride {
                var: "PORT",
                value: format!("{val} ({e})"),
            })?;
        }
        if let Some(val) = lookup("SESSION_ID") {
            self.session.id = val;
        }
        if let Some(val) = lookup("INSTANCE_ID") {
            let id = Uuid::parse_str(&val).map_err(|e| ConfigError::InvalidOverride {
                var: "INSTANCE_ID",
                value: format!("{val} ({e})"),
            })?;
            self.session.instance_id = Some(id);
        }
        Ok(())
    }
}

/// Listener settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ServerConfig {
    /// Bind address.
    #[serde(default = "default_host")]
    pub host: String,

    /// Bind port.
    #[serde(default = "default_port")]
    pub port: u16,

    /// Seconds between keep-alive pings on idle connections.
    #[serde(default = "default_keepalive_secs")]
    pub keepalive_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            keepalive_secs: default_keepalive_secs(),
        }
    }
}

/// Session selection.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SessionConfig {
    /// Session id shared by every instance serving the same game.
    #[serde(default = "default_session_id")]
    pub id: String,

    /// Fixed instance identity; a random one is generated when absent.
    #[serde(default)]
    pub instance_id: Option<Uuid>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            id: default_session_id(),
            instance_id: None,
        }
    }
}

/// Which backplane implementation to run on.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Backend {
    /// `Dragonfly` store and NATS bus, shared with other instances.
    #[default]
    Remote,
    /// In-process store and bus; a standalone single instance.
    Memory,
}

/// Backplane connection strings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct InfrastructureConfig {
    /// Dragonfly (Redis-compatible) URL.
    #[serde(default = "default_dragonfly_url")]
    pub dragonfly_url: String,

    /// NATS messaging URL.
    #[serde(default = "default_nats_url")]
    pub nats_url: String,

    /// Prefix of the sync bus channel names.
    #[serde(default = "default_channel_prefix")]
    pub channel_prefix: String,

    /// Backplane implementation.
    #[serde(default)]
    pub backend: Backend,
}

impl Default for InfrastructureConfig {
    fn default() -> Self {
        Self {
            dragonfly_url: default_dragonfly_url(),
            nats_url: default_nats_url(),
            channel_prefix: default_channel_prefix(),
            backend: Backend::default(),
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    /// Human-readable lines.
    #[default]
    Pretty,
    /// One JSON object per event.
    Json,
}

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error). `RUST_LOG` wins when set.
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Output format.
    #[serde(default)]
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: LogFormat::default(),
        }
    }
}

// ---------------------------------------------------------------------------
// Default value functions for serde
// ---------------------------------------------------------------------------

fn default_host() -> String {
    "0.0.0.0".to_owned()
}

const fn default_port() -> u16 {
    3001
}

const fn default_keepalive_secs() -> u64 {
    20
}

fn default_session_id() -> String {
    "default".to_owned()
}

fn default_dragonfly_url() -> String {
    "redis://localhost:6379".to_owned()
}

fn default_nats_url() -> String {
    "nats://localhost:4222".to_owned()
}

fn default_channel_prefix() -> String {
    "tic_tac_toe".to_owned()
}

fn default_log_level() -> String {
    "info".to_owned()
}
