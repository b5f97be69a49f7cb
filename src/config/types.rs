//! Core configuration types and loading.

use serde::Deserialize;
use std::path::Path;
use thiserror::Error;

use super::defaults::{
    default_client_queue, default_metrics_port, default_queue_capacity, default_server_name,
};
use super::listen::ListenConfig;

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
}

impl ConfigError {
    /// Get a static error code string for metrics labeling.
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::Io(_) => "io",
            Self::Parse(_) => "parse",
        }
    }
}

/// Daemon configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    /// Server information.
    #[serde(default)]
    pub server: ServerConfig,
    /// WebSocket listen configuration.
    #[serde(default)]
    pub listen: ListenConfig,
    /// Request serializer and fan-out tuning.
    #[serde(default)]
    pub kernel: KernelConfig,
    /// Log output configuration.
    #[serde(default)]
    pub log: LogConfig,
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }

    /// Load `path` if it exists, otherwise fall back to built-in defaults.
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        if path.as_ref().exists() {
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }
}

/// Server identity configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Server name, used in logs.
    #[serde(default = "default_server_name")]
    pub name: String,
    /// Prometheus metrics HTTP port (default: 9090, 0 disables).
    #[serde(default = "default_metrics_port")]
    pub metrics_port: u16,
    /// Number of simulated actors to run against the kernel (default: 0).
    #[serde(default)]
    pub actors: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            name: default_server_name(),
            metrics_port: default_metrics_port(),
            actors: 0,
        }
    }
}

/// Kernel tuning.
#[derive(Debug, Clone, Deserialize)]
pub struct KernelConfig {
    /// Pending requests buffered ahead of the worker (default: 1024).
    /// Callers wait for a slot when the queue is full.
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,
    /// Notifications buffered per client before it is evicted (default: 256).
    #[serde(default = "default_client_queue")]
    pub client_queue: usize,
    /// Answer logins for unknown accounts with "Invalid credentials" instead
    /// of "Unknown user" (default: false).
    #[serde(default)]
    pub conceal_unknown_users: bool,
}

impl Default for KernelConfig {
    fn default() -> Self {
        Self {
            queue_capacity: default_queue_capacity(),
            client_queue: default_client_queue(),
            conceal_unknown_users: false,
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human-readable lines.
    #[default]
    Pretty,
    /// One JSON object per line.
    Json,
}

/// Logging configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LogConfig {
    #[serde(default)]
    pub format: LogFormat,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn empty_config_uses_defaults() {
        let config: Config = toml::from_str("").unwrap();
        assert_eq!(config.server.name, "buzzd");
        assert_eq!(config.server.metrics_port, 9090);
        assert_eq!(config.kernel.queue_capacity, 1024);
        assert_eq!(config.kernel.client_queue, 256);
        assert!(!config.kernel.conceal_unknown_users);
        assert_eq!(config.log.format, LogFormat::Pretty);
        assert_eq!(config.listen.address.port(), 8080);
    }

    #[test]
    fn load_reads_toml_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
[server]
name = "test.buzz"
metrics_port = 0
actors = 3

[listen]
address = "127.0.0.1:9001"
allow_origins = ["https://buzz.example"]

[kernel]
client_queue = 8
conceal_unknown_users = true

[log]
format = "json"
"#
        )
        .unwrap();

        let config = Config::load(file.path()).unwrap();
        assert_eq!(config.server.name, "test.buzz");
        assert_eq!(config.server.metrics_port, 0);
        assert_eq!(config.server.actors, 3);
        assert_eq!(config.listen.address.port(), 9001);
        assert_eq!(config.listen.allow_origins, vec!["https://buzz.example"]);
        assert_eq!(config.kernel.client_queue, 8);
        assert_eq!(config.kernel.queue_capacity, 1024);
        assert!(config.kernel.conceal_unknown_users);
        assert_eq!(config.log.format, LogFormat::Json);
    }

    #[test]
    fn load_or_default_tolerates_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load_or_default(dir.path().join("missing.toml")).unwrap();
        assert_eq!(config.server.name, "buzzd");
    }

    #[test]
    fn load_reports_parse_errors() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[kernel]\nqueue_capacity = \"lots\"").unwrap();

        let err = Config::load(file.path()).unwrap_err();
        assert_eq!(err.error_code(), "parse");
    }
}
