//! Server configuration loading from file and environment variables.

use noticeboard_types::EditPolicy;
use serde::Deserialize;
use std::net::{IpAddr, Ipv4Addr};
use thiserror::Error;

/// Top-level server configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    /// Server network settings.
    #[serde(default)]
    pub server: ServerConfig,

    /// Database settings.
    #[serde(default)]
    pub database: DatabaseConfig,

    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Notification behaviour.
    #[serde(default)]
    pub notifications: NotificationsConfig,
}

/// Network configuration for the HTTP server.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Host address to bind to.
    #[serde(default = "default_host")]
    pub host: IpAddr,

    /// Port to listen on.
    #[serde(default = "default_port")]
    pub port: u16,
}

/// Database configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// Path to the SQLite database file.
    #[serde(default = "default_db_path")]
    pub path: String,

    /// SQLite busy timeout in milliseconds.
    #[serde(default = "default_busy_timeout_ms")]
    pub busy_timeout_ms: u64,

    /// Maximum number of pooled connections.
    #[serde(default = "default_pool_max_size")]
    pub pool_max_size: u32,
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level filter (e.g., "info", "debug", "noticeboard_server=debug,info").
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Whether to output logs in JSON format.
    #[serde(default)]
    pub json: bool,
}

/// Notification configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct NotificationsConfig {
    /// Which edits are allowed once a notification exists.
    /// `write_once` (default) or the deprecated `free_form`.
    #[serde(default)]
    pub edit_policy: EditPolicy,
}

fn default_host() -> IpAddr {
    IpAddr::V4(Ipv4Addr::new(127, 0, 0, 1))
}

fn default_port() -> u16 {
    8080
}

fn default_db_path() -> String {
    "noticeboard.db".to_string()
}

fn default_busy_timeout_ms() -> u64 {
    5_000
}

fn default_pool_max_size() -> u32 {
    8
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
            busy_timeout_ms: default_busy_timeout_ms(),
            pool_max_size: default_pool_max_size(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

impl DatabaseConfig {
    /// Pool tunables derived from this configuration.
    pub fn runtime_settings(&self) -> noticeboard_db::DbRuntimeSettings {
        noticeboard_db::DbRuntimeSettings {
            busy_timeout_ms: self.busy_timeout_ms,
            pool_max_size: self.pool_max_size,
        }
    }
}

/// Errors that can occur when loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read the configuration file.
    #[error("failed to read config file: {0}")]
    FileRead(#[from] std::io::Error),

    /// Failed to parse the configuration file.
    #[error("failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Loads configuration from a TOML file, falling back to defaults.
///
/// Environment variable overrides:
/// - `NOTICEBOARD_HOST` overrides `server.host`
/// - `NOTICEBOARD_PORT` overrides `server.port`
/// - `NOTICEBOARD_DB_PATH` overrides `database.path`
/// - `NOTICEBOARD_LOG_LEVEL` overrides `logging.level`
/// - `NOTICEBOARD_LOG_JSON` overrides `logging.json` (set to "true" to enable)
/// - `NOTICEBOARD_EDIT_POLICY` overrides `notifications.edit_policy`
///
/// # Errors
///
/// Returns `ConfigError` if the file exists but cannot be read or parsed.
pub fn load_config(path: Option<&str>) -> Result<Config, ConfigError> {
    let config = match path {
        Some(p) => match std::fs::read_to_string(p) {
            Ok(contents) => toml::from_str(&contents)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::info!(path = p, "config file not found, using defaults");
                Config::default()
            }
            Err(e) => return Err(ConfigError::FileRead(e)),
        },
        None => Config::default(),
    };

    Ok(apply_env_overrides(config, |key| std::env::var(key).ok()))
}

/// Applies `NOTICEBOARD_*` overrides looked up through `var`. Unparseable
/// values are ignored with a warning.
fn apply_env_overrides(mut config: Config, var: impl Fn(&str) -> Option<String>) -> Config {
    if let Some(host) = var("NOTICEBOARD_HOST") {
        match host.parse() {
            Ok(parsed) => config.server.host = parsed,
            Err(_) => tracing::warn!(value = %host, "ignoring invalid NOTICEBOARD_HOST"),
        }
    }
    if let Some(port) = var("NOTICEBOARD_PORT") {
        match port.parse() {
            Ok(parsed) => config.server.port = parsed,
            Err(_) => tracing::warn!(value = %port, "ignoring invalid NOTICEBOARD_PORT"),
        }
    }
    if let Some(db_path) = var("NOTICEBOARD_DB_PATH") {
        config.database.path = db_path;
    }
    if let Some(level) = var("NOTICEBOARD_LOG_LEVEL") {
        config.logging.level = level;
    }
    if let Some(json) = var("NOTICEBOARD_LOG_JSON") {
        config.logging.json = json == "true" || json == "1";
    }
    if let Some(policy) = var("NOTICEBOARD_EDIT_POLICY") {
        match policy.parse() {
            Ok(parsed) => config.notifications.edit_policy = parsed,
            Err(e) => tracing::warn!(error = %e, "ignoring invalid NOTICEBOARD_EDIT_POLICY"),
        }
    }

    config
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn no_env(_: &str) -> Option<String> {
        None
    }

    #[test]
    fn defaults_when_no_file() {
        let config = load_config(Some("/nonexistent/noticeboard.toml")).unwrap();
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.database.path, "noticeboard.db");
        assert_eq!(config.notifications.edit_policy, EditPolicy::WriteOnce);
    }

    #[test]
    fn parses_partial_toml() {
        let config: Config = toml::from_str(
            r#"
            [server]
            port = 9000

            [database]
            path = "/tmp/test.db"
            pool_max_size = 2

            [notifications]
            edit_policy = "free_form"
            "#,
        )
        .unwrap();
        let config = apply_env_overrides(config, no_env);

        assert_eq!(config.server.port, 9000);
        assert_eq!(config.server.host, default_host());
        assert_eq!(config.database.path, "/tmp/test.db");
        assert_eq!(config.database.busy_timeout_ms, 5_000);
        assert_eq!(config.database.runtime_settings().pool_max_size, 2);
        assert_eq!(config.logging.level, "info");
        assert_eq!(config.notifications.edit_policy, EditPolicy::FreeForm);
    }

    #[test]
    fn rejects_unknown_edit_policy_in_file() {
        let result: Result<Config, _> = toml::from_str(
            r#"
            [notifications]
            edit_policy = "sometimes"
            "#,
        );
        assert!(result.is_err());
    }

    #[test]
    fn env_overrides_take_precedence() {
        let env: HashMap<&str, &str> = HashMap::from([
            ("NOTICEBOARD_HOST", "0.0.0.0"),
            ("NOTICEBOARD_PORT", "9100"),
            ("NOTICEBOARD_DB_PATH", "env.db"),
            ("NOTICEBOARD_LOG_LEVEL", "debug"),
            ("NOTICEBOARD_LOG_JSON", "1"),
            ("NOTICEBOARD_EDIT_POLICY", "free_form"),
        ]);
        let config = apply_env_overrides(Config::default(), |key| {
            env.get(key).map(|v| v.to_string())
        });

        assert_eq!(config.server.host, IpAddr::V4(Ipv4Addr::UNSPECIFIED));
        assert_eq!(config.server.port, 9100);
        assert_eq!(config.database.path, "env.db");
        assert_eq!(config.logging.level, "debug");
        assert!(config.logging.json);
        assert_eq!(config.notifications.edit_policy, EditPolicy::FreeForm);
    }

    #[test]
    fn invalid_env_values_are_ignored() {
        let config = apply_env_overrides(Config::default(), |key| match key {
            "NOTICEBOARD_PORT" => Some("not-a-port".to_string()),
            "NOTICEBOARD_EDIT_POLICY" => Some("sometimes".to_string()),
            _ => None,
        });
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.notifications.edit_policy, EditPolicy::WriteOnce);
    }
}
