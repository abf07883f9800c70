//! # restgate-config
//!
//! Typed configuration for the restgate server: network settings,
//! authentication mode, the ACL table, the user directory seed, and
//! per-endpoint query constraints.
//!
//! Configuration is merged from an optional TOML file (default
//! `restgate.toml`) and `RESTGATE__`-prefixed environment variables,
//! e.g. `RESTGATE__SERVER__PORT=9090`.

use std::collections::HashMap;
use std::path::PathBuf;

use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};

use restgate_auth::{AclTable, ApiUser, AuthMode, AuthSource, MemoryUserDirectory};
use restgate_query::EndpointQuery;

/// Default configuration file name, looked up in the working directory.
pub const DEFAULT_CONFIG_PATH: &str = "restgate.toml";

const ENV_PREFIX: &str = "RESTGATE";

/// Errors produced while loading or validating configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The configuration sources could not be read or merged.
    #[error("configuration build error: {0}")]
    Build(#[from] config::ConfigError),

    /// The merged configuration is inconsistent.
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Top-level application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub auth: AuthConfig,

    #[serde(default)]
    pub logging: LoggingConfig,

    /// Action name -> roles permitted to perform it.
    #[serde(default)]
    pub acl: HashMap<String, Vec<String>>,

    /// API key -> user record, seeding the in-memory directory.
    #[serde(default)]
    pub users: HashMap<String, ApiUser>,

    /// Resource name -> query constraints.
    #[serde(default)]
    pub endpoints: HashMap<String, EndpointQuery>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

const fn default_port() -> u16 {
    8080
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

/// Authentication settings, fixed per deployment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    #[serde(default)]
    pub mode: AuthMode,
    #[serde(default)]
    pub source: AuthSource,
    /// Replay window for hash-mode tokens, in minutes.
    #[serde(default = "default_auth_minutes")]
    pub max_auth_minutes: i64,
}

const fn default_auth_minutes() -> i64 {
    60
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            mode: AuthMode::default(),
            source: AuthSource::default(),
            max_auth_minutes: default_auth_minutes(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

impl AppConfig {
    /// Checks the merged configuration for inconsistencies.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] naming the first problem found.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.server.port == 0 {
            return Err(ConfigError::Invalid("server.port must be > 0".into()));
        }
        if self.auth.max_auth_minutes <= 0 {
            return Err(ConfigError::Invalid(
                "auth.max_auth_minutes must be > 0".into(),
            ));
        }
        let level = self.logging.level.to_ascii_lowercase();
        let valid_levels = ["trace", "debug", "info", "warn", "error", "off"];
        if !valid_levels.contains(&level.as_str()) {
            return Err(ConfigError::Invalid(format!(
                "logging.level must be one of {valid_levels:?}"
            )));
        }
        for (name, endpoint) in &self.endpoints {
            if endpoint.fetchable_fields.is_empty() {
                return Err(ConfigError::Invalid(format!(
                    "endpoints.{name}.fetchable_fields must not be empty"
                )));
            }
            if endpoint.max_limit == 0 || endpoint.default_limit == 0 {
                return Err(ConfigError::Invalid(format!(
                    "endpoints.{name} limits must be > 0"
                )));
            }
            if endpoint.default_limit > endpoint.max_limit {
                return Err(ConfigError::Invalid(format!(
                    "endpoints.{name}.default_limit must be <= max_limit"
                )));
            }
            if !endpoint.is_fetchable(&endpoint.default_sort) {
                return Err(ConfigError::Invalid(format!(
                    "endpoints.{name}.default_sort must be a fetchable field"
                )));
            }
        }
        Ok(())
    }

    /// Builds the ACL table from the `acl` section.
    #[must_use]
    pub fn acl_table(&self) -> AclTable {
        AclTable::new(self.acl.clone())
    }

    /// Builds the in-memory user directory from the `users` section.
    #[must_use]
    pub fn user_directory(&self) -> MemoryUserDirectory {
        let mut directory = MemoryUserDirectory::new();
        for (api_key, user) in &self.users {
            directory.insert(api_key.clone(), user.clone());
        }
        directory
    }
}

/// Loads configuration from an optional file plus environment overrides
/// and validates the result.
///
/// # Errors
///
/// Returns [`ConfigError`] when the sources cannot be merged,
/// deserialized, or fail validation.
pub fn load_config(path: Option<&str>) -> Result<AppConfig, ConfigError> {
    let mut builder = Config::builder();
    let path = PathBuf::from(path.unwrap_or(DEFAULT_CONFIG_PATH));
    if path.exists() {
        builder = builder.add_source(File::from(path));
    }
    builder = builder.add_source(
        Environment::with_prefix(ENV_PREFIX)
            .try_parsing(true)
            .separator("__"),
    );

    let merged: AppConfig = builder.build()?.try_deserialize()?;
    merged.validate()?;
    Ok(merged)
}

#[cfg(test)]
mod tests {
    use super::*;

    const EXAMPLE: &str = r#"
        [server]
        host = "0.0.0.0"
        port = 9090

        [auth]
        mode = "hash"
        source = "both"
        max_auth_minutes = 30

        [acl]
        "things.index" = ["reader", "admin"]
        "things.create" = ["admin"]

        [users.key-1]
        id = "u1"
        secret_key = "s3cr3t"
        roles = ["admin"]

        [endpoints.things]
        fetchable_fields = ["id", "name", "age"]
        max_limit = 100
        default_limit = 20
        default_sort = "id"
        default_order = "asc"
    "#;

    fn example() -> AppConfig {
        toml::from_str(EXAMPLE).unwrap()
    }

    #[test]
    fn example_config_deserializes_and_validates() {
        let config = example();
        assert_eq!(config.server.port, 9090);
        assert_eq!(config.auth.mode, AuthMode::Hash);
        assert_eq!(config.auth.source, AuthSource::Both);
        assert_eq!(config.auth.max_auth_minutes, 30);
        assert_eq!(config.users["key-1"].id, "u1");
        assert!(config.endpoints["things"].is_fetchable("age"));
        config.validate().unwrap();
    }

    #[test]
    fn defaults_are_sensible() {
        let config = AppConfig::default();
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.auth.mode, AuthMode::Off);
        assert_eq!(config.auth.max_auth_minutes, 60);
        config.validate().unwrap();
    }

    #[test]
    fn acl_table_reflects_the_acl_section() {
        let table = example().acl_table();
        assert!(table.allows("things.index", &["reader".to_string()]));
        assert!(!table.allows("things.create", &["reader".to_string()]));
    }

    #[test]
    fn default_limit_above_max_is_rejected() {
        let mut config = example();
        if let Some(endpoint) = config.endpoints.get_mut("things") {
            endpoint.default_limit = 500;
        }
        assert!(config.validate().is_err());
    }

    #[test]
    fn unfetchable_default_sort_is_rejected() {
        let mut config = example();
        if let Some(endpoint) = config.endpoints.get_mut("things") {
            endpoint.default_sort = "password".into();
        }
        assert!(config.validate().is_err());
    }

    #[test]
    fn zero_auth_window_is_rejected() {
        let mut config = example();
        config.auth.max_auth_minutes = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn unknown_log_level_is_rejected() {
        let mut config = example();
        config.logging.level = "loud".into();
        assert!(config.validate().is_err());
    }
}
