//! # Server Configuration
//!
//! ## Configuration Sources (Priority Order)
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  1. Environment variables (CONVENIO_*)          highest priority       │
//! │  2. Config file                                                         │
//! │       explicit path, else $CONVENIO_CONFIG, else                        │
//! │       ~/.config/convenio/server.toml (Linux)                            │
//! │       ~/Library/Application Support/com.convenio.backoffice/... (macOS)│
//! │  3. Defaults (this file)                        lowest priority        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Example Config File
//! ```toml
//! bind_addr = "127.0.0.1"
//! port = 8080
//! database_path = "/var/lib/convenio/convenio.db"
//! max_connections = 8
//! default_per_page = 10
//! max_per_page = 100
//! log_filter = "info,convenio=debug"
//! ```

use std::net::{IpAddr, SocketAddr};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use convenio_core::query::{PageSizing, DEFAULT_PER_PAGE, MAX_PER_PAGE};

/// Server configuration. Every field has a default, so an empty file (or no
/// file at all) is a valid configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Interface to listen on.
    pub bind_addr: IpAddr,

    /// TCP port.
    pub port: u16,

    /// SQLite database file, created on first start.
    pub database_path: PathBuf,

    /// Pool size.
    pub max_connections: u32,

    /// Page size when a list request doesn't name one.
    pub default_per_page: u32,

    /// Upper bound on requested page sizes.
    pub max_per_page: u32,

    /// `tracing` filter directive, used when `RUST_LOG` is unset.
    pub log_filter: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        ServerConfig {
            bind_addr: IpAddr::from([0, 0, 0, 0]),
            port: 8080,
            database_path: PathBuf::from("./convenio.db"),
            max_connections: 5,
            default_per_page: DEFAULT_PER_PAGE,
            max_per_page: MAX_PER_PAGE,
            log_filter: "info,convenio=debug".to_string(),
        }
    }
}

impl ServerConfig {
    /// Loads configuration from file, environment, and defaults.
    ///
    /// ## Load Order (later overrides earlier)
    /// 1. Default values
    /// 2. Config file
    /// 3. Environment variables
    pub fn load(config_path: Option<PathBuf>) -> Result<Self, ConfigError> {
        let mut config = Self::default();

        let path = config_path
            .or_else(|| std::env::var_os("CONVENIO_CONFIG").map(PathBuf::from))
            .or_else(Self::default_config_path);

        if let Some(path) = path {
            if path.exists() {
                info!(?path, "Loading server config from file");
                config = Self::from_file(&path)?;
            } else {
                debug!(?path, "Config file not found, using defaults");
            }
        }

        config.apply_env_overrides(|key| std::env::var(key).ok())?;
        config.validate()?;

        Ok(config)
    }

    /// Parses a config file without applying overrides.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(toml::from_str(&contents)?)
    }

    /// Applies `CONVENIO_*` overrides read through `var`.
    ///
    /// Unparsable values are errors rather than silently ignored.
    pub fn apply_env_overrides(
        &mut self,
        var: impl Fn(&str) -> Option<String>,
    ) -> Result<(), ConfigError> {
        fn parsed<T: std::str::FromStr>(key: &str, raw: String) -> Result<T, ConfigError> {
            raw.trim()
                .parse()
                .map_err(|_| ConfigError::InvalidValue(key.to_string()))
        }

        if let Some(raw) = var("CONVENIO_BIND_ADDR") {
            self.bind_addr = parsed("CONVENIO_BIND_ADDR", raw)?;
        }
        if let Some(raw) = var("CONVENIO_PORT") {
            self.port = parsed("CONVENIO_PORT", raw)?;
        }
        if let Some(raw) = var("CONVENIO_DATABASE_PATH") {
            debug!(path = %raw, "Overriding database path from environment");
            self.database_path = PathBuf::from(raw);
        }
        if let Some(raw) = var("CONVENIO_MAX_CONNECTIONS") {
            self.max_connections = parsed("CONVENIO_MAX_CONNECTIONS", raw)?;
        }
        if let Some(raw) = var("CONVENIO_DEFAULT_PER_PAGE") {
            self.default_per_page = parsed("CONVENIO_DEFAULT_PER_PAGE", raw)?;
        }
        if let Some(raw) = var("CONVENIO_MAX_PER_PAGE") {
            self.max_per_page = parsed("CONVENIO_MAX_PER_PAGE", raw)?;
        }
        if let Some(raw) = var("CONVENIO_LOG") {
            self.log_filter = raw;
        }

        Ok(())
    }

    /// Validates the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.port == 0 {
            return Err(ConfigError::InvalidConfig("port must be greater than 0".into()));
        }
        if self.max_connections == 0 {
            return Err(ConfigError::InvalidConfig(
                "max_connections must be greater than 0".into(),
            ));
        }
        if self.default_per_page == 0 || self.max_per_page == 0 {
            return Err(ConfigError::InvalidConfig(
                "page sizes must be greater than 0".into(),
            ));
        }
        if self.default_per_page > self.max_per_page {
            return Err(ConfigError::InvalidConfig(format!(
                "default_per_page ({}) exceeds max_per_page ({})",
                self.default_per_page, self.max_per_page
            )));
        }
        Ok(())
    }

    pub fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.bind_addr, self.port)
    }

    pub fn page_sizing(&self) -> PageSizing {
        PageSizing {
            default_per_page: self.default_per_page,
            max_per_page: self.max_per_page,
        }
    }

    fn default_config_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("com", "convenio", "backoffice")
            .map(|dirs| dirs.config_dir().join("server.toml"))
    }
}

/// Configuration error types.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid value for {0}")]
    InvalidValue(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults_are_valid() {
        let config = ServerConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.socket_addr().port(), 8080);
        assert_eq!(config.page_sizing(), PageSizing::default());
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config: ServerConfig = toml::from_str("port = 9000\nmax_per_page = 50\n").unwrap();
        assert_eq!(config.port, 9000);
        assert_eq!(config.max_per_page, 50);
        assert_eq!(config.default_per_page, DEFAULT_PER_PAGE);
        assert_eq!(config.database_path, PathBuf::from("./convenio.db"));
    }

    #[test]
    fn test_env_overrides() {
        let mut config = ServerConfig::default();
        config
            .apply_env_overrides(env(&[
                ("CONVENIO_PORT", "3000"),
                ("CONVENIO_BIND_ADDR", "127.0.0.1"),
                ("CONVENIO_DATABASE_PATH", "/tmp/convenio.db"),
                ("CONVENIO_LOG", "debug"),
            ]))
            .unwrap();

        assert_eq!(config.socket_addr().to_string(), "127.0.0.1:3000");
        assert_eq!(config.database_path, PathBuf::from("/tmp/convenio.db"));
        assert_eq!(config.log_filter, "debug");
    }

    #[test]
    fn test_unparsable_env_value_is_an_error() {
        let mut config = ServerConfig::default();
        let err = config
            .apply_env_overrides(env(&[("CONVENIO_PORT", "eighty")]))
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue(key) if key == "CONVENIO_PORT"));
    }

    #[test]
    fn test_validate_rejects_inverted_page_sizes() {
        let config = ServerConfig {
            default_per_page: 200,
            max_per_page: 100,
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(ConfigError::InvalidConfig(_))));
    }
}
