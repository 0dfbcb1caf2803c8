//! Runtime configuration.
//!
//! Loaded once at startup from a TOML file (or built-in defaults) and
//! published through a global accessor, matching the teacher's
//! `config::init()`/`config::get()` pattern.
//!
//! ## Loading order
//!
//! 1. `--config <path>` CLI flag
//! 2. `rocket_control.toml` in the current working directory
//! 3. Built-in defaults

use serde::Deserialize;
use std::path::Path;
use std::sync::OnceLock;

static RUNTIME_CONFIG: OnceLock<RuntimeConfig> = OnceLock::new();

#[derive(Debug, Clone, Deserialize)]
pub struct RuntimeConfig {
    #[serde(default)]
    pub settings: Settings,
    #[serde(default)]
    pub database: DatabaseConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    /// When true, the WS gateway substitutes a fixed test identity instead
    /// of reading `Remote-User`/`Remote-Name` headers.
    #[serde(default)]
    pub debug: bool,
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            debug: false,
            host: default_host(),
            port: default_port(),
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// Interpreted as the sled on-disk directory name when the durable
    /// backend is selected.
    #[serde(default = "default_db_name")]
    pub name: String,
    #[serde(default)]
    pub host: String,
    #[serde(default)]
    pub port: String,
    #[serde(default)]
    pub user: String,
    #[serde(default)]
    pub password: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            name: default_db_name(),
            host: String::new(),
            port: String::new(),
            user: String::new(),
            password: String::new(),
        }
    }
}

fn default_db_name() -> String {
    "rocket_control_data".to_string()
}

impl RuntimeConfig {
    /// Load from a TOML file at `path`.
    pub fn load_from(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let data = std::fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("failed to read config file {}: {e}", path.display()))?;
        let config: RuntimeConfig = toml::from_str(&data)
            .map_err(|e| anyhow::anyhow!("failed to parse config file {}: {e}", path.display()))?;
        Ok(config)
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.settings.host, self.settings.port)
    }
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            settings: Settings::default(),
            database: DatabaseConfig::default(),
        }
    }
}

/// Initialize the global runtime configuration. Must be called exactly
/// once before any call to [`get`].
pub fn init(config: RuntimeConfig) {
    if RUNTIME_CONFIG.set(config).is_err() {
        tracing::warn!("config::init() called more than once — ignoring");
    }
}

/// Get a reference to the global runtime configuration.
///
/// Panics if `init()` has not been called — a missing config is a fatal
/// startup error, not a recoverable condition.
pub fn get() -> &'static RuntimeConfig {
    RUNTIME_CONFIG
        .get()
        .expect("config::get() called before config::init() — this is a startup bug")
}

/// Check whether the config has been initialized. Useful for tests.
pub fn is_initialized() -> bool {
    RUNTIME_CONFIG.get().is_some()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_bind_to_8080() {
        let config = RuntimeConfig::default();
        assert_eq!(config.bind_addr(), "0.0.0.0:8080");
    }

    #[test]
    fn load_from_missing_file_errors() {
        let result = RuntimeConfig::load_from("/nonexistent/rocket_control.toml");
        assert!(result.is_err());
    }
}
