use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

use crate::dashboard::orchestrator::DashboardSettings;

/// Upper bound for the "recently created" window, one century
pub const MAX_RECENT_WINDOW_DAYS: i64 = 36_500;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub store: StoreConfig,
    #[serde(default)]
    pub dashboard: DashboardConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub port: u16,
    #[serde(default = "default_bind_address")]
    pub bind_address: String,
    #[serde(default = "default_num_threads")]
    pub num_threads: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    Http,
    Memory,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StoreConfig {
    pub backend: StoreBackend,
    #[serde(default)]
    pub endpoint: String,
    #[serde(default)]
    pub api_key: String,
    #[serde(default = "default_collection")]
    pub collection: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DashboardConfig {
    #[serde(default = "default_reconcile_delay_ms")]
    pub reconcile_delay_ms: u64,
    #[serde(default = "default_recent_window_days")]
    pub recent_window_days: i64,
    #[serde(default = "default_search_limit")]
    pub search_limit: usize,
    /// 0 disables periodic refresh
    #[serde(default)]
    pub auto_refresh_secs: u64,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            reconcile_delay_ms: default_reconcile_delay_ms(),
            recent_window_days: default_recent_window_days(),
            search_limit: default_search_limit(),
            auto_refresh_secs: 0,
        }
    }
}

impl DashboardConfig {
    pub fn settings(&self) -> DashboardSettings {
        DashboardSettings {
            reconcile_delay: Duration::from_millis(self.reconcile_delay_ms),
            recent_window: chrono::Duration::days(self.recent_window_days),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default = "default_log_format")]
    pub format: String,
    #[serde(default = "default_console")]
    pub console: bool,
}

// Default value functions
fn default_bind_address() -> String {
    "0.0.0.0".to_string()
}

fn default_num_threads() -> usize {
    num_cpus::get()
}

fn default_collection() -> String {
    "users".to_string()
}

fn default_reconcile_delay_ms() -> u64 {
    1000
}

fn default_recent_window_days() -> i64 {
    7
}

fn default_search_limit() -> usize {
    20
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "json".to_string()
}

fn default_console() -> bool {
    false
}

impl Config {
    /// Load configuration from a TOML file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .context(format!("Failed to read config file: {}", path.display()))?;

        Self::parse(&content)
    }

    /// Parse and validate configuration from TOML text
    pub fn parse(content: &str) -> Result<Self> {
        let config: Config = toml::from_str(content)
            .context("Failed to parse config file")?;

        config.validate()?;

        Ok(config)
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        if self.server.port == 0 {
            bail!("Server port must be greater than 0");
        }

        if self.server.num_threads == 0 {
            bail!("num_threads must be greater than 0");
        }

        if self.store.collection.is_empty() {
            bail!("collection must not be empty");
        }

        if self.store.backend == StoreBackend::Http {
            if self.store.endpoint.is_empty() {
                bail!("endpoint must not be empty for the http store backend");
            }

            if !self.store.endpoint.starts_with("http://") && !self.store.endpoint.starts_with("https://") {
                bail!(
                    "Invalid endpoint '{}'. Must start with http:// or https://",
                    self.store.endpoint
                );
            }

            if self.store.api_key.is_empty() {
                bail!("api_key must not be empty for the http store backend");
            }
        }

        if self.dashboard.recent_window_days <= 0
            || self.dashboard.recent_window_days > MAX_RECENT_WINDOW_DAYS
        {
            bail!(
                "recent_window_days must be between 1 and {}",
                MAX_RECENT_WINDOW_DAYS
            );
        }

        if self.dashboard.search_limit == 0 {
            bail!("search_limit must be greater than 0");
        }

        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.logging.level.as_str()) {
            bail!(
                "Invalid log level '{}'. Must be one of: trace, debug, info, warn, error",
                self.logging.level
            );
        }

        let valid_formats = ["json", "console"];
        if !valid_formats.contains(&self.logging.format.as_str()) {
            bail!(
                "Invalid log format '{}'. Must be one of: json, console",
                self.logging.format
            );
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const MEMORY_CONFIG: &str = r#"
[server]
port = 8080

[store]
backend = "memory"

[logging]
level = "debug"
format = "console"
"#;

    const HTTP_CONFIG: &str = r#"
[server]
port = 8080
num_threads = 2

[store]
backend = "http"
endpoint = "https://docs.example.com"
api_key = "secret"
collection = "admins"

[dashboard]
reconcile_delay_ms = 250
recent_window_days = 14
search_limit = 5
auto_refresh_secs = 30

[logging]
"#;

    #[test]
    fn test_memory_config_defaults() {
        let config = Config::parse(MEMORY_CONFIG).unwrap();

        assert_eq!(config.store.backend, StoreBackend::Memory);
        assert_eq!(config.store.collection, "users");
        assert_eq!(config.server.bind_address, "0.0.0.0");
        assert!(config.server.num_threads > 0);
        assert_eq!(config.dashboard.reconcile_delay_ms, 1000);
        assert_eq!(config.dashboard.recent_window_days, 7);
        assert_eq!(config.dashboard.search_limit, 20);
        assert_eq!(config.dashboard.auto_refresh_secs, 0);
    }

    #[test]
    fn test_http_config() {
        let config = Config::parse(HTTP_CONFIG).unwrap();

        assert_eq!(config.store.backend, StoreBackend::Http);
        assert_eq!(config.store.collection, "admins");
        assert_eq!(config.logging.level, "info");
        assert_eq!(config.logging.format, "json");

        let settings = config.dashboard.settings();
        assert_eq!(settings.reconcile_delay, Duration::from_millis(250));
        assert_eq!(settings.recent_window, chrono::Duration::days(14));
    }

    #[test]
    fn test_http_backend_requires_endpoint() {
        let config = HTTP_CONFIG.replace("endpoint = \"https://docs.example.com\"\n", "");
        assert!(Config::parse(&config).is_err());

        let config = HTTP_CONFIG.replace("https://docs.example.com", "ftp://docs.example.com");
        assert!(Config::parse(&config).is_err());

        let config = HTTP_CONFIG.replace("api_key = \"secret\"\n", "");
        assert!(Config::parse(&config).is_err());
    }

    #[test]
    fn test_invalid_values() {
        assert!(Config::parse(&MEMORY_CONFIG.replace("port = 8080", "port = 0")).is_err());
        assert!(Config::parse(&MEMORY_CONFIG.replace("\"debug\"", "\"loud\"")).is_err());
        assert!(Config::parse(&MEMORY_CONFIG.replace("\"console\"", "\"xml\"")).is_err());
        assert!(Config::parse(&MEMORY_CONFIG.replace("\"memory\"", "\"sql\"")).is_err());
    }

    #[test]
    fn test_recent_window_bounds() {
        let with_window = |days: &str| {
            HTTP_CONFIG.replace("recent_window_days = 14", &format!("recent_window_days = {}", days))
        };

        assert!(Config::parse(&with_window("0")).is_err());
        assert!(Config::parse(&with_window("-3")).is_err());
        assert!(Config::parse(&with_window("200000000")).is_err());
        assert!(Config::parse(&with_window("9223372036854775807")).is_err());

        let config = Config::parse(&with_window("36500")).unwrap();
        assert_eq!(config.dashboard.settings().recent_window, chrono::Duration::days(36_500));
    }

    #[test]
    fn test_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(MEMORY_CONFIG.as_bytes()).unwrap();

        let config = Config::from_file(file.path()).unwrap();
        assert_eq!(config.server.port, 8080);
    }

    #[test]
    fn test_missing_file() {
        assert!(Config::from_file(Path::new("does-not-exist.toml")).is_err());
    }
}
