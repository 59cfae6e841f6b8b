//! Pipeline configuration.

use crate::{CoreError, CoreResult, Paths};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use url::Url;

/// Default log level.
pub const DEFAULT_LOG_LEVEL: &str = "info";

/// Edge Network host used when neither the config file nor the remote
/// configuration names one.
pub const DEFAULT_EDGE_DOMAIN: &str = "edge.adobedc.net";

/// Local tuning knobs for delivery. Remote configuration (config id,
/// privacy) comes from the configuration provider, not from this file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,
    /// Edge Network host, without scheme.
    pub edge_domain: String,
    /// Timeout for a single network attempt, in seconds.
    pub request_timeout_secs: u64,
    /// Attempts the transport makes per send before reporting failure.
    pub max_attempts: u32,
    /// Pause between transport-level attempts, in milliseconds.
    pub transport_backoff_ms: u64,
    /// First queue-level retry interval after a failed send.
    pub retry_initial_delay_ms: u64,
    /// Upper bound for the queue-level retry interval.
    pub retry_max_delay_ms: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_level: DEFAULT_LOG_LEVEL.to_string(),
            edge_domain: DEFAULT_EDGE_DOMAIN.to_string(),
            request_timeout_secs: 5,
            max_attempts: 3,
            transport_backoff_ms: 500,
            retry_initial_delay_ms: 5_000,
            retry_max_delay_ms: 300_000,
        }
    }
}

impl Config {
    /// Create a new Config with default values, then override from environment.
    pub fn new() -> Self {
        let mut config = Self::default();
        config.load_from_env();
        config
    }

    /// Load configuration from `paths.config_file()`, falling back to defaults
    /// when the file does not exist. Environment overrides are applied last.
    pub fn load(paths: &Paths) -> CoreResult<Self> {
        let config_path = paths.config_file();

        let mut config = if config_path.exists() {
            Self::load_from_file(&config_path)?
        } else {
            Self::default()
        };

        config.load_from_env();
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a specific file.
    pub fn load_from_file(path: &Path) -> CoreResult<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = serde_json::from_str(&content)?;
        Ok(config)
    }

    /// Save configuration to `paths.config_file()`.
    pub fn save(&self, paths: &Paths) -> CoreResult<()> {
        paths.ensure_dirs()?;
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(paths.config_file(), content)?;
        Ok(())
    }

    fn load_from_env(&mut self) {
        if let Ok(log_level) = std::env::var("EDGE_LOG_LEVEL") {
            self.log_level = log_level;
        }
        if let Ok(domain) = std::env::var("EDGE_DOMAIN") {
            let domain = domain.trim();
            if !domain.is_empty() {
                self.edge_domain = domain.to_string();
            }
        }
    }

    /// Reject values that would stall or spin the queue.
    pub fn validate(&self) -> CoreResult<()> {
        if self.max_attempts == 0 {
            return Err(CoreError::Config("max_attempts must be at least 1".to_string()));
        }
        if self.retry_initial_delay_ms == 0 {
            return Err(CoreError::Config(
                "retry_initial_delay_ms must be positive".to_string(),
            ));
        }
        if self.retry_max_delay_ms < self.retry_initial_delay_ms {
            return Err(CoreError::Config(
                "retry_max_delay_ms must not be below retry_initial_delay_ms".to_string(),
            ));
        }
        self.edge_base_url()?;
        Ok(())
    }

    /// `https://{edge_domain}/ee/v1`.
    pub fn edge_base_url(&self) -> CoreResult<Url> {
        edge_base_url_for(&self.edge_domain)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn transport_backoff(&self) -> Duration {
        Duration::from_millis(self.transport_backoff_ms)
    }

    pub fn retry_initial_delay(&self) -> Duration {
        Duration::from_millis(self.retry_initial_delay_ms)
    }

    pub fn retry_max_delay(&self) -> Duration {
        Duration::from_millis(self.retry_max_delay_ms)
    }
}

/// Base URL for an Edge Network host. A domain given with a scheme is used as is.
pub fn edge_base_url_for(domain: &str) -> CoreResult<Url> {
    let raw = if domain.starts_with("http://") || domain.starts_with("https://") {
        format!("{}/ee/v1", domain.trim_end_matches('/'))
    } else {
        format!("https://{}/ee/v1", domain.trim_end_matches('/'))
    };
    Url::parse(&raw).map_err(CoreError::from)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.log_level, DEFAULT_LOG_LEVEL);
        assert_eq!(config.edge_domain, DEFAULT_EDGE_DOMAIN);
        assert_eq!(config.max_attempts, 3);
        assert_eq!(config.retry_initial_delay(), Duration::from_secs(5));
        assert_eq!(config.retry_max_delay(), Duration::from_secs(300));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_load_partial_file_keeps_defaults() {
        let dir = tempdir().unwrap();
        let config_path = dir.path().join("config.json");
        std::fs::write(&config_path, r#"{ "log_level": "debug", "max_attempts": 5 }"#).unwrap();

        let config = Config::load_from_file(&config_path).unwrap();
        assert_eq!(config.log_level, "debug");
        assert_eq!(config.max_attempts, 5);
        assert_eq!(config.edge_domain, DEFAULT_EDGE_DOMAIN);
        assert_eq!(config.request_timeout_secs, 5);
    }

    #[test]
    fn test_config_save_and_load_roundtrip() {
        let dir = tempdir().unwrap();
        let paths = Paths::with_base_dir(dir.path().to_path_buf());

        let config = Config {
            edge_domain: "edge.example.com".to_string(),
            retry_initial_delay_ms: 1_000,
            ..Default::default()
        };
        config.save(&paths).unwrap();

        let loaded = Config::load(&paths).unwrap();
        assert_eq!(loaded.retry_initial_delay_ms, 1_000);
    }

    #[test]
    fn test_config_load_nonexistent_uses_defaults() {
        let dir = tempdir().unwrap();
        let paths = Paths::with_base_dir(dir.path().to_path_buf());

        let config = Config::load(&paths).unwrap();
        assert_eq!(config.max_attempts, Config::default().max_attempts);
    }

    #[test]
    fn test_validate_rejects_zero_attempts() {
        let config = Config {
            max_attempts: 0,
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(CoreError::Config(_))));
    }

    #[test]
    fn test_validate_rejects_inverted_delays() {
        let config = Config {
            retry_initial_delay_ms: 10_000,
            retry_max_delay_ms: 1_000,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_edge_base_url() {
        let url = Config::default().edge_base_url().unwrap();
        assert_eq!(url.as_str(), "https://edge.adobedc.net/ee/v1");

        let custom = edge_base_url_for("http://localhost:8080/").unwrap();
        assert_eq!(custom.as_str(), "http://localhost:8080/ee/v1");
    }

    #[test]
    fn test_edge_base_url_invalid() {
        assert!(edge_base_url_for("not a host").is_err());
    }
}
