//! Configuration management for the course-evaluation client

use crate::error::{ClientError, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;

/// Configuration for the HTTP client layer
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ClientConfig {
    /// Base URL every request path is joined onto
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Per-request timeout in milliseconds (default: 15000)
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    /// Maximum number of resends after a timeout (default: 3)
    #[serde(default = "default_max_retries")]
    pub max_retries: usize,

    /// Base retry delay in milliseconds; retry `n` waits `n` times this (default: 1000)
    #[serde(default = "default_retry_delay_ms")]
    pub retry_delay_ms: u64,

    /// Path fragment identifying login requests (default: "auth/login")
    #[serde(default = "default_login_endpoint")]
    pub login_endpoint: String,

    /// Navigation path of the login view (default: "/login")
    #[serde(default = "default_login_view")]
    pub login_view: String,

    /// Key of the persisted user blob in the credential store (default: "user")
    #[serde(default = "default_credential_key")]
    pub credential_key: String,

    /// Maximum number of entries in the response cache (default: 100)
    #[serde(default = "default_cache_capacity")]
    pub cache_capacity: usize,

    /// Response cache TTL in seconds (default: 300)
    #[serde(default = "default_cache_ttl")]
    pub cache_ttl_secs: u64,
}

// Default value functions for serde
fn default_base_url() -> String {
    "http://localhost:8088/api".to_string()
}

fn default_timeout_ms() -> u64 {
    15_000
}

fn default_max_retries() -> usize {
    3
}

fn default_retry_delay_ms() -> u64 {
    1000
}

fn default_login_endpoint() -> String {
    "auth/login".to_string()
}

fn default_login_view() -> String {
    "/login".to_string()
}

fn default_credential_key() -> String {
    "user".to_string()
}

fn default_cache_capacity() -> usize {
    100
}

fn default_cache_ttl() -> u64 {
    300 // 5 minutes
}

impl Default for ClientConfig {
    fn default() -> Self {
        ClientConfig {
            base_url: default_base_url(),
            timeout_ms: default_timeout_ms(),
            max_retries: default_max_retries(),
            retry_delay_ms: default_retry_delay_ms(),
            login_endpoint: default_login_endpoint(),
            login_view: default_login_view(),
            credential_key: default_credential_key(),
            cache_capacity: default_cache_capacity(),
            cache_ttl_secs: default_cache_ttl(),
        }
    }
}

impl ClientConfig {
    /// Load configuration from a YAML file
    ///
    /// # Arguments
    /// * `path` - Path to the YAML configuration file
    ///
    /// # Returns
    /// * `Ok(ClientConfig)` if loading and validation succeed
    /// * `Err(ClientError)` if file cannot be read or config is invalid
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path.as_ref()).map_err(|e| {
            ClientError::Config(format!("Failed to read config file: {}", e))
        })?;

        Self::from_yaml(&content)
    }

    /// Parse and validate configuration from a YAML string
    pub fn from_yaml(content: &str) -> Result<Self> {
        let config: ClientConfig = serde_yaml::from_str(content).map_err(|e| {
            ClientError::Config(format!("Failed to parse config file: {}", e))
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Create a default configuration pointing at `base_url`
    pub fn with_base_url(base_url: impl Into<String>) -> Result<Self> {
        let config = ClientConfig {
            base_url: base_url.into(),
            ..Default::default()
        };
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration
    ///
    /// # Validation Rules
    /// - base_url must be an absolute http(s) URL
    /// - timeout_ms must be > 0
    /// - login_endpoint and login_view must not be empty
    /// - cache_capacity and cache_ttl_secs must be > 0
    pub fn validate(&self) -> Result<()> {
        let url = reqwest::Url::parse(&self.base_url).map_err(|e| {
            ClientError::Config(format!("base_url '{}' is not a valid URL: {}", self.base_url, e))
        })?;

        if url.scheme() != "http" && url.scheme() != "https" {
            return Err(ClientError::Config(format!(
                "base_url must use http or https, got '{}'",
                url.scheme()
            )));
        }

        if self.timeout_ms == 0 {
            return Err(ClientError::Config(
                "timeout_ms must be greater than 0".to_string(),
            ));
        }

        if self.login_endpoint.trim().is_empty() {
            return Err(ClientError::Config(
                "login_endpoint must not be empty".to_string(),
            ));
        }

        if self.login_view.trim().is_empty() {
            return Err(ClientError::Config(
                "login_view must not be empty".to_string(),
            ));
        }

        if self.credential_key.is_empty() {
            return Err(ClientError::Config(
                "credential_key must not be empty".to_string(),
            ));
        }

        if self.cache_capacity == 0 {
            return Err(ClientError::Config(
                "cache_capacity must be greater than 0".to_string(),
            ));
        }

        if self.cache_ttl_secs == 0 {
            return Err(ClientError::Config(
                "cache_ttl_secs must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }

    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ClientConfig::default();
        assert_eq!(config.base_url, "http://localhost:8088/api");
        assert_eq!(config.timeout_ms, 15_000);
        assert_eq!(config.max_retries, 3);
        assert_eq!(config.retry_delay_ms, 1000);
        assert_eq!(config.login_view, "/login");
        assert_eq!(config.cache_capacity, 100);
        assert_eq!(config.cache_ttl(), Duration::from_secs(300));
    }

    #[test]
    fn test_validate_valid_config() {
        let config = ClientConfig::default();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_bad_base_url() {
        let mut config = ClientConfig::default();
        config.base_url = "not a url".to_string();
        assert!(config.validate().is_err());

        config.base_url = "ftp://example.com/api".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_zero_timeout() {
        let mut config = ClientConfig::default();
        config.timeout_ms = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_zero_cache_settings() {
        let mut config = ClientConfig::default();
        config.cache_capacity = 0;
        assert!(config.validate().is_err());

        let mut config = ClientConfig::default();
        config.cache_ttl_secs = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_zero_retries_allowed() {
        let mut config = ClientConfig::default();
        config.max_retries = 0;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_from_yaml_applies_defaults() {
        let config = ClientConfig::from_yaml("base_url: \"https://eval.example.edu/api\"\n").unwrap();
        assert_eq!(config.base_url, "https://eval.example.edu/api");
        assert_eq!(config.timeout_ms, 15_000);
        assert_eq!(config.login_endpoint, "auth/login");
    }

    #[test]
    fn test_with_base_url_invalid() {
        assert!(ClientConfig::with_base_url("nope").is_err());
        assert!(ClientConfig::with_base_url("http://127.0.0.1:9000").is_ok());
    }
}
