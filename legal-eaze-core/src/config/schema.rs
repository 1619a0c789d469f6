//! Configuration schema definitions

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Root configuration for legal-eaze
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// Remote answering service
    #[serde(default)]
    pub transport: TransportConfig,
    /// Local conversation storage
    #[serde(default)]
    pub storage: StorageConfig,
    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Remote endpoint configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransportConfig {
    /// Base URL of the answering service
    #[serde(default = "default_endpoint")]
    pub endpoint: String,
    /// Path of the question route
    #[serde(default = "default_ask_path")]
    pub path: String,
    /// Request timeout in seconds; 0 waits forever
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_endpoint() -> String {
    "http://localhost:8080".to_string()
}

fn default_ask_path() -> String {
    "/ask_bot".to_string()
}

fn default_timeout_secs() -> u64 {
    120
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            endpoint: default_endpoint(),
            path: default_ask_path(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl TransportConfig {
    /// Full URL of the question route
    pub fn url(&self) -> String {
        let base = self.endpoint.trim_end_matches('/');
        if self.path.starts_with('/') {
            format!("{}{}", base, self.path)
        } else {
            format!("{}/{}", base, self.path)
        }
    }
}

/// Conversation storage configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Origin directory holding the key-value files
    #[serde(default = "default_storage_dir")]
    pub dir: String,
    /// Key under which the conversation list is stored
    #[serde(default = "default_storage_key")]
    pub key: String,
}

fn default_storage_dir() -> String {
    "~/.legal-eaze/storage".to_string()
}

fn default_storage_key() -> String {
    "chats".to_string()
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            dir: default_storage_dir(),
            key: default_storage_key(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Default log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Log format (text, json)
    #[serde(default = "default_log_format")]
    pub format: String,
    /// Directory for log files
    #[serde(default = "default_log_dir")]
    pub dir: String,
    /// Module-specific overrides
    #[serde(default)]
    pub overrides: HashMap<String, String>,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "text".to_string()
}

fn default_log_dir() -> String {
    "~/.legal-eaze/logs".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
            dir: default_log_dir(),
            overrides: HashMap::new(),
        }
    }
}
