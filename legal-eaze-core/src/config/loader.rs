//! Configuration loading and management
//!
//! Sources, later wins: built-in defaults, `config.json`, alias variables
//! (`LEGAL_EAZE_ENDPOINT`, ...), then field variables of the form
//! `LEGAL_EAZE__<SECTION>__<FIELD>`.

use super::schema::Config;
use super::validate::validate_config;
use crate::Error;
use std::path::{Path, PathBuf};

/// Short variable names for the settings changed most often
const ALIASES: [(&str, &str); 3] = [
    ("LEGAL_EAZE_ENDPOINT", "transport.endpoint"),
    ("LEGAL_EAZE_STORAGE_DIR", "storage.dir"),
    ("LEGAL_EAZE_LOG_DIR", "logging.dir"),
];

const FIELD_PREFIX: &str = "LEGAL_EAZE__";

/// Configuration loader
pub struct ConfigLoader {
    config_dir: PathBuf,
}

impl ConfigLoader {
    /// Create a new config loader with the default config directory
    pub fn new() -> Self {
        let config_dir = dirs::home_dir()
            .map(|h| h.join(".legal-eaze"))
            .unwrap_or_else(|| PathBuf::from(".legal-eaze"));

        Self { config_dir }
    }

    /// Create a new config loader with a custom config directory
    pub fn with_dir<P: AsRef<Path>>(dir: P) -> Self {
        Self {
            config_dir: dir.as_ref().to_path_buf(),
        }
    }

    /// Load configuration from file and the process environment
    pub fn load(&self) -> crate::Result<Config> {
        self.load_with_env(std::env::vars())
    }

    /// Load configuration, reading overrides from `vars`
    pub fn load_with_env<I>(&self, vars: I) -> crate::Result<Config>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let config_path = self.config_path();
        let mut config = if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            serde_json::from_str(&content)?
        } else {
            Config::default()
        };

        let vars: Vec<(String, String)> = vars.into_iter().collect();

        for (name, field) in ALIASES {
            if let Some((_, value)) = vars.iter().find(|(key, _)| key == name) {
                apply_override(&mut config, name, field, value)?;
            }
        }

        for (name, value) in &vars {
            if let Some(field) = field_from_var(name) {
                apply_override(&mut config, name, &field, value)?;
            }
        }

        validate_config(&config)?;
        Ok(config)
    }

    /// Save configuration to file
    pub fn save(&self, config: &Config) -> crate::Result<()> {
        std::fs::create_dir_all(&self.config_dir)?;
        let content = serde_json::to_string_pretty(config)?;
        std::fs::write(self.config_path(), content)?;
        Ok(())
    }

    /// Get the config file path
    pub fn config_path(&self) -> PathBuf {
        self.config_dir.join("config.json")
    }
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

/// `LEGAL_EAZE__TRANSPORT__TIMEOUT_SECS` -> `transport.timeout_secs`
fn field_from_var(name: &str) -> Option<String> {
    let rest = name.strip_prefix(FIELD_PREFIX)?;
    let parts: Vec<String> = rest
        .split("__")
        .filter(|part| !part.is_empty())
        .map(str::to_ascii_lowercase)
        .collect();
    if parts.is_empty() {
        None
    } else {
        Some(parts.join("."))
    }
}

/// Set one field from its textual value; string fields take the text as-is
fn apply_override(config: &mut Config, var: &str, field: &str, value: &str) -> crate::Result<()> {
    match field {
        "transport.endpoint" => config.transport.endpoint = value.to_string(),
        "transport.path" => config.transport.path = value.to_string(),
        "transport.timeout_secs" => {
            config.transport.timeout_secs = value.trim().parse().map_err(|_| {
                Error::Config(format!(
                    "{}: transport.timeout_secs must be a whole number of seconds, got {:?}",
                    var, value
                ))
            })?;
        }
        "storage.dir" => config.storage.dir = value.to_string(),
        "storage.key" => config.storage.key = value.to_string(),
        "logging.level" => config.logging.level = value.to_string(),
        "logging.format" => config.logging.format = value.to_string(),
        "logging.dir" => config.logging.dir = value.to_string(),
        other => match other.strip_prefix("logging.overrides.") {
            Some(module) if !module.is_empty() => {
                config
                    .logging
                    .overrides
                    .insert(module.to_string(), value.to_string());
            }
            _ => {
                return Err(Error::Config(format!(
                    "{}: no configuration field {}",
                    var, other
                )))
            }
        },
    }
    Ok(())
}
