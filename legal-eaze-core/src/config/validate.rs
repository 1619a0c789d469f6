//! Configuration validation rules.

use super::schema::Config;

/// Validate configuration and return aggregated validation errors.
pub fn validate_config(config: &Config) -> crate::Result<()> {
    let mut errors = Vec::new();

    let endpoint = config.transport.endpoint.trim();
    if endpoint.is_empty() {
        errors.push("transport.endpoint must not be empty".to_string());
    } else if !endpoint.starts_with("http://") && !endpoint.starts_with("https://") {
        errors.push("transport.endpoint must start with http:// or https://".to_string());
    }
    if config.transport.path.trim().is_empty() {
        errors.push("transport.path must not be empty".to_string());
    }

    if config.storage.dir.trim().is_empty() {
        errors.push("storage.dir must not be empty".to_string());
    }
    let key = config.storage.key.trim();
    if key.is_empty() {
        errors.push("storage.key must not be empty".to_string());
    } else if key.contains(['/', '\\']) || key.starts_with('.') {
        errors.push("storage.key must be a plain file name".to_string());
    }

    if !matches!(
        config.logging.level.to_ascii_lowercase().as_str(),
        "trace" | "debug" | "info" | "warn" | "error"
    ) {
        errors.push("logging.level must be one of trace, debug, info, warn, error".to_string());
    }
    if !matches!(
        config.logging.format.to_ascii_lowercase().as_str(),
        "text" | "json"
    ) {
        errors.push("logging.format must be text or json".to_string());
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(crate::Error::Config(errors.join("; ")))
    }
}
