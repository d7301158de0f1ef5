use std::collections::HashSet;

use super::{AppConfig, ConfigError};

/// Validate the full application config, returning an error if any rule is violated.
///
/// # Errors
///
/// Returns [`ConfigError::Validation`] when any configuration invariant is violated.
pub fn validate_config(config: &AppConfig) -> Result<(), ConfigError> {
    validate_server_config(config)?;
    validate_upstream(config)?;
    validate_auth_token(config)?;
    validate_model_map(config)?;
    validate_log_level(config)?;
    Ok(())
}

fn validation_err(msg: impl Into<String>) -> ConfigError {
    ConfigError::Validation(msg.into())
}

fn validate_server_config(config: &AppConfig) -> Result<(), ConfigError> {
    let server = &config.server;
    if server.pool_max_idle_per_host == 0 {
        return Err(validation_err(
            "server.pool_max_idle_per_host must be greater than 0",
        ));
    }
    if server.upstream_timeout_secs == Some(0) {
        return Err(validation_err(
            "server.upstream_timeout_secs must be greater than 0 when set",
        ));
    }
    Ok(())
}

fn validate_upstream(config: &AppConfig) -> Result<(), ConfigError> {
    let upstream = &config.upstream;
    let parsed = url::Url::parse(&upstream.base_url).map_err(|err| {
        validation_err(format!(
            "upstream.base_url '{}' is not a valid URL: {err}",
            upstream.base_url
        ))
    })?;
    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(validation_err(format!(
            "upstream.base_url must use http or https, got '{}'",
            parsed.scheme()
        )));
    }
    if upstream.api_key.trim().is_empty() {
        return Err(validation_err(
            "upstream.api_key cannot be empty (set it in the config or via NVIDIA_API_KEY)",
        ));
    }
    Ok(())
}

fn validate_auth_token(config: &AppConfig) -> Result<(), ConfigError> {
    if let Some(token) = config.client_authentication.auth_token.as_deref() {
        if token.trim().is_empty() {
            return Err(validation_err(
                "client_authentication.auth_token cannot be blank when set",
            ));
        }
    }
    Ok(())
}

fn validate_model_map(config: &AppConfig) -> Result<(), ConfigError> {
    let mut seen = HashSet::new();
    for (index, rule) in config.model_map.iter().enumerate() {
        if rule.prefix.is_empty() {
            return Err(validation_err(format!(
                "model_map[{index}].prefix cannot be empty"
            )));
        }
        if rule.target.trim().is_empty() {
            return Err(validation_err(format!(
                "model_map[{index}].target cannot be empty"
            )));
        }
        if !seen.insert(rule.prefix.as_str()) {
            return Err(validation_err(format!(
                "model_map[{index}] duplicates prefix '{}'",
                rule.prefix
            )));
        }
    }
    Ok(())
}

const VALID_LOG_LEVELS: &[&str] = &[
    "DEBUG", "INFO", "WARNING", "WARN", "ERROR", "CRITICAL", "TRACE", "DISABLED",
];

fn validate_log_level(config: &AppConfig) -> Result<(), ConfigError> {
    let level = config.features.log_level.to_uppercase();
    if !VALID_LOG_LEVELS.contains(&level.as_str()) {
        return Err(validation_err(format!(
            "features.log_level '{}' is not one of {VALID_LOG_LEVELS:?}",
            config.features.log_level
        )));
    }
    Ok(())
}
