pub mod validation;

use serde::{Deserialize, Serialize};
use std::fmt;

use self::validation::validate_config;

/// Environment variable naming an alternative config file path.
pub const CONFIG_PATH_ENV: &str = "MSGBRIDGE_CONFIG";
const UPSTREAM_API_KEY_ENV: &str = "NVIDIA_API_KEY";
const AUTH_TOKEN_ENV: &str = "AUTH_TOKEN";
const UPSTREAM_BASE_URL_ENV: &str = "UPSTREAM_BASE_URL";

/// Error type for configuration loading and validation.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to parse YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("Config validation error: {0}")]
    Validation(String),
}

/// Where `GET /v1/models` takes its listing from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ModelsSource {
    /// Derived from the prefix rule table.
    #[default]
    Static,
    /// Translated from the upstream's own `/models` listing.
    Upstream,
}

impl fmt::Display for ModelsSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ModelsSource::Static => write!(f, "static"),
            ModelsSource::Upstream => write!(f, "upstream"),
        }
    }
}

/// Server configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_host")]
    pub host: String,
    /// Overall upstream request timeout. Unset means no local timeout.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub upstream_timeout_secs: Option<u64>,
    #[serde(default = "default_pool_max_idle_per_host")]
    pub pool_max_idle_per_host: usize,
}

fn default_port() -> u16 {
    8787
}
fn default_host() -> String {
    "0.0.0.0".to_string()
}
fn default_pool_max_idle_per_host() -> usize {
    16
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
            host: default_host(),
            upstream_timeout_secs: None,
            pool_max_idle_per_host: default_pool_max_idle_per_host(),
        }
    }
}

/// The OpenAI-compatible service requests are forwarded to.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpstreamConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default)]
    pub api_key: String,
}

fn default_base_url() -> String {
    "https://integrate.api.nvidia.com/v1".to_string()
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            api_key: String::new(),
        }
    }
}

/// Client authentication configuration. No token means the check is off.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ClientAuthConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auth_token: Option<String>,
}

/// One `(prefix, target)` entry of the model rule table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelRule {
    pub prefix: String,
    pub target: String,
}

impl ModelRule {
    #[must_use]
    pub fn new(prefix: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            target: target.into(),
        }
    }
}

/// Rule table used when `model_map` is absent from the config file.
#[must_use]
pub fn default_model_map() -> Vec<ModelRule> {
    vec![
        ModelRule::new("claude-opus-4", "minimaxai/minimax-m2.1"),
        ModelRule::new("claude-sonnet-4", "z-ai/glm4.7"),
    ]
}

/// Model listing configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ModelsConfig {
    #[serde(default)]
    pub source: ModelsSource,
}

/// Feature flags and settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeaturesConfig {
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_log_level() -> String {
    "INFO".to_string()
}

impl Default for FeaturesConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
        }
    }
}

/// Top-level application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub upstream: UpstreamConfig,
    #[serde(default)]
    pub client_authentication: ClientAuthConfig,
    /// Ordered; the first matching prefix wins.
    #[serde(default = "default_model_map")]
    pub model_map: Vec<ModelRule>,
    #[serde(default)]
    pub models: ModelsConfig,
    #[serde(default)]
    pub features: FeaturesConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            upstream: UpstreamConfig::default(),
            client_authentication: ClientAuthConfig::default(),
            model_map: default_model_map(),
            models: ModelsConfig::default(),
            features: FeaturesConfig::default(),
        }
    }
}

impl AppConfig {
    /// Overlay secrets and the upstream base URL from the environment.
    ///
    /// Only non-empty variables take effect.
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides(|name| std::env::var(name).ok());
    }

    fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let lookup = |name: &str| lookup(name).filter(|value| !value.trim().is_empty());
        if let Some(key) = lookup(UPSTREAM_API_KEY_ENV) {
            self.upstream.api_key = key;
        }
        if let Some(base_url) = lookup(UPSTREAM_BASE_URL_ENV) {
            self.upstream.base_url = base_url;
        }
        if let Some(token) = lookup(AUTH_TOKEN_ENV) {
            self.client_authentication.auth_token = Some(token);
        }
    }
}

/// Load configuration from a YAML file, apply environment overrides and validate.
///
/// # Errors
///
/// Returns [`ConfigError::Io`] when reading the file fails, [`ConfigError::Yaml`]
/// when parsing fails, or [`ConfigError::Validation`] when semantic validation fails.
pub fn load_config(path: &str) -> Result<AppConfig, ConfigError> {
    let contents = std::fs::read_to_string(path)?;
    let mut config: AppConfig = serde_yaml::from_str(&contents)?;
    config.apply_env_overrides();
    validate_config(&config)?;
    Ok(config)
}

/// Like [`load_config`], but a missing file yields the built-in defaults
/// (still subject to environment overrides and validation).
///
/// # Errors
///
/// Same as [`load_config`], except that a missing file is not an error.
pub fn load_config_or_default(path: &str) -> Result<AppConfig, ConfigError> {
    match load_config(path) {
        Err(ConfigError::Io(err)) if err.kind() == std::io::ErrorKind::NotFound => {
            let mut config = AppConfig::default();
            config.apply_env_overrides();
            validate_config(&config)?;
            Ok(config)
        }
        other => other,
    }
}
