pub mod validation;

use serde::{Deserialize, Serialize};

use self::validation::validate_config;

const ENV_UPSTREAM_BASE: &str = "GROK_API_BASE";
const ENV_UPSTREAM_KEY: &str = "GROK_API_KEY";
const ENV_PORT: &str = "PORT";

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

/// Server configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub runtime_worker_threads: Option<usize>,
    #[serde(default = "default_max_body_bytes")]
    pub max_body_bytes: usize,
}

fn default_port() -> u16 {
    3000
}
fn default_host() -> String {
    "0.0.0.0".to_string()
}
fn default_max_body_bytes() -> usize {
    2 * 1024 * 1024
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
            host: default_host(),
            runtime_worker_threads: None,
            max_body_bytes: default_max_body_bytes(),
        }
    }
}

/// Upstream (Grok-shaped API) configuration handed to the dispatcher.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpstreamConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Fallback credential used when the caller sends none.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    #[serde(default = "default_model")]
    pub default_model: String,
    /// Inbound model ids starting with this prefix are forwarded unchanged.
    #[serde(default = "default_model_prefix")]
    pub model_prefix: String,
    #[serde(default = "default_timeout")]
    pub timeout: u64,
    #[serde(default = "default_http_pool_max_idle_per_host")]
    pub http_pool_max_idle_per_host: usize,
    #[serde(default = "default_http_pool_idle_timeout_secs")]
    pub http_pool_idle_timeout_secs: u64,
    #[serde(default)]
    pub http_use_env_proxy: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub proxy: Option<String>,
}

fn default_base_url() -> String {
    "https://api.grok.ai".to_string()
}
fn default_model() -> String {
    "grok-1".to_string()
}
fn default_model_prefix() -> String {
    "grok-".to_string()
}
fn default_timeout() -> u64 {
    180
}
fn default_http_pool_max_idle_per_host() -> usize {
    16
}
fn default_http_pool_idle_timeout_secs() -> u64 {
    15
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            api_key: None,
            default_model: default_model(),
            model_prefix: default_model_prefix(),
            timeout: default_timeout(),
            http_pool_max_idle_per_host: default_http_pool_max_idle_per_host(),
            http_pool_idle_timeout_secs: default_http_pool_idle_timeout_secs(),
            http_use_env_proxy: false,
            proxy: None,
        }
    }
}

impl UpstreamConfig {
    /// Join the base URL with an upstream path such as `/v1/embeddings`.
    #[must_use]
    pub fn endpoint_url(&self, path: &str) -> String {
        let base = self.base_url.trim_end_matches('/');
        let mut out = String::with_capacity(base.len() + path.len());
        out.push_str(base);
        out.push_str(path);
        out
    }
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
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub upstream: UpstreamConfig,
    #[serde(default)]
    pub features: FeaturesConfig,
}

/// Load configuration from a YAML file and validate it.
///
/// # Errors
///
/// Returns [`ConfigError::Io`] when reading the file fails, [`ConfigError::Yaml`]
/// when parsing fails, or [`ConfigError::Validation`] when semantic validation fails.
pub fn load_config(path: &str) -> Result<AppConfig, ConfigError> {
    let contents = std::fs::read_to_string(path)?;
    let config: AppConfig = serde_yaml::from_str(&contents)?;
    validate_config(&config)?;
    Ok(config)
}

/// Load configuration for the server binary.
///
/// A missing file yields the defaults. Process environment overrides
/// (`GROK_API_BASE`, `GROK_API_KEY`, `PORT`) are applied before validation.
///
/// # Errors
///
/// Same as [`load_config`], minus the missing-file case.
pub fn load_runtime_config(path: &str) -> Result<AppConfig, ConfigError> {
    let mut config = match std::fs::read_to_string(path) {
        Ok(contents) => serde_yaml::from_str(&contents)?,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => AppConfig::default(),
        Err(err) => return Err(err.into()),
    };
    apply_env_overrides(&mut config, |name| std::env::var(name).ok())?;
    validate_config(&config)?;
    Ok(config)
}

/// Apply environment overrides using `lookup` to read variables.
///
/// # Errors
///
/// Returns [`ConfigError::Validation`] when `PORT` is not a valid port number.
pub fn apply_env_overrides<F>(config: &mut AppConfig, lookup: F) -> Result<(), ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(base_url) = lookup(ENV_UPSTREAM_BASE).filter(|v| !v.trim().is_empty()) {
        config.upstream.base_url = base_url;
    }
    if let Some(api_key) = lookup(ENV_UPSTREAM_KEY).filter(|v| !v.trim().is_empty()) {
        config.upstream.api_key = Some(api_key);
    }
    if let Some(port) = lookup(ENV_PORT).filter(|v| !v.trim().is_empty()) {
        config.server.port = port
            .trim()
            .parse()
            .map_err(|_| ConfigError::Validation(format!("{ENV_PORT} is not a valid port: {port}")))?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_example_config() {
        let config = load_config("config.example.yaml");
        assert!(
            config.is_ok(),
            "Failed to load example config: {:?}",
            config.err()
        );
        let config = config.unwrap();
        assert_eq!(config.server.port, 3000);
        assert_eq!(config.upstream.base_url, "https://api.grok.ai");
        assert_eq!(config.upstream.default_model, "grok-1");
        assert_eq!(config.upstream.model_prefix, "grok-");
        assert!(config.upstream.api_key.is_none());
        assert_eq!(config.features.log_level, "INFO");
    }

    #[test]
    fn test_empty_yaml_uses_defaults() {
        let config: AppConfig = serde_yaml::from_str("{}").unwrap();
        assert_eq!(config.server.port, 3000);
        assert_eq!(config.server.max_body_bytes, 2 * 1024 * 1024);
        assert_eq!(config.upstream.timeout, 180);
        assert_eq!(config.upstream.http_pool_max_idle_per_host, 16);
    }

    #[test]
    fn test_env_overrides() {
        let mut config = AppConfig::default();
        apply_env_overrides(&mut config, |name| match name {
            "GROK_API_BASE" => Some("http://127.0.0.1:9000".to_string()),
            "GROK_API_KEY" => Some("env-key".to_string()),
            "PORT" => Some("8080".to_string()),
            _ => None,
        })
        .unwrap();
        assert_eq!(config.upstream.base_url, "http://127.0.0.1:9000");
        assert_eq!(config.upstream.api_key.as_deref(), Some("env-key"));
        assert_eq!(config.server.port, 8080);
    }

    #[test]
    fn test_env_override_rejects_bad_port() {
        let mut config = AppConfig::default();
        let err = apply_env_overrides(&mut config, |name| {
            (name == "PORT").then(|| "eighty".to_string())
        })
        .unwrap_err();
        assert!(matches!(err, ConfigError::Validation(_)));
    }

    #[test]
    fn test_blank_env_values_are_ignored() {
        let mut config = AppConfig::default();
        apply_env_overrides(&mut config, |_| Some("  ".to_string())).unwrap();
        assert!(config.upstream.api_key.is_none());
        assert_eq!(config.server.port, 3000);
    }

    #[test]
    fn test_endpoint_url_trims_trailing_slash() {
        let upstream = UpstreamConfig {
            base_url: "https://api.grok.ai/".to_string(),
            ..UpstreamConfig::default()
        };
        assert_eq!(
            upstream.endpoint_url("/v1/chat/completions"),
            "https://api.grok.ai/v1/chat/completions"
        );
    }
}
