//! Configuration loading and validation for coppertail.
//!
//! Loads configuration from a TOML file with environment variable
//! overrides (`COPPERTAIL_*`). Missing file means defaults. Secret values
//! never appear in `Debug` output.

pub mod secrets;

pub use secrets::{SecretCache, SecretError, SecretProvider};

use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::debug;

/// The root configuration structure.
#[derive(Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Model runtime settings
    #[serde(default)]
    pub model: ModelConfig,

    /// Session memory settings
    #[serde(default)]
    pub memory: MemoryConfig,

    /// Invocation log settings
    #[serde(default)]
    pub recorder: RecorderConfig,

    /// Tool adapter settings
    #[serde(default)]
    pub tools: ToolsConfig,

    /// Gateway settings
    #[serde(default)]
    pub gateway: GatewayConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelConfig {
    #[serde(default = "default_model_id")]
    pub model_id: String,

    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    #[serde(default = "default_temperature")]
    pub temperature: f32,

    #[serde(default = "default_top_p")]
    pub top_p: f32,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            model_id: default_model_id(),
            max_tokens: default_max_tokens(),
            temperature: default_temperature(),
            top_p: default_top_p(),
        }
    }
}

fn default_model_id() -> String {
    "anthropic/claude-sonnet-4".into()
}
fn default_max_tokens() -> u32 {
    2048
}
fn default_temperature() -> f32 {
    0.7
}
fn default_top_p() -> f32 {
    0.9
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MemoryConfig {
    /// The external memory store this deployment binds sessions against.
    /// Required for session binding — invocations fail fast without it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub memory_id: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecorderConfig {
    #[serde(default = "default_log_table")]
    pub log_table: String,
}

impl Default for RecorderConfig {
    fn default() -> Self {
        Self {
            log_table: default_log_table(),
        }
    }
}

fn default_log_table() -> String {
    "invocation-log".into()
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ToolsConfig {
    #[serde(default)]
    pub cloud: CloudConfig,

    #[serde(default)]
    pub search: SearchConfig,
}

/// Cloud-resource guidance tool settings.
///
/// `auto_retry` defaults to off and the regional scope defaults when the
/// user names none — both are policy decisions, kept configurable.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CloudConfig {
    #[serde(default = "default_region")]
    pub default_region: String,

    #[serde(default)]
    pub auto_retry: bool,
}

impl Default for CloudConfig {
    fn default() -> Self {
        Self {
            default_region: default_region(),
            auto_retry: false,
        }
    }
}

fn default_region() -> String {
    "ap-northeast-1".into()
}

#[derive(Clone, Serialize, Deserialize)]
pub struct SearchConfig {
    /// The search API endpoint.
    #[serde(default = "default_search_url")]
    pub api_url: String,

    /// Name of the secret holding the search API key.
    #[serde(default = "default_search_secret")]
    pub secret_name: String,

    /// Direct API key override for local development; skips the secret
    /// provider entirely when set.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    #[serde(default = "default_search_timeout")]
    pub timeout_secs: u64,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            api_url: default_search_url(),
            secret_name: default_search_secret(),
            api_key: None,
            timeout_secs: default_search_timeout(),
        }
    }
}

fn default_search_url() -> String {
    "https://api.tavily.com/search".into()
}

fn default_search_secret() -> String {
    "search-api-key".into()
}
fn default_search_timeout() -> u64 {
    15
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".into()
}
fn default_port() -> u16 {
    8080
}

fn redact(s: &Option<String>) -> &'static str {
    match s {
        Some(_) => "[REDACTED]",
        None => "None",
    }
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("model", &self.model)
            .field("memory", &self.memory)
            .field("recorder", &self.recorder)
            .field("tools", &self.tools)
            .field("gateway", &self.gateway)
            .finish()
    }
}

impl std::fmt::Debug for SearchConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SearchConfig")
            .field("api_url", &self.api_url)
            .field("secret_name", &self.secret_name)
            .field("api_key", &redact(&self.api_key))
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

/// Errors from configuration loading.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config file {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: toml::de::Error,
    },
}

impl AppConfig {
    /// Load configuration from a TOML file, then apply env overrides.
    ///
    /// A missing file is not an error — defaults apply.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = match path {
            Some(p) if p.exists() => {
                let raw = std::fs::read_to_string(p).map_err(|source| ConfigError::Read {
                    path: p.display().to_string(),
                    source,
                })?;
                toml::from_str(&raw).map_err(|source| ConfigError::Parse {
                    path: p.display().to_string(),
                    source,
                })?
            }
            _ => {
                debug!("No config file found, using defaults");
                Self::default()
            }
        };
        config.apply_env_overrides();
        Ok(config)
    }

    /// Apply `COPPERTAIL_*` environment variable overrides.
    pub fn apply_env_overrides(&mut self) {
        if let Ok(v) = std::env::var("COPPERTAIL_MODEL_ID") {
            self.model.model_id = v;
        }
        if let Ok(v) = std::env::var("COPPERTAIL_MEMORY_ID") {
            self.memory.memory_id = Some(v);
        }
        if let Ok(v) = std::env::var("COPPERTAIL_LOG_TABLE") {
            self.recorder.log_table = v;
        }
        if let Ok(v) = std::env::var("COPPERTAIL_SEARCH_API_KEY") {
            self.tools.search.api_key = Some(v);
        }
        if let Ok(v) = std::env::var("COPPERTAIL_DEFAULT_REGION") {
            self.tools.cloud.default_region = v;
        }
        if let Ok(v) = std::env::var("COPPERTAIL_GATEWAY_PORT") {
            if let Ok(port) = v.parse() {
                self.gateway.port = port;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn defaults_match_runtime_expectations() {
        let config = AppConfig::default();
        assert_eq!(config.model.max_tokens, 2048);
        assert!((config.model.temperature - 0.7).abs() < f32::EPSILON);
        assert!((config.model.top_p - 0.9).abs() < f32::EPSILON);
        assert_eq!(config.gateway.port, 8080);
        assert_eq!(config.tools.cloud.default_region, "ap-northeast-1");
        assert!(!config.tools.cloud.auto_retry);
        assert!(config.memory.memory_id.is_none());
    }

    #[test]
    fn load_from_toml_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
[model]
model_id = "anthropic/claude-haiku"
max_tokens = 1024

[memory]
memory_id = "mem-abc123"

[tools.cloud]
default_region = "us-west-2"
"#
        )
        .unwrap();

        let config = AppConfig::load(Some(file.path())).unwrap();
        assert_eq!(config.model.model_id, "anthropic/claude-haiku");
        assert_eq!(config.model.max_tokens, 1024);
        assert_eq!(config.memory.memory_id.as_deref(), Some("mem-abc123"));
        assert_eq!(config.tools.cloud.default_region, "us-west-2");
        // Untouched sections keep defaults
        assert_eq!(config.gateway.port, 8080);
    }

    #[test]
    fn missing_file_uses_defaults() {
        let config = AppConfig::load(Some(Path::new("/nonexistent/coppertail.toml"))).unwrap();
        assert_eq!(config.model.max_tokens, 2048);
    }

    #[test]
    fn malformed_file_is_an_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "not [valid toml").unwrap();
        assert!(matches!(
            AppConfig::load(Some(file.path())),
            Err(ConfigError::Parse { .. })
        ));
    }

    #[test]
    fn debug_output_redacts_api_key() {
        let mut config = AppConfig::default();
        config.tools.search.api_key = Some("tvly-secret".into());
        let debug = format!("{config:?}");
        assert!(!debug.contains("tvly-secret"));
        assert!(debug.contains("[REDACTED]"));
    }
}
