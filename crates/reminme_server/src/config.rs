//! Process configuration read from the environment.
//!
//! # Responsibility
//! - Resolve every server setting from environment variables with defaults.
//! - Decide which AI integrations are enabled (a missing API key disables one).
//!
//! # Invariants
//! - Invalid values are reported with the offending variable name; they are
//!   never silently replaced by defaults.
//! - Blank values count as unset.

use reminme_ai::{ProviderConfig, DEFAULT_TIMEOUT_SECS};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::net::SocketAddr;
use std::path::PathBuf;

const DEFAULT_BIND_ADDR: &str = "127.0.0.1:8787";
const DEFAULT_DB_PATH: &str = "reminme.sqlite3";
const DEFAULT_OPENAI_BASE_URL: &str = "https://api.openai.com/v1";
const DEFAULT_OPENAI_MODEL: &str = "gpt-4o-mini";
const DEFAULT_EMBEDDING_MODEL: &str = "text-embedding-3-small";
const DEFAULT_PERPLEXITY_BASE_URL: &str = "https://api.perplexity.ai";
const DEFAULT_PERPLEXITY_MODEL: &str = "sonar";

/// Invalid configuration value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigError {
    pub variable: &'static str,
    pub reason: String,
}

impl ConfigError {
    fn new(variable: &'static str, reason: impl Into<String>) -> Self {
        Self {
            variable,
            reason: reason.into(),
        }
    }
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "invalid `{}`: {}", self.variable, self.reason)
    }
}

impl Error for ConfigError {}

/// Pinecone-style index endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VectorIndexConfig {
    pub url: String,
    pub api_key: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    pub bind_addr: SocketAddr,
    pub db_path: PathBuf,
    pub log_level: String,
    pub log_dir: PathBuf,
    pub cors_origins: Vec<String>,
    /// General-purpose completion provider.
    pub chat: Option<ProviderConfig>,
    /// Search-augmented completion provider used for citations.
    pub search: Option<ProviderConfig>,
    /// Embedding endpoint; shares the chat provider's key and base URL.
    pub embedding: Option<ProviderConfig>,
    pub vector_index: Option<VectorIndexConfig>,
    pub ai_timeout_secs: u64,
}

impl ServerConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Builds the configuration from an arbitrary variable source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get = |name: &str| {
            lookup(name)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };

        let bind_addr = get("REMINME_BIND_ADDR")
            .unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string())
            .parse::<SocketAddr>()
            .map_err(|err| ConfigError::new("REMINME_BIND_ADDR", err.to_string()))?;

        let db_path = PathBuf::from(
            get("REMINME_DB_PATH").unwrap_or_else(|| DEFAULT_DB_PATH.to_string()),
        );

        let log_level = get("REMINME_LOG_LEVEL")
            .unwrap_or_else(|| reminme_core::default_log_level().to_string());

        let log_dir = match get("REMINME_LOG_DIR") {
            Some(value) => {
                let path = PathBuf::from(&value);
                if !path.is_absolute() {
                    return Err(ConfigError::new(
                        "REMINME_LOG_DIR",
                        format!("must be an absolute path, got `{value}`"),
                    ));
                }
                path
            }
            None => std::env::current_dir()
                .map_err(|err| ConfigError::new("REMINME_LOG_DIR", err.to_string()))?
                .join("logs"),
        };

        let cors_origins = get("REMINME_CORS_ORIGINS")
            .map(|value| {
                value
                    .split(',')
                    .map(str::trim)
                    .filter(|origin| !origin.is_empty())
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default();

        let ai_timeout_secs = match get("REMINME_AI_TIMEOUT_SECS") {
            Some(value) => match value.parse::<u64>() {
                Ok(secs) if secs > 0 => secs,
                _ => {
                    return Err(ConfigError::new(
                        "REMINME_AI_TIMEOUT_SECS",
                        format!("must be a positive number of seconds, got `{value}`"),
                    ))
                }
            },
            None => DEFAULT_TIMEOUT_SECS,
        };

        let openai_key = get("OPENAI_API_KEY");
        let openai_base =
            get("OPENAI_BASE_URL").unwrap_or_else(|| DEFAULT_OPENAI_BASE_URL.to_string());
        let chat = openai_key.as_ref().map(|key| ProviderConfig {
            base_url: openai_base.clone(),
            api_key: key.clone(),
            model: get("OPENAI_MODEL").unwrap_or_else(|| DEFAULT_OPENAI_MODEL.to_string()),
            timeout_secs: ai_timeout_secs,
        });
        let embedding = openai_key.as_ref().map(|key| ProviderConfig {
            base_url: openai_base.clone(),
            api_key: key.clone(),
            model: get("OPENAI_EMBEDDING_MODEL")
                .unwrap_or_else(|| DEFAULT_EMBEDDING_MODEL.to_string()),
            timeout_secs: ai_timeout_secs,
        });
        let search = get("PERPLEXITY_API_KEY").map(|key| ProviderConfig {
            base_url: get("PERPLEXITY_BASE_URL")
                .unwrap_or_else(|| DEFAULT_PERPLEXITY_BASE_URL.to_string()),
            api_key: key,
            model: get("PERPLEXITY_MODEL")
                .unwrap_or_else(|| DEFAULT_PERPLEXITY_MODEL.to_string()),
            timeout_secs: ai_timeout_secs,
        });

        let vector_index = match (get("VECTOR_INDEX_URL"), get("VECTOR_INDEX_API_KEY")) {
            (Some(url), Some(api_key)) => Some(VectorIndexConfig { url, api_key }),
            (Some(_), None) => {
                return Err(ConfigError::new(
                    "VECTOR_INDEX_API_KEY",
                    "is required when VECTOR_INDEX_URL is set",
                ))
            }
            _ => None,
        };

        Ok(Self {
            bind_addr,
            db_path,
            log_level,
            log_dir,
            cors_origins,
            chat,
            search,
            embedding,
            vector_index,
            ai_timeout_secs,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::ServerConfig;
    use std::collections::HashMap;

    fn config_from(pairs: &[(&str, &str)]) -> Result<ServerConfig, super::ConfigError> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(key, value)| (key.to_string(), value.to_string()))
            .collect();
        ServerConfig::from_lookup(|name| vars.get(name).cloned())
    }

    #[test]
    fn defaults_leave_ai_integrations_disabled() {
        let config = config_from(&[]).expect("config should load");
        assert_eq!(config.bind_addr.to_string(), "127.0.0.1:8787");
        assert_eq!(config.db_path.to_str(), Some("reminme.sqlite3"));
        assert!(config.log_dir.is_absolute());
        assert!(config.chat.is_none());
        assert!(config.search.is_none());
        assert!(config.vector_index.is_none());
        assert_eq!(config.ai_timeout_secs, 60);
    }

    #[test]
    fn api_keys_enable_providers_with_default_models() {
        let config = config_from(&[
            ("OPENAI_API_KEY", "sk-test"),
            ("PERPLEXITY_API_KEY", "pplx-test"),
            ("REMINME_CORS_ORIGINS", "http://localhost:3000, ,https://app.example"),
        ])
        .expect("config should load");
        let chat = config.chat.expect("chat should be present");
        assert_eq!(chat.model, "gpt-4o-mini");
        assert_eq!(chat.base_url, "https://api.openai.com/v1");
        let embedding = config.embedding.expect("embedding should be configured");
        assert_eq!(embedding.model, "text-embedding-3-small");
        assert_eq!(config.search.expect("search should be present").model, "sonar");
        assert_eq!(
            config.cors_origins,
            vec!["http://localhost:3000", "https://app.example"]
        );
    }

    #[test]
    fn invalid_values_name_the_variable() {
        let err = config_from(&[("REMINME_BIND_ADDR", "not an address")]).unwrap_err();
        assert_eq!(err.variable, "REMINME_BIND_ADDR");

        let err = config_from(&[("REMINME_AI_TIMEOUT_SECS", "soon")]).unwrap_err();
        assert_eq!(err.variable, "REMINME_AI_TIMEOUT_SECS");

        let err = config_from(&[("REMINME_LOG_DIR", "logs")]).unwrap_err();
        assert_eq!(err.variable, "REMINME_LOG_DIR");

        let err = config_from(&[("VECTOR_INDEX_URL", "https://index.example")]).unwrap_err();
        assert_eq!(err.variable, "VECTOR_INDEX_API_KEY");
    }

    #[test]
    fn blank_values_count_as_unset() {
        let config = config_from(&[("OPENAI_API_KEY", "   "), ("REMINME_BIND_ADDR", "")])
            .expect("config should load");
        assert!(config.chat.is_none());
        assert_eq!(config.bind_addr.port(), 8787);
    }
}
