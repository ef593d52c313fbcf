use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;

use crate::models::{ParseScopeError, Scope};

/// Environment variable naming the target IP set
pub const IP_SET_NAME_VAR: &str = "IP_SET_NAME";
/// Environment variable naming the target scope
pub const SCOPE_VAR: &str = "WAF_SCOPE";

/// Errors raised while loading configuration
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("missing required environment variable: {0}")]
    Missing(&'static str),

    #[error(transparent)]
    InvalidScope(#[from] ParseScopeError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid configuration file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("could not serialize configuration: {0}")]
    Serialize(#[from] toml::ser::Error),
}

/// Which IP set an invocation targets
///
/// Read from the environment at the start of every invocation; there are no
/// defaults.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetConfig {
    pub ip_set_name: String,
    pub scope: Scope,
}

impl TargetConfig {
    /// Read the target from the process environment
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read the target through an arbitrary variable lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        Self::with_overrides(None, None, lookup)
    }

    /// Read the target, preferring explicit values over `lookup` field by field
    pub fn with_overrides<F>(
        ip_set_name: Option<String>,
        scope: Option<Scope>,
        lookup: F,
    ) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |key: &'static str| {
            lookup(key)
                .filter(|value| !value.trim().is_empty())
                .ok_or(ConfigError::Missing(key))
        };

        let ip_set_name = match ip_set_name.filter(|name| !name.trim().is_empty()) {
            Some(name) => name,
            None => required(IP_SET_NAME_VAR)?,
        };
        let scope = match scope {
            Some(scope) => scope,
            None => required(SCOPE_VAR)?.parse::<Scope>()?,
        };

        Ok(TargetConfig { ip_set_name, scope })
    }
}

/// Runtime configuration for the handler binaries
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// IP set store connection
    pub store: StoreConfig,
    /// Output configuration
    pub output: OutputConfig,
}

/// IP set store connection settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Base URL of the store endpoint
    pub endpoint: String,
    /// Region the endpoint serves, informational
    pub region: Option<String>,
    /// Per-request timeout in seconds
    pub timeout_seconds: u64,
    /// Page size used when listing IP sets
    pub list_page_limit: u32,
    /// Bearer token forwarded to the endpoint (signing proxies)
    pub auth_token: Option<String>,
}

/// Output configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    /// Output format: "json", "jsonl", or "console"
    pub format: String,
    /// Output file path (stdout when unset)
    pub file_path: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            store: StoreConfig {
                endpoint: "https://wafv2.us-east-1.amazonaws.com".to_string(),
                region: Some("us-east-1".to_string()),
                timeout_seconds: 30,
                list_page_limit: 100,
                auth_token: None,
            },
            output: OutputConfig {
                format: "json".to_string(),
                file_path: None,
            },
        }
    }
}

impl Config {
    /// Load configuration from a file
    pub fn from_file(path: &PathBuf) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&contents)?;
        Ok(config)
    }

    /// Save configuration to a file
    pub fn to_file(&self, path: &PathBuf) -> Result<(), ConfigError> {
        let contents = toml::to_string_pretty(self)?;
        std::fs::write(path, contents)?;
        Ok(())
    }

    /// Load from `path` when it exists, otherwise fall back to defaults
    pub fn load_or_default(path: &PathBuf) -> Result<Self, ConfigError> {
        if path.exists() {
            Self::from_file(path)
        } else {
            log::warn!("Config file {:?} not found, using defaults", path);
            Ok(Config::default())
        }
    }
}
