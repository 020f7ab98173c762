//! Environment configuration.

pub mod error;


pub use error::ConfigError;

use std::env;
use std::net::IpAddr;
use std::path::PathBuf;

/// Service configuration, loaded from `RECALL_*` environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// HTTP port.
    pub port: u16,

    /// HTTP bind address.
    pub bind_addr: IpAddr,

    /// Qdrant endpoint.
    pub qdrant_url: String,

    /// Cache collection name.
    pub collection_name: String,

    /// Embedding model directory; absent runs the embedder in stub mode.
    pub model_path: Option<PathBuf>,

    /// Backend model identifier (deployment parameter).
    pub llm_model: String,

    /// Live-entry ceiling enforced by the sweeper.
    pub max_entries: u64,

    /// Seconds between sweep passes.
    pub sweep_interval_secs: u64,
}

pub const DEFAULT_QDRANT_URL: &str = "http://localhost:6334";
pub const DEFAULT_LLM_MODEL: &str = "gpt-4o-mini";

impl Default for Config {
    fn default() -> Self {
        Self {
            port: 8080,
            bind_addr: IpAddr::V4(std::net::Ipv4Addr::new(127, 0, 0, 1)),
            qdrant_url: DEFAULT_QDRANT_URL.to_string(),
            collection_name: crate::store::DEFAULT_COLLECTION_NAME.to_string(),
            model_path: None,
            llm_model: DEFAULT_LLM_MODEL.to_string(),
            max_entries: crate::store::DEFAULT_MAX_ENTRIES,
            sweep_interval_secs: 60,
        }
    }
}

impl Config {
    const ENV_PORT: &'static str = "RECALL_PORT";
    const ENV_BIND_ADDR: &'static str = "RECALL_BIND_ADDR";
    const ENV_QDRANT_URL: &'static str = "RECALL_QDRANT_URL";
    const ENV_COLLECTION: &'static str = "RECALL_COLLECTION";
    const ENV_MODEL_PATH: &'static str = "RECALL_MODEL_PATH";
    const ENV_LLM_MODEL: &'static str = "RECALL_LLM_MODEL";
    const ENV_MAX_ENTRIES: &'static str = "RECALL_MAX_ENTRIES";
    const ENV_SWEEP_INTERVAL_SECS: &'static str = "RECALL_SWEEP_INTERVAL_SECS";

    /// Loads configuration from the environment, falling back to defaults.
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let port = Self::parse_port_from_env(defaults.port)?;
        let bind_addr = Self::parse_bind_addr_from_env(defaults.bind_addr)?;
        let qdrant_url = Self::parse_string_from_env(Self::ENV_QDRANT_URL, defaults.qdrant_url);
        let collection_name =
            Self::parse_string_from_env(Self::ENV_COLLECTION, defaults.collection_name);
        let model_path = Self::parse_optional_path_from_env(Self::ENV_MODEL_PATH);
        let llm_model = Self::parse_string_from_env(Self::ENV_LLM_MODEL, defaults.llm_model);
        let max_entries = Self::parse_u64_from_env(Self::ENV_MAX_ENTRIES, defaults.max_entries);
        let sweep_interval_secs =
            Self::parse_u64_from_env(Self::ENV_SWEEP_INTERVAL_SECS, defaults.sweep_interval_secs);

        Ok(Self {
            port,
            bind_addr,
            qdrant_url,
            collection_name,
            model_path,
            llm_model,
            max_entries,
            sweep_interval_secs,
        })
    }

    /// Cross-field validation.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if let Some(ref path) = self.model_path {
            if !path.exists() {
                return Err(ConfigError::PathNotFound { path: path.clone() });
            }
            if !path.is_dir() {
                return Err(ConfigError::NotADirectory { path: path.clone() });
            }
        }

        if self.max_entries == 0 {
            return Err(ConfigError::ZeroValue {
                name: "RECALL_MAX_ENTRIES",
            });
        }
        if self.sweep_interval_secs == 0 {
            return Err(ConfigError::ZeroValue {
                name: "RECALL_SWEEP_INTERVAL_SECS",
            });
        }

        Ok(())
    }

    /// `bind_addr:port` for the listener.
    pub fn socket_addr(&self) -> String {
        format!("{}:{}", self.bind_addr, self.port)
    }

    fn parse_port_from_env(default: u16) -> Result<u16, ConfigError> {
        match env::var(Self::ENV_PORT) {
            Ok(value) => {
                let port: u16 = value.parse().map_err(|e| ConfigError::PortParseError {
                    value: value.clone(),
                    source: e,
                })?;

                if port == 0 {
                    return Err(ConfigError::InvalidPort { value });
                }

                Ok(port)
            }
            Err(_) => Ok(default),
        }
    }

    fn parse_bind_addr_from_env(default: IpAddr) -> Result<IpAddr, ConfigError> {
        match env::var(Self::ENV_BIND_ADDR) {
            Ok(value) => value
                .parse()
                .map_err(|e| ConfigError::InvalidBindAddr { value, source: e }),
            Err(_) => Ok(default),
        }
    }

    fn parse_optional_path_from_env(var_name: &str) -> Option<PathBuf> {
        env::var(var_name)
            .ok()
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
            .map(PathBuf::from)
    }

    fn parse_string_from_env(var_name: &str, default: String) -> String {
        env::var(var_name).unwrap_or(default)
    }

    fn parse_u64_from_env(var_name: &str, default: u64) -> u64 {
        env::var(var_name)
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(default)
    }
}
