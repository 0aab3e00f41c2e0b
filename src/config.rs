//! Server configuration from the environment

use crate::llm::DEFAULT_BASE_URL;
use crate::preamble::{PreambleSource, DEFAULT_PREAMBLE_PATH};
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

const DEFAULT_PORT: u16 = 3000;
const DEFAULT_TIMEOUT_SECS: u64 = 300;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("OPENAI_API_KEY is not set")]
    MissingApiKey,
    #[error("invalid value for {name}: {value:?}")]
    InvalidValue { name: &'static str, value: String },
}

/// Everything the exchange server needs at startup
#[derive(Clone)]
pub struct Config {
    pub provider_api_key: String,
    pub provider_base_url: String,
    pub provider_timeout: Duration,
    /// Injected lecture text; takes precedence over the file
    pub preamble_text: Option<String>,
    pub preamble_path: PathBuf,
    /// Lecture used when neither text nor file is available
    pub preamble_fallback: Option<String>,
    pub port: u16,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build from an arbitrary variable lookup. Empty values count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        let provider_api_key = get("OPENAI_API_KEY").ok_or(ConfigError::MissingApiKey)?;

        let port = match get("TOYO_PORT") {
            Some(value) => value
                .trim()
                .parse()
                .map_err(|_| ConfigError::InvalidValue { name: "TOYO_PORT", value })?,
            None => DEFAULT_PORT,
        };

        let timeout_secs = match get("TOYO_PROVIDER_TIMEOUT_SECS") {
            Some(value) => value.trim().parse().map_err(|_| ConfigError::InvalidValue {
                name: "TOYO_PROVIDER_TIMEOUT_SECS",
                value,
            })?,
            None => DEFAULT_TIMEOUT_SECS,
        };

        Ok(Self {
            provider_api_key,
            provider_base_url: get("OPENAI_BASE_URL").unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
            provider_timeout: Duration::from_secs(timeout_secs),
            preamble_text: get("TOYO_PREAMBLE_TEXT"),
            preamble_path: get("TOYO_PREAMBLE_PATH")
                .map_or_else(|| PathBuf::from(DEFAULT_PREAMBLE_PATH), PathBuf::from),
            preamble_fallback: get("TOYO_PREAMBLE_FALLBACK"),
            port,
        })
    }

    pub fn preamble_source(&self) -> PreambleSource {
        let source =
            PreambleSource::new(self.preamble_text.clone(), Some(self.preamble_path.clone()));
        match &self.preamble_fallback {
            Some(fallback) => source.with_fallback(fallback.clone()),
            None => source,
        }
    }
}

// Keeps the credential out of logs
impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("provider_api_key", &"<redacted>")
            .field("provider_base_url", &self.provider_base_url)
            .field("provider_timeout", &self.provider_timeout)
            .field("preamble_text", &self.preamble_text.as_ref().map(String::len))
            .field("preamble_path", &self.preamble_path)
            .field("preamble_fallback", &self.preamble_fallback)
            .field("port", &self.port)
            .finish()
    }
}
