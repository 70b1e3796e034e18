//! Runtime configuration
//!
//! Values come from the process environment (after `.env` is loaded by the
//! binaries). Lookups go through a closure so parsing can be tested without
//! touching the real environment.

use crate::error::SentinelError;
use crate::Result;
use std::env;
use std::time::Duration;

pub const DEFAULT_ENGINE_URL: &str = "http://localhost:8000";
pub const DEFAULT_API_PORT: u16 = 8080;

/// Where and how to reach the analysis engine
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineConfig {
    /// Base URL including any path prefix, without trailing slash
    pub base_url: String,
    /// Forwarded as `X-API-Key` when set
    pub api_key: Option<String>,
    /// `None` keeps the transport default (no timeout)
    pub timeout: Option<Duration>,
}

impl EngineConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: normalize_base_url(&base_url.into()),
            api_key: None,
            timeout: None,
        }
    }

    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let base_url = non_empty(lookup("SENTINEL_ENGINE_URL"))
            .or_else(|| non_empty(lookup("FASTAPI_URL")))
            .unwrap_or_else(|| DEFAULT_ENGINE_URL.to_string());

        let api_key = non_empty(lookup("SENTINEL_API_KEY"));

        let timeout = match non_empty(lookup("SENTINEL_ENGINE_TIMEOUT_SECS")) {
            Some(raw) => {
                let secs: u64 = raw.trim().parse().map_err(|_| {
                    SentinelError::Config(format!(
                        "SENTINEL_ENGINE_TIMEOUT_SECS must be a whole number of seconds, got '{}'",
                        raw
                    ))
                })?;
                if secs == 0 {
                    return Err(SentinelError::Config(
                        "SENTINEL_ENGINE_TIMEOUT_SECS must be greater than zero".to_string(),
                    ));
                }
                Some(Duration::from_secs(secs))
            }
            None => None,
        };

        Ok(Self {
            base_url: normalize_base_url(&base_url),
            api_key,
            timeout,
        })
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = normalize_base_url(&base_url.into());
        self
    }

    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self::new(DEFAULT_ENGINE_URL)
    }
}

/// HTTP front end settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    pub port: u16,
}

impl ServerConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let port = match non_empty(lookup("PORT")).or_else(|| non_empty(lookup("API_PORT"))) {
            Some(raw) => raw.trim().parse().map_err(|_| {
                SentinelError::Config(format!("PORT must be a valid port number, got '{}'", raw))
            })?,
            None => DEFAULT_API_PORT,
        };

        Ok(Self { port })
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

fn normalize_base_url(raw: &str) -> String {
    raw.trim().trim_end_matches('/').to_string()
}
