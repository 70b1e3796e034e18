//! Intent resolution
//!
//! Forwards free text to the engine's `/extract` endpoint and fills every
//! missing transfer parameter with a fixed default, so the risk check always
//! receives a fully-populated request even when extraction is partial.

use crate::error::TransportError;
use crate::gateway::{self, Endpoint, Transport};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info};

pub const DEFAULT_ASSET: &str = "USDT";
pub const DEFAULT_ORIGIN: &str = "Binance";
pub const DEFAULT_DESTINATION: &str = "MetaMask";
pub const DEFAULT_NETWORK: &str = "ERC20";
pub const NULL_ADDRESS: &str = "0x0000000000000000000000000000000000000000";

/// Transfer parameters as extracted by the engine. Any field may be missing.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Intent {
    #[serde(default)]
    pub asset: Option<String>,
    #[serde(default)]
    pub origin: Option<String>,
    #[serde(default)]
    pub destination: Option<String>,
    #[serde(default)]
    pub network: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
}

/// Fully-populated intent, the body of a `/check` request
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ResolvedIntent {
    pub asset: String,
    pub origin: String,
    pub destination: String,
    pub network: String,
    pub address: String,
}

impl Intent {
    pub fn asset(&self) -> Option<&str> {
        present(&self.asset)
    }

    pub fn address(&self) -> Option<&str> {
        present(&self.address)
    }

    /// Names of the fields the engine left absent or empty
    pub fn missing_fields(&self) -> Vec<&'static str> {
        [
            ("asset", &self.asset),
            ("origin", &self.origin),
            ("destination", &self.destination),
            ("network", &self.network),
            ("address", &self.address),
        ]
        .into_iter()
        .filter(|(_, value)| present(value).is_none())
        .map(|(name, _)| name)
        .collect()
    }

    /// Apply the fixed defaults to every missing field
    pub fn resolve(&self) -> ResolvedIntent {
        ResolvedIntent {
            asset: or_default(&self.asset, DEFAULT_ASSET),
            origin: or_default(&self.origin, DEFAULT_ORIGIN),
            destination: or_default(&self.destination, DEFAULT_DESTINATION),
            network: or_default(&self.network, DEFAULT_NETWORK),
            address: or_default(&self.address, NULL_ADDRESS),
        }
    }
}

fn present(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

fn or_default(value: &Option<String>, default: &str) -> String {
    present(value).unwrap_or(default).to_string()
}

#[derive(Debug, Serialize)]
struct ExtractRequest<'a> {
    text: &'a str,
}

/// Calls `/extract` and defaults the result
#[derive(Clone)]
pub struct IntentResolver {
    transport: Arc<dyn Transport>,
}

impl IntentResolver {
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self { transport }
    }

    /// Raw extraction, before defaults. Callers must pass non-blank text.
    pub async fn extract(&self, text: &str) -> Result<Intent, TransportError> {
        let intent: Intent =
            gateway::call(self.transport.as_ref(), Endpoint::Extract, &ExtractRequest { text })
                .await?;

        debug!(?intent, "Intent extracted");
        Ok(intent)
    }

    pub async fn resolve(&self, text: &str) -> Result<ResolvedIntent, TransportError> {
        let intent = self.extract(text).await?;

        let missing = intent.missing_fields();
        if !missing.is_empty() {
            info!(?missing, "Applying intent defaults");
        }

        Ok(intent.resolve())
    }
}
