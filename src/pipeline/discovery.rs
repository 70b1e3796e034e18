//! Discovery pipeline: query tokens → `/find` → route plan
//!
//! Tokenization is a plain whitespace split. The first token is the asset
//! symbol and everything after it is the network name, so multi-word asset
//! names are not supported.

use super::{ModePipeline, PipelineOutput};
use crate::error::TransportError;
use crate::gateway::{self, Endpoint, Transport};
use crate::models::{Mode, RoutePlan};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;

pub const DEFAULT_NETWORK: &str = "Mainnet";

/// Body of a `/find` request
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DiscoveryQuery {
    pub asset: String,
    pub network: String,
}

impl DiscoveryQuery {
    pub fn parse(text: &str) -> Self {
        let mut tokens = text.split_whitespace();
        let asset = tokens.next().unwrap_or_default().to_string();
        let rest: Vec<&str> = tokens.collect();

        let network = if rest.is_empty() {
            DEFAULT_NETWORK.to_string()
        } else {
            rest.join(" ")
        };

        Self { asset, network }
    }
}

pub struct DiscoveryPipeline {
    transport: Arc<dyn Transport>,
}

impl DiscoveryPipeline {
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self { transport }
    }

    pub async fn run(&self, query_text: &str) -> Result<RoutePlan, TransportError> {
        let query = DiscoveryQuery::parse(query_text);
        self.find(&query).await
    }

    async fn find(&self, query: &DiscoveryQuery) -> Result<RoutePlan, TransportError> {
        info!(asset = %query.asset, network = %query.network, "Discovery: finding route");

        let payload = serde_json::to_value(query).map_err(|e| {
            TransportError::unreachable(Endpoint::Find, format!("request encoding failed: {}", e))
        })?;
        let body = self.transport.send(Endpoint::Find, &payload).await?;
        let plan: RoutePlan = gateway::decode(Endpoint::Find, gateway::unwrap_data_envelope(body))?;

        info!(
            steps = plan.steps.len(),
            cex_source = %plan.cex_source,
            "Discovery: route received"
        );

        Ok(plan)
    }
}

#[async_trait]
impl ModePipeline for DiscoveryPipeline {
    fn mode(&self) -> Mode {
        Mode::Discovery
    }

    async fn resolve(&self, text: &str) -> Result<PipelineOutput, TransportError> {
        let query = DiscoveryQuery::parse(text);
        let plan = self.find(&query).await?;
        Ok(PipelineOutput::Discovery { query, plan })
    }
}
