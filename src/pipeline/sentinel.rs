//! Sentinel pipeline: intent → `/check` → risk verdict

use super::{ModePipeline, PipelineOutput};
use crate::error::TransportError;
use crate::gateway::{self, Endpoint, Transport};
use crate::intent::{IntentResolver, ResolvedIntent};
use crate::models::{Mode, RiskVerdict};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::info;

pub struct SentinelPipeline {
    resolver: IntentResolver,
    transport: Arc<dyn Transport>,
}

impl SentinelPipeline {
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self {
            resolver: IntentResolver::new(transport.clone()),
            transport,
        }
    }

    pub fn resolver(&self) -> &IntentResolver {
        &self.resolver
    }

    /// Risk check for a fully-populated intent
    pub async fn run(&self, intent: &ResolvedIntent) -> Result<RiskVerdict, TransportError> {
        info!(
            asset = %intent.asset,
            origin = %intent.origin,
            destination = %intent.destination,
            network = %intent.network,
            "Sentinel: checking transfer"
        );

        let verdict: RiskVerdict =
            gateway::call(self.transport.as_ref(), Endpoint::Check, intent).await?;

        info!(
            risk_level = %verdict.risk_level,
            trust_score = verdict.trust_score.value(),
            "Sentinel: verdict received"
        );

        Ok(verdict)
    }
}

#[async_trait]
impl ModePipeline for SentinelPipeline {
    fn mode(&self) -> Mode {
        Mode::Sentinel
    }

    /// `/extract` then `/check`, strictly in sequence
    async fn resolve(&self, text: &str) -> Result<PipelineOutput, TransportError> {
        let intent = self.resolver.resolve(text).await?;
        let verdict = self.run(&intent).await?;
        Ok(PipelineOutput::Sentinel { intent, verdict })
    }
}
