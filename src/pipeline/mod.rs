//! Mode pipelines
//!
//! Two mutually exclusive resolution strategies behind one interface:
//! Sentinel (intent → `/check` → risk verdict) and Discovery
//! (query tokens → `/find` → route plan). Both are stateless over the
//! shared transport and are selected by `Mode`.

use crate::error::TransportError;
use crate::gateway::Transport;
use crate::intent::ResolvedIntent;
use crate::models::{Mode, RiskVerdict, RoutePlan};
use async_trait::async_trait;
use serde::Serialize;
use std::sync::Arc;

pub mod discovery;
pub mod sentinel;

pub use discovery::{DiscoveryPipeline, DiscoveryQuery, DEFAULT_NETWORK};
pub use sentinel::SentinelPipeline;

/// Pipeline result, tagged with the mode that produced it
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum PipelineOutput {
    Sentinel {
        intent: ResolvedIntent,
        verdict: RiskVerdict,
    },
    Discovery {
        query: DiscoveryQuery,
        plan: RoutePlan,
    },
}

impl PipelineOutput {
    pub fn mode(&self) -> Mode {
        match self {
            PipelineOutput::Sentinel { .. } => Mode::Sentinel,
            PipelineOutput::Discovery { .. } => Mode::Discovery,
        }
    }
}

/// Resolve raw query text into a tagged pipeline output
#[async_trait]
pub trait ModePipeline: Send + Sync {
    fn mode(&self) -> Mode;

    async fn resolve(&self, text: &str) -> Result<PipelineOutput, TransportError>;
}

/// Both pipelines over one transport
pub struct Pipelines {
    sentinel: SentinelPipeline,
    discovery: DiscoveryPipeline,
}

impl Pipelines {
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self {
            sentinel: SentinelPipeline::new(transport.clone()),
            discovery: DiscoveryPipeline::new(transport),
        }
    }

    pub fn get(&self, mode: Mode) -> &dyn ModePipeline {
        match mode {
            Mode::Sentinel => &self.sentinel,
            Mode::Discovery => &self.discovery,
        }
    }

    pub fn sentinel(&self) -> &SentinelPipeline {
        &self.sentinel
    }

    pub fn discovery(&self) -> &DiscoveryPipeline {
        &self.discovery
    }

    /// Single-shot resolution with an explicitly chosen mode
    pub async fn resolve(&self, mode: Mode, text: &str) -> Result<PipelineOutput, TransportError> {
        self.get(mode).resolve(text).await
    }
}
