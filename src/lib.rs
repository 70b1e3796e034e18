//! SafeSentinel Console
//!
//! Client-side orchestrator for the SafeSentinel analysis engine:
//! - Resolves free-text transfer intents into fully-populated requests
//! - Runs the Sentinel pipeline (extract → check → risk verdict)
//! - Runs the Discovery pipeline (find → liquidity route)
//! - Keeps an append-only conversation transcript per session
//! - Projects engine results into renderable reports
//!
//! Every engine failure collapses into a single `EngineUnreachable` error
//! and surfaces as one fixed assistant turn.

pub mod api;
pub mod audit;
pub mod classifier;
pub mod config;
pub mod console;
pub mod conversation;
pub mod error;
pub mod gateway;
pub mod intent;
pub mod models;
pub mod pipeline;
pub mod projector;

#[cfg(test)]
mod test_support;

pub use classifier::{PresenceClassifier, TurnAction, TurnClassifier};
pub use config::{EngineConfig, ServerConfig};
pub use conversation::{Conversation, ConversationTurn, SubmitOutcome, SubmitRejection};
pub use error::{Result, SentinelError, TransportError};
pub use gateway::{Endpoint, HttpGateway, Transport};
pub use intent::{Intent, IntentResolver, ResolvedIntent};
pub use pipeline::{ModePipeline, PipelineOutput, Pipelines};
pub use projector::{project, RenderableResult};

// Domain models
pub use models::*;
