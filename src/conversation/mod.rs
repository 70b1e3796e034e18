//! Conversation driver
//!
//! Owns one session: its state machine, the pipelines it dispatches to and
//! the classifier used when no mode is pinned. The session lock is taken
//! twice per turn (begin and complete) and never held across an engine
//! call, so readers always see the user turn and the pending flag while a
//! request is in flight.

pub mod state;
pub mod transcript;

pub use state::{
    AssistantReply, Phase, SessionSnapshot, SessionState, Submission, SubmitRejection,
    ENGINE_UNREACHABLE_MESSAGE, GREETING_MESSAGE, MAX_QUERY_CHARS, MIN_QUERY_CHARS,
};
pub use transcript::{ConversationTurn, Transcript, TurnRole};

use crate::audit::{request_fingerprint, ResolutionLog, ResolutionOutcome, ResolutionRecord};
use crate::classifier::{PresenceClassifier, TurnAction, TurnClassifier};
use crate::error::TransportError;
use crate::gateway::Endpoint;
use crate::models::{Mode, PayloadKind};
use crate::pipeline::{PipelineOutput, Pipelines};
use crate::projector;
use chrono::Utc;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::RwLock;
use tracing::{info, warn};
use uuid::Uuid;

/// Result of a `submit` call
#[derive(Debug, Clone)]
pub enum SubmitOutcome {
    /// The assistant turn that closed the request
    Replied(ConversationTurn),
    /// Nothing was appended and no engine call was made
    Rejected(SubmitRejection),
}

enum Resolution {
    Output(PipelineOutput),
    Clarify(String),
}

pub struct Conversation {
    session_id: Uuid,
    state: RwLock<SessionState>,
    pipelines: Arc<Pipelines>,
    classifier: Arc<dyn TurnClassifier>,
    log: Arc<ResolutionLog>,
}

impl Conversation {
    pub fn new(session_id: Uuid, pipelines: Arc<Pipelines>, log: Arc<ResolutionLog>) -> Self {
        Self {
            session_id,
            state: RwLock::new(SessionState::new(session_id)),
            pipelines,
            classifier: Arc::new(PresenceClassifier),
            log,
        }
    }

    pub fn with_classifier(mut self, classifier: Arc<dyn TurnClassifier>) -> Self {
        self.classifier = classifier;
        self
    }

    pub fn session_id(&self) -> Uuid {
        self.session_id
    }

    pub async fn pending(&self) -> bool {
        self.state.read().await.pending()
    }

    pub async fn mode(&self) -> Option<Mode> {
        self.state.read().await.mode()
    }

    pub async fn set_mode(&self, mode: Option<Mode>) {
        self.state.write().await.set_mode(mode);
    }

    pub async fn transcript(&self) -> Vec<ConversationTurn> {
        self.state.read().await.transcript().turns().to_vec()
    }

    pub async fn transcript_text(&self) -> String {
        self.state.read().await.transcript().to_plain_text()
    }

    pub async fn snapshot(&self) -> SessionSnapshot {
        self.state.read().await.snapshot()
    }

    /// Run one user turn to completion.
    ///
    /// Exactly one assistant turn is appended for every accepted
    /// submission, whatever the engine does.
    pub async fn submit(&self, text: &str) -> SubmitOutcome {
        let submission = {
            let mut state = self.state.write().await;
            match state.begin(text) {
                Ok(submission) => submission,
                Err(rejection) => return SubmitOutcome::Rejected(rejection),
            }
        };

        let started = Instant::now();
        let fingerprint = request_fingerprint(submission.mode(), submission.text());

        let (mode, outcome, reply) = match self.resolve(&submission).await {
            Ok(Resolution::Output(output)) => {
                let result = projector::project(&output);
                (
                    Some(output.mode()),
                    ResolutionOutcome::Resolved,
                    AssistantReply::Result(result),
                )
            }
            Ok(Resolution::Clarify(message)) => (
                None,
                ResolutionOutcome::Clarified,
                AssistantReply::Clarification(message),
            ),
            Err(err) => {
                warn!(
                    session_id = %self.session_id,
                    code = err.code(),
                    error = %err,
                    "Engine request failed"
                );
                (
                    Some(mode_for_failure(submission.mode(), &err)),
                    ResolutionOutcome::EngineUnreachable,
                    AssistantReply::EngineUnreachable,
                )
            }
        };

        let turn = {
            let mut state = self.state.write().await;
            state.complete(submission, reply).clone()
        };

        let elapsed_ms = started.elapsed().as_millis() as u64;
        self.log
            .record(ResolutionRecord {
                record_id: Uuid::new_v4(),
                session_id: self.session_id,
                mode,
                request_fingerprint: fingerprint,
                outcome,
                payload_kind: turn.payload_kind(),
                elapsed_ms,
                created_at: Utc::now(),
            })
            .await;

        info!(
            session_id = %self.session_id,
            turn_id = turn.id(),
            ?outcome,
            elapsed_ms,
            "Turn completed"
        );

        SubmitOutcome::Replied(turn)
    }

    async fn resolve(&self, submission: &Submission) -> Result<Resolution, TransportError> {
        if let Some(mode) = submission.mode() {
            let output = self.pipelines.resolve(mode, submission.text()).await?;
            return Ok(Resolution::Output(output));
        }

        let sentinel = self.pipelines.sentinel();
        let intent = sentinel.resolver().extract(submission.text()).await?;

        match self.classifier.classify(&intent) {
            TurnAction::RunSentinel => {
                let intent = intent.resolve();
                let verdict = sentinel.run(&intent).await?;
                Ok(Resolution::Output(PipelineOutput::Sentinel { intent, verdict }))
            }
            TurnAction::Clarify => {
                info!(session_id = %self.session_id, "Intent too vague, asking for clarification");
                Ok(Resolution::Clarify(self.classifier.clarification(&intent)))
            }
        }
    }
}

fn mode_for_failure(pinned: Option<Mode>, err: &TransportError) -> Mode {
    pinned.unwrap_or(match err.endpoint() {
        Endpoint::Find => Mode::Discovery,
        Endpoint::Extract | Endpoint::Check => Mode::Sentinel,
    })
}

impl SubmitOutcome {
    pub fn turn(&self) -> Option<&ConversationTurn> {
        match self {
            SubmitOutcome::Replied(turn) => Some(turn),
            SubmitOutcome::Rejected(_) => None,
        }
    }

    pub fn payload_kind(&self) -> PayloadKind {
        self.turn().map(|t| t.payload_kind()).unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EngineConfig;
    use crate::gateway::{HttpGateway, Transport};
    use crate::intent::{DEFAULT_NETWORK, NULL_ADDRESS};
    use crate::projector::RenderableResult;
    use crate::test_support::{
        audited_verdict_json, route_json, spawn_engine, verdict_json, ScriptedTransport,
    };
    use axum::http::StatusCode;
    use axum::routing::post;
    use axum::{Json, Router};
    use serde_json::{json, Value};
    use std::time::Duration;
    use tokio::sync::Notify;

    fn conversation(transport: Arc<dyn Transport>) -> (Conversation, Arc<ResolutionLog>) {
        let log = Arc::new(ResolutionLog::new());
        let conv = Conversation::new(
            Uuid::new_v4(),
            Arc::new(Pipelines::new(transport)),
            log.clone(),
        );
        (conv, log)
    }

    #[tokio::test]
    async fn test_each_submission_adds_two_turns() {
        let transport = Arc::new(
            ScriptedTransport::new()
                .respond(Endpoint::Extract, json!({ "asset": "USDT" }))
                .respond(Endpoint::Check, verdict_json("LOW", 91.0))
                .respond(Endpoint::Extract, json!({}))
                .fail(Endpoint::Extract),
        );
        let (conv, log) = conversation(transport);

        conv.submit("send USDT").await;
        conv.submit("hello there").await;
        conv.submit("send ETH").await;

        let turns = conv.transcript().await;
        assert_eq!(turns.len(), 1 + 2 * 3);

        let ids: Vec<u64> = turns.iter().map(|t| t.id()).collect();
        let mut sorted = ids.clone();
        sorted.sort_unstable();
        sorted.dedup();
        assert_eq!(ids, sorted);

        let roles: Vec<TurnRole> = turns.iter().map(|t| t.role()).collect();
        assert_eq!(
            roles,
            vec![
                TurnRole::Assistant,
                TurnRole::User,
                TurnRole::Assistant,
                TurnRole::User,
                TurnRole::Assistant,
                TurnRole::User,
                TurnRole::Assistant,
            ]
        );

        let outcomes: Vec<ResolutionOutcome> = log
            .list_for_session(conv.session_id())
            .await
            .into_iter()
            .map(|r| r.outcome)
            .collect();
        assert_eq!(
            outcomes,
            vec![
                ResolutionOutcome::Resolved,
                ResolutionOutcome::Clarified,
                ResolutionOutcome::EngineUnreachable,
            ]
        );
    }

    #[tokio::test]
    async fn test_submit_while_resolving_is_ignored() {
        let gate = Arc::new(Notify::new());
        let transport = Arc::new(
            ScriptedTransport::new()
                .respond(Endpoint::Find, route_json())
                .gated(gate.clone()),
        );
        let (conv, _log) = conversation(transport.clone());
        conv.set_mode(Some(Mode::Discovery)).await;
        let conv = Arc::new(conv);

        let first = {
            let conv = conv.clone();
            tokio::spawn(async move { conv.submit("OKB X-Layer").await })
        };

        while transport.calls().is_empty() {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        assert!(conv.pending().await);
        assert_eq!(conv.transcript().await.len(), 2);

        let second = conv.submit("ETH Arbitrum").await;
        assert!(matches!(
            second,
            SubmitOutcome::Rejected(SubmitRejection::Pending)
        ));
        assert_eq!(conv.transcript().await.len(), 2);
        assert_eq!(transport.calls().len(), 1);

        gate.notify_one();
        let outcome = first.await.unwrap();
        assert_eq!(outcome.payload_kind(), PayloadKind::Discovery);

        assert!(!conv.pending().await);
        assert_eq!(conv.transcript().await.len(), 3);
        assert_eq!(transport.calls().len(), 1);
    }

    #[tokio::test]
    async fn test_extract_failure_yields_single_failure_turn() {
        let transport = Arc::new(ScriptedTransport::new().fail(Endpoint::Extract));
        let (conv, _log) = conversation(transport.clone());

        let outcome = conv.submit("send USDT").await;
        let turn = outcome.turn().unwrap();
        assert_eq!(turn.role(), TurnRole::Assistant);
        assert_eq!(turn.content(), ENGINE_UNREACHABLE_MESSAGE);
        assert_eq!(turn.payload_kind(), PayloadKind::None);

        assert!(transport.calls_to(Endpoint::Check).is_empty());
        assert_eq!(conv.transcript().await.len(), 3);
        assert!(!conv.pending().await);
    }

    #[tokio::test]
    async fn test_check_http_500_yields_failure_turn() {
        let router = Router::new()
            .route(
                "/extract",
                post(|| async { Json(json!({ "asset": "USDT", "origin": "Binance" })) }),
            )
            .route(
                "/check",
                post(|| async { (StatusCode::INTERNAL_SERVER_ERROR, "engine exploded") }),
            );
        let base = spawn_engine(router).await;
        let gateway = HttpGateway::new(&EngineConfig::new(base)).unwrap();
        let (conv, log) = conversation(Arc::new(gateway));

        conv.submit("send USDT from Binance").await;

        let turns = conv.transcript().await;
        let last = turns.last().unwrap();
        assert_eq!(last.content(), ENGINE_UNREACHABLE_MESSAGE);
        assert_eq!(last.payload_kind(), PayloadKind::None);

        let records = log.list_for_session(conv.session_id()).await;
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].mode, Some(Mode::Sentinel));
        assert_eq!(records[0].outcome, ResolutionOutcome::EngineUnreachable);
    }

    #[tokio::test]
    async fn test_vague_intent_asks_for_clarification() {
        let transport = Arc::new(
            ScriptedTransport::new().respond(Endpoint::Extract, json!({ "network": "BEP20" })),
        );
        let (conv, _log) = conversation(transport.clone());

        let outcome = conv.submit("quero transferir").await;
        let turn = outcome.turn().unwrap();
        assert_eq!(turn.content(), crate::classifier::CLARIFICATION_MESSAGE);
        assert_eq!(turn.payload_kind(), PayloadKind::None);
        assert!(transport.calls_to(Endpoint::Check).is_empty());
    }

    #[tokio::test]
    async fn test_pinned_discovery_skips_extraction() {
        let transport = Arc::new(ScriptedTransport::new().respond(Endpoint::Find, route_json()));
        let (conv, log) = conversation(transport.clone());
        conv.set_mode(Some(Mode::Discovery)).await;

        let outcome = conv.submit("OKB X-Layer").await;
        assert_eq!(outcome.payload_kind(), PayloadKind::Discovery);

        let endpoints: Vec<Endpoint> = transport.calls().into_iter().map(|(e, _)| e).collect();
        assert_eq!(endpoints, vec![Endpoint::Find]);

        let records = log.list_for_session(conv.session_id()).await;
        assert_eq!(records[0].mode, Some(Mode::Discovery));
    }

    #[tokio::test]
    async fn test_pinned_sentinel_never_clarifies() {
        let transport = Arc::new(
            ScriptedTransport::new()
                .respond(Endpoint::Extract, json!({}))
                .respond(Endpoint::Check, verdict_json("MEDIUM", 55.5)),
        );
        let (conv, _log) = conversation(transport.clone());
        conv.set_mode(Some(Mode::Sentinel)).await;

        let outcome = conv.submit("what about this?").await;
        assert_eq!(outcome.payload_kind(), PayloadKind::Risk);

        let check = transport.calls_to(Endpoint::Check);
        assert_eq!(check[0]["asset"], "USDT");
    }

    #[tokio::test]
    async fn test_transfer_scenario_defaults_network_and_address() {
        let transport = Arc::new(
            ScriptedTransport::new()
                .respond(
                    Endpoint::Extract,
                    json!({ "asset": "USDT", "origin": "Binance", "destination": "MetaMask" }),
                )
                .respond(Endpoint::Check, audited_verdict_json()),
        );
        let (conv, _log) = conversation(transport.clone());

        let outcome = conv.submit("Mandar USDT da Binance pra MetaMask").await;

        assert_eq!(
            transport.calls_to(Endpoint::Extract),
            vec![json!({ "text": "Mandar USDT da Binance pra MetaMask" })]
        );
        let check: Vec<Value> = transport.calls_to(Endpoint::Check);
        assert_eq!(
            check,
            vec![json!({
                "asset": "USDT",
                "origin": "Binance",
                "destination": "MetaMask",
                "network": DEFAULT_NETWORK,
                "address": NULL_ADDRESS,
            })]
        );

        let turn = outcome.turn().unwrap();
        assert_eq!(turn.payload_kind(), PayloadKind::Audit);
        match turn.payload() {
            Some(RenderableResult::RiskReport(report)) => {
                assert_eq!(report.trust_score, 38);
                assert_eq!(report.network, DEFAULT_NETWORK);
            }
            other => panic!("expected risk report, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_rejected_input_touches_nothing() {
        let transport = Arc::new(ScriptedTransport::new());
        let (conv, log) = conversation(transport.clone());

        let outcome = conv.submit(" x ").await;
        assert!(matches!(
            outcome,
            SubmitOutcome::Rejected(SubmitRejection::TooShort)
        ));
        assert_eq!(conv.transcript().await.len(), 1);
        assert!(transport.calls().is_empty());
        assert!(log.is_empty().await);
    }
}
