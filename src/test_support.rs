use crate::error::TransportError;
use crate::gateway::{Endpoint, Transport};
use async_trait::async_trait;
use serde_json::{json, Value};
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use tokio::sync::Notify;

/// Transport that replays canned engine responses and records every call.
///
/// Endpoints without a scripted response fail as unreachable. When gated,
/// each call waits for one `Notify` permit before answering.
#[derive(Default)]
pub(crate) struct ScriptedTransport {
    responses: Mutex<HashMap<Endpoint, VecDeque<Result<Value, TransportError>>>>,
    calls: Mutex<Vec<(Endpoint, Value)>>,
    gate: Option<Arc<Notify>>,
}

impl ScriptedTransport {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn respond(self, endpoint: Endpoint, body: Value) -> Self {
        self.push(endpoint, Ok(body))
    }

    pub(crate) fn fail(self, endpoint: Endpoint) -> Self {
        self.push(
            endpoint,
            Err(TransportError::unreachable(endpoint, "scripted failure")),
        )
    }

    pub(crate) fn gated(mut self, gate: Arc<Notify>) -> Self {
        self.gate = Some(gate);
        self
    }

    fn push(self, endpoint: Endpoint, response: Result<Value, TransportError>) -> Self {
        self.responses
            .lock()
            .expect("responses lock")
            .entry(endpoint)
            .or_default()
            .push_back(response);
        self
    }

    pub(crate) fn calls(&self) -> Vec<(Endpoint, Value)> {
        self.calls.lock().expect("calls lock").clone()
    }

    pub(crate) fn calls_to(&self, endpoint: Endpoint) -> Vec<Value> {
        self.calls()
            .into_iter()
            .filter(|(e, _)| *e == endpoint)
            .map(|(_, payload)| payload)
            .collect()
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn send(&self, endpoint: Endpoint, payload: &Value) -> Result<Value, TransportError> {
        self.calls
            .lock()
            .expect("calls lock")
            .push((endpoint, payload.clone()));

        if let Some(gate) = &self.gate {
            gate.notified().await;
        }

        self.responses
            .lock()
            .expect("responses lock")
            .get_mut(&endpoint)
            .and_then(VecDeque::pop_front)
            .unwrap_or_else(|| Err(TransportError::unreachable(endpoint, "no scripted response")))
    }
}

pub(crate) fn verdict_json(risk_level: &str, trust_score: f64) -> Value {
    json!({
        "status": "SAFE",
        "risk_level": risk_level,
        "title": "Caminho Seguro",
        "message": "Validação concluída.",
        "trust_score": trust_score,
        "on_chain": {
            "status": "SUCCESS",
            "is_contract": false,
            "type": "Personal Wallet (EOA)",
            "explorer_url": "https://blockscan.com/address/0x0000000000000000000000000000000000000000"
        }
    })
}

pub(crate) fn audited_verdict_json() -> Value {
    let mut verdict = verdict_json("HIGH", 38.0);
    verdict["security_audit"] = json!({
        "is_honeypot": true,
        "is_blacklisted": false,
        "can_take_back_ownership": true,
        "is_in_dex": true,
        "hidden_owner": false,
        "trust_score_impact": 110
    });
    verdict["token_intel"] = json!({
        "name": "Tether",
        "symbol": "USDT",
        "id": 825,
        "volume_24h": 51_000_000_000.0
    });
    verdict
}

pub(crate) fn route_json() -> Value {
    json!({
        "steps": [
            "Passo 1: Compre OKB na OKX",
            "Passo 2: Saque via rede X-Layer"
        ],
        "cex_source": "OKX",
        "bridge_needed": false,
        "recommended_bridge": "Nativa",
        "estimated_fee_range": "Baixa"
    })
}

/// Serve `router` on an ephemeral local port and return its base URL
pub(crate) async fn spawn_engine(router: axum::Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind test engine");
    let addr = listener.local_addr().expect("test engine addr");
    tokio::spawn(async move {
        let _ = axum::serve(listener, router).await;
    });
    format!("http://{}", addr)
}
