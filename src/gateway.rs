//! Transport gateway to the analysis engine
//!
//! Every engine call is a single JSON POST round trip. Failures of any kind
//! (network, non-2xx, unparseable body, unexpected shape) are normalized into
//! `TransportError::EngineUnreachable`; nothing is retried or cached here.

use crate::config::EngineConfig;
use crate::error::TransportError;
use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::time::Duration;
use tracing::{debug, error, info};

/// The fixed set of engine endpoints
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Endpoint {
    Extract,
    Check,
    Find,
}

impl Endpoint {
    pub fn path(&self) -> &'static str {
        match self {
            Endpoint::Extract => "/extract",
            Endpoint::Check => "/check",
            Endpoint::Find => "/find",
        }
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", &self.path()[1..])
    }
}

/// Raw engine transport
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, endpoint: Endpoint, payload: &Value) -> Result<Value, TransportError>;
}

/// reqwest-backed transport (connection-pooled)
pub struct HttpGateway {
    client: Client,
    base_url: String,
    api_key: Option<String>,
}

impl HttpGateway {
    pub fn new(config: &EngineConfig) -> crate::Result<Self> {
        let mut builder = Client::builder()
            .pool_idle_timeout(Duration::from_secs(90))
            .pool_max_idle_per_host(8);

        if let Some(timeout) = config.timeout {
            builder = builder.timeout(timeout);
        }

        Ok(Self {
            client: builder.build()?,
            base_url: config.base_url.clone(),
            api_key: config.api_key.clone(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

#[async_trait]
impl Transport for HttpGateway {
    async fn send(&self, endpoint: Endpoint, payload: &Value) -> Result<Value, TransportError> {
        let url = format!("{}{}", self.base_url, endpoint.path());

        debug!(endpoint = %endpoint, url = %url, "Calling engine");

        let mut request = self
            .client
            .post(&url)
            .header("Content-Type", "application/json")
            .json(payload);

        if let Some(key) = &self.api_key {
            request = request.header("X-API-Key", key);
        }

        let response = request.send().await.map_err(|e| {
            error!(endpoint = %endpoint, "Engine request failed: {}", e);
            TransportError::unreachable(endpoint, format!("request failed: {}", e))
        })?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            error!(endpoint = %endpoint, status = %status, "Engine error response: {}", detail);
            return Err(TransportError::unreachable(
                endpoint,
                format!("engine returned {}", status),
            ));
        }

        let body = response.bytes().await.map_err(|e| {
            error!(endpoint = %endpoint, "Failed to read engine body: {}", e);
            TransportError::unreachable(endpoint, format!("body read failed: {}", e))
        })?;

        let value: Value = serde_json::from_slice(&body).map_err(|e| {
            error!(endpoint = %endpoint, "Engine body is not JSON: {}", e);
            TransportError::unreachable(endpoint, format!("malformed JSON: {}", e))
        })?;

        info!(endpoint = %endpoint, status = %status, "Engine responded");

        Ok(value)
    }
}

/// Send a typed request and decode the endpoint's response model
pub async fn call<Req, Resp>(
    transport: &dyn Transport,
    endpoint: Endpoint,
    request: &Req,
) -> Result<Resp, TransportError>
where
    Req: Serialize + Sync + ?Sized,
    Resp: DeserializeOwned,
{
    let payload = serde_json::to_value(request).map_err(|e| {
        TransportError::unreachable(endpoint, format!("request encoding failed: {}", e))
    })?;

    let body = transport.send(endpoint, &payload).await?;
    decode(endpoint, body)
}

/// Validate an engine body against its response model.
///
/// Every engine response is a JSON object; derived `Deserialize` would also
/// accept a positional array, so anything else is rejected up front.
pub fn decode<Resp: DeserializeOwned>(endpoint: Endpoint, body: Value) -> Result<Resp, TransportError> {
    if !body.is_object() {
        error!(endpoint = %endpoint, "Engine response is not a JSON object");
        return Err(TransportError::unreachable(endpoint, "expected JSON object"));
    }

    serde_json::from_value(body).map_err(|e| {
        error!(endpoint = %endpoint, "Unexpected engine response shape: {}", e);
        TransportError::unreachable(endpoint, format!("unexpected response shape: {}", e))
    })
}

/// Some engine builds wrap payloads as `{ "data": { ... } }`
pub fn unwrap_data_envelope(body: Value) -> Value {
    match body {
        Value::Object(mut map) if map.get("data").is_some_and(Value::is_object) => {
            map.remove("data").unwrap_or(Value::Null)
        }
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::spawn_engine;
    use axum::http::{HeaderMap, StatusCode};
    use axum::routing::post;
    use axum::{Json, Router};
    use serde_json::json;

    fn engine_router() -> Router {
        Router::new()
            .route(
                "/api-engine/extract",
                post(|Json(body): Json<Value>| async move {
                    Json(json!({ "asset": "USDT", "echo": body["text"] }))
                }),
            )
            .route(
                "/api-engine/check",
                post(|| async { (StatusCode::INTERNAL_SERVER_ERROR, "boom") }),
            )
            .route("/api-engine/find", post(|| async { "not json at all" }))
    }

    #[test]
    fn test_endpoint_paths() {
        assert_eq!(Endpoint::Extract.path(), "/extract");
        assert_eq!(Endpoint::Check.to_string(), "check");
        assert_eq!(Endpoint::Find.to_string(), "find");
    }

    #[tokio::test]
    async fn test_send_success_returns_json() {
        let base = spawn_engine(engine_router()).await;
        let gateway = HttpGateway::new(&EngineConfig::new(format!("{}/api-engine/", base))).unwrap();

        let body = gateway
            .send(Endpoint::Extract, &json!({ "text": "send USDT" }))
            .await
            .unwrap();

        assert_eq!(body["asset"], "USDT");
        assert_eq!(body["echo"], "send USDT");
    }

    #[tokio::test]
    async fn test_non_2xx_is_engine_unreachable() {
        let base = spawn_engine(engine_router()).await;
        let gateway = HttpGateway::new(&EngineConfig::new(format!("{}/api-engine", base))).unwrap();

        let err = gateway.send(Endpoint::Check, &json!({})).await.unwrap_err();
        assert_eq!(err.code(), "ENGINE_UNREACHABLE");
        assert_eq!(err.endpoint(), Endpoint::Check);
    }

    #[tokio::test]
    async fn test_malformed_body_is_engine_unreachable() {
        let base = spawn_engine(engine_router()).await;
        let gateway = HttpGateway::new(&EngineConfig::new(format!("{}/api-engine", base))).unwrap();

        let err = gateway.send(Endpoint::Find, &json!({})).await.unwrap_err();
        assert_eq!(err.code(), "ENGINE_UNREACHABLE");
    }

    #[tokio::test]
    async fn test_connection_refused_is_engine_unreachable() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let gateway = HttpGateway::new(&EngineConfig::new(format!("http://{}", addr))).unwrap();
        let result = gateway.send(Endpoint::Extract, &json!({ "text": "hi" })).await;
        tokio_test::assert_err!(result);
    }

    #[tokio::test]
    async fn test_api_key_header_is_forwarded() {
        let router = Router::new().route(
            "/check",
            post(|headers: HeaderMap| async move {
                match headers.get("x-api-key").and_then(|v| v.to_str().ok()) {
                    Some("secret") => (StatusCode::OK, Json(json!({ "ok": true }))),
                    _ => (StatusCode::FORBIDDEN, Json(json!({ "detail": "forbidden" }))),
                }
            }),
        );
        let base = spawn_engine(router).await;

        let anonymous = HttpGateway::new(&EngineConfig::new(base.clone())).unwrap();
        assert!(anonymous.send(Endpoint::Check, &json!({})).await.is_err());

        let keyed = HttpGateway::new(&EngineConfig::new(base).with_api_key("secret")).unwrap();
        let body = tokio_test::assert_ok!(keyed.send(Endpoint::Check, &json!({})).await);
        assert_eq!(body["ok"], true);
    }

    #[test]
    fn test_decode_rejects_wrong_shape() {
        #[derive(Debug, Deserialize)]
        #[allow(dead_code)]
        struct Shape {
            steps: Vec<String>,
        }

        let err = decode::<Shape>(Endpoint::Find, json!({ "steps": "one" })).unwrap_err();
        assert_eq!(err.endpoint(), Endpoint::Find);
    }

    #[test]
    fn test_decode_rejects_non_object_bodies() {
        #[derive(Debug, Deserialize)]
        #[allow(dead_code)]
        struct Shape {
            asset: Option<String>,
        }

        for body in [json!(["USDT"]), json!("USDT"), json!(42), Value::Null] {
            let err = decode::<Shape>(Endpoint::Extract, body.clone()).unwrap_err();
            assert_eq!(err.code(), "ENGINE_UNREACHABLE", "body {}", body);
        }
        assert!(decode::<Shape>(Endpoint::Extract, json!({ "asset": "USDT" })).is_ok());
    }

    #[test]
    fn test_unwrap_data_envelope() {
        let wrapped = json!({ "data": { "cex_source": "OKX" }, "status": "ok" });
        assert_eq!(unwrap_data_envelope(wrapped), json!({ "cex_source": "OKX" }));

        let plain = json!({ "cex_source": "OKX", "data": "not-an-object" });
        assert_eq!(unwrap_data_envelope(plain.clone()), plain);
    }
}
