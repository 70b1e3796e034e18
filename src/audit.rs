//! Resolution log
//!
//! Process-lifetime record of every pipeline invocation a session makes.
//! Nothing here is persisted; the log disappears with the process.

use crate::models::{Mode, PayloadKind};
use chrono::{DateTime, Utc};
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::io::Write;
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ResolutionOutcome {
    Resolved,
    Clarified,
    EngineUnreachable,
}

#[derive(Debug, Clone, Serialize)]
pub struct ResolutionRecord {
    pub record_id: Uuid,
    pub session_id: Uuid,
    /// `None` when the classifier decided and no pipeline ran
    pub mode: Option<Mode>,
    pub request_fingerprint: String,
    pub outcome: ResolutionOutcome,
    pub payload_kind: PayloadKind,
    pub elapsed_ms: u64,
    pub created_at: DateTime<Utc>,
}

/// Append-only in-memory log
pub struct ResolutionLog {
    records: Arc<RwLock<Vec<ResolutionRecord>>>,
}

impl ResolutionLog {
    pub fn new() -> Self {
        Self {
            records: Arc::new(RwLock::new(Vec::new())),
        }
    }

    pub async fn record(&self, record: ResolutionRecord) -> Uuid {
        let record_id = record.record_id;
        self.records.write().await.push(record);
        record_id
    }

    pub async fn get(&self, record_id: Uuid) -> Option<ResolutionRecord> {
        let records = self.records.read().await;
        records.iter().find(|r| r.record_id == record_id).cloned()
    }

    /// Records for one session, oldest first
    pub async fn list_for_session(&self, session_id: Uuid) -> Vec<ResolutionRecord> {
        let records = self.records.read().await;
        records
            .iter()
            .filter(|r| r.session_id == session_id)
            .cloned()
            .collect()
    }

    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.records.read().await.is_empty()
    }
}

impl Default for ResolutionLog {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Serialize)]
struct FingerprintInput<'a> {
    mode: Option<Mode>,
    text: &'a str,
}

/// SHA-256 over the request as submitted (mode + text)
/// Streams JSON straight into the hasher
pub fn request_fingerprint(mode: Option<Mode>, text: &str) -> String {
    let mut hasher = Sha256::new();

    let input = FingerprintInput { mode, text };
    if serde_json::to_writer(&mut HashWriter(&mut hasher), &input).is_err() {
        return String::new();
    }

    hex::encode(hasher.finalize())
}

/// Adapter to allow writing into Sha256 via std::io::Write
struct HashWriter<'a, H: Digest>(&'a mut H);

impl<'a, H: Digest> Write for HashWriter<'a, H> {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.update(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(session_id: Uuid, outcome: ResolutionOutcome) -> ResolutionRecord {
        ResolutionRecord {
            record_id: Uuid::new_v4(),
            session_id,
            mode: Some(Mode::Sentinel),
            request_fingerprint: request_fingerprint(Some(Mode::Sentinel), "send USDT"),
            outcome,
            payload_kind: PayloadKind::Risk,
            elapsed_ms: 12,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_fingerprint_is_stable_and_mode_sensitive() {
        let a = request_fingerprint(None, "OKB X-Layer");
        let b = request_fingerprint(None, "OKB X-Layer");
        let c = request_fingerprint(Some(Mode::Discovery), "OKB X-Layer");

        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(a.len(), 64);
    }

    #[tokio::test]
    async fn test_list_for_session_keeps_order() {
        let log = ResolutionLog::new();
        let session = Uuid::new_v4();
        let other = Uuid::new_v4();

        let first = log.record(record(session, ResolutionOutcome::Resolved)).await;
        log.record(record(other, ResolutionOutcome::Resolved)).await;
        let third = log
            .record(record(session, ResolutionOutcome::EngineUnreachable))
            .await;

        let ids: Vec<Uuid> = log
            .list_for_session(session)
            .await
            .into_iter()
            .map(|r| r.record_id)
            .collect();
        assert_eq!(ids, vec![first, third]);
        assert_eq!(log.len().await, 3);
        assert_eq!(
            log.get(third).await.map(|r| r.outcome),
            Some(ResolutionOutcome::EngineUnreachable)
        );
    }
}
