//! Session state machine
//!
//! `Idle --begin--> Resolving --complete--> Idle`. `begin` appends the user
//! turn and hands out the only `Submission` for the session; `complete`
//! consumes it and appends exactly one assistant turn. A second `begin`
//! while resolving is refused without touching the transcript.

use super::transcript::{ConversationTurn, Transcript, TurnRole};
use crate::models::Mode;
use crate::projector::RenderableResult;
use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info};
use uuid::Uuid;

/// Shortest accepted submission, in characters after trimming
pub const MIN_QUERY_CHARS: usize = 2;
/// Longest accepted submission, matching the engine's extraction cap
pub const MAX_QUERY_CHARS: usize = 1000;

pub const GREETING_MESSAGE: &str = "SafeSentinel online. Tell me what you want to move \
    (e.g. \"send USDT from Binance to MetaMask\") or where to source a token \
    (e.g. \"OKB X-Layer\").";

pub const ENGINE_UNREACHABLE_MESSAGE: &str =
    "Connection error: the SafeSentinel engine is out of reach. Please try again.";

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    Idle,
    Resolving,
}

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitRejection {
    #[error("a request is already being resolved")]
    Pending,

    #[error("query must have at least {MIN_QUERY_CHARS} characters")]
    TooShort,

    #[error("query must have at most {MAX_QUERY_CHARS} characters")]
    TooLong,
}

/// Permission to finish the in-flight turn. Only `begin` creates one.
#[derive(Debug)]
pub struct Submission {
    user_turn_id: u64,
    text: String,
    mode: Option<Mode>,
}

impl Submission {
    pub fn user_turn_id(&self) -> u64 {
        self.user_turn_id
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    /// Mode pinned when the turn was submitted
    pub fn mode(&self) -> Option<Mode> {
        self.mode
    }
}

/// How the in-flight turn ended
#[derive(Debug, Clone)]
pub enum AssistantReply {
    Result(RenderableResult),
    Clarification(String),
    EngineUnreachable,
}

#[derive(Debug, Clone)]
pub struct SessionState {
    session_id: Uuid,
    transcript: Transcript,
    phase: Phase,
    mode: Option<Mode>,
    created_at: DateTime<Utc>,
}

impl SessionState {
    /// Fresh session seeded with the greeting turn
    pub fn new(session_id: Uuid) -> Self {
        let mut transcript = Transcript::new();
        transcript.append(TurnRole::Assistant, GREETING_MESSAGE.to_string(), None);

        Self {
            session_id,
            transcript,
            phase: Phase::Idle,
            mode: None,
            created_at: Utc::now(),
        }
    }

    pub fn session_id(&self) -> Uuid {
        self.session_id
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn pending(&self) -> bool {
        self.phase == Phase::Resolving
    }

    pub fn mode(&self) -> Option<Mode> {
        self.mode
    }

    /// Pin a mode for future turns, or `None` to let the classifier decide
    pub fn set_mode(&mut self, mode: Option<Mode>) {
        info!(session_id = %self.session_id, ?mode, "Session mode changed");
        self.mode = mode;
    }

    pub fn transcript(&self) -> &Transcript {
        &self.transcript
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// `Idle -> Resolving`. Appends the user turn before any engine call.
    pub fn begin(&mut self, text: &str) -> Result<Submission, SubmitRejection> {
        if self.pending() {
            debug!(session_id = %self.session_id, "Submission dropped while resolving");
            return Err(SubmitRejection::Pending);
        }

        let text = validate_query(text)?;

        let user_turn_id = self
            .transcript
            .append(TurnRole::User, text.to_string(), None)
            .id();
        self.phase = Phase::Resolving;

        debug!(session_id = %self.session_id, user_turn_id, "Session resolving");

        Ok(Submission {
            user_turn_id,
            text: text.to_string(),
            mode: self.mode,
        })
    }

    /// `Resolving -> Idle`, appending the single assistant turn
    pub fn complete(&mut self, submission: Submission, reply: AssistantReply) -> &ConversationTurn {
        let (content, payload) = match reply {
            AssistantReply::Result(result) => (result.summary(), Some(result)),
            AssistantReply::Clarification(message) => (message, None),
            AssistantReply::EngineUnreachable => (ENGINE_UNREACHABLE_MESSAGE.to_string(), None),
        };

        self.phase = Phase::Idle;

        debug!(
            session_id = %self.session_id,
            user_turn_id = submission.user_turn_id,
            "Session idle"
        );

        self.transcript.append(TurnRole::Assistant, content, payload)
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            session_id: self.session_id,
            phase: self.phase,
            pending: self.pending(),
            mode: self.mode,
            created_at: self.created_at,
            turns: self.transcript.turns().to_vec(),
        }
    }
}

/// Read-only view handed to front ends
#[derive(Debug, Clone, Serialize)]
pub struct SessionSnapshot {
    pub session_id: Uuid,
    pub phase: Phase,
    pub pending: bool,
    pub mode: Option<Mode>,
    pub created_at: DateTime<Utc>,
    pub turns: Vec<ConversationTurn>,
}

/// Input-boundary bounds, returns the trimmed query
pub fn validate_query(text: &str) -> Result<&str, SubmitRejection> {
    let trimmed = text.trim();
    let chars = trimmed.chars().count();

    if chars < MIN_QUERY_CHARS {
        return Err(SubmitRejection::TooShort);
    }
    if chars > MAX_QUERY_CHARS {
        return Err(SubmitRejection::TooLong);
    }

    Ok(trimmed)
}
