//! Conversation transcript
//!
//! Ordered, append-only list of turns. Turns are created only through
//! `Transcript::append`, which assigns increasing ids; nothing is edited,
//! removed or reordered afterwards.

use crate::models::PayloadKind;
use crate::projector::RenderableResult;
use chrono::{DateTime, Utc};
use serde::Serialize;

/// Author of a turn
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum TurnRole {
    User,
    Assistant,
}

/// A single transcript entry
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ConversationTurn {
    id: u64,
    role: TurnRole,
    content: String,
    payload_kind: PayloadKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    payload: Option<RenderableResult>,
    timestamp: DateTime<Utc>,
}

impl ConversationTurn {
    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn role(&self) -> TurnRole {
        self.role
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    pub fn payload_kind(&self) -> PayloadKind {
        self.payload_kind
    }

    pub fn payload(&self) -> Option<&RenderableResult> {
        self.payload.as_ref()
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }
}

#[derive(Debug, Clone, Default)]
pub struct Transcript {
    turns: Vec<ConversationTurn>,
    next_id: u64,
}

impl Transcript {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn append(
        &mut self,
        role: TurnRole,
        content: String,
        payload: Option<RenderableResult>,
    ) -> &ConversationTurn {
        let payload_kind = payload
            .as_ref()
            .map(RenderableResult::payload_kind)
            .unwrap_or_default();

        self.next_id += 1;
        let index = self.turns.len();
        self.turns.push(ConversationTurn {
            id: self.next_id,
            role,
            content,
            payload_kind,
            payload,
            timestamp: Utc::now(),
        });

        &self.turns[index]
    }

    pub fn turns(&self) -> &[ConversationTurn] {
        &self.turns
    }

    pub fn last(&self) -> Option<&ConversationTurn> {
        self.turns.last()
    }

    /// The `count` most recent turns, newest first
    pub fn recent(&self, count: usize) -> impl Iterator<Item = &ConversationTurn> {
        self.turns.iter().rev().take(count)
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    /// Plain-text dump of the conversation
    pub fn to_plain_text(&self) -> String {
        let mut out = String::new();

        for turn in &self.turns {
            let role = match turn.role {
                TurnRole::User => "You",
                TurnRole::Assistant => "Sentinel",
            };
            out.push_str(&format!(
                "[{}] {}: {}",
                turn.timestamp.format("%H:%M:%S"),
                role,
                turn.content
            ));
            if turn.payload_kind != PayloadKind::None {
                out.push_str(&format!(" <{}>", turn.payload_kind));
            }
            out.push('\n');
        }

        out
    }
}
