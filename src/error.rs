//! Error types for the SafeSentinel console

use thiserror::Error;

use crate::gateway::Endpoint;

/// Result type alias for console operations
pub type Result<T> = std::result::Result<T, SentinelError>;

/// The only engine failure the core distinguishes.
///
/// Network failures, non-2xx statuses and bodies that do not match the
/// endpoint's response model all collapse into `EngineUnreachable`. The
/// endpoint and reason are carried for logs only; callers never branch on them.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    #[error("ENGINE_UNREACHABLE at /{endpoint}: {reason}")]
    EngineUnreachable { endpoint: Endpoint, reason: String },
}

impl TransportError {
    pub fn unreachable(endpoint: Endpoint, reason: impl Into<String>) -> Self {
        TransportError::EngineUnreachable {
            endpoint,
            reason: reason.into(),
        }
    }

    /// Stable code surfaced to front ends
    pub fn code(&self) -> &'static str {
        match self {
            TransportError::EngineUnreachable { .. } => "ENGINE_UNREACHABLE",
        }
    }

    pub fn endpoint(&self) -> Endpoint {
        match self {
            TransportError::EngineUnreachable { endpoint, .. } => *endpoint,
        }
    }
}

#[derive(Error, Debug)]
pub enum SentinelError {

    // =============================
    // Core Errors
    // =============================

    #[error("Configuration error: {0}")]
    Config(String),

    #[error(transparent)]
    Transport(#[from] TransportError),

    // =============================
    // External Library Conversions
    // =============================

    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
