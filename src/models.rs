//! Core data models for the SafeSentinel console

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::str::FromStr;

//
// ================= Enums =================
//

/// Resolution strategy for a query
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    Sentinel,
    Discovery,
}

/// Engine risk classification.
///
/// The engine sometimes escalates with suffixed codes such as
/// `CRITICAL_DEFCON_1`; every code starting with `CRITICAL` is critical.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "UPPERCASE", try_from = "String")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
    Critical,
}

/// Which template a transcript payload needs
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum PayloadKind {
    #[default]
    None,
    Risk,
    Discovery,
    Audit,
}

//
// ================= Trust Score =================
//

/// Engine confidence, always an integer in `0..=100`.
///
/// The engine reports one-decimal floats; values are rounded and clamped on
/// ingestion.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(try_from = "f64", into = "u8")]
pub struct TrustScore(u8);

impl TrustScore {
    pub const MAX: u8 = 100;

    pub fn new(value: u8) -> Self {
        Self(value.min(Self::MAX))
    }

    pub fn value(self) -> u8 {
        self.0
    }
}

impl TryFrom<f64> for TrustScore {
    type Error = String;

    fn try_from(raw: f64) -> Result<Self, Self::Error> {
        if !raw.is_finite() {
            return Err(format!("trust_score must be finite, got {}", raw));
        }
        let clamped = raw.round().clamp(0.0, Self::MAX as f64);
        Ok(Self(clamped as u8))
    }
}

impl From<TrustScore> for u8 {
    fn from(score: TrustScore) -> Self {
        score.0
    }
}

//
// ================= Sentinel Verdict =================
//

/// Response of the `/check` endpoint
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RiskVerdict {
    pub risk_level: RiskLevel,
    pub title: String,
    pub message: String,
    pub trust_score: TrustScore,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    /// Suggested action, when the engine offers one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub solution: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub on_chain: Option<OnChainReport>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub security_audit: Option<SecurityAudit>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token_intel: Option<TokenIntel>,
}

/// On-chain forensics for the destination address
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct OnChainReport {
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub explorer_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_contract: Option<bool>,
}

/// Token contract security flags
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SecurityAudit {
    pub is_honeypot: bool,
    pub is_blacklisted: bool,
    pub can_take_back_ownership: bool,
    pub is_in_dex: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner_change_balance: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hidden_owner: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub self_destruct: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub external_call: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trust_score_impact: Option<i64>,
}

/// Market metadata for the asset. Unknown fields are kept verbatim.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct TokenIntel {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub symbol: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub networks: Vec<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub volume_24h: Option<f64>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

//
// ================= Discovery Route =================
//

/// Response of the `/find` endpoint
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RoutePlan {
    #[serde(default)]
    pub steps: Vec<String>,
    pub cex_source: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recommended_bridge: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub warning: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bridge_needed: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub estimated_fee_range: Option<String>,
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Mode::Sentinel => "sentinel",
            Mode::Discovery => "discovery",
        };
        write!(f, "{}", s)
    }
}

impl FromStr for Mode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "sentinel" | "check" | "risk" => Ok(Mode::Sentinel),
            "discovery" | "find" | "route" => Ok(Mode::Discovery),
            other => Err(format!("unknown mode '{}' (expected sentinel or discovery)", other)),
        }
    }
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            RiskLevel::Low => "LOW",
            RiskLevel::Medium => "MEDIUM",
            RiskLevel::High => "HIGH",
            RiskLevel::Critical => "CRITICAL",
        };
        write!(f, "{}", s)
    }
}

impl TryFrom<String> for RiskLevel {
    type Error = String;

    fn try_from(raw: String) -> Result<Self, Self::Error> {
        let code = raw.trim().to_uppercase();
        match code.as_str() {
            "LOW" => Ok(RiskLevel::Low),
            "MEDIUM" => Ok(RiskLevel::Medium),
            "HIGH" => Ok(RiskLevel::High),
            c if c.starts_with("CRITICAL") => Ok(RiskLevel::Critical),
            _ => Err(format!("unknown risk level '{}'", raw)),
        }
    }
}

impl fmt::Display for PayloadKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            PayloadKind::None => "none",
            PayloadKind::Risk => "risk",
            PayloadKind::Discovery => "discovery",
            PayloadKind::Audit => "audit",
        };
        write!(f, "{}", s)
    }
}
