//! Result projection
//!
//! Maps a pipeline output into the renderable result kinds the front ends
//! know how to draw. Pure: no network access, upstream data is only read,
//! numeric fields pass through unformatted. Sections the engine did not
//! evaluate (security audit, token intel) are omitted, never zero-filled.

use crate::models::{
    Mode, OnChainReport, PayloadKind, RiskLevel, RiskVerdict, RoutePlan, SecurityAudit,
    TokenIntel,
};
use crate::pipeline::{DiscoveryQuery, PipelineOutput};
use crate::intent::ResolvedIntent;
use serde::Serialize;

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RenderableResult {
    RiskReport(RiskReport),
    DiscoveryReport(DiscoveryReport),
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct RiskReport {
    pub mode: Mode,
    pub risk_level: RiskLevel,
    pub title: String,
    pub message: String,
    pub trust_score: u8,
    pub asset: String,
    pub network: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub solution: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub on_chain: Option<OnChainReport>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub audit: Option<Vec<AuditFlag>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token_intel: Option<TokenIntel>,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct DiscoveryReport {
    pub mode: Mode,
    pub asset: String,
    pub network: String,
    pub steps: Vec<String>,
    pub cex_source: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub recommended_bridge: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub warning: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bridge_needed: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub estimated_fee_range: Option<String>,
}

/// One security-audit indicator
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct AuditFlag {
    pub label: String,
    pub active: bool,
    pub tone: FlagTone,
}

/// How an active flag should read
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum FlagTone {
    Danger,
    Warning,
    Success,
}

pub fn project(output: &PipelineOutput) -> RenderableResult {
    match output {
        PipelineOutput::Sentinel { intent, verdict } => {
            RenderableResult::RiskReport(project_verdict(intent, verdict))
        }
        PipelineOutput::Discovery { query, plan } => {
            RenderableResult::DiscoveryReport(project_route(query, plan))
        }
    }
}

fn project_verdict(intent: &ResolvedIntent, verdict: &RiskVerdict) -> RiskReport {
    RiskReport {
        mode: Mode::Sentinel,
        risk_level: verdict.risk_level,
        title: verdict.title.clone(),
        message: verdict.message.clone(),
        trust_score: verdict.trust_score.value(),
        asset: intent.asset.clone(),
        network: intent.network.clone(),
        status: verdict.status.clone(),
        solution: verdict.solution.clone(),
        on_chain: verdict.on_chain.clone(),
        audit: verdict.security_audit.as_ref().map(audit_flags),
        token_intel: verdict.token_intel.clone(),
    }
}

fn project_route(query: &DiscoveryQuery, plan: &RoutePlan) -> DiscoveryReport {
    DiscoveryReport {
        mode: Mode::Discovery,
        asset: query.asset.clone(),
        network: query.network.clone(),
        steps: plan.steps.clone(),
        cex_source: plan.cex_source.clone(),
        recommended_bridge: plan.recommended_bridge.clone(),
        warning: plan.warning.clone(),
        bridge_needed: plan.bridge_needed,
        estimated_fee_range: plan.estimated_fee_range.clone(),
    }
}

fn audit_flags(audit: &SecurityAudit) -> Vec<AuditFlag> {
    let flag = |label: &str, active: bool, tone: FlagTone| AuditFlag {
        label: label.to_string(),
        active,
        tone,
    };

    let mut flags = vec![
        flag("Honeypot", audit.is_honeypot, FlagTone::Danger),
        flag("Blacklist", audit.is_blacklisted, FlagTone::Danger),
        flag("Owner", audit.can_take_back_ownership, FlagTone::Warning),
        flag("Verified", audit.is_in_dex, FlagTone::Success),
    ];

    // Extended flags only when the engine evaluated them
    let extended = [
        ("Hidden owner", audit.hidden_owner, FlagTone::Warning),
        ("Balance control", audit.owner_change_balance, FlagTone::Warning),
        ("Self-destruct", audit.self_destruct, FlagTone::Danger),
        ("External call", audit.external_call, FlagTone::Warning),
    ];
    for (label, value, tone) in extended {
        if let Some(active) = value {
            flags.push(flag(label, active, tone));
        }
    }

    flags
}

impl RenderableResult {
    pub fn mode(&self) -> Mode {
        match self {
            RenderableResult::RiskReport(report) => report.mode,
            RenderableResult::DiscoveryReport(report) => report.mode,
        }
    }

    /// Risk reports carrying audit flags use the audit template
    pub fn payload_kind(&self) -> PayloadKind {
        match self {
            RenderableResult::RiskReport(report) if report.audit.is_some() => PayloadKind::Audit,
            RenderableResult::RiskReport(_) => PayloadKind::Risk,
            RenderableResult::DiscoveryReport(_) => PayloadKind::Discovery,
        }
    }

    /// One-line text used as the assistant turn content
    pub fn summary(&self) -> String {
        match self {
            RenderableResult::RiskReport(report) => format!(
                "[{}] {}: {} (trust score {}/100)",
                report.risk_level, report.title, report.message, report.trust_score
            ),
            RenderableResult::DiscoveryReport(report) => format!(
                "Smart route for {} on {}: {} step(s) starting at {}",
                report.asset.to_uppercase(),
                report.network,
                report.steps.len(),
                report.cex_source
            ),
        }
    }

    /// Markdown detail view for text front ends
    pub fn to_markdown(&self) -> String {
        match self {
            RenderableResult::RiskReport(report) => risk_markdown(report),
            RenderableResult::DiscoveryReport(report) => discovery_markdown(report),
        }
    }
}

fn risk_markdown(report: &RiskReport) -> String {
    let mut out = String::new();

    out.push_str(&format!("### {} (RISK {})\n\n", report.title, report.risk_level));
    out.push_str(&format!("> {}\n\n", report.message));
    out.push_str(&format!(
        "**Trust score:** {}/100 • **Asset:** {} • **Network:** {}\n\n",
        report.trust_score, report.asset, report.network
    ));

    if let Some(solution) = &report.solution {
        out.push_str(&format!("**Suggested action:** {}\n\n", solution));
    }

    if let Some(on_chain) = &report.on_chain {
        out.push_str(&format!(
            "**Network forensic:** {}",
            on_chain.kind.as_deref().unwrap_or("—")
        ));
        if let Some(url) = &on_chain.explorer_url {
            out.push_str(&format!(" ([explorer]({}))", url));
        }
        out.push_str("\n\n");
    }

    if let Some(flags) = &report.audit {
        out.push_str("| Check | Status |\n");
        out.push_str("|-------|--------|\n");
        for flag in flags {
            let status = match (flag.active, flag.tone) {
                (false, _) => "clear",
                (true, FlagTone::Danger) => "DANGER",
                (true, FlagTone::Warning) => "warning",
                (true, FlagTone::Success) => "ok",
            };
            out.push_str(&format!("| {} | {} |\n", flag.label, status));
        }
        out.push('\n');
    }

    if let Some(intel) = &report.token_intel {
        let name = intel.name.as_deref().unwrap_or("—");
        let symbol = intel.symbol.as_deref().unwrap_or("—");
        out.push_str(&format!("**Token intel:** {} ({})", name, symbol));
        if let Some(volume) = intel.volume_24h {
            out.push_str(&format!(" • 24h volume {}", volume));
        }
        out.push('\n');
    }

    out
}

fn discovery_markdown(report: &DiscoveryReport) -> String {
    let mut out = String::new();

    out.push_str(&format!(
        "### Smart Route: {} ({})\n\n",
        report.asset.to_uppercase(),
        report.network
    ));

    if report.steps.is_empty() {
        out.push_str("No route steps returned.\n\n");
    }
    for (i, step) in report.steps.iter().enumerate() {
        out.push_str(&format!("{}. {}\n", i + 1, step));
    }
    out.push('\n');

    out.push_str(&format!(
        "**Primary source:** {} • **Bridge engine:** {}\n",
        report.cex_source,
        report.recommended_bridge.as_deref().unwrap_or("Native")
    ));

    if let Some(fee) = &report.estimated_fee_range {
        out.push_str(&format!("**Estimated fees:** {}\n", fee));
    }
    if let Some(warning) = &report.warning {
        out.push_str(&format!("\n⚠️ {}\n", warning));
    }

    out
}
