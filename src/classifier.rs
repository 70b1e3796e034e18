//! Turn Classifier
//!
//! Decides, for a conversational turn with no pinned mode, whether the
//! extracted intent is concrete enough to run the Sentinel pipeline or
//! whether the assistant should ask for clarification instead.
//!
//! The rule is a presence heuristic over the raw (un-defaulted) extraction:
//! an intent naming an asset or a destination address is a transfer check.
//! Ambiguous input with either field therefore lands in Sentinel even when a
//! route discovery was meant.

use crate::intent::Intent;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnAction {
    RunSentinel,
    Clarify,
}

pub const CLARIFICATION_MESSAGE: &str =
    "I understood you want to make a transfer, but which token and network?";

/// Swappable mode inference
pub trait TurnClassifier: Send + Sync {
    fn classify(&self, intent: &Intent) -> TurnAction;

    /// Assistant reply for a `Clarify` decision
    fn clarification(&self, _intent: &Intent) -> String {
        CLARIFICATION_MESSAGE.to_string()
    }
}

/// Asset-or-address presence heuristic
#[derive(Debug, Clone, Copy, Default)]
pub struct PresenceClassifier;

impl TurnClassifier for PresenceClassifier {
    fn classify(&self, intent: &Intent) -> TurnAction {
        if intent.asset().is_some() || intent.address().is_some() {
            TurnAction::RunSentinel
        } else {
            TurnAction::Clarify
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn intent(asset: Option<&str>, address: Option<&str>, network: Option<&str>) -> Intent {
        Intent {
            asset: asset.map(str::to_string),
            origin: None,
            destination: None,
            network: network.map(str::to_string),
            address: address.map(str::to_string),
        }
    }

    #[test]
    fn test_asset_or_address_runs_sentinel() {
        let cases = vec![
            intent(Some("USDT"), None, None),
            intent(None, Some("0x1234567890123456789012345678901234567890"), None),
            intent(Some("ETH"), Some("0xabc"), Some("Arbitrum")),
        ];

        for c in cases {
            assert_eq!(PresenceClassifier.classify(&c), TurnAction::RunSentinel);
        }
    }

    #[test]
    fn test_missing_asset_and_address_clarifies() {
        let cases = vec![
            intent(None, None, None),
            intent(None, None, Some("BEP20")),
            intent(Some("  "), Some(""), None),
        ];

        for c in cases {
            assert_eq!(PresenceClassifier.classify(&c), TurnAction::Clarify);
        }
    }

    #[test]
    fn test_default_clarification_text() {
        let reply = PresenceClassifier.clarification(&Intent::default());
        assert_eq!(reply, CLARIFICATION_MESSAGE);
    }
}
