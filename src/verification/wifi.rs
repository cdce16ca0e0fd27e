use super::{MethodOutcome, VerificationMethod, WifiRef};
use crate::config::VerifyConfig;
use crate::error::EngineError;
use crate::model::wifi_network::SecurityTier;

pub fn tier_confidence(tier: SecurityTier, cfg: &VerifyConfig) -> f64 {
    match tier {
        SecurityTier::Open => cfg.wifi_confidence_open,
        SecurityTier::Secure => cfg.wifi_confidence_secure,
        SecurityTier::Enterprise => cfg.wifi_confidence_enterprise,
    }
}

/// Matches the associated SSID against the office's active networks.
/// `networks` has already been filtered to active rows by the loader.
/// A missing/blank SSID is an "unsupported on this client" condition
/// (e.g. web builds without network introspection), not a mismatch.
pub fn evaluate(ssid: Option<&str>, networks: &[WifiRef], cfg: &VerifyConfig) -> MethodOutcome {
    let ssid = match ssid {
        Some(s) if !s.trim().is_empty() => s,
        _ => {
            return MethodOutcome::fail(
                VerificationMethod::Wifi,
                EngineError::SignalUnavailable(
                    "network introspection is not supported on this client".to_string(),
                ),
            );
        }
    };

    match networks.iter().find(|n| n.ssid == ssid) {
        Some(network) => MethodOutcome::pass(
            VerificationMethod::Wifi,
            tier_confidence(network.tier, cfg),
        ),
        None => MethodOutcome::fail(
            VerificationMethod::Wifi,
            EngineError::NetworkMismatch {
                ssid: ssid.to_string(),
            },
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cfg() -> VerifyConfig {
        VerifyConfig {
            gps_confidence_floor: 0.5,
            wifi_confidence_open: 0.6,
            wifi_confidence_secure: 0.8,
            wifi_confidence_enterprise: 0.9,
            qr_confidence: 0.98,
        }
    }

    fn networks() -> Vec<WifiRef> {
        vec![
            WifiRef {
                ssid: "corp-guest".into(),
                tier: SecurityTier::Open,
            },
            WifiRef {
                ssid: "corp-wpa2".into(),
                tier: SecurityTier::Enterprise,
            },
        ]
    }

    #[test]
    fn matches_by_exact_ssid_with_tier_confidence() {
        let out = evaluate(Some("corp-wpa2"), &networks(), &cfg());
        assert!(out.passed);
        assert_eq!(out.confidence, 0.9);

        let out = evaluate(Some("corp-guest"), &networks(), &cfg());
        assert!(out.passed);
        assert_eq!(out.confidence, 0.6);
    }

    #[test]
    fn unknown_ssid_is_a_mismatch() {
        let out = evaluate(Some("coffee-shop"), &networks(), &cfg());
        assert!(!out.passed);
        assert_eq!(out.error.as_ref().unwrap().kind(), "network_mismatch");
    }

    #[test]
    fn missing_ssid_is_unsupported_client_not_mismatch() {
        for ssid in [None, Some(""), Some("   ")] {
            let out = evaluate(ssid, &networks(), &cfg());
            assert!(!out.passed);
            assert_eq!(out.error.as_ref().unwrap().kind(), "signal_unavailable");
        }
    }
}
