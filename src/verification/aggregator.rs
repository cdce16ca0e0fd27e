use std::cmp::Ordering;

use chrono::{DateTime, Utc};

use super::{
    gps, qr, wifi, MethodOutcome, OfficeRef, QrRef, Signals, VerificationMethod,
    VerificationResult, WifiRef,
};
use crate::config::VerifyConfig;
use crate::error::EngineError;

/// Everything one `verify` call needs, prefetched by the caller. Keeping DB
/// access out of here makes the verdict a pure function of its inputs.
#[derive(Debug, Clone)]
pub struct ReferenceSet {
    pub office: OfficeRef,
    /// Active networks for the office.
    pub networks: Vec<WifiRef>,
    /// Row resolved for the request's qr payload, if any.
    pub qr: Option<QrRef>,
}

// Definite verdicts ("you are out of range") are more informative than
// "this client couldn't produce the signal".
fn failure_rank(error: &EngineError) -> u8 {
    match error {
        EngineError::OutOfRange { .. }
        | EngineError::NetworkMismatch { .. }
        | EngineError::CodeInvalidOrExpired => 0,
        EngineError::SignalUnavailable(_) => 1,
        _ => 2,
    }
}

/// Reconciles every supplied signal into one confidence-scored verdict.
///
/// All present signals are evaluated, not just the first to pass: if several
/// methods pass, the highest-confidence one becomes the primary method and
/// the pass count is reported as corroboration for downstream audit. Scoring
/// is deterministic; calling twice with identical inputs yields an identical
/// verdict (only QR scan counters, applied by the caller, accumulate).
pub fn verify(
    signals: &Signals,
    refs: &ReferenceSet,
    now: DateTime<Utc>,
    cfg: &VerifyConfig,
) -> VerificationResult {
    if signals.is_empty() {
        let e = EngineError::NoMethodAvailable;
        return VerificationResult {
            success: false,
            method: VerificationMethod::Manual,
            confidence: 0.0,
            method_count: 0,
            error_kind: Some(e.kind().to_string()),
            error: Some(e.to_string()),
            timestamp: now,
        };
    }

    let mut outcomes: Vec<MethodOutcome> = Vec::with_capacity(3);
    if signals.qr_payload.is_some() {
        outcomes.push(qr::evaluate(
            signals.qr_payload.as_deref(),
            refs.qr.as_ref(),
            now,
            cfg,
        ));
    }
    if signals.wifi_ssid.is_some() {
        outcomes.push(wifi::evaluate(
            signals.wifi_ssid.as_deref(),
            &refs.networks,
            cfg,
        ));
    }
    if signals.gps.is_some() {
        outcomes.push(gps::evaluate(signals.gps.as_ref(), &refs.office, cfg));
    }

    let passed: Vec<&MethodOutcome> = outcomes.iter().filter(|o| o.passed).collect();

    if let Some(primary) = passed
        .iter()
        .max_by(|a, b| {
            a.confidence
                .partial_cmp(&b.confidence)
                .unwrap_or(Ordering::Equal)
                // equal confidence: the more trusted method wins
                .then_with(|| b.method.priority().cmp(&a.method.priority()))
        })
    {
        return VerificationResult {
            success: true,
            method: primary.method,
            confidence: primary.confidence,
            method_count: passed.len() as u32,
            error: None,
            error_kind: None,
            timestamp: now,
        };
    }

    // Nothing passed: surface the most informative failure.
    let worst = outcomes
        .iter()
        .min_by_key(|o| {
            let rank = o.error.as_ref().map(failure_rank).unwrap_or(u8::MAX);
            (rank, o.method.priority())
        })
        .expect("signals is non-empty, so at least one outcome exists");

    let (kind, message) = match &worst.error {
        Some(e) => (e.kind().to_string(), e.to_string()),
        None => (
            EngineError::NoMethodAvailable.kind().to_string(),
            EngineError::NoMethodAvailable.to_string(),
        ),
    };

    VerificationResult {
        success: false,
        method: worst.method,
        confidence: 0.0,
        method_count: 0,
        error: Some(message),
        error_kind: Some(kind),
        timestamp: now,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::wifi_network::SecurityTier;
    use crate::verification::GpsReading;
    use chrono::{NaiveTime, TimeZone};

    const METERS_PER_DEG_LAT: f64 = 111_195.0;

    fn cfg() -> VerifyConfig {
        VerifyConfig {
            gps_confidence_floor: 0.5,
            wifi_confidence_open: 0.6,
            wifi_confidence_secure: 0.8,
            wifi_confidence_enterprise: 0.9,
            qr_confidence: 0.98,
        }
    }

    fn refs(qr: Option<QrRef>) -> ReferenceSet {
        ReferenceSet {
            office: OfficeRef {
                id: 1,
                latitude: 23.7806,
                longitude: 90.4074,
                geofence_radius_m: 100.0,
                opens_at: NaiveTime::from_hms_opt(9, 0, 0).unwrap(),
            },
            networks: vec![WifiRef {
                ssid: "corp-wpa2".into(),
                tier: SecurityTier::Enterprise,
            }],
            qr,
        }
    }

    fn gps_at(refs: &ReferenceSet, distance_m: f64) -> GpsReading {
        GpsReading {
            latitude: refs.office.latitude + distance_m / METERS_PER_DEG_LAT,
            longitude: refs.office.longitude,
            accuracy_m: 5.0,
        }
    }

    fn live_qr() -> QrRef {
        QrRef {
            id: 9,
            active: true,
            expires_at: None,
        }
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 1, 5, 9, 15, 0).unwrap()
    }

    #[test]
    fn qr_wins_when_all_three_pass() {
        let refs = refs(Some(live_qr()));
        let signals = Signals {
            gps: Some(gps_at(&refs, 20.0)),
            wifi_ssid: Some("corp-wpa2".into()),
            qr_payload: Some("OFF1-LOBBY".into()),
        };
        let res = verify(&signals, &refs, now(), &cfg());
        assert!(res.success);
        assert_eq!(res.method, VerificationMethod::QrCode);
        assert_eq!(res.confidence, 0.98);
        assert_eq!(res.method_count, 3);
    }

    #[test]
    fn highest_confidence_method_is_primary_with_corroboration_count() {
        // GPS near the edge (0.6) loses to enterprise wifi (0.9), but both
        // passes are counted.
        let refs = refs(None);
        let signals = Signals {
            gps: Some(gps_at(&refs, 80.0)),
            wifi_ssid: Some("corp-wpa2".into()),
            qr_payload: None,
        };
        let res = verify(&signals, &refs, now(), &cfg());
        assert!(res.success);
        assert_eq!(res.method, VerificationMethod::Wifi);
        assert_eq!(res.confidence, 0.9);
        assert_eq!(res.method_count, 2);
    }

    #[test]
    fn near_center_gps_can_outrank_wifi() {
        let refs = refs(None);
        let signals = Signals {
            gps: Some(gps_at(&refs, 5.0)), // ~0.975
            wifi_ssid: Some("corp-wpa2".into()),
            qr_payload: None,
        };
        let res = verify(&signals, &refs, now(), &cfg());
        assert_eq!(res.method, VerificationMethod::Gps);
        assert_eq!(res.method_count, 2);
    }

    #[test]
    fn specific_failure_preferred_over_unavailable() {
        // Blank SSID (client can't introspect) plus a definite out-of-range
        // fix: the definite verdict is the informative one.
        let refs = refs(None);
        let signals = Signals {
            gps: Some(gps_at(&refs, 500.0)),
            wifi_ssid: Some("".into()),
            qr_payload: None,
        };
        let res = verify(&signals, &refs, now(), &cfg());
        assert!(!res.success);
        assert_eq!(res.error_kind.as_deref(), Some("out_of_range"));
        assert_eq!(res.method, VerificationMethod::Gps);
    }

    #[test]
    fn all_definite_failures_pick_most_trusted_method() {
        let refs = refs(None);
        let signals = Signals {
            gps: Some(gps_at(&refs, 500.0)),
            wifi_ssid: Some("coffee-shop".into()),
            qr_payload: Some("bogus".into()),
        };
        let res = verify(&signals, &refs, now(), &cfg());
        assert!(!res.success);
        assert_eq!(res.error_kind.as_deref(), Some("code_invalid_or_expired"));
    }

    #[test]
    fn zero_signals_is_no_method_available() {
        let res = verify(&Signals::default(), &refs(None), now(), &cfg());
        assert!(!res.success);
        assert_eq!(res.error_kind.as_deref(), Some("no_method_available"));
        assert_eq!(res.method_count, 0);
    }

    #[test]
    fn verify_is_deterministic_for_identical_inputs() {
        let refs = refs(Some(live_qr()));
        let signals = Signals {
            gps: Some(gps_at(&refs, 42.0)),
            wifi_ssid: Some("corp-wpa2".into()),
            qr_payload: Some("OFF1-LOBBY".into()),
        };
        let first = verify(&signals, &refs, now(), &cfg());
        let second = verify(&signals, &refs, now(), &cfg());
        assert_eq!(first, second);
    }
}
