use chrono::{DateTime, Utc};
use sqlx::MySqlPool;

use super::{MethodOutcome, QrRef, VerificationMethod};
use crate::config::VerifyConfig;
use crate::error::EngineError;
use crate::utils::qr_filter;

/// Pure eligibility check. `code` is the row resolved for the supplied
/// payload (None when no row matched). An inactive or expired code never
/// verifies, regardless of anything else.
pub fn evaluate(
    payload: Option<&str>,
    code: Option<&QrRef>,
    now: DateTime<Utc>,
    cfg: &VerifyConfig,
) -> MethodOutcome {
    if payload.is_none() {
        return MethodOutcome::fail(
            VerificationMethod::QrCode,
            EngineError::SignalUnavailable("no qr scan supplied".to_string()),
        );
    }

    let Some(code) = code else {
        return MethodOutcome::fail(VerificationMethod::QrCode, EngineError::CodeInvalidOrExpired);
    };

    if !code.active {
        return MethodOutcome::fail(VerificationMethod::QrCode, EngineError::CodeInvalidOrExpired);
    }
    if let Some(expires_at) = code.expires_at {
        if expires_at <= now {
            return MethodOutcome::fail(
                VerificationMethod::QrCode,
                EngineError::CodeInvalidOrExpired,
            );
        }
    }

    MethodOutcome::pass(VerificationMethod::QrCode, cfg.qr_confidence)
}

/// Resolves a scanned payload to the code row for the target office.
/// The cuckoo filter screens out payloads that cannot exist before we pay
/// for a DB round trip.
pub async fn resolve(
    pool: &MySqlPool,
    office_location_id: u64,
    payload: &str,
) -> Result<Option<QrRef>, sqlx::Error> {
    if !qr_filter::might_exist(payload) {
        return Ok(None);
    }

    let row: Option<(u64, bool, Option<DateTime<Utc>>)> = sqlx::query_as(
        r#"
        SELECT id, active, expires_at
        FROM qr_codes
        WHERE code_value = ? AND office_location_id = ?
        "#,
    )
    .bind(payload)
    .bind(office_location_id)
    .fetch_optional(pool)
    .await?;

    Ok(row.map(|(id, active, expires_at)| QrRef {
        id,
        active,
        expires_at,
    }))
}

/// Records a successful scan. The counter update is DB-side so concurrent
/// scans of the same code cannot lose increments.
pub async fn record_scan(
    pool: &MySqlPool,
    code_id: u64,
    now: DateTime<Utc>,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        UPDATE qr_codes
        SET scan_count = scan_count + 1, last_scanned_at = ?
        WHERE id = ?
        "#,
    )
    .bind(now)
    .bind(code_id)
    .execute(pool)
    .await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn cfg() -> VerifyConfig {
        VerifyConfig {
            gps_confidence_floor: 0.5,
            wifi_confidence_open: 0.6,
            wifi_confidence_secure: 0.8,
            wifi_confidence_enterprise: 0.9,
            qr_confidence: 0.98,
        }
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 1, 5, 9, 30, 0).unwrap()
    }

    #[test]
    fn active_unexpired_code_passes_with_top_confidence() {
        let code = QrRef {
            id: 1,
            active: true,
            expires_at: Some(now() + Duration::days(30)),
        };
        let out = evaluate(Some("OFF1-LOBBY"), Some(&code), now(), &cfg());
        assert!(out.passed);
        assert_eq!(out.confidence, 0.98);
    }

    #[test]
    fn expired_code_never_passes_even_if_active() {
        let code = QrRef {
            id: 1,
            active: true,
            expires_at: Some(now() - Duration::seconds(1)),
        };
        let out = evaluate(Some("OFF1-LOBBY"), Some(&code), now(), &cfg());
        assert!(!out.passed);
        assert_eq!(out.error.as_ref().unwrap().kind(), "code_invalid_or_expired");
    }

    #[test]
    fn inactive_or_unknown_code_fails() {
        let inactive = QrRef {
            id: 1,
            active: false,
            expires_at: None,
        };
        let out = evaluate(Some("OFF1-LOBBY"), Some(&inactive), now(), &cfg());
        assert!(!out.passed);

        let out = evaluate(Some("bogus"), None, now(), &cfg());
        assert!(!out.passed);
        assert_eq!(out.error.as_ref().unwrap().kind(), "code_invalid_or_expired");
    }

    #[test]
    fn no_expiry_means_no_expiry() {
        let code = QrRef {
            id: 1,
            active: true,
            expires_at: None,
        };
        assert!(evaluate(Some("x"), Some(&code), now(), &cfg()).passed);
    }
}
