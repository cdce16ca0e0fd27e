use actix_web::{HttpResponse, http::StatusCode};
use chrono::NaiveDateTime;
use serde_json::json;
use thiserror::Error;

/// Engine-level failures. Verification failures are recoverable (the caller
/// may retry with another signal); conflict/cutoff/decision errors are
/// terminal for the request and carry enough detail for corrective action.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("{0}")]
    SignalUnavailable(String),

    #[error("outside the office geofence: {distance_m:.0}m from center, radius {radius_m:.0}m")]
    OutOfRange { distance_m: f64, radius_m: f64 },

    #[error("wifi network '{ssid}' does not match any active network for this office")]
    NetworkMismatch { ssid: String },

    #[error("qr code is unknown, inactive or expired")]
    CodeInvalidOrExpired,

    #[error("no verification method available")]
    NoMethodAvailable,

    #[error("conflicts with existing booking {existing_id} ({existing_start} - {existing_end})")]
    ResourceConflict {
        existing_id: u64,
        existing_start: String,
        existing_end: String,
    },

    #[error("request has already been decided")]
    AlreadyDecided,

    #[error("past the cancellation cutoff ({cutoff})")]
    PastCutoff { cutoff: NaiveDateTime },

    #[error("{0}")]
    Validation(String),

    #[error("internal storage error")]
    Database(#[from] sqlx::Error),
}

impl EngineError {
    /// Stable machine-readable kind, recorded into verification results and
    /// error bodies so clients can branch without parsing messages.
    pub fn kind(&self) -> &'static str {
        match self {
            EngineError::SignalUnavailable(_) => "signal_unavailable",
            EngineError::OutOfRange { .. } => "out_of_range",
            EngineError::NetworkMismatch { .. } => "network_mismatch",
            EngineError::CodeInvalidOrExpired => "code_invalid_or_expired",
            EngineError::NoMethodAvailable => "no_method_available",
            EngineError::ResourceConflict { .. } => "resource_conflict",
            EngineError::AlreadyDecided => "already_decided",
            EngineError::PastCutoff { .. } => "past_cutoff",
            EngineError::Validation(_) => "validation",
            EngineError::Database(_) => "internal",
        }
    }

    /// True for verification failures a client can recover from by supplying
    /// a different signal or falling back to manual approval.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            EngineError::SignalUnavailable(_)
                | EngineError::OutOfRange { .. }
                | EngineError::NetworkMismatch { .. }
                | EngineError::CodeInvalidOrExpired
                | EngineError::NoMethodAvailable
        )
    }
}

impl actix_web::ResponseError for EngineError {
    fn status_code(&self) -> StatusCode {
        match self {
            EngineError::SignalUnavailable(_)
            | EngineError::OutOfRange { .. }
            | EngineError::NetworkMismatch { .. }
            | EngineError::CodeInvalidOrExpired
            | EngineError::NoMethodAvailable => StatusCode::UNPROCESSABLE_ENTITY,
            EngineError::ResourceConflict { .. }
            | EngineError::AlreadyDecided
            | EngineError::PastCutoff { .. } => StatusCode::CONFLICT,
            EngineError::Validation(_) => StatusCode::BAD_REQUEST,
            EngineError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code()).json(json!({
            "error": self.kind(),
            "message": self.to_string(),
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verification_failures_are_recoverable() {
        assert!(EngineError::NoMethodAvailable.is_recoverable());
        assert!(
            EngineError::OutOfRange {
                distance_m: 150.0,
                radius_m: 100.0
            }
            .is_recoverable()
        );
        assert!(!EngineError::AlreadyDecided.is_recoverable());
    }

    #[test]
    fn conflict_maps_to_409() {
        use actix_web::ResponseError;
        let e = EngineError::ResourceConflict {
            existing_id: 7,
            existing_start: "10:00:00".into(),
            existing_end: "11:00:00".into(),
        };
        assert_eq!(e.status_code(), StatusCode::CONFLICT);
    }
}
