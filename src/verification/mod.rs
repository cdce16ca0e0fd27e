pub mod aggregator;
pub mod gps;
pub mod qr;
pub mod wifi;

use chrono::{DateTime, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumString};
use utoipa::ToSchema;

use crate::error::EngineError;
use crate::model::wifi_network::SecurityTier;

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString, ToSchema,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum VerificationMethod {
    Gps,
    Wifi,
    QrCode,
    Manual,
}

impl VerificationMethod {
    /// Trust ordering used for tie-breaks and failure selection: QR requires
    /// physical proximity plus a human action, WiFi proves network presence,
    /// GPS is the noisiest. Lower is more trusted.
    pub fn priority(self) -> u8 {
        match self {
            VerificationMethod::QrCode => 0,
            VerificationMethod::Wifi => 1,
            VerificationMethod::Gps => 2,
            VerificationMethod::Manual => 3,
        }
    }
}

/// Raw signals a check-in request may carry. Absent fields mean the client
/// did not attempt that method.
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct Signals {
    pub gps: Option<GpsReading>,
    #[schema(example = "corp-wpa2")]
    pub wifi_ssid: Option<String>,
    #[schema(example = "OFF1-LOBBY-7f3a9c")]
    pub qr_payload: Option<String>,
}

impl Signals {
    pub fn is_empty(&self) -> bool {
        self.gps.is_none() && self.wifi_ssid.is_none() && self.qr_payload.is_none()
    }
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct GpsReading {
    #[schema(example = 23.7806)]
    pub latitude: f64,
    #[schema(example = 90.4074)]
    pub longitude: f64,
    #[schema(example = 10.0)]
    pub accuracy_m: f64,
}

/// Reference data for one office, prefetched by the caller (and cached) so
/// evaluation itself is pure and deterministic.
#[derive(Debug, Clone)]
pub struct OfficeRef {
    pub id: u64,
    pub latitude: f64,
    pub longitude: f64,
    pub geofence_radius_m: f64,
    pub opens_at: NaiveTime,
}

#[derive(Debug, Clone)]
pub struct WifiRef {
    pub ssid: String,
    pub tier: SecurityTier,
}

#[derive(Debug, Clone)]
pub struct QrRef {
    pub id: u64,
    pub active: bool,
    pub expires_at: Option<DateTime<Utc>>,
}

/// One evaluator's verdict for one method.
#[derive(Debug)]
pub struct MethodOutcome {
    pub method: VerificationMethod,
    pub passed: bool,
    pub confidence: f64,
    pub error: Option<EngineError>,
}

impl MethodOutcome {
    pub fn pass(method: VerificationMethod, confidence: f64) -> Self {
        Self {
            method,
            passed: true,
            confidence,
            error: None,
        }
    }

    pub fn fail(method: VerificationMethod, error: EngineError) -> Self {
        Self {
            method,
            passed: false,
            confidence: 0.0,
            error: Some(error),
        }
    }
}

/// The single reconciled verdict for a check-in attempt. Ephemeral; recorded
/// into the attendance row rather than persisted on its own.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct VerificationResult {
    pub success: bool,
    #[schema(example = "qr_code")]
    pub method: VerificationMethod,
    #[schema(example = 0.98)]
    pub confidence: f64,
    /// Number of supplied methods that passed.
    pub method_count: u32,
    pub error: Option<String>,
    #[schema(example = "out_of_range")]
    pub error_kind: Option<String>,
    #[schema(value_type = String, format = "date-time")]
    pub timestamp: DateTime<Utc>,
}
