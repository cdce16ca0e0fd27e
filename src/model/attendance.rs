use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumString};
use utoipa::ToSchema;

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString, ToSchema,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum AttendanceStatus {
    Office,
    Wfh,
    Leave,
}

/// One row per user per day. Frozen after check-out except by admin override.
#[derive(Debug, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
pub struct AttendanceRecord {
    #[schema(example = 1)]
    pub id: u64,
    #[schema(example = 1000)]
    pub user_id: u64,
    #[schema(example = "2026-01-05", value_type = String, format = "date")]
    pub date: NaiveDate,
    #[schema(example = "office", value_type = String)]
    pub status: String,
    #[schema(example = "09:02:11", value_type = Option<String>)]
    pub check_in: Option<NaiveTime>,
    #[schema(example = "17:45:00", value_type = Option<String>)]
    pub check_out: Option<NaiveTime>,
    pub office_location_id: Option<u64>,
    /// Highest-confidence method that passed at check-in.
    #[schema(example = "qr_code", value_type = Option<String>)]
    pub verification_method: Option<String>,
    #[schema(example = 0.98)]
    pub verification_confidence: Option<f64>,
    /// How many supplied methods passed; corroboration is audit evidence.
    #[schema(example = 2)]
    pub check_in_method_count: u32,
    pub verified: bool,
    pub notes: Option<String>,
}
