use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Debug, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
pub struct QrCode {
    #[schema(example = 1)]
    pub id: u64,
    #[schema(example = 1)]
    pub office_location_id: u64,
    /// Opaque value printed/displayed at the office. Globally unique.
    #[schema(example = "OFF1-LOBBY-7f3a9c")]
    pub code_value: String,
    #[schema(example = "Lobby entrance, left pillar")]
    pub location_desc: String,
    #[schema(value_type = Option<String>, format = "date-time")]
    pub expires_at: Option<DateTime<Utc>>,
    pub scan_count: u64,
    #[schema(value_type = Option<String>, format = "date-time")]
    pub last_scanned_at: Option<DateTime<Utc>>,
    pub active: bool,
    #[schema(value_type = String, format = "date-time")]
    pub created_at: DateTime<Utc>,
}
