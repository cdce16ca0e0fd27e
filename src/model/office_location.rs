use chrono::NaiveTime;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Geofence radius upper bound (meters). Anything larger stops being an
/// "office" and starts being a neighborhood.
pub const MAX_GEOFENCE_RADIUS_M: f64 = 1000.0;

#[derive(Debug, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
#[schema(
    example = json!({
        "id": 1,
        "name": "HQ - 4th Floor",
        "latitude": 23.7806,
        "longitude": 90.4074,
        "geofence_radius_m": 100.0,
        "opens_at": "09:00:00",
        "closes_at": "18:00:00"
    })
)]
pub struct OfficeLocation {
    #[schema(example = 1)]
    pub id: u64,

    #[schema(example = "HQ - 4th Floor")]
    pub name: String,

    #[schema(example = 23.7806)]
    pub latitude: f64,

    #[schema(example = 90.4074)]
    pub longitude: f64,

    /// Geofence radius in meters, must be in (0, 1000].
    #[schema(example = 100.0)]
    pub geofence_radius_m: f64,

    #[schema(example = "09:00:00", value_type = String)]
    pub opens_at: NaiveTime,

    #[schema(example = "18:00:00", value_type = String)]
    pub closes_at: NaiveTime,
}

pub fn validate_radius(radius_m: f64) -> bool {
    radius_m > 0.0 && radius_m <= MAX_GEOFENCE_RADIUS_M
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn radius_bounds() {
        assert!(validate_radius(1.0));
        assert!(validate_radius(1000.0));
        assert!(!validate_radius(0.0));
        assert!(!validate_radius(-5.0));
        assert!(!validate_radius(1000.1));
    }
}
