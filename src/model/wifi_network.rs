use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumString};
use utoipa::ToSchema;

/// WiFi proves network presence, not precise location, so confidence is a
/// fixed value per security tier rather than a measured quantity.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString, ToSchema,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum SecurityTier {
    Open,
    Secure,
    Enterprise,
}

#[derive(Debug, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
pub struct WifiNetwork {
    #[schema(example = 1)]
    pub id: u64,
    #[schema(example = 1)]
    pub office_location_id: u64,
    #[schema(example = "corp-wpa2")]
    pub ssid: String,
    #[schema(example = "enterprise", value_type = String)]
    pub security_tier: String,
    pub active: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tier_round_trips_through_db_strings() {
        assert_eq!(SecurityTier::Enterprise.to_string(), "enterprise");
        assert_eq!("open".parse::<SecurityTier>().unwrap(), SecurityTier::Open);
        assert!("wpa3".parse::<SecurityTier>().is_err());
    }
}
