use dotenvy::dotenv;
use std::env;

fn env_parse<T: std::str::FromStr>(key: &str, default: &str) -> T
where
    T::Err: std::fmt::Debug,
{
    env::var(key)
        .unwrap_or_else(|_| default.to_string())
        .parse()
        .unwrap_or_else(|e| panic!("{} is not valid: {:?}", key, e))
}

/// Per-method verification tuning. Only relative ordering is fixed by the
/// product (QR > WiFi > GPS); the actual numbers are deployment config.
#[derive(Clone, Debug)]
pub struct VerifyConfig {
    /// Confidence at the geofence edge; GPS confidence falls linearly from
    /// 1.0 at the center down to this floor.
    pub gps_confidence_floor: f64,
    pub wifi_confidence_open: f64,
    pub wifi_confidence_secure: f64,
    pub wifi_confidence_enterprise: f64,
    pub qr_confidence: f64,
}

#[derive(Clone)]
pub struct Config {
    pub database_url: String,
    pub jwt_secret: String,
    pub server_addr: String,
    pub access_token_ttl: usize,
    pub refresh_token_ttl: usize,

    // Rate limiting
    pub rate_login_per_min: u32,
    pub rate_register_per_min: u32,
    pub rate_refresh_per_min: u32,
    pub rate_protected_per_min: u32,

    pub api_prefix: String,

    pub verify: VerifyConfig,

    // Auto-release thresholds (minutes)
    pub room_no_show_grace_min: i64,
    pub parking_overdue_min: i64,

    // Cancellation cutoffs before start time (minutes)
    pub room_cancel_cutoff_min: i64,
    pub parking_cancel_cutoff_min: i64,

    // WFH approval SLA windows (hours) and advisory monthly cap (days)
    pub wfh_sla_normal_hours: i64,
    pub wfh_sla_urgent_hours: i64,
    pub wfh_monthly_cap_days: i64,

    pub sweep_interval_secs: u64,
}

impl Config {
    pub fn from_env() -> Self {
        dotenv().ok();

        Self {
            server_addr: env::var("SERVER_ADDR").expect("SERVER_ADDR must be set"),
            database_url: env::var("DATABASE_URL").expect("DATABASE_URL must be set"),
            jwt_secret: env::var("JWT_SECRET").expect("JWT_SECRET must be set"),
            access_token_ttl: env_parse("ACCESS_TOKEN_TTL", "900"), // 15 min
            refresh_token_ttl: env_parse("REFRESH_TOKEN_TTL", "604800"), // 7 days

            rate_login_per_min: env_parse("RATE_LOGIN_PER_MIN", "60"),
            rate_register_per_min: env_parse("RATE_REGISTER_PER_MIN", "30"),
            rate_refresh_per_min: env_parse("RATE_REFRESH_PER_MIN", "30"),
            rate_protected_per_min: env_parse("RATE_PROTECTED_PER_MIN", "1000"),

            api_prefix: env::var("API_PREFIX").unwrap_or_else(|_| "/api".to_string()),

            verify: VerifyConfig {
                gps_confidence_floor: env_parse("GPS_CONFIDENCE_FLOOR", "0.5"),
                wifi_confidence_open: env_parse("WIFI_CONFIDENCE_OPEN", "0.6"),
                wifi_confidence_secure: env_parse("WIFI_CONFIDENCE_SECURE", "0.8"),
                wifi_confidence_enterprise: env_parse("WIFI_CONFIDENCE_ENTERPRISE", "0.9"),
                qr_confidence: env_parse("QR_CONFIDENCE", "0.98"),
            },

            room_no_show_grace_min: env_parse("ROOM_NO_SHOW_GRACE_MIN", "15"),
            parking_overdue_min: env_parse("PARKING_OVERDUE_MIN", "30"),

            room_cancel_cutoff_min: env_parse("ROOM_CANCEL_CUTOFF_MIN", "60"),
            parking_cancel_cutoff_min: env_parse("PARKING_CANCEL_CUTOFF_MIN", "30"),

            wfh_sla_normal_hours: env_parse("WFH_SLA_NORMAL_HOURS", "48"),
            wfh_sla_urgent_hours: env_parse("WFH_SLA_URGENT_HOURS", "4"),
            wfh_monthly_cap_days: env_parse("WFH_MONTHLY_CAP_DAYS", "8"),

            sweep_interval_secs: env_parse("SWEEP_INTERVAL_SECS", "300"),
        }
    }
}
