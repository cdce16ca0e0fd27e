use std::time::Duration;

use chrono::Utc;
use sqlx::MySqlPool;
use tracing::{info, warn};

use crate::config::Config;
use crate::release;

/// Starts the recurring background sweep: auto-release of abandoned rooms
/// and parking spots, plus WFH SLA expiry. Runs independently of user
/// requests; each pass reads the clock once so every decision in a tick
/// shares one "now".
pub fn start(pool: MySqlPool, cfg: Config) {
    actix_web::rt::spawn(async move {
        let mut tick = actix_web::rt::time::interval(Duration::from_secs(cfg.sweep_interval_secs));
        loop {
            tick.tick().await;
            let now = Utc::now();

            let released = release::sweep(&pool, &cfg, now).await;
            if !released.is_empty() {
                info!(count = released.len(), "auto-release sweep released resources");
            }

            match release::expire_overdue_wfh(&pool, &cfg, now).await {
                Ok(0) => {}
                Ok(n) => info!(count = n, "expired overdue wfh requests"),
                Err(e) => warn!(error = %e, "wfh expiry sweep failed; will retry next tick"),
            }
        }
    });
}
