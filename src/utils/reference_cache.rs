use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use chrono::NaiveTime;
use moka::future::Cache;
use once_cell::sync::Lazy;
use sqlx::MySqlPool;

use crate::verification::{OfficeRef, WifiRef};

/// Everything verification needs to know about one office: geofence plus the
/// active network set. Refreshed on TTL or explicit invalidation after admin
/// edits.
#[derive(Debug, Clone)]
pub struct OfficeReference {
    pub office: OfficeRef,
    pub networks: Vec<WifiRef>,
}

static REFERENCE_CACHE: Lazy<Cache<u64, Arc<OfficeReference>>> = Lazy::new(|| {
    Cache::builder()
        .max_capacity(10_000)
        .time_to_live(Duration::from_secs(300))
        .build()
});

#[derive(sqlx::FromRow)]
struct OfficeRow {
    id: u64,
    latitude: f64,
    longitude: f64,
    geofence_radius_m: f64,
    opens_at: NaiveTime,
}

#[derive(sqlx::FromRow)]
struct NetworkRow {
    ssid: String,
    security_tier: String,
}

async fn load(pool: &MySqlPool, office_id: u64) -> Result<Arc<OfficeReference>, sqlx::Error> {
    let office: OfficeRow = sqlx::query_as(
        "SELECT id, latitude, longitude, geofence_radius_m, opens_at FROM office_locations WHERE id = ?",
    )
    .bind(office_id)
    .fetch_one(pool)
    .await?;

    let networks: Vec<NetworkRow> = sqlx::query_as(
        "SELECT ssid, security_tier FROM wifi_networks WHERE office_location_id = ? AND active = 1",
    )
    .bind(office_id)
    .fetch_all(pool)
    .await?;

    Ok(Arc::new(OfficeReference {
        office: OfficeRef {
            id: office.id,
            latitude: office.latitude,
            longitude: office.longitude,
            geofence_radius_m: office.geofence_radius_m,
            opens_at: office.opens_at,
        },
        networks: networks
            .into_iter()
            .filter_map(|n| {
                n.security_tier
                    .parse()
                    .ok()
                    .map(|tier| WifiRef { ssid: n.ssid, tier })
            })
            .collect(),
    }))
}

/// Cached lookup. `RowNotFound` means the office does not exist.
pub async fn get(
    pool: &MySqlPool,
    office_id: u64,
) -> Result<Arc<OfficeReference>, Arc<sqlx::Error>> {
    REFERENCE_CACHE
        .try_get_with(office_id, load(pool, office_id))
        .await
}

/// Drops a cached entry after an admin edits the office or its networks.
pub async fn invalidate(office_id: u64) {
    REFERENCE_CACHE.invalidate(&office_id).await;
}

/// Pre-loads every office so the first check-in of the day does not pay the
/// cold-lookup cost.
pub async fn warmup_reference_cache(pool: &MySqlPool) -> Result<()> {
    let ids: Vec<(u64,)> = sqlx::query_as("SELECT id FROM office_locations")
        .fetch_all(pool)
        .await?;

    let mut loaded = 0usize;
    for (id,) in ids {
        if get(pool, id).await.is_ok() {
            loaded += 1;
        }
    }

    log::info!("Office reference cache warmup complete: {} offices", loaded);
    Ok(())
}
