use actix_web::{HttpResponse, Responder, web};
use chrono::{DateTime, NaiveTime, Utc};
use serde::Deserialize;
use serde_json::Value;
use sqlx::MySqlPool;
use utoipa::ToSchema;

use crate::auth::auth::AuthUser;
use crate::error::EngineError;
use crate::model::office_location::{OfficeLocation, validate_radius};
use crate::model::qr_code::QrCode;
use crate::model::wifi_network::{SecurityTier, WifiNetwork};
use crate::utils::db_utils::{build_update_sql, execute_update};
use crate::utils::{qr_filter, reference_cache};

#[derive(Deserialize, ToSchema)]
pub struct CreateOffice {
    #[schema(example = "HQ - 4th Floor")]
    pub name: String,
    #[schema(example = 23.7806)]
    pub latitude: f64,
    #[schema(example = 90.4074)]
    pub longitude: f64,
    #[schema(example = 100.0)]
    pub geofence_radius_m: f64,
    #[schema(example = "09:00:00", value_type = String)]
    pub opens_at: NaiveTime,
    #[schema(example = "18:00:00", value_type = String)]
    pub closes_at: NaiveTime,
}

/// Create an office location (Admin).
#[utoipa::path(
    post,
    path = "/api/v1/offices",
    request_body = CreateOffice,
    responses(
        (status = 200, description = "Office created"),
        (status = 400, description = "Invalid geofence radius"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden")
    ),
    security(("bearer_auth" = [])),
    tag = "Offices"
)]
pub async fn create_office(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    payload: web::Json<CreateOffice>,
) -> actix_web::Result<impl Responder> {
    auth.require_admin()?;

    if !validate_radius(payload.geofence_radius_m) {
        return Err(
            EngineError::Validation("geofence_radius_m must be in (0, 1000]".into()).into(),
        );
    }

    let result = sqlx::query(
        r#"
        INSERT INTO office_locations (name, latitude, longitude, geofence_radius_m, opens_at, closes_at)
        VALUES (?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&payload.name)
    .bind(payload.latitude)
    .bind(payload.longitude)
    .bind(payload.geofence_radius_m)
    .bind(payload.opens_at)
    .bind(payload.closes_at)
    .execute(pool.get_ref())
    .await
    .map_err(|e| {
        tracing::error!(error = %e, "Failed to create office");
        EngineError::from(e)
    })?;

    Ok(HttpResponse::Ok().json(serde_json::json!({
        "message": "Office created",
        "office_id": result.last_insert_id()
    })))
}

/// Partial update of an office (Admin). Whitelisted columns only.
#[utoipa::path(
    put,
    path = "/api/v1/offices/{office_id}",
    params(("office_id" = u64, Path, description = "Office to update")),
    request_body = Object,
    responses(
        (status = 200, description = "Office updated"),
        (status = 400, description = "Bad request"),
        (status = 404, description = "Office not found"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden")
    ),
    security(("bearer_auth" = [])),
    tag = "Offices"
)]
pub async fn update_office(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
    payload: web::Json<Value>,
) -> actix_web::Result<impl Responder> {
    auth.require_admin()?;

    let office_id = path.into_inner();

    if let Some(radius) = payload.get("geofence_radius_m").and_then(Value::as_f64) {
        if !validate_radius(radius) {
            return Err(
                EngineError::Validation("geofence_radius_m must be in (0, 1000]".into()).into(),
            );
        }
    }

    let update = build_update_sql(
        "office_locations",
        &payload,
        &[
            "name",
            "latitude",
            "longitude",
            "geofence_radius_m",
            "opens_at",
            "closes_at",
        ],
        "id",
        office_id,
    )?;

    let affected = execute_update(pool.get_ref(), update).await.map_err(|e| {
        tracing::error!(error = %e, office_id, "Failed to update office");
        EngineError::from(e)
    })?;

    if affected == 0 {
        return Ok(HttpResponse::NotFound().json(serde_json::json!({
            "message": "Office not found"
        })));
    }

    reference_cache::invalidate(office_id).await;

    Ok(HttpResponse::Ok().json(serde_json::json!({
        "message": "Office updated"
    })))
}

/// List office locations.
#[utoipa::path(
    get,
    path = "/api/v1/offices",
    responses(
        (status = 200, description = "All office locations", body = [OfficeLocation]),
        (status = 401, description = "Unauthorized")
    ),
    security(("bearer_auth" = [])),
    tag = "Offices"
)]
pub async fn list_offices(
    _auth: AuthUser,
    pool: web::Data<MySqlPool>,
) -> actix_web::Result<impl Responder> {
    let offices: Vec<OfficeLocation> = sqlx::query_as(
        "SELECT id, name, latitude, longitude, geofence_radius_m, opens_at, closes_at FROM office_locations ORDER BY id",
    )
    .fetch_all(pool.get_ref())
    .await
    .map_err(|e| {
        tracing::error!(error = %e, "Failed to list offices");
        actix_web::error::ErrorInternalServerError("Internal Server Error")
    })?;

    Ok(HttpResponse::Ok().json(offices))
}

#[derive(Deserialize, ToSchema)]
pub struct CreateWifiNetwork {
    #[schema(example = 1)]
    pub office_location_id: u64,
    #[schema(example = "corp-wpa2")]
    pub ssid: String,
    #[schema(example = "enterprise")]
    pub security_tier: SecurityTier,
}

/// Register a WiFi network for an office (Admin). (office, SSID) is unique.
#[utoipa::path(
    post,
    path = "/api/v1/offices/wifi",
    request_body = CreateWifiNetwork,
    responses(
        (status = 200, description = "Network registered"),
        (status = 409, description = "SSID already registered for this office"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden")
    ),
    security(("bearer_auth" = [])),
    tag = "Offices"
)]
pub async fn create_wifi(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    payload: web::Json<CreateWifiNetwork>,
) -> actix_web::Result<impl Responder> {
    auth.require_admin()?;

    let result = sqlx::query(
        r#"
        INSERT INTO wifi_networks (office_location_id, ssid, security_tier, active)
        VALUES (?, ?, ?, 1)
        "#,
    )
    .bind(payload.office_location_id)
    .bind(&payload.ssid)
    .bind(payload.security_tier.to_string())
    .execute(pool.get_ref())
    .await;

    match result {
        Ok(res) => {
            reference_cache::invalidate(payload.office_location_id).await;
            Ok(HttpResponse::Ok().json(serde_json::json!({
                "message": "Network registered",
                "network_id": res.last_insert_id()
            })))
        }
        Err(e) => {
            if let sqlx::Error::Database(db_err) = &e {
                if db_err.code().as_deref() == Some("23000") {
                    return Ok(HttpResponse::Conflict().json(serde_json::json!({
                        "message": "SSID already registered for this office"
                    })));
                }
            }
            tracing::error!(error = %e, "Failed to register wifi network");
            Err(actix_web::error::ErrorInternalServerError(
                "Internal Server Error",
            ))
        }
    }
}

/// Deactivate a WiFi network (Admin). Inactive networks never verify.
#[utoipa::path(
    put,
    path = "/api/v1/offices/wifi/{network_id}/deactivate",
    params(("network_id" = u64, Path, description = "Network to deactivate")),
    responses(
        (status = 200, description = "Network deactivated"),
        (status = 404, description = "Network not found"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden")
    ),
    security(("bearer_auth" = [])),
    tag = "Offices"
)]
pub async fn deactivate_wifi(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
) -> actix_web::Result<impl Responder> {
    auth.require_admin()?;

    let network_id = path.into_inner();

    let network: Option<WifiNetwork> = sqlx::query_as(
        "SELECT id, office_location_id, ssid, security_tier, active FROM wifi_networks WHERE id = ?",
    )
    .bind(network_id)
    .fetch_optional(pool.get_ref())
    .await
    .map_err(EngineError::from)?;

    let Some(network) = network else {
        return Ok(HttpResponse::NotFound().json(serde_json::json!({
            "message": "Network not found"
        })));
    };

    sqlx::query("UPDATE wifi_networks SET active = 0 WHERE id = ?")
        .bind(network_id)
        .execute(pool.get_ref())
        .await
        .map_err(|e| {
            tracing::error!(error = %e, network_id, "Failed to deactivate network");
            EngineError::from(e)
        })?;

    reference_cache::invalidate(network.office_location_id).await;

    Ok(HttpResponse::Ok().json(serde_json::json!({
        "message": "Network deactivated"
    })))
}

#[derive(Deserialize, ToSchema)]
pub struct CreateQrCode {
    #[schema(example = 1)]
    pub office_location_id: u64,
    #[schema(example = "OFF1-LOBBY-7f3a9c")]
    pub code_value: String,
    #[schema(example = "Lobby entrance, left pillar")]
    pub location_desc: String,
    /// Optional expiry; must be in the future.
    #[schema(value_type = Option<String>, format = "date-time")]
    pub expires_at: Option<DateTime<Utc>>,
}

/// Create a QR code for an office (Admin). Code values are globally unique.
#[utoipa::path(
    post,
    path = "/api/v1/offices/qr",
    request_body = CreateQrCode,
    responses(
        (status = 200, description = "QR code created"),
        (status = 400, description = "Expiry not in the future"),
        (status = 409, description = "Code value already exists"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden")
    ),
    security(("bearer_auth" = [])),
    tag = "Offices"
)]
pub async fn create_qr(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    payload: web::Json<CreateQrCode>,
) -> actix_web::Result<impl Responder> {
    auth.require_admin()?;

    let now = Utc::now();
    if let Some(expires_at) = payload.expires_at {
        if expires_at <= now {
            return Err(EngineError::Validation("expires_at must be in the future".into()).into());
        }
    }

    let result = sqlx::query(
        r#"
        INSERT INTO qr_codes (office_location_id, code_value, location_desc, expires_at, active, created_at)
        VALUES (?, ?, ?, ?, 1, ?)
        "#,
    )
    .bind(payload.office_location_id)
    .bind(&payload.code_value)
    .bind(&payload.location_desc)
    .bind(payload.expires_at)
    .bind(now)
    .execute(pool.get_ref())
    .await;

    match result {
        Ok(res) => {
            qr_filter::insert(&payload.code_value);
            Ok(HttpResponse::Ok().json(serde_json::json!({
                "message": "QR code created",
                "qr_code_id": res.last_insert_id()
            })))
        }
        Err(e) => {
            if let sqlx::Error::Database(db_err) = &e {
                if db_err.code().as_deref() == Some("23000") {
                    return Ok(HttpResponse::Conflict().json(serde_json::json!({
                        "message": "Code value already exists"
                    })));
                }
            }
            tracing::error!(error = %e, "Failed to create qr code");
            Err(actix_web::error::ErrorInternalServerError(
                "Internal Server Error",
            ))
        }
    }
}

/// List QR codes for an office (Admin), inactive ones included.
#[utoipa::path(
    get,
    path = "/api/v1/offices/{office_id}/qr",
    params(("office_id" = u64, Path, description = "Office to list codes for")),
    responses(
        (status = 200, description = "QR codes for the office", body = [QrCode]),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden")
    ),
    security(("bearer_auth" = [])),
    tag = "Offices"
)]
pub async fn list_qr(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
) -> actix_web::Result<impl Responder> {
    auth.require_admin()?;

    let office_id = path.into_inner();

    let codes: Vec<QrCode> = sqlx::query_as(
        r#"
        SELECT id, office_location_id, code_value, location_desc, expires_at,
               scan_count, last_scanned_at, active, created_at
        FROM qr_codes
        WHERE office_location_id = ?
        ORDER BY id
        "#,
    )
    .bind(office_id)
    .fetch_all(pool.get_ref())
    .await
    .map_err(|e| {
        tracing::error!(error = %e, office_id, "Failed to list qr codes");
        EngineError::from(e)
    })?;

    Ok(HttpResponse::Ok().json(codes))
}

/// Deactivate a QR code (Admin). A deactivated code can never verify again.
#[utoipa::path(
    put,
    path = "/api/v1/offices/qr/{code_id}/deactivate",
    params(("code_id" = u64, Path, description = "QR code to deactivate")),
    responses(
        (status = 200, description = "QR code deactivated"),
        (status = 404, description = "QR code not found"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden")
    ),
    security(("bearer_auth" = [])),
    tag = "Offices"
)]
pub async fn deactivate_qr(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
) -> actix_web::Result<impl Responder> {
    auth.require_admin()?;

    let code_id = path.into_inner();

    let code_value: Option<(String,)> =
        sqlx::query_as("SELECT code_value FROM qr_codes WHERE id = ?")
            .bind(code_id)
            .fetch_optional(pool.get_ref())
            .await
            .map_err(EngineError::from)?;

    let Some((code_value,)) = code_value else {
        return Ok(HttpResponse::NotFound().json(serde_json::json!({
            "message": "QR code not found"
        })));
    };

    sqlx::query("UPDATE qr_codes SET active = 0 WHERE id = ?")
        .bind(code_id)
        .execute(pool.get_ref())
        .await
        .map_err(|e| {
            tracing::error!(error = %e, code_id, "Failed to deactivate qr code");
            EngineError::from(e)
        })?;

    qr_filter::remove(&code_value);

    Ok(HttpResponse::Ok().json(serde_json::json!({
        "message": "QR code deactivated"
    })))
}
