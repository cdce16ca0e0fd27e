use actix_web::{HttpResponse, Responder, web};
use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::MySqlPool;
use utoipa::{IntoParams, ToSchema};

use crate::auth::auth::AuthUser;
use crate::config::Config;
use crate::error::EngineError;
use crate::model::attendance::{AttendanceRecord, AttendanceStatus};
use crate::utils::reference_cache;
use crate::verification::{
    GpsReading, Signals, VerificationResult,
    aggregator::{self, ReferenceSet},
    qr,
};

#[derive(Deserialize, ToSchema)]
pub struct CheckInRequest {
    /// Required for an office check-in; ignored for wfh/leave.
    #[schema(example = 1)]
    pub office_location_id: Option<u64>,
    /// Defaults to `office`. A wfh/leave check-in records the day without
    /// signal verification.
    #[schema(example = "office")]
    pub status: Option<AttendanceStatus>,
    pub gps: Option<GpsReading>,
    #[schema(example = "corp-wpa2")]
    pub wifi_ssid: Option<String>,
    #[schema(example = "OFF1-LOBBY-7f3a9c")]
    pub qr_payload: Option<String>,
    pub notes: Option<String>,
}

#[derive(Serialize, ToSchema)]
pub struct CheckInResponse {
    #[schema(example = "Checked in successfully")]
    pub message: String,
    pub verification: Option<VerificationResult>,
}

/// Check-in endpoint. Scores every supplied signal (QR, WiFi, GPS) against
/// the target office and writes the day's attendance record on success.
#[utoipa::path(
    post,
    path = "/api/v1/attendance/check-in",
    request_body = CheckInRequest,
    responses(
        (status = 200, description = "Checked in successfully", body = CheckInResponse),
        (status = 400, description = "Already checked in today or bad payload"),
        (status = 404, description = "Office location not found"),
        (status = 422, description = "Verification failed", body = CheckInResponse),
        (status = 401, description = "Unauthorized"),
        (status = 500, description = "Internal server error")
    ),
    security(("bearer_auth" = [])),
    tag = "Attendance"
)]
pub async fn check_in(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    config: web::Data<Config>,
    payload: web::Json<CheckInRequest>,
) -> actix_web::Result<impl Responder> {
    let now = Utc::now();
    let status = payload.status.unwrap_or(AttendanceStatus::Office);

    // WFH/leave days are recorded, not verified; presence signals would be
    // meaningless away from the office.
    if status != AttendanceStatus::Office {
        let (response, _) =
            insert_record(pool.get_ref(), auth.user_id, status, None, None, &payload, now).await?;
        return Ok(response);
    }

    let office_id = payload.office_location_id.ok_or_else(|| {
        EngineError::Validation("office_location_id is required for an office check-in".into())
    })?;

    let refs = match reference_cache::get(pool.get_ref(), office_id).await {
        Ok(r) => r,
        Err(e) if matches!(&*e, sqlx::Error::RowNotFound) => {
            return Ok(HttpResponse::NotFound().json(serde_json::json!({
                "message": "Office location not found"
            })));
        }
        Err(e) => {
            tracing::error!(error = %e, office_id, "Failed to load office reference set");
            return Err(actix_web::error::ErrorInternalServerError("Internal Server Error"));
        }
    };

    let qr_ref = match payload.qr_payload.as_deref() {
        Some(p) => qr::resolve(pool.get_ref(), office_id, p)
            .await
            .map_err(|e| {
                tracing::error!(error = %e, office_id, "QR lookup failed");
                EngineError::from(e)
            })?,
        None => None,
    };

    let reference_set = ReferenceSet {
        office: refs.office.clone(),
        networks: refs.networks.clone(),
        qr: qr_ref.clone(),
    };

    let signals = Signals {
        gps: payload.gps.clone(),
        wifi_ssid: payload.wifi_ssid.clone(),
        qr_payload: payload.qr_payload.clone(),
    };

    let result = aggregator::verify(&signals, &reference_set, now, &config.verify);

    if !result.success {
        return Ok(HttpResponse::UnprocessableEntity().json(serde_json::json!({
            "error": result.error_kind,
            "message": result.error,
            "verification": result,
        })));
    }

    let (response, outcome) = insert_record(
        pool.get_ref(),
        auth.user_id,
        status,
        Some(office_id),
        Some(&result),
        &payload,
        now,
    )
    .await?;

    // Scan bookkeeping only when the attendance row actually landed: a
    // duplicate check-in (second scan in the same session) never re-counts.
    let qr_passed = qr::evaluate(
        signals.qr_payload.as_deref(),
        reference_set.qr.as_ref(),
        now,
        &config.verify,
    )
    .passed;
    if should_record_scan(outcome, qr_passed) {
        if let Some(code) = &reference_set.qr {
            if let Err(e) = qr::record_scan(pool.get_ref(), code.id, now).await {
                tracing::warn!(error = %e, code_id = code.id, "Failed to record qr scan");
            }
        }
    }

    Ok(response)
}

/// What the attendance insert actually did. A duplicate day is answered to
/// the client but must not trigger any scan bookkeeping.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum InsertOutcome {
    Inserted,
    DuplicateDay,
}

fn should_record_scan(outcome: InsertOutcome, qr_passed: bool) -> bool {
    outcome == InsertOutcome::Inserted && qr_passed
}

async fn insert_record(
    pool: &MySqlPool,
    user_id: u64,
    status: AttendanceStatus,
    office_id: Option<u64>,
    verification: Option<&VerificationResult>,
    payload: &CheckInRequest,
    now: chrono::DateTime<Utc>,
) -> actix_web::Result<(HttpResponse, InsertOutcome)> {
    let result = sqlx::query(
        r#"
        INSERT INTO attendance_records
            (user_id, date, status, check_in, office_location_id,
             verification_method, verification_confidence, check_in_method_count, verified, notes)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(user_id)
    .bind(now.date_naive())
    .bind(status.to_string())
    .bind(now.time())
    .bind(office_id)
    .bind(verification.map(|v| v.method.to_string()))
    .bind(verification.map(|v| v.confidence))
    .bind(verification.map(|v| v.method_count).unwrap_or(0))
    .bind(verification.is_some())
    .bind(payload.notes.as_deref())
    .execute(pool)
    .await;

    match result {
        Ok(_) => Ok((
            HttpResponse::Ok().json(CheckInResponse {
                message: "Checked in successfully".to_string(),
                verification: verification.cloned(),
            }),
            InsertOutcome::Inserted,
        )),
        Err(e) => {
            // Duplicate check-in for same day
            if let sqlx::Error::Database(db_err) = &e {
                if db_err.code().as_deref() == Some("23000") {
                    return Ok((
                        HttpResponse::BadRequest().json(serde_json::json!({
                            "message": "Already checked in today"
                        })),
                        InsertOutcome::DuplicateDay,
                    ));
                }
            }

            tracing::error!(error = %e, user_id, "Check-in failed");
            Err(actix_web::error::ErrorInternalServerError(
                "Internal Server Error",
            ))
        }
    }
}

/// Check-out endpoint. A record is frozen once checked out.
#[utoipa::path(
    put,
    path = "/api/v1/attendance/check-out",
    responses(
        (status = 200, description = "Checked out successfully"),
        (status = 400, description = "No active check-in found for today"),
        (status = 401, description = "Unauthorized"),
        (status = 500, description = "Internal server error")
    ),
    security(("bearer_auth" = [])),
    tag = "Attendance"
)]
pub async fn check_out(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
) -> actix_web::Result<impl Responder> {
    let now = Utc::now();

    let result = sqlx::query(
        r#"
        UPDATE attendance_records
        SET check_out = ?
        WHERE user_id = ?
        AND date = ?
        AND check_out IS NULL
        "#,
    )
    .bind(now.time())
    .bind(auth.user_id)
    .bind(now.date_naive())
    .execute(pool.get_ref())
    .await
    .map_err(|e| {
        tracing::error!(error = %e, user_id = auth.user_id, "Check-out failed");
        actix_web::error::ErrorInternalServerError("Internal Server Error")
    })?;

    if result.rows_affected() == 0 {
        return Ok(HttpResponse::BadRequest().json(serde_json::json!({
            "message": "No active check-in found for today"
        })));
    }

    Ok(HttpResponse::Ok().json(serde_json::json!({
        "message": "Checked out successfully"
    })))
}

/// Today's record for the caller, if any.
#[utoipa::path(
    get,
    path = "/api/v1/attendance/today",
    responses(
        (status = 200, description = "Today's attendance record", body = AttendanceRecord),
        (status = 404, description = "Not checked in today"),
        (status = 401, description = "Unauthorized")
    ),
    security(("bearer_auth" = [])),
    tag = "Attendance"
)]
pub async fn today(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
) -> actix_web::Result<impl Responder> {
    let record: Option<AttendanceRecord> = sqlx::query_as(
        r#"
        SELECT id, user_id, date, status, check_in, check_out, office_location_id,
               verification_method, verification_confidence, check_in_method_count, verified, notes
        FROM attendance_records
        WHERE user_id = ? AND date = ?
        "#,
    )
    .bind(auth.user_id)
    .bind(Utc::now().date_naive())
    .fetch_optional(pool.get_ref())
    .await
    .map_err(|e| {
        tracing::error!(error = %e, user_id = auth.user_id, "Failed to fetch today's attendance");
        actix_web::error::ErrorInternalServerError("Internal Server Error")
    })?;

    match record {
        Some(data) => Ok(HttpResponse::Ok().json(data)),
        None => Ok(HttpResponse::NotFound().json(serde_json::json!({
            "message": "Not checked in today"
        }))),
    }
}

#[derive(Deserialize, IntoParams, ToSchema)]
pub struct AttendanceFilter {
    /// Filter by user ID
    pub user_id: Option<u64>,
    /// Filter by status (office/wfh/leave)
    pub status: Option<String>,
    #[schema(example = "2026-01-01", format = "date", value_type = Option<String>)]
    pub from: Option<NaiveDate>,
    #[schema(example = "2026-01-31", format = "date", value_type = Option<String>)]
    pub to: Option<NaiveDate>,
    /// Pagination page number (start with 1)
    pub page: Option<u64>,
    /// Pagination per page number
    pub per_page: Option<u64>,
}

// Helper enum for typed SQLx binding
enum FilterValue<'a> {
    U64(u64),
    Str(&'a str),
    Date(NaiveDate),
}

#[derive(Serialize, ToSchema)]
pub struct AttendanceListResponse {
    pub data: Vec<AttendanceRecord>,
    #[schema(example = 1)]
    pub page: u32,
    #[schema(example = 10)]
    pub per_page: u32,
    #[schema(example = 1)]
    pub total: i64,
}

/// Attendance history (Manager/Admin).
#[utoipa::path(
    get,
    path = "/api/v1/attendance",
    params(AttendanceFilter),
    responses(
        (status = 200, description = "Paginated attendance list", body = AttendanceListResponse),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden")
    ),
    security(("bearer_auth" = [])),
    tag = "Attendance"
)]
pub async fn attendance_list(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    query: web::Query<AttendanceFilter>,
) -> actix_web::Result<impl Responder> {
    auth.require_manager_or_admin()?;

    let per_page = query.per_page.unwrap_or(10).min(100);
    let page = query.page.unwrap_or(1).max(1);
    let offset = (page - 1) * per_page;

    let mut where_sql = String::from(" WHERE 1=1");
    let mut args: Vec<FilterValue> = Vec::new();

    if let Some(user_id) = query.user_id {
        where_sql.push_str(" AND user_id = ?");
        args.push(FilterValue::U64(user_id));
    }
    if let Some(status) = query.status.as_deref() {
        where_sql.push_str(" AND status = ?");
        args.push(FilterValue::Str(status));
    }
    if let Some(from) = query.from {
        where_sql.push_str(" AND date >= ?");
        args.push(FilterValue::Date(from));
    }
    if let Some(to) = query.to {
        where_sql.push_str(" AND date <= ?");
        args.push(FilterValue::Date(to));
    }

    let count_sql = format!("SELECT COUNT(*) FROM attendance_records{}", where_sql);

    let mut count_q = sqlx::query_scalar::<_, i64>(&count_sql);
    for arg in &args {
        count_q = match arg {
            FilterValue::U64(v) => count_q.bind(*v),
            FilterValue::Str(s) => count_q.bind(*s),
            FilterValue::Date(d) => count_q.bind(*d),
        };
    }

    let total = count_q.fetch_one(pool.get_ref()).await.map_err(|e| {
        tracing::error!(error = %e, "Failed to count attendance records");
        actix_web::error::ErrorInternalServerError("Internal Server Error")
    })?;

    let data_sql = format!(
        r#"
        SELECT id, user_id, date, status, check_in, check_out, office_location_id,
               verification_method, verification_confidence, check_in_method_count, verified, notes
        FROM attendance_records
        {}
        ORDER BY date DESC, id DESC
        LIMIT ? OFFSET ?
        "#,
        where_sql
    );

    let mut data_q = sqlx::query_as::<_, AttendanceRecord>(&data_sql);
    for arg in args {
        data_q = match arg {
            FilterValue::U64(v) => data_q.bind(v),
            FilterValue::Str(s) => data_q.bind(s),
            FilterValue::Date(d) => data_q.bind(d),
        };
    }

    let records = data_q
        .bind(per_page)
        .bind(offset)
        .fetch_all(pool.get_ref())
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "Failed to fetch attendance list");
            actix_web::error::ErrorInternalServerError("Internal Server Error")
        })?;

    Ok(HttpResponse::Ok().json(AttendanceListResponse {
        data: records,
        page: page as u32,
        per_page: per_page as u32,
        total,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duplicate_day_never_records_a_scan() {
        assert!(!should_record_scan(InsertOutcome::DuplicateDay, true));
        assert!(!should_record_scan(InsertOutcome::DuplicateDay, false));
    }

    #[test]
    fn scan_recorded_only_when_row_landed_and_qr_passed() {
        assert!(should_record_scan(InsertOutcome::Inserted, true));
        assert!(!should_record_scan(InsertOutcome::Inserted, false));
    }
}
