use actix_web::{HttpResponse, Responder, web};
use chrono::{Duration, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::MySqlPool;
use utoipa::{IntoParams, ToSchema};

use crate::auth::auth::AuthUser;
use crate::config::Config;
use crate::error::EngineError;
use crate::model::parking_reservation::ParkingReservation;
use crate::utils::db_utils::is_deadlock;

const DEFAULT_DAY_START: (u32, u32) = (9, 0);
const DEFAULT_DAY_END: (u32, u32) = (18, 0);

#[derive(Deserialize, ToSchema)]
pub struct CreateReservation {
    #[schema(example = 42)]
    pub spot_id: u64,
    #[schema(example = "2026-01-05", format = "date", value_type = String)]
    pub date: NaiveDate,
    /// Defaults to the working day when omitted.
    #[schema(example = "09:00:00", value_type = Option<String>)]
    pub start_time: Option<NaiveTime>,
    #[schema(example = "18:00:00", value_type = Option<String>)]
    pub end_time: Option<NaiveTime>,
}

/// Reserve a parking spot. One transaction locks both exclusivity checks:
/// at most one active reservation per spot per date, and at most one per
/// user per date.
#[utoipa::path(
    post,
    path = "/api/v1/parking",
    request_body = CreateReservation,
    responses(
        (status = 200, description = "Reservation created"),
        (status = 400, description = "Bad request"),
        (status = 409, description = "Spot or user already has an active reservation for that date"),
        (status = 401, description = "Unauthorized")
    ),
    security(("bearer_auth" = [])),
    tag = "Parking"
)]
pub async fn create_reservation(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    payload: web::Json<CreateReservation>,
) -> actix_web::Result<impl Responder> {
    let start_time = payload
        .start_time
        .unwrap_or_else(|| NaiveTime::from_hms_opt(DEFAULT_DAY_START.0, DEFAULT_DAY_START.1, 0).unwrap());
    let end_time = payload
        .end_time
        .unwrap_or_else(|| NaiveTime::from_hms_opt(DEFAULT_DAY_END.0, DEFAULT_DAY_END.1, 0).unwrap());

    if start_time >= end_time {
        return Err(EngineError::Validation("start_time must be before end_time".into()).into());
    }

    // Same gap-lock hazard as room bookings: two concurrent reservations for
    // an empty spot deadlock on INSERT. Retry the aborted side once so it
    // sees the committed winner and answers 409 rather than 500.
    let reservation_id =
        match try_create_reservation(pool.get_ref(), auth.user_id, &payload, start_time, end_time)
            .await
        {
            Ok(id) => id,
            Err(EngineError::Database(e)) if is_deadlock(&e) => {
                tracing::warn!(spot_id = payload.spot_id, "Reservation insert deadlocked, retrying once");
                try_create_reservation(pool.get_ref(), auth.user_id, &payload, start_time, end_time)
                    .await?
            }
            Err(e) => return Err(e.into()),
        };

    Ok(HttpResponse::Ok().json(serde_json::json!({
        "message": "Reservation created",
        "reservation_id": reservation_id,
        "status": "active"
    })))
}

async fn try_create_reservation(
    pool: &MySqlPool,
    user_id: u64,
    payload: &CreateReservation,
    start_time: NaiveTime,
    end_time: NaiveTime,
) -> Result<u64, EngineError> {
    let mut tx = pool.begin().await.map_err(|e| {
        tracing::error!(error = %e, "Failed to open reservation transaction");
        EngineError::from(e)
    })?;

    let spot_taken: Option<(u64, NaiveTime, NaiveTime)> = sqlx::query_as(
        r#"
        SELECT id, start_time, end_time FROM parking_reservations
        WHERE spot_id = ? AND date = ? AND status = 'active'
        LIMIT 1
        FOR UPDATE
        "#,
    )
    .bind(payload.spot_id)
    .bind(payload.date)
    .fetch_optional(&mut *tx)
    .await
    .map_err(|e| {
        tracing::error!(error = %e, "Spot exclusivity check failed");
        EngineError::from(e)
    })?;

    if let Some((existing_id, s, e)) = spot_taken {
        return Err(EngineError::ResourceConflict {
            existing_id,
            existing_start: s.to_string(),
            existing_end: e.to_string(),
        });
    }

    let user_taken: Option<(u64, NaiveTime, NaiveTime)> = sqlx::query_as(
        r#"
        SELECT id, start_time, end_time FROM parking_reservations
        WHERE user_id = ? AND date = ? AND status = 'active'
        LIMIT 1
        FOR UPDATE
        "#,
    )
    .bind(user_id)
    .bind(payload.date)
    .fetch_optional(&mut *tx)
    .await
    .map_err(|e| {
        tracing::error!(error = %e, "User exclusivity check failed");
        EngineError::from(e)
    })?;

    if let Some((existing_id, s, e)) = user_taken {
        return Err(EngineError::ResourceConflict {
            existing_id,
            existing_start: s.to_string(),
            existing_end: e.to_string(),
        });
    }

    let result = sqlx::query(
        r#"
        INSERT INTO parking_reservations (user_id, spot_id, date, start_time, end_time, status)
        VALUES (?, ?, ?, ?, ?, 'active')
        "#,
    )
    .bind(user_id)
    .bind(payload.spot_id)
    .bind(payload.date)
    .bind(start_time)
    .bind(end_time)
    .execute(&mut *tx)
    .await
    .map_err(|e| {
        tracing::error!(error = %e, "Failed to insert reservation");
        EngineError::from(e)
    })?;

    tx.commit().await.map_err(|e| {
        tracing::error!(error = %e, "Failed to commit reservation");
        EngineError::from(e)
    })?;

    Ok(result.last_insert_id())
}

/// Cancel a reservation, up to the configured cutoff before its start.
#[utoipa::path(
    put,
    path = "/api/v1/parking/{reservation_id}/cancel",
    params(("reservation_id" = u64, Path, description = "Reservation to cancel")),
    responses(
        (status = 200, description = "Reservation cancelled"),
        (status = 400, description = "Reservation not found or not cancellable"),
        (status = 409, description = "Past the cancellation cutoff"),
        (status = 401, description = "Unauthorized")
    ),
    security(("bearer_auth" = [])),
    tag = "Parking"
)]
pub async fn cancel_reservation(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    config: web::Data<Config>,
    path: web::Path<u64>,
) -> actix_web::Result<impl Responder> {
    let reservation_id = path.into_inner();

    let row: Option<(u64, NaiveDate, NaiveTime)> = sqlx::query_as(
        "SELECT user_id, date, start_time FROM parking_reservations WHERE id = ? AND status = 'active'",
    )
    .bind(reservation_id)
    .fetch_optional(pool.get_ref())
    .await
    .map_err(|e| {
        tracing::error!(error = %e, reservation_id, "Cancel lookup failed");
        EngineError::from(e)
    })?;

    let Some((owner_id, date, start_time)) = row else {
        return Ok(HttpResponse::BadRequest().json(serde_json::json!({
            "message": "Reservation not found or not cancellable"
        })));
    };

    if owner_id != auth.user_id {
        auth.require_manager_or_admin()?;
    }

    let cutoff = date.and_time(start_time) - Duration::minutes(config.parking_cancel_cutoff_min);
    if Utc::now().naive_utc() > cutoff {
        return Err(EngineError::PastCutoff { cutoff }.into());
    }

    let result = sqlx::query(
        "UPDATE parking_reservations SET status = 'cancelled' WHERE id = ? AND status = 'active'",
    )
    .bind(reservation_id)
    .execute(pool.get_ref())
    .await
    .map_err(|e| {
        tracing::error!(error = %e, reservation_id, "Cancel reservation failed");
        EngineError::from(e)
    })?;

    if result.rows_affected() == 0 {
        return Ok(HttpResponse::BadRequest().json(serde_json::json!({
            "message": "Reservation not found or not cancellable"
        })));
    }

    Ok(HttpResponse::Ok().json(serde_json::json!({
        "message": "Reservation cancelled"
    })))
}

#[derive(Deserialize, IntoParams, ToSchema)]
pub struct ReservationFilter {
    pub spot_id: Option<u64>,
    pub user_id: Option<u64>,
    pub status: Option<String>,
    #[schema(example = "2026-01-05", format = "date", value_type = Option<String>)]
    pub date: Option<NaiveDate>,
    pub page: Option<u64>,
    pub per_page: Option<u64>,
}

enum FilterValue<'a> {
    U64(u64),
    Str(&'a str),
    Date(NaiveDate),
}

#[derive(Serialize, ToSchema)]
pub struct ReservationListResponse {
    pub data: Vec<ParkingReservation>,
    pub page: u32,
    pub per_page: u32,
    pub total: i64,
}

/// List reservations. Employees see their own; Manager/Admin see everything.
#[utoipa::path(
    get,
    path = "/api/v1/parking",
    params(ReservationFilter),
    responses(
        (status = 200, description = "Paginated reservation list", body = ReservationListResponse),
        (status = 401, description = "Unauthorized")
    ),
    security(("bearer_auth" = [])),
    tag = "Parking"
)]
pub async fn reservation_list(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    query: web::Query<ReservationFilter>,
) -> actix_web::Result<impl Responder> {
    let per_page = query.per_page.unwrap_or(10).min(100);
    let page = query.page.unwrap_or(1).max(1);
    let offset = (page - 1) * per_page;

    let mut where_sql = String::from(" WHERE 1=1");
    let mut args: Vec<FilterValue> = Vec::new();

    if auth.require_manager_or_admin().is_err() {
        where_sql.push_str(" AND user_id = ?");
        args.push(FilterValue::U64(auth.user_id));
    } else if let Some(user_id) = query.user_id {
        where_sql.push_str(" AND user_id = ?");
        args.push(FilterValue::U64(user_id));
    }

    if let Some(spot_id) = query.spot_id {
        where_sql.push_str(" AND spot_id = ?");
        args.push(FilterValue::U64(spot_id));
    }
    if let Some(status) = query.status.as_deref() {
        where_sql.push_str(" AND status = ?");
        args.push(FilterValue::Str(status));
    }
    if let Some(date) = query.date {
        where_sql.push_str(" AND date = ?");
        args.push(FilterValue::Date(date));
    }

    let count_sql = format!("SELECT COUNT(*) FROM parking_reservations{}", where_sql);
    let mut count_q = sqlx::query_scalar::<_, i64>(&count_sql);
    for arg in &args {
        count_q = match arg {
            FilterValue::U64(v) => count_q.bind(*v),
            FilterValue::Str(s) => count_q.bind(*s),
            FilterValue::Date(d) => count_q.bind(*d),
        };
    }
    let total = count_q.fetch_one(pool.get_ref()).await.map_err(|e| {
        tracing::error!(error = %e, "Failed to count reservations");
        actix_web::error::ErrorInternalServerError("Internal Server Error")
    })?;

    let data_sql = format!(
        r#"
        SELECT id, user_id, spot_id, date, start_time, end_time, status, created_at
        FROM parking_reservations
        {}
        ORDER BY date DESC, id DESC
        LIMIT ? OFFSET ?
        "#,
        where_sql
    );

    let mut data_q = sqlx::query_as::<_, ParkingReservation>(&data_sql);
    for arg in args {
        data_q = match arg {
            FilterValue::U64(v) => data_q.bind(v),
            FilterValue::Str(s) => data_q.bind(s),
            FilterValue::Date(d) => data_q.bind(d),
        };
    }

    let reservations = data_q
        .bind(per_page)
        .bind(offset)
        .fetch_all(pool.get_ref())
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "Failed to fetch reservation list");
            actix_web::error::ErrorInternalServerError("Internal Server Error")
        })?;

    Ok(HttpResponse::Ok().json(ReservationListResponse {
        data: reservations,
        page: page as u32,
        per_page: per_page as u32,
        total,
    }))
}
