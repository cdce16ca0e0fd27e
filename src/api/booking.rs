use actix_web::{HttpResponse, Responder, web};
use chrono::{Duration, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::MySqlPool;
use utoipa::{IntoParams, ToSchema};

use crate::auth::auth::AuthUser;
use crate::config::Config;
use crate::error::EngineError;
use crate::model::room_booking::RoomBooking;
use crate::utils::db_utils::is_deadlock;

#[derive(Deserialize, ToSchema)]
pub struct CreateBooking {
    #[schema(example = 12)]
    pub room_id: u64,
    #[schema(example = "2026-01-05", format = "date", value_type = String)]
    pub date: NaiveDate,
    #[schema(example = "10:00:00", value_type = String)]
    pub start_time: NaiveTime,
    #[schema(example = "11:00:00", value_type = String)]
    pub end_time: NaiveTime,
    #[schema(example = "Sprint planning")]
    pub purpose: Option<String>,
}

/// Book a meeting room. The overlap check and the insert run inside one
/// transaction with the competing rows locked, so two concurrent requests
/// for the same slot cannot both confirm.
#[utoipa::path(
    post,
    path = "/api/v1/bookings",
    request_body = CreateBooking,
    responses(
        (status = 200, description = "Booking confirmed"),
        (status = 400, description = "Bad request"),
        (status = 409, description = "Conflicts with an existing confirmed booking"),
        (status = 401, description = "Unauthorized")
    ),
    security(("bearer_auth" = [])),
    tag = "Bookings"
)]
pub async fn create_booking(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    payload: web::Json<CreateBooking>,
) -> actix_web::Result<impl Responder> {
    if payload.start_time >= payload.end_time {
        return Err(EngineError::Validation("start_time must be before end_time".into()).into());
    }

    // When the slot is empty, two concurrent creates both hold gap locks from
    // the FOR UPDATE scan and deadlock on INSERT. InnoDB aborts one; on retry
    // the loser sees the winner's committed row and gets the 409.
    let booking_id = match try_create_booking(pool.get_ref(), auth.user_id, &payload).await {
        Ok(id) => id,
        Err(EngineError::Database(e)) if is_deadlock(&e) => {
            tracing::warn!(room_id = payload.room_id, "Booking insert deadlocked, retrying once");
            try_create_booking(pool.get_ref(), auth.user_id, &payload).await?
        }
        Err(e) => return Err(e.into()),
    };

    Ok(HttpResponse::Ok().json(serde_json::json!({
        "message": "Booking confirmed",
        "booking_id": booking_id,
        "status": "confirmed"
    })))
}

async fn try_create_booking(
    pool: &MySqlPool,
    user_id: u64,
    payload: &CreateBooking,
) -> Result<u64, EngineError> {
    let mut tx = pool.begin().await.map_err(|e| {
        tracing::error!(error = %e, "Failed to open booking transaction");
        EngineError::from(e)
    })?;

    // Lock any confirmed booking overlapping [start, end) on this room for
    // the duration of the transaction. Half-open intervals: back-to-back
    // bookings are fine.
    let conflicting: Option<(u64, NaiveTime, NaiveTime)> = sqlx::query_as(
        r#"
        SELECT id, start_time, end_time
        FROM room_bookings
        WHERE room_id = ? AND date = ? AND status = 'confirmed'
          AND start_time < ? AND end_time > ?
        LIMIT 1
        FOR UPDATE
        "#,
    )
    .bind(payload.room_id)
    .bind(payload.date)
    .bind(payload.end_time)
    .bind(payload.start_time)
    .fetch_optional(&mut *tx)
    .await
    .map_err(|e| {
        tracing::error!(error = %e, "Booking overlap check failed");
        EngineError::from(e)
    })?;

    if let Some((existing_id, start, end)) = conflicting {
        return Err(EngineError::ResourceConflict {
            existing_id,
            existing_start: start.to_string(),
            existing_end: end.to_string(),
        });
    }

    let result = sqlx::query(
        r#"
        INSERT INTO room_bookings (user_id, room_id, date, start_time, end_time, purpose, status)
        VALUES (?, ?, ?, ?, ?, ?, 'confirmed')
        "#,
    )
    .bind(user_id)
    .bind(payload.room_id)
    .bind(payload.date)
    .bind(payload.start_time)
    .bind(payload.end_time)
    .bind(payload.purpose.as_deref())
    .execute(&mut *tx)
    .await
    .map_err(|e| {
        tracing::error!(error = %e, "Failed to insert booking");
        EngineError::from(e)
    })?;

    tx.commit().await.map_err(|e| {
        tracing::error!(error = %e, "Failed to commit booking");
        EngineError::from(e)
    })?;

    Ok(result.last_insert_id())
}

/// Cancel a booking. Allowed until the configured cutoff before start;
/// after that the request is rejected with the exact cutoff instant.
#[utoipa::path(
    put,
    path = "/api/v1/bookings/{booking_id}/cancel",
    params(("booking_id" = u64, Path, description = "Booking to cancel")),
    responses(
        (status = 200, description = "Booking cancelled"),
        (status = 400, description = "Booking not found or not cancellable"),
        (status = 409, description = "Past the cancellation cutoff"),
        (status = 401, description = "Unauthorized")
    ),
    security(("bearer_auth" = [])),
    tag = "Bookings"
)]
pub async fn cancel_booking(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    config: web::Data<Config>,
    path: web::Path<u64>,
) -> actix_web::Result<impl Responder> {
    let booking_id = path.into_inner();

    let row: Option<(u64, NaiveDate, NaiveTime)> = sqlx::query_as(
        "SELECT user_id, date, start_time FROM room_bookings WHERE id = ? AND status = 'confirmed'",
    )
    .bind(booking_id)
    .fetch_optional(pool.get_ref())
    .await
    .map_err(|e| {
        tracing::error!(error = %e, booking_id, "Cancel lookup failed");
        EngineError::from(e)
    })?;

    let Some((owner_id, date, start_time)) = row else {
        return Ok(HttpResponse::BadRequest().json(serde_json::json!({
            "message": "Booking not found or not cancellable"
        })));
    };

    if owner_id != auth.user_id {
        auth.require_manager_or_admin()?;
    }

    let cutoff = date.and_time(start_time) - Duration::minutes(config.room_cancel_cutoff_min);
    if Utc::now().naive_utc() > cutoff {
        return Err(EngineError::PastCutoff { cutoff }.into());
    }

    // CAS on status: if the sweep released it in the meantime, this is a
    // no-op and the client learns the booking already left `confirmed`.
    let result = sqlx::query(
        "UPDATE room_bookings SET status = 'cancelled' WHERE id = ? AND status = 'confirmed'",
    )
    .bind(booking_id)
    .execute(pool.get_ref())
    .await
    .map_err(|e| {
        tracing::error!(error = %e, booking_id, "Cancel booking failed");
        EngineError::from(e)
    })?;

    if result.rows_affected() == 0 {
        return Ok(HttpResponse::BadRequest().json(serde_json::json!({
            "message": "Booking not found or not cancellable"
        })));
    }

    Ok(HttpResponse::Ok().json(serde_json::json!({
        "message": "Booking cancelled"
    })))
}

#[derive(Deserialize, IntoParams, ToSchema)]
pub struct BookingFilter {
    pub room_id: Option<u64>,
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
pub struct BookingListResponse {
    pub data: Vec<RoomBooking>,
    pub page: u32,
    pub per_page: u32,
    pub total: i64,
}

/// List bookings. Employees see their own; Manager/Admin see everything.
#[utoipa::path(
    get,
    path = "/api/v1/bookings",
    params(BookingFilter),
    responses(
        (status = 200, description = "Paginated booking list", body = BookingListResponse),
        (status = 401, description = "Unauthorized")
    ),
    security(("bearer_auth" = [])),
    tag = "Bookings"
)]
pub async fn booking_list(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    query: web::Query<BookingFilter>,
) -> actix_web::Result<impl Responder> {
    let per_page = query.per_page.unwrap_or(10).min(100);
    let page = query.page.unwrap_or(1).max(1);
    let offset = (page - 1) * per_page;

    let mut where_sql = String::from(" WHERE 1=1");
    let mut args: Vec<FilterValue> = Vec::new();

    // Non-privileged callers only ever see their own rows.
    if auth.require_manager_or_admin().is_err() {
        where_sql.push_str(" AND user_id = ?");
        args.push(FilterValue::U64(auth.user_id));
    } else if let Some(user_id) = query.user_id {
        where_sql.push_str(" AND user_id = ?");
        args.push(FilterValue::U64(user_id));
    }

    if let Some(room_id) = query.room_id {
        where_sql.push_str(" AND room_id = ?");
        args.push(FilterValue::U64(room_id));
    }
    if let Some(status) = query.status.as_deref() {
        where_sql.push_str(" AND status = ?");
        args.push(FilterValue::Str(status));
    }
    if let Some(date) = query.date {
        where_sql.push_str(" AND date = ?");
        args.push(FilterValue::Date(date));
    }

    let count_sql = format!("SELECT COUNT(*) FROM room_bookings{}", where_sql);
    let mut count_q = sqlx::query_scalar::<_, i64>(&count_sql);
    for arg in &args {
        count_q = match arg {
            FilterValue::U64(v) => count_q.bind(*v),
            FilterValue::Str(s) => count_q.bind(*s),
            FilterValue::Date(d) => count_q.bind(*d),
        };
    }
    let total = count_q.fetch_one(pool.get_ref()).await.map_err(|e| {
        tracing::error!(error = %e, "Failed to count bookings");
        actix_web::error::ErrorInternalServerError("Internal Server Error")
    })?;

    let data_sql = format!(
        r#"
        SELECT id, user_id, room_id, date, start_time, end_time, purpose, status, created_at
        FROM room_bookings
        {}
        ORDER BY date DESC, start_time DESC
        LIMIT ? OFFSET ?
        "#,
        where_sql
    );

    let mut data_q = sqlx::query_as::<_, RoomBooking>(&data_sql);
    for arg in args {
        data_q = match arg {
            FilterValue::U64(v) => data_q.bind(v),
            FilterValue::Str(s) => data_q.bind(s),
            FilterValue::Date(d) => data_q.bind(d),
        };
    }

    let bookings = data_q
        .bind(per_page)
        .bind(offset)
        .fetch_all(pool.get_ref())
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "Failed to fetch booking list");
            actix_web::error::ErrorInternalServerError("Internal Server Error")
        })?;

    Ok(HttpResponse::Ok().json(BookingListResponse {
        data: bookings,
        page: page as u32,
        per_page: per_page as u32,
        total,
    }))
}
