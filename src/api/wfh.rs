use actix_web::{HttpResponse, Responder, web};
use chrono::{Datelike, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::MySqlPool;
use utoipa::{IntoParams, ToSchema};

use crate::auth::auth::AuthUser;
use crate::config::Config;
use crate::error::EngineError;
use crate::model::wfh_approval::{Urgency, WfhApproval, WfhStatus, initial_status, sla_deadline};

#[derive(Deserialize, ToSchema)]
pub struct CreateWfhRequest {
    /// Defaults to the requester's own manager.
    #[schema(example = 2000)]
    pub manager_id: Option<u64>,
    #[schema(example = "2026-01-05", format = "date", value_type = String)]
    pub requested_date: NaiveDate,
    #[schema(example = "Plumber visit in the morning")]
    pub reason: String,
    #[schema(example = "normal")]
    pub urgency: Urgency,
}

#[derive(Serialize, ToSchema)]
pub struct CreateWfhResponse {
    #[schema(example = 1)]
    pub approval_id: u64,
    #[schema(example = "pending")]
    pub status: WfhStatus,
    /// Instant the request expires if nobody decides it; absent for
    /// auto-approved emergencies.
    #[schema(value_type = Option<String>, format = "date-time")]
    pub sla_deadline: Option<chrono::DateTime<Utc>>,
    /// Days already approved this month vs the advisory cap. Context for
    /// the manager, never a rejection trigger by itself.
    pub days_used_this_month: i64,
    pub monthly_cap_days: i64,
}

/// Submit a WFH request. `emergency` urgency is provisionally auto-approved
/// at creation (managers can still downgrade it after the fact); everything
/// else starts `pending` and expires if untouched past its SLA window.
#[utoipa::path(
    post,
    path = "/api/v1/wfh",
    request_body = CreateWfhRequest,
    responses(
        (status = 200, description = "Request submitted", body = CreateWfhResponse),
        (status = 400, description = "Bad request"),
        (status = 401, description = "Unauthorized")
    ),
    security(("bearer_auth" = [])),
    tag = "WFH"
)]
pub async fn create_request(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    config: web::Data<Config>,
    payload: web::Json<CreateWfhRequest>,
) -> actix_web::Result<impl Responder> {
    if payload.reason.trim().is_empty() {
        return Err(EngineError::Validation("reason must not be empty".into()).into());
    }

    let status = initial_status(payload.urgency);
    let manager_id = payload.manager_id.or(auth.manager_id);
    let now = Utc::now();

    // Emergency requests carry their decision timestamp from birth.
    let decided_at = (status == WfhStatus::AutoApproved).then_some(now);

    let result = sqlx::query(
        r#"
        INSERT INTO wfh_approvals
            (employee_id, manager_id, requested_date, reason, urgency, status, decided_at, created_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(auth.user_id)
    .bind(manager_id)
    .bind(payload.requested_date)
    .bind(payload.reason.trim())
    .bind(payload.urgency.to_string())
    .bind(status.to_string())
    .bind(decided_at)
    .bind(now)
    .execute(pool.get_ref())
    .await
    .map_err(|e| {
        tracing::error!(error = %e, user_id = auth.user_id, "Failed to create wfh request");
        EngineError::from(e)
    })?;

    let days_used = days_used_in_month(
        pool.get_ref(),
        auth.user_id,
        payload.requested_date.year(),
        payload.requested_date.month(),
    )
    .await
    .map_err(EngineError::from)?;

    Ok(HttpResponse::Ok().json(CreateWfhResponse {
        approval_id: result.last_insert_id(),
        status,
        sla_deadline: sla_deadline(payload.urgency, now, &config),
        days_used_this_month: days_used,
        monthly_cap_days: config.wfh_monthly_cap_days,
    }))
}

/// Approve a pending request (Manager/Admin). Approving anything that has
/// already left `pending` is reported, not applied: no double-decision.
#[utoipa::path(
    put,
    path = "/api/v1/wfh/{approval_id}/approve",
    params(("approval_id" = u64, Path, description = "Request to approve")),
    responses(
        (status = 200, description = "Request approved"),
        (status = 404, description = "Request not found"),
        (status = 409, description = "Request already decided"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden")
    ),
    security(("bearer_auth" = [])),
    tag = "WFH"
)]
pub async fn approve_request(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
) -> actix_web::Result<impl Responder> {
    auth.require_manager_or_admin()?;
    decide(pool.get_ref(), path.into_inner(), auth.user_id, WfhStatus::Approved).await
}

/// Reject a request (Manager/Admin). Also the post-hoc downgrade path for
/// an emergency auto-approval.
#[utoipa::path(
    put,
    path = "/api/v1/wfh/{approval_id}/reject",
    params(("approval_id" = u64, Path, description = "Request to reject")),
    responses(
        (status = 200, description = "Request rejected"),
        (status = 404, description = "Request not found"),
        (status = 409, description = "Request already decided"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden")
    ),
    security(("bearer_auth" = [])),
    tag = "WFH"
)]
pub async fn reject_request(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
) -> actix_web::Result<impl Responder> {
    auth.require_manager_or_admin()?;
    decide(pool.get_ref(), path.into_inner(), auth.user_id, WfhStatus::Rejected).await
}

async fn decide(
    pool: &MySqlPool,
    approval_id: u64,
    decided_by: u64,
    verdict: WfhStatus,
) -> actix_web::Result<HttpResponse> {
    // Approve only moves pending forward; reject may also downgrade an
    // emergency auto-approval during post-hoc review.
    let sql = match verdict {
        WfhStatus::Approved => {
            r#"
            UPDATE wfh_approvals
            SET status = 'approved', decided_by = ?, decided_at = ?
            WHERE id = ? AND status = 'pending'
            "#
        }
        WfhStatus::Rejected => {
            r#"
            UPDATE wfh_approvals
            SET status = 'rejected', decided_by = ?, decided_at = ?
            WHERE id = ? AND status IN ('pending', 'auto_approved')
            "#
        }
        _ => return Err(actix_web::error::ErrorInternalServerError("Invalid verdict")),
    };

    let result = sqlx::query(sql)
        .bind(decided_by)
        .bind(Utc::now())
        .bind(approval_id)
        .execute(pool)
        .await
        .map_err(|e| {
            tracing::error!(error = %e, approval_id, "WFH decision failed");
            EngineError::from(e)
        })?;

    if result.rows_affected() == 0 {
        let exists: Option<(u64,)> = sqlx::query_as("SELECT id FROM wfh_approvals WHERE id = ?")
            .bind(approval_id)
            .fetch_optional(pool)
            .await
            .map_err(EngineError::from)?;

        return match exists {
            Some(_) => Err(EngineError::AlreadyDecided.into()),
            None => Ok(HttpResponse::NotFound().json(serde_json::json!({
                "message": "Request not found"
            }))),
        };
    }

    Ok(HttpResponse::Ok().json(serde_json::json!({
        "message": format!("Request {}", verdict),
        "status": verdict,
    })))
}

async fn days_used_in_month(
    pool: &MySqlPool,
    employee_id: u64,
    year: i32,
    month: u32,
) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar::<_, i64>(
        r#"
        SELECT COUNT(DISTINCT requested_date)
        FROM wfh_approvals
        WHERE employee_id = ?
          AND YEAR(requested_date) = ? AND MONTH(requested_date) = ?
          AND status IN ('approved', 'auto_approved')
        "#,
    )
    .bind(employee_id)
    .bind(year)
    .bind(month)
    .fetch_one(pool)
    .await
}

#[derive(Deserialize, IntoParams, ToSchema)]
pub struct UsageQuery {
    /// Defaults to the caller.
    pub employee_id: Option<u64>,
    #[schema(example = 2026)]
    pub year: Option<i32>,
    #[schema(example = 1)]
    pub month: Option<u32>,
}

#[derive(Serialize, ToSchema)]
pub struct UsageResponse {
    pub employee_id: u64,
    pub year: i32,
    pub month: u32,
    pub days_used: i64,
    pub monthly_cap_days: i64,
    /// Advisory: may go negative when managers approve past the cap.
    pub remaining: i64,
}

/// Monthly WFH usage vs the advisory cap. Read-only context for approval
/// decisions; eligibility is never enforced here.
#[utoipa::path(
    get,
    path = "/api/v1/wfh/usage",
    params(UsageQuery),
    responses(
        (status = 200, description = "Usage summary", body = UsageResponse),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden")
    ),
    security(("bearer_auth" = [])),
    tag = "WFH"
)]
pub async fn usage(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    config: web::Data<Config>,
    query: web::Query<UsageQuery>,
) -> actix_web::Result<impl Responder> {
    let employee_id = match query.employee_id {
        Some(id) if id != auth.user_id => {
            auth.require_manager_or_admin()?;
            id
        }
        Some(id) => id,
        None => auth.user_id,
    };

    let today = Utc::now().date_naive();
    let year = query.year.unwrap_or_else(|| today.year());
    let month = query.month.unwrap_or_else(|| today.month());

    let days_used = days_used_in_month(pool.get_ref(), employee_id, year, month)
        .await
        .map_err(EngineError::from)?;

    Ok(HttpResponse::Ok().json(UsageResponse {
        employee_id,
        year,
        month,
        days_used,
        monthly_cap_days: config.wfh_monthly_cap_days,
        remaining: config.wfh_monthly_cap_days - days_used,
    }))
}

#[derive(Deserialize, IntoParams, ToSchema)]
pub struct WfhFilter {
    pub employee_id: Option<u64>,
    pub status: Option<String>,
    pub page: Option<u64>,
    pub per_page: Option<u64>,
}

enum FilterValue<'a> {
    U64(u64),
    Str(&'a str),
}

#[derive(Serialize, ToSchema)]
pub struct WfhListResponse {
    pub data: Vec<WfhApproval>,
    pub page: u32,
    pub per_page: u32,
    pub total: i64,
}

/// List WFH requests (Manager/Admin).
#[utoipa::path(
    get,
    path = "/api/v1/wfh",
    params(WfhFilter),
    responses(
        (status = 200, description = "Paginated request list", body = WfhListResponse),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden")
    ),
    security(("bearer_auth" = [])),
    tag = "WFH"
)]
pub async fn request_list(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    query: web::Query<WfhFilter>,
) -> actix_web::Result<impl Responder> {
    auth.require_manager_or_admin()?;

    let per_page = query.per_page.unwrap_or(10).min(100);
    let page = query.page.unwrap_or(1).max(1);
    let offset = (page - 1) * per_page;

    let mut where_sql = String::from(" WHERE 1=1");
    let mut args: Vec<FilterValue> = Vec::new();

    if let Some(employee_id) = query.employee_id {
        where_sql.push_str(" AND employee_id = ?");
        args.push(FilterValue::U64(employee_id));
    }
    if let Some(status) = query.status.as_deref() {
        where_sql.push_str(" AND status = ?");
        args.push(FilterValue::Str(status));
    }

    let count_sql = format!("SELECT COUNT(*) FROM wfh_approvals{}", where_sql);
    let mut count_q = sqlx::query_scalar::<_, i64>(&count_sql);
    for arg in &args {
        count_q = match arg {
            FilterValue::U64(v) => count_q.bind(*v),
            FilterValue::Str(s) => count_q.bind(*s),
        };
    }
    let total = count_q.fetch_one(pool.get_ref()).await.map_err(|e| {
        tracing::error!(error = %e, "Failed to count wfh requests");
        actix_web::error::ErrorInternalServerError("Internal Server Error")
    })?;

    let data_sql = format!(
        r#"
        SELECT id, employee_id, manager_id, requested_date, reason, urgency, status,
               decided_by, decided_at, created_at
        FROM wfh_approvals
        {}
        ORDER BY created_at DESC
        LIMIT ? OFFSET ?
        "#,
        where_sql
    );

    let mut data_q = sqlx::query_as::<_, WfhApproval>(&data_sql);
    for arg in args {
        data_q = match arg {
            FilterValue::U64(v) => data_q.bind(v),
            FilterValue::Str(s) => data_q.bind(s),
        };
    }

    let requests = data_q
        .bind(per_page)
        .bind(offset)
        .fetch_all(pool.get_ref())
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "Failed to fetch wfh list");
            actix_web::error::ErrorInternalServerError("Internal Server Error")
        })?;

    Ok(HttpResponse::Ok().json(WfhListResponse {
        data: requests,
        page: page as u32,
        per_page: per_page as u32,
        total,
    }))
}

/// Fetch one request.
#[utoipa::path(
    get,
    path = "/api/v1/wfh/{approval_id}",
    params(("approval_id" = u64, Path, description = "Request to fetch")),
    responses(
        (status = 200, description = "Request found", body = WfhApproval),
        (status = 404, description = "Request not found"),
        (status = 401, description = "Unauthorized")
    ),
    security(("bearer_auth" = [])),
    tag = "WFH"
)]
pub async fn get_request(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
) -> actix_web::Result<impl Responder> {
    let approval_id = path.into_inner();

    let request: Option<WfhApproval> = sqlx::query_as(
        r#"
        SELECT id, employee_id, manager_id, requested_date, reason, urgency, status,
               decided_by, decided_at, created_at
        FROM wfh_approvals
        WHERE id = ?
        "#,
    )
    .bind(approval_id)
    .fetch_optional(pool.get_ref())
    .await
    .map_err(|e| {
        tracing::error!(error = %e, approval_id, "Failed to fetch wfh request");
        actix_web::error::ErrorInternalServerError("Internal Server Error")
    })?;

    match request {
        Some(r) => {
            if r.employee_id != auth.user_id {
                auth.require_manager_or_admin()?;
            }
            Ok(HttpResponse::Ok().json(r))
        }
        None => Ok(HttpResponse::NotFound().json(serde_json::json!({
            "message": "Request not found"
        }))),
    }
}
