use crate::auth::auth::AuthUser;
use crate::error::{AppError, AppResult};
use crate::model::leave_request::{LeaveRequest, LeaveStatus};
use crate::model::role::Role;
use crate::service::leave_decision::{self, DecisionError, MySqlLeaveTx};
use crate::utils::filter::{Filter, LeavePage, Paginated, fetch_page};
use crate::utils::pagination::PageQuery;
use actix_web::{HttpResponse, web};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::json;
use sqlx::MySqlPool;
use strum_macros::AsRefStr;
use utoipa::{IntoParams, ToSchema};

const COLUMNS: &str =
    "id, teacher_id, school_id, start_date, end_date, leave_type, reason, status, created_at";
const MAX_LEAVE_DAYS: i64 = 90;

#[derive(Debug, Serialize, Deserialize, AsRefStr, ToSchema)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum LeaveType {
    Annual,
    Sick,
    Personal,
    Unpaid,
}

#[derive(Deserialize, ToSchema)]
pub struct CreateLeave {
    #[schema(example = "2026-10-12", format = "date", value_type = String)]
    pub start_date: NaiveDate,
    #[schema(example = "2026-10-14", format = "date", value_type = String)]
    pub end_date: NaiveDate,
    #[schema(example = "sick")]
    pub leave_type: LeaveType,
    pub reason: Option<String>,
}

#[derive(Deserialize, IntoParams, ToSchema)]
pub struct LeaveFilter {
    #[schema(example = 7)]
    /// Filter by teacher ID
    pub teacher_id: Option<u64>,
    pub school_id: Option<u64>,
    /// Filter by leave status
    #[param(value_type = Option<String>)]
    #[schema(example = "pending")]
    pub status: Option<LeaveStatus>,
    #[schema(example = 1)]
    /// Pagination page number (start with 1)
    pub page: Option<u64>,
    #[schema(example = 10)]
    /// Pagination per page number
    pub per_page: Option<u64>,
}

fn validate_range(start: NaiveDate, end: NaiveDate) -> AppResult<()> {
    if start > end {
        return Err(AppError::bad_request("start_date cannot be after end_date"));
    }
    if (end - start).num_days() >= MAX_LEAVE_DAYS {
        return Err(AppError::bad_request(format!(
            "A single leave request may cover at most {MAX_LEAVE_DAYS} days"
        )));
    }
    Ok(())
}

/* =========================
Create leave request
========================= */
#[utoipa::path(
    post,
    path = "/api/leave",
    request_body(
        content = CreateLeave,
        description = "Leave request payload",
        content_type = "application/json"
    ),
    responses(
        (status = 201, description = "Leave request submitted successfully",
         body = Object,
         example = json!({
            "message": "Leave request submitted",
            "id": 1,
            "status": "pending"
         })
        ),
        (status = 400, description = "Bad request"),
        (status = 403, description = "No teacher profile"),
        (status = 409, description = "Overlaps an existing request")
    ),
    security(("bearer_auth" = [])),
    tag = "Leave"
)]
pub async fn create_leave(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    payload: web::Json<CreateLeave>,
) -> AppResult<HttpResponse> {
    let teacher_id = auth.require_teacher()?;
    let school_id = auth
        .school_id
        .ok_or_else(|| AppError::forbidden("Account has no school"))?;

    validate_range(payload.start_date, payload.end_date)?;

    let overlapping = sqlx::query_scalar::<_, i64>(
        r#"
        SELECT COUNT(*)
        FROM leave_requests
        WHERE teacher_id = ? AND status IN ('pending', 'approved')
        AND start_date <= ? AND end_date >= ?
        "#,
    )
    .bind(teacher_id)
    .bind(payload.end_date)
    .bind(payload.start_date)
    .fetch_one(pool.get_ref())
    .await?;

    if overlapping > 0 {
        return Err(AppError::Conflict(
            "Overlaps an existing pending or approved leave request".into(),
        ));
    }

    let result = sqlx::query(
        r#"
        INSERT INTO leave_requests
            (teacher_id, school_id, start_date, end_date, leave_type, reason, status)
        VALUES (?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(teacher_id)
    .bind(school_id)
    .bind(payload.start_date)
    .bind(payload.end_date)
    .bind(payload.leave_type.as_ref())
    .bind(payload.reason.as_deref())
    .bind(LeaveStatus::Pending.as_ref())
    .execute(pool.get_ref())
    .await
    .map_err(|e| {
        tracing::error!(error = %e, teacher_id, "Failed to create leave request");
        AppError::from(e)
    })?;

    Ok(HttpResponse::Created().json(json!({
        "message": "Leave request submitted",
        "id": result.last_insert_id(),
        "status": LeaveStatus::Pending,
    })))
}

async fn fetch_leave(pool: &MySqlPool, leave_id: u64) -> AppResult<LeaveRequest> {
    let sql = format!("SELECT {COLUMNS} FROM leave_requests WHERE id = ?");
    sqlx::query_as::<_, LeaveRequest>(&sql)
        .bind(leave_id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| AppError::not_found("Leave request not found"))
}

/// Loads a request the caller may decide; only the school's admins qualify.
async fn decidable_leave(auth: &AuthUser, pool: &MySqlPool, leave_id: u64) -> AppResult<LeaveRequest> {
    auth.require_admin()?;

    let leave = fetch_leave(pool, leave_id).await?;
    if !auth.is_admin_of(leave.school_id) {
        return Err(AppError::not_found("Leave request not found"));
    }
    Ok(leave)
}

fn decision_error(leave_id: u64, err: DecisionError<sqlx::Error>) -> AppError {
    match err {
        DecisionError::AlreadyProcessed => AppError::bad_request("Leave request already processed"),
        DecisionError::Store(e) => {
            tracing::error!(error = %e, leave_id, "Leave decision rolled back");
            AppError::from(e)
        }
    }
}

/* =========================
Approve leave (school admin)
========================= */
#[utoipa::path(
    put,
    path = "/api/leave/{leave_id}/approve",
    params(
        ("leave_id" = u64, Path, description = "ID of the leave request to approve")
    ),
    responses(
        (status = 200, description = "Leave approved successfully", body = Object, example = json!({
            "message": "Leave approved",
            "days_marked": 3
        })),
        (status = 400, description = "Leave request already processed"),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Leave request not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Leave"
)]
pub async fn approve_leave(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
) -> AppResult<HttpResponse> {
    let leave_id = path.into_inner();
    let leave = decidable_leave(&auth, pool.get_ref(), leave_id).await?;

    // Status and Leave-Approved days commit together or not at all.
    let tx = MySqlLeaveTx::begin(pool.get_ref()).await?;
    let days_marked = leave_decision::approve(tx, &leave, auth.user_id)
        .await
        .map_err(|e| decision_error(leave_id, e))?;

    tracing::info!(leave_id, teacher_id = leave.teacher_id, days_marked, "Leave approved");

    Ok(HttpResponse::Ok().json(json!({
        "message": "Leave approved",
        "days_marked": days_marked,
    })))
}

/* =========================
Reject leave (school admin)
========================= */
#[utoipa::path(
    put,
    path = "/api/leave/{leave_id}/reject",
    params(
        ("leave_id" = u64, Path, description = "ID of the leave request to reject")
    ),
    responses(
        (status = 200, description = "Leave rejected successfully", body = Object, example = json!({
            "message": "Leave rejected"
        })),
        (status = 400, description = "Leave request already processed"),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Leave request not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Leave"
)]
pub async fn reject_leave(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
) -> AppResult<HttpResponse> {
    let leave_id = path.into_inner();
    decidable_leave(&auth, pool.get_ref(), leave_id).await?;

    let tx = MySqlLeaveTx::begin(pool.get_ref()).await?;
    leave_decision::reject(tx, leave_id, auth.user_id)
        .await
        .map_err(|e| decision_error(leave_id, e))?;

    Ok(HttpResponse::Ok().json(json!({
        "message": "Leave rejected"
    })))
}

/// for getting a leave application details endpoint
#[utoipa::path(
    get,
    path = "/api/leave/{leave_id}",
    params(
        ("leave_id" = u64, Path, description = "ID of the leave request to fetch")
    ),
    responses(
        (status = 200, description = "Leave request found", body = LeaveRequest),
        (status = 404, description = "Leave request not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Leave"
)]
pub async fn get_leave(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
) -> AppResult<HttpResponse> {
    let leave = fetch_leave(pool.get_ref(), path.into_inner()).await?;

    let visible = match auth.role {
        Role::Teacher => auth.teacher_id == Some(leave.teacher_id),
        Role::Student => false,
        _ => auth.can_access_school(leave.school_id),
    };
    if !visible {
        return Err(AppError::not_found("Leave request not found"));
    }

    Ok(HttpResponse::Ok().json(leave))
}

/// for getting leave applications endpoint
#[utoipa::path(
    get,
    path = "/api/leave",
    params(LeaveFilter),
    responses(
        (status = 200, description = "Paginated leave list", body = LeavePage),
        (status = 403, description = "Forbidden")
    ),
    security(("bearer_auth" = [])),
    tag = "Leave"
)]
pub async fn leave_list(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    query: web::Query<LeaveFilter>,
) -> AppResult<HttpResponse> {
    let teacher_id = match auth.role {
        Role::Student => return Err(AppError::forbidden("Students cannot read leave requests")),
        Role::Teacher => Some(auth.require_teacher()?),
        _ => query.teacher_id,
    };

    let page = PageQuery {
        page: query.page,
        per_page: query.per_page,
    }
    .resolve();

    let filter = Filter::new()
        .and_opt("school_id = ?", auth.scoped_school(query.school_id)?)
        .and_opt("teacher_id = ?", teacher_id)
        .and_opt("status = ?", query.status.map(|s| s.as_ref().to_string()));

    let leaves: Paginated<LeaveRequest> = fetch_page(
        pool.get_ref(),
        "leave_requests",
        COLUMNS,
        &filter,
        "created_at DESC",
        page,
    )
    .await?;

    Ok(HttpResponse::Ok().json(leaves))
}
