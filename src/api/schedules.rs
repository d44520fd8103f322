use crate::api::common::{
    created, delete_scoped, ensure_in_school, fetch_scoped, require_non_empty, update_scoped,
};
use crate::auth::auth::AuthUser;
use crate::error::{AppError, AppResult};
use crate::model::schedule::{ScheduledPeriod, normalize_day_name};
use crate::service::attendance_store::PERIOD_COLUMNS;
use crate::utils::filter::{Filter, Paginated, SchedulePage, fetch_page};
use crate::utils::pagination::PageQuery;
use actix_web::{HttpResponse, web};
use chrono::NaiveTime;
use serde::Deserialize;
use serde_json::Value;
use sqlx::MySqlPool;
use utoipa::{IntoParams, ToSchema};

const UPDATABLE: &[&str] = &[
    "class_id",
    "day_of_week",
    "grade",
    "subject",
    "start_time",
    "end_time",
    "is_active",
];

#[derive(Deserialize, ToSchema)]
pub struct CreatePeriod {
    pub school_id: Option<u64>,
    #[schema(example = 7)]
    pub teacher_id: u64,
    pub class_id: Option<u64>,
    #[schema(example = "Monday")]
    pub day_of_week: String,
    #[schema(example = "Grade 5")]
    pub grade: String,
    #[schema(example = "Mathematics")]
    pub subject: String,
    #[schema(example = "08:00:00", value_type = String, format = "time")]
    pub start_time: NaiveTime,
    #[schema(example = "08:45:00", value_type = String, format = "time")]
    pub end_time: NaiveTime,
}

#[derive(Deserialize, IntoParams)]
pub struct ScheduleQuery {
    pub school_id: Option<u64>,
    pub teacher_id: Option<u64>,
    pub class_id: Option<u64>,
    /// Full or short day name
    pub day_of_week: Option<String>,
    pub is_active: Option<bool>,
    pub page: Option<u64>,
    pub per_page: Option<u64>,
}

#[utoipa::path(
    post,
    path = "/api/schedules",
    request_body = CreatePeriod,
    responses(
        (status = 201, description = "Period scheduled"),
        (status = 400, description = "Invalid day or time range"),
        (status = 403, description = "Admin only")
    ),
    security(("bearer_auth" = [])),
    tag = "Schedule"
)]
pub async fn create_period(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    payload: web::Json<CreatePeriod>,
) -> AppResult<HttpResponse> {
    auth.require_admin()?;
    let school_id = auth.school_for_write(payload.school_id)?;
    require_non_empty("grade", &payload.grade)?;
    require_non_empty("subject", &payload.subject)?;

    let day = normalize_day_name(&payload.day_of_week)
        .ok_or_else(|| AppError::bad_request("day_of_week must be a day name"))?;

    if payload.start_time >= payload.end_time {
        return Err(AppError::bad_request("start_time must be before end_time"));
    }

    ensure_in_school(pool.get_ref(), "teachers", payload.teacher_id, school_id, "Teacher").await?;
    if let Some(class_id) = payload.class_id {
        ensure_in_school(pool.get_ref(), "classes", class_id, school_id, "Class").await?;
    }

    let result = sqlx::query(
        r#"
        INSERT INTO scheduled_periods
            (school_id, teacher_id, class_id, day_of_week, grade, subject, start_time, end_time)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(school_id)
    .bind(payload.teacher_id)
    .bind(payload.class_id)
    .bind(day)
    .bind(payload.grade.trim())
    .bind(payload.subject.trim())
    .bind(payload.start_time)
    .bind(payload.end_time)
    .execute(pool.get_ref())
    .await?;

    tracing::info!(
        school_id,
        teacher_id = payload.teacher_id,
        day,
        "Period scheduled"
    );
    Ok(created("Period", result.last_insert_id()))
}

#[utoipa::path(
    get,
    path = "/api/schedules",
    params(ScheduleQuery),
    responses((status = 200, description = "Paginated periods", body = SchedulePage)),
    security(("bearer_auth" = [])),
    tag = "Schedule"
)]
pub async fn list_periods(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    query: web::Query<ScheduleQuery>,
) -> AppResult<HttpResponse> {
    let page = PageQuery {
        page: query.page,
        per_page: query.per_page,
    }
    .resolve();

    let day = match query.day_of_week.as_deref() {
        Some(raw) => Some(
            normalize_day_name(raw)
                .ok_or_else(|| AppError::bad_request("day_of_week must be a day name"))?,
        ),
        None => None,
    };

    let filter = Filter::new()
        .and_opt("school_id = ?", auth.scoped_school(query.school_id)?)
        .and_opt("teacher_id = ?", query.teacher_id)
        .and_opt("class_id = ?", query.class_id)
        .and_opt("day_of_week = ?", day)
        .and_opt("is_active = ?", query.is_active);

    let periods: Paginated<ScheduledPeriod> = fetch_page(
        pool.get_ref(),
        "scheduled_periods",
        PERIOD_COLUMNS,
        &filter,
        "FIELD(day_of_week, 'Monday', 'Tuesday', 'Wednesday', 'Thursday', 'Friday', 'Saturday', 'Sunday'), start_time",
        page,
    )
    .await?;

    Ok(HttpResponse::Ok().json(periods))
}

#[utoipa::path(
    get,
    path = "/api/schedules/{period_id}",
    params(("period_id" = u64, Path, description = "Scheduled period ID")),
    responses(
        (status = 200, description = "Period found", body = ScheduledPeriod),
        (status = 404, description = "Period not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Schedule"
)]
pub async fn get_period(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
) -> AppResult<HttpResponse> {
    let period: ScheduledPeriod = fetch_scoped(
        pool.get_ref(),
        &auth,
        "scheduled_periods",
        PERIOD_COLUMNS,
        path.into_inner(),
        "Period",
    )
    .await?;

    Ok(HttpResponse::Ok().json(period))
}

#[utoipa::path(
    put,
    path = "/api/schedules/{period_id}",
    params(("period_id" = u64, Path, description = "Scheduled period ID")),
    request_body(content = Object, description = "Any of: class_id, day_of_week, grade, subject, start_time, end_time, is_active"),
    responses(
        (status = 200, description = "Period updated"),
        (status = 400, description = "Invalid fields"),
        (status = 404, description = "Period not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Schedule"
)]
pub async fn update_period(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
    payload: web::Json<Value>,
) -> AppResult<HttpResponse> {
    auth.require_admin()?;
    let mut payload = payload.into_inner();

    // stored day names are canonical so reconciliation can match on them
    if let Some(raw) = payload.get("day_of_week") {
        let day = raw
            .as_str()
            .and_then(normalize_day_name)
            .ok_or_else(|| AppError::bad_request("day_of_week must be a day name"))?;
        payload["day_of_week"] = Value::from(day);
    }

    update_scoped(
        pool.get_ref(),
        &auth,
        "scheduled_periods",
        path.into_inner(),
        &payload,
        UPDATABLE,
        "Period",
    )
    .await
}

#[utoipa::path(
    delete,
    path = "/api/schedules/{period_id}",
    params(("period_id" = u64, Path, description = "Scheduled period ID")),
    responses(
        (status = 200, description = "Period deleted"),
        (status = 404, description = "Period not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Schedule"
)]
pub async fn delete_period(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
) -> AppResult<HttpResponse> {
    auth.require_admin()?;
    delete_scoped(
        pool.get_ref(),
        &auth,
        "scheduled_periods",
        path.into_inner(),
        "Period",
    )
    .await
}
